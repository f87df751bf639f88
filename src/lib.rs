pub mod audio;
pub mod config;
pub mod error;
pub mod stream;

pub use audio::{AudioFormatParams, AudioSink, RecordingFactory, RecordingInfo, StreamRecorder};
pub use config::RecorderConfig;
pub use error::{RecorderError, Result};
pub use stream::{ConnectionSession, RecorderServer, StreamEvent};
