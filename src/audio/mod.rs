pub mod format;
pub mod header;
pub mod naming;
pub mod recorder;
pub mod stats;
pub mod traits;

pub use format::AudioFormatParams;
pub use header::{HEADER_LEN, WavHeader, decode_header, derive_final_header, encode_header};
pub use naming::{AtomicSequence, RecordingFactory, RecordingSequence, recording_path};
pub use recorder::{RecorderState, StreamRecorder};
pub use stats::StreamStats;
pub use traits::{AudioSink, RecordingInfo};
