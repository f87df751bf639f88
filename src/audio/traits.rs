use std::path::PathBuf;

use chrono::{DateTime, Local};
use tracing::info;

use super::format::AudioFormatParams;
use crate::error::Result;

///Traits for streaming raw audio bytes into a file
///
/// Lifecycle is open -> append* -> finalize, driven by one connection.
pub trait AudioSink {
    fn open(&mut self) -> Result<()>;
    fn append(&mut self, chunk: &[u8]) -> Result<()>;
    fn finalize(&mut self) -> Result<RecordingInfo>;
    fn is_open(&self) -> bool;
}

/// Metadata for a completed recording
#[derive(Debug, Clone)]
pub struct RecordingInfo {
    pub file_path: PathBuf,
    pub index: u64,
    pub format: AudioFormatParams,
    /// Payload bytes, taken from the file size on disk
    pub payload_bytes: u64,
    pub file_size_bytes: u64,
    pub duration_seconds: f64,
    pub started_at: DateTime<Local>,
}

impl RecordingInfo {
    pub fn log_summary(&self) {
        info!(
            file = %self.file_path.display(),
            index = self.index,
            started_at = %self.started_at.format("%Y-%m-%d %H:%M:%S"),
            "Recording completed: {:.2}s, {} payload bytes, {} bytes on disk",
            self.duration_seconds,
            self.payload_bytes,
            self.file_size_bytes
        );
    }
}
