use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use super::format::AudioFormatParams;
use super::recorder::StreamRecorder;
use crate::error::{RecorderError, Result};

/// Source of recording indices, one per accepted connection
pub trait RecordingSequence: Send + Sync {
    fn next_index(&self) -> u64;
}

/// Process-wide counter, starts at 0 on every process start
#[derive(Debug, Default)]
pub struct AtomicSequence {
    next: AtomicU64,
}

impl AtomicSequence {
    pub fn new() -> Self {
        Self::starting_at(0)
    }

    pub fn starting_at(start: u64) -> Self {
        Self {
            next: AtomicU64::new(start),
        }
    }
}

impl RecordingSequence for AtomicSequence {
    fn next_index(&self) -> u64 {
        self.next.fetch_add(1, Ordering::Relaxed)
    }
}

/// File name for a recording, e.g. `audio_stream_8000_2_32_0.wav`
pub fn recording_path(output_dir: &Path, format: &AudioFormatParams, index: u64) -> PathBuf {
    output_dir.join(format!(
        "audio_stream_{}_{}_{}_{}.wav",
        format.sample_rate(),
        format.channels(),
        format.bits_per_sample(),
        index
    ))
}

/// Hands out a fresh, not yet opened recorder per connection
#[derive(Clone)]
pub struct RecordingFactory {
    output_dir: PathBuf,
    format: AudioFormatParams,
    sequence: Arc<dyn RecordingSequence>,
}

impl RecordingFactory {
    pub fn new(
        output_dir: impl Into<PathBuf>,
        format: AudioFormatParams,
        sequence: Arc<dyn RecordingSequence>,
    ) -> Self {
        Self {
            output_dir: output_dir.into(),
            format,
            sequence,
        }
    }

    pub fn format(&self) -> &AudioFormatParams {
        &self.format
    }

    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    /// Draw the next index and build a recorder in the `Created` state
    pub fn create(&self) -> Result<StreamRecorder> {
        //Create output dir if it doesn't exist
        fs::create_dir_all(&self.output_dir)
            .map_err(|e| RecorderError::storage(&self.output_dir, "create dir", e))?;

        let index = self.sequence.next_index();
        let path = recording_path(&self.output_dir, &self.format, index);
        Ok(StreamRecorder::new(self.format, path, index))
    }
}

impl std::fmt::Debug for RecordingFactory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RecordingFactory")
            .field("output_dir", &self.output_dir)
            .field("format", &self.format)
            .finish_non_exhaustive()
    }
}
