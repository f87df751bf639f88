use std::fs::{self, File, OpenOptions};
use std::io::{Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

use chrono::{DateTime, Local};
use tracing::{debug, info, warn};

use super::format::AudioFormatParams;
use super::header::{HEADER_LEN, derive_final_header, encode_header};
use super::traits::{AudioSink, RecordingInfo};
use crate::error::{RecorderError, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecorderState {
    Created,
    Open,
    Finalized,
}

/// Streams one connection's audio bytes into a WAV file
///
/// - open writes a provisional header (payload length 0)
/// - append writes every chunk verbatim at the end of the file
/// - finalize stats the file and patches the header in place
///
/// Nothing is buffered in memory, each chunk goes straight to the file.
pub struct StreamRecorder {
    format: AudioFormatParams,
    path: PathBuf,
    index: u64,
    state: RecorderState,
    /// Append handle, only present while Open
    file: Option<File>,
    /// Bytes successfully handed to the file since open
    bytes_written: u64,
    started_at: Option<DateTime<Local>>,
}

impl StreamRecorder {
    pub fn new(format: AudioFormatParams, path: impl Into<PathBuf>, index: u64) -> Self {
        Self {
            format,
            path: path.into(),
            index,
            state: RecorderState::Created,
            file: None,
            bytes_written: 0,
            started_at: None,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn index(&self) -> u64 {
        self.index
    }

    pub fn state(&self) -> RecorderState {
        self.state
    }

    pub fn bytes_written(&self) -> u64 {
        self.bytes_written
    }

    pub fn format(&self) -> &AudioFormatParams {
        &self.format
    }

    /// Overwrite bytes [0, 44) with the header for the current file size
    fn patch_header(&self) -> Result<(u64, u64)> {
        let file_size = fs::metadata(&self.path)
            .map_err(|e| RecorderError::storage(&self.path, "stat", e))?
            .len();
        let header = derive_final_header(&self.format, file_size)?;
        let payload_bytes = file_size - HEADER_LEN as u64;

        let mut file = OpenOptions::new()
            .write(true)
            .open(&self.path)
            .map_err(|e| RecorderError::storage(&self.path, "reopen", e))?;
        file.seek(SeekFrom::Start(0))
            .map_err(|e| RecorderError::storage(&self.path, "seek", e))?;
        file.write_all(&header)
            .map_err(|e| RecorderError::storage(&self.path, "write header", e))?;
        file.sync_all()
            .map_err(|e| RecorderError::storage(&self.path, "sync", e))?;

        Ok((file_size, payload_bytes))
    }
}

impl AudioSink for StreamRecorder {
    fn open(&mut self) -> Result<()> {
        if self.state != RecorderState::Created {
            return Err(RecorderError::AlreadyOpened);
        }

        let header = encode_header(&self.format, 0)?;
        // File::create truncates a leftover file with the same name
        let mut file = File::create(&self.path)
            .map_err(|e| RecorderError::storage(&self.path, "create", e))?;
        file.write_all(&header)
            .map_err(|e| RecorderError::storage(&self.path, "write header", e))?;

        self.file = Some(file);
        self.bytes_written = 0;
        self.started_at = Some(Local::now());
        self.state = RecorderState::Open;
        info!(file = %self.path.display(), index = self.index, "Started recording");
        Ok(())
    }

    fn append(&mut self, chunk: &[u8]) -> Result<()> {
        let file = match self.state {
            RecorderState::Created => return Err(RecorderError::NotOpen),
            RecorderState::Finalized => return Err(RecorderError::RecorderClosed),
            RecorderState::Open => self.file.as_mut().ok_or(RecorderError::NotOpen)?,
        };
        if chunk.is_empty() {
            return Ok(());
        }

        file.write_all(chunk)
            .map_err(|e| RecorderError::storage(&self.path, "append", e))?;
        // only count what the file accepted
        self.bytes_written += chunk.len() as u64;
        Ok(())
    }

    fn finalize(&mut self) -> Result<RecordingInfo> {
        match self.state {
            RecorderState::Created => return Err(RecorderError::NotOpen),
            RecorderState::Finalized => return Err(RecorderError::RecorderClosed),
            RecorderState::Open => {}
        }

        // No way back to Open once the append handle is released
        self.state = RecorderState::Finalized;
        if let Some(mut file) = self.file.take() {
            file.flush()
                .map_err(|e| RecorderError::storage(&self.path, "flush", e))?;
        }

        let (file_size, payload_bytes) = self.patch_header()?;
        if payload_bytes != self.bytes_written {
            warn!(
                file = %self.path.display(),
                counted = self.bytes_written,
                on_disk = payload_bytes,
                "Byte counter disagrees with file size, using file size"
            );
        }
        debug!(file = %self.path.display(), payload_bytes, "Header finalized");

        Ok(RecordingInfo {
            file_path: self.path.clone(),
            index: self.index,
            format: self.format,
            payload_bytes,
            file_size_bytes: file_size,
            duration_seconds: self.format.duration_seconds(payload_bytes),
            started_at: self.started_at.unwrap_or_else(Local::now),
        })
    }

    fn is_open(&self) -> bool {
        self.state == RecorderState::Open
    }
}

impl Drop for StreamRecorder {
    fn drop(&mut self) {
        // No finalize here: an unclosed stream keeps its provisional header
        if self.is_open() {
            warn!(
                file = %self.path.display(),
                bytes = self.bytes_written,
                "Recording abandoned before close, header still reports 0 payload bytes"
            );
        }
    }
}
