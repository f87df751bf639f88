use std::time::Instant;

use tracing::{debug, info, warn};

use super::protocol::StreamEvent;
use crate::audio::{
    AudioSink, RecorderState, RecordingFactory, RecordingInfo, StreamRecorder, StreamStats,
};
use crate::error::{RecorderError, Result};

#[derive(Debug)]
pub enum SessionStatus {
    /// Still accepting frames
    Recording,
    /// Close handled, header finalized
    Finished(RecordingInfo),
}

/// Per-connection state, fed one event at a time in arrival order
///
/// Owned by exactly one connection task, so append and finalize can never
/// race each other.
pub struct ConnectionSession {
    factory: RecordingFactory,
    recorder: Option<StreamRecorder>,
    stats: StreamStats,
}

impl ConnectionSession {
    pub fn new(factory: RecordingFactory) -> Self {
        Self {
            factory,
            recorder: None,
            stats: StreamStats::new(),
        }
    }

    pub fn handle(&mut self, event: StreamEvent<'_>) -> Result<SessionStatus> {
        self.handle_at(event, Instant::now())
    }

    pub fn stats(&self) -> &StreamStats {
        &self.stats
    }

    pub fn recorder(&self) -> Option<&StreamRecorder> {
        self.recorder.as_ref()
    }

    fn handle_at(&mut self, event: StreamEvent<'_>, now: Instant) -> Result<SessionStatus> {
        match event {
            StreamEvent::Opened => {
                if let Some(recorder) = &self.recorder {
                    return Err(match recorder.state() {
                        RecorderState::Finalized => RecorderError::RecorderClosed,
                        _ => RecorderError::AlreadyOpened,
                    });
                }
                let mut recorder = self.factory.create()?;
                recorder.open()?;
                self.recorder = Some(recorder);
                Ok(SessionStatus::Recording)
            }
            StreamEvent::Binary(chunk) => {
                let recorder = self.recorder.as_mut().ok_or(RecorderError::NotOpen)?;
                recorder.append(chunk)?;

                let moment = self.stats.record_frame(chunk.len(), now);
                debug!(
                    frames = self.stats.frames,
                    moment_kbps = moment.unwrap_or_default(),
                    avg_kbps = self.stats.average_kbps(now).unwrap_or_default(),
                    avg_len = self.stats.average_frame_len(),
                    "Frame stored"
                );
                Ok(SessionStatus::Recording)
            }
            StreamEvent::NonBinary(kind) => {
                self.stats.record_rejected();
                warn!("Received non-binary message ({:?}), ignored", kind);
                Ok(SessionStatus::Recording)
            }
            StreamEvent::Closed => {
                let recorder = self.recorder.as_mut().ok_or(RecorderError::NotOpen)?;
                let info = recorder.finalize()?;
                info.log_summary();
                info!(
                    frames = self.stats.frames,
                    rejected = self.stats.rejected,
                    avg_kbps = self.stats.average_kbps(now).unwrap_or_default(),
                    avg_len = self.stats.average_frame_len(),
                    "Stream closed"
                );
                Ok(SessionStatus::Finished(info))
            }
        }
    }
}
