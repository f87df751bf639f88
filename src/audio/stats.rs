use std::time::Instant;

/// Throughput counters for one connection
#[derive(Debug, Clone, Copy, Default)]
pub struct StreamStats {
    pub frames: u64,
    pub bytes: u64,
    /// Text or otherwise non-binary frames that were dropped
    pub rejected: u64,
    first_frame_at: Option<Instant>,
    last_frame_at: Option<Instant>,
}

impl StreamStats {
    pub fn new() -> Self {
        Self::default()
    }

    /// Count one binary frame
    /// **Returns**: kbps since the previous frame, None for the first one
    pub fn record_frame(&mut self, len: usize, now: Instant) -> Option<f64> {
        let moment = self.last_frame_at.map(|last| kbps(len as u64, now - last));
        if self.first_frame_at.is_none() {
            self.first_frame_at = Some(now);
        }
        self.last_frame_at = Some(now);
        self.frames += 1;
        self.bytes += len as u64;
        moment.flatten()
    }

    pub fn record_rejected(&mut self) {
        self.rejected += 1;
    }

    /// kbps over everything since the first frame
    pub fn average_kbps(&self, now: Instant) -> Option<f64> {
        self.first_frame_at
            .and_then(|first| kbps(self.bytes, now - first))
    }

    pub fn average_frame_len(&self) -> f64 {
        if self.frames == 0 {
            0.0
        } else {
            self.bytes as f64 / self.frames as f64
        }
    }
}

// bits per millisecond == kbps
fn kbps(bytes: u64, elapsed: std::time::Duration) -> Option<f64> {
    let millis = elapsed.as_secs_f64() * 1000.0;
    (millis > 0.0).then(|| 8.0 * bytes as f64 / millis)
}
