use crate::error::{RecorderError, Result};

/// PCM layout of the incoming stream
///
/// Only the three base fields are stored, block align and byte rate are
/// always computed from them.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AudioFormatParams {
    sample_rate: u32,
    channels: u16,
    bits_per_sample: u16,
}

impl AudioFormatParams {
    /// Validate and build a format
    /// Args:
    /// - sample_rate: samples per second per channel (Hz)
    /// - channels: interleaved channel count
    /// - bits_per_sample: sample width, must be a whole number of bytes
    pub fn new(sample_rate: u32, channels: u16, bits_per_sample: u16) -> Result<Self> {
        if sample_rate == 0 {
            return Err(RecorderError::InvalidFormat("sample rate must be positive".into()));
        }
        if channels == 0 {
            return Err(RecorderError::InvalidFormat("channel count must be positive".into()));
        }
        if bits_per_sample == 0 || bits_per_sample % 8 != 0 {
            return Err(RecorderError::InvalidFormat(format!(
                "bits per sample must be a positive multiple of 8, got {bits_per_sample}"
            )));
        }

        let block_align = u32::from(channels) * u32::from(bits_per_sample / 8);
        if block_align > u32::from(u16::MAX) {
            return Err(RecorderError::InvalidFormat(format!(
                "block align {block_align} does not fit 16 bits"
            )));
        }
        if u64::from(sample_rate) * u64::from(block_align) > u64::from(u32::MAX) {
            return Err(RecorderError::InvalidFormat(format!(
                "byte rate for {sample_rate} Hz x {block_align} bytes does not fit 32 bits"
            )));
        }

        Ok(Self {
            sample_rate,
            channels,
            bits_per_sample,
        })
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    pub fn channels(&self) -> u16 {
        self.channels
    }

    pub fn bits_per_sample(&self) -> u16 {
        self.bits_per_sample
    }

    /// Bytes per interleaved frame (all channels of one sample instant)
    pub fn block_align(&self) -> u16 {
        self.channels * (self.bits_per_sample / 8)
    }

    /// Bytes per second of audio
    pub fn byte_rate(&self) -> u32 {
        self.sample_rate * u32::from(self.block_align())
    }

    /// Seconds of audio held in `payload_len` bytes
    pub fn duration_seconds(&self, payload_len: u64) -> f64 {
        payload_len as f64 / f64::from(self.byte_rate())
    }
}

impl Default for AudioFormatParams {
    /// ESP32 mic node default: 8 kHz, stereo, 32-bit
    fn default() -> Self {
        Self {
            sample_rate: 8000,
            channels: 2,
            bits_per_sample: 32,
        }
    }
}
