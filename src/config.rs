use std::path::PathBuf;
use std::str::FromStr;

use tracing::info;

use crate::audio::AudioFormatParams;
use crate::error::{RecorderError, Result};

pub const HOST_VAR: &str = "RECORDER_HOST";
pub const PORT_VAR: &str = "RECORDER_PORT";
pub const OUTPUT_DIR_VAR: &str = "RECORDER_OUTPUT_DIR";
pub const SAMPLE_RATE_VAR: &str = "RECORDER_SAMPLE_RATE";
pub const CHANNELS_VAR: &str = "RECORDER_CHANNELS";
pub const BITS_VAR: &str = "RECORDER_BITS_PER_SAMPLE";

/// Runtime settings, read from the environment (and `.env` via dotenv)
#[derive(Debug, Clone)]
pub struct RecorderConfig {
    pub host: String,
    pub port: u16,
    /// Dir where WAV files are saved
    pub output_dir: PathBuf,
    /// PCM layout the device streams, fixed for the whole process
    pub format: AudioFormatParams,
}

impl Default for RecorderConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8080,
            output_dir: PathBuf::from("."),
            format: AudioFormatParams::default(),
        }
    }
}

impl RecorderConfig {
    /// Load Config from env, unset keys fall back to defaults
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Same as `from_env` with an arbitrary key -> value source
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let defaults = Self::default();
        let default_format = defaults.format;

        let format = AudioFormatParams::new(
            parse_or(&lookup, SAMPLE_RATE_VAR, default_format.sample_rate())?,
            parse_or(&lookup, CHANNELS_VAR, default_format.channels())?,
            parse_or(&lookup, BITS_VAR, default_format.bits_per_sample())?,
        )?;

        Ok(Self {
            host: lookup(HOST_VAR).unwrap_or(defaults.host),
            port: parse_or(&lookup, PORT_VAR, defaults.port)?,
            output_dir: lookup(OUTPUT_DIR_VAR)
                .map(PathBuf::from)
                .unwrap_or(defaults.output_dir),
            format,
        })
    }

    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    pub fn log_summary(&self) {
        info!("Configs loaded:");
        info!("  Listen: {}", self.bind_addr());
        info!("  Output dir: {}", self.output_dir.display());
        info!(
            "  Format: {} Hz, {} ch, {} bit ({} B/s)",
            self.format.sample_rate(),
            self.format.channels(),
            self.format.bits_per_sample(),
            self.format.byte_rate()
        );
    }
}

fn parse_or<T: FromStr>(
    lookup: &impl Fn(&str) -> Option<String>,
    key: &'static str,
    default: T,
) -> Result<T> {
    match lookup(key) {
        None => Ok(default),
        Some(raw) => raw
            .trim()
            .parse()
            .map_err(|_| RecorderError::Config { key, value: raw }),
    }
}
