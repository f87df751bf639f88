use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Everything that can go wrong between a socket frame and a finished WAV file
#[derive(Debug, Error)]
pub enum RecorderError {
    /// Payload no longer fits the 32-bit RIFF size fields
    #[error("payload of {payload_len} bytes does not fit a 32-bit WAV size field")]
    FormatOverflow { payload_len: u64 },

    /// Fewer bytes on disk than a full header, the provisional header never landed
    #[error("file is {size} bytes, smaller than the 44 byte header")]
    InvalidFileSize { size: u64 },

    #[error("storage unavailable ({op} {path:?}): {source}")]
    StorageUnavailable {
        path: PathBuf,
        op: &'static str,
        #[source]
        source: io::Error,
    },

    #[error("recorder already finalized")]
    RecorderClosed,

    #[error("recorder is not open")]
    NotOpen,

    #[error("recorder already opened")]
    AlreadyOpened,

    #[error("invalid audio format: {0}")]
    InvalidFormat(String),

    #[error("malformed WAV header: {0}")]
    MalformedHeader(String),

    #[error("invalid value {value:?} for {key}")]
    Config { key: &'static str, value: String },

    #[error("failed to bind {addr}: {source}")]
    Bind {
        addr: String,
        #[source]
        source: io::Error,
    },

    #[error("listener address unavailable: {0}")]
    LocalAddr(#[source] io::Error),

    #[error("websocket error: {0}")]
    Transport(#[from] tokio_tungstenite::tungstenite::Error),
}

impl RecorderError {
    pub(crate) fn storage(path: impl Into<PathBuf>, op: &'static str, source: io::Error) -> Self {
        Self::StorageUnavailable {
            path: path.into(),
            op,
            source,
        }
    }
}

pub type Result<T> = std::result::Result<T, RecorderError>;
