use std::io;
use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

/// Errors raised while reading `config.toml`
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config at {path:?}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("invalid config at {path:?}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
}

/// Errors from the persisted session record
#[derive(Debug, Error)]
pub enum SessionError {
    #[error("session file is corrupt at {path:?}: {source}")]
    Corrupt {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("failed to encode session: {0}")]
    Encode(#[source] serde_json::Error),
    #[error("session io error: {0}")]
    Io(#[from] io::Error),
}

/// Errors from the image decoder collaborator
#[derive(Debug, Error)]
pub enum DecodeError {
    #[error("unsupported image format: {0:?}")]
    Unsupported(PathBuf),
    #[error("failed to open {path:?}: {source}")]
    Open {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("failed to decode {path:?}: {source}")]
    Image {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },
}

/// Errors on the argument channel between a secondary and the primary
#[derive(Debug, Error)]
pub enum ChannelError {
    #[error("message of {0} bytes exceeds the frame limit")]
    FrameTooLarge(usize),
    #[error("failed to encode arguments: {0}")]
    Encode(#[from] serde_json::Error),
    #[error("timed out after {0:?}")]
    Timeout(Duration),
    #[error("channel io error: {0}")]
    Io(#[from] io::Error),
}

/// A single command failed; the queue keeps running
#[derive(Debug, Error)]
pub enum CommandError {
    #[error(transparent)]
    Session(#[from] SessionError),
    #[error("background task failed: {0}")]
    Task(String),
}

/// Lifecycle errors of the command queue
#[derive(Debug, Error)]
pub enum QueueError {
    #[error("command queue is already running")]
    AlreadyStarted,
    #[error("command queue consumer faulted: {0}")]
    ConsumerFaulted(String),
    #[error("command queue did not stop within {0:?}")]
    ShutdownTimedOut(Duration),
    #[error("command queue is closed")]
    Closed,
}
