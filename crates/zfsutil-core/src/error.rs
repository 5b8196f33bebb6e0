//! Error type shared by zfsutil crates.

use std::time::Duration;
use thiserror::Error;

pub type ZfsUtilResult<T> = Result<T, ZfsUtilError>;

#[derive(Debug, Error)]
pub enum ZfsUtilError {
    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("could not fork {binary}: {reason}")]
    Fork { binary: String, reason: String },

    #[error("{binary} timed out after {after:?}")]
    Timeout { binary: String, after: Duration },

    #[error("{0} reader thread panicked")]
    ReaderPanicked(&'static str),

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error(transparent)]
    Toml(#[from] toml::de::Error),
}
