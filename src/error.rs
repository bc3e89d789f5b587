use std::path::PathBuf;

use miette::Diagnostic;
use thiserror::Error;

#[derive(Debug, Error, Diagnostic)]
pub enum MirrorError {
    #[error("request to {url} failed: {message}")]
    Transport { url: String, message: String },

    #[error("{url} returned status {status}")]
    Status { url: String, status: u16 },

    #[error("unexpected response from {url}: {message}")]
    Decode { url: String, message: String },

    #[error("filesystem error: {0}")]
    #[diagnostic(help("check permissions and free space of the archive directory"))]
    Filesystem(String),

    #[error("invalid item index: {0}")]
    InvalidIndex(String),

    #[error("failed to read config file at {0}")]
    ConfigRead(PathBuf),

    #[error("failed to parse JSON config: {0}")]
    ConfigParse(String),

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
}

impl MirrorError {
    /// Filesystem failures poison the whole run; everything else only costs
    /// the item that hit it.
    pub fn is_fatal(&self) -> bool {
        matches!(self, MirrorError::Filesystem(_))
    }
}
