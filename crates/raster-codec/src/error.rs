//! Error types for raster encoding and decoding.

use std::path::Path;

use raster_core::RasterError;
use thiserror::Error;

/// Errors that can occur while reading or writing raster files.
#[derive(Error, Debug)]
pub enum CodecError {
    /// The input path does not exist.
    #[error("file not found: {0}")]
    FileNotFound(String),

    /// The file exists but could not be parsed.
    #[error("unreadable raster: {0}")]
    UnreadableFormat(String),

    /// The format, or this use of it, is not supported.
    #[error("unsupported format: {0}")]
    UnsupportedFormat(String),

    /// Writing the output failed.
    #[error("failed to write raster: {0}")]
    WriteError(String),

    /// Configuration error.
    #[error("configuration error: {0}")]
    Config(String),

    /// Decoded data did not form a valid raster.
    #[error(transparent)]
    Raster(#[from] RasterError),
}

impl CodecError {
    /// Create a FileNotFound error for a path.
    pub fn file_not_found(path: &Path) -> Self {
        Self::FileNotFound(path.display().to_string())
    }

    /// Create an UnreadableFormat error.
    pub fn unreadable(msg: impl Into<String>) -> Self {
        Self::UnreadableFormat(msg.into())
    }

    /// Create an UnsupportedFormat error.
    pub fn unsupported(msg: impl Into<String>) -> Self {
        Self::UnsupportedFormat(msg.into())
    }

    /// Create a WriteError.
    pub fn write(msg: impl Into<String>) -> Self {
        Self::WriteError(msg.into())
    }
}

impl From<std::io::Error> for CodecError {
    fn from(err: std::io::Error) -> Self {
        match err.kind() {
            std::io::ErrorKind::NotFound => Self::FileNotFound(err.to_string()),
            _ => Self::UnreadableFormat(err.to_string()),
        }
    }
}

impl From<serde_json::Error> for CodecError {
    fn from(err: serde_json::Error) -> Self {
        Self::UnreadableFormat(err.to_string())
    }
}

/// Result type for codec operations.
pub type Result<T> = std::result::Result<T, CodecError>;
