//! Error handling module for hls-remux

use thiserror::Error;

use crate::domain::errors::{RemuxError, CODE_IO, CODE_UNKNOWN};

/// Main error type for hls-remux operations
#[derive(Error, Debug)]
pub enum HlsRemuxError {
    /// libav global initialization failed
    #[error("Failed to initialize FFmpeg: {message}")]
    FFmpegInitError { message: String },

    /// Configuration file missing, malformed or out of range
    #[error("Configuration error: {message}")]
    ConfigError { message: String },

    /// Logging could not be set up
    #[error("Logging setup failed: {message}")]
    LoggingError { message: String },

    /// A remux or inspection failed
    #[error(transparent)]
    Remux(#[from] RemuxError),

    /// I/O error
    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),
}

impl HlsRemuxError {
    /// Negative status code for the integer entry point
    pub fn code(&self) -> i32 {
        match self {
            HlsRemuxError::Remux(e) => e.code(),
            HlsRemuxError::IoError(_) => CODE_IO,
            _ => CODE_UNKNOWN,
        }
    }
}

/// Result type alias for hls-remux operations
pub type HlsRemuxResult<T> = std::result::Result<T, HlsRemuxError>;
