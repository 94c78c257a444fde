//! Error types for qrtrace operations

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias using qrtrace's Error type
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for qrtrace operations
#[derive(Error, Debug)]
pub enum Error {
    /// None of the supplied paths is a readable, supported image
    #[error("No files to process")]
    NoInputFiles,

    /// Decoding finished without a single URL-like string
    #[error("No URLs to submit")]
    NoUrlsFound,

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Image processing error
    #[error("Image processing error: {0}")]
    Image(String),

    /// JSON encoding/decoding error
    #[error("JSON error: {0}")]
    Json(String),

    /// Transport-level HTTP failure
    #[error("HTTP error: {0}")]
    Http(String),

    /// The reputation service answered with an error or an unexpected body
    #[error("Reputation service error: {0}")]
    Reputation(String),

    /// WebDriver session or driver process failure
    #[error("Browser error: {0}")]
    Browser(String),

    /// A screenshot could not be taken or written; evidence capture stops here
    #[error("Failed to save screenshot at {}: {reason}", path.display())]
    ScreenshotFailed {
        /// Destination that could not be written
        path: PathBuf,
        /// Underlying cause
        reason: String,
    },

    /// Report document could not be built or written
    #[error("Report error: {0}")]
    Report(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// A setting required by the current stage is absent
    #[error("Missing configuration: {0}")]
    MissingConfig(String),

    /// Generic error
    #[error("{0}")]
    Other(String),
}

// Implement From conversions for common error types

impl From<image::ImageError> for Error {
    fn from(e: image::ImageError) -> Self {
        Error::Image(e.to_string())
    }
}

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Error::Json(e.to_string())
    }
}

impl From<reqwest::Error> for Error {
    fn from(e: reqwest::Error) -> Self {
        Error::Http(e.to_string())
    }
}

impl From<zip::result::ZipError> for Error {
    fn from(e: zip::result::ZipError) -> Self {
        Error::Report(format!("Zip error: {}", e))
    }
}
