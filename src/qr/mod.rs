//! QR code decoding
//!
//! Turns image files into the raw text payloads of every QR code they contain.

mod decoder;

pub use decoder::QrDecoder;

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// A decoded QR code payload
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QrPayload {
    /// The decoded text
    pub text: String,
    /// Image the code was found in
    pub source: PathBuf,
    /// Position of the code among the grids detected in `source`
    pub index: usize,
}

impl QrPayload {
    /// Create a payload for the `index`-th code found in `source`.
    pub fn new(text: impl Into<String>, source: impl Into<PathBuf>, index: usize) -> Self {
        Self {
            text: text.into(),
            source: source.into(),
            index,
        }
    }

    /// Get the payload text
    pub fn as_str(&self) -> &str {
        &self.text
    }
}
