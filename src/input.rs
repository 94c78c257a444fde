//! Input file selection

use crate::error::{Error, Result};
use std::path::{Path, PathBuf};

/// Image extensions accepted as QR sources (compared lowercase).
pub const VALID_EXTENSIONS: &[&str] = &["png", "jpg", "jpeg", "bmp", "gif"];

/// Whether `path` carries one of [`VALID_EXTENSIONS`].
pub fn has_valid_extension(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| VALID_EXTENSIONS.contains(&ext.to_ascii_lowercase().as_str()))
        .unwrap_or(false)
}

/// Keep the paths that exist and look like supported images.
///
/// Rejected paths are logged and skipped. Returns [`Error::NoInputFiles`]
/// when nothing is left.
pub fn validate_inputs(paths: &[PathBuf]) -> Result<Vec<PathBuf>> {
    let mut accepted = Vec::with_capacity(paths.len());

    for path in paths {
        if !path.exists() {
            tracing::info!("Skipping '{}' as the file does not exist.", path.display());
        } else if !has_valid_extension(path) {
            tracing::error!(
                "Wrong extension skipped {} as it is not a supported image file type.",
                path.display()
            );
        } else {
            accepted.push(path.clone());
        }
    }

    if accepted.is_empty() {
        return Err(Error::NoInputFiles);
    }

    tracing::info!("Processing files:");
    for path in &accepted {
        tracing::info!("{}", path.display());
    }

    Ok(accepted)
}
