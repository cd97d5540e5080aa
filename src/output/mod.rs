//! Output writers for trace data.
//!
//! This module handles writing data to disk in various formats:
//! - JSON trace documents (readable back for re-rendering)
//! - Rendered text trees

pub mod json;
pub mod text;

use crate::utils::error::OutputError;
use log::debug;
use std::path::Path;

// Re-export main functions
pub use json::{read_trace, write_trace, TraceDocument};
pub use text::write_text;

/// Check that `path` can be written, creating missing parent directories
///
/// # Errors
/// * `OutputError::InvalidPath` - empty path, an existing directory, or an uncreatable parent
pub fn validate_path(path: &Path) -> Result<(), OutputError> {
    if path.as_os_str().is_empty() {
        return Err(OutputError::InvalidPath("Path is empty".to_string()));
    }

    if path.is_dir() {
        return Err(OutputError::InvalidPath(format!(
            "Path is a directory: {}",
            path.display()
        )));
    }

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        if !parent.exists() {
            debug!("Creating parent directories: {}", parent.display());
            std::fs::create_dir_all(parent).map_err(|e| {
                OutputError::InvalidPath(format!(
                    "Cannot create directory {}: {}",
                    parent.display(),
                    e
                ))
            })?;
        }
    }

    Ok(())
}
