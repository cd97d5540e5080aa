//! JSON trace document writer.
//!
//! Writes finished trace trees to versioned JSON files so they can be
//! inspected or re-rendered later.

use super::validate_path;
use crate::trace::TraceTree;
use crate::utils::config::TRACE_SCHEMA_VERSION;
use crate::utils::error::OutputError;
use chrono::Utc;
use log::{debug, info, warn};
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::{BufReader, BufWriter};
use std::path::Path;

/// A trace tree with the context it was captured in
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TraceDocument {
    /// Schema version of this document
    pub version: String,
    /// Session the trace was collected from
    pub session_id: String,
    /// RFC 3339 timestamp
    pub generated_at: String,
    pub tree: TraceTree,
}

impl TraceDocument {
    /// Wrap `tree` stamped with the current schema version and time
    pub fn new(session_id: impl Into<String>, tree: TraceTree) -> Self {
        Self {
            version: TRACE_SCHEMA_VERSION.to_string(),
            session_id: session_id.into(),
            generated_at: Utc::now().to_rfc3339(),
            tree,
        }
    }
}

/// Write a trace document as pretty-printed JSON
///
/// Parent directories are created as needed.
///
/// # Errors
/// * `OutputError::InvalidPath` - empty path, a directory, or parent cannot be created
/// * `OutputError::WriteFailed` - I/O error during write
/// * `OutputError::SerializationFailed` - JSON serialization error
pub fn write_trace(
    document: &TraceDocument,
    output_path: impl AsRef<Path>,
) -> Result<(), OutputError> {
    let output_path = output_path.as_ref();
    info!("Writing trace to: {}", output_path.display());

    validate_path(output_path)?;

    let file = File::create(output_path)?;
    serde_json::to_writer_pretty(BufWriter::new(file), document)?;

    info!(
        "Trace written successfully ({} nodes, {} bytes)",
        document.tree.len(),
        file_size(output_path)
    );
    Ok(())
}

/// Read a trace document back from disk
///
/// The tree is not validated here; rendering reports structural problems.
///
/// # Errors
/// * `OutputError::WriteFailed` - file read error (I/O errors share the variant)
/// * `OutputError::SerializationFailed` - JSON parse error
pub fn read_trace(input_path: impl AsRef<Path>) -> Result<TraceDocument, OutputError> {
    let input_path = input_path.as_ref();
    debug!("Reading trace from: {}", input_path.display());

    let file = File::open(input_path)?;
    let document: TraceDocument = serde_json::from_reader(BufReader::new(file))?;

    if document.version != TRACE_SCHEMA_VERSION {
        warn!(
            "Trace document version {} differs from supported version {}",
            document.version, TRACE_SCHEMA_VERSION
        );
    }
    debug!(
        "Trace loaded: session {}, {} nodes",
        document.session_id,
        document.tree.len()
    );
    Ok(document)
}

fn file_size(path: &Path) -> u64 {
    std::fs::metadata(path).map(|m| m.len()).unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::trace::{CallSite, ThreadNode, TraceBuilder};
    use chrono::NaiveDate;
    use tempfile::NamedTempFile;

    fn create_test_document() -> TraceDocument {
        let ts = NaiveDate::from_ymd_opt(2024, 1, 1)
            .unwrap()
            .and_hms_opt(12, 0, 0)
            .unwrap();
        let mut builder = TraceBuilder::new(ThreadNode::new(ts, "main", 1));
        let id = builder.open_call(CallSite::new("demo.Svc", "run", 7));
        builder.close_call(id, 1_500_000).unwrap();
        TraceDocument::new("s1", builder.finish())
    }

    #[test]
    fn test_write_and_read_trace() {
        let document = create_test_document();
        let temp_file = NamedTempFile::new().unwrap();

        write_trace(&document, temp_file.path()).unwrap();
        let loaded = read_trace(temp_file.path()).unwrap();

        assert_eq!(loaded, document);
        assert_eq!(loaded.version, TRACE_SCHEMA_VERSION);
    }

    #[test]
    fn test_write_creates_parent_dirs() {
        let temp_dir = tempfile::tempdir().unwrap();
        let nested_path = temp_dir.path().join("nested/dirs/trace.json");

        write_trace(&create_test_document(), &nested_path).unwrap();
        assert!(nested_path.exists());
    }

    #[test]
    fn test_read_rejects_garbage() {
        let temp_file = NamedTempFile::new().unwrap();
        std::fs::write(temp_file.path(), "not json").unwrap();
        assert!(matches!(
            read_trace(temp_file.path()),
            Err(OutputError::SerializationFailed(_))
        ));
    }

    #[test]
    fn test_read_missing_file() {
        let temp_dir = tempfile::tempdir().unwrap();
        assert!(matches!(
            read_trace(temp_dir.path().join("missing.json")),
            Err(OutputError::WriteFailed(_))
        ));
    }
}
