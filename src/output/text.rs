//! Plain-text trace writer.

use super::validate_path;
use crate::utils::error::OutputError;
use log::info;
use std::path::Path;

/// Write an already rendered trace to a text file
pub fn write_text(rendered: &str, output_path: impl AsRef<Path>) -> Result<(), OutputError> {
    let output_path = output_path.as_ref();
    validate_path(output_path)?;
    std::fs::write(output_path, rendered)?;
    info!(
        "Rendered trace written to: {} ({} lines)",
        output_path.display(),
        rendered.lines().count()
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_write_text() {
        let temp_dir = tempfile::tempdir().unwrap();
        let path = temp_dir.path().join("out/trace.txt");
        write_text("`---a\n", &path).unwrap();
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "`---a\n");
    }
}
