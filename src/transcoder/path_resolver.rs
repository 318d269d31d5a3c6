//! # Path Resolution Module
//!
//! Centralizza il calcolo dei path di output.
//!
//! - Output finale: `<parent>/<stem><suffix>.mp4`, accanto all'input
//! - Output temporaneo: file nascosto nella stessa directory, rinominato
//!   sull'output finale solo dopo che l'encoder ha terminato con successo

use crate::error::TranscodeError;
use std::path::{Path, PathBuf};
use tempfile::TempPath;
use tracing::debug;

const OUTPUT_EXTENSION: &str = "mp4";

/// Computes output locations for transcoded files
pub struct PathResolver;

impl PathResolver {
    /// Output path for an input: same directory, stem plus suffix, `.mp4`
    pub fn output_path(input_path: &Path, suffix: &str) -> Result<PathBuf, TranscodeError> {
        let file_stem = input_path.file_stem().ok_or_else(|| {
            TranscodeError::Io(std::io::Error::new(
                std::io::ErrorKind::InvalidInput,
                format!("Invalid file name: {}", input_path.display()),
            ))
        })?;

        let filename = format!("{}{}.{}", file_stem.to_string_lossy(), suffix, OUTPUT_EXTENSION);
        let output = input_path.with_file_name(filename);
        debug!("Resolved output path: {} -> {}", input_path.display(), output.display());
        Ok(output)
    }

    /// Temporary sibling of `output_path` for the encoder to write into.
    /// Deleted on drop unless persisted.
    pub fn temp_output(output_path: &Path) -> Result<TempPath, TranscodeError> {
        let dir = match output_path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        };

        let file = tempfile::Builder::new()
            .prefix(".")
            .suffix(&format!(".{}", OUTPUT_EXTENSION))
            .tempfile_in(dir)?;
        Ok(file.into_temp_path())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_output_path() {
        let output = PathResolver::output_path(Path::new("/videos/holiday.mov"), "-encoded").unwrap();
        assert_eq!(output, PathBuf::from("/videos/holiday-encoded.mp4"));

        let output = PathResolver::output_path(Path::new("clip.mp4"), "_small").unwrap();
        assert_eq!(output, PathBuf::from("clip_small.mp4"));
    }

    #[test]
    fn test_output_path_rejects_empty_name() {
        assert!(PathResolver::output_path(Path::new("/"), "-encoded").is_err());
    }

    #[test]
    fn test_temp_output_is_sibling_and_cleaned_up() {
        let dir = TempDir::new().unwrap();
        let output = dir.path().join("clip-encoded.mp4");

        let temp = PathResolver::temp_output(&output).unwrap();
        assert_eq!(temp.parent(), Some(dir.path()));
        assert!(temp.exists());

        let temp_path = temp.to_path_buf();
        drop(temp);
        assert!(!temp_path.exists());
    }
}
