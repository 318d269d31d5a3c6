//! # File Management Module
//!
//! Questo modulo gestisce tutte le operazioni sui file.
//!
//! ## Responsabilità:
//! - "SizeProbe": lettura dimensione in byte dei file (input e output)
//! - Espansione ricorsiva delle directory passate da command line
//! - Determinazione formato file video
//! - Rimozione output parziali dopo errori o cancellazione
//! - Formattazione human-readable delle dimensioni
//!
//! ## Formati video riconosciuti durante l'espansione:
//! MP4, M4V, MOV, AVI, MKV, WebM, WMV, FLV, MPG/MPEG, TS
//!
//! ## Unità:
//! I kilobyte sono decimali (1 KB = 1000 byte), come il tetto di output.
//!
//! ## Esempio:
//! ```rust,ignore
//! let inputs = FileManager::expand_inputs(&args.inputs, "-encoded");
//! let size = FileManager::get_file_size(&inputs[0]).await?;
//! ```

use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::debug;
use walkdir::WalkDir;

/// Manages file operations and discovery
pub struct FileManager;

impl FileManager {
    /// Byte size of the file at `path`
    pub async fn get_file_size(path: &Path) -> std::io::Result<u64> {
        Ok(fs::metadata(path).await?.len())
    }

    /// Convert bytes to decimal kilobytes
    pub fn bytes_to_kb(bytes: u64) -> f64 {
        bytes as f64 / 1000.0
    }

    /// Expand the command line inputs into the list of files to transcode.
    ///
    /// Directories are walked recursively and contribute their video files
    /// (sorted, previous outputs excluded). Everything else is kept as given,
    /// including paths that do not exist, so the caller can report them.
    pub fn expand_inputs(inputs: &[PathBuf], output_suffix: &str) -> Vec<PathBuf> {
        let mut files = Vec::new();

        for input in inputs {
            if !input.is_dir() {
                files.push(input.clone());
                continue;
            }

            let mut found: Vec<PathBuf> = WalkDir::new(input)
                .into_iter()
                .filter_map(|e| e.ok())
                .filter(|e| e.file_type().is_file())
                .map(|e| e.into_path())
                .filter(|path| Self::is_video(path) && !Self::is_output_file(path, output_suffix))
                .collect();
            found.sort();

            debug!("Found {} video files in {}", found.len(), input.display());
            files.extend(found);
        }

        files
    }

    /// Check if a file is a video
    pub fn is_video(path: &Path) -> bool {
        if let Some(ext) = path.extension() {
            let ext_lower = ext.to_string_lossy().to_lowercase();
            matches!(
                ext_lower.as_str(),
                "mp4" | "m4v" | "mov" | "avi" | "mkv" | "webm" | "wmv" | "flv" | "mpg" | "mpeg" | "ts"
            )
        } else {
            false
        }
    }

    /// Whether a file looks like something this tool produced
    pub fn is_output_file(path: &Path, output_suffix: &str) -> bool {
        path.file_stem()
            .map(|stem| stem.to_string_lossy().ends_with(output_suffix))
            .unwrap_or(false)
    }

    /// Remove a file if present, ignoring "not found"
    pub async fn remove_if_exists(path: &Path) -> std::io::Result<()> {
        match fs::remove_file(path).await {
            Ok(()) => {
                debug!("Removed {}", path.display());
                Ok(())
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e),
        }
    }

    /// Get human-readable file size
    pub fn format_size(size: u64) -> String {
        const UNITS: &[&str] = &["B", "KB", "MB", "GB", "TB"];
        let mut size = size as f64;
        let mut unit_index = 0;

        while size >= 1000.0 && unit_index < UNITS.len() - 1 {
            size /= 1000.0;
            unit_index += 1;
        }

        if unit_index == 0 {
            format!("{} {}", size as u64, UNITS[unit_index])
        } else {
            format!("{:.2} {}", size, UNITS[unit_index])
        }
    }
}
