//! # Error Types Module
//!
//! Questo modulo definisce tutti i tipi di errore custom della pipeline di transcodifica.
//!
//! ## Responsabilità:
//! - Definisce `TranscodeError` enum per categorizzare gli errori per-file
//! - Fornisce messaggi di errore descrittivi e strutturati
//! - Integra con `thiserror` per automatic error conversion
//!
//! ## Categorie di errori:
//! - `MissingInputFile`: File di input inesistente (warning, il batch continua)
//! - `ProbeFailure`: ffprobe non riesce a leggere durata o dimensioni
//! - `EncoderFailure`: HandBrakeCLI termina con errore (nessun retry)
//! - `EncoderTimeout`: L'encoder supera il timeout configurato
//! - `Cancelled`: Encode interrotto dall'utente (Ctrl-C)
//! - `MissingDependency`: Tool esterno mancante (HandBrakeCLI, ffprobe)
//! - `InvalidConfig`: Errori di validazione configurazione
//! - `Io`: Errori di I/O
//!
//! ## Nota:
//! Il caso "dimensione target irraggiungibile" non è un errore ma un esito
//! (`TranscodeOutcome::SizeTargetUnreachable`).
//!
//! ## Esempio:
//! ```rust,ignore
//! if !path.exists() {
//!     return Err(TranscodeError::MissingInputFile { path });
//! }
//! ```

use std::path::PathBuf;

/// Errors produced while transcoding a single file
#[derive(thiserror::Error, Debug)]
pub enum TranscodeError {
    #[error("Input file not found: {}", path.display())]
    MissingInputFile { path: PathBuf },

    #[error("Failed to probe {}: {reason}", path.display())]
    ProbeFailure { path: PathBuf, reason: String },

    #[error("Encoder failed: {reason}")]
    EncoderFailure {
        reason: String,
        stderr: Option<String>,
    },

    #[error("Encoder timed out after {timeout_secs} seconds")]
    EncoderTimeout { timeout_secs: u64 },

    #[error("Transcode cancelled")]
    Cancelled,

    #[error("Dependency missing: {0}")]
    MissingDependency(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl TranscodeError {
    /// Creates a probe failure for the given path
    pub fn probe_failed(path: &std::path::Path, reason: impl Into<String>) -> Self {
        Self::ProbeFailure {
            path: path.to_path_buf(),
            reason: reason.into(),
        }
    }

    /// Creates an encoder failure carrying the tail of the encoder's stderr
    pub fn encoder_failed(reason: impl Into<String>, stderr: Option<String>) -> Self {
        Self::EncoderFailure {
            reason: reason.into(),
            stderr,
        }
    }
}
