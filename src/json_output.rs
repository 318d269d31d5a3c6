//! # JSON Output Module
//!
//! Questo modulo gestisce l'output strutturato in JSON (`--json`) per l'uso
//! programmatico del tool (GUI, script).
//!
//! ## Tipi di messaggi (uno per riga su stdout, campo `type`):
//! - `start`: Inizio batch con configurazione effettiva
//! - `file_start`: Inizio elaborazione di un file
//! - `attempt`: Un tentativo di encode con il piano scelto
//! - `encode_progress`: Avanzamento dell'encoder
//! - `file_complete`: Esito di un file
//! - `warning`: Problema non fatale (es. file mancante)
//! - `complete`: Fine batch con statistiche finali

use crate::config::Config;
use crate::planner::EncodePlan;
use crate::progress::TranscodeStats;
use crate::transcoder::TranscodeOutcome;
use serde::Serialize;
use std::path::{Path, PathBuf};

/// Tipo di messaggio JSON
#[derive(Debug, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum JsonMessage {
    Start {
        inputs: Vec<PathBuf>,
        total_files: usize,
        config: JsonConfig,
    },

    FileStart {
        path: PathBuf,
        index: usize,
        total: usize,
    },

    Attempt {
        path: PathBuf,
        encode: u32,
        degrade_attempt: u32,
        bitrate_kbps: f64,
        width: u32,
        height: u32,
        two_pass: bool,
        turbo: bool,
    },

    EncodeProgress {
        path: PathBuf,
        percent: f32,
        eta: Option<String>,
        task: Option<u32>,
        task_count: Option<u32>,
    },

    FileComplete {
        path: PathBuf,
        outcome: &'static str,
        size_kb: Option<f64>,
        encodes: u32,
        attempts_used: Option<u32>,
        output_path: Option<PathBuf>,
        error: Option<String>,
    },

    Warning {
        message: String,
    },

    Complete {
        files_processed: usize,
        files_transcoded: usize,
        files_skipped: usize,
        files_unreachable: usize,
        files_cancelled: usize,
        errors: usize,
        total_bytes_saved: u64,
        duration_seconds: f64,
    },
}

/// Configurazione per output JSON
#[derive(Debug, Serialize)]
pub struct JsonConfig {
    pub target_size_kb: f64,
    pub max_degrade_attempts: u32,
    pub max_total_attempts: u32,
    pub two_pass: bool,
    pub turbo: bool,
    pub output_suffix: String,
}

impl JsonMessage {
    /// Emette il messaggio JSON su stdout
    pub fn emit(&self) {
        if let Ok(json) = serde_json::to_string(self) {
            println!("{}", json);
        }
    }

    pub fn start(inputs: Vec<PathBuf>, total_files: usize, config: &Config) -> Self {
        Self::Start {
            inputs,
            total_files,
            config: config.into(),
        }
    }

    pub fn file_start(path: &Path, index: usize, total: usize) -> Self {
        Self::FileStart {
            path: path.to_path_buf(),
            index,
            total,
        }
    }

    pub fn attempt(path: &Path, plan: &EncodePlan, encode: u32, degrade_attempt: u32) -> Self {
        let (width, height) = plan.dimensions.to_even_pixels();
        Self::Attempt {
            path: path.to_path_buf(),
            encode,
            degrade_attempt,
            bitrate_kbps: plan.target_bitrate_kbps,
            width,
            height,
            two_pass: plan.two_pass,
            turbo: plan.turbo,
        }
    }

    pub fn encode_progress(path: &Path, progress: &crate::encoder::EncodeProgress) -> Self {
        Self::EncodeProgress {
            path: path.to_path_buf(),
            percent: progress.percent,
            eta: progress.eta.clone(),
            task: progress.task.map(|(task, _)| task),
            task_count: progress.task.map(|(_, count)| count),
        }
    }

    /// Crea un messaggio di completamento file a partire dall'esito
    pub fn file_complete(path: &Path, outcome: &TranscodeOutcome) -> Self {
        let (size_kb, encodes, attempts_used, output_path, error) = match outcome {
            TranscodeOutcome::Skipped { size_kb } => (Some(*size_kb), 0, None, None, None),
            TranscodeOutcome::Transcoded {
                attempts_used,
                encodes,
                output_path,
                size_kb,
            } => (Some(*size_kb), *encodes, Some(*attempts_used), Some(output_path.clone()), None),
            TranscodeOutcome::SizeTargetUnreachable { encodes, last_size_kb } => {
                (Some(*last_size_kb), *encodes, None, None, None)
            }
            TranscodeOutcome::Cancelled => (None, 0, None, None, None),
            TranscodeOutcome::Failed(e) => (None, 0, None, None, Some(e.to_string())),
        };

        Self::FileComplete {
            path: path.to_path_buf(),
            outcome: outcome.label(),
            size_kb,
            encodes,
            attempts_used,
            output_path,
            error,
        }
    }

    pub fn warning(message: impl Into<String>) -> Self {
        Self::Warning { message: message.into() }
    }

    pub fn complete(stats: &TranscodeStats, duration_seconds: f64) -> Self {
        Self::Complete {
            files_processed: stats.files_processed,
            files_transcoded: stats.files_transcoded,
            files_skipped: stats.files_skipped,
            files_unreachable: stats.files_unreachable,
            files_cancelled: stats.files_cancelled,
            errors: stats.errors,
            total_bytes_saved: stats.total_bytes_saved,
            duration_seconds,
        }
    }
}

impl From<&Config> for JsonConfig {
    fn from(config: &Config) -> Self {
        Self {
            target_size_kb: config.target_size_kb,
            max_degrade_attempts: config.max_degrade_attempts,
            max_total_attempts: config.max_total_attempts,
            two_pass: config.two_pass,
            turbo: config.turbo,
            output_suffix: config.output_suffix.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::TranscodeError;
    use crate::planner::Dimensions;
    use serde_json::Value;

    fn to_value(message: &JsonMessage) -> Value {
        serde_json::to_value(message).unwrap()
    }

    #[test]
    fn test_messages_are_tagged() {
        let value = to_value(&JsonMessage::warning("Input file not found: a.mp4"));
        assert_eq!(value["type"], "warning");
        assert_eq!(value["message"], "Input file not found: a.mp4");

        let value = to_value(&JsonMessage::start(vec![PathBuf::from("a.mp4")], 1, &Config::default()));
        assert_eq!(value["type"], "start");
        assert_eq!(value["config"]["target_size_kb"], 7999.0);
    }

    #[test]
    fn test_attempt_uses_encoder_pixels() {
        let plan = EncodePlan {
            target_bitrate_kbps: 190.0,
            dimensions: Dimensions::new(903.5, 508.2),
            two_pass: true,
            turbo: true,
        };
        let value = to_value(&JsonMessage::attempt(Path::new("a.mp4"), &plan, 2, 1));
        assert_eq!(value["type"], "attempt");
        assert_eq!(value["width"], 904);
        assert_eq!(value["height"], 508);
        assert_eq!(value["encode"], 2);
    }

    #[test]
    fn test_file_complete_shapes() {
        let done = TranscodeOutcome::Transcoded {
            attempts_used: 1,
            encodes: 2,
            output_path: PathBuf::from("a-encoded.mp4"),
            size_kb: 7000.0,
        };
        let value = to_value(&JsonMessage::file_complete(Path::new("a.mp4"), &done));
        assert_eq!(value["type"], "file_complete");
        assert_eq!(value["outcome"], "transcoded");
        assert_eq!(value["attempts_used"], 1);
        assert_eq!(value["output_path"], "a-encoded.mp4");

        let failed = TranscodeOutcome::Failed(TranscodeError::encoder_failed("boom", None));
        let value = to_value(&JsonMessage::file_complete(Path::new("a.mp4"), &failed));
        assert_eq!(value["outcome"], "failed");
        assert_eq!(value["error"], "Encoder failed: boom");
        assert!(value["size_kb"].is_null());
    }
}
