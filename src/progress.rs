//! # Progress Tracking and Statistics Module
//!
//! Questo modulo gestisce le progress bar e le statistiche del batch.
//!
//! ## Componenti principali:
//! - `ProgressManager`: barra del batch (file completati) e barra dell'encode corrente
//! - `TranscodeStats`: contatori cumulativi per il report finale
//!
//! ## Visual feedback:
//! ```text
//! ⠋ [00:02:15] [=========>------------------------------] 1/4 (25%) [OK] holiday.mov: 7012 KB
//!   encode 2/2 [==========================>-------------]  67% ETA 00h00m41s
//! ```

use crate::file_manager::FileManager;
use crate::transcoder::TranscodeOutcome;
use indicatif::{MultiProgress, ProgressBar, ProgressDrawTarget, ProgressStyle};
use std::time::Duration;

/// Manages the batch bar and the per-encode bar
#[derive(Clone)]
pub struct ProgressManager {
    multi: MultiProgress,
    bar: ProgressBar,
}

impl ProgressManager {
    /// Create a new progress manager
    pub fn new(total_files: u64) -> Self {
        Self::with_target(total_files, ProgressDrawTarget::stderr())
    }

    /// Progress manager that draws nothing (JSON mode, tests)
    pub fn hidden(total_files: u64) -> Self {
        Self::with_target(total_files, ProgressDrawTarget::hidden())
    }

    fn with_target(total_files: u64, target: ProgressDrawTarget) -> Self {
        let multi = MultiProgress::with_draw_target(target);
        let bar = multi.add(ProgressBar::new(total_files));

        if let Ok(style) = ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} ({percent}%) {msg}")
        {
            bar.set_style(style.progress_chars("=>-"));
        }
        bar.enable_steady_tick(Duration::from_millis(100));

        Self { multi, bar }
    }

    /// Advance the batch bar with a message
    pub fn update(&self, message: &str) {
        self.bar.inc(1);
        self.bar.set_message(message.to_string());
    }

    /// Set a custom message without incrementing
    pub fn set_message(&self, message: &str) {
        self.bar.set_message(message.to_string());
    }

    /// Bar for a single encoder run, percent based
    pub fn encode_bar(&self, label: &str) -> ProgressBar {
        let bar = self.multi.add(ProgressBar::new(100));
        if let Ok(style) = ProgressStyle::default_bar().template("  {prefix} [{bar:40.green/white}] {pos:>3}% {msg}") {
            bar.set_style(style.progress_chars("=>-"));
        }
        bar.set_prefix(label.to_string());
        bar
    }

    /// Finish with a final message
    pub fn finish(&self, message: &str) {
        self.bar.finish_with_message(message.to_string());
    }
}

/// Statistics tracker for a batch
#[derive(Debug, Default, Clone)]
pub struct TranscodeStats {
    pub files_processed: usize,
    pub files_transcoded: usize,
    pub files_skipped: usize,
    pub files_unreachable: usize,
    pub files_cancelled: usize,
    pub errors: usize,
    pub warnings: usize,
    pub total_bytes_saved: u64,
    pub total_original_size: u64,
}

impl TranscodeStats {
    pub fn new() -> Self {
        Self::default()
    }

    /// Count a finished file. `original_size` is the input size when known.
    pub fn record(&mut self, outcome: &TranscodeOutcome, original_size: Option<u64>) {
        self.files_processed += 1;
        match outcome {
            TranscodeOutcome::Skipped { .. } => self.files_skipped += 1,
            TranscodeOutcome::Transcoded { size_kb, .. } => {
                self.files_transcoded += 1;
                if let Some(original) = original_size {
                    let new_size = (size_kb * 1000.0).round() as u64;
                    self.total_original_size += original;
                    self.total_bytes_saved += original.saturating_sub(new_size);
                }
            }
            TranscodeOutcome::SizeTargetUnreachable { .. } => self.files_unreachable += 1,
            TranscodeOutcome::Cancelled => self.files_cancelled += 1,
            TranscodeOutcome::Failed(_) => self.errors += 1,
        }
    }

    pub fn add_warning(&mut self) {
        self.warnings += 1;
    }

    /// True when a file failed or could not be brought under the ceiling
    pub fn has_failures(&self) -> bool {
        self.errors > 0 || self.files_unreachable > 0
    }

    pub fn overall_reduction_percent(&self) -> f64 {
        if self.total_original_size > 0 {
            (self.total_bytes_saved as f64 / self.total_original_size as f64) * 100.0
        } else {
            0.0
        }
    }

    pub fn format_summary(&self) -> String {
        format!(
            "Processed: {} files | Transcoded: {} | Skipped: {} | Unreachable: {} | Cancelled: {} | Errors: {} | Total saved: {} ({:.2}%)",
            self.files_processed,
            self.files_transcoded,
            self.files_skipped,
            self.files_unreachable,
            self.files_cancelled,
            self.errors,
            FileManager::format_size(self.total_bytes_saved),
            self.overall_reduction_percent()
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::TranscodeError;
    use std::path::PathBuf;

    #[test]
    fn test_stats_record() {
        let mut stats = TranscodeStats::new();
        stats.record(
            &TranscodeOutcome::Transcoded {
                attempts_used: 0,
                encodes: 1,
                output_path: PathBuf::from("a-encoded.mp4"),
                size_kb: 7000.0,
            },
            Some(10_000_000),
        );
        stats.record(&TranscodeOutcome::Skipped { size_kb: 10.0 }, Some(10_000));
        stats.record(&TranscodeOutcome::Failed(TranscodeError::Cancelled), None);

        assert_eq!(stats.files_processed, 3);
        assert_eq!(stats.files_transcoded, 1);
        assert_eq!(stats.files_skipped, 1);
        assert_eq!(stats.errors, 1);
        assert_eq!(stats.total_bytes_saved, 3_000_000);
        assert!((stats.overall_reduction_percent() - 30.0).abs() < 1e-9);
        assert!(stats.has_failures());
    }

    #[test]
    fn test_unreachable_is_a_failure() {
        let mut stats = TranscodeStats::new();
        stats.record(&TranscodeOutcome::Cancelled, None);
        assert!(!stats.has_failures());

        stats.record(
            &TranscodeOutcome::SizeTargetUnreachable {
                encodes: 3,
                last_size_kb: 9000.0,
            },
            None,
        );
        assert!(stats.has_failures());
        assert!(stats.format_summary().contains("Unreachable: 1"));
    }
}
