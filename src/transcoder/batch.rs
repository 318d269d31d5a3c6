//! # Batch Transcoder
//!
//! Elabora una lista di input in sequenza, un file alla volta.
//!
//! - Un file mancante produce un warning e un report `Failed`, il batch continua
//! - Dopo una cancellazione nessun nuovo file viene avviato: i restanti sono `Cancelled`

use crate::error::TranscodeError;
use crate::transcoder::controller::TranscodeController;
use crate::transcoder::session::TranscodeOutcome;
use std::path::PathBuf;
use tracing::info;

/// Per-file result of a batch
#[derive(Debug)]
pub struct FileReport {
    pub path: PathBuf,
    pub outcome: TranscodeOutcome,
}

/// Runs the controller over a list of inputs
pub struct BatchTranscoder {
    controller: TranscodeController,
}

impl BatchTranscoder {
    pub fn new(controller: TranscodeController) -> Self {
        Self { controller }
    }

    pub fn controller(&self) -> &TranscodeController {
        &self.controller
    }

    /// Transcode every input in order and report each outcome
    pub async fn run(&self, inputs: &[PathBuf]) -> Vec<FileReport> {
        let tracker = self.controller.tracker();
        let stop = self.controller.stop_signal();
        tracker.start(inputs, self.controller.config());

        let mut reports = Vec::with_capacity(inputs.len());
        for (index, path) in inputs.iter().enumerate() {
            let outcome = if stop.is_fired() {
                TranscodeOutcome::Cancelled
            } else {
                tracker.file_started(path, index);
                self.controller.transcode(path).await
            };

            if let TranscodeOutcome::Failed(ref e @ TranscodeError::MissingInputFile { .. }) = outcome {
                tracker.warning(&e.to_string()).await;
            }

            tracker.file_completed(path, &outcome).await;
            reports.push(FileReport {
                path: path.clone(),
                outcome,
            });
        }

        let stats = tracker.finish().await;
        info!("{}", stats.format_summary());
        reports
    }
}
