//! # Progress Tracking Module
//!
//! Unifica progress bar, eventi JSON e statistiche del batch in un singolo
//! tracker clonabile.
//!
//! I progress dell'encoder arrivano su un canale `mpsc` e vengono drenati da un
//! task dedicato (`forward_progress`): non influenzano mai il controllo del loop.

use crate::config::Config;
use crate::encoder::EncodeProgress;
use crate::file_manager::FileManager;
use crate::json_output::JsonMessage;
use crate::planner::EncodePlan;
use crate::progress::{ProgressManager, TranscodeStats};
use crate::transcoder::TranscodeOutcome;
use crate::utils::display_name;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::{mpsc, Mutex};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

/// Progress tracker shared by the batch and the controller
#[derive(Clone)]
pub struct ProgressTracker {
    pub total_files: usize,
    json_output: bool,
    started: Instant,
    stats: Arc<Mutex<TranscodeStats>>,
    progress_manager: ProgressManager,
}

impl ProgressTracker {
    pub fn new(total_files: usize, json_output: bool) -> Self {
        let progress_manager = if json_output {
            ProgressManager::hidden(total_files as u64)
        } else {
            ProgressManager::new(total_files as u64)
        };

        Self {
            total_files,
            json_output,
            started: Instant::now(),
            stats: Arc::new(Mutex::new(TranscodeStats::new())),
            progress_manager,
        }
    }

    /// Tracker that draws nothing and emits no JSON
    pub fn hidden(total_files: usize) -> Self {
        Self {
            total_files,
            json_output: false,
            started: Instant::now(),
            stats: Arc::new(Mutex::new(TranscodeStats::new())),
            progress_manager: ProgressManager::hidden(total_files as u64),
        }
    }

    pub fn start(&self, inputs: &[PathBuf], config: &Config) {
        if self.json_output {
            JsonMessage::start(inputs.to_vec(), self.total_files, config).emit();
        }
    }

    pub fn file_started(&self, path: &Path, index: usize) {
        info!("[{}/{}] {}", index + 1, self.total_files, path.display());
        if self.json_output {
            JsonMessage::file_start(path, index, self.total_files).emit();
        }
        self.progress_manager
            .set_message(&format!("Processing {}", display_name(path)));
    }

    pub fn attempt_started(&self, path: &Path, plan: &EncodePlan, encode: u32, degrade_attempt: u32) {
        info!(
            "Encode #{} for {} (degrade level {}): {}",
            encode,
            display_name(path),
            degrade_attempt,
            plan
        );
        if self.json_output {
            JsonMessage::attempt(path, plan, encode, degrade_attempt).emit();
        }
    }

    /// Drain encoder progress until the sender side is dropped
    pub fn forward_progress(&self, path: &Path, mut rx: mpsc::Receiver<EncodeProgress>) -> JoinHandle<()> {
        let path = path.to_path_buf();
        let json_output = self.json_output;
        let bar = (!json_output).then(|| self.progress_manager.encode_bar(&display_name(&path)));

        tokio::spawn(async move {
            while let Some(progress) = rx.recv().await {
                debug!("{}", progress);
                if json_output {
                    JsonMessage::encode_progress(&path, &progress).emit();
                }
                if let Some(ref bar) = bar {
                    if let Some((task, count)) = progress.task {
                        bar.set_prefix(format!("encode {}/{}", task, count));
                    }
                    bar.set_position(progress.percent.clamp(0.0, 100.0) as u64);
                    bar.set_message(progress.eta.map(|eta| format!("ETA {}", eta)).unwrap_or_default());
                }
            }
            if let Some(bar) = bar {
                bar.finish_and_clear();
            }
        })
    }

    /// Non-fatal problem, logged once and counted
    pub async fn warning(&self, message: &str) {
        warn!("{}", message);
        self.stats.lock().await.add_warning();
        if self.json_output {
            JsonMessage::warning(message).emit();
        }
    }

    /// Record a finished file and update the batch bar
    pub async fn file_completed(&self, path: &Path, outcome: &TranscodeOutcome) {
        let original_size = FileManager::get_file_size(path).await.ok();
        self.stats.lock().await.record(outcome, original_size);

        if self.json_output {
            JsonMessage::file_complete(path, outcome).emit();
        }

        let name = display_name(path);
        let message = match outcome {
            TranscodeOutcome::Skipped { .. } => format!("[SKIP] {}: already under the ceiling", name),
            TranscodeOutcome::Transcoded { size_kb, .. } => format!("[OK] {}: {:.0} KB", name, size_kb),
            TranscodeOutcome::SizeTargetUnreachable { .. } => format!("[UNREACHABLE] {}", name),
            TranscodeOutcome::Cancelled => format!("[CANCELLED] {}", name),
            TranscodeOutcome::Failed(_) => format!("[ERROR] {}", name),
        };
        info!("{}: {}", name, outcome);
        self.progress_manager.update(&message);
    }

    /// Ottieni statistiche per report finale
    pub async fn get_stats(&self) -> TranscodeStats {
        self.stats.lock().await.clone()
    }

    /// Finalizza progress bar ed emette l'evento `complete`
    pub async fn finish(&self) -> TranscodeStats {
        let stats = self.get_stats().await;
        if self.json_output {
            JsonMessage::complete(&stats, self.started.elapsed().as_secs_f64()).emit();
        }
        self.progress_manager.finish(&stats.format_summary());
        stats
    }
}
