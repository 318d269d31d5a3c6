//! # Transcode Session
//!
//! Stato per-file del loop di transcodifica.
//!
//! ## Responsabilità:
//! - Possiede i contatori di retry (`degrade_attempt`, `encodes`)
//! - Calcola una sola volta la sequenza di bitrate candidati
//! - Mantiene le dimensioni correnti (adottate dal planner e riusate nei retry)
//! - Ricorda l'ultimo piano che ha prodotto un file troppo grande
//!
//! Una sessione viene creata per ogni file e scartata a fine file: nessuno
//! stato è condiviso tra file diversi.
//!
//! La logica qui è pura (nessun I/O), il controller la guida tramite `SessionState`.

use crate::config::Config;
use crate::error::TranscodeError;
use crate::planner::{bitrate, dimensions, DimensionBounds, Dimensions, EncodePlan};
use crate::probe::MediaProbe;
use serde::Serialize;
use std::path::PathBuf;
use tracing::debug;

/// States of the per-file control loop
#[derive(Debug)]
pub enum SessionState {
    Probing,
    NeedCheck,
    Planning,
    Encoding(EncodePlan),
    Evaluating(EncodePlan),
    Retrying,
    Done(TranscodeOutcome),
}

/// Terminal result of a session
#[derive(Debug)]
pub enum TranscodeOutcome {
    /// Input already under the ceiling, no encoder call
    Skipped { size_kb: f64 },
    /// Output written and under the ceiling
    Transcoded {
        attempts_used: u32,
        encodes: u32,
        output_path: PathBuf,
        size_kb: f64,
    },
    /// The attempt cap was hit, or the next attempt would repeat a failed plan
    SizeTargetUnreachable { encodes: u32, last_size_kb: f64 },
    Cancelled,
    Failed(TranscodeError),
}

impl TranscodeOutcome {
    /// Short machine-friendly label, used in JSON events and summaries
    pub fn label(&self) -> &'static str {
        match self {
            Self::Skipped { .. } => "skipped",
            Self::Transcoded { .. } => "transcoded",
            Self::SizeTargetUnreachable { .. } => "size_target_unreachable",
            Self::Cancelled => "cancelled",
            Self::Failed(_) => "failed",
        }
    }

    /// Whether the file should make the process exit non-zero
    pub fn is_failure(&self) -> bool {
        matches!(self, Self::SizeTargetUnreachable { .. } | Self::Failed(_))
    }
}

impl std::fmt::Display for TranscodeOutcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Skipped { size_kb } => write!(f, "skipped, already {:.0} KB", size_kb),
            Self::Transcoded {
                attempts_used,
                encodes,
                size_kb,
                ..
            } => write!(
                f,
                "{:.0} KB after {} encode(s), degrade level {}",
                size_kb, encodes, attempts_used
            ),
            Self::SizeTargetUnreachable { encodes, last_size_kb } => write!(
                f,
                "size target unreachable after {} encode(s), last output {:.0} KB",
                encodes, last_size_kb
            ),
            Self::Cancelled => write!(f, "cancelled"),
            Self::Failed(e) => write!(f, "failed: {}", e),
        }
    }
}

/// What the planning step decided
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PlanDecision {
    Encode(EncodePlan),
    Unreachable,
}

/// Bitrates derived from the probe, in kilobytes per second of media
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct BitrateTargets {
    pub actual_kbps: f64,
    pub target_kbps: f64,
}

/// Per-file state of the size-targeting loop
#[derive(Debug)]
pub struct TranscodeSession {
    pub input_path: PathBuf,
    pub output_path: PathBuf,
    ceiling_kb: f64,
    bounds: DimensionBounds,
    two_pass: bool,
    turbo: bool,
    degrade_attempt: u32,
    max_degrade_attempts: u32,
    encodes: u32,
    max_total_attempts: u32,
    probe: Option<MediaProbe>,
    bitrate_candidates: Option<Vec<f64>>,
    dimensions: Option<Dimensions>,
    last_plan: Option<EncodePlan>,
    last_size_kb: Option<f64>,
}

impl TranscodeSession {
    pub fn new(input_path: PathBuf, output_path: PathBuf, config: &Config) -> Self {
        Self {
            input_path,
            output_path,
            ceiling_kb: config.target_size_kb,
            bounds: config.dimension_bounds(),
            two_pass: config.two_pass,
            turbo: config.turbo,
            degrade_attempt: 0,
            max_degrade_attempts: config.max_degrade_attempts,
            encodes: 0,
            max_total_attempts: config.max_total_attempts,
            probe: None,
            bitrate_candidates: None,
            dimensions: None,
            last_plan: None,
            last_size_kb: None,
        }
    }

    /// Store the probe; the source dimensions become the current dimensions
    pub fn record_probe(&mut self, probe: MediaProbe) {
        self.dimensions = Some(probe.dimensions());
        self.probe = Some(probe);
    }

    pub fn probe(&self) -> Option<&MediaProbe> {
        self.probe.as_ref()
    }

    pub fn ceiling_kb(&self) -> f64 {
        self.ceiling_kb
    }

    /// Whether the input is at or above the ceiling
    pub fn needs_transcode(&self) -> bool {
        self.probe
            .as_ref()
            .map_or(false, |probe| probe.size_kb() >= self.ceiling_kb)
    }

    pub fn bitrate_targets(&self) -> Option<BitrateTargets> {
        let probe = self.probe.as_ref()?;
        Some(BitrateTargets {
            actual_kbps: probe.size_kb() / probe.duration_secs,
            target_kbps: self.ceiling_kb / probe.duration_secs,
        })
    }

    /// Build the plan for the next attempt, or decide the target cannot be reached.
    pub fn next_plan(&mut self) -> PlanDecision {
        let (Some(targets), Some(mut current)) = (self.bitrate_targets(), self.dimensions) else {
            return PlanDecision::Unreachable;
        };

        if self.encodes >= self.max_total_attempts {
            debug!("Encode cap of {} reached for {}", self.max_total_attempts, self.input_path.display());
            return PlanDecision::Unreachable;
        }

        if bitrate::needs_degrade(targets.actual_kbps, targets.target_kbps) {
            if self.bitrate_candidates.is_none() {
                let candidates =
                    bitrate::plan(targets.actual_kbps, targets.target_kbps, self.max_degrade_attempts);
                debug!("Bitrate candidates for {}: {:?}", self.input_path.display(), candidates);
                self.bitrate_candidates = Some(candidates);
            }

            if let Some(planned) = dimensions::plan(current, &self.bounds) {
                debug!("Resolution {} -> {}", current, planned);
                current = planned;
                self.dimensions = Some(planned);
            }
        }

        let plan = EncodePlan {
            target_bitrate_kbps: self.bitrate_for_attempt(targets.target_kbps),
            dimensions: current,
            two_pass: self.two_pass,
            turbo: self.turbo,
        };

        if self.last_plan == Some(plan) {
            debug!("Next plan repeats an oversized attempt: {}", plan);
            return PlanDecision::Unreachable;
        }

        PlanDecision::Encode(plan)
    }

    fn bitrate_for_attempt(&self, target_kbps: f64) -> f64 {
        if self.degrade_attempt >= self.max_degrade_attempts {
            return target_kbps;
        }
        self.bitrate_candidates
            .as_ref()
            .and_then(|candidates| candidates.get(self.degrade_attempt as usize).copied())
            .unwrap_or(target_kbps)
    }

    /// Count an encoder invocation
    pub fn record_encode(&mut self) {
        self.encodes += 1;
    }

    /// Remember an attempt whose output was over the ceiling and degrade further
    pub fn record_oversized(&mut self, plan: EncodePlan, size_kb: f64) {
        self.degrade_attempt = (self.degrade_attempt + 1).min(self.max_degrade_attempts);
        self.last_plan = Some(plan);
        self.last_size_kb = Some(size_kb);
    }

    pub fn degrade_attempt(&self) -> u32 {
        self.degrade_attempt
    }

    pub fn encodes(&self) -> u32 {
        self.encodes
    }

    pub fn dimensions(&self) -> Option<Dimensions> {
        self.dimensions
    }

    pub fn unreachable(&self) -> TranscodeOutcome {
        TranscodeOutcome::SizeTargetUnreachable {
            encodes: self.encodes,
            last_size_kb: self.last_size_kb.unwrap_or(0.0),
        }
    }
}
