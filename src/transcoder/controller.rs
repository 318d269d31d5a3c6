//! # Transcode Controller
//!
//! Orchestratore del loop di transcodifica per un singolo file.
//!
//! ## Macchina a stati:
//! ```text
//! Probing → NeedCheck → Planning → Encoding → Evaluating → Done
//!                          ↑                        │
//!                          └──────── Retrying ←─────┘ (output sopra il tetto)
//! ```
//!
//! ## Dettagli:
//! - Il probe avviene una sola volta per sessione
//! - L'encoder scrive su un file temporaneo accanto all'output, rinominato
//!   sull'output solo a encode concluso
//! - Errori dell'encoder e cancellazione sono terminali: l'output parziale viene rimosso
//! - Il progress dell'encoder viene inoltrato al tracker da un task separato

use crate::config::Config;
use crate::encoder::{EncodeJob, Encoder, StopSignal};
use crate::error::TranscodeError;
use crate::file_manager::FileManager;
use crate::planner::EncodePlan;
use crate::probe::{MediaProber, MediaProbe};
use crate::transcoder::path_resolver::PathResolver;
use crate::transcoder::progress_tracker::ProgressTracker;
use crate::transcoder::session::{PlanDecision, SessionState, TranscodeOutcome, TranscodeSession};
use std::path::Path;
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

const PROGRESS_CHANNEL_CAPACITY: usize = 32;

/// Drives one file through the size-targeting loop
pub struct TranscodeController {
    config: Config,
    prober: Arc<dyn MediaProber>,
    encoder: Arc<dyn Encoder>,
    tracker: ProgressTracker,
    stop: StopSignal,
}

impl TranscodeController {
    pub fn new(
        config: Config,
        prober: Arc<dyn MediaProber>,
        encoder: Arc<dyn Encoder>,
        tracker: ProgressTracker,
        stop: StopSignal,
    ) -> Self {
        Self {
            config,
            prober,
            encoder,
            tracker,
            stop,
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn tracker(&self) -> &ProgressTracker {
        &self.tracker
    }

    pub fn stop_signal(&self) -> &StopSignal {
        &self.stop
    }

    /// Transcode one file. Errors become `Failed`, cancellation becomes `Cancelled`.
    pub async fn transcode(&self, input_path: &Path) -> TranscodeOutcome {
        if !input_path.is_file() {
            return TranscodeOutcome::Failed(TranscodeError::MissingInputFile {
                path: input_path.to_path_buf(),
            });
        }

        let output_path = match PathResolver::output_path(input_path, &self.config.output_suffix) {
            Ok(path) => path,
            Err(e) => return TranscodeOutcome::Failed(e),
        };
        let mut session = TranscodeSession::new(input_path.to_path_buf(), output_path, &self.config);

        match self.run(&mut session).await {
            Ok(outcome) => outcome,
            Err(e) => {
                // an earlier attempt may have left an oversized output behind
                if session.encodes() > 0 {
                    self.discard_output(&session.output_path).await;
                }
                match e {
                    TranscodeError::Cancelled => TranscodeOutcome::Cancelled,
                    e => TranscodeOutcome::Failed(e),
                }
            }
        }
    }

    async fn discard_output(&self, output_path: &Path) {
        if let Err(e) = FileManager::remove_if_exists(output_path).await {
            warn!("Failed to remove {}: {}", output_path.display(), e);
        }
    }

    async fn run(&self, session: &mut TranscodeSession) -> Result<TranscodeOutcome, TranscodeError> {
        let input_path = session.input_path.clone();
        let input_path = input_path.as_path();
        let mut state = SessionState::Probing;

        loop {
            debug!("{}: {:?}", input_path.display(), state);
            state = match state {
                SessionState::Probing => {
                    let probe = MediaProbe::read(self.prober.as_ref(), input_path).await?;
                    info!(
                        "{}: {:.0} KB, {:.2}s, {}x{}",
                        input_path.display(),
                        probe.size_kb(),
                        probe.duration_secs,
                        probe.width,
                        probe.height
                    );
                    session.record_probe(probe);
                    SessionState::NeedCheck
                }
                SessionState::NeedCheck => {
                    if session.needs_transcode() {
                        SessionState::Planning
                    } else {
                        let size_kb = session.probe().map_or(0.0, MediaProbe::size_kb);
                        info!(
                            "{} is {:.0} KB, under the {:.0} KB ceiling",
                            input_path.display(),
                            size_kb,
                            session.ceiling_kb()
                        );
                        SessionState::Done(TranscodeOutcome::Skipped { size_kb })
                    }
                }
                SessionState::Planning => match session.next_plan() {
                    PlanDecision::Encode(plan) => SessionState::Encoding(plan),
                    PlanDecision::Unreachable => {
                        warn!(
                            "Giving up on {} after {} encode(s): size target unreachable",
                            input_path.display(),
                            session.encodes()
                        );
                        SessionState::Done(session.unreachable())
                    }
                },
                SessionState::Encoding(plan) => {
                    self.encode_attempt(session, plan).await?;
                    SessionState::Evaluating(plan)
                }
                SessionState::Evaluating(plan) => {
                    let size_bytes = FileManager::get_file_size(&session.output_path).await?;
                    let size_kb = FileManager::bytes_to_kb(size_bytes);

                    if size_kb > session.ceiling_kb() {
                        warn!(
                            "{} is {:.0} KB, over the {:.0} KB ceiling",
                            session.output_path.display(),
                            size_kb,
                            session.ceiling_kb()
                        );
                        session.record_oversized(plan, size_kb);
                        SessionState::Retrying
                    } else {
                        SessionState::Done(TranscodeOutcome::Transcoded {
                            attempts_used: session.degrade_attempt(),
                            encodes: session.encodes(),
                            output_path: session.output_path.clone(),
                            size_kb,
                        })
                    }
                }
                SessionState::Retrying => SessionState::Planning,
                SessionState::Done(outcome) => return Ok(outcome),
            };
        }
    }

    /// Run the encoder once into a temporary file, then move it onto the output path
    async fn encode_attempt(&self, session: &mut TranscodeSession, plan: EncodePlan) -> Result<(), TranscodeError> {
        let stop = self.stop.subscribe();
        if self.stop.is_fired() {
            return Err(TranscodeError::Cancelled);
        }

        let temp_output = PathResolver::temp_output(&session.output_path)?;
        let job = EncodeJob {
            input_path: session.input_path.clone(),
            output_path: temp_output.to_path_buf(),
            plan,
        };

        session.record_encode();
        self.tracker
            .attempt_started(&session.input_path, &plan, session.encodes(), session.degrade_attempt());

        let (progress_tx, progress_rx) = mpsc::channel(PROGRESS_CHANNEL_CAPACITY);
        let forwarder = self.tracker.forward_progress(&session.input_path, progress_rx);
        let result = self.encoder.encode(&job, progress_tx, stop).await;
        if let Err(e) = forwarder.await {
            debug!("Progress forwarder ended abnormally: {}", e);
        }

        match result {
            Ok(()) => {
                temp_output
                    .persist(&session.output_path)
                    .map_err(|e| TranscodeError::Io(e.error))?;
                Ok(())
            }
            // Ctrl-C also interrupts the encoder, whose exit may be seen first
            Err(e) if self.stop.is_fired() => {
                debug!("Encoder stopped after cancellation: {}", e);
                Err(TranscodeError::Cancelled)
            }
            Err(e) => Err(e),
        }
    }
}
