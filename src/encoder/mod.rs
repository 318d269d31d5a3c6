//! # Encoder Module
//!
//! Confine con l'encoder esterno.
//!
//! ## Responsabilità:
//! - Definisce il trait `Encoder` (mockabile nei test del controller)
//! - `EncodeJob`: input, output e piano di un singolo tentativo
//! - `EncodeProgress`: notifiche di avanzamento (solo osservabilità)
//! - `StopSignal`: cancellazione dell'encode in corso (Ctrl-C)
//!
//! ## Contratto:
//! L'encoder emette una sequenza ordinata di progress sul canale `mpsc` e termina
//! con successo o errore. Un errore è terminale per il tentativo: il controller
//! non lo ritenta. Il canale viene chiuso quando `encode` ritorna.

pub mod handbrake;

pub use handbrake::HandBrakeEncoder;

use crate::error::TranscodeError;
use crate::planner::EncodePlan;
use async_trait::async_trait;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::{broadcast, mpsc};

/// One encoder invocation
#[derive(Debug, Clone)]
pub struct EncodeJob {
    pub input_path: PathBuf,
    pub output_path: PathBuf,
    pub plan: EncodePlan,
}

/// Progress notification emitted while encoding
#[derive(Debug, Clone, PartialEq)]
pub struct EncodeProgress {
    /// Percent complete of the current task (0.0 - 100.0)
    pub percent: f32,
    /// Estimated time remaining as reported by the encoder
    pub eta: Option<String>,
    /// Current task and task count (two-pass encodes run two tasks)
    pub task: Option<(u32, u32)>,
}

impl std::fmt::Display for EncodeProgress {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "Percent complete: {:.2}, ETA: {}",
            self.percent,
            self.eta.as_deref().unwrap_or("unknown")
        )
    }
}

/// An external encoder that turns an `EncodeJob` into an output file
#[async_trait]
pub trait Encoder: Send + Sync {
    /// Returns the name of this encoder implementation
    fn name(&self) -> &str;

    /// Run one encode. Progress goes to `progress_tx`; a message on `stop`
    /// aborts the encode with `TranscodeError::Cancelled`.
    async fn encode(
        &self,
        job: &EncodeJob,
        progress_tx: mpsc::Sender<EncodeProgress>,
        stop: broadcast::Receiver<()>,
    ) -> Result<(), TranscodeError>;

    /// Validates that the encoder is installed and ready
    async fn validate(&self) -> Result<(), TranscodeError>;
}

/// Cancellation signal shared by the batch, the controller and the encoder
#[derive(Clone)]
pub struct StopSignal {
    sender: broadcast::Sender<()>,
    fired: Arc<AtomicBool>,
}

impl StopSignal {
    pub fn new() -> Self {
        let (sender, _) = broadcast::channel(1);
        Self {
            sender,
            fired: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Request cancellation of the running encode and of the rest of the batch
    pub fn fire(&self) {
        self.fired.store(true, Ordering::SeqCst);
        // no receivers just means nothing is encoding right now
        let _ = self.sender.send(());
    }

    pub fn is_fired(&self) -> bool {
        self.fired.load(Ordering::SeqCst)
    }

    pub fn subscribe(&self) -> broadcast::Receiver<()> {
        self.sender.subscribe()
    }
}

impl Default for StopSignal {
    fn default() -> Self {
        Self::new()
    }
}

/// Resolves once a stop is requested. A closed channel never resolves.
pub async fn stop_requested(stop: &mut broadcast::Receiver<()>) {
    loop {
        match stop.recv().await {
            Ok(()) | Err(broadcast::error::RecvError::Lagged(_)) => return,
            Err(broadcast::error::RecvError::Closed) => std::future::pending::<()>().await,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_progress_display() {
        let progress = EncodeProgress {
            percent: 12.3456,
            eta: Some("00h01m23s".to_string()),
            task: Some((1, 2)),
        };
        assert_eq!(progress.to_string(), "Percent complete: 12.35, ETA: 00h01m23s");
    }

    #[tokio::test]
    async fn test_stop_signal_wakes_subscribers() {
        let signal = StopSignal::new();
        let mut rx = signal.subscribe();
        assert!(!signal.is_fired());

        signal.fire();
        assert!(signal.is_fired());
        tokio::time::timeout(Duration::from_secs(1), stop_requested(&mut rx))
            .await
            .expect("stop should be observed");
    }

    #[tokio::test]
    async fn test_dropped_sender_does_not_stop() {
        let signal = StopSignal::new();
        let mut rx = signal.subscribe();
        drop(signal);

        let waited = tokio::time::timeout(Duration::from_millis(50), stop_requested(&mut rx)).await;
        assert!(waited.is_err());
    }
}
