//! # Transcoder Module
//!
//! Il cuore del tool: il loop che porta ogni file sotto il tetto di dimensione.
//! - `session`: Stato per-file, contatori di retry e logica di pianificazione
//! - `controller`: Macchina a stati probe → plan → encode → evaluate → retry
//! - `batch`: Elaborazione sequenziale di più file con report per-file
//! - `progress_tracker`: Progress bar, eventi JSON e statistiche
//! - `path_resolver`: Path di output e file temporanei

pub mod batch;
pub mod controller;
pub mod path_resolver;
pub mod progress_tracker;
pub mod session;

pub use batch::{BatchTranscoder, FileReport};
pub use controller::TranscodeController;
pub use path_resolver::PathResolver;
pub use progress_tracker::ProgressTracker;
pub use session::{SessionState, TranscodeOutcome, TranscodeSession};
