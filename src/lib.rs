//! # Clip Squeezer Library
//!
//! Questo è il modulo principale della libreria che espone tutte le API pubbliche.
//!
//! ## Responsabilità:
//! - Definisce la struttura modulare dell'applicazione
//! - Espone i tipi e le funzioni principali tramite re-exports
//! - Fornisce un'interfaccia pulita per il main.rs e per altri consumatori
//!
//! ## Architettura dei moduli:
//! - `config`: Gestione configurazione e validazione parametri
//! - `error`: Tipi di errore per-file
//! - `file_manager`: Operazioni sui file, dimensioni e discovery video
//! - `probe`: Durata e dimensioni via ffprobe
//! - `planner`: Pianificazione di bitrate e risoluzione (funzioni pure)
//! - `encoder`: Adapter verso HandBrakeCLI, progress e cancellazione
//! - `transcoder`: Loop di transcodifica per-file e batch
//! - `progress` / `json_output`: Progress bar, statistiche ed eventi JSON
//! - `tool_resolver`: Ricerca dei tool esterni
//!
//! ## Utilizzo:
//! ```rust,ignore
//! use clip_squeezer::*;
//!
//! let resolver = ToolPathResolver::new();
//! let config = Config::default();
//! let controller = TranscodeController::new(
//!     config.clone(),
//!     Arc::new(FfprobeProber::from_resolver(&resolver)),
//!     Arc::new(HandBrakeEncoder::from_resolver(&resolver, &config)),
//!     ProgressTracker::new(1, false),
//!     StopSignal::new(),
//! );
//! let outcome = controller.transcode(Path::new("holiday.mov")).await;
//! ```

pub mod config;
pub mod encoder;
pub mod error;
pub mod file_manager;
pub mod json_output;
pub mod planner;
pub mod probe;
pub mod progress;
pub mod tool_resolver;
pub mod transcoder;
pub mod utils;

pub use config::Config;
pub use encoder::{EncodeJob, EncodeProgress, Encoder, HandBrakeEncoder, StopSignal};
pub use error::TranscodeError;
pub use file_manager::FileManager;
pub use planner::{Dimensions, EncodePlan};
pub use probe::{FfprobeProber, MediaProbe, MediaProber};
pub use tool_resolver::ToolPathResolver;
pub use transcoder::{BatchTranscoder, FileReport, ProgressTracker, TranscodeController, TranscodeOutcome};
