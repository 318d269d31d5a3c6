//! # Clip Squeezer - Main Entry Point
//!
//! Questo è il punto di ingresso principale dell'applicazione.
//!
//! ## Responsabilità:
//! - Parsing degli argomenti della command line con `clap`
//! - Inizializzazione del sistema di logging con `tracing`
//! - Caricamento della configurazione (default → file JSON → override CLI)
//! - Verifica dei tool esterni (HandBrakeCLI, ffprobe)
//! - Collegamento di Ctrl-C alla cancellazione dell'encode in corso
//!
//! ## Flusso di esecuzione:
//! 1. Parsa gli argomenti CLI
//! 2. Configura il logging (INFO, DEBUG con `--verbose`, oppure `RUST_LOG`)
//! 3. Carica e valida la configurazione
//! 4. Espande gli input (le directory diventano la lista dei video contenuti)
//! 5. Esegue il batch e termina con codice non zero se qualche file è fallito
//!
//! ## Esempio di utilizzo:
//! ```bash
//! clip-squeezer holiday.mov ~/Videos/trip --target-size-kb 7999 --verbose
//! ```

use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use clip_squeezer::{
    BatchTranscoder, Config, Encoder, FfprobeProber, FileManager, HandBrakeEncoder, MediaProber, ProgressTracker,
    StopSignal, ToolPathResolver, TranscodeController,
};

#[derive(Parser)]
#[command(name = "clip-squeezer")]
#[command(about = "Transcode videos so they fit under a hard size ceiling")]
struct Args {
    /// Video files or directories to transcode
    #[arg(required = true)]
    inputs: Vec<PathBuf>,

    /// Configuration file (JSON). Defaults to the user config directory
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Maximum output size in kilobytes (1 KB = 1000 bytes)
    #[arg(short, long)]
    target_size_kb: Option<f64>,

    /// Bitrate candidates to try before the raw target bitrate
    #[arg(long)]
    max_degrade_attempts: Option<u32>,

    /// Hard cap on encoder runs per file
    #[arg(long)]
    max_total_attempts: Option<u32>,

    /// Suffix appended to the output file name
    #[arg(short, long)]
    suffix: Option<String>,

    /// Per-attempt encoder timeout in seconds (0 disables it)
    #[arg(long)]
    timeout: Option<u64>,

    /// Single-pass encoding
    #[arg(long)]
    no_two_pass: bool,

    /// Full-quality first pass
    #[arg(long)]
    no_turbo: bool,

    /// Output JSON events instead of progress bars
    #[arg(long)]
    json: bool,

    /// Write the effective configuration to the config file and exit
    #[arg(long)]
    save_config: bool,

    /// Verbose logging
    #[arg(short, long)]
    verbose: bool,
}

impl Args {
    fn apply_to(&self, config: &mut Config) {
        if let Some(target) = self.target_size_kb {
            config.target_size_kb = target;
        }
        if let Some(attempts) = self.max_degrade_attempts {
            config.max_degrade_attempts = attempts;
        }
        if let Some(attempts) = self.max_total_attempts {
            config.max_total_attempts = attempts;
        }
        if let Some(ref suffix) = self.suffix {
            config.output_suffix = suffix.clone();
        }
        if let Some(timeout) = self.timeout {
            config.encode_timeout_secs = timeout;
        }
        if self.no_two_pass {
            config.two_pass = false;
        }
        if self.no_turbo {
            config.turbo = false;
        }
        if self.json {
            config.json_output = true;
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // Initialize logging; stderr keeps stdout clean for JSON events
    let default_level = if args.verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    let mut config = Config::load(args.config.as_deref()).await?;
    args.apply_to(&mut config);
    config.validate()?;

    if args.save_config {
        let path = args
            .config
            .clone()
            .or_else(Config::default_path)
            .context("No configuration directory available")?;
        config.save_to_file(&path).await?;
        info!("Configuration saved to {}", path.display());
        return Ok(());
    }

    let resolver = ToolPathResolver::new();
    let prober = FfprobeProber::from_resolver(&resolver);
    let encoder = HandBrakeEncoder::from_resolver(&resolver, &config);
    prober.validate().await?;
    encoder.validate().await?;

    let inputs = FileManager::expand_inputs(&args.inputs, &config.output_suffix);
    if inputs.is_empty() {
        warn!("No video files found");
        return Ok(());
    }
    info!("Transcoding {} file(s) with a {:.0} KB ceiling", inputs.len(), config.target_size_kb);

    let stop = StopSignal::new();
    let ctrl_c_stop = stop.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Interrupted, stopping the current encode");
            ctrl_c_stop.fire();
        }
    });

    let tracker = ProgressTracker::new(inputs.len(), config.json_output);
    let controller = TranscodeController::new(config, Arc::new(prober), Arc::new(encoder), tracker, stop);
    let batch = BatchTranscoder::new(controller);

    let reports = batch.run(&inputs).await;
    for report in reports.iter().filter(|report| report.outcome.is_failure()) {
        error!("{}: {}", report.path.display(), report.outcome);
    }

    if batch.controller().tracker().get_stats().await.has_failures() {
        std::process::exit(1);
    }
    Ok(())
}
