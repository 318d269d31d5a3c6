//! # Configuration Management Module
//!
//! Questo modulo gestisce tutta la configurazione della transcodifica.
//!
//! ## Responsabilità:
//! - Definisce la struct `Config` con tutti i parametri del loop di size-targeting
//! - Fornisce validazione robusta dei parametri di input
//! - Supporta caricamento/salvataggio configurazione da/verso file JSON
//! - Fornisce valori di default pensati per upload con limite di 8MB
//!
//! ## Parametri di configurazione:
//! - `target_size_kb`: Tetto massimo di output in KB (default: 7999)
//! - `min_width` / `min_height`: Sotto questi valori non si riduce la risoluzione (320x240)
//! - `target_width` / `target_height`: Limite del loop di downscaling (854x480)
//! - `max_degrade_attempts`: Lunghezza della sequenza di bitrate candidati (default: 2)
//! - `max_total_attempts`: Cap esplicito sulle invocazioni dell'encoder per file (default: 5)
//! - `output_suffix`: Suffisso del file di output (default: "-encoded")
//! - `two_pass` / `turbo`: Flag passati all'encoder (default: true)
//! - `encode_timeout_secs`: Timeout per singolo encode, 0 = disabilitato (default: 3600)
//! - `json_output`: Eventi JSON su stdout invece delle progress bar
//!
//! ## Layering:
//! 1. `Config::default()`
//! 2. File JSON (`--config` oppure `<config_dir>/clip-squeezer/config.json`)
//! 3. Override da command line
//!
//! ## Esempio:
//! ```rust,ignore
//! let config = Config {
//!     target_size_kb: 24_999.0,
//!     max_degrade_attempts: 3,
//!     ..Default::default()
//! };
//! config.validate()?;
//! ```

use crate::error::TranscodeError;
use crate::planner::DimensionBounds;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Configuration for size-capped transcoding
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Maximum acceptable output size in kilobytes (1 KB = 1000 bytes)
    pub target_size_kb: f64,
    /// Below this width no resolution reduction is attempted
    pub min_width: u32,
    /// Below this height no resolution reduction is attempted
    pub min_height: u32,
    /// Width bound of the downscaling loop
    pub target_width: u32,
    /// Height bound of the downscaling loop
    pub target_height: u32,
    /// Number of bitrate candidates tried before falling back to the raw target bitrate
    pub max_degrade_attempts: u32,
    /// Hard cap on encoder invocations for a single file
    pub max_total_attempts: u32,
    /// Appended to the input stem to build the output file name
    pub output_suffix: String,
    /// Two-pass encoding
    pub two_pass: bool,
    /// Fast first pass (only meaningful with two-pass)
    pub turbo: bool,
    /// Per-attempt encoder timeout in seconds (0 = no timeout)
    pub encode_timeout_secs: u64,
    /// Output progress and results as JSON lines for programmatic use
    pub json_output: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            target_size_kb: 7999.0,
            min_width: 320,
            min_height: 240,
            target_width: 854,
            target_height: 480,
            max_degrade_attempts: 2,
            max_total_attempts: 5,
            output_suffix: "-encoded".to_string(),
            two_pass: true,
            turbo: true,
            encode_timeout_secs: 3600,
            json_output: false,
        }
    }
}

impl Config {
    /// Validate configuration parameters
    pub fn validate(&self) -> Result<()> {
        if !self.target_size_kb.is_finite() || self.target_size_kb <= 0.0 {
            return Err(invalid("Target size must be a positive number of kilobytes"));
        }

        if self.min_width == 0 || self.min_height == 0 {
            return Err(invalid("Minimum width and height must be greater than 0"));
        }

        if self.target_width == 0 || self.target_height == 0 {
            return Err(invalid("Target width and height must be greater than 0"));
        }

        if self.max_total_attempts == 0 {
            return Err(invalid("Maximum total attempts must be greater than 0"));
        }

        if self.output_suffix.is_empty() {
            return Err(invalid("Output suffix must not be empty, the input would be overwritten"));
        }

        if self.output_suffix.contains(std::path::MAIN_SEPARATOR) || self.output_suffix.contains('/') {
            return Err(invalid("Output suffix must not contain path separators"));
        }

        if self.turbo && !self.two_pass {
            tracing::warn!("Turbo first pass has no effect without two-pass encoding");
        }

        Ok(())
    }

    /// Bounds used by the dimension planner
    pub fn dimension_bounds(&self) -> DimensionBounds {
        DimensionBounds {
            min_width: self.min_width,
            min_height: self.min_height,
            target_width: self.target_width,
            target_height: self.target_height,
        }
    }

    /// Encoder timeout, `None` when disabled
    pub fn encode_timeout(&self) -> Option<std::time::Duration> {
        (self.encode_timeout_secs > 0).then(|| std::time::Duration::from_secs(self.encode_timeout_secs))
    }

    /// Default location of the user configuration file
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("clip-squeezer").join("config.json"))
    }

    /// Load configuration from file
    pub async fn from_file(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let content = tokio::fs::read_to_string(path)
            .await
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        let config: Config = serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse config file {}", path.display()))?;
        config.validate()?;
        Ok(config)
    }

    /// Load the explicit config file if given, otherwise the default one when present
    pub async fn load(explicit: Option<&Path>) -> Result<Self> {
        match explicit {
            Some(path) => {
                if !path.exists() {
                    return Err(anyhow::anyhow!("Config file does not exist: {}", path.display()));
                }
                Self::from_file(path).await
            }
            None => match Self::default_path() {
                Some(path) => Self::from_file(&path).await,
                None => Ok(Self::default()),
            },
        }
    }

    /// Save configuration to file
    pub async fn save_to_file(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        let content = serde_json::to_string_pretty(self)?;
        tokio::fs::write(path, content).await?;
        Ok(())
    }
}

fn invalid(message: &str) -> anyhow::Error {
    TranscodeError::InvalidConfig(message.to_string()).into()
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_config_validation() {
        let mut config = Config::default();
        assert!(config.validate().is_ok());

        config.target_size_kb = 0.0;
        assert!(config.validate().is_err());

        config.target_size_kb = 7999.0;
        config.max_total_attempts = 0;
        assert!(config.validate().is_err());

        config.max_total_attempts = 5;
        config.output_suffix = String::new();
        assert!(config.validate().is_err());

        config.output_suffix = "-small".to_string();
        config.target_width = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_zero_degrade_attempts_is_valid() {
        let config = Config {
            max_degrade_attempts: 0,
            ..Default::default()
        };
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_config_default() {
        let config = Config::default();
        assert_eq!(config.target_size_kb, 7999.0);
        assert_eq!(config.min_width, 320);
        assert_eq!(config.min_height, 240);
        assert_eq!(config.target_width, 854);
        assert_eq!(config.target_height, 480);
        assert_eq!(config.max_degrade_attempts, 2);
        assert_eq!(config.output_suffix, "-encoded");
        assert!(config.two_pass);
        assert!(config.turbo);
        assert!(!config.json_output);
    }

    #[test]
    fn test_encode_timeout() {
        let mut config = Config::default();
        assert_eq!(config.encode_timeout(), Some(std::time::Duration::from_secs(3600)));
        config.encode_timeout_secs = 0;
        assert_eq!(config.encode_timeout(), None);
    }

    #[tokio::test]
    async fn test_config_save_load() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("nested").join("config.json");

        let original_config = Config {
            target_size_kb: 24_999.0,
            max_degrade_attempts: 3,
            output_suffix: "-small".to_string(),
            turbo: false,
            ..Default::default()
        };

        original_config.save_to_file(&config_path).await.unwrap();
        let loaded_config = Config::from_file(&config_path).await.unwrap();

        assert_eq!(loaded_config.target_size_kb, 24_999.0);
        assert_eq!(loaded_config.max_degrade_attempts, 3);
        assert_eq!(loaded_config.output_suffix, "-small");
        assert!(!loaded_config.turbo);
        assert!(loaded_config.two_pass);
    }

    #[tokio::test]
    async fn test_partial_config_file_uses_defaults() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("config.json");
        tokio::fs::write(&config_path, r#"{ "target_size_kb": 50000 }"#).await.unwrap();

        let config = Config::from_file(&config_path).await.unwrap();
        assert_eq!(config.target_size_kb, 50_000.0);
        assert_eq!(config.target_width, 854);
    }

    #[tokio::test]
    async fn test_missing_explicit_config_is_an_error() {
        let temp_dir = TempDir::new().unwrap();
        let missing = temp_dir.path().join("nope.json");
        assert!(Config::load(Some(&missing)).await.is_err());
    }
}
