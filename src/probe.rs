//! # Media Probe Module
//!
//! Questo modulo estrae durata e dimensioni dei video tramite `ffprobe`.
//!
//! ## Responsabilità:
//! - Definisce il trait `MediaProber` (collaboratore esterno, mockabile nei test)
//! - Implementazione `FfprobeProber` basata su output JSON di ffprobe
//! - Costruisce `MediaProbe` (durata, larghezza, altezza, dimensione in byte)
//!   una sola volta all'inizio di ogni sessione
//!
//! ## Comando usato:
//! ```bash
//! ffprobe -v quiet -print_format json -show_format -show_streams <file>
//! ```
//!
//! ## Errori:
//! Qualsiasi fallimento (tool assente, JSON invalido, nessuno stream video,
//! durata non positiva) diventa `TranscodeError::ProbeFailure`. Nessun retry.

use crate::error::TranscodeError;
use crate::file_manager::FileManager;
use crate::planner::Dimensions;
use crate::tool_resolver::ToolPathResolver;
use async_trait::async_trait;
use serde::Serialize;
use std::path::{Path, PathBuf};
use tokio::process::Command;
use tracing::debug;

/// Duration and pixel size of a video, as reported by a probe
#[derive(Debug, Clone, PartialEq)]
pub struct VideoInfo {
    pub duration_secs: f64,
    pub width: u32,
    pub height: u32,
    pub codec: Option<String>,
}

/// Everything the controller needs to know about an input, read once per session
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MediaProbe {
    pub duration_secs: f64,
    pub width: u32,
    pub height: u32,
    pub size_bytes: u64,
}

impl MediaProbe {
    /// Probe duration and dimensions, then read the byte size
    pub async fn read(prober: &dyn MediaProber, path: &Path) -> Result<Self, TranscodeError> {
        let info = prober.probe(path).await?;

        if !info.duration_secs.is_finite() || info.duration_secs <= 0.0 {
            return Err(TranscodeError::probe_failed(
                path,
                format!("invalid duration {}", info.duration_secs),
            ));
        }
        if info.width == 0 || info.height == 0 {
            return Err(TranscodeError::probe_failed(
                path,
                format!("invalid dimensions {}x{}", info.width, info.height),
            ));
        }

        let size_bytes = FileManager::get_file_size(path).await?;

        Ok(Self {
            duration_secs: info.duration_secs,
            width: info.width,
            height: info.height,
            size_bytes,
        })
    }

    pub fn size_kb(&self) -> f64 {
        FileManager::bytes_to_kb(self.size_bytes)
    }

    pub fn dimensions(&self) -> Dimensions {
        Dimensions::from((self.width, self.height))
    }
}

/// Extracts duration and dimensions from a media container
#[async_trait]
pub trait MediaProber: Send + Sync {
    /// Returns the name of this prober implementation
    fn name(&self) -> &str;

    /// Probe a video file
    async fn probe(&self, path: &Path) -> Result<VideoInfo, TranscodeError>;

    /// Check that the prober is usable
    async fn validate(&self) -> Result<(), TranscodeError> {
        Ok(())
    }
}

/// `MediaProber` backed by the ffprobe binary
pub struct FfprobeProber {
    ffprobe_path: PathBuf,
}

impl FfprobeProber {
    pub fn new(ffprobe_path: PathBuf) -> Self {
        Self { ffprobe_path }
    }

    /// Locate ffprobe with the tool resolver, falling back to the bare name
    pub fn from_resolver(resolver: &ToolPathResolver) -> Self {
        Self::new(resolver.ffprobe().unwrap_or_else(|| PathBuf::from("ffprobe")))
    }

    /// Parse ffprobe JSON output
    pub fn parse_output(path: &Path, output: &str) -> Result<VideoInfo, TranscodeError> {
        let info: serde_json::Value = serde_json::from_str(output)
            .map_err(|e| TranscodeError::probe_failed(path, format!("invalid ffprobe JSON: {}", e)))?;

        let empty_vec = vec![];
        let streams = info["streams"].as_array().unwrap_or(&empty_vec);
        let video_stream = streams
            .iter()
            .find(|s| s["codec_type"] == "video")
            .ok_or_else(|| TranscodeError::probe_failed(path, "no video stream"))?;

        let dimension = |key: &str| {
            let value = video_stream[key].as_u64().unwrap_or(0);
            u32::try_from(value)
                .map_err(|_| TranscodeError::probe_failed(path, format!("{} out of range: {}", key, value)))
        };
        let width = dimension("width")?;
        let height = dimension("height")?;
        let codec = video_stream["codec_name"].as_str().map(str::to_string);

        // Container duration first, stream duration for formats that only carry it there
        let duration_secs = [&info["format"]["duration"], &video_stream["duration"]]
            .iter()
            .find_map(|value| value.as_str().and_then(|d| d.parse::<f64>().ok()))
            .ok_or_else(|| TranscodeError::probe_failed(path, "duration not found"))?;

        Ok(VideoInfo {
            duration_secs,
            width,
            height,
            codec,
        })
    }
}

#[async_trait]
impl MediaProber for FfprobeProber {
    fn name(&self) -> &str {
        "ffprobe"
    }

    async fn probe(&self, path: &Path) -> Result<VideoInfo, TranscodeError> {
        debug!("Probing {} with {}", path.display(), self.ffprobe_path.display());

        let output = Command::new(&self.ffprobe_path)
            .args(["-v", "quiet", "-print_format", "json", "-show_format", "-show_streams"])
            .arg(path)
            .output()
            .await
            .map_err(|e| {
                TranscodeError::probe_failed(
                    path,
                    format!("failed to execute {}: {}", self.ffprobe_path.display(), e),
                )
            })?;

        if !output.status.success() {
            return Err(TranscodeError::probe_failed(
                path,
                String::from_utf8_lossy(&output.stderr).trim().to_string(),
            ));
        }

        let info = Self::parse_output(path, &String::from_utf8_lossy(&output.stdout))?;
        debug!(
            "Probed {}: {:.2}s, {}x{} ({})",
            path.display(),
            info.duration_secs,
            info.width,
            info.height,
            info.codec.as_deref().unwrap_or("unknown")
        );
        Ok(info)
    }

    async fn validate(&self) -> Result<(), TranscodeError> {
        if ToolPathResolver::is_executable(&self.ffprobe_path) {
            Ok(())
        } else {
            Err(TranscodeError::MissingDependency(
                ToolPathResolver::install_instructions("ffprobe"),
            ))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"{
        "streams": [
            { "codec_type": "audio", "codec_name": "aac" },
            { "codec_type": "video", "codec_name": "h264", "width": 1920, "height": 1080, "duration": "99.5" }
        ],
        "format": { "duration": "100.000000", "size": "10000000" }
    }"#;

    #[test]
    fn test_parse_probe_output() {
        let info = FfprobeProber::parse_output(Path::new("in.mp4"), SAMPLE).unwrap();
        assert_eq!(info.duration_secs, 100.0);
        assert_eq!(info.width, 1920);
        assert_eq!(info.height, 1080);
        assert_eq!(info.codec.as_deref(), Some("h264"));
    }

    #[test]
    fn test_stream_duration_fallback() {
        let json = r#"{
            "streams": [{ "codec_type": "video", "width": 640, "height": 480, "duration": "12.5" }],
            "format": {}
        }"#;
        let info = FfprobeProber::parse_output(Path::new("in.webm"), json).unwrap();
        assert_eq!(info.duration_secs, 12.5);
    }

    #[test]
    fn test_audio_only_is_a_probe_failure() {
        let json = r#"{ "streams": [{ "codec_type": "audio" }], "format": { "duration": "3.0" } }"#;
        let err = FfprobeProber::parse_output(Path::new("song.m4a"), json).unwrap_err();
        assert!(matches!(err, TranscodeError::ProbeFailure { .. }));
    }

    #[test]
    fn test_oversized_dimension_is_a_probe_failure() {
        let json = r#"{
            "streams": [{ "codec_type": "video", "width": 5000000000, "height": 1080 }],
            "format": { "duration": "10.0" }
        }"#;
        let err = FfprobeProber::parse_output(Path::new("in.mp4"), json).unwrap_err();
        assert!(matches!(err, TranscodeError::ProbeFailure { .. }));
        assert!(err.to_string().contains("width"));
    }

    #[test]
    fn test_garbage_is_a_probe_failure() {
        let err = FfprobeProber::parse_output(Path::new("x.mp4"), "not json").unwrap_err();
        assert!(matches!(err, TranscodeError::ProbeFailure { .. }));
    }

    struct FixedProber(VideoInfo);

    #[async_trait]
    impl MediaProber for FixedProber {
        fn name(&self) -> &str {
            "fixed"
        }

        async fn probe(&self, _path: &Path) -> Result<VideoInfo, TranscodeError> {
            Ok(self.0.clone())
        }
    }

    #[tokio::test]
    async fn test_media_probe_reads_size() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("clip.mp4");
        std::fs::File::create(&path).unwrap().set_len(10_000_000).unwrap();

        let prober = FixedProber(VideoInfo {
            duration_secs: 100.0,
            width: 1280,
            height: 720,
            codec: None,
        });
        let probe = MediaProbe::read(&prober, &path).await.unwrap();
        assert_eq!(probe.size_bytes, 10_000_000);
        assert_eq!(probe.size_kb(), 10_000.0);
        assert_eq!(probe.dimensions(), Dimensions::new(1280.0, 720.0));
    }

    #[tokio::test]
    async fn test_zero_duration_rejected() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("still.mp4");
        std::fs::write(&path, b"x").unwrap();

        let prober = FixedProber(VideoInfo {
            duration_secs: 0.0,
            width: 1280,
            height: 720,
            codec: None,
        });
        let err = MediaProbe::read(&prober, &path).await.unwrap_err();
        assert!(matches!(err, TranscodeError::ProbeFailure { .. }));
    }
}
