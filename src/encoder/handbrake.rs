//! # HandBrake Encoder
//!
//! Implementazione di `Encoder` basata su `HandBrakeCLI`.
//!
//! ## Comando:
//! ```bash
//! HandBrakeCLI -i <in> -o <out> -f av_mp4 -e x264 --optimize \
//!     --vb <kbps> --two-pass --turbo -w <width> -l <height>
//! ```
//!
//! ## Dettagli:
//! - Le dimensioni frazionarie del planner vengono arrotondate al pari più vicino
//! - Il bitrate viene passato arrotondato all'intero (minimo 1)
//! - Il progresso arriva su stdout, righe separate da `\r`:
//!   `Encoding: task 1 of 2, 12.34 % (45.67 fps, avg 50.00 fps, ETA 00h01m23s)`
//! - I progress vengono inoltrati al massimo ogni 500ms (sempre a cambio task e al 100%)
//! - Exit code non zero → `EncoderFailure` con le ultime righe di stderr
//! - Timeout o cancellazione → il processo viene terminato

use super::{stop_requested, EncodeJob, EncodeProgress, Encoder};
use crate::config::Config;
use crate::error::TranscodeError;
use crate::tool_resolver::{ToolPathResolver, HANDBRAKE};
use crate::utils::to_string_vec;
use async_trait::async_trait;
use regex_lite::Regex;
use std::collections::VecDeque;
use std::path::PathBuf;
use std::process::Stdio;
use std::sync::OnceLock;
use std::time::{Duration, Instant};
use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::process::Command;
use tokio::sync::{broadcast, mpsc};
use tracing::{debug, warn};

const STDERR_TAIL_LINES: usize = 20;

fn progress_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"Encoding: task (\d+) of (\d+), (\d+(?:\.\d+)?) %(?:.*?ETA (\d+h\d+m\d+s))?")
            .expect("progress regex is valid")
    })
}

/// Minimum delay between forwarded progress events
const PROGRESS_INTERVAL: Duration = Duration::from_millis(500);

/// HandBrakeCLI-based encoder
pub struct HandBrakeEncoder {
    binary: PathBuf,
    timeout: Option<Duration>,
}

impl HandBrakeEncoder {
    pub fn new(binary: PathBuf, timeout: Option<Duration>) -> Self {
        Self {
            binary,
            timeout,
        }
    }

    /// Locate HandBrakeCLI with the tool resolver and apply the configured timeout
    pub fn from_resolver(resolver: &ToolPathResolver, config: &Config) -> Self {
        let binary = resolver.handbrake().unwrap_or_else(|| PathBuf::from(HANDBRAKE));
        Self::new(binary, config.encode_timeout())
    }

    /// Builds HandBrakeCLI arguments for a job
    pub fn build_args(job: &EncodeJob) -> Vec<String> {
        let plan = &job.plan;
        let (width, height) = plan.dimensions.to_even_pixels();
        let bitrate = plan.target_bitrate_kbps.round().max(1.0) as u64;

        let mut args = vec![
            "-i".to_string(),
            job.input_path.to_string_lossy().to_string(),
            "-o".to_string(),
            job.output_path.to_string_lossy().to_string(),
        ];
        args.extend(to_string_vec(["-f", "av_mp4", "-e", "x264", "--optimize"]));
        args.extend(["--vb".to_string(), bitrate.to_string()]);

        if plan.two_pass {
            args.push("--two-pass".to_string());
            if plan.turbo {
                args.push("--turbo".to_string());
            }
        }

        args.extend(to_string_vec(["-w", &width.to_string(), "-l", &height.to_string()]));
        args
    }

    /// Parse a HandBrakeCLI progress line
    pub fn parse_progress(line: &str) -> Option<EncodeProgress> {
        let caps = progress_regex().captures(line)?;
        let task = caps[1].parse::<u32>().ok().zip(caps[2].parse::<u32>().ok());
        let percent = caps[3].parse::<f32>().ok()?;
        let eta = caps.get(4).map(|m| m.as_str().to_string());

        Some(EncodeProgress { percent, eta, task })
    }

    /// Read progress from the encoder's stdout until it closes
    async fn pump_progress<R>(
        stdout: R,
        progress_tx: mpsc::Sender<EncodeProgress>,
        interval: Duration,
    ) -> std::io::Result<()>
    where
        R: AsyncRead + Unpin,
    {
        let mut segments = BufReader::new(stdout).split(b'\r');
        let mut last_send: Option<Instant> = None;
        let mut last_task = None;

        while let Some(segment) = segments.next_segment().await? {
            let text = String::from_utf8_lossy(&segment);
            for line in text.lines() {
                let Some(progress) = Self::parse_progress(line) else {
                    continue;
                };

                let due = last_send.map_or(true, |at| at.elapsed() >= interval)
                    || progress.percent >= 100.0
                    || progress.task != last_task;
                if due {
                    last_task = progress.task;
                    // Non-blocking send, a slow consumer only loses progress lines
                    let _ = progress_tx.try_send(progress);
                    last_send = Some(Instant::now());
                }
            }
        }

        Ok(())
    }

    /// Keep the last lines of stderr for error reports
    async fn collect_stderr_tail<R>(stderr: R) -> String
    where
        R: AsyncRead + Unpin,
    {
        let mut lines = BufReader::new(stderr).lines();
        let mut tail = VecDeque::with_capacity(STDERR_TAIL_LINES);
        while let Ok(Some(line)) = lines.next_line().await {
            if tail.len() == STDERR_TAIL_LINES {
                tail.pop_front();
            }
            tail.push_back(line);
        }
        Vec::from(tail).join("\n")
    }
}

#[async_trait]
impl Encoder for HandBrakeEncoder {
    fn name(&self) -> &str {
        "handbrake"
    }

    async fn encode(
        &self,
        job: &EncodeJob,
        progress_tx: mpsc::Sender<EncodeProgress>,
        mut stop: broadcast::Receiver<()>,
    ) -> Result<(), TranscodeError> {
        let args = Self::build_args(job);
        debug!("Running {} {}", self.binary.display(), args.join(" "));

        let mut child = Command::new(&self.binary)
            .args(&args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| {
                if e.kind() == std::io::ErrorKind::NotFound {
                    TranscodeError::MissingDependency(ToolPathResolver::install_instructions(HANDBRAKE))
                } else {
                    TranscodeError::Io(e)
                }
            })?;

        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| TranscodeError::encoder_failed("encoder stdout was not captured", None))?;
        let stderr = child
            .stderr
            .take()
            .ok_or_else(|| TranscodeError::encoder_failed("encoder stderr was not captured", None))?;
        let stderr_task = tokio::spawn(Self::collect_stderr_tail(stderr));

        let limit = self.timeout;
        let run = async {
            Self::pump_progress(stdout, progress_tx, PROGRESS_INTERVAL).await?;
            Ok::<_, TranscodeError>(child.wait().await?)
        };
        let timed = async {
            match limit {
                Some(limit) => tokio::time::timeout(limit, run)
                    .await
                    .unwrap_or(Err(TranscodeError::EncoderTimeout {
                        timeout_secs: limit.as_secs(),
                    })),
                None => run.await,
            }
        };

        let outcome = tokio::select! {
            result = timed => result,
            _ = stop_requested(&mut stop) => Err(TranscodeError::Cancelled),
        };

        let status = match outcome {
            Ok(status) => status,
            Err(e) => {
                warn!("Stopping {}: {}", HANDBRAKE, e);
                let _ = child.kill().await;
                stderr_task.abort();
                return Err(e);
            }
        };

        let stderr_tail = stderr_task.await.unwrap_or_default();
        if !status.success() {
            return Err(TranscodeError::encoder_failed(
                format!("{} exited with code {:?}", HANDBRAKE, status.code()),
                (!stderr_tail.is_empty()).then_some(stderr_tail),
            ));
        }

        Ok(())
    }

    async fn validate(&self) -> Result<(), TranscodeError> {
        if ToolPathResolver::is_executable(&self.binary) {
            Ok(())
        } else {
            Err(TranscodeError::MissingDependency(
                ToolPathResolver::install_instructions(HANDBRAKE),
            ))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::planner::{Dimensions, EncodePlan};

    fn job(two_pass: bool, turbo: bool) -> EncodeJob {
        EncodeJob {
            input_path: PathBuf::from("/videos/clip.mov"),
            output_path: PathBuf::from("/videos/clip-encoded.mp4"),
            plan: EncodePlan {
                target_bitrate_kbps: 79.99,
                dimensions: Dimensions::new(853.33, 479.9),
                two_pass,
                turbo,
            },
        }
    }

    #[test]
    fn test_build_args() {
        let args = HandBrakeEncoder::build_args(&job(true, true));
        assert_eq!(
            args,
            vec![
                "-i", "/videos/clip.mov", "-o", "/videos/clip-encoded.mp4", "-f", "av_mp4", "-e", "x264",
                "--optimize", "--vb", "80", "--two-pass", "--turbo", "-w", "854", "-l", "480",
            ]
        );
    }

    #[test]
    fn test_turbo_requires_two_pass() {
        let args = HandBrakeEncoder::build_args(&job(false, true));
        assert!(!args.contains(&"--two-pass".to_string()));
        assert!(!args.contains(&"--turbo".to_string()));
    }

    #[test]
    fn test_tiny_bitrate_is_at_least_one() {
        let mut job = job(true, true);
        job.plan.target_bitrate_kbps = 0.2;
        let args = HandBrakeEncoder::build_args(&job);
        let vb = args.iter().position(|a| a == "--vb").unwrap();
        assert_eq!(args[vb + 1], "1");
    }

    #[test]
    fn test_parse_progress() {
        let line = "Encoding: task 1 of 2, 12.34 % (45.67 fps, avg 50.00 fps, ETA 00h01m23s)";
        let progress = HandBrakeEncoder::parse_progress(line).unwrap();
        assert_eq!(progress.task, Some((1, 2)));
        assert!((progress.percent - 12.34).abs() < 1e-4);
        assert_eq!(progress.eta.as_deref(), Some("00h01m23s"));

        let early = HandBrakeEncoder::parse_progress("Encoding: task 2 of 2, 0.50 %").unwrap();
        assert_eq!(early.task, Some((2, 2)));
        assert_eq!(early.eta, None);

        assert!(HandBrakeEncoder::parse_progress("[12:00:01] x264 [info]: profile High").is_none());
    }

    #[tokio::test]
    async fn test_pump_progress_throttles() {
        let output = "Encoding: task 1 of 2, 1.00 %\r\
                      Encoding: task 1 of 2, 2.00 %\r\
                      Encoding: task 1 of 2, 3.00 %\r\
                      Encoding: task 2 of 2, 50.00 %\r\
                      Encoding: task 2 of 2, 100.00 % (ETA 00h00m00s)\r\n";
        let (tx, mut rx) = mpsc::channel(16);
        HandBrakeEncoder::pump_progress(output.as_bytes(), tx, Duration::from_secs(60))
            .await
            .unwrap();

        let mut received = Vec::new();
        while let Some(progress) = rx.recv().await {
            received.push(progress);
        }
        let percents: Vec<f32> = received.iter().map(|p| p.percent).collect();
        assert_eq!(percents, vec![1.0, 50.0, 100.0]);
    }

    #[cfg(unix)]
    mod process {
        use super::*;
        use std::os::unix::fs::PermissionsExt;

        fn script(dir: &std::path::Path, body: &str) -> PathBuf {
            let path = dir.join("fake-handbrake.sh");
            std::fs::write(&path, format!("#!/bin/sh\n{}\n", body)).unwrap();
            std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755)).unwrap();
            path
        }

        fn job_in(dir: &std::path::Path) -> EncodeJob {
            let mut job = job(true, true);
            job.input_path = dir.join("in.mp4");
            job.output_path = dir.join("out.mp4");
            job
        }

        #[tokio::test]
        async fn test_successful_encode_reports_progress() {
            let dir = tempfile::TempDir::new().unwrap();
            let binary = script(
                dir.path(),
                r#"out=""
while [ $# -gt 0 ]; do
  if [ "$1" = "-o" ]; then out="$2"; fi
  shift
done
printf 'Encoding: task 1 of 2, 50.00 %% (10.0 fps, avg 10.0 fps, ETA 00h00m01s)\r'
printf 'Encoding: task 2 of 2, 100.00 %%\r'
printf 'data' > "$out"
exit 0"#,
            );
            let encoder = HandBrakeEncoder::new(binary, Some(Duration::from_secs(30)));
            let signal = crate::encoder::StopSignal::new();
            let (tx, mut rx) = mpsc::channel(16);
            let job = job_in(dir.path());

            encoder.encode(&job, tx, signal.subscribe()).await.unwrap();

            let mut received = Vec::new();
            while let Some(progress) = rx.recv().await {
                received.push(progress);
            }
            assert_eq!(received.len(), 2);
            assert_eq!(received[0].eta.as_deref(), Some("00h00m01s"));
            assert_eq!(received[1].percent, 100.0);
            assert_eq!(std::fs::read(&job.output_path).unwrap(), b"data");
        }

        #[tokio::test]
        async fn test_failed_encode_carries_stderr() {
            let dir = tempfile::TempDir::new().unwrap();
            let binary = script(dir.path(), "echo 'Invalid input' >&2\nexit 3");
            let encoder = HandBrakeEncoder::new(binary, None);
            let signal = crate::encoder::StopSignal::new();
            let (tx, _rx) = mpsc::channel(16);

            let err = encoder.encode(&job_in(dir.path()), tx, signal.subscribe()).await.unwrap_err();
            match err {
                TranscodeError::EncoderFailure { reason, stderr } => {
                    assert!(reason.contains("Some(3)"));
                    assert_eq!(stderr.as_deref(), Some("Invalid input"));
                }
                other => panic!("unexpected error: {other}"),
            }
        }

        #[tokio::test]
        async fn test_stop_kills_encoder() {
            let dir = tempfile::TempDir::new().unwrap();
            let binary = script(dir.path(), "exec sleep 30");
            let encoder = HandBrakeEncoder::new(binary, None);
            let signal = crate::encoder::StopSignal::new();
            let (tx, _rx) = mpsc::channel(16);
            let rx_stop = signal.subscribe();

            let trigger = signal.clone();
            tokio::spawn(async move {
                tokio::time::sleep(Duration::from_millis(100)).await;
                trigger.fire();
            });

            let started = Instant::now();
            let err = encoder.encode(&job_in(dir.path()), tx, rx_stop).await.unwrap_err();
            assert!(matches!(err, TranscodeError::Cancelled));
            assert!(started.elapsed() < Duration::from_secs(10));
        }

        #[tokio::test]
        async fn test_timeout_kills_encoder() {
            let dir = tempfile::TempDir::new().unwrap();
            let binary = script(dir.path(), "exec sleep 30");
            let encoder = HandBrakeEncoder::new(binary, Some(Duration::from_millis(200)));
            let signal = crate::encoder::StopSignal::new();
            let (tx, _rx) = mpsc::channel(16);

            let err = encoder.encode(&job_in(dir.path()), tx, signal.subscribe()).await.unwrap_err();
            assert!(matches!(err, TranscodeError::EncoderTimeout { .. }));
        }

        #[tokio::test]
        async fn test_missing_binary_is_missing_dependency() {
            let encoder = HandBrakeEncoder::new(PathBuf::from("/definitely/not/HandBrakeCLI"), None);
            let signal = crate::encoder::StopSignal::new();
            let (tx, _rx) = mpsc::channel(16);
            let err = encoder.encode(&job(true, true), tx, signal.subscribe()).await.unwrap_err();
            assert!(matches!(err, TranscodeError::MissingDependency(_)));
            assert!(encoder.validate().await.is_err());
        }
    }
}
