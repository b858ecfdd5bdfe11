//! Video transcoder - per-tier H.264 re-encode under timeout supervision.
//!
//! ffmpeg is launched with `-progress pipe:1` so it reports progress as a
//! `key=value` line stream on stdout. Two budgets supervise every tier:
//! an inactivity window reset on each progress line, and an absolute
//! ceiling. Either trigger kills the encoder and yields `EncodeTimeout`
//! for that tier only. The output scratch file is a `TempPath`, deleted
//! on drop on every exit path.

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use std::path::Path;
use std::process::Stdio;
use std::time::Duration;
use tempfile::TempPath;
use tokio::io::{AsyncBufReadExt, AsyncReadExt, BufReader};
use tokio::process::{Child, Command};
use tokio::time::Instant;

use mediaforge_core::models::QualityTier;
use mediaforge_core::{PipelineError, ProcessingConfig, TimeoutKind};

use crate::ladder::target_dimensions;
use crate::probe::SourceInfo;

/// A successfully transcoded tier, holding its output scratch file.
#[derive(Debug)]
pub struct TranscodedTier {
    pub quality: &'static str,
    pub label: &'static str,
    pub width: u32,
    pub height: u32,
    /// Scratch file with the encoded output; deleted when dropped.
    pub output: TempPath,
}

#[async_trait]
pub trait VideoEncoder: Send + Sync {
    /// Re-encode `input` for one tier. Target dimensions come from the
    /// tier and the probed source geometry.
    async fn transcode(
        &self,
        input: &Path,
        tier: &'static QualityTier,
        source: &SourceInfo,
    ) -> Result<TranscodedTier, PipelineError>;
}

/// One progress report from ffmpeg's `-progress` stream.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ProgressEvent {
    pub frame: Option<u64>,
    pub out_time_us: Option<i64>,
    pub speed: Option<f32>,
    pub end: bool,
}

/// Accumulates `key=value` lines; a full event is emitted at each
/// `progress=` terminator line.
#[derive(Default)]
pub struct ProgressParser {
    current: ProgressEvent,
}

impl ProgressParser {
    pub fn push_line(&mut self, line: &str) -> Option<ProgressEvent> {
        let (key, value) = line.trim().split_once('=')?;
        match key {
            "frame" => self.current.frame = value.parse().ok(),
            "out_time_us" => self.current.out_time_us = value.parse().ok(),
            "speed" => self.current.speed = value.trim().trim_end_matches('x').parse().ok(),
            "progress" => {
                let mut event = std::mem::take(&mut self.current);
                event.end = value == "end";
                return Some(event);
            }
            _ => {}
        }
        None
    }
}

/// Fixed-policy ffmpeg argument list for one tier.
fn build_tier_args(
    input: &Path,
    output: &Path,
    tier: &QualityTier,
    width: u32,
    height: u32,
    has_audio: bool,
) -> Vec<String> {
    let vb = tier.video_bitrate_kbps;
    let mut args = vec![
        "-i".to_string(),
        input.to_string_lossy().to_string(),
        "-c:v".to_string(),
        "libx264".to_string(),
        "-preset".to_string(),
        "medium".to_string(),
        "-crf".to_string(),
        "23".to_string(),
        "-b:v".to_string(),
        format!("{}k", vb),
        "-maxrate".to_string(),
        format!("{}k", vb),
        "-bufsize".to_string(),
        format!("{}k", vb * 2),
        "-vf".to_string(),
        format!("scale={}:{}", width, height),
    ];

    if has_audio {
        args.extend_from_slice(&[
            "-c:a".to_string(),
            "aac".to_string(),
            "-b:a".to_string(),
            format!("{}k", tier.audio_bitrate_kbps),
        ]);
    } else {
        args.push("-an".to_string());
    }

    args.extend_from_slice(&[
        "-movflags".to_string(),
        "+faststart".to_string(),
        "-progress".to_string(),
        "pipe:1".to_string(),
        "-nostats".to_string(),
        "-y".to_string(),
        output.to_string_lossy().to_string(),
    ]);

    args
}

pub struct FfmpegTranscoder {
    ffmpeg_path: String,
    inactivity: Duration,
    ceiling: Duration,
}

impl FfmpegTranscoder {
    pub fn new(config: &ProcessingConfig) -> Result<Self> {
        let dangerous_chars = [';', '|', '&', '$', '`', '(', ')', '<', '>', '\n', '\r'];
        if config.ffmpeg_path.chars().any(|c| dangerous_chars.contains(&c)) {
            return Err(anyhow!("Invalid ffmpeg_path: contains dangerous characters"));
        }

        Ok(Self {
            ffmpeg_path: config.ffmpeg_path.clone(),
            inactivity: Duration::from_secs(config.transcode_inactivity_timeout_secs),
            ceiling: Duration::from_secs(config.transcode_ceiling_secs),
        })
    }

    async fn kill_for_timeout(
        &self,
        child: &mut Child,
        tier: &QualityTier,
        kind: TimeoutKind,
        budget: Duration,
    ) -> PipelineError {
        let _ = child.start_kill();
        let _ = child.wait().await;

        tracing::warn!(
            quality = tier.quality,
            kind = %kind,
            budget_secs = budget.as_secs(),
            "Transcode timed out, encoder killed"
        );

        PipelineError::EncodeTimeout {
            quality: tier.quality.to_string(),
            seconds: budget.as_secs(),
            kind,
        }
    }
}

#[async_trait]
impl VideoEncoder for FfmpegTranscoder {
    #[tracing::instrument(skip(self, input, source), fields(quality = tier.quality))]
    async fn transcode(
        &self,
        input: &Path,
        tier: &'static QualityTier,
        source: &SourceInfo,
    ) -> Result<TranscodedTier, PipelineError> {
        let (width, height) = target_dimensions(tier, source.width, source.height);

        let output = tempfile::Builder::new()
            .prefix(&format!("{}_", tier.quality))
            .suffix(".mp4")
            .tempfile()?
            .into_temp_path();

        let args = build_tier_args(input, &output, tier, width, height, source.has_audio);

        tracing::info!(width = width, height = height, "Starting transcode");
        let start = Instant::now();

        let mut child = Command::new(&self.ffmpeg_path)
            .args(&args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| PipelineError::Encode {
                quality: tier.quality.to_string(),
                message: format!("Failed to spawn ffmpeg: {}", e),
            })?;

        let stdout = child.stdout.take().ok_or_else(|| PipelineError::Encode {
            quality: tier.quality.to_string(),
            message: "ffmpeg stdout not captured".to_string(),
        })?;
        let mut stderr = child.stderr.take().ok_or_else(|| PipelineError::Encode {
            quality: tier.quality.to_string(),
            message: "ffmpeg stderr not captured".to_string(),
        })?;

        // Drain stderr concurrently so the encoder can't block on a full pipe.
        let stderr_task = tokio::spawn(async move {
            let mut buf = String::new();
            let _ = stderr.read_to_string(&mut buf).await;
            buf
        });

        let deadline = start + self.ceiling;
        let mut lines = BufReader::new(stdout).lines();
        let mut parser = ProgressParser::default();

        loop {
            let now = Instant::now();
            if now >= deadline {
                stderr_task.abort();
                return Err(self
                    .kill_for_timeout(&mut child, tier, TimeoutKind::Ceiling, self.ceiling)
                    .await);
            }

            let window = self.inactivity.min(deadline - now);
            match tokio::time::timeout(window, lines.next_line()).await {
                Err(_) => {
                    let kind = if Instant::now() >= deadline {
                        TimeoutKind::Ceiling
                    } else {
                        TimeoutKind::Inactivity
                    };
                    let budget = match kind {
                        TimeoutKind::Ceiling => self.ceiling,
                        TimeoutKind::Inactivity => self.inactivity,
                    };
                    stderr_task.abort();
                    return Err(self.kill_for_timeout(&mut child, tier, kind, budget).await);
                }
                Ok(Ok(Some(line))) => {
                    if let Some(event) = parser.push_line(&line) {
                        tracing::debug!(
                            frame = event.frame,
                            out_time_us = event.out_time_us,
                            speed = event.speed.map(f64::from),
                            "Transcode progress"
                        );
                    }
                }
                // Stream closed: the encoder is exiting.
                Ok(Ok(None)) => break,
                Ok(Err(e)) => {
                    stderr_task.abort();
                    let _ = child.start_kill();
                    let _ = child.wait().await;
                    return Err(PipelineError::Io(e));
                }
            }
        }

        let remaining = deadline.saturating_duration_since(Instant::now());
        let status = match tokio::time::timeout(remaining.max(Duration::from_secs(5)), child.wait())
            .await
        {
            Ok(Ok(status)) => status,
            Ok(Err(e)) => {
                stderr_task.abort();
                return Err(PipelineError::Io(e));
            }
            Err(_) => {
                stderr_task.abort();
                return Err(self
                    .kill_for_timeout(&mut child, tier, TimeoutKind::Ceiling, self.ceiling)
                    .await);
            }
        };

        let stderr_output = stderr_task.await.unwrap_or_default();

        if !status.success() {
            return Err(PipelineError::Encode {
                quality: tier.quality.to_string(),
                message: format!("ffmpeg exited with {}: {}", status, stderr_output.trim()),
            });
        }

        tracing::info!(
            duration_ms = start.elapsed().as_millis() as u64,
            "Transcode complete"
        );

        Ok(TranscodedTier {
            quality: tier.quality,
            label: tier.label,
            width,
            height,
            output,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ladder::QUALITY_TIERS;

    #[test]
    fn test_progress_parser_emits_event_per_block() {
        let mut parser = ProgressParser::default();
        assert_eq!(parser.push_line("frame=120"), None);
        assert_eq!(parser.push_line("out_time_us=4000000"), None);
        assert_eq!(parser.push_line("speed=1.5x"), None);

        let event = parser.push_line("progress=continue").unwrap();
        assert_eq!(event.frame, Some(120));
        assert_eq!(event.out_time_us, Some(4_000_000));
        assert_eq!(event.speed, Some(1.5));
        assert!(!event.end);

        let event = parser.push_line("progress=end").unwrap();
        assert!(event.end);
        // State resets between blocks.
        assert_eq!(event.frame, None);
    }

    #[test]
    fn test_progress_parser_ignores_noise() {
        let mut parser = ProgressParser::default();
        assert_eq!(parser.push_line("not a progress line"), None);
        assert_eq!(parser.push_line("bitrate=1024.0kbits/s"), None);
    }

    #[test]
    fn test_tier_args_fixed_policy() {
        let tier = &QUALITY_TIERS[1]; // 720p
        let args = build_tier_args(
            Path::new("/tmp/in.mp4"),
            Path::new("/tmp/out.mp4"),
            tier,
            1280,
            720,
            true,
        );
        let joined = args.join(" ");

        assert!(joined.contains("-c:v libx264"));
        assert!(joined.contains("-preset medium"));
        assert!(joined.contains("-crf 23"));
        assert!(joined.contains("-b:v 2500k"));
        assert!(joined.contains("-maxrate 2500k"));
        assert!(joined.contains("-bufsize 5000k"));
        assert!(joined.contains("-vf scale=1280:720"));
        assert!(joined.contains("-c:a aac"));
        assert!(joined.contains("-b:a 128k"));
        assert!(joined.contains("-movflags +faststart"));
        assert!(joined.contains("-progress pipe:1"));
    }

    #[test]
    fn test_tier_args_silent_source_drops_audio() {
        let tier = &QUALITY_TIERS[2]; // 480p
        let args = build_tier_args(
            Path::new("/tmp/in.mp4"),
            Path::new("/tmp/out.mp4"),
            tier,
            854,
            480,
            false,
        );
        assert!(args.contains(&"-an".to_string()));
        assert!(!args.contains(&"-c:a".to_string()));
    }

    #[test]
    fn test_transcoder_rejects_dangerous_ffmpeg_path() {
        let config = ProcessingConfig {
            ffmpeg_path: "ffmpeg; rm -rf /".to_string(),
            ..ProcessingConfig::default()
        };
        assert!(FfmpegTranscoder::new(&config).is_err());
        assert!(FfmpegTranscoder::new(&ProcessingConfig::default()).is_ok());
    }
}
