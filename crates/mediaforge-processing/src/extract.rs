//! Frame and cover-art extraction - short-lived ffmpeg invocations under
//! a kill-on-timeout budget.

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use std::path::Path;
use std::process::Stdio;
use std::time::Duration;
use tokio::process::Command;

use mediaforge_core::{PipelineError, ProcessingConfig};

use crate::probe::CoverArtStream;

#[async_trait]
pub trait FrameExtractor: Send + Sync {
    /// Extract exactly one frame at the given timestamp into `dest`.
    async fn extract_frame(
        &self,
        source: &str,
        at_seconds: f64,
        dest: &Path,
    ) -> Result<(), PipelineError>;

    /// Extract an embedded cover-art stream into `dest`.
    async fn extract_cover_art(
        &self,
        source: &str,
        stream: &CoverArtStream,
        dest: &Path,
    ) -> Result<(), PipelineError>;
}

pub struct FfmpegFrameExtractor {
    ffmpeg_path: String,
    frame_timeout: Duration,
    cover_timeout: Duration,
}

impl FfmpegFrameExtractor {
    pub fn new(config: &ProcessingConfig) -> Result<Self> {
        let dangerous_chars = [';', '|', '&', '$', '`', '(', ')', '<', '>', '\n', '\r'];
        if config.ffmpeg_path.chars().any(|c| dangerous_chars.contains(&c)) {
            return Err(anyhow!("Invalid ffmpeg_path: contains dangerous characters"));
        }

        Ok(Self {
            ffmpeg_path: config.ffmpeg_path.clone(),
            frame_timeout: Duration::from_secs(config.thumbnail_frame_timeout_secs),
            cover_timeout: Duration::from_secs(config.cover_art_timeout_secs),
        })
    }

    /// Run ffmpeg with a hard budget. The child is spawned with
    /// `kill_on_drop`, so dropping the wait future on timeout reaps it.
    async fn run_with_timeout(
        &self,
        args: Vec<String>,
        budget: Duration,
        what: &str,
    ) -> Result<(), PipelineError> {
        let child = Command::new(&self.ffmpeg_path)
            .args(&args)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| {
                PipelineError::ThumbnailUnavailable(format!("Failed to spawn ffmpeg: {}", e))
            })?;

        match tokio::time::timeout(budget, child.wait_with_output()).await {
            Err(_) => Err(PipelineError::ThumbnailUnavailable(format!(
                "{} timed out after {}s",
                what,
                budget.as_secs()
            ))),
            Ok(Ok(output)) if output.status.success() => Ok(()),
            Ok(Ok(output)) => Err(PipelineError::ThumbnailUnavailable(format!(
                "{} failed: {}",
                what,
                String::from_utf8_lossy(&output.stderr).trim()
            ))),
            Ok(Err(e)) => Err(PipelineError::Io(e)),
        }
    }
}

#[async_trait]
impl FrameExtractor for FfmpegFrameExtractor {
    #[tracing::instrument(skip(self, source, dest))]
    async fn extract_frame(
        &self,
        source: &str,
        at_seconds: f64,
        dest: &Path,
    ) -> Result<(), PipelineError> {
        let args = vec![
            "-ss".to_string(),
            at_seconds.to_string(),
            "-i".to_string(),
            source.to_string(),
            "-frames:v".to_string(),
            "1".to_string(),
            "-q:v".to_string(),
            "2".to_string(),
            "-y".to_string(),
            dest.to_string_lossy().to_string(),
        ];

        self.run_with_timeout(args, self.frame_timeout, "Frame extraction")
            .await
    }

    #[tracing::instrument(skip(self, source, dest), fields(codec = %stream.codec))]
    async fn extract_cover_art(
        &self,
        source: &str,
        stream: &CoverArtStream,
        dest: &Path,
    ) -> Result<(), PipelineError> {
        let args = vec![
            "-i".to_string(),
            source.to_string(),
            "-map".to_string(),
            format!("0:{}", stream.index),
            "-frames:v".to_string(),
            "1".to_string(),
            "-y".to_string(),
            dest.to_string_lossy().to_string(),
        ];

        self.run_with_timeout(args, self.cover_timeout, "Cover art extraction")
            .await
    }
}
