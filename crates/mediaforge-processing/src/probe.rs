//! Source probing - ffprobe wrapper for stream metadata.

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use tokio::process::Command;

use mediaforge_core::PipelineError;

/// Codecs that mark a video-typed stream as embedded cover art rather
/// than actual video.
const COVER_ART_CODECS: [&str; 3] = ["mjpeg", "png", "bmp"];

/// Metadata probed from a source asset. For audio sources `width`/
/// `height` are 0 and `has_audio` refers to the audio stream itself.
#[derive(Debug, Clone, PartialEq)]
pub struct SourceInfo {
    pub duration: f64,
    pub width: u32,
    pub height: u32,
    pub has_audio: bool,
    pub bitrate: Option<u64>,
}

/// An embedded cover-art stream inside an audio container.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CoverArtStream {
    /// Stream index within the container.
    pub index: u32,
    pub codec: String,
}

#[async_trait]
pub trait SourceProber: Send + Sync {
    /// Probe a source (URL or local path) for duration, dimensions and
    /// audio presence. Failure is fatal to a transcode job.
    async fn probe(&self, target: &str) -> Result<SourceInfo, PipelineError>;

    /// Look for an embedded cover-art stream. `None` is a valid outcome
    /// for audio without art, not a failure.
    async fn find_cover_art(&self, target: &str) -> Result<Option<CoverArtStream>, PipelineError>;
}

/// Validate that a probe target doesn't contain shell metacharacters.
fn validate_target(target: &str) -> Result<()> {
    let dangerous_chars = [';', '|', '&', '$', '`', '(', ')', '<', '>', '\n', '\r'];
    if target.chars().any(|c| dangerous_chars.contains(&c)) {
        return Err(anyhow!("Probe target contains dangerous characters: {}", target));
    }
    Ok(())
}

pub struct FfprobeService {
    ffprobe_path: String,
}

impl FfprobeService {
    pub fn new(ffprobe_path: String) -> Result<Self> {
        validate_target(&ffprobe_path)?;
        Ok(Self { ffprobe_path })
    }

    #[tracing::instrument(skip(self), fields(
        process.executable.path = %self.ffprobe_path,
        ffmpeg.operation = "probe"
    ))]
    async fn probe_json(&self, target: &str) -> Result<serde_json::Value, PipelineError> {
        validate_target(target).map_err(|e| PipelineError::Probe(e.to_string()))?;

        let output = Command::new(&self.ffprobe_path)
            .args([
                "-v",
                "quiet",
                "-print_format",
                "json",
                "-show_format",
                "-show_streams",
            ])
            .arg(target)
            .output()
            .await
            .map_err(|e| PipelineError::Probe(format!("Failed to execute ffprobe: {}", e)))?;

        if !output.status.success() {
            return Err(PipelineError::Probe(format!(
                "ffprobe failed: {}",
                String::from_utf8_lossy(&output.stderr)
            )));
        }

        serde_json::from_slice(&output.stdout)
            .map_err(|e| PipelineError::Probe(format!("Failed to parse ffprobe output: {}", e)))
    }
}

fn stream_codec_type(stream: &serde_json::Value) -> Option<&str> {
    stream["codec_type"].as_str()
}

fn is_attached_pic(stream: &serde_json::Value) -> bool {
    stream["disposition"]["attached_pic"].as_i64() == Some(1)
}

#[async_trait]
impl SourceProber for FfprobeService {
    async fn probe(&self, target: &str) -> Result<SourceInfo, PipelineError> {
        let start = std::time::Instant::now();
        let probe_data = self.probe_json(target).await?;

        let empty = Vec::new();
        let streams = probe_data["streams"].as_array().unwrap_or(&empty);

        // Attached pictures are cover art, not the video track.
        let video_stream = streams
            .iter()
            .find(|s| stream_codec_type(s) == Some("video") && !is_attached_pic(s));
        let has_audio = streams
            .iter()
            .any(|s| stream_codec_type(s) == Some("audio"));

        let format = &probe_data["format"];
        let duration = format["duration"]
            .as_str()
            .and_then(|d| d.parse::<f64>().ok())
            .unwrap_or(0.0);
        let bitrate = format["bit_rate"].as_str().and_then(|b| b.parse::<u64>().ok());

        let width = video_stream
            .and_then(|s| s["width"].as_u64())
            .unwrap_or(0) as u32;
        let height = video_stream
            .and_then(|s| s["height"].as_u64())
            .unwrap_or(0) as u32;

        tracing::info!(
            duration_ms = start.elapsed().as_millis() as u64,
            source_duration = duration,
            width = width,
            height = height,
            has_audio = has_audio,
            "Source probe completed"
        );

        Ok(SourceInfo {
            duration,
            width,
            height,
            has_audio,
            bitrate,
        })
    }

    async fn find_cover_art(&self, target: &str) -> Result<Option<CoverArtStream>, PipelineError> {
        let probe_data = self.probe_json(target).await?;

        let empty = Vec::new();
        let streams = probe_data["streams"].as_array().unwrap_or(&empty);

        let cover = streams.iter().find_map(|s| {
            if stream_codec_type(s) != Some("video") {
                return None;
            }
            let codec = s["codec_name"].as_str().unwrap_or_default();
            if is_attached_pic(s) || COVER_ART_CODECS.contains(&codec) {
                Some(CoverArtStream {
                    index: s["index"].as_u64().unwrap_or(0) as u32,
                    codec: codec.to_string(),
                })
            } else {
                None
            }
        });

        Ok(cover)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_target_rejects_shell_metacharacters() {
        assert!(validate_target("https://cdn/video.mp4").is_ok());
        assert!(validate_target("/tmp/input.mp4").is_ok());
        assert!(validate_target("file.mp4; rm -rf /").is_err());
        assert!(validate_target("$(whoami).mp4").is_err());
    }

    #[test]
    fn test_cover_art_stream_detection() {
        let probe: serde_json::Value = serde_json::json!({
            "streams": [
                { "index": 0, "codec_type": "audio", "codec_name": "mp3" },
                {
                    "index": 1,
                    "codec_type": "video",
                    "codec_name": "mjpeg",
                    "disposition": { "attached_pic": 1 }
                }
            ]
        });

        let streams = probe["streams"].as_array().unwrap();
        let cover = streams
            .iter()
            .find(|s| stream_codec_type(s) == Some("video") && is_attached_pic(s))
            .unwrap();
        assert_eq!(cover["codec_name"].as_str(), Some("mjpeg"));
    }
}
