use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter, Result as FmtResult};

/// Transcoding state of a video asset. Images and audio have no
/// processing state. Set to `Processing` the moment a job is launched so
/// readers always see in-flight work.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ProcessingStatus {
    Pending,
    Processing,
    Completed,
    Failed,
}

impl Display for ProcessingStatus {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        match self {
            ProcessingStatus::Pending => write!(f, "pending"),
            ProcessingStatus::Processing => write!(f, "processing"),
            ProcessingStatus::Completed => write!(f, "completed"),
            ProcessingStatus::Failed => write!(f, "failed"),
        }
    }
}

/// One entry of the static quality-ladder table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QualityTier {
    pub quality: &'static str,
    pub width: u32,
    pub height: u32,
    /// Target video bitrate in kbps (also the maxrate cap).
    pub video_bitrate_kbps: u32,
    /// Target audio bitrate in kbps.
    pub audio_bitrate_kbps: u32,
    pub label: &'static str,
}

/// One stored re-encoded quality variant of a video asset. The full list
/// is written atomically when a processing job completes.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct VideoVariant {
    pub quality: String,
    pub label: String,
    pub url: String,
    pub key: String,
    pub width: u32,
    pub height: u32,
    pub size: u64,
}

/// Completion-callback payload for one processing job run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProcessingOutcome {
    pub success: bool,
    pub versions: Vec<VideoVariant>,
    /// `WxH` of the probed source, when probing succeeded.
    pub original_resolution: Option<String>,
    /// Source duration in seconds, when probing succeeded.
    pub duration: Option<f64>,
    pub error: Option<String>,
}

impl ProcessingOutcome {
    pub fn failure(error: impl Into<String>) -> Self {
        Self {
            success: false,
            versions: Vec::new(),
            original_resolution: None,
            duration: None,
            error: Some(error.into()),
        }
    }
}

/// Fallback order used when the requested quality is not stored.
pub const QUALITY_PREFERENCE: [&str; 3] = ["1080p", "720p", "480p"];

/// Quality served when a playback request names none.
pub const DEFAULT_QUALITY: &str = "1080p";

/// Resolve the playback URL for a requested quality against the stored
/// variant list. Total: returns the exact match if present, else the
/// first variant in preference order, else the original source URL.
pub fn resolve_quality_url(requested: &str, variants: &[VideoVariant], original_url: &str) -> String {
    if requested == "original" || variants.is_empty() {
        return original_url.to_string();
    }

    if let Some(variant) = variants.iter().find(|v| v.quality == requested) {
        return variant.url.clone();
    }

    for quality in QUALITY_PREFERENCE {
        if let Some(variant) = variants.iter().find(|v| v.quality == quality) {
            return variant.url.clone();
        }
    }

    original_url.to_string()
}

/// Qualities stored for an asset, in preference order, always ending with
/// `original`.
pub fn available_qualities(variants: &[VideoVariant]) -> Vec<String> {
    let mut qualities: Vec<String> = QUALITY_PREFERENCE
        .iter()
        .filter(|q| variants.iter().any(|v| v.quality == **q))
        .map(|q| q.to_string())
        .collect();
    qualities.push("original".to_string());
    qualities
}

#[cfg(test)]
mod tests {
    use super::*;

    fn variant(quality: &str) -> VideoVariant {
        VideoVariant {
            quality: quality.to_string(),
            label: quality.to_string(),
            url: format!("http://cdn/{}.mp4", quality),
            key: format!("uploads/u/videos/{}.mp4", quality),
            width: 1280,
            height: 720,
            size: 1024,
        }
    }

    #[test]
    fn test_processing_status_serde() {
        assert_eq!(
            serde_json::to_string(&ProcessingStatus::Processing).unwrap(),
            "\"processing\""
        );
        assert_eq!(ProcessingStatus::Failed.to_string(), "failed");
        assert_ne!(ProcessingStatus::Pending, ProcessingStatus::Processing);
    }

    #[test]
    fn test_resolve_exact_match() {
        let variants = vec![variant("1080p"), variant("720p"), variant("480p")];
        assert_eq!(
            resolve_quality_url("720p", &variants, "http://cdn/orig.mp4"),
            "http://cdn/720p.mp4"
        );
    }

    #[test]
    fn test_resolve_falls_back_in_preference_order() {
        let variants = vec![variant("480p"), variant("720p")];
        // 1080p not stored: best available wins, not list order.
        assert_eq!(
            resolve_quality_url("1080p", &variants, "http://cdn/orig.mp4"),
            "http://cdn/720p.mp4"
        );
    }

    #[test]
    fn test_resolve_empty_list_returns_original() {
        assert_eq!(
            resolve_quality_url("1080p", &[], "http://cdn/orig.mp4"),
            "http://cdn/orig.mp4"
        );
    }

    #[test]
    fn test_resolve_original_keyword() {
        let variants = vec![variant("1080p")];
        assert_eq!(
            resolve_quality_url("original", &variants, "http://cdn/orig.mp4"),
            "http://cdn/orig.mp4"
        );
    }

    #[test]
    fn test_resolve_is_total_for_unknown_labels() {
        let variants = vec![variant("480p")];
        assert_eq!(
            resolve_quality_url("4k", &variants, "http://cdn/orig.mp4"),
            "http://cdn/480p.mp4"
        );
        assert_eq!(
            resolve_quality_url("", &[], "http://cdn/orig.mp4"),
            "http://cdn/orig.mp4"
        );
    }

    #[test]
    fn test_available_qualities_ordered() {
        let variants = vec![variant("480p"), variant("1080p")];
        assert_eq!(
            available_qualities(&variants),
            vec!["1080p", "480p", "original"]
        );
        assert_eq!(available_qualities(&[]), vec!["original"]);
    }
}
