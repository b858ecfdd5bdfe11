use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter, Result as FmtResult};
use std::str::FromStr;
use uuid::Uuid;

/// Kind of uploaded source asset. Thumbnailing is dispatched on this tag;
/// only `Video` goes through the transcoding pipeline.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum MediaType {
    Image,
    Video,
    Audio,
}

impl Display for MediaType {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        match self {
            MediaType::Image => write!(f, "image"),
            MediaType::Video => write!(f, "video"),
            MediaType::Audio => write!(f, "audio"),
        }
    }
}

impl FromStr for MediaType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "image" => Ok(MediaType::Image),
            "video" => Ok(MediaType::Video),
            "audio" => Ok(MediaType::Audio),
            other => Err(format!("Unknown media type: {}", other)),
        }
    }
}

/// The original uploaded media file. Immutable once uploaded.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceAsset {
    pub media_type: MediaType,
    pub url: String,
    pub owner_id: Uuid,
    pub filename: String,
    pub content_type: String,
    pub size: u64,
}

/// Preview thumbnail derivative. Both fields are set or both are absent;
/// absence is a valid outcome (e.g. audio with no embedded cover art).
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct Thumbnail {
    pub url: Option<String>,
    pub key: Option<String>,
}

impl Thumbnail {
    pub fn new(url: String, key: String) -> Self {
        Self {
            url: Some(url),
            key: Some(key),
        }
    }

    /// The explicit "no thumbnail" outcome.
    pub fn none() -> Self {
        Self::default()
    }

    pub fn is_none(&self) -> bool {
        self.url.is_none()
    }
}

/// In-memory bundle handed to the processing orchestrator for one run.
/// Transient; it has no identity beyond the single job.
#[derive(Debug, Clone)]
pub struct ProcessingJob {
    pub source_url: String,
    pub owner_id: Uuid,
    pub filename: String,
    pub media_id: Uuid,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_media_type_round_trip() {
        for (s, t) in [
            ("image", MediaType::Image),
            ("video", MediaType::Video),
            ("audio", MediaType::Audio),
        ] {
            assert_eq!(s.parse::<MediaType>().unwrap(), t);
            assert_eq!(t.to_string(), s);
        }
        assert!("document".parse::<MediaType>().is_err());
    }

    #[test]
    fn test_thumbnail_none() {
        let t = Thumbnail::none();
        assert!(t.is_none());
        assert_eq!(t.url, None);
        assert_eq!(t.key, None);

        let t = Thumbnail::new("http://x/y.webp".to_string(), "y.webp".to_string());
        assert!(!t.is_none());
    }
}
