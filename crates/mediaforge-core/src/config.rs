//! Configuration module
//!
//! Environment-driven configuration for the processing pipeline and the
//! local storage backend. Call [`ProcessingConfig::from_env`] once at
//! startup; every knob has a default so a bare environment works.

use std::env;
use std::str::FromStr;

// Timeout defaults, in seconds.
const TRANSCODE_INACTIVITY_TIMEOUT_SECS: u64 = 5 * 60;
const TRANSCODE_CEILING_SECS: u64 = 30 * 60;
const THUMBNAIL_FRAME_TIMEOUT_SECS: u64 = 30;
const COVER_ART_TIMEOUT_SECS: u64 = 15;

fn env_or(name: &str, default: &str) -> String {
    env::var(name).unwrap_or_else(|_| default.to_string())
}

fn env_parse<T: FromStr>(name: &str, default: T) -> T {
    env::var(name)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

/// Processing pipeline configuration (external tool paths and budgets).
#[derive(Clone, Debug)]
pub struct ProcessingConfig {
    pub ffmpeg_path: String,
    pub ffprobe_path: String,
    /// Abort a tier when no progress event arrives within this window.
    pub transcode_inactivity_timeout_secs: u64,
    /// Abort a tier unconditionally after this long.
    pub transcode_ceiling_secs: u64,
    /// Budget for extracting a single video frame for a thumbnail.
    pub thumbnail_frame_timeout_secs: u64,
    /// Budget for extracting embedded cover art from an audio container.
    pub cover_art_timeout_secs: u64,
}

impl Default for ProcessingConfig {
    fn default() -> Self {
        Self {
            ffmpeg_path: "ffmpeg".to_string(),
            ffprobe_path: "ffprobe".to_string(),
            transcode_inactivity_timeout_secs: TRANSCODE_INACTIVITY_TIMEOUT_SECS,
            transcode_ceiling_secs: TRANSCODE_CEILING_SECS,
            thumbnail_frame_timeout_secs: THUMBNAIL_FRAME_TIMEOUT_SECS,
            cover_art_timeout_secs: COVER_ART_TIMEOUT_SECS,
        }
    }
}

impl ProcessingConfig {
    pub fn from_env() -> Self {
        dotenvy::dotenv().ok();

        Self {
            ffmpeg_path: env_or("FFMPEG_PATH", "ffmpeg"),
            ffprobe_path: env_or("FFPROBE_PATH", "ffprobe"),
            transcode_inactivity_timeout_secs: env_parse(
                "TRANSCODE_INACTIVITY_TIMEOUT_SECS",
                TRANSCODE_INACTIVITY_TIMEOUT_SECS,
            ),
            transcode_ceiling_secs: env_parse("TRANSCODE_CEILING_SECS", TRANSCODE_CEILING_SECS),
            thumbnail_frame_timeout_secs: env_parse(
                "THUMBNAIL_FRAME_TIMEOUT_SECS",
                THUMBNAIL_FRAME_TIMEOUT_SECS,
            ),
            cover_art_timeout_secs: env_parse("COVER_ART_TIMEOUT_SECS", COVER_ART_TIMEOUT_SECS),
        }
    }
}

/// Local storage backend configuration.
#[derive(Clone, Debug)]
pub struct StorageConfig {
    /// Root directory for stored files.
    pub base_path: String,
    /// Base URL files are served from.
    pub base_url: String,
}

impl StorageConfig {
    pub fn from_env() -> Self {
        dotenvy::dotenv().ok();

        Self {
            base_path: env_or("STORAGE_BASE_PATH", "./data/media"),
            base_url: env_or("STORAGE_BASE_URL", "http://localhost:3000/media"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = ProcessingConfig::default();
        assert_eq!(config.ffmpeg_path, "ffmpeg");
        assert_eq!(config.transcode_inactivity_timeout_secs, 300);
        assert_eq!(config.transcode_ceiling_secs, 1800);
        assert_eq!(config.thumbnail_frame_timeout_secs, 30);
        assert_eq!(config.cover_art_timeout_secs, 15);
    }
}
