//! Error types module
//!
//! All failures inside the derivative pipeline are represented by
//! [`PipelineError`]. Per-tier encode/upload errors are caught at the tier
//! boundary and excluded from the result set; job-level errors (download,
//! probe) abort the whole job. `ThumbnailUnavailable` is an expected
//! outcome for sources that have nothing to thumbnail, not a failure.

use std::io;

use uuid::Uuid;

/// Which timeout budget fired for a transcode tier.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimeoutKind {
    /// No progress event arrived within the inactivity window.
    Inactivity,
    /// The absolute per-tier ceiling elapsed.
    Ceiling,
}

impl std::fmt::Display for TimeoutKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TimeoutKind::Inactivity => write!(f, "inactivity"),
            TimeoutKind::Ceiling => write!(f, "ceiling"),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    #[error("Download failed: {0}")]
    Download(String),

    #[error("Probe failed: {0}")]
    Probe(String),

    #[error("Encode failed for {quality}: {message}")]
    Encode { quality: String, message: String },

    #[error("Encode timed out for {quality} after {seconds}s ({kind} timeout)")]
    EncodeTimeout {
        quality: String,
        seconds: u64,
        kind: TimeoutKind,
    },

    #[error("Upload failed: {0}")]
    Upload(String),

    #[error("No thumbnail available: {0}")]
    ThumbnailUnavailable(String),

    #[error("Processing already in progress for media {0}")]
    AlreadyProcessing(Uuid),

    #[error("IO error: {0}")]
    Io(#[from] io::Error),
}

impl PipelineError {
    /// True when the error is one of the two transcode timeout triggers.
    pub fn is_timeout(&self) -> bool {
        matches!(self, PipelineError::EncodeTimeout { .. })
    }

    /// Quality tier the error belongs to, for per-tier errors.
    pub fn quality(&self) -> Option<&str> {
        match self {
            PipelineError::Encode { quality, .. } => Some(quality),
            PipelineError::EncodeTimeout { quality, .. } => Some(quality),
            _ => None,
        }
    }

    /// True for errors that abort the whole job rather than a single tier.
    pub fn is_job_fatal(&self) -> bool {
        matches!(
            self,
            PipelineError::Download(_) | PipelineError::Probe(_) | PipelineError::Io(_)
        )
    }
}
