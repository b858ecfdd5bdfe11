pub mod media;
pub mod video;

pub use media::{MediaType, ProcessingJob, SourceAsset, Thumbnail};
pub use video::{
    available_qualities, resolve_quality_url, ProcessingOutcome, ProcessingStatus, QualityTier,
    VideoVariant, DEFAULT_QUALITY, QUALITY_PREFERENCE,
};
