//! Derivative-generation pipeline: quality-ladder planning, video
//! transcoding, thumbnail generation, and the asynchronous processing
//! orchestrator.
//!
//! External tools (ffmpeg/ffprobe) are driven through process wrappers
//! with timeout supervision; every seam (fetch, probe, encode, extract,
//! report) is a trait so collaborators and tests can substitute their own
//! implementations.

pub mod extract;
pub mod fetch;
pub mod ladder;
pub mod orchestrator;
pub mod probe;
pub mod thumbnail;
pub mod transcode;
pub mod upload;

pub use extract::{FfmpegFrameExtractor, FrameExtractor};
pub use fetch::{HttpFetcher, SourceFetcher};
pub use ladder::{plan_ladder, target_dimensions, QUALITY_TIERS};
pub use orchestrator::{ProcessingReporter, VideoOrchestrator};
pub use probe::{CoverArtStream, FfprobeService, SourceInfo, SourceProber};
pub use thumbnail::{ThumbnailGenerator, ThumbnailRequest};
pub use transcode::{FfmpegTranscoder, TranscodedTier, VideoEncoder};
pub use upload::DerivativeUploader;
