//! Thumbnail generator - one fixed-size WebP preview per source asset.
//!
//! Dispatch is on the asset's media type: images are fetched and
//! resized directly, videos contribute a frame from their midpoint, audio
//! contributes embedded cover art when the container has any. The outward
//! API never errors: anything that goes wrong collapses to
//! [`Thumbnail::none`], because a missing preview must never block an
//! upload.

use std::io::Cursor;
use std::sync::Arc;
use uuid::Uuid;

use mediaforge_core::models::{MediaType, Thumbnail};
use mediaforge_core::PipelineError;

use crate::extract::FrameExtractor;
use crate::fetch::SourceFetcher;
use crate::probe::SourceProber;
use crate::upload::DerivativeUploader;

/// Output square edge in pixels.
pub const THUMBNAIL_SIZE: u32 = 150;
/// Lossy WebP quality.
pub const THUMBNAIL_QUALITY: f32 = 80.0;

/// What to thumbnail: the source asset's type, location and owner.
#[derive(Debug, Clone)]
pub struct ThumbnailRequest {
    pub media_type: MediaType,
    pub url: String,
    pub owner_id: Uuid,
    pub filename: String,
}

pub struct ThumbnailGenerator {
    fetcher: Arc<dyn SourceFetcher>,
    prober: Arc<dyn SourceProber>,
    extractor: Arc<dyn FrameExtractor>,
    uploader: DerivativeUploader,
}

impl ThumbnailGenerator {
    pub fn new(
        fetcher: Arc<dyn SourceFetcher>,
        prober: Arc<dyn SourceProber>,
        extractor: Arc<dyn FrameExtractor>,
        uploader: DerivativeUploader,
    ) -> Self {
        Self {
            fetcher,
            prober,
            extractor,
            uploader,
        }
    }

    /// Generate and upload a thumbnail for the given source. Best-effort:
    /// never errors outward.
    #[tracing::instrument(skip(self, request), fields(media_type = %request.media_type, filename = %request.filename))]
    pub async fn generate(&self, request: &ThumbnailRequest) -> Thumbnail {
        match self.try_generate(request).await {
            Ok(thumbnail) => thumbnail,
            Err(PipelineError::ThumbnailUnavailable(reason)) => {
                tracing::info!(reason = %reason, "No thumbnail for this source");
                Thumbnail::none()
            }
            Err(e) => {
                tracing::warn!(error = %e, "Thumbnail generation failed");
                Thumbnail::none()
            }
        }
    }

    async fn try_generate(&self, request: &ThumbnailRequest) -> Result<Thumbnail, PipelineError> {
        let webp_bytes = match request.media_type {
            MediaType::Image => self.image_thumbnail(&request.url).await?,
            MediaType::Video => self.video_thumbnail(&request.url).await?,
            MediaType::Audio => match self.audio_thumbnail(&request.url).await? {
                Some(bytes) => bytes,
                None => return Ok(Thumbnail::none()),
            },
        };

        self.uploader
            .upload_thumbnail(webp_bytes, request.owner_id, &request.filename)
            .await
    }

    async fn image_thumbnail(&self, url: &str) -> Result<Vec<u8>, PipelineError> {
        let bytes = self.fetcher.fetch_bytes(url).await?;
        encode_square_webp(&bytes)
    }

    async fn video_thumbnail(&self, url: &str) -> Result<Vec<u8>, PipelineError> {
        let info = self.prober.probe(url).await?;

        // Grab the midpoint frame; very short clips use a fixed 0.5s seek.
        let timestamp = if info.duration < 1.0 {
            0.5
        } else {
            info.duration / 2.0
        };

        let scratch = tempfile::Builder::new()
            .prefix("thumb_")
            .suffix(".jpg")
            .tempfile()?
            .into_temp_path();

        self.extractor.extract_frame(url, timestamp, &scratch).await?;
        let frame = tokio::fs::read(&scratch).await?;

        encode_square_webp(&frame)
        // scratch is a TempPath: deleted on drop on every exit path above.
    }

    async fn audio_thumbnail(&self, url: &str) -> Result<Option<Vec<u8>>, PipelineError> {
        let Some(stream) = self.prober.find_cover_art(url).await? else {
            tracing::info!("Audio has no embedded cover art");
            return Ok(None);
        };

        let scratch = tempfile::Builder::new()
            .prefix("cover_")
            .suffix(".jpg")
            .tempfile()?
            .into_temp_path();

        self.extractor
            .extract_cover_art(url, &stream, &scratch)
            .await?;
        let art = tokio::fs::read(&scratch).await?;

        Ok(Some(encode_square_webp(&art)?))
    }
}

/// Decode, center-crop to a square and re-encode as lossy WebP.
fn encode_square_webp(data: &[u8]) -> Result<Vec<u8>, PipelineError> {
    let img = image::ImageReader::new(Cursor::new(data))
        .with_guessed_format()
        .map_err(|e| PipelineError::ThumbnailUnavailable(format!("Unreadable image data: {}", e)))?
        .decode()
        .map_err(|e| PipelineError::ThumbnailUnavailable(format!("Image decode failed: {}", e)))?;

    // resize_to_fill scales to cover and crops centered.
    let square = img.resize_to_fill(
        THUMBNAIL_SIZE,
        THUMBNAIL_SIZE,
        image::imageops::FilterType::Lanczos3,
    );

    let rgba = square.to_rgba8();
    let encoder = webp::Encoder::from_rgba(&rgba, THUMBNAIL_SIZE, THUMBNAIL_SIZE);
    Ok(encoder.encode(THUMBNAIL_QUALITY).to_vec())
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{ImageBuffer, Rgb};

    fn png_fixture(width: u32, height: u32) -> Vec<u8> {
        let img = ImageBuffer::from_fn(width, height, |x, _| {
            Rgb([(x % 256) as u8, 64u8, 128u8])
        });
        let mut buffer = Vec::new();
        image::DynamicImage::ImageRgb8(img)
            .write_to(&mut Cursor::new(&mut buffer), image::ImageFormat::Png)
            .unwrap();
        buffer
    }

    #[test]
    fn test_encode_square_webp_produces_150x150() {
        let png = png_fixture(640, 360);
        let webp_bytes = encode_square_webp(&png).unwrap();

        let decoded = image::ImageReader::new(Cursor::new(&webp_bytes))
            .with_guessed_format()
            .unwrap()
            .decode()
            .unwrap();
        assert_eq!(decoded.width(), THUMBNAIL_SIZE);
        assert_eq!(decoded.height(), THUMBNAIL_SIZE);
    }

    #[test]
    fn test_encode_square_webp_handles_portrait_input() {
        let png = png_fixture(200, 800);
        let webp_bytes = encode_square_webp(&png).unwrap();
        let decoded = image::load_from_memory(&webp_bytes).unwrap();
        assert_eq!((decoded.width(), decoded.height()), (150, 150));
    }

    #[test]
    fn test_encode_square_webp_rejects_garbage() {
        let err = encode_square_webp(b"not an image").unwrap_err();
        assert!(matches!(err, PipelineError::ThumbnailUnavailable(_)));
    }
}
