//! Upload of finished derivatives into the storage backend.

use std::sync::Arc;
use tokio::fs::File;
use uuid::Uuid;

use mediaforge_core::models::{Thumbnail, VideoVariant};
use mediaforge_core::PipelineError;
use mediaforge_storage::keys::derivative_key;
use mediaforge_storage::Storage;

use crate::transcode::TranscodedTier;

/// Thin wrapper over [`Storage`] that names keys and content types for
/// the two derivative kinds the pipeline produces.
#[derive(Clone)]
pub struct DerivativeUploader {
    storage: Arc<dyn Storage>,
}

impl DerivativeUploader {
    pub fn new(storage: Arc<dyn Storage>) -> Self {
        Self { storage }
    }

    /// Upload an encoded WebP thumbnail. Thumbnails are small enough to
    /// go up in one buffer.
    pub async fn upload_thumbnail(
        &self,
        data: Vec<u8>,
        owner_id: Uuid,
        filename: &str,
    ) -> Result<Thumbnail, PipelineError> {
        let key = derivative_key(owner_id, "thumbs", "thumb_150", filename, "webp");
        let size = data.len();

        let url = self
            .storage
            .upload_with_key(&key, data, "image/webp")
            .await
            .map_err(|e| PipelineError::Upload(e.to_string()))?;

        tracing::info!(key = %key, size_bytes = size, "Thumbnail uploaded");
        Ok(Thumbnail::new(url, key))
    }

    /// Upload one transcoded quality variant, streaming from its scratch
    /// file. The caller still owns the scratch `TempPath` and drops it
    /// after this returns.
    pub async fn upload_variant(
        &self,
        tier: &TranscodedTier,
        owner_id: Uuid,
        filename: &str,
    ) -> Result<VideoVariant, PipelineError> {
        let key = derivative_key(owner_id, "videos", tier.quality, filename, "mp4");

        let size = tokio::fs::metadata(&tier.output).await?.len();
        let file = File::open(&tier.output).await?;
        let reader: std::pin::Pin<Box<dyn tokio::io::AsyncRead + Send + Unpin>> =
            Box::pin(file);

        let url = self
            .storage
            .upload_stream_with_key(&key, "video/mp4", Some(size), reader)
            .await
            .map_err(|e| PipelineError::Upload(e.to_string()))?;

        tracing::info!(
            key = %key,
            quality = tier.quality,
            size_bytes = size,
            "Variant uploaded"
        );

        Ok(VideoVariant {
            quality: tier.quality.to_string(),
            label: tier.label.to_string(),
            url,
            key,
            width: tier.width,
            height: tier.height,
            size,
        })
    }
}
