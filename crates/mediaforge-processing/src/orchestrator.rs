//! Asynchronous processing orchestrator.
//!
//! Launching a job flips the asset's status to `processing` before the
//! background task is spawned, so readers never observe a launched job as
//! pending. The job itself downloads the source, probes it, plans the
//! quality ladder and runs each tier, then reports one completion
//! callback with the collected variants.

use anyhow::Result;
use async_trait::async_trait;
use std::sync::Arc;
use uuid::Uuid;

use mediaforge_core::models::{
    ProcessingJob, ProcessingOutcome, ProcessingStatus, QualityTier, VideoVariant,
};
use mediaforge_core::{PipelineError, ProcessingConfig};
use mediaforge_storage::Storage;

use crate::fetch::{HttpFetcher, SourceFetcher};
use crate::ladder::plan_ladder;
use crate::probe::{FfprobeService, SourceInfo, SourceProber};
use crate::transcode::{FfmpegTranscoder, VideoEncoder};
use crate::upload::DerivativeUploader;

/// How the orchestrator reads and writes job state. Implementations wrap
/// whatever record store holds the media rows.
#[async_trait]
pub trait ProcessingReporter: Send + Sync {
    /// Current processing status of the asset, if any is recorded.
    async fn current_status(&self, media_id: Uuid) -> Result<Option<ProcessingStatus>>;

    /// Record that a job has been launched for the asset.
    async fn mark_processing(&self, media_id: Uuid) -> Result<()>;

    /// Deliver the completion callback. Called exactly once per job,
    /// whether it succeeded or failed.
    async fn complete(&self, media_id: Uuid, outcome: ProcessingOutcome) -> Result<()>;
}

pub struct VideoOrchestrator {
    fetcher: Arc<dyn SourceFetcher>,
    prober: Arc<dyn SourceProber>,
    encoder: Arc<dyn VideoEncoder>,
    uploader: DerivativeUploader,
}

impl VideoOrchestrator {
    pub fn new(
        fetcher: Arc<dyn SourceFetcher>,
        prober: Arc<dyn SourceProber>,
        encoder: Arc<dyn VideoEncoder>,
        uploader: DerivativeUploader,
    ) -> Self {
        Self {
            fetcher,
            prober,
            encoder,
            uploader,
        }
    }

    /// Wire up the real ffmpeg-backed pipeline.
    pub fn from_config(config: &ProcessingConfig, storage: Arc<dyn Storage>) -> Result<Self> {
        Ok(Self {
            fetcher: Arc::new(HttpFetcher::new()),
            prober: Arc::new(FfprobeService::new(config.ffprobe_path.clone())?),
            encoder: Arc::new(FfmpegTranscoder::new(config)?),
            uploader: DerivativeUploader::new(storage),
        })
    }

    /// Launch processing for a freshly uploaded video. Returns once the
    /// status is recorded and the background task is spawned; the actual
    /// work completes via the reporter callback.
    pub async fn start(
        self: &Arc<Self>,
        job: ProcessingJob,
        reporter: Arc<dyn ProcessingReporter>,
    ) -> Result<()> {
        reporter.mark_processing(job.media_id).await?;
        self.spawn_job(job, reporter);
        Ok(())
    }

    /// Re-run processing for an existing video. Refused while a job is
    /// already marked in flight. The check and the mark are not atomic;
    /// two concurrent reprocess calls can both pass, which wastes work
    /// but stays correct because variant keys never collide.
    pub async fn reprocess(
        self: &Arc<Self>,
        job: ProcessingJob,
        reporter: Arc<dyn ProcessingReporter>,
    ) -> Result<()> {
        if reporter.current_status(job.media_id).await? == Some(ProcessingStatus::Processing) {
            return Err(PipelineError::AlreadyProcessing(job.media_id).into());
        }

        reporter.mark_processing(job.media_id).await?;
        self.spawn_job(job, reporter);
        Ok(())
    }

    fn spawn_job(self: &Arc<Self>, job: ProcessingJob, reporter: Arc<dyn ProcessingReporter>) {
        let this = Arc::clone(self);
        tokio::spawn(async move {
            let media_id = job.media_id;
            let outcome = this.run(job).await;

            // Best effort: a lost callback is logged, not retried.
            if let Err(e) = reporter.complete(media_id, outcome).await {
                tracing::error!(media_id = %media_id, error = %e, "Completion callback failed");
            }
        });
    }

    /// Run one processing job to an outcome. Job-fatal errors (download,
    /// probe) become a failure outcome; per-tier errors are absorbed
    /// inside the tier loop.
    #[tracing::instrument(skip(self, job), fields(media_id = %job.media_id))]
    pub async fn run(&self, job: ProcessingJob) -> ProcessingOutcome {
        match self.run_pipeline(&job).await {
            Ok(outcome) => outcome,
            Err(e) => {
                tracing::error!(error = %e, "Processing job failed");
                ProcessingOutcome::failure(e.to_string())
            }
        }
    }

    async fn run_pipeline(&self, job: &ProcessingJob) -> Result<ProcessingOutcome, PipelineError> {
        let scratch = tempfile::tempdir()?;
        let input_path = scratch.path().join("input.mp4");

        let bytes = self.fetcher.fetch_to_file(&job.source_url, &input_path).await?;
        tracing::info!(bytes = bytes, "Source downloaded");

        let input = input_path.to_string_lossy().to_string();
        let info = self.prober.probe(&input).await?;
        if info.width == 0 || info.height == 0 {
            return Err(PipelineError::Probe(
                "Source has no usable video stream".to_string(),
            ));
        }

        let plan = plan_ladder(info.width, info.height);
        tracing::info!(
            width = info.width,
            height = info.height,
            duration = info.duration,
            tiers = plan.len(),
            "Quality ladder planned"
        );

        let mut versions: Vec<VideoVariant> = Vec::new();
        for tier in plan {
            match self.process_tier(&input_path, tier, &info, job).await {
                Ok(variant) => versions.push(variant),
                Err(e) => {
                    // One tier failing never takes down its siblings.
                    tracing::warn!(quality = tier.quality, error = %e, "Tier failed, continuing");
                }
            }
        }

        let success = !versions.is_empty();
        Ok(ProcessingOutcome {
            success,
            versions,
            original_resolution: Some(format!("{}x{}", info.width, info.height)),
            duration: Some(info.duration),
            error: if success {
                None
            } else {
                Some("All quality tiers failed".to_string())
            },
        })
        // scratch tempdir dropped here, removing the downloaded source.
    }

    async fn process_tier(
        &self,
        input: &std::path::Path,
        tier: &'static QualityTier,
        info: &SourceInfo,
        job: &ProcessingJob,
    ) -> Result<VideoVariant, PipelineError> {
        let encoded = self.encoder.transcode(input, tier, info).await?;
        let variant = self
            .uploader
            .upload_variant(&encoded, job.owner_id, &job.filename)
            .await?;
        // encoded.output (TempPath) drops here, deleting the scratch file.
        Ok(variant)
    }
}
