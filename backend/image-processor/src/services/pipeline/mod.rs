//! Image derivative pipeline
//!
//! For each upload notification:
//! 1. Parse the key into a locator (ids + crop rectangle)
//! 2. Fetch and decode the source image
//! 3. Strip metadata, flatten transparency, check the crop
//! 4. Render and encode every rendition in table order
//! 5. Upload renditions, stopping at the first failure
//! 6. Bump the per-array processed count when every upload succeeded
//!
//! Steps 2-4 run on a blocking thread. Entries of a batch are independent:
//! a failure in one never prevents the next from being processed.

pub mod encoder;
pub mod error;
pub mod loader;
pub mod locator;
pub mod normalizer;
pub mod renderer;
pub mod tracker;
pub mod uploader;

pub use error::{ErrorKind, ProcessingError, RenditionError, UploadError};
pub use locator::{CropRect, Locator};
pub use renderer::{RenditionSpec, Scale, DEFAULT_RENDITIONS};
pub use tracker::CounterOutcome;

use crate::config::Config;
use crate::metrics;
use crate::services::counter::{CounterKey, ProcessedCounter};
use crate::services::storage::ObjectStore;
use bytes::Bytes;
use renderer::ProducedRenditions;
use std::sync::Arc;
use tracing::{error, info, warn, Span};

/// Per-deployment pipeline settings
#[derive(Debug, Clone, Default)]
pub struct PipelineSettings {
    pub destination_bucket: Option<String>,
    pub counter_table: Option<String>,
    /// Withhold the counter increment when any rendition failed
    pub strict_renditions: bool,
}

impl PipelineSettings {
    pub fn from_config(config: &Config) -> Self {
        Self {
            destination_bucket: config.storage.destination_bucket.clone(),
            counter_table: config.counter.table_name.clone(),
            strict_renditions: config.processing.strict_renditions,
        }
    }

    fn targets(&self) -> Result<(&str, &str), ProcessingError> {
        let bucket = self
            .destination_bucket
            .as_deref()
            .ok_or(ProcessingError::MissingConfiguration("SERVING_BUCKET"))?;
        let table = self
            .counter_table
            .as_deref()
            .ok_or(ProcessingError::MissingConfiguration("DYNAMODB_TABLE_NAME"))?;
        Ok((bucket, table))
    }
}

/// One entry of an upload notification batch
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadNotification {
    /// Source bucket
    pub bucket: String,
    /// Object key as received (percent-encoded)
    pub key: String,
}

impl UploadNotification {
    pub fn new(bucket: impl Into<String>, key: impl Into<String>) -> Self {
        Self {
            bucket: bucket.into(),
            key: key.into(),
        }
    }
}

/// How processing of one image ended
#[derive(Debug)]
pub enum ImageStatus {
    /// Nothing was written
    Skipped(ProcessingError),
    /// An upload failed; earlier uploads stay, the counter is untouched
    Incomplete(UploadError),
    /// Every attempted upload succeeded
    Completed { counter: CounterOutcome },
}

impl ImageStatus {
    pub fn outcome_label(&self) -> &'static str {
        match self {
            ImageStatus::Skipped(_) => "skipped",
            ImageStatus::Incomplete(_) => "incomplete",
            ImageStatus::Completed {
                counter: CounterOutcome::Withheld { .. },
            } => "incomplete",
            ImageStatus::Completed { .. } => "completed",
        }
    }
}

/// Per-image result
#[derive(Debug)]
pub struct ImageReport {
    /// Decoded key (as received when decoding failed)
    pub source_key: String,
    pub status: ImageStatus,
    pub uploaded_keys: Vec<String>,
    pub rendition_failures: Vec<RenditionError>,
}

impl ImageReport {
    fn skipped(source_key: impl Into<String>, error: ProcessingError) -> Self {
        Self {
            source_key: source_key.into(),
            status: ImageStatus::Skipped(error),
            uploaded_keys: Vec::new(),
            rendition_failures: Vec::new(),
        }
    }
}

/// Outcome tally for one batch
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BatchSummary {
    pub total: usize,
    pub completed: usize,
    pub incomplete: usize,
    pub skipped: usize,
}

impl BatchSummary {
    pub fn from_reports(reports: &[ImageReport]) -> Self {
        reports.iter().fold(
            Self {
                total: reports.len(),
                ..Self::default()
            },
            |mut summary, report| {
                match report.status.outcome_label() {
                    "completed" => summary.completed += 1,
                    "incomplete" => summary.incomplete += 1,
                    _ => summary.skipped += 1,
                }
                summary
            },
        )
    }
}

/// Derives renditions for uploaded photos
///
/// Storage and the processed counter are injected so the pipeline runs the
/// same against S3/DynamoDB and against in-memory doubles.
#[derive(Clone)]
pub struct ImagePipeline {
    store: Arc<dyn ObjectStore>,
    counter: Arc<dyn ProcessedCounter>,
    settings: PipelineSettings,
    renditions: Arc<[RenditionSpec]>,
}

impl ImagePipeline {
    pub fn new(
        store: Arc<dyn ObjectStore>,
        counter: Arc<dyn ProcessedCounter>,
        settings: PipelineSettings,
    ) -> Self {
        Self::with_renditions(store, counter, settings, DEFAULT_RENDITIONS)
    }

    /// Use a custom rendition table; order is upload order
    pub fn with_renditions(
        store: Arc<dyn ObjectStore>,
        counter: Arc<dyn ProcessedCounter>,
        settings: PipelineSettings,
        renditions: &[RenditionSpec],
    ) -> Self {
        Self {
            store,
            counter,
            settings,
            renditions: Arc::from(renditions),
        }
    }

    pub fn settings(&self) -> &PipelineSettings {
        &self.settings
    }

    /// Process every entry in order; failures stay with their entry
    pub async fn process_batch(&self, notifications: &[UploadNotification]) -> Vec<ImageReport> {
        let mut reports = Vec::with_capacity(notifications.len());
        for notification in notifications {
            reports.push(self.process_notification(notification).await);
        }

        let summary = BatchSummary::from_reports(&reports);
        info!(
            total = summary.total,
            completed = summary.completed,
            incomplete = summary.incomplete,
            skipped = summary.skipped,
            "Processed notification batch"
        );

        reports
    }

    #[tracing::instrument(skip(self, notification), fields(bucket = %notification.bucket, key = %notification.key))]
    pub async fn process_notification(&self, notification: &UploadNotification) -> ImageReport {
        let timer = metrics::IMAGE_DURATION_SECONDS.start_timer();

        let report = match urlencoding::decode(&notification.key) {
            Ok(key) => match self.derive(&notification.bucket, &key).await {
                Ok(report) => report,
                Err(e) => ImageReport::skipped(key, e),
            },
            Err(_) => ImageReport::skipped(
                notification.key.clone(),
                ProcessingError::malformed(&notification.key, "key is not valid UTF-8"),
            ),
        };

        timer.observe_duration();
        log_outcome(&report);
        metrics::IMAGES_TOTAL
            .with_label_values(&[report.status.outcome_label()])
            .inc();

        report
    }

    async fn derive(&self, bucket: &str, key: &str) -> Result<ImageReport, ProcessingError> {
        let locator = Locator::parse(key)?;
        let (destination_bucket, counter_table) = self.settings.targets()?;

        info!(
            group_id = %locator.group_id(),
            array_id = %locator.array_id(),
            image_id = %locator.image_id(),
            crop = %locator.crop(),
            "Processing image"
        );

        let data = self
            .store
            .get_object(bucket, locator.source_key())
            .await
            .map_err(ProcessingError::SourceUnavailable)?;

        let produced = self.render(locator.clone(), data).await?;
        if produced.renditions.is_empty() {
            return Err(ProcessingError::NoRenditions(produced.failures.len()));
        }

        let upload = uploader::upload_renditions(
            self.store.as_ref(),
            destination_bucket,
            produced.renditions,
        )
        .await;

        let status = match upload.failure {
            Some(failure) => ImageStatus::Incomplete(failure),
            None if self.settings.strict_renditions && !produced.failures.is_empty() => {
                let failed_renditions: Vec<_> =
                    produced.failures.iter().map(|f| f.rendition).collect();
                warn!(
                    image_id = %locator.image_id(),
                    ?failed_renditions,
                    "Renditions missing, processed count not updated"
                );
                ImageStatus::Completed {
                    counter: CounterOutcome::Withheld { failed_renditions },
                }
            }
            None => {
                let counter_key = CounterKey::new(locator.group_id(), locator.array_id());
                let counter =
                    tracker::record_completion(self.counter.as_ref(), counter_table, &counter_key)
                        .await;
                ImageStatus::Completed { counter }
            }
        };

        Ok(ImageReport {
            source_key: key.to_string(),
            status,
            uploaded_keys: upload.written_keys,
            rendition_failures: produced.failures,
        })
    }

    /// Decode, normalize and render on a blocking thread
    async fn render(
        &self,
        locator: Locator,
        data: Bytes,
    ) -> Result<ProducedRenditions, ProcessingError> {
        let specs = Arc::clone(&self.renditions);
        let span = Span::current();

        tokio::task::spawn_blocking(move || -> Result<ProducedRenditions, ProcessingError> {
            let _entered = span.enter();
            let decoded = loader::decode_source(&data)?;
            info!(
                image_id = %locator.image_id(),
                format = decoded.detected_format.as_str(),
                width = decoded.width,
                height = decoded.height,
                size = data.len(),
                "Loaded source image"
            );

            let normalized = normalizer::normalize(decoded.image, locator.crop())?;
            Ok(renderer::produce_renditions(&specs, &locator, &normalized))
        })
        .await
        .map_err(|e| ProcessingError::Worker(e.to_string()))?
    }
}

fn log_outcome(report: &ImageReport) {
    match &report.status {
        ImageStatus::Skipped(e) => {
            error!(
                source_key = %report.source_key,
                error = %e,
                error_kind = %e.kind(),
                "Skipping image"
            );
            metrics::SKIPPED_TOTAL
                .with_label_values(&[e.kind().as_str()])
                .inc();
        }
        ImageStatus::Incomplete(e) => {
            error!(
                source_key = %report.source_key,
                error = %e,
                error_kind = %e.kind(),
                uploaded_keys = ?report.uploaded_keys,
                "Image left incomplete after upload failure"
            );
        }
        ImageStatus::Completed { counter } => {
            info!(
                source_key = %report.source_key,
                renditions = report.uploaded_keys.len(),
                failed_renditions = report.rendition_failures.len(),
                counter_updated = counter.is_incremented(),
                "Successfully processed image"
            );
        }
    }
}
