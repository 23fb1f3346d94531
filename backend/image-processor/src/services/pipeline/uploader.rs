//! Rendition upload
//!
//! Uploads run sequentially in rendition order and stop at the first failure.
//! Objects written before the failure stay in place.

use super::error::UploadError;
use super::renderer::Rendition;
use crate::metrics;
use crate::services::storage::ObjectStore;
use tracing::{error, info};

pub const CONTENT_TYPE_JPEG: &str = "image/jpeg";

/// What the upload stage wrote for one image
#[derive(Debug, Default)]
pub struct UploadReport {
    pub written_keys: Vec<String>,
    pub failure: Option<UploadError>,
}

impl UploadReport {
    /// Every attempted upload succeeded
    pub fn is_complete(&self) -> bool {
        self.failure.is_none()
    }
}

pub async fn upload_renditions(
    store: &dyn ObjectStore,
    bucket: &str,
    renditions: Vec<Rendition>,
) -> UploadReport {
    let mut report = UploadReport::default();

    for rendition in renditions {
        let size = rendition.body.len();
        match store
            .put_object(
                bucket,
                &rendition.destination_key,
                rendition.body,
                CONTENT_TYPE_JPEG,
            )
            .await
        {
            Ok(()) => {
                info!(
                    bucket,
                    key = %rendition.destination_key,
                    size,
                    "Uploaded rendition"
                );
                metrics::UPLOADS_TOTAL
                    .with_label_values(&[metrics::status_label(true)])
                    .inc();
                report.written_keys.push(rendition.destination_key);
            }
            Err(e) => {
                error!(
                    bucket,
                    key = %rendition.destination_key,
                    error = %e,
                    "Failed to upload rendition, abandoning remaining uploads"
                );
                metrics::UPLOADS_TOTAL
                    .with_label_values(&[metrics::status_label(false)])
                    .inc();
                report.failure = Some(UploadError {
                    rendition: rendition.name,
                    key: rendition.destination_key,
                    source: e,
                });
                break;
            }
        }
    }

    report
}
