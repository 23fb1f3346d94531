/// Upload notification intake
use actix_web::{web, HttpResponse};

use crate::error::Result;
use crate::models::{BatchResponse, S3EventNotification};
use crate::services::pipeline::ImagePipeline;

/// Process one notification batch
///
/// Only an unreadable batch fails the request. Per-image failures are
/// logged by the pipeline and the batch still answers 200.
pub async fn handle_events(
    pipeline: web::Data<ImagePipeline>,
    body: web::Bytes,
) -> Result<HttpResponse> {
    let event: S3EventNotification = serde_json::from_slice(&body)
        .inspect_err(|e| tracing::error!(error = %e, "Failed to parse notification batch"))?;

    for record in &event.records {
        tracing::debug!(
            event_name = record.event_name.as_deref().unwrap_or("unknown"),
            bucket = %record.s3.bucket.name,
            key = %record.s3.object.key,
            size = record.s3.object.size,
            "Notification record"
        );
    }

    let notifications = event.into_notifications();
    tracing::info!(records = notifications.len(), "Received notification batch");

    pipeline.process_batch(&notifications).await;

    Ok(HttpResponse::Ok().json(BatchResponse::success()))
}
