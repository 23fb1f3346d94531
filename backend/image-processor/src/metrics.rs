/// Prometheus metrics for the image derivative pipeline
use crate::error::{AppError, Result};
use actix_web::HttpResponse;
use lazy_static::lazy_static;
use prometheus::{
    register_counter_vec, register_histogram, CounterVec, Encoder, Histogram, TextEncoder,
};

lazy_static! {
    /// Images handled (labels: outcome=completed|incomplete|skipped)
    pub static ref IMAGES_TOTAL: CounterVec = register_counter_vec!(
        "image_processor_images_total",
        "Total number of source images handled",
        &["outcome"]
    )
    .unwrap();

    /// Images skipped before any upload (labels: error_kind)
    pub static ref SKIPPED_TOTAL: CounterVec = register_counter_vec!(
        "image_processor_skipped_total",
        "Total number of source images skipped, by error kind",
        &["error_kind"]
    )
    .unwrap();

    /// Renditions produced (labels: rendition, status=ok|failed)
    pub static ref RENDITIONS_TOTAL: CounterVec = register_counter_vec!(
        "image_processor_renditions_total",
        "Total number of renditions rendered and encoded",
        &["rendition", "status"]
    )
    .unwrap();

    /// Rendition uploads (labels: status=ok|failed)
    pub static ref UPLOADS_TOTAL: CounterVec = register_counter_vec!(
        "image_processor_uploads_total",
        "Total number of rendition uploads",
        &["status"]
    )
    .unwrap();

    /// Processed-count increments (labels: status=ok|failed)
    pub static ref COUNTER_INCREMENTS_TOTAL: CounterVec = register_counter_vec!(
        "image_processor_counter_increments_total",
        "Total number of processed-count increments issued",
        &["status"]
    )
    .unwrap();

    /// Wall time spent on one source image, fetch to counter
    pub static ref IMAGE_DURATION_SECONDS: Histogram = register_histogram!(
        "image_processor_image_duration_seconds",
        "Time spent processing a single source image",
        vec![0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0, 30.0, 60.0]
    )
    .unwrap();
}

pub fn status_label(ok: bool) -> &'static str {
    if ok {
        "ok"
    } else {
        "failed"
    }
}

/// `GET /metrics` in Prometheus text format
pub async fn metrics_handler() -> Result<HttpResponse> {
    let encoder = TextEncoder::new();
    let mut buffer = Vec::new();
    encoder
        .encode(&prometheus::gather(), &mut buffer)
        .map_err(|e| {
            tracing::error!(error = %e, "Failed to encode metrics");
            AppError::Internal(format!("Failed to encode metrics: {e}"))
        })?;

    Ok(HttpResponse::Ok()
        .content_type(encoder.format_type())
        .body(buffer))
}
