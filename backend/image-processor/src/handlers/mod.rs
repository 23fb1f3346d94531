/// HTTP handlers for image-processor
///
/// This module contains handlers for:
/// - Events: upload notification batches delivered by S3 / MinIO
/// - Health: liveness and readiness probes
pub mod events;
pub mod health;

use crate::metrics;
use actix_web::web;

pub use events::handle_events;
pub use health::{health, live, ready};

/// Register every route of the service
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.route("/metrics", web::get().to(metrics::metrics_handler))
        .service(
            web::scope("/api/v1")
                .route("/events", web::post().to(handle_events))
                .route("/health", web::get().to(health))
                .route("/health/live", web::get().to(live))
                .route("/health/ready", web::get().to(ready)),
        );
}
