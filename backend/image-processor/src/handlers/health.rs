use actix_web::{web, HttpResponse};

use crate::services::pipeline::ImagePipeline;

pub async fn health() -> HttpResponse {
    HttpResponse::Ok().json(serde_json::json!({
        "status": "ok",
        "service": "image-processor"
    }))
}

pub async fn live() -> HttpResponse {
    HttpResponse::Ok().finish()
}

/// Not ready while a destination is unconfigured: every entry would be skipped
pub async fn ready(pipeline: web::Data<ImagePipeline>) -> HttpResponse {
    let settings = pipeline.settings();
    let missing: Vec<&str> = [
        ("SERVING_BUCKET", settings.destination_bucket.is_none()),
        ("DYNAMODB_TABLE_NAME", settings.counter_table.is_none()),
    ]
    .into_iter()
    .filter_map(|(name, absent)| absent.then_some(name))
    .collect();

    if missing.is_empty() {
        HttpResponse::Ok().finish()
    } else {
        HttpResponse::ServiceUnavailable().json(serde_json::json!({
            "status": "not_ready",
            "missing_configuration": missing
        }))
    }
}
