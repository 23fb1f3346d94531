/// Image Processor - HTTP Server
///
/// Receives upload notification batches and derives the thumbnail, medium,
/// hd, qhd and original renditions of every uploaded photo.
use actix_web::{middleware as actix_middleware, web, App, HttpServer};
use image_processor::handlers;
use image_processor::services::aws::load_sdk_config;
use image_processor::services::{DynamoDbCounter, ImagePipeline, PipelineSettings, S3ObjectStore};
use image_processor::Config;
use std::io;
use std::sync::Arc;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[actix_web::main]
async fn main() -> io::Result<()> {
    dotenvy::dotenv().ok();

    let config = Config::from_env();
    init_tracing(config.app.is_production());

    info!(
        env = %config.app.env,
        region = %config.storage.region,
        strict_renditions = config.processing.strict_renditions,
        "Starting Image Processor"
    );

    if config.storage.destination_bucket.is_none() {
        warn!("SERVING_BUCKET not set; every notification will be skipped");
    }
    if config.counter.table_name.is_none() {
        warn!("DYNAMODB_TABLE_NAME not set; every notification will be skipped");
    }

    let sdk_config = load_sdk_config(&config.storage).await;
    let store = S3ObjectStore::from_config(&sdk_config, &config.storage);
    let counter = DynamoDbCounter::from_config(&sdk_config, &config.counter);

    if let Some(bucket) = &config.storage.destination_bucket {
        if let Err(e) = store.health_check(bucket).await {
            warn!(bucket = %bucket, error = %e, "Destination bucket is not reachable yet");
        }
    }

    let pipeline = web::Data::new(ImagePipeline::new(
        Arc::new(store),
        Arc::new(counter),
        PipelineSettings::from_config(&config),
    ));

    let bind_address = format!("{}:{}", config.app.host, config.app.port);
    info!("Image Processor listening on {}", bind_address);

    HttpServer::new(move || {
        App::new()
            .app_data(pipeline.clone())
            .wrap(actix_middleware::Logger::default())
            .configure(handlers::configure)
    })
    .bind(&bind_address)?
    .run()
    .await
}

fn init_tracing(json: bool) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("image_processor=info,actix_web=info"));

    if json {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(false)
            .json()
            .init();
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).init();
    }
}
