mod common;

use actix_web::{test, web, App};
use common::*;
use image_processor::handlers;
use image_processor::services::{ImagePipeline, PipelineSettings};
use serde_json::{json, Value};

fn event(keys: &[&str]) -> Value {
    let records: Vec<Value> = keys
        .iter()
        .map(|key| {
            json!({
                "eventName": "s3:ObjectCreated:Put",
                "s3": {
                    "bucket": {"name": SOURCE_BUCKET},
                    "object": {"key": urlencoding::encode(key), "size": 1}
                }
            })
        })
        .collect();
    json!({ "Records": records })
}

macro_rules! app {
    ($pipeline:expr) => {
        test::init_service(
            App::new()
                .app_data(web::Data::new($pipeline))
                .configure(handlers::configure),
        )
        .await
    };
}

#[actix_web::test]
async fn test_batch_answers_success_document() {
    let harness = Harness::new();
    harness.upload("g/a/img/0:0:10:10", png(&gradient(20, 20)));
    let app = app!(harness.pipeline.clone());

    let req = test::TestRequest::post()
        .uri("/api/v1/events")
        .set_json(event(&["g/a/img/0:0:10:10"]))
        .to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;

    assert_eq!(
        body,
        json!({"statusCode": 200, "message": "Images processed successfully"})
    );
    assert_eq!(harness.served_keys().len(), 5);
    assert_eq!(harness.count("g", "a"), 1);
}

#[actix_web::test]
async fn test_failing_entries_do_not_fail_the_batch() {
    let harness = Harness::new();
    harness.upload("g/a/ok/0:0:10:10", png(&gradient(20, 20)));
    let app = app!(harness.pipeline.clone());

    let req = test::TestRequest::post()
        .uri("/api/v1/events")
        .set_json(event(&[
            "only/two/segments",
            "g/a/ok/0:0:10:10",
            "g/a/ok/0:0:999:10",
        ]))
        .to_request();
    let resp = test::call_service(&app, req).await;

    assert_eq!(resp.status(), 200);
    assert_eq!(harness.count("g", "a"), 1);
}

#[actix_web::test]
async fn test_unreadable_batch_is_bad_request() {
    let harness = Harness::new();
    let app = app!(harness.pipeline.clone());

    for payload in [r#"{"Records": "#, r#"{"records": []}"#, "[]"] {
        let req = test::TestRequest::post()
            .uri("/api/v1/events")
            .insert_header(("content-type", "application/json"))
            .set_payload(payload)
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), 400, "{payload}");

        let body: Value = test::read_body_json(resp).await;
        assert_eq!(body["code"], "INVALID_NOTIFICATION_BATCH");
    }
}

#[actix_web::test]
async fn test_empty_batch_succeeds() {
    let harness = Harness::new();
    let app = app!(harness.pipeline.clone());

    let req = test::TestRequest::post()
        .uri("/api/v1/events")
        .set_json(json!({"Records": []}))
        .to_request();
    let resp = test::call_service(&app, req).await;

    assert_eq!(resp.status(), 200);
}

#[actix_web::test]
async fn test_health_endpoints() {
    let harness = Harness::new();
    let app = app!(harness.pipeline.clone());

    for uri in ["/api/v1/health", "/api/v1/health/live", "/api/v1/health/ready"] {
        let req = test::TestRequest::get().uri(uri).to_request();
        let resp = test::call_service(&app, req).await;
        assert!(resp.status().is_success(), "{uri}");
    }
}

#[actix_web::test]
async fn test_not_ready_without_destination() {
    let harness = Harness::with_settings(PipelineSettings {
        counter_table: None,
        ..settings()
    });
    let pipeline: ImagePipeline = harness.pipeline.clone();
    let app = app!(pipeline);

    let req = test::TestRequest::get()
        .uri("/api/v1/health/ready")
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), 503);

    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["missing_configuration"], json!(["DYNAMODB_TABLE_NAME"]));
}

#[actix_web::test]
async fn test_metrics_endpoint_exposes_pipeline_counters() {
    let harness = Harness::new();
    let app = app!(harness.pipeline.clone());

    let req = test::TestRequest::post()
        .uri("/api/v1/events")
        .set_json(event(&["only/two/segments"]))
        .to_request();
    test::call_service(&app, req).await;

    let req = test::TestRequest::get().uri("/metrics").to_request();
    let body = test::call_and_read_body(&app, req).await;
    let text = String::from_utf8(body.to_vec()).unwrap();

    assert!(text.contains("image_processor_skipped_total"));
    assert!(text.contains("malformed_key"));
}
