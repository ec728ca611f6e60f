use chrono::{Duration, Utc};
use serde_json::json;
use vigil::{
    identity::{EntityID, EntityKind},
    models::{MetricKind, Sample},
    persistence::traits::{EntityRepository, MetricsRepository},
};

use crate::helpers::*;

fn metric_id() -> EntityID {
    EntityID::probe(EntityKind::Metric, &EntityID::service("i", "s"), "cpu", "load")
}

async fn seed_samples(app: &TestApp) {
    let id = metric_id();
    app.entities.insert_entity(&id.canonical()).await.unwrap();

    let base = Utc::now();
    for i in 0..3 {
        app.metrics
            .insert_sample(&Sample::new(
                id.clone(),
                base + Duration::seconds(i),
                MetricKind::Gauge,
                "cpu_loadavg",
                i as f64 / 2.0,
                [("span", "1m")],
            ))
            .await
            .unwrap();
    }
}

#[tokio::test]
async fn metrics_endpoint_returns_empty_list() {
    let app = TestApp::new().await;

    let resp = app.get("/api/v1/metrics").await;

    assert_eq!(resp.status(), 200);
    let body: serde_json::Value = resp.json().await.expect("failed to parse JSON");
    assert_eq!(body, json!([]));

    app.cleanup();
}

#[tokio::test]
async fn samples_are_listed_with_labels() {
    let app = TestApp::new().await;
    seed_samples(&app).await;

    let resp = app.get("/api/v1/metrics").await;

    assert_eq!(resp.status(), 200);
    let body: serde_json::Value = resp.json().await.expect("failed to parse JSON");
    let rows = body.as_array().unwrap();
    assert_eq!(rows.len(), 3);
    assert_eq!(rows[0]["entity_id"], metric_id().canonical());
    assert_eq!(rows[0]["type"], "gauge");
    assert_eq!(rows[0]["name"], "cpu_loadavg");
    assert_eq!(rows[0]["labels"]["span"], "1m");
    // Newest first.
    assert_eq!(rows[0]["value"], 1.0);

    app.cleanup();
}

#[tokio::test]
async fn name_and_type_filters_apply() {
    let app = TestApp::new().await;
    seed_samples(&app).await;

    let resp = app.get("/api/v1/metrics?name=cpu_loadavg&type=gauge").await;
    let body: serde_json::Value = resp.json().await.expect("failed to parse JSON");
    assert_eq!(body.as_array().unwrap().len(), 3);

    let resp = app.get("/api/v1/metrics?name=other").await;
    let body: serde_json::Value = resp.json().await.expect("failed to parse JSON");
    assert_eq!(body, json!([]));

    let resp = app.get("/api/v1/metrics?type=counter").await;
    let body: serde_json::Value = resp.json().await.expect("failed to parse JSON");
    assert_eq!(body, json!([]));

    app.cleanup();
}

#[tokio::test]
async fn limit_pages_results() {
    let app = TestApp::new().await;
    seed_samples(&app).await;

    let resp = app.get("/api/v1/metrics?limit=1").await;
    let body: serde_json::Value = resp.json().await.expect("failed to parse JSON");
    assert_eq!(body.as_array().unwrap().len(), 1);

    app.cleanup();
}
