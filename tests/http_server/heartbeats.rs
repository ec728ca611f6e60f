use chrono::{Duration, Utc};
use serde_json::json;
use vigil::{
    models::Heartbeat,
    persistence::traits::{EntityRepository, HeartbeatRepository},
};

use crate::helpers::*;

const MONITOR_ID: &str = "instance=i|kind=monitor|name=c|service=s|type=tcp";

async fn seed_heartbeats(app: &TestApp) {
    app.entities.insert_entity(MONITOR_ID).await.unwrap();

    let base = Utc::now();
    for i in 0..3 {
        let error = if i == 1 { Some("connection refused".to_string()) } else { None };
        app.heartbeats
            .insert_heartbeat(&Heartbeat::new(
                MONITOR_ID.to_string(),
                base + Duration::seconds(i),
                error,
            ))
            .await
            .unwrap();
    }
}

#[tokio::test]
async fn heartbeats_endpoint_returns_empty_list() {
    let app = TestApp::new().await;

    let resp = app.get("/api/v1/heartbeats").await;

    assert_eq!(resp.status(), 200);
    let body: serde_json::Value = resp.json().await.expect("failed to parse JSON");
    assert_eq!(body, json!([]));

    app.cleanup();
}

#[tokio::test]
async fn heartbeats_are_listed_newest_first() {
    let app = TestApp::new().await;
    seed_heartbeats(&app).await;

    let resp = app.get("/api/v1/heartbeats").await;

    assert_eq!(resp.status(), 200);
    let body: serde_json::Value = resp.json().await.expect("failed to parse JSON");
    let rows = body.as_array().unwrap();
    assert_eq!(rows.len(), 3);
    assert_eq!(rows[0]["monitor_id"], MONITOR_ID);
    assert_eq!(rows[0]["successful"], true);
    assert_eq!(rows[1]["successful"], false);
    assert_eq!(rows[1]["error"], "connection refused");
    // Successful rows omit the error field entirely.
    assert!(rows[0].get("error").is_none());

    app.cleanup();
}

#[tokio::test]
async fn successful_filter_applies() {
    let app = TestApp::new().await;
    seed_heartbeats(&app).await;

    let resp = app.get("/api/v1/heartbeats?successful=false").await;

    let body: serde_json::Value = resp.json().await.expect("failed to parse JSON");
    let rows = body.as_array().unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0]["error"], "connection refused");

    app.cleanup();
}

#[tokio::test]
async fn entity_filter_applies() {
    let app = TestApp::new().await;
    seed_heartbeats(&app).await;

    let encoded = MONITOR_ID.replace('|', "%7C").replace('=', "%3D");
    let resp = app.get(&format!("/api/v1/heartbeats?entity_id={encoded}")).await;
    let body: serde_json::Value = resp.json().await.expect("failed to parse JSON");
    assert_eq!(body.as_array().unwrap().len(), 3);

    let resp = app.get("/api/v1/heartbeats?entity_id=unknown").await;
    let body: serde_json::Value = resp.json().await.expect("failed to parse JSON");
    assert_eq!(body, json!([]));

    app.cleanup();
}

#[tokio::test]
async fn limit_and_offset_page_results() {
    let app = TestApp::new().await;
    seed_heartbeats(&app).await;

    let resp = app.get("/api/v1/heartbeats?limit=2").await;
    let body: serde_json::Value = resp.json().await.expect("failed to parse JSON");
    assert_eq!(body.as_array().unwrap().len(), 2);

    let resp = app.get("/api/v1/heartbeats?limit=2&offset=2").await;
    let body: serde_json::Value = resp.json().await.expect("failed to parse JSON");
    assert_eq!(body.as_array().unwrap().len(), 1);

    app.cleanup();
}
