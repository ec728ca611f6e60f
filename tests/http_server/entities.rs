use serde_json::json;
use vigil::persistence::traits::EntityRepository;

use crate::helpers::*;

const MONITOR_ID: &str = "instance=i|kind=monitor|name=web|service=s|type=http";

#[tokio::test]
async fn entities_endpoint_returns_empty_list() {
    let app = TestApp::new().await;

    let resp = app.get("/api/v1/entities").await;

    assert_eq!(resp.status(), 200);
    let body: serde_json::Value = resp.json().await.expect("failed to parse JSON");
    assert_eq!(body, json!([]));

    app.cleanup();
}

#[tokio::test]
async fn entities_endpoint_lists_registered_rows() {
    let app = TestApp::new().await;
    app.entities.insert_entity(MONITOR_ID).await.unwrap();

    let resp = app.get("/api/v1/entities").await;

    assert_eq!(resp.status(), 200);
    let body: serde_json::Value = resp.json().await.expect("failed to parse JSON");
    assert_eq!(body.as_array().unwrap().len(), 1);
    assert_eq!(body[0]["canonical_id"], MONITOR_ID);
    assert_eq!(body[0]["id"], 1);

    app.cleanup();
}

#[tokio::test]
async fn entity_by_id_returns_row_when_exists() {
    let app = TestApp::new().await;
    app.entities.insert_entity(MONITOR_ID).await.unwrap();

    // The canonical ID needs percent-encoding in the path.
    let encoded = MONITOR_ID.replace('|', "%7C").replace('=', "%3D");
    let resp = app.get(&format!("/api/v1/entities/{encoded}")).await;

    assert_eq!(resp.status(), 200);
    let body: serde_json::Value = resp.json().await.expect("failed to parse JSON");
    assert_eq!(body["canonical_id"], MONITOR_ID);

    app.cleanup();
}

#[tokio::test]
async fn entity_by_id_returns_404_for_unknown_id() {
    let app = TestApp::new().await;

    let resp = app.get("/api/v1/entities/nope").await;

    assert_eq!(resp.status(), 404);

    app.cleanup();
}

#[tokio::test]
async fn loading_config_with_probes_registers_their_entities() {
    let app = TestApp::new().await;

    let resp = app
        .post_config(&json!({
            "name": "i",
            "services": [{
                "name": "s",
                "monitors": [
                    {"name": "c", "type": "tcp", "interval": 60,
                     "hostname": "127.0.0.1", "port": "1", "timeout": 100}
                ]
            }]
        }))
        .await;
    assert_eq!(resp.status(), 200);

    let resp = app.get("/api/v1/entities").await;
    let body: serde_json::Value = resp.json().await.expect("failed to parse JSON");
    let rows = body.as_array().unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0]["canonical_id"], "instance=i|kind=monitor|name=c|service=s|type=tcp");

    app.cleanup();
}
