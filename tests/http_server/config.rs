use serde_json::json;

use crate::helpers::*;

#[tokio::test]
async fn get_config_returns_404_before_first_load() {
    let app = TestApp::new().await;

    let resp = app.get("/api/v1/config").await;

    assert_eq!(resp.status(), 404);
    let body: serde_json::Value = resp.json().await.expect("failed to parse JSON");
    assert_eq!(body["error"], "no configuration loaded");

    app.cleanup();
}

#[tokio::test]
async fn post_then_get_round_trips_the_document() {
    let app = TestApp::new().await;
    let document = json!({"name": "i", "services": [{"name": "s"}]});

    let resp = app.post_config(&document).await;
    assert_eq!(resp.status(), 200);
    let body: serde_json::Value = resp.json().await.expect("failed to parse JSON");
    assert_eq!(body["status"], "ok");

    let resp = app.get("/api/v1/config").await;
    assert_eq!(resp.status(), 200);
    let stored: serde_json::Value = resp.json().await.expect("failed to parse JSON");
    assert_eq!(stored, document);

    app.cleanup();
}

#[tokio::test]
async fn wrapped_config_body_is_unwrapped() {
    let app = TestApp::new().await;
    let document = json!({"name": "i", "services": [{"name": "s"}]});

    let resp = app.post_config(&json!({"config": document})).await;
    assert_eq!(resp.status(), 200);

    let resp = app.get("/api/v1/config").await;
    let stored: serde_json::Value = resp.json().await.expect("failed to parse JSON");
    assert_eq!(stored, document);

    app.cleanup();
}

#[tokio::test]
async fn invalid_document_is_rejected_with_path() {
    let app = TestApp::new().await;

    let resp = app
        .post_config(&json!({
            "name": "i",
            "services": [{
                "name": "s",
                "monitors": [
                    {"name": "m", "type": "tcp", "interval": 0,
                     "hostname": "localhost", "port": "80", "timeout": 10}
                ]
            }]
        }))
        .await;

    assert_eq!(resp.status(), 400);
    let body: serde_json::Value = resp.json().await.expect("failed to parse JSON");
    let message = body["error"].as_str().unwrap();
    assert!(message.contains("i.s.m"), "missing path in: {message}");
    assert!(message.contains("interval"), "missing field in: {message}");

    app.cleanup();
}

#[tokio::test]
async fn unparseable_body_is_a_bad_request() {
    let app = TestApp::new().await;

    let resp = app
        .client
        .post(format!("http://{}/api/v1/config", app.address))
        .header(vigil::http_server::API_KEY_HEADER, TEST_API_KEY)
        .body("{ not json")
        .send()
        .await
        .unwrap();

    assert_eq!(resp.status(), 400);

    app.cleanup();
}

#[tokio::test]
async fn minimal_valid_load_starts_no_probes() {
    let app = TestApp::new().await;

    let resp = app.post_config(&json!({"name": "i", "services": [{"name": "s"}]})).await;
    assert_eq!(resp.status(), 200);

    let resp = app.get("/api/v1/entities").await;
    assert_eq!(resp.status(), 200);
    let entities: serde_json::Value = resp.json().await.expect("failed to parse JSON");
    assert_eq!(entities, json!([]));

    app.cleanup();
}
