use crate::helpers::*;

#[tokio::test]
async fn health_endpoint_requires_no_auth() {
    let app = TestApp::new().await;

    let resp = app.get_with_key("/health", None).await;

    assert_eq!(resp.status(), 200);
    let body: serde_json::Value = resp.json().await.expect("failed to parse JSON");
    assert_eq!(body["status"], "ok");

    app.cleanup();
}

#[tokio::test]
async fn api_routes_reject_missing_or_wrong_key() {
    let app = TestApp::new().await;

    for path in ["/api/v1/entities", "/api/v1/heartbeats", "/api/v1/metrics", "/api/v1/config"] {
        let resp = app.get_with_key(path, None).await;
        assert_eq!(resp.status(), 401, "no key on {path}");

        let resp = app.get_with_key(path, Some("wrong-key")).await;
        assert_eq!(resp.status(), 401, "wrong key on {path}");
        let body: serde_json::Value = resp.json().await.expect("failed to parse JSON");
        assert_eq!(body["error"], "Invalid or missing API key");
    }

    app.cleanup();
}
