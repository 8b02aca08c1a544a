//! Tests for health check endpoints.

use integration_tests::setup::TestContext;

#[tokio::test]
async fn test_health_endpoint_structure() {
    let ctx = TestContext::new().await;

    let body: serde_json::Value = reqwest::get(format!("{}/health", ctx.http_base()))
        .await
        .expect("health request")
        .json()
        .await
        .expect("health body");

    assert_eq!(body["status"], "healthy");
    assert_eq!(body["auth_healthy"], true);
    assert_eq!(body["hub_healthy"], true);
    assert!(body["active_accounts"].is_u64());
    assert!(body["active_connections"].is_u64());
}

#[tokio::test]
async fn test_readiness_and_liveness_probes() {
    let ctx = TestContext::new().await;

    let ready = reqwest::get(format!("{}/health/ready", ctx.http_base()))
        .await
        .expect("ready request");
    assert_eq!(ready.status().as_u16(), 200);

    let live = reqwest::get(format!("{}/health/live", ctx.http_base()))
        .await
        .expect("live request");
    assert_eq!(live.status().as_u16(), 200);
}
