//! tests/gateway/admin.rs
//! Restart and scale endpoints drive the compose runner.

#[path = "../mod.rs"]
mod common;

use reqwest::StatusCode;
use serde_json::{json, Value};

#[tokio::test]
async fn restart_runs_compose_restart() {
    let app = common::spawn_app();

    let resp: reqwest::Response = reqwest::Client::new()
        .post(format!("{}/admin/services/alpha/restart", app.base_url))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);

    let json: Value = common::json_body(resp).await;
    assert_eq!(json["status"], "OK");
    assert_eq!(json["data"]["service"], "alpha");

    let calls = app.runner.calls.lock().unwrap().clone();
    assert_eq!(calls, vec![vec!["-f", "docker-compose.yml", "restart", "alpha"]]);
}

#[tokio::test]
async fn scale_runs_compose_up_with_scale() {
    let app = common::spawn_app();

    let resp: reqwest::Response = reqwest::Client::new()
        .post(format!("{}/admin/services/alpha/scale", app.base_url))
        .json(&json!({ "replicas": 3 }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);

    let json: Value = common::json_body(resp).await;
    assert_eq!(json["data"]["replicas"], 3);

    let calls = app.runner.calls.lock().unwrap().clone();
    assert_eq!(calls, vec![vec!["-f", "docker-compose.yml", "up", "-d", "--scale", "alpha=3"]]);
}

#[tokio::test]
async fn unknown_service_is_404_and_zero_replicas_is_400() {
    let app = common::spawn_app();
    let client = reqwest::Client::new();

    let resp = client
        .post(format!("{}/admin/services/nope/restart", app.base_url))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    let json: Value = common::json_body(resp).await;
    assert_eq!(json["data"]["error"], "unknown service 'nope'");

    let resp = client
        .post(format!("{}/admin/services/alpha/scale", app.base_url))
        .json(&json!({ "replicas": 0 }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

    assert!(app.runner.calls.lock().unwrap().is_empty());
}
