//! tests/proxy/routing.rs
//! Requests under /<subapp>/ reach the right upstream with the prefix removed.

#[path = "../mod.rs"]
mod common;

use reqwest::StatusCode;
use serde_json::Value;

#[tokio::test]
async fn root_is_served_by_main() {
    let app = common::spawn_app();

    let resp: reqwest::Response = reqwest::get(format!("{}/", app.base_url)).await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);

    // Upstream bodies are relayed as-is, without the gateway envelope
    let json: Value = common::json_body(resp).await;
    assert_eq!(json["message"], "Hello main");
    assert!(json.get("code").is_none());
}

#[tokio::test]
async fn subapp_prefix_is_stripped_and_query_kept() {
    let app = common::spawn_app();

    let resp: reqwest::Response = reqwest::get(format!("{}/alpha/echo?page=2&q=rust", app.base_url))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);

    let json: Value = common::json_body(resp).await;
    assert_eq!(json["method"], "GET");
    assert_eq!(json["path"], "/echo");
    assert_eq!(json["query"], "page=2&q=rust");
    assert_eq!(json["forwarded_prefix"], "/alpha");
    assert!(json["request_id"].as_str().is_some_and(|id| !id.is_empty()));
}

#[tokio::test]
async fn bare_subapp_path_hits_its_root() {
    let app = common::spawn_app();

    let resp: reqwest::Response = reqwest::get(format!("{}/alpha", app.base_url)).await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);

    let json: Value = common::json_body(resp).await;
    assert_eq!(json["message"], "Hello alpha");
}

#[tokio::test]
async fn method_body_and_request_id_are_forwarded() {
    let app = common::spawn_app();

    let resp: reqwest::Response = reqwest::Client::new()
        .put(format!("{}/alpha/echo", app.base_url))
        .header("x-request-id", "req-123")
        .body("payload")
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);

    let json: Value = common::json_body(resp).await;
    assert_eq!(json["method"], "PUT");
    assert_eq!(json["body"], "payload");
    assert_eq!(json["request_id"], "req-123");
}

#[tokio::test]
async fn upstream_client_errors_pass_through() {
    let app = common::spawn_app();

    let resp: reqwest::Response = reqwest::get(format!("{}/alpha/missing", app.base_url))
        .await
        .unwrap();

    // The upstream's own 404, not the gateway's enveloped one
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    let body: String = resp.text().await.unwrap();
    assert!(!body.contains("NOT_FOUND"));

    let breaker = app.state.breakers.get("alpha").unwrap();
    assert_eq!(breaker.stats().await.failed_calls, 0);
}
