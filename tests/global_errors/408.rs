//! tests/global_errors/408.rs
//! Ensures that an upstream slower than the gateway timeout results in a 408.

#[path = "../mod.rs"]
mod common;

use reqwest::StatusCode;
use serde_json::Value;
use std::time::Duration;
use tokio::time::timeout;

#[tokio::test]
async fn returns_408_when_upstream_is_slower_than_the_gateway_timeout() {
    let alpha_port: String = format!("alpha:{}", common::spawn_upstream("alpha"));
    let app = common::spawn_app_with(
        &[
            ("SUBAPPS", alpha_port.as_str()),
            ("UPSTREAM_HOST", "127.0.0.1"),
            ("DEFAULT_TIMEOUT_SECONDS", "1"),
            ("UPSTREAM_TIMEOUT_SECONDS", "10"),
        ],
        common::RecordingRunner::default(),
    );

    // The stub's /slow handler sleeps for 3 seconds.
    let resp_result: Result<Result<reqwest::Response, reqwest::Error>, tokio::time::error::Elapsed> = timeout(
        Duration::from_secs(5), // client-side timeout duration
        async {
            reqwest::Client::new()
                .get(format!("{}/alpha/slow", app.base_url))
                .send()
                .await
        }
    )
    .await;

    // Ensure the client did not timeout waiting for a response.
    assert!(resp_result.is_ok(), "Client timed out waiting for server.");

    let resp: reqwest::Response = resp_result.unwrap().expect("Request failed unexpectedly.");

    // Check that the response is HTTP 408.
    assert_eq!(resp.status(), StatusCode::REQUEST_TIMEOUT);

    // Parse and verify the JSON output.
    let json: Value = common::json_body(resp).await;
    assert_eq!(json["status"], "REQUEST_TIMEOUT");
    assert_eq!(json["code"], 408);
}
