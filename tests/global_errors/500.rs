//! tests/global_errors/500.rs
//! Ensures that a failing compose command maps to an HTTP 500.

#[path = "../mod.rs"]
mod common;

use reqwest::StatusCode;
use serde_json::Value;

#[tokio::test]
async fn returns_500_when_compose_command_fails() {
    let alpha: String = format!("alpha:{}", common::dead_port());
    let app = common::spawn_app_with(
        &[("SUBAPPS", alpha.as_str())],
        common::RecordingRunner { fail: true, ..Default::default() },
    );

    let resp: reqwest::Response = reqwest::Client::new()
        .post(format!("{}/admin/services/alpha/restart", app.base_url))
        .send()
        .await
        .expect("Failed to make request.");

    // Expect a 500 Internal Server Error.
    assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);

    let json: Value = common::json_body(resp).await;
    assert_eq!(json["status"], "INTERNAL_SERVER_ERROR");
    assert_eq!(json["code"], 500);
    assert!(json["data"]["error"].as_str().unwrap().contains("no such service"));
}
