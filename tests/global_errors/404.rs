//! tests/global_errors/404.rs
//! Ensures that a path owned by neither the gateway nor a sub-app returns HTTP 404.

// Include the helper module defined in tests/mod.rs.
#[path = "../mod.rs"]
mod common;

use reqwest::StatusCode;
use serde_json::Value;

#[tokio::test]
async fn returns_404_for_unrouted_path() {
    // Use the helper function to spawn the gateway.
    let app = common::spawn_app();

    // Send a GET request to a path no sub-app is registered for.
    let resp: reqwest::Response = reqwest::Client::new()
        .get(format!("{}/does-not-exist/anything", app.base_url))
        .send()
        .await
        .expect("Failed to execute request.");

    // Verify the status is 404.
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);

    let json: Value = common::json_body(resp).await;

    // Assert the JSON has the expected structure.
    assert_eq!(json["status"], "NOT_FOUND");
    assert_eq!(json["code"], 404);
    assert_eq!(json["data"]["path"], "/does-not-exist/anything");
}
