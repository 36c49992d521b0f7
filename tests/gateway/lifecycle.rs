//! tests/gateway/lifecycle.rs
//! A managed stack is torn down whether the gateway stops cleanly or fails to start.

#[path = "../mod.rs"]
mod common;

use std::time::Duration;

use reqwest::StatusCode;
use subapp_gateway::core::server::run_gateway;
use tokio::net::TcpListener as TokioTcpListener;
use tokio::sync::oneshot;

#[tokio::test]
async fn failed_provisioning_still_stops_the_stack() {
    let dir = tempfile::tempdir().unwrap();
    let project: String = dir.path().display().to_string();
    let (state, runner, _) = common::build_state(
        &[("PROJECT_DIR", project.as_str()), ("UPSTREAM_HOST", "127.0.0.1")],
        common::RecordingRunner { fail: true, ..Default::default() },
    );

    let listener: TokioTcpListener = common::bind_ephemeral();
    let result = run_gateway(state, listener, true, std::future::pending::<()>()).await;

    let err = result.unwrap_err();
    assert!(format!("{err:#}").contains("Failed to provision the compose stack"));

    let calls = runner.calls.lock().unwrap().clone();
    assert_eq!(calls.first().unwrap(), &vec!["-f", "docker-compose.yml", "build", "main"]);
    assert_eq!(calls.last().unwrap(), &vec!["-f", "docker-compose.yml", "down"]);
    assert!(dir.path().join("docker-compose.yml").exists());
}

#[tokio::test]
async fn shutdown_stops_the_stack_after_serving() {
    let dir = tempfile::tempdir().unwrap();
    let project: String = dir.path().display().to_string();
    let main_port: String = common::spawn_upstream("main").to_string();
    let subapps: String = format!("alpha:{}:/health", common::spawn_upstream("alpha"));
    let (state, runner, _) = common::build_state(
        &[
            ("PROJECT_DIR", project.as_str()),
            ("MAIN_APP_PORT", main_port.as_str()),
            ("SUBAPPS", subapps.as_str()),
            ("UPSTREAM_HOST", "127.0.0.1"),
        ],
        common::RecordingRunner::default(),
    );

    let listener: TokioTcpListener = common::bind_ephemeral();
    let base_url: String = format!("http://{}", listener.local_addr().unwrap());
    let (stop_tx, stop_rx) = oneshot::channel::<()>();
    let handle = tokio::spawn(run_gateway(state, listener, true, async move {
        let _ = stop_rx.await;
    }));

    let status: StatusCode = reqwest::get(format!("{base_url}/health")).await.unwrap().status();
    assert_eq!(status, StatusCode::OK);

    stop_tx.send(()).unwrap();
    tokio::time::timeout(Duration::from_secs(5), handle)
        .await
        .expect("gateway did not stop")
        .unwrap()
        .unwrap();

    let calls = runner.calls.lock().unwrap().clone();
    let up: Vec<String> = vec!["-f", "docker-compose.yml", "up", "-d"]
        .into_iter()
        .map(String::from)
        .collect();
    assert!(calls.contains(&up));
    assert_eq!(calls.last().unwrap(), &vec!["-f", "docker-compose.yml", "down"]);
}
