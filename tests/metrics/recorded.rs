//! tests/metrics/recorded.rs
//! Request, health and breaker metrics reach the installed recorder.

#[path = "../mod.rs"]
mod common;

use std::sync::OnceLock;

use metrics_util::debugging::{DebugValue, DebuggingRecorder, Snapshotter};

static SNAPSHOTTER: OnceLock<Snapshotter> = OnceLock::new();

fn snapshotter() -> &'static Snapshotter {
    SNAPSHOTTER.get_or_init(|| {
        let recorder: DebuggingRecorder = DebuggingRecorder::new();
        let snapshotter: Snapshotter = recorder.snapshotter();
        if recorder.install().is_err() {
            panic!("Another metrics recorder is already installed");
        }
        snapshotter
    })
}

/// Current value of the metric `name` carrying every label in `labels`
fn recorded(name: &str, labels: &[(&str, &str)]) -> Option<DebugValue> {
    snapshotter()
        .snapshot()
        .into_vec()
        .into_iter()
        .find_map(|(composite, _, _, value)| {
            let key = composite.key();
            let matches: bool = key.name() == name
                && labels.iter().all(|(k, v)| {
                    key.labels().any(|label| label.key() == *k && label.value() == *v)
                });
            matches.then_some(value)
        })
}

fn gauge(name: &str, labels: &[(&str, &str)]) -> f64 {
    match recorded(name, labels) {
        Some(DebugValue::Gauge(value)) => value.0,
        other => panic!("expected gauge {name}, got {other:?}"),
    }
}

#[tokio::test]
async fn requests_are_counted_and_timed() {
    snapshotter();
    let app = common::spawn_app();

    for _ in 0..2 {
        reqwest::get(format!("{}/health", app.base_url)).await.unwrap();
    }

    match recorded("requests_count", &[]) {
        Some(DebugValue::Counter(count)) => assert!(count >= 2),
        other => panic!("expected requests_count counter, got {other:?}"),
    }
    assert!(gauge("requests_latency", &[]) >= 0.0);
}

#[tokio::test]
async fn health_sweep_sets_subapp_up() {
    snapshotter();
    let subapps: String = format!(
        "gauge_live:{}:/health,gauge_dead:{}:/health",
        common::spawn_upstream("gauge_live"),
        common::dead_port()
    );
    let main_port: String = common::spawn_upstream("main").to_string();
    let app = common::spawn_app_with(
        &[
            ("MAIN_APP_PORT", main_port.as_str()),
            ("SUBAPPS", subapps.as_str()),
            ("UPSTREAM_HOST", "127.0.0.1"),
        ],
        common::RecordingRunner::default(),
    );

    app.state.health_monitor(false).check_all().await;

    assert_eq!(gauge("subapp_up", &[("subapp", "gauge_live")]), 1.0);
    assert_eq!(gauge("subapp_up", &[("subapp", "gauge_dead")]), 0.0);
}

#[tokio::test]
async fn breaker_trip_is_counted_once() {
    snapshotter();
    let subapps: String = format!("tripwire:{}:/health", common::dead_port());
    let main_port: String = common::dead_port().to_string();
    let app = common::spawn_app_with(
        &[
            ("MAIN_APP_PORT", main_port.as_str()),
            ("SUBAPPS", subapps.as_str()),
            ("UPSTREAM_HOST", "127.0.0.1"),
        ],
        common::RecordingRunner::default(),
    );

    // Three failures open the breaker, the fourth call is rejected outright
    for _ in 0..4 {
        reqwest::get(format!("{}/tripwire/anything", app.base_url)).await.unwrap();
    }

    assert_eq!(
        recorded("circuit_breaker_trips_total", &[("subapp", "tripwire")]),
        Some(DebugValue::Counter(1))
    );
    assert_eq!(
        recorded("proxy_requests_total", &[("subapp", "tripwire"), ("outcome", "rejected")]),
        Some(DebugValue::Counter(4))
    );
}
