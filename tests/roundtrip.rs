//! End-to-end mailbox round trips: controller writes the command file, the
//! bridge delivers it, the executor dispatches and writes the response file.

use cad_bridge::handlers::register_builtin;
use cad_bridge::{
    BoundingBox, BoxBody, Bridge, BridgeConfig, Dispatcher, Executor, MacroPolicy, Mailbox,
    MemoryDocument, Response, Status,
};
use glam::DVec3;
use serde_json::{json, Value};
use std::path::PathBuf;
use std::time::Duration;
use tempfile::TempDir;
use tokio::sync::mpsc;
use tokio::time::sleep;

struct Harness {
    _dir: TempDir,
    bridge: Bridge,
    command_path: PathBuf,
    response_path: PathBuf,
    executor_handle: tokio::task::JoinHandle<()>,
}

impl Harness {
    /// Clears the response slot, writes the payload, and polls until a
    /// response satisfying `accept` shows up. The predicate guards against
    /// reading a stale or intermediate (macro per-step) response.
    async fn send(&self, payload: Value, accept: impl Fn(&Response) -> bool) -> Response {
        tokio::fs::write(&self.response_path, "").await.unwrap();
        tokio::fs::write(&self.command_path, payload.to_string())
            .await
            .unwrap();

        let deadline = tokio::time::Instant::now() + Duration::from_secs(3);
        loop {
            if let Ok(content) = tokio::fs::read_to_string(&self.response_path).await {
                if let Ok(response) = serde_json::from_str::<Response>(&content) {
                    if accept(&response) {
                        return response;
                    }
                }
            }
            assert!(
                tokio::time::Instant::now() < deadline,
                "timed out waiting for response file"
            );
            sleep(Duration::from_millis(10)).await;
        }
    }

    async fn shutdown(mut self) {
        self.bridge.stop().await;
        self.executor_handle.await.ok();
    }
}

async fn start_harness(policy: MacroPolicy) -> Harness {
    let dir = tempfile::tempdir().unwrap();
    let command_path = dir.path().join("command.txt");
    let response_path = dir.path().join("response.txt");

    let mut dispatcher = Dispatcher::new();
    register_builtin(&mut dispatcher);

    let mut document = MemoryDocument::new();
    // 10x10x20 mm box with centroid at its center.
    document.insert(BoxBody::new(
        "Body1",
        BoundingBox::new(DVec3::ZERO, DVec3::new(1.0, 1.0, 2.0)),
    ));

    let executor = Executor::new(dispatcher, document, Mailbox::new(&response_path))
        .with_macro_policy(policy);

    let config = BridgeConfig::new(&command_path, &response_path)
        .with_poll_interval(Duration::from_millis(20));
    let mut bridge = Bridge::new(config);

    let (tx, rx) = mpsc::channel(1);
    bridge.start(tx).await.unwrap();
    let executor_handle = tokio::spawn(executor.run(rx));

    // Let the watcher record the cleared file's timestamp first.
    sleep(Duration::from_millis(50)).await;

    Harness {
        _dir: dir,
        bridge,
        command_path,
        response_path,
        executor_handle,
    }
}

fn place_body_at_100() -> Value {
    json!({
        "command": "place_body",
        "parameters": {
            "body_name": "Body1",
            "cx": 100.0,
            "x_placement": "left",
            "z_placement": "bottom",
            "direction": "positive"
        }
    })
}

#[tokio::test]
async fn query_command_round_trips_through_the_mailboxes() {
    let harness = start_harness(MacroPolicy::ContinueAndAggregate).await;
    let response = harness
        .send(
            json!({
                "command": "get_bounding_box",
                "parameters": {"body_name": "Body1"}
            }),
            |_| true,
        )
        .await;
    assert_eq!(response.status, Status::Success);
    let result = response.result.unwrap();
    assert_eq!(result["max"]["z"], json!(20.0));
    harness.shutdown().await;
}

#[tokio::test]
async fn placement_command_moves_the_body_and_is_idempotent() {
    let harness = start_harness(MacroPolicy::ContinueAndAggregate).await;
    let response = harness.send(place_body_at_100(), |_| true).await;
    assert_eq!(response.status, Status::Success);
    let translation = &response.result.unwrap()["translation"];
    assert_eq!(translation["x"], json!(100.0));
    assert_eq!(translation["y"], json!(-5.0));

    // Re-running the satisfied placement resolves to a near-zero move.
    let response = harness.send(place_body_at_100(), |_| true).await;
    let translation = &response.result.unwrap()["translation"];
    assert!(translation["x"].as_f64().unwrap().abs() < 1e-6);
    assert!(translation["z"].as_f64().unwrap().abs() < 1e-6);
    harness.shutdown().await;
}

#[tokio::test]
async fn unknown_command_reports_error_without_stopping_the_bridge() {
    let harness = start_harness(MacroPolicy::ContinueAndAggregate).await;
    let response = harness.send(json!({"command": "not_a_tool"}), |_| true).await;
    assert_eq!(response.status, Status::Error);
    assert!(response
        .message
        .unwrap()
        .contains("Unsupported command: not_a_tool"));

    // The bridge is still serving commands afterwards.
    let response = harness
        .send(
            json!({
                "command": "get_body_dimensions",
                "parameters": {"body_name": "Body1"}
            }),
            |_| true,
        )
        .await;
    assert_eq!(response.status, Status::Success);
    harness.shutdown().await;
}

#[tokio::test]
async fn macro_with_failing_step_still_aggregates_success() {
    let harness = start_harness(MacroPolicy::ContinueAndAggregate).await;
    let is_aggregate = |response: &Response| {
        response
            .result
            .as_ref()
            .and_then(Value::as_str)
            .is_some_and(|s| s.starts_with("Macro with"))
    };
    let response = harness
        .send(
            json!({
                "command": "execute_macro",
                "parameters": {"commands": [
                    {"tool_name": "move_by_name", "arguments": {"body_name": "Body1", "x_dist": 10.0}},
                    {"tool_name": "broken_tool", "arguments": {}},
                    {"tool_name": "move_by_name", "arguments": {"body_name": "Body1", "x_dist": 10.0}}
                ]}
            }),
            is_aggregate,
        )
        .await;
    assert_eq!(response.status, Status::Success);
    assert_eq!(
        response.result.unwrap(),
        json!("Macro with 3 steps executed.")
    );
    harness.shutdown().await;
}
