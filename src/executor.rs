//! The host-side half of the bridge: a single-threaded loop that drains the
//! delivery channel, dispatches commands against the document, and persists
//! responses. All geometry mutation happens here, never on the watcher.

use crate::body::Document;
use crate::bridge::Delivery;
use crate::dispatch::Dispatcher;
use crate::mailbox::Mailbox;
use crate::protocol::{CommandEnvelope, MacroStep, Response, MACRO_COMMAND};
use serde_json::{json, Map, Value as JsonValue};
use tokio::sync::mpsc;

/// What to do when a macro sub-command fails.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MacroPolicy {
    /// Run every step and finish with an aggregate success response, even if
    /// individual steps failed. Matches the reference host: per-step failures
    /// are visible only transiently before the aggregate overwrites them.
    #[default]
    ContinueAndAggregate,
    /// Stop at the first failing step; its error becomes the terminal
    /// response.
    AbortOnError,
}

pub struct Executor<D: Document> {
    dispatcher: Dispatcher,
    document: D,
    responses: Mailbox,
    macro_policy: MacroPolicy,
}

impl<D: Document> Executor<D> {
    pub fn new(dispatcher: Dispatcher, document: D, responses: Mailbox) -> Self {
        Self {
            dispatcher,
            document,
            responses,
            macro_policy: MacroPolicy::default(),
        }
    }

    pub fn with_macro_policy(mut self, policy: MacroPolicy) -> Self {
        self.macro_policy = policy;
        self
    }

    pub fn document_mut(&mut self) -> &mut D {
        &mut self.document
    }

    /// Drains deliveries until the channel closes (bridge stopped).
    pub async fn run(mut self, mut deliveries: mpsc::Receiver<Delivery>) {
        while let Some(delivery) = deliveries.recv().await {
            self.process(delivery).await;
        }
        tracing::debug!("delivery channel closed, executor exiting");
    }

    /// Handles one delivered payload end to end. Always leaves a terminal
    /// response in the response mailbox, whatever happens in between.
    pub async fn process(&mut self, delivery: Delivery) {
        tracing::debug!(id = %delivery.id, "processing command payload");
        if let Err(err) = self.responses.clear().await {
            tracing::warn!(id = %delivery.id, error = %err, "failed to clear response mailbox");
        }

        let envelope: CommandEnvelope = match serde_json::from_str(&delivery.payload) {
            Ok(envelope) => envelope,
            Err(err) => {
                tracing::warn!(id = %delivery.id, error = %err, "malformed command payload");
                self.respond(&Response::error(
                    "Failed to process command payload.",
                    Some(err.to_string()),
                ))
                .await;
                return;
            }
        };

        let response = if envelope.command == MACRO_COMMAND {
            self.run_macro(&envelope.parameters).await
        } else {
            self.dispatcher
                .dispatch(&mut self.document, &envelope.command, &envelope.parameters)
        };
        self.respond(&response).await;
    }

    async fn run_macro(&mut self, params: &Map<String, JsonValue>) -> Response {
        let steps: Vec<MacroStep> = match params.get("commands") {
            Some(value) => match serde_json::from_value(value.clone()) {
                Ok(steps) => steps,
                Err(err) => {
                    return Response::error(
                        "Invalid macro: 'commands' must be a list of sub-commands.",
                        Some(err.to_string()),
                    )
                }
            },
            None => Vec::new(),
        };

        let total = steps.len();
        for (index, step) in steps.iter().enumerate() {
            let response =
                self.dispatcher
                    .dispatch(&mut self.document, &step.tool_name, &step.arguments);
            // Only the terminal response survives in the mailbox.
            self.respond(&response).await;
            if !response.is_success() && self.macro_policy == MacroPolicy::AbortOnError {
                let detail = response.message.unwrap_or_default();
                return Response::error(
                    format!(
                        "Macro aborted at step {} of {total} ('{}'): {detail}",
                        index + 1,
                        step.tool_name
                    ),
                    response.diagnostic,
                );
            }
        }
        Response::success(json!(format!("Macro with {total} steps executed.")))
    }

    /// Best-effort response write: a failure here is logged, never raised.
    async fn respond(&self, response: &Response) {
        if let Err(err) = self.responses.write_pretty(response).await {
            tracing::error!(error = %err, "failed to write response mailbox");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::body::{BoxBody, MemoryDocument};
    use crate::geometry::BoundingBox;
    use crate::handlers::register_builtin;
    use crate::protocol::Status;
    use glam::DVec3;
    use serde_json::json;
    use tempfile::TempDir;
    use tracing_test::traced_test;
    use uuid::Uuid;

    fn executor(dir: &TempDir) -> Executor<MemoryDocument> {
        let mut dispatcher = Dispatcher::new();
        register_builtin(&mut dispatcher);
        let mut document = MemoryDocument::new();
        document.insert(BoxBody::new(
            "Body1",
            BoundingBox::new(DVec3::ZERO, DVec3::new(1.0, 1.0, 2.0)),
        ));
        Executor::new(
            dispatcher,
            document,
            Mailbox::new(dir.path().join("response.txt")),
        )
    }

    fn delivery(payload: serde_json::Value) -> Delivery {
        Delivery {
            id: Uuid::new_v4(),
            payload: payload.to_string(),
        }
    }

    async fn read_response(dir: &TempDir) -> Response {
        let content = tokio::fs::read_to_string(dir.path().join("response.txt"))
            .await
            .unwrap();
        serde_json::from_str(&content).unwrap()
    }

    #[tokio::test]
    async fn single_command_writes_success_response() {
        let dir = tempfile::tempdir().unwrap();
        let mut executor = executor(&dir);
        executor
            .process(delivery(json!({
                "command": "get_body_dimensions",
                "parameters": {"body_name": "Body1"}
            })))
            .await;
        let response = read_response(&dir).await;
        assert!(response.is_success());
        assert_eq!(response.result.unwrap()["height"], json!(20.0));
    }

    #[tokio::test]
    async fn unknown_command_still_leaves_a_response() {
        let dir = tempfile::tempdir().unwrap();
        let mut executor = executor(&dir);
        executor
            .process(delivery(json!({"command": "warp_drive"})))
            .await;
        let response = read_response(&dir).await;
        assert_eq!(response.status, Status::Error);
        assert!(response
            .message
            .unwrap()
            .contains("Unsupported command: warp_drive"));
    }

    #[tokio::test]
    async fn malformed_payload_writes_error_response() {
        let dir = tempfile::tempdir().unwrap();
        let mut executor = executor(&dir);
        executor
            .process(Delivery {
                id: Uuid::new_v4(),
                payload: "{not json".to_string(),
            })
            .await;
        let response = read_response(&dir).await;
        assert_eq!(response.status, Status::Error);
        assert!(response.diagnostic.is_some());
    }

    #[tokio::test]
    #[traced_test]
    async fn malformed_payload_warns_with_delivery_id() {
        let dir = tempfile::tempdir().unwrap();
        let mut executor = executor(&dir);
        let id = Uuid::new_v4();
        executor
            .process(Delivery {
                id,
                payload: "{not json".to_string(),
            })
            .await;
        assert!(logs_contain("malformed command payload"));
        assert!(logs_contain(&id.to_string()));
    }

    /// Pins the reference behavior: a failing step inside a macro is masked
    /// by the aggregate success response. Callers needing per-step outcomes
    /// must use item-level commands instead.
    #[tokio::test]
    async fn macro_aggregate_success_masks_step_failure() {
        let dir = tempfile::tempdir().unwrap();
        let mut executor = executor(&dir);
        executor
            .process(delivery(json!({
                "command": "execute_macro",
                "parameters": {"commands": [
                    {"tool_name": "move_by_name", "arguments": {"body_name": "Body1", "x_dist": 10.0}},
                    {"tool_name": "does_not_exist", "arguments": {}},
                    {"tool_name": "move_by_name", "arguments": {"body_name": "Body1", "x_dist": 10.0}}
                ]}
            })))
            .await;
        let response = read_response(&dir).await;
        assert!(response.is_success());
        assert_eq!(
            response.result.unwrap(),
            json!("Macro with 3 steps executed.")
        );
        // The step failure is not retrievable from the terminal response.
        assert!(response.message.is_none());
        assert!(response.diagnostic.is_none());

        // Steps after the failing one still ran.
        let body = executor.document_mut().find_body("Body1").unwrap();
        assert!((body.bounding_box().min.x - 2.0).abs() < 1e-9);
    }

    #[tokio::test]
    async fn macro_abort_on_error_stops_at_failing_step() {
        let dir = tempfile::tempdir().unwrap();
        let mut executor = executor(&dir).with_macro_policy(MacroPolicy::AbortOnError);
        executor
            .process(delivery(json!({
                "command": "execute_macro",
                "parameters": {"commands": [
                    {"tool_name": "move_by_name", "arguments": {"body_name": "Body1", "x_dist": 10.0}},
                    {"tool_name": "does_not_exist", "arguments": {}},
                    {"tool_name": "move_by_name", "arguments": {"body_name": "Body1", "x_dist": 10.0}}
                ]}
            })))
            .await;
        let response = read_response(&dir).await;
        assert_eq!(response.status, Status::Error);
        assert!(response
            .message
            .unwrap()
            .contains("Macro aborted at step 2 of 3 ('does_not_exist')"));

        // The third step never ran.
        let body = executor.document_mut().find_body("Body1").unwrap();
        assert!((body.bounding_box().min.x - 1.0).abs() < 1e-9);
    }

    #[tokio::test]
    async fn empty_macro_reports_zero_steps() {
        let dir = tempfile::tempdir().unwrap();
        let mut executor = executor(&dir);
        executor
            .process(delivery(json!({"command": "execute_macro"})))
            .await;
        let response = read_response(&dir).await;
        assert!(response.is_success());
        assert_eq!(
            response.result.unwrap(),
            json!("Macro with 0 steps executed.")
        );
    }
}
