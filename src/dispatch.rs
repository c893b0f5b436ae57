//! Command name → handler table and the fault boundary around handler calls.

use crate::body::Document;
use crate::protocol::Response;
use color_eyre::eyre::Result;
use serde_json::{Map, Value as JsonValue};
use std::collections::HashMap;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;

/// Namespace prefix every command is also reachable under (`cad:move_by_name`).
pub const COMMAND_NAMESPACE: &str = "cad";

pub type Handler =
    dyn Fn(&mut dyn Document, &Map<String, JsonValue>) -> Result<JsonValue> + Send + Sync;

/// Immutable after construction; safe for concurrent reads without locking.
pub struct Dispatcher {
    handlers: HashMap<String, Arc<Handler>>,
}

impl Dispatcher {
    pub fn new() -> Self {
        Self {
            handlers: HashMap::new(),
        }
    }

    /// Registers `handler` under `name` and under the namespaced alias.
    pub fn register<F>(&mut self, name: &str, handler: F)
    where
        F: Fn(&mut dyn Document, &Map<String, JsonValue>) -> Result<JsonValue>
            + Send
            + Sync
            + 'static,
    {
        let handler: Arc<Handler> = Arc::new(handler);
        self.handlers
            .insert(format!("{COMMAND_NAMESPACE}:{name}"), Arc::clone(&handler));
        self.handlers.insert(name.to_string(), handler);
    }

    pub fn command_names(&self) -> Vec<String> {
        let mut names: Vec<_> = self.handlers.keys().cloned().collect();
        names.sort();
        names
    }

    /// Resolves and invokes a handler, converting every outcome into a
    /// [`Response`]. Nothing escapes this boundary: handler errors and panics
    /// both become error responses with the fault captured in `diagnostic`.
    pub fn dispatch(
        &self,
        document: &mut dyn Document,
        name: &str,
        params: &Map<String, JsonValue>,
    ) -> Response {
        let Some(handler) = self.handlers.get(name) else {
            tracing::warn!(command = name, "unsupported command");
            return Response::error(format!("Unsupported command: {name}"), None);
        };

        tracing::debug!(command = name, "executing command");
        let outcome = catch_unwind(AssertUnwindSafe(|| handler(document, params)));
        match outcome {
            Ok(Ok(result)) => Response::success(result),
            Ok(Err(report)) => {
                tracing::warn!(command = name, error = %report, "command failed");
                Response::error(
                    format!("Failed to execute '{name}': {report}"),
                    Some(format!("{report:?}")),
                )
            }
            Err(panic) => {
                let detail = panic_message(&*panic);
                tracing::error!(command = name, detail, "command panicked");
                Response::error(
                    format!("Failed to execute '{name}': {detail}"),
                    Some(format!("panic while executing '{name}': {detail}")),
                )
            }
        }
    }
}

impl Default for Dispatcher {
    fn default() -> Self {
        Self::new()
    }
}

fn panic_message(panic: &(dyn std::any::Any + Send)) -> &str {
    if let Some(message) = panic.downcast_ref::<&str>() {
        message
    } else if let Some(message) = panic.downcast_ref::<String>() {
        message
    } else {
        "unknown panic"
    }
}
