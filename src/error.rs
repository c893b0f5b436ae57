use std::path::PathBuf;
use thiserror::Error;

/// Failures surfaced by the bridge lifecycle. Handler-level faults never show
/// up here; the dispatcher converts those into error responses instead.
#[derive(Debug, Error)]
pub enum BridgeError {
    #[error("failed to prepare mailbox file {path}")]
    MailboxSetup {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// A placement or geometry command referenced a body the document does not
/// contain.
#[derive(Debug, Error)]
#[error("no body named '{0}' in the active document")]
pub struct InvalidReference(pub String);
