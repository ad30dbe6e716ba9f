//! Error kinds shared across the core.

use thiserror::Error;

/// Failures surfaced by the command and IPC layers.
///
/// Internal logic errors (invariant violations) never become `CoreError`;
/// they are logged and treated as no-ops so the main loop keeps running.
#[derive(Debug, Error)]
pub enum CoreError {
    /// Operation rejected due to the current mode or focus.
    #[error("invalid operation: {0}")]
    InvalidOperation(String),

    /// Workspace, output or container lookup failed.
    #[error("not found: {0}")]
    NotFound(String),

    /// The IPC command string failed to parse.
    #[error("parse error: {0}")]
    ParseError(String),

    /// A parsed IPC command was rejected during execution.
    #[error("execution error: {0}")]
    ExecutionError(String),

    /// A display-server call reported failure.
    #[error("external failure: {0}")]
    ExternalFailure(String),
}
