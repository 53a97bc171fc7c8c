use wq_commons::ProtocolError;

/// Error produced by a translation fetch.
///
/// Never panics the caller: [`crate::tasks::match_task`] maps any variant
/// to "translation service unavailable" and keeps the match alive.
#[derive(Debug, thiserror::Error)]
pub enum TranslatorError {
    #[error("translator request failed: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("translator returned an unexpected response body")]
    UnexpectedResponse,
}

/// Error surface for a dispatched task.
///
/// `Protocol` carries a response string that is owed to the client and
/// should be written back through the Mailman; `Internal` is logged and
/// answered with a generic failure line instead of leaking internals.
#[derive(Debug, thiserror::Error)]
pub enum TaskError {
    #[error(transparent)]
    Protocol(#[from] ProtocolError),
    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

impl TaskError {
    /// The line that should be sent back to the client.
    pub fn wire_message(&self) -> String {
        match self {
            TaskError::Protocol(e) => e.to_string(),
            TaskError::Internal(e) => {
                tracing::error!(error = %e, "internal task error");
                "Internal error. Please try again.".to_string()
            }
        }
    }
}
