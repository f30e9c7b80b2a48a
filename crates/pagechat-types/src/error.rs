use thiserror::Error;

use crate::message::Scope;

/// Errors from key-value store operations (used by trait definitions in pagechat-core).
#[derive(Debug, Error)]
pub enum RepositoryError {
    #[error("storage I/O error: {0}")]
    Io(String),

    #[error("serialization error: {0}")]
    Serialization(String),

    #[error("entity not found")]
    NotFound,
}

/// A cross-context send failed (tab closed, no receiver, ...).
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("no receiver in {0}")]
    NoReceiver(Scope),

    #[error("{scope} did not reply within {timeout_ms}ms")]
    Timeout { scope: Scope, timeout_ms: u64 },

    #[error("tab query failed: {0}")]
    Query(String),

    #[error("send to {scope} failed: {reason}")]
    Send { scope: Scope, reason: String },
}

/// A registered handler failed while processing a message.
#[derive(Debug, Error)]
pub enum HandlerError {
    #[error(transparent)]
    Transport(#[from] TransportError),

    #[error("invalid payload: {0}")]
    InvalidPayload(String),
}

/// Page text could not be extracted.
#[derive(Debug, Error)]
pub enum ExtractError {
    #[error("failed to read {location}: {reason}")]
    Read { location: String, reason: String },

    #[error("unsupported content at {0}")]
    Unsupported(String),
}

/// Why a chat turn was refused before it started.
///
/// A refused submit appends nothing and never reaches the generation client.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum SubmitError {
    #[error("message is empty")]
    EmptyInput,

    #[error("no API key configured")]
    MissingCredential,

    #[error("a response is already being generated")]
    TurnInFlight,

    #[error("no chat session is open")]
    NoSession,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::message::TabId;

    #[test]
    fn test_transport_error_display() {
        let err = TransportError::NoReceiver(Scope::Tab(TabId(3)));
        assert_eq!(err.to_string(), "no receiver in tab 3");
    }

    #[test]
    fn test_handler_error_is_transparent_over_transport() {
        let err: HandlerError = TransportError::Query("window gone".to_string()).into();
        assert_eq!(err.to_string(), "tab query failed: window gone");
    }

    #[test]
    fn test_repository_error_display() {
        let err = RepositoryError::Io("disk full".to_string());
        assert_eq!(err.to_string(), "storage I/O error: disk full");
    }
}
