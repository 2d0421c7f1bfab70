//! Error types for the fetch state machine and controller

use thiserror::Error;

/// Message recorded when a failure carries no descriptive text
pub const FALLBACK_MESSAGE: &str = "Something went wrong";

/// Failure of the external operation itself
///
/// Returned by an [`Operation`](crate::environment::Operation) when the call
/// could not produce a response. The message is optional; its absence is
/// rendered as [`FALLBACK_MESSAGE`].
#[derive(Error, Debug, Clone, PartialEq, Eq, Default)]
#[error("{}", .message.as_deref().filter(|m| !m.is_empty()).unwrap_or(FALLBACK_MESSAGE))]
pub struct OperationError {
    message: Option<String>,
}

impl OperationError {
    /// Create an operation error with a message
    #[must_use]
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: Some(message.into()),
        }
    }

    /// Create an operation error without a message
    #[must_use]
    pub const fn without_message() -> Self {
        Self { message: None }
    }

    /// Capture the display text of any error
    #[must_use]
    pub fn from_error(error: &impl std::fmt::Display) -> Self {
        Self::new(error.to_string())
    }

    /// The raw message, if one was provided
    #[must_use]
    pub fn message(&self) -> Option<&str> {
        self.message.as_deref()
    }

    /// The message shown to the user: the raw message, or the fallback
    /// when it is absent or empty
    #[must_use]
    pub fn user_message(&self) -> &str {
        match self.message.as_deref() {
            Some(message) if !message.is_empty() => message,
            _ => FALLBACK_MESSAGE,
        }
    }
}

/// Errors surfaced by the fetch core
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FetchError {
    /// The external operation failed
    #[error(transparent)]
    Operation(#[from] OperationError),

    /// An action type outside the known set was received
    ///
    /// This is a programmer error; the action is never applied.
    #[error("Unhandled action type: {0}")]
    UnhandledAction(String),

    /// A known action type arrived with a payload it cannot carry
    #[error("Invalid payload for action `{action_type}`: {reason}")]
    InvalidPayload {
        /// Wire name of the action
        action_type: &'static str,
        /// Why the payload was rejected
        reason: String,
    },

    /// A success payload could not be shaped into the state's data type
    #[error("Failed to decode response payload: {0}")]
    Decode(String),
}

impl From<serde_json::Error> for FetchError {
    fn from(error: serde_json::Error) -> Self {
        Self::Decode(error.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn operation_error_falls_back_without_message() {
        assert_eq!(OperationError::without_message().to_string(), FALLBACK_MESSAGE);
        assert_eq!(OperationError::new("").to_string(), FALLBACK_MESSAGE);
    }

    #[test]
    fn operation_error_keeps_message() {
        let error = OperationError::new("connection reset");
        assert_eq!(error.to_string(), "connection reset");
        assert_eq!(error.message(), Some("connection reset"));
    }

    #[test]
    fn fetch_error_from_operation_is_transparent() {
        let error: FetchError = OperationError::new("timeout").into();
        assert_eq!(error.to_string(), "timeout");
    }

    #[test]
    fn decode_error_from_serde() {
        let Err(serde_error) = serde_json::from_str::<u32>("\"nope\"") else {
            unreachable!("a string never decodes into u32");
        };
        let error = FetchError::from(serde_error);
        assert!(matches!(error, FetchError::Decode(_)));
    }
}
