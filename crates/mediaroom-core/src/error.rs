//! Error types for the session layer.
//!
//! SDK failures are carried verbatim in [`SdkError`] and tagged with the
//! lifecycle operation that surfaced them. Nothing here is retried; retry
//! policy belongs to whoever drives the lifecycle.

use thiserror::Error;

use crate::{state::Phase, transition::Operation};

/// Error reported by the media SDK.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{reason}")]
pub struct SdkError {
    /// Description supplied by the SDK callback.
    pub reason: String,
}

impl SdkError {
    /// Create an SDK error from its description.
    pub fn new(reason: impl Into<String>) -> Self {
        Self { reason: reason.into() }
    }
}

/// Errors returned by [`crate::SessionClient`] lifecycle operations.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SessionError {
    /// SDK handshake failed.
    #[error("handshake failed: {0}")]
    Handshake(#[source] SdkError),

    /// Joining the room failed.
    #[error("join failed: {0}")]
    Join(#[source] SdkError),

    /// Leaving the room failed.
    #[error("leave failed: {0}")]
    Leave(#[source] SdkError),

    /// Creating or initializing the local capture failed.
    #[error("capture creation failed: {0}")]
    Capture(#[source] SdkError),

    /// Publishing the local capture failed.
    #[error("publish failed: {0}")]
    Publish(#[source] SdkError),

    /// Operation called out of order.
    #[error("invalid transition: cannot {operation} while {phase}")]
    InvalidTransition {
        /// Phase at the time of the call.
        phase: Phase,
        /// Operation that was attempted.
        operation: Operation,
    },
}

impl SessionError {
    /// Underlying SDK error. `None` for ordering violations.
    pub fn sdk_error(&self) -> Option<&SdkError> {
        match self {
            Self::Handshake(e)
            | Self::Join(e)
            | Self::Leave(e)
            | Self::Capture(e)
            | Self::Publish(e) => Some(e),
            Self::InvalidTransition { .. } => None,
        }
    }
}

/// Errors while loading [`crate::SessionConfig`].
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// Application identifier variable is not set.
    #[error("missing application identifier: set {var}")]
    MissingAppId {
        /// Environment variable that was looked up.
        var: &'static str,
    },

    /// Application identifier variable is set but blank.
    #[error("application identifier in {var} is blank")]
    BlankAppId {
        /// Environment variable that was looked up.
        var: &'static str,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sdk_failures_keep_their_reason() {
        let err = SessionError::Join(SdkError::new("invalid channel name"));
        assert_eq!(err.to_string(), "join failed: invalid channel name");
        assert_eq!(err.sdk_error().map(|e| e.reason.as_str()), Some("invalid channel name"));
    }

    #[test]
    fn ordering_violations_have_no_sdk_error() {
        let err =
            SessionError::InvalidTransition { phase: Phase::Idle, operation: Operation::Join };
        assert_eq!(err.to_string(), "invalid transition: cannot join while idle");
        assert!(err.sdk_error().is_none());
    }
}
