//! Error types for listener registration and cycle execution.

use thiserror::Error;

/// Errors produced by the listener engine.
///
/// Handler failures never show up here: they are recovered inside a cycle and
/// reported as `ERROR` statuses. Only data-provider failures, panics caught at
/// the tick boundary and registration-time misconfiguration escape.
#[derive(Debug, Error)]
pub enum ListenerError {
    /// `receive` failed for an endpoint; fatal to the current cycle.
    #[error("endpoint [{endpoint}] failed to receive records: {source:#}")]
    Receive {
        /// Endpoint identifier.
        endpoint: String,
        /// Failure reported by the data provider.
        #[source]
        source: anyhow::Error,
    },
    /// `commit` failed for an endpoint; fatal to the current cycle.
    #[error("endpoint [{endpoint}] failed to commit ({records}) status(es): {source:#}")]
    Commit {
        /// Endpoint identifier.
        endpoint: String,
        /// Number of statuses that could not be committed.
        records: usize,
        /// Failure reported by the data provider.
        #[source]
        source: anyhow::Error,
    },
    /// An endpoint with the same id is already registered.
    #[error("endpoint [{0}] is already registered")]
    DuplicateEndpoint(String),
    /// No endpoint with the given id is registered.
    #[error("endpoint [{0}] is not registered")]
    UnknownEndpoint(String),
    /// Registration attempted after the publisher started.
    #[error("registration closed: publisher already started")]
    RegistrationClosed,
    /// Endpoint or process configuration is invalid.
    #[error("misconfiguration: {0}")]
    Misconfiguration(String),
    /// A cron expression could not be parsed.
    #[error("invalid cron expression `{expression}`: {reason}")]
    InvalidCron {
        /// The offending expression.
        expression: String,
        /// Why parsing failed.
        reason: String,
    },
    /// A cycle panicked outside of handler invocation.
    #[error("endpoint [{endpoint}] cycle panicked: {message}")]
    Panicked {
        /// Endpoint identifier.
        endpoint: String,
        /// Panic payload, when it was a string.
        message: String,
    },
}

impl ListenerError {
    /// Shorthand for a misconfiguration error.
    pub fn misconfigured(message: impl Into<String>) -> Self {
        Self::Misconfiguration(message.into())
    }

    /// True for failures detected while building or registering an endpoint.
    #[must_use]
    pub const fn is_registration_error(&self) -> bool {
        matches!(
            self,
            Self::DuplicateEndpoint(_)
                | Self::RegistrationClosed
                | Self::Misconfiguration(_)
                | Self::InvalidCron { .. }
        )
    }
}

/// Application-facing result using anyhow for collaborator contracts.
pub type AppResult<T> = Result<T, anyhow::Error>;

/// Render a panic payload caught with `catch_unwind`.
pub(crate) fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "non-string panic payload".to_string()
    }
}
