//! Acknowledgement model committed back to data providers.

use serde::{Deserialize, Serialize};

/// Outcome state of a processed record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ResponseState {
    /// The listener processed the record.
    Ok,
    /// The listener failed on the record (or its batch).
    Error,
    /// The record was discarded by the filter and never reached the listener.
    Skipped,
}

/// Per-record acknowledgement.
///
/// `success` is true iff `state` is [`ResponseState::Ok`]; an `Error` status
/// always carries a non-empty `error_message`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResponseStatus {
    /// Identity of the acknowledged record.
    pub id: i64,
    /// Whether the record was processed successfully.
    pub success: bool,
    /// Outcome state.
    pub state: ResponseState,
    /// Failure description; empty unless `state` is `Error`.
    #[serde(default)]
    pub error_message: String,
}

const UNSPECIFIED_FAILURE: &str = "unspecified listener failure";

impl ResponseStatus {
    /// Successful acknowledgement.
    #[must_use]
    pub const fn ok(id: i64) -> Self {
        Self {
            id,
            success: true,
            state: ResponseState::Ok,
            error_message: String::new(),
        }
    }

    /// Failed acknowledgement. An empty message is replaced by a fallback text.
    pub fn error(id: i64, message: impl Into<String>) -> Self {
        let mut error_message = message.into();
        if error_message.trim().is_empty() {
            error_message = UNSPECIFIED_FAILURE.to_string();
        }
        Self {
            id,
            success: false,
            state: ResponseState::Error,
            error_message,
        }
    }

    /// Acknowledgement for a record discarded before invocation.
    #[must_use]
    pub const fn skipped(id: i64) -> Self {
        Self {
            id,
            success: false,
            state: ResponseState::Skipped,
            error_message: String::new(),
        }
    }

    /// True when the status reports an `Error`.
    #[must_use]
    pub fn is_error(&self) -> bool {
        self.state == ResponseState::Error
    }
}
