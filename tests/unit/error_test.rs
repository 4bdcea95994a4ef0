//! Tests for error types

use prometheus_stream_listener::core::ListenerError;

#[test]
fn test_receive_error_display_includes_endpoint_and_cause() {
    let err = ListenerError::Receive {
        endpoint: "orders_1".into(),
        source: anyhow::anyhow!("connection reset").context("poll failed"),
    };
    let text = err.to_string();
    assert!(text.contains("[orders_1]"));
    assert!(text.contains("poll failed"));
    assert!(text.contains("connection reset"));
}

#[test]
fn test_commit_error_carries_record_count() {
    let err = ListenerError::Commit {
        endpoint: "orders_1".into(),
        records: 12,
        source: anyhow::anyhow!("offset rejected"),
    };
    assert!(err.to_string().contains("(12)"));
    assert!(std::error::Error::source(&err).is_some());
}

#[test]
fn test_registration_error_classification() {
    assert!(ListenerError::DuplicateEndpoint("e1".into()).is_registration_error());
    assert!(ListenerError::RegistrationClosed.is_registration_error());
    assert!(ListenerError::misconfigured("no topic").is_registration_error());
    assert!(!ListenerError::UnknownEndpoint("e1".into()).is_registration_error());
    assert!(!ListenerError::Panicked {
        endpoint: "e1".into(),
        message: "boom".into(),
    }
    .is_registration_error());
}

#[test]
fn test_misconfiguration_display() {
    let err = ListenerError::misconfigured("topic is required");
    assert_eq!(err.to_string(), "misconfiguration: topic is required");
}
