//! Tests for configuration parsing and endpoint resolution

use std::time::Duration;

use prometheus_stream_listener::config::{
    resolve_settings, EndpointOptions, StreamListenerConfig, DEFAULT_DELAY,
};
use prometheus_stream_listener::core::IdlePolicy;

#[test]
fn test_from_json_str_applies_defaults_for_missing_fields() {
    let cfg = StreamListenerConfig::from_json_str(
        r#"{
            "topics": "orders",
            "delay_ms": 1000,
            "idle_policy": "poll",
            "properties": ["max.poll.records=100"]
        }"#,
    )
    .unwrap();

    assert!(cfg.enabled);
    assert_eq!(cfg.topics.as_deref(), Some("orders"));
    assert_eq!(cfg.delay_ms, Some(1000));
    assert_eq!(cfg.idle_policy, Some(IdlePolicy::Poll));
    assert_eq!(cfg.worker_threads, 10);
}

#[test]
fn test_from_json_str_rejects_invalid_values() {
    let err = StreamListenerConfig::from_json_str(r#"{"worker_threads": 0}"#).unwrap_err();
    assert!(err.contains("worker_threads"));

    let err = StreamListenerConfig::from_json_str(r#"{"cron": "0 0 25 * * *"}"#).unwrap_err();
    assert!(err.contains("invalid cron"));

    let err = StreamListenerConfig::from_json_str("{not json").unwrap_err();
    assert!(err.starts_with("parse error"));
}

#[test]
fn test_from_json_str_rejects_ambiguous_properties() {
    let err = StreamListenerConfig::from_json_str(r#"{"properties": [": orphan"]}"#).unwrap_err();
    assert!(err.contains("ambiguous"));
}

#[test]
fn test_resolution_uses_process_defaults() {
    let defaults = StreamListenerConfig::from_json_str(
        r#"{
            "id": "billing",
            "group_id": "billing-group",
            "topics": "invoices",
            "delay_ms": 40,
            "auto_startup": true,
            "concurrency": true,
            "idle_policy": "poll"
        }"#,
    )
    .unwrap();

    let settings =
        resolve_settings("invoiceListener", &EndpointOptions::default(), &defaults).unwrap();
    assert!(settings.id.starts_with("billing_"));
    assert_eq!(settings.group_id, "billing-group");
    assert_eq!(settings.topic, "invoices");
    assert_eq!(settings.delay, Duration::from_millis(40));
    assert!(settings.auto_startup);
    assert!(settings.concurrency);
    assert_eq!(settings.idle_policy, IdlePolicy::Poll);
}

#[test]
fn test_endpoint_options_from_json() {
    let options: EndpointOptions = serde_json::from_str(
        r#"{"id": "e1", "topics": "orders", "cron": "-", "batch": true}"#,
    )
    .unwrap();
    let settings = resolve_settings("ignored", &options, &StreamListenerConfig::default()).unwrap();

    assert_eq!(settings.id, "e1");
    assert_eq!(settings.delay, DEFAULT_DELAY);
    assert!(settings.cron.is_none());
}
