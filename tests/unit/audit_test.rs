//! Tests for audit sink

use prometheus_stream_listener::core::{
    build_cycle_event, AuditSink, CycleAction, InMemoryAuditSink,
};

#[test]
fn test_in_memory_audit_sink() {
    let mut sink = InMemoryAuditSink::new(10);

    sink.record(build_cycle_event("orders_1a2b3c4", "billing", CycleAction::Committed, 5));
    assert_eq!(sink.events().len(), 1);

    let events = sink.events();
    assert_eq!(events[0].endpoint_id, "orders_1a2b3c4");
    assert_eq!(events[0].group_id, "billing");
    assert_eq!(events[0].action, CycleAction::Committed);
    assert_eq!(events[0].records, 5);
}

#[test]
fn test_audit_sink_overflow() {
    let mut sink = InMemoryAuditSink::new(2);

    sink.record(build_cycle_event("e1", "g", CycleAction::Idle, 0));
    sink.record(build_cycle_event("e2", "g", CycleAction::Contended, 0));
    sink.record(build_cycle_event("e3", "g", CycleAction::Failed("boom".into()), 0));

    let events = sink.events();
    assert_eq!(events.len(), 2);
    assert_eq!(events[0].endpoint_id, "e2"); // First one popped
    assert_eq!(events[1].action, CycleAction::Failed("boom".into()));
}

#[test]
fn test_zero_capacity_sink_drops_everything() {
    let mut sink = InMemoryAuditSink::new(0);
    sink.record(build_cycle_event("e1", "g", CycleAction::Idle, 0));
    assert!(sink.events().is_empty());
}

#[test]
fn test_cycle_event_serializes_action() {
    let event = build_cycle_event("e1", "g", CycleAction::Failed("source down".into()), 3);
    assert!(event.at_ms > 0);

    let json = serde_json::to_value(&event).unwrap();
    assert_eq!(json["action"]["failed"], "source down");
    assert_eq!(json["records"], 3);
}
