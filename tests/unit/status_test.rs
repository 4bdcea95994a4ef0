//! Tests for response statuses and their conversion

use prometheus_stream_listener::core::{
    EventIdAware, ResponseState, ResponseStatus, ResponseStatusConverter,
};

#[derive(Debug, Clone)]
struct Order {
    id: i64,
    reference: String,
}

impl EventIdAware for Order {
    fn event_id(&self) -> &str {
        &self.reference
    }

    fn id(&self) -> i64 {
        self.id
    }
}

fn orders(ids: &[i64]) -> Vec<Order> {
    ids.iter()
        .map(|id| Order {
            id: *id,
            reference: format!("ord-{id}"),
        })
        .collect()
}

#[test]
fn test_status_wire_format() {
    let json = serde_json::to_value(ResponseStatus::error(7, "bad payload")).unwrap();
    assert_eq!(json["id"], 7);
    assert_eq!(json["success"], false);
    assert_eq!(json["state"], "ERROR");
    assert_eq!(json["errorMessage"], "bad payload");

    let skipped: ResponseStatus =
        serde_json::from_str(r#"{"id":3,"success":false,"state":"SKIPPED","errorMessage":""}"#)
            .unwrap();
    assert_eq!(skipped, ResponseStatus::skipped(3));
}

#[test]
fn test_converter_preserves_order() {
    let converter = ResponseStatusConverter;
    let statuses = converter.convert_list(&orders(&[5, 1, 3]));
    let ids: Vec<i64> = statuses.iter().map(|s| s.id).collect();
    assert_eq!(ids, vec![5, 1, 3]);
    assert!(statuses.iter().all(|s| s.success && s.state == ResponseState::Ok));
}

#[test]
fn test_converter_error_list_shares_message() {
    let converter = ResponseStatusConverter;
    let statuses = converter.convert_list_with_error(&orders(&[1, 2]), "downstream timeout");
    assert_eq!(statuses.len(), 2);
    for status in &statuses {
        assert!(status.is_error());
        assert!(!status.success);
        assert_eq!(status.error_message, "downstream timeout");
    }
}

#[test]
fn test_error_status_never_has_empty_message() {
    let converter = ResponseStatusConverter;
    let status = converter.convert_with_error(&orders(&[1])[0], "");
    assert!(!status.error_message.is_empty());
}
