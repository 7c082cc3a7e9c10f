//! Tests for utility functions

use std::time::Duration;

use sleeping_ta::util::{duration_to_ms, ClientId, DurationRange};

#[test]
fn test_client_id_display_and_json() {
    let id = ClientId::from(42);
    assert_eq!(id.to_string(), "42");
    assert_eq!(id.get(), 42);
    assert_eq!(serde_json::to_string(&id).unwrap(), "42");
}

#[test]
fn test_range_json_shape() {
    let range: DurationRange = serde_json::from_str(r#"{"min_ms":10,"max_ms":20}"#).unwrap();
    assert_eq!(range.min(), Duration::from_millis(10));
    assert_eq!(range.max(), Duration::from_millis(20));
}

#[test]
fn test_duration_to_ms_saturates() {
    assert_eq!(duration_to_ms(Duration::from_millis(1500)), 1500);
    assert_eq!(duration_to_ms(Duration::MAX), u64::MAX);
}
