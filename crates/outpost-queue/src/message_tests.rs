use super::*;
use serde_json::json;

#[test]
fn builder_sets_attributes_and_correlation_id() {
    let msg = Message::new(json!({"hello": "world"}))
        .with_attribute("tenant_id", "tenant-a")
        .with_correlation_id("evt-1");

    assert_eq!(msg.attributes.get("tenant_id"), Some(&"tenant-a".to_string()));
    assert_eq!(msg.correlation_id.as_deref(), Some("evt-1"));
}
