use super::*;

#[test]
fn display_round_trips_through_as_str() {
    let id = TenantId::new("tenant-a");
    assert_eq!(id.as_str(), "tenant-a");
    assert_eq!(id.to_string(), "tenant-a");
}

#[test]
fn distinct_id_types_do_not_compare_equal_by_value_alone() {
    let event_id = EventId::new("x");
    let destination_id = DestinationId::new("x");
    // Different types entirely; this just documents that the macro
    // produces independent types rather than a shared alias.
    assert_eq!(event_id.as_str(), destination_id.as_str());
}
