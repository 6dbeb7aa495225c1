use super::*;
use serde_json::json;

#[test]
fn empty_filter_matches_everything() {
    assert!(matches(&json!({}), &json!({"amount": 5})).unwrap());
}

#[test]
fn equality_on_nested_path() {
    let filter = json!({"order.status": "paid"});
    assert!(matches(&filter, &json!({"order": {"status": "paid"}})).unwrap());
    assert!(!matches(&filter, &json!({"order": {"status": "pending"}})).unwrap());
}

#[test]
fn gte_and_lte_bound_a_range() {
    let filter = json!({"amount": {"$gte": 10, "$lte": 100}});
    assert!(matches(&filter, &json!({"amount": 50})).unwrap());
    assert!(!matches(&filter, &json!({"amount": 5})).unwrap());
    assert!(!matches(&filter, &json!({"amount": 500})).unwrap());
}

#[test]
fn missing_path_does_not_match_a_literal() {
    let filter = json!({"order.status": "paid"});
    assert!(!matches(&filter, &json!({"order": {}})).unwrap());
}

#[test]
fn unsupported_operator_is_an_error_not_a_silent_false() {
    let filter = json!({"amount": {"$regex": "x"}});
    let err = matches(&filter, &json!({"amount": 5})).unwrap_err();
    assert!(matches!(err, FilterError::UnsupportedOperator { .. }));
}

#[test]
fn non_numeric_comparison_is_incomparable_error() {
    let filter = json!({"amount": {"$gte": 10}});
    let err = matches(&filter, &json!({"amount": "not-a-number"})).unwrap_err();
    assert!(matches!(err, FilterError::Incomparable { .. }));
}
