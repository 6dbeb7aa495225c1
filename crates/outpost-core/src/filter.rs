//! The destination filter language (spec.md §4.1 step 3).
//!
//! A small document-predicate sub-language evaluated against
//! `event.data`. A filter is a JSON object of object-paths ("." separated)
//! to either a literal (equality) or an operator object (`{"$gte": ...}`,
//! `{"$lte": ...}`). A mismatched filter excludes the destination
//! silently; it is never an error surfaced to the client.

use serde_json::Value;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum FilterError {
    #[error("filter path '{path}' is not an object")]
    NotAnObject { path: String },

    #[error("unsupported filter operator '{operator}' at path '{path}'")]
    UnsupportedOperator { path: String, operator: String },

    #[error("operands at path '{path}' are not comparable")]
    Incomparable { path: String },
}

/// Evaluate `filter` against `data`. Per spec.md §4.1, evaluation errors
/// are treated by the caller as a filter miss (logged, not surfaced), so
/// this returns `Result` purely so the publish handler can tell "matched",
/// "did not match", and "could not evaluate" apart for logging.
pub fn matches(filter: &Value, data: &Value) -> Result<bool, FilterError> {
    let Value::Object(fields) = filter else {
        return Err(FilterError::NotAnObject {
            path: "$".to_string(),
        });
    };

    for (path, predicate) in fields {
        let actual = resolve_path(data, path);
        if !evaluate_predicate(path, predicate, actual.as_ref())? {
            return Ok(false);
        }
    }
    Ok(true)
}

fn resolve_path<'a>(data: &'a Value, path: &str) -> Option<&'a Value> {
    let mut current = data;
    for segment in path.split('.') {
        current = current.as_object()?.get(segment)?;
    }
    Some(current)
}

fn evaluate_predicate(
    path: &str,
    predicate: &Value,
    actual: Option<&Value>,
) -> Result<bool, FilterError> {
    match predicate {
        Value::Object(ops) if ops.keys().any(|k| k.starts_with('$')) => {
            for (op, operand) in ops {
                let ok: bool = match op.as_str() {
                    "$gte" => compare(path, actual, operand, |o| o.is_ge())?,
                    "$lte" => compare(path, actual, operand, |o| o.is_le())?,
                    "$gt" => compare(path, actual, operand, |o| o.is_gt())?,
                    "$lt" => compare(path, actual, operand, |o| o.is_lt())?,
                    "$eq" => actual == Some(operand),
                    other => {
                        return Err(FilterError::UnsupportedOperator {
                            path: path.to_string(),
                            operator: other.to_string(),
                        })
                    }
                };
                if !ok {
                    return Ok(false);
                }
            }
            Ok(true)
        }
        literal => Ok(actual == Some(literal)),
    }
}

fn compare(
    path: &str,
    actual: Option<&Value>,
    operand: &Value,
    accept: impl Fn(std::cmp::Ordering) -> bool,
) -> Result<bool, FilterError> {
    let (a, b) = match (actual.and_then(Value::as_f64), operand.as_f64()) {
        (Some(a), Some(b)) => (a, b),
        _ => {
            return Err(FilterError::Incomparable {
                path: path.to_string(),
            })
        }
    };
    Ok(accept(a.partial_cmp(&b).ok_or(FilterError::Incomparable {
        path: path.to_string(),
    })?))
}

#[cfg(test)]
#[path = "filter_tests.rs"]
mod tests;
