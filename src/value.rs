//! JSON value checks shared by model validation, payload validation and the in-memory store.

use crate::model::FieldType;
use serde_json::Value;

/// True when `v` is an acceptable JSON value for `t`.
pub(crate) fn matches_type(v: &Value, t: FieldType) -> bool {
    match t {
        FieldType::Int => v.as_i64().is_some(),
        FieldType::Float => v.is_number(),
        FieldType::String => v.is_string(),
        FieldType::Bool => v.is_boolean(),
        FieldType::DateTime => v.as_str().map(is_datetime).unwrap_or(false),
        FieldType::Uuid => v.as_str().map(|s| uuid::Uuid::parse_str(s).is_ok()).unwrap_or(false),
        FieldType::List => v.is_array(),
        FieldType::Object => v.is_object(),
        FieldType::Any => true,
    }
}

fn is_datetime(s: &str) -> bool {
    chrono::DateTime::parse_from_rfc3339(s).is_ok()
        || chrono::NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S%.f").is_ok()
        || chrono::NaiveDate::parse_from_str(s, "%Y-%m-%d").is_ok()
}

/// Structural equality with numbers compared by value, so 1 and 1.0 match.
/// Integers are compared exactly.
pub(crate) fn value_eq(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::Number(n), Value::Number(m)) => {
            if let (Some(x), Some(y)) = (n.as_i64(), m.as_i64()) {
                x == y
            } else if let (Some(x), Some(y)) = (n.as_u64(), m.as_u64()) {
                x == y
            } else {
                n.as_f64() == m.as_f64()
            }
        }
        (Value::Array(xs), Value::Array(ys)) => xs.len() == ys.len() && xs.iter().zip(ys).all(|(x, y)| value_eq(x, y)),
        (Value::Object(xs), Value::Object(ys)) => {
            xs.len() == ys.len() && xs.iter().all(|(k, x)| ys.get(k).map(|y| value_eq(x, y)).unwrap_or(false))
        }
        _ => a == b,
    }
}
