//! Decoding untyped documents into typed records.
//!
//! Decoding never fails: a missing or mistyped field takes the record's
//! default. Feeds rely on this to always hand callers a complete value.

use chrono::{DateTime, TimeZone, Utc};
use serde_json::Value;

use crate::document::{Document, Fields};

/// A record that can be built from raw document fields.
pub trait Decode: Sized {
    fn decode(id: &str, fields: &Fields) -> Self;
}

pub fn decode_document<T: Decode>(doc: &Document) -> T {
    T::decode(doc.id(), &doc.fields)
}

/// String field; numbers and booleans are stringified, anything else is empty.
pub fn string(fields: &Fields, key: &str) -> String {
    match fields.get(key) {
        Some(Value::String(s)) => s.clone(),
        Some(Value::Number(n)) => n.to_string(),
        Some(Value::Bool(b)) => b.to_string(),
        _ => String::new(),
    }
}

/// String field, or `default` when missing or blank.
pub fn string_or(fields: &Fields, key: &str, default: &str) -> String {
    let value = string(fields, key);
    if value.trim().is_empty() {
        default.to_string()
    } else {
        value
    }
}

/// Optional string; blank counts as absent.
pub fn opt_string(fields: &Fields, key: &str) -> Option<String> {
    let value = string(fields, key);
    if value.trim().is_empty() {
        None
    } else {
        Some(value)
    }
}

/// List of strings. A bare string becomes a one-element list.
pub fn string_list(fields: &Fields, key: &str) -> Vec<String> {
    match fields.get(key) {
        Some(Value::Array(items)) => items
            .iter()
            .filter_map(|item| match item {
                Value::String(s) => Some(s.clone()),
                Value::Number(n) => Some(n.to_string()),
                _ => None,
            })
            .collect(),
        Some(Value::String(s)) if !s.trim().is_empty() => vec![s.clone()],
        _ => Vec::new(),
    }
}

pub fn boolean(fields: &Fields, key: &str) -> bool {
    match fields.get(key) {
        Some(Value::Bool(b)) => *b,
        Some(Value::String(s)) => s.eq_ignore_ascii_case("true"),
        _ => false,
    }
}

/// Integer field; numeric strings are accepted.
pub fn integer(fields: &Fields, key: &str) -> i64 {
    match fields.get(key) {
        Some(Value::Number(n)) => n
            .as_i64()
            .or_else(|| n.as_f64().map(|f| f as i64))
            .unwrap_or(0),
        Some(Value::String(s)) => s.trim().parse().unwrap_or(0),
        _ => 0,
    }
}

/// Timestamp stored as RFC 3339 text or as epoch milliseconds.
pub fn timestamp(fields: &Fields, key: &str) -> Option<DateTime<Utc>> {
    match fields.get(key) {
        Some(Value::String(s)) => DateTime::parse_from_rfc3339(s)
            .ok()
            .map(|t| t.with_timezone(&Utc)),
        Some(Value::Number(n)) => n
            .as_i64()
            .and_then(|millis| Utc.timestamp_millis_opt(millis).single()),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn fields(value: Value) -> Fields {
        value.as_object().cloned().unwrap()
    }

    #[test]
    fn test_string_defaults() {
        let f = fields(json!({"name": "Warden", "count": 3, "blank": "  "}));
        assert_eq!(string(&f, "name"), "Warden");
        assert_eq!(string(&f, "count"), "3");
        assert_eq!(string(&f, "missing"), "");
        assert_eq!(string_or(&f, "blank", "call"), "call");
        assert_eq!(opt_string(&f, "blank"), None);
    }

    #[test]
    fn test_string_list_accepts_single_string() {
        let f = fields(json!({"times": ["7:30", 8, null], "one": "9:00"}));
        assert_eq!(string_list(&f, "times"), vec!["7:30", "8"]);
        assert_eq!(string_list(&f, "one"), vec!["9:00"]);
        assert!(string_list(&f, "missing").is_empty());
    }

    #[test]
    fn test_integer_and_boolean() {
        let f = fields(json!({"n": 4, "s": " 12 ", "f": 2.9, "b": "TRUE"}));
        assert_eq!(integer(&f, "n"), 4);
        assert_eq!(integer(&f, "s"), 12);
        assert_eq!(integer(&f, "f"), 2);
        assert!(boolean(&f, "b"));
        assert!(!boolean(&f, "missing"));
    }

    #[test]
    fn test_timestamp_formats() {
        let f = fields(json!({
            "text": "2026-10-16T08:30:00Z",
            "millis": 1_760_000_000_000_i64,
            "bad": "yesterday"
        }));
        assert_eq!(
            timestamp(&f, "text").unwrap().to_rfc3339(),
            "2026-10-16T08:30:00+00:00"
        );
        assert!(timestamp(&f, "millis").is_some());
        assert!(timestamp(&f, "bad").is_none());
    }
}
