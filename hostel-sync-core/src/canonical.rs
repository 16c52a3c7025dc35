//! Canonical, comparable form of editable records.
//!
//! Editable records split their fields into named groups. Each group has a
//! canonical form: strings trimmed, empty list entries dropped, optional
//! values defaulted. Two records are "the same" for a group when their
//! canonical forms are structurally equal.

use std::collections::BTreeMap;

use serde_json::Value;

use crate::document::Fields;

/// Group name → canonical fields of that group.
pub type CanonicalGroups = BTreeMap<&'static str, Fields>;

/// An editable record whose fields are written per group.
pub trait FieldGroups {
    fn canonical_groups(&self) -> CanonicalGroups;
}

pub fn text(value: &str) -> Value {
    Value::String(value.trim().to_string())
}

/// Trimmed text, or `default` when blank.
pub fn text_or(value: &str, default: &str) -> Value {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        Value::String(default.to_string())
    } else {
        Value::String(trimmed.to_string())
    }
}

/// Trimmed list with blank entries removed.
pub fn text_list(values: &[String]) -> Value {
    Value::Array(
        values
            .iter()
            .map(|v| v.trim())
            .filter(|v| !v.is_empty())
            .map(|v| Value::String(v.to_string()))
            .collect(),
    )
}

/// Builds a single group from field/value pairs.
pub fn group<const N: usize>(entries: [(&str, Value); N]) -> Fields {
    entries
        .into_iter()
        .map(|(key, value)| (key.to_string(), value))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_text_trims() {
        assert_eq!(text("  Monday "), json!("Monday"));
        assert_eq!(text_or("   ", "Available"), json!("Available"));
    }

    #[test]
    fn test_text_list_drops_blank_entries() {
        let values = vec![" 7:30 ".to_string(), "".to_string(), "  ".to_string(), "9:00".to_string()];
        assert_eq!(text_list(&values), json!(["7:30", "9:00"]));
    }

    #[test]
    fn test_group_builds_fields() {
        let g = group([("driverName", text(" Ravi ")), ("driverPhone", text(""))]);
        assert_eq!(g.len(), 2);
        assert_eq!(g["driverName"], json!("Ravi"));
    }
}
