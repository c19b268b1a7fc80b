//! Dotted-path access into JSON values.
//!
//! Condition mapping, field mapping, read-parameter aliasing and result
//! extraction all address nested structures with dotted paths like
//! `"user.address.city"`. The helpers here implement that addressing once
//! over `serde_json::Value`.

use serde_json::{Map, Value};

/// Look up a value at a dotted path. Empty path returns the root.
///
/// When a path segment lands on an array, the segment is resolved against
/// every element and the hits are collected, so `"items.name"` over a list
/// of objects yields the list of names.
pub fn get<'a>(root: &'a Value, path: &str) -> Option<Value> {
    if path.is_empty() {
        return Some(root.clone());
    }
    let segments: Vec<&str> = path.split('.').filter(|s| !s.is_empty()).collect();
    let found = get_segments(root, &segments);
    if found.is_null() {
        None
    } else {
        Some(found)
    }
}

fn get_segments(value: &Value, segments: &[&str]) -> Value {
    if segments.is_empty() {
        return value.clone();
    }
    match value {
        Value::Object(map) => match map.get(segments[0]) {
            Some(inner) => get_segments(inner, &segments[1..]),
            None => Value::Null,
        },
        Value::Array(items) => {
            let hits: Vec<Value> = items
                .iter()
                .map(|item| get_segments(item, segments))
                .filter(|v| !v.is_null())
                .collect();
            match hits.len() {
                0 => Value::Null,
                1 => hits.into_iter().next().unwrap(),
                _ => Value::Array(hits),
            }
        }
        _ => Value::Null,
    }
}

/// Insert `value` at a dotted path, creating intermediate objects as needed.
/// Non-object intermediates are replaced. The root must be an object.
pub fn insert(root: &mut Value, path: &str, value: Value) {
    let segments: Vec<&str> = path.split('.').filter(|s| !s.is_empty()).collect();
    if segments.is_empty() {
        return;
    }
    let mut current = root;
    for segment in &segments[..segments.len() - 1] {
        if !current.is_object() {
            *current = Value::Object(Map::new());
        }
        let map = current.as_object_mut().unwrap();
        current = map
            .entry(segment.to_string())
            .or_insert_with(|| Value::Object(Map::new()));
    }
    if !current.is_object() {
        *current = Value::Object(Map::new());
    }
    current
        .as_object_mut()
        .unwrap()
        .insert(segments[segments.len() - 1].to_string(), value);
}

/// Remove and return the value at a dotted path, preserving the order of the
/// remaining keys.
pub fn remove(root: &mut Value, path: &str) -> Option<Value> {
    let segments: Vec<&str> = path.split('.').filter(|s| !s.is_empty()).collect();
    if segments.is_empty() {
        return None;
    }
    let mut current = root;
    for segment in &segments[..segments.len() - 1] {
        current = current.as_object_mut()?.get_mut(*segment)?;
    }
    current
        .as_object_mut()?
        .shift_remove(segments[segments.len() - 1])
}

/// Normalize a decoded value into a list of records.
///
/// XML decoding produces a bare object where a single-element list is meant,
/// so objects become one-element lists rather than being dropped.
pub fn into_rows(value: Value) -> Vec<Value> {
    match value {
        Value::Array(items) => items,
        obj @ Value::Object(_) => vec![obj],
        _ => vec![],
    }
}

/// Render a scalar value as a plain string. Arrays and objects fall back to
/// compact JSON.
pub fn stringify(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_get_simple_and_nested() {
        let value = json!({"name": "test", "state": {"code": "on"}});
        assert_eq!(get(&value, "name"), Some(json!("test")));
        assert_eq!(get(&value, "state.code"), Some(json!("on")));
        assert_eq!(get(&value, "missing"), None);
    }

    #[test]
    fn test_get_through_array() {
        let value = json!({"items": [{"id": 1}, {"id": 2}]});
        assert_eq!(get(&value, "items.id"), Some(json!([1, 2])));
    }

    #[test]
    fn test_insert_creates_intermediates() {
        let mut value = json!({});
        insert(&mut value, "user.address.city", json!("Kyiv"));
        assert_eq!(value, json!({"user": {"address": {"city": "Kyiv"}}}));
    }

    #[test]
    fn test_insert_top_level_keeps_order() {
        let mut value = json!({"a": 1});
        insert(&mut value, "b", json!(2));
        let keys: Vec<&String> = value.as_object().unwrap().keys().collect();
        assert_eq!(keys, vec!["a", "b"]);
    }

    #[test]
    fn test_remove_nested() {
        let mut value = json!({"a": {"b": 1, "c": 2}});
        assert_eq!(remove(&mut value, "a.b"), Some(json!(1)));
        assert_eq!(value, json!({"a": {"c": 2}}));
        assert_eq!(remove(&mut value, "a.b"), None);
    }

    #[test]
    fn test_into_rows_object_becomes_single_row() {
        assert_eq!(into_rows(json!({"id": 1})).len(), 1);
        assert_eq!(into_rows(json!([1, 2, 3])).len(), 3);
        assert!(into_rows(json!("scalar")).is_empty());
    }

    #[test]
    fn test_stringify() {
        assert_eq!(stringify(&json!("x")), "x");
        assert_eq!(stringify(&json!(42)), "42");
        assert_eq!(stringify(&json!(true)), "true");
        assert_eq!(stringify(&json!(null)), "");
    }
}
