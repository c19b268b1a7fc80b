//! Post-fetch emulation of capabilities the remote API lacks natively:
//! pagination, the count aggregate, field projection and ordering.

use std::cmp::Ordering;

use serde_json::{json, Value};

use crate::path;
use crate::query::{Fields, QueryData, SortDirection};

/// Apply the emulation layer to a fetched result, then nest every surviving
/// record under its owning table name, matching the generic record contract.
pub fn apply(table: &str, query: &QueryData, mut rows: Vec<Value>) -> Vec<Value> {
    if let Some(limit) = query.limit {
        let offset = query.offset.unwrap_or(0);
        rows = rows.into_iter().skip(offset).take(limit).collect();
    }

    match &query.fields {
        Fields::Count => {
            return vec![json!({ table: { "count": rows.len() } })];
        }
        Fields::List(names) if !names.is_empty() => {
            let prefix = format!("{table}.");
            let wanted: Vec<&str> = names
                .iter()
                .map(|name| name.strip_prefix(&prefix).unwrap_or(name))
                .collect();
            for row in rows.iter_mut() {
                if let Some(map) = row.as_object_mut() {
                    map.retain(|key, _| wanted.contains(&key.as_str()));
                }
            }
        }
        _ => {}
    }

    if !query.order.is_empty() {
        sort_rows(&mut rows, &query.order);
    }

    rows.into_iter().map(|row| json!({ table: row })).collect()
}

/// Stable multi-key sort over the result sequence.
fn sort_rows(rows: &mut [Value], order: &[(String, SortDirection)]) {
    rows.sort_by(|a, b| {
        for (key, direction) in order {
            let left = path::get(a, key).unwrap_or(Value::Null);
            let right = path::get(b, key).unwrap_or(Value::Null);
            let ordering = compare_values(&left, &right);
            let ordering = match direction {
                SortDirection::Asc => ordering,
                SortDirection::Desc => ordering.reverse(),
            };
            if ordering != Ordering::Equal {
                return ordering;
            }
        }
        Ordering::Equal
    });
}

/// Total order over JSON values: null < bool < number < string; containers
/// compare equal among themselves.
fn compare_values(a: &Value, b: &Value) -> Ordering {
    fn rank(value: &Value) -> u8 {
        match value {
            Value::Null => 0,
            Value::Bool(_) => 1,
            Value::Number(_) => 2,
            Value::String(_) => 3,
            Value::Array(_) => 4,
            Value::Object(_) => 5,
        }
    }
    match (a, b) {
        (Value::Bool(x), Value::Bool(y)) => x.cmp(y),
        (Value::Number(x), Value::Number(y)) => x
            .as_f64()
            .unwrap_or(0.0)
            .partial_cmp(&y.as_f64().unwrap_or(0.0))
            .unwrap_or(Ordering::Equal),
        (Value::String(x), Value::String(y)) => x.cmp(y),
        _ => rank(a).cmp(&rank(b)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn numbered_rows(n: usize) -> Vec<Value> {
        (0..n).map(|i| json!({"n": i})).collect()
    }

    #[test]
    fn test_limit_offset_slice() {
        let query = QueryData {
            limit: Some(3),
            offset: Some(2),
            ..Default::default()
        };
        let result = apply("item", &query, numbered_rows(10));
        assert_eq!(result.len(), 3);
        assert_eq!(result[0], json!({"item": {"n": 2}}));
        assert_eq!(result[1], json!({"item": {"n": 3}}));
        assert_eq!(result[2], json!({"item": {"n": 4}}));
    }

    #[test]
    fn test_offset_without_limit_is_ignored() {
        let query = QueryData {
            offset: Some(5),
            ..Default::default()
        };
        let result = apply("item", &query, numbered_rows(10));
        assert_eq!(result.len(), 10);
    }

    #[test]
    fn test_count_synthesizes_single_record() {
        let query = QueryData {
            fields: Fields::Count,
            ..Default::default()
        };
        let result = apply("item", &query, numbered_rows(7));
        assert_eq!(result, vec![json!({"item": {"count": 7}})]);
    }

    #[test]
    fn test_projection_strips_table_prefix() {
        let query = QueryData {
            fields: Fields::List(vec!["item.n".to_string()]),
            ..Default::default()
        };
        let rows = vec![json!({"n": 1, "extra": "x"})];
        let result = apply("item", &query, rows);
        assert_eq!(result, vec![json!({"item": {"n": 1}})]);
    }

    #[test]
    fn test_order_emulation_multi_key() {
        let query = QueryData {
            order: vec![
                ("group".to_string(), SortDirection::Asc),
                ("n".to_string(), SortDirection::Desc),
            ],
            ..Default::default()
        };
        let rows = vec![
            json!({"group": "b", "n": 1}),
            json!({"group": "a", "n": 1}),
            json!({"group": "a", "n": 2}),
        ];
        let result = apply("item", &query, rows);
        assert_eq!(result[0], json!({"item": {"group": "a", "n": 2}}));
        assert_eq!(result[1], json!({"item": {"group": "a", "n": 1}}));
        assert_eq!(result[2], json!({"item": {"group": "b", "n": 1}}));
    }

    #[test]
    fn test_order_is_stable() {
        let query = QueryData {
            order: vec![("group".to_string(), SortDirection::Asc)],
            ..Default::default()
        };
        let rows = vec![
            json!({"group": "a", "tag": "first"}),
            json!({"group": "a", "tag": "second"}),
        ];
        let result = apply("item", &query, rows);
        assert_eq!(result[0]["item"]["tag"], "first");
        assert_eq!(result[1]["item"]["tag"], "second");
    }

    #[test]
    fn test_rows_wrap_under_table_name() {
        let result = apply("user", &QueryData::default(), vec![json!({"id": 1})]);
        assert_eq!(result, vec![json!({"user": {"id": 1}})]);
    }
}
