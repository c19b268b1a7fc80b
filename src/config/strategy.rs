//! Closed strategy sets for function-valued configuration.
//!
//! Everything a caller could previously only express as an opaque callable —
//! value transforms, request splitting, response joining, query building,
//! result post-processing — is a named variant here, so configuration stays
//! introspectable, serializable and testable in isolation.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::path;
use crate::request::Request;

/// Value transform applied by a condition or field mapping rule.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Transform {
    #[default]
    Identity,
    /// Join array elements into one string, e.g. `[1,2,3]` → `"1,2,3"`.
    Join { separator: String },
    /// First element of an array, the value itself otherwise.
    First,
    /// Render the value as a plain string.
    Stringify,
    /// Replace the value with a constant.
    Const { value: Value },
}

impl Transform {
    pub fn apply(&self, value: Value) -> Value {
        match self {
            Transform::Identity => value,
            Transform::Join { separator } => match value {
                Value::Array(items) => {
                    let parts: Vec<String> = items.iter().map(path::stringify).collect();
                    Value::String(parts.join(separator))
                }
                other => other,
            },
            Transform::First => match value {
                Value::Array(items) => items.into_iter().next().unwrap_or(Value::Null),
                other => other,
            },
            Transform::Stringify => Value::String(path::stringify(&value)),
            Transform::Const { value: constant } => constant.clone(),
        }
    }
}

/// Where a condition travels in the request.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Placement {
    Query,
    Body,
    /// Query string for GET/DELETE, body otherwise.
    #[default]
    Any,
}

/// Endpoint-level override of the default placement routing.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum QueryStyle {
    /// Honor each condition's placement hint.
    #[default]
    Placement,
    ForceQuery,
    ForceBody,
}

/// Decompose one logical request into physical requests.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Splitter {
    /// Exactly one physical request.
    #[default]
    Identity,
    /// Carve an array-valued condition into fixed-size chunks, one request
    /// each. For APIs with parameter-count ceilings or batch-id limits.
    ChunkCondition { condition: String, size: usize },
}

impl Splitter {
    pub fn split(&self, request: Request) -> Vec<Request> {
        match self {
            Splitter::Identity => vec![request],
            Splitter::ChunkCondition { condition, size } => {
                let size = (*size).max(1);
                let source = request
                    .uri
                    .query
                    .get(condition)
                    .or_else(|| request.body.get(condition))
                    .cloned();
                let items = match source {
                    Some(Value::Array(items)) if items.len() > size => items,
                    _ => return vec![request],
                };
                let in_query = request.uri.query.contains_key(condition);
                items
                    .chunks(size)
                    .map(|chunk| {
                        let mut part = request.clone();
                        let value = Value::Array(chunk.to_vec());
                        if in_query {
                            part.uri.query.insert(condition.clone(), value);
                        } else {
                            part.body.insert(condition.clone(), value);
                        }
                        part
                    })
                    .collect()
            }
        }
    }
}

/// Recombine decoded physical responses into the logical response.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Joiner {
    /// Concatenate array-typed sub-responses in request order; bare objects
    /// count as single-element lists, scalars are skipped.
    #[default]
    ConcatArrays,
    /// Keep only the first response.
    First,
}

impl Joiner {
    pub fn join(&self, mut responses: Vec<Value>) -> Value {
        if responses.len() == 1 {
            return responses.pop().unwrap();
        }
        match self {
            Joiner::ConcatArrays => {
                let mut rows = Vec::new();
                for response in responses {
                    match response {
                        Value::Array(items) => rows.extend(items),
                        obj @ Value::Object(_) => rows.push(obj),
                        _ => {}
                    }
                }
                Value::Array(rows)
            }
            Joiner::First => responses.into_iter().next().unwrap_or(Value::Null),
        }
    }
}

/// Result post-processor: when configured it fully replaces the default
/// record-list normalization.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ResultRule {
    /// The whole decoded payload becomes a single record.
    WrapList,
    /// Pull the record list from a dotted path inside the payload.
    ExtractAt { path: String },
}

impl ResultRule {
    pub fn apply(&self, response: Value) -> Vec<Value> {
        match self {
            ResultRule::WrapList => vec![response],
            ResultRule::ExtractAt { path: at } => match path::get(&response, at) {
                Some(found) => path::into_rows(found),
                None => vec![],
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_transform_join() {
        let t = Transform::Join {
            separator: ",".to_string(),
        };
        assert_eq!(t.apply(json!([1, 2, 3])), json!("1,2,3"));
        assert_eq!(t.apply(json!("solo")), json!("solo"));
    }

    #[test]
    fn test_transform_first_and_stringify() {
        assert_eq!(Transform::First.apply(json!(["a", "b"])), json!("a"));
        assert_eq!(Transform::First.apply(json!([])), json!(null));
        assert_eq!(Transform::Stringify.apply(json!(42)), json!("42"));
    }

    #[test]
    fn test_transform_const() {
        let t = Transform::Const { value: json!(true) };
        assert_eq!(t.apply(json!("anything")), json!(true));
    }

    #[test]
    fn test_splitter_chunks_long_lists() {
        let mut request = Request::with_path("/batch");
        request.uri.query.insert("id".into(), json!([1, 2, 3, 4, 5]));
        let splitter = Splitter::ChunkCondition {
            condition: "id".to_string(),
            size: 2,
        };
        let parts = splitter.split(request);
        assert_eq!(parts.len(), 3);
        assert_eq!(parts[0].uri.query["id"], json!([1, 2]));
        assert_eq!(parts[2].uri.query["id"], json!([5]));
    }

    #[test]
    fn test_splitter_leaves_short_lists_alone() {
        let mut request = Request::with_path("/batch");
        request.uri.query.insert("id".into(), json!([1, 2]));
        let splitter = Splitter::ChunkCondition {
            condition: "id".to_string(),
            size: 5,
        };
        assert_eq!(splitter.split(request).len(), 1);
    }

    #[test]
    fn test_joiner_concat_skips_scalars() {
        let joined = Joiner::ConcatArrays.join(vec![
            json!([{"id": 1}]),
            json!("skipped"),
            json!([{"id": 2}, {"id": 3}]),
        ]);
        assert_eq!(joined, json!([{"id": 1}, {"id": 2}, {"id": 3}]));
    }

    #[test]
    fn test_joiner_single_response_is_identity() {
        let joined = Joiner::ConcatArrays.join(vec![json!({"id": 1})]);
        assert_eq!(joined, json!({"id": 1}));
    }

    #[test]
    fn test_result_rule_wrap_list() {
        let rows = ResultRule::WrapList.apply(json!({"total": 3}));
        assert_eq!(rows, vec![json!({"total": 3})]);
    }

    #[test]
    fn test_result_rule_extract_at() {
        let rule = ResultRule::ExtractAt {
            path: "response.items".to_string(),
        };
        let rows = rule.apply(json!({"response": {"items": [{"id": 1}]}}));
        assert_eq!(rows, vec![json!({"id": 1})]);
        // the XML single-item quirk: a bare object is one record
        let rows = rule.apply(json!({"response": {"items": {"id": 1}}}));
        assert_eq!(rows.len(), 1);
    }
}
