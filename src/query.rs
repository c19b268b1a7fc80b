//! Caller-facing query types.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::path;

/// Reserved aggregate sentinel for count queries.
pub const FUNCTION_COUNT: &str = "COUNT()";

/// CRUD operation kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum OperationKind {
    Read,
    Create,
    Update,
    Delete,
}

impl OperationKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            OperationKind::Read => "read",
            OperationKind::Create => "create",
            OperationKind::Update => "update",
            OperationKind::Delete => "delete",
        }
    }
}

impl std::fmt::Display for OperationKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Requested result attributes.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Fields {
    /// Everything the remote returns.
    #[default]
    All,
    /// Only the named attributes; `Table.` prefixes are stripped on match.
    List(Vec<String>),
    /// The `COUNT()` aggregate: one synthetic `{count: N}` record.
    Count,
}

impl Fields {
    /// Interpret a caller-supplied field list, recognizing the reserved
    /// [`FUNCTION_COUNT`] sentinel.
    pub fn from_list(names: Vec<String>) -> Self {
        match names.as_slice() {
            [] => Fields::All,
            [single] if single == FUNCTION_COUNT => Fields::Count,
            _ => Fields::List(names),
        }
    }
}

/// Sort direction for order emulation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SortDirection {
    #[default]
    Asc,
    Desc,
}

/// One invocation's worth of query data.
///
/// Conditions keep insertion order; the rest mirrors the generic record
/// contract: field selection, pagination, ordering, an optional explicit
/// path that bypasses endpoint resolution, and the cache opt-in.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct QueryData {
    #[serde(default)]
    pub conditions: IndexMap<String, Value>,
    #[serde(default)]
    pub fields: Fields,
    #[serde(default)]
    pub limit: Option<usize>,
    #[serde(default)]
    pub offset: Option<usize>,
    #[serde(default)]
    pub order: Vec<(String, SortDirection)>,
    #[serde(default)]
    pub path: Option<String>,
    #[serde(default)]
    pub cache: bool,
}

impl QueryData {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add one condition.
    pub fn condition(mut self, name: &str, value: Value) -> Self {
        self.conditions.insert(name.to_string(), value);
        self
    }

    /// Resolve a read-parameter source spec: `limit`, `offset` or a dotted
    /// path into the conditions (`conditions.user.id`; a bare name falls
    /// back to a top-level condition).
    pub fn lookup_param(&self, spec: &str) -> Option<Value> {
        match spec {
            "limit" => self.limit.map(Value::from),
            "offset" => self.offset.map(Value::from),
            _ => {
                let rest = spec.strip_prefix("conditions.").unwrap_or(spec);
                let root = Value::Object(self.conditions.clone().into_iter().collect());
                path::get(&root, rest)
            }
        }
    }

    /// Resolve a source spec and consume it, so a parameter already mapped
    /// into a condition is not applied twice.
    pub fn take_param(&mut self, spec: &str) -> Option<Value> {
        let value = self.lookup_param(spec)?;
        match spec {
            "limit" => self.limit = None,
            "offset" => self.offset = None,
            _ => {
                let rest = spec.strip_prefix("conditions.").unwrap_or(spec);
                let top = rest.split('.').next().unwrap_or(rest);
                if rest.contains('.') {
                    if let Some(entry) = self.conditions.get_mut(top) {
                        let tail = &rest[top.len() + 1..];
                        path::remove(entry, tail);
                    }
                } else {
                    self.conditions.shift_remove(top);
                }
            }
        }
        Some(value)
    }
}

/// Coerce a value to an integer the way alias summation expects: numbers
/// truncate, numeric strings parse, everything else counts as zero.
pub fn coerce_int(value: &Value) -> i64 {
    match value {
        Value::Number(n) => n.as_i64().unwrap_or_else(|| n.as_f64().unwrap_or(0.0) as i64),
        Value::String(s) => s.trim().parse().unwrap_or(0),
        Value::Bool(b) => *b as i64,
        _ => 0,
    }
}
