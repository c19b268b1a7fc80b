//! Endpoint: the declarative description of one physical API operation and
//! the request-building logic that uses it.

use indexmap::IndexMap;
use serde_json::{json, Value};

use crate::config::condition::{Condition, ConditionBuilder};
use crate::config::field::{Field, FieldBuilder};
use crate::config::strategy::{Joiner, Placement, QueryStyle, ResultRule, Splitter};
use crate::path;
use crate::query::{coerce_int, OperationKind, QueryData};
use crate::request::{Method, Request};

/// A finalized endpoint. Built once during configuration load, immutable
/// during request execution.
#[derive(Debug, Clone, PartialEq)]
pub struct Endpoint {
    kind: OperationKind,
    table: String,
    path: Option<String>,
    conditions: IndexMap<String, Condition>,
    fields: IndexMap<String, Field>,
    result: Option<ResultRule>,
    read_aliases: IndexMap<String, String>,
    query_style: QueryStyle,
    splitter: Splitter,
    joiner: Joiner,
    cache_name: Option<String>,
}

impl Endpoint {
    pub fn kind(&self) -> OperationKind {
        self.kind
    }

    pub fn table(&self) -> &str {
        &self.table
    }

    /// Endpoint path; defaults to the table name when unset.
    pub fn path(&self) -> &str {
        self.path.as_deref().unwrap_or(&self.table)
    }

    pub fn cache_name(&self) -> Option<&str> {
        self.cache_name.as_deref()
    }

    pub fn condition(&self, name: &str) -> Option<&Condition> {
        self.conditions.get(name)
    }

    pub fn field(&self, name: &str) -> Option<&Field> {
        self.fields.get(name)
    }

    pub fn splitter(&self) -> &Splitter {
        &self.splitter
    }

    pub fn joiner(&self) -> &Joiner {
        &self.joiner
    }

    pub fn result(&self) -> Option<&ResultRule> {
        self.result.as_ref()
    }

    /// Source names of all non-nullable conditions, in declaration order.
    pub fn required_conditions(&self) -> Vec<String> {
        self.conditions
            .values()
            .filter(|c| !c.is_nullable())
            .map(|c| c.name().to_string())
            .collect()
    }

    /// Mapped destination names of all nullable conditions, in declaration
    /// order. The source-vs-destination asymmetry with
    /// [`required_conditions`](Self::required_conditions) is deliberate and
    /// load-bearing for callers.
    pub fn optional_conditions(&self) -> Vec<String> {
        self.conditions
            .values()
            .filter(|c| c.is_nullable())
            .map(|c| c.map_to().to_string())
            .collect()
    }

    /// Name → default value for every condition carrying a default.
    pub fn conditions_defaults(&self) -> IndexMap<String, Value> {
        self.conditions
            .values()
            .filter_map(|c| {
                c.default_value()
                    .map(|v| (c.name().to_string(), v.clone()))
            })
            .collect()
    }

    /// Describe the endpoint's condition contract as a schema object.
    pub fn schema(&self) -> Value {
        let mut schema = serde_json::Map::new();
        for condition in self.conditions.values() {
            let mut col = serde_json::Map::new();
            col.insert("type".to_string(), json!(condition.kind().as_str()));
            col.insert("null".to_string(), json!(condition.is_nullable()));
            if let Some(length) = condition.length() {
                col.insert("length".to_string(), json!(length));
            }
            if condition.key().is_some() {
                col.insert("key".to_string(), json!("primary"));
            }
            col.insert(
                "default".to_string(),
                condition.default_value().cloned().unwrap_or(Value::Null),
            );
            schema.insert(condition.name().to_string(), Value::Object(col));
        }
        Value::Object(schema)
    }

    /// Build the request for one invocation.
    ///
    /// Read operations get read-parameter aliasing first; then supplied
    /// conditions are merged with the configured defaults (supplied wins),
    /// every condition runs through its mapping rule, and the used ones are
    /// routed into the query string or body per placement.
    pub fn build_request(&self, method: Method, query: &mut QueryData) -> Request {
        if self.kind == OperationKind::Read {
            self.apply_read_aliases(query);
        }

        let supplied = self.map_conditions(query.conditions.clone());
        let defaults = self.map_conditions(self.conditions_defaults());

        let required = self.required_conditions();
        let optional = self.optional_conditions();
        let mut used: Vec<String> = supplied
            .keys()
            .filter(|name| required.contains(*name) || optional.contains(*name))
            .cloned()
            .collect();
        for name in defaults.keys() {
            if !used.contains(name) {
                used.push(name.clone());
            }
        }

        let mut merged = supplied;
        for (name, value) in defaults {
            merged.entry(name).or_insert(value);
        }

        let mut request = Request::new(method);
        request.uri.path = self.path().to_string();
        self.build_query(&mut request, &used, &merged);
        request
    }

    /// Default query builder: route each used condition by placement.
    fn build_query(&self, request: &mut Request, used: &[String], merged: &IndexMap<String, Value>) {
        for name in used {
            let Some(value) = merged.get(name) else {
                continue;
            };
            let in_query = match self.query_style {
                QueryStyle::ForceQuery => true,
                QueryStyle::ForceBody => false,
                QueryStyle::Placement => {
                    let place = self
                        .conditions
                        .get(name)
                        .map(Condition::place)
                        .unwrap_or_default();
                    match place {
                        Placement::Query => true,
                        Placement::Body => false,
                        Placement::Any => request.method.sends_in_query(),
                    }
                }
            };
            if in_query {
                request.uri.query.insert(name.clone(), value.clone());
            } else {
                request.body.insert(name.clone(), value.clone());
            }
        }
    }

    /// Resolve read-parameter aliases (`dest -> "limit"`,
    /// `dest -> "limit+offset"`) into conditions, consuming the sources.
    /// A summed alias that comes to exactly zero is omitted entirely.
    fn apply_read_aliases(&self, query: &mut QueryData) {
        for (dest, spec) in &self.read_aliases {
            if query.conditions.contains_key(dest) {
                continue;
            }
            if !spec.contains('+') {
                if let Some(value) = query.take_param(spec) {
                    query.conditions.insert(dest.clone(), value);
                }
                continue;
            }
            let mut sum: i64 = 0;
            for part in spec.split('+') {
                if let Some(value) = query.take_param(part) {
                    sum += coerce_int(&value);
                }
            }
            if sum != 0 {
                query.conditions.insert(dest.clone(), Value::from(sum));
            }
        }
    }

    /// Run every known condition through its mapping rule: the original key
    /// is removed and the transformed value inserted at the (possibly
    /// dotted) destination path. Unknown keys pass through untouched.
    fn map_conditions(&self, items: IndexMap<String, Value>) -> IndexMap<String, Value> {
        let mut data = Value::Object(items.iter().map(|(k, v)| (k.clone(), v.clone())).collect());
        for (name, value) in &items {
            if let Some(condition) = self.conditions.get(name) {
                data.as_object_mut().unwrap().shift_remove(name);
                let (dest, mapped) = condition.apply_map(value.clone());
                path::insert(&mut data, &dest, mapped);
            }
        }
        match data {
            Value::Object(map) => map.into_iter().collect(),
            _ => IndexMap::new(),
        }
    }

    /// Back-fill declared-but-missing fields with null, then run every
    /// present field through its mapping rule.
    pub fn process_fields(&self, rows: &mut [Value]) {
        for row in rows.iter_mut() {
            if !row.is_object() {
                continue;
            }
            {
                let map = row.as_object_mut().unwrap();
                for name in self.fields.keys() {
                    if !map.contains_key(name) {
                        map.insert(name.clone(), Value::Null);
                    }
                }
            }
            let present: Vec<String> = row.as_object().unwrap().keys().cloned().collect();
            for name in present {
                if let Some(field) = self.fields.get(&name) {
                    let value = row
                        .as_object_mut()
                        .unwrap()
                        .shift_remove(&name)
                        .unwrap_or(Value::Null);
                    let (dest, mapped) = field.apply_map(value);
                    path::insert(row, &dest, mapped);
                }
            }
        }
    }

    /// Turn the joined logical response into the record list: the result
    /// rule when configured, plain normalization otherwise.
    pub fn apply_result(&self, response: Value) -> Vec<Value> {
        match &self.result {
            Some(rule) => rule.apply(response),
            None => path::into_rows(response),
        }
    }
}

/// Fluent endpoint builder. `condition(name)` and `field(name)` are
/// get-or-create: the first call for a name creates the entry, every later
/// call returns that same entry.
#[derive(Debug, Clone)]
pub struct EndpointBuilder {
    kind: OperationKind,
    table: String,
    path: Option<String>,
    conditions: IndexMap<String, ConditionBuilder>,
    fields: IndexMap<String, FieldBuilder>,
    result: Option<ResultRule>,
    read_aliases: IndexMap<String, String>,
    query_style: QueryStyle,
    splitter: Splitter,
    joiner: Joiner,
    cache_name: Option<String>,
}

impl EndpointBuilder {
    pub fn new(kind: OperationKind, table: &str) -> Self {
        Self {
            kind,
            table: table.to_string(),
            path: None,
            conditions: IndexMap::new(),
            fields: IndexMap::new(),
            result: None,
            read_aliases: IndexMap::new(),
            query_style: QueryStyle::default(),
            splitter: Splitter::default(),
            joiner: Joiner::default(),
            cache_name: None,
        }
    }

    pub fn read(table: &str) -> Self {
        Self::new(OperationKind::Read, table)
    }

    pub fn create(table: &str) -> Self {
        Self::new(OperationKind::Create, table)
    }

    pub fn update(table: &str) -> Self {
        Self::new(OperationKind::Update, table)
    }

    pub fn delete(table: &str) -> Self {
        Self::new(OperationKind::Delete, table)
    }

    pub fn path(&mut self, path: &str) -> &mut Self {
        self.path = Some(path.to_string());
        self
    }

    pub fn cache_name(&mut self, name: &str) -> &mut Self {
        self.cache_name = Some(name.to_string());
        self
    }

    pub fn result(&mut self, rule: ResultRule) -> &mut Self {
        self.result = Some(rule);
        self
    }

    /// Map a read parameter onto a condition; the spec is a source path or
    /// a `+`-joined sum of source paths (`"limit+offset"`).
    pub fn read_alias(&mut self, condition: &str, spec: &str) -> &mut Self {
        self.read_aliases
            .insert(condition.to_string(), spec.to_string());
        self
    }

    pub fn query_style(&mut self, style: QueryStyle) -> &mut Self {
        self.query_style = style;
        self
    }

    pub fn splitter(&mut self, splitter: Splitter) -> &mut Self {
        self.splitter = splitter;
        self
    }

    pub fn joiner(&mut self, joiner: Joiner) -> &mut Self {
        self.joiner = joiner;
        self
    }

    /// Get or create the condition with this name.
    pub fn condition(&mut self, name: &str) -> &mut ConditionBuilder {
        self.conditions
            .entry(name.to_string())
            .or_insert_with(|| ConditionBuilder::new(name))
    }

    /// Get or create the field with this name.
    pub fn field(&mut self, name: &str) -> &mut FieldBuilder {
        self.fields
            .entry(name.to_string())
            .or_insert_with(|| FieldBuilder::new(name))
    }

    /// Finalize into an immutable endpoint.
    pub fn finish(self) -> Endpoint {
        Endpoint {
            kind: self.kind,
            table: self.table,
            path: self.path,
            conditions: self
                .conditions
                .into_iter()
                .map(|(name, builder)| (name, builder.finish()))
                .collect(),
            fields: self
                .fields
                .into_iter()
                .map(|(name, builder)| (name, builder.finish()))
                .collect(),
            result: self.result,
            read_aliases: self.read_aliases,
            query_style: self.query_style,
            splitter: self.splitter,
            joiner: self.joiner,
            cache_name: self.cache_name,
        }
    }
}
