//! Condition: one request parameter's contract.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::config::strategy::{Placement, Transform};

/// Schema type of a condition, descriptive only.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ConditionKind {
    #[default]
    Text,
    Integer,
    Float,
    Boolean,
}

impl ConditionKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ConditionKind::Text => "text",
            ConditionKind::Integer => "integer",
            ConditionKind::Float => "float",
            ConditionKind::Boolean => "boolean",
        }
    }
}

/// Schema key marker, descriptive only.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum KeyKind {
    Primary,
}

/// A finalized condition. Immutable after [`EndpointBuilder::finish`].
///
/// [`EndpointBuilder::finish`]: crate::config::EndpointBuilder::finish
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Condition {
    pub(crate) name: String,
    pub(crate) nullable: bool,
    pub(crate) default: Option<Value>,
    pub(crate) kind: ConditionKind,
    pub(crate) length: Option<u32>,
    pub(crate) key: Option<KeyKind>,
    pub(crate) transform: Transform,
    pub(crate) map_to: Option<String>,
    pub(crate) place: Placement,
}

impl Condition {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn is_nullable(&self) -> bool {
        self.nullable
    }

    pub fn default_value(&self) -> Option<&Value> {
        self.default.as_ref()
    }

    pub fn kind(&self) -> ConditionKind {
        self.kind
    }

    pub fn length(&self) -> Option<u32> {
        self.length
    }

    pub fn key(&self) -> Option<KeyKind> {
        self.key
    }

    pub fn place(&self) -> Placement {
        self.place
    }

    /// Destination name of the mapping rule, the condition's own name when
    /// no rename is configured.
    pub fn map_to(&self) -> &str {
        self.map_to.as_deref().unwrap_or(&self.name)
    }

    /// Run the mapping rule: transformed value plus its destination path.
    pub fn apply_map(&self, value: Value) -> (String, Value) {
        (self.map_to().to_string(), self.transform.apply(value))
    }
}

/// Fluent builder, handed out by the endpoint builder's get-or-create
/// accessor.
#[derive(Debug, Clone)]
pub struct ConditionBuilder {
    name: String,
    nullable: bool,
    default: Option<Value>,
    kind: ConditionKind,
    length: Option<u32>,
    key: Option<KeyKind>,
    transform: Transform,
    map_to: Option<String>,
    place: Placement,
}

impl ConditionBuilder {
    pub(crate) fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            nullable: true,
            default: None,
            kind: ConditionKind::default(),
            length: None,
            key: None,
            transform: Transform::default(),
            map_to: None,
            place: Placement::default(),
        }
    }

    /// Nullable conditions are optional; non-nullable ones are required.
    pub fn null(&mut self, nullable: bool) -> &mut Self {
        self.nullable = nullable;
        self
    }

    pub fn default_value(&mut self, value: Value) -> &mut Self {
        self.default = Some(value);
        self
    }

    pub fn kind(&mut self, kind: ConditionKind) -> &mut Self {
        self.kind = kind;
        self
    }

    pub fn length(&mut self, length: u32) -> &mut Self {
        self.length = Some(length);
        self
    }

    pub fn key_primary(&mut self) -> &mut Self {
        self.key = Some(KeyKind::Primary);
        self
    }

    /// Set the mapping rule: transform plus optional dotted destination
    /// path. `None` keeps the condition's own name as destination.
    pub fn map(&mut self, transform: Transform, to: Option<&str>) -> &mut Self {
        self.transform = transform;
        self.map_to = to.map(str::to_string);
        self
    }

    pub fn send_in_query(&mut self) -> &mut Self {
        self.place = Placement::Query;
        self
    }

    pub fn send_in_body(&mut self) -> &mut Self {
        self.place = Placement::Body;
        self
    }

    pub fn send_in_any(&mut self) -> &mut Self {
        self.place = Placement::Any;
        self
    }

    pub(crate) fn is_nullable(&self) -> bool {
        self.nullable
    }

    pub(crate) fn finish(self) -> Condition {
        Condition {
            name: self.name,
            nullable: self.nullable,
            default: self.default,
            kind: self.kind,
            length: self.length,
            key: self.key,
            transform: self.transform,
            map_to: self.map_to,
            place: self.place,
        }
    }
}
