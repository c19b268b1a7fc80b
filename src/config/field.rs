//! Field: one response attribute's rename/transform rule.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::config::strategy::Transform;

/// A finalized field.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Field {
    pub(crate) name: String,
    pub(crate) transform: Transform,
    pub(crate) map_to: Option<String>,
}

impl Field {
    pub fn name(&self) -> &str {
        &self.name
    }

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
pub struct FieldBuilder {
    name: String,
    transform: Transform,
    map_to: Option<String>,
}

impl FieldBuilder {
    pub(crate) fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            transform: Transform::default(),
            map_to: None,
        }
    }

    /// Set the mapping rule: transform plus optional dotted destination
    /// path (`"user.name"` nests the value).
    pub fn map(&mut self, transform: Transform, to: Option<&str>) -> &mut Self {
        self.transform = transform;
        self.map_to = to.map(str::to_string);
        self
    }

    pub(crate) fn finish(self) -> Field {
        Field {
            name: self.name,
            transform: self.transform,
            map_to: self.map_to,
        }
    }
}
