//! Declarative per-table configuration: conditions, fields, endpoints and
//! the finalized registry the engine runs against.

mod condition;
mod endpoint;
mod field;
mod registry;
pub mod strategy;

pub use condition::{Condition, ConditionBuilder, ConditionKind, KeyKind};
pub use endpoint::{Endpoint, EndpointBuilder};
pub use field::{Field, FieldBuilder};
pub use registry::{ConfigBuilder, PathCandidate, Registry};
pub use strategy::{Joiner, Placement, QueryStyle, ResultRule, Splitter, Transform};
