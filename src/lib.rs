//! Record-oriented CRUD over arbitrary HTTP APIs.
//!
//! `restsource` maps a generic query/command interface (read, create, update,
//! delete over named tables with conditions, field projection, pagination and
//! ordering) onto a remote HTTP API described by declarative per-table
//! configuration instead of hand-written request code.
//!
//! The pieces compose leaf to root:
//! - [`config::Condition`] / [`config::Field`] describe one request parameter
//!   or one response attribute,
//! - [`config::Endpoint`] groups them with a path and build strategies,
//! - [`config::Registry`] holds the finalized configuration,
//! - [`engine::RequestEngine`] builds requests, dispatches them through a
//!   [`http::Transport`], decodes the response and emulates pagination,
//!   ordering, projection and counting when the remote API lacks them.

pub mod config;
pub mod engine;
mod error;
pub mod http;
mod path;
mod query;
mod request;

pub use config::{ConfigBuilder, Endpoint, EndpointBuilder, PathCandidate, Registry};
pub use engine::{CacheStore, LogEntry, LogReport, RequestEngine};
pub use error::{ConfigError, SourceError, TransportError};
pub use http::{Auth, HttpTransport, Transport, TransportResponse};
pub use query::{Fields, OperationKind, QueryData, SortDirection, FUNCTION_COUNT};
pub use request::{Method, Request, RequestUri};
