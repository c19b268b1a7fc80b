//! Error types shared across the crate.

use thiserror::Error;

/// Fatal configuration and contract errors.
///
/// These are raised at setup or on first use, never retried and never
/// swallowed: a request that cannot be routed or a response that cannot be
/// understood is a configuration defect, not a runtime condition.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("configuration is empty: no endpoints and no path map")]
    EmptyConfig,

    #[error("section '{section}' not found in the {kind} path map")]
    UnknownSection { kind: String, section: String },

    #[error("no path candidate in section '{section}' matches the supplied conditions")]
    NoCandidate { section: String },

    #[error("no endpoint, path map entry or explicit path for table '{0}'")]
    NoRoute(String),

    #[error("can't decode unknown format: '{0}'")]
    UnknownContentType(String),

    #[error("can't calculate function '{0}'")]
    UnsupportedAggregate(String),
}

/// Errors raised by a [`Transport`](crate::http::Transport) implementation.
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("http error: {0}")]
    Http(String),

    #[error("invalid request: {0}")]
    InvalidRequest(String),

    #[error("auth scheme '{0}' is not supported by this transport")]
    UnsupportedAuth(&'static str),
}

/// Umbrella error for engine operations.
///
/// Transport failures and non-success statuses are recorded as the engine's
/// last error before being surfaced here; callers inspect the `Result`, the
/// engine never retries.
#[derive(Debug, Error)]
pub enum SourceError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Transport(#[from] TransportError),

    #[error("remote error: {reason}")]
    Remote { reason: String },

    #[error("decode error: {0}")]
    Decode(String),
}
