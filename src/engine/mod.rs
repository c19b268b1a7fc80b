//! The request engine: routing, dispatch, decode, emulation, caching.

mod cache;
pub(crate) mod emulate;
mod log;

pub use cache::CacheStore;
pub use log::{LogEntry, LogReport, RequestLog, LOG_CAPACITY};

use std::sync::Arc;
use std::time::Instant;

use indexmap::IndexMap;
use serde_json::{Map, Value};
use tracing::debug;

use crate::config::Registry;
use crate::error::{ConfigError, SourceError};
use crate::http::{decode, Auth, Transport};
use crate::path;
use crate::query::{coerce_int, Fields, OperationKind, QueryData};
use crate::request::{Method, Request};

use cache::QueryCache;

type ErrorHook = Box<dyn Fn(&str, &str) + Send + Sync>;

/// Orchestrates one logical operation at a time: selects an endpoint (or
/// scans the raw path map), builds the request, dispatches it through the
/// transport, decodes and post-processes the response, applies emulation
/// and manages the two-tier query cache.
///
/// The engine is single-caller by design: `&mut self` operations keep the
/// in-process cache, ring log and counters confined to one execution
/// context. Share-across-threads setups need their own synchronization or
/// one engine per worker.
pub struct RequestEngine {
    registry: Registry,
    transport: Arc<dyn Transport>,
    cache: QueryCache,
    log: RequestLog,
    auth: Option<Auth>,
    tokens: IndexMap<String, String>,
    verbose: bool,
    on_error: Option<ErrorHook>,
    snapshot: QueryData,
    last_error: Option<String>,
    took: Option<u64>,
    num_rows: Option<usize>,
}

impl RequestEngine {
    pub fn new(registry: Registry, transport: Arc<dyn Transport>) -> Self {
        Self {
            registry,
            transport,
            cache: QueryCache::default(),
            log: RequestLog::default(),
            auth: None,
            tokens: IndexMap::new(),
            verbose: false,
            on_error: None,
            snapshot: QueryData::default(),
            last_error: None,
            took: None,
            num_rows: None,
        }
    }

    /// Credentials injected into every request that doesn't carry its own.
    pub fn with_auth(mut self, auth: Auth) -> Self {
        self.auth = Some(auth);
        self
    }

    /// External cache store behind the in-process tier.
    pub fn with_cache_store(mut self, store: Arc<dyn CacheStore>) -> Self {
        self.cache.set_store(store);
        self
    }

    /// Value for a `:name` path placeholder.
    pub fn with_token(mut self, name: &str, value: &str) -> Self {
        self.tokens.insert(name.to_string(), value.to_string());
        self
    }

    /// Enable the request log.
    pub fn with_verbose(mut self, verbose: bool) -> Self {
        self.verbose = verbose;
        self
    }

    /// Hook invoked with (table, reason) on every non-success response.
    pub fn with_error_hook(mut self, hook: impl Fn(&str, &str) + Send + Sync + 'static) -> Self {
        self.on_error = Some(Box::new(hook));
        self
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    /// Message of the most recent failure, cleared on the next success.
    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    /// Elapsed milliseconds of the most recent physical request.
    pub fn took(&self) -> Option<u64> {
        self.took
    }

    /// Row count of the most recent read.
    pub fn num_rows(&self) -> Option<usize> {
        self.num_rows
    }

    /// Drain or inspect the request log.
    pub fn get_log(&mut self, sorted: bool, clear: bool) -> LogReport {
        self.log.report(sorted, clear)
    }

    /// All configured table names.
    pub fn list_sources(&self) -> Vec<String> {
        self.registry.list_sources()
    }

    /// Map an aggregate function name onto the field marker the engine
    /// understands. Only `count` exists.
    pub fn calculate(&self, function: &str) -> Result<Fields, ConfigError> {
        match function.to_ascii_lowercase().as_str() {
            "count" => Ok(Fields::Count),
            other => Err(ConfigError::UnsupportedAggregate(other.to_string())),
        }
    }

    /// Read records from a table.
    ///
    /// Routing order: an explicit `query.path` wins, then a configured read
    /// endpoint, then the raw scan map. The result is the emulated,
    /// per-table-wrapped record list.
    pub async fn read(
        &mut self,
        table: &str,
        query: QueryData,
    ) -> Result<Vec<Value>, SourceError> {
        self.snapshot = query.clone();
        let mut query = query;
        let use_cache = query.cache;

        let endpoint = self.registry.endpoint(OperationKind::Read, table).cloned();
        let request = if let Some(explicit) = query.path.clone() {
            let mut request = Request::new(Method::Get);
            request.uri.path = explicit;
            for (name, value) in &query.conditions {
                request.uri.query.insert(name.clone(), value.clone());
            }
            request
        } else if let Some(endpoint) = &endpoint {
            endpoint.build_request(Method::Get, &mut query)
        } else if self.registry.has_scan_section(OperationKind::Read, table) {
            self.scan_request(OperationKind::Read, Method::Get, table, &query.conditions)?
        } else {
            return Err(ConfigError::NoRoute(table.to_string()).into());
        };

        let cache_name = endpoint
            .as_ref()
            .and_then(|e| e.cache_name())
            .or_else(|| self.registry.cache_name())
            .map(String::from);
        let cache_key = request.cache_key();

        if use_cache {
            if let Some(hit) = self.cache.get(&cache_key, cache_name.as_deref()).await {
                debug!("query cache hit for {}", request.uri.path);
                let rows = path::into_rows(hit);
                self.num_rows = Some(rows.len());
                return Ok(rows);
            }
        }

        let splitter = endpoint
            .as_ref()
            .map(|e| e.splitter().clone())
            .unwrap_or_default();
        let joiner = endpoint
            .as_ref()
            .map(|e| e.joiner().clone())
            .unwrap_or_default();

        let mut responses = Vec::new();
        for mut physical in splitter.split(request) {
            let decoded = self
                .dispatch(&mut physical, OperationKind::Read, table)
                .await?;
            responses.push(decoded);
        }
        let joined = joiner.join(responses);

        let mut rows = match &endpoint {
            Some(endpoint) => endpoint.apply_result(joined),
            None => path::into_rows(joined),
        };
        if let Some(endpoint) = &endpoint {
            endpoint.process_fields(&mut rows);
        }

        let rows = emulate::apply(table, &self.snapshot, rows);
        self.num_rows = Some(rows.len());

        if use_cache {
            self.cache
                .set(&cache_key, Value::Array(rows.clone()), cache_name.as_deref())
                .await;
        }
        Ok(rows)
    }

    /// Create a record. The decoded remote response is returned as-is.
    pub async fn create(
        &mut self,
        table: &str,
        record: Map<String, Value>,
    ) -> Result<Value, SourceError> {
        let mut request = self.write_request(OperationKind::Create, Method::Post, table, record)?;
        self.dispatch(&mut request, OperationKind::Create, table).await
    }

    /// Update a record. The decoded remote response is returned as-is.
    pub async fn update(
        &mut self,
        table: &str,
        record: Map<String, Value>,
    ) -> Result<Value, SourceError> {
        let mut request = self.write_request(OperationKind::Update, Method::Put, table, record)?;
        self.dispatch(&mut request, OperationKind::Update, table).await
    }

    /// Delete records matching the conditions.
    pub async fn delete(
        &mut self,
        table: &str,
        conditions: IndexMap<String, Value>,
    ) -> Result<Value, SourceError> {
        let endpoint = self.registry.endpoint(OperationKind::Delete, table).cloned();
        let mut request = if let Some(endpoint) = &endpoint {
            let mut query = QueryData {
                conditions: conditions.clone(),
                ..Default::default()
            };
            endpoint.build_request(Method::Delete, &mut query)
        } else {
            self.scan_request(OperationKind::Delete, Method::Delete, table, &conditions)?
        };
        self.dispatch(&mut request, OperationKind::Delete, table).await
    }

    /// Execute a caller-built request without endpoint configuration, the
    /// raw escape hatch. No emulation is applied.
    pub async fn query(&mut self, mut request: Request) -> Result<Value, SourceError> {
        self.dispatch(&mut request, OperationKind::Read, "").await
    }

    /// Raw request against an explicit path.
    pub async fn query_path(&mut self, explicit: &str) -> Result<Value, SourceError> {
        self.query(Request::with_path(explicit)).await
    }

    /// Build a write request: endpoint when configured, otherwise the scan
    /// map picks the path and the record travels in the body.
    fn write_request(
        &self,
        kind: OperationKind,
        method: Method,
        table: &str,
        record: Map<String, Value>,
    ) -> Result<Request, SourceError> {
        if let Some(endpoint) = self.registry.endpoint(kind, table) {
            let mut query = QueryData {
                conditions: record.into_iter().collect(),
                ..Default::default()
            };
            return Ok(endpoint.build_request(method, &mut query));
        }
        let available: Vec<String> = record.keys().cloned().collect();
        let candidate = self.registry.scan_map(kind, table, &available)?;
        let mut request = Request::new(method);
        request.uri.path = candidate.path.clone();
        request.body = record;
        Ok(request)
    }

    /// Build a request from the scan map: first matching candidate supplies
    /// the path; used conditions (supplied ∩ contract, plus defaults) fill
    /// the query string.
    fn scan_request(
        &self,
        kind: OperationKind,
        method: Method,
        table: &str,
        conditions: &IndexMap<String, Value>,
    ) -> Result<Request, SourceError> {
        let available: Vec<String> = conditions.keys().cloned().collect();
        let candidate = self.registry.scan_map(kind, table, &available)?;

        let mut used: Vec<String> = available
            .iter()
            .filter(|name| {
                candidate.required.contains(*name) || candidate.optional.contains(*name)
            })
            .cloned()
            .collect();
        for name in candidate.defaults.keys() {
            if !used.contains(name) {
                used.push(name.clone());
            }
        }

        let mut request = Request::new(method);
        request.uri.path = candidate.path.clone();
        for name in &used {
            let value = conditions
                .get(name)
                .or_else(|| candidate.defaults.get(name));
            if let Some(value) = value {
                request.uri.query.insert(name.clone(), value.clone());
            }
        }
        Ok(request)
    }

    /// One physical request: inject credentials, fill uri defaults, swap
    /// path tokens, run the before-dispatch hook, send, decode.
    async fn dispatch(
        &mut self,
        request: &mut Request,
        kind: OperationKind,
        table: &str,
    ) -> Result<Value, SourceError> {
        if request.auth.is_none() {
            request.auth = self.auth.clone();
        }
        if request.uri.host.is_none() {
            request.uri.host = self.registry.host().map(String::from);
        }
        if request.uri.port.is_none() {
            request.uri.port = self.registry.port();
        }
        if request.uri.scheme.is_none() {
            request.uri.scheme = self.registry.scheme().map(String::from);
        }
        request.swap_tokens(&self.tokens);
        self.before_dispatch(request, kind);

        debug!("{} {} ({} {})", request.method, request.uri.path, kind, table);
        let timer = Instant::now();
        let outcome = self.transport.send(request).await;
        let took = timer.elapsed().as_millis() as u64;
        self.took = Some(took);

        match outcome {
            Err(error) => {
                let message = error.to_string();
                self.last_error = Some(message.clone());
                self.log_request(request, took, Some(message), None);
                Err(error.into())
            }
            Ok(response) if !response.is_success() => {
                let reason = response.status_reason();
                self.last_error = Some(reason.clone());
                if let Some(hook) = &self.on_error {
                    hook(table, &reason);
                }
                self.log_request(request, took, Some(reason.clone()), None);
                Err(SourceError::Remote { reason })
            }
            Ok(response) => {
                self.last_error = None;
                let content_type = response.content_type().unwrap_or("").to_string();
                match decode::decode_body(&content_type, &response.body) {
                    Ok(decoded) => {
                        let row_count = decoded.as_array().map(|rows| rows.len());
                        self.log_request(request, took, None, row_count);
                        Ok(decoded)
                    }
                    Err(error) => {
                        let message = error.to_string();
                        self.last_error = Some(message.clone());
                        self.log_request(request, took, Some(message), None);
                        Err(error)
                    }
                }
            }
        }
    }

    /// Just-in-time request adjustment: engine-level read-parameter aliases
    /// resolved from the query snapshot into the query string. Endpoints
    /// apply their own aliases during build; anything they already placed
    /// is left alone.
    fn before_dispatch(&mut self, request: &mut Request, kind: OperationKind) {
        if kind != OperationKind::Read {
            return;
        }
        for (dest, spec) in self.registry.read_aliases().clone() {
            if request.uri.query.contains_key(&dest) || request.body.contains_key(&dest) {
                continue;
            }
            if !spec.contains('+') {
                if let Some(value) = self.snapshot.lookup_param(&spec) {
                    request.uri.query.insert(dest, value);
                }
                continue;
            }
            let mut sum: i64 = 0;
            for part in spec.split('+') {
                if let Some(value) = self.snapshot.lookup_param(part) {
                    sum += coerce_int(&value);
                }
            }
            if sum != 0 {
                request.uri.query.insert(dest, Value::from(sum));
            }
        }
    }

    fn log_request(
        &mut self,
        request: &Request,
        took: u64,
        error: Option<String>,
        row_count: Option<usize>,
    ) {
        if !self.verbose {
            return;
        }
        self.log.push(LogEntry {
            method: request.method.to_string(),
            path: request.uri.path.clone(),
            took_ms: took,
            error,
            row_count,
        });
    }
}
