//! The finalized configuration registry and its builder.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::config::endpoint::{Endpoint, EndpointBuilder};
use crate::error::ConfigError;
use crate::query::OperationKind;

/// One path candidate in the raw scan map: the path plus its parameter
/// contract.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PathCandidate {
    pub path: String,
    #[serde(default)]
    pub required: Vec<String>,
    #[serde(default)]
    pub optional: Vec<String>,
    #[serde(default)]
    pub defaults: IndexMap<String, Value>,
}

impl PathCandidate {
    pub fn new(path: &str) -> Self {
        Self {
            path: path.to_string(),
            ..Default::default()
        }
    }

    pub fn required(mut self, names: &[&str]) -> Self {
        self.required = names.iter().map(|s| s.to_string()).collect();
        self
    }

    pub fn optional(mut self, names: &[&str]) -> Self {
        self.optional = names.iter().map(|s| s.to_string()).collect();
        self
    }

    pub fn default_value(mut self, name: &str, value: Value) -> Self {
        self.defaults.insert(name.to_string(), value);
        self
    }

    /// A candidate matches when every required name is available, either
    /// supplied by the caller or covered by one of its own defaults.
    fn matches(&self, available: &[String]) -> bool {
        self.required
            .iter()
            .all(|name| available.contains(name) || self.defaults.contains_key(name))
    }
}

type ScanMap = IndexMap<OperationKind, IndexMap<String, Vec<PathCandidate>>>;

/// Immutable configuration: endpoints, the raw scan map, global cache name,
/// engine-level read aliases and default uri parts. Produced once by
/// [`ConfigBuilder::finish`] and passed by reference to the engine — no
/// ambient global, no mutation after finalization.
#[derive(Debug, Clone)]
pub struct Registry {
    endpoints: IndexMap<OperationKind, IndexMap<String, Endpoint>>,
    scan: ScanMap,
    cache_name: Option<String>,
    read_aliases: IndexMap<String, String>,
    host: Option<String>,
    port: Option<u16>,
    scheme: Option<String>,
}

impl Registry {
    pub fn builder() -> ConfigBuilder {
        ConfigBuilder::default()
    }

    pub fn endpoint(&self, kind: OperationKind, table: &str) -> Option<&Endpoint> {
        self.endpoints.get(&kind).and_then(|by_table| by_table.get(table))
    }

    pub fn has_scan_section(&self, kind: OperationKind, section: &str) -> bool {
        self.scan
            .get(&kind)
            .map(|sections| sections.contains_key(section))
            .unwrap_or(false)
    }

    /// First-match scan over the declared candidate order. Declaration
    /// order is part of the contract: an earlier, more demanding candidate
    /// wins over a later catch-all whenever its requirements are met.
    pub fn scan_map(
        &self,
        kind: OperationKind,
        section: &str,
        available: &[String],
    ) -> Result<&PathCandidate, ConfigError> {
        let candidates = self
            .scan
            .get(&kind)
            .and_then(|sections| sections.get(section))
            .ok_or_else(|| ConfigError::UnknownSection {
                kind: kind.to_string(),
                section: section.to_string(),
            })?;

        candidates
            .iter()
            .find(|candidate| candidate.matches(available))
            .ok_or_else(|| ConfigError::NoCandidate {
                section: section.to_string(),
            })
    }

    /// All table names configured across endpoints and scan sections.
    pub fn list_sources(&self) -> Vec<String> {
        let mut sources: Vec<String> = Vec::new();
        for by_table in self.endpoints.values() {
            for table in by_table.keys() {
                if !sources.contains(table) {
                    sources.push(table.clone());
                }
            }
        }
        for sections in self.scan.values() {
            for section in sections.keys() {
                if !sources.contains(section) {
                    sources.push(section.clone());
                }
            }
        }
        sources
    }

    pub fn cache_name(&self) -> Option<&str> {
        self.cache_name.as_deref().filter(|name| !name.is_empty())
    }

    pub fn read_aliases(&self) -> &IndexMap<String, String> {
        &self.read_aliases
    }

    pub fn host(&self) -> Option<&str> {
        self.host.as_deref()
    }

    pub fn port(&self) -> Option<u16> {
        self.port
    }

    pub fn scheme(&self) -> Option<&str> {
        self.scheme.as_deref()
    }
}

/// Mutable configuration builder; consumed by [`finish`](Self::finish).
#[derive(Debug, Clone, Default)]
pub struct ConfigBuilder {
    endpoints: Vec<EndpointBuilder>,
    scan: ScanMap,
    cache_name: Option<String>,
    read_aliases: IndexMap<String, String>,
    host: Option<String>,
    port: Option<u16>,
    scheme: Option<String>,
}

impl ConfigBuilder {
    /// Add a declarative endpoint. Later additions for the same
    /// (kind, table) pair replace earlier ones.
    pub fn add(&mut self, endpoint: EndpointBuilder) -> &mut Self {
        self.endpoints.push(endpoint);
        self
    }

    /// Append a path candidate to a scan-map section; candidates are tried
    /// in the order added.
    pub fn candidate(
        &mut self,
        kind: OperationKind,
        section: &str,
        candidate: PathCandidate,
    ) -> &mut Self {
        self.scan
            .entry(kind)
            .or_default()
            .entry(section.to_string())
            .or_default()
            .push(candidate);
        self
    }

    pub fn cache_name(&mut self, name: &str) -> &mut Self {
        self.cache_name = Some(name.to_string());
        self
    }

    /// Engine-level read-parameter alias, applied in the before-dispatch
    /// hook for scan-map and raw reads.
    pub fn read_alias(&mut self, condition: &str, spec: &str) -> &mut Self {
        self.read_aliases
            .insert(condition.to_string(), spec.to_string());
        self
    }

    pub fn host(&mut self, host: &str) -> &mut Self {
        self.host = Some(host.to_string());
        self
    }

    pub fn port(&mut self, port: u16) -> &mut Self {
        self.port = Some(port);
        self
    }

    pub fn scheme(&mut self, scheme: &str) -> &mut Self {
        self.scheme = Some(scheme.to_string());
        self
    }

    /// Finalize into an immutable registry. An entirely empty configuration
    /// is a fatal error, matching the load-once contract.
    pub fn finish(self) -> Result<Registry, ConfigError> {
        if self.endpoints.is_empty() && self.scan.is_empty() {
            return Err(ConfigError::EmptyConfig);
        }
        let mut endpoints: IndexMap<OperationKind, IndexMap<String, Endpoint>> = IndexMap::new();
        for builder in self.endpoints {
            let endpoint = builder.finish();
            endpoints
                .entry(endpoint.kind())
                .or_default()
                .insert(endpoint.table().to_string(), endpoint);
        }
        Ok(Registry {
            endpoints,
            scan: self.scan,
            cache_name: self.cache_name,
            read_aliases: self.read_aliases,
            host: self.host,
            port: self.port,
            scheme: self.scheme,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn registry_with_candidates() -> Registry {
        let mut builder = Registry::builder();
        builder
            .candidate(
                OperationKind::Read,
                "users",
                PathCandidate::new("/users/by-id").required(&["x"]),
            )
            .candidate(
                OperationKind::Read,
                "users",
                PathCandidate::new("/users/all"),
            );
        builder.finish().unwrap()
    }

    #[test]
    fn test_scan_map_first_match_wins() {
        let registry = registry_with_candidates();

        // x available -> the first, more demanding candidate
        let hit = registry
            .scan_map(OperationKind::Read, "users", &["x".to_string()])
            .unwrap();
        assert_eq!(hit.path, "/users/by-id");

        // nothing available -> the catch-all
        let hit = registry.scan_map(OperationKind::Read, "users", &[]).unwrap();
        assert_eq!(hit.path, "/users/all");
    }

    #[test]
    fn test_scan_map_defaults_satisfy_required() {
        let mut builder = Registry::builder();
        builder
            .candidate(
                OperationKind::Read,
                "users",
                PathCandidate::new("/users/by-id")
                    .required(&["x"])
                    .default_value("x", json!(1)),
            )
            .candidate(
                OperationKind::Read,
                "users",
                PathCandidate::new("/users/all"),
            );
        let registry = builder.finish().unwrap();

        // x defaulted -> first declared match wins even with no fields
        let hit = registry.scan_map(OperationKind::Read, "users", &[]).unwrap();
        assert_eq!(hit.path, "/users/by-id");
    }

    #[test]
    fn test_scan_map_unknown_section_is_fatal() {
        let registry = registry_with_candidates();
        let err = registry
            .scan_map(OperationKind::Read, "ghosts", &[])
            .unwrap_err();
        assert!(matches!(err, ConfigError::UnknownSection { .. }));

        let err = registry
            .scan_map(OperationKind::Delete, "users", &[])
            .unwrap_err();
        assert!(matches!(err, ConfigError::UnknownSection { .. }));
    }

    #[test]
    fn test_scan_map_no_candidate_is_fatal() {
        let mut builder = Registry::builder();
        builder.candidate(
            OperationKind::Read,
            "users",
            PathCandidate::new("/users/by-id").required(&["x"]),
        );
        let registry = builder.finish().unwrap();
        let err = registry.scan_map(OperationKind::Read, "users", &[]).unwrap_err();
        assert!(matches!(err, ConfigError::NoCandidate { .. }));
    }

    #[test]
    fn test_empty_config_is_fatal() {
        let err = Registry::builder().finish().unwrap_err();
        assert!(matches!(err, ConfigError::EmptyConfig));
    }

    #[test]
    fn test_endpoint_lookup_and_sources() {
        let mut builder = Registry::builder();
        builder.add(EndpointBuilder::read("users"));
        builder.add(EndpointBuilder::create("users"));
        builder.candidate(
            OperationKind::Read,
            "posts",
            PathCandidate::new("/posts"),
        );
        let registry = builder.finish().unwrap();

        assert!(registry.endpoint(OperationKind::Read, "users").is_some());
        assert!(registry.endpoint(OperationKind::Delete, "users").is_none());
        assert_eq!(registry.list_sources(), vec!["users", "posts"]);
    }

    #[test]
    fn test_cache_name_empty_string_counts_as_unset() {
        let mut builder = Registry::builder();
        builder.add(EndpointBuilder::read("users"));
        builder.cache_name("");
        let registry = builder.finish().unwrap();
        assert_eq!(registry.cache_name(), None);
    }

    #[test]
    fn test_candidate_deserializes_from_json() {
        let candidate: PathCandidate = serde_json::from_str(
            r#"{"path": "/users", "required": ["id"], "defaults": {"page": 1}}"#,
        )
        .unwrap();
        assert_eq!(candidate.path, "/users");
        assert_eq!(candidate.required, vec!["id"]);
        assert_eq!(candidate.defaults.get("page"), Some(&json!(1)));
    }
}
