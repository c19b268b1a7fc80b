//! Transport boundary and the default `reqwest`-backed implementation.

use std::collections::HashMap;

use async_trait::async_trait;
use tracing::{debug, trace, warn};

use crate::error::TransportError;
use crate::http::Auth;
use crate::path;
use crate::request::{Method, Request};

/// What a transport hands back: status line, headers and the raw body.
/// Decoding happens in the engine, keyed on the `Content-Type` header.
#[derive(Debug, Clone, Default)]
pub struct TransportResponse {
    pub status: u16,
    pub reason: Option<String>,
    pub headers: HashMap<String, String>,
    pub body: String,
}

impl TransportResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// Human-readable failure reason: the status reason phrase when the
    /// server sent one, the bare status code otherwise.
    pub fn status_reason(&self) -> String {
        match &self.reason {
            Some(reason) => reason.clone(),
            None => format!("HTTP {}", self.status),
        }
    }

    /// Case-insensitive header lookup.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    pub fn content_type(&self) -> Option<&str> {
        self.header("content-type")
    }
}

/// The physical HTTP transport. One call per physical request; retries,
/// timeouts and cancellation are implementation concerns, not the engine's.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn send(&self, request: &Request) -> Result<TransportResponse, TransportError>;
}

/// Default transport on `reqwest`.
///
/// Bearer credentials become an `Authorization` header. The signed scheme is
/// rejected here: request signing needs a protocol-specific transport, this
/// one only speaks plain HTTP.
pub struct HttpTransport {
    client: reqwest::Client,
}

impl HttpTransport {
    pub fn new() -> Self {
        Self {
            client: reqwest::Client::new(),
        }
    }

    /// Reuse a preconfigured client (timeouts, proxies, pools).
    pub fn with_client(client: reqwest::Client) -> Self {
        Self { client }
    }

    /// Assemble the target URL from the structured uri parts.
    fn assemble_url(request: &Request) -> Result<String, TransportError> {
        let uri = &request.uri;
        let host = uri
            .host
            .as_deref()
            .ok_or_else(|| TransportError::InvalidRequest("no host set".to_string()))?;
        let scheme = uri.scheme.as_deref().unwrap_or("https");

        let mut url = format!("{scheme}://{host}");
        if let Some(port) = uri.port {
            url.push_str(&format!(":{port}"));
        }
        if !uri.path.starts_with('/') {
            url.push('/');
        }
        url.push_str(&uri.path);

        if !uri.query.is_empty() {
            let query: Vec<String> = uri
                .query
                .iter()
                .map(|(k, v)| {
                    format!(
                        "{}={}",
                        urlencoding::encode(k),
                        urlencoding::encode(&path::stringify(v))
                    )
                })
                .collect();
            url.push('?');
            url.push_str(&query.join("&"));
        }

        url::Url::parse(&url)
            .map_err(|e| TransportError::InvalidRequest(format!("{url}: {e}")))?;
        Ok(url)
    }
}

impl Default for HttpTransport {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn send(&self, request: &Request) -> Result<TransportResponse, TransportError> {
        let url = Self::assemble_url(request)?;
        debug!("{} {}", request.method, url);

        let mut builder = match request.method {
            Method::Get => self.client.get(&url),
            Method::Post => self.client.post(&url),
            Method::Put => self.client.put(&url),
            Method::Delete => self.client.delete(&url),
            Method::Patch => self.client.patch(&url),
        };

        if let Some(auth) = &request.auth {
            match auth {
                Auth::Bearer { access_token, .. } => {
                    builder = builder.bearer_auth(access_token);
                }
                Auth::Signed { .. } => {
                    return Err(TransportError::UnsupportedAuth("signed"));
                }
            }
        }

        if !request.body.is_empty() {
            trace!("request body: {} entries", request.body.len());
            builder = builder.json(&request.body);
        }

        let response = builder
            .send()
            .await
            .map_err(|e| TransportError::Http(e.to_string()))?;

        let status = response.status();
        let mut headers = HashMap::new();
        for (name, value) in response.headers() {
            if let Ok(v) = value.to_str() {
                headers.insert(name.to_string(), v.to_string());
            }
        }
        let body = response
            .text()
            .await
            .map_err(|e| TransportError::Http(e.to_string()))?;

        if !status.is_success() {
            warn!(
                "request failed: status={}, body={}",
                status,
                &body[..body.len().min(500)]
            );
        }

        Ok(TransportResponse {
            status: status.as_u16(),
            reason: status.canonical_reason().map(String::from),
            headers,
            body,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn request_for(host: &str, path: &str) -> Request {
        let mut request = Request::with_path(path);
        request.uri.host = Some(host.to_string());
        request
    }

    #[test]
    fn test_assemble_url_defaults_to_https() {
        let request = request_for("api.example.com", "/v1/users");
        let url = HttpTransport::assemble_url(&request).unwrap();
        assert_eq!(url, "https://api.example.com/v1/users");
    }

    #[test]
    fn test_assemble_url_with_port_and_query() {
        let mut request = request_for("localhost", "search");
        request.uri.scheme = Some("http".to_string());
        request.uri.port = Some(8080);
        request.uri.query.insert("q".into(), json!("a b"));
        request.uri.query.insert("n".into(), json!(3));
        let url = HttpTransport::assemble_url(&request).unwrap();
        assert_eq!(url, "http://localhost:8080/search?q=a%20b&n=3");
    }

    #[test]
    fn test_assemble_url_requires_host() {
        let request = Request::with_path("/v1/users");
        let err = HttpTransport::assemble_url(&request).unwrap_err();
        assert!(matches!(err, TransportError::InvalidRequest(_)));
    }

    #[test]
    fn test_status_reason_falls_back_to_code() {
        let response = TransportResponse {
            status: 599,
            ..Default::default()
        };
        assert_eq!(response.status_reason(), "HTTP 599");
    }

    #[test]
    fn test_header_lookup_is_case_insensitive() {
        let mut response = TransportResponse::default();
        response
            .headers
            .insert("Content-Type".to_string(), "application/json".to_string());
        assert_eq!(response.content_type(), Some("application/json"));
    }
}
