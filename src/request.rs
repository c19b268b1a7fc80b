//! The wire half of a request context: method, uri parts and body.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::http::Auth;

/// HTTP methods the engine routes through.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Method {
    #[default]
    Get,
    Post,
    Put,
    Delete,
    Patch,
}

impl Method {
    pub fn as_str(&self) -> &'static str {
        match self {
            Method::Get => "GET",
            Method::Post => "POST",
            Method::Put => "PUT",
            Method::Delete => "DELETE",
            Method::Patch => "PATCH",
        }
    }

    /// Placement default: GET and DELETE carry conditions in the query
    /// string, everything else in the body.
    pub fn sends_in_query(&self) -> bool {
        matches!(self, Method::Get | Method::Delete)
    }
}

impl std::fmt::Display for Method {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Structured request uri. Scheme, host and port left empty are filled from
/// the registry defaults at dispatch time.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RequestUri {
    #[serde(default)]
    pub scheme: Option<String>,
    #[serde(default)]
    pub host: Option<String>,
    #[serde(default)]
    pub port: Option<u16>,
    #[serde(default)]
    pub path: String,
    #[serde(default)]
    pub query: IndexMap<String, Value>,
}

/// A built request, handed to the [`Transport`](crate::http::Transport).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Request {
    #[serde(default)]
    pub method: Method,
    #[serde(default)]
    pub uri: RequestUri,
    #[serde(default)]
    pub body: Map<String, Value>,
    #[serde(default)]
    pub auth: Option<Auth>,
}

impl Request {
    pub fn new(method: Method) -> Self {
        Self {
            method,
            ..Default::default()
        }
    }

    /// A bare request for an explicit path, the raw-query escape hatch.
    pub fn with_path(path: &str) -> Self {
        let mut request = Self::new(Method::Get);
        request.uri.path = path.to_string();
        request
    }

    /// Canonical serialization used as the cache key. Credentials are not
    /// part of request identity.
    pub fn cache_key(&self) -> String {
        let identity = serde_json::json!({
            "method": self.method.as_str(),
            "uri": {
                "scheme": self.uri.scheme,
                "host": self.uri.host,
                "port": self.uri.port,
                "path": self.uri.path,
                "query": self.uri.query,
            },
            "body": self.body,
        });
        identity.to_string()
    }

    /// Replace `:token` placeholders in the path.
    pub fn swap_tokens(&mut self, tokens: &IndexMap<String, String>) {
        for (token, value) in tokens {
            let placeholder = format!(":{token}");
            if self.uri.path.contains(&placeholder) {
                self.uri.path = self.uri.path.replace(&placeholder, value);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_cache_key_ignores_auth() {
        let mut a = Request::with_path("/users");
        let mut b = Request::with_path("/users");
        b.auth = Some(Auth::Bearer {
            client_id: "id".into(),
            client_secret: "secret".into(),
            access_token: "token".into(),
        });
        assert_eq!(a.cache_key(), b.cache_key());

        a.uri.query.insert("id".into(), json!(1));
        assert_ne!(a.cache_key(), b.cache_key());
    }

    #[test]
    fn test_cache_key_stable_under_query_order() {
        let mut a = Request::with_path("/users");
        a.uri.query.insert("x".into(), json!(1));
        a.uri.query.insert("y".into(), json!(2));
        let mut b = Request::with_path("/users");
        b.uri.query.insert("y".into(), json!(2));
        b.uri.query.insert("x".into(), json!(1));
        // insertion order is part of the canonical form
        assert_ne!(a.cache_key(), b.cache_key());
    }

    #[test]
    fn test_swap_tokens() {
        let mut request = Request::with_path("/users/:user_id/posts/:post_id");
        let mut tokens = IndexMap::new();
        tokens.insert("user_id".to_string(), "42".to_string());
        tokens.insert("post_id".to_string(), "7".to_string());
        request.swap_tokens(&tokens);
        assert_eq!(request.uri.path, "/users/42/posts/7");
    }
}
