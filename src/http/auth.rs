//! Credential values injected into the request structure.
//!
//! The engine only carries credentials into [`Request::auth`]; actually
//! signing or attaching them to the wire request is the transport's job.
//!
//! [`Request::auth`]: crate::Request

use serde::{Deserialize, Serialize};

/// Credential material for one of the two supported schemes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "scheme", rename_all = "kebab-case")]
pub enum Auth {
    /// Signed-request scheme: consumer key pair plus an optional token pair.
    Signed {
        consumer_key: String,
        consumer_secret: String,
        #[serde(default)]
        token: Option<String>,
        #[serde(default)]
        token_secret: Option<String>,
    },
    /// Bearer scheme: client pair plus the access token sent on the wire.
    Bearer {
        client_id: String,
        client_secret: String,
        access_token: String,
    },
}

impl Auth {
    pub fn scheme(&self) -> &'static str {
        match self {
            Auth::Signed { .. } => "signed",
            Auth::Bearer { .. } => "bearer",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scheme_names() {
        let signed = Auth::Signed {
            consumer_key: "ck".into(),
            consumer_secret: "cs".into(),
            token: None,
            token_secret: None,
        };
        assert_eq!(signed.scheme(), "signed");

        let bearer = Auth::Bearer {
            client_id: "id".into(),
            client_secret: "secret".into(),
            access_token: "at".into(),
        };
        assert_eq!(bearer.scheme(), "bearer");
    }

    #[test]
    fn test_serde_tagging() {
        let auth: Auth = serde_json::from_str(
            r#"{"scheme": "bearer", "client_id": "a", "client_secret": "b", "access_token": "c"}"#,
        )
        .unwrap();
        assert_eq!(auth.scheme(), "bearer");
    }
}
