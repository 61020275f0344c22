//! OAuth1 protocol types.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

/// Protocol parameter names.
pub mod params {
    pub const OAUTH_CALLBACK: &str = "oauth_callback";
    pub const OAUTH_CALLBACK_CONFIRMED: &str = "oauth_callback_confirmed";
    pub const OAUTH_CONSUMER_KEY: &str = "oauth_consumer_key";
    pub const OAUTH_NONCE: &str = "oauth_nonce";
    pub const OAUTH_SIGNATURE: &str = "oauth_signature";
    pub const OAUTH_SIGNATURE_METHOD: &str = "oauth_signature_method";
    pub const OAUTH_TIMESTAMP: &str = "oauth_timestamp";
    pub const OAUTH_TOKEN: &str = "oauth_token";
    pub const OAUTH_TOKEN_SECRET: &str = "oauth_token_secret";
    pub const OAUTH_VERIFIER: &str = "oauth_verifier";
    pub const OAUTH_VERSION: &str = "oauth_version";
    pub const OAUTH_PROBLEM: &str = "oauth_problem";
    pub const OAUTH_ACCESS_DENIED: &str = "access_denied";
}

/// Borrowed token/secret pair used when signing.
#[derive(Clone, Copy)]
pub struct TokenRef<'a> {
    pub token: &'a str,
    pub secret: &'a str,
}

/// Temporary credentials issued by the request-token endpoint.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RequestToken {
    pub token: String,
    pub secret: String,
}

impl RequestToken {
    pub fn new(token: impl Into<String>, secret: impl Into<String>) -> Self {
        Self {
            token: token.into(),
            secret: secret.into(),
        }
    }

    pub fn as_token_ref(&self) -> TokenRef<'_> {
        TokenRef {
            token: &self.token,
            secret: &self.secret,
        }
    }
}

impl fmt::Debug for RequestToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RequestToken")
            .field("token", &self.token)
            .field("secret", &"<redacted>")
            .finish()
    }
}

/// Token credentials issued by the access-token endpoint.
///
/// `params` carries whatever else the provider put in the response (for
/// example `user_id` and `screen_name` on Twitter).
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccessToken {
    pub token: String,
    pub secret: String,
    #[serde(default)]
    pub params: HashMap<String, String>,
}

impl AccessToken {
    pub fn new(token: impl Into<String>, secret: impl Into<String>) -> Self {
        Self {
            token: token.into(),
            secret: secret.into(),
            params: HashMap::new(),
        }
    }

    pub fn with_param(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.params.insert(key.into(), value.into());
        self
    }

    pub fn param(&self, key: &str) -> Option<&str> {
        self.params.get(key).map(String::as_str)
    }

    pub fn as_token_ref(&self) -> TokenRef<'_> {
        TokenRef {
            token: &self.token,
            secret: &self.secret,
        }
    }
}

impl fmt::Debug for AccessToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AccessToken")
            .field("token", &self.token)
            .field("secret", &"<redacted>")
            .field("params", &self.params)
            .finish()
    }
}

/// The application's own key/secret pair registered with the provider.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConsumerCredential {
    pub key: String,
    pub secret: String,
}

impl ConsumerCredential {
    pub fn new(key: impl Into<String>, secret: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            secret: secret.into(),
        }
    }
}

impl fmt::Debug for ConsumerCredential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConsumerCredential")
            .field("key", &self.key)
            .field("secret", &"<redacted>")
            .finish()
    }
}

/// The three provider endpoints of the handshake.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceEndpoints {
    pub request_token_url: String,
    pub authorization_url: String,
    pub access_token_url: String,
}
