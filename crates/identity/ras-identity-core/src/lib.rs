//! Core identity provider traits and types.
//!
//! Providers that run a browser handshake (OAuth 1.0a and friends) are driven one
//! inbound request at a time: each call to [`IdentityProvider::authenticate`]
//! either asks the caller to redirect the user somewhere, or finishes with a
//! verified identity.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use url::Url;

#[derive(Debug, Error)]
pub enum IdentityError {
    #[error("Access denied by user at provider {0}")]
    AccessDenied(String),

    #[error("Provider error: {0}")]
    ProviderError(String),

    #[error("Invalid handshake state: {0}")]
    InvalidState(String),

    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),
}

pub type IdentityResult<T> = Result<T, IdentityError>;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VerifiedIdentity {
    pub provider_id: String,
    pub subject: String,
    pub email: Option<String>,
    pub display_name: Option<String>,
    pub metadata: Option<serde_json::Value>,
}

/// The result of a single authentication step.
///
/// A step never produces both: the flow either continues at the provider or it
/// is finished.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum AuthOutcome<U = VerifiedIdentity> {
    /// Send the user's browser to this URL.
    Redirect { url: String },
    /// The handshake completed and produced an identity.
    Authenticated(U),
}

impl<U> AuthOutcome<U> {
    pub fn redirect_url(&self) -> Option<&str> {
        match self {
            AuthOutcome::Redirect { url } => Some(url),
            AuthOutcome::Authenticated(_) => None,
        }
    }

    pub fn into_identity(self) -> Option<U> {
        match self {
            AuthOutcome::Redirect { .. } => None,
            AuthOutcome::Authenticated(identity) => Some(identity),
        }
    }
}

/// An inbound request as seen by an identity provider.
///
/// `session_id` identifies the caller's session context; anything a provider
/// stashes between two legs of a handshake is keyed by it.
#[derive(Debug, Clone)]
pub struct AuthRequest {
    pub session_id: String,
    pub url: Url,
}

impl AuthRequest {
    pub fn new(session_id: impl Into<String>, url: Url) -> Self {
        Self {
            session_id: session_id.into(),
            url,
        }
    }

    /// Build a request from an absolute URL string.
    pub fn parse(session_id: impl Into<String>, url: &str) -> IdentityResult<Self> {
        let url = Url::parse(url)
            .map_err(|e| IdentityError::InvalidRequest(format!("invalid request URL: {}", e)))?;
        Ok(Self::new(session_id, url))
    }

    /// First value of a decoded query parameter.
    pub fn query_param(&self, name: &str) -> Option<String> {
        self.url
            .query_pairs()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.into_owned())
    }

    pub fn has_query_param(&self, name: &str) -> bool {
        self.url.query_pairs().any(|(key, _)| key == name)
    }

    /// The request URL without query string or fragment.
    pub fn url_without_query(&self) -> Url {
        let mut url = self.url.clone();
        url.set_query(None);
        url.set_fragment(None);
        url
    }
}

#[async_trait]
pub trait IdentityProvider: Send + Sync {
    fn provider_id(&self) -> &str;

    async fn authenticate(&self, request: &AuthRequest) -> IdentityResult<AuthOutcome>;
}
