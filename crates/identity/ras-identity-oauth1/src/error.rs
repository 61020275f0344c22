//! OAuth1 error types.

use ras_identity_core::IdentityError;
use thiserror::Error;

pub type OAuth1Result<T> = Result<T, OAuth1Error>;

#[derive(Debug, Error)]
pub enum OAuth1Error {
    /// The user declined consent at the provider.
    #[error("Access denied by user at provider {provider}")]
    AccessDenied { provider: String },

    /// Protocol error reported by (or about) the provider during the handshake.
    #[error("Authentication failed: {0}")]
    AuthError(String),

    /// The pending request token could not be decoded or decrypted.
    #[error("Pending handshake state is corrupted: {0}")]
    StateCorrupted(String),

    #[error("No pending request token for this session (expired or never issued)")]
    StateNotFound,

    #[error("Callback token does not match the pending request token")]
    InvalidState,

    #[error("Signed resource request failed: {0}")]
    ResourceRequestFailed(String),

    /// Failure of a single call to a provider token endpoint.
    #[error("Provider error: {0}")]
    ProviderError(String),

    #[error("Invalid configuration: {0}")]
    ConfigError(String),

    #[error("URL parsing error: {0}")]
    UrlError(#[from] url::ParseError),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),
}

impl From<OAuth1Error> for IdentityError {
    fn from(err: OAuth1Error) -> Self {
        match err {
            OAuth1Error::AccessDenied { provider } => IdentityError::AccessDenied(provider),
            OAuth1Error::ConfigError(msg) => IdentityError::ConfigError(msg),
            OAuth1Error::StateCorrupted(_)
            | OAuth1Error::StateNotFound
            | OAuth1Error::InvalidState => IdentityError::InvalidState(err.to_string()),
            OAuth1Error::SerializationError(e) => IdentityError::SerializationError(e),
            other => IdentityError::ProviderError(other.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_identity_error_mapping() {
        let denied: IdentityError = OAuth1Error::AccessDenied {
            provider: "twitter".to_string(),
        }
        .into();
        assert!(matches!(denied, IdentityError::AccessDenied(p) if p == "twitter"));

        let missing: IdentityError = OAuth1Error::StateNotFound.into();
        assert!(matches!(missing, IdentityError::InvalidState(_)));

        let auth: IdentityError = OAuth1Error::AuthError("signature_invalid".to_string()).into();
        match auth {
            IdentityError::ProviderError(msg) => assert!(msg.contains("signature_invalid")),
            other => panic!("unexpected mapping: {other:?}"),
        }
    }
}
