//! Twitter (X) OAuth 1.0a provider.

use crate::config::{OAuth1ProviderConfig, SignatureMethod};
use crate::error::{OAuth1Error, OAuth1Result};
use crate::mapper::IdentityMapper;
use crate::resource::ResourceClient;
use crate::types::AccessToken;
use async_trait::async_trait;
use ras_identity_core::VerifiedIdentity;
use serde::{Deserialize, Serialize};
use tracing::debug;

pub const TWITTER_PROVIDER_ID: &str = "twitter";
pub const TWITTER_REQUEST_TOKEN_URL: &str = "https://api.twitter.com/oauth/request_token";
pub const TWITTER_AUTHORIZATION_URL: &str = "https://api.twitter.com/oauth/authenticate";
pub const TWITTER_ACCESS_TOKEN_URL: &str = "https://api.twitter.com/oauth/access_token";
pub const TWITTER_VERIFY_CREDENTIALS_URL: &str =
    "https://api.twitter.com/1.1/account/verify_credentials.json";

/// Provider configuration with Twitter's endpoints filled in.
pub fn twitter_config(
    consumer_key: impl Into<String>,
    consumer_secret: impl Into<String>,
) -> OAuth1ProviderConfig {
    OAuth1ProviderConfig {
        provider_id: TWITTER_PROVIDER_ID.to_string(),
        request_token_url: TWITTER_REQUEST_TOKEN_URL.to_string(),
        authorization_url: TWITTER_AUTHORIZATION_URL.to_string(),
        access_token_url: TWITTER_ACCESS_TOKEN_URL.to_string(),
        consumer_key: consumer_key.into(),
        consumer_secret: consumer_secret.into(),
        callback_url: None,
        signature_method: SignatureMethod::HmacSha1,
    }
}

/// Subset of the `verify_credentials` response we care about.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TwitterProfile {
    pub id_str: String,
    pub screen_name: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub profile_image_url_https: Option<String>,
}

#[derive(Debug, Clone)]
pub struct TwitterAuthInfo {
    pub access_token: AccessToken,
    pub profile: TwitterProfile,
}

/// Maps a completed Twitter handshake to a [`VerifiedIdentity`].
#[derive(Debug, Clone)]
pub struct TwitterMapper {
    provider_id: String,
    verify_credentials_url: String,
}

impl TwitterMapper {
    pub fn new() -> Self {
        Self {
            provider_id: TWITTER_PROVIDER_ID.to_string(),
            verify_credentials_url: TWITTER_VERIFY_CREDENTIALS_URL.to_string(),
        }
    }

    /// A mapper for a Twitter provider registered under `config.provider_id`.
    pub fn for_config(config: &OAuth1ProviderConfig) -> Self {
        Self::new().with_provider_id(&config.provider_id)
    }

    /// The id stamped on every identity; keep it equal to the provider's.
    pub fn with_provider_id(mut self, provider_id: impl Into<String>) -> Self {
        self.provider_id = provider_id.into();
        self
    }

    pub fn with_verify_credentials_url(mut self, url: impl Into<String>) -> Self {
        self.verify_credentials_url = url.into();
        self
    }
}

impl Default for TwitterMapper {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl IdentityMapper for TwitterMapper {
    type Info = TwitterAuthInfo;
    type Identity = VerifiedIdentity;

    async fn build_info(
        &self,
        access_token: AccessToken,
        resources: &ResourceClient,
    ) -> OAuth1Result<TwitterAuthInfo> {
        let profile: TwitterProfile = resources
            .get(&self.verify_credentials_url, &access_token)
            .await?;

        if let Some(user_id) = access_token.param("user_id") {
            if user_id != profile.id_str {
                return Err(OAuth1Error::AuthError(format!(
                    "Token issued for user {} but credentials belong to {}",
                    user_id, profile.id_str
                )));
            }
        }

        debug!("Fetched Twitter profile for @{}", profile.screen_name);
        Ok(TwitterAuthInfo {
            access_token,
            profile,
        })
    }

    async fn transform(&self, info: TwitterAuthInfo) -> OAuth1Result<VerifiedIdentity> {
        let profile = info.profile;

        let mut metadata = serde_json::Map::new();
        metadata.insert(
            "screen_name".to_string(),
            serde_json::Value::String(profile.screen_name.clone()),
        );
        if let Some(picture) = profile.profile_image_url_https {
            metadata.insert("picture".to_string(), serde_json::Value::String(picture));
        }

        Ok(VerifiedIdentity {
            provider_id: self.provider_id.clone(),
            subject: profile.id_str,
            email: profile.email,
            display_name: Some(profile.name.unwrap_or(profile.screen_name)),
            metadata: Some(serde_json::Value::Object(metadata)),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_twitter_config_is_valid() {
        let config = twitter_config("key", "secret");
        assert!(config.validate().is_ok());
        assert_eq!(config.provider_id, "twitter");
        assert_eq!(config.signature_method, SignatureMethod::HmacSha1);
    }

    fn info() -> TwitterAuthInfo {
        TwitterAuthInfo {
            access_token: AccessToken::new("xyz", "topsecret"),
            profile: TwitterProfile {
                id_str: "12".to_string(),
                screen_name: "jack".to_string(),
                name: None,
                email: None,
                profile_image_url_https: Some("https://pbs.twimg.com/jack.png".to_string()),
            },
        }
    }

    #[tokio::test]
    async fn test_transform_maps_profile() {
        let identity = TwitterMapper::new().transform(info()).await.unwrap();

        assert_eq!(identity.provider_id, "twitter");
        assert_eq!(identity.subject, "12");
        assert_eq!(identity.display_name, Some("jack".to_string()));
        assert!(identity.email.is_none());

        let metadata = identity.metadata.unwrap();
        assert_eq!(metadata["screen_name"], "jack");
        assert_eq!(metadata["picture"], "https://pbs.twimg.com/jack.png");
    }

    #[tokio::test]
    async fn test_identity_carries_configured_provider_id() {
        let mut config = twitter_config("key", "secret");
        config.provider_id = "x".to_string();

        let identity = TwitterMapper::for_config(&config)
            .transform(info())
            .await
            .unwrap();
        assert_eq!(identity.provider_id, "x");
    }
}
