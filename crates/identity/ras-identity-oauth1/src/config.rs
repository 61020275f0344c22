//! OAuth1 configuration types.

use crate::error::{OAuth1Error, OAuth1Result};
use crate::types::{ConsumerCredential, ServiceEndpoints};
use config::{Config as ConfigBuilder, Environment, File};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::path::Path;
use tracing::{debug, info, warn};
use url::Url;

/// Signature method used for every request to a provider.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum SignatureMethod {
    #[default]
    #[serde(rename = "HMAC-SHA1", alias = "hmac-sha1")]
    HmacSha1,
    #[serde(rename = "PLAINTEXT", alias = "plaintext")]
    Plaintext,
}

impl SignatureMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            SignatureMethod::HmacSha1 => "HMAC-SHA1",
            SignatureMethod::Plaintext => "PLAINTEXT",
        }
    }
}

/// OAuth1 provider configuration
#[derive(Clone, Serialize, Deserialize)]
pub struct OAuth1ProviderConfig {
    pub provider_id: String,
    #[serde(alias = "requestTokenUrl")]
    pub request_token_url: String,
    #[serde(alias = "authorizationUrl")]
    pub authorization_url: String,
    #[serde(alias = "accessTokenUrl")]
    pub access_token_url: String,
    #[serde(alias = "consumerKey")]
    pub consumer_key: String,
    #[serde(alias = "consumerSecret")]
    pub consumer_secret: String,
    /// Where the provider sends the user back to. Defaults to the URL of the
    /// request that started the flow.
    #[serde(default, alias = "callbackUrl")]
    pub callback_url: Option<String>,
    #[serde(default, alias = "signatureMethod")]
    pub signature_method: SignatureMethod,
}

impl OAuth1ProviderConfig {
    /// Check that every required setting is present and every URL parses.
    pub fn validate(&self) -> OAuth1Result<()> {
        let required = [
            ("provider_id", &self.provider_id),
            ("request_token_url", &self.request_token_url),
            ("authorization_url", &self.authorization_url),
            ("access_token_url", &self.access_token_url),
            ("consumer_key", &self.consumer_key),
            ("consumer_secret", &self.consumer_secret),
        ];

        for (name, value) in required {
            if value.trim().is_empty() {
                return Err(OAuth1Error::ConfigError(format!(
                    "Missing required setting '{}' for provider '{}'",
                    name, self.provider_id
                )));
            }
        }

        let urls = [
            ("request_token_url", Some(&self.request_token_url)),
            ("authorization_url", Some(&self.authorization_url)),
            ("access_token_url", Some(&self.access_token_url)),
            ("callback_url", self.callback_url.as_ref()),
        ];

        for (name, value) in urls {
            if let Some(value) = value {
                Url::parse(value).map_err(|e| {
                    OAuth1Error::ConfigError(format!(
                        "Invalid URL for '{}' of provider '{}': {}",
                        name, self.provider_id, e
                    ))
                })?;
            }
        }

        Ok(())
    }

    pub fn consumer(&self) -> ConsumerCredential {
        ConsumerCredential::new(&self.consumer_key, &self.consumer_secret)
    }

    pub fn endpoints(&self) -> ServiceEndpoints {
        ServiceEndpoints {
            request_token_url: self.request_token_url.clone(),
            authorization_url: self.authorization_url.clone(),
            access_token_url: self.access_token_url.clone(),
        }
    }
}

impl fmt::Debug for OAuth1ProviderConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OAuth1ProviderConfig")
            .field("provider_id", &self.provider_id)
            .field("request_token_url", &self.request_token_url)
            .field("authorization_url", &self.authorization_url)
            .field("access_token_url", &self.access_token_url)
            .field("consumer_key", &self.consumer_key)
            .field("consumer_secret", &"<redacted>")
            .field("callback_url", &self.callback_url)
            .field("signature_method", &self.signature_method)
            .finish()
    }
}

fn default_state_ttl() -> u64 {
    900 // 15 minutes
}

/// Upper bound for `state_ttl_seconds`: one day.
pub const MAX_STATE_TTL_SECONDS: u64 = 86_400;

fn default_http_timeout() -> u64 {
    30
}

/// Settings shared by every OAuth1 provider instance.
#[derive(Clone, Serialize, Deserialize)]
pub struct OAuth1Config {
    /// Secret the pending request token is encrypted with.
    pub state_secret: String,
    #[serde(default = "default_state_ttl")]
    pub state_ttl_seconds: u64,
    #[serde(default = "default_http_timeout")]
    pub http_timeout_seconds: u64,
}

impl OAuth1Config {
    pub fn new(state_secret: impl Into<String>) -> Self {
        Self {
            state_secret: state_secret.into(),
            state_ttl_seconds: default_state_ttl(),
            http_timeout_seconds: default_http_timeout(),
        }
    }

    pub fn with_state_ttl(mut self, seconds: u64) -> Self {
        self.state_ttl_seconds = seconds;
        self
    }

    pub fn with_http_timeout(mut self, seconds: u64) -> Self {
        self.http_timeout_seconds = seconds;
        self
    }

    pub fn validate(&self) -> OAuth1Result<()> {
        if self.state_secret.is_empty() {
            return Err(OAuth1Error::ConfigError(
                "state_secret must not be empty".to_string(),
            ));
        }
        if self.state_secret.len() < 32 {
            warn!("OAuth1 state_secret is shorter than 32 bytes");
        }
        if self.state_ttl_seconds == 0 {
            return Err(OAuth1Error::ConfigError(
                "state_ttl_seconds must be positive".to_string(),
            ));
        }
        if self.state_ttl_seconds > MAX_STATE_TTL_SECONDS {
            return Err(OAuth1Error::ConfigError(format!(
                "state_ttl_seconds must not exceed {}",
                MAX_STATE_TTL_SECONDS
            )));
        }
        if self.http_timeout_seconds == 0 {
            return Err(OAuth1Error::ConfigError(
                "http_timeout_seconds must be positive".to_string(),
            ));
        }
        Ok(())
    }
}

impl fmt::Debug for OAuth1Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OAuth1Config")
            .field("state_secret", &"<redacted>")
            .field("state_ttl_seconds", &self.state_ttl_seconds)
            .field("http_timeout_seconds", &self.http_timeout_seconds)
            .finish()
    }
}

/// Everything needed to stand up the configured OAuth1 providers.
///
/// Loaded from an optional TOML file plus `OAUTH1__`-prefixed environment
/// variables (`OAUTH1__OAUTH1__STATE_SECRET`,
/// `OAUTH1__PROVIDERS__TWITTER__CONSUMER_KEY`, ...). Environment wins.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OAuth1Settings {
    pub oauth1: OAuth1Config,
    #[serde(default)]
    pub providers: HashMap<String, OAuth1ProviderConfig>,
}

impl OAuth1Settings {
    pub fn load(path: Option<&Path>) -> OAuth1Result<Self> {
        let mut builder = ConfigBuilder::builder();

        if let Some(path) = path {
            if path.exists() {
                info!("Loading OAuth1 configuration from {}", path.display());
                builder = builder.add_source(File::from(path));
            } else {
                debug!("No OAuth1 config file at {}", path.display());
            }
        }

        builder = builder.add_source(
            Environment::with_prefix("OAUTH1")
                .separator("__")
                .try_parsing(true),
        );

        let settings: OAuth1Settings = builder
            .build()
            .and_then(|c| c.try_deserialize::<OAuth1Settings>())
            .map_err(|e| OAuth1Error::ConfigError(e.to_string()))?;

        settings.validate()?;
        Ok(settings)
    }

    pub fn validate(&self) -> OAuth1Result<()> {
        self.oauth1.validate()?;
        for (name, provider) in &self.providers {
            if provider.provider_id != *name {
                return Err(OAuth1Error::ConfigError(format!(
                    "Provider entry '{}' declares provider_id '{}'",
                    name, provider.provider_id
                )));
            }
            provider.validate()?;
        }
        Ok(())
    }

    pub fn provider(&self, provider_id: &str) -> OAuth1Result<&OAuth1ProviderConfig> {
        self.providers.get(provider_id).ok_or_else(|| {
            OAuth1Error::ConfigError(format!("Provider '{}' not configured", provider_id))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn provider_config() -> OAuth1ProviderConfig {
        OAuth1ProviderConfig {
            provider_id: "example".to_string(),
            request_token_url: "https://provider.example.com/oauth/request_token".to_string(),
            authorization_url: "https://provider.example.com/oauth/authorize".to_string(),
            access_token_url: "https://provider.example.com/oauth/access_token".to_string(),
            consumer_key: "consumer_key".to_string(),
            consumer_secret: "consumer_secret".to_string(),
            callback_url: None,
            signature_method: SignatureMethod::HmacSha1,
        }
    }

    #[test]
    fn test_valid_provider_config() {
        assert!(provider_config().validate().is_ok());
    }

    #[test]
    fn test_missing_setting_is_reported() {
        let mut config = provider_config();
        config.consumer_secret = String::new();

        match config.validate() {
            Err(OAuth1Error::ConfigError(msg)) => assert!(msg.contains("consumer_secret")),
            other => panic!("expected config error, got {other:?}"),
        }
    }

    #[test]
    fn test_invalid_url_is_reported() {
        let mut config = provider_config();
        config.access_token_url = "not a url".to_string();

        match config.validate() {
            Err(OAuth1Error::ConfigError(msg)) => assert!(msg.contains("access_token_url")),
            other => panic!("expected config error, got {other:?}"),
        }
    }

    #[test]
    fn test_camel_case_keys_are_accepted() {
        let json = serde_json::json!({
            "provider_id": "example",
            "requestTokenUrl": "https://provider.example.com/rt",
            "authorizationUrl": "https://provider.example.com/auth",
            "accessTokenUrl": "https://provider.example.com/at",
            "consumerKey": "key",
            "consumerSecret": "secret",
            "signatureMethod": "PLAINTEXT"
        });

        let config: OAuth1ProviderConfig = serde_json::from_value(json).unwrap();
        assert_eq!(config.request_token_url, "https://provider.example.com/rt");
        assert_eq!(config.consumer_key, "key");
        assert_eq!(config.signature_method, SignatureMethod::Plaintext);
        assert!(config.callback_url.is_none());
    }

    #[test]
    fn test_config_defaults_and_builders() {
        let config = OAuth1Config::new("0123456789abcdef0123456789abcdef");
        assert_eq!(config.state_ttl_seconds, 900);
        assert_eq!(config.http_timeout_seconds, 30);

        let config = config.with_state_ttl(60).with_http_timeout(5);
        assert_eq!(config.state_ttl_seconds, 60);
        assert_eq!(config.http_timeout_seconds, 5);
        assert!(config.validate().is_ok());

        assert!(OAuth1Config::new("").validate().is_err());
        assert!(
            OAuth1Config::new("secret")
                .with_state_ttl(0)
                .validate()
                .is_err()
        );
    }

    #[test]
    fn test_debug_redacts_secrets() {
        let settings = OAuth1Settings {
            oauth1: OAuth1Config::new("state-secret-value-0123456789abcdef"),
            providers: HashMap::from([("example".to_string(), provider_config())]),
        };

        let rendered = format!("{settings:?}");
        assert!(rendered.contains("consumer_key"));
        assert!(rendered.contains("https://provider.example.com/oauth/authorize"));
        assert!(!rendered.contains("state-secret-value"));
        assert!(rendered.contains("consumer_secret: \"<redacted>\""));
        assert!(!rendered.contains("\"consumer_secret\""));
    }

    #[test]
    fn test_state_ttl_upper_bound() {
        let config = OAuth1Config::new("0123456789abcdef0123456789abcdef");

        assert!(
            config
                .clone()
                .with_state_ttl(MAX_STATE_TTL_SECONDS)
                .validate()
                .is_ok()
        );

        for ttl in [MAX_STATE_TTL_SECONDS + 1, 10_000_000_000_000, u64::MAX] {
            match config.clone().with_state_ttl(ttl).validate() {
                Err(OAuth1Error::ConfigError(msg)) => assert!(msg.contains("state_ttl_seconds")),
                other => panic!("expected config error for {ttl}, got {other:?}"),
            }
        }
    }

    #[test]
    fn test_load_settings_from_file() {
        let mut file = tempfile::Builder::new()
            .suffix(".toml")
            .tempfile()
            .unwrap();
        write!(
            file,
            r#"
[oauth1]
state_secret = "0123456789abcdef0123456789abcdef"
state_ttl_seconds = 600

[providers.twitter]
provider_id = "twitter"
request_token_url = "https://api.twitter.com/oauth/request_token"
authorization_url = "https://api.twitter.com/oauth/authenticate"
access_token_url = "https://api.twitter.com/oauth/access_token"
consumer_key = "key"
consumer_secret = "secret"
"#
        )
        .unwrap();

        let settings = OAuth1Settings::load(Some(file.path())).unwrap();
        assert_eq!(settings.oauth1.state_ttl_seconds, 600);
        assert_eq!(settings.oauth1.http_timeout_seconds, 30);

        let twitter = settings.provider("twitter").unwrap();
        assert_eq!(twitter.consumer_key, "key");
        assert_eq!(twitter.signature_method, SignatureMethod::HmacSha1);
        assert!(settings.provider("github").is_err());
    }

    #[test]
    fn test_load_settings_rejects_incomplete_provider() {
        let mut file = tempfile::Builder::new()
            .suffix(".toml")
            .tempfile()
            .unwrap();
        write!(
            file,
            r#"
[oauth1]
state_secret = "0123456789abcdef0123456789abcdef"

[providers.twitter]
provider_id = "twitter"
request_token_url = "https://api.twitter.com/oauth/request_token"
authorization_url = "https://api.twitter.com/oauth/authenticate"
access_token_url = "https://api.twitter.com/oauth/access_token"
consumer_key = "key"
consumer_secret = ""
"#
        )
        .unwrap();

        let result = OAuth1Settings::load(Some(file.path()));
        assert!(matches!(result, Err(OAuth1Error::ConfigError(_))));
    }
}
