//! OAuth 1.0a request signing (RFC 5849).

use crate::config::SignatureMethod;
use crate::error::{OAuth1Error, OAuth1Result};
use crate::types::{ConsumerCredential, TokenRef, params};
use base64::{Engine, engine::general_purpose::STANDARD};
use chrono::Utc;
use hmac::{Hmac, Mac};
use percent_encoding::{AsciiSet, NON_ALPHANUMERIC, percent_decode_str, utf8_percent_encode};
use sha1::Sha1;
use std::collections::HashMap;
use url::Url;
use uuid::Uuid;

type HmacSha1 = Hmac<Sha1>;

/// Everything except the RFC 3986 unreserved characters gets encoded.
const OAUTH_ENCODE_SET: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'.')
    .remove(b'_')
    .remove(b'~');

pub fn percent_encode(value: &str) -> String {
    utf8_percent_encode(value, OAUTH_ENCODE_SET).to_string()
}

/// Signs requests on behalf of one consumer.
#[derive(Debug, Clone)]
pub struct OAuth1Signer {
    consumer: ConsumerCredential,
    method: SignatureMethod,
}

impl OAuth1Signer {
    pub fn new(consumer: ConsumerCredential, method: SignatureMethod) -> Self {
        Self { consumer, method }
    }

    pub fn consumer(&self) -> &ConsumerCredential {
        &self.consumer
    }

    pub fn method(&self) -> SignatureMethod {
        self.method
    }

    /// Build the `Authorization` header for a request, with a fresh nonce and
    /// the current timestamp.
    ///
    /// `oauth_params` are protocol parameters specific to the call
    /// (`oauth_callback`, `oauth_verifier`); `body_params` are form parameters
    /// sent in an `application/x-www-form-urlencoded` body. Query parameters of
    /// `url` are always signed.
    pub fn authorization_header(
        &self,
        http_method: &str,
        url: &Url,
        token: Option<TokenRef<'_>>,
        oauth_params: &[(&str, &str)],
        body_params: &[(&str, &str)],
    ) -> OAuth1Result<String> {
        let nonce = Uuid::new_v4().simple().to_string();
        let timestamp = Utc::now().timestamp();
        self.authorization_header_at(
            http_method,
            url,
            token,
            oauth_params,
            body_params,
            &nonce,
            timestamp,
        )
    }

    #[allow(clippy::too_many_arguments)]
    pub fn authorization_header_at(
        &self,
        http_method: &str,
        url: &Url,
        token: Option<TokenRef<'_>>,
        oauth_params: &[(&str, &str)],
        body_params: &[(&str, &str)],
        nonce: &str,
        timestamp: i64,
    ) -> OAuth1Result<String> {
        let timestamp = timestamp.to_string();

        let mut protocol: Vec<(String, String)> = vec![
            (params::OAUTH_CONSUMER_KEY.into(), self.consumer.key.clone()),
            (params::OAUTH_NONCE.into(), nonce.to_string()),
            (
                params::OAUTH_SIGNATURE_METHOD.into(),
                self.method.as_str().to_string(),
            ),
            (params::OAUTH_TIMESTAMP.into(), timestamp),
            (params::OAUTH_VERSION.into(), "1.0".to_string()),
        ];
        if let Some(token) = token {
            protocol.push((params::OAUTH_TOKEN.into(), token.token.to_string()));
        }
        protocol.extend(
            oauth_params
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string())),
        );

        let mut signed: Vec<(String, String)> = protocol.clone();
        signed.extend(url.query_pairs().map(|(k, v)| (k.into_owned(), v.into_owned())));
        signed.extend(
            body_params
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string())),
        );

        let base_string = signature_base_string(http_method, url, &signed);
        let signature = self.sign(&base_string, token.map(|t| t.secret))?;
        protocol.push((params::OAUTH_SIGNATURE.into(), signature));

        protocol.sort();
        let fields: Vec<String> = protocol
            .iter()
            .map(|(k, v)| format!("{}=\"{}\"", percent_encode(k), percent_encode(v)))
            .collect();

        Ok(format!("OAuth {}", fields.join(", ")))
    }

    /// Sign a base string with the consumer secret and optional token secret.
    pub fn sign(&self, base_string: &str, token_secret: Option<&str>) -> OAuth1Result<String> {
        let key = format!(
            "{}&{}",
            percent_encode(&self.consumer.secret),
            percent_encode(token_secret.unwrap_or(""))
        );

        match self.method {
            SignatureMethod::Plaintext => Ok(key),
            SignatureMethod::HmacSha1 => {
                let mut mac = HmacSha1::new_from_slice(key.as_bytes())
                    .map_err(|e| OAuth1Error::ConfigError(format!("invalid signing key: {}", e)))?;
                mac.update(base_string.as_bytes());
                Ok(STANDARD.encode(mac.finalize().into_bytes()))
            }
        }
    }
}

/// The base string: method, base URI and normalized parameters, each
/// percent-encoded and joined with `&`.
pub fn signature_base_string(http_method: &str, url: &Url, params: &[(String, String)]) -> String {
    format!(
        "{}&{}&{}",
        http_method.to_ascii_uppercase(),
        percent_encode(&base_string_uri(url)),
        percent_encode(&normalize_parameters(params))
    )
}

/// Scheme and host lowercased, default port dropped, no query or fragment.
fn base_string_uri(url: &Url) -> String {
    let host = url.host_str().unwrap_or_default().to_ascii_lowercase();
    match url.port() {
        Some(port) => format!("{}://{}:{}{}", url.scheme(), host, port, url.path()),
        None => format!("{}://{}{}", url.scheme(), host, url.path()),
    }
}

fn normalize_parameters(params: &[(String, String)]) -> String {
    let mut encoded: Vec<(String, String)> = params
        .iter()
        .map(|(k, v)| (percent_encode(k), percent_encode(v)))
        .collect();
    encoded.sort();

    encoded
        .iter()
        .map(|(k, v)| format!("{}={}", k, v))
        .collect::<Vec<_>>()
        .join("&")
}

/// Parse the parameters of an `OAuth ...` authorization header.
pub fn parse_authorization_header(header: &str) -> HashMap<String, String> {
    let fields = header.trim().strip_prefix("OAuth").unwrap_or(header);

    fields
        .split(',')
        .filter_map(|field| {
            let (key, value) = field.trim().split_once('=')?;
            let value = value.trim().trim_matches('"');
            let key = percent_decode_str(key.trim()).decode_utf8().ok()?;
            let value = percent_decode_str(value).decode_utf8().ok()?;
            Some((key.into_owned(), value.into_owned()))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn twitter_signer(method: SignatureMethod) -> OAuth1Signer {
        OAuth1Signer::new(
            ConsumerCredential::new(
                "xvz1evFS4wEEPTGEFPHBog",
                "kAcSOqF21Fu85e7zjz7ZN2U4ZRhfV3WpwPAoE3Z7kBw",
            ),
            method,
        )
    }

    const TOKEN: TokenRef<'static> = TokenRef {
        token: "370773112-GmHxMAgYyLbNEtIKZeRNFsMKPR9EyMZeS9weJAEb",
        secret: "LswwdoUaIvS8ltyTt5jkRh4J50vUPVVHtR2YPi5kE",
    };

    #[test]
    fn test_percent_encoding() {
        assert_eq!(percent_encode("Ladies + Gentlemen"), "Ladies%20%2B%20Gentlemen");
        assert_eq!(percent_encode("An encoded string!"), "An%20encoded%20string%21");
        assert_eq!(percent_encode("Dogs, Cats & Mice"), "Dogs%2C%20Cats%20%26%20Mice");
        assert_eq!(percent_encode("-._~"), "-._~");
        assert_eq!(percent_encode("☃"), "%E2%98%83");
    }

    #[test]
    fn test_signature_base_string() {
        let url = Url::parse("https://api.twitter.com/1.1/statuses/update.json?include_entities=true")
            .unwrap();
        let params: Vec<(String, String)> = [
            ("status", "Hello Ladies + Gentlemen, a signed OAuth request!"),
            ("include_entities", "true"),
            ("oauth_consumer_key", "xvz1evFS4wEEPTGEFPHBog"),
            ("oauth_nonce", "kYjzVBB8Y0ZFabxSWbWovY3uYSQ2pTgmZeNu2VS4cg"),
            ("oauth_signature_method", "HMAC-SHA1"),
            ("oauth_timestamp", "1318622958"),
            ("oauth_token", TOKEN.token),
            ("oauth_version", "1.0"),
        ]
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();

        let base = signature_base_string("post", &url, &params);
        assert_eq!(
            base,
            "POST&https%3A%2F%2Fapi.twitter.com%2F1.1%2Fstatuses%2Fupdate.json&include_entities%3Dtrue%26oauth_consumer_key%3Dxvz1evFS4wEEPTGEFPHBog%26oauth_nonce%3DkYjzVBB8Y0ZFabxSWbWovY3uYSQ2pTgmZeNu2VS4cg%26oauth_signature_method%3DHMAC-SHA1%26oauth_timestamp%3D1318622958%26oauth_token%3D370773112-GmHxMAgYyLbNEtIKZeRNFsMKPR9EyMZeS9weJAEb%26oauth_version%3D1.0%26status%3DHello%2520Ladies%2520%252B%2520Gentlemen%252C%2520a%2520signed%2520OAuth%2520request%2521"
        );
    }

    #[test]
    fn test_hmac_sha1_signature() {
        let signer = twitter_signer(SignatureMethod::HmacSha1);
        let url = Url::parse("https://api.twitter.com/1.1/statuses/update.json?include_entities=true")
            .unwrap();

        let header = signer
            .authorization_header_at(
                "POST",
                &url,
                Some(TOKEN),
                &[],
                &[("status", "Hello Ladies + Gentlemen, a signed OAuth request!")],
                "kYjzVBB8Y0ZFabxSWbWovY3uYSQ2pTgmZeNu2VS4cg",
                1318622958,
            )
            .unwrap();

        let fields = parse_authorization_header(&header);
        assert_eq!(fields["oauth_signature"], "hCtSmYh+iHYCEqBWrE7C7hYmtUk=");
        assert!(header.starts_with("OAuth "));
        assert!(header.contains("oauth_signature=\"hCtSmYh%2BiHYCEqBWrE7C7hYmtUk%3D\""));
        assert!(!header.contains("include_entities"));
        assert!(!header.contains("status"));
    }

    #[test]
    fn test_plaintext_signature() {
        let signer = OAuth1Signer::new(
            ConsumerCredential::new("key", "consumer&secret"),
            SignatureMethod::Plaintext,
        );

        assert_eq!(
            signer.sign("ignored", Some("token secret")).unwrap(),
            "consumer%26secret&token%20secret"
        );
        assert_eq!(signer.sign("ignored", None).unwrap(), "consumer%26secret&");
    }

    #[test]
    fn test_header_carries_protocol_parameters() {
        let signer = twitter_signer(SignatureMethod::HmacSha1);
        let url = Url::parse("https://api.twitter.com/oauth/request_token").unwrap();

        let header = signer
            .authorization_header(
                "POST",
                &url,
                None,
                &[("oauth_callback", "https://app.example.com/auth?x=1")],
                &[],
            )
            .unwrap();

        let fields = parse_authorization_header(&header);
        assert_eq!(fields["oauth_consumer_key"], "xvz1evFS4wEEPTGEFPHBog");
        assert_eq!(fields["oauth_callback"], "https://app.example.com/auth?x=1");
        assert_eq!(fields["oauth_signature_method"], "HMAC-SHA1");
        assert_eq!(fields["oauth_version"], "1.0");
        assert!(!fields.contains_key("oauth_token"));
        assert!(!fields["oauth_nonce"].is_empty());
        assert!(fields["oauth_timestamp"].parse::<i64>().is_ok());
    }

    #[test]
    fn test_nonce_is_fresh_per_request() {
        let signer = twitter_signer(SignatureMethod::HmacSha1);
        let url = Url::parse("https://api.twitter.com/oauth/request_token").unwrap();

        let first = signer
            .authorization_header("POST", &url, None, &[], &[])
            .unwrap();
        let second = signer
            .authorization_header("POST", &url, None, &[], &[])
            .unwrap();

        assert_ne!(
            parse_authorization_header(&first)["oauth_nonce"],
            parse_authorization_header(&second)["oauth_nonce"]
        );
    }

    #[test]
    fn test_base_uri_normalization() {
        let url = Url::parse("HTTP://Example.COM:80/r%20v/X?id=123").unwrap();
        assert_eq!(base_string_uri(&url), "http://example.com/r%20v/X");

        let url = Url::parse("https://www.example.net:8080/?q=1").unwrap();
        assert_eq!(base_string_uri(&url), "https://www.example.net:8080/");
    }
}
