//! OAuth1 client: token endpoints, authorization redirect and signed GETs.

use crate::error::{OAuth1Error, OAuth1Result};
use crate::signer::OAuth1Signer;
use crate::types::{AccessToken, RequestToken, ServiceEndpoints, params};
use reqwest::{Client, Response, header::AUTHORIZATION};
use std::collections::HashMap;
use std::time::Duration;
use tracing::{debug, error, info, warn};
use url::Url;

/// OAuth1 client bound to one consumer
#[derive(Clone)]
pub struct OAuth1Client {
    http_client: Client,
    signer: OAuth1Signer,
}

impl OAuth1Client {
    pub fn new(signer: OAuth1Signer, http_timeout_seconds: u64) -> OAuth1Result<Self> {
        let http_client = Client::builder()
            .timeout(Duration::from_secs(http_timeout_seconds))
            .build()
            .map_err(|e| OAuth1Error::ConfigError(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            http_client,
            signer,
        })
    }

    pub fn signer(&self) -> &OAuth1Signer {
        &self.signer
    }

    /// Obtain temporary credentials, announcing `callback_url` as the return
    /// address.
    pub async fn request_token(
        &self,
        endpoints: &ServiceEndpoints,
        callback_url: &str,
    ) -> OAuth1Result<RequestToken> {
        let url = Url::parse(&endpoints.request_token_url)?;
        let header = self.signer.authorization_header(
            "POST",
            &url,
            None,
            &[(params::OAUTH_CALLBACK, callback_url)],
            &[],
        )?;

        let fields = self.token_call(url, header, "request token").await?;

        if let Some(confirmed) = fields.get(params::OAUTH_CALLBACK_CONFIRMED) {
            if confirmed != "true" {
                return Err(OAuth1Error::ProviderError(
                    "Provider did not confirm the callback URL".to_string(),
                ));
            }
        } else {
            warn!("Request token response lacks oauth_callback_confirmed");
        }

        let (token, secret, _) = split_token_fields(fields, "request token")?;
        info!("Obtained request token");
        Ok(RequestToken { token, secret })
    }

    /// The URL to send the user to for consent: the authorization URL with
    /// `oauth_token` appended to its query.
    ///
    /// The URL is normalized on the way through, so a bare origin gains a `/`
    /// path (`https://host` becomes `https://host/?oauth_token=..`) and an
    /// existing query is kept.
    pub fn authorization_redirect(
        &self,
        endpoints: &ServiceEndpoints,
        request_token: &RequestToken,
    ) -> OAuth1Result<String> {
        let mut url = Url::parse(&endpoints.authorization_url)?;
        url.query_pairs_mut()
            .append_pair(params::OAUTH_TOKEN, &request_token.token);
        Ok(url.to_string())
    }

    /// Exchange an authorized request token and its verifier for token
    /// credentials.
    pub async fn access_token(
        &self,
        endpoints: &ServiceEndpoints,
        request_token: &RequestToken,
        verifier: &str,
    ) -> OAuth1Result<AccessToken> {
        let url = Url::parse(&endpoints.access_token_url)?;
        let header = self.signer.authorization_header(
            "POST",
            &url,
            Some(request_token.as_token_ref()),
            &[(params::OAUTH_VERIFIER, verifier)],
            &[],
        )?;

        let fields = self.token_call(url, header, "access token").await?;
        let (token, secret, extra) = split_token_fields(fields, "access token")?;

        info!("Successfully exchanged verifier for access token");
        Ok(AccessToken {
            token,
            secret,
            params: extra,
        })
    }

    /// Signed GET against a protected resource, parsed as JSON.
    pub async fn signed_get(
        &self,
        url: &str,
        access_token: &AccessToken,
    ) -> OAuth1Result<serde_json::Value> {
        let url = Url::parse(url).map_err(|e| {
            OAuth1Error::ResourceRequestFailed(format!("invalid URL {}: {}", url, e))
        })?;
        let header = self.signer.authorization_header(
            "GET",
            &url,
            Some(access_token.as_token_ref()),
            &[],
            &[],
        )?;

        debug!("Signed GET {}", url);
        let response = self
            .http_client
            .get(url.clone())
            .header(AUTHORIZATION, header)
            .send()
            .await
            .map_err(|e| {
                error!("Resource request to {} failed: {}", url, e);
                OAuth1Error::ResourceRequestFailed(e.to_string())
            })?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| OAuth1Error::ResourceRequestFailed(e.to_string()))?;

        if !status.is_success() {
            error!("Resource request to {} returned {}", url, status);
            return Err(OAuth1Error::ResourceRequestFailed(format!(
                "HTTP {}: {}",
                status, body
            )));
        }

        serde_json::from_str(&body)
            .map_err(|e| OAuth1Error::ResourceRequestFailed(format!("invalid JSON body: {}", e)))
    }

    async fn token_call(
        &self,
        url: Url,
        header: String,
        what: &str,
    ) -> OAuth1Result<HashMap<String, String>> {
        let response = self
            .http_client
            .post(url)
            .header(AUTHORIZATION, header)
            .send()
            .await
            .map_err(|e| {
                error!("{} request failed: {}", what, e);
                OAuth1Error::ProviderError(e.to_string())
            })?;

        parse_token_response(response, what).await
    }
}

async fn parse_token_response(
    response: Response,
    what: &str,
) -> OAuth1Result<HashMap<String, String>> {
    let status = response.status();
    let body = response
        .text()
        .await
        .map_err(|e| OAuth1Error::ProviderError(e.to_string()))?;
    let fields = parse_form(&body);

    if !status.is_success() {
        error!("{} request returned {}: {}", what, status, body);
        let message = fields
            .get(params::OAUTH_PROBLEM)
            .cloned()
            .unwrap_or_else(|| format!("HTTP {}: {}", status, body));
        return Err(OAuth1Error::ProviderError(message));
    }

    Ok(fields)
}

fn parse_form(body: &str) -> HashMap<String, String> {
    url::form_urlencoded::parse(body.trim().as_bytes())
        .into_owned()
        .collect()
}

fn split_token_fields(
    mut fields: HashMap<String, String>,
    what: &str,
) -> OAuth1Result<(String, String, HashMap<String, String>)> {
    let token = fields
        .remove(params::OAUTH_TOKEN)
        .filter(|t| !t.is_empty())
        .ok_or_else(|| {
            OAuth1Error::ProviderError(format!("Malformed {} response: missing oauth_token", what))
        })?;
    let secret = fields.remove(params::OAUTH_TOKEN_SECRET).ok_or_else(|| {
        OAuth1Error::ProviderError(format!(
            "Malformed {} response: missing oauth_token_secret",
            what
        ))
    })?;
    fields.remove(params::OAUTH_CALLBACK_CONFIRMED);
    Ok((token, secret, fields))
}
