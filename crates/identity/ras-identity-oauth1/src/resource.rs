//! Signed requests against protected provider resources.

use crate::client::OAuth1Client;
use crate::error::{OAuth1Error, OAuth1Result};
use crate::types::AccessToken;
use serde::de::DeserializeOwned;

/// Issues signed GETs with an access token obtained from a completed
/// handshake. Handed to [`IdentityMapper::build_info`](crate::IdentityMapper)
/// so providers can fetch profile data.
#[derive(Clone)]
pub struct ResourceClient {
    client: OAuth1Client,
}

impl ResourceClient {
    pub fn new(client: OAuth1Client) -> Self {
        Self { client }
    }

    pub async fn get_json(
        &self,
        url: &str,
        access_token: &AccessToken,
    ) -> OAuth1Result<serde_json::Value> {
        self.client.signed_get(url, access_token).await
    }

    pub async fn get<T: DeserializeOwned>(
        &self,
        url: &str,
        access_token: &AccessToken,
    ) -> OAuth1Result<T> {
        let value = self.get_json(url, access_token).await?;
        serde_json::from_value(value).map_err(|e| {
            OAuth1Error::ResourceRequestFailed(format!("unexpected response shape: {}", e))
        })
    }
}
