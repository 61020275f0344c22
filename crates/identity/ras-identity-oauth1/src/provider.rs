//! OAuth1 three-legged handshake driven one inbound request at a time.

use crate::client::OAuth1Client;
use crate::codec::StateTokenCodec;
use crate::config::{OAuth1Config, OAuth1ProviderConfig};
use crate::error::{OAuth1Error, OAuth1Result};
use crate::mapper::IdentityMapper;
use crate::resource::ResourceClient;
use crate::signer::OAuth1Signer;
use crate::state::{PendingTokenStore, TemporaryStore};
use crate::types::{ServiceEndpoints, params};
use async_trait::async_trait;
use chrono::Duration;
use ras_identity_core::{
    AuthOutcome, AuthRequest, IdentityProvider, IdentityResult, VerifiedIdentity,
};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// An OAuth1 identity provider for one configured service.
///
/// Each call to [`authenticate`](Self::authenticate) looks at the inbound
/// request and either starts a handshake (returning a redirect to the
/// provider's consent page) or completes one (returning the mapped identity).
pub struct OAuth1Provider<M> {
    config: OAuth1ProviderConfig,
    endpoints: ServiceEndpoints,
    client: OAuth1Client,
    pending: PendingTokenStore,
    mapper: M,
}

impl<M: IdentityMapper> OAuth1Provider<M> {
    pub fn new(
        provider_config: OAuth1ProviderConfig,
        config: &OAuth1Config,
        store: Arc<dyn TemporaryStore>,
        mapper: M,
    ) -> OAuth1Result<Self> {
        provider_config.validate()?;
        config.validate()?;

        let signer = OAuth1Signer::new(
            provider_config.consumer(),
            provider_config.signature_method,
        );
        let client = OAuth1Client::new(signer, config.http_timeout_seconds)?;

        let ttl = i64::try_from(config.state_ttl_seconds)
            .ok()
            .and_then(Duration::try_seconds)
            .ok_or_else(|| {
                OAuth1Error::ConfigError(format!(
                    "state_ttl_seconds out of range: {}",
                    config.state_ttl_seconds
                ))
            })?;
        let pending = PendingTokenStore::new(
            store,
            StateTokenCodec::new(&config.state_secret),
            &provider_config.provider_id,
            ttl,
        );

        Ok(Self {
            endpoints: provider_config.endpoints(),
            config: provider_config,
            client,
            pending,
            mapper,
        })
    }

    pub fn provider_id(&self) -> &str {
        &self.config.provider_id
    }

    pub fn mapper(&self) -> &M {
        &self.mapper
    }

    /// A client for signed requests with tokens issued by this provider.
    pub fn resources(&self) -> ResourceClient {
        ResourceClient::new(self.client.clone())
    }

    pub async fn authenticate(
        &self,
        request: &AuthRequest,
    ) -> OAuth1Result<AuthOutcome<M::Identity>> {
        debug!(
            provider = %self.config.provider_id,
            path = request.url.path(),
            "OAuth1 request received"
        );

        self.check_error(request)?;

        match request.query_param(params::OAUTH_VERIFIER) {
            Some(verifier) => self.complete_flow(request, &verifier).await,
            None => self.start_flow(request).await,
        }
    }

    /// A callback carrying `oauth_problem` ends the flow before anything else
    /// is looked at.
    fn check_error(&self, request: &AuthRequest) -> OAuth1Result<()> {
        let Some(problem) = request.query_param(params::OAUTH_PROBLEM) else {
            return Ok(());
        };

        if problem == params::OAUTH_ACCESS_DENIED {
            info!(
                "User denied access at provider {}",
                self.config.provider_id
            );
            Err(OAuth1Error::AccessDenied {
                provider: self.config.provider_id.clone(),
            })
        } else {
            warn!(
                "Provider {} reported problem: {}",
                self.config.provider_id, problem
            );
            Err(OAuth1Error::AuthError(problem))
        }
    }

    async fn start_flow(&self, request: &AuthRequest) -> OAuth1Result<AuthOutcome<M::Identity>> {
        let callback_url = self.callback_url(request);

        let request_token = self
            .client
            .request_token(&self.endpoints, &callback_url)
            .await
            .map_err(provider_rejection)?;

        self.pending
            .stash(&request.session_id, &request_token)
            .await?;

        let url = self
            .client
            .authorization_redirect(&self.endpoints, &request_token)?;

        info!(
            "Started OAuth1 flow for provider: {}",
            self.config.provider_id
        );
        Ok(AuthOutcome::Redirect { url })
    }

    async fn complete_flow(
        &self,
        request: &AuthRequest,
        verifier: &str,
    ) -> OAuth1Result<AuthOutcome<M::Identity>> {
        let request_token = self
            .pending
            .take(&request.session_id)
            .await?
            .ok_or_else(|| {
                warn!(
                    "No pending OAuth1 handshake for provider {}",
                    self.config.provider_id
                );
                OAuth1Error::StateNotFound
            })?;

        if let Some(returned) = request.query_param(params::OAUTH_TOKEN) {
            if returned != request_token.token {
                warn!(
                    "Callback token {} does not match pending token {}",
                    returned, request_token.token
                );
                return Err(OAuth1Error::InvalidState);
            }
        }

        let access_token = self
            .client
            .access_token(&self.endpoints, &request_token, verifier)
            .await
            .map_err(provider_rejection)?;

        let resources = self.resources();
        let info = self.mapper.build_info(access_token, &resources).await?;
        let identity = self.mapper.transform(info).await?;

        info!(
            "Successfully verified identity for provider: {}",
            self.config.provider_id
        );
        Ok(AuthOutcome::Authenticated(identity))
    }

    fn callback_url(&self, request: &AuthRequest) -> String {
        match &self.config.callback_url {
            Some(url) => url.clone(),
            None => request.url_without_query().to_string(),
        }
    }
}

/// Token endpoint failures surface as authentication failures.
fn provider_rejection(error: OAuth1Error) -> OAuth1Error {
    match error {
        OAuth1Error::ProviderError(message) => OAuth1Error::AuthError(message),
        other => other,
    }
}

#[async_trait]
impl<M> IdentityProvider for OAuth1Provider<M>
where
    M: IdentityMapper<Identity = VerifiedIdentity>,
{
    fn provider_id(&self) -> &str {
        &self.config.provider_id
    }

    async fn authenticate(&self, request: &AuthRequest) -> IdentityResult<AuthOutcome> {
        OAuth1Provider::authenticate(self, request)
            .await
            .map_err(Into::into)
    }
}
