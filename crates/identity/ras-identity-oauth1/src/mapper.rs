//! Provider-specific identity mapping.

use crate::error::OAuth1Result;
use crate::resource::ResourceClient;
use crate::types::AccessToken;
use async_trait::async_trait;

/// What a concrete provider plugs into the handshake.
///
/// On the completion leg the handshake calls [`build_info`](Self::build_info)
/// once with the fresh access token, then [`transform`](Self::transform) once
/// with its result. The access token is not retained afterwards; whatever
/// `Info` keeps of it belongs to the caller.
#[async_trait]
pub trait IdentityMapper: Send + Sync {
    /// Provider payload built from the access token.
    type Info: Send;
    /// The application's view of the authenticated user.
    type Identity: Send;

    async fn build_info(
        &self,
        access_token: AccessToken,
        resources: &ResourceClient,
    ) -> OAuth1Result<Self::Info>;

    async fn transform(&self, info: Self::Info) -> OAuth1Result<Self::Identity>;
}
