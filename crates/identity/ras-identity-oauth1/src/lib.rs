//! OAuth 1.0a identity provider.
//!
//! Implements the three-legged handshake (request token, user authorization,
//! access token exchange) on top of the ras-identity-core traits. Between the
//! two legs the request token is kept, encrypted, in a session-scoped
//! [`TemporaryStore`] supplied by the host. Provider-specific behaviour lives in
//! an [`IdentityMapper`]; [`twitter`] ships one for Twitter.

mod client;
mod codec;
mod config;
mod error;
mod mapper;
mod provider;
mod resource;
mod signer;
mod state;
mod types;

pub mod twitter;


pub use client::OAuth1Client;
pub use codec::StateTokenCodec;
pub use config::{OAuth1Config, OAuth1ProviderConfig, OAuth1Settings, SignatureMethod};
pub use error::{OAuth1Error, OAuth1Result};
pub use mapper::IdentityMapper;
pub use provider::OAuth1Provider;
pub use resource::ResourceClient;
pub use signer::{OAuth1Signer, parse_authorization_header, percent_encode, signature_base_string};
pub use state::{
    Clock, InMemoryTemporaryStore, ManualClock, PendingTokenStore, SystemClock, TemporaryStore,
};
pub use types::{AccessToken, ConsumerCredential, RequestToken, ServiceEndpoints, TokenRef, params};

// Re-export common types for convenience
pub use ras_identity_core::{AuthOutcome, AuthRequest, IdentityProvider, VerifiedIdentity};
