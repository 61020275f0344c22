//! Sign in with Twitter over OAuth 1.0a.
//!
//! Configure through `oauth1.toml` or the environment:
//!
//! ```text
//! OAUTH1__OAUTH1__STATE_SECRET=... \
//! OAUTH1__PROVIDERS__TWITTER__PROVIDER_ID=twitter \
//! OAUTH1__PROVIDERS__TWITTER__CONSUMER_KEY=... \
//! ...
//! cargo run --example twitter_oauth1
//! ```
//!
//! When no `twitter` provider is configured, the consumer key and secret are
//! read from `TWITTER_CONSUMER_KEY` / `TWITTER_CONSUMER_SECRET` and Twitter's
//! public endpoints are used. Then open http://localhost:3000/auth/twitter.

use axum::{
    Json, Router,
    extract::State,
    http::{HeaderMap, StatusCode, Uri, header},
    response::{IntoResponse, Redirect, Response},
    routing::get,
};
use ras_identity_oauth1::twitter::{TwitterMapper, twitter_config};
use ras_identity_oauth1::{
    AuthOutcome, AuthRequest, IdentityProvider, InMemoryTemporaryStore, OAuth1Provider,
    OAuth1Settings,
};
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;
use uuid::Uuid;

const BASE_URL: &str = "http://localhost:3000";
const SESSION_COOKIE: &str = "ras_sid";

#[derive(Clone)]
struct AppState {
    provider: Arc<dyn IdentityProvider>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info,ras_identity_oauth1=debug")),
        )
        .init();

    let settings = OAuth1Settings::load(Some(Path::new("oauth1.toml")))?;
    let twitter = match settings.provider("twitter") {
        Ok(config) => config.clone(),
        Err(_) => twitter_config(
            std::env::var("TWITTER_CONSUMER_KEY").unwrap_or_else(|_| "your-consumer-key".into()),
            std::env::var("TWITTER_CONSUMER_SECRET")
                .unwrap_or_else(|_| "your-consumer-secret".into()),
        ),
    };

    let store = Arc::new(InMemoryTemporaryStore::new());
    let mapper = TwitterMapper::for_config(&twitter);
    let provider = OAuth1Provider::new(twitter, &settings.oauth1, store.clone(), mapper)?;

    // Expired handshakes are never read again; sweep them now and then.
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(Duration::from_secs(60));
        loop {
            interval.tick().await;
            let removed = store.cleanup_expired().await;
            if removed > 0 {
                info!("Removed {} expired handshake entries", removed);
            }
        }
    });

    let state = AppState {
        provider: Arc::new(provider),
    };

    let app = Router::new()
        .route("/auth/twitter", get(authenticate))
        .with_state(state);

    let listener = tokio::net::TcpListener::bind("127.0.0.1:3000").await?;
    info!("Listening on {}", BASE_URL);
    axum::serve(listener, app).await?;

    Ok(())
}

async fn authenticate(State(state): State<AppState>, headers: HeaderMap, uri: Uri) -> Response {
    let (session_id, is_new) = match session_cookie(&headers) {
        Some(id) => (id, false),
        None => (Uuid::new_v4().to_string(), true),
    };

    let request = match AuthRequest::parse(&session_id, &format!("{}{}", BASE_URL, uri)) {
        Ok(request) => request,
        Err(e) => return (StatusCode::BAD_REQUEST, e.to_string()).into_response(),
    };

    let response = match state.provider.authenticate(&request).await {
        Ok(AuthOutcome::Redirect { url }) => Redirect::to(&url).into_response(),
        Ok(AuthOutcome::Authenticated(identity)) => Json(identity).into_response(),
        Err(e) => {
            error!("Twitter sign-in failed: {}", e);
            (StatusCode::UNAUTHORIZED, e.to_string()).into_response()
        }
    };

    if is_new {
        let cookie = format!("{}={}; Path=/; HttpOnly; SameSite=Lax", SESSION_COOKIE, session_id);
        ([(header::SET_COOKIE, cookie)], response).into_response()
    } else {
        response
    }
}

fn session_cookie(headers: &HeaderMap) -> Option<String> {
    headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|value| value.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(name, _)| *name == SESSION_COOKIE)
        .map(|(_, value)| value.to_string())
}
