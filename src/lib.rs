//! Repogate - a GitHub OAuth gateway that lists the signed-in user's
//! repositories
//!
//! # Architecture
//!
//! ```text
//! browser -> /login    (state issued, redirect to GitHub)
//!         -> /callback (state validated, code exchanged, session stores token)
//!         -> /repos    (token from session; repo cache short-circuits the fetch)
//! ```
//!
//! # Modules
//!
//! - `api`: HTML page handlers
//! - `auth`: OAuth flow, CSRF state guard, session store
//! - `github`: upstream client (token exchange, repository fetch)
//! - `data`: in-memory repository cache
//! - `config`: configuration management
//! - `error`: error types

pub mod api;
pub mod auth;
pub mod config;
pub mod data;
pub mod error;
pub mod github;

use std::sync::Arc;

/// Application state shared across all handlers
///
/// This struct is cloned for each request and contains the session
/// store, the repository cache, and the upstream client.
#[derive(Clone)]
pub struct AppState {
    /// Application configuration
    pub config: Arc<config::AppConfig>,

    /// Server-side session store (volatile)
    pub sessions: Arc<auth::SessionStore>,

    /// Repository-list cache (volatile, per session)
    pub repo_cache: Arc<data::RepoListCache>,

    /// Upstream GitHub client
    pub github: Arc<github::GitHubClient>,
}

impl AppState {
    /// Initialize application state
    ///
    /// # Steps
    /// 1. Build the outbound HTTP client
    /// 2. Build the GitHub client from configuration
    /// 3. Initialize the session store and repository cache
    ///
    /// # Errors
    /// Returns error if any initialization step fails
    pub fn new(config: config::AppConfig) -> Result<Self, error::AppError> {
        tracing::info!("Initializing application state...");

        let http_client = reqwest::Client::builder()
            .user_agent(concat!("repogate/", env!("CARGO_PKG_VERSION")))
            .timeout(std::time::Duration::from_secs(30))
            .build()
            .map_err(|e| error::AppError::Internal(e.into()))?;

        let github = github::GitHubClient::new(http_client, &config.github)?;
        tracing::info!("GitHub client initialized");

        let sessions = auth::SessionStore::new(
            config.auth.session_max_age as u64,
            config.auth.session_secret.clone(),
            config.should_use_secure_cookies(),
        );
        let repo_cache = data::RepoListCache::new(config.cache.repo_ttl);
        tracing::info!("Session store and repository cache initialized");

        Ok(Self {
            config: Arc::new(config),
            sessions: Arc::new(sessions),
            repo_cache: Arc::new(repo_cache),
            github: Arc::new(github),
        })
    }
}

/// Build the Axum router with all routes.
///
/// This is shared by the binary and integration tests to keep route
/// composition consistent across environments.
pub fn build_router(state: AppState) -> axum::Router {
    use axum::Router;
    use tower_http::{compression::CompressionLayer, trace::TraceLayer};

    Router::new()
        .route("/health", axum::routing::get(health_check))
        .merge(api::pages_router())
        .merge(auth::auth_router())
        .layer(CompressionLayer::new())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn health_check() -> &'static str {
    "OK"
}
