//! GitHub OAuth flow
//!
//! Implements the OAuth 2.0 authorization code flow with GitHub.
//! The callback is a straight-line pipeline: validate state, exchange
//! the code, rotate the session id, persist the token, redirect. Each
//! failure short-circuits to a redirect back to the home route.

use axum::{
    Router,
    extract::{Query, State},
    response::{IntoResponse, Redirect, Response},
    routing::get,
};
use axum_extra::extract::CookieJar;
use serde::Deserialize;

use super::state;
use crate::AppState;
use crate::error::AppError;

/// Create authentication router
///
/// Routes:
/// - GET /login - Issue state, redirect to GitHub
/// - GET /callback - OAuth callback
/// - GET /logout - Clear token, rotate session
pub fn auth_router() -> Router<AppState> {
    Router::new()
        .route("/login", get(login))
        .route("/callback", get(callback))
        .route("/logout", get(logout))
}

/// GET /login
///
/// Issues a one-time state token, stores it in the state cookie, and
/// redirects the browser to GitHub's authorization page with
/// `client_id`, `scope` and `state`.
async fn login(State(app): State<AppState>, jar: CookieJar) -> (CookieJar, Redirect) {
    let (state_token, jar) = state::issue(jar, app.config.should_use_secure_cookies());
    let authorize_url = app.github.authorize_redirect_url(&state_token);

    tracing::debug!("issued OAuth state, redirecting to authorize endpoint");
    (jar, Redirect::to(&authorize_url))
}

/// Query parameters from the GitHub callback
#[derive(Debug, Deserialize)]
struct CallbackQuery {
    /// Authorization code
    code: Option<String>,
    /// CSRF state token
    state: Option<String>,
}

/// GET /callback
///
/// Handles the OAuth callback from GitHub.
///
/// # Steps
/// 1. Remove the state cookie (single-use, regardless of outcome)
/// 2. Verify the `state` parameter against the removed cookie value
/// 3. Exchange the code for an access token
/// 4. Rotate the session id, then store the token
/// 5. Redirect to /repos
///
/// A state mismatch redirects home silently; an exchange failure is
/// logged and also redirects home. No error page is ever rendered.
async fn callback(
    State(app): State<AppState>,
    Query(query): Query<CallbackQuery>,
    jar: CookieJar,
) -> Result<Response, AppError> {
    let outcome = state::validate(query.state.as_deref(), &jar);
    let old_session_id = app.sessions.load(&jar).await.map(|session| session.id);
    // The state value is spent the moment the callback sees it.
    let jar = state::remove(jar);

    if outcome.is_err() {
        tracing::debug!("OAuth state mismatch, redirecting to home");
        return Ok((jar, Redirect::to("/")).into_response());
    }

    let code = match query.code.as_deref() {
        Some(code) if !code.is_empty() => code,
        _ => {
            tracing::debug!("OAuth callback without authorization code");
            return Ok((jar, Redirect::to("/")).into_response());
        }
    };

    let token = match app.github.exchange_code(code).await {
        Ok(token) => token,
        Err(error) => {
            tracing::error!(%error, "token exchange failed");
            return Ok((jar, Redirect::to("/")).into_response());
        }
    };

    // Rotate before the token write so a pre-login session id never
    // becomes an authenticated one (session fixation).
    let mut session = app.sessions.rotate(old_session_id.as_deref()).await;
    session.token = Some(token);
    app.sessions.persist(session.clone()).await;
    let jar = jar.add(app.sessions.cookie_for(&session)?);

    tracing::info!("login completed, session established");
    Ok((jar, Redirect::to("/repos")).into_response())
}

/// GET /logout
///
/// Drops the current session entirely and issues a fresh anonymous
/// one, so the old id stops working immediately rather than lingering
/// until natural expiry. Always redirects home.
async fn logout(
    State(app): State<AppState>,
    jar: CookieJar,
) -> Result<(CookieJar, Redirect), AppError> {
    let old_session_id = app.sessions.load(&jar).await.map(|session| session.id);
    if old_session_id.is_some() {
        tracing::info!("logout, session rotated");
    }

    let fresh = app.sessions.rotate(old_session_id.as_deref()).await;
    let jar = jar.add(app.sessions.cookie_for(&fresh)?);

    Ok((jar, Redirect::to("/")))
}
