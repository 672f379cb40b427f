//! CSRF state-token guard
//!
//! Binds an authorization redirect to the browser that initiated it:
//! `/login` issues a random state value in a short-lived cookie and in
//! the authorize URL; the callback accepts the request only when the
//! two values match exactly. The cookie is removed on the first
//! validation attempt regardless of outcome, so a state value is
//! single-use even within its cookie lifetime.

use axum_extra::extract::CookieJar;
use axum_extra::extract::cookie::{Cookie, SameSite};
use uuid::Uuid;

use crate::error::AppError;

/// Name of the anti-forgery state cookie
pub const STATE_COOKIE: &str = "github_auth_state";

/// Generate a fresh state token and the cookie carrying it.
///
/// The cookie is session-scoped; its effective lifetime is one
/// redirect round trip because the callback always removes it.
pub fn issue(jar: CookieJar, secure_cookies: bool) -> (String, CookieJar) {
    let state = Uuid::new_v4().to_string();

    let mut cookie = Cookie::new(STATE_COOKIE, state.clone());
    cookie.set_path("/");
    cookie.set_http_only(true);
    cookie.set_same_site(SameSite::Lax);
    cookie.set_secure(secure_cookies);

    (state, jar.add(cookie))
}

/// Validate the callback's `state` parameter against the cookie.
///
/// Succeeds iff both values are present, non-empty, and equal.
///
/// # Errors
/// `StateMismatch` otherwise; callers redirect home without touching
/// the token endpoint.
pub fn validate(provided: Option<&str>, jar: &CookieJar) -> Result<(), AppError> {
    let saved = jar.get(STATE_COOKIE).map(|cookie| cookie.value());

    match (provided, saved) {
        (Some(provided), Some(saved)) if !provided.is_empty() && provided == saved => Ok(()),
        _ => Err(AppError::StateMismatch),
    }
}

/// Remove the state cookie so the value cannot be replayed
pub fn remove(jar: CookieJar) -> CookieJar {
    let mut cookie = Cookie::new(STATE_COOKIE, "");
    cookie.set_path("/");
    jar.remove(cookie)
}
