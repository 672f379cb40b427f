//! Server-side session store
//!
//! Sessions live in a TTL-bounded in-memory map keyed by an opaque
//! UUID. The browser only ever holds that id, HMAC-signed, in the
//! `sid` cookie; the access token never leaves the server.

use axum::{
    async_trait,
    extract::{FromRef, FromRequestParts},
    http::request::Parts,
};
use axum_extra::extract::CookieJar;
use axum_extra::extract::cookie::{Cookie, SameSite};
use chrono::{DateTime, Utc};
use moka::future::Cache;
use std::time::Duration;
use uuid::Uuid;

use crate::AppState;
use crate::error::AppError;

/// Name of the session-id cookie
pub const SESSION_COOKIE: &str = "sid";

/// Per-browser session record
///
/// `token` is set by the OAuth callback and cleared on logout. An
/// absent token is identical to a never-authenticated session.
#[derive(Debug, Clone)]
pub struct Session {
    /// Opaque session id (UUIDv4)
    pub id: String,
    /// GitHub access token, when authenticated
    pub token: Option<String>,
    /// When the session was created
    pub created_at: DateTime<Utc>,
}

impl Session {
    fn new() -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            token: None,
            created_at: Utc::now(),
        }
    }

    /// Whether this session holds an access token
    pub fn is_authenticated(&self) -> bool {
        self.token.is_some()
    }
}

/// In-memory session store with server-side expiry
pub struct SessionStore {
    sessions: Cache<String, Session>,
    secret: String,
    secure_cookies: bool,
}

impl SessionStore {
    /// Create a session store
    ///
    /// # Arguments
    /// * `max_age_secs` - server-side session lifetime
    /// * `secret` - HMAC secret for the `sid` cookie signature
    /// * `secure_cookies` - set the `Secure` attribute on cookies
    pub fn new(max_age_secs: u64, secret: impl Into<String>, secure_cookies: bool) -> Self {
        let sessions = Cache::builder()
            .time_to_live(Duration::from_secs(max_age_secs))
            .build();

        Self {
            sessions,
            secret: secret.into(),
            secure_cookies,
        }
    }

    /// Get a session by id
    pub async fn get(&self, id: &str) -> Option<Session> {
        self.sessions.get(id).await
    }

    /// Insert or update a session
    pub async fn persist(&self, session: Session) {
        self.sessions.insert(session.id.clone(), session).await;
    }

    /// Create and persist a fresh anonymous session
    pub async fn create(&self) -> Session {
        let session = Session::new();
        self.persist(session.clone()).await;
        session
    }

    /// Drop a session by id
    pub async fn remove(&self, id: &str) {
        self.sessions.invalidate(id).await;
    }

    /// Load the session referenced by the `sid` cookie, if any.
    ///
    /// A missing cookie, a bad signature, or an expired/unknown id all
    /// read as "no session".
    pub async fn load(&self, jar: &CookieJar) -> Option<Session> {
        let cookie = jar.get(SESSION_COOKIE)?;
        let id = verify_session_cookie(cookie.value(), &self.secret).ok()?;
        self.get(&id).await
    }

    /// Load the current session or create a fresh one, returning the
    /// jar with the `sid` cookie set when a session was created.
    pub async fn ensure(&self, jar: CookieJar) -> Result<(Session, CookieJar), AppError> {
        if let Some(session) = self.load(&jar).await {
            return Ok((session, jar));
        }

        let session = self.create().await;
        let jar = jar.add(self.cookie_for(&session)?);
        Ok((session, jar))
    }

    /// Replace a session id with a freshly issued one.
    ///
    /// The old record is dropped so the previous id stops working
    /// immediately; used on login (fixation defense) and on logout.
    pub async fn rotate(&self, old_id: Option<&str>) -> Session {
        if let Some(id) = old_id {
            self.remove(id).await;
        }
        self.create().await
    }

    /// Build the signed `sid` cookie for a session
    pub fn cookie_for(&self, session: &Session) -> Result<Cookie<'static>, AppError> {
        let value = sign_session_id(&session.id, &self.secret)?;
        let mut cookie = Cookie::new(SESSION_COOKIE, value);
        cookie.set_path("/");
        cookie.set_http_only(true);
        cookie.set_same_site(SameSite::Lax);
        cookie.set_secure(self.secure_cookies);
        Ok(cookie)
    }
}

/// Sign a session id for cookie transport
///
/// Cookie value format: `{id}.base64(hmac_sha256(id))`
pub fn sign_session_id(id: &str, secret: &str) -> Result<String, AppError> {
    use base64::{Engine as _, engine::general_purpose};
    use hmac::{Hmac, Mac};
    use sha2::Sha256;

    type HmacSha256 = Hmac<Sha256>;
    let mut mac = HmacSha256::new_from_slice(secret.as_bytes())
        .map_err(|e| AppError::Internal(anyhow::anyhow!("HMAC key setup failed: {e}")))?;
    mac.update(id.as_bytes());
    let signature = mac.finalize().into_bytes();
    let signature_b64 = general_purpose::URL_SAFE_NO_PAD.encode(signature);

    Ok(format!("{}.{}", id, signature_b64))
}

/// Verify a signed cookie value and return the session id
///
/// # Errors
/// Returns `Unauthorized` if the value is malformed or the signature
/// does not verify.
pub fn verify_session_cookie(value: &str, secret: &str) -> Result<String, AppError> {
    use base64::{Engine as _, engine::general_purpose};
    use hmac::{Hmac, Mac};
    use sha2::Sha256;

    let parts: Vec<&str> = value.split('.').collect();
    if parts.len() != 2 {
        return Err(AppError::Unauthorized);
    }

    let id = parts[0];
    let signature_b64 = parts[1];

    type HmacSha256 = Hmac<Sha256>;
    let mut mac = HmacSha256::new_from_slice(secret.as_bytes())
        .map_err(|e| AppError::Internal(anyhow::anyhow!("HMAC key setup failed: {e}")))?;
    mac.update(id.as_bytes());

    let expected_signature = general_purpose::URL_SAFE_NO_PAD
        .decode(signature_b64)
        .map_err(|_| AppError::Unauthorized)?;

    mac.verify_slice(&expected_signature)
        .map_err(|_| AppError::Unauthorized)?;

    Ok(id.to_string())
}

/// Optional current session extractor
///
/// Returns None if the request carries no valid session, instead of
/// an error; protected routes decide how to react (they redirect).
#[derive(Debug, Clone)]
pub struct MaybeSession(pub Option<Session>);

#[async_trait]
impl<S> FromRequestParts<S> for MaybeSession
where
    AppState: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let app = AppState::from_ref(state);
        let jar = CookieJar::from_headers(&parts.headers);
        Ok(MaybeSession(app.sessions.load(&jar).await))
    }
}
