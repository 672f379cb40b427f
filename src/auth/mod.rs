//! GitHub OAuth authentication
//!
//! Handles:
//! - The OAuth authorization-code flow
//! - CSRF state-token issuance and validation
//! - Server-side session management

mod oauth;
pub mod session;
pub mod state;

pub use oauth::auth_router;
pub use session::{MaybeSession, Session, SessionStore};
