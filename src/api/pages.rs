//! HTML pages
//!
//! The landing page and the repository listing. Pages are small
//! inline documents; user-derived text is escaped before it reaches
//! the markup.

use axum::{
    Router,
    extract::State,
    response::{Html, IntoResponse, Redirect, Response},
    routing::get,
};
use axum_extra::extract::CookieJar;
use std::sync::Arc;

use crate::AppState;
use crate::auth::MaybeSession;
use crate::error::AppError;
use crate::github::Repo;

/// Create the page router
///
/// Routes:
/// - GET / - Landing page, or redirect to /repos when signed in
/// - GET /repos - Repository listing (protected)
pub fn pages_router() -> Router<AppState> {
    Router::new()
        .route("/", get(index))
        .route("/repos", get(repos))
}

/// GET /
///
/// Renders the landing page for anonymous visitors; an authenticated
/// session is sent straight to its repository list. A visitor without
/// a session gets one here, so the `sid` cookie exists before login.
async fn index(State(app): State<AppState>, jar: CookieJar) -> Result<Response, AppError> {
    let (session, jar) = app.sessions.ensure(jar).await?;

    if session.is_authenticated() {
        return Ok((jar, Redirect::to("/repos")).into_response());
    }

    Ok((jar, Html(landing_page())).into_response())
}

/// GET /repos
///
/// Renders the repository list from the cache, falling back to a
/// fresh upstream fetch on a miss. Without an authenticated session
/// this redirects home; that is the normal unauthenticated state, not
/// an error.
async fn repos(
    State(app): State<AppState>,
    MaybeSession(session): MaybeSession,
) -> Result<Response, AppError> {
    let session = session.ok_or(AppError::Unauthorized)?;
    let token = session.token.as_deref().ok_or(AppError::Unauthorized)?;

    if let Some(repos) = app.repo_cache.get(&session.id).await {
        tracing::debug!("serving cached repository list");
        return Ok(Html(repos_page(&repos)).into_response());
    }

    let repos = Arc::new(app.github.list_repos(token).await?);
    app.repo_cache.insert(&session.id, repos.clone()).await;

    tracing::debug!(count = repos.len(), "serving fresh repository list");
    Ok(Html(repos_page(&repos)).into_response())
}

fn landing_page() -> String {
    r#"<!DOCTYPE html>
<html>
<head><title>Repogate</title></head>
<body>
    <h1>Repogate</h1>
    <p>See your GitHub repositories in one place.</p>
    <a href="/login">Sign in with GitHub</a>
</body>
</html>
"#
    .to_string()
}

fn repos_page(repos: &[Repo]) -> String {
    use html_escape::encode_text;

    let mut items = String::new();
    for repo in repos {
        let description = repo.description.as_deref().unwrap_or("");
        let visibility = if repo.private { "private" } else { "public" };
        items.push_str(&format!(
            "        <li><a href=\"{url}\">{name}</a> ({visibility}) {description}</li>\n",
            url = encode_text(&repo.html_url),
            name = encode_text(&repo.full_name),
            description = encode_text(description),
        ));
    }

    format!(
        r#"<!DOCTYPE html>
<html>
<head><title>Your repositories - Repogate</title></head>
<body>
    <h1>Your repositories</h1>
    <ul>
{items}    </ul>
    <a href="/logout">Sign out</a>
</body>
</html>
"#
    )
}
