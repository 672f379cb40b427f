//! Common test utilities for E2E tests

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use axum::{
    Json, Router,
    extract::State,
    http::{HeaderMap, StatusCode},
    routing::{get, post},
};
use repogate::{AppState, config};
use tokio::net::TcpListener;

/// Access token the mock token endpoint hands out
pub const TEST_TOKEN: &str = "tok123";

/// Mock GitHub upstream
///
/// Serves the token endpoint and the repository listing on an
/// ephemeral local port, counting hits so tests can assert exactly
/// how many outbound calls the gateway made.
pub struct MockGitHub {
    pub base_url: String,
    token_hits: Arc<AtomicUsize>,
    repo_hits: Arc<AtomicUsize>,
}

#[derive(Clone)]
struct MockState {
    token_hits: Arc<AtomicUsize>,
    repo_hits: Arc<AtomicUsize>,
}

impl MockGitHub {
    /// Spawn the mock upstream on an ephemeral port
    pub async fn spawn() -> Self {
        let token_hits = Arc::new(AtomicUsize::new(0));
        let repo_hits = Arc::new(AtomicUsize::new(0));

        let app = Router::new()
            .route("/login/oauth/access_token", post(token_endpoint))
            .route("/user/repos", get(repos_endpoint))
            .with_state(MockState {
                token_hits: token_hits.clone(),
                repo_hits: repo_hits.clone(),
            });

        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        Self {
            base_url: format!("http://{}", addr),
            token_hits,
            repo_hits,
        }
    }

    /// Number of token-exchange calls received
    pub fn token_hits(&self) -> usize {
        self.token_hits.load(Ordering::SeqCst)
    }

    /// Number of repository-listing calls received
    pub fn repo_hits(&self) -> usize {
        self.repo_hits.load(Ordering::SeqCst)
    }
}

async fn token_endpoint(State(state): State<MockState>) -> Json<serde_json::Value> {
    state.token_hits.fetch_add(1, Ordering::SeqCst);
    Json(serde_json::json!({ "access_token": TEST_TOKEN }))
}

async fn repos_endpoint(
    State(state): State<MockState>,
    headers: HeaderMap,
) -> Result<Json<serde_json::Value>, StatusCode> {
    state.repo_hits.fetch_add(1, Ordering::SeqCst);

    let authorization = headers
        .get("authorization")
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default();
    if authorization != format!("token {TEST_TOKEN}") {
        return Err(StatusCode::UNAUTHORIZED);
    }

    Ok(Json(serde_json::json!([
        {
            "name": "demo",
            "full_name": "testuser/demo",
            "html_url": "https://github.com/testuser/demo",
            "description": "Demo repository",
            "private": false,
            "fork": false
        },
        {
            "name": "private-demo",
            "full_name": "testuser/private-demo",
            "html_url": "https://github.com/testuser/private-demo",
            "description": null,
            "private": true
        }
    ])))
}

/// Test server instance
pub struct TestServer {
    pub addr: String,
    pub state: AppState,
    pub client: reqwest::Client,
    pub github: MockGitHub,
}

impl TestServer {
    /// Create a test server with the default 100 s repository TTL
    pub async fn new() -> Self {
        Self::with_repo_ttl(100).await
    }

    /// Create a test server with a custom repository-cache TTL
    pub async fn with_repo_ttl(repo_ttl: u64) -> Self {
        let github = MockGitHub::spawn().await;

        let config = config::AppConfig {
            server: config::ServerConfig {
                host: "127.0.0.1".to_string(),
                port: 0, // Let OS assign port
                domain: "localhost".to_string(),
                protocol: "http".to_string(),
            },
            github: config::GitHubConfig {
                client_id: "test-client-id".to_string(),
                client_secret: "test-client-secret".to_string(),
                scope: "repo".to_string(),
                authorize_url: "https://github.com/login/oauth/authorize".to_string(),
                token_url: format!("{}/login/oauth/access_token", github.base_url),
                api_url: github.base_url.clone(),
            },
            auth: config::AuthConfig {
                session_secret: "test-secret-key-32-bytes-long!!!".to_string(),
                session_max_age: 86400,
            },
            cache: config::CacheConfig {
                repo_ttl,
                sweep_interval: 120,
            },
            logging: config::LoggingConfig {
                level: "info".to_string(),
                format: "pretty".to_string(),
            },
        };

        // Initialize app state
        let state = AppState::new(config).unwrap();

        // Create HTTP client
        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(10))
            .build()
            .unwrap();

        // Bind to random port
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let addr_str = format!("http://{}", addr);

        // Build router
        let app = repogate::build_router(state.clone());

        // Spawn server in background
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        // Wait a bit for server to start
        tokio::time::sleep(tokio::time::Duration::from_millis(100)).await;

        Self {
            addr: addr_str,
            state,
            client,
            github,
        }
    }

    /// Get base URL for requests
    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.addr, path)
    }
}

/// Client that does not follow redirects, for asserting on them
pub fn no_redirect_client() -> reqwest::Client {
    reqwest::Client::builder()
        .redirect(reqwest::redirect::Policy::none())
        .timeout(std::time::Duration::from_secs(10))
        .build()
        .expect("failed to build no-redirect client")
}

/// Extract a cookie value from a response's Set-Cookie headers
pub fn cookie_value(response: &reqwest::Response, name: &str) -> Option<String> {
    response
        .headers()
        .get_all("set-cookie")
        .iter()
        .filter_map(|v| v.to_str().ok())
        .find_map(|raw| {
            let pair = raw.split(';').next()?;
            let (cookie_name, value) = pair.split_once('=')?;
            (cookie_name.trim() == name).then(|| value.to_string())
        })
}

/// Extract the Location header from a redirect response
pub fn location(response: &reqwest::Response) -> String {
    response
        .headers()
        .get("location")
        .and_then(|v| v.to_str().ok())
        .expect("location header")
        .to_string()
}

/// Drive the full login flow against the mock upstream.
///
/// Returns the signed `sid` cookie value of the authenticated session.
pub async fn authenticate(server: &TestServer, client: &reqwest::Client) -> String {
    let login = client
        .get(server.url("/login"))
        .send()
        .await
        .expect("login request succeeds");
    assert!(login.status().is_redirection());
    let state = cookie_value(&login, "github_auth_state").expect("state cookie set");

    let callback = client
        .get(server.url(&format!("/callback?code=test-code&state={state}")))
        .header("Cookie", format!("github_auth_state={state}"))
        .send()
        .await
        .expect("callback request succeeds");
    assert!(callback.status().is_redirection());
    assert_eq!(location(&callback), "/repos");

    cookie_value(&callback, "sid").expect("session cookie set")
}
