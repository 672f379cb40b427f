//! GitHub upstream client
//!
//! Two outbound calls, both single-attempt with no retry: the
//! authorization-code exchange against the token endpoint, and the
//! authenticated repository listing. An interactive user retries by
//! re-initiating login, so best effort is acceptable here.

use serde::{Deserialize, Serialize};
use url::Url;

use crate::config::GitHubConfig;
use crate::error::AppError;

/// Repository record, the subset of GitHub's response the pages render.
///
/// Unknown upstream fields are ignored on deserialization.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Repo {
    pub name: String,
    pub full_name: String,
    pub html_url: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub private: bool,
}

/// Successful token-endpoint body; GitHub reports errors in-band with
/// a 200 and no `access_token` field, so the field is optional.
#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: Option<String>,
}

/// Client for the OAuth endpoints and the repository API
pub struct GitHubClient {
    http: reqwest::Client,
    client_id: String,
    client_secret: String,
    scope: String,
    authorize_url: Url,
    token_url: Url,
    repos_url: Url,
}

impl GitHubClient {
    /// Build a client from validated configuration
    ///
    /// # Errors
    /// Returns a config error if an endpoint URL cannot be parsed.
    pub fn new(http: reqwest::Client, config: &GitHubConfig) -> Result<Self, AppError> {
        let authorize_url = parse_endpoint("github.authorize_url", &config.authorize_url)?;
        let token_url = parse_endpoint("github.token_url", &config.token_url)?;
        let api_url = parse_endpoint("github.api_url", &config.api_url)?;
        let repos_url = api_url.join("/user/repos").map_err(|e| {
            AppError::Config(format!("github.api_url cannot address /user/repos: {e}"))
        })?;

        Ok(Self {
            http,
            client_id: config.client_id.clone(),
            client_secret: config.client_secret.clone(),
            scope: config.scope.clone(),
            authorize_url,
            token_url,
            repos_url,
        })
    }

    /// Build the authorization URL the browser is redirected to.
    ///
    /// Carries `client_id`, the configured `scope` and the one-time
    /// anti-forgery `state` value.
    pub fn authorize_redirect_url(&self, state: &str) -> String {
        let mut url = self.authorize_url.clone();
        url.query_pairs_mut()
            .append_pair("client_id", &self.client_id)
            .append_pair("scope", &self.scope)
            .append_pair("state", state);
        url.to_string()
    }

    /// Exchange an authorization code for an access token.
    ///
    /// One POST to the token endpoint with `client_id`,
    /// `client_secret` and `code`, requesting a JSON response.
    ///
    /// # Errors
    /// Network failure, a non-2xx status, or a 2xx body without an
    /// `access_token` field all count as exchange failure.
    pub async fn exchange_code(&self, code: &str) -> Result<String, AppError> {
        let response = self
            .http
            .post(self.token_url.clone())
            .header(reqwest::header::ACCEPT, "application/json")
            .form(&[
                ("client_id", self.client_id.as_str()),
                ("client_secret", self.client_secret.as_str()),
                ("code", code),
            ])
            .send()
            .await?
            .error_for_status()?;

        let body: TokenResponse = response.json().await?;
        body.access_token
            .filter(|token| !token.is_empty())
            .ok_or_else(|| {
                AppError::Upstream("token endpoint response carried no access token".to_string())
            })
    }

    /// Fetch the authenticated user's repositories.
    ///
    /// # Errors
    /// Network failure, a non-2xx status, or a non-JSON body.
    pub async fn list_repos(&self, token: &str) -> Result<Vec<Repo>, AppError> {
        let repos = self
            .http
            .get(self.repos_url.clone())
            .header(reqwest::header::AUTHORIZATION, format!("token {token}"))
            .header(reqwest::header::ACCEPT, "application/vnd.github+json")
            .send()
            .await?
            .error_for_status()?
            .json::<Vec<Repo>>()
            .await?;

        Ok(repos)
    }
}

fn parse_endpoint(key: &str, value: &str) -> Result<Url, AppError> {
    Url::parse(value).map_err(|e| AppError::Config(format!("{key} is not a valid URL: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_client() -> GitHubClient {
        let config = GitHubConfig {
            client_id: "client-id".to_string(),
            client_secret: "client-secret".to_string(),
            scope: "repo".to_string(),
            authorize_url: "https://github.com/login/oauth/authorize".to_string(),
            token_url: "https://github.com/login/oauth/access_token".to_string(),
            api_url: "https://api.github.com".to_string(),
        };
        GitHubClient::new(reqwest::Client::new(), &config).expect("valid test config")
    }

    #[test]
    fn authorize_url_carries_client_id_scope_and_state() {
        let url = test_client().authorize_redirect_url("state-123");

        assert!(url.starts_with("https://github.com/login/oauth/authorize?"));
        assert!(url.contains("client_id=client-id"));
        assert!(url.contains("scope=repo"));
        assert!(url.contains("state=state-123"));
    }

    #[test]
    fn repos_url_is_joined_against_api_base() {
        let client = test_client();
        assert_eq!(client.repos_url.as_str(), "https://api.github.com/user/repos");
    }

    #[test]
    fn new_rejects_malformed_api_url() {
        let config = GitHubConfig {
            client_id: "client-id".to_string(),
            client_secret: "client-secret".to_string(),
            scope: "repo".to_string(),
            authorize_url: "https://github.com/login/oauth/authorize".to_string(),
            token_url: "https://github.com/login/oauth/access_token".to_string(),
            api_url: "definitely not a url".to_string(),
        };

        let error = GitHubClient::new(reqwest::Client::new(), &config)
            .err()
            .expect("malformed api_url must fail");
        assert!(matches!(error, AppError::Config(_)));
    }
}
