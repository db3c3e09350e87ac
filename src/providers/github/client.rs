use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, AUTHORIZATION};
use serde::Deserialize;
use std::time::Duration;

use crate::auth::Token;
use crate::error::{DoraLensError, Result};
use crate::providers::azure::types::GitCommit;

/// GitHub REST client used for commit timestamp lookups.
#[derive(Clone)]
pub struct GitHubClient {
    /// HTTP client
    client: reqwest::Client,
    /// Base URL for GitHub API, used when a repository carries no API URL
    api_base: String,
}

impl GitHubClient {
    /// Create a new GitHub API client.
    ///
    /// # Arguments
    ///
    /// * `api_base` - GitHub API base URL (e.g., "https://api.github.com")
    /// * `token` - Optional GitHub token sent as a bearer credential
    /// * `timeout` - Per-request timeout
    ///
    /// # Errors
    ///
    /// Returns an error if the token is not a valid header value or the HTTP
    /// client cannot be built.
    pub fn new(api_base: String, token: Option<Token>, timeout: Duration) -> Result<Self> {
        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static("application/vnd.github+json"));

        if let Some(token) = token {
            let mut value = HeaderValue::from_str(&format!("Bearer {}", token.as_str()))
                .map_err(|e| DoraLensError::Config(format!("Invalid GitHub token: {e}")))?;
            value.set_sensitive(true);
            headers.insert(AUTHORIZATION, value);
        }

        let client = reqwest::Client::builder()
            .user_agent(concat!("doralens/", env!("CARGO_PKG_VERSION")))
            .default_headers(headers)
            .timeout(timeout)
            .build()
            .map_err(|e| DoraLensError::Config(format!("Failed to create HTTP client: {e}")))?;

        Ok(Self { client, api_base })
    }

    pub fn api_base(&self) -> &str {
        &self.api_base
    }

    /// Fetch a commit from a fully built commit API URL.
    ///
    /// Anything other than `200 OK` is reported as [`DoraLensError::Api`].
    pub async fn fetch_commit(&self, url: &str) -> Result<GitCommit> {
        let response = self.client.get(url).send().await?;

        let status = response.status();
        if status != reqwest::StatusCode::OK {
            let message = response.text().await.unwrap_or_default();
            return Err(DoraLensError::Api {
                status: status.as_u16(),
                message,
            });
        }

        let body: CommitResponse = response.json().await?;
        Ok(body.commit)
    }
}

/// Response from GitHub API for a single commit.
#[derive(Deserialize)]
struct CommitResponse {
    #[serde(default)]
    commit: GitCommit,
}
