use log::warn;
use reqwest::header::HeaderMap;
use reqwest::{Client, StatusCode};
use serde::de::DeserializeOwned;
use std::time::Duration;
use url::Url;

use crate::auth::AzureCredentials;
use crate::error::{DoraLensError, Result};
use crate::providers::azure::links::RunLinks;

pub(super) const API_VERSION: &str = "7.1";
pub(super) const PAGE_SIZE: usize = 200;

/// Timeout and retry knobs for upstream HTTP calls.
#[derive(Debug, Clone, Copy)]
pub struct HttpSettings {
    pub timeout: Duration,
    pub max_retries: u32,
    pub retry_delay: Duration,
}

impl Default for HttpSettings {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(60),
            max_retries: 3,
            retry_delay: Duration::from_secs(5),
        }
    }
}

/// Azure DevOps REST client scoped to one organization and project.
pub struct AzureDevOpsClient {
    client: Client,
    project_url: Url,
    credentials: AzureCredentials,
    settings: HttpSettings,
}

impl AzureDevOpsClient {
    /// Creates a client for `{base_url}/{organization}/{project}`.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built or the base URL is
    /// not a valid absolute URL.
    pub fn new(
        base_url: &str,
        organization: &str,
        project: &str,
        credentials: AzureCredentials,
        settings: HttpSettings,
    ) -> Result<Self> {
        let client = Client::builder()
            .user_agent(concat!("doralens/", env!("CARGO_PKG_VERSION")))
            .timeout(settings.timeout)
            .build()
            .map_err(|e| DoraLensError::Config(format!("Failed to create HTTP client: {e}")))?;

        let project_url = project_url(base_url, organization, project)?;

        Ok(Self {
            client,
            project_url,
            credentials,
            settings,
        })
    }

    pub fn run_links(&self) -> RunLinks {
        RunLinks::new(&self.project_url)
    }

    /// GET `path` (relative to the project URL) and decode the JSON body.
    ///
    /// Response headers are returned alongside the body for callers that need
    /// out-of-band values such as continuation tokens.
    pub(super) async fn get_json<T>(&self, path: &str, query: &[(&str, String)]) -> Result<(T, HeaderMap)>
    where
        T: DeserializeOwned,
    {
        let url = self.project_url.join(path)?;
        let response = self.send_with_retry(&url, query).await?;
        let headers = response.headers().clone();
        let body = response.json::<T>().await?;
        Ok((body, headers))
    }

    async fn send_with_retry(&self, url: &Url, query: &[(&str, String)]) -> Result<reqwest::Response> {
        let mut retry_count = 0;
        loop {
            let request = self
                .credentials
                .apply(self.client.get(url.clone()).query(query));

            let response = match request.send().await {
                Ok(resp) => resp,
                Err(e) if e.is_connect() || e.is_timeout() => {
                    if retry_count >= self.settings.max_retries {
                        return Err(e.into());
                    }
                    warn!(
                        "Network error ({}), retrying in {}s ({}/{})...",
                        e,
                        self.settings.retry_delay.as_secs(),
                        retry_count + 1,
                        self.settings.max_retries
                    );
                    tokio::time::sleep(self.settings.retry_delay).await;
                    retry_count += 1;
                    continue;
                }
                Err(e) => return Err(e.into()),
            };

            let status = response.status();

            if status == StatusCode::TOO_MANY_REQUESTS || status.is_server_error() {
                if retry_count >= self.settings.max_retries {
                    return Err(DoraLensError::ApiErrorAfterRetries {
                        status: status.as_u16(),
                        retries: self.settings.max_retries,
                    });
                }

                warn!(
                    "Azure DevOps API error (status {status}). Waiting {}s before retry {}/{}...",
                    self.settings.retry_delay.as_secs(),
                    retry_count + 1,
                    self.settings.max_retries
                );

                tokio::time::sleep(self.settings.retry_delay).await;
                retry_count += 1;
                continue;
            }

            if !status.is_success() {
                let error_text = response
                    .text()
                    .await
                    .unwrap_or_else(|_| "Unable to read error response".to_string());
                return Err(DoraLensError::Api {
                    status: status.as_u16(),
                    message: error_text,
                });
            }

            return Ok(response);
        }
    }
}

fn project_url(base_url: &str, organization: &str, project: &str) -> Result<Url> {
    let mut url = Url::parse(base_url)?;

    if organization.trim().is_empty() || project.trim().is_empty() {
        return Err(DoraLensError::Config(
            "organization and project must not be empty".to_string(),
        ));
    }

    url.path_segments_mut()
        .map_err(|()| DoraLensError::Config(format!("Base URL cannot be a base: {base_url}")))?
        .pop_if_empty()
        .push(organization.trim())
        .push(project.trim())
        .push("");

    Ok(url)
}
