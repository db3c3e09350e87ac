use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use log::debug;

use crate::providers::azure::types::{Build, RepositoryKind};
use crate::providers::github::{identity, GitHubClient};
use crate::providers::PipelineClient;

/// Looks up when a build's source commit was authored.
///
/// Resolution never fails the run: anything that goes wrong is logged and
/// reported as `None`.
#[async_trait]
pub trait CommitResolver: Send + Sync {
    async fn commit_time(&self, build: &Build) -> Option<DateTime<Utc>>;
}

/// Where a build's commit can be looked up, chosen once per build.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommitSource<'a> {
    AzureRepos {
        repository_id: Option<&'a str>,
        sha: &'a str,
    },
    GitHub {
        owner_repo: Option<String>,
        api_url: Option<&'a str>,
        sha: &'a str,
    },
    Unknown(RepositoryKind),
}

impl<'a> CommitSource<'a> {
    /// `None` when the build has no source commit at all.
    pub fn for_build(build: &'a Build, repo_override: Option<&str>) -> Option<Self> {
        let sha = build.commit_id()?;
        let repository = &build.repository;
        let repo_override = repo_override.map(str::trim).filter(|r| !r.is_empty());

        let source = match repository.kind() {
            RepositoryKind::AzureRepos => Self::AzureRepos {
                repository_id: repository
                    .id
                    .as_deref()
                    .map(str::trim)
                    .filter(|id| !id.is_empty()),
                sha,
            },
            kind if kind.is_github_like() || repo_override.is_some() => Self::GitHub {
                owner_repo: repo_override
                    .map(str::to_string)
                    .or_else(|| identity::extract_owner_repo(repository)),
                api_url: repository.property("apiUrl"),
                sha,
            },
            kind => Self::Unknown(kind),
        };

        Some(source)
    }
}

/// Resolves commits through Azure Repos or GitHub depending on the build's
/// repository.
pub struct ProviderCommitResolver<C> {
    client: Arc<C>,
    github: GitHubClient,
    github_repo_override: Option<String>,
}

impl<C: PipelineClient> ProviderCommitResolver<C> {
    pub fn new(client: Arc<C>, github: GitHubClient, github_repo_override: Option<String>) -> Self {
        Self {
            client,
            github,
            github_repo_override,
        }
    }

    async fn from_azure_repos(&self, build: &Build, repository_id: &str, sha: &str) -> Option<DateTime<Utc>> {
        match self.client.get_commit(repository_id, sha).await {
            Ok(commit) => commit.timestamp(),
            Err(e) => {
                debug!("[COMMIT] build={} azure repos lookup failed: {e}", build.id);
                None
            }
        }
    }

    async fn from_github(
        &self,
        build: &Build,
        owner_repo: &str,
        api_url: Option<&str>,
        sha: &str,
    ) -> Option<DateTime<Utc>> {
        let url = identity::commit_api_url(owner_repo, sha, api_url, self.github.api_base());
        debug!("[COMMIT] build={} github lookup {url}", build.id);

        match self.github.fetch_commit(&url).await {
            Ok(commit) => commit.timestamp(),
            Err(e) => {
                debug!("[COMMIT] build={} github lookup failed: {e}", build.id);
                None
            }
        }
    }
}

#[async_trait]
impl<C: PipelineClient> CommitResolver for ProviderCommitResolver<C> {
    async fn commit_time(&self, build: &Build) -> Option<DateTime<Utc>> {
        let Some(source) = CommitSource::for_build(build, self.github_repo_override.as_deref()) else {
            debug!("[COMMIT] build={} has no source version", build.id);
            return None;
        };

        let resolved = match &source {
            CommitSource::AzureRepos {
                repository_id: Some(repository_id),
                sha,
            } => self.from_azure_repos(build, repository_id, sha).await,
            CommitSource::AzureRepos {
                repository_id: None,
                ..
            } => {
                debug!("[COMMIT] build={} azure repos descriptor without id", build.id);
                None
            }
            CommitSource::GitHub {
                owner_repo: Some(owner_repo),
                api_url,
                sha,
            } => self.from_github(build, owner_repo, *api_url, sha).await,
            CommitSource::GitHub { owner_repo: None, .. } => {
                debug!(
                    "[COMMIT] build={} no owner/repo; repository keys: {:?}",
                    build.id,
                    build.repository.property_keys()
                );
                None
            }
            CommitSource::Unknown(kind) => {
                debug!("[COMMIT] build={} unsupported repository type {kind:?}", build.id);
                None
            }
        };

        if resolved.is_none() {
            debug!("[COMMIT] build={} commit time unresolved", build.id);
        }
        resolved
    }
}
