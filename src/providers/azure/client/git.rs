use super::core::{AzureDevOpsClient, API_VERSION};
use crate::error::Result;
use crate::providers::azure::types::GitCommit;

impl AzureDevOpsClient {
    /// Fetches a commit from an Azure Repos repository.
    pub async fn get_commit(&self, repository_id: &str, commit_id: &str) -> Result<GitCommit> {
        let (commit, _) = self
            .get_json(
                &format!("_apis/git/repositories/{repository_id}/commits/{commit_id}"),
                &[("api-version", API_VERSION.to_string())],
            )
            .await?;

        Ok(commit)
    }
}
