mod builds;
mod core;
mod git;

pub use self::core::{AzureDevOpsClient, HttpSettings};

use async_trait::async_trait;

use crate::error::Result;
use crate::providers::azure::types::{Build, GitCommit, PipelineDefinition, TimelineRecord};
use crate::providers::PipelineClient;
use crate::time::TimeWindow;

#[async_trait]
impl PipelineClient for AzureDevOpsClient {
    async fn list_definitions(&self, name_filter: Option<&str>) -> Result<Vec<PipelineDefinition>> {
        AzureDevOpsClient::list_definitions(self, name_filter).await
    }

    async fn get_definition(&self, definition_id: u64) -> Result<PipelineDefinition> {
        AzureDevOpsClient::get_definition(self, definition_id).await
    }

    async fn list_builds(
        &self,
        definition_ids: &[u64],
        window: &TimeWindow,
        branch: Option<&str>,
    ) -> Result<Vec<Build>> {
        AzureDevOpsClient::list_builds(self, definition_ids, window, branch).await
    }

    async fn get_timeline(&self, build_id: u64) -> Result<Vec<TimelineRecord>> {
        AzureDevOpsClient::get_timeline(self, build_id).await
    }

    async fn get_commit(&self, repository_id: &str, commit_id: &str) -> Result<GitCommit> {
        AzureDevOpsClient::get_commit(self, repository_id, commit_id).await
    }
}
