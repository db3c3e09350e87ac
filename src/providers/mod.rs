pub mod azure;
#[cfg(test)]
pub mod fake;
pub mod github;
pub mod pagination;

use async_trait::async_trait;

use crate::error::Result;
use crate::time::TimeWindow;
use azure::types::{Build, GitCommit, PipelineDefinition, TimelineRecord};

/// Read access to the pipeline execution system.
///
/// Every call is a single upstream request (or a paginated series of them)
/// and any non-success response is returned as an error. Whether an error is
/// fatal is up to the caller.
#[async_trait]
pub trait PipelineClient: Send + Sync {
    /// Pipeline definitions, optionally filtered server-side by name.
    async fn list_definitions(&self, name_filter: Option<&str>) -> Result<Vec<PipelineDefinition>>;

    async fn get_definition(&self, definition_id: u64) -> Result<PipelineDefinition>;

    /// All builds of `definition_ids` inside `window`, across every page.
    async fn list_builds(
        &self,
        definition_ids: &[u64],
        window: &TimeWindow,
        branch: Option<&str>,
    ) -> Result<Vec<Build>>;

    async fn get_timeline(&self, build_id: u64) -> Result<Vec<TimelineRecord>>;

    /// Commit from the system's own hosted repositories.
    async fn get_commit(&self, repository_id: &str, commit_id: &str) -> Result<GitCommit>;
}
