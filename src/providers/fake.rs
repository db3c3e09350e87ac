//! In-memory [`PipelineClient`] for collector and resolver tests.

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use serde_json::json;

use super::azure::types::{Build, GitCommit, PipelineDefinition, TimelineRecord};
use super::PipelineClient;
use crate::error::{DoraLensError, Result};
use crate::time::TimeWindow;

#[derive(Default)]
pub struct FakeClient {
    pub definitions: Vec<PipelineDefinition>,
    pub builds: Vec<Build>,
    pub timelines: HashMap<u64, Vec<TimelineRecord>>,
    pub commits: HashMap<(String, String), GitCommit>,
    pub broken_timelines: HashSet<u64>,
    pub fail_build_listing: bool,
    pub commit_calls: AtomicUsize,
}

impl FakeClient {
    pub fn with_definitions(mut self, definitions: &[(u64, &str)]) -> Self {
        self.definitions = definitions
            .iter()
            .map(|(id, name)| PipelineDefinition {
                id: *id,
                name: (*name).to_string(),
            })
            .collect();
        self
    }

    pub fn with_build(mut self, build: Build, timeline: Vec<TimelineRecord>) -> Self {
        self.timelines.insert(build.id, timeline);
        self.builds.push(build);
        self
    }

    pub fn with_commit(mut self, repository_id: &str, sha: &str, author_date: &str) -> Self {
        let commit: GitCommit =
            serde_json::from_value(json!({ "author": { "date": author_date } })).unwrap();
        self.commits
            .insert((repository_id.to_string(), sha.to_string()), commit);
        self
    }

    pub fn commit_calls(&self) -> usize {
        self.commit_calls.load(Ordering::SeqCst)
    }
}

fn not_found(what: String) -> DoraLensError {
    DoraLensError::Api {
        status: 404,
        message: what,
    }
}

#[async_trait]
impl PipelineClient for FakeClient {
    async fn list_definitions(&self, name_filter: Option<&str>) -> Result<Vec<PipelineDefinition>> {
        Ok(self
            .definitions
            .iter()
            .filter(|d| name_filter.map_or(true, |f| d.name.contains(f)))
            .cloned()
            .collect())
    }

    async fn get_definition(&self, definition_id: u64) -> Result<PipelineDefinition> {
        self.definitions
            .iter()
            .find(|d| d.id == definition_id)
            .cloned()
            .ok_or_else(|| not_found(format!("definition {definition_id}")))
    }

    async fn list_builds(
        &self,
        definition_ids: &[u64],
        _window: &TimeWindow,
        _branch: Option<&str>,
    ) -> Result<Vec<Build>> {
        if self.fail_build_listing {
            return Err(DoraLensError::Api {
                status: 500,
                message: "build listing unavailable".to_string(),
            });
        }

        Ok(self
            .builds
            .iter()
            .filter(|b| b.definition_id().map_or(true, |id| definition_ids.contains(&id)))
            .cloned()
            .collect())
    }

    async fn get_timeline(&self, build_id: u64) -> Result<Vec<TimelineRecord>> {
        if self.broken_timelines.contains(&build_id) {
            return Err(DoraLensError::Api {
                status: 500,
                message: format!("timeline {build_id}"),
            });
        }
        Ok(self.timelines.get(&build_id).cloned().unwrap_or_default())
    }

    async fn get_commit(&self, repository_id: &str, commit_id: &str) -> Result<GitCommit> {
        self.commit_calls.fetch_add(1, Ordering::SeqCst);
        self.commits
            .get(&(repository_id.to_string(), commit_id.to_string()))
            .cloned()
            .ok_or_else(|| not_found(format!("commit {commit_id}")))
    }
}

/// Build payload as the REST API would return it.
pub fn build(id: u64, definition_id: u64, sha: Option<&str>, repository: serde_json::Value) -> Build {
    serde_json::from_value(json!({
        "id": id,
        "buildNumber": format!("2024.{id}"),
        "sourceVersion": sha,
        "sourceBranch": "refs/heads/main",
        "definition": { "id": definition_id },
        "repository": repository,
    }))
    .unwrap()
}

pub fn azure_repo(id: &str) -> serde_json::Value {
    json!({ "id": id, "type": "TfsGit", "name": "web" })
}

/// Timeline with a swap job finishing at `swap_finish`, plus optional
/// validate and rollback jobs as `(result, finish)`.
pub fn timeline(
    swap: Option<(&str, &str)>,
    validate: Option<(&str, &str)>,
    rollback: Option<(&str, &str)>,
) -> Vec<TimelineRecord> {
    let job = |name: &str, (result, finish): (&str, &str)| {
        json!({ "type": "Job", "name": name, "result": result, "finishTime": finish })
    };

    let mut records = vec![json!({ "type": "Stage", "name": "DeployLive", "result": "succeeded" })];
    records.extend(swap.map(|s| job("Swap Slots", s)));
    records.extend(validate.map(|v| job("Validate Swap", v)));
    records.extend(rollback.map(|r| job("Rollback Slots", r)));

    serde_json::from_value(serde_json::Value::Array(records)).unwrap()
}
