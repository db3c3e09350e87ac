use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;

use crate::time::deserialize_optional_utc;

/// A build pipeline definition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PipelineDefinition {
    pub id: u64,
    #[serde(default, deserialize_with = "null_as_default")]
    pub name: String,
}

/// Reference to the definition a build was queued from.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct DefinitionRef {
    pub id: u64,
    #[serde(default)]
    pub name: Option<String>,
}

/// A single build (pipeline run).
///
/// Only the fields needed to classify the run and locate its source commit are
/// kept; everything else in the REST payload is ignored.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Build {
    pub id: u64,
    #[serde(default)]
    pub build_number: Option<String>,
    /// Commit SHA (or changeset) the build ran against
    #[serde(default)]
    pub source_version: Option<String>,
    #[serde(default)]
    pub source_branch: Option<String>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub repository: Repository,
    #[serde(default)]
    pub definition: Option<DefinitionRef>,
    #[serde(default, deserialize_with = "deserialize_optional_utc")]
    pub start_time: Option<DateTime<Utc>>,
    #[serde(default, deserialize_with = "deserialize_optional_utc")]
    pub finish_time: Option<DateTime<Utc>>,
}

impl Build {
    pub fn definition_id(&self) -> Option<u64> {
        self.definition.as_ref().map(|d| d.id)
    }

    /// Source commit id, if the build carries a non-blank one.
    pub fn commit_id(&self) -> Option<&str> {
        self.source_version
            .as_deref()
            .map(str::trim)
            .filter(|sha| !sha.is_empty())
    }
}

/// Repository provider family, derived from the descriptor's `type` field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RepositoryKind {
    AzureRepos,
    GitHub,
    GitHubEnterprise,
    Unknown(String),
}

impl RepositoryKind {
    pub fn from_type(raw: &str) -> Self {
        let lowered = raw.to_lowercase();
        if lowered.contains("tfs") || lowered.contains("azure") {
            Self::AzureRepos
        } else if lowered.contains("githubenterprise") {
            Self::GitHubEnterprise
        } else if lowered.contains("github") {
            Self::GitHub
        } else {
            Self::Unknown(raw.to_string())
        }
    }

    pub fn is_github_like(&self) -> bool {
        matches!(self, Self::GitHub | Self::GitHubEnterprise)
    }
}

/// Source repository descriptor attached to a build.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Repository {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default, rename = "type")]
    pub type_: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub url: Option<String>,
    /// Provider specific properties (`fullName`, `apiUrl`, `cloneUrl`, ...)
    #[serde(default, deserialize_with = "null_as_default")]
    pub properties: HashMap<String, Value>,
}

impl Repository {
    pub fn kind(&self) -> RepositoryKind {
        RepositoryKind::from_type(self.type_.as_deref().unwrap_or_default())
    }

    /// String property by key; non-string and blank values are treated as absent.
    pub fn property(&self, key: &str) -> Option<&str> {
        self.properties
            .get(key)
            .and_then(Value::as_str)
            .map(str::trim)
            .filter(|v| !v.is_empty())
    }

    pub fn property_keys(&self) -> Vec<&str> {
        let mut keys: Vec<&str> = self.properties.keys().map(String::as_str).collect();
        keys.sort_unstable();
        keys
    }
}

/// Kind of a timeline record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecordKind {
    Stage,
    Phase,
    Job,
    Task,
    Checkpoint,
    Other(String),
}

impl Default for RecordKind {
    fn default() -> Self {
        Self::Other(String::new())
    }
}

impl From<String> for RecordKind {
    fn from(raw: String) -> Self {
        match raw.as_str() {
            "Stage" => Self::Stage,
            "Phase" => Self::Phase,
            "Job" => Self::Job,
            "Task" => Self::Task,
            "Checkpoint" => Self::Checkpoint,
            _ => Self::Other(raw),
        }
    }
}

/// Outcome of a timeline record, compared case-insensitively.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecordResult {
    Succeeded,
    Failed,
    Other(String),
}

impl From<String> for RecordResult {
    fn from(raw: String) -> Self {
        match raw.to_lowercase().as_str() {
            "succeeded" => Self::Succeeded,
            "failed" => Self::Failed,
            _ => Self::Other(raw),
        }
    }
}

fn default_attempt() -> u32 {
    1
}

/// One node of a build's execution timeline.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TimelineRecord {
    #[serde(rename = "type", default, deserialize_with = "deserialize_kind")]
    pub kind: RecordKind,
    #[serde(default, deserialize_with = "null_as_default")]
    pub name: String,
    #[serde(default, deserialize_with = "deserialize_result")]
    pub result: Option<RecordResult>,
    #[serde(default, deserialize_with = "deserialize_optional_utc")]
    pub finish_time: Option<DateTime<Utc>>,
    #[serde(default = "default_attempt", deserialize_with = "deserialize_attempt")]
    pub attempt: u32,
}

/// Treats an explicit JSON `null` like a missing key.
fn null_as_default<'de, D, T>(deserializer: D) -> std::result::Result<T, D::Error>
where
    D: serde::Deserializer<'de>,
    T: Deserialize<'de> + Default,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

fn deserialize_attempt<'de, D>(deserializer: D) -> std::result::Result<u32, D::Error>
where
    D: serde::Deserializer<'de>,
{
    Ok(Option::<u32>::deserialize(deserializer)?.unwrap_or_else(default_attempt))
}

fn deserialize_kind<'de, D>(deserializer: D) -> std::result::Result<RecordKind, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let raw = Option::<String>::deserialize(deserializer)?;
    Ok(RecordKind::from(raw.unwrap_or_default()))
}

fn deserialize_result<'de, D>(deserializer: D) -> std::result::Result<Option<RecordResult>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let raw = Option::<String>::deserialize(deserializer)?;
    Ok(raw.map(RecordResult::from))
}

/// Author or committer signature of a commit.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct GitUserDate {
    #[serde(default, deserialize_with = "deserialize_optional_utc")]
    pub date: Option<DateTime<Utc>>,
}

/// Commit as returned by the Azure Repos and GitHub commit endpoints.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct GitCommit {
    #[serde(default)]
    pub author: Option<GitUserDate>,
    #[serde(default)]
    pub committer: Option<GitUserDate>,
}

impl GitCommit {
    /// Author date, falling back to the committer date.
    pub fn timestamp(&self) -> Option<DateTime<Utc>> {
        self.author
            .as_ref()
            .and_then(|a| a.date)
            .or_else(|| self.committer.as_ref().and_then(|c| c.date))
    }
}

/// `{ "count": n, "value": [...] }` list envelope.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase", bound(deserialize = "T: Deserialize<'de>"))]
pub(super) struct ListResponse<T> {
    #[serde(default = "Vec::new", deserialize_with = "null_as_default")]
    pub value: Vec<T>,
    #[serde(default)]
    pub continuation_token: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub(super) struct TimelineResponse {
    #[serde(default)]
    pub records: Option<Vec<TimelineRecord>>,
}
