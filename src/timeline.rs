use log::debug;
use serde::{Deserialize, Serialize};

use crate::dora::{Deployment, FailureEvent, FailureTrigger};
use crate::providers::azure::types::{RecordKind, RecordResult, TimelineRecord};

/// How to choose between several jobs whose names match the same keyword.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub enum JobMatchPolicy {
    /// First matching record in the order the timeline lists them
    #[default]
    FirstInTimeline,
    /// Matching record with the highest attempt number; ties keep timeline order
    LatestAttempt,
}

/// Name fragments identifying the jobs the heuristic looks at.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case", default)]
pub struct JobKeywords {
    pub swap: String,
    pub validate: String,
    pub rollback: String,
    /// Stage reported in diagnostics only
    pub deploy_stage: String,
}

impl Default for JobKeywords {
    fn default() -> Self {
        Self {
            swap: "swap".to_string(),
            validate: "validate".to_string(),
            rollback: "rollback".to_string(),
            deploy_stage: "deploylive".to_string(),
        }
    }
}

/// Deployment and failure events inferred from one build.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BuildClassification {
    pub deployment: Option<Deployment>,
    /// Only ever set together with `deployment`
    pub failure: Option<FailureEvent>,
}

/// Classifies build timelines using the swap / validate / rollback heuristic.
///
/// A build deployed when its swap job succeeded and finished. A deployed build
/// is a failed change when its validate job failed, or otherwise when its
/// rollback job succeeded.
#[derive(Debug, Clone, Default)]
pub struct TimelineAnalyzer {
    keywords: JobKeywords,
    policy: JobMatchPolicy,
}

impl TimelineAnalyzer {
    pub fn new(keywords: JobKeywords, policy: JobMatchPolicy) -> Self {
        Self { keywords, policy }
    }

    pub fn find_job<'a>(&self, records: &'a [TimelineRecord], fragment: &str) -> Option<&'a TimelineRecord> {
        self.find_by_kind(records, &RecordKind::Job, fragment)
    }

    pub fn find_stage<'a>(&self, records: &'a [TimelineRecord], fragment: &str) -> Option<&'a TimelineRecord> {
        self.find_by_kind(records, &RecordKind::Stage, fragment)
    }

    fn find_by_kind<'a>(
        &self,
        records: &'a [TimelineRecord],
        kind: &RecordKind,
        fragment: &str,
    ) -> Option<&'a TimelineRecord> {
        let fragment = fragment.to_lowercase();
        let mut matches = records
            .iter()
            .filter(|r| &r.kind == kind && r.name.to_lowercase().contains(&fragment));

        match self.policy {
            JobMatchPolicy::FirstInTimeline => matches.next(),
            JobMatchPolicy::LatestAttempt => {
                matches.fold(None::<&'a TimelineRecord>, |best, r| match best {
                    Some(b) if b.attempt >= r.attempt => Some(b),
                    _ => Some(r),
                })
            }
        }
    }

    pub fn classify(&self, build_id: u64, records: &[TimelineRecord]) -> BuildClassification {
        let swap = self.find_job(records, &self.keywords.swap);
        let validate = self.find_job(records, &self.keywords.validate);
        let rollback = self.find_job(records, &self.keywords.rollback);

        if let Some(stage) = self.find_stage(records, &self.keywords.deploy_stage) {
            debug!(
                "[TIMELINE] build={build_id} stage '{}' result={:?}",
                stage.name, stage.result
            );
        }

        let deployment = swap
            .filter(|job| job.result == Some(RecordResult::Succeeded))
            .and_then(|job| job.finish_time)
            .map(|when| Deployment { build_id, when });

        let Some(deployment) = deployment else {
            return BuildClassification::default();
        };

        let failure = match validate {
            Some(job) if job.result == Some(RecordResult::Failed) => job
                .finish_time
                .map(|when| (when, FailureTrigger::ValidationFailed)),
            _ => rollback
                .filter(|job| job.result == Some(RecordResult::Succeeded))
                .and_then(|job| job.finish_time)
                .map(|when| (when, FailureTrigger::RollbackSucceeded)),
        }
        .map(|(when, trigger)| FailureEvent {
            build_id,
            when,
            trigger,
        });

        BuildClassification {
            deployment: Some(deployment),
            failure,
        }
    }
}
