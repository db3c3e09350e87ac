//! DORA metric computation over deployment and failure events.
//!
//! Everything here is pure: the collector gathers events from the pipeline
//! system, and these functions fold them into the four metric datasets.

mod failure_rate;
mod frequency;
mod lead_time;
mod recovery;

use chrono::{DateTime, NaiveDate, Utc};
use serde::Serialize;

use crate::providers::azure::links::RunLinks;
use crate::time::TimeWindow;

pub use failure_rate::change_failure_rate;
pub use frequency::deployment_frequency;
pub use lead_time::lead_times;
pub use recovery::recovery_times;

/// A production deployment inferred from a successful swap job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Deployment {
    pub build_id: u64,
    pub when: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum FailureTrigger {
    ValidationFailed,
    RollbackSucceeded,
}

/// A failed change on a build that deployed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FailureEvent {
    pub build_id: u64,
    pub when: DateTime<Utc>,
    pub trigger: FailureTrigger,
}

/// Source commit timestamp resolved for a deploying build.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedCommit {
    pub build_id: u64,
    pub commit_id: String,
    pub committed_at: DateTime<Utc>,
}

/// Everything the collector learned about the builds in the window.
#[derive(Debug, Clone, Default)]
pub struct DeliveryEvents {
    pub deployments: Vec<Deployment>,
    pub failures: Vec<FailureEvent>,
    pub commits: Vec<ResolvedCommit>,
}

/// Deployments on one UTC calendar day.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DailyDeployments {
    pub date: NaiveDate,
    pub deployments: usize,
    pub first_deploy_at_utc: DateTime<Utc>,
    pub last_deploy_at_utc: DateTime<Utc>,
    pub weekday: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LeadTimeRecord {
    pub build_id: u64,
    pub run_url: String,
    pub commit: String,
    pub commit_time_utc: DateTime<Utc>,
    pub deploy_time_utc: DateTime<Utc>,
    /// Negative when the commit is dated after the deployment
    pub lead_time_seconds: i64,
    pub lead_time_hours: f64,
    pub lead_time_human: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChangeFailureRate {
    pub window_start_utc: DateTime<Utc>,
    pub window_end_utc: DateTime<Utc>,
    pub total_deployments: usize,
    pub failed_changes: usize,
    pub change_failure_rate_pct: f64,
}

/// A failed change paired with the next deployment that restored service.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RecoveryRecord {
    pub failed_build_id: u64,
    pub failed_at_utc: DateTime<Utc>,
    pub failed_run_url: String,
    pub restored_build_id: u64,
    pub restored_at_utc: DateTime<Utc>,
    pub restored_run_url: String,
    pub mttr_seconds: i64,
    pub mttr_hours: f64,
    pub mttr_human: String,
}

/// The four DORA datasets for one window.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DoraMetrics {
    pub deployment_frequency: Vec<DailyDeployments>,
    pub lead_time: Vec<LeadTimeRecord>,
    pub change_failure_rate: ChangeFailureRate,
    pub recovery: Vec<RecoveryRecord>,
}

impl DoraMetrics {
    pub fn compute(events: &DeliveryEvents, window: &TimeWindow, links: &RunLinks) -> Self {
        Self {
            deployment_frequency: deployment_frequency(&events.deployments),
            lead_time: lead_times(&events.deployments, &events.commits, links),
            change_failure_rate: change_failure_rate(
                events.deployments.len(),
                events.failures.len(),
                window,
            ),
            recovery: recovery_times(&events.deployments, &events.failures, links),
        }
    }

    pub fn lead_time_seconds(&self) -> Vec<i64> {
        self.lead_time.iter().map(|r| r.lead_time_seconds).collect()
    }

    pub fn recovery_seconds(&self) -> Vec<i64> {
        self.recovery.iter().map(|r| r.mttr_seconds).collect()
    }
}


#[cfg(test)]
mod tests {
    use super::test_support::*;
    use super::*;

    #[test]
    fn test_daily_totals_match_failure_rate_denominator() {
        let events = DeliveryEvents {
            deployments: vec![
                deployment(1, 0),
                deployment(2, 60),
                deployment(3, 24 * 60),
                deployment(4, 3 * 24 * 60),
            ],
            failures: vec![failure(2, 90)],
            commits: vec![],
        };

        let metrics = DoraMetrics::compute(&events, &window(), &links());

        let daily_total: usize = metrics
            .deployment_frequency
            .iter()
            .map(|d| d.deployments)
            .sum();
        assert_eq!(daily_total, metrics.change_failure_rate.total_deployments);
        assert_eq!(metrics.change_failure_rate.failed_changes, 1);
        assert!((metrics.change_failure_rate.change_failure_rate_pct - 25.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_intervening_validation_failure_scenario() {
        // T0 deploy, T1 validation failure on another build, T2 next deploy
        let events = DeliveryEvents {
            deployments: vec![deployment(1, 0), deployment(2, 30), deployment(3, 120)],
            failures: vec![failure(2, 45)],
            commits: vec![],
        };

        let metrics = DoraMetrics::compute(&events, &window(), &links());

        assert_eq!(metrics.recovery.len(), 1);
        let row = &metrics.recovery[0];
        assert_eq!(row.failed_build_id, 2);
        assert_eq!(row.restored_build_id, 3);
        assert_eq!(row.mttr_seconds, (120 - 45) * 60);
        assert_eq!(metrics.recovery_seconds(), vec![(120 - 45) * 60]);
    }

    #[test]
    fn test_empty_events() {
        let metrics = DoraMetrics::compute(&DeliveryEvents::default(), &window(), &links());

        assert!(metrics.deployment_frequency.is_empty());
        assert!(metrics.lead_time.is_empty());
        assert!(metrics.recovery.is_empty());
        assert_eq!(metrics.change_failure_rate.total_deployments, 0);
        assert!(metrics.change_failure_rate.change_failure_rate_pct.abs() < f64::EPSILON);
    }
}
