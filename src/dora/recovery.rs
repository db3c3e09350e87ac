use super::{Deployment, FailureEvent, RecoveryRecord};
use crate::providers::azure::links::RunLinks;
use crate::time::{human_duration, seconds_to_hours, whole_seconds};

/// Pairs each failure with the first deployment strictly after it.
///
/// Failures with no later deployment in the window are left out. The result is
/// ordered by failure time.
pub fn recovery_times(
    deployments: &[Deployment],
    failures: &[FailureEvent],
    links: &RunLinks,
) -> Vec<RecoveryRecord> {
    let mut deployments = deployments.to_vec();
    deployments.sort_by_key(|d| (d.when, d.build_id));

    let mut failures = failures.to_vec();
    failures.sort_by_key(|f| (f.when, f.build_id));

    failures
        .iter()
        .filter_map(|failure| {
            let next = deployments.partition_point(|d| d.when <= failure.when);
            let restored = deployments.get(next)?;
            let seconds = whole_seconds(restored.when - failure.when);
            Some(RecoveryRecord {
                failed_build_id: failure.build_id,
                failed_at_utc: failure.when,
                failed_run_url: links.run_url(failure.build_id),
                restored_build_id: restored.build_id,
                restored_at_utc: restored.when,
                restored_run_url: links.run_url(restored.build_id),
                mttr_seconds: seconds,
                mttr_hours: seconds_to_hours(seconds),
                mttr_human: human_duration(seconds),
            })
        })
        .collect()
}
