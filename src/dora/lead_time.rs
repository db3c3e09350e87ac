use std::collections::HashMap;

use super::{Deployment, LeadTimeRecord, ResolvedCommit};
use crate::providers::azure::links::RunLinks;
use crate::time::{human_duration, seconds_to_hours, whole_seconds};

/// Lead time from commit to deployment for every deployment whose commit
/// timestamp is known, ordered by deployment time then build id.
pub fn lead_times(
    deployments: &[Deployment],
    commits: &[ResolvedCommit],
    links: &RunLinks,
) -> Vec<LeadTimeRecord> {
    let by_build: HashMap<u64, &ResolvedCommit> =
        commits.iter().map(|c| (c.build_id, c)).collect();

    let mut records: Vec<LeadTimeRecord> = deployments
        .iter()
        .filter_map(|deployment| {
            let commit = by_build.get(&deployment.build_id)?;
            let seconds = whole_seconds(deployment.when - commit.committed_at);
            Some(LeadTimeRecord {
                build_id: deployment.build_id,
                run_url: links.run_url(deployment.build_id),
                commit: commit.commit_id.clone(),
                commit_time_utc: commit.committed_at,
                deploy_time_utc: deployment.when,
                lead_time_seconds: seconds,
                lead_time_hours: seconds_to_hours(seconds),
                lead_time_human: human_duration(seconds),
            })
        })
        .collect();

    records.sort_by_key(|r| (r.deploy_time_utc, r.build_id));
    records
}
