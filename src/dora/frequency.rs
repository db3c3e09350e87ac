use std::collections::BTreeMap;

use chrono::{DateTime, NaiveDate, Utc};

use super::{DailyDeployments, Deployment};
use crate::time::{day_key, weekday_label};

/// Groups deployments by UTC calendar day, oldest day first.
pub fn deployment_frequency(deployments: &[Deployment]) -> Vec<DailyDeployments> {
    let by_day = deployments.iter().fold(
        BTreeMap::<NaiveDate, Vec<DateTime<Utc>>>::new(),
        |mut days, deployment| {
            days.entry(day_key(&deployment.when))
                .or_default()
                .push(deployment.when);
            days
        },
    );

    by_day
        .into_iter()
        .filter_map(|(date, mut times)| {
            times.sort_unstable();
            let first = *times.first()?;
            let last = *times.last()?;
            Some(DailyDeployments {
                date,
                deployments: times.len(),
                first_deploy_at_utc: first,
                last_deploy_at_utc: last,
                weekday: weekday_label(date),
            })
        })
        .collect()
}
