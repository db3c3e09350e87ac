use super::ChangeFailureRate;
use crate::time::{round_to, TimeWindow};

/// Share of deployments that were failed changes, as a percentage with two
/// decimals. Zero deployments give `0.0`.
#[allow(clippy::cast_precision_loss)]
pub fn change_failure_rate(
    total_deployments: usize,
    failed_changes: usize,
    window: &TimeWindow,
) -> ChangeFailureRate {
    let change_failure_rate_pct = if total_deployments > 0 {
        round_to(failed_changes as f64 / total_deployments as f64 * 100.0, 2)
    } else {
        0.0
    };

    ChangeFailureRate {
        window_start_utc: window.since,
        window_end_utc: window.until,
        total_deployments,
        failed_changes,
        change_failure_rate_pct,
    }
}
