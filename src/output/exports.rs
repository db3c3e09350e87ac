use anyhow::{Context, Result};
use std::borrow::Cow;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use crate::insights::DoraInsights;
use crate::time::fmt_iso;

pub const DEPLOYMENT_FREQUENCY_FILE: &str = "deployment_frequency.csv";
pub const LEAD_TIME_FILE: &str = "lead_time_for_changes.csv";
pub const CHANGE_FAILURE_RATE_FILE: &str = "change_failure_rate.csv";
pub const RECOVERY_TIME_FILE: &str = "failed_deployment_recovery_time.csv";
pub const JSON_REPORT_FILE: &str = "dora_report.json";

/// Writes the four DORA CSV files into `dir`, each name prefixed with
/// `prefix`, and returns the written paths in a fixed order.
pub fn write_csv_reports(insights: &DoraInsights, dir: &Path, prefix: &str) -> Result<Vec<PathBuf>> {
    let writers: [(&str, fn(&DoraInsights, &mut dyn Write) -> Result<()>); 4] = [
        (DEPLOYMENT_FREQUENCY_FILE, export_deployment_frequency),
        (LEAD_TIME_FILE, export_lead_time),
        (CHANGE_FAILURE_RATE_FILE, export_change_failure_rate),
        (RECOVERY_TIME_FILE, export_recovery),
    ];

    writers
        .into_iter()
        .map(|(name, export)| -> Result<PathBuf> {
            let path = dir.join(format!("{prefix}{name}"));
            let file = File::create(&path)
                .with_context(|| format!("Failed to create {}", path.display()))?;
            let mut writer = BufWriter::new(file);
            export(insights, &mut writer)?;
            writer
                .flush()
                .with_context(|| format!("Failed to write {}", path.display()))?;
            Ok(path)
        })
        .collect()
}

pub fn export_json(insights: &DoraInsights, pretty: bool, output: &mut dyn Write) -> Result<()> {
    let json = if pretty {
        serde_json::to_string_pretty(insights)?
    } else {
        serde_json::to_string(insights)?
    };
    writeln!(output, "{json}")?;
    Ok(())
}

fn export_deployment_frequency(insights: &DoraInsights, output: &mut dyn Write) -> Result<()> {
    writeln!(output, "app,date,deployments,firstDeployAtUtc,lastDeployAtUtc,weekday")?;

    for day in &insights.metrics.deployment_frequency {
        writeln!(
            output,
            "{},{},{},{},{},{}",
            csv_field(&insights.app),
            day.date,
            day.deployments,
            fmt_iso(&day.first_deploy_at_utc),
            fmt_iso(&day.last_deploy_at_utc),
            day.weekday
        )?;
    }

    Ok(())
}

fn export_lead_time(insights: &DoraInsights, output: &mut dyn Write) -> Result<()> {
    writeln!(
        output,
        "app,buildId,runUrl,commit,commitTimeUtc,deployTimeUtc,leadTimeSeconds,leadTimeHours,leadTimeHuman"
    )?;

    for row in &insights.metrics.lead_time {
        writeln!(
            output,
            "{},{},{},{},{},{},{},{},{}",
            csv_field(&insights.app),
            row.build_id,
            csv_field(&row.run_url),
            csv_field(&row.commit),
            fmt_iso(&row.commit_time_utc),
            fmt_iso(&row.deploy_time_utc),
            row.lead_time_seconds,
            decimal(row.lead_time_hours),
            row.lead_time_human
        )?;
    }

    Ok(())
}

fn export_change_failure_rate(insights: &DoraInsights, output: &mut dyn Write) -> Result<()> {
    let cfr = &insights.metrics.change_failure_rate;

    writeln!(
        output,
        "app,windowStartUtc,windowEndUtc,totalDeployments,failedChanges,changeFailureRatePct"
    )?;
    writeln!(
        output,
        "{},{},{},{},{},{}",
        csv_field(&insights.app),
        fmt_iso(&cfr.window_start_utc),
        fmt_iso(&cfr.window_end_utc),
        cfr.total_deployments,
        cfr.failed_changes,
        decimal(cfr.change_failure_rate_pct)
    )?;

    Ok(())
}

fn export_recovery(insights: &DoraInsights, output: &mut dyn Write) -> Result<()> {
    writeln!(
        output,
        "app,failedBuildId,failedAtUtc,failedRunUrl,restoredBuildId,restoredAtUtc,restoredRunUrl,mttrSeconds,mttrHours,mttrHuman"
    )?;

    for row in &insights.metrics.recovery {
        writeln!(
            output,
            "{},{},{},{},{},{},{},{},{},{}",
            csv_field(&insights.app),
            row.failed_build_id,
            fmt_iso(&row.failed_at_utc),
            csv_field(&row.failed_run_url),
            row.restored_build_id,
            fmt_iso(&row.restored_at_utc),
            csv_field(&row.restored_run_url),
            row.mttr_seconds,
            decimal(row.mttr_hours),
            row.mttr_human
        )?;
    }

    Ok(())
}

/// Decimal rendering that always keeps a fractional part (`2.0`, `33.33`).
fn decimal(value: f64) -> String {
    format!("{value:?}")
}

/// Quotes a field when it contains a delimiter, quote or line break.
fn csv_field(value: &str) -> Cow<'_, str> {
    if value.contains([',', '"', '\n', '\r']) {
        Cow::Owned(format!("\"{}\"", value.replace('"', "\"\"")))
    } else {
        Cow::Borrowed(value)
    }
}
