use std::fmt::Write;
use std::path::PathBuf;

use comfy_table::{Cell, Color as TableColor};

use crate::insights::DoraInsights;
use crate::time::{fmt_iso, format_average};

use super::styling::{bright_green, bright_red, bright_yellow, cyan, dim, heading};
use super::tables::{color_coded_average_cell, color_coded_failure_rate_cell, create_table, header};

const RECENT_DAYS: usize = 10;

/// Prints a human-readable DORA summary to stdout.
///
/// Shows the run overview, one row per metric, the most recent deployment
/// days and the files written by this run.
///
/// Color coding:
/// - Change failure rate: green up to 15%, yellow up to 30%, red above
/// - Averages: green within a day, yellow within a week, red above
pub fn print_summary(insights: &DoraInsights, artifacts: &[PathBuf]) {
    println!("{}", render_summary(insights, artifacts));
}

fn add_section_header(output: &mut String, emoji: &str, title: &str) {
    let _ = writeln!(output, "{}", heading(emoji, title));
}

fn or_na(value: &str) -> String {
    if value.trim().is_empty() {
        "(n/a)".to_string()
    } else {
        value.to_string()
    }
}

#[allow(clippy::format_push_string)]
fn render_summary(insights: &DoraInsights, artifacts: &[PathBuf]) -> String {
    let mut output = String::new();
    let metrics = &insights.metrics;
    let cfr = &metrics.change_failure_rate;

    add_section_header(&mut output, "📊", "DORA Summary (timeline-based)");

    let window_days = (insights.window.until - insights.window.since).num_days();
    let pipeline_ids: Vec<u64> = insights.pipelines.iter().map(|p| p.id).collect();
    let branch = insights
        .branch
        .as_deref()
        .filter(|b| !b.trim().is_empty())
        .unwrap_or("(no filter)");

    let cfr_display = if cfr.change_failure_rate_pct <= 15.0 {
        bright_green(format!("{:.1}%", cfr.change_failure_rate_pct))
    } else if cfr.change_failure_rate_pct <= 30.0 {
        bright_yellow(format!("{:.1}%", cfr.change_failure_rate_pct))
    } else {
        bright_red(format!("{:.1}%", cfr.change_failure_rate_pct))
    };

    output.push_str(&format!(
        "  {} {}\n  {} {}\n  {} {}\n  {} {} {}\n  {} {}\n  {} {}\n  {} {}\n\n",
        dim("App:"),
        cyan(or_na(&insights.app)),
        dim("Project:"),
        cyan(format!("{}/{}", insights.organization, insights.project)),
        dim("Window:"),
        bright_yellow(format!("{window_days} days")),
        dim(format!("({} to {})", fmt_iso(&insights.window.since), fmt_iso(&insights.window.until))),
        dim("Pipelines:"),
        cyan(format!("{} {pipeline_ids:?}", insights.pipeline_label())),
        dim("Branch:"),
        cyan(branch),
        dim("Builds analyzed:"),
        bright_yellow(insights.total_builds),
        dim("Change failure rate:"),
        cfr_display,
    ));

    add_section_header(&mut output, "🚀", "Metrics");

    let lead_seconds = metrics.lead_time_seconds();
    let recovery_seconds = metrics.recovery_seconds();

    let mut metrics_table = create_table();
    metrics_table.set_header(header(&["Metric", "Value", "Detail"]));
    metrics_table.add_row(vec![
        Cell::new("Deployment Frequency"),
        Cell::new(format!("{} days reported", metrics.deployment_frequency.len())),
        Cell::new(format!("deployments={}", cfr.total_deployments)),
    ]);
    metrics_table.add_row(vec![
        Cell::new("Change Failure Rate"),
        color_coded_failure_rate_cell(cfr.change_failure_rate_pct),
        Cell::new(format!(
            "deployments={}, failures={}",
            cfr.total_deployments, cfr.failed_changes
        )),
    ]);
    metrics_table.add_row(vec![
        Cell::new("Lead Time avg"),
        color_coded_average_cell(&lead_seconds),
        Cell::new(format!("n={}", lead_seconds.len())),
    ]);
    metrics_table.add_row(vec![
        Cell::new("MTTR avg"),
        color_coded_average_cell(&recovery_seconds),
        Cell::new(format!("n={}", recovery_seconds.len())),
    ]);
    output.push_str(&format!("{metrics_table}\n\n"));

    if metrics.deployment_frequency.is_empty() {
        output.push_str(&format!("{}\n\n", bright_yellow("No deployments found.")));
    } else {
        add_section_header(&mut output, "📅", "Recent Deployment Days");

        let mut days_table = create_table();
        days_table.set_header(header(&["Date", "Day", "Deployments", "First", "Last"]));
        for day in metrics.deployment_frequency.iter().rev().take(RECENT_DAYS) {
            days_table.add_row(vec![
                Cell::new(day.date),
                Cell::new(&day.weekday),
                Cell::new(day.deployments),
                Cell::new(day.first_deploy_at_utc.format("%H:%M:%S")),
                Cell::new(day.last_deploy_at_utc.format("%H:%M:%S")),
            ]);
        }
        if metrics.deployment_frequency.len() > RECENT_DAYS {
            days_table.add_row(vec![
                Cell::new(format!(
                    "... and {} more",
                    metrics.deployment_frequency.len() - RECENT_DAYS
                ))
                .fg(TableColor::DarkGrey),
                Cell::new(""),
                Cell::new(""),
                Cell::new(""),
                Cell::new(""),
            ]);
        }
        output.push_str(&format!("{days_table}\n\n"));
    }

    output.push_str(&format!(
        "  {} {}  {}\n  {} {}  {}\n",
        dim("Lead Time avg:"),
        format_average(&lead_seconds),
        dim(format!("(n={})", lead_seconds.len())),
        dim("MTTR avg:"),
        format_average(&recovery_seconds),
        dim(format!("(n={})", recovery_seconds.len())),
    ));

    if !artifacts.is_empty() {
        output.push('\n');
        add_section_header(&mut output, "📁", "Artifacts");
        for path in artifacts {
            output.push_str(&format!("  {} {}\n", cyan("•"), path.display()));
        }
    }

    output
}
