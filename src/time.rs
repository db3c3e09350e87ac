use chrono::{DateTime, Duration, NaiveDate, NaiveDateTime, SecondsFormat, Utc};
use serde::{Deserialize, Deserializer, Serialize};

use crate::error::DoraLensError;

/// Slack added past "now" so builds finishing while the query runs are kept.
const WINDOW_END_SLACK_MINUTES: i64 = 5;

/// Query window `[since, until]`, both in UTC.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TimeWindow {
    pub since: DateTime<Utc>,
    pub until: DateTime<Utc>,
}

impl TimeWindow {
    /// Window covering the last `days` days, ending a few minutes after `now`.
    ///
    /// # Errors
    ///
    /// Returns [`DoraLensError::Config`] when the window falls outside the
    /// representable date range.
    pub fn last_days(now: DateTime<Utc>, days: u32) -> crate::error::Result<Self> {
        let until = now
            .checked_add_signed(Duration::minutes(WINDOW_END_SLACK_MINUTES))
            .ok_or_else(|| DoraLensError::Config(format!("window end after {now} is out of range")))?;
        let since = until
            .checked_sub_signed(Duration::days(i64::from(days)))
            .ok_or_else(|| DoraLensError::Config(format!("--days {days} reaches past the supported date range")))?;
        Ok(Self { since, until })
    }
}

/// Parses an API timestamp into UTC.
///
/// Accepts RFC 3339 with any offset (`Z`, `+02:00`) and up to nanosecond
/// fractions. Offset-less timestamps are taken as UTC. Blank or malformed
/// input yields `None`.
pub fn parse_utc(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }

    DateTime::parse_from_rfc3339(raw)
        .map(|dt| dt.with_timezone(&Utc))
        .ok()
        .or_else(|| {
            NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f")
                .ok()
                .map(|naive| naive.and_utc())
        })
}

/// Serde helper for optional timestamps that may be null, blank or garbage.
pub fn deserialize_optional_utc<'de, D>(deserializer: D) -> Result<Option<DateTime<Utc>>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<String>::deserialize(deserializer)?;
    Ok(raw.as_deref().and_then(parse_utc))
}

/// ISO-8601 rendering with an explicit `+00:00` offset.
pub fn fmt_iso(dt: &DateTime<Utc>) -> String {
    dt.to_rfc3339_opts(SecondsFormat::AutoSi, false)
}

pub fn day_key(dt: &DateTime<Utc>) -> NaiveDate {
    dt.date_naive()
}

/// Short English weekday name (`Mon`, `Tue`, ...).
pub fn weekday_label(date: NaiveDate) -> String {
    date.format("%a").to_string()
}

/// Elapsed whole seconds, rounded to the nearest second.
#[allow(clippy::cast_precision_loss, clippy::cast_possible_truncation)]
pub fn whole_seconds(delta: Duration) -> i64 {
    (delta.num_milliseconds() as f64 / 1000.0).round() as i64
}

pub fn round_to(value: f64, places: i32) -> f64 {
    let factor = 10f64.powi(places);
    (value * factor).round() / factor
}

#[allow(clippy::cast_precision_loss)]
pub fn seconds_to_hours(seconds: i64) -> f64 {
    round_to(seconds as f64 / 3600.0, 3)
}

/// Renders a duration as `1d 2h 3m 4s`.
///
/// Leading zero units are dropped, seconds are always shown and negative
/// durations carry a leading `-`.
pub fn human_duration(seconds: i64) -> String {
    let negative = seconds < 0;
    let total = seconds.unsigned_abs();

    let days = total / 86_400;
    let hours = (total % 86_400) / 3_600;
    let minutes = (total % 3_600) / 60;
    let secs = total % 60;

    let mut parts = Vec::with_capacity(4);
    if days > 0 {
        parts.push(format!("{days}d"));
    }
    if hours > 0 || days > 0 {
        parts.push(format!("{hours}h"));
    }
    if minutes > 0 || hours > 0 || days > 0 {
        parts.push(format!("{minutes}m"));
    }
    parts.push(format!("{secs}s"));

    let rendered = parts.join(" ");
    if negative {
        format!("-{rendered}")
    } else {
        rendered
    }
}

/// Mean of `seconds` rendered as `{h}h {m}m {s}s`, or `n/a` when empty.
#[allow(
    clippy::cast_precision_loss,
    clippy::cast_possible_truncation,
    clippy::cast_sign_loss
)]
pub fn format_average(seconds: &[i64]) -> String {
    if seconds.is_empty() {
        return "n/a".to_string();
    }

    let avg = seconds.iter().map(|s| *s as f64).sum::<f64>() / seconds.len() as f64;
    let hours = avg.div_euclid(3600.0) as i64;
    let minutes = avg.rem_euclid(3600.0).div_euclid(60.0) as i64;
    let secs = avg.rem_euclid(60.0) as i64;

    format!("{hours}h {minutes}m {secs}s")
}
