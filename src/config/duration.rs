//! Duration parsing utilities.

use anyhow::Context;
use std::time::Duration;

/// Shortest accepted scheduler period.
pub const MIN_INTERVAL: Duration = Duration::from_secs(60);

/// Parse a duration string like "1h", "30m", "300s", "300" into seconds.
/// Supports:
/// - Plain numbers (interpreted as seconds): "300"
/// - Seconds suffix: "300s"
/// - Minutes suffix: "30m"
/// - Hours suffix: "1h"
pub fn parse_duration_to_secs(s: &str) -> anyhow::Result<u64> {
    let s = s.trim();
    if s.is_empty() {
        anyhow::bail!("Empty duration string");
    }

    let (num_str, unit_secs, unit) = if let Some(n) = s.strip_suffix('h') {
        (n, 3600, "hours")
    } else if let Some(n) = s.strip_suffix('m') {
        (n, 60, "minutes")
    } else if let Some(n) = s.strip_suffix('s') {
        (n, 1, "seconds")
    } else {
        (s, 1, "duration")
    };

    let value: u64 = num_str
        .trim()
        .parse()
        .with_context(|| format!("Invalid {unit} value: {num_str}"))?;
    value
        .checked_mul(unit_secs)
        .with_context(|| format!("Duration too large: {s}"))
}

/// Parse a scheduler interval; anything shorter than a minute is rejected.
pub fn parse_interval(s: &str) -> anyhow::Result<Duration> {
    let interval = Duration::from_secs(parse_duration_to_secs(s)?);
    if interval < MIN_INTERVAL {
        anyhow::bail!("Sync interval must be at least one minute, got '{s}'");
    }
    Ok(interval)
}
