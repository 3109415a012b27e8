//! Compact duration tokens such as `3d6h5m2s`.
//!
//! A token is one or more `<digits><unit>` groups with no separators. Units
//! are `w`, `d`, `h`, `m` and `s` in either case and may repeat in any
//! order; the groups are summed. Anything that is not entirely made of such
//! groups is rejected, as is a total too large to represent.

use std::sync::LazyLock;
use std::time::Duration;

use chrono::{DateTime, Local, TimeDelta, Utc};
use regex::Regex;

static TOKEN_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)^(?:[0-9]+[wdhms])+$").expect("valid token regex"));

static GROUP_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)([0-9]+)([wdhms])").expect("valid group regex"));

const MINUTE: u64 = 60;
const HOUR: u64 = 60 * MINUTE;
const DAY: u64 = 24 * HOUR;
const WEEK: u64 = 7 * DAY;

fn unit_seconds(unit: &str) -> Option<u64> {
    match unit {
        "w" | "W" => Some(WEEK),
        "d" | "D" => Some(DAY),
        "h" | "H" => Some(HOUR),
        "m" | "M" => Some(MINUTE),
        "s" | "S" => Some(1),
        _ => None,
    }
}

/// Parse a duration token. Returns `None` unless the whole token matches.
///
/// All-zero tokens such as `0s` are valid and yield a zero duration.
pub fn parse_duration(token: &str) -> Option<Duration> {
    if !TOKEN_REGEX.is_match(token) {
        return None;
    }

    let mut total: u64 = 0;
    for caps in GROUP_REGEX.captures_iter(token) {
        let amount: u64 = caps.get(1)?.as_str().parse().ok()?;
        let unit = unit_seconds(caps.get(2)?.as_str())?;
        total = total.checked_add(amount.checked_mul(unit)?)?;
    }
    Some(Duration::from_secs(total))
}

/// Parse a token and compute the expiry instant relative to `now`.
pub fn expiry_after(token: &str, now: DateTime<Utc>) -> Option<(Duration, DateTime<Utc>)> {
    let duration = parse_duration(token)?;
    let delta = TimeDelta::from_std(duration).ok()?;
    let expiry = now.checked_add_signed(delta)?;
    Some((duration, expiry))
}

/// Render a duration as `H:MM:SS`, prefixed with a day count when it spans
/// at least one day (`3 days, 6:05:02`).
pub fn format_duration(duration: Duration) -> String {
    let secs = duration.as_secs();
    let days = secs / DAY;
    let hours = (secs % DAY) / HOUR;
    let minutes = (secs % HOUR) / MINUTE;
    let seconds = secs % MINUTE;
    let clock = format!("{hours}:{minutes:02}:{seconds:02}");
    match days {
        0 => clock,
        1 => format!("1 day, {clock}"),
        n => format!("{n} days, {clock}"),
    }
}

/// Render an instant in local time as `YYYY-MM-DD HH:MM:SS`.
pub fn format_instant(instant: DateTime<Utc>) -> String {
    instant.with_timezone(&Local).format("%F %T").to_string()
}
