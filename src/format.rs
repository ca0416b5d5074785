//! Display formatting for dates and server-supplied text.

use chrono::{DateTime, TimeZone, Utc};
use regex::Regex;
use std::fmt::Display;
use std::sync::LazyLock;

const MS_PER_DAY: u64 = 24 * 60 * 60 * 1000;

static WHITESPACE_RUN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\s+").expect("static regex is valid"));

/// Number of days between two instants, rounded up.
///
/// Only an exact match yields 0; anything up to a full day counts as 1.
pub fn elapsed_days(pub_date: &DateTime<Utc>, now: &DateTime<Utc>) -> u64 {
    let diff_ms = (*now - *pub_date).num_milliseconds().unsigned_abs();
    diff_ms.div_ceil(MS_PER_DAY)
}

/// Format a publication date relative to `now`.
///
/// Recent dates become "Today", "Yesterday" or "N days ago"; a week or more
/// falls back to a short date rendered in `tz`.
///
/// ```
/// use chrono::{Duration, TimeZone, Utc};
/// use podcast_tracker::format::format_pub_date;
///
/// let now = Utc.with_ymd_and_hms(2024, 3, 20, 12, 0, 0).unwrap();
/// assert_eq!(format_pub_date(&(now - Duration::days(3)), &now, &Utc), "3 days ago");
/// assert_eq!(format_pub_date(&(now - Duration::days(15)), &now, &Utc), "Mar 5, 2024");
/// ```
pub fn format_pub_date<Tz>(pub_date: &DateTime<Utc>, now: &DateTime<Utc>, tz: &Tz) -> String
where
    Tz: TimeZone,
    Tz::Offset: Display,
{
    match elapsed_days(pub_date, now) {
        0 => "Today".to_string(),
        1 => "Yesterday".to_string(),
        days @ 2..=6 => format!("{} days ago", days),
        _ => pub_date.with_timezone(tz).format("%b %-d, %Y").to_string(),
    }
}

/// Drop control characters so server text cannot drive the terminal.
pub fn strip_control(text: &str) -> String {
    text.chars()
        .map(|c| if c == '\n' || c == '\t' { ' ' } else { c })
        .filter(|c| !c.is_control())
        .collect()
}

/// Collapse whitespace runs (feeds love blank lines) into single spaces.
pub fn collapse_whitespace(text: &str) -> String {
    WHITESPACE_RUN.replace_all(text.trim(), " ").into_owned()
}

/// Truncate to at most `max` characters, ending with "..." when cut.
pub fn truncate_chars(text: &str, max: usize) -> String {
    if text.chars().count() > max {
        let keep = max.saturating_sub(3);
        format!("{}...", text.chars().take(keep).collect::<String>())
    } else {
        text.to_string()
    }
}
