//! Display strings for find timestamps, rendered in the submitter's zone.

use chrono::{DateTime, SecondsFormat, Utc};
use chrono_tz::Tz;
use dewmap_common::Find;

const SHORT: &str = "%b %-d, %-I:%M %p";
const LONG: &str = "%A, %B %-d, %Y, %-I:%M %p";

fn render(instant: DateTime<Utc>, zone: &str, pattern: &str) -> String {
    match zone.parse::<Tz>() {
        Ok(tz) => instant.with_timezone(&tz).format(pattern).to_string(),
        Err(_) => instant.to_rfc3339_opts(SecondsFormat::Secs, true),
    }
}

/// `Jan 5, 3:04 PM`
pub fn short_timestamp(find: &Find) -> String {
    render(find.created_at, find.display_zone(), SHORT)
}

/// `Monday, January 5, 2026, 3:04 PM`
pub fn long_timestamp(find: &Find) -> String {
    render(find.created_at, find.display_zone(), LONG)
}
