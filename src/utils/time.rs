//! Timestamp helpers. Bing reports times in UTC; replies show them in the
//! configured local zone.

use std::sync::LazyLock;

use chrono::{DateTime, NaiveDateTime, TimeZone, Utc};
use chrono_tz::Tz;
use regex::Regex;
use tracing::error;

/// Display format for every timestamp the plugin emits.
pub const LOCAL_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

const UTC_WIRE_FORMAT: &str = "%Y-%m-%dT%H:%M:%SZ";

/// Matches the fractional seconds Bing appends, e.g. `.0000000Z`.
static FRACTION: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\.\d+Z$").expect("fraction pattern is valid"));

/// Parses a timezone name, falling back to `Asia/Shanghai` when it is unknown.
pub fn parse_timezone(name: &str) -> Tz {
    name.parse().unwrap_or_else(|e| {
        error!("Unknown timezone {:?} ({}), using Asia/Shanghai", name, e);
        chrono_tz::Asia::Shanghai
    })
}

/// Converts a UTC wire timestamp (`2024-01-01T03:00:00Z`, optionally with a
/// fractional-seconds suffix) to a local timestamp string in `tz`.
///
/// Anything that does not parse is returned unchanged.
pub fn format_utc_to_local(utc: &str, tz: &Tz) -> String {
    let normalized = FRACTION.replace(utc, "Z");

    match NaiveDateTime::parse_from_str(&normalized, UTC_WIRE_FORMAT) {
        Ok(naive) => Utc
            .from_utc_datetime(&naive)
            .with_timezone(tz)
            .format(LOCAL_FORMAT)
            .to_string(),
        Err(e) => {
            error!("Error converting time {:?}: {}", utc, e);
            utc.to_string()
        }
    }
}

/// Formats an instant as local time in `tz`.
pub fn local_time_string(now: DateTime<Utc>, tz: &Tz) -> String {
    now.with_timezone(tz).format(LOCAL_FORMAT).to_string()
}

/// The current local time in `tz`.
pub fn current_local_time(tz: &Tz) -> String {
    local_time_string(Utc::now(), tz)
}
