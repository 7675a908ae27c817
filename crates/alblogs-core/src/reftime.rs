//! Reference time parsing.

use chrono::{DateTime, NaiveDateTime, NaiveTime, TimeDelta, TimeZone, Utc};

use crate::error::TimeError;

/// Log files last modified within this long after the reference time are
/// candidates. Also how far back an unspecified reference time reaches.
pub const CANDIDATE_WINDOW: TimeDelta = TimeDelta::minutes(5);

const CLOCK_FORMAT: &str = "%H:%M";
const DATETIME_FORMAT: &str = "%Y-%m-%dT%H:%M";

/// Parse an operator-supplied reference time.
///
/// `now` supplies both the current instant and the zone wall-clock input is
/// interpreted in:
/// - empty input means `now` minus [`CANDIDATE_WINDOW`];
/// - `hh:mm` is that time on today's date in the zone of `now`;
/// - `yyyy-mm-ddThh:mm` is that wall-clock time in the zone of `now`.
///
/// Ambiguous wall-clock times (clock set back) resolve to the earliest
/// instant.
pub fn parse_reference_time<Tz: TimeZone>(
    input: &str,
    now: &DateTime<Tz>,
) -> Result<DateTime<Utc>, TimeError> {
    let input = input.trim();
    if input.is_empty() {
        return Ok(now.with_timezone(&Utc) - CANDIDATE_WINDOW);
    }

    let local = if let Ok(clock) = NaiveTime::parse_from_str(input, CLOCK_FORMAT) {
        now.date_naive().and_time(clock)
    } else {
        NaiveDateTime::parse_from_str(input, DATETIME_FORMAT)
            .map_err(|_| TimeError::Unparseable(input.to_string()))?
    };

    now.timezone()
        .from_local_datetime(&local)
        .earliest()
        .map(|t| t.with_timezone(&Utc))
        .ok_or_else(|| TimeError::Nonexistent(input.to_string()))
}
