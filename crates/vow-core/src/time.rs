//! Wall-clock helpers: instant → local time/date in a named timezone, and
//! the ±N-minute window match shared by every time-of-day notification.

use chrono::{DateTime, NaiveDate, Timelike, Utc};
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};
use tracing::warn;

const MINUTES_PER_DAY: u32 = 24 * 60;

/// Hour and minute on a local wall clock.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LocalTime {
    pub hours: u32,
    pub minutes: u32,
}

impl LocalTime {
    pub fn new(hours: u32, minutes: u32) -> Self {
        Self {
            hours: hours % 24,
            minutes: minutes % 60,
        }
    }

    /// Minutes since local midnight.
    pub fn minute_of_day(self) -> u32 {
        self.hours * 60 + self.minutes
    }

    pub fn from_minute_of_day(m: u32) -> Self {
        let m = m % MINUTES_PER_DAY;
        Self::new(m / 60, m % 60)
    }
}

impl std::fmt::Display for LocalTime {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:02}:{:02}", self.hours, self.minutes)
    }
}

/// Resolve an IANA timezone name. Unknown or empty names fall back to UTC.
pub fn resolve_tz(name: &str) -> Tz {
    match name.trim().parse::<Tz>() {
        Ok(tz) => tz,
        Err(_) => {
            if !name.trim().is_empty() {
                warn!(timezone = %name, "unknown timezone, falling back to UTC");
            }
            Tz::UTC
        }
    }
}

/// Wall-clock hour/minute of `instant` in `tz_name`.
pub fn local_time(instant: DateTime<Utc>, tz_name: &str) -> LocalTime {
    let local = instant.with_timezone(&resolve_tz(tz_name));
    LocalTime::new(local.hour(), local.minute())
}

/// Calendar date of `instant` as observed in `tz_name`.
pub fn local_date(instant: DateTime<Utc>, tz_name: &str) -> NaiveDate {
    instant.with_timezone(&resolve_tz(tz_name)).date_naive()
}

/// Parse `HH:MM` (seconds, if present, are ignored).
pub fn parse_hhmm(s: &str) -> Option<LocalTime> {
    let mut parts = s.trim().split(':');
    let hours: u32 = parts.next()?.parse().ok()?;
    let minutes: u32 = parts.next()?.parse().ok()?;
    if hours > 23 || minutes > 59 {
        return None;
    }
    Some(LocalTime { hours, minutes })
}

/// Distance between two clock readings in minutes, going the short way
/// round midnight (never more than 12 hours).
pub fn minutes_apart(a: LocalTime, b: LocalTime) -> u32 {
    let diff = a.minute_of_day().abs_diff(b.minute_of_day());
    if diff > MINUTES_PER_DAY / 2 {
        MINUTES_PER_DAY - diff
    } else {
        diff
    }
}

/// True when `now` is within `tolerance_minutes` of `target`, inclusive.
pub fn within_window(now: LocalTime, target: LocalTime, tolerance_minutes: u32) -> bool {
    minutes_apart(now, target) <= tolerance_minutes
}

/// Convenience: does `instant`, viewed in `tz_name`, fall inside the window
/// around the `HH:MM` string `target`? Unparseable targets never match.
pub fn matches_local_time(
    instant: DateTime<Utc>,
    tz_name: &str,
    target: &str,
    tolerance_minutes: u32,
) -> bool {
    match parse_hhmm(target) {
        Some(t) => within_window(local_time(instant, tz_name), t, tolerance_minutes),
        None => {
            warn!(target = %target, "unparseable HH:MM, skipping match");
            false
        }
    }
}

/// Local date of the occurrence of `target` nearest to `instant`. A 00:02
/// reading against a 23:58 target belongs to the previous day, so a match
/// window straddling midnight is keyed by one date only.
pub fn occurrence_date(instant: DateTime<Utc>, tz_name: &str, target: LocalTime) -> NaiveDate {
    let local = instant.with_timezone(&resolve_tz(tz_name));
    let date = local.date_naive();
    let now = local.hour() * 60 + local.minute();
    let at = target.minute_of_day();
    if at > now && at - now > MINUTES_PER_DAY / 2 {
        date.pred_opt().unwrap_or(date)
    } else if now > at && now - at > MINUTES_PER_DAY / 2 {
        date.succ_opt().unwrap_or(date)
    } else {
        date
    }
}
