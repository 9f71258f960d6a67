//! Deterministic per-user, per-day send time for motivational messages.
//!
//! The same `(user, local date)` always maps to the same minute, so a
//! re-run tick agrees with the previous one, while different users and
//! different days spread out across the window.

use chrono::NaiveDate;
use vow_core::time::LocalTime;

const MINUTES_PER_DAY: u32 = 24 * 60;

/// A span of local wall-clock time, possibly crossing midnight.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DailyWindow {
    start_minute: u32,
    span_minutes: u32,
}

impl DailyWindow {
    /// `[start_hour:00, end_hour:00)`. An empty or inverted range wraps
    /// past midnight.
    pub fn hours(start_hour: u32, end_hour: u32) -> Self {
        Self::between(LocalTime::new(start_hour, 0), LocalTime::new(end_hour, 0))
    }

    /// From `start` to `end` on the local clock. `end` before `start` means
    /// the window crosses midnight; equal means the whole day.
    pub fn between(start: LocalTime, end: LocalTime) -> Self {
        let s = start.minute_of_day();
        let e = end.minute_of_day();
        let span = (e + MINUTES_PER_DAY - s) % MINUTES_PER_DAY;
        Self {
            start_minute: s,
            span_minutes: if span == 0 { MINUTES_PER_DAY } else { span },
        }
    }

    pub fn contains(&self, t: LocalTime) -> bool {
        let offset = (t.minute_of_day() + MINUTES_PER_DAY - self.start_minute) % MINUTES_PER_DAY;
        offset < self.span_minutes
    }
}

/// Rolling multiply-and-add string hash (`h = h * 31 + byte`, wrapping).
pub fn stable_hash(s: &str) -> u32 {
    s.bytes()
        .fold(0u32, |h, b| h.wrapping_mul(31).wrapping_add(u32::from(b)))
}

/// The minute inside `window` reserved for `user_id` on `date`.
pub fn daily_time(user_id: &str, date: NaiveDate, window: DailyWindow) -> LocalTime {
    let key = format!("{}:{}", user_id, date.format("%Y-%m-%d"));
    let offset = stable_hash(&key) % window.span_minutes;
    LocalTime::from_minute_of_day(window.start_minute + offset)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    fn day(n: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 1, 1).unwrap() + chrono::Days::new(u64::from(n))
    }

    #[test]
    fn same_input_same_time() {
        let w = DailyWindow::hours(8, 21);
        let a = daily_time("user-42", day(3), w);
        for _ in 0..10 {
            assert_eq!(daily_time("user-42", day(3), w), a);
        }
    }

    #[test]
    fn different_days_usually_differ() {
        let w = DailyWindow::hours(8, 21);
        let times: HashSet<_> = (0..60)
            .map(|d| daily_time("user-42", day(d), w).minute_of_day())
            .collect();
        assert!(times.len() >= 50, "only {} distinct times", times.len());
    }

    #[test]
    fn result_stays_inside_default_window() {
        let w = DailyWindow::hours(8, 21);
        for d in 0..200 {
            let t = daily_time(&format!("u{d}"), day(d), w);
            assert!(t.hours >= 8 && t.hours < 21, "{t}");
        }
    }

    #[test]
    fn midnight_crossing_window() {
        let w = DailyWindow::between(LocalTime::new(22, 0), LocalTime::new(2, 0));
        assert!(w.contains(LocalTime::new(23, 30)));
        assert!(w.contains(LocalTime::new(1, 59)));
        assert!(!w.contains(LocalTime::new(2, 0)));
        assert!(!w.contains(LocalTime::new(12, 0)));
        for d in 0..100 {
            let t = daily_time("night-owl", day(d), w);
            assert!(t.hours >= 22 || t.hours < 2, "{t}");
        }
    }

    #[test]
    fn hash_matches_reference_values() {
        assert_eq!(stable_hash(""), 0);
        assert_eq!(stable_hash("a"), 97);
        assert_eq!(stable_hash("ab"), 97 * 31 + 98);
    }
}
