//! Send-time computation.
//!
//! Given the user's quiet hours and the engagement heuristic, decide when a
//! notification may first be sent. Quiet hours always take precedence over
//! the best-hour heuristic; an explicit caller-supplied time is honored
//! exactly, with no clamping.

use chrono::{NaiveTime, TimeZone, Timelike};
use chrono_tz::Tz;

use crate::preferences::QuietHours;
use crate::types::Timestamp;

/// Hours of day historically associated with the highest read rates.
pub const BEST_HOURS: [u32; 4] = [9, 12, 18, 20];

/// Compute the earliest permissible send time.
pub fn compute_send_time(
    quiet: &QuietHours,
    now: Timestamp,
    explicit: Option<Timestamp>,
) -> Timestamp {
    if let Some(at) = explicit {
        return at;
    }

    let tz = resolve_timezone(&quiet.timezone);
    let local = now.with_timezone(&tz);

    if quiet.enabled && in_quiet_window(local.time(), quiet.start, quiet.end) {
        return next_quiet_end(local, quiet.start, quiet.end);
    }

    let hour = local.hour();
    if !BEST_HOURS.contains(&hour) {
        return next_best_hour(local);
    }

    now
}

/// Parse an IANA timezone name, falling back to UTC for unknown names.
fn resolve_timezone(name: &str) -> Tz {
    name.parse().unwrap_or_else(|_| {
        tracing::warn!(timezone = name, "Unknown timezone, falling back to UTC");
        Tz::UTC
    })
}

/// Whether `time` falls inside `[start, end)`, supporting windows that wrap
/// past midnight (start > end, e.g. 22:00 – 08:00).
fn in_quiet_window(time: NaiveTime, start: NaiveTime, end: NaiveTime) -> bool {
    if start <= end {
        time >= start && time < end
    } else {
        time >= start || time < end
    }
}

/// The next `end` boundary at or after `local`.
fn next_quiet_end(local: chrono::DateTime<Tz>, start: NaiveTime, end: NaiveTime) -> Timestamp {
    // Inside a same-day window, or inside the pre-midnight tail of a
    // wrapping window, the boundary is tomorrow's `end` for the tail and
    // today's `end` otherwise.
    let date = if start > end && local.time() >= start {
        local.date_naive() + chrono::Days::new(1)
    } else {
        local.date_naive()
    };
    local_to_utc(local.timezone(), date, end)
}

/// The next hour in [`BEST_HOURS`]: later today if one remains, otherwise
/// tomorrow's first best hour.
fn next_best_hour(local: chrono::DateTime<Tz>) -> Timestamp {
    let hour = local.hour();
    match BEST_HOURS.iter().find(|h| **h > hour) {
        Some(&h) => local_to_utc(
            local.timezone(),
            local.date_naive(),
            NaiveTime::from_hms_opt(h, 0, 0).expect("valid best hour"),
        ),
        None => local_to_utc(
            local.timezone(),
            local.date_naive() + chrono::Days::new(1),
            NaiveTime::from_hms_opt(BEST_HOURS[0], 0, 0).expect("valid best hour"),
        ),
    }
}

/// Resolve a local wall-clock time to UTC. Around DST transitions the
/// earliest valid interpretation is used; a nonexistent local time (spring
/// forward) shifts one hour later.
fn local_to_utc(tz: Tz, date: chrono::NaiveDate, time: NaiveTime) -> Timestamp {
    let naive = date.and_time(time);
    match tz.from_local_datetime(&naive).earliest() {
        Some(dt) => dt.with_timezone(&chrono::Utc),
        None => tz
            .from_local_datetime(&(naive + chrono::Duration::hours(1)))
            .earliest()
            .map(|dt| dt.with_timezone(&chrono::Utc))
            // Degenerate calendars only; UTC has no gaps.
            .unwrap_or_else(|| chrono::Utc.from_utc_datetime(&naive)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn utc_quiet(enabled: bool, start: (u32, u32), end: (u32, u32)) -> QuietHours {
        QuietHours {
            enabled,
            start: NaiveTime::from_hms_opt(start.0, start.1, 0).unwrap(),
            end: NaiveTime::from_hms_opt(end.0, end.1, 0).unwrap(),
            timezone: "UTC".to_string(),
        }
    }

    fn at(h: u32, m: u32) -> Timestamp {
        Utc.with_ymd_and_hms(2026, 3, 10, h, m, 0).unwrap()
    }

    #[test]
    fn explicit_time_is_honored_exactly() {
        let quiet = utc_quiet(true, (22, 0), (8, 0));
        // 23:30 is deep inside quiet hours; explicit still wins.
        let explicit = at(23, 30);
        assert_eq!(compute_send_time(&quiet, at(23, 0), Some(explicit)), explicit);
    }

    #[test]
    fn quiet_hours_defer_to_next_end_boundary() {
        // Scenario: quiet 22:00–08:00, now 23:00 -> 08:00 next day.
        let quiet = utc_quiet(true, (22, 0), (8, 0));
        let sent = compute_send_time(&quiet, at(23, 0), None);
        assert_eq!(sent, Utc.with_ymd_and_hms(2026, 3, 11, 8, 0, 0).unwrap());
    }

    #[test]
    fn quiet_hours_early_morning_defer_to_same_day_end() {
        let quiet = utc_quiet(true, (22, 0), (8, 0));
        let sent = compute_send_time(&quiet, at(3, 15), None);
        assert_eq!(sent, Utc.with_ymd_and_hms(2026, 3, 10, 8, 0, 0).unwrap());
    }

    #[test]
    fn quiet_result_is_never_inside_the_window() {
        let quiet = utc_quiet(true, (22, 0), (8, 0));
        for hour in 0..24 {
            let sent = compute_send_time(&quiet, at(hour, 30), None);
            let t = sent.time();
            assert!(
                !in_quiet_window(t, quiet.start, quiet.end),
                "hour {hour} scheduled inside quiet window at {t}"
            );
        }
    }

    #[test]
    fn same_day_window_defers_to_today_end() {
        let quiet = utc_quiet(true, (13, 0), (15, 0));
        let sent = compute_send_time(&quiet, at(14, 0), None);
        // 15:00 is not a best hour but quiet hours take precedence over the
        // best-hour heuristic, so the boundary itself is returned.
        assert_eq!(sent, Utc.with_ymd_and_hms(2026, 3, 10, 15, 0, 0).unwrap());
    }

    #[test]
    fn non_best_hour_defers_to_next_best_hour() {
        // Scenario: 10:00 is not in {9, 12, 18, 20} -> 12:00 same day.
        let quiet = utc_quiet(false, (22, 0), (8, 0));
        let sent = compute_send_time(&quiet, at(10, 0), None);
        assert_eq!(sent, Utc.with_ymd_and_hms(2026, 3, 10, 12, 0, 0).unwrap());
    }

    #[test]
    fn late_evening_defers_to_tomorrow_first_best_hour() {
        let quiet = utc_quiet(false, (22, 0), (8, 0));
        let sent = compute_send_time(&quiet, at(21, 5), None);
        assert_eq!(sent, Utc.with_ymd_and_hms(2026, 3, 11, 9, 0, 0).unwrap());
    }

    #[test]
    fn best_hour_sends_immediately() {
        let quiet = utc_quiet(false, (22, 0), (8, 0));
        let now = at(12, 41);
        assert_eq!(compute_send_time(&quiet, now, None), now);
    }

    #[test]
    fn quiet_hours_take_precedence_over_best_hours() {
        // 09:00 is a best hour but sits inside an 08:00–10:00 window.
        let quiet = utc_quiet(true, (8, 0), (10, 0));
        let sent = compute_send_time(&quiet, at(9, 0), None);
        assert_eq!(sent, Utc.with_ymd_and_hms(2026, 3, 10, 10, 0, 0).unwrap());
    }

    #[test]
    fn user_timezone_is_respected() {
        // 02:00 UTC is 23:00 the previous day in Santiago (UTC-3), inside
        // quiet hours; the boundary is 08:00 Santiago = 11:00 UTC.
        let quiet = QuietHours {
            enabled: true,
            start: NaiveTime::from_hms_opt(22, 0, 0).unwrap(),
            end: NaiveTime::from_hms_opt(8, 0, 0).unwrap(),
            timezone: "America/Santiago".to_string(),
        };
        let now = Utc.with_ymd_and_hms(2026, 1, 10, 2, 0, 0).unwrap();
        let sent = compute_send_time(&quiet, now, None);
        assert_eq!(sent, Utc.with_ymd_and_hms(2026, 1, 10, 11, 0, 0).unwrap());
    }

    #[test]
    fn unknown_timezone_falls_back_to_utc() {
        let mut quiet = utc_quiet(true, (22, 0), (8, 0));
        quiet.timezone = "Mars/Olympus_Mons".to_string();
        let sent = compute_send_time(&quiet, at(23, 0), None);
        assert_eq!(sent, Utc.with_ymd_and_hms(2026, 3, 11, 8, 0, 0).unwrap());
    }

    #[test]
    fn disabled_quiet_hours_are_ignored() {
        let quiet = utc_quiet(false, (22, 0), (8, 0));
        // 23:00 would be quiet; with quiet disabled the best-hour rule
        // applies instead (tomorrow 09:00).
        let sent = compute_send_time(&quiet, at(23, 0), None);
        assert_eq!(sent, Utc.with_ymd_and_hms(2026, 3, 11, 9, 0, 0).unwrap());
    }
}
