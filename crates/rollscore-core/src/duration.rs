//! Duration helpers. Scoring works in fractional minutes (f64) derived from
//! millisecond-precision durations; nothing is truncated to whole minutes.

use chrono::{Duration, TimeDelta};

const MILLIS_PER_MINUTE: f64 = 60_000.0;

/// Convert a duration to fractional minutes.
pub fn to_minutes(d: Duration) -> f64 {
    d.num_milliseconds() as f64 / MILLIS_PER_MINUTE
}

/// Parse `[d.]hh:mm[:ss]`, e.g. `00:30:00` or `1.02:00:00`.
///
/// `None` for malformed input and for spans chrono cannot represent.
pub fn parse_timespan(s: &str) -> Option<Duration> {
    let s = s.trim();
    let (days, clock) = match s.split_once('.') {
        Some((d, rest)) if rest.contains(':') => (d.parse::<i64>().ok()?, rest),
        _ => (0, s),
    };
    let parts: Vec<&str> = clock.split(':').collect();
    let (h, m, sec) = match parts.as_slice() {
        [h, m] => (h.parse::<i64>().ok()?, m.parse::<i64>().ok()?, 0),
        [h, m, sec] => (
            h.parse::<i64>().ok()?,
            m.parse::<i64>().ok()?,
            sec.parse::<i64>().ok()?,
        ),
        _ => return None,
    };
    if days < 0 || h < 0 || m < 0 || sec < 0 || m > 59 || sec > 59 {
        return None;
    }
    TimeDelta::try_days(days)?
        .checked_add(&TimeDelta::try_hours(h)?)?
        .checked_add(&TimeDelta::try_minutes(m)?)?
        .checked_add(&TimeDelta::try_seconds(sec)?)
}

/// Render fractional minutes as `[d.]hh:mm:ss`, rounded to the second.
pub fn format_minutes(minutes: f64) -> String {
    let total = (minutes * 60.0).round() as i64;
    let sign = if total < 0 { "-" } else { "" };
    let total = total.unsigned_abs();
    let days = total / 86_400;
    let h = (total % 86_400) / 3_600;
    let m = (total % 3_600) / 60;
    let s = total % 60;
    if days > 0 {
        format!("{sign}{days}.{h:02}:{m:02}:{s:02}")
    } else {
        format!("{sign}{h:02}:{m:02}:{s:02}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sub_minute_precision_is_kept() {
        assert_eq!(to_minutes(Duration::seconds(90)), 1.5);
        assert_eq!(to_minutes(Duration::milliseconds(1_500)), 0.025);
    }

    #[test]
    fn parses_timespans() {
        assert_eq!(parse_timespan("00:10:00"), Some(Duration::minutes(10)));
        assert_eq!(parse_timespan("01:30"), Some(Duration::minutes(90)));
        assert_eq!(
            parse_timespan("1.02:00:05"),
            Some(Duration::hours(26) + Duration::seconds(5))
        );
        assert_eq!(parse_timespan("10"), None);
        assert_eq!(parse_timespan("00:75:00"), None);
        assert_eq!(parse_timespan("-1:00:00"), None);
    }

    #[test]
    fn out_of_range_timespan_is_rejected() {
        assert_eq!(parse_timespan("999999999999.00:00:00"), None);
        assert_eq!(parse_timespan("9223372036854775807:00:00"), None);
        assert_eq!(parse_timespan("106751991167.08:00:00"), None);
        assert!(parse_timespan("100000.00:00:00").is_some());
    }

    #[test]
    fn formats_like_timespans() {
        assert_eq!(format_minutes(90.0), "01:30:00");
        assert_eq!(format_minutes(0.5), "00:00:30");
        assert_eq!(format_minutes(1_560.0), "1.02:00:00");
        assert!(format_minutes(f64::NEG_INFINITY).starts_with('-'));
    }
}
