//! Time arithmetic and formatting helpers

use chrono::{DateTime, Datelike, Duration, Local, NaiveTime, TimeZone, Utc};

pub fn minutes_to_seconds(minutes: u64) -> u64 {
    minutes.saturating_mul(60)
}

/// Whole seconds from `since` to `now`, zero if `now` is earlier
pub fn elapsed_secs(since: DateTime<Utc>, now: DateTime<Utc>) -> u64 {
    (now - since).num_seconds().max(0) as u64
}

/// Format seconds as "MM:SS"
pub fn format_time(seconds: u64) -> String {
    format!("{:02}:{:02}", seconds / 60, seconds % 60)
}

/// Format a duration as "1h 2m 3s", dropping leading zero units
pub fn format_uptime(total_secs: u64) -> String {
    let hours = total_secs / 3600;
    let minutes = (total_secs % 3600) / 60;
    let seconds = total_secs % 60;

    if hours > 0 {
        format!("{}h {}m {}s", hours, minutes, seconds)
    } else if minutes > 0 {
        format!("{}m {}s", minutes, seconds)
    } else {
        format!("{}s", seconds)
    }
}

/// Both instants fall on the same local calendar day
pub fn is_same_local_day(date: DateTime<Utc>, now: DateTime<Utc>) -> bool {
    date.with_timezone(&Local).date_naive() == now.with_timezone(&Local).date_naive()
}

/// Local midnight of the Sunday starting the week containing `now`
pub fn local_week_start(now: DateTime<Utc>) -> DateTime<Utc> {
    let local = now.with_timezone(&Local);
    let days_since_sunday = local.weekday().num_days_from_sunday() as i64;
    let sunday = local.date_naive() - Duration::days(days_since_sunday);
    Local
        .from_local_datetime(&sunday.and_time(NaiveTime::MIN))
        .earliest()
        .map(|dt| dt.with_timezone(&Utc))
        .unwrap_or_else(|| now - Duration::days(days_since_sunday))
}

/// `date` is at or after the start of the local week containing `now`
pub fn is_same_local_week(date: DateTime<Utc>, now: DateTime<Utc>) -> bool {
    date >= local_week_start(now)
}

/// Both instants fall in the same local calendar month
pub fn is_same_local_month(date: DateTime<Utc>, now: DateTime<Utc>) -> bool {
    let date = date.with_timezone(&Local);
    let now = now.with_timezone(&Local);
    date.year() == now.year() && date.month() == now.month()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_minutes_to_seconds_saturates() {
        assert_eq!(minutes_to_seconds(25), 1500);
        assert_eq!(minutes_to_seconds(u64::MAX / 2), u64::MAX);
    }

    #[test]
    fn test_format_time() {
        assert_eq!(format_time(0), "00:00");
        assert_eq!(format_time(1500), "25:00");
        assert_eq!(format_time(1490), "24:50");
        assert_eq!(format_time(61), "01:01");
    }

    #[test]
    fn test_format_uptime() {
        assert_eq!(format_uptime(5), "5s");
        assert_eq!(format_uptime(65), "1m 5s");
        assert_eq!(format_uptime(3725), "1h 2m 5s");
    }

    #[test]
    fn elapsed_is_floored_and_never_negative() {
        let now = Utc::now();
        assert_eq!(elapsed_secs(now - Duration::milliseconds(10_900), now), 10);
        assert_eq!(elapsed_secs(now + Duration::seconds(5), now), 0);
    }

    #[test]
    fn week_start_is_a_sunday_not_after_now() {
        let now = Utc::now();
        let start = local_week_start(now);
        assert!(start <= now);
        assert_eq!(start.with_timezone(&Local).weekday(), chrono::Weekday::Sun);
        assert!(is_same_local_week(now, now));
        assert!(!is_same_local_week(now - Duration::days(8), now));
    }

    #[test]
    fn same_day_and_month() {
        let now = Utc::now();
        assert!(is_same_local_day(now, now));
        assert!(!is_same_local_day(now - Duration::days(2), now));
        assert!(is_same_local_month(now, now));
        assert!(!is_same_local_month(now - Duration::days(40), now));
    }
}
