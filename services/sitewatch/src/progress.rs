//! Project progress and date formatting

use chrono::{DateTime, Local, NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};

/// Planned duration of every project (three years)
pub const TOTAL_DAYS: u32 = 1095;

/// Elapsed and planned duration of a project, in whole days
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Progress {
    pub days_completed: u32,
    pub total_days: u32,
}

impl Progress {
    const NOT_STARTED: Progress = Progress {
        days_completed: 0,
        total_days: TOTAL_DAYS,
    };
}

/// Parse a backend timestamp into a local calendar date.
///
/// Accepts RFC 3339 timestamps, naive date-times and plain `YYYY-MM-DD`.
pub fn parse_date(raw: &str) -> Option<NaiveDate> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.with_timezone(&Local).date_naive());
    }
    for format in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"] {
        if let Ok(dt) = NaiveDateTime::parse_from_str(raw, format) {
            return Some(dt.date());
        }
    }
    NaiveDate::parse_from_str(raw, "%Y-%m-%d").ok()
}

/// Progress of a project created on `created`, as seen on `today`
pub fn progress_on(created: Option<&str>, today: NaiveDate) -> Progress {
    let Some(created) = created.and_then(parse_date) else {
        return Progress::NOT_STARTED;
    };
    let elapsed = (today - created).num_days().clamp(0, i64::from(TOTAL_DAYS));
    Progress {
        days_completed: elapsed as u32,
        total_days: TOTAL_DAYS,
    }
}

/// Progress of a project as of the local current date
pub fn project_progress(created: Option<&str>) -> Progress {
    progress_on(created, Local::now().date_naive())
}

/// Completion percentage clamped to `[0, 100]`
pub fn progress_percentage(days_completed: u32, total_days: u32) -> f64 {
    if total_days == 0 {
        return 0.0;
    }
    (f64::from(days_completed) / f64::from(total_days) * 100.0).clamp(0.0, 100.0)
}

/// Format a camera installation date as `DD-MM-YYYY`, or `N/A`
pub fn format_installed_date(created: Option<&str>) -> String {
    created
        .and_then(parse_date)
        .map(|date| date.format("%d-%m-%Y").to_string())
        .unwrap_or_else(|| "N/A".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use proptest::prelude::*;

    fn day(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn created_today_is_zero() {
        let today = day(2025, 6, 1);
        assert_eq!(
            progress_on(Some("2025-06-01"), today),
            Progress {
                days_completed: 0,
                total_days: 1095
            }
        );
    }

    #[test]
    fn counts_whole_days() {
        let today = day(2025, 6, 1);
        let created = (today - Duration::days(100)).format("%Y-%m-%d").to_string();
        assert_eq!(progress_on(Some(created.as_str()), today).days_completed, 100);
    }

    #[test]
    fn time_of_day_is_ignored() {
        let today = day(2025, 6, 1);
        let progress = progress_on(Some("2025-05-31T23:59:59"), today);
        assert_eq!(progress.days_completed, 1);
    }

    #[test]
    fn clamps_to_total() {
        let today = day(2025, 6, 1);
        let progress = progress_on(Some("2015-01-01"), today);
        assert_eq!(progress.days_completed, TOTAL_DAYS);
    }

    #[test]
    fn future_dates_clamp_to_zero() {
        let today = day(2025, 6, 1);
        assert_eq!(progress_on(Some("2026-01-01"), today).days_completed, 0);
    }

    #[test]
    fn missing_or_garbage_date_is_not_started() {
        let today = day(2025, 6, 1);
        assert_eq!(progress_on(None, today), Progress::NOT_STARTED);
        assert_eq!(progress_on(Some(""), today), Progress::NOT_STARTED);
        assert_eq!(progress_on(Some("yesterday"), today), Progress::NOT_STARTED);
    }

    #[test]
    fn rfc3339_timestamps_parse() {
        assert!(parse_date("2024-03-05T10:00:00.000Z").is_some());
        assert!(parse_date("2024-03-05T10:00:00+04:00").is_some());
    }

    #[test]
    fn installed_date_is_zero_padded() {
        assert_eq!(format_installed_date(Some("2024-03-05")), "05-03-2024");
        assert_eq!(format_installed_date(Some("2024-03-05 08:30:00")), "05-03-2024");
    }

    #[test]
    fn installed_date_falls_back_to_na() {
        assert_eq!(format_installed_date(None), "N/A");
        assert_eq!(format_installed_date(Some("not a date")), "N/A");
    }

    #[test]
    fn percentage_handles_zero_total() {
        assert_eq!(progress_percentage(10, 0), 0.0);
        assert_eq!(progress_percentage(0, 1095), 0.0);
        assert_eq!(progress_percentage(1095, 1095), 100.0);
        assert_eq!(progress_percentage(2000, 1095), 100.0);
    }

    proptest! {
        #[test]
        fn never_exceeds_total(offset in -5000i64..5000) {
            let today = day(2025, 6, 1);
            let created = (today - Duration::days(offset)).format("%Y-%m-%d").to_string();
            let progress = progress_on(Some(created.as_str()), today);
            prop_assert!(progress.days_completed <= TOTAL_DAYS);
            prop_assert_eq!(progress.total_days, TOTAL_DAYS);
            prop_assert_eq!(i64::from(progress.days_completed), offset.clamp(0, 1095));
        }

        #[test]
        fn arbitrary_text_never_panics(raw in ".*") {
            let progress = progress_on(Some(raw.as_str()), day(2025, 6, 1));
            prop_assert!(progress.days_completed <= TOTAL_DAYS);
        }
    }
}
