//! Date and wall-clock helpers.
//!
//! Dates travel as `YYYY-MM-DD` strings and times as `HH:MM` strings so that
//! lexicographic order equals chronological order. These helpers parse them
//! with chrono when arithmetic is needed.

use chrono::{Datelike, Duration, Months, NaiveDate, NaiveTime, Timelike};

use crate::error::{LessonDirError, LessonDirResult};

const MINUTES_PER_DAY: i64 = 24 * 60;

pub fn parse_date(s: &str) -> LessonDirResult<NaiveDate> {
    NaiveDate::parse_from_str(s, "%Y-%m-%d").map_err(|_| LessonDirError::InvalidDate(s.to_string()))
}

pub fn format_date(date: NaiveDate) -> String {
    date.format("%Y-%m-%d").to_string()
}

/// Strict `HH:MM` parse, returning minutes since midnight.
pub fn parse_time(s: &str) -> LessonDirResult<i64> {
    let time = NaiveTime::parse_from_str(s, "%H:%M")
        .map_err(|_| LessonDirError::InvalidTime(s.to_string()))?;
    Ok(i64::from(time.hour()) * 60 + i64::from(time.minute()))
}

/// Lenient `HH:MM` to minutes. Returns `None` when the hour part is unreadable;
/// a missing or unreadable minute part counts as zero.
pub fn time_to_minutes(hhmm: &str) -> Option<i64> {
    let mut parts = hhmm.split(':');
    let hours: i64 = parts.next()?.trim().parse().ok()?;
    let minutes: i64 = parts
        .next()
        .and_then(|m| m.trim().parse().ok())
        .unwrap_or(0);
    Some(hours * 60 + minutes)
}

/// Format minutes as `HH:MM`, wrapping into a single day.
pub fn minutes_to_time(total: i64) -> String {
    let t = total.rem_euclid(MINUTES_PER_DAY);
    format!("{:02}:{:02}", t / 60, t % 60)
}

/// `start + minutes`, wrapping at midnight.
pub fn add_minutes(start: &str, minutes: i64) -> String {
    minutes_to_time(time_to_minutes(start).unwrap_or(0) + minutes)
}

/// Monday of the week containing `date`.
pub fn week_start(date: &str) -> LessonDirResult<String> {
    let d = parse_date(date)?;
    let offset = i64::from(d.weekday().num_days_from_monday());
    Ok(format_date(d - Duration::days(offset)))
}

pub fn add_days(date: &str, days: i64) -> LessonDirResult<String> {
    Ok(format_date(parse_date(date)? + Duration::days(days)))
}

/// Day-of-week index with Monday = 0 .. Sunday = 6.
pub fn weekday_index(date: &str) -> LessonDirResult<u8> {
    // num_days_from_monday is always 0..=6
    Ok(parse_date(date)?.weekday().num_days_from_monday() as u8)
}

/// Inclusive `[start, end]` bounds of the Monday-aligned week containing `anchor`.
pub fn week_bounds(anchor: &str) -> LessonDirResult<(String, String)> {
    let start = week_start(anchor)?;
    let end = add_days(&start, 6)?;
    Ok((start, end))
}

/// Inclusive `[first, last]` bounds of the calendar month containing `anchor`.
pub fn month_bounds(anchor: &str) -> LessonDirResult<(String, String)> {
    let d = parse_date(anchor)?;
    let first = d
        .with_day(1)
        .ok_or_else(|| LessonDirError::InvalidDate(anchor.to_string()))?;
    let last = first
        .checked_add_months(Months::new(1))
        .and_then(|next| next.pred_opt())
        .ok_or_else(|| LessonDirError::InvalidDate(anchor.to_string()))?;
    Ok((format_date(first), format_date(last)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_week_start_is_monday() {
        assert_eq!(week_start("2024-01-08").unwrap(), "2024-01-08");
        assert_eq!(week_start("2024-01-14").unwrap(), "2024-01-08");
        assert_eq!(week_start("2024-01-10").unwrap(), "2024-01-08");
        // Crosses a year boundary
        assert_eq!(week_start("2024-01-02").unwrap(), "2024-01-01");
        assert_eq!(week_start("2023-01-01").unwrap(), "2022-12-26");
    }

    #[test]
    fn test_weekday_index() {
        assert_eq!(weekday_index("2024-01-08").unwrap(), 0);
        assert_eq!(weekday_index("2024-01-14").unwrap(), 6);
    }

    #[test]
    fn test_add_minutes_wraps_at_midnight() {
        assert_eq!(add_minutes("18:00", 30), "18:30");
        assert_eq!(add_minutes("23:45", 30), "00:15");
        assert_eq!(minutes_to_time(-15), "23:45");
    }

    #[test]
    fn test_time_to_minutes_is_lenient() {
        assert_eq!(time_to_minutes("18:30"), Some(1110));
        assert_eq!(time_to_minutes("7"), Some(420));
        assert_eq!(time_to_minutes(""), None);
    }

    #[test]
    fn test_parse_rejects_malformed_input() {
        assert!(parse_date("2024-13-01").is_err());
        assert!(parse_date("08/01/2024").is_err());
        assert!(parse_time("25:00").is_err());
        assert_eq!(parse_time("09:05").unwrap(), 545);
    }

    #[test]
    fn test_week_bounds() {
        let (start, end) = week_bounds("2024-01-10").unwrap();
        assert_eq!(start, "2024-01-08");
        assert_eq!(end, "2024-01-14");
    }

    #[test]
    fn test_month_bounds() {
        assert_eq!(
            month_bounds("2024-02-10").unwrap(),
            ("2024-02-01".to_string(), "2024-02-29".to_string())
        );
        assert_eq!(
            month_bounds("2023-12-31").unwrap(),
            ("2023-12-01".to_string(), "2023-12-31".to_string())
        );
        assert!(month_bounds("2024-02-30").is_err());
    }
}
