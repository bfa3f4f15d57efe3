//! Lesson counts and billable amounts per student.

use std::collections::BTreeMap;

use crate::clock;
use crate::error::LessonDirResult;
use crate::lesson::{Lesson, LessonStatus};
use crate::settings::RateMap;

/// Row label for lessons without a student.
pub const BLANK_STUDENT: &str = "—";

/// Which lessons count towards totals.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum StatusFilter {
    #[default]
    DoneOnly,
    /// Everything but canceled lessons.
    NotCanceled,
}

impl StatusFilter {
    pub fn includes(self, status: LessonStatus) -> bool {
        match self {
            StatusFilter::DoneOnly => status == LessonStatus::Done,
            StatusFilter::NotCanceled => status != LessonStatus::Canceled,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct StudentTotal {
    pub student: String,
    pub count: u32,
    /// Rate per lesson, 0 when none is set
    pub rate: f64,
    pub bill: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Totals {
    /// Inclusive `YYYY-MM-DD` window
    pub first: String,
    pub last: String,
    /// Sorted by student
    pub rows: Vec<StudentTotal>,
    pub lessons: u32,
    pub bill: f64,
}

/// Totals for lessons dated within `[first, last]` that pass `filter`.
pub fn tally(
    lessons: &[Lesson],
    first: &str,
    last: &str,
    filter: StatusFilter,
    rates: &RateMap,
) -> Totals {
    let mut counts: BTreeMap<&str, u32> = BTreeMap::new();
    for lesson in lessons {
        let date = lesson.date.as_str();
        if date < first || date > last || !filter.includes(lesson.status) {
            continue;
        }
        let student = if lesson.student.is_empty() {
            BLANK_STUDENT
        } else {
            lesson.student.as_str()
        };
        *counts.entry(student).or_default() += 1;
    }

    let rows: Vec<StudentTotal> = counts
        .into_iter()
        .map(|(student, count)| {
            let rate = rates.get(student).copied().unwrap_or(0.0);
            StudentTotal {
                student: student.to_string(),
                count,
                rate,
                bill: rate * f64::from(count),
            }
        })
        .collect();

    Totals {
        first: first.to_string(),
        last: last.to_string(),
        lessons: rows.iter().map(|r| r.count).sum(),
        bill: rows.iter().map(|r| r.bill).sum(),
        rows,
    }
}

/// Totals for the Monday-aligned week containing `anchor`.
pub fn week(
    lessons: &[Lesson],
    anchor: &str,
    filter: StatusFilter,
    rates: &RateMap,
) -> LessonDirResult<Totals> {
    let (first, last) = clock::week_bounds(anchor)?;
    Ok(tally(lessons, &first, &last, filter, rates))
}

/// Totals for the calendar month containing `anchor`.
pub fn month(
    lessons: &[Lesson],
    anchor: &str,
    filter: StatusFilter,
    rates: &RateMap,
) -> LessonDirResult<Totals> {
    let (first, last) = clock::month_bounds(anchor)?;
    Ok(tally(lessons, &first, &last, filter, rates))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lesson::LessonDraft;

    fn lesson(id: &str, date: &str, student: &str, status: LessonStatus) -> Lesson {
        Lesson::from_draft(
            id.into(),
            LessonDraft::new(date, "18:00", 30, student).with_status(status),
        )
    }

    fn sample() -> Vec<Lesson> {
        vec![
            lesson("1", "2024-01-08", "Ana", LessonStatus::Done),
            lesson("2", "2024-01-10", "Ana", LessonStatus::Done),
            lesson("3", "2024-01-09", "Bo", LessonStatus::Scheduled),
            lesson("4", "2024-01-11", "Bo", LessonStatus::Canceled),
            lesson("5", "2024-01-12", "", LessonStatus::Done),
            // Same month, other week
            lesson("6", "2024-01-29", "Bo", LessonStatus::Done),
            // Previous month
            lesson("7", "2023-12-31", "Ana", LessonStatus::Done),
        ]
    }

    #[test]
    fn test_week_and_month_windows() {
        let rates = RateMap::new();

        let week = week(&sample(), "2024-01-10", StatusFilter::NotCanceled, &rates).unwrap();
        assert_eq!((week.first.as_str(), week.last.as_str()), ("2024-01-08", "2024-01-14"));
        assert_eq!(week.lessons, 4);

        let month = month(&sample(), "2024-01-10", StatusFilter::NotCanceled, &rates).unwrap();
        assert_eq!((month.first.as_str(), month.last.as_str()), ("2024-01-01", "2024-01-31"));
        assert_eq!(month.lessons, 5);
    }

    #[test]
    fn test_status_filter() {
        let rates = RateMap::new();
        let done = week(&sample(), "2024-01-08", StatusFilter::DoneOnly, &rates).unwrap();
        let counts: Vec<_> = done.rows.iter().map(|r| (r.student.as_str(), r.count)).collect();
        assert_eq!(counts, [("Ana", 2), (BLANK_STUDENT, 1)]);

        let not_canceled =
            week(&sample(), "2024-01-08", StatusFilter::NotCanceled, &rates).unwrap();
        let counts: Vec<_> = not_canceled
            .rows
            .iter()
            .map(|r| (r.student.as_str(), r.count))
            .collect();
        assert_eq!(counts, [("Ana", 2), ("Bo", 1), (BLANK_STUDENT, 1)]);
    }

    #[test]
    fn test_bill_uses_rates_and_defaults_to_zero() {
        let rates = RateMap::from([("Ana".to_string(), 25.0), ("Bo".to_string(), 12.5)]);

        let totals = month(&sample(), "2024-01-20", StatusFilter::NotCanceled, &rates).unwrap();

        let bills: Vec<_> = totals
            .rows
            .iter()
            .map(|r| (r.student.as_str(), r.count, r.rate, r.bill))
            .collect();
        assert_eq!(
            bills,
            [("Ana", 2, 25.0, 50.0), ("Bo", 2, 12.5, 25.0), (BLANK_STUDENT, 1, 0.0, 0.0)]
        );
        assert_eq!(totals.bill, 75.0);
    }

    #[test]
    fn test_empty_window() {
        let totals =
            week(&sample(), "2024-03-04", StatusFilter::DoneOnly, &RateMap::new()).unwrap();
        assert!(totals.rows.is_empty());
        assert_eq!(totals.lessons, 0);
        assert_eq!(totals.bill, 0.0);
    }
}
