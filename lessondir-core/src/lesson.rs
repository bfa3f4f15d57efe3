//! Lesson records.
//!
//! A `Lesson` is one scheduled appointment. Stores hand out `Lesson`s and
//! accept `LessonDraft`s (a lesson without an identifier) for creation and
//! `LessonChanges` (a partial patch) for edits.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::clock;
use crate::error::{LessonDirError, LessonDirResult};

pub type LessonId = String;

/// Lesson lifecycle status.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LessonStatus {
    #[default]
    Scheduled,
    Done,
    Canceled,
}

impl LessonStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            LessonStatus::Scheduled => "scheduled",
            LessonStatus::Done => "done",
            LessonStatus::Canceled => "canceled",
        }
    }
}

impl fmt::Display for LessonStatus {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for LessonStatus {
    type Err = LessonDirError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "scheduled" => Ok(LessonStatus::Scheduled),
            "done" => Ok(LessonStatus::Done),
            "canceled" | "cancelled" => Ok(LessonStatus::Canceled),
            other => Err(LessonDirError::Validation(format!(
                "unknown status '{other}' (expected scheduled, done or canceled)"
            ))),
        }
    }
}

/// A scheduled lesson.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Lesson {
    pub id: LessonId,
    /// `YYYY-MM-DD`
    #[serde(default)]
    pub date: String,
    /// `HH:MM`, 24h
    #[serde(default)]
    pub start: String,
    /// Always `start + duration`, derived when the lesson is created or edited
    #[serde(default)]
    pub end: String,
    /// Free-text name, also the grouping key for rates
    #[serde(default)]
    pub student: String,
    #[serde(default)]
    pub status: LessonStatus,
    #[serde(default)]
    pub notes: String,
}

impl Lesson {
    pub fn from_draft(id: LessonId, draft: LessonDraft) -> Self {
        Lesson {
            id,
            date: draft.date,
            start: draft.start,
            end: draft.end,
            student: draft.student,
            status: draft.status,
            notes: draft.notes,
        }
    }

    /// `date|start|student`, used to skip lessons that already exist.
    pub fn dedup_key(&self) -> String {
        dedup_key(&self.date, &self.start, &self.student)
    }

    /// Length in minutes as recorded by `start` and `end`.
    pub fn duration_minutes(&self) -> Option<i64> {
        Some(clock::time_to_minutes(&self.end)? - clock::time_to_minutes(&self.start)?)
    }
}

impl fmt::Display for Lesson {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{} {}-{} {}", self.date, self.start, self.end, self.student)
    }
}

pub(crate) fn dedup_key(date: &str, start: &str, student: &str) -> String {
    format!("{date}|{start}|{student}")
}

/// A lesson payload that has not been assigned an identifier yet.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LessonDraft {
    pub date: String,
    pub start: String,
    pub end: String,
    pub student: String,
    #[serde(default)]
    pub status: LessonStatus,
    #[serde(default)]
    pub notes: String,
}

impl LessonDraft {
    /// Build a scheduled draft; `end` is derived from `start + duration`.
    pub fn new(date: &str, start: &str, duration: u32, student: &str) -> Self {
        LessonDraft {
            date: date.to_string(),
            start: start.to_string(),
            end: clock::add_minutes(start, i64::from(duration)),
            student: student.to_string(),
            status: LessonStatus::Scheduled,
            notes: String::new(),
        }
    }

    pub fn with_status(mut self, status: LessonStatus) -> Self {
        self.status = status;
        self
    }

    pub fn with_notes(mut self, notes: impl Into<String>) -> Self {
        self.notes = notes.into();
        self
    }

    pub fn dedup_key(&self) -> String {
        dedup_key(&self.date, &self.start, &self.student)
    }

    /// Checks the fields a lesson form would refuse to submit.
    pub fn validate(&self) -> LessonDirResult<()> {
        if self.student.trim().is_empty() {
            return Err(LessonDirError::Validation(
                "please select or add a student".into(),
            ));
        }
        clock::parse_date(&self.date)?;
        clock::parse_time(&self.start)?;
        Ok(())
    }
}

/// A partial update. Only `Some` fields are applied.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LessonChanges {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub date: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub start: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub end: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub student: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<LessonStatus>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

impl LessonChanges {
    pub fn is_empty(&self) -> bool {
        self == &LessonChanges::default()
    }

    pub fn apply(&self, lesson: &mut Lesson) {
        if let Some(date) = &self.date {
            lesson.date = date.clone();
        }
        if let Some(start) = &self.start {
            lesson.start = start.clone();
        }
        if let Some(end) = &self.end {
            lesson.end = end.clone();
        }
        if let Some(student) = &self.student {
            lesson.student = student.clone();
        }
        if let Some(status) = self.status {
            lesson.status = status;
        }
        if let Some(notes) = &self.notes {
            lesson.notes = notes.clone();
        }
    }
}

/// Sort by `(date, start)` ascending, the order remote snapshots arrive in.
pub fn sort_chronologically(lessons: &mut [Lesson]) {
    lessons.sort_by(|a, b| (&a.date, &a.start).cmp(&(&b.date, &b.start)));
}
