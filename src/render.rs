//! Colored terminal rendering for lessondir-core types.

use lessondir_core::template::TemplateItem;
use lessondir_core::{Lesson, LessonStatus, StoreKind, Template};
use owo_colors::OwoColorize;

const WEEKDAYS: [&str; 7] = ["Mon", "Tue", "Wed", "Thu", "Fri", "Sat", "Sun"];

pub trait Render {
    fn render(&self) -> String;
}

impl Render for LessonStatus {
    fn render(&self) -> String {
        match self {
            LessonStatus::Scheduled => self.as_str().blue().to_string(),
            LessonStatus::Done => self.as_str().green().to_string(),
            LessonStatus::Canceled => self.as_str().red().to_string(),
        }
    }
}

impl Render for Lesson {
    fn render(&self) -> String {
        let mut line = format!(
            "{}-{} {} {}",
            self.start,
            self.end,
            self.student.bold(),
            self.status.render()
        );
        if !self.notes.is_empty() {
            line.push_str(&format!(" {}", self.notes.dimmed()));
        }
        line.push_str(&format!(" {}", format!("[{}]", self.id).dimmed()));
        line
    }
}

impl Render for TemplateItem {
    fn render(&self) -> String {
        let day = WEEKDAYS.get(usize::from(self.dow)).copied().unwrap_or("???");
        format!("{} {} {}min {}", day, self.start, self.duration, self.student)
    }
}

impl Render for Template {
    fn render(&self) -> String {
        format!(
            "{} {}",
            self.name.bold(),
            format!("[{}] {} lessons", self.id, self.items.len()).dimmed()
        )
    }
}

impl Render for StoreKind {
    fn render(&self) -> String {
        match self {
            StoreKind::Local => "local".dimmed().to_string(),
            StoreKind::Remote => "remote".cyan().to_string(),
        }
    }
}
