use anyhow::Result;
use lessondir_core::{LessonChanges, LessonDirError, LessonStatus, clock};
use owo_colors::OwoColorize;

use crate::context::Context;

pub struct EditArgs {
    pub student: Option<String>,
    pub date: Option<String>,
    pub start: Option<String>,
    pub duration: Option<u32>,
    pub status: Option<LessonStatus>,
    pub notes: Option<String>,
}

pub async fn run(ctx: &Context, id: &str, args: EditArgs) -> Result<()> {
    let store = ctx.store();
    let current = store
        .get(id)
        .ok_or_else(|| LessonDirError::LessonNotFound(id.to_string()))?;

    if let Some(date) = &args.date {
        clock::parse_date(date)?;
    }
    if let Some(start) = &args.start {
        clock::parse_time(start)?;
    }
    if let Some(student) = &args.student {
        if student.trim().is_empty() {
            anyhow::bail!("Student name cannot be empty");
        }
    }

    // `end` is never entered directly; it follows start and duration
    let end = if args.start.is_some() || args.duration.is_some() {
        let start = args.start.as_deref().unwrap_or(&current.start);
        let duration = args
            .duration
            .map(i64::from)
            .or_else(|| current.duration_minutes().filter(|m| *m > 0))
            .unwrap_or_else(|| i64::from(ctx.config.default_duration));
        Some(clock::add_minutes(start, duration))
    } else {
        None
    };

    let changes = LessonChanges {
        date: args.date,
        start: args.start,
        end,
        student: args.student.map(|s| s.trim().to_string()),
        status: args.status,
        notes: args.notes,
    };

    if changes.is_empty() {
        println!("{}", "Nothing to change".dimmed());
        return Ok(());
    }

    store.update(id, changes).await?;

    let updated = store.get(id).unwrap_or(current);
    println!("{}", format!("  Updated: {updated}").yellow());

    Ok(())
}
