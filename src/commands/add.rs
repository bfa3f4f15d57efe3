use anyhow::Result;
use lessondir_core::{LessonDraft, LessonStatus};
use owo_colors::OwoColorize;

use super::date_or_today;
use crate::context::Context;

pub struct AddArgs {
    pub student: String,
    pub date: Option<String>,
    pub start: String,
    pub duration: Option<u32>,
    pub status: Option<LessonStatus>,
    pub notes: Option<String>,
}

pub async fn run(ctx: &Context, args: AddArgs) -> Result<()> {
    let date = date_or_today(args.date.as_deref());
    let duration = args.duration.unwrap_or(ctx.config.default_duration);

    let mut draft = LessonDraft::new(&date, args.start.trim(), duration, args.student.trim());
    if let Some(status) = args.status {
        draft = draft.with_status(status);
    }
    if let Some(notes) = args.notes {
        draft = draft.with_notes(notes);
    }
    draft.validate()?;

    let lesson = ctx.store().add(draft).await?;
    println!("{}", format!("  Added: {lesson}").green());

    Ok(())
}
