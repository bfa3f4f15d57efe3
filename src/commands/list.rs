use anyhow::Result;
use lessondir_core::clock;
use lessondir_core::lesson;
use owo_colors::OwoColorize;

use crate::context::Context;
use crate::render::Render;

pub fn run(ctx: &Context, week: Option<&str>, json: bool) -> Result<()> {
    let mut lessons = ctx.store().lessons();

    if let Some(anchor) = week {
        let (first, last) = clock::week_bounds(anchor)?;
        lessons.retain(|l| l.date >= first && l.date <= last);
    }
    lesson::sort_chronologically(&mut lessons);

    if json {
        println!("{}", serde_json::to_string_pretty(&lessons)?);
        return Ok(());
    }

    if lessons.is_empty() {
        println!("{}", "No lessons found".dimmed());
        return Ok(());
    }

    println!("{}", format!("Lessons ({})", ctx.kind().render()).dimmed());

    // Group by day
    let mut current_date: Option<&str> = None;
    for lesson in &lessons {
        if current_date != Some(lesson.date.as_str()) {
            println!();
            println!("{}", date_label(&lesson.date).bold());
            current_date = Some(lesson.date.as_str());
        }
        println!("  {}", lesson.render());
    }

    Ok(())
}

/// "Mon Jan 15", or the raw string when it is not a valid date.
fn date_label(date: &str) -> String {
    clock::parse_date(date)
        .map(|d| d.format("%a %b %-d").to_string())
        .unwrap_or_else(|_| date.to_string())
}
