use std::path::Path;

use anyhow::{Context as _, Result};
use lessondir_core::export;
use owo_colors::OwoColorize;

use crate::context::Context;

pub fn run(ctx: &Context, out: Option<&Path>) -> Result<()> {
    let mut lessons = ctx.store().lessons();
    // Newest first
    lessons.sort_by(|a, b| (&b.date, &b.start).cmp(&(&a.date, &a.start)));

    let csv = export::lessons_to_csv(&lessons)?;

    match out {
        Some(path) => {
            std::fs::write(path, csv)
                .with_context(|| format!("Could not write {}", path.display()))?;
            eprintln!(
                "{}",
                format!("  Exported {} lessons to {}", lessons.len(), path.display()).green()
            );
        }
        None => print!("{csv}"),
    }
    Ok(())
}
