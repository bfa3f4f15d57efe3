use anyhow::Result;
use lessondir_core::LessonDirError;
use owo_colors::OwoColorize;

use crate::context::Context;

pub async fn run(ctx: &Context, id: &str) -> Result<()> {
    let store = ctx.store();
    let lesson = store
        .get(id)
        .ok_or_else(|| LessonDirError::LessonNotFound(id.to_string()))?;

    store.remove(id).await?;
    println!("{}", format!("  Removed: {lesson}").red());

    Ok(())
}
