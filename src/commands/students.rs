use anyhow::Result;
use owo_colors::OwoColorize;

use crate::context::Context;

pub async fn list(ctx: &Context) -> Result<()> {
    let students = ctx.store().students().await?;

    if students.is_empty() {
        println!("{}", "No students yet. Add one with: lessondir students add <NAME>".dimmed());
        return Ok(());
    }

    for student in students {
        println!("  {student}");
    }
    Ok(())
}

pub async fn add(ctx: &Context, name: &str) -> Result<()> {
    if name.trim().is_empty() {
        anyhow::bail!("Student name cannot be empty");
    }

    let students = ctx.store().add_student(name).await?;
    println!(
        "{}",
        format!("  Added: {} ({} students)", name.trim(), students.len()).green()
    );
    Ok(())
}
