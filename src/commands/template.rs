use anyhow::Result;
use dialoguer::Input;
use lessondir_core::recurrence::{self, ApplyOutcome, CaptureOutcome};
use owo_colors::OwoColorize;

use super::date_or_today;
use crate::context::Context;
use crate::render::Render;

pub async fn list(ctx: &Context) -> Result<()> {
    let templates = ctx.store().templates().await?;

    if templates.is_empty() {
        println!("{}", "No templates yet. Save a week with: lessondir template save".dimmed());
        return Ok(());
    }

    for (i, template) in templates.iter().enumerate() {
        if i > 0 {
            println!();
        }
        println!("{}", template.render());
        for item in &template.items {
            println!("   {}", item.render());
        }
    }
    Ok(())
}

pub async fn save(ctx: &Context, week: Option<&str>, name: Option<String>) -> Result<()> {
    let anchor = date_or_today(week);
    let store = ctx.store();

    // Don't prompt for a name when there is nothing to save
    if recurrence::capture_week(&anchor, &store.lessons())?.is_empty() {
        println!("{}", "No lessons in this week to save".dimmed());
        return Ok(());
    }

    let name = match name {
        Some(name) => name,
        None => Input::<String>::new()
            .with_prompt("  Template name")
            .allow_empty(true)
            .interact_text()?,
    };

    match recurrence::save_week(store, &anchor, &name).await? {
        CaptureOutcome::Saved(template) => {
            println!(
                "{}",
                format!(
                    "  Saved template \"{}\" with {} lessons",
                    template.name,
                    template.items.len()
                )
                .green()
            );
        }
        CaptureOutcome::EmptyWeek => println!("{}", "No lessons in this week to save".dimmed()),
        CaptureOutcome::NoName => println!("{}", "No name given, nothing saved".dimmed()),
    }
    Ok(())
}

pub async fn apply(ctx: &Context, id: &str, week: Option<&str>) -> Result<()> {
    let anchor = date_or_today(week);

    match recurrence::apply(ctx.store(), id, &anchor).await? {
        ApplyOutcome::Created(lessons) => {
            println!(
                "{}",
                format!("  Created {} lessons", lessons.len()).green()
            );
        }
        ApplyOutcome::AllDuplicates => {
            println!("{}", "All lessons of this template already exist in that week".dimmed())
        }
        ApplyOutcome::EmptyTemplate => println!("{}", "Template has no lessons".dimmed()),
        ApplyOutcome::TemplateNotFound => {
            anyhow::bail!("Template '{id}' not found. See: lessondir template list")
        }
    }
    Ok(())
}

pub async fn delete(ctx: &Context, id: &str) -> Result<()> {
    recurrence::delete(ctx.store(), id).await?;
    println!("{}", format!("  Deleted template {id}").red());
    Ok(())
}
