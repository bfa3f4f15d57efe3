use anyhow::Result;
use owo_colors::OwoColorize;

use crate::context::Context;

pub async fn list(ctx: &Context) -> Result<()> {
    let store = ctx.store();
    let rates = store.rates().await?;
    let currency = store.currency().await?;

    if rates.is_empty() {
        println!("{}", "No rates set".dimmed());
        return Ok(());
    }

    let width = rates.keys().map(|name| name.chars().count()).max().unwrap_or(0);
    for (student, rate) in &rates {
        println!("  {student:<width$}  {rate:.2} {currency}");
    }
    Ok(())
}

pub async fn set(ctx: &Context, student: &str, amount: f64) -> Result<()> {
    let student = student.trim();
    if student.is_empty() {
        anyhow::bail!("Student name cannot be empty");
    }

    let store = ctx.store();
    let mut rates = store.rates().await?;
    rates.insert(student.to_string(), amount);
    let saved = store.save_rates(rates).await?;

    let rate = saved.get(student).copied().unwrap_or_default();
    let currency = store.currency().await?;
    println!("{}", format!("  {student}: {rate:.2} {currency} per lesson").green());
    Ok(())
}
