use anyhow::Result;
use lessondir_core::totals::{self, StatusFilter, Totals};
use owo_colors::OwoColorize;

use super::date_or_today;
use crate::context::Context;

pub async fn run(ctx: &Context, week: Option<&str>, all_statuses: bool) -> Result<()> {
    let anchor = date_or_today(week);
    let filter = if all_statuses {
        StatusFilter::NotCanceled
    } else {
        StatusFilter::DoneOnly
    };

    let store = ctx.store();
    let lessons = store.lessons();
    let rates = store.rates().await?;
    let currency = store.currency().await?;

    let weekly = totals::week(&lessons, &anchor, filter, &rates)?;
    let monthly = totals::month(&lessons, &anchor, filter, &rates)?;

    let counted = match filter {
        StatusFilter::DoneOnly => "done lessons",
        StatusFilter::NotCanceled => "all but canceled lessons",
    };
    println!("{}", format!("Counting {counted}").dimmed());

    print_section("Week", &weekly, &currency);
    print_section("Month", &monthly, &currency);
    Ok(())
}

fn print_section(title: &str, totals: &Totals, currency: &str) {
    println!();
    println!(
        "{} {}",
        title.bold(),
        format!("({} → {})", totals.first, totals.last).dimmed()
    );

    if totals.rows.is_empty() {
        println!("  {}", "No lessons".dimmed());
        return;
    }

    let width = totals
        .rows
        .iter()
        .map(|row| row.student.chars().count())
        .max()
        .unwrap_or(0);
    for row in &totals.rows {
        println!(
            "  {:<width$}  {:>3} × {currency} {:.0} = {currency} {:.0}",
            row.student, row.count, row.rate, row.bill
        );
    }
    println!(
        "  {}",
        format!(
            "{} lessons, {currency} {:.0} billable",
            totals.lessons,
            totals.bill.round()
        )
        .bold()
    );
}
