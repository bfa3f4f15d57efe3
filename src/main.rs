mod commands;
mod context;
mod render;
mod utils;

use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};
use lessondir_core::LessonStatus;
use tracing_subscriber::EnvFilter;

use crate::context::Context;

#[derive(Parser)]
#[command(name = "lessondir")]
#[command(
    about = "Schedule lessons on this device, or synced through a remote provider when signed in"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List lessons
    List {
        /// Only the Monday-to-Sunday week containing this date (YYYY-MM-DD)
        #[arg(short, long)]
        week: Option<String>,

        /// Print as JSON
        #[arg(long)]
        json: bool,
    },
    /// Add a lesson
    Add {
        #[arg(long)]
        student: String,

        /// YYYY-MM-DD (defaults to today)
        #[arg(short, long)]
        date: Option<String>,

        /// HH:MM
        #[arg(short, long)]
        start: String,

        /// Minutes (defaults to default_duration from config)
        #[arg(long)]
        duration: Option<u32>,

        #[arg(long)]
        status: Option<LessonStatus>,

        #[arg(long)]
        notes: Option<String>,
    },
    /// Change fields of a lesson
    Edit {
        id: String,

        #[arg(long)]
        student: Option<String>,

        #[arg(short, long)]
        date: Option<String>,

        #[arg(short, long)]
        start: Option<String>,

        #[arg(long)]
        duration: Option<u32>,

        #[arg(long)]
        status: Option<LessonStatus>,

        #[arg(long)]
        notes: Option<String>,
    },
    /// Remove a lesson
    Remove { id: String },
    /// List students, or add one
    Students {
        #[command(subcommand)]
        action: Option<StudentsAction>,
    },
    /// Show rates per lesson, or set one
    Rates {
        #[command(subcommand)]
        action: Option<RatesAction>,
    },
    /// Show or set the currency label
    Currency { value: Option<String> },
    /// Weekly templates
    Template {
        #[command(subcommand)]
        action: TemplateAction,
    },
    /// Lesson counts and billable amounts per student for a week and its month
    Totals {
        /// Any date in the week (defaults to today); the month is the one containing it
        #[arg(short, long)]
        week: Option<String>,

        /// Count every lesson that is not canceled instead of only done ones
        #[arg(long)]
        all_statuses: bool,
    },
    /// Export all lessons as CSV
    Export {
        /// Write to this file instead of stdout
        #[arg(short, long)]
        out: Option<PathBuf>,
    },
    /// Sign in with an identity returned by the provider's auth
    Login { identity: String },
    /// Sign out and go back to the local store
    Logout,
    /// Show the signed-in identity
    Whoami,
}

#[derive(Subcommand)]
enum StudentsAction {
    Add { name: String },
}

#[derive(Subcommand)]
enum RatesAction {
    Set { student: String, amount: f64 },
}

#[derive(Subcommand)]
enum TemplateAction {
    /// List saved templates
    List,
    /// Save the lessons of a week as a template
    Save {
        /// Any date in the week to capture (defaults to today)
        #[arg(short, long)]
        week: Option<String>,

        /// Template name (prompted for when omitted)
        #[arg(short, long)]
        name: Option<String>,
    },
    /// Create a template's lessons in a week, skipping existing ones
    Apply {
        id: String,

        /// Any date in the target week (defaults to today)
        #[arg(short, long)]
        week: Option<String>,
    },
    /// Delete a template
    Delete { id: String },
}

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing();
    let cli = Cli::parse();

    match &cli.command {
        Commands::Login { identity } => return commands::session::login(identity),
        Commands::Logout => return commands::session::logout(),
        Commands::Whoami => return commands::session::whoami(),
        _ => {}
    }

    let ctx = Context::load().await?;

    match cli.command {
        Commands::List { week, json } => commands::list::run(&ctx, week.as_deref(), json),
        Commands::Add {
            student,
            date,
            start,
            duration,
            status,
            notes,
        } => {
            let args = commands::add::AddArgs {
                student,
                date,
                start,
                duration,
                status,
                notes,
            };
            commands::add::run(&ctx, args).await
        }
        Commands::Edit {
            id,
            student,
            date,
            start,
            duration,
            status,
            notes,
        } => {
            let args = commands::edit::EditArgs {
                student,
                date,
                start,
                duration,
                status,
                notes,
            };
            commands::edit::run(&ctx, &id, args).await
        }
        Commands::Remove { id } => commands::remove::run(&ctx, &id).await,
        Commands::Students { action } => match action {
            None => commands::students::list(&ctx).await,
            Some(StudentsAction::Add { name }) => commands::students::add(&ctx, &name).await,
        },
        Commands::Rates { action } => match action {
            None => commands::rates::list(&ctx).await,
            Some(RatesAction::Set { student, amount }) => {
                commands::rates::set(&ctx, &student, amount).await
            }
        },
        Commands::Currency { value } => commands::currency::run(&ctx, value.as_deref()).await,
        Commands::Template { action } => match action {
            TemplateAction::List => commands::template::list(&ctx).await,
            TemplateAction::Save { week, name } => {
                commands::template::save(&ctx, week.as_deref(), name).await
            }
            TemplateAction::Apply { id, week } => {
                commands::template::apply(&ctx, &id, week.as_deref()).await
            }
            TemplateAction::Delete { id } => commands::template::delete(&ctx, &id).await,
        },
        Commands::Totals { week, all_statuses } => {
            commands::totals::run(&ctx, week.as_deref(), all_statuses).await
        }
        Commands::Export { out } => commands::export::run(&ctx, out.as_deref()),
        Commands::Login { .. } | Commands::Logout | Commands::Whoami => Ok(()),
    }
}

/// Log to stderr so stdout stays clean for listings and CSV.
fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}
