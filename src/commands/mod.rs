pub mod add;
pub mod currency;
pub mod edit;
pub mod export;
pub mod list;
pub mod rates;
pub mod remove;
pub mod session;
pub mod students;
pub mod template;
pub mod totals;

use lessondir_core::clock;

/// `date`, or today's date in local time.
pub fn date_or_today(date: Option<&str>) -> String {
    match date {
        Some(date) => date.to_string(),
        None => clock::format_date(chrono::Local::now().date_naive()),
    }
}
