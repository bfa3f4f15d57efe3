use std::future::Future;
use std::time::Duration;

use indicatif::{ProgressBar, ProgressStyle};

/// Show a spinner with `message` on stderr while `work` runs.
pub async fn with_spinner<T>(message: String, work: impl Future<Output = T>) -> T {
    let spinner = ProgressBar::new_spinner();
    let style = ProgressStyle::default_spinner().tick_strings(&["-", "\\", "|", "/"]);
    spinner.set_style(style.clone().template("{msg} {spinner}").unwrap_or(style));
    spinner.set_message(message);
    spinner.enable_steady_tick(Duration::from_millis(80));

    let result = work.await;
    spinner.finish_and_clear();
    result
}
