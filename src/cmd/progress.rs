//! Spinners shown while a remote call is in flight

use indicatif::{ProgressBar, ProgressStyle};
use std::future::Future;
use std::time::Duration;

pub fn create_spinner(message: &str) -> ProgressBar {
    let spinner = ProgressBar::new_spinner();
    let style = ProgressStyle::default_spinner()
        .tick_chars("⠋⠙⠹⠸⠼⠴⠦⠧⠇⠏")
        .template("{spinner:.cyan} {msg}")
        .unwrap_or_else(|_| ProgressStyle::default_spinner());
    spinner.set_style(style);
    spinner.set_message(message.to_string());
    spinner.enable_steady_tick(Duration::from_millis(80));
    spinner
}

pub fn finish_spinner_success(spinner: &ProgressBar, message: &str) {
    spinner.set_style(
        ProgressStyle::default_spinner()
            .template("{prefix:.green} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner()),
    );
    spinner.set_prefix("✓");
    spinner.finish_with_message(message.to_string());
}

pub fn finish_spinner_error(spinner: &ProgressBar, message: &str) {
    spinner.set_style(
        ProgressStyle::default_spinner()
            .template("{prefix:.red} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner()),
    );
    spinner.set_prefix("✗");
    spinner.finish_with_message(message.to_string());
}

/// Run `task` behind a spinner, finishing it with `done` or `failed`
pub async fn spin<T, E, F>(message: &str, done: &str, failed: &str, task: F) -> Result<T, E>
where
    F: Future<Output = Result<T, E>>,
{
    let spinner = create_spinner(message);
    let result = task.await;
    match &result {
        Ok(_) => finish_spinner_success(&spinner, done),
        Err(_) => finish_spinner_error(&spinner, failed),
    }
    result
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_create_spinner() {
        let spinner = create_spinner("Fetching recipients...");
        assert!(!spinner.is_finished());
        finish_spinner_success(&spinner, "Done");
        assert!(spinner.is_finished());
    }

    #[tokio::test]
    async fn test_spin_passes_result_through() {
        let ok: Result<u16, String> = spin("Sending", "Sent", "Failed", async { Ok(202) }).await;
        assert_eq!(ok, Ok(202));

        let err: Result<u16, String> =
            spin("Sending", "Sent", "Failed", async { Err("boom".to_string()) }).await;
        assert_eq!(err, Err("boom".to_string()));
    }
}
