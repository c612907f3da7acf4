//! The Pause - a short spinner before a reading is revealed.
//!
//! TTY-aware: only runs when stderr is a terminal, so piped output and
//! scripts never wait.

use indicatif::{ProgressBar, ProgressStyle};
use std::time::Duration;

pub const PAUSE_MESSAGE: &str = "Sensing context and tuning frequency...";

/// Whether the pause would actually run
pub fn should_pause(pause_ms: u64, json: bool) -> bool {
    pause_ms > 0 && !json && console::Term::stderr().is_term()
}

/// Spin for `pause_ms`, then clear the line.
pub fn breathe(pause_ms: u64) {
    let spinner = ProgressBar::new_spinner();
    if let Ok(style) = ProgressStyle::default_spinner()
        .tick_strings(&["◐", "◓", "◑", "◒", "●"])
        .template("{spinner} {msg}")
    {
        spinner.set_style(style);
    }
    spinner.set_message(PAUSE_MESSAGE);
    spinner.enable_steady_tick(Duration::from_millis(120));

    std::thread::sleep(Duration::from_millis(pause_ms));
    spinner.finish_and_clear();
}
