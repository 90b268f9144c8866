//! Terminal progress for apply runs.

use asgkit::{Action, ActionOutcome, ProgressCallback};
use colored::Colorize;
use indicatif::{ProgressBar, ProgressStyle};

/// Progress bar over the actions of a plan, hidden in JSON mode
pub struct BarProgress {
    bar: ProgressBar,
    hidden: bool,
}

impl BarProgress {
    pub fn new(hidden: bool) -> Self {
        Self {
            bar: ProgressBar::hidden(),
            hidden,
        }
    }
}

impl ProgressCallback for BarProgress {
    fn on_start(&mut self, count: usize) {
        log::info!("applying {count} action(s)");
        if self.hidden {
            return;
        }
        self.bar = ProgressBar::new(count as u64);
        self.bar.set_style(
            ProgressStyle::default_bar()
                .template("{spinner:.green} [{bar:40.cyan/blue}] {pos}/{len} {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_bar())
                .progress_chars("=>-"),
        );
    }

    fn on_action_start(&mut self, action: &Action) {
        log::debug!("{action}");
        self.bar.set_message(action.to_string());
    }

    fn on_action_complete(&mut self, action: &Action, outcome: &ActionOutcome) {
        match outcome {
            ActionOutcome::Applied => log::info!("{action}: done"),
            ActionOutcome::Failed { error } => {
                log::error!("{action}: {error}");
                self.bar
                    .println(format!("  {} {action}: {}", "✗".red(), error.dimmed()));
            }
        }
        self.bar.inc(1);
    }

    fn on_complete(&mut self) {
        self.bar.finish_and_clear();
    }
}
