use dupe_scout_core::{Phase, ProgressReporter, StatusUpdate};
use indicatif::{ProgressBar, ProgressStyle};
use std::time::Duration;

/// Renders the pipeline's status records as a single 0-100% bar; the
/// message tracks the active phase and its item counters.
pub struct CliReporter {
    bar: ProgressBar,
}

impl CliReporter {
    pub fn new() -> Self {
        let bar = ProgressBar::new(100);
        bar.set_style(
            ProgressStyle::with_template(
                "  {spinner:.cyan} {msg:45} [{bar:30.cyan/dim}] {pos:>3}%",
            )
            .unwrap()
            .progress_chars("━╸─")
            .tick_chars("⠋⠙⠹⠸⠼⠴⠦⠧⠇⠏"),
        );
        bar.enable_steady_tick(Duration::from_millis(80));
        Self { bar }
    }
}

impl ProgressReporter for CliReporter {
    fn report(&self, update: &StatusUpdate) {
        self.bar.set_position(update.progress_percent.round() as u64);

        if update.total_items > 0 {
            self.bar.set_message(format!(
                "{} ({}/{})",
                update.message, update.current_item, update.total_items
            ));
        } else if update.current_item > 0 {
            self.bar
                .set_message(format!("{} ({})", update.message, update.current_item));
        } else {
            self.bar.set_message(update.message.clone());
        }

        if update.phase == Phase::Completed {
            self.bar.finish_and_clear();
        }
    }
}
