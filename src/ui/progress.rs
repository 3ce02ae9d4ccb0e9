use indicatif::{ProgressBar, ProgressStyle};
use std::time::Duration;

/// Spinner counting imported rows; hidden when stdout is not a terminal
pub struct ImportProgress {
    pb: ProgressBar,
}

impl ImportProgress {
    pub fn new(label: &str) -> Self {
        let pb = if console::Term::stdout().is_term() {
            ProgressBar::new_spinner()
        } else {
            ProgressBar::hidden()
        };
        if let Ok(style) = ProgressStyle::with_template("{spinner} {msg} {pos} rows ({elapsed})") {
            pb.set_style(style);
        }
        pb.set_message(label.to_string());
        pb.enable_steady_tick(Duration::from_millis(100));
        Self { pb }
    }

    pub fn inc(&self, rows: usize) {
        self.pb.inc(rows as u64);
    }

    pub fn finish(&self) {
        self.pb.finish_and_clear();
    }
}
