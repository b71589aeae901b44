use std::time::Duration;

use indicatif::{ProgressBar, ProgressDrawTarget, ProgressStyle};

use super::styling::{bright_green, bright_red, bright_yellow};

/// Byte progress for a single download, drawn on stderr.
///
/// Falls back to a spinner with a byte counter when the server does not send
/// a content length.
pub struct TransferProgress {
    pb: ProgressBar,
    name: String,
}

impl TransferProgress {
    pub fn start(name: &str, total: Option<u64>) -> Self {
        let pb = match total {
            Some(len) => create_bar(len),
            None => create_spinner(),
        };
        pb.set_message(bright_yellow(name).to_string());
        Self {
            pb,
            name: name.to_string(),
        }
    }

    pub fn advance(&self, bytes: u64) {
        self.pb.inc(bytes);
    }

    pub fn finish(self) {
        self.pb
            .finish_with_message(bright_green(format!("{} ✓", self.name)).to_string());
    }

    pub fn fail(self) {
        self.pb
            .abandon_with_message(bright_red(format!("{} ✗", self.name)).to_string());
    }
}

fn create_bar(len: u64) -> ProgressBar {
    let pb = ProgressBar::with_draw_target(Some(len), ProgressDrawTarget::stderr());
    pb.set_style(
        ProgressStyle::default_bar()
            .template("  {msg} [{bar:30.cyan/blue}] {bytes}/{total_bytes} ({bytes_per_sec})")
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("=> "),
    );
    pb
}

fn create_spinner() -> ProgressBar {
    let pb = ProgressBar::with_draw_target(None, ProgressDrawTarget::stderr());
    pb.set_style(
        ProgressStyle::default_spinner()
            .template("  {msg} {spinner} {bytes}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner()),
    );
    pb.enable_steady_tick(Duration::from_millis(100));
    pb
}
