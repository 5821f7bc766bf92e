//! Progress bar implementation for archive downloads.

use cachepull_core::DownloadProgress;
use console::Term;
use indicatif::ProgressBar;
use indicatif::ProgressState;
use indicatif::ProgressStyle;
use std::fmt::Write;
use std::time::Duration;

/// CLI progress bar wrapper implementing `DownloadProgress`.
///
/// Shows bytes received, speed and ETA when the server announced a length,
/// and a spinner with a byte counter when it did not. Cleans up on drop.
pub struct CliProgress {
    bar: ProgressBar,
    message: String,
    bytes_received: u64,
}

impl CliProgress {
    /// Creates a hidden progress bar that becomes visible on `on_start`.
    #[must_use]
    pub fn new(message: &str) -> Self {
        Self {
            bar: ProgressBar::hidden(),
            message: message.to_string(),
            bytes_received: 0,
        }
    }

    /// Checks if we should show progress (TTY detection).
    #[must_use]
    pub fn should_show() -> bool {
        Term::stderr().is_term()
    }

    fn sized_style() -> ProgressStyle {
        // Template: "Downloading [████████░░░░] 15.2 MB/40.0 MB (5.1 MB/s, 12s)"
        ProgressStyle::default_bar()
            .template("{msg} [{bar:40.cyan/blue}] {bytes}/{total} ({bytes_per_sec}, {eta})")
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .with_key("bytes", |state: &ProgressState, w: &mut dyn Write| {
                write!(w, "{}", humanize_bytes(state.pos())).unwrap_or(());
            })
            .with_key("total", |state: &ProgressState, w: &mut dyn Write| {
                write!(w, "{}", humanize_bytes(state.len().unwrap_or(0))).unwrap_or(());
            })
            .with_key("bytes_per_sec", |state: &ProgressState, w: &mut dyn Write| {
                #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
                let bytes_per_sec = state.per_sec() as u64;
                write!(w, "{}/s", humanize_bytes(bytes_per_sec)).unwrap_or(());
            })
            .with_key("eta", |state: &ProgressState, w: &mut dyn Write| {
                write!(w, "{}", humanize_duration(state.eta())).unwrap_or(());
            })
            .progress_chars("█▓░")
    }

    fn unsized_style() -> ProgressStyle {
        ProgressStyle::default_spinner()
            .template("{spinner} {msg} {bytes}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner())
            .with_key("bytes", |state: &ProgressState, w: &mut dyn Write| {
                write!(w, "{}", humanize_bytes(state.pos())).unwrap_or(());
            })
    }
}

impl Drop for CliProgress {
    fn drop(&mut self) {
        self.bar.finish_and_clear();
    }
}

impl DownloadProgress for CliProgress {
    fn on_start(&mut self, total: Option<u64>) {
        self.bytes_received = 0;
        // A retry starts a fresh bar.
        self.bar.finish_and_clear();
        self.bar = match total {
            Some(len) => ProgressBar::new(len).with_style(Self::sized_style()),
            None => {
                let bar = ProgressBar::new_spinner().with_style(Self::unsized_style());
                bar.enable_steady_tick(Duration::from_millis(120));
                bar
            }
        };
        self.bar.set_message(self.message.clone());
    }

    fn on_bytes(&mut self, bytes: u64) {
        self.bytes_received += bytes;
        self.bar.set_position(self.bytes_received);
    }

    fn on_complete(&mut self) {
        self.bar.finish_and_clear();
    }
}

/// Converts bytes to human-readable format (KB, MB, GB, TB).
#[allow(clippy::cast_precision_loss)]
pub fn humanize_bytes(bytes: u64) -> String {
    const KB: u64 = 1024;
    const MB: u64 = KB * 1024;
    const GB: u64 = MB * 1024;
    const TB: u64 = GB * 1024;

    if bytes >= TB {
        format!("{:.1} TB", bytes as f64 / TB as f64)
    } else if bytes >= GB {
        format!("{:.1} GB", bytes as f64 / GB as f64)
    } else if bytes >= MB {
        format!("{:.1} MB", bytes as f64 / MB as f64)
    } else if bytes >= KB {
        format!("{:.1} KB", bytes as f64 / KB as f64)
    } else {
        format!("{bytes} B")
    }
}

/// Converts duration to human-readable format.
fn humanize_duration(duration: Duration) -> String {
    let secs = duration.as_secs();
    if secs >= 3600 {
        format!("{}h{}m", secs / 3600, (secs % 3600) / 60)
    } else if secs >= 60 {
        format!("{}m{}s", secs / 60, secs % 60)
    } else {
        format!("{secs}s")
    }
}
