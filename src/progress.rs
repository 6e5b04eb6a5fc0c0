//! # Progress Display Module
//!
//! Terminal spinner fed by conversion events.
//!
//! ## Visual feedback:
//! ```text
//! ⠋ [00:00:12] in.mp4: frame=240 fps=60 q=28.0 size=512kB time=00:00:08.00
//! ```

use crate::events::ConversionEvent;
use indicatif::{ProgressBar, ProgressStyle};
use std::time::Duration;

/// Spinner showing the latest status line of one conversion
pub struct ProgressReporter {
    bar: ProgressBar,
    label: String,
    lines: usize,
}

impl ProgressReporter {
    pub fn new(label: &str) -> Self {
        let bar = ProgressBar::new_spinner();

        bar.set_style(
            ProgressStyle::default_spinner()
                .template("{spinner:.green} [{elapsed_precise}] {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_spinner()),
        );
        bar.enable_steady_tick(Duration::from_millis(100));
        bar.set_message(format!("{}: waiting for ffmpeg", label));

        Self {
            bar,
            label: label.to_string(),
            lines: 0,
        }
    }

    /// Show an event; `Finished` stops the spinner
    pub fn update(&mut self, event: &ConversionEvent) {
        match event {
            ConversionEvent::Started => {
                self.bar.set_message(format!("{}: {}", self.label, event));
            }
            ConversionEvent::Progress(line) if line.is_empty() => {}
            ConversionEvent::Progress(line) => {
                self.lines += 1;
                self.bar.set_message(format!("{}: {}", self.label, line));
            }
            ConversionEvent::Finished(Ok(())) => {
                self.bar.finish_with_message(format!(
                    "✅ {}: done ({} status lines)",
                    self.label, self.lines
                ));
            }
            ConversionEvent::Finished(Err(failure)) => {
                self.bar
                    .abandon_with_message(format!("❌ {}: {}", self.label, failure));
            }
        }
    }

    /// Number of non-empty progress lines seen so far
    pub fn lines(&self) -> usize {
        self.lines
    }
}
