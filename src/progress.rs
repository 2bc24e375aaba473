//! Progress accounting, decoupled from rendering.

use crate::constants::PROGRESS_BAR_WIDTH;
use indicatif::{ProgressBar, ProgressStyle};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProgressEvent {
    pub owner_name: String,
    pub current: usize,
    pub total: usize,
    pub label: String,
    pub failed: bool,
}

/// One per province (and one for the nation file); discarded when flushed.
#[derive(Debug, Clone)]
pub struct ProgressTracker {
    owner: String,
    total: usize,
    current: usize,
    last_label: String,
}

impl ProgressTracker {
    pub fn new(owner: impl Into<String>, total: usize) -> Self {
        Self {
            owner: owner.into(),
            total,
            current: 0,
            last_label: String::new(),
        }
    }

    pub fn owner(&self) -> &str {
        &self.owner
    }

    pub fn total(&self) -> usize {
        self.total
    }

    pub fn current(&self) -> usize {
        self.current
    }

    pub fn last_label(&self) -> &str {
        &self.last_label
    }

    /// Counts one finished attempt, successful or not. Never passes `total`.
    pub fn record(&mut self, label: &str, failed: bool) -> ProgressEvent {
        self.current = (self.current + 1).min(self.total);
        self.last_label = label.to_string();
        ProgressEvent {
            owner_name: self.owner.clone(),
            current: self.current,
            total: self.total,
            label: self.last_label.clone(),
            failed,
        }
    }

    pub fn percentage(&self) -> u8 {
        if self.total == 0 {
            return 100;
        }
        ((self.current * 100 + self.total / 2) / self.total) as u8
    }

    pub fn is_complete(&self) -> bool {
        self.current >= self.total
    }

    /// Text bar in the style `███░░░`.
    pub fn bar(&self, width: usize) -> String {
        let filled = if self.total == 0 {
            width
        } else {
            (width * self.current + self.total / 2) / self.total
        };
        format!("{}{}", "█".repeat(filled), "░".repeat(width - filled))
    }
}

/// Receives progress as it happens. Rendering layers implement this.
pub trait ProgressSink: Send {
    fn start(&mut self, _owner: &str, _total: usize) {}
    fn on_event(&mut self, event: &ProgressEvent);
    fn finish(&mut self, _tracker: &ProgressTracker) {}
}

/// Terminal bar per owner.
#[derive(Default)]
pub struct ConsoleProgress {
    bar: Option<ProgressBar>,
}

impl ConsoleProgress {
    pub fn new() -> Self {
        Self::default()
    }

    fn style() -> ProgressStyle {
        let template = format!(
            "{{prefix:.magenta.bold}} {{bar:{}.cyan}} {{percent:>3}}% ({{pos}}/{{len}}) {{msg:.dim}}",
            PROGRESS_BAR_WIDTH
        );
        ProgressStyle::with_template(&template)
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("█░")
    }
}

impl ProgressSink for ConsoleProgress {
    fn start(&mut self, owner: &str, total: usize) {
        let bar = ProgressBar::new(total as u64);
        bar.set_style(Self::style());
        bar.set_prefix(format!("♦ {}", owner));
        self.bar = Some(bar);
    }

    fn on_event(&mut self, event: &ProgressEvent) {
        if let Some(bar) = &self.bar {
            bar.set_position(event.current as u64);
            if event.failed {
                bar.set_message(format!("✗ {}", event.label));
            } else {
                bar.set_message(event.label.clone());
            }
        }
    }

    fn finish(&mut self, _tracker: &ProgressTracker) {
        if let Some(bar) = self.bar.take() {
            bar.finish();
        }
    }
}
