//! Progress display for registry lookups
//!
//! Spinners and a bar on stderr via indicatif; a disabled reporter (quiet,
//! JSON output) does nothing.

use indicatif::{ProgressBar, ProgressStyle};
use std::time::Duration;

const SPINNER_TEMPLATE: &str = "{spinner:.cyan} {msg}";
const BAR_TEMPLATE: &str = "{spinner:.cyan} {msg} [{bar:30.cyan/blue}] {pos}/{len} ({eta})";

pub struct Progress {
    enabled: bool,
    bar: Option<ProgressBar>,
}

impl Progress {
    pub fn new(enabled: bool) -> Self {
        Self { enabled, bar: None }
    }

    pub fn disabled() -> Self {
        Self::new(false)
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Show a spinner for an operation of unknown length
    pub fn spinner(&mut self, message: &str) {
        if !self.enabled {
            return;
        }
        let spinner = ProgressBar::new_spinner();
        if let Ok(style) = ProgressStyle::default_spinner().template(SPINNER_TEMPLATE) {
            spinner.set_style(style.tick_chars("⠋⠙⠹⠸⠼⠴⠦⠧⠇⠏"));
        }
        spinner.set_message(message.to_string());
        spinner.enable_steady_tick(Duration::from_millis(80));
        self.replace(spinner);
    }

    /// Start a bar counting up to `total`
    pub fn start(&mut self, total: u64, message: &str) {
        if !self.enabled {
            return;
        }
        let bar = ProgressBar::new(total);
        if let Ok(style) = ProgressStyle::default_bar().template(BAR_TEMPLATE) {
            bar.set_style(style.progress_chars("█▓▒░"));
        }
        bar.set_message(message.to_string());
        bar.enable_steady_tick(Duration::from_millis(100));
        self.replace(bar);
    }

    /// Count one finished item and show its name
    pub fn inc(&self, message: &str) {
        if let Some(bar) = &self.bar {
            bar.set_message(message.to_string());
            bar.inc(1);
        }
    }

    pub fn finish_and_clear(&mut self) {
        if let Some(bar) = self.bar.take() {
            bar.finish_and_clear();
        }
    }

    fn replace(&mut self, bar: ProgressBar) {
        self.finish_and_clear();
        self.bar = Some(bar);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_progress_disabled() {
        let mut progress = Progress::disabled();
        assert!(!progress.is_enabled());
        progress.spinner("Reading manifests");
        progress.start(10, "Fetching");
        progress.inc("react");
        assert!(progress.bar.is_none());
        progress.finish_and_clear();
    }

    #[test]
    fn test_progress_enabled() {
        let mut progress = Progress::new(true);
        progress.spinner("Reading manifests");
        assert!(progress.bar.is_some());
        progress.start(2, "Fetching");
        progress.inc("react");
        progress.inc("lodash");
        assert_eq!(progress.bar.as_ref().map(|b| b.position()), Some(2));
        progress.finish_and_clear();
        assert!(progress.bar.is_none());
    }

    #[test]
    fn test_templates_are_valid() {
        assert!(ProgressStyle::default_spinner().template(SPINNER_TEMPLATE).is_ok());
        assert!(ProgressStyle::default_bar().template(BAR_TEMPLATE).is_ok());
    }
}
