//! Progress reporting for sync runs.
//!
//! The CLI installs [`IndicatifReporter`] for a user-visible bar; library
//! callers default to [`NoopReporter`] or bring their own implementation.

use indicatif::{ProgressBar, ProgressStyle};

/// Observer for the sync pipeline's phases.
pub trait ProgressReporter: Send + Sync {
    /// A new pipeline phase began, with an item count when one is known
    /// up front (Scanning and Parsing know their file counts; Inferring
    /// and Diffing do not).
    fn phase(&self, name: &str, total: Option<u64>);

    /// One item of the current phase completed.
    fn item_done(&self);

    /// The whole run finished; clear any transient output.
    fn done(&self);
}

/// Silent reporter for library and test callers.
#[derive(Debug, Default)]
pub struct NoopReporter;

impl ProgressReporter for NoopReporter {
    fn phase(&self, _name: &str, _total: Option<u64>) {}
    fn item_done(&self) {}
    fn done(&self) {}
}

/// Terminal progress bar backed by `indicatif`.
#[derive(Debug)]
pub struct IndicatifReporter {
    bar: ProgressBar,
}

impl Default for IndicatifReporter {
    fn default() -> Self {
        Self::new()
    }
}

impl IndicatifReporter {
    pub fn new() -> Self {
        Self {
            bar: ProgressBar::hidden(),
        }
    }

    fn style(counted: bool) -> ProgressStyle {
        let template = if counted {
            "{spinner:.green} {msg} [{bar:30.cyan/blue}] {pos}/{len}"
        } else {
            "{spinner:.green} {msg}"
        };
        ProgressStyle::with_template(template)
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("=> ")
    }
}

impl ProgressReporter for IndicatifReporter {
    fn phase(&self, name: &str, total: Option<u64>) {
        self.bar.set_length(total.unwrap_or(0));
        self.bar.set_style(Self::style(total.is_some()));
        self.bar.set_message(name.to_string());
        self.bar.reset();
    }

    fn item_done(&self) {
        self.bar.inc(1);
    }

    fn done(&self) {
        self.bar.finish_and_clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn noop_reporter_is_silent() {
        let reporter = NoopReporter;
        reporter.phase("Scanning", Some(3));
        reporter.item_done();
        reporter.done();
    }

    #[test]
    fn indicatif_reporter_lifecycle() {
        let reporter = IndicatifReporter::new();
        reporter.phase("Parsing", Some(2));
        reporter.item_done();
        reporter.item_done();
        reporter.phase("Inferring", None);
        reporter.done();
    }
}
