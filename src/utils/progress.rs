//! Per-step spinner shown while a pipeline step runs

use indicatif::{ProgressBar, ProgressStyle};

const TICKS: &str = "⠋⠙⠹⠸⠼⠴⠦⠧⠇⠏";

/// Spinner for one pipeline step; finishing it prints the step outcome in place.
pub struct StepSpinner {
    bar: ProgressBar,
}

impl StepSpinner {
    pub fn start(message: impl Into<String>) -> Self {
        let bar = ProgressBar::new_spinner();
        bar.set_style(
            ProgressStyle::default_spinner()
                .template("    {spinner:.cyan} {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_spinner())
                .tick_chars(TICKS),
        );
        bar.enable_steady_tick(std::time::Duration::from_millis(100));
        Self::with_bar(bar, message)
    }

    fn with_bar(bar: ProgressBar, message: impl Into<String>) -> Self {
        bar.set_message(message.into());
        Self { bar }
    }

    /// Mark the step done. Any warnings raised by the step switch the mark.
    pub fn finish(&self, message: &str, warnings: usize) {
        let line = match warnings {
            0 => format!("✅ {}", message),
            1 => format!("⚠️  {} (1 warning)", message),
            n => format!("⚠️  {} ({} warnings)", message, n),
        };
        self.bar.finish_with_message(line);
    }

    /// Leave the spinner line showing the failure.
    pub fn fail(&self, message: &str) {
        self.bar.abandon_with_message(format!("❌ {}", message));
    }

    /// Pass a step result through, marking the spinner failed on `Err`.
    pub fn track<T, E>(&self, result: Result<T, E>, failure: &str) -> Result<T, E> {
        if result.is_err() {
            self.fail(failure);
        }
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn hidden(message: &str) -> StepSpinner {
        StepSpinner::with_bar(ProgressBar::hidden(), message)
    }

    #[test]
    fn test_finish_marks_warnings() {
        let spinner = hidden("Fitting GMM...");
        spinner.finish("GMM converged", 0);
        assert_eq!(spinner.bar.message(), "✅ GMM converged");
        assert!(spinner.bar.is_finished());

        let spinner = hidden("Fitting K-Means...");
        spinner.finish("K-Means converged", 2);
        assert_eq!(spinner.bar.message(), "⚠️  K-Means converged (2 warnings)");
    }

    #[test]
    fn test_track_marks_failures_only() {
        let spinner = hidden("Reading dataset...");
        let ok: Result<u8, String> = spinner.track(Ok(3), "Failed to load dataset");
        assert_eq!(ok, Ok(3));
        assert_eq!(spinner.bar.message(), "Reading dataset...");

        let err: Result<u8, String> = spinner.track(Err("boom".into()), "Failed to load dataset");
        assert!(err.is_err());
        assert_eq!(spinner.bar.message(), "❌ Failed to load dataset");
    }
}
