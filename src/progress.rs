use indicatif::{MultiProgress, ProgressBar, ProgressDrawTarget, ProgressStyle};

use crate::estimate::ProgressReporter;

fn bar_style(label: &str, colors: &str) -> ProgressStyle {
    let template = format!(
        "{{spinner:.green}} {label} [{{elapsed_precise}}] {{bar:20.{colors}}} {{pos:>7}}/{{len:7}} {{per_sec:.2}} {{msg}}"
    );
    ProgressStyle::default_bar()
        .template(&template)
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("##-")
}

/// Progress reporter that uses the `indicatif` crate to display progress bars.
pub struct PbProgressReporter {
    mb: MultiProgress,
    estimate_train_bar: Option<ProgressBar>,
    estimate_valid_bar: Option<ProgressBar>,
    train_loss: f64,
    valid_loss: f64,
}

impl Default for PbProgressReporter {
    fn default() -> Self {
        Self::with_draw_target(ProgressDrawTarget::stderr())
    }
}

impl PbProgressReporter {
    /// Create a reporter drawing to `target`.
    pub fn with_draw_target(target: ProgressDrawTarget) -> Self {
        PbProgressReporter {
            mb: MultiProgress::with_draw_target(target),
            estimate_train_bar: None,
            estimate_valid_bar: None,
            train_loss: 0.0,
            valid_loss: 0.0,
        }
    }

    /// Return the last training and validation losses
    pub fn losses(&self) -> (f64, f64) {
        (self.train_loss, self.valid_loss)
    }
}

impl ProgressReporter for PbProgressReporter {
    fn train_loss_start(&mut self, total_train_batches: usize) {
        let train_loss_bar = self.mb.add(ProgressBar::new(total_train_batches as u64));
        train_loss_bar.set_style(bar_style("       T", "yellow/blue"));
        train_loss_bar.tick();
        self.estimate_train_bar = Some(train_loss_bar);
    }

    fn train_loss_progress(&mut self, current_train_batches: usize) {
        if let Some(estimate_train_bar) = &self.estimate_train_bar {
            estimate_train_bar.set_position(current_train_batches as u64);
        }
    }

    fn train_loss_end(&mut self, train_loss: f64) {
        if let Some(estimate_train_bar) = &self.estimate_train_bar {
            estimate_train_bar.finish_and_clear();
        }
        self.estimate_train_bar = None;
        self.train_loss = train_loss;
    }

    fn valid_loss_start(&mut self, total_valid_batches: usize) {
        let valid_loss_bar = self.mb.add(ProgressBar::new(total_valid_batches as u64));
        valid_loss_bar.set_style(bar_style("       E", "magenta/blue"));
        valid_loss_bar.tick();
        self.estimate_valid_bar = Some(valid_loss_bar);
    }

    fn valid_loss_progress(&mut self, current_valid_batches: usize) {
        if let Some(estimate_valid_bar) = &self.estimate_valid_bar {
            estimate_valid_bar.set_position(current_valid_batches as u64);
        }
    }

    fn valid_loss_end(&mut self, valid_loss: f64) {
        if let Some(estimate_valid_bar) = &self.estimate_valid_bar {
            estimate_valid_bar.set_message(format!(
                "Train loss: {:.4}, Valid loss: {:.4}",
                self.train_loss, valid_loss
            ));
            estimate_valid_bar.finish(); // keep the bar
        }
        self.estimate_valid_bar = None;
        self.valid_loss = valid_loss;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pb_progress_reporter() {
        let mut reporter = PbProgressReporter::with_draw_target(ProgressDrawTarget::hidden());
        reporter.train_loss_start(20);
        reporter.train_loss_progress(10);
        reporter.train_loss_end(1.5);
        assert!(reporter.estimate_train_bar.is_none());

        reporter.valid_loss_start(20);
        reporter.valid_loss_progress(20);
        reporter.valid_loss_end(2.5);
        assert!(reporter.estimate_valid_bar.is_none());

        assert_eq!(reporter.losses(), (1.5, 2.5));
    }
}
