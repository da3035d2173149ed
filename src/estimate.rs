use tracing::info;

use crate::data::loader::Loader;
use crate::error::{Error, Result};
use crate::model::LanguageModel;

/// Estimates of the loss on the training and validation sets.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LossEstimates {
    /// Loss on the training set.
    pub train_loss: f64,
    /// Loss on the validation set.
    pub valid_loss: f64,
}

/// Interface for a progress reporter.
#[allow(unused_variables)]
pub trait ProgressReporter {
    /// Called at the start of the loss estimation for the training sets.
    fn train_loss_start(&mut self, total_train_batches: usize) {}
    /// Called to update the progress of the loss estimation for the training
    /// sets.
    fn train_loss_progress(&mut self, current_train_batches: usize) {}
    /// Called at the end of the loss estimation for the training sets.
    fn train_loss_end(&mut self, train_loss: f64) {}
    /// Called at the start of the loss estimation for the validation sets.
    fn valid_loss_start(&mut self, total_valid_batches: usize) {}
    /// Called to update the progress of the loss estimation for the validation
    /// sets.
    fn valid_loss_progress(&mut self, current_valid_batches: usize) {}
    /// Called at the end of the loss estimation for the validation sets.
    fn valid_loss_end(&mut self, valid_loss: f64) {}
}

/// A progress reporter that does nothing.
pub struct NullProgressReporter;

impl ProgressReporter for NullProgressReporter {}

/// Loss estimator.
pub struct LossEstimator<'a> {
    train_dataloader: &'a mut Loader,
    valid_dataloader: &'a mut Loader,
}

#[derive(Clone, Copy)]
enum Split {
    Train,
    Valid,
}

impl Split {
    fn name(self) -> &'static str {
        match self {
            Split::Train => "train",
            Split::Valid => "val",
        }
    }
}

impl<'a> LossEstimator<'a> {
    /// Create a new loss estimator.
    pub fn new(train_dataloader: &'a mut Loader, valid_dataloader: &'a mut Loader) -> Self {
        Self {
            train_dataloader,
            valid_dataloader,
        }
    }

    /// Estimate the loss of a model on the training and validation sets.
    ///
    /// Each loader is rewound and walked to the end, or for `max_batches`
    /// batches, with the model in evaluation mode and gradients disabled. The
    /// estimate is the mean of the per-batch losses.
    pub fn estimate_loss(
        &mut self,
        model: &dyn LanguageModel,
        max_batches: Option<usize>,
        progress_callback: &mut impl ProgressReporter,
    ) -> Result<LossEstimates> {
        let train_loss = tch::no_grad(|| {
            Self::mean_loss(
                &mut *self.train_dataloader,
                Split::Train,
                model,
                max_batches,
                &mut *progress_callback,
            )
        })?;

        let valid_loss = tch::no_grad(|| {
            Self::mean_loss(
                &mut *self.valid_dataloader,
                Split::Valid,
                model,
                max_batches,
                &mut *progress_callback,
            )
        })?;

        info!(train_loss, valid_loss, "estimated loss");

        Ok(LossEstimates {
            train_loss,
            valid_loss,
        })
    }

    fn mean_loss(
        loader: &mut Loader,
        split: Split,
        model: &dyn LanguageModel,
        max_batches: Option<usize>,
        progress_callback: &mut impl ProgressReporter,
    ) -> Result<f64> {
        let total = max_batches.map_or(loader.n_batches(), |m| m.min(loader.n_batches()));
        match split {
            Split::Train => progress_callback.train_loss_start(total),
            Split::Valid => progress_callback.valid_loss_start(total),
        }

        loader.rewind();
        let mut sum = 0.0;
        let mut n_batches = 0;
        while n_batches < total {
            let Some(batch) = loader.next_batch() else {
                break;
            };
            let (xs, ys) = batch?;
            let (_, loss) = model.forward_with_loss(&xs, &ys, false);
            sum += f64::try_from(loss)?;
            n_batches += 1;

            if n_batches % 10 == 0 {
                match split {
                    Split::Train => progress_callback.train_loss_progress(n_batches),
                    Split::Valid => progress_callback.valid_loss_progress(n_batches),
                }
            }
        }

        if n_batches == 0 {
            return Err(Error::EmptySplit(split.name()));
        }
        let mean = sum / n_batches as f64;

        match split {
            Split::Train => progress_callback.train_loss_end(mean),
            Split::Valid => progress_callback.valid_loss_end(mean),
        }
        Ok(mean)
    }
}
