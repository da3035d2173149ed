//! # The `corpusgpt` crate
//!
//! Turns XML and plain-text corpora into fixed-width rows of token ids for
//! next-token-prediction training, caches them on disk, and provides the
//! checkpoint, loss estimation and seeding helpers used around a GPT model.

/// The `actions` module contains the commands run by the binary.
pub mod actions;

/// The `checkpoint` module saves and restores per-epoch checkpoints.
pub mod checkpoint;

/// The `config` module contains the command line arguments and the model and
/// optimizer configurations.
pub mod config;

/// The `data` module contains the structs and functions for loading, tokenizing
/// and caching the data and generating batches.
pub mod data;

/// Error types.
pub mod error;

/// The `estimate` module estimates the loss of a model on the training and
/// validation sets.
pub mod estimate;

/// The `model` module contains the interface expected from a language model.
pub mod model;

/// Progress bars.
pub mod progress;

/// Seeding of the random number generators.
pub mod seed;

pub use error::{Error, Result};
