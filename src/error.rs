//! Error types.

use std::path::PathBuf;

use thiserror::Error;

/// Errors returned by the dataset, cache and checkpoint functions.
#[derive(Debug, Error)]
pub enum Error {
    #[error("corpus path not found: {0}")]
    CorpusNotFound(PathBuf),

    #[error("IO error on {path}: {source}")]
    Path {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("tokenizer error: {0}")]
    Tokenizer(String),

    #[error("either a tokenizer or a vocabulary file is required")]
    NoTokenizer,

    #[error("block size must be at least 1, got {0}")]
    InvalidBlockSize(usize),

    #[error("cache read error: {0}")]
    CacheRead(#[from] ndarray_npy::ReadNpyError),

    #[error("cache write error: {0}")]
    CacheWrite(#[from] ndarray_npy::WriteNpyError),

    #[error("cached rows are {found} tokens wide, expected {expected} (block size + 1)")]
    BlockSizeMismatch { expected: usize, found: usize },

    #[error("{len} tokens cannot be split into rows of {width}")]
    RaggedTable { len: usize, width: usize },

    #[error("index {index} out of range for a dataset of {len} items")]
    IndexOutOfRange { index: usize, len: usize },

    #[error("torch error: {0}")]
    Torch(#[from] tch::TchError),

    #[error("no checkpoint found in {0}")]
    NoCheckpoint(PathBuf),

    #[error("checkpoint not found: {0}")]
    CheckpointNotFound(PathBuf),

    #[error("checkpoint {path} has no tensor named {name}")]
    MissingTensor { path: PathBuf, name: String },

    #[error("tensor {name} has shape {found:?} in the checkpoint, expected {expected:?}")]
    ShapeMismatch {
        name: String,
        expected: Vec<i64>,
        found: Vec<i64>,
    },

    #[error("the {0} loader yielded no batches")]
    EmptySplit(&'static str),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("unknown model size: {0}")]
    UnknownModelSize(String),
}

impl Error {
    /// Attach a path to an IO error.
    pub(crate) fn path(path: impl Into<PathBuf>) -> impl FnOnce(std::io::Error) -> Self {
        let path = path.into();
        move |source| Error::Path { path, source }
    }
}

/// Result type for this crate.
pub type Result<T> = std::result::Result<T, Error>;
