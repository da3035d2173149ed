use std::fmt;
use std::path::{Path, PathBuf};

use tch::{Device, Kind, Tensor};
use tracing::info;

use crate::data::cache::{self, DEFAULT_CACHE_DESTINATION};
use crate::data::corpus::Corpus;
use crate::data::tokenizer::Tokenizer;
use crate::data::window::{encode_from_texts, TokenTable};
use crate::error::{Error, Result};

/// One next-token-prediction example: `target[i]` follows `input[i]`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Example {
    /// Tokens fed to the model
    pub input: Vec<i64>,
    /// The same tokens shifted left by one
    pub target: Vec<i64>,
}

impl Example {
    /// Split a row of `n + 1` tokens into an input and a target of `n` tokens.
    pub fn from_row(row: &[i64]) -> Self {
        let n = row.len().saturating_sub(1);
        Self {
            input: row[..n].to_vec(),
            target: row[row.len() - n..].to_vec(),
        }
    }
}

/// Random access to training examples.
pub trait Dataset {
    /// Return the number of examples
    fn len(&self) -> usize;

    /// True if there are no examples
    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Length of the input and target sequences.
    fn block_size(&self) -> usize;

    /// Return the example at `idx`
    fn example(&self, idx: usize) -> Result<Example>;
}

/// How to build a [`TokenedDataset`].
#[derive(Debug, Clone)]
pub struct DatasetOptions {
    /// Corpus to encode; unused when loading from the cache.
    pub corpus: PathBuf,
    /// The number of tokens in one training window
    pub block_size: usize,
    /// Load the token table from `cache_destination` instead of encoding.
    pub from_cache: bool,
    /// Save the encoded token table to `cache_destination`.
    pub save_cache: bool,
    /// Cache file
    pub cache_destination: PathBuf,
    /// Device of the tensors returned by [`TokenedDataset::get`]
    pub device: Device,
}

impl DatasetOptions {
    /// Options to encode `corpus` without touching any cache.
    pub fn new<P: Into<PathBuf>>(corpus: P, block_size: usize) -> Self {
        Self {
            corpus: corpus.into(),
            block_size,
            from_cache: false,
            save_cache: false,
            cache_destination: PathBuf::from(DEFAULT_CACHE_DESTINATION),
            device: Device::Cpu,
        }
    }
}

/// Token rows of a corpus, served as shifted input/target pairs.
pub struct TokenedDataset {
    tokens: TokenTable,
    device: Device,
}

impl TokenedDataset {
    /// Wrap an existing table.
    pub fn new(tokens: TokenTable, device: Device) -> Self {
        Self { tokens, device }
    }

    /// Encode a corpus.
    pub fn from_corpus(
        corpus: &Corpus,
        tokenizer: &dyn Tokenizer,
        block_size: usize,
        device: Device,
    ) -> Result<Self> {
        let texts = corpus.documents()?;
        let tokens = encode_from_texts(&texts, tokenizer, block_size)?;
        Ok(Self::new(tokens, device))
    }

    /// Load the table from a cache file; its rows must be `block_size + 1`
    /// wide.
    pub fn from_cache<P: AsRef<Path>>(path: P, block_size: usize, device: Device) -> Result<Self> {
        let tokens = cache::load_cache(path)?;
        if tokens.block_size() != block_size {
            return Err(Error::BlockSizeMismatch {
                expected: block_size + 1,
                found: tokens.width(),
            });
        }
        Ok(Self::new(tokens, device))
    }

    /// Load from the cache or encode the corpus, then save the cache if asked.
    pub fn open(options: &DatasetOptions, tokenizer: &dyn Tokenizer) -> Result<Self> {
        if options.from_cache {
            return Self::from_cache(&options.cache_destination, options.block_size, options.device);
        }

        let corpus = Corpus::detect(&options.corpus)?;
        let dataset = Self::from_corpus(&corpus, tokenizer, options.block_size, options.device)?;
        info!("{dataset}");

        if options.save_cache {
            dataset.save_cache(&options.cache_destination)?;
        }
        Ok(dataset)
    }

    /// Write the table to `cache_destination`.
    pub fn save_cache<P: AsRef<Path>>(&self, cache_destination: P) -> Result<()> {
        cache::save_cache(&self.tokens, cache_destination)
    }

    /// Return the token table
    pub fn tokens(&self) -> &TokenTable {
        &self.tokens
    }

    /// Return the device of the returned tensors
    pub fn device(&self) -> Device {
        self.device
    }

    /// Return the input and target tensors of row `idx`, as `Int64` tensors of
    /// `block_size` tokens.
    pub fn get(&self, idx: usize) -> Result<(Tensor, Tensor)> {
        let Example { input, target } = self.example(idx)?;
        let x = Tensor::from_slice(&input).to_kind(Kind::Int64).to(self.device);
        let y = Tensor::from_slice(&target).to_kind(Kind::Int64).to(self.device);
        Ok((x, y))
    }
}

impl Dataset for TokenedDataset {
    fn len(&self) -> usize {
        self.tokens.len()
    }

    fn block_size(&self) -> usize {
        self.tokens.block_size()
    }

    fn example(&self, idx: usize) -> Result<Example> {
        self.tokens
            .row(idx)
            .map(Example::from_row)
            .ok_or(Error::IndexOutOfRange {
                index: idx,
                len: self.tokens.len(),
            })
    }
}

impl fmt::Display for TokenedDataset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "TokenDataset containing {} subsets.", self.tokens.len())
    }
}
