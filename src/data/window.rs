use indicatif::{ProgressBar, ProgressStyle};
use tracing::info;

use crate::data::tokenizer::Tokenizer;
use crate::error::{Error, Result};

/// Number of zeros needed to bring `len` tokens to a multiple of `width`.
///
/// Same as `(-len) mod width`.
pub fn padding_len(len: usize, width: usize) -> usize {
    (width - len % width) % width
}

/// Pad `tokens` with zeros up to a multiple of `block_size + 1`.
pub fn window_tokens(tokens: &[i64], block_size: usize) -> Vec<i64> {
    let width = block_size + 1;
    let mut padded = Vec::with_capacity(tokens.len() + padding_len(tokens.len(), width));
    padded.extend_from_slice(tokens);
    padded.resize(tokens.len() + padding_len(tokens.len(), width), 0);
    padded
}

/// Rows of `block_size + 1` token ids.
///
/// Rows are stored contiguously, row after row. Padding is `0` and is not
/// distinguishable from a real token with id `0`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenTable {
    block_size: usize,
    data: Vec<i64>,
}

impl TokenTable {
    /// Create an empty table.
    pub fn new(block_size: usize) -> Result<Self> {
        if block_size == 0 {
            return Err(Error::InvalidBlockSize(block_size));
        }
        Ok(Self {
            block_size,
            data: Vec::new(),
        })
    }

    /// Build a table from row-major data; `data.len()` must be a multiple of
    /// `block_size + 1`.
    pub fn from_raw(block_size: usize, data: Vec<i64>) -> Result<Self> {
        let mut table = Self::new(block_size)?;
        let width = table.width();
        if data.len() % width != 0 {
            return Err(Error::RaggedTable {
                len: data.len(),
                width,
            });
        }
        table.data = data;
        Ok(table)
    }

    /// The number of tokens in one training window.
    pub fn block_size(&self) -> usize {
        self.block_size
    }

    /// The number of tokens in a row: `block_size + 1`.
    pub fn width(&self) -> usize {
        self.block_size + 1
    }

    /// Return the number of rows
    pub fn len(&self) -> usize {
        self.data.len() / self.width()
    }

    /// True if the table has no rows
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Return the row at `idx`
    pub fn row(&self, idx: usize) -> Option<&[i64]> {
        if idx >= self.len() {
            return None;
        }
        let width = self.width();
        self.data.get(idx * width..(idx + 1) * width)
    }

    /// Iterate over the rows
    pub fn rows(&self) -> std::slice::ChunksExact<'_, i64> {
        self.data.chunks_exact(self.width())
    }

    /// Return the row-major data
    pub fn as_slice(&self) -> &[i64] {
        &self.data
    }

    /// Append the tokens of one document, padded to whole rows.
    ///
    /// Returns the number of rows added.
    pub fn push_document(&mut self, tokens: &[i64]) -> usize {
        let before = self.len();
        self.data.extend(window_tokens(tokens, self.block_size));
        self.len() - before
    }
}

/// Tokenize the texts and cut them into rows of `block_size + 1` tokens.
///
/// Empty texts are skipped. Each text starts a new row; the last row of a text
/// is zero-padded.
pub fn encode_from_texts<S: AsRef<str>>(
    texts: &[S],
    tokenizer: &dyn Tokenizer,
    block_size: usize,
) -> Result<TokenTable> {
    let mut table = TokenTable::new(block_size)?;

    let pb = ProgressBar::new(texts.len() as u64);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} ENCODING {bar:20.cyan/blue} [{pos:>7}/{len:7} {elapsed_precise} < {eta_precise}] {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("##-"),
    );

    let mut n_documents = 0;
    let mut n_tokens = 0;
    for text in texts {
        pb.inc(1);
        let text = text.as_ref();
        if text.is_empty() {
            continue;
        }

        let tokens = tokenizer.encode(text)?;
        n_tokens += tokens.len();
        n_documents += 1;
        table.push_document(&tokens);
        pb.set_message(format!("{} rows", table.len()));
    }
    pb.finish_and_clear();

    info!(
        documents = n_documents,
        skipped = texts.len() - n_documents,
        tokens = n_tokens,
        rows = table.len(),
        "encoded texts"
    );

    Ok(table)
}
