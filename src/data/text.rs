use std::path::Path;

use tracing::info;

use crate::data::corpus::read_paragraphs;
use crate::data::dataset::{Dataset, Example};
use crate::data::tokenizer::Tokenizer;
use crate::error::{Error, Result};

/// Lazily tokenized windows over a large text file.
///
/// Item `idx` covers the characters `[idx * block_size, (idx + 3) * block_size
/// + 1)`. The encoded window is truncated to `block_size + 1` tokens and
/// zero-padded to that width before being shifted into an [`Example`].
pub struct TextWindowDataset<T: Tokenizer> {
    chars: Vec<char>,
    tokenizer: T,
    block_size: usize,
}

impl<T: Tokenizer> TextWindowDataset<T> {
    /// Create the dataset from a text.
    pub fn new(text: &str, tokenizer: T, block_size: usize) -> Result<Self> {
        if block_size == 0 {
            return Err(Error::InvalidBlockSize(block_size));
        }
        Ok(Self {
            chars: text.chars().collect(),
            tokenizer,
            block_size,
        })
    }

    /// Read the whole file into memory.
    pub fn from_file<P: AsRef<Path>>(path: P, tokenizer: T, block_size: usize) -> Result<Self> {
        let path = path.as_ref();
        info!(path = %path.display(), "loading corpus");
        let text = std::fs::read_to_string(path).map_err(Error::path(path))?;
        let dataset = Self::new(&text, tokenizer, block_size)?;
        info!(chars = dataset.chars.len(), items = dataset.len(), "corpus loaded");
        Ok(dataset)
    }
}

impl<T: Tokenizer> Dataset for TextWindowDataset<T> {
    fn len(&self) -> usize {
        (self.chars.len() / (self.block_size + 1)).saturating_sub(4)
    }

    fn block_size(&self) -> usize {
        self.block_size
    }

    fn example(&self, idx: usize) -> Result<Example> {
        if idx >= self.len() {
            return Err(Error::IndexOutOfRange {
                index: idx,
                len: self.len(),
            });
        }
        let start = idx * self.block_size;
        let end = ((idx + 3) * self.block_size + 1).min(self.chars.len());
        let window: String = self.chars[start..end].iter().collect();

        let width = self.block_size + 1;
        let mut tokens = self.tokenizer.encode(&window)?;
        tokens.resize(width, 0);
        Ok(Example::from_row(&tokens))
    }
}

/// A tokenized paragraph, truncated and padded to `block_size` tokens.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParagraphBlock {
    /// Token ids, padded with the tokenizer's pad id
    pub input_ids: Vec<i64>,
    /// 1 for real tokens, 0 for padding
    pub attention_mask: Vec<i64>,
}

/// One block per blank-line separated paragraph of a text file.
pub struct ParagraphDataset {
    blocks: Vec<ParagraphBlock>,
    block_size: usize,
}

impl ParagraphDataset {
    /// Encode the paragraphs of a text file.
    pub fn from_file<P: AsRef<Path>>(
        path: P,
        tokenizer: &dyn Tokenizer,
        block_size: usize,
    ) -> Result<Self> {
        let paragraphs = read_paragraphs(path)?;
        Self::from_paragraphs(&paragraphs, tokenizer, block_size)
    }

    /// Encode paragraphs.
    pub fn from_paragraphs<S: AsRef<str>>(
        paragraphs: &[S],
        tokenizer: &dyn Tokenizer,
        block_size: usize,
    ) -> Result<Self> {
        if block_size == 0 {
            return Err(Error::InvalidBlockSize(block_size));
        }
        let pad_id = tokenizer.pad_id();
        let blocks = paragraphs
            .iter()
            .map(|p| {
                let mut input_ids = tokenizer.encode(p.as_ref())?;
                input_ids.truncate(block_size);
                let mut attention_mask = vec![1; input_ids.len()];
                input_ids.resize(block_size, pad_id);
                attention_mask.resize(block_size, 0);
                Ok(ParagraphBlock {
                    input_ids,
                    attention_mask,
                })
            })
            .collect::<Result<Vec<_>>>()?;
        Ok(Self { blocks, block_size })
    }

    /// Return the number of blocks
    pub fn len(&self) -> usize {
        self.blocks.len()
    }

    /// True if there are no blocks
    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }

    /// Return the block size
    pub fn block_size(&self) -> usize {
        self.block_size
    }

    /// Return the block at `idx`
    pub fn get(&self, idx: usize) -> Result<&ParagraphBlock> {
        self.blocks.get(idx).ok_or(Error::IndexOutOfRange {
            index: idx,
            len: self.blocks.len(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::tokenizer::Vocab;

    #[test]
    fn test_text_window_dataset() {
        // 26 letters, a=0 ... z=25
        let text: String = ('a'..='z').collect();
        let vocab = Vocab::new(&text);
        let dataset = TextWindowDataset::new(&text, vocab, 3).unwrap();

        // 26 / 4 - 4
        assert_eq!(dataset.len(), 2);
        assert_eq!(dataset.block_size(), 3);

        let example = dataset.example(0).unwrap();
        assert_eq!(example.input, vec![0, 1, 2]);
        assert_eq!(example.target, vec![1, 2, 3]);

        let example = dataset.example(1).unwrap();
        assert_eq!(example.input, vec![3, 4, 5]);
        assert_eq!(example.target, vec![4, 5, 6]);

        assert!(dataset.example(2).is_err());
    }

    #[test]
    fn test_text_window_dataset_short_text() {
        let vocab = Vocab::new("abc");
        let dataset = TextWindowDataset::new("abcabc", vocab, 2).unwrap();
        assert_eq!(dataset.len(), 0);
        assert!(dataset.is_empty());
    }

    #[test]
    fn test_paragraph_dataset() {
        let vocab = Vocab::new("abcd");
        let dataset = ParagraphDataset::from_paragraphs(&["abcd", "b"], &vocab, 3).unwrap();
        assert_eq!(dataset.len(), 2);

        let block = dataset.get(0).unwrap();
        assert_eq!(block.input_ids, vec![0, 1, 2]);
        assert_eq!(block.attention_mask, vec![1, 1, 1]);

        let block = dataset.get(1).unwrap();
        assert_eq!(block.input_ids, vec![1, 0, 0]);
        assert_eq!(block.attention_mask, vec![1, 0, 0]);

        assert!(dataset.get(2).is_err());
    }

    #[test]
    fn test_paragraph_dataset_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("paragraphs.txt");
        std::fs::write(&path, "ab\ncd\n\n\nba\n").unwrap();

        let vocab = Vocab::new(" abcd");
        let dataset = ParagraphDataset::from_file(&path, &vocab, 8).unwrap();
        assert_eq!(dataset.len(), 2);
        // "ab cd"
        assert_eq!(dataset.get(0).unwrap().input_ids, vec![1, 2, 0, 3, 4, 0, 0, 0]);
        assert_eq!(
            dataset.get(0).unwrap().attention_mask,
            vec![1, 1, 1, 1, 1, 0, 0, 0]
        );
    }
}
