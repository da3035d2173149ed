use std::path::Path;

use crate::error::{Error, Result};

/// Text to token ids and back.
pub trait Tokenizer {
    /// Encode a string
    fn encode(&self, s: &str) -> Result<Vec<i64>>;

    /// Decode a sequence of token ids
    fn decode(&self, ids: &[i64]) -> Result<String>;

    /// Return the size of the vocabulary
    fn vocab_size(&self) -> usize;

    /// Token id used to pad sequences.
    fn pad_id(&self) -> i64 {
        0
    }
}

/// Character-level vocabulary
#[derive(Clone, Debug)]
pub struct Vocab {
    chars: Vec<char>,
}

impl Vocab {
    /// Create a new vocabulary from a string
    pub fn new(data: &str) -> Self {
        let mut chars: Vec<char> = data.chars().collect();
        chars.sort();
        chars.dedup();
        Self { chars }
    }

    /// Build the vocabulary from the content of a file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let data = std::fs::read_to_string(path).map_err(Error::path(path))?;
        Ok(Self::new(&data))
    }

    fn encode_char(&self, c: char) -> Result<i64> {
        self.chars
            .binary_search(&c)
            .map(|i| i as i64)
            .map_err(|_| Error::Tokenizer(format!("character {c:?} is not in the vocabulary")))
    }

    fn decode_char(&self, i: i64) -> Result<char> {
        usize::try_from(i)
            .ok()
            .and_then(|i| self.chars.get(i).copied())
            .ok_or_else(|| Error::Tokenizer(format!("token id {i} is not in the vocabulary")))
    }

    /// Return a reference to the characters
    pub fn chars(&self) -> &[char] {
        &self.chars
    }
}

impl Tokenizer for Vocab {
    fn encode(&self, s: &str) -> Result<Vec<i64>> {
        s.chars().map(|c| self.encode_char(c)).collect()
    }

    fn decode(&self, ids: &[i64]) -> Result<String> {
        ids.iter().map(|&i| self.decode_char(i)).collect()
    }

    fn vocab_size(&self) -> usize {
        self.chars.len()
    }
}

/// Pretrained HuggingFace tokenizer loaded from a `tokenizer.json` file.
pub struct HfTokenizer {
    tokenizer: tokenizers::Tokenizer,
    add_special_tokens: bool,
    pad_id: i64,
}

impl HfTokenizer {
    /// Load the tokenizer. Special tokens are added when encoding.
    pub fn new<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        std::fs::metadata(path).map_err(Error::path(path))?;
        let tokenizer =
            tokenizers::Tokenizer::from_file(path).map_err(|e| Error::Tokenizer(e.to_string()))?;

        let pad_id = tokenizer
            .get_padding()
            .map(|p| p.pad_id)
            .or_else(|| tokenizer.token_to_id("[PAD]"))
            .unwrap_or(0) as i64;

        Ok(Self {
            tokenizer,
            add_special_tokens: true,
            pad_id,
        })
    }

    /// Toggle the special tokens added around each encoded text.
    pub fn with_special_tokens(mut self, add_special_tokens: bool) -> Self {
        self.add_special_tokens = add_special_tokens;
        self
    }
}

impl Tokenizer for HfTokenizer {
    fn encode(&self, s: &str) -> Result<Vec<i64>> {
        let encoding = self
            .tokenizer
            .encode(s, self.add_special_tokens)
            .map_err(|e| Error::Tokenizer(e.to_string()))?;
        Ok(encoding.get_ids().iter().map(|&id| id as i64).collect())
    }

    fn decode(&self, ids: &[i64]) -> Result<String> {
        let ids = ids.iter().map(|&id| id as u32).collect::<Vec<_>>();
        self.tokenizer
            .decode(&ids, true)
            .map_err(|e| Error::Tokenizer(e.to_string()))
    }

    fn vocab_size(&self) -> usize {
        self.tokenizer.get_vocab_size(true)
    }

    fn pad_id(&self) -> i64 {
        self.pad_id
    }
}
