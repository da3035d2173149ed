/// Tokenizers: text to token ids.
pub mod tokenizer;

/// Extraction of documents from XML, text and JSON corpora.
pub mod corpus;

/// Tokenization and fixed-width windowing into token tables.
pub mod window;

/// Gzip-compressed on-disk cache of token tables.
pub mod cache;

/// Indexed datasets of (input, target) examples.
pub mod dataset;

/// Datasets built directly from text files.
pub mod text;

/// Batching of dataset examples into tensors.
pub mod loader;

pub use cache::{load_cache, save_cache, DEFAULT_CACHE_DESTINATION};
pub use corpus::{read_text_from_xml, read_texts_from_xml_dir, Corpus};
pub use dataset::{Dataset, DatasetOptions, Example, TokenedDataset};
pub use loader::Loader;
pub use tokenizer::{HfTokenizer, Tokenizer, Vocab};
pub use window::{encode_from_texts, TokenTable};
