use tracing::info;

use crate::checkpoint;
use crate::config::{InspectArgs, JoinJsonArgs, LastEpochArgs, PrepareArgs, TokenizerArgs};
use crate::data::corpus::{json_corpus_to_text, Corpus};
use crate::data::dataset::{Dataset, TokenedDataset};
use crate::data::tokenizer::{HfTokenizer, Tokenizer, Vocab};
use crate::error::{Error, Result};

/// Create the tokenizer from the command line arguments
pub fn create_tokenizer(args: &TokenizerArgs) -> Result<Box<dyn Tokenizer>> {
    match (&args.tokenizer_path, &args.vocab_file) {
        (Some(path), _) => {
            info!(path = %path.display(), "loading tokenizer");
            Ok(Box::new(HfTokenizer::new(path)?))
        }
        (None, Some(vocab_file)) => {
            info!(path = %vocab_file.display(), "building character vocabulary");
            Ok(Box::new(Vocab::from_file(vocab_file)?))
        }
        (None, None) => Err(Error::NoTokenizer),
    }
}

/// Tokenize the corpus and write the cache
pub fn prepare(args: &PrepareArgs) -> Result<TokenedDataset> {
    let tokenizer = create_tokenizer(&args.tokenizer)?;
    let block_size = args.block.resolve();
    info!(
        corpus = %args.corpus.display(),
        block_size,
        vocab_size = tokenizer.vocab_size(),
        "preparing dataset"
    );

    let corpus = Corpus::detect(&args.corpus)?;
    let dataset =
        TokenedDataset::from_corpus(&corpus, tokenizer.as_ref(), block_size, tch::Device::Cpu)?;
    dataset.save_cache(&args.cache)?;

    println!("{dataset}");
    Ok(dataset)
}

/// Load the cache and print one example
pub fn inspect(args: &InspectArgs) -> Result<()> {
    let dataset =
        TokenedDataset::from_cache(&args.cache, args.block.resolve(), args.device.into())?;
    println!("{dataset}");

    if dataset.is_empty() {
        return Ok(());
    }
    let (x, y) = dataset.get(args.index)?;
    let x: Vec<i64> = x.to(tch::Device::Cpu).try_into()?;
    let y: Vec<i64> = y.to(tch::Device::Cpu).try_into()?;
    println!("input[{}]:  {:?}", args.index, x);
    println!("target[{}]: {:?}", args.index, y);
    Ok(())
}

/// Flatten a JSON newspaper corpus
pub fn join_json(args: &JoinJsonArgs) -> Result<()> {
    let n = json_corpus_to_text(&args.input_dir, &args.output)?;
    println!("{} sentences written to {}", n, args.output.display());
    Ok(())
}

/// Print the last epoch of a checkpoint directory
pub fn last_epoch(args: &LastEpochArgs) -> Result<()> {
    match checkpoint::last_epoch(&args.dir)? {
        Some(epoch) => println!("{epoch}"),
        None => return Err(Error::NoCheckpoint(args.dir.clone())),
    }
    Ok(())
}
