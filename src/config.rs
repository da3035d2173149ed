use std::fmt::Display;
use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};
use tch::nn::{self, OptimizerConfig as _};

use crate::data::cache::DEFAULT_CACHE_DESTINATION;
use crate::error::{Error, Result};

/// Torch device to use.
#[derive(ValueEnum, Debug, Clone, Copy, Default)]
pub enum Device {
    /// CPU
    #[default]
    Cpu,
    /// CUDA if available
    Cuda,
    /// MPS
    #[cfg(target_arch = "aarch64")]
    Mps,
}

impl From<Device> for tch::Device {
    fn from(device: Device) -> Self {
        match device {
            Device::Cpu => tch::Device::Cpu,
            Device::Cuda => tch::Device::cuda_if_available(),
            #[cfg(target_arch = "aarch64")]
            Device::Mps => tch::Device::Mps,
        }
    }
}

/// Model size presets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ModelSize {
    /// Small GPT
    #[clap(name = "small")]
    Small,
    /// Large GPT
    #[clap(name = "large")]
    Large,
    /// KoGPT 6B
    #[clap(name = "kogpt")]
    KoGpt,
    /// LLaMA 7B
    #[clap(name = "llama")]
    Llama,
}

impl ModelSize {
    /// Look up a preset by name, ignoring case.
    pub fn from_name(name: &str) -> Result<Self> {
        <Self as ValueEnum>::from_str(name, true)
            .map_err(|_| Error::UnknownModelSize(name.to_string()))
    }

    /// Return the configuration of the preset
    pub fn config(self) -> ModelConfig {
        match self {
            ModelSize::Small => ModelConfig {
                vocab_size: 64512,
                block_size: 256,
                n_embd: 384,
                n_head: 6,
                n_layer: 6,
                dropout: 0.2,
            },
            ModelSize::Large => ModelConfig {
                vocab_size: 64512,
                block_size: 1024,
                n_embd: 768,
                n_head: 12,
                n_layer: 12,
                dropout: 0.1,
            },
            ModelSize::KoGpt => ModelConfig {
                vocab_size: 64512,
                block_size: 2048,
                n_embd: 4096,
                n_head: 16,
                n_layer: 28,
                dropout: 0.0,
            },
            ModelSize::Llama => ModelConfig {
                vocab_size: 32000,
                block_size: 2048,
                n_embd: 4096,
                n_head: 32,
                n_layer: 32,
                dropout: 0.0,
            },
        }
    }
}

impl Display for ModelSize {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ModelSize::Small => write!(f, "small"),
            ModelSize::Large => write!(f, "large"),
            ModelSize::KoGpt => write!(f, "kogpt"),
            ModelSize::Llama => write!(f, "llama"),
        }
    }
}

/// Hyper-parameters of a GPT model.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ModelConfig {
    /// Size of the vocabulary
    pub vocab_size: i64,
    /// Maximum sequence length
    pub block_size: usize,
    /// The size of the embedding
    pub n_embd: i64,
    /// Number of heads
    pub n_head: i64,
    /// Number of layers
    pub n_layer: i64,
    /// Dropout probability
    pub dropout: f64,
}

/// AdamW settings.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OptimizerConfig {
    /// Learning rate
    pub lr: f64,
    /// First moment decay
    pub beta1: f64,
    /// Second moment decay
    pub beta2: f64,
    /// Weight decay
    pub wd: f64,
}

impl Default for OptimizerConfig {
    fn default() -> Self {
        Self {
            lr: 3e-4,
            beta1: 0.9,
            beta2: 0.95,
            wd: 0.01,
        }
    }
}

impl OptimizerConfig {
    /// Build the optimizer over the trainable variables of `vs`.
    pub fn build(&self, vs: &nn::VarStore) -> Result<nn::Optimizer> {
        let adamw = nn::AdamW {
            beta1: self.beta1,
            beta2: self.beta2,
            wd: self.wd,
            ..Default::default()
        };
        Ok(adamw.build(vs, self.lr)?)
    }
}

/// Tokenizer selection.
#[derive(Args, Debug, Clone)]
#[group(required = true, multiple = false)]
pub struct TokenizerArgs {
    /// HuggingFace tokenizer JSON file
    #[arg(long)]
    pub tokenizer_path: Option<PathBuf>,

    /// Text file whose characters make a character-level vocabulary
    #[arg(long)]
    pub vocab_file: Option<PathBuf>,
}

/// Window size, given directly or taken from a model preset.
#[derive(Args, Debug, Clone)]
pub struct BlockSizeArgs {
    /// Number of tokens in one training window
    #[arg(long)]
    pub block_size: Option<usize>,

    /// Model preset providing the block size when none is given
    #[arg(long, default_value_t = ModelSize::Small)]
    pub model_size: ModelSize,
}

impl BlockSizeArgs {
    /// Return the block size to use
    pub fn resolve(&self) -> usize {
        self.block_size
            .unwrap_or_else(|| self.model_size.config().block_size)
    }
}

/// Arguments of the `prepare` command.
#[derive(Parser, Debug, Clone)]
pub struct PrepareArgs {
    /// Directory of XML documents or plain-text file
    #[arg(long)]
    pub corpus: PathBuf,

    /// Tokenizer
    #[command(flatten)]
    pub tokenizer: TokenizerArgs,

    /// Block size
    #[command(flatten)]
    pub block: BlockSizeArgs,

    /// Cache file to write
    #[arg(long, default_value = DEFAULT_CACHE_DESTINATION)]
    pub cache: PathBuf,
}

/// Arguments of the `inspect` command.
#[derive(Parser, Debug, Clone)]
pub struct InspectArgs {
    /// Cache file to read
    #[arg(long, default_value = DEFAULT_CACHE_DESTINATION)]
    pub cache: PathBuf,

    /// Block size
    #[command(flatten)]
    pub block: BlockSizeArgs,

    /// Row to print
    #[arg(long, default_value_t = 0)]
    pub index: usize,

    /// The device to use
    #[arg(short, long, default_value = "cpu")]
    pub device: Device,
}

/// Arguments of the `join-json` command.
#[derive(Parser, Debug, Clone)]
pub struct JoinJsonArgs {
    /// Directory of JSON newspaper files
    #[arg(long)]
    pub input_dir: PathBuf,

    /// Text file to write
    #[arg(long, default_value = "data.txt")]
    pub output: PathBuf,
}

/// Arguments of the `last-epoch` command.
#[derive(Parser, Debug, Clone)]
pub struct LastEpochArgs {
    /// Checkpoint directory
    #[arg(long)]
    pub dir: PathBuf,
}

/// The command to run.
#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Tokenize a corpus and write the token cache
    Prepare(PrepareArgs),
    /// Load a token cache and print an example
    Inspect(InspectArgs),
    /// Flatten a JSON newspaper corpus into a text file
    JoinJson(JoinJsonArgs),
    /// Print the last saved epoch of a checkpoint directory
    LastEpoch(LastEpochArgs),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_model_size_from_name() {
        assert_eq!(ModelSize::from_name("small").unwrap(), ModelSize::Small);
        assert_eq!(ModelSize::from_name("KOGPT").unwrap(), ModelSize::KoGpt);
        assert_eq!(ModelSize::from_name("LLAMA").unwrap(), ModelSize::Llama);
        assert!(matches!(
            ModelSize::from_name("huge"),
            Err(Error::UnknownModelSize(name)) if name == "huge"
        ));
    }

    #[test]
    fn test_model_size_display_round_trip() {
        for size in ModelSize::value_variants() {
            assert_eq!(ModelSize::from_name(&size.to_string()).unwrap(), *size);
            let config = size.config();
            assert_eq!(config.n_embd % config.n_head, 0);
        }
    }

    #[test]
    fn test_block_size_resolve() {
        let args = BlockSizeArgs {
            block_size: None,
            model_size: ModelSize::Large,
        };
        assert_eq!(args.resolve(), 1024);
        let args = BlockSizeArgs {
            block_size: Some(128),
            ..args
        };
        assert_eq!(args.resolve(), 128);
    }

    #[test]
    fn test_optimizer_build() {
        let vs = nn::VarStore::new(tch::Device::Cpu);
        let w = vs.root().zeros("w", &[2]);
        let mut opt = OptimizerConfig::default().build(&vs).unwrap();

        let loss = (&w - tch::Tensor::from_slice(&[1.0f32, 1.0])).square().sum(tch::Kind::Float);
        opt.backward_step(&loss);
        let w: Vec<f32> = w.try_into().unwrap();
        assert!(w.iter().all(|&x| x > 0.0));
    }
}
