//! corpusgpt: prepare tokenized corpora for GPT training
use anyhow::Context;
use clap::Parser;
use corpusgpt::actions;
use corpusgpt::config::Command;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// The command to run
    #[command(subcommand)]
    command: Command,
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("corpusgpt=info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();

    // if not built in release mode, print a big warning
    #[cfg(debug_assertions)]
    {
        tracing::warn!("this is a debug build, tokenization will be slow");
    }

    match args.command {
        Command::Prepare(args) => {
            actions::prepare(&args)
                .with_context(|| format!("preparing {}", args.corpus.display()))?;
        }
        Command::Inspect(args) => {
            actions::inspect(&args)
                .with_context(|| format!("inspecting {}", args.cache.display()))?;
        }
        Command::JoinJson(args) => {
            actions::join_json(&args)
                .with_context(|| format!("joining {}", args.input_dir.display()))?;
        }
        Command::LastEpoch(args) => {
            actions::last_epoch(&args)
                .with_context(|| format!("reading {}", args.dir.display()))?;
        }
    }

    Ok(())
}
