mod cli;

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use cli::catalog::{cmd_catalog, CatalogArgs};
use cli::dataset::{cmd_dataset, DatasetArgs};
use cli::invariants::{cmd_invariants, InvariantsArgs};
use cli::predict::{cmd_predict, PredictArgs};
use cli::search::{cmd_search, SearchArgs};
use cli::train::{cmd_train, TrainArgs};

#[derive(Parser)]
#[command(
    name = "knotgen",
    version,
    about = "Generate knots and links with prescribed invariants"
)]
struct Cli {
    /// Config file (default: nearest knotgen.toml above the working directory)
    #[arg(long, global = true, value_name = "PATH")]
    config: Option<PathBuf>,
    /// Debug logging (RUST_LOG overrides)
    #[arg(short, long, global = true)]
    verbose: bool,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Compute the invariants of a braid closure
    Invariants(InvariantsArgs),
    /// Search for braids whose closure meets a target
    Search(SearchArgs),
    /// List the built-in knots and links
    Catalog(CatalogArgs),
    /// Write a labelled dataset for predictor training
    Dataset(DatasetArgs),
    /// Train a signature predictor
    Train(TrainArgs),
    /// Predict a braid's signature with a trained checkpoint
    Predict(PredictArgs),
}

fn init_tracing(verbose: bool) {
    let filter = if verbose { "knotgen=debug" } else { "knotgen=info" };
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| filter.into()))
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stderr)
                .without_time(),
        )
        .init();
}

fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose);
    let config = cli.config.as_deref();

    match cli.command {
        Command::Invariants(args) => cmd_invariants(args, config),
        Command::Search(args) => cmd_search(args, config),
        Command::Catalog(args) => cmd_catalog(args),
        Command::Dataset(args) => cmd_dataset(args, config),
        Command::Train(args) => cmd_train(args, config),
        Command::Predict(args) => cmd_predict(args, config),
    }
}
