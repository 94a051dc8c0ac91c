use std::path::{Path, PathBuf};

use clap::Args;
use knotgen::neural::dataset;
use knotgen::search::ReplayBuffer;

#[derive(Args)]
pub struct DatasetArgs {
    /// Output JSON-lines file
    #[arg(short, long)]
    pub out: PathBuf,
    /// Number of random braids
    #[arg(short = 'n', long, default_value = "10000")]
    pub count: usize,
    #[arg(long)]
    pub seed: Option<u64>,
    #[arg(long)]
    pub strands: Option<usize>,
    #[arg(long)]
    pub max_length: Option<usize>,
    /// Label the braids of a replay archive instead of random ones
    #[arg(long, value_name = "PATH")]
    pub from_replay: Option<PathBuf>,
}

pub fn cmd_dataset(args: DatasetArgs, config: Option<&Path>) {
    let mut config = super::load_config(config);
    if let Some(n) = args.strands {
        config.search.strands = n;
    }
    if let Some(m) = args.max_length {
        config.search.max_length = m;
    }
    let seed = args.seed.unwrap_or(config.search.seed);

    let samples = match &args.from_replay {
        Some(path) => match ReplayBuffer::load(path) {
            Ok(buffer) => dataset::from_replay(&buffer),
            Err(e) => super::fail(e, "<replay>", ""),
        },
        None => dataset::generate(args.count, &config.search, seed),
    };

    if let Err(e) = dataset::write_jsonl(&args.out, &samples) {
        super::fail(e, "<dataset>", "");
    }
    let knots = samples.iter().filter(|s| s.components == 1).count();
    eprintln!(
        "Wrote {} samples ({} knots, {} links) to {}",
        samples.len(),
        knots,
        samples.len() - knots,
        args.out.display()
    );
}
