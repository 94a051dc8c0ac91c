use std::path::{Path, PathBuf};
use std::process;

use burn::backend::wgpu::{Wgpu, WgpuDevice};
use burn::backend::{Autodiff, NdArray};
use burn::tensor::backend::AutodiffBackend;
use clap::Args;
use knotgen::neural::checkpoint::{self, CheckpointMeta};
use knotgen::neural::dataset::{self, Sample};
use knotgen::neural::train::{self, Trained};
use knotgen::neural::{ModelKind, NeuralConfig};

#[derive(Args)]
pub struct TrainArgs {
    /// JSON-lines dataset written by `knotgen dataset`
    #[arg(short, long)]
    pub data: PathBuf,
    /// mlp, cnn or transformer
    #[arg(short, long)]
    pub model: Option<String>,
    /// Predict signature classes instead of a real value
    #[arg(long)]
    pub classify: bool,
    #[arg(short, long)]
    pub epochs: Option<usize>,
    #[arg(long)]
    pub batch_size: Option<usize>,
    /// Checkpoint directory (default from the config file)
    #[arg(short, long)]
    pub out: Option<PathBuf>,
    #[arg(long, default_value = "0")]
    pub seed: u64,
    /// Train on the GPU (wgpu) instead of the CPU
    #[arg(long)]
    pub gpu: bool,
}

pub fn cmd_train(args: TrainArgs, config: Option<&Path>) {
    let mut neural = super::load_config(config).neural;
    if let Some(m) = &args.model {
        match m.parse::<ModelKind>() {
            Ok(kind) => neural.model = kind,
            Err(e) => super::fail(e, "<model>", m),
        }
    }
    if args.classify {
        neural.classify = true;
    }
    if let Some(e) = args.epochs {
        neural.epochs = e;
    }
    if let Some(b) = args.batch_size {
        neural.batch_size = b;
    }
    let out = args.out.clone().unwrap_or_else(|| neural.checkpoint_dir.clone());

    let samples = match dataset::read_jsonl(&args.data) {
        Ok(s) => s,
        Err(e) => super::fail(e, "<dataset>", ""),
    };
    let (train_set, val_set) = dataset::split(samples, neural.val_fraction, args.seed);
    eprintln!(
        "Training {} ({}) on {} samples, validating on {}",
        neural.model,
        if neural.classify { "classes" } else { "regression" },
        train_set.len(),
        val_set.len()
    );

    if args.gpu {
        let device = WgpuDevice::default();
        run::<Autodiff<Wgpu>>(&neural, &train_set, &val_set, &out, args.seed, &device);
    } else {
        let device = Default::default();
        run::<Autodiff<NdArray>>(&neural, &train_set, &val_set, &out, args.seed, &device);
    }
}

fn run<B: AutodiffBackend>(
    neural: &NeuralConfig,
    train_set: &[Sample],
    val_set: &[Sample],
    out: &Path,
    seed: u64,
    device: &B::Device,
) {
    let net = neural.net_config();
    let trained: Trained<B> =
        match train::train(&net, &neural.train_config(seed), train_set, val_set, device) {
            Ok(t) => t,
            Err(e) => super::fail(e, "<train>", ""),
        };
    let Some(best) = trained.best_report() else {
        eprintln!("error: no epochs were run");
        process::exit(1);
    };
    let meta = CheckpointMeta::new(net, best, train_set.len());
    match checkpoint::save(out, &trained.model, &meta) {
        Ok(path) => eprintln!(
            "Best epoch {}: val mse {:.4}, val l1 {:.4}; saved {}",
            best.epoch,
            best.val_mse,
            best.val_l1,
            path.display()
        ),
        Err(e) => super::fail(e, "<checkpoint>", ""),
    }
}
