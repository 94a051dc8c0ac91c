use std::path::{Path, PathBuf};

use burn::backend::wgpu::{Wgpu, WgpuDevice};
use burn::backend::NdArray;
use clap::Args;
use knotgen::braid::Braid;
use knotgen::invariant::{self, InvariantSet, LinkingMatrix};
use knotgen::neural::SignaturePredictor;

#[derive(Args)]
pub struct PredictArgs {
    /// Braid word or catalogue name
    pub braid: String,
    /// Checkpoint directory (default from the config file)
    #[arg(short, long)]
    pub checkpoint: Option<PathBuf>,
    #[arg(long)]
    pub gpu: bool,
}

pub fn cmd_predict(args: PredictArgs, config: Option<&Path>) {
    let neural = super::load_config(config).neural;
    let dir = args.checkpoint.clone().unwrap_or(neural.checkpoint_dir);
    let braid = super::resolve_braid(&args.braid);
    let inv = match invariant::compute(&braid, &InvariantSet::default()) {
        Ok(inv) => inv,
        Err(e) => super::fail(e, "<braid>", &args.braid),
    };

    let predicted = if args.gpu {
        predict_with(SignaturePredictor::<Wgpu>::load(&dir, WgpuDevice::default()), &braid, &inv.linking)
    } else {
        predict_with(SignaturePredictor::<NdArray>::load(&dir, Default::default()), &braid, &inv.linking)
    };

    println!("braid       {}", braid);
    println!("predicted   {:.3}", predicted);
    println!("exact       {}", inv.signature);
}

fn predict_with<B: burn::prelude::Backend>(
    loaded: knotgen::Result<(SignaturePredictor<B>, knotgen::neural::checkpoint::CheckpointMeta)>,
    braid: &Braid,
    linking: &LinkingMatrix,
) -> f32 {
    let (predictor, _) = match loaded {
        Ok(p) => p,
        Err(e) => super::fail(e, "<checkpoint>", ""),
    };
    match predictor.predict(&[(braid, linking)]) {
        Ok(p) => p.first().copied().unwrap_or(0.0),
        Err(e) => super::fail(e, "<checkpoint>", ""),
    }
}
