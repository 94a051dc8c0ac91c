//! Checkpoint management for signature predictors.
//!
//! Uses burn's native record format (NamedMpk, full precision) for the
//! weights and a JSON file next to it for the network config and the
//! training scores, so a checkpoint can be rebuilt without extra flags.

use std::path::{Path, PathBuf};

use burn::module::Module;
use burn::prelude::*;
use burn::record::{FullPrecisionSettings, NamedMpkFileRecorder};
use serde::{Deserialize, Serialize};

use super::model::{SignatureNet, SignatureNetConfig};
use super::train::EpochReport;
use crate::error::{Error, Result};

/// Weights file stem; burn appends `.mpk`.
const WEIGHTS: &str = "model";
const META: &str = "meta.json";

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct CheckpointMeta {
    pub config: SignatureNetConfig,
    pub epoch: usize,
    pub val_mse: f64,
    pub val_l1: f64,
    pub train_samples: usize,
}

impl CheckpointMeta {
    pub fn new(config: SignatureNetConfig, report: &EpochReport, train_samples: usize) -> Self {
        Self {
            config,
            epoch: report.epoch,
            val_mse: report.val_mse,
            val_l1: report.val_l1,
            train_samples,
        }
    }
}

pub fn weights_path(dir: &Path) -> PathBuf {
    dir.join(WEIGHTS).with_extension("mpk")
}

pub fn exists(dir: &Path) -> bool {
    weights_path(dir).exists() && dir.join(META).exists()
}

/// Write the weights and metadata into `dir`, creating it if needed.
pub fn save<B: Backend>(
    dir: &Path,
    model: &SignatureNet<B>,
    meta: &CheckpointMeta,
) -> Result<PathBuf> {
    std::fs::create_dir_all(dir)
        .map_err(|e| Error::Checkpoint(format!("mkdir {}: {e}", dir.display())))?;

    let recorder = NamedMpkFileRecorder::<FullPrecisionSettings>::new();
    model
        .clone()
        .save_file(dir.join(WEIGHTS), &recorder)
        .map_err(|e| Error::Checkpoint(format!("save {}: {e}", dir.display())))?;
    std::fs::write(dir.join(META), serde_json::to_string_pretty(meta)?)?;

    Ok(weights_path(dir))
}

pub fn read_meta(dir: &Path) -> Result<CheckpointMeta> {
    let path = dir.join(META);
    let text = std::fs::read_to_string(&path)
        .map_err(|e| Error::Checkpoint(format!("read {}: {e}", path.display())))?;
    Ok(serde_json::from_str(&text)?)
}

/// Rebuild the network from its metadata and load the weights.
pub fn load<B: Backend>(dir: &Path, device: &B::Device) -> Result<(SignatureNet<B>, CheckpointMeta)> {
    let meta = read_meta(dir)?;
    let full_path = weights_path(dir);
    if !full_path.exists() {
        return Err(Error::Checkpoint(format!(
            "{} does not exist",
            full_path.display()
        )));
    }
    let recorder = NamedMpkFileRecorder::<FullPrecisionSettings>::new();
    let model = meta
        .config
        .init::<B>(device)
        .load_file(dir.join(WEIGHTS), &recorder, device)
        .map_err(|e| Error::Checkpoint(format!("load {}: {e}", full_path.display())))?;
    Ok((model, meta))
}
