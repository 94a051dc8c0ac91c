//! Learned signature predictors.
//!
//! Networks that guess a braid closure's signature from its linking matrix
//! or from its braid word. They are trained on braids labelled with exact invariants and
//! serve as the prediction-error signal of the curiosity bonus.
//!
//! ```ignore
//! use knotgen::neural;
//! let model = neural::load_signature_model(dir, false)?;
//! let curiosity = Curiosity::new(config).with_model(model);
//! ```

pub mod checkpoint;
pub mod dataset;
pub mod features;
pub mod model;
pub mod predictor;
pub mod train;

use std::path::{Path, PathBuf};

use burn::backend::wgpu::{Wgpu, WgpuDevice};
use burn::backend::NdArray;
use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::search::curiosity::SignatureModel;
pub use model::{ModelKind, SignatureNet, SignatureNetConfig};
pub use predictor::SignaturePredictor;
pub use train::{EpochReport, TrainConfig};

/// The `[neural]` section of the config file.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NeuralConfig {
    pub checkpoint_dir: PathBuf,
    pub model: ModelKind,
    pub classify: bool,
    pub lk_matrix_size: usize,
    pub hidden: usize,
    pub kernel: usize,
    pub layer_norm: bool,
    pub dropout: f64,
    pub num_classes: usize,
    pub max_strands: usize,
    pub max_len: usize,
    pub d_model: usize,
    pub n_heads: usize,
    pub n_layers: usize,
    pub d_ff: usize,
    pub epochs: usize,
    pub batch_size: usize,
    pub learning_rate: f64,
    pub lr_decay: f64,
    pub val_fraction: f64,
}

impl Default for NeuralConfig {
    fn default() -> Self {
        Self {
            checkpoint_dir: PathBuf::from("checkpoints/signature"),
            model: ModelKind::Mlp,
            classify: false,
            lk_matrix_size: 8,
            hidden: 256,
            kernel: 3,
            layer_norm: false,
            dropout: 0.1,
            num_classes: features::NUM_CLASSES,
            max_strands: 8,
            max_len: 32,
            d_model: 64,
            n_heads: 4,
            n_layers: 2,
            d_ff: 128,
            epochs: 20,
            batch_size: 64,
            learning_rate: 1e-3,
            lr_decay: 0.95,
            val_fraction: 0.1,
        }
    }
}

impl NeuralConfig {
    pub fn net_config(&self) -> SignatureNetConfig {
        SignatureNetConfig::new()
            .with_kind(self.model)
            .with_lk_size(self.lk_matrix_size.max(1))
            .with_hidden(self.hidden.max(1))
            .with_classify(self.classify)
            .with_num_classes(self.num_classes)
            .with_kernel(self.kernel)
            .with_layer_norm(self.layer_norm)
            .with_dropout(self.dropout)
            .with_max_strands(self.max_strands)
            .with_max_len(self.max_len.max(1))
            .with_d_model(self.d_model)
            .with_n_heads(self.n_heads)
            .with_n_layers(self.n_layers)
            .with_d_ff(self.d_ff)
    }

    pub fn train_config(&self, seed: u64) -> TrainConfig {
        TrainConfig {
            epochs: self.epochs,
            batch_size: self.batch_size,
            learning_rate: self.learning_rate,
            lr_decay: self.lr_decay,
            seed,
        }
    }
}

/// Load a checkpoint as a curiosity model, on the GPU (wgpu) or the CPU
/// (ndarray).
pub fn load_signature_model(dir: &Path, gpu: bool) -> Result<Box<dyn SignatureModel>> {
    if gpu {
        let device = WgpuDevice::default();
        let (p, meta) = SignaturePredictor::<Wgpu>::load(dir, device)?;
        tracing::info!(dir = %dir.display(), epoch = meta.epoch, "loaded predictor on gpu");
        Ok(Box::new(p))
    } else {
        let (p, meta) = SignaturePredictor::<NdArray>::load(dir, Default::default())?;
        tracing::info!(dir = %dir.display(), epoch = meta.epoch, "loaded predictor");
        Ok(Box::new(p))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_maps_to_network() {
        let cfg = NeuralConfig {
            model: ModelKind::Cnn,
            kernel: 2,
            classify: true,
            ..NeuralConfig::default()
        };
        let net = cfg.net_config();
        assert_eq!(net.kind, ModelKind::Cnn);
        assert_eq!(net.outputs(), 41);
        assert_eq!(net.conv_side(), 5);
        assert_eq!(cfg.train_config(3).seed, 3);
    }

    #[test]
    fn transformer_settings_reach_the_network() {
        let cfg: NeuralConfig =
            toml::from_str("model = \"transformer\"\nd_model = 30\nn_heads = 3\nmax_len = 12")
                .unwrap();
        let net = cfg.net_config();
        assert_eq!(net.kind, ModelKind::Transformer);
        assert_eq!(net.max_len, 12);
        assert_eq!(net.transformer_width(), 30);
        assert_eq!(net.n_layers, 2);
    }

    #[test]
    fn partial_toml_keeps_defaults() {
        let cfg: NeuralConfig = toml::from_str("model = \"cnn\"\nepochs = 3").unwrap();
        assert_eq!(cfg.model, ModelKind::Cnn);
        assert_eq!(cfg.epochs, 3);
        assert_eq!(cfg.lk_matrix_size, 8);
    }

    #[test]
    fn missing_checkpoint_fails_to_load() {
        let dir = tempfile::tempdir().unwrap();
        assert!(load_signature_model(dir.path(), false).is_err());
    }
}
