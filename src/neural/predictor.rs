//! A loaded predictor, usable from the search as a curiosity model.

use std::path::Path;
use std::sync::Mutex;

use burn::prelude::*;

use super::checkpoint::{self, CheckpointMeta};
use super::features;
use super::model::{SignatureNet, SignatureNetConfig};
use crate::braid::Braid;
use crate::error::Result;
use crate::invariant::LinkingMatrix;
use crate::search::curiosity::SignatureModel;

pub struct SignaturePredictor<B: Backend> {
    net: Mutex<SignatureNet<B>>,
    config: SignatureNetConfig,
    device: B::Device,
}

impl<B: Backend> SignaturePredictor<B> {
    pub fn new(net: SignatureNet<B>, config: SignatureNetConfig, device: B::Device) -> Self {
        Self {
            net: Mutex::new(net),
            config,
            device,
        }
    }

    pub fn load(dir: &Path, device: B::Device) -> Result<(Self, CheckpointMeta)> {
        let (net, meta) = checkpoint::load::<B>(dir, &device)?;
        Ok((Self::new(net, meta.config.clone(), device), meta))
    }

    /// One prediction per braid; the linking matrix must be the braid's own.
    pub fn predict(&self, items: &[(&Braid, &LinkingMatrix)]) -> Result<Vec<f32>> {
        if items.is_empty() {
            return Ok(Vec::new());
        }
        let x = features::encode_batch::<B>(&self.config, items, &self.device);
        let net = self.net.lock().unwrap_or_else(|e| e.into_inner());
        net.predict(x)
    }
}

impl<B: Backend> SignatureModel for SignaturePredictor<B> {
    fn predict_signature(&self, braid: &Braid, linking: &LinkingMatrix) -> f32 {
        match self.predict(&[(braid, linking)]) {
            Ok(p) => p.first().copied().unwrap_or(0.0),
            Err(e) => {
                tracing::warn!(error = %e, "signature prediction failed");
                0.0
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::neural::checkpoint::save;
    use crate::neural::model::ModelKind;
    use crate::neural::train::EpochReport;
    use burn::backend::NdArray;

    type B = NdArray;

    fn report() -> EpochReport {
        EpochReport {
            epoch: 0,
            lr: 1e-3,
            train_loss: 1.0,
            val_mse: 1.0,
            val_l1: 1.0,
        }
    }

    #[test]
    fn loads_from_a_checkpoint_and_predicts() {
        let device = Default::default();
        let hopf_braid = Braid::from_signed(2, &[1, 1]).unwrap();
        let hopf = LinkingMatrix::from_rows(&[vec![0, 1], vec![1, 0]]);
        for config in [
            SignatureNetConfig::new().with_hidden(8).with_classify(true),
            SignatureNetConfig::new()
                .with_kind(ModelKind::Transformer)
                .with_d_model(8)
                .with_n_heads(2)
                .with_classify(true),
        ] {
            let dir = tempfile::tempdir().unwrap();
            let net = config.init::<B>(&device);
            save(dir.path(), &net, &CheckpointMeta::new(config.clone(), &report(), 1)).unwrap();

            let (predictor, meta) =
                SignaturePredictor::<B>::load(dir.path(), Default::default()).unwrap();
            assert!(meta.config.classify);
            assert_eq!(meta.config.kind, config.kind);
            let s = predictor.predict_signature(&hopf_braid, &hopf);
            assert_eq!(s.fract(), 0.0);
            assert!(predictor.predict(&[]).unwrap().is_empty());
            let pair = (&hopf_braid, &hopf);
            assert_eq!(predictor.predict(&[pair, pair]).unwrap().len(), 2);
        }
    }
}
