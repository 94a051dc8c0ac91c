//! Minibatch training of a signature predictor.
//!
//! Adam with an exponentially decaying learning rate (one decay step per
//! epoch). After every epoch the model is scored on the validation split by
//! the MSE and L1 error of its predicted signature; the best epoch is kept.

use burn::module::AutodiffModule;
use burn::optim::{AdamConfig, GradientsParams, Optimizer};
use burn::prelude::*;
use burn::tensor::backend::AutodiffBackend;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};

use super::dataset::Sample;
use super::features;
use super::model::{SignatureNet, SignatureNetConfig};
use crate::error::{Error, Result};

#[derive(Clone, Debug, PartialEq)]
pub struct TrainConfig {
    pub epochs: usize,
    pub batch_size: usize,
    pub learning_rate: f64,
    /// Multiplier applied to the learning rate after each epoch.
    pub lr_decay: f64,
    pub seed: u64,
}

impl Default for TrainConfig {
    fn default() -> Self {
        Self {
            epochs: 20,
            batch_size: 64,
            learning_rate: 1e-3,
            lr_decay: 0.95,
            seed: 0,
        }
    }
}

impl TrainConfig {
    pub fn lr_at(&self, epoch: usize) -> f64 {
        self.learning_rate * self.lr_decay.powi(epoch as i32)
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct EpochReport {
    pub epoch: usize,
    pub lr: f64,
    pub train_loss: f64,
    pub val_mse: f64,
    pub val_l1: f64,
}

/// A trained model (without autodiff) and its history.
pub struct Trained<B: AutodiffBackend> {
    pub model: SignatureNet<B::InnerBackend>,
    pub reports: Vec<EpochReport>,
    /// Index into `reports` of the epoch whose weights were kept.
    pub best: usize,
}

impl<B: AutodiffBackend> Trained<B> {
    pub fn best_report(&self) -> Option<&EpochReport> {
        self.reports.get(self.best)
    }
}

/// Mean squared and absolute error of predicted against true signatures.
pub fn validate<B: Backend>(
    model: &SignatureNet<B>,
    net: &SignatureNetConfig,
    samples: &[Sample],
    batch_size: usize,
    device: &B::Device,
) -> Result<(f64, f64)> {
    if samples.is_empty() {
        return Ok((0.0, 0.0));
    }
    let (mut se, mut ae) = (0.0f64, 0.0f64);
    for chunk in samples.chunks(batch_size.max(1)) {
        let refs: Vec<&Sample> = chunk.iter().collect();
        let preds = model.predict(features::encode_samples::<B>(net, &refs, device)?)?;
        for (p, s) in preds.iter().zip(chunk) {
            let err = *p as f64 - s.signature as f64;
            se += err * err;
            ae += err.abs();
        }
    }
    let n = samples.len() as f64;
    Ok((se / n, ae / n))
}

pub fn train<B: AutodiffBackend>(
    net: &SignatureNetConfig,
    config: &TrainConfig,
    train_set: &[Sample],
    val_set: &[Sample],
    device: &B::Device,
) -> Result<Trained<B>> {
    if train_set.is_empty() {
        return Err(Error::Dataset("no training samples".to_string()));
    }
    let mut model: SignatureNet<B> = net.init(device);
    let mut optimizer = AdamConfig::new().init();
    let mut rng = StdRng::seed_from_u64(config.seed);
    let mut order: Vec<usize> = (0..train_set.len()).collect();
    let mut reports = Vec::new();
    let mut best: Option<(f64, usize, SignatureNet<B::InnerBackend>)> = None;

    for epoch in 0..config.epochs.max(1) {
        let lr = config.lr_at(epoch);
        order.shuffle(&mut rng);
        let mut total = 0.0f64;
        let mut batches = 0usize;

        for chunk in order.chunks(config.batch_size.max(1)) {
            let refs: Vec<&Sample> = chunk.iter().map(|&i| &train_set[i]).collect();
            let signatures: Vec<i32> = refs.iter().map(|s| s.signature).collect();
            let x = features::encode_samples::<B>(net, &refs, device)?;

            let loss = model.loss(x, &signatures)?;
            total += loss
                .clone()
                .into_data()
                .convert::<f64>()
                .to_vec::<f64>()
                .ok()
                .and_then(|v| v.first().copied())
                .unwrap_or(f64::NAN);
            batches += 1;

            let grads = loss.backward();
            let grads = GradientsParams::from_grads(grads, &model);
            model = optimizer.step(lr, model, grads);
        }

        let valid = model.valid();
        let scored = if val_set.is_empty() { train_set } else { val_set };
        let (val_mse, val_l1) = validate(&valid, net, scored, config.batch_size, device)?;
        let report = EpochReport {
            epoch,
            lr,
            train_loss: total / batches.max(1) as f64,
            val_mse,
            val_l1,
        };
        tracing::info!(
            epoch,
            lr,
            train_loss = report.train_loss,
            val_mse,
            val_l1,
            "epoch finished"
        );
        if best.as_ref().map_or(true, |(m, _, _)| val_mse < *m) {
            best = Some((val_mse, reports.len(), valid));
        }
        reports.push(report);
    }

    match best {
        Some((_, index, model)) => Ok(Trained {
            model,
            reports,
            best: index,
        }),
        None => Err(Error::Model("training produced no epochs".to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::braid::Braid;
    use crate::neural::model::ModelKind;
    use burn::backend::{Autodiff, NdArray};

    type B = Autodiff<NdArray>;

    /// σ₁ⁿ for n = 1..=8; the signature is 1 − n throughout.
    fn torus_samples() -> Vec<Sample> {
        (1..=8)
            .map(|n| Sample::from_braid(&Braid::from_signed(2, &vec![1; n]).unwrap()).unwrap())
            .collect()
    }

    #[test]
    fn lr_decays_per_epoch() {
        let cfg = TrainConfig::default();
        assert_eq!(cfg.lr_at(0), 1e-3);
        assert!((cfg.lr_at(2) - 1e-3 * 0.95 * 0.95).abs() < 1e-15);
    }

    #[test]
    fn trains_and_reports_each_epoch() {
        let device = Default::default();
        let net = SignatureNetConfig::new().with_hidden(16).with_dropout(0.0);
        let cfg = TrainConfig {
            epochs: 3,
            batch_size: 4,
            ..TrainConfig::default()
        };
        let samples = torus_samples();
        let trained = train::<B>(&net, &cfg, &samples[..6], &samples[6..], &device).unwrap();
        assert_eq!(trained.reports.len(), 3);
        assert!(trained.best < 3);
        let best = trained.best_report().unwrap();
        assert!(best.val_mse.is_finite() && best.val_l1 >= 0.0);
        assert!(trained.reports.iter().all(|r| r.train_loss.is_finite()));
    }

    #[test]
    fn regression_fits_a_tiny_set() {
        let device = Default::default();
        let net = SignatureNetConfig::new().with_hidden(32).with_dropout(0.0);
        let cfg = TrainConfig {
            epochs: 200,
            batch_size: 8,
            learning_rate: 1e-2,
            lr_decay: 1.0,
            seed: 1,
        };
        let samples = torus_samples();
        let trained = train::<B>(&net, &cfg, &samples, &[], &device).unwrap();
        let first = trained.reports[0].val_mse;
        let best = trained.best_report().unwrap().val_mse;
        assert!(best < first, "mse {best} did not improve on {first}");
    }

    #[test]
    fn classifier_cnn_and_transformer_train() {
        let device = Default::default();
        let samples = torus_samples();
        let cfg = TrainConfig {
            epochs: 2,
            batch_size: 4,
            ..TrainConfig::default()
        };
        for net in [
            SignatureNetConfig::new().with_hidden(8).with_classify(true),
            SignatureNetConfig::new().with_kind(ModelKind::Cnn).with_lk_size(4),
            SignatureNetConfig::new()
                .with_kind(ModelKind::Transformer)
                .with_d_model(16)
                .with_d_ff(32)
                .with_n_layers(1)
                .with_max_len(8)
                .with_classify(true),
        ] {
            let trained = train::<B>(&net, &cfg, &samples, &samples[..2], &device).unwrap();
            assert_eq!(trained.reports.len(), 2);
        }
    }

    #[test]
    fn empty_training_set_is_an_error() {
        let device = Default::default();
        let r = train::<B>(&SignatureNetConfig::new(), &TrainConfig::default(), &[], &[], &device);
        assert!(matches!(r, Err(Error::Dataset(_))));
    }
}
