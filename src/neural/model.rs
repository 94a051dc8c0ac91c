//! Signature predictors.
//!
//! A dense network over the flattened linking matrix, a small
//! convolutional network over it as a one-channel image, and a transformer
//! encoder over the braid word's generator tokens.
//!
//! All three share one module type with optional parts. The CNN is the
//! MLP's dense head with three convolutions in front; the transformer
//! mean-pools its encoder output into a single linear head. A regression
//! net has one output, a classifier has one logit per signature class.

use std::fmt;
use std::str::FromStr;

use burn::config::Config;
use burn::module::Module;
use burn::nn::conv::{Conv2d, Conv2dConfig};
use burn::nn::loss::{CrossEntropyLossConfig, MseLoss, Reduction};
use burn::nn::transformer::{
    TransformerEncoder, TransformerEncoderConfig, TransformerEncoderInput,
};
use burn::nn::{
    Dropout, DropoutConfig, Embedding, EmbeddingConfig, LayerNorm, LayerNormConfig, Linear,
    LinearConfig, PaddingConfig2d, PositionalEncoding, PositionalEncodingConfig,
};
use burn::prelude::*;
use burn::tensor::activation::relu;
use serde::{Deserialize, Serialize};

use super::features::{
    class_to_signature, signature_to_class, vocab_size, Features, NUM_CLASSES, PAD,
};
use crate::error::Error;

/// Channels of the three convolutions.
const CONV_CHANNELS: [usize; 3] = [16, 32, 64];
/// Width of the CNN's dense layer.
const CNN_DENSE: usize = 1000;
/// Label smoothing of the classification loss.
const LABEL_SMOOTHING: f32 = 0.1;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ModelKind {
    Mlp,
    Cnn,
    Transformer,
}

impl ModelKind {
    /// Whether the network reads generator tokens rather than the linking
    /// matrix.
    pub fn reads_tokens(self) -> bool {
        self == ModelKind::Transformer
    }
}

impl FromStr for ModelKind {
    type Err = Error;

    fn from_str(s: &str) -> crate::error::Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "mlp" => Ok(ModelKind::Mlp),
            "cnn" => Ok(ModelKind::Cnn),
            "transformer" => Ok(ModelKind::Transformer),
            other => Err(Error::Model(format!(
                "unknown model '{other}' (expected mlp, cnn or transformer)"
            ))),
        }
    }
}

impl fmt::Display for ModelKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ModelKind::Mlp => write!(f, "mlp"),
            ModelKind::Cnn => write!(f, "cnn"),
            ModelKind::Transformer => write!(f, "transformer"),
        }
    }
}

#[derive(Config, Debug)]
pub struct SignatureNetConfig {
    #[config(default = "ModelKind::Mlp")]
    pub kind: ModelKind,
    /// Side of the (padded) linking matrix.
    #[config(default = 8)]
    pub lk_size: usize,
    /// Hidden width of the MLP.
    #[config(default = 256)]
    pub hidden: usize,
    /// Predict a class per signature instead of a real value.
    #[config(default = false)]
    pub classify: bool,
    #[config(default = "NUM_CLASSES")]
    pub num_classes: usize,
    /// Convolution kernel, 2 (no padding) or 3 (padding 1).
    #[config(default = 3)]
    pub kernel: usize,
    /// Layer norm over each convolution's full output.
    #[config(default = false)]
    pub layer_norm: bool,
    /// Dropout of the MLP layers and of the transformer encoder.
    #[config(default = 0.1)]
    pub dropout: f64,
    /// Largest strand count with its own generator tokens.
    #[config(default = 8)]
    pub max_strands: usize,
    /// Generators read per word; the sequence adds a start token.
    #[config(default = 32)]
    pub max_len: usize,
    #[config(default = 64)]
    pub d_model: usize,
    #[config(default = 4)]
    pub n_heads: usize,
    #[config(default = 2)]
    pub n_layers: usize,
    #[config(default = 128)]
    pub d_ff: usize,
}

#[derive(Module, Debug)]
pub struct SignatureNet<B: Backend> {
    /// Empty except for the CNN.
    convs: Vec<Conv2d<B>>,
    /// One per convolution when layer norm is on.
    norms: Vec<LayerNorm<B>>,
    /// Absent in the transformer.
    dense: Option<Linear<B>>,
    hidden: Vec<Linear<B>>,
    output: Linear<B>,
    dropout: Dropout,
    embed: Option<Embedding<B>>,
    positions: Option<PositionalEncoding<B>>,
    encoder: Option<TransformerEncoder<B>>,
}

impl SignatureNetConfig {
    pub fn outputs(&self) -> usize {
        if self.classify {
            self.num_classes.max(2)
        } else {
            1
        }
    }

    /// Side of the feature map after the convolutions.
    pub fn conv_side(&self) -> usize {
        let k = self.kernel.clamp(2, 3);
        let pad = usize::from(k == 3);
        let mut side = self.lk_size;
        for _ in CONV_CHANNELS {
            side = (side + 2 * pad + 1).saturating_sub(k);
        }
        side
    }

    /// `d_model` rounded up to a multiple of the head count.
    pub fn transformer_width(&self) -> usize {
        let heads = self.n_heads.max(1);
        self.d_model.max(1).div_ceil(heads) * heads
    }

    pub fn init<B: Backend>(&self, device: &B::Device) -> SignatureNet<B> {
        let dropout = DropoutConfig::new(self.dropout).init();
        let out = self.outputs();
        match self.kind {
            ModelKind::Mlp => SignatureNet {
                convs: Vec::new(),
                norms: Vec::new(),
                dense: Some(
                    LinearConfig::new(self.lk_size * self.lk_size, self.hidden).init(device),
                ),
                hidden: vec![LinearConfig::new(self.hidden, self.hidden).init(device)],
                output: LinearConfig::new(self.hidden, out).init(device),
                dropout,
                embed: None,
                positions: None,
                encoder: None,
            },
            ModelKind::Cnn => {
                let k = self.kernel.clamp(2, 3);
                let pad = usize::from(k == 3);
                let mut convs = Vec::new();
                let mut norms = Vec::new();
                let (mut channels, mut side) = (1, self.lk_size);
                for c in CONV_CHANNELS {
                    let padding = if pad == 1 {
                        PaddingConfig2d::Same
                    } else {
                        PaddingConfig2d::Valid
                    };
                    convs.push(
                        Conv2dConfig::new([channels, c], [k, k])
                            .with_padding(padding)
                            .init(device),
                    );
                    side = (side + 2 * pad + 1).saturating_sub(k);
                    channels = c;
                    if self.layer_norm {
                        norms.push(LayerNormConfig::new(c * side * side).init(device));
                    }
                }
                SignatureNet {
                    convs,
                    norms,
                    dense: Some(LinearConfig::new(channels * side * side, CNN_DENSE).init(device)),
                    hidden: Vec::new(),
                    output: LinearConfig::new(CNN_DENSE, out).init(device),
                    dropout,
                    embed: None,
                    positions: None,
                    encoder: None,
                }
            }
            ModelKind::Transformer => {
                let d_model = self.transformer_width();
                let heads = self.n_heads.max(1);
                SignatureNet {
                    convs: Vec::new(),
                    norms: Vec::new(),
                    dense: None,
                    hidden: Vec::new(),
                    output: LinearConfig::new(d_model, out).init(device),
                    dropout,
                    embed: Some(
                        EmbeddingConfig::new(vocab_size(self.max_strands), d_model).init(device),
                    ),
                    positions: Some(
                        PositionalEncodingConfig::new(d_model)
                            .with_max_sequence_size(self.max_len + 1)
                            .init(device),
                    ),
                    encoder: Some(
                        TransformerEncoderConfig::new(
                            d_model,
                            self.d_ff.max(1),
                            heads,
                            self.n_layers.max(1),
                        )
                        .with_dropout(self.dropout)
                        .init(device),
                    ),
                }
            }
        }
    }
}

impl<B: Backend> SignatureNet<B> {
    /// A batch of features to `[batch, outputs]`. Fails when the features do
    /// not match the network (tokens for an MLP, matrices for a transformer).
    pub fn forward(&self, x: Features<B>) -> crate::error::Result<Tensor<B, 2>> {
        match x {
            Features::Linking(x) => self.forward_linking(x),
            Features::Tokens(t) => self.forward_tokens(t),
        }
    }

    /// `[batch, lk²]` features through the optional convolutions and the
    /// dense layers. Only the MLP uses dropout.
    fn forward_linking(&self, x: Tensor<B, 2>) -> crate::error::Result<Tensor<B, 2>> {
        let Some(dense) = &self.dense else {
            return Err(Error::Model(
                "a transformer reads generator tokens, not linking matrices".to_string(),
            ));
        };
        let [batch, width] = x.dims();
        let mlp = self.convs.is_empty();
        let mut x = x;
        if !mlp {
            let side = (width as f64).sqrt().round() as usize;
            let mut h: Tensor<B, 4> = x.reshape([batch, 1, side, side]);
            for (i, conv) in self.convs.iter().enumerate() {
                h = conv.forward(h);
                if let Some(norm) = self.norms.get(i) {
                    let [b, c, hh, ww] = h.dims();
                    let flat: Tensor<B, 2> = h.reshape([b, c * hh * ww]);
                    h = norm.forward(flat).reshape([b, c, hh, ww]);
                }
                h = relu(h);
            }
            x = h.flatten(1, 3);
        }
        let drop = |t: Tensor<B, 2>| if mlp { self.dropout.forward(t) } else { t };
        let mut x = drop(relu(dense.forward(x)));
        for layer in &self.hidden {
            x = drop(relu(layer.forward(x)));
        }
        Ok(self.output.forward(x))
    }

    /// `[batch, seq]` tokens: scaled embedding plus sinusoidal positions,
    /// the encoder with padding masked, then the mean over real tokens.
    fn forward_tokens(&self, tokens: Tensor<B, 2, Int>) -> crate::error::Result<Tensor<B, 2>> {
        let (Some(embed), Some(positions), Some(encoder)) =
            (&self.embed, &self.positions, &self.encoder)
        else {
            return Err(Error::Model(
                "this network reads linking matrices, not generator tokens".to_string(),
            ));
        };
        let [batch, _] = tokens.dims();
        let d_model = embed.weight.dims()[1];
        let pad = tokens.clone().equal_elem(PAD);
        let x = embed.forward(tokens).mul_scalar((d_model as f64).sqrt());
        let x = positions.forward(x);
        let h = encoder.forward(TransformerEncoderInput::new(x).mask_pad(pad.clone()));

        let keep = pad.bool_not().float().unsqueeze_dim::<3>(2);
        let summed = (h * keep.clone()).sum_dim(1);
        let pooled = (summed / keep.sum_dim(1)).reshape([batch, d_model]);
        Ok(self.output.forward(pooled))
    }

    pub fn is_classifier(&self) -> bool {
        self.output.weight.dims()[1] > 1
    }

    pub fn reads_tokens(&self) -> bool {
        self.encoder.is_some()
    }

    /// MSE against the signature, or label-smoothed cross entropy over the
    /// signature classes.
    pub fn loss(&self, x: Features<B>, signatures: &[i32]) -> crate::error::Result<Tensor<B, 1>> {
        let out = self.forward(x)?;
        let device = out.device();
        let n = signatures.len();
        if self.is_classifier() {
            let classes = out.dims()[1];
            let labels: Vec<i64> = signatures
                .iter()
                .map(|&s| signature_to_class(s, classes) as i64)
                .collect();
            let targets = Tensor::<B, 1, Int>::from_data(TensorData::new(labels, [n]), &device);
            Ok(CrossEntropyLossConfig::new()
                .with_smoothing(Some(LABEL_SMOOTHING))
                .init(&device)
                .forward(out, targets))
        } else {
            let values: Vec<f32> = signatures.iter().map(|&s| s as f32).collect();
            let targets = Tensor::<B, 2>::from_data(TensorData::new(values, [n, 1]), &device);
            Ok(MseLoss::new().forward(out, targets, Reduction::Mean))
        }
    }

    /// Predicted signature per row; classifiers report their argmax class.
    pub fn predict(&self, x: Features<B>) -> crate::error::Result<Vec<f32>> {
        let out = self.forward(x)?;
        let [n, classes] = out.dims();
        if classes > 1 {
            let idx = out
                .argmax(1)
                .reshape([n])
                .into_data()
                .convert::<i64>()
                .to_vec::<i64>()
                .map_err(|e| Error::Model(format!("reading predictions: {e:?}")))?;
            Ok(idx
                .into_iter()
                .map(|c| class_to_signature(c.max(0) as usize, classes) as f32)
                .collect())
        } else {
            out.reshape([n])
                .into_data()
                .convert::<f32>()
                .to_vec::<f32>()
                .map_err(|e| Error::Model(format!("reading predictions: {e:?}")))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::braid::Braid;
    use crate::invariant::LinkingMatrix;
    use crate::neural::features::encode_batch;
    use burn::backend::{Autodiff, NdArray};

    type B = NdArray;

    fn matrix<Bk: Backend>(batch: usize, side: usize) -> Tensor<Bk, 2> {
        let data: Vec<f32> = (0..batch * side * side).map(|i| (i % 5) as f32 - 2.0).collect();
        Tensor::from_data(TensorData::new(data, [batch, side * side]), &Default::default())
    }

    fn input(batch: usize, side: usize) -> Features<B> {
        Features::Linking(matrix(batch, side))
    }

    fn words<Bk: Backend>(net: &SignatureNetConfig) -> Features<Bk> {
        let braids = [
            Braid::from_signed(3, &[1, -2, 1, -2]).unwrap(),
            Braid::from_signed(2, &[1, 1, 1]).unwrap(),
            Braid::identity(2),
        ];
        let lk = LinkingMatrix::from_rows(&[vec![0]]);
        let items: Vec<_> = braids.iter().map(|b| (b, &lk)).collect();
        encode_batch(net, &items, &Default::default())
    }

    fn values<Bk: Backend>(t: Tensor<Bk, 2>) -> Vec<f32> {
        t.into_data().convert::<f32>().to_vec::<f32>().unwrap()
    }

    #[test]
    fn mlp_shapes() {
        let net = SignatureNetConfig::new().with_hidden(16).init::<B>(&Default::default());
        assert_eq!(net.forward(input(3, 8)).unwrap().dims(), [3, 1]);
        assert!(!net.is_classifier());
        assert!(!net.reads_tokens());
    }

    #[test]
    fn cnn_shapes_for_both_kernels() {
        for (kernel, side) in [(3, 8), (2, 5)] {
            let cfg = SignatureNetConfig::new()
                .with_kind(ModelKind::Cnn)
                .with_kernel(kernel)
                .with_layer_norm(true);
            assert_eq!(cfg.conv_side(), side);
            let net = cfg.init::<B>(&Default::default());
            assert_eq!(net.forward(input(2, 8)).unwrap().dims(), [2, 1]);
        }
    }

    #[test]
    fn transformer_reads_words_of_any_length() {
        for classify in [false, true] {
            let cfg = SignatureNetConfig::new()
                .with_kind(ModelKind::Transformer)
                .with_d_model(16)
                .with_d_ff(32)
                .with_n_layers(1)
                .with_max_len(6)
                .with_classify(classify);
            let net = cfg.init::<B>(&Default::default());
            assert!(net.reads_tokens());
            let out = net.forward(words(&cfg)).unwrap();
            assert_eq!(out.dims(), [3, cfg.outputs()]);
            assert!(values(out).iter().all(|v| v.is_finite()));
        }
    }

    #[test]
    fn mismatched_features_are_an_error() {
        let device = Default::default();
        let transformer = SignatureNetConfig::new()
            .with_kind(ModelKind::Transformer)
            .with_d_model(8);
        let mlp = SignatureNetConfig::new().with_hidden(8);
        assert!(transformer.init::<B>(&device).forward(input(1, 8)).is_err());
        assert!(mlp.init::<B>(&device).forward(words(&transformer)).is_err());
    }

    #[test]
    fn width_is_a_multiple_of_the_heads() {
        let cfg = SignatureNetConfig::new().with_d_model(30).with_n_heads(4);
        assert_eq!(cfg.transformer_width(), 32);
        assert_eq!(SignatureNetConfig::new().transformer_width(), 64);
    }

    #[test]
    fn only_the_mlp_drops_units_in_training() {
        type AD = Autodiff<NdArray>;
        let device = Default::default();
        let x = || Features::<AD>::Linking(matrix(2, 4));

        let cnn = SignatureNetConfig::new()
            .with_kind(ModelKind::Cnn)
            .with_lk_size(4)
            .with_dropout(0.5)
            .init::<AD>(&device);
        let a = values(cnn.forward(x()).unwrap());
        let b = values(cnn.forward(x()).unwrap());
        assert_eq!(a, b);

        let mlp = SignatureNetConfig::new()
            .with_lk_size(4)
            .with_hidden(64)
            .with_dropout(0.5)
            .init::<AD>(&device);
        let a = values(mlp.forward(x()).unwrap());
        let b = values(mlp.forward(x()).unwrap());
        assert_ne!(a, b);
    }

    #[test]
    fn classifier_predicts_signatures() {
        let net = SignatureNetConfig::new()
            .with_hidden(8)
            .with_classify(true)
            .init::<B>(&Default::default());
        assert!(net.is_classifier());
        let preds = net.predict(input(4, 8)).unwrap();
        assert_eq!(preds.len(), 4);
        assert!(preds.iter().all(|p| p.fract() == 0.0 && p.abs() <= 20.0));
    }

    #[test]
    fn losses_are_finite() {
        let device = Default::default();
        let transformer = SignatureNetConfig::new()
            .with_kind(ModelKind::Transformer)
            .with_d_model(8)
            .with_n_heads(2)
            .with_max_len(4);
        for classify in [false, true] {
            let mlp = SignatureNetConfig::new().with_hidden(8).with_classify(classify);
            let tf = transformer.clone().with_classify(classify);
            for (cfg, x) in [(&mlp, input(3, 8)), (&tf, words(&tf))] {
                let loss = cfg.init::<B>(&device).loss(x, &[0, -2, 4]).unwrap();
                let v = loss.into_data().to_vec::<f32>().unwrap()[0];
                assert!(v.is_finite() && v >= 0.0);
            }
        }
    }

    #[test]
    fn model_kind_parses() {
        assert_eq!("CNN".parse::<ModelKind>().unwrap(), ModelKind::Cnn);
        assert_eq!(
            "transformer".parse::<ModelKind>().unwrap(),
            ModelKind::Transformer
        );
        assert!("rnn".parse::<ModelKind>().is_err());
        assert_eq!(ModelKind::Mlp.to_string(), "mlp");
        assert!(ModelKind::Transformer.reads_tokens());
    }
}
