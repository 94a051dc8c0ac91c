//! Input encoding and label mapping for the signature predictors.
//!
//! The dense and convolutional nets read the padded linking matrix. The
//! transformer reads the braid word as tokens: `0` pads, `1` starts every
//! sequence, σᵢ is `2i` and σᵢ⁻¹ is `2i + 1`.

use burn::prelude::*;

use super::dataset::Sample;
use super::model::{ModelKind, SignatureNetConfig};
use crate::braid::Braid;
use crate::error::Result;
use crate::invariant::LinkingMatrix;

/// Default number of signature classes: signatures −20..=20.
pub const NUM_CLASSES: usize = 41;

pub const PAD: i64 = 0;
pub const START: i64 = 1;

/// One batch of network input.
#[derive(Clone, Debug)]
pub enum Features<B: Backend> {
    /// `[batch, lk²]` flattened linking matrices.
    Linking(Tensor<B, 2>),
    /// `[batch, max_len + 1]` generator tokens.
    Tokens(Tensor<B, 2, Int>),
}

impl<B: Backend> Features<B> {
    pub fn batch_size(&self) -> usize {
        match self {
            Features::Linking(x) => x.dims()[0],
            Features::Tokens(t) => t.dims()[0],
        }
    }
}

/// Token vocabulary for braids on up to `max_strands` strands.
pub fn vocab_size(max_strands: usize) -> usize {
    2 * max_strands.max(2)
}

/// Start token, one token per generator, then padding up to `max_len + 1`.
/// Longer words are cut; generators above `max_strands` share the top token.
pub fn tokens(braid: &Braid, max_strands: usize, max_len: usize) -> Vec<i64> {
    let top = max_strands.max(2) - 1;
    let mut out = Vec::with_capacity(max_len + 1);
    out.push(START);
    for g in braid.word().iter().take(max_len) {
        let i = g.index().min(top) as i64;
        out.push(if g.is_positive() { 2 * i } else { 2 * i + 1 });
    }
    out.resize(max_len + 1, PAD);
    out
}

/// Encode braids (and their linking matrices) for the network `net`.
pub fn encode_batch<B: Backend>(
    net: &SignatureNetConfig,
    items: &[(&Braid, &LinkingMatrix)],
    device: &B::Device,
) -> Features<B> {
    match net.kind {
        ModelKind::Transformer => {
            let width = net.max_len + 1;
            let mut data = Vec::with_capacity(items.len() * width);
            for (braid, _) in items {
                data.extend(tokens(braid, net.max_strands, net.max_len));
            }
            Features::Tokens(Tensor::from_data(
                TensorData::new(data, [items.len(), width]),
                device,
            ))
        }
        ModelKind::Mlp | ModelKind::Cnn => {
            let matrices: Vec<&LinkingMatrix> = items.iter().map(|(_, m)| *m).collect();
            Features::Linking(batch(&matrices, net.lk_size, device))
        }
    }
}

/// Encode labelled samples; fails only on a sample whose word does not parse.
pub fn encode_samples<B: Backend>(
    net: &SignatureNetConfig,
    samples: &[&Sample],
    device: &B::Device,
) -> Result<Features<B>> {
    let braids = samples
        .iter()
        .map(|s| s.braid())
        .collect::<Result<Vec<Braid>>>()?;
    let matrices: Vec<LinkingMatrix> = samples.iter().map(|s| s.linking_matrix()).collect();
    let items: Vec<(&Braid, &LinkingMatrix)> = braids.iter().zip(&matrices).collect();
    Ok(encode_batch(net, &items, device))
}

/// Linking matrix cropped or zero-padded to `size × size`, flattened.
pub fn encode(linking: &LinkingMatrix, size: usize) -> Vec<f32> {
    linking.padded(size)
}

/// Stack encoded matrices into a `[batch, size²]` tensor.
pub fn batch<B: Backend>(
    matrices: &[&LinkingMatrix],
    size: usize,
    device: &B::Device,
) -> Tensor<B, 2> {
    let mut data = Vec::with_capacity(matrices.len() * size * size);
    for m in matrices {
        data.extend(encode(m, size));
    }
    Tensor::from_data(TensorData::new(data, [matrices.len(), size * size]), device)
}

/// Class of a signature. Classes `0..=half` are the signatures `0..=half`,
/// classes above `half` are the negative signatures `-1, -2, ...`; values
/// outside the range are clamped to the last class on their side.
pub fn signature_to_class(signature: i32, num_classes: usize) -> usize {
    let half = num_classes.saturating_sub(1) / 2;
    let magnitude = (signature.unsigned_abs() as usize).min(half);
    if signature >= 0 {
        magnitude
    } else {
        half + magnitude
    }
}

pub fn class_to_signature(class: usize, num_classes: usize) -> i32 {
    let half = num_classes.saturating_sub(1) / 2;
    if class <= half {
        class as i32
    } else {
        -((class - half) as i32)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use burn::backend::NdArray;

    #[test]
    fn class_mapping() {
        assert_eq!(signature_to_class(0, NUM_CLASSES), 0);
        assert_eq!(signature_to_class(7, NUM_CLASSES), 7);
        assert_eq!(signature_to_class(-1, NUM_CLASSES), 21);
        assert_eq!(signature_to_class(-20, NUM_CLASSES), 40);
        assert_eq!(signature_to_class(-35, NUM_CLASSES), 40);
        assert_eq!(signature_to_class(99, NUM_CLASSES), 20);
        for s in -20..=20 {
            assert_eq!(class_to_signature(signature_to_class(s, NUM_CLASSES), NUM_CLASSES), s);
        }
    }

    #[test]
    fn batch_shape() {
        let hopf = LinkingMatrix::from_rows(&[vec![0, -1], vec![-1, 0]]);
        let unknot = LinkingMatrix::from_rows(&[vec![2]]);
        let t = batch::<NdArray>(&[&hopf, &unknot], 3, &Default::default());
        assert_eq!(t.dims(), [2, 9]);
        let v = t.into_data().to_vec::<f32>().unwrap();
        assert_eq!(&v[..4], &[0.0, -1.0, 0.0, -1.0]);
        assert_eq!(v[9], 2.0);
    }

    #[test]
    fn generator_tokens() {
        let b = Braid::from_signed(4, &[1, -2, 3]).unwrap();
        assert_eq!(tokens(&b, 4, 5), vec![START, 2, 5, 6, PAD, PAD]);
        // cut to max_len, σ₃ folded onto the top generator of 3 strands
        assert_eq!(tokens(&b, 3, 2), vec![START, 2, 5]);
        assert_eq!(tokens(&Braid::identity(2), 4, 1), vec![START, PAD]);
        assert!(tokens(&b, 4, 5).iter().all(|&t| (t as usize) < vocab_size(4)));
    }

    #[test]
    fn batches_follow_the_model_kind() {
        let device = Default::default();
        let trefoil = Sample::from_braid(&Braid::from_signed(2, &[1, 1, 1]).unwrap()).unwrap();
        let hopf = Sample::from_braid(&Braid::from_signed(2, &[1, 1]).unwrap()).unwrap();
        let samples = [&trefoil, &hopf];

        let mlp = SignatureNetConfig::new().with_lk_size(3);
        match encode_samples::<NdArray>(&mlp, &samples, &device).unwrap() {
            Features::Linking(x) => assert_eq!(x.dims(), [2, 9]),
            Features::Tokens(_) => panic!("mlp reads linking matrices"),
        }

        let transformer = SignatureNetConfig::new()
            .with_kind(ModelKind::Transformer)
            .with_max_len(4);
        let f = encode_samples::<NdArray>(&transformer, &samples, &device).unwrap();
        assert_eq!(f.batch_size(), 2);
        match f {
            Features::Tokens(t) => {
                assert_eq!(t.dims(), [2, 5]);
                let v = t.into_data().convert::<i64>().to_vec::<i64>().unwrap();
                assert_eq!(v, vec![START, 2, 2, 2, PAD, START, 2, 2, PAD, PAD]);
            }
            Features::Linking(_) => panic!("transformer reads tokens"),
        }
    }
}
