//! Labelled braids for predictor training, stored as JSON lines.

use std::fs::File;
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::Path;

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::braid::notation::{format_generators, parse_braid};
use crate::braid::Braid;
use crate::error::{Error, Result};
use crate::invariant::{self, InvariantSet, LinkingMatrix};
use crate::search::replay::ReplayBuffer;
use crate::search::SearchConfig;
use crate::target::{Quantity, Target};

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Sample {
    pub strands: usize,
    pub word: String,
    pub components: usize,
    pub linking: Vec<Vec<i32>>,
    pub signature: i32,
    pub determinant: u64,
}

impl Sample {
    pub fn from_braid(braid: &Braid) -> Result<Self> {
        let inv = invariant::compute(braid, &InvariantSet::default())?;
        Ok(Self {
            strands: braid.strands(),
            word: format_generators(braid),
            components: inv.components,
            linking: inv.linking.rows(),
            signature: inv.signature,
            determinant: inv.determinant,
        })
    }

    /// A sample labelled by a goal the braid is known to meet, such as a
    /// hindsight goal. `None` unless the goal pins the components, the
    /// signature, the determinant and the linking matrix.
    pub fn from_goal(braid: &Braid, goal: &Target) -> Option<Self> {
        Some(Self {
            strands: braid.strands(),
            word: format_generators(braid),
            components: usize::try_from(goal.pinned(Quantity::Components)?).ok()?,
            linking: goal.pinned_linking()?.rows(),
            signature: i32::try_from(goal.pinned(Quantity::Signature)?).ok()?,
            determinant: u64::try_from(goal.pinned(Quantity::Determinant)?).ok()?,
        })
    }

    pub fn linking_matrix(&self) -> LinkingMatrix {
        LinkingMatrix::from_rows(&self.linking)
    }

    pub fn braid(&self) -> Result<Braid> {
        let text = format!("{}: {}", self.strands, self.word);
        Ok(parse_braid(&text)?)
    }
}

/// `count` random braids drawn from the search length range, labelled in
/// parallel.
pub fn generate(count: usize, search: &SearchConfig, seed: u64) -> Vec<Sample> {
    let mut rng = StdRng::seed_from_u64(seed);
    let braids: Vec<Braid> = (0..count).map(|_| search.random_braid(&mut rng)).collect();
    braids
        .par_iter()
        .filter_map(|b| match Sample::from_braid(b) {
            Ok(s) => Some(s),
            Err(e) => {
                tracing::warn!(braid = %b, error = %e, "skipping braid");
                None
            }
        })
        .collect()
}

/// Every braid in a replay buffer, labelled by its hindsight goal.
pub fn from_replay(buffer: &ReplayBuffer) -> Vec<Sample> {
    buffer
        .hindsight()
        .iter()
        .filter_map(|(braid, goal)| Sample::from_goal(braid, goal))
        .collect()
}

pub fn write_jsonl(path: &Path, samples: &[Sample]) -> Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }
    let mut out = BufWriter::new(File::create(path)?);
    for s in samples {
        serde_json::to_writer(&mut out, s)?;
        out.write_all(b"\n")?;
    }
    out.flush()?;
    Ok(())
}

pub fn read_jsonl(path: &Path) -> Result<Vec<Sample>> {
    let file = File::open(path)
        .map_err(|e| Error::Dataset(format!("cannot open {}: {e}", path.display())))?;
    let mut samples = Vec::new();
    for (n, line) in BufReader::new(file).lines().enumerate() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        let sample: Sample = serde_json::from_str(&line)
            .map_err(|e| Error::Dataset(format!("{}:{}: {e}", path.display(), n + 1)))?;
        samples.push(sample);
    }
    Ok(samples)
}

/// Shuffle and split off a validation set of `fraction` of the samples,
/// at least one when there are two or more.
pub fn split(mut samples: Vec<Sample>, fraction: f64, seed: u64) -> (Vec<Sample>, Vec<Sample>) {
    samples.shuffle(&mut StdRng::seed_from_u64(seed));
    let n = samples.len();
    let mut val = (n as f64 * fraction.clamp(0.0, 1.0)).round() as usize;
    if n >= 2 {
        val = val.clamp(1, n - 1);
    } else {
        val = 0;
    }
    let validation = samples.split_off(n - val);
    (samples, validation)
}
