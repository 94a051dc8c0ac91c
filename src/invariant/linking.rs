//! Linking numbers between the components of a braid closure.

use serde::{Deserialize, Serialize};

use crate::braid::Braid;

/// Symmetric matrix indexed by component. Off-diagonal entries are linking
/// numbers, diagonal entries are the self-writhe of each component in the
/// braid diagram.
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct LinkingMatrix {
    size: usize,
    entries: Vec<i32>,
}

impl LinkingMatrix {
    pub fn from_rows(rows: &[Vec<i32>]) -> Self {
        let size = rows.len();
        let mut entries = Vec::with_capacity(size * size);
        for row in rows {
            debug_assert_eq!(row.len(), size);
            entries.extend_from_slice(row);
        }
        Self { size, entries }
    }

    /// Walk the word carrying a component label on every position.
    pub fn from_braid(braid: &Braid) -> Self {
        let (labels, count) = braid.components();
        let mut at_pos = labels;
        // crossings counted twice off the diagonal, halved at the end
        let mut twice = vec![0i32; count * count];
        for g in braid.word() {
            let c = g.column();
            let (a, b) = (at_pos[c], at_pos[c + 1]);
            if a == b {
                twice[a * count + a] += 2 * g.sign();
            } else {
                twice[a * count + b] += g.sign();
                twice[b * count + a] += g.sign();
            }
            at_pos.swap(c, c + 1);
        }
        Self {
            size: count,
            entries: twice.into_iter().map(|x| x / 2).collect(),
        }
    }

    /// Number of components.
    pub fn size(&self) -> usize {
        self.size
    }

    pub fn get(&self, i: usize, j: usize) -> i32 {
        self.entries[i * self.size + j]
    }

    pub fn rows(&self) -> Vec<Vec<i32>> {
        self.entries
            .chunks(self.size.max(1))
            .take(self.size)
            .map(|r| r.to_vec())
            .collect()
    }

    /// Sum of linking numbers over unordered pairs of distinct components.
    pub fn total_linking(&self) -> i32 {
        let mut total = 0;
        for i in 0..self.size {
            for j in i + 1..self.size {
                total += self.get(i, j);
            }
        }
        total
    }

    /// Off-diagonal linking numbers sorted, a relabelling-independent
    /// summary of the matrix.
    pub fn pair_profile(&self) -> Vec<i32> {
        let mut pairs = Vec::new();
        for i in 0..self.size {
            for j in i + 1..self.size {
                pairs.push(self.get(i, j));
            }
        }
        pairs.sort_unstable();
        pairs
    }

    /// Entry-wise L1 distance; matrices of different size are compared on
    /// their common block and the rest counts in full.
    pub fn l1_distance(&self, other: &LinkingMatrix) -> u64 {
        let n = self.size.max(other.size);
        let at = |m: &LinkingMatrix, i: usize, j: usize| {
            if i < m.size && j < m.size {
                m.get(i, j)
            } else {
                0
            }
        };
        let mut total = 0u64;
        for i in 0..n {
            for j in 0..n {
                total += at(self, i, j).abs_diff(at(other, i, j)) as u64;
            }
        }
        total
    }

    /// Crop or zero-pad to `size × size`, flattened row-major. This is the
    /// input encoding of the learned predictors.
    pub fn padded(&self, size: usize) -> Vec<f32> {
        let mut out = vec![0.0f32; size * size];
        for i in 0..self.size.min(size) {
            for j in 0..self.size.min(size) {
                out[i * size + j] = self.get(i, j) as f32;
            }
        }
        out
    }
}
