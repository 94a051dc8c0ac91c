//! Seifert matrix of a braid closure, signature, and genus bound.
//!
//! Seifert's algorithm on a closed braid gives one disk per strand and one
//! half-twisted band per crossing. Homology generators are loops through
//! two consecutive bands of the same column. Between loops:
//!
//! - a loop with itself: −1 if both bands are positive, +1 if both are
//!   negative, 0 otherwise
//! - consecutive loops sharing a band b: V(first, second) = 1 if b is
//!   positive, V(second, first) = −1 if b is negative
//! - loops on columns c and c+1 whose band intervals interleave: V(lower,
//!   upper) = +1 when the lower loop starts first, −1 when the upper does

use serde::{Deserialize, Serialize};

use crate::braid::Braid;
use crate::error::{Error, Result};
use crate::poly::matrix::PolyMatrix;
use crate::poly::LaurentPoly;

/// A loop through bands `start` and `end` (word positions) of one column.
#[derive(Clone, Copy, Debug)]
struct BandLoop {
    column: usize,
    start: usize,
    end: usize,
    start_sign: i32,
    end_sign: i32,
}

/// Integer Seifert matrix V, with V(a, b) = lk(a, b⁺).
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SeifertMatrix {
    size: usize,
    entries: Vec<i64>,
}

impl SeifertMatrix {
    pub fn from_braid(braid: &Braid) -> Self {
        let loops = band_loops(braid);
        let size = loops.len();
        let mut entries = vec![0i64; size * size];
        for (x, a) in loops.iter().enumerate() {
            for (y, b) in loops.iter().enumerate() {
                entries[x * size + y] = linking_entry(a, b, x == y);
            }
        }
        Self { size, entries }
    }

    pub fn size(&self) -> usize {
        self.size
    }

    pub fn get(&self, i: usize, j: usize) -> i64 {
        self.entries[i * self.size + j]
    }

    /// V + Vᵀ
    pub fn symmetrized(&self) -> Vec<Vec<i128>> {
        (0..self.size)
            .map(|i| {
                (0..self.size)
                    .map(|j| (self.get(i, j) + self.get(j, i)) as i128)
                    .collect()
            })
            .collect()
    }

    /// Signature of V + Vᵀ.
    pub fn signature(&self) -> Result<i32> {
        symmetric_signature(self.symmetrized()).ok_or(Error::Arithmetic("signature"))
    }

    /// det(V − tVᵀ). For a connected surface this is the Alexander
    /// polynomial up to units.
    pub fn alexander_determinant(&self) -> Option<LaurentPoly> {
        let mut m = PolyMatrix::zeros(self.size);
        for i in 0..self.size {
            for j in 0..self.size {
                let entry = LaurentPoly::from_coeffs(
                    0,
                    vec![self.get(i, j) as i128, -(self.get(j, i) as i128)],
                );
                m.set(i, j, entry);
            }
        }
        m.determinant()
    }
}

fn band_loops(braid: &Braid) -> Vec<BandLoop> {
    let columns = braid.strands().saturating_sub(1);
    let mut bands: Vec<Vec<(usize, i32)>> = vec![Vec::new(); columns];
    for (pos, g) in braid.word().iter().enumerate() {
        bands[g.column()].push((pos, g.sign()));
    }
    let mut loops = Vec::new();
    for (column, col) in bands.iter().enumerate() {
        for pair in col.windows(2) {
            loops.push(BandLoop {
                column,
                start: pair[0].0,
                end: pair[1].0,
                start_sign: pair[0].1,
                end_sign: pair[1].1,
            });
        }
    }
    loops
}

fn linking_entry(x: &BandLoop, y: &BandLoop, same: bool) -> i64 {
    if same {
        return -((x.start_sign + x.end_sign) / 2) as i64;
    }
    if x.column == y.column {
        if x.end == y.start {
            return if x.end_sign > 0 { 1 } else { 0 };
        }
        if x.start == y.end {
            return if x.start_sign < 0 { -1 } else { 0 };
        }
        return 0;
    }
    if y.column == x.column + 1 {
        if x.start < y.start && y.start < x.end && x.end < y.end {
            return 1;
        }
        if y.start < x.start && x.start < y.end && y.end < x.end {
            return -1;
        }
    }
    0
}

/// Signature of a symmetric integer matrix by congruence elimination.
///
/// Each step either pivots on a non-zero diagonal entry a (recording its
/// sign and replacing the rest by |a| times the Schur complement), or, when
/// the diagonal vanishes, adds a row/column pair with a non-zero
/// off-diagonal entry to create one. Rows are divided by their common gcd
/// to keep entries small.
pub fn symmetric_signature(mut m: Vec<Vec<i128>>) -> Option<i32> {
    let mut signature = 0;
    loop {
        let n = m.len();
        if n == 0 {
            break;
        }
        if let Some(k) = (0..n).find(|&i| m[i][i] != 0) {
            let a = m[k][k];
            let s = a.signum();
            signature += s as i32;
            let keep: Vec<usize> = (0..n).filter(|&i| i != k).collect();
            let mut next = keep
                .iter()
                .map(|&i| {
                    keep.iter()
                        .map(|&j| {
                            let scaled = a.checked_mul(m[i][j])?;
                            let cross = m[i][k].checked_mul(m[k][j])?;
                            scaled.checked_sub(cross)?.checked_mul(s)
                        })
                        .collect::<Option<Vec<i128>>>()
                })
                .collect::<Option<Vec<_>>>()?;
            let g = next
                .iter()
                .flatten()
                .try_fold(0i128, |acc, &v| Some(gcd(acc, v.checked_abs()?)))?;
            if g > 1 {
                for row in next.iter_mut() {
                    for v in row.iter_mut() {
                        *v /= g;
                    }
                }
            }
            m = next;
            continue;
        }
        let Some((i, j)) = (0..n)
            .flat_map(|i| (0..n).map(move |j| (i, j)))
            .find(|&(i, j)| m[i][j] != 0)
        else {
            break;
        };
        // row_i += row_j, then col_i += col_j: m[i][i] becomes 2·m[i][j]
        for c in 0..n {
            m[i][c] = m[i][c].checked_add(m[j][c])?;
        }
        for r in 0..n {
            m[r][i] = m[r][i].checked_add(m[r][j])?;
        }
    }
    Some(signature)
}

fn gcd(a: i128, b: i128) -> i128 {
    if b == 0 {
        a
    } else {
        gcd(b, a % b)
    }
}

/// Genus of the braid's Seifert surface, an upper bound on the Seifert
/// genus. `None` when the surface is disconnected.
pub fn genus_bound(braid: &Braid) -> Option<u32> {
    let braid = braid.free_reduce();
    if braid.is_split_candidate() {
        return None;
    }
    let n = braid.strands() as i64;
    let c = braid.crossings() as i64;
    let mu = braid.component_count() as i64;
    // χ = n − c and χ = 2 − 2g − μ
    let twice = 2 - (n - c) - mu;
    Some((twice.max(0) / 2) as u32)
}
