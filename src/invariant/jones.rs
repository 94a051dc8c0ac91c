//! Jones polynomial by the Kauffman bracket state sum.
//!
//! The closed braid diagram is cut into levels, one between each pair of
//! consecutive crossings, with level `c` identified with level 0. Every
//! state picks the A- or B-smoothing at each crossing; the loops of the
//! smoothed diagram are counted with a union-find over (level, position)
//! nodes. States are enumerated in parallel and reduced into a histogram
//! keyed by (number of B-smoothings, loops) before any polynomial work.
//!
//! Result exponents are in units of t^(1/2).

use petgraph::unionfind::UnionFind;
use rayon::prelude::*;

use crate::braid::Braid;
use crate::error::{Error, Result};
use crate::poly::LaurentPoly;

/// Default crossing limit; 2^22 states.
pub const DEFAULT_MAX_CROSSINGS: usize = 22;

/// States are enumerated as bits of a `u64`; larger configured limits are
/// clamped to this.
pub const HARD_MAX_CROSSINGS: usize = 63;

/// histogram[b][loops] = number of states with `b` B-smoothings
type Histogram = Vec<Vec<u64>>;

/// Jones polynomial V(t) with exponents counted in halves.
///
/// The word is freely reduced first; more than `max_crossings` remaining
/// crossings is an error rather than an exponential wait.
pub fn jones(braid: &Braid, max_crossings: usize) -> Result<LaurentPoly> {
    let braid = braid.free_reduce();
    let c = braid.crossings();
    let limit = max_crossings.min(HARD_MAX_CROSSINGS);
    if c > limit {
        return Err(Error::TooManyCrossings {
            invariant: "Jones polynomial",
            crossings: c,
            limit,
        });
    }
    let bracket = kauffman_bracket(&braid)?;

    // (−A³)^(−w) ⟨β̂⟩
    let w = braid.writhe();
    let mut normalized = bracket.shift(-3 * w);
    if w % 2 != 0 {
        normalized = normalized.checked_neg().ok_or(ARITHMETIC)?;
    }
    a_to_half_t(&normalized)
}

const ARITHMETIC: Error = Error::Arithmetic("Jones polynomial");

/// ⟨β̂⟩ as a Laurent polynomial in A, normalised so the unknot is 1.
pub fn kauffman_bracket(braid: &Braid) -> Result<LaurentPoly> {
    let n = braid.strands();
    let c = braid.crossings();
    if c == 0 {
        return loop_value(n.max(1)).ok_or(ARITHMETIC);
    }
    let hist = state_histogram(braid);
    let mut bracket = LaurentPoly::zero();
    for (b, row) in hist.iter().enumerate() {
        let a_exp = c as i32 - 2 * b as i32;
        for (loops, &count) in row.iter().enumerate() {
            if count == 0 {
                continue;
            }
            bracket = loop_value(loops)
                .and_then(|v| v.shift(a_exp).checked_scale(count as i128))
                .and_then(|term| bracket.checked_add(&term))
                .ok_or(ARITHMETIC)?;
        }
    }
    Ok(bracket)
}

/// d^(loops − 1) with d = −A² − A⁻².
fn loop_value(loops: usize) -> Option<LaurentPoly> {
    let d = LaurentPoly::from_coeffs(-2, vec![-1, 0, 0, 0, -1]);
    let mut value = LaurentPoly::one();
    for _ in 1..loops {
        value = value.checked_mul(&d)?;
    }
    Some(value)
}

fn state_histogram(braid: &Braid) -> Histogram {
    let n = braid.strands();
    let c = braid.crossings();
    let nodes = c * n;
    let empty = || vec![vec![0u64; nodes + 1]; c + 1];

    (0u64..1u64 << c)
        .into_par_iter()
        .fold(empty, |mut hist, state| {
            let (b, loops) = smooth(braid, state);
            hist[b][loops] += 1;
            hist
        })
        .reduce(empty, |mut acc, part| {
            for (row, other) in acc.iter_mut().zip(part) {
                for (x, y) in row.iter_mut().zip(other) {
                    *x += y;
                }
            }
            acc
        })
}

/// Smooth every crossing as `state` dictates (bit set = B-smoothing) and
/// return (B-smoothings, loops).
fn smooth(braid: &Braid, state: u64) -> (usize, usize) {
    let n = braid.strands();
    let c = braid.crossings();
    let node = |level: usize, pos: usize| (level % c) * n + pos;
    let mut uf = UnionFind::<usize>::new(c * n);
    let mut loops = c * n;
    let mut join = |uf: &mut UnionFind<usize>, a: usize, b: usize| {
        if uf.union(a, b) {
            loops -= 1;
        }
    };

    let mut b_count = 0;
    for (level, g) in braid.word().iter().enumerate() {
        let i = g.column();
        let b_smoothing = state >> level & 1 == 1;
        if b_smoothing {
            b_count += 1;
        }
        for k in (0..n).filter(|&k| k != i && k != i + 1) {
            join(&mut uf, node(level, k), node(level + 1, k));
        }
        // A-smoothing of σᵢ keeps the strands vertical; σᵢ⁻¹ is the reverse
        if b_smoothing != g.is_positive() {
            join(&mut uf, node(level, i), node(level + 1, i));
            join(&mut uf, node(level, i + 1), node(level + 1, i + 1));
        } else {
            join(&mut uf, node(level, i), node(level, i + 1));
            join(&mut uf, node(level + 1, i), node(level + 1, i + 1));
        }
    }
    (b_count, loops)
}

/// Substitute A = t^(−1/4): A^k becomes (t^(1/2))^(−k/2).
fn a_to_half_t(p: &LaurentPoly) -> Result<LaurentPoly> {
    let mut out = LaurentPoly::zero();
    for (k, coeff) in p.terms() {
        if k % 2 != 0 {
            return Err(ARITHMETIC);
        }
        out = out
            .checked_add(&LaurentPoly::monomial(coeff, -k / 2))
            .ok_or(ARITHMETIC)?;
    }
    Ok(out)
}
