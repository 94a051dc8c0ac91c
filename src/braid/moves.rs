//! Local moves on braid words.
//!
//! Markov moves and braid relations keep the closure's link type; edit
//! moves change it and are what the search strategies explore with.

use rand::Rng;

use super::{random_generator, Braid, Generator};

/// A single rewrite of a braid word.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Move {
    /// Rotate the word left by one (conjugation).
    Conjugate,
    /// Append σₙ^{±1} on a new strand.
    Stabilize { positive: bool },
    /// Remove the only generator on the last column, dropping a strand.
    Destabilize,
    /// Swap two adjacent far-commuting generators.
    Commute { at: usize },
    /// Rewrite σᵢσᵢ₊₁σᵢ as σᵢ₊₁σᵢσᵢ₊₁ (same for inverses).
    Relation { at: usize },
    /// Insert a cancelling pair gg⁻¹.
    InsertPair { at: usize, generator: Generator },
    /// Insert a generator.
    Insert { at: usize, generator: Generator },
    /// Delete a generator.
    Delete { at: usize },
    /// Invert one crossing.
    Flip { at: usize },
    /// Replace a generator by another one.
    Replace { at: usize, generator: Generator },
}

impl Move {
    /// Whether the move leaves the closure's link type unchanged.
    pub fn preserves_link(&self) -> bool {
        matches!(
            self,
            Move::Conjugate
                | Move::Stabilize { .. }
                | Move::Destabilize
                | Move::Commute { .. }
                | Move::Relation { .. }
                | Move::InsertPair { .. }
        )
    }

    /// Apply the move, or `None` when it does not fit the word.
    pub fn apply(&self, braid: &Braid) -> Option<Braid> {
        let n = braid.len();
        let strands = braid.strands();
        let mut out = braid.clone();
        match *self {
            Move::Conjugate => {
                if n < 2 {
                    return None;
                }
                out.word_mut().rotate_left(1);
            }
            Move::Stabilize { positive } => {
                out.set_strands(strands + 1);
                out.word_mut().push(Generator::new(strands, positive));
            }
            Move::Destabilize => {
                if strands < 2 {
                    return None;
                }
                let last_column = strands - 2;
                let hits: Vec<usize> = braid
                    .word()
                    .iter()
                    .enumerate()
                    .filter(|(_, g)| g.column() == last_column)
                    .map(|(i, _)| i)
                    .collect();
                if hits.len() != 1 {
                    return None;
                }
                // rotate the lone generator to the end, then drop it
                out.word_mut().rotate_left(hits[0] + 1);
                out.word_mut().pop();
                out.set_strands(strands - 1);
            }
            Move::Commute { at } => {
                if at + 1 >= n {
                    return None;
                }
                let w = braid.word();
                if !w[at].commutes_with(w[at + 1]) {
                    return None;
                }
                out.word_mut().swap(at, at + 1);
            }
            Move::Relation { at } => {
                if at + 2 >= n {
                    return None;
                }
                let (a, b, c) = (braid.word()[at], braid.word()[at + 1], braid.word()[at + 2]);
                if a != c || a.sign() != b.sign() || a.index().abs_diff(b.index()) != 1 {
                    return None;
                }
                let w = out.word_mut();
                w[at] = b;
                w[at + 1] = a;
                w[at + 2] = b;
            }
            Move::InsertPair { at, generator } => {
                if at > n || generator.index() >= strands {
                    return None;
                }
                let w = out.word_mut();
                w.insert(at, generator.inverse());
                w.insert(at, generator);
            }
            Move::Insert { at, generator } => {
                if at > n || generator.index() >= strands {
                    return None;
                }
                out.word_mut().insert(at, generator);
            }
            Move::Delete { at } => {
                if at >= n {
                    return None;
                }
                out.word_mut().remove(at);
            }
            Move::Flip { at } => {
                if at >= n {
                    return None;
                }
                let w = out.word_mut();
                w[at] = w[at].inverse();
            }
            Move::Replace { at, generator } => {
                if at >= n || generator.index() >= strands || braid.word()[at] == generator {
                    return None;
                }
                out.word_mut()[at] = generator;
            }
        }
        Some(out)
    }
}

/// Relative weights of edit moves when sampling a neighbour.
#[derive(Clone, Copy, Debug)]
pub struct MoveWeights {
    pub insert: f64,
    pub delete: f64,
    pub flip: f64,
    pub replace: f64,
    /// Link-preserving moves, used to escape word-level plateaus.
    pub isotopy: f64,
}

impl Default for MoveWeights {
    fn default() -> Self {
        Self {
            insert: 0.3,
            delete: 0.25,
            flip: 0.2,
            replace: 0.15,
            isotopy: 0.1,
        }
    }
}

/// Draw a random move that applies to `braid` while keeping the word length
/// within `max_len`. Falls back to insertion when nothing else applies.
pub fn random_neighbor<R: Rng + ?Sized>(
    braid: &Braid,
    weights: &MoveWeights,
    max_len: usize,
    rng: &mut R,
) -> (Move, Braid) {
    let strands = braid.strands().max(2);
    for _ in 0..16 {
        let mv = sample_move(braid, weights, strands, rng);
        if let Some(next) = mv.apply(braid) {
            if next.len() <= max_len.max(1) {
                return (mv, next);
            }
        }
    }
    let mv = if braid.len() < max_len.max(1) {
        Move::Insert {
            at: rng.gen_range(0..=braid.len()),
            generator: random_generator(strands, rng),
        }
    } else {
        Move::Flip {
            at: rng.gen_range(0..braid.len().max(1)),
        }
    };
    let next = mv.apply(braid).unwrap_or_else(|| braid.clone());
    (mv, next)
}

fn sample_move<R: Rng + ?Sized>(
    braid: &Braid,
    weights: &MoveWeights,
    strands: usize,
    rng: &mut R,
) -> Move {
    let n = braid.len();
    let total = weights.insert + weights.delete + weights.flip + weights.replace + weights.isotopy;
    let mut roll = rng.gen::<f64>() * total;
    let at = if n == 0 { 0 } else { rng.gen_range(0..n) };

    roll -= weights.insert;
    if roll < 0.0 || n == 0 {
        return Move::Insert {
            at: rng.gen_range(0..=n),
            generator: random_generator(strands, rng),
        };
    }
    roll -= weights.delete;
    if roll < 0.0 {
        return Move::Delete { at };
    }
    roll -= weights.flip;
    if roll < 0.0 {
        return Move::Flip { at };
    }
    roll -= weights.replace;
    if roll < 0.0 {
        return Move::Replace {
            at,
            generator: random_generator(strands, rng),
        };
    }
    random_isotopy(braid, rng)
}

/// A random link-preserving move (may not apply to the word).
pub fn random_isotopy<R: Rng + ?Sized>(braid: &Braid, rng: &mut R) -> Move {
    let at = if braid.is_empty() {
        0
    } else {
        rng.gen_range(0..braid.len())
    };
    match rng.gen_range(0..3) {
        0 => Move::Conjugate,
        1 => Move::Commute { at },
        _ => Move::Relation { at },
    }
}
