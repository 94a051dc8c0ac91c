//! Braid words and their closures.
//!
//! Every knot and link is handled as the closure of a braid. A word is a
//! sequence of signed Artin generators; σᵢ crosses strand i over strand
//! i+1 with a positive crossing, σᵢ⁻¹ with a negative one.

pub mod catalog;
pub mod moves;
pub mod notation;

use std::fmt;

use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// A signed Artin generator σᵢ^{±1}, stored as ±i with i ≥ 1.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "i32", into = "i32")]
pub struct Generator(i16);

impl Generator {
    /// σ_index (positive) or σ_index⁻¹. `index` is 1-based.
    pub fn new(index: usize, positive: bool) -> Self {
        debug_assert!(index >= 1 && index <= i16::MAX as usize);
        let i = index as i16;
        Generator(if positive { i } else { -i })
    }

    /// Build from the signed integer form; zero is not a generator.
    pub fn from_signed(value: i32) -> Option<Self> {
        if value == 0 || value.unsigned_abs() > i16::MAX as u32 {
            return None;
        }
        Some(Generator(value as i16))
    }

    /// 1-based generator index i.
    pub fn index(self) -> usize {
        self.0.unsigned_abs() as usize
    }

    /// 0-based column: the crossing happens between positions `column` and
    /// `column + 1`.
    pub fn column(self) -> usize {
        self.index() - 1
    }

    pub fn is_positive(self) -> bool {
        self.0 > 0
    }

    /// Crossing sign, +1 or -1.
    pub fn sign(self) -> i32 {
        if self.0 > 0 {
            1
        } else {
            -1
        }
    }

    pub fn inverse(self) -> Self {
        Generator(-self.0)
    }

    pub fn signed(self) -> i32 {
        self.0 as i32
    }

    /// Whether the two generators commute by far commutation.
    pub fn commutes_with(self, other: Generator) -> bool {
        self.index().abs_diff(other.index()) >= 2
    }
}

impl TryFrom<i32> for Generator {
    type Error = String;

    fn try_from(value: i32) -> std::result::Result<Self, Self::Error> {
        Generator::from_signed(value).ok_or_else(|| format!("{} is not a braid generator", value))
    }
}

impl From<Generator> for i32 {
    fn from(g: Generator) -> i32 {
        g.signed()
    }
}

impl fmt::Display for Generator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A braid on `strands` strands. Its closure is the knot or link.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Braid {
    strands: usize,
    word: Vec<Generator>,
}

impl Braid {
    /// Build a braid, checking every generator fits the strand count.
    pub fn new(strands: usize, word: Vec<Generator>) -> Result<Self> {
        let strands = strands.max(1);
        if let Some(g) = word.iter().find(|g| g.index() >= strands) {
            return Err(Error::GeneratorOutOfRange {
                generator: g.signed(),
                strands,
            });
        }
        Ok(Self { strands, word })
    }

    /// Build from signed integers, e.g. `[1, -2, 1, -2]`.
    pub fn from_signed(strands: usize, word: &[i32]) -> Result<Self> {
        let mut gens = Vec::with_capacity(word.len());
        for &w in word {
            let g = Generator::from_signed(w).ok_or(Error::GeneratorOutOfRange {
                generator: w,
                strands,
            })?;
            gens.push(g);
        }
        Braid::new(strands, gens)
    }

    /// The trivial braid on `strands` strands (closure: the unlink).
    pub fn identity(strands: usize) -> Self {
        Self {
            strands: strands.max(1),
            word: Vec::new(),
        }
    }

    /// Uniformly random word of the given length.
    pub fn random<R: Rng + ?Sized>(strands: usize, length: usize, rng: &mut R) -> Self {
        let strands = strands.max(2);
        let word = (0..length)
            .map(|_| random_generator(strands, rng))
            .collect();
        Self { strands, word }
    }

    pub fn strands(&self) -> usize {
        self.strands
    }

    pub fn word(&self) -> &[Generator] {
        &self.word
    }

    pub fn len(&self) -> usize {
        self.word.len()
    }

    pub fn is_empty(&self) -> bool {
        self.word.is_empty()
    }

    /// Number of crossings in the closure diagram (word length).
    pub fn crossings(&self) -> usize {
        self.word.len()
    }

    /// Sum of crossing signs.
    pub fn writhe(&self) -> i32 {
        self.word.iter().map(|g| g.sign()).sum()
    }

    pub fn is_positive(&self) -> bool {
        self.word.iter().all(|g| g.is_positive())
    }

    /// Signed integer form of the word.
    pub fn signed_word(&self) -> Vec<i32> {
        self.word.iter().map(|g| g.signed()).collect()
    }

    /// Columns (0-based) that carry no crossing. If any column between two
    /// strands is empty the closure splits there.
    pub fn unused_columns(&self) -> Vec<usize> {
        let mut used = vec![false; self.strands.saturating_sub(1)];
        for g in &self.word {
            used[g.column()] = true;
        }
        used.iter()
            .enumerate()
            .filter(|&(_, &u)| !u)
            .map(|(c, _)| c)
            .collect()
    }

    /// Whether the closure is visibly split (an empty column).
    pub fn is_split_candidate(&self) -> bool {
        !self.unused_columns().is_empty()
    }

    /// Permutation induced on strand positions: `perm[start] = end`.
    pub fn permutation(&self) -> Vec<usize> {
        // at_pos[p] = strand currently at position p
        let mut at_pos: Vec<usize> = (0..self.strands).collect();
        for g in &self.word {
            at_pos.swap(g.column(), g.column() + 1);
        }
        let mut perm = vec![0; self.strands];
        for (pos, &strand) in at_pos.iter().enumerate() {
            perm[strand] = pos;
        }
        perm
    }

    /// Component labels per starting position and the component count of the
    /// closure. Labels are assigned in order of the smallest position.
    pub fn components(&self) -> (Vec<usize>, usize) {
        let perm = self.permutation();
        let mut label = vec![usize::MAX; self.strands];
        let mut count = 0;
        for start in 0..self.strands {
            if label[start] != usize::MAX {
                continue;
            }
            let mut p = start;
            while label[p] == usize::MAX {
                label[p] = count;
                p = perm[p];
            }
            count += 1;
        }
        (label, count)
    }

    pub fn component_count(&self) -> usize {
        self.components().1
    }

    /// β⁻¹: reversed word with every generator inverted.
    pub fn inverse(&self) -> Braid {
        Braid {
            strands: self.strands,
            word: self.word.iter().rev().map(|g| g.inverse()).collect(),
        }
    }

    /// Mirror image: every crossing flipped.
    pub fn mirror(&self) -> Braid {
        Braid {
            strands: self.strands,
            word: self.word.iter().map(|g| g.inverse()).collect(),
        }
    }

    /// Product β·γ on the larger strand count.
    pub fn concat(&self, other: &Braid) -> Braid {
        let mut word = self.word.clone();
        word.extend_from_slice(&other.word);
        Braid {
            strands: self.strands.max(other.strands),
            word,
        }
    }

    /// Cancel adjacent σᵢσᵢ⁻¹ pairs, including across the wrap-around,
    /// since the closure only sees the conjugacy class.
    pub fn free_reduce(&self) -> Braid {
        let mut stack: Vec<Generator> = Vec::with_capacity(self.word.len());
        for &g in &self.word {
            if stack.last() == Some(&g.inverse()) {
                stack.pop();
            } else {
                stack.push(g);
            }
        }
        // cyclic cancellation
        let mut lo = 0;
        let mut hi = stack.len();
        while hi - lo >= 2 && stack[lo] == stack[hi - 1].inverse() {
            lo += 1;
            hi -= 1;
        }
        Braid {
            strands: self.strands,
            word: stack[lo..hi].to_vec(),
        }
    }

    /// Lexicographically least cyclic rotation of the word. Two braids with
    /// the same key have the same closure.
    pub fn canonical_key(&self) -> Vec<i32> {
        let signed = self.signed_word();
        let n = signed.len();
        let mut best = 0;
        for start in 1..n {
            let better = (0..n)
                .map(|k| (signed[(start + k) % n], signed[(best + k) % n]))
                .find(|(a, b)| a != b)
                .is_some_and(|(a, b)| a < b);
            if better {
                best = start;
            }
        }
        let mut key = Vec::with_capacity(n + 1);
        key.push(self.strands as i32);
        key.extend((0..n).map(|k| signed[(best + k) % n]));
        key
    }

    /// BLAKE3 hash of the canonical key, hex encoded.
    pub fn id(&self) -> String {
        let mut hasher = blake3::Hasher::new();
        hasher.update(&(self.strands as u32).to_le_bytes());
        for g in self.canonical_key().iter().skip(1) {
            hasher.update(&g.to_le_bytes());
        }
        hasher.finalize().to_hex().to_string()
    }

    /// Mutable access for moves; callers keep generators in range.
    pub(crate) fn word_mut(&mut self) -> &mut Vec<Generator> {
        &mut self.word
    }

    pub(crate) fn set_strands(&mut self, strands: usize) {
        self.strands = strands.max(1);
    }
}

impl fmt::Display for Braid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", notation::format_word(self))
    }
}

/// A uniformly random generator on `strands` strands.
pub fn random_generator<R: Rng + ?Sized>(strands: usize, rng: &mut R) -> Generator {
    let index = rng.gen_range(1..strands.max(2));
    Generator::new(index, rng.gen_bool(0.5))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn braid(n: usize, w: &[i32]) -> Braid {
        Braid::from_signed(n, w).unwrap()
    }

    #[test]
    fn generator_accessors() {
        let g = Generator::new(3, false);
        assert_eq!(g.index(), 3);
        assert_eq!(g.column(), 2);
        assert_eq!(g.sign(), -1);
        assert_eq!(g.inverse(), Generator::new(3, true));
        assert!(Generator::from_signed(0).is_none());
        assert!(g.commutes_with(Generator::new(1, true)));
        assert!(!g.commutes_with(Generator::new(2, true)));
    }

    #[test]
    fn rejects_out_of_range_generator() {
        let err = Braid::from_signed(3, &[1, 3]).unwrap_err();
        assert!(matches!(
            err,
            Error::GeneratorOutOfRange {
                generator: 3,
                strands: 3
            }
        ));
    }

    #[test]
    fn writhe_and_positivity() {
        let trefoil = braid(2, &[1, 1, 1]);
        assert_eq!(trefoil.writhe(), 3);
        assert!(trefoil.is_positive());
        let eight = braid(3, &[1, -2, 1, -2]);
        assert_eq!(eight.writhe(), 0);
        assert!(!eight.is_positive());
    }

    #[test]
    fn components_of_closures() {
        assert_eq!(braid(2, &[1, 1, 1]).component_count(), 1);
        assert_eq!(braid(2, &[1, 1]).component_count(), 2);
        assert_eq!(braid(3, &[1, 2]).component_count(), 1);
        assert_eq!(braid(3, &[1, 1, 2, 2]).component_count(), 3);
        assert_eq!(Braid::identity(4).component_count(), 4);
    }

    #[test]
    fn permutation_follows_strands() {
        // σ1σ2 sends position 0 → 2, 1 → 0, 2 → 1
        assert_eq!(braid(3, &[1, 2]).permutation(), vec![2, 0, 1]);
    }

    #[test]
    fn free_reduce_cancels_linearly_and_cyclically() {
        assert_eq!(braid(3, &[1, 2, -2, 1]).free_reduce().signed_word(), vec![1, 1]);
        assert_eq!(braid(3, &[-1, 2, 2, 1]).free_reduce().signed_word(), vec![2, 2]);
        assert!(braid(2, &[1, -1, 1, -1]).free_reduce().is_empty());
    }

    #[test]
    fn canonical_key_is_rotation_invariant() {
        let a = braid(3, &[1, -2, 1, -2]);
        let b = braid(3, &[-2, 1, -2, 1]);
        assert_eq!(a.canonical_key(), b.canonical_key());
        assert_eq!(a.id(), b.id());
        assert_ne!(a.id(), braid(3, &[1, 2, 1, 2]).id());
    }

    #[test]
    fn inverse_and_mirror() {
        let b = braid(3, &[1, 2, -1]);
        assert_eq!(b.inverse().signed_word(), vec![1, -2, -1]);
        assert_eq!(b.mirror().signed_word(), vec![-1, -2, 1]);
        assert!(b.concat(&b.inverse()).free_reduce().is_empty());
    }

    #[test]
    fn unused_columns_flag_split_closures() {
        assert_eq!(braid(4, &[1, 3]).unused_columns(), vec![1]);
        assert!(braid(4, &[1, 3]).is_split_candidate());
        assert!(!braid(3, &[1, 2]).is_split_candidate());
    }

    #[test]
    fn random_braid_respects_strands() {
        let mut rng = StdRng::seed_from_u64(7);
        let b = Braid::random(4, 50, &mut rng);
        assert_eq!(b.len(), 50);
        assert!(b.word().iter().all(|g| g.index() < 4));
    }
}
