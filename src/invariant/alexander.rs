//! Alexander polynomial from the reduced Burau representation.
//!
//! For β ∈ Bₙ with reduced Burau image ρ(β),
//! det(I − ρ(β)) = (1 + t + … + tⁿ⁻¹)·Δ(t) up to units ±tᵏ.
//! Inverse generators are scaled by t so every matrix stays polynomial;
//! the accumulated power of t is folded into the identity term.

use crate::braid::{Braid, Generator};
use crate::error::{Error, Result};
use crate::poly::matrix::PolyMatrix;
use crate::poly::LaurentPoly;

/// Reduced Burau matrix of σᵢ^{±1}, multiplied by t for inverses.
fn burau_matrix(dim: usize, g: Generator) -> PolyMatrix {
    let i = g.column();
    let t = LaurentPoly::monomial(1, 1);
    let mut m = if g.is_positive() {
        PolyMatrix::identity(dim)
    } else {
        PolyMatrix::scalar(dim, t.clone())
    };
    if g.is_positive() {
        m.set(i, i, LaurentPoly::monomial(-1, 1));
    } else {
        m.set(i, i, LaurentPoly::constant(-1));
    }
    if i >= 1 {
        m.set(i - 1, i, t);
    }
    if i + 1 < dim {
        m.set(i + 1, i, LaurentPoly::one());
    }
    m
}

/// Product of the (scaled) reduced Burau matrices of the word, and the
/// number of inverse generators whose t-scaling it carries.
pub fn burau_product(braid: &Braid) -> Result<(PolyMatrix, i32)> {
    let dim = braid.strands().saturating_sub(1);
    let mut product = PolyMatrix::identity(dim);
    let mut scaled = 0;
    for &g in braid.word() {
        product = product
            .checked_mul(&burau_matrix(dim, g))
            .ok_or(Error::Arithmetic("Burau product"))?;
        if !g.is_positive() {
            scaled += 1;
        }
    }
    Ok((product, scaled))
}

/// Alexander polynomial in normal form (lowest exponent 0, positive lowest
/// coefficient). Zero for split closures.
pub fn alexander(braid: &Braid) -> Result<LaurentPoly> {
    let braid = braid.free_reduce();
    let n = braid.strands();
    if n <= 1 {
        return Ok(LaurentPoly::one());
    }
    if braid.is_split_candidate() {
        return Ok(LaurentPoly::zero());
    }

    let (product, scaled) = burau_product(&braid)?;
    let lhs = PolyMatrix::scalar(n - 1, LaurentPoly::monomial(1, scaled));
    let det = lhs
        .checked_sub(&product)
        .and_then(|m| m.determinant())
        .ok_or(Error::Arithmetic("Burau determinant"))?;

    let cyclotomic = LaurentPoly::from_coeffs(0, vec![1; n]);
    let delta = det
        .div_exact(&cyclotomic)
        .ok_or(Error::Arithmetic("Alexander polynomial"))?;
    delta
        .normalized()
        .ok_or(Error::Arithmetic("Alexander polynomial"))
}

/// Symmetric representative Δ(t) = Δ(t⁻¹) for knots; for links the span is
/// odd and the lower half-step is taken.
pub fn symmetrized(delta: &LaurentPoly) -> LaurentPoly {
    match delta.low_degree() {
        None => LaurentPoly::zero(),
        Some(low) => delta.shift(-low - (delta.span() as i32) / 2),
    }
}

/// Knot determinant |Δ(−1)|.
pub fn determinant(delta: &LaurentPoly) -> u128 {
    delta.eval(-1).map(|v| v.unsigned_abs()).unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn delta(n: usize, w: &[i32]) -> Vec<i128> {
        alexander(&Braid::from_signed(n, w).unwrap())
            .unwrap()
            .coeffs()
            .to_vec()
    }

    #[test]
    fn unknot_and_unlink() {
        assert_eq!(delta(1, &[]), vec![1]);
        assert_eq!(delta(3, &[1, 2]), vec![1]);
        assert_eq!(delta(2, &[]), Vec::<i128>::new());
        assert_eq!(delta(4, &[1, 3]), Vec::<i128>::new());
    }

    #[test]
    fn small_knots() {
        assert_eq!(delta(2, &[1, 1, 1]), vec![1, -1, 1]);
        assert_eq!(delta(2, &[-1, -1, -1]), vec![1, -1, 1]);
        assert_eq!(delta(3, &[1, -2, 1, -2]), vec![1, -3, 1]);
        assert_eq!(delta(2, &[1, 1, 1, 1, 1]), vec![1, -1, 1, -1, 1]);
        assert_eq!(delta(3, &[1, 1, 1, 2, -1, 2]), vec![2, -3, 2]);
        assert_eq!(delta(4, &[1, 1, 2, -1, -3, 2, -3]), vec![2, -5, 2]);
        assert_eq!(delta(3, &[1, 1, 1, -2, 1, -2]), vec![1, -3, 3, -3, 1]);
        assert_eq!(delta(3, &[1, 1, -2, 1, -2, -2]), vec![1, -3, 5, -3, 1]);
    }

    #[test]
    fn links() {
        assert_eq!(delta(2, &[1, 1]), vec![1, -1]);
        assert_eq!(delta(3, &[1, -2, 1, -2, 1, -2]), vec![1, -4, 6, -4, 1]);
    }

    #[test]
    fn determinants() {
        let d = |n, w: &[i32]| determinant(&alexander(&Braid::from_signed(n, w).unwrap()).unwrap());
        assert_eq!(d(2, &[1, 1, 1]), 3);
        assert_eq!(d(3, &[1, -2, 1, -2]), 5);
        assert_eq!(d(4, &[1, 1, 2, -1, -3, 2, -3]), 9);
        assert_eq!(d(3, &[1, -2, 1, -2, 1, -2]), 16);
        assert_eq!(d(2, &[1, 1]), 2);
    }

    #[test]
    fn symmetric_form() {
        let fig8 = LaurentPoly::from_coeffs(0, vec![1, -3, 1]);
        assert_eq!(symmetrized(&fig8), LaurentPoly::from_coeffs(-1, vec![1, -3, 1]));
        let hopf = LaurentPoly::from_coeffs(0, vec![1, -1]);
        assert_eq!(symmetrized(&hopf).low_degree(), Some(0));
    }

    #[test]
    fn long_words_overflow_into_an_error() {
        let word: Vec<i32> = [1, -2].repeat(100);
        let r = alexander(&Braid::from_signed(3, &word).unwrap());
        assert!(matches!(r, Err(Error::Arithmetic(_))));
    }

    #[test]
    fn conjugation_and_stabilization_invariance() {
        let a = delta(3, &[1, 1, 1, 2, -1, 2]);
        assert_eq!(delta(3, &[2, 1, 1, 1, 2, -1]), a);
        assert_eq!(delta(4, &[1, 1, 1, 2, -1, 2, 3]), a);
        assert_eq!(delta(4, &[1, 1, 1, 2, -1, 2, -3]), a);
    }
}
