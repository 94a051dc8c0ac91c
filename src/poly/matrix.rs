//! Square matrices over Laurent polynomials.

use super::LaurentPoly;

/// Dense square matrix of Laurent polynomials, row-major.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PolyMatrix {
    n: usize,
    entries: Vec<LaurentPoly>,
}

impl PolyMatrix {
    pub fn zeros(n: usize) -> Self {
        Self {
            n,
            entries: vec![LaurentPoly::zero(); n * n],
        }
    }

    pub fn identity(n: usize) -> Self {
        Self::scalar(n, LaurentPoly::one())
    }

    /// `value` on the diagonal.
    pub fn scalar(n: usize, value: LaurentPoly) -> Self {
        let mut m = Self::zeros(n);
        for i in 0..n {
            m.set(i, i, value.clone());
        }
        m
    }

    pub fn size(&self) -> usize {
        self.n
    }

    pub fn get(&self, row: usize, col: usize) -> &LaurentPoly {
        &self.entries[row * self.n + col]
    }

    pub fn set(&mut self, row: usize, col: usize, value: LaurentPoly) {
        self.entries[row * self.n + col] = value;
    }

    /// Matrix product; `None` on coefficient overflow.
    pub fn checked_mul(&self, rhs: &PolyMatrix) -> Option<PolyMatrix> {
        debug_assert_eq!(self.n, rhs.n);
        let n = self.n;
        let mut out = PolyMatrix::zeros(n);
        for i in 0..n {
            for k in 0..n {
                let a = self.get(i, k);
                if a.is_zero() {
                    continue;
                }
                for j in 0..n {
                    let b = rhs.get(k, j);
                    if b.is_zero() {
                        continue;
                    }
                    let acc = out.get(i, j).checked_add(&a.checked_mul(b)?)?;
                    out.set(i, j, acc);
                }
            }
        }
        Some(out)
    }

    pub fn checked_sub(&self, rhs: &PolyMatrix) -> Option<PolyMatrix> {
        debug_assert_eq!(self.n, rhs.n);
        let entries = self
            .entries
            .iter()
            .zip(&rhs.entries)
            .map(|(a, b)| a.checked_sub(b))
            .collect::<Option<Vec<_>>>()?;
        Some(PolyMatrix { n: self.n, entries })
    }

    /// Determinant by fraction-free Bareiss elimination. Every division in
    /// the algorithm is exact; `None` means a coefficient overflowed `i128`.
    pub fn determinant(&self) -> Option<LaurentPoly> {
        let n = self.n;
        if n == 0 {
            return Some(LaurentPoly::one());
        }
        let mut m = self.entries.clone();
        let at = |r: usize, c: usize| r * n + c;
        let mut negate = false;
        let mut prev = LaurentPoly::one();

        for k in 0..n - 1 {
            if m[at(k, k)].is_zero() {
                let Some(swap) = (k + 1..n).find(|&r| !m[at(r, k)].is_zero()) else {
                    return Some(LaurentPoly::zero());
                };
                for c in 0..n {
                    m.swap(at(k, c), at(swap, c));
                }
                negate = !negate;
            }
            for i in k + 1..n {
                for j in k + 1..n {
                    let keep = m[at(i, j)].checked_mul(&m[at(k, k)])?;
                    let cross = m[at(i, k)].checked_mul(&m[at(k, j)])?;
                    m[at(i, j)] = keep.checked_sub(&cross)?.div_exact(&prev)?;
                }
                m[at(i, k)] = LaurentPoly::zero();
            }
            prev = m[at(k, k)].clone();
        }

        let det = m[at(n - 1, n - 1)].clone();
        if negate {
            det.checked_neg()
        } else {
            Some(det)
        }
    }
}
