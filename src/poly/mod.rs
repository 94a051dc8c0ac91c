//! Laurent polynomials with integer coefficients.
//!
//! Coefficients are `i128`: Burau matrix products and Bareiss intermediates
//! outgrow `i64` on long words. Arithmetic is checked throughout and
//! returns `None` once a coefficient leaves `i128`.

pub mod matrix;

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::diagnostic::Diagnostic;
use crate::span::Span;

/// Σ cₖ tᵏ for k in `low..low + coeffs.len()`. Never has zero coefficients
/// at either end; the zero polynomial has no coefficients.
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct LaurentPoly {
    low: i32,
    coeffs: Vec<i128>,
}

impl LaurentPoly {
    pub fn zero() -> Self {
        Self::default()
    }

    pub fn one() -> Self {
        Self::constant(1)
    }

    pub fn constant(c: i128) -> Self {
        Self::monomial(c, 0)
    }

    /// c·tᵉ
    pub fn monomial(c: i128, e: i32) -> Self {
        Self::from_coeffs(e, vec![c])
    }

    /// Coefficients of t^low, t^(low+1), ...
    pub fn from_coeffs(low: i32, coeffs: Vec<i128>) -> Self {
        let mut p = Self { low, coeffs };
        p.trim();
        p
    }

    fn trim(&mut self) {
        while self.coeffs.last() == Some(&0) {
            self.coeffs.pop();
        }
        let lead = self.coeffs.iter().take_while(|&&c| c == 0).count();
        if lead > 0 {
            self.coeffs.drain(..lead);
            self.low += lead as i32;
        }
        if self.coeffs.is_empty() {
            self.low = 0;
        }
    }

    pub fn is_zero(&self) -> bool {
        self.coeffs.is_empty()
    }

    /// Lowest exponent with a non-zero coefficient.
    pub fn low_degree(&self) -> Option<i32> {
        (!self.is_zero()).then_some(self.low)
    }

    /// Highest exponent with a non-zero coefficient.
    pub fn high_degree(&self) -> Option<i32> {
        (!self.is_zero()).then(|| self.low + self.coeffs.len() as i32 - 1)
    }

    /// Breadth: highest minus lowest exponent (0 for zero).
    pub fn span(&self) -> u32 {
        self.coeffs.len().saturating_sub(1) as u32
    }

    pub fn coeff(&self, e: i32) -> i128 {
        let k = e - self.low;
        if k < 0 {
            return 0;
        }
        self.coeffs.get(k as usize).copied().unwrap_or(0)
    }

    /// Coefficients from the lowest exponent up.
    pub fn coeffs(&self) -> &[i128] {
        &self.coeffs
    }

    /// Non-zero terms as (exponent, coefficient), ascending.
    pub fn terms(&self) -> impl Iterator<Item = (i32, i128)> + '_ {
        self.coeffs
            .iter()
            .enumerate()
            .filter(|&(_, &c)| c != 0)
            .map(move |(k, &c)| (self.low + k as i32, c))
    }

    /// Multiply by tᵏ.
    pub fn shift(&self, k: i32) -> Self {
        if self.is_zero() {
            return Self::zero();
        }
        Self {
            low: self.low + k,
            coeffs: self.coeffs.clone(),
        }
    }

    pub fn checked_scale(&self, c: i128) -> Option<Self> {
        let coeffs = self
            .coeffs
            .iter()
            .map(|x| x.checked_mul(c))
            .collect::<Option<Vec<_>>>()?;
        Some(Self::from_coeffs(self.low, coeffs))
    }

    pub fn checked_neg(&self) -> Option<Self> {
        self.checked_scale(-1)
    }

    pub fn checked_add(&self, rhs: &LaurentPoly) -> Option<Self> {
        self.zip_with(rhs, i128::checked_add)
    }

    pub fn checked_sub(&self, rhs: &LaurentPoly) -> Option<Self> {
        self.zip_with(rhs, i128::checked_sub)
    }

    /// Combine coefficients exponent by exponent over both supports.
    fn zip_with(&self, rhs: &LaurentPoly, f: fn(i128, i128) -> Option<i128>) -> Option<Self> {
        let low = match (self.low_degree(), rhs.low_degree()) {
            (None, None) => return Some(Self::zero()),
            (Some(a), None) => a,
            (None, Some(b)) => b,
            (Some(a), Some(b)) => a.min(b),
        };
        let high = self
            .high_degree()
            .unwrap_or(low)
            .max(rhs.high_degree().unwrap_or(low));
        let coeffs = (low..=high)
            .map(|e| f(self.coeff(e), rhs.coeff(e)))
            .collect::<Option<Vec<_>>>()?;
        Some(Self::from_coeffs(low, coeffs))
    }

    pub fn checked_mul(&self, rhs: &LaurentPoly) -> Option<Self> {
        if self.is_zero() || rhs.is_zero() {
            return Some(Self::zero());
        }
        let mut coeffs = vec![0i128; self.coeffs.len() + rhs.coeffs.len() - 1];
        for (i, &a) in self.coeffs.iter().enumerate() {
            if a == 0 {
                continue;
            }
            for (j, &b) in rhs.coeffs.iter().enumerate() {
                coeffs[i + j] = coeffs[i + j].checked_add(a.checked_mul(b)?)?;
            }
        }
        Some(Self::from_coeffs(self.low + rhs.low, coeffs))
    }

    /// Exact quotient `self / divisor`, or `None` if the division leaves a
    /// remainder, a non-integer coefficient, or overflows.
    pub fn div_exact(&self, divisor: &LaurentPoly) -> Option<LaurentPoly> {
        if divisor.is_zero() {
            return None;
        }
        if self.is_zero() {
            return Some(Self::zero());
        }
        if self.coeffs.len() < divisor.coeffs.len() {
            return None;
        }
        let d = &divisor.coeffs;
        let lead = *d.last()?;
        let qlen = self.coeffs.len() - d.len() + 1;
        let mut rem = self.coeffs.clone();
        let mut q = vec![0i128; qlen];
        for k in (0..qlen).rev() {
            let top = rem[k + d.len() - 1];
            if top % lead != 0 {
                return None;
            }
            let factor = top / lead;
            q[k] = factor;
            if factor != 0 {
                for (j, &dj) in d.iter().enumerate() {
                    rem[k + j] = rem[k + j].checked_sub(factor.checked_mul(dj)?)?;
                }
            }
        }
        if rem.iter().any(|&r| r != 0) {
            return None;
        }
        Some(Self::from_coeffs(self.low - divisor.low, q))
    }

    /// Value at t = x. Negative exponents only make sense at x = ±1, so
    /// other points return `None` when the polynomial has them.
    pub fn eval(&self, x: i128) -> Option<i128> {
        if self.is_zero() {
            return Some(0);
        }
        if self.low < 0 && x.abs() != 1 {
            return None;
        }
        let mut total: i128 = 0;
        for (e, c) in self.terms() {
            let term = if x.abs() == 1 {
                if x == -1 && e.rem_euclid(2) == 1 {
                    c.checked_neg()?
                } else {
                    c
                }
            } else {
                c.checked_mul(x.checked_pow(e as u32)?)?
            };
            total = total.checked_add(term)?;
        }
        Some(total)
    }

    /// Canonical representative of the class {±tᵏ·p}: lowest exponent 0 and
    /// positive lowest coefficient. `None` if a coefficient is `i128::MIN`
    /// and has to be negated.
    pub fn normalized(&self) -> Option<Self> {
        if self.is_zero() {
            return Some(Self::zero());
        }
        let base = self.shift(-self.low);
        if self.coeffs[0] < 0 {
            base.checked_neg()
        } else {
            Some(base)
        }
    }

    /// Sum of absolute coefficient differences, aligned by exponent.
    pub fn l1_distance(&self, other: &LaurentPoly) -> u128 {
        let (lo, hi) = match (self.low_degree(), other.low_degree()) {
            (None, None) => return 0,
            (Some(a), None) => (a, self.high_degree().unwrap_or(a)),
            (None, Some(b)) => (b, other.high_degree().unwrap_or(b)),
            (Some(a), Some(b)) => (
                a.min(b),
                self.high_degree()
                    .unwrap_or(a)
                    .max(other.high_degree().unwrap_or(b)),
            ),
        };
        (lo..=hi)
            .map(|e| self.coeff(e).abs_diff(other.coeff(e)))
            .fold(0u128, u128::saturating_add)
    }

    /// Render with variable `var`. With `halves` every exponent counts in
    /// steps of one half (used for the Jones polynomial in t^(1/2)).
    pub fn display_with(&self, var: &str, halves: bool) -> String {
        if self.is_zero() {
            return "0".to_string();
        }
        let mut out = String::new();
        for (i, (e, c)) in self.terms().enumerate() {
            let negative = c < 0;
            let mag = c.unsigned_abs();
            if i == 0 {
                if negative {
                    out.push('-');
                }
            } else {
                out.push_str(if negative { " - " } else { " + " });
            }
            let power = format_power(var, e, halves);
            match (mag, power.is_empty()) {
                (m, true) => out.push_str(&m.to_string()),
                (1, false) => out.push_str(&power),
                (m, false) => {
                    out.push_str(&m.to_string());
                    out.push_str(&power);
                }
            }
        }
        out
    }

    /// Parse a comma-separated coefficient list, lowest degree first:
    /// `"1,-3,1"` is 1 - 3t + t². An optional `t^k:` prefix sets the lowest
    /// exponent (`"t^-1: -1,3,-1"`).
    pub fn parse_coeffs(text: &str) -> Result<LaurentPoly, Diagnostic> {
        let (low, body, offset) = match text.split_once(':') {
            Some((head, body)) => {
                let h = head.trim();
                let exp = h
                    .strip_prefix("t^")
                    .or_else(|| h.strip_prefix("q^"))
                    .and_then(|e| e.trim_matches(|c| c == '(' || c == ')').parse::<i32>().ok())
                    .ok_or_else(|| {
                        Diagnostic::error(
                            format!("expected 't^k' before ':', found '{}'", h),
                            Span::new(0, head.len()),
                        )
                    })?;
                (exp, body, head.len() + 1)
            }
            None => (0, text, 0),
        };
        let mut coeffs = Vec::new();
        let mut pos = offset;
        for part in body.split(',') {
            let lead = part.len() - part.trim_start().len();
            let token = part.trim();
            let value: i128 = token.parse().map_err(|_| {
                Diagnostic::error(
                    format!("'{}' is not an integer coefficient", token),
                    Span::new(pos + lead, pos + lead + token.len()),
                )
                .with_help("write coefficients lowest degree first, e.g. 1,-3,1".to_string())
            })?;
            coeffs.push(value);
            pos += part.len() + 1;
        }
        Ok(LaurentPoly::from_coeffs(low, coeffs))
    }
}

fn format_power(var: &str, e: i32, halves: bool) -> String {
    if e == 0 {
        return String::new();
    }
    if halves {
        if e % 2 == 0 {
            return format_power(var, e / 2, false);
        }
        return format!("{}^({}/2)", var, e);
    }
    if e == 1 {
        var.to_string()
    } else {
        format!("{}^{}", var, e)
    }
}

impl fmt::Display for LaurentPoly {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.display_with("t", false))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn p(low: i32, c: &[i128]) -> LaurentPoly {
        LaurentPoly::from_coeffs(low, c.to_vec())
    }

    #[test]
    fn trims_both_ends() {
        let q = p(-2, &[0, 0, 1, 2, 0]);
        assert_eq!(q.low_degree(), Some(0));
        assert_eq!(q.high_degree(), Some(1));
        assert_eq!(q.coeffs(), &[1, 2]);
        assert!(p(3, &[0, 0]).is_zero());
    }

    #[test]
    fn arithmetic() {
        let a = p(0, &[1, 1]); // 1 + t
        let b = p(-1, &[1, -1]); // t^-1 - 1
        assert_eq!(a.checked_mul(&b), Some(p(-1, &[1, 0, -1])));
        assert_eq!(a.checked_add(&b), Some(p(-1, &[1, 0, 1])));
        assert!(a.checked_sub(&a).unwrap().is_zero());
        assert_eq!(a.checked_neg(), Some(p(0, &[-1, -1])));
        assert_eq!(a.shift(2), p(2, &[1, 1]));
        assert_eq!(LaurentPoly::zero().checked_add(&a), Some(a.clone()));
    }

    #[test]
    fn overflow_is_reported_not_wrapped() {
        let big = LaurentPoly::constant(i128::MAX / 2 + 1);
        assert_eq!(big.checked_add(&big), None);
        assert_eq!(big.checked_scale(2), None);
        assert_eq!(big.checked_mul(&p(0, &[1, 2])), None);
        assert_eq!(LaurentPoly::constant(i128::MIN).checked_neg(), None);
        assert_eq!(LaurentPoly::constant(i128::MIN).normalized(), None);
        assert_eq!(p(0, &[i128::MAX, i128::MAX]).div_exact(&p(0, &[-1, 1])), None);
        assert_eq!(
            LaurentPoly::constant(i128::MIN).l1_distance(&LaurentPoly::constant(i128::MAX)),
            u128::MAX
        );
    }

    #[test]
    fn exact_division() {
        let num = p(0, &[1, 0, 0, 1]); // 1 + t^3
        let den = p(0, &[1, 1]); // 1 + t
        assert_eq!(num.div_exact(&den), Some(p(0, &[1, -1, 1])));
        assert_eq!(p(0, &[1, 0, 1]).div_exact(&den), None);
        assert_eq!(p(0, &[2, 2]).div_exact(&p(0, &[2])), Some(p(0, &[1, 1])));
        assert_eq!(LaurentPoly::zero().div_exact(&den), Some(LaurentPoly::zero()));
        assert_eq!(den.div_exact(&LaurentPoly::zero()), None);
    }

    #[test]
    fn evaluation() {
        let fig8 = p(-1, &[-1, 3, -1]);
        assert_eq!(fig8.eval(-1), Some(5));
        assert_eq!(fig8.eval(1), Some(1));
        assert_eq!(fig8.eval(2), None);
        assert_eq!(p(0, &[1, -1, 1]).eval(2), Some(3));
    }

    #[test]
    fn normalization() {
        assert_eq!(p(-1, &[-1, 3, -1]).normalized(), Some(p(0, &[1, -3, 1])));
        assert_eq!(p(4, &[2, -3, 2]).normalized(), Some(p(0, &[2, -3, 2])));
    }

    #[test]
    fn l1_distance() {
        assert_eq!(p(0, &[1, -1, 1]).l1_distance(&p(0, &[1, -3, 1])), 2);
        assert_eq!(p(0, &[1]).l1_distance(&LaurentPoly::zero()), 1);
        assert_eq!(p(0, &[1]).l1_distance(&p(2, &[1])), 2);
    }

    #[test]
    fn display() {
        assert_eq!(p(-1, &[-1, 3, -1]).to_string(), "-t^-1 + 3 - t");
        assert_eq!(p(0, &[1, -1, 1]).to_string(), "1 - t + t^2");
        assert_eq!(p(1, &[-1, 0, 0, 0, -1]).display_with("t", true), "-t^(1/2) - t^(5/2)");
        assert_eq!(p(2, &[1, 0, 0, 0, 1, 0, -1]).display_with("t", true), "t + t^3 - t^4");
        assert_eq!(LaurentPoly::zero().to_string(), "0");
    }

    #[test]
    fn parse_coefficient_lists() {
        assert_eq!(LaurentPoly::parse_coeffs("1,-3,1").unwrap(), p(0, &[1, -3, 1]));
        assert_eq!(
            LaurentPoly::parse_coeffs("t^-1: -1, 3, -1").unwrap(),
            p(-1, &[-1, 3, -1])
        );
        let d = LaurentPoly::parse_coeffs("1,x,1").unwrap_err();
        assert_eq!(d.span, Span::new(2, 3));
    }
}
