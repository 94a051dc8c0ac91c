//! Generation targets: conjunctions of constraints on invariants.
//!
//! A target is written as `;`-separated clauses, each `key=value`,
//! `key<=value` or `key>=value`:
//!
//! ```text
//! components=1; signature=-4; crossings<=12; alexander=1,-1,1,-1,1
//! ```
//!
//! Every constraint measures a non-negative distance that is zero exactly
//! when it holds. The energy of a braid is the weighted sum of distances
//! plus a small length penalty.

pub mod evaluator;

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::braid::catalog;
use crate::diagnostic::Diagnostic;
use crate::error::{Error, Result};
use crate::invariant::{self, InvariantSet, Invariants, LinkingMatrix};
use crate::poly::LaurentPoly;
use crate::span::Span;

pub use evaluator::{Evaluation, Evaluator};

/// Integer-valued invariants a constraint can bound.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Quantity {
    Components,
    Writhe,
    Crossings,
    Signature,
    Determinant,
    Genus,
}

impl Quantity {
    fn key(self) -> &'static str {
        match self {
            Quantity::Components => "components",
            Quantity::Writhe => "writhe",
            Quantity::Crossings => "crossings",
            Quantity::Signature => "signature",
            Quantity::Determinant => "determinant",
            Quantity::Genus => "genus",
        }
    }

    /// Value on `inv`; `None` when undefined (genus of a split closure).
    fn read(self, inv: &Invariants) -> Option<i64> {
        match self {
            Quantity::Components => Some(inv.components as i64),
            Quantity::Writhe => Some(inv.writhe as i64),
            Quantity::Crossings => Some(inv.crossings as i64),
            Quantity::Signature => Some(inv.signature as i64),
            Quantity::Determinant => Some(inv.determinant.min(i64::MAX as u64) as i64),
            Quantity::Genus => inv.genus.map(i64::from),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Relation {
    Eq,
    Le,
    Ge,
}

impl Relation {
    fn symbol(self) -> &'static str {
        match self {
            Relation::Eq => "=",
            Relation::Le => "<=",
            Relation::Ge => ">=",
        }
    }

    fn distance(self, actual: i64, wanted: i64) -> u64 {
        match self {
            Relation::Eq => actual.abs_diff(wanted),
            Relation::Le => actual.saturating_sub(wanted).max(0) as u64,
            Relation::Ge => wanted.saturating_sub(actual).max(0) as u64,
        }
    }
}

/// One clause of a target.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Constraint {
    Integer {
        quantity: Quantity,
        relation: Relation,
        value: i64,
    },
    /// Alexander polynomial, compared in canonical form.
    Alexander(LaurentPoly),
    /// Jones polynomial, exponents in halves.
    Jones(LaurentPoly),
    /// Linking numbers between components, compared up to relabelling.
    Linking(LinkingMatrix),
}

impl Constraint {
    pub fn key(&self) -> &'static str {
        match self {
            Constraint::Integer { quantity, .. } => quantity.key(),
            Constraint::Alexander(_) => "alexander",
            Constraint::Jones(_) => "jones",
            Constraint::Linking(_) => "linking",
        }
    }

    pub fn needs_jones(&self) -> bool {
        matches!(self, Constraint::Jones(_))
    }

    /// Distance of `inv` from satisfying the constraint.
    pub fn distance(&self, inv: &Invariants) -> f64 {
        match self {
            Constraint::Integer {
                quantity,
                relation,
                value,
            } => match quantity.read(inv) {
                Some(actual) => relation.distance(actual, *value) as f64,
                None => (value.unsigned_abs() + 1) as f64,
            },
            Constraint::Alexander(want) => inv.alexander.l1_distance(want) as f64,
            Constraint::Jones(want) => match &inv.jones {
                Some(got) => got.l1_distance(want) as f64,
                None => want.coeffs().iter().map(|c| c.unsigned_abs()).sum::<u128>() as f64,
            },
            Constraint::Linking(want) => linking_distance(&inv.linking, want) as f64,
        }
    }
}

/// Component counts must match first; then the sorted pairwise linking
/// numbers are compared entry by entry.
fn linking_distance(got: &LinkingMatrix, want: &LinkingMatrix) -> u64 {
    let a = got.pair_profile();
    let b = want.pair_profile();
    let n = a.len().max(b.len());
    let at = |v: &[i32], i: usize| v.get(i).copied().unwrap_or(0);
    let pairs: u64 = (0..n).map(|i| at(&a, i).abs_diff(at(&b, i)) as u64).sum();
    pairs + got.size().abs_diff(want.size()) as u64
}

impl fmt::Display for Constraint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Constraint::Integer {
                quantity,
                relation,
                value,
            } => write!(f, "{}{}{}", quantity.key(), relation.symbol(), value),
            Constraint::Alexander(p) | Constraint::Jones(p) => {
                write!(f, "{}=", self.key())?;
                if p.low_degree().unwrap_or(0) != 0 {
                    write!(f, "t^{}:", p.low_degree().unwrap_or(0))?;
                }
                let coeffs: Vec<String> = p.coeffs().iter().map(|c| c.to_string()).collect();
                write!(f, "{}", if coeffs.is_empty() { "0".to_string() } else { coeffs.join(",") })
            }
            Constraint::Linking(m) => {
                let rows: Vec<String> = m
                    .rows()
                    .iter()
                    .map(|r| {
                        r.iter()
                            .map(|x| x.to_string())
                            .collect::<Vec<_>>()
                            .join(",")
                    })
                    .collect();
                write!(f, "linking={}", rows.join("/"))
            }
        }
    }
}

/// Per-key weights of the energy sum.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Weights {
    pub components: f64,
    pub writhe: f64,
    pub crossings: f64,
    pub signature: f64,
    pub determinant: f64,
    pub genus: f64,
    pub alexander: f64,
    pub jones: f64,
    pub linking: f64,
}

impl Default for Weights {
    fn default() -> Self {
        Self {
            components: 4.0,
            writhe: 1.0,
            crossings: 1.0,
            signature: 1.0,
            determinant: 0.25,
            genus: 1.0,
            alexander: 0.5,
            jones: 0.5,
            linking: 1.0,
        }
    }
}

impl Weights {
    fn weight(&self, key: &str) -> f64 {
        match key {
            "components" => self.components,
            "writhe" => self.writhe,
            "crossings" => self.crossings,
            "signature" => self.signature,
            "determinant" => self.determinant,
            "genus" => self.genus,
            "alexander" => self.alexander,
            "jones" => self.jones,
            "linking" => self.linking,
            _ => 1.0,
        }
    }
}

/// A conjunction of constraints.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Target {
    pub constraints: Vec<Constraint>,
    pub weights: Weights,
    /// Energy added per crossing; ties go to shorter words.
    pub length_penalty: f64,
}

impl Target {
    pub fn new(constraints: Vec<Constraint>) -> Self {
        Self {
            constraints,
            ..Self::default()
        }
    }

    pub fn with_weights(mut self, weights: Weights) -> Self {
        self.weights = weights;
        self
    }

    pub fn with_length_penalty(mut self, penalty: f64) -> Self {
        self.length_penalty = penalty;
        self
    }

    pub fn is_empty(&self) -> bool {
        self.constraints.is_empty()
    }

    /// Add constraints, replacing earlier ones on the same key.
    pub fn merge(&mut self, other: Target) {
        for c in other.constraints {
            let key = c.key();
            let is_bound = matches!(
                c,
                Constraint::Integer {
                    relation: Relation::Le | Relation::Ge,
                    ..
                }
            );
            if !is_bound {
                self.constraints.retain(|old| old.key() != key);
            }
            self.constraints.push(c);
        }
    }

    pub fn needs_jones(&self) -> bool {
        self.constraints.iter().any(Constraint::needs_jones)
    }

    /// The invariants an evaluator has to compute for this target.
    pub fn invariant_set(&self, base: InvariantSet) -> InvariantSet {
        base.with_jones(base.jones || self.needs_jones())
    }

    /// Per-constraint distances, in clause order.
    pub fn distances(&self, inv: &Invariants) -> Vec<f64> {
        self.constraints.iter().map(|c| c.distance(inv)).collect()
    }

    /// Value fixed by an `=` clause on `quantity`.
    pub fn pinned(&self, quantity: Quantity) -> Option<i64> {
        self.constraints.iter().find_map(|c| match c {
            Constraint::Integer {
                quantity: q,
                relation: Relation::Eq,
                value,
            } if *q == quantity => Some(*value),
            _ => None,
        })
    }

    pub fn pinned_linking(&self) -> Option<&LinkingMatrix> {
        self.constraints.iter().find_map(|c| match c {
            Constraint::Linking(m) => Some(m),
            _ => None,
        })
    }

    pub fn is_satisfied(&self, inv: &Invariants) -> bool {
        self.constraints.iter().all(|c| c.distance(inv) == 0.0)
    }

    /// Weighted distance sum; zero exactly when the target is met.
    pub fn distance(&self, inv: &Invariants) -> f64 {
        self.constraints
            .iter()
            .map(|c| self.weights.weight(c.key()) * c.distance(inv))
            .sum()
    }

    /// Distance plus the length penalty.
    pub fn energy(&self, inv: &Invariants) -> f64 {
        self.distance(inv) + self.length_penalty * inv.crossings as f64
    }

    /// Exact invariants of `inv` as a target, used for hindsight relabelling
    /// and for `--like`.
    pub fn from_invariants(inv: &Invariants) -> Self {
        let mut constraints = vec![
            Constraint::Integer {
                quantity: Quantity::Components,
                relation: Relation::Eq,
                value: inv.components as i64,
            },
            Constraint::Integer {
                quantity: Quantity::Signature,
                relation: Relation::Eq,
                value: inv.signature as i64,
            },
            Constraint::Integer {
                quantity: Quantity::Determinant,
                relation: Relation::Eq,
                value: inv.determinant.min(i64::MAX as u64) as i64,
            },
            Constraint::Alexander(inv.alexander.clone()),
        ];
        if inv.components > 1 {
            constraints.push(Constraint::Linking(inv.linking.clone()));
        }
        if let Some(j) = &inv.jones {
            constraints.push(Constraint::Jones(j.clone()));
        }
        Self::new(constraints)
    }

    /// Target with the invariants of a catalogue entry.
    pub fn like(name: &str, set: &InvariantSet) -> Result<Self> {
        let braid = catalog::lookup(name)?;
        let inv = invariant::compute(&braid, set)?;
        Ok(Self::from_invariants(&inv))
    }

    /// Parse `;`-separated clauses. Spans in diagnostics index into `text`.
    pub fn parse(text: &str) -> std::result::Result<Self, Diagnostic> {
        let mut constraints = Vec::new();
        let mut offset = 0;
        for clause in text.split(';') {
            let lead = clause.len() - clause.trim_start().len();
            let body = clause.trim();
            if !body.is_empty() {
                let c = parse_clause(body).map_err(|d| d.offset(offset + lead))?;
                constraints.push(c);
            }
            offset += clause.len() + 1;
        }
        Ok(Self::new(constraints))
    }
}

impl fmt::Display for Target {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let clauses: Vec<String> = self.constraints.iter().map(|c| c.to_string()).collect();
        write!(f, "{}", clauses.join("; "))
    }
}

const KEYS: &[&str] = &[
    "components",
    "writhe",
    "crossings",
    "signature",
    "determinant",
    "genus",
    "alexander",
    "jones",
    "linking",
];

fn parse_clause(clause: &str) -> std::result::Result<Constraint, Diagnostic> {
    let (key_end, relation, value_start) = if let Some(i) = clause.find("<=") {
        (i, Relation::Le, i + 2)
    } else if let Some(i) = clause.find(">=") {
        (i, Relation::Ge, i + 2)
    } else if let Some(i) = clause.find('=') {
        (i, Relation::Eq, i + 1)
    } else {
        return Err(Diagnostic::error(
            format!("expected 'key=value' in '{}'", clause),
            Span::new(0, clause.len()),
        )
        .with_help("relations are '=', '<=' and '>='".to_string()));
    };

    let raw_key = &clause[..key_end];
    let key = raw_key.trim();
    let key_span = Span::new(0, raw_key.trim_end().len());
    let raw_value = &clause[value_start..];
    let value = raw_value.trim();
    let value_at = value_start + (raw_value.len() - raw_value.trim_start().len());
    let value_span = Span::new(value_at, value_at + value.len());

    let quantity = match key.to_ascii_lowercase().as_str() {
        "components" => Some(Quantity::Components),
        "writhe" => Some(Quantity::Writhe),
        "crossings" => Some(Quantity::Crossings),
        "signature" => Some(Quantity::Signature),
        "determinant" => Some(Quantity::Determinant),
        "genus" => Some(Quantity::Genus),
        _ => None,
    };

    if let Some(quantity) = quantity {
        let value: i64 = value.parse().map_err(|_| {
            Diagnostic::error(
                format!("'{}' expects an integer, found '{}'", key, value),
                value_span,
            )
        })?;
        return Ok(Constraint::Integer {
            quantity,
            relation,
            value,
        });
    }

    if !KEYS.contains(&key.to_ascii_lowercase().as_str()) {
        return Err(
            Diagnostic::error(format!("unknown invariant '{}'", key), key_span)
                .with_note(format!("known invariants: {}", KEYS.join(", "))),
        );
    }
    if relation != Relation::Eq {
        return Err(Diagnostic::error(
            format!("'{}' only supports '='", key),
            Span::new(key_end, value_start),
        ));
    }

    match key.to_ascii_lowercase().as_str() {
        "alexander" => {
            let p = LaurentPoly::parse_coeffs(value).map_err(|d| d.offset(value_at))?;
            let normal = p.normalized().ok_or_else(|| {
                Diagnostic::error(
                    "coefficient out of range".to_string(),
                    Span::new(value_at, value_at + value.len()),
                )
            })?;
            Ok(Constraint::Alexander(normal))
        }
        "jones" => {
            let p = LaurentPoly::parse_coeffs(value).map_err(|d| d.offset(value_at))?;
            Ok(Constraint::Jones(p))
        }
        _ => parse_linking(value)
            .map(Constraint::Linking)
            .map_err(|d| d.offset(value_at)),
    }
}

/// Rows separated by `/`, entries by `,`: `0,1/1,0` is the Hopf link.
fn parse_linking(text: &str) -> std::result::Result<LinkingMatrix, Diagnostic> {
    let mut rows = Vec::new();
    let mut pos = 0;
    for row in text.split('/') {
        let mut entries = Vec::new();
        let mut at = pos;
        for part in row.split(',') {
            let lead = part.len() - part.trim_start().len();
            let token = part.trim();
            let v: i32 = token.parse().map_err(|_| {
                Diagnostic::error(
                    format!("'{}' is not an integer", token),
                    Span::new(at + lead, at + lead + token.len()),
                )
            })?;
            entries.push(v);
            at += part.len() + 1;
        }
        rows.push(entries);
        pos += row.len() + 1;
    }
    let n = rows.len();
    if rows.iter().any(|r| r.len() != n) {
        return Err(Diagnostic::error(
            format!("linking matrix must be square, found {} rows", n),
            Span::new(0, text.len()),
        ));
    }
    let symmetric = (0..n).all(|i| (0..n).all(|j| rows[i][j] == rows[j][i]));
    if !symmetric {
        return Err(Diagnostic::error(
            "linking matrix must be symmetric".to_string(),
            Span::new(0, text.len()),
        ));
    }
    Ok(LinkingMatrix::from_rows(&rows))
}

/// Combine a catalogue entry's invariants with explicit clauses; the
/// clauses override it. Parse errors carry spans into `clauses`.
pub fn build_target(clauses: &str, like: Option<&str>, set: &InvariantSet) -> Result<Target> {
    let mut target = match like {
        Some(name) => Target::like(name, set)?,
        None => Target::default(),
    };
    if !clauses.trim().is_empty() {
        target.merge(Target::parse(clauses).map_err(Error::Parse)?);
    }
    Ok(target)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::braid::Braid;

    fn inv(name: &str) -> Invariants {
        invariant::compute(&catalog::lookup(name).unwrap(), &InvariantSet::default()).unwrap()
    }

    #[test]
    fn parse_integer_clauses() {
        let t = Target::parse("components=1; signature=-4 ;crossings<=12; genus>=1").unwrap();
        assert_eq!(t.constraints.len(), 4);
        assert_eq!(
            t.constraints[2],
            Constraint::Integer {
                quantity: Quantity::Crossings,
                relation: Relation::Le,
                value: 12
            }
        );
        assert_eq!(
            t.to_string(),
            "components=1; signature=-4; crossings<=12; genus>=1"
        );
    }

    #[test]
    fn parse_polynomials_normalises_alexander() {
        let t = Target::parse("alexander=t^-1: -1,3,-1").unwrap();
        assert_eq!(
            t.constraints[0],
            Constraint::Alexander(LaurentPoly::from_coeffs(0, vec![1, -3, 1]))
        );
        let t = Target::parse("jones=t^2: 1,0,0,0,1,0,-1").unwrap();
        let Constraint::Jones(p) = &t.constraints[0] else {
            panic!("expected jones");
        };
        assert_eq!(p.terms().collect::<Vec<_>>(), vec![(2, 1), (6, 1), (8, -1)]);
    }

    #[test]
    fn parse_linking_matrix() {
        let t = Target::parse("linking=0,1/1,0").unwrap();
        assert_eq!(t.to_string(), "linking=0,1/1,0");
        let err = Target::parse("linking=0,1/2,0").unwrap_err();
        assert!(err.message.contains("symmetric"));
    }

    #[test]
    fn parse_errors_point_at_the_token() {
        let err = Target::parse("components=1; signatur=2").unwrap_err();
        assert!(err.message.contains("unknown invariant"));
        assert_eq!(err.span.range(), 14..22);

        let err = Target::parse("signature=x").unwrap_err();
        assert_eq!(err.span.range(), 10..11);

        let err = Target::parse("alexander<=1,2").unwrap_err();
        assert!(err.message.contains("only supports"));

        assert!(Target::parse("signature").is_err());
    }

    #[test]
    fn distances_vanish_on_satisfying_invariants() {
        let trefoil = inv("3_1");
        let t = Target::parse("components=1; signature=-2; determinant=3; alexander=1,-1,1").unwrap();
        assert!(t.is_satisfied(&trefoil));
        assert_eq!(t.energy(&trefoil), 0.0);

        let fig8 = inv("4_1");
        assert!(!t.is_satisfied(&fig8));
        // signature 2 off, determinant 2 off, alexander |1-1|+|-3+1|+|1-1| = 2
        assert_eq!(t.distances(&fig8), vec![0.0, 2.0, 2.0, 2.0]);
    }

    #[test]
    fn pinned_values_come_from_equalities() {
        let t = Target::parse("signature>=-2; signature=-4; linking=0,1/1,0").unwrap();
        assert_eq!(t.pinned(Quantity::Signature), Some(-4));
        assert_eq!(t.pinned(Quantity::Components), None);
        assert_eq!(t.pinned_linking().map(|m| m.total_linking()), Some(1));
        assert!(Target::parse("genus<=2").unwrap().pinned_linking().is_none());
    }

    #[test]
    fn bounds_are_one_sided() {
        let trefoil = inv("3_1");
        let le = Target::parse("crossings<=2").unwrap();
        let ge = Target::parse("crossings>=2").unwrap();
        assert_eq!(le.distances(&trefoil), vec![1.0]);
        assert_eq!(ge.distances(&trefoil), vec![0.0]);
    }

    #[test]
    fn length_penalty_breaks_ties() {
        let t = Target::parse("signature=-2").unwrap().with_length_penalty(0.01);
        let short = inv("3_1");
        let long = invariant::compute(
            &Braid::from_signed(3, &[1, 1, 1, 2]).unwrap(),
            &InvariantSet::default(),
        )
        .unwrap();
        assert!(t.energy(&short) < t.energy(&long));
    }

    #[test]
    fn like_reproduces_catalog_invariants() {
        let t = Target::like("5_2", &InvariantSet::default()).unwrap();
        assert!(t.is_satisfied(&inv("5_2")));
        assert!(!t.is_satisfied(&inv("5_1")));
        let hopf = Target::like("hopf link", &InvariantSet::default()).unwrap();
        assert!(hopf.constraints.iter().any(|c| c.key() == "linking"));
        assert!(Target::like("9_42", &InvariantSet::default()).is_err());
    }

    #[test]
    fn explicit_clauses_override_like() {
        let t = build_target(
            "signature=0; crossings<=8",
            Some("3_1"),
            &InvariantSet::default(),
        )
        .unwrap();
        let sigs: Vec<_> = t
            .constraints
            .iter()
            .filter(|c| c.key() == "signature")
            .collect();
        assert_eq!(sigs.len(), 1);
        assert_eq!(sigs[0].to_string(), "signature=0");
        assert!(t.constraints.iter().any(|c| c.key() == "crossings"));
    }

    #[test]
    fn split_genus_counts_as_missed() {
        let unlink = invariant::compute(&Braid::identity(2), &InvariantSet::default()).unwrap();
        let t = Target::parse("genus=0").unwrap();
        assert_eq!(t.distances(&unlink), vec![1.0]);
    }
}
