//! Intrinsic reward for visiting unfamiliar invariant combinations.
//!
//! Two signals: a count bonus that decays with the number of visits to an
//! invariant cell, and the error of a learned signature predictor on the
//! visited braid (large where the model has not learned the region yet).

use std::collections::HashMap;
use std::sync::Mutex;

use serde::{Deserialize, Serialize};

use crate::braid::Braid;
use crate::invariant::{Invariants, LinkingMatrix};

/// A model that guesses the signature of a braid closure, from its word or
/// from its linking matrix.
pub trait SignatureModel: Send + Sync {
    fn predict_signature(&self, braid: &Braid, linking: &LinkingMatrix) -> f32;
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CuriosityConfig {
    pub count_weight: f64,
    pub prediction_weight: f64,
}

impl Default for CuriosityConfig {
    fn default() -> Self {
        Self {
            count_weight: 0.1,
            prediction_weight: 0.05,
        }
    }
}

pub struct Curiosity {
    config: CuriosityConfig,
    visits: Mutex<HashMap<(usize, i32, u32), u32>>,
    model: Option<Box<dyn SignatureModel>>,
}

impl Curiosity {
    pub fn new(config: CuriosityConfig) -> Self {
        Self {
            config,
            visits: Mutex::new(HashMap::new()),
            model: None,
        }
    }

    pub fn with_model(mut self, model: Box<dyn SignatureModel>) -> Self {
        self.model = Some(model);
        self
    }

    pub fn has_model(&self) -> bool {
        self.model.is_some()
    }

    /// Record a visit and return its bonus.
    pub fn observe(&self, braid: &Braid, inv: &Invariants) -> f64 {
        let visits = match self.visits.lock() {
            Ok(mut map) => {
                let count = map.entry(inv.cell()).or_insert(0);
                let before = *count;
                *count += 1;
                before
            }
            Err(_) => 0,
        };
        let count_bonus = self.config.count_weight / (1.0 + visits as f64).sqrt();
        count_bonus + self.config.prediction_weight * self.surprise(braid, inv)
    }

    /// |predicted − actual| signature, zero without a model.
    pub fn surprise(&self, braid: &Braid, inv: &Invariants) -> f64 {
        match &self.model {
            Some(model) => {
                let predicted = model.predict_signature(braid, &inv.linking) as f64;
                (predicted - inv.signature as f64).abs()
            }
            None => 0.0,
        }
    }

    /// Number of distinct cells seen so far.
    pub fn cells_seen(&self) -> usize {
        self.visits.lock().map(|m| m.len()).unwrap_or(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::braid::catalog;
    use crate::invariant::{self, InvariantSet};

    struct Constant(f32);

    impl SignatureModel for Constant {
        fn predict_signature(&self, _braid: &Braid, _linking: &LinkingMatrix) -> f32 {
            self.0
        }
    }

    fn inv(name: &str) -> (Braid, Invariants) {
        let braid = catalog::lookup(name).unwrap();
        let inv = invariant::compute(&braid, &InvariantSet::default()).unwrap();
        (braid, inv)
    }

    #[test]
    fn count_bonus_decays() {
        let c = Curiosity::new(CuriosityConfig {
            count_weight: 1.0,
            prediction_weight: 0.0,
        });
        let (b, trefoil) = inv("3_1");
        let first = c.observe(&b, &trefoil);
        let second = c.observe(&b, &trefoil);
        let fourth = {
            c.observe(&b, &trefoil);
            c.observe(&b, &trefoil)
        };
        assert_eq!(first, 1.0);
        assert!((second - 1.0 / 2f64.sqrt()).abs() < 1e-12);
        assert!((fourth - 0.5).abs() < 1e-12);
        // a new cell starts fresh
        let (b, eight) = inv("4_1");
        assert_eq!(c.observe(&b, &eight), 1.0);
        assert_eq!(c.cells_seen(), 2);
    }

    #[test]
    fn prediction_error_adds_surprise() {
        let c = Curiosity::new(CuriosityConfig {
            count_weight: 0.0,
            prediction_weight: 0.5,
        })
        .with_model(Box::new(Constant(0.0)));
        assert!(c.has_model());
        // trefoil signature is -2
        let (b, trefoil) = inv("3_1");
        assert_eq!(c.observe(&b, &trefoil), 1.0);
        let (b, eight) = inv("4_1");
        assert_eq!(c.surprise(&b, &eight), 0.0);
    }
}
