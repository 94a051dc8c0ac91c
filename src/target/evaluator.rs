//! Shared, thread-safe scoring of braids against a target.
//!
//! The evaluator owns everything the strategies have in common: the
//! invariant cache keyed by canonical word, the evaluation budget, the best
//! braid so far, the distinct solutions, and the replay buffer.

use std::collections::hash_map::DefaultHasher;
use std::collections::{HashMap, HashSet};
use std::hash::{Hash, Hasher};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use serde::{Deserialize, Serialize};

use super::Target;
use crate::braid::Braid;
use crate::invariant::{self, InvariantSet, Invariants};
use crate::search::replay::{ReplayBuffer, Transition};

const SHARDS: usize = 16;

type Shard = Mutex<HashMap<Vec<i32>, Option<Arc<Invariants>>>>;

/// Score of one braid.
#[derive(Clone, Debug)]
pub struct Evaluation {
    pub braid: Braid,
    /// `None` when an invariant could not be computed (e.g. Jones over the
    /// crossing limit); the energy is then infinite.
    pub invariants: Option<Arc<Invariants>>,
    pub energy: f64,
    pub satisfied: bool,
}

/// A braid meeting every constraint of the target.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Solution {
    pub braid: Braid,
    pub word: String,
    pub invariants: Invariants,
}

pub struct Evaluator {
    target: Target,
    set: InvariantSet,
    shards: Vec<Shard>,
    calls: AtomicUsize,
    computed: AtomicUsize,
    budget: usize,
    max_solutions: usize,
    best: Mutex<Option<(f64, Braid)>>,
    solutions: Mutex<(HashSet<Vec<i32>>, Vec<Solution>)>,
    replay: Option<Mutex<ReplayBuffer>>,
}

impl Evaluator {
    pub fn new(target: Target, set: InvariantSet, budget: usize, max_solutions: usize) -> Self {
        let set = target.invariant_set(set);
        Self {
            target,
            set,
            shards: (0..SHARDS).map(|_| Mutex::new(HashMap::new())).collect(),
            calls: AtomicUsize::new(0),
            computed: AtomicUsize::new(0),
            budget,
            max_solutions: max_solutions.max(1),
            best: Mutex::new(None),
            solutions: Mutex::new((HashSet::new(), Vec::new())),
            replay: None,
        }
    }

    /// Record every computed braid into `buffer`.
    pub fn with_replay(mut self, buffer: ReplayBuffer) -> Self {
        self.replay = Some(Mutex::new(buffer));
        self
    }

    pub fn target(&self) -> &Target {
        &self.target
    }

    pub fn invariant_set(&self) -> &InvariantSet {
        &self.set
    }

    pub fn evaluate(&self, braid: &Braid) -> Evaluation {
        self.calls.fetch_add(1, Ordering::Relaxed);
        let key = braid.canonical_key();
        let invariants = self.lookup_or_compute(braid, key);

        let (energy, satisfied) = match &invariants {
            Some(inv) => (self.target.energy(inv), self.target.is_satisfied(inv)),
            None => (f64::INFINITY, false),
        };
        tracing::trace!(word = %braid, energy, "evaluated");

        self.update_best(braid, energy);
        if satisfied {
            if let Some(inv) = &invariants {
                self.record_solution(braid, inv);
            }
        }
        Evaluation {
            braid: braid.clone(),
            invariants,
            energy,
            satisfied,
        }
    }

    fn lookup_or_compute(&self, braid: &Braid, key: Vec<i32>) -> Option<Arc<Invariants>> {
        let mut hasher = DefaultHasher::new();
        key.hash(&mut hasher);
        let shard = &self.shards[hasher.finish() as usize % SHARDS];

        if let Ok(map) = shard.lock() {
            if let Some(hit) = map.get(&key) {
                return hit.clone();
            }
        }

        // computed outside the lock; a racing thread may compute it twice
        self.computed.fetch_add(1, Ordering::Relaxed);
        let result = match invariant::compute(braid, &self.set) {
            Ok(inv) => Some(Arc::new(inv)),
            Err(e) => {
                tracing::debug!(word = %braid, error = %e, "invariants unavailable");
                None
            }
        };
        if let (Some(inv), Some(replay)) = (&result, &self.replay) {
            let distance = self.target.distance(inv);
            if let Ok(mut buf) = replay.lock() {
                buf.push(Transition::new(braid, inv, distance));
            }
        }
        if let Ok(mut map) = shard.lock() {
            map.insert(key, result.clone());
        }
        result
    }

    fn update_best(&self, braid: &Braid, energy: f64) {
        if !energy.is_finite() {
            return;
        }
        if let Ok(mut best) = self.best.lock() {
            let improved = best.as_ref().map_or(true, |(e, _)| energy < *e);
            if improved {
                tracing::debug!(word = %braid, energy, "new best");
                *best = Some((energy, braid.clone()));
            }
        }
    }

    fn record_solution(&self, braid: &Braid, inv: &Invariants) {
        let key = braid.free_reduce().canonical_key();
        if let Ok(mut guard) = self.solutions.lock() {
            let (seen, list) = &mut *guard;
            if list.len() < self.max_solutions && seen.insert(key) {
                tracing::info!(word = %braid, "solution found");
                list.push(Solution {
                    braid: braid.clone(),
                    word: braid.to_string(),
                    invariants: inv.clone(),
                });
            }
        }
    }

    /// Calls to `evaluate`, cached or not.
    pub fn evaluations(&self) -> usize {
        self.calls.load(Ordering::Relaxed)
    }

    /// Invariant computations (cache misses).
    pub fn computed(&self) -> usize {
        self.computed.load(Ordering::Relaxed)
    }

    pub fn budget(&self) -> usize {
        self.budget
    }

    pub fn remaining(&self) -> usize {
        self.budget.saturating_sub(self.evaluations())
    }

    pub fn solution_count(&self) -> usize {
        self.solutions.lock().map(|s| s.1.len()).unwrap_or(0)
    }

    /// Budget spent or enough solutions found.
    pub fn exhausted(&self) -> bool {
        self.evaluations() >= self.budget || self.solution_count() >= self.max_solutions
    }

    pub fn best(&self) -> Option<(f64, Braid)> {
        self.best.lock().ok().and_then(|b| b.clone())
    }

    pub fn best_energy(&self) -> f64 {
        self.best().map_or(f64::INFINITY, |(e, _)| e)
    }

    pub fn solutions(&self) -> Vec<Solution> {
        self.solutions
            .lock()
            .map(|s| s.1.clone())
            .unwrap_or_default()
    }

    /// Hand back the replay buffer, if one was attached.
    pub fn into_replay(self) -> Option<ReplayBuffer> {
        self.replay.and_then(|m| m.into_inner().ok())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::braid::catalog;

    fn evaluator(target: &str, budget: usize) -> Evaluator {
        Evaluator::new(
            Target::parse(target).unwrap(),
            InvariantSet::default(),
            budget,
            3,
        )
    }

    #[test]
    fn cache_is_keyed_by_rotation() {
        let ev = evaluator("signature=-2", 100);
        let a = Braid::from_signed(3, &[1, 1, 1, 2]).unwrap();
        let b = Braid::from_signed(3, &[2, 1, 1, 1]).unwrap();
        let ea = ev.evaluate(&a);
        let eb = ev.evaluate(&b);
        assert_eq!(ea.energy, eb.energy);
        assert_eq!(ev.evaluations(), 2);
        assert_eq!(ev.computed(), 1);
    }

    #[test]
    fn solutions_are_distinct_and_capped() {
        let ev = evaluator("components=1; signature=-2; determinant=3", 100);
        let trefoil = catalog::lookup("3_1").unwrap();
        assert!(ev.evaluate(&trefoil).satisfied);
        // same closure after rotation and a cancelling pair
        ev.evaluate(&Braid::from_signed(2, &[1, 1, 1, 1, -1]).unwrap());
        assert_eq!(ev.solution_count(), 1);
        ev.evaluate(&Braid::from_signed(3, &[1, 1, 1, 2]).unwrap());
        ev.evaluate(&Braid::from_signed(3, &[1, 1, 1, -2]).unwrap());
        ev.evaluate(&Braid::from_signed(4, &[1, 1, 1, 2, 3]).unwrap());
        assert_eq!(ev.solution_count(), 3);
        assert!(ev.exhausted());
    }

    #[test]
    fn budget_exhaustion() {
        let ev = evaluator("signature=-8", 2);
        let b = catalog::lookup("4_1").unwrap();
        ev.evaluate(&b);
        assert!(!ev.exhausted());
        ev.evaluate(&b);
        assert!(ev.exhausted());
        assert_eq!(ev.remaining(), 0);
    }

    #[test]
    fn best_tracks_lowest_energy() {
        let ev = evaluator("signature=-4", 10);
        ev.evaluate(&catalog::lookup("4_1").unwrap());
        ev.evaluate(&catalog::lookup("3_1").unwrap());
        ev.evaluate(&catalog::lookup("0_1").unwrap());
        let (energy, braid) = ev.best().unwrap();
        assert_eq!(energy, 2.0);
        assert_eq!(braid.signed_word(), vec![1, 1, 1]);
    }

    #[test]
    fn failures_score_infinite() {
        let ev = Evaluator::new(
            Target::parse("jones=1").unwrap(),
            InvariantSet {
                jones: false,
                max_jones_crossings: 2,
            },
            10,
            1,
        );
        assert!(ev.invariant_set().jones);
        let e = ev.evaluate(&catalog::lookup("3_1").unwrap());
        assert!(e.invariants.is_none());
        assert!(e.energy.is_infinite());
        assert!(ev.best().is_none());
    }

    #[test]
    fn computed_braids_land_in_replay() {
        let ev = evaluator("signature=0", 10).with_replay(ReplayBuffer::new(16));
        let b = catalog::lookup("4_1").unwrap();
        ev.evaluate(&b);
        ev.evaluate(&b);
        ev.evaluate(&catalog::lookup("3_1").unwrap());
        let replay = ev.into_replay().unwrap();
        assert_eq!(replay.len(), 2);
        assert_eq!(replay.success_count(), 1);
    }
}
