//! Simulated annealing over braid words.
//!
//! Geometric cooling from `t_start` to `t_end` across the budget, Metropolis
//! acceptance, neighbours from the random edit moves. After `restart_after`
//! steps without a new best the walk jumps back to the best state.

use rand::rngs::StdRng;
use rand::Rng;
use serde::{Deserialize, Serialize};

use super::{SearchConfig, Strategy};
use crate::braid::moves::random_neighbor;
use crate::target::Evaluator;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnnealConfig {
    pub t_start: f64,
    pub t_end: f64,
    pub restart_after: usize,
}

impl Default for AnnealConfig {
    fn default() -> Self {
        Self {
            t_start: 2.0,
            t_end: 0.02,
            restart_after: 400,
        }
    }
}

impl AnnealConfig {
    /// Temperature after `step` of `steps`.
    pub fn temperature(&self, step: usize, steps: usize) -> f64 {
        let t0 = self.t_start.max(f64::MIN_POSITIVE);
        let t1 = self.t_end.clamp(f64::MIN_POSITIVE, t0);
        if steps <= 1 {
            return t0;
        }
        let frac = step as f64 / (steps - 1) as f64;
        t0 * (t1 / t0).powf(frac.min(1.0))
    }
}

/// Metropolis rule: always take improvements, otherwise accept with
/// probability exp(−Δ/T).
pub fn accept(delta: f64, temperature: f64, u: f64) -> bool {
    if delta <= 0.0 {
        return true;
    }
    if !delta.is_finite() || temperature <= 0.0 {
        return false;
    }
    u < (-delta / temperature).exp()
}

pub struct Annealing {
    search: SearchConfig,
    config: AnnealConfig,
}

impl Annealing {
    pub fn new(search: SearchConfig, config: AnnealConfig) -> Self {
        Self { search, config }
    }
}

impl Strategy for Annealing {
    fn name(&self) -> &'static str {
        "anneal"
    }

    fn run(&mut self, evaluator: &Evaluator, rng: &mut StdRng) -> Vec<f64> {
        let steps = evaluator.remaining().max(1);
        let weights = self.search.move_weights();
        let (_, max_len) = self.search.length_range();

        let mut current = evaluator.evaluate(&self.search.random_braid(rng));
        let mut best = current.clone();
        let mut stale = 0;
        let mut history = vec![evaluator.best_energy()];
        let mut step = 0;

        while !evaluator.exhausted() {
            let t = self.config.temperature(step, steps);
            let (_, next) = random_neighbor(&current.braid, &weights, max_len, rng);
            let candidate = evaluator.evaluate(&next);

            if accept(candidate.energy - current.energy, t, rng.gen()) {
                current = candidate;
            }
            if current.energy < best.energy {
                best = current.clone();
                stale = 0;
                tracing::debug!(step, energy = best.energy, temperature = t, "anneal improved");
            } else {
                stale += 1;
            }
            if stale >= self.config.restart_after {
                current = best.clone();
                stale = 0;
            }
            step += 1;
            history.push(evaluator.best_energy());
        }
        history
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::invariant::InvariantSet;
    use crate::target::Target;
    use rand::SeedableRng;

    #[test]
    fn temperature_schedule_is_geometric() {
        let cfg = AnnealConfig {
            t_start: 1.0,
            t_end: 0.01,
            restart_after: 10,
        };
        assert_eq!(cfg.temperature(0, 3), 1.0);
        assert!((cfg.temperature(1, 3) - 0.1).abs() < 1e-12);
        assert!((cfg.temperature(2, 3) - 0.01).abs() < 1e-12);
        assert_eq!(cfg.temperature(5, 1), 1.0);
    }

    #[test]
    fn metropolis_rule() {
        assert!(accept(-1.0, 0.0, 0.99));
        assert!(accept(0.0, 1.0, 0.99));
        assert!(!accept(f64::INFINITY, 10.0, 0.0));
        assert!(accept(1.0, 1.0, 0.3));
        assert!(!accept(1.0, 1.0, 0.4));
    }

    #[test]
    fn finds_a_trefoil_signature() {
        let target = Target::parse("components=1; signature=-2")
            .unwrap()
            .with_length_penalty(0.01);
        let ev = Evaluator::new(target, InvariantSet::default(), 3000, 1);
        let search = SearchConfig {
            strands: 2,
            min_length: 1,
            max_length: 8,
            ..SearchConfig::default()
        };
        let mut rng = StdRng::seed_from_u64(11);
        let history = Annealing::new(search, AnnealConfig::default()).run(&ev, &mut rng);
        assert_eq!(ev.solution_count(), 1);
        assert!(history.last().copied().unwrap_or(f64::INFINITY) < 1.0);
    }
}
