//! Discrete Tree-structured Parzen Estimator.
//!
//! A word is a fixed row of categorical slots, each either the identity or
//! one of the 2(n−1) generators; dropping the identities gives the braid.
//! After random warm-up trials the history is split at quantile γ into good
//! and bad trials, per-slot smoothed category frequencies l (good) and g
//! (bad) are estimated, candidates are drawn from l, and the candidate
//! maximising l/g is evaluated next.

use rand::rngs::StdRng;
use rand::Rng;
use serde::{Deserialize, Serialize};

use super::{SearchConfig, Strategy};
use crate::braid::{Braid, Generator};
use crate::target::Evaluator;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TpeConfig {
    /// Random trials before the model is used.
    pub warmup: usize,
    /// Fraction of trials counted as good.
    pub gamma: f64,
    /// Candidates drawn from l per step.
    pub candidates: usize,
    /// Pseudo-count added to every category.
    pub prior: f64,
}

impl Default for TpeConfig {
    fn default() -> Self {
        Self {
            warmup: 64,
            gamma: 0.2,
            candidates: 32,
            prior: 1.0,
        }
    }
}

/// Category 0 is the identity; 2k−1 and 2k are σₖ and σₖ⁻¹.
fn category_generator(category: usize) -> Option<Generator> {
    if category == 0 {
        return None;
    }
    let index = (category + 1) / 2;
    Some(Generator::new(index, category % 2 == 1))
}

/// Per-slot categorical densities.
struct Density {
    probs: Vec<Vec<f64>>,
}

impl Density {
    fn fit(trials: &[&Vec<usize>], slots: usize, categories: usize, prior: f64) -> Self {
        let mut probs = vec![vec![prior; categories]; slots];
        for trial in trials {
            for (s, &c) in trial.iter().enumerate() {
                probs[s][c] += 1.0;
            }
        }
        let total = trials.len() as f64 + prior * categories as f64;
        for row in probs.iter_mut() {
            for p in row.iter_mut() {
                *p /= total;
            }
        }
        Self { probs }
    }

    fn sample<R: Rng + ?Sized>(&self, rng: &mut R) -> Vec<usize> {
        self.probs
            .iter()
            .map(|row| {
                let mut u = rng.gen::<f64>() * row.iter().sum::<f64>();
                for (c, &p) in row.iter().enumerate() {
                    u -= p;
                    if u < 0.0 {
                        return c;
                    }
                }
                row.len() - 1
            })
            .collect()
    }

    fn log_prob(&self, x: &[usize]) -> f64 {
        x.iter()
            .zip(&self.probs)
            .map(|(&c, row)| row[c].ln())
            .sum()
    }
}

pub struct Tpe {
    search: SearchConfig,
    config: TpeConfig,
    trials: Vec<(Vec<usize>, f64)>,
}

impl Tpe {
    pub fn new(search: SearchConfig, config: TpeConfig) -> Self {
        Self {
            search,
            config,
            trials: Vec::new(),
        }
    }

    fn slots(&self) -> usize {
        self.search.length_range().1
    }

    fn categories(&self) -> usize {
        1 + 2 * (self.search.strands.max(2) - 1)
    }

    pub fn braid_of(&self, slots: &[usize]) -> Braid {
        let word: Vec<Generator> = slots.iter().filter_map(|&c| category_generator(c)).collect();
        let strands = self.search.strands.max(2);
        Braid::new(strands, word).unwrap_or_else(|_| Braid::identity(strands))
    }

    fn random_trial(&self, rng: &mut StdRng) -> Vec<usize> {
        let k = self.categories();
        (0..self.slots()).map(|_| rng.gen_range(0..k)).collect()
    }

    /// The next trial: random during warm-up, then the best l/g candidate.
    fn propose(&self, rng: &mut StdRng) -> Vec<usize> {
        if self.trials.len() < self.config.warmup.max(2) {
            return self.random_trial(rng);
        }
        let mut order: Vec<&(Vec<usize>, f64)> = self.trials.iter().collect();
        order.sort_by(|a, b| a.1.total_cmp(&b.1));
        let n_good = ((self.config.gamma * order.len() as f64).ceil() as usize)
            .clamp(1, order.len() - 1);
        let good: Vec<&Vec<usize>> = order[..n_good].iter().map(|t| &t.0).collect();
        let bad: Vec<&Vec<usize>> = order[n_good..].iter().map(|t| &t.0).collect();

        let (slots, k, prior) = (self.slots(), self.categories(), self.config.prior.max(1e-6));
        let l = Density::fit(&good, slots, k, prior);
        let g = Density::fit(&bad, slots, k, prior);

        let mut best: Option<(f64, Vec<usize>)> = None;
        for _ in 0..self.config.candidates.max(1) {
            let x = l.sample(rng);
            let score = l.log_prob(&x) - g.log_prob(&x);
            if best.as_ref().map_or(true, |(s, _)| score > *s) {
                best = Some((score, x));
            }
        }
        best.map(|(_, x)| x).unwrap_or_else(|| self.random_trial(rng))
    }
}

impl Strategy for Tpe {
    fn name(&self) -> &'static str {
        "tpe"
    }

    fn run(&mut self, evaluator: &Evaluator, rng: &mut StdRng) -> Vec<f64> {
        self.trials.clear();
        let mut history = Vec::new();
        while !evaluator.exhausted() {
            let x = self.propose(rng);
            let eval = evaluator.evaluate(&self.braid_of(&x));
            let energy = if eval.energy.is_finite() {
                eval.energy
            } else {
                f64::MAX
            };
            self.trials.push((x, energy));
            history.push(evaluator.best_energy());
        }
        history
    }
}
