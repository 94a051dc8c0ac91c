//! Genetic search over braid words.
//!
//! Population of words. Survivors are the top quarter, the best is kept
//! unchanged, children come from one-point crossover of two survivors
//! followed by random edit moves. The mutation rate adapts: it decays on
//! improvement and grows after five stale generations. Fitness is
//! evaluated in parallel.

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::Rng;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use super::{SearchConfig, Strategy};
use crate::braid::moves::random_neighbor;
use crate::braid::Braid;
use crate::target::{Evaluation, Evaluator};

/// Generations without improvement before the mutation rate grows.
const PLATEAU: u64 = 5;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneticConfig {
    pub population: usize,
    /// Initial probability of each extra mutation step.
    pub mutation_rate: f64,
    /// Extra mutation steps per child at most.
    pub max_mutations: usize,
}

impl Default for GeneticConfig {
    fn default() -> Self {
        Self {
            population: 48,
            mutation_rate: 0.4,
            max_mutations: 3,
        }
    }
}

pub struct Genetic {
    search: SearchConfig,
    config: GeneticConfig,
    generation: u64,
    best_energy: f64,
    mutation_rate: f64,
    stale_count: u64,
}

impl Genetic {
    pub fn new(search: SearchConfig, config: GeneticConfig) -> Self {
        let mutation_rate = config.mutation_rate;
        Self {
            search,
            config,
            generation: 0,
            best_energy: f64::INFINITY,
            mutation_rate,
            stale_count: 0,
        }
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn mutation_rate(&self) -> f64 {
        self.mutation_rate
    }

    /// Adapt the mutation rate to the best energy of a new generation.
    pub fn adapt(&mut self, generation_best: f64) {
        let base = self.config.mutation_rate;
        if generation_best < self.best_energy {
            self.best_energy = generation_best;
            self.stale_count = 0;
            self.mutation_rate = (self.mutation_rate * 0.9).max(base * 0.5);
        } else {
            self.stale_count += 1;
            if self.stale_count >= PLATEAU {
                self.mutation_rate = (self.mutation_rate * 1.3).min(1.0);
            }
        }
    }

    fn breed(&self, survivors: &[Braid], rng: &mut StdRng) -> Vec<Braid> {
        let size = self.config.population.max(4);
        let (_, max_len) = self.search.length_range();
        let weights = self.search.move_weights();

        // elitism: the best goes through unchanged
        let mut children = vec![survivors[0].clone()];
        while children.len() < size {
            let (Some(a), Some(b)) = (survivors.choose(rng), survivors.choose(rng)) else {
                break;
            };
            let mut child = crossover(a, b, max_len, rng);
            let (_, mutated) = random_neighbor(&child, &weights, max_len, rng);
            child = mutated;
            for _ in 0..self.config.max_mutations {
                if rng.gen::<f64>() >= self.mutation_rate {
                    break;
                }
                let (_, mutated) = random_neighbor(&child, &weights, max_len, rng);
                child = mutated;
            }
            children.push(child);
        }
        children
    }
}

/// One-point crossover: a prefix of `a` followed by a suffix of `b`.
pub fn crossover<R: Rng + ?Sized>(a: &Braid, b: &Braid, max_len: usize, rng: &mut R) -> Braid {
    let i = rng.gen_range(0..=a.len());
    let j = rng.gen_range(0..=b.len());
    let mut word = a.word()[..i].to_vec();
    word.extend_from_slice(&b.word()[j..]);
    word.truncate(max_len.max(1));
    let strands = a.strands().max(b.strands());
    Braid::new(strands, word).unwrap_or_else(|_| a.clone())
}

impl Strategy for Genetic {
    fn name(&self) -> &'static str {
        "genetic"
    }

    fn run(&mut self, evaluator: &Evaluator, rng: &mut StdRng) -> Vec<f64> {
        let size = self.config.population.max(4);
        let survivors = (size / 4).max(1);
        let mut population: Vec<Braid> =
            (0..size).map(|_| self.search.random_braid(rng)).collect();
        let mut history = Vec::new();

        while !evaluator.exhausted() {
            let mut scored: Vec<Evaluation> =
                population.par_iter().map(|b| evaluator.evaluate(b)).collect();
            scored.sort_by(|a, b| a.energy.total_cmp(&b.energy));

            let generation_best = scored.first().map_or(f64::INFINITY, |e| e.energy);
            self.adapt(generation_best);
            tracing::debug!(
                generation = self.generation,
                best = generation_best,
                mutation_rate = self.mutation_rate,
                "generation evaluated"
            );

            let parents: Vec<Braid> = scored
                .into_iter()
                .take(survivors)
                .map(|e| e.braid)
                .collect();
            population = self.breed(&parents, rng);
            self.generation += 1;
            history.push(evaluator.best_energy());
        }
        history
    }
}
