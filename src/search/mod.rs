//! Search strategies that generate braids meeting a target.
//!
//! Each strategy proposes braids and scores them through a shared
//! [`Evaluator`]; the evaluator enforces the budget and collects solutions,
//! so a strategy only decides *what* to try next.

pub mod anneal;
pub mod curiosity;
pub mod genetic;
pub mod mcts;
pub mod random;
pub mod replay;
pub mod tpe;

use std::fmt;
use std::str::FromStr;
use std::time::Instant;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use statrs::statistics::{Data, Median, Statistics};

use crate::braid::moves::MoveWeights;
use crate::braid::Braid;
use crate::error::{Error, Result};
use crate::target::evaluator::Solution;
use crate::target::Evaluator;

pub use anneal::{AnnealConfig, Annealing};
pub use curiosity::{Curiosity, CuriosityConfig, SignatureModel};
pub use genetic::{Genetic, GeneticConfig};
pub use mcts::{Mcts, MctsConfig};
pub use random::RandomSearch;
pub use replay::{ReplayBuffer, Transition};
pub use tpe::{Tpe, TpeConfig};

/// Shape of the braids every strategy explores.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchConfig {
    /// Evaluation budget.
    pub budget: usize,
    pub seed: u64,
    /// Stop early after this many distinct solutions.
    pub max_solutions: usize,
    pub strands: usize,
    pub min_length: usize,
    pub max_length: usize,
    /// Energy per crossing.
    pub length_penalty: f64,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            budget: 20_000,
            seed: 0,
            max_solutions: 5,
            strands: 3,
            min_length: 2,
            max_length: 16,
            length_penalty: 0.01,
        }
    }
}

impl SearchConfig {
    /// A random word with length drawn uniformly from the configured range.
    pub fn random_braid<R: Rng + ?Sized>(&self, rng: &mut R) -> Braid {
        let (lo, hi) = self.length_range();
        let len = rng.gen_range(lo..=hi);
        Braid::random(self.strands, len, rng)
    }

    /// (min, max) with min ≤ max and max ≥ 1.
    pub fn length_range(&self) -> (usize, usize) {
        let hi = self.max_length.max(1);
        (self.min_length.min(hi), hi)
    }

    pub fn move_weights(&self) -> MoveWeights {
        MoveWeights::default()
    }
}

/// A generation strategy.
pub trait Strategy {
    fn name(&self) -> &'static str;

    /// Run until the evaluator is exhausted. Returns the best energy seen
    /// after each iteration.
    fn run(&mut self, evaluator: &Evaluator, rng: &mut StdRng) -> Vec<f64>;
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StrategyKind {
    Random,
    Anneal,
    Genetic,
    Mcts,
    Tpe,
}

impl StrategyKind {
    pub const ALL: [StrategyKind; 5] = [
        StrategyKind::Random,
        StrategyKind::Anneal,
        StrategyKind::Genetic,
        StrategyKind::Mcts,
        StrategyKind::Tpe,
    ];

    pub fn name(self) -> &'static str {
        match self {
            StrategyKind::Random => "random",
            StrategyKind::Anneal => "anneal",
            StrategyKind::Genetic => "genetic",
            StrategyKind::Mcts => "mcts",
            StrategyKind::Tpe => "tpe",
        }
    }
}

impl FromStr for StrategyKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "random" => Ok(StrategyKind::Random),
            "anneal" | "annealing" | "sa" => Ok(StrategyKind::Anneal),
            "genetic" | "ga" => Ok(StrategyKind::Genetic),
            "mcts" => Ok(StrategyKind::Mcts),
            "tpe" | "bayes" => Ok(StrategyKind::Tpe),
            _ => Err(Error::UnknownStrategy(s.to_string())),
        }
    }
}

impl fmt::Display for StrategyKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Per-strategy settings, one section each in the config file.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StrategyConfigs {
    pub anneal: AnnealConfig,
    pub genetic: GeneticConfig,
    pub mcts: MctsConfig,
    pub tpe: TpeConfig,
}

/// Instantiate a strategy. `curiosity` is only used by MCTS.
pub fn build_strategy(
    kind: StrategyKind,
    search: &SearchConfig,
    configs: &StrategyConfigs,
    curiosity: Curiosity,
) -> Box<dyn Strategy> {
    match kind {
        StrategyKind::Random => Box::new(RandomSearch::new(search.clone())),
        StrategyKind::Anneal => Box::new(Annealing::new(search.clone(), configs.anneal.clone())),
        StrategyKind::Genetic => Box::new(Genetic::new(search.clone(), configs.genetic.clone())),
        StrategyKind::Mcts => Box::new(Mcts::new(
            search.clone(),
            configs.mcts.clone(),
            curiosity,
        )),
        StrategyKind::Tpe => Box::new(Tpe::new(search.clone(), configs.tpe.clone())),
    }
}

/// Summary statistics of a run's energy history.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct EnergyStats {
    pub min: f64,
    pub mean: f64,
    pub median: f64,
    pub std_dev: f64,
}

impl EnergyStats {
    /// Statistics over the finite entries; `None` if there are none.
    pub fn from_history(history: &[f64]) -> Option<Self> {
        let finite: Vec<f64> = history.iter().copied().filter(|e| e.is_finite()).collect();
        if finite.is_empty() {
            return None;
        }
        let std_dev = if finite.len() > 1 {
            Statistics::std_dev(&finite)
        } else {
            0.0
        };
        Some(Self {
            min: finite.iter().copied().fold(f64::INFINITY, f64::min),
            mean: Statistics::mean(&finite),
            median: Data::new(finite.clone()).median(),
            std_dev,
        })
    }
}

/// Result of a search run.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SearchOutcome {
    pub strategy: StrategyKind,
    pub target: String,
    pub solutions: Vec<Solution>,
    pub best: Option<Braid>,
    pub best_energy: f64,
    pub evaluations: usize,
    pub computed: usize,
    /// Best energy after each iteration.
    pub history: Vec<f64>,
    pub stats: Option<EnergyStats>,
    pub elapsed_ms: u64,
}

impl SearchOutcome {
    pub fn solved(&self) -> bool {
        !self.solutions.is_empty()
    }
}

/// Run one strategy to exhaustion of `evaluator`.
pub fn run_search(
    kind: StrategyKind,
    search: &SearchConfig,
    configs: &StrategyConfigs,
    curiosity: Curiosity,
    evaluator: &Evaluator,
) -> SearchOutcome {
    let mut rng = StdRng::seed_from_u64(search.seed);
    let mut strategy = build_strategy(kind, search, configs, curiosity);
    tracing::info!(
        strategy = strategy.name(),
        target = %evaluator.target(),
        budget = evaluator.budget(),
        "search started"
    );
    let start = Instant::now();
    let history = strategy.run(evaluator, &mut rng);
    let elapsed_ms = start.elapsed().as_millis() as u64;

    let best = evaluator.best();
    let outcome = SearchOutcome {
        strategy: kind,
        target: evaluator.target().to_string(),
        solutions: evaluator.solutions(),
        best_energy: best.as_ref().map_or(f64::INFINITY, |(e, _)| *e),
        best: best.map(|(_, b)| b),
        evaluations: evaluator.evaluations(),
        computed: evaluator.computed(),
        stats: EnergyStats::from_history(&history),
        history,
        elapsed_ms,
    };
    tracing::info!(
        solutions = outcome.solutions.len(),
        best_energy = outcome.best_energy,
        evaluations = outcome.evaluations,
        elapsed_ms,
        "search finished"
    );
    outcome
}
