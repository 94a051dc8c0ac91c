//! Generate knots and links, as closed braids, whose invariants match a
//! prescribed target.
//!
//! ```ignore
//! let inv = knotgen::invariants_of("1 -2 1 -2", &InvariantSet::default())?;
//! assert_eq!(inv.determinant, 5);
//!
//! let outcome = knotgen::generate("components=1; signature=-4", StrategyKind::Anneal, &Config::default())?;
//! ```

pub mod braid;
pub mod config;
pub mod diagnostic;
pub mod error;
pub mod invariant;
pub mod neural;
pub mod poly;
pub mod search;
pub mod span;
pub mod target;

pub use braid::{Braid, Generator};
pub use config::Config;
pub use error::{Error, Result};
pub use invariant::{InvariantSet, Invariants};
pub use poly::LaurentPoly;
pub use search::{SearchOutcome, StrategyKind};
pub use target::{Evaluator, Target};

use search::Curiosity;

/// Parse a braid word and compute its invariants.
pub fn invariants_of(text: &str, set: &InvariantSet) -> Result<Invariants> {
    let braid = braid::notation::parse_braid(text)?;
    invariant::compute(&braid, set)
}

/// Run one strategy against a target written in the target language.
pub fn generate(target: &str, strategy: StrategyKind, config: &Config) -> Result<SearchOutcome> {
    let target = Target::parse(target)?
        .with_weights(config.weights.clone())
        .with_length_penalty(config.search.length_penalty);
    let evaluator = Evaluator::new(
        target,
        config.invariants,
        config.search.budget,
        config.search.max_solutions,
    );
    let curiosity = Curiosity::new(config.curiosity.clone());
    Ok(search::run_search(
        strategy,
        &config.search,
        &config.strategies,
        curiosity,
        &evaluator,
    ))
}
