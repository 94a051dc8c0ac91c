use std::path::{Path, PathBuf};
use std::process;

use clap::Args;
use knotgen::search::{self, Curiosity, ReplayBuffer, SearchOutcome, StrategyKind};
use knotgen::target::build_target;
use knotgen::{neural, Evaluator};

#[derive(Args)]
pub struct SearchArgs {
    /// Target clauses, e.g. `components=1; signature=-4` (repeatable)
    #[arg(short, long)]
    pub target: Vec<String>,
    /// Start from the invariants of a catalogue entry
    #[arg(long, value_name = "NAME")]
    pub like: Option<String>,
    /// random, anneal, genetic, mcts or tpe
    #[arg(short, long, default_value = "anneal")]
    pub strategy: String,
    /// Evaluation budget
    #[arg(short, long)]
    pub budget: Option<usize>,
    #[arg(long)]
    pub seed: Option<u64>,
    #[arg(long)]
    pub strands: Option<usize>,
    /// Longest braid word tried
    #[arg(long)]
    pub max_length: Option<usize>,
    /// Stop after this many distinct solutions
    #[arg(long)]
    pub solutions: Option<usize>,
    /// Compute Jones for every candidate even without a Jones clause
    #[arg(long)]
    pub jones: bool,
    /// Append visited braids to this replay archive
    #[arg(long, value_name = "PATH")]
    pub replay: Option<PathBuf>,
    /// Predictor checkpoint for the curiosity bonus
    #[arg(long, value_name = "DIR")]
    pub predictor: Option<PathBuf>,
    /// Run the predictor on the GPU
    #[arg(long)]
    pub gpu: bool,
    /// Print the outcome as JSON
    #[arg(long)]
    pub json: bool,
}

pub fn cmd_search(args: SearchArgs, config: Option<&Path>) {
    let mut config = super::load_config(config);
    if let Some(b) = args.budget {
        config.search.budget = b;
    }
    if let Some(s) = args.seed {
        config.search.seed = s;
    }
    if let Some(n) = args.strands {
        config.search.strands = n;
    }
    if let Some(m) = args.max_length {
        config.search.max_length = m;
    }
    if let Some(n) = args.solutions {
        config.search.max_solutions = n;
    }
    if args.jones {
        config.invariants.jones = true;
    }

    let kind: StrategyKind = match args.strategy.parse() {
        Ok(k) => k,
        Err(e) => super::fail(e, "<strategy>", &args.strategy),
    };

    let clauses = args.target.join("; ");
    let target = match build_target(&clauses, args.like.as_deref(), &config.invariants) {
        Ok(t) => t
            .with_weights(config.weights.clone())
            .with_length_penalty(config.search.length_penalty),
        Err(e) => super::fail(e, "<target>", &clauses),
    };
    if target.is_empty() {
        eprintln!("error: nothing to search for; pass --target or --like");
        process::exit(1);
    }

    let mut evaluator = Evaluator::new(
        target,
        config.invariants,
        config.search.budget,
        config.search.max_solutions,
    );
    if let Some(path) = &args.replay {
        match ReplayBuffer::open(path, config.replay.capacity) {
            Ok(buffer) => evaluator = evaluator.with_replay(buffer),
            Err(e) => super::fail(e, "<replay>", ""),
        }
    }

    let mut curiosity = Curiosity::new(config.curiosity.clone());
    if let Some(dir) = &args.predictor {
        match neural::load_signature_model(dir, args.gpu) {
            Ok(model) => curiosity = curiosity.with_model(model),
            Err(e) => super::fail(e, "<predictor>", ""),
        }
    }

    let outcome = search::run_search(
        kind,
        &config.search,
        &config.strategies,
        curiosity,
        &evaluator,
    );

    if let Some(path) = &args.replay {
        if let Some(buffer) = evaluator.into_replay() {
            if let Err(e) = buffer.save(path) {
                super::fail(e, "<replay>", "");
            }
            tracing::info!(
                path = %path.display(),
                transitions = buffer.len(),
                successes = buffer.success_count(),
                "replay archive written"
            );
        }
    }

    if args.json {
        match serde_json::to_string_pretty(&outcome) {
            Ok(s) => println!("{}", s),
            Err(e) => {
                eprintln!("error: {}", e);
                process::exit(1);
            }
        }
    } else {
        print_outcome(&outcome);
    }
}

fn print_outcome(outcome: &SearchOutcome) {
    println!("target       {}", outcome.target);
    println!("strategy     {}", outcome.strategy);
    println!(
        "evaluations  {} ({} computed) in {} ms",
        outcome.evaluations, outcome.computed, outcome.elapsed_ms
    );
    if let Some(stats) = &outcome.stats {
        println!(
            "energy       best {:.4}  mean {:.4}  median {:.4}  sd {:.4}",
            stats.min, stats.mean, stats.median, stats.std_dev
        );
    }
    if !outcome.solved() {
        match &outcome.best {
            Some(b) => println!("no solution; closest {} (energy {:.4})", b, outcome.best_energy),
            None => println!("no solution"),
        }
        return;
    }
    println!();
    for s in &outcome.solutions {
        println!(
            "{}  [{}]  strands {}  crossings {}  det {}  sig {}",
            s.word,
            &s.braid.id()[..16],
            s.braid.strands(),
            s.invariants.crossings,
            s.invariants.determinant,
            s.invariants.signature
        );
    }
}
