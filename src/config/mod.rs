//! `knotgen.toml`: run settings, every section optional.
//!
//! ```toml
//! [search]
//! budget = 50000
//! strands = 4
//!
//! [anneal]
//! t_start = 3.0
//!
//! [weights]
//! signature = 2.0
//! ```

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::invariant::InvariantSet;
use crate::neural::NeuralConfig;
use crate::search::{CuriosityConfig, SearchConfig, StrategyConfigs};
use crate::target::Weights;

pub const FILE_NAME: &str = "knotgen.toml";

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReplayConfig {
    /// Transitions kept in the archive, lowest energy first.
    pub capacity: usize,
}

impl Default for ReplayConfig {
    fn default() -> Self {
        Self { capacity: 50_000 }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub search: SearchConfig,
    #[serde(flatten)]
    pub strategies: StrategyConfigs,
    pub invariants: InvariantSet,
    pub weights: Weights,
    pub curiosity: CuriosityConfig,
    pub replay: ReplayConfig,
    pub neural: NeuralConfig,
}

impl Config {
    pub fn parse(contents: &str) -> Result<Self> {
        toml::from_str(contents).map_err(|e| Error::Config(e.to_string()))
    }

    /// Load an explicit file; a missing file is an error.
    pub fn load(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .map_err(|e| Error::Config(format!("cannot read '{}': {e}", path.display())))?;
        Self::parse(&contents).map_err(|e| match e {
            Error::Config(msg) => Error::Config(format!("{}: {msg}", path.display())),
            other => other,
        })
    }

    /// Walk up from `start_dir` looking for `knotgen.toml`.
    pub fn find(start_dir: &Path) -> Option<PathBuf> {
        let mut dir = start_dir.to_path_buf();
        loop {
            let candidate = dir.join(FILE_NAME);
            if candidate.exists() {
                return Some(candidate);
            }
            if !dir.pop() {
                return None;
            }
        }
    }

    /// The explicit file if given, else the nearest `knotgen.toml` above
    /// the working directory, else defaults.
    pub fn discover(explicit: Option<&Path>) -> Result<Self> {
        if let Some(path) = explicit {
            return Self::load(path);
        }
        let cwd = std::env::current_dir().unwrap_or_else(|_| PathBuf::from("."));
        match Self::find(&cwd) {
            Some(path) => {
                tracing::debug!(path = %path.display(), "using config file");
                Self::load(&path)
            }
            None => Ok(Self::default()),
        }
    }

    pub fn to_toml(&self) -> Result<String> {
        toml::to_string_pretty(self).map_err(|e| Error::Config(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::neural::ModelKind;
    use std::fs;

    #[test]
    fn empty_file_is_all_defaults() {
        assert_eq!(Config::parse("").unwrap(), Config::default());
    }

    #[test]
    fn sections_override_defaults() {
        let cfg = Config::parse(
            r#"
[search]
budget = 123
strands = 4

[anneal]
t_start = 5.0

[tpe]
gamma = 0.3

[invariants]
jones = true

[weights]
signature = 2.5

[neural]
model = "cnn"
"#,
        )
        .unwrap();
        assert_eq!(cfg.search.budget, 123);
        assert_eq!(cfg.search.strands, 4);
        assert_eq!(cfg.search.max_length, SearchConfig::default().max_length);
        assert_eq!(cfg.strategies.anneal.t_start, 5.0);
        assert_eq!(cfg.strategies.tpe.gamma, 0.3);
        assert!(cfg.invariants.jones);
        assert_eq!(cfg.weights.signature, 2.5);
        assert_eq!(cfg.neural.model, ModelKind::Cnn);
    }

    #[test]
    fn bad_toml_is_a_config_error() {
        assert!(matches!(
            Config::parse("[search]\nbudget = \"lots\""),
            Err(Error::Config(_))
        ));
    }

    #[test]
    fn find_walks_up() {
        let dir = tempfile::tempdir().unwrap();
        let nested = dir.path().join("a").join("b");
        fs::create_dir_all(&nested).unwrap();
        assert_eq!(Config::find(&nested), None);

        let file = dir.path().join(FILE_NAME);
        fs::write(&file, "[search]\nseed = 9\n").unwrap();
        assert_eq!(Config::find(&nested), Some(file.clone()));
        assert_eq!(Config::load(&file).unwrap().search.seed, 9);
    }

    #[test]
    fn explicit_missing_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("nope.toml");
        assert!(matches!(
            Config::discover(Some(&missing)),
            Err(Error::Config(_))
        ));
    }

    #[test]
    fn written_config_reads_back() {
        let mut cfg = Config::default();
        cfg.search.budget = 77;
        cfg.strategies.genetic.population = 10;
        let text = cfg.to_toml().unwrap();
        assert_eq!(Config::parse(&text).unwrap(), cfg);
    }
}
