//! Invariants of braid closures.
//!
//! Everything here is exact integer arithmetic. `compute` is the single
//! entry point used by the evaluator, the CLI and dataset generation.

pub mod alexander;
pub mod jones;
pub mod linking;
pub mod seifert;

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::braid::Braid;
use crate::error::Result;
use crate::poly::LaurentPoly;

pub use linking::LinkingMatrix;
pub use seifert::SeifertMatrix;

/// Which invariants to compute. Everything except Jones is polynomial time.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct InvariantSet {
    pub jones: bool,
    /// Clamped to `jones::HARD_MAX_CROSSINGS`.
    pub max_jones_crossings: usize,
}

impl Default for InvariantSet {
    fn default() -> Self {
        Self {
            jones: false,
            max_jones_crossings: jones::DEFAULT_MAX_CROSSINGS,
        }
    }
}

impl InvariantSet {
    pub fn with_jones(mut self, jones: bool) -> Self {
        self.jones = jones;
        self
    }
}

/// Invariants of one braid closure.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Invariants {
    pub strands: usize,
    pub crossings: usize,
    pub writhe: i32,
    pub components: usize,
    pub linking: LinkingMatrix,
    /// Canonical form: lowest exponent 0, positive lowest coefficient.
    pub alexander: LaurentPoly,
    pub determinant: u64,
    pub signature: i32,
    /// Genus of the braid's Seifert surface; `None` for split closures.
    pub genus: Option<u32>,
    /// Exponents in units of t^(1/2).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub jones: Option<LaurentPoly>,
}

pub fn compute(braid: &Braid, set: &InvariantSet) -> Result<Invariants> {
    let reduced = braid.free_reduce();
    let alexander = alexander::alexander(&reduced)?;
    let determinant = u64::try_from(alexander::determinant(&alexander)).unwrap_or(u64::MAX);
    let signature = SeifertMatrix::from_braid(&reduced).signature()?;
    let jones = if set.jones {
        Some(jones::jones(&reduced, set.max_jones_crossings)?)
    } else {
        None
    };
    Ok(Invariants {
        strands: braid.strands(),
        crossings: braid.crossings(),
        writhe: braid.writhe(),
        components: braid.component_count(),
        linking: LinkingMatrix::from_braid(braid),
        alexander,
        determinant,
        signature,
        genus: seifert::genus_bound(&reduced),
        jones,
    })
}

impl Invariants {
    /// Coarse cell used for novelty counting: components, signature and a
    /// logarithmic determinant bucket.
    pub fn cell(&self) -> (usize, i32, u32) {
        let bucket = if self.determinant == 0 {
            0
        } else {
            64 - self.determinant.leading_zeros()
        };
        (self.components, self.signature, bucket)
    }

    pub fn is_knot(&self) -> bool {
        self.components == 1
    }
}

impl fmt::Display for Invariants {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "strands      {}", self.strands)?;
        writeln!(f, "crossings    {}", self.crossings)?;
        writeln!(f, "writhe       {}", self.writhe)?;
        writeln!(f, "components   {}", self.components)?;
        if self.components > 1 {
            let rows: Vec<String> = self
                .linking
                .rows()
                .iter()
                .map(|r| format!("{:?}", r))
                .collect();
            writeln!(f, "linking      {}", rows.join(" "))?;
        }
        writeln!(
            f,
            "alexander    {}",
            alexander::symmetrized(&self.alexander)
        )?;
        writeln!(f, "determinant  {}", self.determinant)?;
        writeln!(f, "signature    {}", self.signature)?;
        match self.genus {
            Some(g) => writeln!(f, "genus        <= {}", g)?,
            None => writeln!(f, "genus        - (split)")?,
        }
        if let Some(j) = &self.jones {
            writeln!(f, "jones        {}", j.display_with("t", true))?;
        }
        Ok(())
    }
}
