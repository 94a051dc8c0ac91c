//! Replay buffer of visited braids with hindsight relabelling.
//!
//! Every braid the evaluator computes is stored with the invariants it
//! achieved and the energy it scored against the search goal. Relabelling a
//! transition with its own invariants as the goal turns it into a solved
//! example, which is what predictor training and goal-conditioned search
//! learn from. Persistence via rkyv archives.

use std::path::Path;

use rkyv::{Archive, Deserialize, Serialize};

use crate::braid::Braid;
use crate::error::{Error, Result};
use crate::invariant::{Invariants, LinkingMatrix};
use crate::poly::LaurentPoly;
use crate::target::{Constraint, Quantity, Relation, Target};

/// One visited braid.
#[derive(Archive, Serialize, Deserialize, Clone, Debug, PartialEq)]
#[rkyv(derive(Debug))]
pub struct Transition {
    pub strands: u32,
    /// Signed generators.
    pub word: Vec<i32>,
    /// Weighted distance from the goal of the run that visited it.
    pub goal_energy: f64,
    pub components: u32,
    pub signature: i32,
    pub determinant: u64,
    /// Canonical Alexander coefficients, lowest degree first.
    pub alexander: Vec<i64>,
    /// Linking matrix, row-major, `components × components`.
    pub linking: Vec<i32>,
}

impl Transition {
    pub fn new(braid: &Braid, inv: &Invariants, goal_energy: f64) -> Self {
        Self {
            strands: braid.strands() as u32,
            word: braid.signed_word(),
            goal_energy,
            components: inv.components as u32,
            signature: inv.signature,
            determinant: inv.determinant,
            alexander: inv
                .alexander
                .coeffs()
                .iter()
                .map(|&c| c.clamp(i64::MIN as i128, i64::MAX as i128) as i64)
                .collect(),
            linking: inv.linking.rows().into_iter().flatten().collect(),
        }
    }

    pub fn braid(&self) -> Result<Braid> {
        Braid::from_signed(self.strands as usize, &self.word)
    }

    pub fn is_success(&self) -> bool {
        self.goal_energy == 0.0
    }

    pub fn linking_matrix(&self) -> LinkingMatrix {
        let n = self.components as usize;
        let rows: Vec<Vec<i32>> = self
            .linking
            .chunks(n.max(1))
            .take(n)
            .map(|r| r.to_vec())
            .collect();
        LinkingMatrix::from_rows(&rows)
    }

    /// The goal this transition achieves: its own invariants. The linking
    /// clause is kept for knots too, so the goal labels every feature a
    /// predictor reads.
    pub fn hindsight_target(&self) -> Target {
        let eq = |quantity, value: i64| Constraint::Integer {
            quantity,
            relation: Relation::Eq,
            value,
        };
        let mut constraints = vec![
            eq(Quantity::Components, self.components as i64),
            eq(Quantity::Signature, self.signature as i64),
            eq(Quantity::Determinant, self.determinant.min(i64::MAX as u64) as i64),
            Constraint::Alexander(LaurentPoly::from_coeffs(
                0,
                self.alexander.iter().map(|&c| c as i128).collect(),
            )),
            Constraint::Linking(self.linking_matrix()),
        ];
        Target::new(constraints)
    }

    fn priority(&self) -> f64 {
        1.0 / (1.0 + self.goal_energy.max(0.0))
    }
}

#[derive(Archive, Serialize, Deserialize, Debug)]
struct ReplayArchive {
    capacity: u64,
    entries: Vec<Transition>,
}

/// Priority-ordered replay buffer; low goal energy is high priority.
pub struct ReplayBuffer {
    entries: Vec<(f64, Transition)>,
    capacity: usize,
}

impl ReplayBuffer {
    pub fn new(capacity: usize) -> Self {
        Self {
            entries: Vec::new(),
            capacity: capacity.max(1),
        }
    }

    /// Add a transition; over capacity the lowest-priority entry goes.
    pub fn push(&mut self, transition: Transition) {
        let priority = transition.priority();
        self.entries.push((priority, transition));
        if self.entries.len() > self.capacity {
            self.entries
                .sort_by(|a, b| b.0.partial_cmp(&a.0).unwrap_or(std::cmp::Ordering::Equal));
            self.entries.truncate(self.capacity);
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Transitions that solved the goal they were searched for.
    pub fn success_count(&self) -> usize {
        self.entries.iter().filter(|(_, t)| t.is_success()).count()
    }

    /// Up to `batch_size` transitions, highest priority first.
    pub fn sample(&self, batch_size: usize) -> Vec<&Transition> {
        let mut order: Vec<&(f64, Transition)> = self.entries.iter().collect();
        order.sort_by(|a, b| b.0.partial_cmp(&a.0).unwrap_or(std::cmp::Ordering::Equal));
        order.into_iter().take(batch_size).map(|(_, t)| t).collect()
    }

    pub fn transitions(&self) -> impl Iterator<Item = &Transition> {
        self.entries.iter().map(|(_, t)| t)
    }

    /// Every transition paired with its relabelled goal. By construction the
    /// braid satisfies the goal it is paired with.
    pub fn hindsight(&self) -> Vec<(Braid, Target)> {
        self.transitions()
            .filter_map(|t| t.braid().ok().map(|b| (b, t.hindsight_target())))
            .collect()
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        let archive = ReplayArchive {
            capacity: self.capacity as u64,
            entries: self.transitions().cloned().collect(),
        };
        let bytes = rkyv::to_bytes::<rkyv::rancor::Error>(&archive)
            .map_err(|e| Error::Archive(e.to_string()))?;
        if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
            std::fs::create_dir_all(dir)?;
        }
        std::fs::write(path, &bytes)?;
        Ok(())
    }

    pub fn load(path: &Path) -> Result<Self> {
        let raw = std::fs::read(path)?;
        let mut aligned = rkyv::util::AlignedVec::<16>::new();
        aligned.extend_from_slice(&raw);
        let archive = rkyv::from_bytes::<ReplayArchive, rkyv::rancor::Error>(&aligned)
            .map_err(|e| Error::Archive(format!("{}: {}", path.display(), e)))?;
        let mut buffer = ReplayBuffer::new(archive.capacity as usize);
        for t in archive.entries {
            buffer.push(t);
        }
        Ok(buffer)
    }

    /// Load `path` if it exists, otherwise start empty.
    pub fn open(path: &Path, capacity: usize) -> Result<Self> {
        if path.exists() {
            let mut buffer = Self::load(path)?;
            buffer.capacity = capacity.max(buffer.len()).max(1);
            Ok(buffer)
        } else {
            Ok(Self::new(capacity))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::braid::catalog;
    use crate::invariant::{self, InvariantSet};

    fn transition(name: &str, energy: f64) -> Transition {
        let b = catalog::lookup(name).unwrap();
        let inv = invariant::compute(&b, &InvariantSet::default()).unwrap();
        Transition::new(&b, &inv, energy)
    }

    #[test]
    fn capacity_keeps_best() {
        let mut buf = ReplayBuffer::new(3);
        for (i, name) in ["3_1", "4_1", "5_1", "5_2", "6_1"].iter().enumerate() {
            buf.push(transition(name, i as f64));
        }
        assert_eq!(buf.len(), 3);
        let energies: Vec<f64> = buf.sample(3).iter().map(|t| t.goal_energy).collect();
        assert_eq!(energies, vec![0.0, 1.0, 2.0]);
    }

    #[test]
    fn success_count() {
        let mut buf = ReplayBuffer::new(10);
        buf.push(transition("3_1", 0.0));
        buf.push(transition("4_1", 3.5));
        buf.push(transition("L2a1", 0.0));
        assert_eq!(buf.success_count(), 2);
    }

    #[test]
    fn hindsight_goals_are_satisfied() {
        let mut buf = ReplayBuffer::new(10);
        for name in ["3_1", "4_1", "L2a1", "L6a4"] {
            buf.push(transition(name, 7.0));
        }
        for (braid, goal) in buf.hindsight() {
            let inv = invariant::compute(&braid, &InvariantSet::default()).unwrap();
            assert!(goal.is_satisfied(&inv), "{} misses {}", braid, goal);
            assert_eq!(goal.pinned_linking(), Some(&inv.linking));
        }
    }

    #[test]
    fn save_and_load_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("replay").join("buffer.rkyv");
        let mut buf = ReplayBuffer::new(8);
        buf.push(transition("5_2", 0.0));
        buf.push(transition("L4a1", 2.0));
        buf.save(&path).unwrap();

        let loaded = ReplayBuffer::load(&path).unwrap();
        assert_eq!(loaded.capacity(), 8);
        let a: Vec<_> = buf.sample(8).into_iter().cloned().collect();
        let b: Vec<_> = loaded.sample(8).into_iter().cloned().collect();
        assert_eq!(a, b);
    }

    #[test]
    fn open_missing_file_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let buf = ReplayBuffer::open(&dir.path().join("none.rkyv"), 4).unwrap();
        assert!(buf.is_empty());
        assert_eq!(buf.capacity(), 4);
    }

    #[test]
    fn corrupt_archive_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bad.rkyv");
        std::fs::write(&path, b"not an archive").unwrap();
        assert!(matches!(ReplayBuffer::load(&path), Err(Error::Archive(_))));
    }
}
