//! Monte Carlo tree search that builds a word one generator at a time.
//!
//! A node is a word prefix. Actions append σᵢ^{±1} or stop. Selection is
//! UCT; leaves are completed by a random rollout to a random length and
//! scored with reward `exp(−energy)` plus the curiosity bonus. Closures that
//! agree up to rotation share one cached evaluation.

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::Rng;
use serde::{Deserialize, Serialize};

use super::curiosity::Curiosity;
use super::{SearchConfig, Strategy};
use crate::braid::{random_generator, Braid, Generator};
use crate::target::Evaluator;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MctsConfig {
    /// UCT exploration constant.
    pub exploration: f64,
}

impl Default for MctsConfig {
    fn default() -> Self {
        Self {
            exploration: std::f64::consts::SQRT_2,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Action {
    Append(Generator),
    Stop,
}

struct Node {
    word: Vec<Generator>,
    terminal: bool,
    untried: Vec<Action>,
    children: Vec<usize>,
    visits: u32,
    total_reward: f64,
}

pub struct Mcts {
    search: SearchConfig,
    config: MctsConfig,
    curiosity: Curiosity,
    nodes: Vec<Node>,
}

impl Mcts {
    pub fn new(search: SearchConfig, config: MctsConfig, curiosity: Curiosity) -> Self {
        Self {
            search,
            config,
            curiosity,
            nodes: Vec::new(),
        }
    }

    pub fn tree_size(&self) -> usize {
        self.nodes.len()
    }

    fn actions(&self, len: usize) -> Vec<Action> {
        let (min_len, _) = self.search.length_range();
        let strands = self.search.strands.max(2);
        let mut actions: Vec<Action> = (1..strands)
            .flat_map(|i| [Generator::new(i, true), Generator::new(i, false)])
            .map(Action::Append)
            .collect();
        if len >= min_len {
            actions.push(Action::Stop);
        }
        actions
    }

    fn add_node(&mut self, word: Vec<Generator>, terminal: bool) -> usize {
        let (_, max_len) = self.search.length_range();
        let terminal = terminal || word.len() >= max_len;
        let untried = if terminal {
            Vec::new()
        } else {
            self.actions(word.len())
        };
        self.nodes.push(Node {
            word,
            terminal,
            untried,
            children: Vec::new(),
            visits: 0,
            total_reward: 0.0,
        });
        self.nodes.len() - 1
    }

    fn uct(&self, parent: usize, child: usize) -> f64 {
        let c = &self.nodes[child];
        if c.visits == 0 {
            return f64::INFINITY;
        }
        let exploit = c.total_reward / c.visits as f64;
        let parent_visits = self.nodes[parent].visits.max(1) as f64;
        exploit + self.config.exploration * (parent_visits.ln() / c.visits as f64).sqrt()
    }

    /// Descend by UCT to a node with untried actions or a terminal node.
    fn select(&self) -> Vec<usize> {
        let mut path = vec![0];
        let mut node = 0;
        while self.nodes[node].untried.is_empty() && !self.nodes[node].terminal {
            let best = self.nodes[node]
                .children
                .iter()
                .copied()
                .max_by(|&a, &b| self.uct(node, a).total_cmp(&self.uct(node, b)));
            match best {
                Some(next) => {
                    node = next;
                    path.push(node);
                }
                None => break,
            }
        }
        path
    }

    fn expand(&mut self, node: usize, rng: &mut StdRng) -> usize {
        if self.nodes[node].untried.is_empty() {
            return node;
        }
        let pick = rng.gen_range(0..self.nodes[node].untried.len());
        let action = self.nodes[node].untried.swap_remove(pick);
        let mut word = self.nodes[node].word.clone();
        let terminal = match action {
            Action::Append(g) => {
                word.push(g);
                false
            }
            Action::Stop => true,
        };
        let child = self.add_node(word, terminal);
        self.nodes[node].children.push(child);
        child
    }

    /// Complete the word at `node` to a random length and build the braid.
    fn rollout(&self, node: usize, rng: &mut StdRng) -> Braid {
        let n = &self.nodes[node];
        let mut word = n.word.clone();
        if !n.terminal {
            let (min_len, max_len) = self.search.length_range();
            let lo = min_len.max(word.len());
            let len = rng.gen_range(lo..=max_len.max(lo));
            while word.len() < len {
                word.push(random_generator(self.search.strands, rng));
            }
        }
        Braid::new(self.search.strands, word).unwrap_or_else(|_| Braid::identity(self.search.strands))
    }

    fn backpropagate(&mut self, path: &[usize], reward: f64) {
        for &id in path {
            let n = &mut self.nodes[id];
            n.visits += 1;
            n.total_reward += reward;
        }
    }

    /// Most visited path from the root, as a braid.
    pub fn principal_word(&self) -> Option<Braid> {
        if self.nodes.is_empty() {
            return None;
        }
        let mut node = 0;
        loop {
            let next = self.nodes[node]
                .children
                .iter()
                .copied()
                .max_by_key(|&c| self.nodes[c].visits);
            match next {
                Some(c) => node = c,
                None => break,
            }
        }
        Braid::new(self.search.strands, self.nodes[node].word.clone()).ok()
    }
}

impl Strategy for Mcts {
    fn name(&self) -> &'static str {
        "mcts"
    }

    fn run(&mut self, evaluator: &Evaluator, rng: &mut StdRng) -> Vec<f64> {
        self.nodes.clear();
        self.add_node(Vec::new(), false);
        self.nodes[0].untried.shuffle(rng);
        let mut history = Vec::new();

        while !evaluator.exhausted() {
            let mut path = self.select();
            let leaf = *path.last().unwrap_or(&0);
            let child = self.expand(leaf, rng);
            if child != leaf {
                path.push(child);
            }
            let braid = self.rollout(child, rng);
            let eval = evaluator.evaluate(&braid);
            let reward = match &eval.invariants {
                Some(inv) => (-eval.energy).exp() + self.curiosity.observe(&braid, inv),
                None => 0.0,
            };
            self.backpropagate(&path, reward);
            history.push(evaluator.best_energy());
        }
        tracing::debug!(
            nodes = self.nodes.len(),
            cells = self.curiosity.cells_seen(),
            "mcts finished"
        );
        history
    }
}
