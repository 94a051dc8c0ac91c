//! Independent random braids; the baseline every other strategy should beat.

use rand::rngs::StdRng;

use super::{SearchConfig, Strategy};
use crate::target::Evaluator;

pub struct RandomSearch {
    config: SearchConfig,
}

impl RandomSearch {
    pub fn new(config: SearchConfig) -> Self {
        Self { config }
    }
}

impl Strategy for RandomSearch {
    fn name(&self) -> &'static str {
        "random"
    }

    fn run(&mut self, evaluator: &Evaluator, rng: &mut StdRng) -> Vec<f64> {
        let mut history = Vec::new();
        while !evaluator.exhausted() {
            let braid = self.config.random_braid(rng);
            evaluator.evaluate(&braid);
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
    fn spends_the_budget() {
        let ev = Evaluator::new(
            Target::parse("signature=-100").unwrap(),
            InvariantSet::default(),
            40,
            1,
        );
        let mut rng = StdRng::seed_from_u64(1);
        let history = RandomSearch::new(SearchConfig::default()).run(&ev, &mut rng);
        assert_eq!(history.len(), 40);
        assert_eq!(ev.evaluations(), 40);
        assert!(history.windows(2).all(|w| w[1] <= w[0]));
    }

    #[test]
    fn finds_a_two_component_link() {
        let ev = Evaluator::new(
            Target::parse("components=2").unwrap(),
            InvariantSet::default(),
            500,
            1,
        );
        let mut rng = StdRng::seed_from_u64(3);
        RandomSearch::new(SearchConfig::default()).run(&ev, &mut rng);
        assert_eq!(ev.solution_count(), 1);
    }
}
