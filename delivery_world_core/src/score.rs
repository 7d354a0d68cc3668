use serde::{Deserialize, Serialize};

/// Outcome of one episode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Episode {
    pub solved: bool,
    pub total_cost: u64,
    pub steps: usize,
}

/// Aggregate over many episodes. Owned by the caller and updated after each
/// episode; lower cost is better.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Score {
    best_cost: Option<u64>,
    worst_cost: Option<u64>,
    total_cost: u64,
    runs: usize,
    wins: usize,
}

impl Score {
    pub fn new() -> Self {
        Self::default()
    }

    /// Folds one episode in. Best and worst only consider solved episodes.
    pub fn record(&mut self, episode: &Episode) {
        self.runs += 1;
        self.total_cost += episode.total_cost;
        if episode.solved {
            self.wins += 1;
            self.best_cost = Some(
                self.best_cost
                    .map_or(episode.total_cost, |best| best.min(episode.total_cost)),
            );
            self.worst_cost = Some(
                self.worst_cost
                    .map_or(episode.total_cost, |worst| worst.max(episode.total_cost)),
            );
        }
    }

    pub fn best_cost(&self) -> Option<u64> {
        self.best_cost
    }

    pub fn worst_cost(&self) -> Option<u64> {
        self.worst_cost
    }

    pub fn total_cost(&self) -> u64 {
        self.total_cost
    }

    pub fn runs(&self) -> usize {
        self.runs
    }

    pub fn wins(&self) -> usize {
        self.wins
    }

    /// Mean cost per episode, `None` before the first run.
    pub fn average_cost(&self) -> Option<f64> {
        (self.runs > 0).then(|| self.total_cost as f64 / self.runs as f64)
    }

    /// Percentage of solved episodes, rounded to two decimals.
    pub fn success_rate(&self) -> f64 {
        if self.runs == 0 {
            return 0.0;
        }
        let rate = self.wins as f64 / self.runs as f64 * 100.0;
        (rate * 100.0).round() / 100.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn episode(solved: bool, total_cost: u64) -> Episode {
        Episode {
            solved,
            total_cost,
            steps: total_cost as usize,
        }
    }

    #[test]
    fn empty_score() {
        let score = Score::new();
        assert_eq!(score.runs(), 0);
        assert_eq!(score.average_cost(), None);
        assert_eq!(score.success_rate(), 0.0);
        assert_eq!(score.best_cost(), None);
    }

    #[test]
    fn aggregates_episodes() {
        let mut score = Score::new();
        score.record(&episode(true, 30));
        score.record(&episode(true, 24));
        score.record(&episode(false, 3));
        score.record(&episode(true, 41));

        assert_eq!(score.runs(), 4);
        assert_eq!(score.wins(), 3);
        assert_eq!(score.best_cost(), Some(24));
        assert_eq!(score.worst_cost(), Some(41));
        assert_eq!(score.total_cost(), 98);
        assert_eq!(score.average_cost(), Some(24.5));
        assert_eq!(score.success_rate(), 75.0);
    }

    #[test]
    fn success_rate_rounds() {
        let mut score = Score::new();
        score.record(&episode(true, 1));
        score.record(&episode(false, 1));
        score.record(&episode(false, 1));
        assert_eq!(score.success_rate(), 33.33);
    }
}
