use std::collections::VecDeque;

use tracing::{info, warn};

use crate::{
    environment::Environment,
    model::{Action, TransitionModel},
    score::Episode,
    search::{SearchConfig, SearchOutcome, SearchStats, search},
    state::State,
};

/// Trait defining the behavior of an agent.
/// Agents decide which action to take based on the current state.
pub trait Agent {
    /// The next action, or `None` when the agent has nothing left to do.
    fn get_action(&mut self, state: &State) -> Option<Action>;
}

/// Plans a complete action sequence with best-first search, then plays it
/// back one action per call.
#[derive(Debug)]
pub struct PlanningAgent {
    model: TransitionModel,
    config: SearchConfig,
    current_plan: VecDeque<Action>,
    last_stats: Option<SearchStats>,
    gave_up: bool,
}

impl PlanningAgent {
    pub fn new(model: TransitionModel, config: SearchConfig) -> Self {
        PlanningAgent {
            model,
            config,
            current_plan: VecDeque::new(),
            last_stats: None,
            gave_up: false,
        }
    }

    /// Searches from `state` and replaces the current plan.
    ///
    /// Returns whether a plan was found. An unsuccessful search leaves the
    /// agent idle until [`PlanningAgent::reset`].
    pub fn plan(&mut self, state: &State) -> bool {
        let report = search(&self.model, state.clone(), &self.config);
        self.last_stats = Some(report.stats);
        self.current_plan.clear();
        match &report.outcome {
            SearchOutcome::Found(node) => {
                self.current_plan.extend(node.path());
                self.gave_up = false;
                true
            }
            SearchOutcome::Exhausted | SearchOutcome::BudgetExceeded => {
                warn!(
                    strategy = %self.config.strategy,
                    expanded = report.stats.expanded,
                    "no plan found"
                );
                self.gave_up = true;
                false
            }
        }
    }

    /// Forgets the current plan so the next call searches again.
    pub fn reset(&mut self) {
        self.current_plan.clear();
        self.last_stats = None;
        self.gave_up = false;
    }

    pub fn remaining_plan(&self) -> impl Iterator<Item = &Action> {
        self.current_plan.iter()
    }

    /// Statistics of the most recent search.
    pub fn last_stats(&self) -> Option<SearchStats> {
        self.last_stats
    }
}

impl Agent for PlanningAgent {
    fn get_action(&mut self, state: &State) -> Option<Action> {
        if self.current_plan.is_empty() && !self.gave_up && !self.model.goal_test(state) {
            self.plan(state);
        }
        self.current_plan.pop_front()
    }
}

/// Lets `agent` drive `env` until the goal holds, the agent stops, or
/// `max_steps` actions have been taken.
pub fn run_episode(env: &mut Environment, agent: &mut dyn Agent, max_steps: usize) -> Episode {
    let mut episode = Episode::default();
    while episode.steps < max_steps && !env.is_done() {
        let Some(action) = agent.get_action(env.state()) else {
            break;
        };
        let step = env.step(action);
        episode.steps += 1;
        episode.total_cost += u64::from(step.cost);
    }
    episode.solved = env.is_done();

    if episode.solved {
        info!(
            steps = episode.steps,
            total_cost = episode.total_cost,
            "episode solved"
        );
    } else {
        warn!(
            steps = episode.steps,
            total_cost = episode.total_cost,
            "episode ended before the goal"
        );
    }
    episode
}
