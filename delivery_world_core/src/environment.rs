use rand::{SeedableRng, rngs::StdRng};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::{
    layout::{Layout, LayoutError},
    model::{Action, Goal, ModelError, TransitionModel},
    state::{Observation, State},
};

/// What one call to [`Environment::step`] reports.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Step {
    pub observation: Observation,
    pub cost: u32,
    pub done: bool,
}

/// Hosts a live episode: owns the current state and advances it one action
/// at a time through the transition model.
#[derive(Debug, Clone)]
pub struct Environment {
    layout: Layout,
    model: TransitionModel,
    rng: StdRng,
    state: State,
    last_action: Option<Action>,
    total_cost: u64,
}

impl Environment {
    /// Creates an environment and spawns its first episode from `seed`.
    pub fn new(layout: Layout, goal: Goal, seed: u64) -> Result<Self, LayoutError> {
        let mut rng = StdRng::seed_from_u64(seed);
        let state = layout.spawn(&mut rng)?;
        Ok(Environment {
            layout,
            model: TransitionModel::new(goal),
            rng,
            state,
            last_action: None,
            total_cost: 0,
        })
    }

    /// Starts a new episode with fresh random destination homes and pending
    /// order.
    pub fn reset(&mut self) -> Result<Observation, LayoutError> {
        let state = self.layout.spawn(&mut self.rng)?;
        Ok(self.reset_to(state))
    }

    /// Starts a new episode from a prepared state.
    pub fn reset_to(&mut self, state: State) -> Observation {
        self.state = state;
        self.last_action = None;
        self.total_cost = 0;
        debug!(
            agent = ?self.state.agent(),
            pending = ?self.state.pending(),
            "episode reset"
        );
        self.state.observation()
    }

    pub fn step(&mut self, action: Action) -> Step {
        let next = self.model.result(&self.state, action);
        let cost = self.model.step_cost(&self.state, action, &next);
        self.state = next;
        self.last_action = Some(action);
        self.total_cost += u64::from(cost);
        Step {
            observation: self.state.observation(),
            cost,
            done: self.model.goal_test(&self.state),
        }
    }

    /// Steps with an integer action tag as used on the observation boundary.
    pub fn step_tag(&mut self, tag: u8) -> Result<Step, ModelError> {
        let action = Action::try_from(tag)?;
        Ok(self.step(action))
    }

    pub fn is_done(&self) -> bool {
        self.model.goal_test(&self.state)
    }

    pub fn state(&self) -> &State {
        &self.state
    }

    pub fn model(&self) -> &TransitionModel {
        &self.model
    }

    pub fn last_action(&self) -> Option<Action> {
        self.last_action
    }

    /// Cost accumulated since the last reset.
    pub fn total_cost(&self) -> u64 {
        self.total_cost
    }

    /// Text rendering of the current state.
    pub fn render(&self) -> String {
        self.state.to_string()
    }
}
