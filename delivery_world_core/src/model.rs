use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::{
    ItemId, Position, manhattan_distance,
    search::Problem,
    state::{Cell, Fingerprint, State},
};

/// Represents actions the agent can take, with their integer tags.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Action {
    Up,
    Down,
    Left,
    Right,
    PickUp,
    Deliver,
}

impl Action {
    pub const ALL: [Action; 6] = [
        Action::Up,
        Action::Down,
        Action::Left,
        Action::Right,
        Action::PickUp,
        Action::Deliver,
    ];

    pub fn tag(self) -> u8 {
        match self {
            Action::Up => 0,
            Action::Down => 1,
            Action::Left => 2,
            Action::Right => 3,
            Action::PickUp => 4,
            Action::Deliver => 5,
        }
    }

    /// Grid offset of a directional move.
    pub fn delta(self) -> Option<(isize, isize)> {
        match self {
            Action::Up => Some((0, -1)),
            Action::Down => Some((0, 1)),
            Action::Left => Some((-1, 0)),
            Action::Right => Some((1, 0)),
            Action::PickUp | Action::Deliver => None,
        }
    }
}

impl TryFrom<u8> for Action {
    type Error = ModelError;

    fn try_from(tag: u8) -> Result<Self, Self::Error> {
        Action::ALL
            .get(usize::from(tag))
            .copied()
            .ok_or(ModelError::InvalidAction(tag))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ModelError {
    #[error("Action tag {0} is out of range (expected 0..=5).")]
    InvalidAction(u8),
}

/// Failure to parse a strategy or goal name.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Unknown {kind} '{value}' (expected one of: {expected})")]
pub struct ParseError {
    pub kind: &'static str,
    pub value: String,
    pub expected: &'static str,
}

/// Terminal conditions the model can be configured with.
///
/// `Complete` is the full task. The others mark partial progress and are
/// meant for staged runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Goal {
    /// Every destination served, nothing pending, hands empty.
    #[default]
    Complete,
    /// Every destination served and hands empty, regardless of the queue.
    AllServed,
    /// Nothing left at the source.
    AllPickedUp,
    /// The queue is shorter than a full order of three items. Starting from
    /// a full queue this means at least one item has left the source; a
    /// shorter initial queue satisfies it immediately.
    FirstPickup,
    /// At least one destination served.
    AnyServed,
}

impl Goal {
    pub fn is_satisfied(self, state: &State) -> bool {
        let served = state.served();
        match self {
            Goal::Complete => {
                served.iter().all(|s| *s)
                    && state.pending().is_empty()
                    && state.carrying().is_none()
            }
            Goal::AllServed => served.iter().all(|s| *s) && state.carrying().is_none(),
            Goal::AllPickedUp => state.pending().is_empty(),
            Goal::FirstPickup => state.pending().len() < ItemId::ALL.len(),
            Goal::AnyServed => served.iter().any(|s| *s),
        }
    }

    fn name(self) -> &'static str {
        match self {
            Goal::Complete => "complete",
            Goal::AllServed => "all-served",
            Goal::AllPickedUp => "all-picked-up",
            Goal::FirstPickup => "first-pickup",
            Goal::AnyServed => "any-served",
        }
    }
}

impl fmt::Display for Goal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Goal {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        [
            Goal::Complete,
            Goal::AllServed,
            Goal::AllPickedUp,
            Goal::FirstPickup,
            Goal::AnyServed,
        ]
        .into_iter()
        .find(|goal| goal.name().eq_ignore_ascii_case(s.trim()))
        .ok_or_else(|| ParseError {
            kind: "goal",
            value: s.to_string(),
            expected: "complete, all-served, all-picked-up, first-pickup, any-served",
        })
    }
}

/// The delivery world's rules: legal actions, transitions, costs, goal and
/// heuristic. Holds no per-episode data.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct TransitionModel {
    goal: Goal,
}

impl TransitionModel {
    pub fn new(goal: Goal) -> Self {
        TransitionModel { goal }
    }

    pub fn goal(&self) -> Goal {
        self.goal
    }

    /// Legal actions in `state`, in tag order.
    ///
    /// Moves into an obstacle or off the grid are excluded. `PickUp` needs
    /// the agent on the source with empty hands and something pending;
    /// `Deliver` needs something in hand.
    pub fn actions(&self, state: &State) -> Vec<Action> {
        Action::ALL
            .into_iter()
            .filter(|action| match action {
                Action::PickUp => self.can_pick_up(state),
                Action::Deliver => state.carrying().is_some(),
                _ => self.move_target(state, *action).is_some(),
            })
            .collect()
    }

    /// Applies `action` to a copy of `state`.
    ///
    /// Blocked moves and pickups or deliveries in the wrong context leave the
    /// copy unchanged. Landmarks are repainted afterwards.
    pub fn result(&self, state: &State, action: Action) -> State {
        let mut next = state.clone();
        match action {
            Action::PickUp => {
                if self.can_pick_up(state) {
                    next.take_pending();
                }
            }
            Action::Deliver => {
                if let Some(item) = state.carrying() {
                    let home = state.landmarks().destination(item);
                    if !state.is_served(item) && home == Some(state.agent()) {
                        next.hand_over(item);
                    }
                }
            }
            _ => {
                if let Some(target) = self.move_target(state, action) {
                    next.move_agent(target);
                }
            }
        }
        next.restore_landmarks();
        next
    }

    /// 1 for every action except a delivery that serves its destination,
    /// which is free.
    pub fn step_cost(&self, state: &State, action: Action, next: &State) -> u32 {
        match (action, state.carrying()) {
            (Action::Deliver, Some(item)) if !state.is_served(item) && next.is_served(item) => 0,
            _ => 1,
        }
    }

    pub fn goal_test(&self, state: &State) -> bool {
        self.goal.is_satisfied(state)
    }

    /// Manhattan distance from the agent to its next sub-goal: the source
    /// when empty-handed, otherwise the home of the carried item.
    ///
    /// Only the immediate sub-goal is counted, and the source distance applies
    /// even once the queue is empty. A finished state away from the source
    /// therefore scores above zero, so A* is only guaranteed optimal when
    /// every goal state has the same value (a single ordered item).
    /// 0 when the needed landmark is unknown.
    pub fn heuristic(&self, state: &State) -> u32 {
        let landmarks = state.landmarks();
        let target = match state.carrying() {
            None => landmarks.source,
            Some(item) => landmarks.destination(item),
        };
        target.map_or(0, |target| {
            manhattan_distance(state.agent(), target) as u32
        })
    }

    fn can_pick_up(&self, state: &State) -> bool {
        state.carrying().is_none()
            && !state.pending().is_empty()
            && state.landmarks().source == Some(state.agent())
    }

    fn move_target(&self, state: &State, action: Action) -> Option<Position> {
        let (dx, dy) = action.delta()?;
        let grid = state.grid();
        let target = grid.offset(state.agent(), dx, dy)?;
        (grid[target] != Cell::Obstacle).then_some(target)
    }
}

impl Problem for TransitionModel {
    type State = State;
    type Action = Action;
    type Key = Fingerprint;

    fn key(&self, state: &State) -> Fingerprint {
        state.fingerprint()
    }

    fn actions(&self, state: &State) -> Vec<Action> {
        TransitionModel::actions(self, state)
    }

    fn result(&self, state: &State, action: Action) -> State {
        TransitionModel::result(self, state, action)
    }

    fn step_cost(&self, state: &State, action: Action, next: &State) -> u32 {
        TransitionModel::step_cost(self, state, action, next)
    }

    fn is_goal(&self, state: &State) -> bool {
        self.goal_test(state)
    }

    fn heuristic(&self, state: &State) -> u32 {
        TransitionModel::heuristic(self, state)
    }
}
