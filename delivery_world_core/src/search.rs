//! Best-first graph search over a [`Problem`].
//!
//! One loop serves all three strategies; they differ only in the frontier
//! priority and in when a cheaper route to an already reached state replaces
//! the old one.

use std::collections::HashMap;
use std::collections::hash_map::Entry;
use std::fmt;
use std::hash::Hash;
use std::rc::Rc;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use tracing::{debug, trace};

use crate::{frontier::Frontier, model::ParseError, node::SearchNode};

/// The oracle a search runs against.
///
/// Implementations must be deterministic: the same state always yields the
/// same actions in the same order, and `result` must not alter its input.
pub trait Problem {
    type State: Clone;
    type Action: Copy + fmt::Debug;
    /// Structural identity of a state, used to deduplicate.
    type Key: Hash + Eq + Clone;

    fn key(&self, state: &Self::State) -> Self::Key;
    fn actions(&self, state: &Self::State) -> Vec<Self::Action>;
    fn result(&self, state: &Self::State, action: Self::Action) -> Self::State;
    fn step_cost(&self, state: &Self::State, action: Self::Action, next: &Self::State) -> u32;
    fn is_goal(&self, state: &Self::State) -> bool;
    fn heuristic(&self, state: &Self::State) -> u32;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Strategy {
    /// Orders by `path_cost + heuristic`.
    #[default]
    AStar,
    /// Orders by `path_cost`.
    UniformCost,
    /// Orders by `heuristic` alone.
    GreedyBestFirst,
}

impl Strategy {
    pub const ALL: [Strategy; 3] = [
        Strategy::AStar,
        Strategy::UniformCost,
        Strategy::GreedyBestFirst,
    ];

    pub fn priority<S, A: Copy>(self, node: &SearchNode<S, A>) -> u64 {
        match self {
            Strategy::AStar => node.total_cost(),
            Strategy::UniformCost => u64::from(node.path_cost),
            Strategy::GreedyBestFirst => u64::from(node.heuristic),
        }
    }

    /// Whether `candidate` should replace `existing` as the best known node
    /// for the same state.
    fn improves<S, A>(self, candidate: &SearchNode<S, A>, existing: &SearchNode<S, A>) -> bool {
        match self {
            Strategy::AStar | Strategy::UniformCost => candidate.path_cost < existing.path_cost,
            Strategy::GreedyBestFirst => candidate.heuristic < existing.heuristic,
        }
    }

    fn name(self) -> &'static str {
        match self {
            Strategy::AStar => "astar",
            Strategy::UniformCost => "ucs",
            Strategy::GreedyBestFirst => "greedy",
        }
    }
}

impl fmt::Display for Strategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Strategy {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_ascii_lowercase();
        let strategy = match wanted.as_str() {
            "astar" | "a*" => Some(Strategy::AStar),
            "ucs" | "uniform-cost" => Some(Strategy::UniformCost),
            "greedy" | "greedy-best-first" => Some(Strategy::GreedyBestFirst),
            _ => None,
        };
        strategy.ok_or_else(|| ParseError {
            kind: "strategy",
            value: s.to_string(),
            expected: "astar, ucs, greedy",
        })
    }
}

/// How a search should run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct SearchConfig {
    pub strategy: Strategy,
    /// Stop after this many expansions. Unbounded when `None`.
    pub max_expansions: Option<u64>,
}

impl SearchConfig {
    pub fn new(strategy: Strategy) -> Self {
        SearchConfig {
            strategy,
            max_expansions: None,
        }
    }

    pub fn with_max_expansions(mut self, limit: u64) -> Self {
        self.max_expansions = Some(limit);
        self
    }
}

/// Bookkeeping counters for one search.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct SearchStats {
    /// Nodes popped, goal-tested and expanded.
    pub expanded: u64,
    /// Successor nodes built.
    pub generated: u64,
    /// Successors that replaced a worse entry for an already reached state.
    pub reopened: u64,
    /// Popped entries skipped because a better one superseded them.
    pub stale_skipped: u64,
    /// Distinct states reached.
    pub reached: usize,
    pub frontier_high_water: usize,
}

/// How a search ended.
#[derive(Debug)]
pub enum SearchOutcome<S, A> {
    Found(Rc<SearchNode<S, A>>),
    /// The frontier emptied without reaching a goal.
    Exhausted,
    /// `max_expansions` was hit first.
    BudgetExceeded,
}

#[derive(Debug)]
pub struct SearchReport<S, A> {
    pub outcome: SearchOutcome<S, A>,
    pub stats: SearchStats,
}

impl<S, A: Copy> SearchReport<S, A> {
    pub fn is_found(&self) -> bool {
        matches!(self.outcome, SearchOutcome::Found(_))
    }

    pub fn node(&self) -> Option<&Rc<SearchNode<S, A>>> {
        match &self.outcome {
            SearchOutcome::Found(node) => Some(node),
            SearchOutcome::Exhausted | SearchOutcome::BudgetExceeded => None,
        }
    }

    /// Actions from the initial state to the goal, if one was found.
    pub fn path(&self) -> Option<Vec<A>> {
        self.node().map(|node| node.path())
    }
}

type Node<P> = SearchNode<<P as Problem>::State, <P as Problem>::Action>;

/// Runs best-first search from `initial`.
///
/// The goal test is applied when a node is popped, so the returned node is
/// the first goal the strategy's ordering reaches. Failure is reported as
/// [`SearchOutcome::Exhausted`] or [`SearchOutcome::BudgetExceeded`], never
/// as an error.
pub fn search<P: Problem>(
    problem: &P,
    initial: P::State,
    config: &SearchConfig,
) -> SearchReport<P::State, P::Action> {
    let strategy = config.strategy;
    let mut stats = SearchStats::default();
    let mut frontier: Frontier<(P::Key, Rc<Node<P>>)> = Frontier::new();
    let mut reached: HashMap<P::Key, Rc<Node<P>>> = HashMap::new();

    let heuristic = problem.heuristic(&initial);
    let root_key = problem.key(&initial);
    let root = Rc::new(SearchNode::root(initial, heuristic));
    reached.insert(root_key.clone(), Rc::clone(&root));
    frontier.push(strategy.priority(&root), (root_key, root));

    debug!(%strategy, heuristic, "search started");

    let outcome = loop {
        let Some((key, node)) = frontier.pop() else {
            break SearchOutcome::Exhausted;
        };

        let superseded = reached
            .get(&key)
            .is_some_and(|best| !Rc::ptr_eq(best, &node));
        if superseded {
            stats.stale_skipped += 1;
            continue;
        }

        if problem.is_goal(&node.state) {
            break SearchOutcome::Found(node);
        }

        if config
            .max_expansions
            .is_some_and(|limit| stats.expanded >= limit)
        {
            break SearchOutcome::BudgetExceeded;
        }

        stats.expanded += 1;
        trace!(
            depth = node.depth,
            path_cost = node.path_cost,
            heuristic = node.heuristic,
            frontier = frontier.len(),
            "expanding"
        );

        for action in problem.actions(&node.state) {
            let next = problem.result(&node.state, action);
            let cost = problem.step_cost(&node.state, action, &next);
            let heuristic = problem.heuristic(&next);
            let child_key = problem.key(&next);
            let child = SearchNode::child(&node, next, action, cost, heuristic);
            stats.generated += 1;

            let child = match reached.entry(child_key.clone()) {
                Entry::Vacant(slot) => Rc::clone(slot.insert(Rc::new(child))),
                Entry::Occupied(mut slot) => {
                    if !strategy.improves(&child, slot.get()) {
                        continue;
                    }
                    stats.reopened += 1;
                    let child = Rc::new(child);
                    slot.insert(Rc::clone(&child));
                    child
                }
            };
            frontier.push(strategy.priority(&child), (child_key, child));
        }
    };

    stats.reached = reached.len();
    stats.frontier_high_water = frontier.high_water();

    match &outcome {
        SearchOutcome::Found(node) => debug!(
            %strategy,
            depth = node.depth,
            path_cost = node.path_cost,
            expanded = stats.expanded,
            generated = stats.generated,
            reached = stats.reached,
            "goal found"
        ),
        SearchOutcome::Exhausted => debug!(
            %strategy,
            expanded = stats.expanded,
            reached = stats.reached,
            "frontier exhausted"
        ),
        SearchOutcome::BudgetExceeded => debug!(
            %strategy,
            expanded = stats.expanded,
            frontier = frontier.len(),
            "expansion budget exceeded"
        ),
    }

    SearchReport { outcome, stats }
}
