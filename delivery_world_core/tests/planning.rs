use std::collections::{HashSet, VecDeque};

use delivery_world_core::{
    ItemId, Position,
    environment::Environment,
    layout::Layout,
    model::{Action, Goal, TransitionModel},
    search::{SearchConfig, SearchOutcome, Strategy, search},
    state::State,
};
use rand::{SeedableRng, rngs::StdRng};

const HOMES: [Position; 3] = [Position::new(0, 2), Position::new(4, 0), Position::new(6, 2)];

fn fixed_state(pending: &[ItemId]) -> State {
    Layout::restaurant()
        .spawn_with(HOMES, pending.iter().copied())
        .unwrap()
}

/// Plays `path` through the model, returning the final state and summed cost.
fn replay(model: &TransitionModel, initial: &State, path: &[Action]) -> (State, u64) {
    let mut state = initial.clone();
    let mut cost = 0;
    for action in path {
        let next = model.result(&state, *action);
        cost += u64::from(model.step_cost(&state, *action, &next));
        state = next;
    }
    (state, cost)
}

/// Every state reachable from `initial`, breadth first.
fn reachable(model: &TransitionModel, initial: &State) -> Vec<State> {
    let mut seen = HashSet::from([initial.fingerprint()]);
    let mut queue = VecDeque::from([initial.clone()]);
    let mut states = Vec::new();
    while let Some(state) = queue.pop_front() {
        for action in model.actions(&state) {
            let next = model.result(&state, action);
            if seen.insert(next.fingerprint()) {
                queue.push_back(next);
            }
        }
        states.push(state);
    }
    states
}

#[test]
fn fresh_episodes_are_never_already_solved() {
    let layout = Layout::restaurant();
    let mut rng = StdRng::seed_from_u64(2024);
    for goal in [
        Goal::Complete,
        Goal::AllServed,
        Goal::AllPickedUp,
        Goal::FirstPickup,
        Goal::AnyServed,
    ] {
        let model = TransitionModel::new(goal);
        for _ in 0..10 {
            assert!(!model.goal_test(&layout.spawn(&mut rng).unwrap()));
        }
    }
}

#[test]
fn uniform_cost_serves_every_destination() {
    let model = TransitionModel::default();
    let initial = fixed_state(&ItemId::ALL);
    let report = search(&model, initial.clone(), &SearchConfig::new(Strategy::UniformCost));

    let node = report.node().expect("a plan exists");
    let path = node.path();
    assert_eq!(path.len(), node.depth);

    let (last, cost) = replay(&model, &initial, &path);
    assert_eq!(last.carrying(), None);
    assert_eq!(last.served(), [true, true, true]);
    assert!(last.pending().is_empty());
    assert!(model.goal_test(&last));
    assert_eq!(cost, u64::from(node.path_cost));
    assert_eq!(last.fingerprint(), node.state.fingerprint());
}

#[test]
fn astar_cost_matches_uniform_cost_for_a_single_order() {
    // Every goal state has the agent on the same home, so the heuristic
    // offsets all of them equally.
    let model = TransitionModel::new(Goal::AnyServed);
    let layout = Layout::restaurant();
    let rotations = [
        HOMES,
        [HOMES[1], HOMES[2], HOMES[0]],
        [HOMES[2], HOMES[0], HOMES[1]],
    ];
    for homes in rotations {
        for item in ItemId::ALL {
            let initial = layout.spawn_with(homes, [item]).unwrap();
            let ucs = search(&model, initial.clone(), &SearchConfig::new(Strategy::UniformCost));
            let astar = search(&model, initial, &SearchConfig::new(Strategy::AStar));
            let ucs_cost = ucs.node().map(|node| node.path_cost);
            let astar_cost = astar.node().map(|node| node.path_cost);
            assert!(ucs_cost.is_some());
            assert_eq!(ucs_cost, astar_cost, "{item:?} at {homes:?}");
        }
    }
}

#[test]
fn astar_solves_the_full_order() {
    let model = TransitionModel::default();
    let layout = Layout::restaurant();
    let mut rng = StdRng::seed_from_u64(99);
    for _ in 0..5 {
        let initial = layout.spawn(&mut rng).unwrap();
        let ucs = search(&model, initial.clone(), &SearchConfig::new(Strategy::UniformCost));
        let astar = search(&model, initial.clone(), &SearchConfig::new(Strategy::AStar));
        let best = ucs.node().unwrap().path_cost;
        let node = astar.node().unwrap();
        assert!(node.path_cost >= best);
        let (last, cost) = replay(&model, &initial, &node.path());
        assert!(model.goal_test(&last));
        assert_eq!(cost, u64::from(node.path_cost));
    }
}

#[test]
fn rebuilt_observation_plans_like_the_live_state() {
    let model = TransitionModel::default();
    let at_source = replay(
        &model,
        &fixed_state(&ItemId::ALL),
        &[Action::Right, Action::Right, Action::Right],
    )
    .0;
    let rebuilt = State::from_observation(&at_source.observation()).unwrap();
    assert_eq!(rebuilt.landmarks(), at_source.landmarks());

    let config = SearchConfig::new(Strategy::UniformCost);
    let live = search(&model, at_source, &config);
    let restored = search(&model, rebuilt, &config);
    assert!(restored.is_found());
    assert_eq!(
        restored.node().map(|node| node.path_cost),
        live.node().map(|node| node.path_cost)
    );
}

#[test]
fn single_item_optimum_is_known() {
    // The other two destinations never get an order, so only one can be served.
    let model = TransitionModel::new(Goal::AnyServed);
    let initial = fixed_state(&[ItemId::Three]);
    for strategy in [Strategy::UniformCost, Strategy::AStar] {
        let report = search(&model, initial.clone(), &SearchConfig::new(strategy));
        let node = report.node().unwrap();
        // 3 moves to the source, pickup, then (6,4) -> (2,4) -> (2,2) -> (6,2).
        assert_eq!(node.path_cost, 3 + 1 + 4 + 2 + 4, "{strategy}");
        assert_eq!(node.path().last(), Some(&Action::Deliver));
    }
}

#[test]
fn greedy_plans_are_valid() {
    let model = TransitionModel::default();
    let layout = Layout::restaurant();
    let mut rng = StdRng::seed_from_u64(7);
    for _ in 0..5 {
        let initial = layout.spawn(&mut rng).unwrap();
        let report = search(
            &model,
            initial.clone(),
            &SearchConfig::new(Strategy::GreedyBestFirst),
        );
        let node = report.node().expect("greedy should still find a plan");
        let (last, cost) = replay(&model, &initial, &node.path());
        assert!(model.goal_test(&last));
        assert_eq!(cost, u64::from(node.path_cost));
    }
}

#[test]
fn empty_source_exhausts_within_the_state_space() {
    let model = TransitionModel::default();
    let initial = fixed_state(&[]);
    let report = search(&model, initial, &SearchConfig::new(Strategy::UniformCost));

    assert!(matches!(report.outcome, SearchOutcome::Exhausted));
    assert!(report.path().is_none());
    // Only the agent can move: one state per open cell.
    let open_cells = 7 * 5 - 9;
    assert!(report.stats.expanded <= open_cells);
    assert_eq!(report.stats.reached, open_cells as usize);
}

#[test]
fn expansion_budget_stops_early() {
    let model = TransitionModel::default();
    let config = SearchConfig::new(Strategy::UniformCost).with_max_expansions(10);
    let report = search(&model, fixed_state(&ItemId::ALL), &config);
    assert!(matches!(report.outcome, SearchOutcome::BudgetExceeded));
    assert_eq!(report.stats.expanded, 10);
}

#[test]
fn searches_are_reproducible() {
    let model = TransitionModel::default();
    for strategy in Strategy::ALL {
        let config = SearchConfig::new(strategy);
        let a = search(&model, fixed_state(&ItemId::ALL), &config);
        let b = search(&model, fixed_state(&ItemId::ALL), &config);
        assert_eq!(a.path(), b.path(), "{strategy}");
        assert_eq!(a.stats, b.stats, "{strategy}");
    }
}

#[test]
fn hand_actions_respect_what_is_carried() {
    let model = TransitionModel::default();
    let initial = fixed_state(&[ItemId::Two, ItemId::One]);
    let states = reachable(&model, &initial);
    assert!(states.len() > 100);
    for state in &states {
        let actions = model.actions(state);
        match state.carrying() {
            None => assert!(!actions.contains(&Action::Deliver)),
            Some(_) => assert!(!actions.contains(&Action::PickUp)),
        }
        assert_eq!(
            state
                .grid()
                .enumerate()
                .filter(|(_, cell)| **cell == delivery_world_core::state::Cell::Agent)
                .count(),
            1
        );
    }
}

#[test]
fn result_is_pure() {
    let model = TransitionModel::default();
    let initial = fixed_state(&ItemId::ALL);
    for state in reachable(&model, &initial).iter().step_by(97) {
        let before = state.fingerprint();
        for action in Action::ALL {
            let a = model.result(state, action);
            let b = model.result(state, action);
            assert_eq!(a.fingerprint(), b.fingerprint());
            assert_eq!(state.fingerprint(), before);
        }
    }
}

#[test]
fn served_flags_never_revert() {
    let model = TransitionModel::default();
    let initial = fixed_state(&[ItemId::Three, ItemId::One]);
    for state in reachable(&model, &initial) {
        for action in model.actions(&state) {
            let next = model.result(&state, action);
            for item in ItemId::ALL {
                assert!(!state.is_served(item) || next.is_served(item));
            }
        }
    }
}

#[test]
fn environment_replay_matches_search() {
    let mut env = Environment::new(Layout::restaurant(), Goal::Complete, 17).unwrap();
    env.reset().unwrap();
    let initial = env.state().clone();
    let report = search(env.model(), initial, &SearchConfig::default());
    let node = report.node().unwrap();

    let mut total = 0;
    let mut done = false;
    for action in node.path() {
        assert!(!done, "goal reached before the plan ended");
        let step = env.step_tag(action.tag()).unwrap();
        total += u64::from(step.cost);
        done = step.done;
    }
    assert!(done);
    assert_eq!(total, u64::from(node.path_cost));
    assert_eq!(env.total_cost(), total);
}

#[test]
fn observation_wire_shape() {
    let observation = fixed_state(&ItemId::ALL).observation();
    let json = serde_json::to_value(&observation).unwrap();
    let grid = json["grid"].as_array().unwrap();
    assert_eq!(grid.len(), 5);
    assert!(grid.iter().all(|row| row.as_array().unwrap().len() == 7));
    assert_eq!(json["grid"][4][3], 6);
    assert_eq!(json["grid"][4][6], 4);
    assert_eq!(json["grid"][2][0], 1);
    assert_eq!(json["carrying"], 0);
    assert_eq!(json["pending"], serde_json::json!([1, 2, 3]));
    assert_eq!(json["served"], serde_json::json!([false, false, false]));

    let back: delivery_world_core::state::Observation = serde_json::from_value(json).unwrap();
    let rebuilt = State::from_observation(&back).unwrap();
    assert_eq!(rebuilt, fixed_state(&ItemId::ALL));
}
