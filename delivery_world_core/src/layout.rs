use std::collections::VecDeque;
use std::str::FromStr;

use rand::{Rng, seq::SliceRandom};

use crate::{
    ItemId, Position,
    map::Grid,
    state::{Cell, Landmarks, State},
};

/// Errors raised while loading a layout or spawning a state from it.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum LayoutError {
    #[error("Map string is empty.")]
    Empty,
    #[error("Inconsistent width at row {row}: expected {expected}, found {found}")]
    InconsistentWidth {
        row: usize,
        expected: usize,
        found: usize,
    },
    #[error("Unknown map code '{token}' at position ({x}, {y}).")]
    UnknownToken { token: String, x: usize, y: usize },
    #[error("Multiple {what} tokens found; second at ({x}, {y}).")]
    Duplicate { what: &'static str, x: usize, y: usize },
    #[error("No start position ('ST') found in map.")]
    MissingStart,
    #[error("No source ('KT') found in map.")]
    MissingSource,
    #[error("Expected 3 destinations, found {0}.")]
    DestinationCount(usize),
    #[error("Destination home {position:?} is not a free floor cell.")]
    InvalidHome { position: Position },
}

/// The static part of a world: size, obstacles, source, agent start and
/// where destinations may be placed.
///
/// Destinations are either pinned to an item (`T1`..`T3`) or drawn from the
/// free slots (`TB`) when a state is spawned.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Layout {
    width: usize,
    height: usize,
    obstacles: Vec<Position>,
    source: Position,
    start: Position,
    slots: Vec<Position>,
    pinned: [Option<Position>; 3],
}

impl Layout {
    /// The 5x7 restaurant floor: two walled rooms joined by a single gap,
    /// the source in the bottom-right corner and three candidate tables.
    pub fn restaurant() -> Self {
        let obstacles = [
            (3, 0),
            (3, 1),
            (6, 1),
            (0, 3),
            (1, 3),
            (3, 3),
            (4, 3),
            (5, 3),
            (6, 3),
        ]
        .into_iter()
        .map(|(x, y)| Position::new(x, y))
        .collect();
        Layout {
            width: 7,
            height: 5,
            obstacles,
            source: Position::new(6, 4),
            start: Position::new(3, 4),
            slots: vec![Position::new(4, 0), Position::new(0, 2), Position::new(6, 2)],
            pinned: [None; 3],
        }
    }

    pub fn is_obstacle(&self, position: Position) -> bool {
        self.obstacles.contains(&position)
    }

    /// Draws destination homes and the pending order at random and builds
    /// the initial state.
    pub fn spawn<R: Rng + ?Sized>(&self, rng: &mut R) -> Result<State, LayoutError> {
        let mut slots = self.slots.clone();
        slots.shuffle(rng);
        let mut slots = slots.into_iter();
        let drawn = self.pinned.map(|pinned| pinned.or_else(|| slots.next()));
        let [Some(one), Some(two), Some(three)] = drawn else {
            let found = drawn.iter().flatten().count();
            return Err(LayoutError::DestinationCount(found));
        };

        let mut pending = ItemId::ALL.to_vec();
        pending.shuffle(rng);
        self.spawn_with([one, two, three], pending)
    }

    /// Builds the initial state with explicit destination homes and pending
    /// order.
    ///
    /// Homes must be distinct in-bounds floor cells that are neither the
    /// source nor the agent start.
    pub fn spawn_with(
        &self,
        homes: [Position; 3],
        pending: impl IntoIterator<Item = ItemId>,
    ) -> Result<State, LayoutError> {
        for (i, home) in homes.iter().enumerate() {
            let free = home.x < self.width
                && home.y < self.height
                && !self.is_obstacle(*home)
                && *home != self.source
                && *home != self.start
                && !homes[..i].contains(home);
            if !free {
                return Err(LayoutError::InvalidHome { position: *home });
            }
        }
        Ok(self.assemble(homes, pending.into_iter().collect()))
    }

    fn assemble(&self, homes: [Position; 3], pending: VecDeque<ItemId>) -> State {
        let grid = Grid::from_generator(self.width, self.height, |x, y| {
            let position = Position { x, y };
            if position == self.start {
                Cell::Agent
            } else if position == self.source {
                Cell::Source
            } else if self.is_obstacle(position) {
                Cell::Obstacle
            } else if let Some(item) = ItemId::ALL
                .into_iter()
                .find(|item| homes[item.index()] == position)
            {
                Cell::Destination(item)
            } else {
                Cell::Empty
            }
        });
        let landmarks = Landmarks {
            source: Some(self.source),
            destinations: homes.map(Some),
        };
        State::assemble(grid, self.start, pending, landmarks)
    }
}

impl Default for Layout {
    fn default() -> Self {
        Layout::restaurant()
    }
}

impl FromStr for Layout {
    type Err = LayoutError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        load_layout_from_string(s)
    }
}

/// Loads a layout from whitespace-separated two-letter map codes.
///
/// `..` floor, `WL` obstacle, `KT` source, `ST` agent start, `TB` free
/// destination slot, `T1`/`T2`/`T3` destination pinned to an item.
pub fn load_layout_from_string(map_string: &str) -> Result<Layout, LayoutError> {
    let lines: Vec<&str> = map_string
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .collect();
    if lines.is_empty() {
        return Err(LayoutError::Empty);
    }

    let height = lines.len();
    let width = lines[0].split_whitespace().count();
    let mut obstacles = Vec::new();
    let mut source = None;
    let mut start = None;
    let mut slots = Vec::new();
    let mut pinned: [Option<Position>; 3] = [None; 3];

    for (y, line) in lines.iter().enumerate() {
        let tokens: Vec<&str> = line.split_whitespace().collect();
        if tokens.len() != width {
            return Err(LayoutError::InconsistentWidth {
                row: y,
                expected: width,
                found: tokens.len(),
            });
        }
        for (x, token) in tokens.into_iter().enumerate() {
            let position = Position { x, y };
            let duplicate = |what| LayoutError::Duplicate { what, x, y };
            match token {
                ".." => {}
                "WL" => obstacles.push(position),
                "KT" => {
                    if source.replace(position).is_some() {
                        return Err(duplicate("source ('KT')"));
                    }
                }
                "ST" => {
                    if start.replace(position).is_some() {
                        return Err(duplicate("start ('ST')"));
                    }
                }
                "TB" => slots.push(position),
                "T1" | "T2" | "T3" => {
                    let item = match token {
                        "T1" => ItemId::One,
                        "T2" => ItemId::Two,
                        _ => ItemId::Three,
                    };
                    if pinned[item.index()].replace(position).is_some() {
                        return Err(duplicate("pinned destination"));
                    }
                }
                unknown => {
                    return Err(LayoutError::UnknownToken {
                        token: unknown.to_string(),
                        x,
                        y,
                    });
                }
            }
        }
    }

    let destinations = slots.len() + pinned.iter().flatten().count();
    if destinations != ItemId::ALL.len() {
        return Err(LayoutError::DestinationCount(destinations));
    }

    Ok(Layout {
        width,
        height,
        obstacles,
        source: source.ok_or(LayoutError::MissingSource)?,
        start: start.ok_or(LayoutError::MissingStart)?,
        slots,
        pinned,
    })
}
