use std::collections::VecDeque;
use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::{ItemId, Position, map::Grid};

/// What a single grid cell displays.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Cell {
    #[default]
    Empty,
    Destination(ItemId),
    Source,
    Obstacle,
    Agent,
}

impl Cell {
    /// Integer tag used in observations.
    pub fn tag(self) -> u8 {
        match self {
            Cell::Empty => 0,
            Cell::Destination(item) => item.tag(),
            Cell::Source => 4,
            Cell::Obstacle => 5,
            Cell::Agent => 6,
        }
    }

    pub fn from_tag(tag: u8) -> Option<Self> {
        match tag {
            0 => Some(Cell::Empty),
            1..=3 => ItemId::from_tag(tag).map(Cell::Destination),
            4 => Some(Cell::Source),
            5 => Some(Cell::Obstacle),
            6 => Some(Cell::Agent),
            _ => None,
        }
    }

    fn glyph(self) -> char {
        match self {
            Cell::Empty => '.',
            Cell::Destination(ItemId::One) => '1',
            Cell::Destination(ItemId::Two) => '2',
            Cell::Destination(ItemId::Three) => '3',
            Cell::Source => 'S',
            Cell::Obstacle => '#',
            Cell::Agent => '@',
        }
    }
}

/// Home cells of the source and of each destination.
///
/// A destination is `None` only in states rebuilt from an observation taken
/// after it was served, since a served destination shows as empty.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Landmarks {
    pub source: Option<Position>,
    pub destinations: [Option<Position>; 3],
}

impl Landmarks {
    pub fn destination(&self, item: ItemId) -> Option<Position> {
        self.destinations[item.index()]
    }
}

/// Errors raised when a state cannot be built from its parts.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StateError {
    #[error("Observation grid is empty.")]
    EmptyGrid,
    #[error("Inconsistent width at row {row}: expected {expected}, found {found}")]
    RaggedRow {
        row: usize,
        expected: usize,
        found: usize,
    },
    #[error("Unknown cell tag {tag} at ({x}, {y}).")]
    InvalidCellTag { tag: u8, x: usize, y: usize },
    #[error("Unknown item tag {0}.")]
    InvalidItemTag(u8),
    #[error("No agent found on the grid.")]
    MissingAgent,
    #[error("Agent found at both {first:?} and {second:?}.")]
    MultipleAgents { first: Position, second: Position },
    #[error("{count} landmarks are missing from the grid; the agent can cover only one.")]
    HiddenLandmarks { count: usize },
}

/// Canonical projection of a [`State`] used as the reached-map key.
///
/// Built from grid contents, carried item, pending queue and served flags.
/// The encoding is injective, so equal fingerprints mean structurally equal
/// states.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Fingerprint(Box<[u8]>);

/// The observable projection of a state, as handed to a harness.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Observation {
    pub grid: Vec<Vec<u8>>,
    pub carrying: u8,
    pub pending: Vec<u8>,
    pub served: [bool; 3],
}

/// One snapshot of the world.
///
/// States are values: the model never mutates a state it was handed, it
/// clones and edits the clone. The grid sits behind an `Arc` so successors
/// that do not move the agent share it with their parent.
#[derive(Debug, Clone)]
pub struct State {
    grid: Arc<Grid<Cell>>,
    agent: Position,
    carrying: Option<ItemId>,
    pending: VecDeque<ItemId>,
    served: [bool; 3],
    landmarks: Landmarks,
}

impl State {
    /// Assembles a state whose grid already carries the agent at `agent`.
    pub(crate) fn assemble(
        grid: Grid<Cell>,
        agent: Position,
        pending: VecDeque<ItemId>,
        landmarks: Landmarks,
    ) -> Self {
        debug_assert_eq!(grid[agent], Cell::Agent);
        State {
            grid: Arc::new(grid),
            agent,
            carrying: None,
            pending,
            served: [false; 3],
            landmarks,
        }
    }

    /// Rebuilds a state from a raw observation.
    ///
    /// Landmarks are located by scanning the grid. A source or unserved
    /// destination whose tag is missing is under the agent; more than one
    /// missing is rejected. Served destinations show empty and stay unknown.
    pub fn from_observation(observation: &Observation) -> Result<Self, StateError> {
        let height = observation.grid.len();
        let width = observation.grid.first().map_or(0, Vec::len);
        if height == 0 || width == 0 {
            return Err(StateError::EmptyGrid);
        }

        let mut cells = Vec::with_capacity(width * height);
        for (y, row) in observation.grid.iter().enumerate() {
            if row.len() != width {
                return Err(StateError::RaggedRow {
                    row: y,
                    expected: width,
                    found: row.len(),
                });
            }
            for (x, tag) in row.iter().enumerate() {
                let cell =
                    Cell::from_tag(*tag).ok_or(StateError::InvalidCellTag { tag: *tag, x, y })?;
                cells.push(cell);
            }
        }
        let mut cells = cells.into_iter();
        let grid = Grid::from_generator(width, height, |_, _| cells.next().unwrap_or_default());

        let agents: Vec<Position> = grid
            .enumerate()
            .filter(|(_, cell)| **cell == Cell::Agent)
            .map(|(position, _)| position)
            .take(2)
            .collect();
        let agent = match agents.as_slice() {
            [] => return Err(StateError::MissingAgent),
            [agent] => *agent,
            [first, second, ..] => {
                return Err(StateError::MultipleAgents {
                    first: *first,
                    second: *second,
                });
            }
        };

        let carrying = match observation.carrying {
            0 => None,
            tag => Some(ItemId::from_tag(tag).ok_or(StateError::InvalidItemTag(tag))?),
        };
        let pending = observation
            .pending
            .iter()
            .map(|tag| ItemId::from_tag(*tag).ok_or(StateError::InvalidItemTag(*tag)))
            .collect::<Result<VecDeque<_>, _>>()?;

        let mut landmarks = Landmarks {
            source: grid.find(|cell| *cell == Cell::Source),
            destinations: ItemId::ALL.map(|item| grid.find(|cell| *cell == Cell::Destination(item))),
        };
        let source_hidden = landmarks.source.is_none();
        let destinations_hidden: Vec<ItemId> = ItemId::ALL
            .into_iter()
            .filter(|item| !observation.served[item.index()] && landmarks.destination(*item).is_none())
            .collect();
        match (source_hidden, destinations_hidden.as_slice()) {
            (false, []) => {}
            (true, []) => landmarks.source = Some(agent),
            (false, [item]) => landmarks.destinations[item.index()] = Some(agent),
            _ => {
                return Err(StateError::HiddenLandmarks {
                    count: destinations_hidden.len() + usize::from(source_hidden),
                });
            }
        }

        Ok(State {
            grid: Arc::new(grid),
            agent,
            carrying,
            pending,
            served: observation.served,
            landmarks,
        })
    }

    pub fn grid(&self) -> &Grid<Cell> {
        &self.grid
    }

    pub fn agent(&self) -> Position {
        self.agent
    }

    pub fn carrying(&self) -> Option<ItemId> {
        self.carrying
    }

    pub fn pending(&self) -> &VecDeque<ItemId> {
        &self.pending
    }

    pub fn served(&self) -> [bool; 3] {
        self.served
    }

    pub fn is_served(&self, item: ItemId) -> bool {
        self.served[item.index()]
    }

    pub fn landmarks(&self) -> &Landmarks {
        &self.landmarks
    }

    pub fn fingerprint(&self) -> Fingerprint {
        let cells = self.grid.as_slice();
        let mut bytes = Vec::with_capacity(cells.len() + self.pending.len() + 14);
        bytes.extend_from_slice(&(self.grid.width() as u32).to_le_bytes());
        bytes.extend_from_slice(&(self.grid.height() as u32).to_le_bytes());
        bytes.extend(cells.iter().map(|cell| cell.tag()));
        bytes.push(self.carrying.map_or(0, ItemId::tag));
        bytes.push(self.pending.len() as u8);
        bytes.extend(self.pending.iter().map(|item| item.tag()));
        bytes.push(
            self.served
                .iter()
                .enumerate()
                .fold(0u8, |bits, (i, served)| bits | (u8::from(*served) << i)),
        );
        Fingerprint(bytes.into_boxed_slice())
    }

    pub fn observation(&self) -> Observation {
        Observation {
            grid: self
                .grid
                .rows()
                .map(|row| row.iter().map(|cell| cell.tag()).collect())
                .collect(),
            carrying: self.carrying.map_or(0, ItemId::tag),
            pending: self.pending.iter().map(|item| item.tag()).collect(),
            served: self.served,
        }
    }

    pub(crate) fn move_agent(&mut self, target: Position) {
        let from = self.agent;
        let grid = Arc::make_mut(&mut self.grid);
        grid[from] = Cell::Empty;
        grid[target] = Cell::Agent;
        self.agent = target;
    }

    /// Moves the front pending item into the agent's hands.
    pub(crate) fn take_pending(&mut self) -> Option<ItemId> {
        let item = self.pending.pop_front()?;
        self.carrying = Some(item);
        Some(item)
    }

    pub(crate) fn hand_over(&mut self, item: ItemId) {
        self.served[item.index()] = true;
        self.carrying = None;
    }

    /// Repaints every landmark the agent is not standing on.
    ///
    /// The source always shows as `Source`; a destination shows its own tag
    /// until served and `Empty` afterwards.
    pub(crate) fn restore_landmarks(&mut self) {
        if let Some(source) = self.landmarks.source {
            self.paint(source, Cell::Source);
        }
        for item in ItemId::ALL {
            if let Some(home) = self.landmarks.destination(item) {
                let cell = if self.is_served(item) {
                    Cell::Empty
                } else {
                    Cell::Destination(item)
                };
                self.paint(home, cell);
            }
        }
    }

    fn paint(&mut self, position: Position, cell: Cell) {
        if position != self.agent && self.grid[position] != cell {
            Arc::make_mut(&mut self.grid)[position] = cell;
        }
    }
}

/// Structural equality: grid, carried item, pending queue and served flags.
impl PartialEq for State {
    fn eq(&self, other: &Self) -> bool {
        self.grid == other.grid
            && self.carrying == other.carrying
            && self.pending == other.pending
            && self.served == other.served
    }
}

impl Eq for State {}

impl fmt::Display for State {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for row in self.grid.rows() {
            let line: Vec<String> = row.iter().map(|cell| cell.glyph().to_string()).collect();
            writeln!(f, "{}", line.join(" "))?;
        }
        let carrying = self
            .carrying
            .map_or_else(|| "-".to_string(), |item| item.tag().to_string());
        let pending: Vec<String> = self.pending.iter().map(|item| item.tag().to_string()).collect();
        let served: Vec<&str> = self
            .served
            .iter()
            .map(|served| if *served { "x" } else { " " })
            .collect();
        writeln!(f, "Carrying: {carrying}")?;
        writeln!(f, "Pending: [{}]", pending.join(", "))?;
        write!(f, "Served: [{}]", served.join("|"))
    }
}
