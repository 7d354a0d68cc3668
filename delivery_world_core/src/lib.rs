use serde::{Deserialize, Serialize};

pub mod agent;
pub mod environment;
pub mod frontier;
pub mod layout;
pub mod map;
pub mod model;
pub mod node;
pub mod score;
pub mod search;
pub mod state;

/// Represents a 2D coordinate. `x` is the column, `y` the row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Position {
    pub x: usize,
    pub y: usize,
}

impl Position {
    pub const fn new(x: usize, y: usize) -> Self {
        Position { x, y }
    }
}

/// Identity shared by an item and the destination that accepts it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum ItemId {
    One,
    Two,
    Three,
}

impl ItemId {
    pub const ALL: [ItemId; 3] = [ItemId::One, ItemId::Two, ItemId::Three];

    /// Zero-based slot used for the `served` vector and landmark tables.
    #[inline]
    pub fn index(self) -> usize {
        match self {
            ItemId::One => 0,
            ItemId::Two => 1,
            ItemId::Three => 2,
        }
    }

    /// Integer tag used in observations (1..=3).
    #[inline]
    pub fn tag(self) -> u8 {
        self.index() as u8 + 1
    }

    pub fn from_tag(tag: u8) -> Option<Self> {
        match tag {
            1 => Some(ItemId::One),
            2 => Some(ItemId::Two),
            3 => Some(ItemId::Three),
            _ => None,
        }
    }
}

/// Returns manhattan distance between two positions.
pub fn manhattan_distance(a: Position, b: Position) -> usize {
    a.x.abs_diff(b.x) + a.y.abs_diff(b.y)
}
