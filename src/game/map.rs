//! Map geometry and the wire shape of a single grid tile

use std::fmt;

use serde::{Deserialize, Serialize};

/// Grid position of a tile or player
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct Coords {
    pub x: usize,
    pub y: usize,
}

impl Coords {
    pub fn new(x: usize, y: usize) -> Self {
        Self { x, y }
    }
}

impl fmt::Display for Coords {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.x, self.y)
    }
}

/// Compass direction, used both for facing and for cell edges
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Direction {
    #[default]
    North,
    East,
    South,
    West,
}

/// What grows on a tile
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CellType {
    Soil,
    Plant,
    Flower,
}

/// One side of a tile
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum EdgeType {
    Wall,
    #[default]
    Passage,
}

/// The four sides of a tile. The server omits sides it never walled off,
/// so a missing key reads as a passage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Edges {
    #[serde(rename = "North", default)]
    pub north: EdgeType,
    #[serde(rename = "East", default)]
    pub east: EdgeType,
    #[serde(rename = "South", default)]
    pub south: EdgeType,
    #[serde(rename = "West", default)]
    pub west: EdgeType,
}

impl Edges {
    pub fn get(&self, side: Direction) -> EdgeType {
        match side {
            Direction::North => self.north,
            Direction::East => self.east,
            Direction::South => self.south,
            Direction::West => self.west,
        }
    }

    pub fn is_wall(&self, side: Direction) -> bool {
        self.get(side) == EdgeType::Wall
    }
}

/// A revealed tile. Replaced wholesale whenever the server resends it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Cell {
    pub index: usize,
    pub cell_type: CellType,
    #[serde(default)]
    pub edges: Edges,
}

/// Map size, fixed at registration for the whole session
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MapDimensions {
    width: usize,
    height: usize,
}

impl MapDimensions {
    /// Largest supported side. A `MAX_SIDE` square map still draws into a
    /// terminal frame addressable with `u16` rows and columns.
    pub const MAX_SIDE: usize = 1024;

    /// Returns `None` for a map with no tiles or a side above [`Self::MAX_SIDE`].
    pub fn new(width: usize, height: usize) -> Option<Self> {
        if !(1..=Self::MAX_SIDE).contains(&width) || !(1..=Self::MAX_SIDE).contains(&height) {
            return None;
        }
        Some(Self { width, height })
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn cell_count(&self) -> usize {
        self.width * self.height
    }

    pub fn contains_index(&self, index: usize) -> bool {
        index < self.cell_count()
    }

    pub fn contains(&self, coords: Coords) -> bool {
        coords.x < self.width && coords.y < self.height
    }

    /// Row-major index to grid position
    pub fn coords_of(&self, index: usize) -> Coords {
        Coords::new(index % self.width, index / self.width)
    }
}
