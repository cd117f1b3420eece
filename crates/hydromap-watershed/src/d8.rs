//! D8 flow direction codes.

use serde::{Deserialize, Serialize};

/// One of the eight neighbours a cell can drain to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum D8 {
    East,
    SouthEast,
    South,
    SouthWest,
    West,
    NorthWest,
    North,
    NorthEast,
}

impl D8 {
    pub const ALL: [D8; 8] = [
        D8::East,
        D8::SouthEast,
        D8::South,
        D8::SouthWest,
        D8::West,
        D8::NorthWest,
        D8::North,
        D8::NorthEast,
    ];

    /// Raster code: 1, 2, 4, ... 128 clockwise from east
    pub fn code(self) -> i32 {
        match self {
            D8::East => 1,
            D8::SouthEast => 2,
            D8::South => 4,
            D8::SouthWest => 8,
            D8::West => 16,
            D8::NorthWest => 32,
            D8::North => 64,
            D8::NorthEast => 128,
        }
    }

    pub fn from_code(code: i32) -> Option<D8> {
        D8::ALL.into_iter().find(|d| d.code() == code)
    }

    /// (row, col) step toward the neighbour
    pub fn offset(self) -> (i64, i64) {
        match self {
            D8::East => (0, 1),
            D8::SouthEast => (1, 1),
            D8::South => (1, 0),
            D8::SouthWest => (1, -1),
            D8::West => (0, -1),
            D8::NorthWest => (-1, -1),
            D8::North => (-1, 0),
            D8::NorthEast => (-1, 1),
        }
    }

    /// The opposite direction.
    ///
    /// A neighbour found by stepping `d` from a cell drains into that cell
    /// exactly when the neighbour's code is `d.reverse()`.
    pub fn reverse(self) -> D8 {
        match self {
            D8::East => D8::West,
            D8::SouthEast => D8::NorthWest,
            D8::South => D8::North,
            D8::SouthWest => D8::NorthEast,
            D8::West => D8::East,
            D8::NorthWest => D8::SouthEast,
            D8::North => D8::South,
            D8::NorthEast => D8::SouthWest,
        }
    }
}
