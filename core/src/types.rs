use core::fmt;

use serde::{Deserialize, Serialize};

use crate::COMPASS;

/// Single coordinate axis used for grid height, width, and positions.
pub type Coord = u16;

/// Grid position in `(row, col)` order. Rows grow to the south, columns to the east.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Position {
    pub row: Coord,
    pub col: Coord,
}

impl Position {
    pub const fn new(row: Coord, col: Coord) -> Self {
        Self { row, col }
    }

    /// Applies `delta`, returning a value only when neither axis under- or overflows.
    pub fn offset(self, delta: Delta) -> Option<Self> {
        let row = self.row.checked_add_signed(delta.d_row.into())?;
        let col = self.col.checked_add_signed(delta.d_col.into())?;
        Some(Self { row, col })
    }

    /// Applies `delta`, returning a value only when it remains inside `dims`.
    pub fn offset_within(self, delta: Delta, dims: Dimensions) -> Option<Self> {
        self.offset(delta).filter(|&pos| dims.contains(pos))
    }

    /// Chebyshev distance, the ring index used by the shadow caster.
    pub fn chebyshev(self, other: Self) -> Coord {
        self.row.abs_diff(other.row).max(self.col.abs_diff(other.col))
    }
}

impl From<(Coord, Coord)> for Position {
    fn from((row, col): (Coord, Coord)) -> Self {
        Self { row, col }
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.row, self.col)
    }
}

/// Unit step in `(row, col)` order.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Delta {
    pub d_row: i8,
    pub d_col: i8,
}

impl Delta {
    pub const fn new(d_row: i8, d_col: i8) -> Self {
        Self { d_row, d_col }
    }

    pub const fn is_diagonal(self) -> bool {
        self.d_row != 0 && self.d_col != 0
    }

    /// The pure row shift and pure column shift that make up this step.
    pub const fn split(self) -> (Delta, Delta) {
        (Delta::new(self.d_row, 0), Delta::new(0, self.d_col))
    }
}

/// Grid extent, `height` rows by `width` columns.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Dimensions {
    pub height: Coord,
    pub width: Coord,
}

impl Dimensions {
    pub const fn new(height: Coord, width: Coord) -> Self {
        Self { height, width }
    }

    pub const fn contains(self, pos: Position) -> bool {
        pos.row < self.height && pos.col < self.width
    }

    pub const fn total_cells(self) -> usize {
        self.height as usize * self.width as usize
    }

    pub const fn center(self) -> Position {
        Position::new(self.height / 2, self.width / 2)
    }

    /// Row-major iteration over every position.
    pub fn positions(self) -> impl Iterator<Item = Position> {
        (0..self.height).flat_map(move |row| (0..self.width).map(move |col| Position::new(row, col)))
    }
}

pub trait ToNdIndex {
    type Output;
    fn to_nd_index(self) -> Self::Output;
}

impl ToNdIndex for Position {
    type Output = [usize; 2];

    fn to_nd_index(self) -> Self::Output {
        [self.row.into(), self.col.into()]
    }
}

impl ToNdIndex for Dimensions {
    type Output = [usize; 2];

    fn to_nd_index(self) -> Self::Output {
        [self.height.into(), self.width.into()]
    }
}

/// In-bounds 8-way neighbours of a position, walking the compass table.
#[derive(Debug)]
pub struct NeighborIter {
    center: Position,
    bounds: Dimensions,
    index: u8,
}

impl NeighborIter {
    pub(crate) fn new(center: Position, bounds: Dimensions) -> Self {
        Self {
            center,
            bounds,
            index: 0,
        }
    }
}

impl Iterator for NeighborIter {
    type Item = Position;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let (_, delta) = COMPASS.get(usize::from(self.index))?;
            self.index += 1;

            if let Some(next_item) = self.center.offset_within(*delta, self.bounds) {
                return Some(next_item);
            }
        }
    }
}
