use ndarray::Array2;
use serde::{Deserialize, Serialize};

use crate::*;

/// Bounds-checked store of cells, indexed `[row, col]`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct GridIndex {
    cells: Array2<Cell>,
}

impl GridIndex {
    /// `cells` must hold `dims.total_cells()` entries in row-major order.
    pub(crate) fn from_cells(dims: Dimensions, cells: alloc::vec::Vec<Cell>) -> Result<Self> {
        let actual = cells.len();
        let cells = Array2::from_shape_vec(dims.to_nd_index(), cells).map_err(|_| {
            DungeonError::Malformed(alloc::format!(
                "expected {} cells, got {actual}",
                dims.total_cells()
            ))
        })?;
        Ok(Self { cells })
    }

    pub fn dimensions(&self) -> Dimensions {
        let (height, width) = self.cells.dim();
        // construction caps both axes at `Coord::MAX`
        Dimensions::new(height as Coord, width as Coord)
    }

    pub fn height(&self) -> Coord {
        self.dimensions().height
    }

    pub fn width(&self) -> Coord {
        self.dimensions().width
    }

    pub fn is_valid_position(&self, pos: Position) -> bool {
        self.dimensions().contains(pos)
    }

    pub fn validate_coords(&self, pos: Position) -> Result<Position> {
        if self.is_valid_position(pos) {
            Ok(pos)
        } else {
            Err(DungeonError::InvalidCoords(pos))
        }
    }

    pub fn get_cell(&self, pos: Position) -> Option<&Cell> {
        self.cells.get(pos.to_nd_index())
    }

    pub(crate) fn get_cell_mut(&mut self, pos: Position) -> Option<&mut Cell> {
        self.cells.get_mut(pos.to_nd_index())
    }

    /// Row-major iteration over every cell.
    pub fn cells(&self) -> impl Iterator<Item = &Cell> {
        self.cells.iter()
    }

    /// Whether every cell sits at the index it claims.
    pub(crate) fn is_consistent(&self) -> bool {
        self.cells
            .indexed_iter()
            .all(|((row, col), cell)| {
                let pos = cell.position();
                usize::from(pos.row) == row && usize::from(pos.col) == col
            })
    }

    pub fn neighbors(&self, pos: Position) -> NeighborIter {
        NeighborIter::new(pos, self.dimensions())
    }

    /// Top-left pixel of a cell, `(x, y)`, for renderers. Not used by the model itself.
    pub fn to_pixel(&self, pos: Position, cell_size: u32) -> (u32, u32) {
        (u32::from(pos.col) * cell_size, u32::from(pos.row) * cell_size)
    }

    /// Inverse of [`to_pixel`](Self::to_pixel); `None` outside the grid or for a zero cell size.
    pub fn from_pixel(&self, x: u32, y: u32, cell_size: u32) -> Option<Position> {
        let col = Coord::try_from(x.checked_div(cell_size)?).ok()?;
        let row = Coord::try_from(y.checked_div(cell_size)?).ok()?;
        Some(Position::new(row, col)).filter(|&pos| self.is_valid_position(pos))
    }
}

impl core::ops::Index<Position> for GridIndex {
    type Output = Cell;

    fn index(&self, pos: Position) -> &Self::Output {
        &self.cells[pos.to_nd_index()]
    }
}
