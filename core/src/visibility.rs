//! Fog of war: recursive shadow-casting over eight octants.
//!
//! The engine owns only the explored/visible layers. The grid and the origin
//! are borrowed for every call, so there is no copy of either to go stale.

use alloc::vec::Vec;

use ndarray::Array2;
use serde::{Deserialize, Serialize};

use crate::*;

pub const DEFAULT_VIEW_RADIUS: Coord = 8;

/// Whether `cell` stops line of sight.
///
/// Door bits are checked before walls so that a door cut into a room
/// perimeter is judged by its door state, the same precedence movement uses.
pub fn blocks_sight(cell: &Cell) -> bool {
    if cell.is_door() {
        return !matches!(
            cell.door_kind(),
            Some(DoorKind::Arch | DoorKind::Portcullis)
        );
    }
    cell.is_nothing() || cell.is_blocked() || cell.is_perimeter()
}

/// Axis multipliers mapping octant-local `(dx, dy)` onto the grid.
#[derive(Copy, Clone, Debug)]
struct Octant {
    xx: i32,
    xy: i32,
    yx: i32,
    yy: i32,
}

impl Octant {
    const fn new(xx: i32, xy: i32, yx: i32, yy: i32) -> Self {
        Self { xx, xy, yx, yy }
    }

    fn transform(&self, origin: Position, dx: i32, dy: i32, dims: Dimensions) -> Option<Position> {
        let col = i32::from(origin.col) + dx * self.xx + dy * self.xy;
        let row = i32::from(origin.row) + dx * self.yx + dy * self.yy;
        let pos = Position::new(Coord::try_from(row).ok()?, Coord::try_from(col).ok()?);
        dims.contains(pos).then_some(pos)
    }
}

const OCTANTS: [Octant; 8] = [
    Octant::new(1, 0, 0, 1),
    Octant::new(0, 1, 1, 0),
    Octant::new(0, -1, 1, 0),
    Octant::new(-1, 0, 0, 1),
    Octant::new(-1, 0, 0, -1),
    Octant::new(0, -1, -1, 0),
    Octant::new(0, 1, -1, 0),
    Octant::new(1, 0, 0, -1),
];

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct VisibilityEngine {
    explored: Array2<bool>,
    visible: Array2<bool>,
    radius: Coord,
    reveal_all: bool,
}

impl VisibilityEngine {
    pub fn new(dims: Dimensions, radius: Coord) -> Self {
        Self {
            explored: Array2::default(dims.to_nd_index()),
            visible: Array2::default(dims.to_nd_index()),
            radius,
            reveal_all: false,
        }
    }

    pub fn radius(&self) -> Coord {
        self.radius
    }

    pub fn reveal_all(&self) -> bool {
        self.reveal_all
    }

    /// Debug override. While set, every position reports visible and explored;
    /// the computed layers keep updating underneath and show again once cleared.
    pub fn set_reveal_all(&mut self, reveal_all: bool) {
        self.reveal_all = reveal_all;
    }

    /// Recomputes `visible` around `origin` from scratch and folds it into `explored`.
    pub fn update(&mut self, grid: &GridIndex, origin: Position) {
        self.visible.fill(false);

        if grid.is_valid_position(origin) {
            self.light(origin);
            for octant in &OCTANTS {
                self.cast_light(grid, origin, 1, 1.0, 0.0, octant);
            }
        }

        log::trace!(
            "visibility from {origin}: {} visible",
            self.visible.iter().filter(|&&lit| lit).count()
        );
    }

    fn cast_light(
        &mut self,
        grid: &GridIndex,
        origin: Position,
        row: i32,
        mut start: f64,
        end: f64,
        octant: &Octant,
    ) {
        if start < end {
            return;
        }

        let radius = i32::from(self.radius);
        let dims = grid.dimensions();
        let mut next_start = start;

        for distance in row..=radius {
            let mut blocked = false;
            let dy = -distance;

            for dx in -distance..=0 {
                let left = (f64::from(dx) - 0.5) / (f64::from(dy) + 0.5);
                let right = (f64::from(dx) + 0.5) / (f64::from(dy) - 0.5);
                if start < right {
                    continue;
                }
                if end > left {
                    break;
                }

                let target = octant.transform(origin, dx, dy, dims);
                if let Some(pos) = target {
                    self.light(pos);
                }
                // off the map counts as solid rock
                let opaque = target.is_none_or(|pos| blocks_sight(&grid[pos]));

                if blocked {
                    if opaque {
                        next_start = right;
                    } else {
                        blocked = false;
                        start = next_start;
                    }
                } else if opaque && distance < radius {
                    blocked = true;
                    self.cast_light(grid, origin, distance + 1, start, left, octant);
                    next_start = right;
                }
            }

            if blocked {
                break;
            }
        }
    }

    /// Marks up to `depth` cells ahead of `from` along `direction`, stopping after
    /// the first one that blocks sight.
    pub fn reveal_ahead(&mut self, grid: &GridIndex, from: Position, direction: Direction, depth: Coord) {
        let mut pos = from;
        for _ in 0..depth {
            let Some(next) = pos.offset_within(direction.delta(), grid.dimensions()) else {
                break;
            };
            self.light(next);
            if blocks_sight(&grid[next]) {
                break;
            }
            pos = next;
        }
    }

    fn light(&mut self, pos: Position) {
        self.visible[pos.to_nd_index()] = true;
        self.explored[pos.to_nd_index()] = true;
    }

    pub fn is_visible(&self, pos: Position) -> bool {
        match self.visible.get(pos.to_nd_index()) {
            Some(&lit) => lit || self.reveal_all,
            None => false,
        }
    }

    pub fn is_explored(&self, pos: Position) -> bool {
        match self.explored.get(pos.to_nd_index()) {
            Some(&seen) => seen || self.reveal_all,
            None => false,
        }
    }

    /// Currently visible positions, row-major.
    pub fn visible_cells(&self) -> Vec<Position> {
        self.dimensions()
            .positions()
            .filter(|&pos| self.is_visible(pos))
            .collect()
    }

    pub fn explored_count(&self) -> usize {
        if self.reveal_all {
            return self.explored.len();
        }
        self.explored.iter().filter(|&&seen| seen).count()
    }

    /// Debug reset: forget everything seen so far.
    pub fn reset_exploration(&mut self) {
        self.explored.fill(false);
        self.visible.fill(false);
    }

    pub fn dimensions(&self) -> Dimensions {
        let (height, width) = self.visible.dim();
        Dimensions::new(height as Coord, width as Coord)
    }

    /// Whether both layers have exactly the shape of `dims`.
    pub(crate) fn fits(&self, dims: Dimensions) -> bool {
        let shape = (usize::from(dims.height), usize::from(dims.width));
        self.visible.dim() == shape && self.explored.dim() == shape
    }
}
