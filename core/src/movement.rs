use alloc::format;
use alloc::string::{String, ToString};
use alloc::vec::Vec;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::*;

/// Why a walk stopped before using up its steps.
#[derive(Error, Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum MoveError {
    #[error("invalid direction")]
    InvalidDirection,
    #[error("out of bounds")]
    OutOfBounds,
    #[error("blocked by {category} at {at}")]
    Blocked { at: Position, category: CellCategory },
    #[error("cannot squeeze past the {category} at {at}")]
    CornerCut { at: Position, category: CellCategory },
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct MoveResult {
    pub success: bool,
    pub steps_moved: u32,
    pub old_position: Position,
    pub new_position: Position,
    pub direction: Option<Direction>,
    pub stop: Option<MoveError>,
    pub message: String,
}

impl MoveResult {
    fn invalid_direction(at: Position) -> Self {
        Self {
            success: false,
            steps_moved: 0,
            old_position: at,
            new_position: at,
            direction: None,
            stop: Some(MoveError::InvalidDirection),
            message: MoveError::InvalidDirection.to_string(),
        }
    }
}

/// Whether the party may enter `cell`. Rules apply in order, first match wins.
pub fn is_passable(cell: &Cell) -> bool {
    if cell.is_stairs() {
        return true;
    }
    if cell.is_secret() {
        return false;
    }
    if cell.is_door() {
        return cell.is_arch();
    }
    !(cell.is_blocked() || cell.is_perimeter())
}

/// Step-wise walker over a borrowed grid. Computes where a walk ends; the
/// caller commits the result.
#[derive(Copy, Clone, Debug)]
pub struct MovementEngine<'a> {
    grid: &'a GridIndex,
}

impl<'a> MovementEngine<'a> {
    pub fn new(grid: &'a GridIndex) -> Self {
        Self { grid }
    }

    pub fn is_passable(&self, pos: Position) -> bool {
        self.grid.get_cell(pos).is_some_and(is_passable)
    }

    /// Validates a single step, including the corner rule for diagonals.
    pub fn check_step(&self, from: Position, direction: Direction) -> core::result::Result<Position, MoveError> {
        let delta = direction.delta();
        let candidate = from
            .offset_within(delta, self.grid.dimensions())
            .ok_or(MoveError::OutOfBounds)?;

        let cell = &self.grid[candidate];
        if !is_passable(cell) {
            return Err(MoveError::Blocked {
                at: candidate,
                category: cell.category(),
            });
        }

        if delta.is_diagonal() {
            let (row_shift, col_shift) = delta.split();
            for side in [row_shift, col_shift] {
                // both sides lie between `from` and an in-bounds candidate
                let Some(side) = from.offset(side) else {
                    return Err(MoveError::OutOfBounds);
                };
                let cell = &self.grid[side];
                if !is_passable(cell) {
                    return Err(MoveError::CornerCut {
                        at: side,
                        category: cell.category(),
                    });
                }
            }
        }

        Ok(candidate)
    }

    /// Walks up to `steps` cells from `from`, stopping at the first refused step.
    pub fn plan(&self, from: Position, direction: Direction, steps: u32) -> MoveResult {
        let mut current = from;
        let mut steps_moved = 0;
        let mut stop = None;

        while steps_moved < steps {
            match self.check_step(current, direction) {
                Ok(next) => {
                    current = next;
                    steps_moved += 1;
                }
                Err(err) => {
                    stop = Some(err);
                    break;
                }
            }
        }

        let message = describe(direction, steps_moved, current, stop);
        MoveResult {
            success: steps_moved > 0,
            steps_moved,
            old_position: from,
            new_position: current,
            direction: Some(direction),
            stop,
            message,
        }
    }

    /// [`plan`](Self::plan) for an unparsed direction key.
    pub fn plan_key(&self, from: Position, key: &str, steps: u32) -> MoveResult {
        match Direction::parse(key) {
            Some(direction) => self.plan(from, direction, steps),
            None => MoveResult::invalid_direction(from),
        }
    }

    /// Directions whose single step from `from` would be accepted.
    pub fn valid_moves(&self, from: Position) -> Vec<Direction> {
        COMPASS
            .iter()
            .map(|(direction, _)| *direction)
            .filter(|&direction| self.check_step(from, direction).is_ok())
            .collect()
    }
}

fn describe(direction: Direction, steps_moved: u32, at: Position, stop: Option<MoveError>) -> String {
    let plural = if steps_moved == 1 { "" } else { "s" };
    match (steps_moved, stop) {
        (0, Some(reason)) => format!("{reason}"),
        (0, None) => String::from("no movement"),
        (_, Some(reason)) => format!("moved {direction} {steps_moved} step{plural} to {at}; {reason}"),
        (_, None) => format!("moved {direction} {steps_moved} step{plural} to {at}"),
    }
}
