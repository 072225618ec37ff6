use alloc::string::String;
use thiserror::Error;

use crate::Position;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DungeonError {
    #[error("Invalid coordinates {0}")]
    InvalidCoords(Position),
    #[error("Generation result has an empty grid")]
    EmptyGrid,
    #[error("Grid has {actual} rows but the declared height is {expected}")]
    HeightMismatch { expected: usize, actual: usize },
    #[error("Grid row {row} has {actual} columns but the declared width is {expected}")]
    WidthMismatch {
        row: usize,
        expected: usize,
        actual: usize,
    },
    #[error("{what} at {position} lies outside the grid")]
    OutsideGrid {
        what: &'static str,
        position: Position,
    },
    #[error("Grid dimensions exceed the supported coordinate range")]
    TooLarge,
    #[error("Malformed generation result: {0}")]
    Malformed(String),
    #[error("Inconsistent dungeon snapshot: {0}")]
    Snapshot(&'static str),
}

pub type Result<T> = core::result::Result<T, DungeonError>;
