#![no_std]

extern crate alloc;

use alloc::vec::Vec;
use serde::{Deserialize, Serialize};

pub use cell::*;
pub use direction::*;
pub use dungeon::*;
pub use error::*;
pub use flags::*;
pub use generation::*;
pub use grid::*;
pub use movement::*;
pub use types::*;
pub use visibility::*;

mod cell;
mod direction;
mod dungeon;
mod error;
mod flags;
mod generation;
mod grid;
mod movement;
mod types;
mod visibility;

pub const DEFAULT_LOOKAHEAD: Coord = 2;

#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DungeonConfig {
    /// Shadow-casting radius, in Chebyshev rings.
    pub view_radius: Coord,
    /// Cells revealed straight ahead after a step.
    pub lookahead: Coord,
    pub revealed_secret: RevealedSecret,
}

impl Default for DungeonConfig {
    fn default() -> Self {
        Self {
            view_radius: DEFAULT_VIEW_RADIUS,
            lookahead: DEFAULT_LOOKAHEAD,
            revealed_secret: RevealedSecret::default(),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum SearchOutcome {
    AlreadySearched,
    Searched { found: Vec<Position> },
}

impl SearchOutcome {
    pub fn has_update(&self) -> bool {
        match self {
            Self::AlreadySearched => false,
            Self::Searched { found } => !found.is_empty(),
        }
    }
}
