//! Direction tables shared by movement, directional reveal, and neighbour walks.

use serde::{Deserialize, Serialize};
use strum::{Display, EnumIter, EnumString};

use crate::Delta;

/// Compass direction. Discriminants index [`COMPASS`].
#[derive(
    Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString, EnumIter,
)]
#[strum(ascii_case_insensitive)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    #[strum(to_string = "north", serialize = "n")]
    #[serde(alias = "n")]
    North = 0,
    #[strum(to_string = "northeast", serialize = "north-east", serialize = "ne")]
    #[serde(alias = "ne")]
    NorthEast = 1,
    #[strum(to_string = "east", serialize = "e")]
    #[serde(alias = "e")]
    East = 2,
    #[strum(to_string = "southeast", serialize = "south-east", serialize = "se")]
    #[serde(alias = "se")]
    SouthEast = 3,
    #[strum(to_string = "south", serialize = "s")]
    #[serde(alias = "s")]
    South = 4,
    #[strum(to_string = "southwest", serialize = "south-west", serialize = "sw")]
    #[serde(alias = "sw")]
    SouthWest = 5,
    #[strum(to_string = "west", serialize = "w")]
    #[serde(alias = "w")]
    West = 6,
    #[strum(to_string = "northwest", serialize = "north-west", serialize = "nw")]
    #[serde(alias = "nw")]
    NorthWest = 7,
}

/// 8-way table, clockwise from north, in `(d_row, d_col)` order.
pub const COMPASS: [(Direction, Delta); 8] = [
    (Direction::North, Delta::new(-1, 0)),
    (Direction::NorthEast, Delta::new(-1, 1)),
    (Direction::East, Delta::new(0, 1)),
    (Direction::SouthEast, Delta::new(1, 1)),
    (Direction::South, Delta::new(1, 0)),
    (Direction::SouthWest, Delta::new(1, -1)),
    (Direction::West, Delta::new(0, -1)),
    (Direction::NorthWest, Delta::new(-1, -1)),
];

/// 4-way subset of [`COMPASS`].
pub const CARDINALS: [(Direction, Delta); 4] = [COMPASS[0], COMPASS[2], COMPASS[4], COMPASS[6]];

impl Direction {
    pub const fn delta(self) -> Delta {
        COMPASS[self as usize].1
    }

    pub const fn is_diagonal(self) -> bool {
        self.delta().is_diagonal()
    }

    pub const fn opposite(self) -> Self {
        COMPASS[(self as usize + 4) % COMPASS.len()].0
    }

    /// Lenient parse of a user-supplied key such as `"East"`, `"ne"` or `"south-west"`.
    pub fn parse(key: &str) -> Option<Self> {
        key.trim().parse().ok()
    }
}
