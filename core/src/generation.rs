//! Intake of the layout generator's output.
//!
//! The generator itself lives elsewhere; this module only accepts its result,
//! checks that it is structurally sound, and turns it into a [`GridIndex`].

use alloc::collections::{BTreeSet, VecDeque};
use alloc::format;
use alloc::string::ToString;
use alloc::vec::Vec;

use serde::{Deserialize, Serialize};

use crate::*;

/// Axis-aligned room, bounds inclusive.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Room {
    pub id: u16,
    pub north: Coord,
    pub south: Coord,
    pub west: Coord,
    pub east: Coord,
}

impl Room {
    pub const fn center(&self) -> Position {
        Position::new(
            Coord::midpoint(self.north, self.south),
            Coord::midpoint(self.west, self.east),
        )
    }

    pub const fn contains(&self, pos: Position) -> bool {
        pos.row >= self.north && pos.row <= self.south && pos.col >= self.west && pos.col <= self.east
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DoorRecord {
    pub position: Position,
    pub orientation: Direction,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StairKind {
    Up,
    Down,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct StairRecord {
    pub position: Position,
    /// Points from the stair towards the cell the party lands on.
    pub orientation: Direction,
    pub linked_position: Option<Position>,
    pub kind: StairKind,
}

impl StairRecord {
    pub fn landing(&self) -> Option<Position> {
        self.position.offset(self.orientation.delta())
    }
}

/// Output of the external layout generator: raw cell words plus placement metadata.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct GenerationResult {
    pub width: usize,
    pub height: usize,
    pub grid: Vec<Vec<u32>>,
    pub rooms: Vec<Room>,
    pub doors: Vec<DoorRecord>,
    pub stairs: Vec<StairRecord>,
}

impl GenerationResult {
    pub fn from_json(json: &str) -> Result<Self> {
        let result: Self =
            serde_json::from_str(json).map_err(|err| DungeonError::Malformed(err.to_string()))?;
        result.validate()?;
        Ok(result)
    }

    /// Parses a hand-authored map, one character per cell.
    ///
    /// Ragged lines are padded with rock. Door and stair orientation points at
    /// the first open cardinal neighbour; connected room floor becomes a room.
    pub fn from_ascii(map: &str) -> Result<Self> {
        let lines: Vec<&str> = map.lines().collect();
        let height = lines.len();
        let width = lines.iter().map(|line| line.chars().count()).max().unwrap_or(0);

        let mut grid = Vec::with_capacity(height);
        for (row, line) in lines.iter().enumerate() {
            let mut words = Vec::with_capacity(width);
            for (col, symbol) in line.chars().enumerate() {
                let flags = flags_for_symbol(symbol).ok_or_else(|| {
                    DungeonError::Malformed(format!(
                        "unknown map symbol {symbol:?} at ({row}, {col})"
                    ))
                })?;
                words.push(flags.bits());
            }
            words.resize(width, CellFlags::NOTHING.bits());
            grid.push(words);
        }

        let mut result = Self {
            width,
            height,
            grid,
            rooms: Vec::new(),
            doors: Vec::new(),
            stairs: Vec::new(),
        };
        result.validate()?;
        result.derive_rooms();
        result.derive_features();
        Ok(result)
    }

    pub fn dimensions(&self) -> Result<Dimensions> {
        let height = Coord::try_from(self.height).map_err(|_| DungeonError::TooLarge)?;
        let width = Coord::try_from(self.width).map_err(|_| DungeonError::TooLarge)?;
        Ok(Dimensions::new(height, width))
    }

    pub fn validate(&self) -> Result<()> {
        if self.height == 0 || self.width == 0 || self.grid.is_empty() {
            return Err(DungeonError::EmptyGrid);
        }
        let dims = self.dimensions()?;

        if self.grid.len() != self.height {
            return Err(DungeonError::HeightMismatch {
                expected: self.height,
                actual: self.grid.len(),
            });
        }
        if let Some((row, words)) = self
            .grid
            .iter()
            .enumerate()
            .find(|(_, words)| words.len() != self.width)
        {
            return Err(DungeonError::WidthMismatch {
                row,
                expected: self.width,
                actual: words.len(),
            });
        }

        let check = |what: &'static str, position: Position| {
            if dims.contains(position) {
                Ok(())
            } else {
                Err(DungeonError::OutsideGrid { what, position })
            }
        };
        for room in &self.rooms {
            if room.north > room.south || room.west > room.east {
                return Err(DungeonError::Malformed(format!(
                    "room {} has inverted bounds",
                    room.id
                )));
            }
            check("room", Position::new(room.south, room.east))?;
        }
        for door in &self.doors {
            check("door", door.position)?;
        }
        for stair in &self.stairs {
            check("stair", stair.position)?;
        }
        Ok(())
    }

    /// Validates and converts the raw words into cells, row-major.
    pub fn build_grid(&self, revealed_as: RevealedSecret) -> Result<GridIndex> {
        self.validate()?;
        let dims = self.dimensions()?;

        let known = CellFlags::all().bits() | ROOM_ID_MASK;
        let mut unknown_bits = 0;
        let cells = dims
            .positions()
            .map(|pos| {
                let word = self.grid[usize::from(pos.row)][usize::from(pos.col)];
                unknown_bits |= word & !known;
                Cell::from_word(pos, word, revealed_as)
            })
            .collect();

        if unknown_bits != 0 {
            log::warn!("Generation result uses undefined cell bits {unknown_bits:#x}, ignored");
        }
        GridIndex::from_cells(dims, cells)
    }

    fn word_at(&self, pos: Position) -> u32 {
        self.grid[usize::from(pos.row)][usize::from(pos.col)]
    }

    fn flags_at(&self, pos: Position) -> CellFlags {
        CellFlags::from_bits_truncate(self.word_at(pos))
    }

    /// Groups 4-connected room floor into rooms and stamps their ids into the words.
    fn derive_rooms(&mut self) {
        let Ok(dims) = self.dimensions() else {
            return;
        };

        let mut visited = BTreeSet::new();
        for start in dims.positions() {
            if !self.flags_at(start).contains(CellFlags::ROOM) || !visited.insert(start) {
                continue;
            }

            let Ok(id) = u16::try_from(self.rooms.len() + 1) else {
                return;
            };
            let mut room = Room {
                id,
                north: start.row,
                south: start.row,
                west: start.col,
                east: start.col,
            };
            let mut members = Vec::new();
            let mut to_visit = VecDeque::from([start]);

            while let Some(pos) = to_visit.pop_front() {
                members.push(pos);
                room.north = room.north.min(pos.row);
                room.south = room.south.max(pos.row);
                room.west = room.west.min(pos.col);
                room.east = room.east.max(pos.col);

                to_visit.extend(
                    CARDINALS
                        .iter()
                        .filter_map(|(_, delta)| pos.offset_within(*delta, dims))
                        .filter(|&next| self.flags_at(next).contains(CellFlags::ROOM))
                        .filter(|&next| visited.insert(next)),
                );
            }

            for pos in members {
                let word = &mut self.grid[usize::from(pos.row)][usize::from(pos.col)];
                *word |= (u32::from(id) << ROOM_ID_MASK.trailing_zeros()) & ROOM_ID_MASK;
            }
            self.rooms.push(room);
        }
    }

    /// Creates door and stair records for every door or stair cell.
    fn derive_features(&mut self) {
        let Ok(dims) = self.dimensions() else {
            return;
        };

        for position in dims.positions() {
            let flags = self.flags_at(position);
            if !flags.intersects(CellFlags::DOORSPACE | CellFlags::STAIRS) {
                continue;
            }

            let orientation = CARDINALS
                .iter()
                .find(|(_, delta)| {
                    position
                        .offset_within(*delta, dims)
                        .is_some_and(|next| self.flags_at(next).intersects(CellFlags::OPENSPACE))
                })
                .map_or(Direction::South, |(direction, _)| *direction);

            if flags.intersects(CellFlags::STAIRS) {
                let kind = if flags.contains(CellFlags::STAIR_UP) {
                    StairKind::Up
                } else {
                    StairKind::Down
                };
                self.stairs.push(StairRecord {
                    position,
                    orientation,
                    linked_position: None,
                    kind,
                });
            } else {
                self.doors.push(DoorRecord {
                    position,
                    orientation,
                });
            }
        }
    }
}

fn flags_for_symbol(symbol: char) -> Option<CellFlags> {
    Some(match symbol {
        ' ' => CellFlags::NOTHING,
        'X' => CellFlags::BLOCKED,
        '#' => CellFlags::PERIMETER,
        '.' => CellFlags::ROOM,
        ',' => CellFlags::CORRIDOR,
        '\'' => CellFlags::ARCH,
        '+' => CellFlags::DOOR,
        'L' => CellFlags::LOCKED,
        'T' => CellFlags::TRAPPED,
        'S' => CellFlags::SECRET,
        '|' => CellFlags::PORTCULLIS,
        '<' => CellFlags::STAIR_UP,
        '>' => CellFlags::STAIR_DOWN,
        _ => return None,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloc::vec;

    fn open(height: usize, width: usize) -> GenerationResult {
        GenerationResult {
            width,
            height,
            grid: vec![vec![CellFlags::ROOM.bits(); width]; height],
            rooms: Vec::new(),
            doors: Vec::new(),
            stairs: Vec::new(),
        }
    }

    #[test]
    fn validate_rejects_height_mismatch() {
        let mut result = open(3, 3);
        result.height = 4;

        assert_eq!(
            result.validate(),
            Err(DungeonError::HeightMismatch {
                expected: 4,
                actual: 3
            })
        );
    }

    #[test]
    fn validate_reports_ragged_row() {
        let mut result = open(3, 3);
        result.grid[1].pop();

        assert_eq!(
            result.validate(),
            Err(DungeonError::WidthMismatch {
                row: 1,
                expected: 3,
                actual: 2
            })
        );
    }

    #[test]
    fn validate_rejects_empty_grid() {
        assert_eq!(open(0, 0).validate(), Err(DungeonError::EmptyGrid));
    }

    #[test]
    fn validate_rejects_door_outside_grid() {
        let mut result = open(2, 2);
        result.doors.push(DoorRecord {
            position: Position::new(0, 2),
            orientation: Direction::East,
        });

        assert_eq!(
            result.validate(),
            Err(DungeonError::OutsideGrid {
                what: "door",
                position: Position::new(0, 2)
            })
        );
    }

    #[test]
    fn from_json_requires_every_field() {
        let err = GenerationResult::from_json(r#"{"width": 1, "height": 1, "grid": [[2]]}"#);

        assert!(matches!(err, Err(DungeonError::Malformed(_))));
    }

    #[test]
    fn from_json_reads_records() {
        let json = r#"{
            "width": 3,
            "height": 1,
            "grid": [[8388608, 4, 4]],
            "rooms": [],
            "doors": [],
            "stairs": [{
                "position": {"row": 0, "col": 0},
                "orientation": "east",
                "linked_position": null,
                "kind": "up"
            }]
        }"#;

        let result = GenerationResult::from_json(json).unwrap();

        assert_eq!(result.stairs[0].kind, StairKind::Up);
        assert_eq!(result.stairs[0].landing(), Some(Position::new(0, 1)));
    }

    #[test]
    fn from_ascii_derives_rooms_and_features() {
        let result = GenerationResult::from_ascii(
            "#####\n\
             #...#\n\
             #...+,,<\n\
             #####",
        )
        .unwrap();

        assert_eq!((result.height, result.width), (4, 8));
        assert_eq!(result.rooms.len(), 1);
        assert_eq!(result.rooms[0].center(), Position::new(1, 2));
        assert_eq!(
            result.doors,
            vec![DoorRecord {
                position: Position::new(2, 4),
                orientation: Direction::East,
            }]
        );
        assert_eq!(result.stairs[0].orientation, Direction::West);
        assert_eq!(result.stairs[0].kind, StairKind::Up);
    }

    #[test]
    fn from_ascii_stamps_room_ids() {
        let result = GenerationResult::from_ascii("..#..").unwrap();
        let grid = result.build_grid(RevealedSecret::Arch).unwrap();

        assert_eq!(result.rooms.len(), 2);
        assert_eq!(grid[Position::new(0, 1)].room_id(), Some(1));
        assert_eq!(grid[Position::new(0, 4)].room_id(), Some(2));
        assert_eq!(grid[Position::new(0, 2)].room_id(), None);
    }

    #[test]
    fn room_center_near_the_coordinate_limit() {
        let room = Room {
            id: 1,
            north: 40000,
            south: 40000,
            west: Coord::MAX - 1,
            east: Coord::MAX,
        };

        assert_eq!(room.center(), Position::new(40000, Coord::MAX - 1));
    }

    #[test]
    fn from_ascii_rejects_unknown_symbols() {
        assert!(matches!(
            GenerationResult::from_ascii("..?"),
            Err(DungeonError::Malformed(_))
        ));
    }
}
