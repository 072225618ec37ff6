use alloc::vec::Vec;

use serde::{Deserialize, Serialize};

use crate::*;

/// Live model of one dungeon level: the cell grid, what the party has seen, and
/// where it stands.
///
/// Every change of the party position recomputes visibility before returning,
/// so callers never observe a position without its matching field of view.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "DungeonSnapshot")]
pub struct DungeonState {
    config: DungeonConfig,
    grid: GridIndex,
    rooms: Vec<Room>,
    doors: Vec<DoorRecord>,
    stairs: Vec<StairRecord>,
    visibility: VisibilityEngine,
    party_position: Position,
}

impl DungeonState {
    pub fn new(result: &GenerationResult, config: DungeonConfig) -> Result<Self> {
        let grid = result.build_grid(config.revealed_secret)?;
        let start = choose_start(&grid, &result.rooms, &result.stairs);
        let visibility = VisibilityEngine::new(grid.dimensions(), config.view_radius);

        let mut state = Self {
            config,
            grid,
            rooms: result.rooms.clone(),
            doors: result.doors.clone(),
            stairs: result.stairs.clone(),
            visibility,
            party_position: start,
        };
        state.refresh_visibility();

        log::debug!(
            "Dungeon {}x{} ready: {} rooms, {} doors, {} stairs, party at {start}",
            state.grid.height(),
            state.grid.width(),
            state.rooms.len(),
            state.doors.len(),
            state.stairs.len(),
        );
        Ok(state)
    }

    pub fn from_json(json: &str, config: DungeonConfig) -> Result<Self> {
        Self::new(&GenerationResult::from_json(json)?, config)
    }

    /// Swaps in a freshly generated level. Exploration starts over; on error the
    /// current level is left untouched.
    pub fn regenerate(&mut self, result: &GenerationResult) -> Result<()> {
        *self = Self::new(result, self.config)?;
        Ok(())
    }

    pub fn config(&self) -> &DungeonConfig {
        &self.config
    }

    pub fn grid(&self) -> &GridIndex {
        &self.grid
    }

    pub fn dimensions(&self) -> Dimensions {
        self.grid.dimensions()
    }

    pub fn visibility(&self) -> &VisibilityEngine {
        &self.visibility
    }

    pub fn party_position(&self) -> Position {
        self.party_position
    }

    pub fn get_cell(&self, pos: Position) -> Option<&Cell> {
        self.grid.get_cell(pos)
    }

    /// Teleports the party. Fails without side effects if `pos` is off the grid.
    pub fn place_party(&mut self, pos: Position) -> Result<()> {
        let pos = self.grid.validate_coords(pos)?;
        self.set_party_position(pos);
        Ok(())
    }

    fn set_party_position(&mut self, pos: Position) {
        self.party_position = pos;
        self.refresh_visibility();
    }

    fn refresh_visibility(&mut self) {
        self.visibility.update(&self.grid, self.party_position);
    }

    /// Walks the party `steps` cells towards `key` ("north", "ne", ...).
    pub fn move_party(&mut self, key: &str, steps: u32) -> MoveResult {
        let result = MovementEngine::new(&self.grid).plan_key(self.party_position, key, steps);
        self.commit(&result);
        result
    }

    pub fn move_in(&mut self, direction: Direction, steps: u32) -> MoveResult {
        let result = MovementEngine::new(&self.grid).plan(self.party_position, direction, steps);
        self.commit(&result);
        result
    }

    fn commit(&mut self, result: &MoveResult) {
        if result.steps_moved == 0 {
            log::debug!("party stays at {}: {}", self.party_position, result.message);
            return;
        }

        self.set_party_position(result.new_position);
        if let Some(direction) = result.direction {
            self.visibility
                .reveal_ahead(&self.grid, result.new_position, direction, self.config.lookahead);
        }
        log::debug!("party {}", result.message);
    }

    /// In bounds and enterable right now.
    pub fn is_valid_position(&self, pos: Position) -> bool {
        MovementEngine::new(&self.grid).is_passable(pos)
    }

    pub fn valid_moves(&self) -> Vec<Direction> {
        MovementEngine::new(&self.grid).valid_moves(self.party_position)
    }

    /// Returns false if `pos` holds no undiscovered secret.
    pub fn reveal_secret(&mut self, pos: Position) -> bool {
        let changed = self
            .grid
            .get_cell_mut(pos)
            .is_some_and(|cell| cell.reveal_secret());
        if changed {
            log::debug!("secret at {pos} revealed");
            self.refresh_visibility();
        }
        changed
    }

    /// Returns false if `pos` holds nothing that can be broken.
    pub fn break_door(&mut self, pos: Position) -> bool {
        let changed = self
            .grid
            .get_cell_mut(pos)
            .is_some_and(|cell| cell.break_door());
        if changed {
            log::debug!("door at {pos} broken");
            self.refresh_visibility();
        }
        changed
    }

    /// Searches around the party. Each cell can only be searched once; every
    /// hidden secret next to it is found.
    pub fn search(&mut self) -> SearchOutcome {
        let center = self.party_position;
        if !self
            .grid
            .get_cell_mut(center)
            .is_some_and(|cell| cell.mark_searched())
        {
            return SearchOutcome::AlreadySearched;
        }

        let found: Vec<Position> = self
            .grid
            .neighbors(center)
            .filter(|&pos| self.grid[pos].is_secret())
            .collect();
        for &pos in &found {
            if let Some(cell) = self.grid.get_cell_mut(pos) {
                cell.reveal_secret();
            }
        }

        if !found.is_empty() {
            log::debug!("search at {center} found {} secret(s)", found.len());
            self.refresh_visibility();
        }
        SearchOutcome::Searched { found }
    }

    pub fn is_visible(&self, pos: Position) -> bool {
        self.visibility.is_visible(pos)
    }

    pub fn is_explored(&self, pos: Position) -> bool {
        self.visibility.is_explored(pos)
    }

    pub fn visible_cells(&self) -> Vec<Position> {
        self.visibility.visible_cells()
    }

    pub fn set_reveal_all(&mut self, reveal_all: bool) {
        self.visibility.set_reveal_all(reveal_all);
        if !reveal_all {
            self.refresh_visibility();
        }
    }

    /// Forgets everything seen so far, then looks around again.
    pub fn reset_exploration(&mut self) {
        self.visibility.reset_exploration();
        self.refresh_visibility();
    }

    pub fn rooms(&self) -> &[Room] {
        &self.rooms
    }

    pub fn room_at(&self, pos: Position) -> Option<&Room> {
        self.rooms.iter().find(|room| room.contains(pos))
    }

    pub fn doors(&self) -> &[DoorRecord] {
        &self.doors
    }

    pub fn door_at(&self, pos: Position) -> Option<&DoorRecord> {
        self.doors.iter().find(|door| door.position == pos)
    }

    pub fn stairs(&self) -> &[StairRecord] {
        &self.stairs
    }

    pub fn stair_at(&self, pos: Position) -> Option<&StairRecord> {
        self.stairs.iter().find(|stair| stair.position == pos)
    }

    pub fn add_entity(&mut self, pos: Position, id: EntityId) -> bool {
        self.grid.get_cell_mut(pos).is_some_and(|cell| cell.add_entity(id))
    }

    pub fn remove_entity(&mut self, pos: Position, id: EntityId) -> bool {
        self.grid
            .get_cell_mut(pos)
            .is_some_and(|cell| cell.remove_entity(id))
    }

    pub fn add_item(&mut self, pos: Position, id: ItemId) -> bool {
        self.grid.get_cell_mut(pos).is_some_and(|cell| cell.add_item(id))
    }

    pub fn remove_item(&mut self, pos: Position, id: ItemId) -> bool {
        self.grid.get_cell_mut(pos).is_some_and(|cell| cell.remove_item(id))
    }
}

/// Unchecked wire form of [`DungeonState`].
#[derive(Deserialize)]
struct DungeonSnapshot {
    config: DungeonConfig,
    grid: GridIndex,
    rooms: Vec<Room>,
    doors: Vec<DoorRecord>,
    stairs: Vec<StairRecord>,
    visibility: VisibilityEngine,
    party_position: Position,
}

impl TryFrom<DungeonSnapshot> for DungeonState {
    type Error = DungeonError;

    fn try_from(snapshot: DungeonSnapshot) -> Result<Self> {
        let dims = snapshot.grid.dimensions();
        if !snapshot.grid.is_consistent() {
            return Err(DungeonError::Snapshot("cell positions do not match the grid"));
        }
        if !snapshot.visibility.fits(dims) {
            return Err(DungeonError::Snapshot("visibility layers do not match the grid"));
        }
        if !dims.contains(snapshot.party_position) {
            return Err(DungeonError::Snapshot("party is outside the grid"));
        }
        let doors = snapshot.doors.iter().map(|door| door.position);
        let stairs = snapshot.stairs.iter().map(|stair| stair.position);
        if !doors.chain(stairs).all(|pos| dims.contains(pos)) {
            return Err(DungeonError::Snapshot("door or stair outside the grid"));
        }

        Ok(Self {
            config: snapshot.config,
            grid: snapshot.grid,
            rooms: snapshot.rooms,
            doors: snapshot.doors,
            stairs: snapshot.stairs,
            visibility: snapshot.visibility,
            party_position: snapshot.party_position,
        })
    }
}

fn choose_start(grid: &GridIndex, rooms: &[Room], stairs: &[StairRecord]) -> Position {
    let movement = MovementEngine::new(grid);

    if let Some(stair) = stairs.iter().find(|stair| stair.kind == StairKind::Up) {
        return match stair.landing().filter(|&pos| movement.is_passable(pos)) {
            Some(landing) => {
                log::debug!("starting beside the up stair at {}", stair.position);
                landing
            }
            None => {
                log::warn!(
                    "up stair at {} has no usable landing, starting on the stair",
                    stair.position
                );
                stair.position
            }
        };
    }

    if let Some(room) = rooms.first() {
        log::debug!("no up stair, starting in room {}", room.id);
        return room.center();
    }

    log::debug!("no stairs or rooms, starting at the grid center");
    grid.dimensions().center()
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloc::vec;

    fn pos(row: Coord, col: Coord) -> Position {
        Position::new(row, col)
    }

    fn dungeon(map: &str) -> DungeonState {
        DungeonState::new(&GenerationResult::from_ascii(map).unwrap(), DungeonConfig::default()).unwrap()
    }

    #[test]
    fn open_room_is_fully_visible() {
        let state = dungeon(".....\n.....\n.....\n.....\n.....");

        assert_eq!(state.party_position(), pos(2, 2));
        for p in state.dimensions().positions() {
            assert!(state.is_visible(p), "{p}");
            assert!(state.is_explored(p), "{p}");
        }
        assert_eq!(state.visible_cells().len(), 25);
    }

    #[test]
    fn move_into_wall_goes_nowhere() {
        let mut state = dungeon(".X...");
        state.place_party(pos(0, 0)).unwrap();

        let result = state.move_party("east", 3);

        assert!(!result.success);
        assert_eq!(result.steps_moved, 0);
        assert_eq!(result.new_position, pos(0, 0));
        assert_eq!(state.party_position(), pos(0, 0));
    }

    #[test]
    fn move_along_corridor() {
        let mut state = dungeon(",,,,,");
        state.place_party(pos(0, 0)).unwrap();

        let result = state.move_party("east", 4);

        assert!(result.success);
        assert_eq!(result.steps_moved, 4);
        assert_eq!(result.new_position, pos(0, 4));
        assert_eq!(state.party_position(), pos(0, 4));
        assert!(state.is_visible(pos(0, 4)));
    }

    #[test]
    fn revealed_secret_becomes_enterable() {
        let mut state = dungeon(".....\n.....\n.....\n...S.\n.....");

        assert!(!state.is_valid_position(pos(3, 3)));
        assert!(state.reveal_secret(pos(3, 3)));
        assert!(state.is_valid_position(pos(3, 3)));
        assert!(!state.reveal_secret(pos(3, 3)));
        assert!(!state.reveal_secret(pos(0, 0)));
        assert!(!state.reveal_secret(pos(9, 9)));
    }

    #[test]
    fn reveal_all_overrides_and_restores() {
        let mut state = dungeon(",X,,,\nXXXXX\n,,,,,");
        state.place_party(pos(0, 0)).unwrap();
        state.reset_exploration();
        let computed = state.visible_cells();
        assert!(!state.is_explored(pos(2, 4)));

        state.set_reveal_all(true);
        for p in state.dimensions().positions() {
            assert!(state.is_visible(p), "{p}");
            assert!(state.is_explored(p), "{p}");
        }

        state.set_reveal_all(false);
        assert_eq!(state.visible_cells(), computed);
        assert!(!state.is_explored(pos(2, 4)));
    }

    #[test]
    fn secret_blocks_sight_until_revealed() {
        let mut state = dungeon(",S,,");
        state.place_party(pos(0, 0)).unwrap();
        assert!(!state.is_visible(pos(0, 2)));

        state.reveal_secret(pos(0, 1));

        assert!(state.is_visible(pos(0, 2)));
    }

    #[test]
    fn broken_door_opens_line_of_sight() {
        let mut state = dungeon(",+,,");
        state.place_party(pos(0, 0)).unwrap();
        assert!(!state.is_visible(pos(0, 2)));

        assert!(state.break_door(pos(0, 1)));

        assert!(state.is_visible(pos(0, 2)));
        assert!(state.is_valid_position(pos(0, 1)));
        assert!(!state.break_door(pos(0, 1)));
        assert!(!state.break_door(pos(0, 0)));
    }

    #[test]
    fn start_beside_up_stair() {
        let state = dungeon("<...");

        assert_eq!(state.party_position(), pos(0, 1));
        assert!(state.is_visible(pos(0, 0)));
    }

    #[test]
    fn start_on_up_stair_without_landing() {
        let state = dungeon("<X");

        assert_eq!(state.party_position(), pos(0, 0));
    }

    #[test]
    fn start_in_first_room_without_stairs() {
        let state = dungeon("X...\nX...");

        assert_eq!(state.party_position(), pos(0, 2));
    }

    #[test]
    fn start_at_grid_center_as_last_resort() {
        let state = dungeon(",,,\n,,,\n,,,");

        assert_eq!(state.party_position(), pos(1, 1));
    }

    #[test]
    fn malformed_result_is_rejected() {
        let mut result = GenerationResult::from_ascii("...\n...").unwrap();
        result.height = 3;

        assert_eq!(
            DungeonState::new(&result, DungeonConfig::default()),
            Err(DungeonError::HeightMismatch {
                expected: 3,
                actual: 2
            })
        );
    }

    #[test]
    fn place_party_rejects_positions_off_the_grid() {
        let mut state = dungeon(",,,");
        let before = state.party_position();

        assert_eq!(
            state.place_party(pos(0, 3)),
            Err(DungeonError::InvalidCoords(pos(0, 3)))
        );
        assert_eq!(state.party_position(), before);
    }

    #[test]
    fn moving_looks_ahead() {
        let config = DungeonConfig {
            view_radius: 0,
            ..DungeonConfig::default()
        };
        let result = GenerationResult::from_ascii(",,,,,,").unwrap();
        let mut state = DungeonState::new(&result, config).unwrap();
        state.place_party(pos(0, 0)).unwrap();
        assert_eq!(state.visible_cells(), vec![pos(0, 0)]);

        state.move_in(Direction::East, 1);

        assert_eq!(state.visible_cells(), vec![pos(0, 1), pos(0, 2), pos(0, 3)]);
        assert!(state.is_explored(pos(0, 0)));
    }

    #[test]
    fn explored_never_shrinks_while_walking() {
        let mut state = dungeon(",,,,,,,,,,,,,,,,,,,,,,,,");
        state.place_party(pos(0, 0)).unwrap();
        let mut explored = state.visibility().explored_count();

        for _ in 0..6 {
            state.move_party("e", 3);
            let now = state.visibility().explored_count();
            assert!(now >= explored);
            explored = now;
            for p in state.visible_cells() {
                assert!(state.is_explored(p));
            }
        }
        assert_eq!(state.party_position(), pos(0, 18));
    }

    #[test]
    fn search_finds_adjacent_secrets_once() {
        let mut state = dungeon(",,,\n,,S\n,,,");
        state.place_party(pos(1, 1)).unwrap();

        let outcome = state.search();

        assert_eq!(outcome, SearchOutcome::Searched { found: vec![pos(1, 2)] });
        assert!(outcome.has_update());
        assert!(state.is_valid_position(pos(1, 2)));
        assert_eq!(state.search(), SearchOutcome::AlreadySearched);

        state.move_in(Direction::South, 1);
        let outcome = state.search();
        assert_eq!(outcome, SearchOutcome::Searched { found: vec![] });
        assert!(!outcome.has_update());
    }

    #[test]
    fn reset_exploration_keeps_current_view() {
        let mut state = dungeon(",,,,,,,,,,,,,,,");
        state.place_party(pos(0, 0)).unwrap();
        state.move_party("east", 14);
        assert!(state.is_explored(pos(0, 0)));

        state.reset_exploration();

        assert!(!state.is_explored(pos(0, 0)));
        assert!(state.is_visible(pos(0, 14)));
        assert!(state.is_explored(pos(0, 14)));
    }

    #[test]
    fn regenerate_replaces_the_level() {
        let mut state = dungeon(",,,,,");
        state.move_party("west", 2);

        state
            .regenerate(&GenerationResult::from_ascii("...\n...\n...").unwrap())
            .unwrap();

        assert_eq!(state.dimensions(), Dimensions::new(3, 3));
        assert_eq!(state.party_position(), pos(1, 1));
        assert_eq!(state.rooms().len(), 1);
    }

    #[test]
    fn failed_regenerate_keeps_the_old_level() {
        let mut state = dungeon(",,,,,");
        let before = state.clone();
        let mut broken = GenerationResult::from_ascii("..").unwrap();
        broken.width = 7;

        assert!(state.regenerate(&broken).is_err());
        assert_eq!(state, before);
    }

    #[test]
    fn feature_lookup_by_position() {
        let state = dungeon("...+,,>");

        let door = state.door_at(pos(0, 3)).unwrap();
        assert_eq!(door.orientation, Direction::East);
        let stair = state.stair_at(pos(0, 6)).unwrap();
        assert_eq!(stair.kind, StairKind::Down);
        assert!(state.door_at(pos(0, 0)).is_none());
        assert_eq!(state.room_at(pos(0, 1)).map(|room| room.id), Some(1));
    }

    #[test]
    fn entities_and_items_attach_to_cells() {
        let mut state = dungeon(",,,");

        assert!(state.add_entity(pos(0, 1), EntityId(7)));
        assert!(state.add_item(pos(0, 1), ItemId(2)));
        assert!(!state.add_entity(pos(5, 5), EntityId(7)));
        assert_eq!(state.get_cell(pos(0, 1)).unwrap().entities(), &[EntityId(7)]);

        assert!(state.remove_entity(pos(0, 1), EntityId(7)));
        assert!(state.remove_item(pos(0, 1), ItemId(2)));
        assert!(state.get_cell(pos(0, 1)).unwrap().items().is_empty());
    }

    #[test]
    fn valid_moves_from_the_party() {
        let mut state = dungeon(",,,");
        state.place_party(pos(0, 0)).unwrap();

        assert_eq!(state.valid_moves(), vec![Direction::East]);
    }

    #[test]
    fn snapshot_with_foreign_visibility_is_rejected() {
        let state = dungeon(",,,,\n,,,,\n,,,,");
        let small = dungeon(",,");
        let mut json = serde_json::to_value(&state).unwrap();
        json["visibility"] = serde_json::to_value(small.visibility()).unwrap();

        let restored = serde_json::from_value::<DungeonState>(json);

        assert!(restored.is_err());
    }

    #[test]
    fn snapshot_with_party_off_the_grid_is_rejected() {
        let state = dungeon(",,,,\n,,,,\n,,,,");
        let mut json = serde_json::to_value(&state).unwrap();
        json["party_position"] = serde_json::to_value(pos(3, 0)).unwrap();

        assert!(serde_json::from_value::<DungeonState>(json).is_err());
    }

    #[test]
    fn snapshot_with_misplaced_cells_is_rejected() {
        let state = dungeon(",,\n,,");
        let mut json = serde_json::to_value(&state).unwrap();
        json["grid"]["cells"]["data"].as_array_mut().unwrap().swap(0, 1);

        assert!(serde_json::from_value::<DungeonState>(json).is_err());
    }

    #[test]
    fn start_in_room_near_the_coordinate_limit() {
        let height = 40001;
        let result = GenerationResult {
            width: 1,
            height,
            grid: vec![vec![CellFlags::CORRIDOR.bits()]; height],
            rooms: vec![Room {
                id: 1,
                north: 40000,
                south: 40000,
                west: 0,
                east: 0,
            }],
            doors: Vec::new(),
            stairs: Vec::new(),
        };

        let state = DungeonState::new(&result, DungeonConfig::default()).unwrap();

        assert_eq!(state.party_position(), pos(40000, 0));
    }

    #[test]
    fn snapshot_round_trips_through_json() {
        let mut state = dungeon(",S,,\n,,,,");
        state.place_party(pos(0, 0)).unwrap();
        state.reveal_secret(pos(0, 1));

        let json = serde_json::to_string(&state).unwrap();
        let restored: DungeonState = serde_json::from_str(&json).unwrap();

        assert_eq!(restored, state);
        assert!(restored.is_valid_position(pos(0, 1)));
    }
}
