use serde::{Deserialize, Serialize};
use smallvec::SmallVec;
use strum::Display;

use crate::flags::decode_word;
use crate::*;

/// What a discovered secret turns into.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RevealedSecret {
    #[default]
    Arch,
    Door,
}

impl RevealedSecret {
    pub const fn flags(self) -> CellFlags {
        match self {
            Self::Arch => CellFlags::ARCH,
            Self::Door => CellFlags::DOOR,
        }
    }
}

/// Effective door state, most restrictive bit first.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum DoorKind {
    Secret,
    Locked,
    Trapped,
    Door,
    Portcullis,
    Arch,
}

/// Descriptive bucket used when reporting what stopped the party.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize, Display)]
#[strum(serialize_all = "lowercase")]
pub enum CellCategory {
    Nothing,
    Wall,
    Perimeter,
    Room,
    Corridor,
    Arch,
    Door,
    #[strum(to_string = "locked door")]
    LockedDoor,
    #[strum(to_string = "trapped door")]
    TrappedDoor,
    Portcullis,
    Stairs,
}

/// Opaque handle to a creature owned by the caller's game state.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EntityId(pub u32);

/// Opaque handle to an item owned by the caller's game state.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ItemId(pub u32);

/// One grid square: an immutable base type plus player-caused overlays.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Cell {
    position: Position,
    base: CellFlags,
    room_id: Option<u16>,
    label: Option<char>,
    revealed_as: RevealedSecret,
    secret_discovered: bool,
    door_broken: bool,
    searched: bool,
    entities: SmallVec<[EntityId; 2]>,
    items: SmallVec<[ItemId; 2]>,
}

impl Cell {
    pub fn new(position: Position, base: CellFlags) -> Self {
        Self {
            position,
            base,
            room_id: None,
            label: None,
            revealed_as: RevealedSecret::default(),
            secret_discovered: false,
            door_broken: false,
            searched: false,
            entities: SmallVec::new(),
            items: SmallVec::new(),
        }
    }

    /// Builds a cell from a raw generator word, keeping the room number and label.
    pub fn from_word(position: Position, word: u32, revealed_as: RevealedSecret) -> Self {
        let (base, room_id, label) = decode_word(word);
        Self {
            room_id,
            label,
            revealed_as,
            ..Self::new(position, base)
        }
    }

    pub fn position(&self) -> Position {
        self.position
    }

    pub fn base_type(&self) -> CellFlags {
        self.base
    }

    /// Base type with the broken-door and discovered-secret overlays applied.
    pub fn effective_type(&self) -> CellFlags {
        let mut flags = self.base;
        if self.secret_discovered && flags.contains(CellFlags::SECRET) {
            flags.remove(CellFlags::SECRET);
            flags.insert(self.revealed_as.flags());
        }
        if self.door_broken {
            flags.remove(CellFlags::DOORSPACE);
            flags.insert(CellFlags::ARCH);
        }
        flags
    }

    pub fn room_id(&self) -> Option<u16> {
        self.room_id
    }

    pub fn label(&self) -> Option<char> {
        self.label
    }

    pub fn secret_discovered(&self) -> bool {
        self.secret_discovered
    }

    pub fn door_broken(&self) -> bool {
        self.door_broken
    }

    pub fn searched(&self) -> bool {
        self.searched
    }

    pub fn is_nothing(&self) -> bool {
        self.effective_type().is_nothing()
    }

    pub fn is_room(&self) -> bool {
        self.effective_type().contains(CellFlags::ROOM)
    }

    pub fn is_corridor(&self) -> bool {
        self.effective_type().contains(CellFlags::CORRIDOR)
    }

    pub fn is_blocked(&self) -> bool {
        self.effective_type().contains(CellFlags::BLOCKED)
    }

    pub fn is_perimeter(&self) -> bool {
        self.effective_type().contains(CellFlags::PERIMETER)
    }

    pub fn is_door(&self) -> bool {
        self.effective_type().intersects(CellFlags::DOORSPACE)
    }

    pub fn is_arch(&self) -> bool {
        self.door_kind() == Some(DoorKind::Arch)
    }

    pub fn is_portcullis(&self) -> bool {
        self.door_kind() == Some(DoorKind::Portcullis)
    }

    /// True only while the secret is still hidden.
    pub fn is_secret(&self) -> bool {
        self.effective_type().contains(CellFlags::SECRET)
    }

    pub fn is_stairs(&self) -> bool {
        self.effective_type().intersects(CellFlags::STAIRS)
    }

    pub fn door_kind(&self) -> Option<DoorKind> {
        let flags = self.effective_type();
        [
            (CellFlags::SECRET, DoorKind::Secret),
            (CellFlags::LOCKED, DoorKind::Locked),
            (CellFlags::TRAPPED, DoorKind::Trapped),
            (CellFlags::DOOR, DoorKind::Door),
            (CellFlags::PORTCULLIS, DoorKind::Portcullis),
            (CellFlags::ARCH, DoorKind::Arch),
        ]
        .into_iter()
        .find_map(|(bit, kind)| flags.contains(bit).then_some(kind))
    }

    /// An undiscovered secret reports as a wall.
    pub fn category(&self) -> CellCategory {
        use CellCategory::*;

        if self.is_stairs() {
            return Stairs;
        }
        if let Some(kind) = self.door_kind() {
            return match kind {
                DoorKind::Secret => Wall,
                DoorKind::Locked => LockedDoor,
                DoorKind::Trapped => TrappedDoor,
                DoorKind::Door => Door,
                DoorKind::Portcullis => Portcullis,
                DoorKind::Arch => Arch,
            };
        }

        let flags = self.effective_type();
        if flags.contains(CellFlags::BLOCKED) {
            Wall
        } else if flags.contains(CellFlags::PERIMETER) {
            Perimeter
        } else if flags.contains(CellFlags::ROOM) {
            Room
        } else if flags.contains(CellFlags::CORRIDOR) {
            Corridor
        } else {
            Nothing
        }
    }

    /// Marks a hidden secret as found. Returns whether anything changed.
    pub fn reveal_secret(&mut self) -> bool {
        if !self.base.contains(CellFlags::SECRET) || self.secret_discovered {
            return false;
        }
        self.secret_discovered = true;
        true
    }

    /// Smashes a closed, locked, or trapped door into an arch. Returns whether anything changed.
    pub fn break_door(&mut self) -> bool {
        if !matches!(
            self.door_kind(),
            Some(DoorKind::Door | DoorKind::Locked | DoorKind::Trapped)
        ) {
            return false;
        }
        self.door_broken = true;
        true
    }

    /// Returns false when the cell had already been searched.
    pub fn mark_searched(&mut self) -> bool {
        !core::mem::replace(&mut self.searched, true)
    }

    pub fn entities(&self) -> &[EntityId] {
        &self.entities
    }

    pub fn items(&self) -> &[ItemId] {
        &self.items
    }

    pub(crate) fn add_entity(&mut self, id: EntityId) -> bool {
        if self.entities.contains(&id) {
            return false;
        }
        self.entities.push(id);
        true
    }

    pub(crate) fn remove_entity(&mut self, id: EntityId) -> bool {
        let before = self.entities.len();
        self.entities.retain(|other| *other != id);
        self.entities.len() != before
    }

    pub(crate) fn add_item(&mut self, id: ItemId) -> bool {
        if self.items.contains(&id) {
            return false;
        }
        self.items.push(id);
        true
    }

    pub(crate) fn remove_item(&mut self, id: ItemId) -> bool {
        let before = self.items.len();
        self.items.retain(|other| *other != id);
        self.items.len() != before
    }
}
