//! Cell type bits as written by the layout generator.

use bitflags::bitflags;
use serde::{Deserialize, Serialize};

bitflags! {
    /// Base classification of a cell. The empty set is `NOTHING`: unused rock.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
    pub struct CellFlags: u32 {
        const BLOCKED = 0x0000_0001;
        const ROOM = 0x0000_0002;
        const CORRIDOR = 0x0000_0004;
        const PERIMETER = 0x0000_0010;
        const ENTRANCE = 0x0000_0020;
        const ARCH = 0x0001_0000;
        const DOOR = 0x0002_0000;
        const LOCKED = 0x0004_0000;
        const TRAPPED = 0x0008_0000;
        const SECRET = 0x0010_0000;
        const PORTCULLIS = 0x0020_0000;
        const STAIR_DOWN = 0x0040_0000;
        const STAIR_UP = 0x0080_0000;
        const LABEL = 0xFF00_0000;

        const DOORSPACE = Self::ARCH.bits()
            | Self::DOOR.bits()
            | Self::LOCKED.bits()
            | Self::TRAPPED.bits()
            | Self::SECRET.bits()
            | Self::PORTCULLIS.bits();
        const STAIRS = Self::STAIR_UP.bits() | Self::STAIR_DOWN.bits();
        const OPENSPACE = Self::ROOM.bits() | Self::CORRIDOR.bits();
    }
}

/// Room number bits of the raw generator word; not part of [`CellFlags`].
pub const ROOM_ID_MASK: u32 = 0x0000_FFC0;
const ROOM_ID_SHIFT: u32 = 6;
const LABEL_SHIFT: u32 = 24;

impl CellFlags {
    pub const NOTHING: Self = Self::empty();

    /// Whether the cell is unused rock. Labels are annotations and do not count.
    pub fn is_nothing(self) -> bool {
        self.difference(Self::LABEL).is_empty()
    }
}

/// Splits a raw generator word into flags, room number, and label byte.
pub(crate) fn decode_word(word: u32) -> (CellFlags, Option<u16>, Option<char>) {
    let flags = CellFlags::from_bits_truncate(word);
    let room_id = ((word & ROOM_ID_MASK) >> ROOM_ID_SHIFT) as u16;
    let label = (word >> LABEL_SHIFT) as u8;

    (
        flags,
        (room_id != 0).then_some(room_id),
        label.is_ascii_graphic().then_some(label as char),
    )
}
