use delver_core::{Cell, CellCategory, CellFlags, DungeonState, Position};

fn glyph(cell: &Cell) -> char {
    match cell.category() {
        CellCategory::Nothing => ' ',
        CellCategory::Wall => 'X',
        CellCategory::Perimeter => '#',
        CellCategory::Room => '.',
        CellCategory::Corridor => ',',
        CellCategory::Arch => '\'',
        CellCategory::Door => '+',
        CellCategory::LockedDoor => 'L',
        CellCategory::TrappedDoor => 'T',
        CellCategory::Portcullis => '|',
        CellCategory::Stairs if cell.effective_type().contains(CellFlags::STAIR_UP) => '<',
        CellCategory::Stairs => '>',
    }
}

/// Fog-of-war view: unexplored cells stay blank and remembered floor out of
/// sight is dimmed to `~`.
pub fn render(state: &DungeonState) -> String {
    let dims = state.dimensions();
    let party = state.party_position();
    let mut out = String::with_capacity(dims.total_cells() + usize::from(dims.height));

    for row in 0..dims.height {
        for col in 0..dims.width {
            let pos = Position::new(row, col);
            let symbol = match state.get_cell(pos) {
                _ if pos == party => '@',
                Some(cell) if state.is_visible(pos) => glyph(cell),
                Some(cell) if state.is_explored(pos) => match glyph(cell) {
                    '.' | ',' => '~',
                    other => other,
                },
                _ => ' ',
            };
            out.push(symbol);
        }
        out.push('\n');
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use delver_core::{DungeonConfig, GenerationResult};

    #[test]
    fn hides_what_the_party_has_not_seen() {
        let result = GenerationResult::from_ascii(",X,,\nXXXX\n<..>").unwrap();
        let mut state = DungeonState::new(&result, DungeonConfig::default()).unwrap();
        state.place_party(Position::new(0, 0)).unwrap();
        state.reset_exploration();

        assert_eq!(render(&state), "@X  \nXX  \n    \n");
    }

    #[test]
    fn remembered_floor_is_dimmed() {
        let config = DungeonConfig {
            view_radius: 1,
            lookahead: 0,
            ..DungeonConfig::default()
        };
        let result = GenerationResult::from_ascii(",,,,").unwrap();
        let mut state = DungeonState::new(&result, config).unwrap();
        state.place_party(Position::new(0, 0)).unwrap();
        state.move_party("east", 2);

        assert_eq!(render(&state), "~,@,\n");
    }
}
