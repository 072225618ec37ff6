use std::str::FromStr;

use anyhow::{Context, bail};
use delver_core::{DungeonState, Position, SearchOutcome};

/// One line of a play script.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Command {
    /// Direction key is passed through unparsed so the dungeon reports bad keys itself.
    Move { key: String, steps: u32 },
    Place(Position),
    RevealSecret(Position),
    BreakDoor(Position),
    Search,
    ValidMoves,
    RevealAll(bool),
    ResetExploration,
    Look,
}

fn parse_position(text: &str) -> anyhow::Result<Position> {
    let (row, col) = text
        .split_once(',')
        .with_context(|| format!("expected ROW,COL, got {text:?}"))?;
    let row = row.trim().parse().with_context(|| format!("bad row in {text:?}"))?;
    let col = col.trim().parse().with_context(|| format!("bad column in {text:?}"))?;
    Ok(Position::new(row, col))
}

impl FromStr for Command {
    type Err = anyhow::Error;

    fn from_str(line: &str) -> anyhow::Result<Self> {
        let line = line.trim();
        let (verb, arg) = match line.split_once(':') {
            Some((verb, arg)) => (verb.trim(), Some(arg.trim())),
            None => (line, None),
        };

        Ok(match (verb, arg) {
            ("", _) => bail!("empty command"),
            ("goto", Some(arg)) => Self::Place(parse_position(arg)?),
            ("reveal", Some(arg)) => Self::RevealSecret(parse_position(arg)?),
            ("break", Some(arg)) => Self::BreakDoor(parse_position(arg)?),
            ("search", None) => Self::Search,
            ("moves", None) => Self::ValidMoves,
            ("look", None) => Self::Look,
            ("reset", None) => Self::ResetExploration,
            ("reveal-all", None) => Self::RevealAll(true),
            ("reveal-all", Some("on")) => Self::RevealAll(true),
            ("reveal-all", Some("off")) => Self::RevealAll(false),
            ("goto" | "reveal" | "break", None) => bail!("{verb} needs ROW,COL"),
            (key, None) => Self::Move {
                key: key.to_owned(),
                steps: 1,
            },
            (key, Some(steps)) => Self::Move {
                key: key.to_owned(),
                steps: steps
                    .parse()
                    .with_context(|| format!("bad step count {steps:?}"))?,
            },
        })
    }
}

impl Command {
    /// Applies the command and returns the line to show the player.
    pub fn run(&self, state: &mut DungeonState) -> String {
        match self {
            Self::Move { key, steps } => state.move_party(key, *steps).message,
            Self::Place(pos) => match state.place_party(*pos) {
                Ok(()) => format!("placed at {pos}"),
                Err(err) => err.to_string(),
            },
            Self::RevealSecret(pos) => outcome(state.reveal_secret(*pos), "revealed", "no secret", *pos),
            Self::BreakDoor(pos) => outcome(state.break_door(*pos), "broke the door", "nothing to break", *pos),
            Self::Search => match state.search() {
                SearchOutcome::AlreadySearched => "already searched here".to_owned(),
                SearchOutcome::Searched { found } if found.is_empty() => "found nothing".to_owned(),
                SearchOutcome::Searched { found } => {
                    let found: Vec<String> = found.iter().map(ToString::to_string).collect();
                    format!("found secrets at {}", found.join(" "))
                }
            },
            Self::ValidMoves => {
                let moves: Vec<String> = state.valid_moves().iter().map(ToString::to_string).collect();
                if moves.is_empty() {
                    "no way out".to_owned()
                } else {
                    moves.join(" ")
                }
            }
            Self::RevealAll(on) => {
                state.set_reveal_all(*on);
                format!("reveal-all {}", if *on { "on" } else { "off" })
            }
            Self::ResetExploration => {
                state.reset_exploration();
                "exploration reset".to_owned()
            }
            Self::Look => format!(
                "at {}, {} cells in view",
                state.party_position(),
                state.visible_cells().len()
            ),
        }
    }
}

fn outcome(changed: bool, yes: &str, no: &str, pos: Position) -> String {
    if changed {
        format!("{yes} at {pos}")
    } else {
        format!("{no} at {pos}")
    }
}
