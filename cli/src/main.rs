use std::fs;
use std::io::{self, BufRead, Write};
use std::path::{Path, PathBuf};

use anyhow::Context;
use clap::Parser;
use delver_core::{Coord, DungeonConfig, DungeonState, GenerationResult};

mod command;
mod render;

use command::Command;

#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Args {
    /// What log level to use
    #[command(flatten)]
    verbose: clap_verbosity_flag::Verbosity,

    /// Generated layout: `.json` generator output or a plain-text map
    map: PathBuf,

    /// Commands to run, e.g. `east:3`, `reveal:4,7`, `search`. Read from stdin when omitted
    commands: Vec<String>,

    /// TOML file with dungeon settings
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Override the view radius from the config file
    #[arg(short, long)]
    radius: Option<Coord>,

    /// Start with the whole map revealed
    #[arg(long)]
    reveal_all: bool,

    /// Write the final dungeon state as JSON
    #[arg(long)]
    save: Option<PathBuf>,
}

fn load_config(path: Option<&Path>) -> anyhow::Result<DungeonConfig> {
    let Some(path) = path else {
        return Ok(DungeonConfig::default());
    };
    let text = fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
    toml::from_str(&text).with_context(|| format!("parsing {}", path.display()))
}

fn load_layout(path: &Path) -> anyhow::Result<GenerationResult> {
    let text = fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
    let result = if path.extension().is_some_and(|ext| ext == "json") {
        GenerationResult::from_json(&text)
    } else {
        GenerationResult::from_ascii(&text)
    };
    result.with_context(|| format!("loading layout {}", path.display()))
}

fn play(state: &mut DungeonState, line: &str, out: &mut impl Write) -> anyhow::Result<()> {
    match line.parse::<Command>() {
        Ok(command) => {
            writeln!(out, "{}", command.run(state))?;
            if !matches!(command, Command::ValidMoves | Command::Look) {
                write!(out, "{}", render::render(state))?;
            }
        }
        Err(err) => {
            log::warn!("skipping {line:?}: {err:#}");
            writeln!(out, "?? {err:#}")?;
        }
    }
    Ok(())
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    tracing_subscriber::fmt()
        .with_max_level(args.verbose.tracing_level_filter())
        .with_writer(io::stderr)
        .init();

    let mut config = load_config(args.config.as_deref())?;
    if let Some(radius) = args.radius {
        config.view_radius = radius;
    }
    log::debug!("config: {config:?}");

    let layout = load_layout(&args.map)?;
    let mut state = DungeonState::new(&layout, config)?;
    state.set_reveal_all(args.reveal_all);

    let stdout = io::stdout();
    let mut out = stdout.lock();
    write!(out, "{}", render::render(&state))?;

    if args.commands.is_empty() {
        for line in io::stdin().lock().lines() {
            let line = line.context("reading commands")?;
            if line.trim().is_empty() {
                continue;
            }
            play(&mut state, &line, &mut out)?;
        }
    } else {
        for line in &args.commands {
            play(&mut state, line, &mut out)?;
        }
    }

    if let Some(path) = &args.save {
        let json = serde_json::to_string_pretty(&state)?;
        fs::write(path, json).with_context(|| format!("writing {}", path.display()))?;
        log::info!("saved dungeon state to {}", path.display());
    }
    Ok(())
}
