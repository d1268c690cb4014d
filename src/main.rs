mod board;
mod config;
mod game;
mod input;
mod term;

use std::{fs::File, path::{Path, PathBuf}, sync::Mutex};

use anyhow::{Context, Result};
use clap::Parser;
use tracing_subscriber::EnvFilter;

use config::{Difficulty, Options, Theme, DEFAULT_GRID_SIZE};

pub type TermInt = u16;
pub type Coords = (u16, u16);

#[derive(Parser)]
#[command(name = "snake", version, about = "Snake on a wrap-around grid, played in the terminal")]
struct Cli {
    /// Skip the difficulty menu
    #[arg(long, value_enum)]
    difficulty: Option<Difficulty>,

    /// Skip the color theme menu
    #[arg(long, value_enum)]
    theme: Option<Theme>,

    /// Cells per side of the square grid
    #[arg(long, default_value_t = DEFAULT_GRID_SIZE)]
    size: usize,

    /// Seed for food placement, for reproducible games
    #[arg(long)]
    seed: Option<u64>,

    /// Write logs to this file (level from RUST_LOG, default info)
    #[arg(long)]
    log_file: Option<PathBuf>,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.log_file.as_deref())?;

    let options = Options {
        size: cli.size,
        difficulty: cli.difficulty,
        theme: cli.theme,
        seed: cli.seed,
    };

    let mut game = game::SnakeGame::new(options)?;
    game.initialize()?;

    // The terminal has to be handed back even when the game fails
    let result = game.run();
    finish(result, game.restore())
}

/// Combines the outcome of the game with that of restoring the terminal. The
/// game's own error wins; a restore error behind it is only logged.
fn finish(run: Result<()>, restore: Result<()>) -> Result<()> {
    match (run, restore) {
        (Err(err), Err(restore_err)) => {
            tracing::error!(?restore_err, "failed to restore terminal");
            Err(err)
        }
        (Err(err), Ok(())) | (Ok(()), Err(err)) => Err(err),
        (Ok(()), Ok(())) => Ok(()),
    }
}

/// The screen belongs to the game, so logs only go to a file when asked for.
fn init_logging(path: Option<&Path>) -> Result<()> {
    let path = match path {
        Some(path) => path,
        None => return Ok(()),
    };

    let file = File::create(path)
        .with_context(|| format!("failed to create log file {}", path.display()))?;
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_ansi(false)
        .with_writer(Mutex::new(file))
        .init();

    Ok(())
}
