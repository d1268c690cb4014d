use std::time::{Duration, Instant};

use anyhow::{bail, Result};
use crossterm::style::Color;
use tracing::info;

use crate::{Coords, TermInt};
use crate::board::{Board, BoardError, Status, MIN_SIZE};
use crate::config::{Difficulty, Options, Palette, Theme};
use crate::input::{command_for, is_quit, menu_choice, Command};
use crate::term::{Glyph, TermManager};

/// Two grid rows share one terminal row: the glyph's foreground paints the
/// upper cell and its background the lower one.
const HALF_BLOCK_CHAR: char = '▀';

/// How often input is checked while the game is paused.
const PAUSED_POLL_INTERVAL: Duration = Duration::from_millis(50);

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
enum Flow {
    Continue,
    Quit,
}

pub struct SnakeGame {
    options: Options,
    paused: bool,
    games_played: u64,
    frame_origin: Coords,
    term: TermManager,
    last_score: Option<usize>,
}

impl SnakeGame {
    pub fn new(options: Options) -> Result<Self> {
        Ok(SnakeGame {
            options,
            paused: false,
            games_played: 0,
            frame_origin: (0, 0),
            term: TermManager::new()?,
            last_score: None,
        })
    }

    /// Checks that the grid fits and takes over the terminal.
    pub fn initialize(&mut self) -> Result<()> {
        if self.options.size < MIN_SIZE {
            return Err(BoardError::GridTooSmall(self.options.size).into());
        }

        let (frame_w, frame_h) = frame_size(self.options.size);
        let (w, h) = self.term.get_terminal_size();

        if frame_w > w as usize || frame_h > h as usize {
            bail!(
                "a {size}x{size} grid needs a {frame_w}x{frame_h} terminal but this one is {w}x{h}, \
                 try a smaller --size",
                size = self.options.size, frame_w = frame_w, frame_h = frame_h, w = w, h = h
            );
        }

        self.frame_origin = ((w - frame_w as TermInt) / 2, (h - frame_h as TermInt) / 2);
        self.term.setup()
    }

    pub fn restore(&mut self) -> Result<()> {
        self.term.restore()
    }

    /// Asks for anything missing from the options, then plays until the player quits.
    pub fn run(&mut self) -> Result<()> {
        let difficulty = match self.options.difficulty {
            Some(difficulty) => difficulty,
            None => match self.pick_difficulty()? {
                Some(difficulty) => difficulty,
                None => return Ok(()),
            },
        };
        let theme = match self.options.theme {
            Some(theme) => theme,
            None => match self.pick_theme()? {
                Some(theme) => theme,
                None => return Ok(()),
            },
        };

        while self.play(difficulty, theme)? == Flow::Continue {}

        Ok(())
    }

    ///////////////////////////////////////////////////////////////////////////

    fn play(&mut self, difficulty: Difficulty, theme: Theme) -> Result<Flow> {
        let size = self.options.size;
        let (length, walls) = (difficulty.initial_length(), difficulty.walls());
        let mut board = match self.options.seed {
            Some(seed) => Board::with_seed(size, length, walls, seed.wrapping_add(self.games_played))?,
            None => Board::new(size, length, walls)?,
        };
        self.games_played += 1;

        let palette = theme.palette();
        self.paused = false;
        self.last_score = None;
        self.term.clear()?;
        let (frame_w, frame_h) = frame_size(self.options.size);
        self.term.draw_borders(self.frame_origin, frame_w as TermInt, frame_h as TermInt)?;

        info!(
            difficulty = difficulty.name(),
            theme = theme.name(),
            size,
            walls,
            "game started"
        );

        loop {
            self.render(&board, &palette)?;

            if self.wait_for_tick(&mut board, difficulty)? == Flow::Quit {
                return Ok(Flow::Quit);
            }

            if !board.step() {
                break;
            }
        }

        self.render(&board, &palette)?;
        self.game_over(&board, difficulty)
    }

    /// Sleeps out the current tick while feeding key presses to the board.
    fn wait_for_tick(&mut self, board: &mut Board, difficulty: Difficulty) -> Result<Flow> {
        let delay = difficulty.tick_delay(board.score());
        let mut deadline = Instant::now() + delay;

        loop {
            let timeout = if self.paused {
                PAUSED_POLL_INTERVAL
            } else {
                let now = Instant::now();
                if now >= deadline {
                    return Ok(Flow::Continue);
                }
                deadline - now
            };

            let key = match self.term.poll_key(timeout)? {
                Some(key) => key,
                None => continue,
            };

            match command_for(&key) {
                Some(Command::Quit) => return Ok(Flow::Quit),
                Some(Command::Pause) => {
                    self.toggle_pause()?;
                    deadline = Instant::now() + delay;
                }
                Some(Command::Turn(direction)) if !self.paused => {
                    board.set_direction(direction);
                }
                _ => {}
            }
        }
    }

    fn render(&mut self, board: &Board, palette: &Palette) -> Result<()> {
        let size = board.size();
        let (left, top) = (self.frame_origin.0 + 1, self.frame_origin.1 + 1);

        for row in 0..(size + 1) / 2 {
            for x in 0..size {
                let glyph = cell_glyph(board, palette, row, x);
                self.term.print_at((left + x as TermInt, top + row as TermInt), glyph)?;
            }
        }

        let score = board.score();
        if self.last_score != Some(score) {
            self.last_score = Some(score);
            let (_, frame_h) = frame_size(self.options.size);
            let bottom = self.frame_origin.1 + frame_h as TermInt - 1;
            self.term.print_text((self.frame_origin.0 + 2, bottom), &format!(" Food: {} ", score))?;
            self.term.set_title(&format!("Snake - Food: {}", score))?;
        }

        self.term.flush()
    }

    fn game_over(&mut self, board: &Board, difficulty: Difficulty) -> Result<Flow> {
        let won = board.status() == Status::Won;
        let score = board.score();
        let final_score = difficulty.final_score(score);

        info!(
            won,
            food = score,
            final_score,
            length = board.length(),
            cells = board.cell_count(),
            head = ?board.head(),
            direction = ?board.direction(),
            "game over"
        );

        self.term.show_message(&[
            if won {"You won!"} else {"Game over!"},
            &*format!("Food eaten: {}", score),
            &*format!("Difficulty: {}", difficulty.name()),
            &*format!("Final score: {}", final_score),
            "",
            "Press any key to play again,",
            "or CTRL+C to quit."
        ])?;

        let key = self.term.read_key_blocking()?;
        self.term.hide_message()?;
        Ok(if is_quit(&key) {Flow::Quit} else {Flow::Continue})
    }

    fn pick_difficulty(&mut self) -> Result<Option<Difficulty>> {
        let names: Vec<&str> = Difficulty::ALL.iter().map(|d| d.name()).collect();
        let choice = self.menu("Difficulty", &names)?;
        Ok(choice.map(|i| Difficulty::ALL[i]))
    }

    fn pick_theme(&mut self) -> Result<Option<Theme>> {
        let names: Vec<&str> = Theme::ALL.iter().map(|t| t.name()).collect();
        let choice = self.menu("Color theme", &names)?;
        Ok(choice.map(|i| Theme::ALL[i]))
    }

    /// Shows a numbered list and waits for a pick. `None` means the player quit.
    fn menu(&mut self, title: &str, entries: &[&str]) -> Result<Option<usize>> {
        let mut lines = vec![format!("{}:", title), String::new()];
        lines.extend(entries.iter().enumerate().map(|(i, entry)| format!("{}) {}", i + 1, entry)));
        lines.push(String::new());
        lines.push("Arrow keys or WASD to move, Esc to pause".to_string());
        lines.push("CTRL+C to quit".to_string());

        let lines: Vec<&str> = lines.iter().map(String::as_str).collect();
        self.term.show_message(&lines)?;

        let choice = loop {
            let key = self.term.read_key_blocking()?;
            if is_quit(&key) {
                break None;
            }
            if let Some(choice) = menu_choice(&key, entries.len()) {
                break Some(choice);
            }
        };

        self.term.hide_message()?;
        Ok(choice)
    }

    fn toggle_pause(&mut self) -> Result<()> {
        if !self.paused {
            self.term.show_message(&["Paused", "Press Esc to resume", "or Ctrl+C to quit"])?;
        } else {
            self.term.hide_message()?;
        }

        self.paused = !self.paused;
        Ok(())
    }
}

/// Outer size of the bordered grid in terminal cells.
fn frame_size(size: usize) -> (usize, usize) {
    (size.saturating_add(2), size / 2 + size % 2 + 2)
}

/// Glyph for terminal row `row` of the grid, covering cells `(x, 2 * row)` and
/// `(x, 2 * row + 1)`. The lower half is left blank past the last grid row.
fn cell_glyph(board: &Board, palette: &Palette, row: usize, x: usize) -> Glyph {
    let (x, y) = (x as isize, 2 * row as isize);
    let upper = palette.color(board.position_state(board.index_of(x, y)));
    let lower = if y + 1 < board.size() as isize {
        palette.color(board.position_state(board.index_of(x, y + 1)))
    } else {
        Color::Reset
    };

    Glyph { ch: HALF_BLOCK_CHAR, fg: upper, bg: lower }
}
