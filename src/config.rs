use std::{cmp::max, time::Duration};

use clap::ValueEnum;
use crossterm::style::Color;

use crate::board::PositionState;

pub const DEFAULT_GRID_SIZE: usize = 40;

/// The schedule never ticks faster than this.
const MIN_DELAY_MS: u64 = 20;

/// Everything the player picks before a game starts. Difficulty and theme are
/// asked for in the start menu when left unset.
#[derive(Clone, Debug)]
pub struct Options {
    pub size: usize,
    pub difficulty: Option<Difficulty>,
    pub theme: Option<Theme>,
    pub seed: Option<u64>,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, ValueEnum)]
pub enum Difficulty {
    Easy,
    Medium,
    Hard,
}

impl Difficulty {
    pub const ALL: [Difficulty; 3] = [Difficulty::Easy, Difficulty::Medium, Difficulty::Hard];

    pub fn name(self) -> &'static str {
        match self {
            Difficulty::Easy => "Easy",
            Difficulty::Medium => "Medium",
            Difficulty::Hard => "Hard",
        }
    }

    fn level(self) -> usize {
        match self {
            Difficulty::Easy => 0,
            Difficulty::Medium => 1,
            Difficulty::Hard => 2,
        }
    }

    pub fn initial_length(self) -> usize {
        [3, 10, 20][self.level()]
    }

    pub fn start_delay_ms(self) -> u64 {
        [200, 175, 145][self.level()]
    }

    /// Milliseconds shaved off the tick delay per food eaten.
    pub fn speed_increase_ms(self) -> u64 {
        [2, 2, 3][self.level()]
    }

    pub fn walls(self) -> bool {
        self != Difficulty::Easy
    }

    /// Delay before the next tick at the given score.
    pub fn tick_delay(self, score: usize) -> Duration {
        let speedup = (score as u64).saturating_mul(self.speed_increase_ms());
        let ms = max(self.start_delay_ms().saturating_sub(speedup), MIN_DELAY_MS);
        Duration::from_millis(ms)
    }

    pub fn final_score(self, food_eaten: usize) -> usize {
        food_eaten * (self.level() + 1)
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, ValueEnum)]
pub enum Theme {
    Default,
    BlackOnWhite,
    WhiteOnBlack,
    RetroGreen,
    RetroAmber,
    Pastel,
}

#[derive(Copy, Clone, Debug, PartialEq)]
pub struct Palette {
    pub background: Color,
    pub snake: Color,
    pub food: Color,
    pub wall: Color,
}

const fn rgb(r: u8, g: u8, b: u8) -> Color {
    Color::Rgb { r, g, b }
}

impl Theme {
    pub const ALL: [Theme; 6] = [
        Theme::Default,
        Theme::BlackOnWhite,
        Theme::WhiteOnBlack,
        Theme::RetroGreen,
        Theme::RetroAmber,
        Theme::Pastel,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Theme::Default => "Default",
            Theme::BlackOnWhite => "Black on white",
            Theme::WhiteOnBlack => "White on black",
            Theme::RetroGreen => "Retro green",
            Theme::RetroAmber => "Retro amber",
            Theme::Pastel => "Pastel",
        }
    }

    pub fn palette(self) -> Palette {
        let white = rgb(255, 255, 255);
        let black = rgb(0, 0, 0);
        let green = rgb(36, 204, 68);
        let amber = rgb(255, 191, 0);

        match self {
            Theme::Default => Palette {
                background: white,
                snake: rgb(0, 255, 0),
                food: rgb(255, 0, 0),
                wall: rgb(64, 64, 64),
            },
            Theme::BlackOnWhite => Palette { background: white, snake: black, food: black, wall: black },
            Theme::WhiteOnBlack => Palette { background: black, snake: white, food: white, wall: white },
            Theme::RetroGreen => Palette { background: black, snake: green, food: green, wall: green },
            Theme::RetroAmber => Palette { background: black, snake: amber, food: amber, wall: amber },
            Theme::Pastel => Palette {
                background: rgb(255, 250, 250),
                snake: rgb(203, 241, 245),
                food: rgb(255, 206, 206),
                wall: rgb(202, 171, 216),
            },
        }
    }
}

impl Palette {
    pub fn color(&self, state: PositionState) -> Color {
        match state {
            PositionState::Free => self.background,
            PositionState::Snake => self.snake,
            PositionState::Food => self.food,
            PositionState::Wall => self.wall,
        }
    }
}
