use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};

use crate::board::Direction::{self, *};

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Command {
    Turn(Direction),
    Pause,
    Quit,
}

pub fn command_for(ev: &KeyEvent) -> Option<Command> {
    if is_quit(ev) {
        return Some(Command::Quit);
    }

    match ev.code {
        KeyCode::Char('w') | KeyCode::Char('W') | KeyCode::Up => Some(Command::Turn(Up)),
        KeyCode::Char('a') | KeyCode::Char('A') | KeyCode::Left => Some(Command::Turn(Left)),
        KeyCode::Char('s') | KeyCode::Char('S') | KeyCode::Down => Some(Command::Turn(Down)),
        KeyCode::Char('d') | KeyCode::Char('D') | KeyCode::Right => Some(Command::Turn(Right)),
        KeyCode::Esc | KeyCode::Char('p') | KeyCode::Char('P') => Some(Command::Pause),
        _ => None,
    }
}

/// Ctrl+C or `q`, both during play and in the menus.
pub fn is_quit(ev: &KeyEvent) -> bool {
    matches!(
        ev,
        KeyEvent { code: KeyCode::Char('c'), modifiers: KeyModifiers::CONTROL }
            | KeyEvent { code: KeyCode::Char('q'), .. }
            | KeyEvent { code: KeyCode::Char('Q'), .. }
    )
}

/// Zero-based menu entry selected with the digit keys `1..=count`.
pub fn menu_choice(ev: &KeyEvent, count: usize) -> Option<usize> {
    match ev.code {
        KeyCode::Char(ch) => ch
            .to_digit(10)
            .map(|digit| digit as usize)
            .filter(|&digit| digit >= 1 && digit <= count)
            .map(|digit| digit - 1),
        KeyCode::Enter => Some(0),
        _ => None,
    }
}
