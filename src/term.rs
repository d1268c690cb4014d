use crate::{Coords, TermInt};
use std::{io::{Stdout, Write, stdout}, time::Duration};

use anyhow::{Context, Result};
use crossterm::{cursor, execute, queue, style, terminal};
use crossterm::style::Color;
use crossterm::terminal::{ClearType, EnterAlternateScreen, LeaveAlternateScreen};
use crossterm::event::{Event, KeyEvent, read, poll};
use tracing::error;

/// One character cell of the terminal together with its colours.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct Glyph {
    pub ch: char,
    pub fg: Color,
    pub bg: Color,
}

impl Glyph {
    pub const BLANK: Glyph = Glyph::plain(' ');

    pub const fn plain(ch: char) -> Self {
        Glyph { ch, fg: Color::Reset, bg: Color::Reset }
    }
}

pub struct TermManager {
    width: TermInt,
    height: TermInt,
    stdout: Stdout,
    screen: Vec<Glyph>,
    current_msg: Option<Message>,
}

struct Message {
    top_left: Coords,
    width: TermInt,
    height: TermInt,
}

impl TermManager {
    pub fn new() -> Result<Self> {
        let (width, height) = terminal::size().context("failed to read terminal size")?;
        let stdout = stdout();
        let screen = vec![Glyph::BLANK; width as usize * height as usize];
        Ok(TermManager { width, height, stdout, screen, current_msg: None })
    }

    /// Takes over the terminal. A partial takeover is rolled back before the
    /// error is returned.
    pub fn setup(&mut self) -> Result<()> {
        let result = self.enter();
        if result.is_err() {
            if let Err(err) = self.restore() {
                error!(?err, "failed to restore terminal after setup error");
            }
        }
        result
    }

    /// Hands the terminal back. Every step is attempted; the first failure is
    /// the one reported.
    pub fn restore(&mut self) -> Result<()> {
        let raw = terminal::disable_raw_mode().context("failed to disable raw mode");
        let cursor = execute!(self.stdout, style::ResetColor, cursor::Show, cursor::EnableBlinking)
            .context("failed to show cursor");
        let screen = execute!(self.stdout, LeaveAlternateScreen).context("failed to leave alternate screen");
        raw.and(cursor).and(screen)
    }

    pub fn read_key_blocking(&self) -> Result<KeyEvent> {
        loop {
            if let Event::Key(ev) = read().context("failed to read terminal event")? {
                return Ok(ev);
            }
        }
    }

    /// Waits up to `timeout` for a key press.
    pub fn poll_key(&self, timeout: Duration) -> Result<Option<KeyEvent>> {
        if poll(timeout).context("failed to poll terminal events")? {
            if let Event::Key(ev) = read().context("failed to read terminal event")? {
                return Ok(Some(ev));
            }
        }

        Ok(None)
    }

    pub fn get_terminal_size(&self) -> Coords {
        (self.width, self.height)
    }

    /// Draws a box whose outer corners are `top_left` and
    /// `top_left + (width - 1, height - 1)`.
    pub fn draw_borders(&mut self, top_left: Coords, width: TermInt, height: TermInt) -> Result<()> {
        let (left, top) = top_left;
        let (right, bottom) = (left + width - 1, top + height - 1);

        for x in left..=right {
            let ch = if x == left || x == right {'+'} else {'-'};
            self.print_at((x, top), Glyph::plain(ch))?;
            self.print_at((x, bottom), Glyph::plain(ch))?;
        }

        for y in top + 1..bottom {
            self.print_at((left, y), Glyph::plain('|'))?;
            self.print_at((right, y), Glyph::plain('|'))?;
        }

        self.flush()
    }

    pub fn print_text(&mut self, pos: Coords, text: &str) -> Result<()> {
        for (i, ch) in text.chars().enumerate() {
            self.print_at((pos.0 + i as TermInt, pos.1), Glyph::plain(ch))?;
        }

        Ok(())
    }

    pub fn show_message(&mut self, lines: &[&str]) -> Result<()> {
        if self.has_message() {
            self.hide_message()?;
        }

        let msg_height = (lines.len() + 2) as TermInt;
        let msg_width = (lines.iter().map(|x| x.chars().count()).max().unwrap_or(0) + 2) as TermInt;
        let center = (self.width / 2, self.height / 2);
        let top_left = (
            center.0.saturating_sub(msg_width / 2),
            center.1.saturating_sub(msg_height / 2),
        );

        // Empty padding lines above and below the text
        for y in [top_left.1, top_left.1 + msg_height - 1].iter() {
            for x_diff in 0..msg_width {
                self.print_at_no_save((top_left.0 + x_diff, *y), Glyph::BLANK)?;
            }
        }

        for (i, line) in lines.iter().enumerate() {
            let padded_line = format!("{line: ^width$}", line = line, width = msg_width as usize);
            let y = top_left.1 + i as TermInt + 1;
            for (x_diff, ch) in padded_line.chars().enumerate() {
                self.print_at_no_save((top_left.0 + x_diff as TermInt, y), Glyph::plain(ch))?;
            }
        }

        self.current_msg = Some(Message::new(msg_width, msg_height, top_left));
        self.flush()
    }

    pub fn hide_message(&mut self) -> Result<()> {
        let msg = match self.current_msg.take() {
            Some(msg) => msg,
            None => return Ok(()),
        };
        let top_left = msg.top_left();

        // Put back whatever the message was covering
        for y_diff in 0..msg.height() {
            for x_diff in 0..msg.width() {
                let (x, y) = (top_left.0 + x_diff, top_left.1 + y_diff);
                if let Some(glyph) = self.saved(x, y) {
                    self.print_at_no_save((x, y), glyph)?;
                }
            }
        }

        self.flush()
    }

    /// Prints `glyph` unless the screen already shows it there. Positions under
    /// an open message are only recorded and appear once it is hidden.
    pub fn print_at(&mut self, pos: Coords, glyph: Glyph) -> Result<()> {
        let index = match self.screen_index(pos) {
            Some(index) => index,
            None => return Ok(()),
        };
        if self.screen[index] == glyph {
            return Ok(());
        }

        self.screen[index] = glyph;
        let covered = self.current_msg.as_ref().map_or(false, |msg| msg.contains(pos));
        if !covered {
            self.print_at_no_save(pos, glyph)?;
        }

        Ok(())
    }

    pub fn set_title(&mut self, title: &str) -> Result<()> {
        execute!(self.stdout, terminal::SetTitle(title)).context("failed to set terminal title")?;
        Ok(())
    }

    pub fn clear(&mut self) -> Result<()> {
        execute!(self.stdout, style::ResetColor, terminal::Clear(ClearType::All))
            .context("failed to clear terminal")?;
        self.screen = vec![Glyph::BLANK; self.width as usize * self.height as usize];
        self.current_msg = None;
        Ok(())
    }

    pub fn flush(&mut self) -> Result<()> {
        self.stdout.flush().context("failed to flush terminal")?;
        Ok(())
    }

    pub fn has_message(&self) -> bool {
        self.current_msg.is_some()
    }

    ///////////////////////////////////////////////////////////////////////////

    fn enter(&mut self) -> Result<()> {
        execute!(self.stdout, EnterAlternateScreen).context("failed to enter alternate screen")?;
        terminal::enable_raw_mode().context("failed to enable raw mode")?;
        execute!(self.stdout, cursor::Hide, cursor::DisableBlinking).context("failed to hide cursor")?;
        Ok(())
    }

    fn print_at_no_save(&mut self, pos: Coords, glyph: Glyph) -> Result<()> {
        // Used for messages, so the buffer keeps what lies underneath them
        queue!(
            self.stdout,
            cursor::MoveTo(pos.0, pos.1),
            style::SetForegroundColor(glyph.fg),
            style::SetBackgroundColor(glyph.bg),
            style::Print(glyph.ch)
        )
        .context("failed to queue terminal output")?;
        Ok(())
    }

    fn screen_index(&self, pos: Coords) -> Option<usize> {
        if pos.0 < self.width && pos.1 < self.height {
            Some(self.width as usize * pos.1 as usize + pos.0 as usize)
        } else {
            None
        }
    }

    fn saved(&self, x: TermInt, y: TermInt) -> Option<Glyph> {
        self.screen_index((x, y)).map(|index| self.screen[index])
    }
}

impl Message {
    pub fn new(width: TermInt, height: TermInt, top_left: Coords) -> Self {
        Message { width, height, top_left }
    }

    pub fn width(&self) -> TermInt {
        self.width
    }

    pub fn height(&self) -> TermInt {
        self.height
    }

    pub fn top_left(&self) -> Coords {
        self.top_left
    }

    fn contains(&self, pos: Coords) -> bool {
        let (left, top) = self.top_left;
        pos.0 >= left && pos.0 < left + self.width && pos.1 >= top && pos.1 < top + self.height
    }
}
