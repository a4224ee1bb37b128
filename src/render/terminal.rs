//! Terminal drawing surface.
//!
//! Each map cell occupies the centre of a 2x2 character block; the shared
//! border rows and columns between centres carry the walls. A `w`x`h` map
//! therefore needs `2w+1` columns and `2h+1` rows.

use std::io::{self, Stdout, Write};

use crossterm::{
    cursor::{Hide, MoveTo, Show},
    event::{KeyboardEnhancementFlags, PopKeyboardEnhancementFlags, PushKeyboardEnhancementFlags},
    execute, queue,
    style::{Color, Print, ResetColor, SetForegroundColor},
    terminal::{self, Clear, ClearType, EnterAlternateScreen, LeaveAlternateScreen},
};
use tracing::debug;

use super::Canvas;
use crate::game::{CellType, Coords, Direction, Edges, MapDimensions};

const WALL_COLOR: Color = Color::DarkRed;
const PLAYER_COLOR: Color = Color::Blue;
const PEER_COLOR: Color = Color::White;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Glyph {
    ch: char,
    color: Color,
}

impl Glyph {
    const BLANK: Glyph = Glyph {
        ch: ' ',
        color: Color::Reset,
    };
}

/// Character buffer for one frame
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextFrame {
    cols: usize,
    rows: usize,
    glyphs: Vec<Glyph>,
}

impl TextFrame {
    pub fn new(dimensions: MapDimensions) -> Self {
        let cols = dimensions.width() * 2 + 1;
        let rows = dimensions.height() * 2 + 1;
        Self {
            cols,
            rows,
            glyphs: vec![Glyph::BLANK; cols * rows],
        }
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    #[cfg(test)]
    pub fn cols(&self) -> usize {
        self.cols
    }

    /// Plain text of one row, colours dropped
    pub fn row_text(&self, row: usize) -> String {
        self.row(row).iter().map(|g| g.ch).collect()
    }

    fn row(&self, row: usize) -> &[Glyph] {
        let start = row * self.cols;
        &self.glyphs[start..start + self.cols]
    }

    fn put(&mut self, col: usize, row: usize, ch: char, color: Color) {
        if col < self.cols && row < self.rows {
            self.glyphs[row * self.cols + col] = Glyph { ch, color };
        }
    }

    /// Character position of a cell's centre, if it lies inside the frame
    fn centre(&self, at: Coords) -> Option<(usize, usize)> {
        let col = at.x.checked_mul(2)?.checked_add(1)?;
        let row = at.y.checked_mul(2)?.checked_add(1)?;
        (col < self.cols && row < self.rows).then_some((col, row))
    }

    fn horizontal_wall(&mut self, col: usize, row: usize) {
        self.put(col - 1, row, '+', WALL_COLOR);
        self.put(col, row, '-', WALL_COLOR);
        self.put(col + 1, row, '+', WALL_COLOR);
    }

    fn vertical_wall(&mut self, col: usize, row: usize) {
        self.put(col, row - 1, '+', WALL_COLOR);
        self.put(col, row, '|', WALL_COLOR);
        self.put(col, row + 1, '+', WALL_COLOR);
    }
}

impl Canvas for TextFrame {
    fn clear(&mut self) {
        self.glyphs.fill(Glyph::BLANK);
    }

    fn draw_background(&mut self, dimensions: MapDimensions) {
        if self.cols != dimensions.width() * 2 + 1 || self.rows != dimensions.height() * 2 + 1 {
            *self = TextFrame::new(dimensions);
        }
    }

    fn draw_floor(&mut self, at: Coords, cell_type: CellType) {
        let Some((col, row)) = self.centre(at) else {
            return;
        };
        let (ch, color) = match cell_type {
            CellType::Soil => ('.', Color::DarkYellow),
            CellType::Plant => ('"', Color::Green),
            CellType::Flower => ('*', Color::Magenta),
        };
        self.put(col, row, ch, color);
    }

    fn draw_walls(&mut self, at: Coords, edges: Edges) {
        let Some((col, row)) = self.centre(at) else {
            return;
        };
        if edges.is_wall(Direction::North) {
            self.horizontal_wall(col, row - 1);
        }
        if edges.is_wall(Direction::East) {
            self.vertical_wall(col + 1, row);
        }
        if edges.is_wall(Direction::South) {
            self.horizontal_wall(col, row + 1);
        }
        if edges.is_wall(Direction::West) {
            self.vertical_wall(col - 1, row);
        }
    }

    fn draw_player(&mut self, at: Coords, facing: Direction) {
        let Some((col, row)) = self.centre(at) else {
            return;
        };
        let ch = match facing {
            Direction::North => '^',
            Direction::East => '>',
            Direction::South => 'v',
            Direction::West => '<',
        };
        self.put(col, row, ch, PLAYER_COLOR);
    }

    fn draw_peer(&mut self, at: Coords) {
        let Some((col, row)) = self.centre(at) else {
            return;
        };
        self.put(col, row, 'o', PEER_COLOR);
    }

    fn present(&mut self) -> io::Result<()> {
        Ok(())
    }
}

/// Double-buffered terminal canvas; only rows that changed are rewritten
pub struct TerminalCanvas<W: Write = Stdout> {
    out: W,
    frame: TextFrame,
    previous: Option<TextFrame>,
    status: String,
    status_dirty: bool,
}

impl TerminalCanvas<Stdout> {
    pub fn stdout(dimensions: MapDimensions) -> Self {
        Self::new(io::stdout(), dimensions)
    }
}

impl<W: Write> TerminalCanvas<W> {
    pub fn new(out: W, dimensions: MapDimensions) -> Self {
        Self {
            out,
            frame: TextFrame::new(dimensions),
            previous: None,
            status: String::new(),
            status_dirty: true,
        }
    }

    /// Text shown below the map
    pub fn set_status(&mut self, status: impl Into<String>) {
        let status = status.into();
        if status != self.status {
            self.status = status;
            self.status_dirty = true;
        }
    }

    /// Force a full repaint on the next present
    pub fn invalidate(&mut self) {
        self.previous = None;
        self.status_dirty = true;
    }

    #[cfg(test)]
    pub fn into_inner(self) -> W {
        self.out
    }
}

impl<W: Write> Canvas for TerminalCanvas<W> {
    fn clear(&mut self) {
        self.frame.clear();
    }

    fn draw_background(&mut self, dimensions: MapDimensions) {
        self.frame.draw_background(dimensions);
    }

    fn draw_floor(&mut self, at: Coords, cell_type: CellType) {
        self.frame.draw_floor(at, cell_type);
    }

    fn draw_walls(&mut self, at: Coords, edges: Edges) {
        self.frame.draw_walls(at, edges);
    }

    fn draw_player(&mut self, at: Coords, facing: Direction) {
        self.frame.draw_player(at, facing);
    }

    fn draw_peer(&mut self, at: Coords) {
        self.frame.draw_peer(at);
    }

    fn present(&mut self) -> io::Result<()> {
        let mut rows_written = 0;
        for row in 0..self.frame.rows() {
            let unchanged = self
                .previous
                .as_ref()
                .is_some_and(|prev| prev.rows == self.frame.rows && prev.row(row) == self.frame.row(row));
            if unchanged {
                continue;
            }

            queue!(self.out, MoveTo(0, cursor_row(row)?))?;
            for glyph in self.frame.row(row) {
                queue!(self.out, SetForegroundColor(glyph.color), Print(glyph.ch))?;
            }
            rows_written += 1;
        }

        if self.status_dirty {
            queue!(
                self.out,
                MoveTo(0, cursor_row(self.frame.rows())?),
                ResetColor,
                Clear(ClearType::CurrentLine),
                Print(&self.status)
            )?;
            self.status_dirty = false;
        }

        queue!(self.out, ResetColor)?;
        self.out.flush()?;

        if rows_written > 0 {
            debug!(rows_written, "Presented frame");
        }
        self.previous = Some(self.frame.clone());
        Ok(())
    }
}

fn cursor_row(row: usize) -> io::Result<u16> {
    u16::try_from(row).map_err(|_| {
        io::Error::new(io::ErrorKind::InvalidInput, format!("row {row} beyond terminal addressing"))
    })
}

/// Raw-mode alternate screen for the lifetime of the guard
pub struct TerminalGuard {
    key_release_events: bool,
}

impl TerminalGuard {
    pub fn enter() -> io::Result<Self> {
        terminal::enable_raw_mode()?;
        let mut stdout = io::stdout();
        execute!(stdout, EnterAlternateScreen, Hide, Clear(ClearType::All))?;

        // Release events need the kitty keyboard protocol
        let key_release_events = terminal::supports_keyboard_enhancement().unwrap_or(false);
        if key_release_events {
            execute!(
                stdout,
                PushKeyboardEnhancementFlags(
                    KeyboardEnhancementFlags::DISAMBIGUATE_ESCAPE_CODES
                        | KeyboardEnhancementFlags::REPORT_EVENT_TYPES
                )
            )?;
        }

        Ok(Self { key_release_events })
    }

    /// Whether the terminal reports key releases
    pub fn key_release_events(&self) -> bool {
        self.key_release_events
    }
}

impl Drop for TerminalGuard {
    fn drop(&mut self) {
        let mut stdout = io::stdout();
        if self.key_release_events {
            let _ = execute!(stdout, PopKeyboardEnhancementFlags);
        }
        let _ = execute!(stdout, ResetColor, Show, LeaveAlternateScreen);
        let _ = terminal::disable_raw_mode();
    }
}
