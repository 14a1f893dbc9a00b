/// Presentation layer: double-buffered, diff-based terminal renderer.
///
/// How it works:
///   1. Build the next frame into `front` buffer (array of Cell)
///   2. Compare each cell with `back` buffer (previous frame)
///   3. Only emit terminal commands for cells that changed
///   4. All commands are batched with `queue!`, flushed once at the end
///   5. Swap front/back
///
/// Screen layout (top to bottom): HUD, bordered board with a legend to its
/// right, message + status lines, palette row, program strip, help bar.
/// The briefing and hint popups are drawn over the board.

use std::io::{self, BufWriter, Write};

use crossterm::{
    cursor::{self, MoveTo},
    execute, queue,
    style::{Color, Print, ResetColor, SetBackgroundColor, SetForegroundColor},
    terminal::{self, Clear, ClearType},
};

use crate::domain::block::Block;
use crate::domain::grid::Position;
use crate::domain::program::step_sources;
use crate::sim::engine::FailReason;
use crate::sim::session::{Phase, Snapshot};
use super::editor::{Editor, Focus};

// ── Cell: the unit of the back-buffer ──

#[derive(Clone, Copy, PartialEq, Eq)]
struct Cell {
    ch: [u8; 4],
    ch_len: u8,
    fg: Color,
    bg: Color,
    wide: bool,    // occupies 2 terminal columns
    cont: bool,    // right half of a wide char (skip render)
}

impl Cell {
    /// Explicit background for every "empty" cell. Using the same RGB for
    /// `Clear(ClearType::All)` keeps VTE inter-row gaps the same color.
    const BASE_BG: Color = Color::Rgb { r: 22, g: 22, b: 35 };

    const BLANK: Cell = Cell {
        ch: [b' ', 0, 0, 0],
        ch_len: 1,
        fg: Color::White,
        bg: Cell::BASE_BG,
        wide: false,
        cont: false,
    };

    const WIDE_CONT: Cell = Cell {
        ch: [0; 4],
        ch_len: 0,
        fg: Color::White,
        bg: Cell::BASE_BG,
        wide: false,
        cont: true,
    };

    /// Differs from any real cell; filling `back` with it forces a repaint.
    const INVALID: Cell = Cell {
        ch: [b'?', 0, 0, 0],
        ch_len: 1,
        fg: Color::Magenta,
        bg: Color::Magenta,
        wide: false,
        cont: false,
    };

    #[inline]
    fn norm_bg(bg: Color) -> Color {
        match bg {
            Color::Reset => Self::BASE_BG,
            other => other,
        }
    }

    fn from_char(c: char, fg: Color, bg: Color) -> Self {
        let mut cell = Self::BLANK;
        cell.ch_len = c.encode_utf8(&mut cell.ch).len() as u8;
        cell.fg = fg;
        cell.bg = Self::norm_bg(bg);
        cell
    }

    fn from_char_wide(c: char, fg: Color, bg: Color) -> Self {
        let mut cell = Self::from_char(c, fg, bg);
        cell.wide = true;
        cell
    }

    fn as_str(&self) -> &str {
        std::str::from_utf8(&self.ch[..self.ch_len as usize]).unwrap_or(" ")
    }
}

// ── FrameBuffer: a 2D grid of Cells ──

struct FrameBuffer {
    width: usize,
    height: usize,
    cells: Vec<Cell>,
}

impl FrameBuffer {
    fn new(w: usize, h: usize) -> Self {
        FrameBuffer {
            width: w,
            height: h,
            cells: vec![Cell::BLANK; w * h],
        }
    }

    fn resize(&mut self, w: usize, h: usize) {
        if self.width != w || self.height != h {
            self.width = w;
            self.height = h;
            self.cells = vec![Cell::BLANK; w * h];
        }
    }

    fn clear(&mut self) {
        self.cells.fill(Cell::BLANK);
    }

    fn set(&mut self, x: usize, y: usize, cell: Cell) {
        if x < self.width && y < self.height {
            self.cells[y * self.width + x] = cell;
        }
    }

    fn get(&self, x: usize, y: usize) -> Cell {
        if x < self.width && y < self.height {
            self.cells[y * self.width + x]
        } else {
            Cell::BLANK
        }
    }

    /// Write a string at (x, y). Each char occupies 1 column. Returns the
    /// column after the last char written.
    fn put_str(&mut self, x: usize, y: usize, s: &str, fg: Color, bg: Color) -> usize {
        let mut cx = x;
        for ch in s.chars() {
            if cx >= self.width { break; }
            self.set(cx, y, Cell::from_char(ch, fg, bg));
            cx += 1;
        }
        cx
    }

    /// A wide glyph plus its continuation cell.
    fn put_wide(&mut self, x: usize, y: usize, c: char, fg: Color, bg: Color) {
        if x + 1 >= self.width { return; }
        self.set(x, y, Cell::from_char_wide(c, fg, bg));
        let mut cont = Cell::WIDE_CONT;
        cont.bg = Cell::norm_bg(bg);
        self.set(x + 1, y, cont);
    }

    fn fill_row(&mut self, y: usize, bg: Color) {
        for x in 0..self.width {
            self.set(x, y, Cell::from_char(' ', Color::White, bg));
        }
    }

    fn fill_rect(&mut self, x: usize, y: usize, w: usize, h: usize, bg: Color) {
        for yy in y..y + h {
            for xx in x..x + w {
                self.set(xx, yy, Cell::from_char(' ', Color::White, bg));
            }
        }
    }

    #[cfg(test)]
    fn row_text(&self, y: usize) -> String {
        (0..self.width)
            .map(|x| self.get(x, y))
            .filter(|c| !c.cont)
            .map(|c| c.as_str().to_string())
            .collect()
    }
}

// ── Layout ──

/// Each board cell is 2 terminal columns.
const CELL_W: usize = 2;

const HUD_ROW: usize = 0;
/// Top border of the board; squares start one row below.
const BOARD_ROW: usize = 2;
const BOARD_COL: usize = 2;

const HUD_BG: Color = Color::Rgb { r: 20, g: 20, b: 60 };
const FLOOR_A: Color = Color::Rgb { r: 38, g: 56, b: 44 };
const FLOOR_B: Color = Color::Rgb { r: 32, g: 48, b: 38 };
const GOAL_BG: Color = Color::Rgb { r: 90, g: 70, b: 20 };
const FRAME_FG: Color = Color::Rgb { r: 90, g: 90, b: 120 };
const ACCENT: Color = Color::Rgb { r: 255, g: 220, b: 50 };
const DIM: Color = Color::Rgb { r: 110, g: 110, b: 130 };
const CURSOR_BG: Color = Color::Rgb { r: 40, g: 90, b: 170 };
const ACTIVE_BG: Color = Color::Rgb { r: 200, g: 160, b: 30 };
const POPUP_BG: Color = Color::Rgb { r: 40, g: 40, b: 56 };

const PLAYER: char = '🧒';
const GOAL: char = '🕌';
const OBSTACLE: char = '🧱';

pub struct Renderer {
    writer: BufWriter<io::Stdout>,
    front: FrameBuffer,
    back: FrameBuffer,
    term_w: usize,
    term_h: usize,
    last_level: Option<usize>,
}

impl Renderer {
    pub fn new() -> Self {
        Renderer {
            writer: BufWriter::with_capacity(16384, io::stdout()),
            front: FrameBuffer::new(0, 0),
            back: FrameBuffer::new(0, 0),
            term_w: 0,
            term_h: 0,
            last_level: None,
        }
    }

    pub fn init(&mut self) -> io::Result<()> {
        terminal::enable_raw_mode()?;
        execute!(
            self.writer,
            terminal::EnterAlternateScreen,
            cursor::Hide,
            SetBackgroundColor(Cell::BASE_BG),
            Clear(ClearType::All)
        )?;

        let (tw, th) = terminal::size().unwrap_or((80, 24));
        self.term_w = tw as usize;
        self.term_h = th as usize;
        self.front.resize(self.term_w, self.term_h);
        self.back.resize(self.term_w, self.term_h);
        self.back.cells.fill(Cell::INVALID);

        Ok(())
    }

    pub fn cleanup(&mut self) -> io::Result<()> {
        execute!(
            self.writer,
            ResetColor,
            cursor::Show,
            terminal::LeaveAlternateScreen
        )?;
        terminal::disable_raw_mode()
    }

    pub fn render(&mut self, snap: &Snapshot, editor: &Editor, pad_connected: bool) -> io::Result<()> {
        let (tw, th) = terminal::size().unwrap_or((80, 24));
        if tw as usize != self.term_w || th as usize != self.term_h {
            self.term_w = tw as usize;
            self.term_h = th as usize;
            self.front.resize(self.term_w, self.term_h);
            self.back.resize(self.term_w, self.term_h);
            self.back.cells.fill(Cell::INVALID);
            queue!(self.writer, SetBackgroundColor(Cell::BASE_BG), Clear(ClearType::All))?;
        }

        // New level: board size may change, repaint from scratch.
        if self.last_level != Some(snap.level_index) {
            self.back.cells.fill(Cell::INVALID);
            queue!(self.writer, SetBackgroundColor(Cell::BASE_BG), Clear(ClearType::All))?;
            self.last_level = Some(snap.level_index);
        }

        self.compose(snap, editor, pad_connected);
        self.flush_diff()?;
        std::mem::swap(&mut self.front, &mut self.back);
        Ok(())
    }

    // ── Diff flush: only write changed cells ──

    fn flush_diff(&mut self) -> io::Result<()> {
        let mut last_fg = Color::White;
        let mut last_bg = Cell::BASE_BG;
        let mut need_move = true;
        let mut last_x: usize = 0;
        let mut last_y: usize = 0;

        // Explicit base colors; ResetColor would fall back to the terminal default.
        queue!(self.writer,
            SetForegroundColor(Color::White),
            SetBackgroundColor(Cell::BASE_BG),
        )?;

        for y in 0..self.front.height {
            let mut x = 0;
            while x < self.front.width {
                let cell = self.front.get(x, y);
                let prev = self.back.get(x, y);

                if cell.cont {
                    if cell != prev { need_move = true; }
                    x += 1;
                    continue;
                }

                let cont_changed = cell.wide
                    && x + 1 < self.front.width
                    && self.front.get(x + 1, y) != self.back.get(x + 1, y);

                if cell == prev && !cont_changed {
                    need_move = true;
                    x += 1;
                    continue;
                }

                if need_move || x != last_x + 1 || y != last_y {
                    queue!(self.writer, MoveTo(x as u16, y as u16))?;
                    need_move = false;
                }

                if cell.fg != last_fg {
                    queue!(self.writer, SetForegroundColor(cell.fg))?;
                    last_fg = cell.fg;
                }
                if cell.bg != last_bg {
                    queue!(self.writer, SetBackgroundColor(cell.bg))?;
                    last_bg = cell.bg;
                }

                queue!(self.writer, Print(cell.as_str()))?;

                if cell.wide {
                    last_x = x + 1;
                    x += 2;
                } else {
                    last_x = x;
                    x += 1;
                }
                last_y = y;
            }
        }

        self.writer.flush()
    }

    // ── Compose: build front buffer content ──

    fn compose(&mut self, snap: &Snapshot, editor: &Editor, pad_connected: bool) {
        self.front.clear();

        self.compose_hud(snap, pad_connected);
        let board_bottom = self.compose_board(snap);
        self.compose_legend(snap);

        let msg_row = board_bottom + 2;
        self.compose_message(snap, msg_row);
        self.compose_palette(snap, editor, msg_row + 3);
        self.compose_program(snap, editor, msg_row + 5);
        self.compose_help(msg_row + 7);

        if snap.briefing {
            self.compose_briefing(snap);
        } else if let Some(text) = snap.hint {
            self.compose_hint(text);
        }
    }

    fn compose_hud(&mut self, snap: &Snapshot, pad_connected: bool) {
        self.front.fill_row(HUD_ROW, HUD_BG);
        let hearts: String = "♥".repeat(snap.lives as usize);
        let hud = format!(
            " {}  │  {}  │  Blocks {}/{}  │  Level {}/{} ",
            snap.level.name, hearts, snap.program.len(), snap.max_blocks,
            snap.level_index + 1, snap.level_count,
        );
        let end = self.front.put_str(0, HUD_ROW, &hud, Color::White, HUD_BG);
        if pad_connected {
            self.front.put_wide(end + 1, HUD_ROW, '🎮', DIM, HUD_BG);
        }
    }

    /// Bordered board. Returns the row of the bottom border.
    fn compose_board(&mut self, snap: &Snapshot) -> usize {
        let level = snap.level;
        let n = level.grid_size;
        let inner_w = n * CELL_W;

        let top = BOARD_ROW;
        let bottom = BOARD_ROW + n + 1;
        let left = BOARD_COL - 1;
        let right = BOARD_COL + inner_w;
        let edge: String = "─".repeat(inner_w);
        self.front.put_str(left, top, &format!("┌{}┐", edge), FRAME_FG, Color::Reset);
        self.front.put_str(left, bottom, &format!("└{}┘", edge), FRAME_FG, Color::Reset);
        for row in top + 1..bottom {
            self.front.put_str(left, row, "│", FRAME_FG, Color::Reset);
            self.front.put_str(right, row, "│", FRAME_FG, Color::Reset);
        }

        for y in 0..n {
            for x in 0..n {
                let pos = Position::new(x as i32, y as i32);
                let col = BOARD_COL + x * CELL_W;
                let row = top + 1 + y;
                let mut bg = if (x + y) % 2 == 0 { FLOOR_A } else { FLOOR_B };
                if pos == level.target {
                    bg = GOAL_BG;
                }
                if pos == snap.position {
                    self.front.put_wide(col, row, PLAYER, Color::White, bg);
                } else if pos == level.target {
                    self.front.put_wide(col, row, GOAL, Color::White, bg);
                } else if level.is_obstacle(pos) {
                    self.front.put_wide(col, row, OBSTACLE, Color::White, bg);
                } else {
                    self.front.put_str(col, row, "  ", Color::White, bg);
                }
            }
        }
        bottom
    }

    fn compose_legend(&mut self, snap: &Snapshot) {
        let col = BOARD_COL + snap.level.grid_size * CELL_W + 3;
        let row = BOARD_ROW + 1;
        let entries = [(PLAYER, "Ahmad"), (GOAL, "Goal"), (OBSTACLE, "Obstacle")];
        for (i, (glyph, name)) in entries.iter().enumerate() {
            self.front.put_wide(col, row + i, *glyph, Color::White, Color::Reset);
            self.front.put_str(col + 3, row + i, name, DIM, Color::Reset);
        }
    }

    fn compose_message(&mut self, snap: &Snapshot, row: usize) {
        let (fg, bg) = match snap.phase {
            Phase::Succeeded => (Color::Black, Color::Rgb { r: 80, g: 200, b: 100 }),
            Phase::Failed(_) => (Color::White, Color::Rgb { r: 170, g: 50, b: 50 }),
            Phase::Executing => (Color::White, Color::Rgb { r: 40, g: 80, b: 150 }),
            Phase::Editing => (Color::Black, Color::Rgb { r: 200, g: 180, b: 50 }),
        };
        self.front.fill_row(row, bg);
        self.front.put_str(0, row, &format!(" ◈ {} ", snap.message), fg, bg);
        self.front.put_str(1, row + 1, &status_line(snap), DIM, Color::Reset);
    }

    fn compose_palette(&mut self, snap: &Snapshot, editor: &Editor, row: usize) {
        let mut x = self.front.put_str(1, row, "Blocks ", ACCENT, Color::Reset);
        let focused = editor.focus() == Focus::Palette && snap.can_edit;
        for (i, block) in snap.level.available_blocks.iter().enumerate() {
            let chip = format!(" {} {} {} ", i + 1, block.glyph(), block.label());
            let (fg, bg) = if focused && i == editor.palette_cursor() {
                (Color::White, CURSOR_BG)
            } else if snap.can_edit {
                (Color::White, HUD_BG)
            } else {
                (DIM, Color::Reset)
            };
            x = self.front.put_str(x, row, &chip, fg, bg) + 1;
        }
    }

    fn compose_program(&mut self, snap: &Snapshot, editor: &Editor, row: usize) {
        let mut x = self.front.put_str(1, row, "Code   ", ACCENT, Color::Reset);

        let active = match (snap.phase, snap.step_index) {
            (Phase::Executing, Some(step)) => step_sources(snap.program).get(step).copied(),
            _ => None,
        };
        let focused = editor.focus() == Focus::Program && snap.can_edit;

        for slot in 0..snap.max_blocks {
            match snap.program.get(slot) {
                Some(block) => {
                    let (fg, bg) = if active == Some(slot) {
                        (Color::Black, ACTIVE_BG)
                    } else if focused && slot == editor.program_cursor() {
                        (Color::White, CURSOR_BG)
                    } else {
                        (Color::White, HUD_BG)
                    };
                    x = self.front.put_str(x, row, &format!(" {} ", chip(*block)), fg, bg) + 1;
                }
                None => {
                    x = self.front.put_str(x, row, " · ", DIM, Color::Reset) + 1;
                }
            }
        }
    }

    fn compose_help(&mut self, row: usize) {
        let help = " ←→ Select  Tab Focus  Enter Add/Remove  1-6 Add  ⌫ Undo  R Run  F2 Reset  N Next  H Hint  I Info  Q Quit";
        self.front.put_str(0, row, help, DIM, Color::Reset);
    }

    fn compose_briefing(&mut self, snap: &Snapshot) {
        let level = snap.level;
        let width = self.popup_width();
        let mut lines = wrap_text(&level.story, width - 4);
        lines.push(String::new());
        lines.push(format!("Grid {0}×{0}   Max blocks {1}", level.grid_size, level.max_blocks));
        let palette: Vec<String> = level.available_blocks.iter()
            .map(|b| format!("{} {}", b.glyph(), b.label()))
            .collect();
        lines.extend(wrap_text(&palette.join("  "), width - 4));
        lines.push(String::new());
        lines.push("Enter / Esc / pad A: start coding".to_string());
        self.compose_popup(&level.name, &lines, width);
    }

    fn compose_hint(&mut self, text: &str) {
        let width = self.popup_width();
        let mut lines = wrap_text(text, width - 4);
        lines.push(String::new());
        lines.push("Enter / Esc / pad A: close".to_string());
        self.compose_popup("Hint", &lines, width);
    }

    fn popup_width(&self) -> usize {
        44_usize.min(self.front.width.saturating_sub(2)).max(12)
    }

    fn compose_popup(&mut self, title: &str, lines: &[String], width: usize) {
        let height = lines.len() + 4;
        let x = (self.front.width.saturating_sub(width)) / 2;
        let y = BOARD_ROW + 1;
        self.front.fill_rect(x, y, width, height, POPUP_BG);

        let edge: String = "═".repeat(width - 2);
        self.front.put_str(x, y, &format!("╔{}╗", edge), ACCENT, POPUP_BG);
        self.front.put_str(x, y + height - 1, &format!("╚{}╝", edge), ACCENT, POPUP_BG);
        for row in y + 1..y + height - 1 {
            self.front.put_str(x, row, "║", ACCENT, POPUP_BG);
            self.front.put_str(x + width - 1, row, "║", ACCENT, POPUP_BG);
        }
        self.front.put_str(x + 2, y + 1, title, ACCENT, POPUP_BG);
        for (i, line) in lines.iter().enumerate() {
            self.front.put_str(x + 2, y + 3 + i, line, Color::White, POPUP_BG);
        }
    }
}

/// Compact program-strip label.
fn chip(block: Block) -> String {
    if block.is_repeat() {
        format!("{}{}", block.glyph(), block.extra_copies() + 1)
    } else {
        block.glyph().to_string()
    }
}

/// Second line under the message: what the player can do next.
fn status_line(snap: &Snapshot) -> String {
    if snap.hint_loading {
        return "Asking for a hint...".to_string();
    }
    match snap.phase {
        Phase::Executing => {
            let step = snap.step_index.map_or(0, |s| s + 1);
            format!("Running step {}/{}", step, snap.step_count)
        }
        Phase::Succeeded if snap.catalog_complete() => {
            "Every level complete. Ramadan Mubarak!".to_string()
        }
        Phase::Succeeded => "Press N for the next level".to_string(),
        Phase::Failed(FailReason::MissedTarget) => {
            "Check where Ahmad stopped, then press R to try again".to_string()
        }
        Phase::Failed(_) => "Fix the code and press R to try again, or F2 to start over".to_string(),
        Phase::Editing if snap.program.is_empty() => "Add blocks to build Ahmad's route".to_string(),
        Phase::Editing => "Press R to run your code".to_string(),
    }
}

/// Greedy word wrap to `width` columns. Overlong words are split.
fn wrap_text(text: &str, width: usize) -> Vec<String> {
    let width = width.max(1);
    let mut lines = vec![];
    let mut current = String::new();
    for word in text.split_whitespace() {
        let mut word: Vec<char> = word.chars().collect();
        while word.len() > width {
            if !current.is_empty() {
                lines.push(std::mem::take(&mut current));
            }
            lines.push(word.drain(..width).collect());
        }
        let current_len = current.chars().count();
        if current_len > 0 && current_len + 1 + word.len() > width {
            lines.push(std::mem::take(&mut current));
        }
        if !current.is_empty() {
            current.push(' ');
        }
        current.extend(word);
    }
    if !current.is_empty() {
        lines.push(current);
    }
    lines
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::time::Instant;
    use crate::domain::level::Level;
    use crate::hint::OfflineHints;
    use crate::sim::session::Session;

    fn compose_rows(session: &Session, editor: &Editor) -> Vec<String> {
        let mut r = Renderer::new();
        r.front.resize(100, 30);
        r.compose(&session.snapshot(), editor, false);
        (0..30).map(|y| r.front.row_text(y)).collect()
    }

    fn session() -> Session {
        let mut level = Level::from_diagram(&["S.T", "...", "..."]);
        level.name = "Day 1: Test".into();
        Session::new(vec![level], Arc::new(OfflineHints))
    }

    #[test]
    fn wrap_respects_width() {
        assert_eq!(wrap_text("help Ahmad reach the mosque", 10), vec!["help Ahmad", "reach the", "mosque"]);
        assert_eq!(wrap_text("abcdefghij", 4), vec!["abcd", "efgh", "ij"]);
        assert!(wrap_text("   ", 5).is_empty());
    }

    #[test]
    fn chips_show_repeat_count() {
        assert_eq!(chip(Block::MoveUp), "↑");
        assert_eq!(chip(Block::Repeat3), "↻3");
    }

    #[test]
    fn briefing_overlay_shows_story() {
        let s = session();
        let rows = compose_rows(&s, &Editor::new());
        assert!(rows[HUD_ROW].contains("Day 1: Test"));
        assert!(rows.iter().any(|r| r.contains("Test story")));
        assert!(rows.iter().any(|r| r.contains("Enter / Esc / pad A: start coding")));
    }

    #[test]
    fn program_strip_and_status() {
        let mut s = session();
        s.close_briefing();
        s.add_block(Block::MoveRight);
        s.add_block(Block::Repeat2);
        let rows = compose_rows(&s, &Editor::new());
        assert!(rows.iter().any(|r| r.contains("Code") && r.contains(" → ") && r.contains(" ↻2 ")));
        assert!(rows.iter().any(|r| r.contains("Press R to run your code")));
        assert!(rows[HUD_ROW].contains("Blocks 2/8"));

        s.execute(Instant::now());
        let rows = compose_rows(&s, &Editor::new());
        assert!(rows.iter().any(|r| r.contains("Running step 1/2")));
    }
}
