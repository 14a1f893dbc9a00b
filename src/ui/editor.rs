/// Editor cursor: turns key actions into session commands.
///
/// Two rows take focus in turn: the palette (blocks the level offers) and
/// the program strip. Each row has its own cursor, clamped to the row's
/// length every frame since the program changes under it.

use crate::domain::block::Block;
use super::input::KeyAction;

#[derive(Clone, Copy, PartialEq, Eq, Debug, Default)]
pub enum Focus {
    #[default]
    Palette,
    Program,
}

/// Something the session (or the loop) should do.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum Command {
    Add(Block),
    Remove(usize),
    Run,
    Reset,
    Next,
    Hint,
    OpenBriefing,
    CloseOverlay,
    Quit,
}

/// What the editor needs to know about the current frame.
pub struct EditorView<'a> {
    pub palette: &'a [Block],
    pub program_len: usize,
    pub overlay_open: bool,
}

#[derive(Clone, Debug, Default)]
pub struct Editor {
    focus: Focus,
    palette_cursor: usize,
    program_cursor: usize,
}

impl Editor {
    pub fn new() -> Self {
        Editor::default()
    }

    pub fn focus(&self) -> Focus {
        self.focus
    }

    pub fn palette_cursor(&self) -> usize {
        self.palette_cursor
    }

    pub fn program_cursor(&self) -> usize {
        self.program_cursor
    }

    /// Back to the palette, both cursors at the start. Used on level change.
    pub fn home(&mut self) {
        *self = Editor::default();
    }

    pub fn clamp(&mut self, palette_len: usize, program_len: usize) {
        self.palette_cursor = self.palette_cursor.min(palette_len.saturating_sub(1));
        self.program_cursor = self.program_cursor.min(program_len.saturating_sub(1));
        if program_len == 0 {
            self.focus = Focus::Palette;
        }
    }

    pub fn handle(&mut self, action: KeyAction, view: &EditorView) -> Option<Command> {
        self.clamp(view.palette.len(), view.program_len);

        // Pad A/B (add/remove) double as confirm/back on popups.
        if view.overlay_open {
            return match action {
                KeyAction::Activate
                | KeyAction::Back
                | KeyAction::AddSelected
                | KeyAction::RemoveSelected => Some(Command::CloseOverlay),
                KeyAction::Quit => Some(Command::Quit),
                _ => None,
            };
        }

        match action {
            KeyAction::CursorLeft => {
                let cur = self.cursor_mut();
                *cur = cur.saturating_sub(1);
                None
            }
            KeyAction::CursorRight => {
                let len = self.focused_len(view);
                let cur = self.cursor_mut();
                if *cur + 1 < len {
                    *cur += 1;
                }
                None
            }
            KeyAction::SwitchFocus => {
                self.focus = match self.focus {
                    Focus::Palette if view.program_len > 0 => Focus::Program,
                    _ => Focus::Palette,
                };
                None
            }
            KeyAction::Activate => match self.focus {
                Focus::Palette => self.selected_block(view).map(Command::Add),
                Focus::Program if view.program_len > 0 => Some(Command::Remove(self.program_cursor)),
                Focus::Program => None,
            },
            KeyAction::AddNth(n) => view.palette.get(n).copied().map(Command::Add),
            KeyAction::AddSelected => self.selected_block(view).map(Command::Add),
            KeyAction::RemoveSelected => match self.focus {
                Focus::Program if view.program_len > 0 => Some(Command::Remove(self.program_cursor)),
                _ => view.program_len.checked_sub(1).map(Command::Remove),
            },
            KeyAction::RemoveLast => view.program_len.checked_sub(1).map(Command::Remove),
            KeyAction::Run => Some(Command::Run),
            KeyAction::Reset => Some(Command::Reset),
            KeyAction::Next => Some(Command::Next),
            KeyAction::Hint => Some(Command::Hint),
            KeyAction::Briefing => Some(Command::OpenBriefing),
            KeyAction::Back | KeyAction::Quit => Some(Command::Quit),
        }
    }

    fn selected_block(&self, view: &EditorView) -> Option<Block> {
        view.palette.get(self.palette_cursor).copied()
    }

    fn focused_len(&self, view: &EditorView) -> usize {
        match self.focus {
            Focus::Palette => view.palette.len(),
            Focus::Program => view.program_len,
        }
    }

    fn cursor_mut(&mut self) -> &mut usize {
        match self.focus {
            Focus::Palette => &mut self.palette_cursor,
            Focus::Program => &mut self.program_cursor,
        }
    }
}
