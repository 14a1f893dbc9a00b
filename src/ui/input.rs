/// Keyboard input collector.
///
/// The editor only has one-shot actions, so this tracks presses, not
/// held keys. Each frame `drain_events()` reads everything crossterm has
/// buffered; the game loop then asks what was pressed this frame.
/// Release events are ignored; key-repeat counts as a press so holding
/// an arrow key walks the cursor.

use std::time::Duration;

use crossterm::event::{self, poll, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};

pub struct InputState {
    /// Presses collected during the most recent `drain_events()`.
    presses: Vec<KeyEvent>,
}

impl InputState {
    pub fn new() -> Self {
        InputState {
            presses: Vec::with_capacity(8),
        }
    }

    /// Drain all pending terminal events without blocking.
    /// Call this once per frame, before the session tick.
    pub fn drain_events(&mut self) {
        self.presses.clear();
        while poll(Duration::ZERO).unwrap_or(false) {
            if let Ok(Event::Key(key)) = event::read() {
                self.record(key);
            }
        }
    }

    fn record(&mut self, key: KeyEvent) {
        if key.kind != KeyEventKind::Release {
            self.presses.push(key);
        }
    }

    /// Presses in arrival order.
    pub fn presses(&self) -> &[KeyEvent] {
        &self.presses
    }

    pub fn ctrl_c_pressed(&self) -> bool {
        self.presses.iter().any(|k| {
            k.modifiers.contains(KeyModifiers::CONTROL)
                && (k.code == KeyCode::Char('c') || k.code == KeyCode::Char('C'))
        })
    }
}

/// What a key means to the game. Cursor/focus keys are handled by the
/// editor; the rest become session commands.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum KeyAction {
    CursorLeft,
    CursorRight,
    SwitchFocus,
    Activate,
    /// Add the nth (0-based) palette block.
    AddNth(usize),
    /// Add the block under the palette cursor, whatever the focus.
    AddSelected,
    /// Remove the block under the program cursor (or the last one).
    RemoveSelected,
    RemoveLast,
    Run,
    Reset,
    Next,
    Hint,
    Briefing,
    Back,
    Quit,
}

pub fn key_action(key: &KeyEvent) -> Option<KeyAction> {
    if key.modifiers.contains(KeyModifiers::CONTROL) {
        return match key.code {
            KeyCode::Char('c') | KeyCode::Char('C') => Some(KeyAction::Quit),
            _ => None,
        };
    }
    let action = match key.code {
        KeyCode::Left => KeyAction::CursorLeft,
        KeyCode::Right => KeyAction::CursorRight,
        KeyCode::Tab | KeyCode::BackTab => KeyAction::SwitchFocus,
        KeyCode::Enter | KeyCode::Char(' ') => KeyAction::Activate,
        KeyCode::Char(c @ '1'..='6') => KeyAction::AddNth(c as usize - '1' as usize),
        KeyCode::Backspace => KeyAction::RemoveLast,
        KeyCode::Char('r') | KeyCode::Char('R') => KeyAction::Run,
        KeyCode::F(2) => KeyAction::Reset,
        KeyCode::Char('n') | KeyCode::Char('N') => KeyAction::Next,
        KeyCode::Char('h') | KeyCode::Char('H') => KeyAction::Hint,
        KeyCode::Char('i') | KeyCode::Char('I') => KeyAction::Briefing,
        KeyCode::Esc => KeyAction::Back,
        KeyCode::Char('q') | KeyCode::Char('Q') => KeyAction::Quit,
        _ => return None,
    };
    Some(action)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crossterm::event::KeyEventState;

    fn key(code: KeyCode) -> KeyEvent {
        KeyEvent::new(code, KeyModifiers::NONE)
    }

    #[test]
    fn digits_map_to_palette_slots() {
        assert_eq!(key_action(&key(KeyCode::Char('1'))), Some(KeyAction::AddNth(0)));
        assert_eq!(key_action(&key(KeyCode::Char('6'))), Some(KeyAction::AddNth(5)));
        assert_eq!(key_action(&key(KeyCode::Char('7'))), None);
        assert_eq!(key_action(&key(KeyCode::Char('0'))), None);
    }

    #[test]
    fn command_keys() {
        assert_eq!(key_action(&key(KeyCode::Char('R'))), Some(KeyAction::Run));
        assert_eq!(key_action(&key(KeyCode::F(2))), Some(KeyAction::Reset));
        assert_eq!(key_action(&key(KeyCode::Char(' '))), Some(KeyAction::Activate));
        assert_eq!(key_action(&key(KeyCode::Backspace)), Some(KeyAction::RemoveLast));
        assert_eq!(key_action(&key(KeyCode::Esc)), Some(KeyAction::Back));
        let ctrl_c = KeyEvent::new(KeyCode::Char('c'), KeyModifiers::CONTROL);
        assert_eq!(key_action(&ctrl_c), Some(KeyAction::Quit));
        let ctrl_r = KeyEvent::new(KeyCode::Char('r'), KeyModifiers::CONTROL);
        assert_eq!(key_action(&ctrl_r), None);
    }

    #[test]
    fn releases_are_ignored() {
        let mut input = InputState::new();
        input.record(KeyEvent {
            code: KeyCode::Char('r'),
            modifiers: KeyModifiers::NONE,
            kind: KeyEventKind::Release,
            state: KeyEventState::NONE,
        });
        assert!(input.presses().is_empty());
        input.record(key(KeyCode::Char('r')));
        assert_eq!(input.presses()[0].code, KeyCode::Char('r'));
        assert!(!input.ctrl_c_pressed());
    }
}
