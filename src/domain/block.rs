/// Program blocks: the palette the player builds programs from.
/// Properties are queried via methods, not stored as flags,
/// so block semantics are centralized here.

use serde::{Deserialize, Serialize};

/// One unit of player-authored program.
/// Serialized with the upper-case token names used in catalog files
/// and hint prompts (`MOVE_UP`, `REPEAT_2`, ...).
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, Serialize, Deserialize)]
pub enum Block {
    #[serde(rename = "MOVE_UP")]
    MoveUp,
    #[serde(rename = "MOVE_DOWN")]
    MoveDown,
    #[serde(rename = "MOVE_LEFT")]
    MoveLeft,
    #[serde(rename = "MOVE_RIGHT")]
    MoveRight,
    #[serde(rename = "REPEAT_2")]
    Repeat2, // one extra copy of the last emitted move
    #[serde(rename = "REPEAT_3")]
    Repeat3, // two extra copies
}

/// Movement primitive. Repeat markers never survive flattening,
/// so the executable stream is made of these only.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub enum Move {
    Up,
    Down,
    Left,
    Right,
}

impl Move {
    /// Grid delta: origin top-left, y grows downward.
    pub fn delta(self) -> (i32, i32) {
        match self {
            Move::Up => (0, -1),
            Move::Down => (0, 1),
            Move::Left => (-1, 0),
            Move::Right => (1, 0),
        }
    }
}

impl Block {
    pub const MOVES: [Block; 4] = [Block::MoveUp, Block::MoveDown, Block::MoveLeft, Block::MoveRight];

    pub const ALL: [Block; 6] = [
        Block::MoveUp,
        Block::MoveDown,
        Block::MoveLeft,
        Block::MoveRight,
        Block::Repeat2,
        Block::Repeat3,
    ];

    /// The movement this block performs, or None for repeat markers.
    pub fn as_move(self) -> Option<Move> {
        match self {
            Block::MoveUp => Some(Move::Up),
            Block::MoveDown => Some(Move::Down),
            Block::MoveLeft => Some(Move::Left),
            Block::MoveRight => Some(Move::Right),
            Block::Repeat2 | Block::Repeat3 => None,
        }
    }

    /// How many extra copies of the last emitted move a repeat marker adds.
    pub fn extra_copies(self) -> usize {
        match self {
            Block::Repeat2 => 1,
            Block::Repeat3 => 2,
            _ => 0,
        }
    }

    pub fn is_repeat(self) -> bool {
        self.extra_copies() > 0
    }

    /// Token sent to the hint service and used in catalog files.
    pub fn token(self) -> &'static str {
        match self {
            Block::MoveUp => "MOVE_UP",
            Block::MoveDown => "MOVE_DOWN",
            Block::MoveLeft => "MOVE_LEFT",
            Block::MoveRight => "MOVE_RIGHT",
            Block::Repeat2 => "REPEAT_2",
            Block::Repeat3 => "REPEAT_3",
        }
    }

    /// Short palette label.
    pub fn label(self) -> &'static str {
        match self {
            Block::MoveUp => "Up",
            Block::MoveDown => "Down",
            Block::MoveLeft => "Left",
            Block::MoveRight => "Right",
            Block::Repeat2 => "Repeat 2x",
            Block::Repeat3 => "Repeat 3x",
        }
    }

    pub fn glyph(self) -> char {
        match self {
            Block::MoveUp => '↑',
            Block::MoveDown => '↓',
            Block::MoveLeft => '←',
            Block::MoveRight => '→',
            Block::Repeat2 | Block::Repeat3 => '↻',
        }
    }
}
