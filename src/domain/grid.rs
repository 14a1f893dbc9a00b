/// Grid coordinates.
///
/// Signed so that a candidate step off the top/left edge, e.g. (0, -1),
/// is representable and can be rejected by the bounds check.

use serde::Deserialize;

use super::block::Move;

#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, Default, Deserialize)]
pub struct Position {
    pub x: i32,
    pub y: i32,
}

impl Position {
    pub const fn new(x: i32, y: i32) -> Self {
        Position { x, y }
    }

    /// Position one cell away in the given direction. Never clamped.
    pub fn step(self, mv: Move) -> Position {
        let (dx, dy) = mv.delta();
        Position { x: self.x + dx, y: self.y + dy }
    }

    /// Inside an N×N grid: both axes in `[0, size)`.
    #[inline]
    pub fn within(self, size: usize) -> bool {
        let n = i32::try_from(size).unwrap_or(i32::MAX);
        self.x >= 0 && self.x < n && self.y >= 0 && self.y < n
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn step_is_unclamped() {
        let origin = Position::new(0, 0);
        assert_eq!(origin.step(Move::Up), Position::new(0, -1));
        assert_eq!(origin.step(Move::Left), Position::new(-1, 0));
        assert_eq!(origin.step(Move::Right).step(Move::Down), Position::new(1, 1));
    }

    #[test]
    fn within_checks_both_axes() {
        assert!(Position::new(0, 0).within(5));
        assert!(Position::new(4, 4).within(5));
        assert!(!Position::new(5, 0).within(5));
        assert!(!Position::new(0, 5).within(5));
        assert!(!Position::new(-1, 2).within(5));
        assert!(!Position::new(2, -1).within(5));
        assert!(!Position::new(0, 0).within(0));
    }

    #[test]
    fn huge_sizes_do_not_wrap() {
        let size = (1usize << 32) + 1;
        assert!(Position::new(1, 0).within(size));
        assert!(Position::new(i32::MAX - 1, 0).within(size));
    }
}
