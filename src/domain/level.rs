/// Level: an immutable puzzle definition.
///
/// Created once when the catalog is loaded and never mutated afterwards.
/// Obstacles are expected to be disjoint from start and target; that is a
/// property of how levels are authored and is not checked at runtime.

use super::block::Block;
use super::grid::Position;

#[derive(Clone, Debug, PartialEq)]
pub struct Level {
    pub id: u32,
    pub name: String,
    /// The board is `grid_size` × `grid_size`.
    pub grid_size: usize,
    pub start: Position,
    pub target: Position,
    pub obstacles: Vec<Position>,
    /// Palette offered to the player, in display order.
    pub available_blocks: Vec<Block>,
    pub max_blocks: usize,
    pub story: String,
}

impl Level {
    #[inline]
    pub fn contains(&self, pos: Position) -> bool {
        pos.within(self.grid_size)
    }

    pub fn is_obstacle(&self, pos: Position) -> bool {
        self.obstacles.iter().any(|o| *o == pos)
    }

    pub fn offers(&self, block: Block) -> bool {
        self.available_blocks.contains(&block)
    }

    /// Test helper: build a level from a square string diagram.
    /// Legend: 'S'=start  'T'=target  '#'=obstacle  anything else = floor.
    /// Palette is every block; max_blocks is 8.
    #[cfg(test)]
    pub fn from_diagram(rows: &[&str]) -> Level {
        let size = rows.len();
        let mut start = Position::default();
        let mut target = Position::default();
        let mut obstacles = vec![];
        for (y, row) in rows.iter().enumerate() {
            assert_eq!(row.chars().count(), size, "diagram must be square");
            for (x, ch) in row.chars().enumerate() {
                let p = Position::new(x as i32, y as i32);
                match ch {
                    'S' => start = p,
                    'T' => target = p,
                    '#' => obstacles.push(p),
                    _ => {}
                }
            }
        }
        Level {
            id: 1,
            name: "Diagram".to_string(),
            grid_size: size,
            start,
            target,
            obstacles,
            available_blocks: Block::ALL.to_vec(),
            max_blocks: 8,
            story: "Test story".to_string(),
        }
    }
}
