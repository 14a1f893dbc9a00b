/// Level catalog: the ordered, immutable list of puzzles.
///
/// ## Sources (priority order):
///   1. Custom catalog file (`levels.toml`, path from config)
///   2. Built-in catalog (50 Ramadan days, generated)
///
/// ## Catalog file format:
///   ```toml
///   [[level]]
///   name = "Warm-up"
///   grid_size = 5
///   start = { x = 0, y = 0 }
///   target = { x = 2, y = 0 }
///   obstacles = [{ x = 1, y = 1 }]
///   blocks = ["MOVE_RIGHT", "MOVE_DOWN", "REPEAT_2"]
///   max_blocks = 8
///   story = "Help Ahmad reach the lantern."
///   ```
///
/// `id` is optional and defaults to the 1-based position in the file.
/// Obstacle overlap with start/target is not checked.

use std::fmt;
use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::domain::block::Block;
use crate::domain::grid::Position;
use crate::domain::level::Level;

// ══════════════════════════════════════════════════════════════
// Errors
// ══════════════════════════════════════════════════════════════

#[derive(Debug)]
pub enum CatalogError {
    Io { path: PathBuf, source: std::io::Error },
    Parse(toml::de::Error),
    Empty,
    Invalid { level: usize, reason: String },
}

impl fmt::Display for CatalogError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CatalogError::Io { path, source } => {
                write!(f, "could not read {}: {}", path.display(), source)
            }
            CatalogError::Parse(e) => write!(f, "catalog parse error: {}", e),
            CatalogError::Empty => write!(f, "catalog contains no levels"),
            CatalogError::Invalid { level, reason } => {
                write!(f, "level {} is invalid: {}", level, reason)
            }
        }
    }
}

impl std::error::Error for CatalogError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            CatalogError::Io { source, .. } => Some(source),
            CatalogError::Parse(e) => Some(e),
            _ => None,
        }
    }
}

impl From<toml::de::Error> for CatalogError {
    fn from(err: toml::de::Error) -> Self {
        CatalogError::Parse(err)
    }
}

// ══════════════════════════════════════════════════════════════
// Public API
// ══════════════════════════════════════════════════════════════

/// Load the catalog for this run. Never fails: a missing file means the
/// built-in catalog, a broken one prints a warning and falls back.
pub fn load_catalog(path: &Path) -> Vec<Level> {
    if !path.is_file() {
        return builtin_levels();
    }
    match read_catalog(path) {
        Ok(levels) => levels,
        Err(e) => {
            eprintln!("Warning: {}: {e}", path.display());
            eprintln!("Using built-in levels.");
            builtin_levels()
        }
    }
}

pub fn read_catalog(path: &Path) -> Result<Vec<Level>, CatalogError> {
    let text = std::fs::read_to_string(path).map_err(|source| CatalogError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    parse_catalog(&text)
}

pub fn parse_catalog(text: &str) -> Result<Vec<Level>, CatalogError> {
    let file: CatalogFile = toml::from_str(text)?;
    if file.levels.is_empty() {
        return Err(CatalogError::Empty);
    }
    file.levels
        .into_iter()
        .enumerate()
        .map(|(i, entry)| entry.into_level(i + 1))
        .collect()
}

// ══════════════════════════════════════════════════════════════
// File schema
// ══════════════════════════════════════════════════════════════

#[derive(Deserialize)]
struct CatalogFile {
    #[serde(default, rename = "level")]
    levels: Vec<LevelEntry>,
}

/// Largest board a catalog file may declare.
const MAX_GRID_SIZE: usize = 64;

#[derive(Deserialize)]
struct LevelEntry {
    id: Option<u32>,
    name: String,
    grid_size: usize,
    start: Position,
    target: Position,
    #[serde(default)]
    obstacles: Vec<Position>,
    blocks: Vec<Block>,
    max_blocks: usize,
    #[serde(default)]
    story: String,
}

impl LevelEntry {
    fn into_level(self, ordinal: usize) -> Result<Level, CatalogError> {
        let invalid = |reason: String| CatalogError::Invalid { level: ordinal, reason };

        if self.grid_size == 0 || self.grid_size > MAX_GRID_SIZE {
            return Err(invalid(format!("grid_size must be between 1 and {MAX_GRID_SIZE}")));
        }
        if !self.start.within(self.grid_size) {
            return Err(invalid(format!("start {:?} is outside the grid", self.start)));
        }
        if !self.target.within(self.grid_size) {
            return Err(invalid(format!("target {:?} is outside the grid", self.target)));
        }
        if self.blocks.is_empty() {
            return Err(invalid("palette is empty".into()));
        }
        if self.max_blocks == 0 {
            return Err(invalid("max_blocks must be at least 1".into()));
        }

        Ok(Level {
            id: self.id.unwrap_or(ordinal as u32),
            name: self.name,
            grid_size: self.grid_size,
            start: self.start,
            target: self.target,
            obstacles: self.obstacles,
            available_blocks: self.blocks,
            max_blocks: self.max_blocks,
            story: self.story,
        })
    }
}

// ══════════════════════════════════════════════════════════════
// Built-in catalog: 50 days in four bands
// ══════════════════════════════════════════════════════════════

pub fn builtin_levels() -> Vec<Level> {
    let mut levels = Vec::with_capacity(50);
    let all = Block::ALL.to_vec();
    let moves = Block::MOVES.to_vec();

    // Days 1-10: basics
    for i in 1..=10_i32 {
        levels.push(Level {
            id: i as u32,
            name: format!("Ramadan Day {}: {}", i, if i % 2 == 0 { "Charity" } else { "Preparation" }),
            grid_size: 5,
            start: Position::new(0, 0),
            target: Position::new(i.min(4), (i - 4).max(0)),
            obstacles: if i > 5 {
                vec![Position::new(1, 0), Position::new(1, 1)]
            } else {
                vec![]
            },
            available_blocks: if i < 5 {
                vec![Block::MoveRight, Block::MoveDown]
            } else {
                moves.clone()
            },
            max_blocks: 8,
            story: format!("Day {} mission: help Ahmad reach today's Ramadan activity!", i),
        });
    }

    // Days 11-25: obstacles, REPEAT_2 from day 20
    for i in 11..=25_i32 {
        levels.push(Level {
            id: i as u32,
            name: format!("Ramadan Day {}: {}", i, if i % 3 == 0 { "Tarawih" } else { "I'tikaf" }),
            grid_size: 6,
            start: Position::new(0, 5),
            target: Position::new(5, 0),
            obstacles: vec![
                Position::new(2, 2),
                Position::new(3, 3),
                Position::new(1, 4),
                Position::new(i / 5, i / 4),
            ],
            available_blocks: if i < 20 {
                moves.clone()
            } else {
                let mut b = moves.clone();
                b.push(Block::Repeat2);
                b
            },
            max_blocks: if i < 20 { 12 } else { 8 },
            story: format!(
                "Day {}'s challenge is getting exciting! Dodge the obstacles and use your coding logic.",
                i
            ),
        });
    }

    // Days 26-40: larger grid, REPEAT_3
    let diagonal = [
        Position::new(1, 1),
        Position::new(2, 2),
        Position::new(3, 3),
        Position::new(4, 4),
        Position::new(5, 5),
        Position::new(0, 1),
        Position::new(1, 0),
    ];
    for i in 26..=40_usize {
        let keep_every = i % 3 + 1;
        levels.push(Level {
            id: i as u32,
            name: format!("Ramadan Day {}: Road to Eid", i),
            grid_size: 7,
            start: Position::new(0, 0),
            target: Position::new(6, 6),
            obstacles: diagonal.iter()
                .enumerate()
                .filter(|(idx, _)| idx % keep_every == 0)
                .map(|(_, p)| *p)
                .collect(),
            available_blocks: all.clone(),
            max_blocks: 10,
            story: "Ahmad has to save steps! Use REPEAT blocks for an efficient route.".to_string(),
        });
    }

    // Days 41-50: expert
    for i in 41..=50_i32 {
        let corner_a = Position::new(0, 0);
        let corner_b = Position::new(7, 7);
        levels.push(Level {
            id: i as u32,
            name: format!("Ramadan Day {}: Homecoming Prep", i),
            grid_size: 8,
            start: corner_b,
            target: corner_a,
            obstacles: (0..10_i32)
                .map(|idx| Position::new((idx * 2 + i) % 8, (idx * 3 + i) % 8))
                .filter(|p| *p != corner_a && *p != corner_b)
                .collect(),
            available_blocks: all.clone(),
            max_blocks: 7,
            story: "Expert level! Only a few blocks are available. Think Ahmad's steps through carefully."
                .to_string(),
        });
    }

    levels
}

// ══════════════════════════════════════════════════════════════
// Unit tests
// ══════════════════════════════════════════════════════════════
