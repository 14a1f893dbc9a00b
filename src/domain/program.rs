/// Program buffer and flattener.
///
/// The buffer is the player's ordered block list for the current level,
/// bounded by the level's block limit. Whether an edit is allowed at all
/// (e.g. not while running) is decided by the session; the buffer only
/// enforces its own capacity and index range.

use super::block::{Block, Move};

#[derive(Clone, Debug, Default)]
pub struct Program {
    blocks: Vec<Block>,
    capacity: usize,
}

impl Program {
    pub fn with_capacity(capacity: usize) -> Self {
        Program { blocks: Vec::with_capacity(capacity), capacity }
    }

    /// Append a block. Returns false (and changes nothing) when full.
    pub fn push(&mut self, block: Block) -> bool {
        if self.is_full() {
            return false;
        }
        self.blocks.push(block);
        true
    }

    /// Remove the block at `index`, shifting later blocks left.
    pub fn remove(&mut self, index: usize) -> Option<Block> {
        if index < self.blocks.len() {
            Some(self.blocks.remove(index))
        } else {
            None
        }
    }

    /// Empty the buffer and adopt a new capacity (used on level entry).
    pub fn reset(&mut self, capacity: usize) {
        self.blocks.clear();
        self.capacity = capacity;
    }

    pub fn blocks(&self) -> &[Block] {
        &self.blocks
    }

    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn is_full(&self) -> bool {
        self.blocks.len() >= self.capacity
    }

    /// Token list for the hint service.
    pub fn tokens(&self) -> Vec<String> {
        self.blocks.iter().map(|b| b.token().to_string()).collect()
    }
}

/// Expand repeat markers into concrete moves.
///
/// A repeat marker copies the last move already in the *output*, not the
/// previous input token, so consecutive repeats compound:
/// `[Right, Repeat2, Repeat2]` → four Rights. A repeat with nothing emitted
/// yet contributes nothing.
pub fn flatten(program: &[Block]) -> Vec<Move> {
    let mut out: Vec<Move> = Vec::with_capacity(program.len() * 3);
    for &block in program {
        match block.as_move() {
            Some(mv) => out.push(mv),
            None => {
                if let Some(&last) = out.last() {
                    for _ in 0..block.extra_copies() {
                        out.push(last);
                    }
                }
            }
        }
    }
    out
}

/// For each move `flatten` emits, the index of the program block that
/// emitted it. Copies made by a repeat belong to the repeat block.
pub fn step_sources(program: &[Block]) -> Vec<usize> {
    let mut out = Vec::with_capacity(program.len() * 3);
    for (idx, &block) in program.iter().enumerate() {
        if block.as_move().is_some() {
            out.push(idx);
        } else if !out.is_empty() {
            out.extend(std::iter::repeat(idx).take(block.extra_copies()));
        }
    }
    out
}
