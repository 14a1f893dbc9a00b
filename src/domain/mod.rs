pub mod block;
pub mod grid;
pub mod level;
pub mod program;
