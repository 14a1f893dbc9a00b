/// Events emitted by session operations.
/// The presentation layer consumes these for sound.

use crate::domain::grid::Position;

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum GameEvent {
    BlockAdded,
    BlockRemoved,
    RunStarted,
    StepCommitted { step: usize, pos: Position },
    HitWall,
    HitObstacle,
    MissedTarget,
    ReachedTarget,
    LevelStarted { index: usize },
    HintArrived,
}
