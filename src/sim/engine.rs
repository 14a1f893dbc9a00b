/// Execution engine: walks the flattened program one move at a time.
///
/// ## States
///   Idle ──start──▶ Running{step, pos} ──▶ Success | Failed(reason)
///
/// Terminal states (Success / Failed) are left only through `start` (a new
/// attempt) or `reset`. The engine itself never schedules anything: the
/// session owns the step timer and calls `step()` once per tick.
///
/// ## Step order (first match wins)
///   1. candidate outside the grid   → Failed(Boundary), no commit
///   2. candidate on an obstacle     → Failed(Obstacle), no commit
///   3. commit candidate
///   When the stream is exhausted: on target → Success, else Failed(MissedTarget).

use crate::domain::block::Move;
use crate::domain::grid::Position;
use crate::domain::level::Level;

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum FailReason {
    Boundary,
    Obstacle,
    MissedTarget,
}

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum EngineState {
    Idle,
    /// `step` is the index of the next move to evaluate.
    Running { step: usize, pos: Position },
    Success,
    Failed(FailReason),
}

impl EngineState {
    pub fn is_running(self) -> bool {
        matches!(self, EngineState::Running { .. })
    }
}

/// Result of evaluating one step.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum Transition {
    Commit { step: usize, pos: Position },
    Succeed,
    Fail(FailReason),
}

/// Pure step evaluation: what happens when move `index` is applied at `pos`.
pub fn evaluate(moves: &[Move], index: usize, pos: Position, level: &Level) -> Transition {
    let Some(&mv) = moves.get(index) else {
        return if pos == level.target {
            Transition::Succeed
        } else {
            Transition::Fail(FailReason::MissedTarget)
        };
    };

    let candidate = pos.step(mv);
    if !level.contains(candidate) {
        Transition::Fail(FailReason::Boundary)
    } else if level.is_obstacle(candidate) {
        Transition::Fail(FailReason::Obstacle)
    } else {
        Transition::Commit { step: index, pos: candidate }
    }
}

pub struct Engine {
    state: EngineState,
    /// Flattened stream of the current attempt. Dropped on halt.
    moves: Vec<Move>,
    /// Last committed position (the level start before any commit).
    position: Position,
    /// Index of the last committed move, for highlighting.
    committed: Option<usize>,
}

impl Engine {
    pub fn new(start: Position) -> Self {
        Engine {
            state: EngineState::Idle,
            moves: vec![],
            position: start,
            committed: None,
        }
    }

    pub fn state(&self) -> EngineState {
        self.state
    }

    pub fn position(&self) -> Position {
        self.position
    }

    pub fn committed_step(&self) -> Option<usize> {
        self.committed
    }

    /// Begin a new attempt from `start`. Refused while already running.
    pub fn start(&mut self, moves: Vec<Move>, start: Position) -> bool {
        if self.state.is_running() {
            return false;
        }
        self.moves = moves;
        self.position = start;
        self.committed = None;
        self.state = EngineState::Running { step: 0, pos: start };
        true
    }

    /// Evaluate the next move. Returns None when not running.
    pub fn step(&mut self, level: &Level) -> Option<Transition> {
        let EngineState::Running { step, pos } = self.state else {
            return None;
        };
        let t = evaluate(&self.moves, step, pos, level);
        match t {
            Transition::Commit { step, pos } => {
                self.position = pos;
                self.committed = Some(step);
                self.state = EngineState::Running { step: step + 1, pos };
            }
            Transition::Succeed => self.halt(EngineState::Success),
            Transition::Fail(reason) => self.halt(EngineState::Failed(reason)),
        }
        Some(t)
    }

    /// Back to Idle at `start`, discarding any attempt.
    pub fn reset(&mut self, start: Position) {
        self.state = EngineState::Idle;
        self.moves.clear();
        self.position = start;
        self.committed = None;
    }

    fn halt(&mut self, terminal: EngineState) {
        self.state = terminal;
        self.moves.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::block::Block;
    use crate::domain::program::flatten;

    /// Run the engine to a terminal state, collecting committed positions.
    fn run_to_end(level: &Level, program: &[Block]) -> (EngineState, Vec<Position>) {
        let mut engine = Engine::new(level.start);
        assert!(engine.start(flatten(program), level.start));
        let mut commits = vec![];
        while let Some(t) = engine.step(level) {
            if let Transition::Commit { pos, .. } = t {
                commits.push(pos);
            }
        }
        (engine.state(), commits)
    }

    fn open_5x5() -> Level {
        Level::from_diagram(&[
            "S.T..",
            ".....",
            ".....",
            ".....",
            ".....",
        ])
    }

    #[test]
    fn two_rights_reach_target() {
        let lv = open_5x5();
        let (state, commits) = run_to_end(&lv, &[Block::MoveRight, Block::MoveRight]);
        assert_eq!(commits, vec![Position::new(1, 0), Position::new(2, 0)]);
        assert_eq!(state, EngineState::Success);
    }

    #[test]
    fn up_from_origin_hits_wall_without_moving() {
        let lv = open_5x5();
        let mut engine = Engine::new(lv.start);
        engine.start(flatten(&[Block::MoveUp]), lv.start);
        assert_eq!(engine.step(&lv), Some(Transition::Fail(FailReason::Boundary)));
        assert_eq!(engine.state(), EngineState::Failed(FailReason::Boundary));
        assert_eq!(engine.position(), Position::new(0, 0));
        assert_eq!(engine.committed_step(), None);
    }

    #[test]
    fn obstacle_blocks_step() {
        let lv = Level::from_diagram(&[
            "S#T..",
            ".....",
            ".....",
            ".....",
            ".....",
        ]);
        let (state, commits) = run_to_end(&lv, &[Block::MoveRight]);
        assert!(commits.is_empty());
        assert_eq!(state, EngineState::Failed(FailReason::Obstacle));
    }

    #[test]
    fn overshoot_is_missed_target_not_success() {
        let lv = open_5x5();
        let (state, commits) = run_to_end(&lv, &[Block::MoveRight, Block::MoveRight, Block::MoveRight]);
        assert_eq!(commits.len(), 3);
        assert_eq!(commits[2], Position::new(3, 0));
        assert_eq!(state, EngineState::Failed(FailReason::MissedTarget));
    }

    #[test]
    fn boundary_checked_before_obstacle() {
        // Obstacle list may carry off-grid coordinates; the wall still wins.
        let mut lv = open_5x5();
        lv.obstacles.push(Position::new(0, -1));
        let (state, _) = run_to_end(&lv, &[Block::MoveUp]);
        assert_eq!(state, EngineState::Failed(FailReason::Boundary));
    }

    #[test]
    fn halt_stops_remaining_moves() {
        let lv = open_5x5();
        let mut engine = Engine::new(lv.start);
        engine.start(flatten(&[Block::MoveLeft, Block::MoveRight, Block::MoveRight]), lv.start);
        assert_eq!(engine.step(&lv), Some(Transition::Fail(FailReason::Boundary)));
        // Terminal: further steps are refused and nothing moves.
        assert_eq!(engine.step(&lv), None);
        assert_eq!(engine.step(&lv), None);
        assert_eq!(engine.position(), lv.start);
        assert_eq!(engine.state(), EngineState::Failed(FailReason::Boundary));
    }

    #[test]
    fn empty_stream_checks_target_immediately() {
        let mut lv = open_5x5();
        let (state, _) = run_to_end(&lv, &[Block::Repeat2]);
        assert_eq!(state, EngineState::Failed(FailReason::MissedTarget));

        lv.target = lv.start;
        let (state, _) = run_to_end(&lv, &[Block::Repeat3]);
        assert_eq!(state, EngineState::Success);
    }

    #[test]
    fn never_commits_outside_grid_or_on_obstacle() {
        let lv = Level::from_diagram(&[
            "S..#",
            ".#..",
            "....",
            "..#T",
        ]);
        let programs: &[&[Block]] = &[
            &[Block::MoveRight, Block::Repeat3, Block::Repeat3],
            &[Block::MoveDown, Block::Repeat3, Block::MoveRight, Block::Repeat2, Block::Repeat2],
            &[Block::MoveDown, Block::MoveRight, Block::MoveUp],
            &[Block::MoveDown, Block::Repeat2, Block::MoveRight, Block::Repeat3, Block::MoveDown],
        ];
        for program in programs {
            let (state, commits) = run_to_end(&lv, program);
            assert!(matches!(state, EngineState::Success | EngineState::Failed(_)));
            for p in commits {
                assert!(lv.contains(p), "{:?} left the grid", p);
                assert!(!lv.is_obstacle(p), "{:?} is an obstacle", p);
            }
        }
    }

    #[test]
    fn start_refused_while_running_and_allowed_after_terminal() {
        let lv = open_5x5();
        let mut engine = Engine::new(lv.start);
        assert!(engine.start(vec![Move::Right, Move::Right], lv.start));
        assert!(!engine.start(vec![Move::Down], lv.start));
        engine.step(&lv);
        engine.step(&lv);
        engine.step(&lv);
        assert_eq!(engine.state(), EngineState::Success);
        assert!(engine.start(vec![Move::Down], lv.start));
        assert_eq!(engine.position(), lv.start);
    }

    #[test]
    fn reset_returns_to_idle_at_start() {
        let lv = open_5x5();
        let mut engine = Engine::new(lv.start);
        engine.start(vec![Move::Right, Move::Right], lv.start);
        engine.step(&lv);
        engine.reset(lv.start);
        assert_eq!(engine.state(), EngineState::Idle);
        assert_eq!(engine.position(), lv.start);
        assert_eq!(engine.step(&lv), None);
    }
}
