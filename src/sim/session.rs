/// Session: the game controller the front end talks to.
///
/// Owns the catalog, the current level index, the program buffer, the
/// execution engine and the one step timer. The front end only dispatches
/// commands (`add_block`, `remove_block`, `execute`, `reset_level`,
/// `advance_level`, `request_hint`), calls `tick(now)` every frame, and
/// renders `snapshot()`.
///
/// ## Phases
///   Editing ──execute──▶ Executing ──▶ Succeeded | Failed
///      ▲                                  │
///      └──────── reset / advance ─────────┘
///
/// The phase is derived from the engine state, so exactly one is active.
///
/// ## Timer discipline
///   - At most one pending step (the timer holds a single slot).
///   - Every attempt gets a new ticket; reset, level change and teardown
///     cancel the timer *before* touching any other state.
///   - A fired step whose ticket is not the current attempt is dropped.

use std::sync::Arc;
use std::time::Instant;

use crate::domain::block::Block;
use crate::domain::grid::Position;
use crate::domain::level::Level;
use crate::domain::program::{flatten, Program};
use crate::hint::{HintDesk, HintRequest, HintSource};
use super::catalog::builtin_levels;
use super::engine::{Engine, EngineState, FailReason, Transition};
use super::event::GameEvent;
use super::timer::StepTimer;

/// Lives on every level entry. Shown in the HUD; nothing spends them.
pub const STARTING_LIVES: u32 = 3;

pub const MSG_HIT_WALL: &str = "Ahmad bumped into the wall!";
pub const MSG_HIT_OBSTACLE: &str = "Ahmad got stuck on an obstacle!";
pub const MSG_MISSED: &str = "Not there yet. Try again!";
pub const MSG_SUCCESS: &str = "Alhamdulillah! Ahmad reached the goal!";

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum Phase {
    Editing,
    Executing,
    Succeeded,
    Failed(FailReason),
}

/// Read-only view handed to the renderer after every change.
pub struct Snapshot<'a> {
    pub level: &'a Level,
    pub level_index: usize,
    pub level_count: usize,
    pub program: &'a [Block],
    pub max_blocks: usize,
    pub phase: Phase,
    pub position: Position,
    /// Index into the *flattened* stream of the last committed move.
    pub step_index: Option<usize>,
    pub step_count: usize,
    pub message: &'a str,
    pub lives: u32,
    pub hint: Option<&'a str>,
    pub hint_loading: bool,
    pub can_edit: bool,
    pub can_advance: bool,
    pub briefing: bool,
}

impl Snapshot<'_> {
    pub fn succeeded(&self) -> bool {
        self.phase == Phase::Succeeded
    }

    /// Succeeded on the last level: nothing left to advance to.
    pub fn catalog_complete(&self) -> bool {
        self.succeeded() && !self.can_advance
    }
}

pub struct Session {
    catalog: Vec<Level>,
    level_index: usize,
    lives: u32,
    program: Program,
    engine: Engine,
    timer: StepTimer,
    /// Ticket of the current attempt; bumped whenever an attempt is abandoned.
    attempt: u64,
    /// Length of the flattened stream of the current/last attempt.
    step_count: usize,
    message: String,
    hints: HintDesk,
    hint: Option<String>,
    briefing: bool,
    last_diagnostic: Option<String>,
    events: Vec<GameEvent>,
}

impl Session {
    /// Start at level 0. An empty catalog is replaced by the built-in one.
    pub fn new(catalog: Vec<Level>, hint_source: Arc<dyn HintSource>) -> Self {
        let catalog = if catalog.is_empty() { builtin_levels() } else { catalog };
        let first = &catalog[0];
        let engine = Engine::new(first.start);
        let program = Program::with_capacity(first.max_blocks);
        let message = first.story.clone();
        Session {
            catalog,
            level_index: 0,
            lives: STARTING_LIVES,
            program,
            engine,
            timer: StepTimer::default(),
            attempt: 0,
            step_count: 0,
            message,
            hints: HintDesk::new(hint_source),
            hint: None,
            briefing: true,
            last_diagnostic: None,
            events: vec![],
        }
    }

    // ── Queries ──

    pub fn level(&self) -> &Level {
        &self.catalog[self.level_index]
    }

    pub fn phase(&self) -> Phase {
        match self.engine.state() {
            EngineState::Idle => Phase::Editing,
            EngineState::Running { .. } => Phase::Executing,
            EngineState::Success => Phase::Succeeded,
            EngineState::Failed(reason) => Phase::Failed(reason),
        }
    }

    pub fn can_edit(&self) -> bool {
        !self.engine.state().is_running()
    }

    pub fn can_advance(&self) -> bool {
        self.engine.state() == EngineState::Success && self.level_index + 1 < self.catalog.len()
    }

    /// Last swallowed hint-service error, for printing after shutdown.
    pub fn last_diagnostic(&self) -> Option<&str> {
        self.last_diagnostic.as_deref()
    }

    pub fn snapshot(&self) -> Snapshot<'_> {
        let level = self.level();
        Snapshot {
            level,
            level_index: self.level_index,
            level_count: self.catalog.len(),
            program: self.program.blocks(),
            max_blocks: self.program.capacity(),
            phase: self.phase(),
            position: self.engine.position(),
            step_index: self.engine.committed_step(),
            step_count: self.step_count,
            message: &self.message,
            lives: self.lives,
            hint: self.hint.as_deref(),
            hint_loading: self.hints.is_loading(),
            can_edit: self.can_edit(),
            can_advance: self.can_advance(),
            briefing: self.briefing,
        }
    }

    /// Events produced since the last call.
    pub fn drain_events(&mut self) -> Vec<GameEvent> {
        std::mem::take(&mut self.events)
    }

    // ── Program editing ──

    /// Append a palette block. No-op while running, when full, or when the
    /// block is not on this level's palette.
    pub fn add_block(&mut self, block: Block) -> bool {
        if !self.can_edit() || !self.level().offers(block) {
            return false;
        }
        let added = self.program.push(block);
        if added {
            self.events.push(GameEvent::BlockAdded);
        }
        added
    }

    /// Remove the block at `index`. No-op while running or out of range.
    pub fn remove_block(&mut self, index: usize) -> bool {
        if !self.can_edit() {
            return false;
        }
        let removed = self.program.remove(index).is_some();
        if removed {
            self.events.push(GameEvent::BlockRemoved);
        }
        removed
    }

    // ── Execution ──

    /// Start a new attempt from the level start. The first move is evaluated
    /// right away; the rest follow at the timer's pace.
    pub fn execute(&mut self, now: Instant) -> bool {
        if self.program.is_empty() || self.engine.state().is_running() {
            return false;
        }
        self.timer.cancel();
        debug_assert!(!self.timer.is_pending());
        self.attempt += 1;

        let moves = flatten(self.program.blocks());
        self.step_count = moves.len();
        let start = self.level().start;
        if !self.engine.start(moves, start) {
            return false;
        }
        self.briefing = false;
        self.events.push(GameEvent::RunStarted);
        self.advance(now);
        true
    }

    /// Drive the session: fire a due step and collect a finished hint.
    /// At most one step is evaluated per call.
    pub fn tick(&mut self, now: Instant) {
        if let Some(ticket) = self.timer.fire(now) {
            if ticket == self.attempt && self.engine.state().is_running() {
                self.advance(now);
            }
        }

        if let Some(reply) = self.hints.poll() {
            if let Some(err) = reply.error {
                self.last_diagnostic = Some(err);
            }
            self.hint = Some(reply.text);
            self.events.push(GameEvent::HintArrived);
        }
    }

    fn advance(&mut self, now: Instant) {
        let level = &self.catalog[self.level_index];
        let Some(transition) = self.engine.step(level) else {
            return;
        };
        match transition {
            Transition::Commit { step, pos } => {
                self.events.push(GameEvent::StepCommitted { step, pos });
                self.timer.schedule(now, self.attempt);
            }
            Transition::Succeed => {
                self.message = MSG_SUCCESS.to_string();
                self.events.push(GameEvent::ReachedTarget);
            }
            Transition::Fail(reason) => {
                let (msg, event) = match reason {
                    FailReason::Boundary => (MSG_HIT_WALL, GameEvent::HitWall),
                    FailReason::Obstacle => (MSG_HIT_OBSTACLE, GameEvent::HitObstacle),
                    FailReason::MissedTarget => (MSG_MISSED, GameEvent::MissedTarget),
                };
                self.message = msg.to_string();
                self.events.push(event);
            }
        }
    }

    // ── Level flow ──

    /// Clear the program and return to editing at the level start,
    /// whatever the previous outcome. Cancels an in-flight step first.
    pub fn reset_level(&mut self) {
        self.abandon_attempt();
        let level = &self.catalog[self.level_index];
        self.program.reset(level.max_blocks);
        self.engine.reset(level.start);
        self.step_count = 0;
        self.message = level.story.clone();
        self.hint = None;
    }

    /// Move to the next level after a success. Returns false if the current
    /// attempt has not succeeded or this is the last level.
    pub fn advance_level(&mut self) -> bool {
        if !self.can_advance() {
            return false;
        }
        self.enter_level(self.level_index + 1);
        true
    }

    fn enter_level(&mut self, index: usize) {
        self.abandon_attempt();
        self.level_index = index;
        self.lives = STARTING_LIVES;
        let level = &self.catalog[index];
        self.program.reset(level.max_blocks);
        self.engine.reset(level.start);
        self.step_count = 0;
        self.message = level.story.clone();
        self.hint = None;
        self.briefing = true;
        self.events.push(GameEvent::LevelStarted { index });
    }

    /// Cancel the pending step and invalidate its ticket. Also forgets an
    /// outstanding hint request so a late reply cannot land on a new attempt.
    fn abandon_attempt(&mut self) {
        self.timer.cancel();
        self.attempt += 1;
        self.hints.abandon();
    }

    /// Stop everything before the session goes away.
    pub fn teardown(&mut self) {
        self.abandon_attempt();
    }

    // ── Hints & overlays ──

    /// Ask for a hint. Refused while running or while one is loading.
    pub fn request_hint(&mut self) -> bool {
        if self.engine.state().is_running() || self.hints.is_loading() {
            return false;
        }
        let level = self.level();
        let req = HintRequest {
            level_name: level.name.clone(),
            story: level.story.clone(),
            program: self.program.tokens(),
        };
        self.hints.submit(req)
    }

    pub fn dismiss_hint(&mut self) {
        self.hint = None;
    }

    pub fn open_briefing(&mut self) {
        self.briefing = true;
    }

    pub fn close_briefing(&mut self) {
        self.briefing = false;
    }
}

impl Drop for Session {
    fn drop(&mut self) {
        self.teardown();
    }
}

// ══════════════════════════════════════════════════════════════
// Unit tests
// ══════════════════════════════════════════════════════════════

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hint::{HintError, OfflineHints, FALLBACK_ERROR};
    use crate::sim::timer::STEP_DELAY;
    use std::time::Duration;
    use Block::*;

    struct Canned(&'static str);

    impl HintSource for Canned {
        fn fetch(&self, req: &HintRequest) -> Result<String, HintError> {
            Ok(format!("{} ({} blocks)", self.0, req.program.len()))
        }
    }

    fn two_level_catalog() -> Vec<Level> {
        let mut first = Level::from_diagram(&[
            "S.T..",
            ".....",
            ".....",
            ".....",
            ".....",
        ]);
        first.name = "First".into();
        first.story = "Go right twice.".into();
        first.max_blocks = 3;
        let mut second = Level::from_diagram(&[
            "S#...",
            ".....",
            "T....",
            ".....",
            ".....",
        ]);
        second.id = 2;
        second.name = "Second".into();
        second.story = "Go down.".into();
        second.available_blocks = vec![MoveDown, MoveRight];
        vec![first, second]
    }

    fn session() -> Session {
        Session::new(two_level_catalog(), Arc::new(OfflineHints))
    }

    fn after(t0: Instant, steps: u32) -> Instant {
        t0 + STEP_DELAY * steps
    }

    fn wait_for_hint(s: &mut Session) {
        let deadline = Instant::now() + Duration::from_secs(5);
        while s.snapshot().hint.is_none() {
            assert!(Instant::now() < deadline, "hint never arrived");
            std::thread::sleep(Duration::from_millis(2));
            s.tick(Instant::now());
        }
    }

    #[test]
    fn starts_editing_level_zero() {
        let s = session();
        let snap = s.snapshot();
        assert_eq!(snap.level_index, 0);
        assert_eq!(snap.lives, STARTING_LIVES);
        assert_eq!(snap.phase, Phase::Editing);
        assert_eq!(snap.position, Position::new(0, 0));
        assert_eq!(snap.message, "Go right twice.");
        assert!(snap.briefing);
        assert!(snap.can_edit);
        assert!(!snap.can_advance);
    }

    #[test]
    fn paced_run_to_success() {
        let mut s = session();
        s.add_block(MoveRight);
        s.add_block(MoveRight);
        let t0 = Instant::now();
        assert!(s.execute(t0));

        // First move commits immediately.
        assert_eq!(s.snapshot().position, Position::new(1, 0));
        assert_eq!(s.snapshot().step_index, Some(0));
        assert_eq!(s.phase(), Phase::Executing);

        s.tick(t0 + Duration::from_millis(399));
        assert_eq!(s.snapshot().position, Position::new(1, 0));

        s.tick(after(t0, 1));
        assert_eq!(s.snapshot().position, Position::new(2, 0));
        assert_eq!(s.snapshot().step_index, Some(1));
        assert_eq!(s.phase(), Phase::Executing);

        // Exhaustion is checked one delay after the last commit.
        s.tick(after(t0, 2));
        let snap = s.snapshot();
        assert_eq!(snap.phase, Phase::Succeeded);
        assert!(snap.succeeded());
        assert_eq!(snap.message, MSG_SUCCESS);
        assert!(snap.can_advance);

        let events = s.drain_events();
        assert_eq!(
            events,
            vec![
                GameEvent::BlockAdded,
                GameEvent::BlockAdded,
                GameEvent::RunStarted,
                GameEvent::StepCommitted { step: 0, pos: Position::new(1, 0) },
                GameEvent::StepCommitted { step: 1, pos: Position::new(2, 0) },
                GameEvent::ReachedTarget,
            ],
        );
    }

    #[test]
    fn one_step_per_tick_even_when_late() {
        let mut s = session();
        s.add_block(MoveRight);
        s.add_block(Repeat2);
        let t0 = Instant::now();
        s.execute(t0);
        let late = t0 + Duration::from_secs(60);
        s.tick(late);
        assert_eq!(s.snapshot().position, Position::new(2, 0));
        assert_eq!(s.phase(), Phase::Executing);
        s.tick(late);
        assert_eq!(s.phase(), Phase::Executing);
        s.tick(late + STEP_DELAY);
        assert_eq!(s.phase(), Phase::Succeeded);
    }

    #[test]
    fn wall_fails_immediately_without_moving() {
        let mut s = session();
        s.add_block(MoveUp);
        let t0 = Instant::now();
        s.execute(t0);
        let snap = s.snapshot();
        assert_eq!(snap.phase, Phase::Failed(FailReason::Boundary));
        assert_eq!(snap.position, Position::new(0, 0));
        assert_eq!(snap.message, MSG_HIT_WALL);
        assert!(matches!(snap.phase, Phase::Failed(_)));
    }

    #[test]
    fn obstacle_and_missed_target_messages() {
        let mut cat = two_level_catalog();
        cat[0].obstacles.push(Position::new(1, 0));
        let mut s = Session::new(cat, Arc::new(OfflineHints));
        s.add_block(MoveRight);
        s.execute(Instant::now());
        assert_eq!(s.phase(), Phase::Failed(FailReason::Obstacle));
        assert_eq!(s.snapshot().message, MSG_HIT_OBSTACLE);

        let mut s = session();
        s.add_block(MoveRight);
        s.add_block(Repeat3);
        let t0 = Instant::now();
        s.execute(t0);
        for n in 1..=3 {
            s.tick(after(t0, n));
        }
        assert_eq!(s.snapshot().position, Position::new(3, 0));
        assert_eq!(s.phase(), Phase::Failed(FailReason::MissedTarget));
        assert_eq!(s.snapshot().message, MSG_MISSED);
    }

    #[test]
    fn nothing_runs_after_terminal_state() {
        let mut s = session();
        s.add_block(MoveDown);
        let t0 = Instant::now();
        s.execute(t0);
        s.tick(after(t0, 1));
        assert_eq!(s.phase(), Phase::Failed(FailReason::MissedTarget));
        s.drain_events();
        for n in 2..10 {
            s.tick(after(t0, n));
        }
        assert!(s.drain_events().is_empty());
        assert_eq!(s.snapshot().position, Position::new(0, 1));
    }

    #[test]
    fn edits_refused_while_running() {
        let mut s = session();
        s.add_block(MoveRight);
        s.add_block(MoveRight);
        s.execute(Instant::now());
        assert_eq!(s.phase(), Phase::Executing);
        assert!(!s.add_block(MoveDown));
        assert!(!s.remove_block(0));
        assert_eq!(s.snapshot().program, &[MoveRight, MoveRight]);
        assert!(!s.snapshot().can_edit);
        assert!(!s.execute(Instant::now()));
    }

    #[test]
    fn edits_allowed_after_terminal_state() {
        let mut s = session();
        s.add_block(MoveUp);
        s.execute(Instant::now());
        assert!(matches!(s.snapshot().phase, Phase::Failed(_)));
        assert!(s.remove_block(0));
        assert!(s.add_block(MoveRight));
        // Outcome stays until the next attempt.
        assert!(matches!(s.snapshot().phase, Phase::Failed(_)));
    }

    #[test]
    fn program_capped_at_max_blocks() {
        let mut s = session();
        for _ in 0..10 {
            s.add_block(MoveDown);
        }
        assert_eq!(s.snapshot().program.len(), 3);
        assert_eq!(s.snapshot().max_blocks, 3);
    }

    #[test]
    fn block_outside_palette_refused() {
        let mut s = session();
        s.add_block(MoveRight);
        s.add_block(MoveRight);
        let t0 = Instant::now();
        s.execute(t0);
        s.tick(after(t0, 1));
        s.tick(after(t0, 2));
        assert!(s.advance_level());
        assert!(!s.add_block(MoveUp));
        assert!(s.add_block(MoveDown));
    }

    #[test]
    fn empty_program_does_not_execute() {
        let mut s = session();
        assert!(!s.execute(Instant::now()));
        assert_eq!(s.phase(), Phase::Editing);
    }

    #[test]
    fn leading_repeat_only_goes_straight_to_target_check() {
        let mut s = session();
        s.add_block(Repeat2);
        assert!(s.execute(Instant::now()));
        assert_eq!(s.phase(), Phase::Failed(FailReason::MissedTarget));
        assert_eq!(s.snapshot().step_count, 0);
    }

    #[test]
    fn reset_mid_run_cancels_pending_step() {
        let mut s = session();
        s.add_block(MoveRight);
        s.add_block(MoveRight);
        let t0 = Instant::now();
        s.execute(t0);
        s.reset_level();
        s.drain_events();

        for n in 1..5 {
            s.tick(after(t0, n));
        }
        let snap = s.snapshot();
        assert_eq!(snap.phase, Phase::Editing);
        assert_eq!(snap.position, Position::new(0, 0));
        assert!(snap.program.is_empty());
        assert_eq!(snap.message, "Go right twice.");
        assert_eq!(snap.step_index, None);
        assert!(s.drain_events().is_empty());
    }

    #[test]
    fn new_attempt_ignores_old_schedule() {
        let mut s = session();
        s.add_block(MoveRight);
        let t0 = Instant::now();
        s.execute(t0);
        s.reset_level();
        s.add_block(MoveRight);
        s.add_block(MoveRight);
        let t1 = t0 + Duration::from_millis(300);
        s.execute(t1);
        // Due time of the abandoned attempt: nothing fires yet.
        s.tick(after(t0, 1));
        assert_eq!(s.snapshot().position, Position::new(1, 0));
        s.tick(after(t1, 1));
        assert_eq!(s.snapshot().position, Position::new(2, 0));
    }

    #[test]
    fn retry_after_failure_restarts_from_start() {
        let mut s = session();
        s.add_block(MoveDown);
        let t0 = Instant::now();
        s.execute(t0);
        s.tick(after(t0, 1));
        assert!(matches!(s.snapshot().phase, Phase::Failed(_)));
        assert_eq!(s.snapshot().position, Position::new(0, 1));

        s.remove_block(0);
        s.add_block(MoveRight);
        s.add_block(Repeat2);
        let t1 = after(t0, 2);
        assert!(s.execute(t1));
        assert_eq!(s.snapshot().position, Position::new(1, 0));
        s.tick(after(t1, 1));
        s.tick(after(t1, 2));
        assert!(s.snapshot().succeeded());
    }

    #[test]
    fn advance_only_after_success_and_resets_state() {
        let mut s = session();
        assert!(!s.advance_level());

        s.add_block(MoveRight);
        s.add_block(MoveRight);
        let t0 = Instant::now();
        s.execute(t0);
        s.tick(after(t0, 1));
        s.tick(after(t0, 2));
        s.close_briefing();
        assert!(s.advance_level());

        let snap = s.snapshot();
        assert_eq!(snap.level_index, 1);
        assert_eq!(snap.level.name, "Second");
        assert_eq!(snap.phase, Phase::Editing);
        assert!(snap.program.is_empty());
        assert_eq!(snap.lives, STARTING_LIVES);
        assert_eq!(snap.message, "Go down.");
        assert_eq!(snap.position, Position::new(0, 0));
        assert!(snap.briefing);
        assert!(s.drain_events().contains(&GameEvent::LevelStarted { index: 1 }));
    }

    #[test]
    fn last_level_cannot_advance() {
        let mut s = session();
        s.add_block(MoveRight);
        s.add_block(MoveRight);
        let t0 = Instant::now();
        s.execute(t0);
        s.tick(after(t0, 1));
        s.tick(after(t0, 2));
        s.advance_level();

        s.add_block(MoveDown);
        s.add_block(MoveDown);
        let t1 = after(t0, 3);
        s.execute(t1);
        s.tick(after(t1, 1));
        s.tick(after(t1, 2));
        let snap = s.snapshot();
        assert!(snap.succeeded());
        assert!(!snap.can_advance);
        assert!(snap.catalog_complete());
        assert!(!s.advance_level());
        assert_eq!(s.snapshot().level_index, 1);
    }

    #[test]
    fn failure_does_not_cost_lives() {
        let mut s = session();
        for _ in 0..3 {
            s.reset_level();
            s.add_block(MoveUp);
            s.execute(Instant::now());
            assert!(matches!(s.snapshot().phase, Phase::Failed(_)));
        }
        assert_eq!(s.snapshot().lives, STARTING_LIVES);
    }

    #[test]
    fn teardown_cancels_pending_step() {
        let mut s = session();
        s.add_block(MoveRight);
        s.add_block(MoveRight);
        let t0 = Instant::now();
        s.execute(t0);
        s.teardown();
        s.tick(after(t0, 1));
        assert_eq!(s.snapshot().position, Position::new(1, 0));
    }

    /// Blocks in `fetch` until the test opens the gate.
    struct Gated {
        gate: std::sync::Mutex<std::sync::mpsc::Receiver<()>>,
        calls: std::sync::atomic::AtomicUsize,
    }

    impl HintSource for Gated {
        fn fetch(&self, _req: &HintRequest) -> Result<String, HintError> {
            self.calls.fetch_add(1, std::sync::atomic::Ordering::SeqCst);
            if let Ok(rx) = self.gate.lock() {
                let _ = rx.recv();
            }
            Ok("too late".to_string())
        }
    }

    #[test]
    fn dropping_mid_run_releases_hint_source() {
        let (open, gate) = std::sync::mpsc::channel();
        let source = Arc::new(Gated {
            gate: std::sync::Mutex::new(gate),
            calls: Default::default(),
        });
        let mut s = Session::new(two_level_catalog(), source.clone());
        assert!(s.request_hint());
        s.add_block(MoveRight);
        s.add_block(MoveRight);
        s.execute(Instant::now());
        assert_eq!(s.phase(), Phase::Executing);

        drop(s);
        // Only the worker still holds the source; it must not wait on us.
        open.send(()).unwrap();
        let deadline = Instant::now() + Duration::from_secs(5);
        while Arc::strong_count(&source) > 1 {
            assert!(Instant::now() < deadline, "hint worker never finished");
            std::thread::sleep(Duration::from_millis(2));
        }
        assert_eq!(source.calls.load(std::sync::atomic::Ordering::SeqCst), 1);
    }

    #[test]
    fn hint_round_trip_and_loading_guard() {
        let mut s = Session::new(two_level_catalog(), Arc::new(Canned("Count the squares")));
        s.add_block(MoveRight);
        assert!(s.request_hint());
        assert!(s.snapshot().hint_loading);
        assert!(!s.request_hint());
        wait_for_hint(&mut s);
        assert_eq!(s.snapshot().hint, Some("Count the squares (1 blocks)"));
        assert!(!s.snapshot().hint_loading);
        assert_eq!(s.last_diagnostic(), None);
        s.dismiss_hint();
        assert_eq!(s.snapshot().hint, None);
    }

    #[test]
    fn hint_failure_shows_fallback_and_keeps_diagnostic() {
        let mut s = session();
        assert!(s.request_hint());
        wait_for_hint(&mut s);
        assert_eq!(s.snapshot().hint, Some(FALLBACK_ERROR));
        assert!(s.last_diagnostic().is_some());
    }

    #[test]
    fn hint_refused_while_running() {
        let mut s = session();
        s.add_block(MoveRight);
        s.add_block(MoveRight);
        s.execute(Instant::now());
        assert!(!s.request_hint());
    }

    #[test]
    fn reset_drops_outstanding_hint() {
        let mut s = Session::new(two_level_catalog(), Arc::new(Canned("late")));
        s.request_hint();
        s.reset_level();
        assert!(!s.snapshot().hint_loading);
        std::thread::sleep(Duration::from_millis(20));
        s.tick(Instant::now());
        assert_eq!(s.snapshot().hint, None);
    }

    #[test]
    fn empty_catalog_uses_builtin() {
        let s = Session::new(vec![], Arc::new(OfflineHints));
        assert_eq!(s.snapshot().level_count, 50);
    }
}
