use std::fmt;

use crate::combat::Combat;
use crate::logger;
use crate::navigator::Navigator;
use crate::platform::Cue;
use crate::session::Session;
use crate::timing;
use crate::types::{Position, Snapshot};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunePhase {
    Search,
    Move,
    Interact,
    Solve,
}

impl fmt::Display for RunePhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            RunePhase::Search => "SEARCH",
            RunePhase::Move => "MOVE",
            RunePhase::Interact => "INTERACT",
            RunePhase::Solve => "SOLVE",
        })
    }
}

/// What one handler step reports to the strategy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RuneStatus {
    Running,
    /// Convergence just completed; the interact press comes next tick.
    Arrived,
    Success,
    Failed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SolveProgress {
    Pending,
    Solved,
    Failed,
}

/// Resolves the puzzle shown after interacting with a rune.
pub trait PuzzleSolver: Send {
    fn begin(&mut self, now: f64);
    fn poll(&mut self, snapshot: &Snapshot, now: f64) -> SolveProgress;
}

/// Waits for the rune to leave the screen, whether the interact press or the
/// operator cleared it. Solved once it has stayed gone for `solved_after`;
/// the handler's timeout bounds the wait.
pub struct RuneVanish {
    solved_after: f64,
    missing_since: Option<f64>,
}

impl RuneVanish {
    pub fn new(solved_after: f64) -> Self {
        Self { solved_after, missing_since: None }
    }
}

impl PuzzleSolver for RuneVanish {
    fn begin(&mut self, _now: f64) {
        self.missing_since = None;
    }

    fn poll(&mut self, snapshot: &Snapshot, now: f64) -> SolveProgress {
        if snapshot.rune().is_some() {
            self.missing_since = None;
            return SolveProgress::Pending;
        }
        let since = *self.missing_since.get_or_insert(now);
        if now - since >= self.solved_after {
            SolveProgress::Solved
        } else {
            SolveProgress::Pending
        }
    }
}

/// Waits a fixed grace period and reports success.
pub struct GracePeriod {
    grace: f64,
    started: f64,
}

impl GracePeriod {
    pub fn new(grace: f64) -> Self {
        Self { grace, started: 0.0 }
    }
}

impl PuzzleSolver for GracePeriod {
    fn begin(&mut self, now: f64) {
        self.started = now;
    }

    fn poll(&mut self, _snapshot: &Snapshot, now: f64) -> SolveProgress {
        if now - self.started >= self.grace {
            SolveProgress::Solved
        } else {
            SolveProgress::Pending
        }
    }
}

/// Interrupt handler: SEARCH -> MOVE -> INTERACT -> SOLVE -> finished.
///
/// The target is the rune's lower edge, compared against the player's feet.
pub struct RuneHandler {
    session: Session,
    nav: Navigator,
    combat: Combat,
    solver: Box<dyn PuzzleSolver>,
    phase: RunePhase,
    target: Option<Position>,
    started: f64,
    last_seen: f64,
    scan_after: f64,
}

impl RuneHandler {
    pub fn new(session: Session, nav: Navigator, combat: Combat) -> Self {
        let solver = Box::new(RuneVanish::new(session.tuning.rune.solved_after));
        Self::with_solver(session, nav, combat, solver)
    }

    pub fn with_solver(
        session: Session,
        nav: Navigator,
        combat: Combat,
        solver: Box<dyn PuzzleSolver>,
    ) -> Self {
        Self {
            session,
            nav,
            combat,
            solver,
            phase: RunePhase::Search,
            target: None,
            started: 0.0,
            last_seen: 0.0,
            scan_after: 0.0,
        }
    }

    pub fn phase(&self) -> RunePhase {
        self.phase
    }

    pub fn target(&self) -> Option<Position> {
        self.target
    }

    pub fn is_active(&self) -> bool {
        self.phase != RunePhase::Search
    }

    /// Start a rune context if one is visible. True while a context is active.
    pub fn check_and_activate(&mut self, snap: &Snapshot) -> bool {
        if self.is_active() {
            return true;
        }
        let now = self.session.now();
        if now < self.scan_after {
            return false;
        }
        let Some(rune) = snap.rune() else {
            self.scan_after = now + timing::between(self.session.tuning.rune.rescan);
            return false;
        };

        let target = Position::new(rune.x, rune.y2);
        logger::info_p("rune", &format!("rune at ({}, {}), moving in", target.x, target.y));
        self.combat.release_attack();
        self.nav.stop();
        self.target = Some(target);
        self.phase = RunePhase::Move;
        self.started = now;
        self.last_seen = now;
        true
    }

    pub fn step(&mut self, snap: &Snapshot) -> RuneStatus {
        let Some(target) = self.target.filter(|_| self.is_active()) else {
            return RuneStatus::Failed;
        };
        let rune = self.session.tuning.rune.clone();
        let now = self.session.now();

        if now - self.started > rune.timeout {
            logger::warn_p("rune", &format!("timed out in {}", self.phase));
            self.nav.stop();
            return self.finish(RuneStatus::Failed);
        }

        match self.phase {
            RunePhase::Search => RuneStatus::Failed,
            RunePhase::Move => {
                let target = match snap.rune() {
                    Some(d) => {
                        self.last_seen = now;
                        let seen = Position::new(d.x, d.y2);
                        self.target = Some(seen);
                        seen
                    }
                    None if now - self.last_seen > rune.vanish_grace => {
                        logger::warn_p("rune", "rune vanished");
                        self.nav.stop();
                        return self.finish(RuneStatus::Failed);
                    }
                    None => target,
                };
                let Some(pos) = snap.position else { return RuneStatus::Running };
                let feet = snap.player().map_or(pos.y + rune.feet_offset, |d| d.y2);

                if (pos.x - target.x).abs() > rune.tolerance_x {
                    self.nav.move_horizontal(pos.x, target.x);
                    return RuneStatus::Running;
                }
                self.nav.release_horizontal();
                if (feet - target.y).abs() <= rune.tolerance_y {
                    self.nav.stop();
                    logger::info_p("rune", "arrived");
                    self.session.hw.alert(Cue::RuneArrived);
                    self.phase = RunePhase::Interact;
                    RuneStatus::Arrived
                } else {
                    self.nav.move_vertical(feet, target.y);
                    RuneStatus::Running
                }
            }
            RunePhase::Interact => {
                match self.session.jobs.key("interact") {
                    Some(key) => self.session.press(&key, 0.1),
                    None => logger::warn_p("rune", "no interact key bound"),
                }
                self.session.wait(rune.settle);
                self.solver.begin(self.session.now());
                self.phase = RunePhase::Solve;
                RuneStatus::Running
            }
            RunePhase::Solve => match self.solver.poll(snap, now) {
                SolveProgress::Pending => RuneStatus::Running,
                SolveProgress::Solved => {
                    self.session.hw.alert(Cue::RuneSolved);
                    self.finish(RuneStatus::Success)
                }
                SolveProgress::Failed => self.finish(RuneStatus::Failed),
            },
        }
    }

    /// Close the context and hold off scanning for the post-finish cooldown.
    pub fn finish(&mut self, status: RuneStatus) -> RuneStatus {
        logger::info_p("rune", &format!("finished: {:?}", status));
        self.phase = RunePhase::Search;
        self.target = None;
        self.scan_after = self.session.now() + self.session.tuning.rune.cooldown;
        status
    }

    /// Drop any context without a cooldown.
    pub fn reset(&mut self) {
        self.phase = RunePhase::Search;
        self.target = None;
        self.scan_after = 0.0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::job::{JobConfig, Jobs};
    use crate::platform::stub::{Call, Sim};
    use crate::settings::Tuning;
    use crate::timing::Clock;

    fn rig(start: Position) -> (Sim, RuneHandler) {
        let mut job = JobConfig::default();
        job.keys.insert("attack".into(), "a".into());
        job.keys.insert("interact".into(), "space".into());
        let sim = Sim::new(Jobs::single(job), Tuning::default(), start);
        let nav = Navigator::new(sim.session.clone());
        let combat = Combat::new(sim.session.clone());
        let handler = RuneHandler::new(sim.session.clone(), nav, combat);
        (sim, handler)
    }

    #[test]
    fn phases_run_in_order_to_success() {
        let (sim, mut rune) = rig(Position::new(40, 50));
        sim.world.spawn_rune(Position::new(70, 55));
        assert!(rune.check_and_activate(&sim.snapshot()));
        assert_eq!(rune.target(), Some(Position::new(70, 55)));
        assert_eq!(sim.world.calls()[..2], [Call::Release("a".into()), Call::ReleaseAll]);

        let mut seen = vec![rune.phase()];
        let mut outcome = RuneStatus::Running;
        let mut arrived = 0;
        for _ in 0..600 {
            outcome = rune.step(&sim.snapshot());
            if outcome == RuneStatus::Arrived {
                arrived += 1;
            }
            if seen.last() != Some(&rune.phase()) {
                seen.push(rune.phase());
            }
            if matches!(outcome, RuneStatus::Success | RuneStatus::Failed) {
                break;
            }
            sim.clock.advance(0.033);
        }
        assert_eq!(outcome, RuneStatus::Success);
        assert_eq!(arrived, 1);
        assert_eq!(
            seen,
            vec![RunePhase::Move, RunePhase::Interact, RunePhase::Solve, RunePhase::Search]
        );
        assert!(sim.presses().contains(&"space".to_string()));
        assert!(sim.world.rune().is_none());
        assert_eq!(sim.alerts(), vec![Cue::RuneArrived, Cue::RuneSolved]);
    }

    /// Step until the handler leaves its context or `limit` ticks pass.
    fn run(sim: &Sim, rune: &mut RuneHandler, limit: usize) -> RuneStatus {
        for _ in 0..limit {
            let status = rune.step(&sim.snapshot());
            if matches!(status, RuneStatus::Success | RuneStatus::Failed) {
                return status;
            }
            sim.clock.advance(0.033);
        }
        RuneStatus::Running
    }

    #[test]
    fn solve_waits_until_rune_stays_gone() {
        let (sim, mut rune) = rig(Position::new(40, 50));
        sim.world.set_interact_key("none");
        sim.world.spawn_rune(Position::new(50, 55));
        assert!(rune.check_and_activate(&sim.snapshot()));

        assert_eq!(run(&sim, &mut rune, 150), RuneStatus::Running);
        assert_eq!(rune.phase(), RunePhase::Solve);

        sim.world.clear_rune();
        assert_eq!(run(&sim, &mut rune, 30), RuneStatus::Running, "gone for under 1.5s");
        sim.world.spawn_rune(Position::new(50, 55));
        assert_eq!(run(&sim, &mut rune, 10), RuneStatus::Running);
        sim.world.clear_rune();
        let started = sim.clock.now();
        assert_eq!(run(&sim, &mut rune, 100), RuneStatus::Success);
        assert!(sim.clock.now() - started >= 1.5);
    }

    #[test]
    fn rune_left_in_place_times_out() {
        let (sim, mut rune) = rig(Position::new(40, 50));
        sim.world.set_interact_key("none");
        sim.world.spawn_rune(Position::new(50, 55));
        assert!(rune.check_and_activate(&sim.snapshot()));
        assert_eq!(run(&sim, &mut rune, 600), RuneStatus::Failed);
        assert_eq!(sim.alerts(), vec![Cue::RuneArrived]);
    }

    #[test]
    fn grace_period_solver_ignores_the_screen() {
        let mut job = JobConfig::default();
        job.keys.insert("interact".into(), "space".into());
        let sim = Sim::new(Jobs::single(job), Tuning::default(), Position::new(40, 50));
        sim.world.set_interact_key("none");
        let nav = Navigator::new(sim.session.clone());
        let combat = Combat::new(sim.session.clone());
        let solver = Box::new(GracePeriod::new(sim.session.tuning.rune.solve_grace));
        let mut rune = RuneHandler::with_solver(sim.session.clone(), nav, combat, solver);

        sim.world.spawn_rune(Position::new(50, 55));
        assert!(rune.check_and_activate(&sim.snapshot()));
        assert_eq!(run(&sim, &mut rune, 600), RuneStatus::Success);
        assert!(sim.world.rune().is_some());
    }

    #[test]
    fn cooldown_after_finish_blocks_rescan() {
        let (sim, mut rune) = rig(Position::new(40, 50));
        sim.world.spawn_rune(Position::new(200, 55));
        assert!(rune.check_and_activate(&sim.snapshot()));
        assert_eq!(rune.finish(RuneStatus::Failed), RuneStatus::Failed);
        assert!(!rune.is_active());
        sim.clock.advance(9.0);
        assert!(!rune.check_and_activate(&sim.snapshot()));
        sim.clock.advance(1.5);
        assert!(rune.check_and_activate(&sim.snapshot()));
    }

    #[test]
    fn miss_sets_short_rescan_window() {
        let (sim, mut rune) = rig(Position::new(40, 50));
        assert!(!rune.check_and_activate(&sim.snapshot()));
        sim.world.spawn_rune(Position::new(45, 55));
        assert!(!rune.check_and_activate(&sim.snapshot()));
        sim.clock.advance(1.0);
        assert!(rune.check_and_activate(&sim.snapshot()));
    }

    #[test]
    fn hard_timeout_fails_the_context() {
        let (sim, mut rune) = rig(Position::new(40, 50));
        sim.world.spawn_rune(Position::new(80, 55));
        assert!(rune.check_and_activate(&sim.snapshot()));
        // Perception lost the player but still sees the rune.
        let mut blind = sim.snapshot();
        blind.position = None;
        blind.detections.retain(|d| d.is_rune());
        assert_eq!(rune.step(&blind), RuneStatus::Running);
        sim.clock.advance(16.0);
        assert_eq!(rune.step(&blind), RuneStatus::Failed);
        assert_eq!(rune.phase(), RunePhase::Search);
    }

    #[test]
    fn vanished_rune_fails_after_grace() {
        let (sim, mut rune) = rig(Position::new(40, 50));
        sim.world.spawn_rune(Position::new(120, 55));
        assert!(rune.check_and_activate(&sim.snapshot()));
        sim.world.clear_rune();
        assert_eq!(rune.step(&sim.snapshot()), RuneStatus::Running);
        sim.clock.advance(2.5);
        assert_eq!(rune.step(&sim.snapshot()), RuneStatus::Failed);
    }

    #[test]
    fn inactive_handler_reports_failed() {
        let (sim, mut rune) = rig(Position::new(40, 50));
        assert_eq!(rune.step(&sim.snapshot()), RuneStatus::Failed);
    }
}
