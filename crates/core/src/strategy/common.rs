use crate::combat::Combat;
use crate::logger;
use crate::navigator::Navigator;
use crate::rune::{RuneHandler, RunePhase, RuneStatus};
use crate::session::Session;
use crate::timing;
use crate::types::{Snapshot, StrategyState};

/// State every strategy variant carries. Variants own one and drive it
/// through the helper functions below.
pub struct Core {
    pub session: Session,
    pub nav: Navigator,
    pub combat: Combat,
    pub rune: RuneHandler,
    pub breaks: Breaks,
    pub state: StrategyState,
    pub running: bool,
    pub paused: bool,
    pub resume_to: StrategyState,
    pub cycle_start: f64,
    pub cycle_duration: f64,
}

impl Core {
    pub fn new(session: Session, cycle_duration: f64) -> Self {
        let nav = Navigator::new(session.clone());
        let combat = Combat::new(session.clone());
        let rune = RuneHandler::new(session.clone(), nav.clone(), combat.clone());
        Self {
            session,
            nav,
            combat,
            rune,
            breaks: Breaks::default(),
            state: StrategyState::Idle,
            running: false,
            paused: false,
            resume_to: StrategyState::Idle,
            cycle_start: 0.0,
            cycle_duration,
        }
    }

    pub fn now(&self) -> f64 {
        self.session.now()
    }

    pub fn elapsed(&self) -> f64 {
        self.now() - self.cycle_start
    }

    /// Shared part of `start`: fresh rune context, break timer and cycle clock.
    pub fn begin(&mut self, state: StrategyState) {
        let now = self.now();
        self.running = true;
        self.paused = false;
        self.rune.reset();
        self.breaks.schedule(now, self.session.tuning.hunt.break_every);
        self.cycle_start = now;
        self.state = state;
    }

    /// Idempotent: always releases every key and lands in IDLE.
    pub fn halt(&mut self) {
        self.running = false;
        self.paused = false;
        self.combat.release_attack();
        self.nav.stop();
        self.rune.reset();
        self.breaks.until = None;
        self.state = StrategyState::Idle;
    }

    /// Keys are released before the paused flag is raised.
    pub fn pause(&mut self) -> bool {
        if !self.running || self.paused {
            return false;
        }
        self.combat.release_attack();
        self.nav.stop();
        self.resume_to = self.state;
        self.state = StrategyState::Paused;
        self.paused = true;
        true
    }

    /// Restores the state held before `pause`. The cycle clock keeps running.
    pub fn resume(&mut self) -> Option<StrategyState> {
        if !self.running || !self.paused {
            return None;
        }
        self.paused = false;
        self.rune.reset();
        self.state = self.resume_to;
        Some(self.resume_to)
    }

    pub fn is_active(&self) -> bool {
        self.running && !self.paused
    }
}

/// Randomised idle pauses while fighting.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct Breaks {
    pub next_at: f64,
    pub until: Option<f64>,
}

impl Breaks {
    pub fn schedule(&mut self, now: f64, every: (f64, f64)) {
        self.next_at = now + timing::between(every);
        self.until = None;
    }

    pub fn is_resting(&self) -> bool {
        self.until.is_some()
    }
}

/// True while a break holds the strategy. Starting a break releases attack
/// and movement; the caller must treat its attack as no longer held.
pub fn take_break(core: &mut Core) -> bool {
    let now = core.now();
    let hunt = &core.session.tuning.hunt;
    if let Some(until) = core.breaks.until {
        if now > until {
            logger::info_p("hunt", "break over");
            core.breaks.schedule(now, hunt.break_every);
            return false;
        }
        return true;
    }
    if core.state.is_fighting() && now > core.breaks.next_at {
        let rest = timing::between(hunt.break_length);
        logger::info_p("hunt", &format!("taking a {:.1}s break", rest));
        core.combat.release_attack();
        core.nav.stop();
        core.breaks.until = Some(now + rest);
        return true;
    }
    false
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RuneTick {
    /// No rune context; the strategy runs its own states.
    Idle,
    /// The rune handler owns this tick.
    Busy,
    /// The context just closed; the strategy must pick where to resume.
    Resolved(RuneStatus),
}

/// Pre-empts the strategy when a rune is (or becomes) active.
pub fn preempt_rune(core: &mut Core, snap: &Snapshot) -> RuneTick {
    if !core.rune.is_active() && !core.rune.check_and_activate(snap) {
        return RuneTick::Idle;
    }
    match core.rune.step(snap) {
        RuneStatus::Running => {
            core.state = match core.rune.phase() {
                RunePhase::Interact | RunePhase::Solve => StrategyState::RuneWaiting,
                _ => StrategyState::RuneSolving,
            };
            RuneTick::Busy
        }
        RuneStatus::Arrived => {
            core.state = StrategyState::RuneWaiting;
            RuneTick::Busy
        }
        status => {
            core.combat.release_attack();
            core.nav.stop();
            RuneTick::Resolved(status)
        }
    }
}
