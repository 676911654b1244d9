use crate::command::CommandContext;
use crate::logger;
use crate::machine::Machine;
use crate::scheduler::RoutineScheduler;
use crate::session::Session;
use crate::types::{HuntingStyle, Point, Snapshot, StrategyState};

use super::common::{self, Core, RuneTick};

/// Runs scheduler routines on the execution machine, asking for a new one
/// each time the machine runs dry.
pub struct RoutineHunt {
    core: Core,
    style: HuntingStyle,
    scheduler: Option<RoutineScheduler>,
    machine: Machine,
    cycles: u32,
}

impl RoutineHunt {
    pub fn new(session: Session, style: HuntingStyle) -> Self {
        Self { core: Core::new(session, 0.0), style, scheduler: None, machine: Machine::new(), cycles: 0 }
    }

    pub fn set_data(&mut self, points: &[Point]) -> bool {
        if points.is_empty() {
            return false;
        }
        self.scheduler = Some(RoutineScheduler::new(self.core.session.clone(), points.to_vec(), self.style));
        true
    }

    pub fn core(&self) -> &Core {
        &self.core
    }

    pub fn machine(&self) -> &Machine {
        &self.machine
    }

    pub fn cycles(&self) -> u32 {
        self.cycles
    }

    /// Commands done / total in the current routine.
    pub fn progress(&self) -> (usize, usize) {
        (self.machine.index(), self.machine.len())
    }

    pub fn start(&mut self) {
        if self.scheduler.is_none() {
            logger::warn_p("hunt", "routine hunt has no points");
            return;
        }
        self.core.begin(StrategyState::Hunting);
        self.cycles = 0;
        self.next_cycle();
        logger::info_p("hunt", "routine hunt started");
    }

    fn next_cycle(&mut self) {
        let Some(scheduler) = self.scheduler.as_mut() else { return };
        let routine = scheduler.next_routine();
        self.core.cycle_start = self.core.session.now();
        self.core.cycle_duration = routine.hunt_duration;
        self.machine.set_routine(routine, false);
        self.cycles += 1;
    }

    pub fn stop(&mut self) {
        self.core.halt();
        self.machine = Machine::new();
    }

    pub fn pause(&mut self) {
        self.core.pause();
    }

    pub fn resume(&mut self) {
        if let Some(prior) = self.core.resume() {
            if prior.is_rune() {
                self.core.state = StrategyState::Hunting;
            }
            self.machine.rearm_current();
        }
    }

    pub fn step(&mut self, snap: &Snapshot) {
        if !self.core.is_active() {
            return;
        }
        if snap.position.is_none() {
            return;
        }

        match common::preempt_rune(&mut self.core, snap) {
            RuneTick::Idle => {}
            RuneTick::Busy => return,
            RuneTick::Resolved(_) => {
                self.core.state = StrategyState::Hunting;
                self.machine.rearm_current();
                return;
            }
        }
        if common::take_break(&mut self.core) {
            self.machine.rearm_current();
            return;
        }
        if self.core.state != StrategyState::Hunting {
            return;
        }

        if self.machine.is_finished() {
            self.next_cycle();
        }
        let ctx = CommandContext { session: &self.core.session, nav: &self.core.nav, position: snap.position };
        self.machine.step(&ctx);
    }
}
