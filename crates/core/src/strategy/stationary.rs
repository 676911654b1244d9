use crate::logger;
use crate::navigator::Approach;
use crate::session::Session;
use crate::summon::{SummonManager, SummonStep};
use crate::types::{Point, PointKind, Snapshot, StrategyState};

use super::common::{self, Core, RuneTick};

/// Install summons, then hold attack from one safe spot until the cycle ends.
pub struct Stationary {
    core: Core,
    summons: SummonManager,
    safe_spot: Option<Point>,
    approach: Option<Approach>,
    attacking: bool,
    last_attack_action: f64,
    /// Set after a rune: the next arrival at the safe spot keeps the cycle clock.
    resuming: bool,
}

impl Stationary {
    pub fn new(session: Session) -> Self {
        let core = Core::new(session.clone(), session.tuning.hunt.stationary_cycle);
        let summons = SummonManager::new(session, core.nav.clone(), core.combat.clone());
        Self {
            core,
            summons,
            safe_spot: None,
            approach: None,
            attacking: false,
            last_attack_action: 0.0,
            resuming: false,
        }
    }

    /// Needs a safe spot; summon points are optional.
    pub fn set_data(&mut self, points: &[Point]) -> bool {
        self.summons.set_points(points);
        self.safe_spot = points.iter().find(|p| p.kind == PointKind::SafeSpot).cloned();
        self.safe_spot.is_some()
    }

    pub fn core(&self) -> &Core {
        &self.core
    }

    pub fn install_progress(&self) -> (usize, usize) {
        (self.summons.current_idx(), self.summons.len())
    }

    pub fn start(&mut self) {
        if self.safe_spot.is_none() {
            logger::warn_p("hunt", "stationary hunt needs a safe spot");
            return;
        }
        self.core.begin(StrategyState::Setup);
        self.summons.reset();
        self.summons.start_install_sequence();
        self.approach = None;
        self.attacking = false;
        self.resuming = false;
        logger::info_p("hunt", "stationary hunt started");
    }

    pub fn stop(&mut self) {
        self.core.halt();
        self.summons.reset();
        self.approach = None;
        self.attacking = false;
        self.resuming = false;
    }

    pub fn pause(&mut self) {
        if self.core.pause() {
            self.attacking = false;
        }
    }

    pub fn resume(&mut self) {
        let Some(prior) = self.core.resume() else { return };
        self.last_attack_action = self.core.now();
        if prior.is_rune() {
            self.after_rune();
        } else if prior == StrategyState::MovingToSafe {
            self.head_to_safe(self.core.session.tuning.hunt.resume_jitter);
        } else if prior == StrategyState::Setup {
            self.summons.rearm();
        }
    }

    fn head_to_safe(&mut self, jitter: i32) {
        let timeout = self.core.session.tuning.hunt.stationary_move_timeout;
        self.approach = self
            .safe_spot
            .as_ref()
            .map(|p| Approach::new(p.position(), jitter, self.core.now(), timeout));
        self.core.state = StrategyState::MovingToSafe;
    }

    fn reinstall(&mut self) {
        self.core.state = StrategyState::Setup;
        self.resuming = false;
        self.summons.start_install_sequence();
    }

    fn after_rune(&mut self) {
        let elapsed = self.core.elapsed();
        if elapsed < self.core.cycle_duration {
            logger::info_p(
                "hunt",
                &format!("rune done, {:.0}s left in cycle, back to safe spot", self.core.cycle_duration - elapsed),
            );
            self.resuming = true;
            self.head_to_safe(self.core.session.tuning.hunt.resume_jitter);
        } else {
            logger::info_p("hunt", "rune done, cycle over, reinstalling");
            self.reinstall();
        }
    }

    pub fn step(&mut self, snap: &Snapshot) {
        if !self.core.is_active() {
            return;
        }
        let Some(pos) = snap.position else { return };

        // No rune checks while summons are going down.
        if !self.summons.is_installing() {
            match common::preempt_rune(&mut self.core, snap) {
                RuneTick::Idle => {}
                RuneTick::Busy => return,
                RuneTick::Resolved(_) => {
                    self.attacking = false;
                    self.after_rune();
                    return;
                }
            }
        }
        if common::take_break(&mut self.core) {
            self.attacking = false;
            return;
        }

        let now = self.core.now();
        let hunt = self.core.session.tuning.hunt.clone();
        match self.core.state {
            StrategyState::Setup => {
                if self.summons.step_sequence(pos) == SummonStep::Done {
                    self.head_to_safe(hunt.safe_jitter);
                }
            }
            StrategyState::MovingToSafe => {
                if self.approach.is_none() {
                    self.head_to_safe(hunt.safe_jitter);
                }
                let arrived = self.approach.as_ref().map_or(true, |a| a.step(&self.core.nav, pos));
                if !arrived {
                    return;
                }
                self.core.nav.stop();
                if let Some(facing) = self.safe_spot.as_ref().and_then(|p| p.direction) {
                    self.core.session.press(facing.key(), 0.15);
                    self.core.session.wait(0.5);
                }
                self.approach = None;
                self.core.state = StrategyState::Hunting;
                if !self.resuming {
                    self.core.cycle_start = self.core.now();
                }
                self.resuming = false;
                self.last_attack_action = self.core.now();
                self.attacking = false;
            }
            StrategyState::Hunting => {
                if now - self.core.cycle_start > self.core.cycle_duration {
                    logger::info_p("hunt", "cycle over, reinstalling");
                    self.core.combat.release_attack();
                    self.attacking = false;
                    self.reinstall();
                    return;
                }
                if self.attacking {
                    if now - self.last_attack_action > hunt.attack_hold {
                        self.core.combat.release_attack();
                        self.attacking = false;
                        self.last_attack_action = now;
                    }
                } else if now - self.last_attack_action > hunt.attack_gap {
                    self.core.combat.hold_attack();
                    self.attacking = true;
                    self.last_attack_action = now;
                }
            }
            _ => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::job::{JobConfig, Jobs};
    use crate::platform::stub::Sim;
    use crate::settings::Tuning;
    use crate::types::{Facing, Position};

    fn rig() -> (Sim, Stationary) {
        let mut job = JobConfig::default();
        job.keys.insert("attack".into(), "a".into());
        job.keys.insert("interact".into(), "space".into());
        job.skills.summons = vec!["e".into()];
        let mut tuning = Tuning::default();
        tuning.hunt.break_every = (10_000.0, 10_000.0);
        let sim = Sim::new(Jobs::single(job), tuning, Position::new(40, 50));
        let mut s = Stationary::new(sim.session.clone());
        assert!(s.set_data(&[
            Point::new(70, 50, PointKind::Summon),
            Point::new(120, 50, PointKind::SafeSpot).facing(Facing::Left),
        ]));
        (sim, s)
    }

    fn run_until(sim: &Sim, s: &mut Stationary, state: StrategyState, limit: usize) {
        for _ in 0..limit {
            if s.core().state == state {
                return;
            }
            s.step(&sim.snapshot());
            sim.clock.advance(0.033);
        }
        assert_eq!(s.core().state, state);
    }

    #[test]
    fn rejects_map_without_safe_spot() {
        let (_sim, mut s) = rig();
        assert!(!s.set_data(&[Point::new(1, 1, PointKind::Summon)]));
        s.start();
        assert!(!s.core().running);
    }

    #[test]
    fn setup_then_safe_spot_then_hunting() {
        let (sim, mut s) = rig();
        s.start();
        assert_eq!(s.core().state, StrategyState::Setup);
        run_until(&sim, &mut s, StrategyState::MovingToSafe, 500);
        assert_eq!(sim.presses(), vec!["e"]);
        run_until(&sim, &mut s, StrategyState::Hunting, 500);
        assert!(sim.presses().contains(&"left".to_string()));
        assert!((sim.world.position().x - 120).abs() <= 32);

        sim.clock.advance(1.0);
        s.step(&sim.snapshot());
        assert_eq!(sim.world.held(), vec!["a"]);
        sim.clock.advance(10.5);
        s.step(&sim.snapshot());
        assert!(sim.world.held().is_empty());
    }

    #[test]
    fn cycle_expiry_reinstalls() {
        let (sim, mut s) = rig();
        s.start();
        run_until(&sim, &mut s, StrategyState::Hunting, 1000);
        sim.clock.advance(61.0);
        s.step(&sim.snapshot());
        assert_eq!(s.core().state, StrategyState::Setup);
        assert!(sim.world.held().is_empty());
    }

    #[test]
    fn perception_miss_changes_nothing() {
        let (sim, mut s) = rig();
        s.start();
        sim.world.clear_calls();
        s.step(&sim.blind());
        assert_eq!(s.core().state, StrategyState::Setup);
        assert!(sim.world.calls().is_empty());
    }

    #[test]
    fn resume_keeps_cycle_clock() {
        let (sim, mut s) = rig();
        s.start();
        run_until(&sim, &mut s, StrategyState::Hunting, 1000);
        let cycle_start = s.core().cycle_start;
        sim.clock.advance(5.0);
        s.pause();
        assert!(s.core().paused);
        assert!(sim.world.held().is_empty());
        sim.clock.advance(20.0);
        s.step(&sim.snapshot());
        assert_eq!(s.core().state, StrategyState::Paused);
        s.resume();
        assert_eq!(s.core().state, StrategyState::Hunting);
        assert_eq!(s.core().cycle_start, cycle_start);
    }
}
