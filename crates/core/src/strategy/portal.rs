use crate::logger;
use crate::navigator::Approach;
use crate::session::Session;
use crate::summon::SummonManager;
use crate::timing;
use crate::types::{Point, PointKind, Snapshot, StrategyState};

use super::common::{self, Core, RuneTick};

/// Walk the portal route installing portals, then hop upwards through them
/// while attacking until the cycle (plus slack) runs out.
pub struct Portal {
    core: Core,
    summons: SummonManager,
    /// Portal and summon points in map order.
    route: Vec<Point>,
    index: usize,
    approach: Option<Approach>,
    holding: bool,
    next_hop: f64,
    /// Extra seconds on top of the cycle, drawn once per cycle.
    slack: f64,
}

impl Portal {
    pub fn new(session: Session) -> Self {
        let core = Core::new(session.clone(), session.tuning.hunt.portal_cycle);
        let summons = SummonManager::new(session, core.nav.clone(), core.combat.clone());
        Self {
            core,
            summons,
            route: Vec::new(),
            index: 0,
            approach: None,
            holding: false,
            next_hop: 0.0,
            slack: 0.0,
        }
    }

    /// Needs at least two portal points.
    pub fn set_data(&mut self, points: &[Point]) -> bool {
        self.summons.set_points(points);
        self.route = points
            .iter()
            .filter(|p| matches!(p.kind, PointKind::Portal | PointKind::Summon))
            .cloned()
            .collect();
        self.route.iter().filter(|p| p.kind == PointKind::Portal).count() >= 2
    }

    pub fn core(&self) -> &Core {
        &self.core
    }

    pub fn index(&self) -> usize {
        self.index
    }

    pub fn install_progress(&self) -> (usize, usize) {
        (self.index.min(self.route.len()), self.route.len())
    }

    pub fn start(&mut self) {
        if self.route.iter().filter(|p| p.kind == PointKind::Portal).count() < 2 {
            logger::warn_p("hunt", "portal hunt needs two portal points");
            return;
        }
        self.core.begin(StrategyState::Install);
        self.summons.reset();
        self.new_cycle();
        logger::info_p("hunt", "portal hunt started");
    }

    pub fn stop(&mut self) {
        self.core.halt();
        self.summons.reset();
        self.approach = None;
        self.holding = false;
        self.index = 0;
    }

    pub fn pause(&mut self) {
        if self.core.pause() {
            self.holding = false;
        }
    }

    pub fn resume(&mut self) {
        let Some(prior) = self.core.resume() else { return };
        if prior.is_rune() {
            self.after_rune();
        } else if prior == StrategyState::Install {
            self.walk_to(self.index, self.core.session.tuning.hunt.install_jitter);
        } else if prior == StrategyState::Attacking {
            self.next_hop = self.core.now() + 1.0;
        }
    }

    fn walk_to(&mut self, index: usize, jitter: i32) {
        let timeout = self.core.session.tuning.hunt.portal_move_timeout;
        let now = self.core.now();
        self.approach = self.route.get(index).map(|p| Approach::new(p.position(), jitter, now, timeout));
    }

    fn new_cycle(&mut self) {
        let hunt = self.core.session.tuning.hunt.clone();
        self.core.state = StrategyState::Install;
        self.core.cycle_start = self.core.now();
        self.slack = timing::between(hunt.portal_slack);
        self.index = 0;
        self.holding = false;
        self.walk_to(0, hunt.install_jitter);
    }

    fn after_rune(&mut self) {
        if self.core.elapsed() < self.core.cycle_duration {
            logger::info_p("hunt", &format!("rune done, back to route at {}", self.index + 1));
            self.core.state = StrategyState::Install;
            self.holding = false;
            self.walk_to(self.index, 0);
        } else {
            logger::info_p("hunt", "rune done, cycle over, reinstalling from the first point");
            self.new_cycle();
        }
    }

    /// Next portal-type point after the current one, wrapping around.
    fn next_portal(&self) -> usize {
        let len = self.route.len();
        (1..=len)
            .map(|step| (self.index + step) % len)
            .find(|&i| self.route[i].kind == PointKind::Portal)
            .unwrap_or(self.index)
    }

    pub fn step(&mut self, snap: &Snapshot) {
        if !self.core.is_active() || self.route.is_empty() {
            return;
        }
        let Some(pos) = snap.position else { return };

        match common::preempt_rune(&mut self.core, snap) {
            RuneTick::Idle => {}
            RuneTick::Busy => return,
            RuneTick::Resolved(_) => {
                self.after_rune();
                return;
            }
        }
        if common::take_break(&mut self.core) {
            self.holding = false;
            self.next_hop = self.core.now() + 1.0;
            return;
        }

        let hunt = self.core.session.tuning.hunt.clone();
        match self.core.state {
            StrategyState::Install => {
                if self.index >= self.route.len() {
                    self.core.state = StrategyState::Attacking;
                    self.next_hop =
                        self.core.now() + timing::gauss(hunt.portal_opening, hunt.portal_opening * 0.1);
                    self.holding = false;
                    self.index = self.route.len() - 1;
                    return;
                }
                if self.approach.is_none() {
                    self.walk_to(self.index, hunt.install_jitter);
                }
                let arrived = self.approach.as_ref().map_or(true, |a| a.step(&self.core.nav, pos));
                if !arrived {
                    return;
                }
                self.core.nav.stop();
                self.core.session.wait(timing::human_delay(0.5));
                if self.route[self.index].kind == PointKind::Portal {
                    logger::info_p("hunt", &format!("portal {}/{}", self.index + 1, self.route.len()));
                    self.core.combat.install_portal();
                }
                self.summons.check_and_install_immediate(pos);
                self.index += 1;
                self.walk_to(self.index, hunt.install_jitter);
            }
            StrategyState::Attacking => {
                if self.summons.check_and_install_immediate(pos) {
                    self.holding = false;
                    self.next_hop = self.core.now() + 2.0;
                    return;
                }
                if self.core.elapsed() > self.core.cycle_duration + self.slack {
                    logger::info_p("hunt", "cycle over, reinstalling");
                    self.core.combat.release_attack();
                    self.new_cycle();
                    return;
                }
                if self.core.now() < self.next_hop {
                    if !self.holding {
                        self.core.combat.hold_attack();
                        self.holding = true;
                    }
                    return;
                }
                self.core.combat.release_attack();
                self.holding = false;
                self.core.session.wait_between(0.25, 0.4);
                self.core.combat.use_upper_portal();
                self.holding = true;
                self.next_hop = self.core.now() + timing::between(hunt.portal_hold);
                self.index = self.next_portal();
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
    use crate::types::Position;

    fn rig() -> (Sim, Portal) {
        let mut job = JobConfig::default();
        job.keys.insert("attack".into(), "a".into());
        job.skills.portal = Some("r".into());
        job.skills.summons = vec!["e".into()];
        let mut tuning = Tuning::default();
        tuning.hunt.break_every = (10_000.0, 10_000.0);
        let sim = Sim::new(Jobs::single(job), tuning, Position::new(40, 50));
        let mut p = Portal::new(sim.session.clone());
        assert!(p.set_data(&[
            Point::new(50, 50, PointKind::Portal),
            Point::new(80, 50, PointKind::Summon),
            Point::new(200, 50, PointKind::Move),
            Point::new(110, 50, PointKind::Portal),
        ]));
        (sim, p)
    }

    fn run_until(sim: &Sim, p: &mut Portal, state: StrategyState, limit: usize) {
        for _ in 0..limit {
            if p.core().state == state {
                return;
            }
            p.step(&sim.snapshot());
            sim.clock.advance(0.033);
        }
        assert_eq!(p.core().state, state);
    }

    #[test]
    fn needs_two_portals() {
        let (_sim, mut p) = rig();
        assert!(!p.set_data(&[Point::new(1, 1, PointKind::Portal), Point::new(5, 1, PointKind::Summon)]));
        p.start();
        assert!(!p.core().running);
    }

    #[test]
    fn install_route_then_attack() {
        let (sim, mut p) = rig();
        p.start();
        assert_eq!(p.install_progress(), (0, 3));
        run_until(&sim, &mut p, StrategyState::Attacking, 2000);
        assert_eq!(sim.presses(), vec!["r", "e", "r"]);
        assert_eq!(p.index(), 2);

        p.step(&sim.snapshot());
        assert!(sim.world.held().contains(&"a".to_string()));
    }

    #[test]
    fn hops_cycle_through_portals_only() {
        let (sim, mut p) = rig();
        p.start();
        run_until(&sim, &mut p, StrategyState::Attacking, 2000);
        sim.world.clear_calls();
        let mut visited = Vec::new();
        for _ in 0..4 {
            sim.clock.advance(4.0);
            p.step(&sim.snapshot());
            visited.push(p.index());
        }
        assert_eq!(visited, vec![0, 2, 0, 2]);
        assert!(sim.holds().contains(&"up".to_string()));
    }

    #[test]
    fn cycle_expiry_restarts_from_first_point() {
        let (sim, mut p) = rig();
        p.start();
        run_until(&sim, &mut p, StrategyState::Attacking, 2000);
        let first = p.core().cycle_start;
        sim.clock.advance(125.0);
        p.step(&sim.snapshot());
        assert_eq!(p.core().state, StrategyState::Install);
        assert_eq!(p.index(), 0);
        assert!(p.core().cycle_start > first);
    }

    #[test]
    fn stop_twice_is_idle_and_releases() {
        let (sim, mut p) = rig();
        p.stop();
        p.start();
        p.stop();
        p.stop();
        assert_eq!(p.core().state, StrategyState::Idle);
        assert!(sim.release_all_count() >= 3);
        assert!(sim.world.held().is_empty());
    }
}
