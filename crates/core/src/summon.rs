use crate::combat::Combat;
use crate::logger;
use crate::navigator::{Approach, Navigator};
use crate::session::Session;
use crate::types::{Point, PointKind, Position};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SummonStep {
    Running,
    Done,
}

/// Installs summons at the map's `summon` points.
///
/// Summon point `i` uses the job's `i`-th summon skill.
pub struct SummonManager {
    session: Session,
    nav: Navigator,
    combat: Combat,
    points: Vec<Point>,
    current: usize,
    installing: bool,
    approach: Option<Approach>,
    last_install: Option<f64>,
}

impl SummonManager {
    pub fn new(session: Session, nav: Navigator, combat: Combat) -> Self {
        Self {
            session,
            nav,
            combat,
            points: Vec::new(),
            current: 0,
            installing: false,
            approach: None,
            last_install: None,
        }
    }

    pub fn set_points(&mut self, points: &[Point]) {
        self.points = points.iter().filter(|p| p.kind == PointKind::Summon).cloned().collect();
    }

    pub fn reset(&mut self) {
        self.current = 0;
        self.installing = false;
        self.approach = None;
        self.last_install = None;
    }

    pub fn is_installing(&self) -> bool {
        self.installing
    }

    pub fn current_idx(&self) -> usize {
        self.current
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    fn approach(&self, index: usize) -> Option<Approach> {
        let hunt = &self.session.tuning.hunt;
        let now = self.session.now();
        self.points
            .get(index)
            .map(|p| Approach::new(p.position(), hunt.install_jitter, now, hunt.summon_move_timeout))
    }

    /// Begin visiting every summon point in order. False when there are none.
    pub fn start_install_sequence(&mut self) -> bool {
        if self.points.is_empty() {
            return false;
        }
        self.installing = true;
        self.current = 0;
        self.approach = self.approach(0);
        true
    }

    /// Restart the move timer towards the current point, e.g. after a pause.
    pub fn rearm(&mut self) {
        if self.installing {
            self.approach = self.approach(self.current);
        }
    }

    pub fn step_sequence(&mut self, pos: Position) -> SummonStep {
        if !self.installing {
            return SummonStep::Done;
        }
        if self.current >= self.points.len() {
            self.installing = false;
            self.approach = None;
            return SummonStep::Done;
        }

        let Some(approach) = self.approach.clone().or_else(|| self.approach(self.current)) else {
            return SummonStep::Running;
        };
        if approach.step(&self.nav, pos) {
            self.nav.stop();
            logger::info_p("hunt", &format!("summon {}/{}", self.current + 1, self.points.len()));
            self.combat.use_summon_at_index(self.current);
            self.last_install = Some(self.session.now());
            self.current += 1;
            self.approach = self.approach(self.current);
        } else {
            self.approach = Some(approach);
        }
        SummonStep::Running
    }

    /// Install on the spot when standing next to a summon point whose
    /// re-install cooldown has run out.
    pub fn check_and_install_immediate(&mut self, pos: Position) -> bool {
        let hunt = &self.session.tuning.hunt;
        let now = self.session.now();
        if self.last_install.is_some_and(|t| now - t < hunt.summon_cooldown) {
            return false;
        }
        let (reach_x, reach_y) = hunt.summon_reach;
        let Some(index) = self
            .points
            .iter()
            .position(|p| (pos.x - p.x).abs() <= reach_x && (pos.y - p.y).abs() <= reach_y)
        else {
            return false;
        };

        logger::info_p("hunt", &format!("in reach of summon {}, installing in place", index + 1));
        self.combat.release_attack();
        self.nav.stop();
        self.session.wait(0.5);
        self.combat.use_summon_at_index(index);
        self.last_install = Some(self.session.now());
        self.session.wait(0.6);
        true
    }
}
