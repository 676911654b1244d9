pub mod common;
pub mod portal;
pub mod routine;
pub mod stationary;

use std::fmt;

use anyhow::{bail, Result};

use crate::logger;
use crate::map::MapData;
use crate::session::Session;
use crate::types::{Point, PointKind, Snapshot, StrategyState};

pub use common::Core;
pub use portal::Portal;
pub use routine::RoutineHunt;
pub use stationary::Stationary;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StrategyKind {
    Stationary,
    Portal,
    Routine,
}

impl StrategyKind {
    /// Two portals make a portal map; otherwise a safe spot makes a
    /// stationary one; anything else runs scheduler routines.
    pub fn for_points(points: &[Point]) -> Option<Self> {
        let count = |kind| points.iter().filter(|p| p.kind == kind).count();
        if points.is_empty() {
            None
        } else if count(PointKind::Portal) >= 2 {
            Some(StrategyKind::Portal)
        } else if count(PointKind::SafeSpot) > 0 {
            Some(StrategyKind::Stationary)
        } else {
            Some(StrategyKind::Routine)
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            StrategyKind::Stationary => "stationary",
            StrategyKind::Portal => "portal",
            StrategyKind::Routine => "routine",
        }
    }
}

impl fmt::Display for StrategyKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The closed set of hunting behaviours.
pub enum Strategy {
    Stationary(Stationary),
    Portal(Portal),
    Routine(RoutineHunt),
}

impl Strategy {
    pub fn build(session: Session, map: &MapData) -> Result<Self> {
        let Some(kind) = StrategyKind::for_points(&map.points) else {
            bail!("map has no points");
        };
        let mut strategy = match kind {
            StrategyKind::Stationary => Strategy::Stationary(Stationary::new(session)),
            StrategyKind::Portal => Strategy::Portal(Portal::new(session)),
            StrategyKind::Routine => {
                Strategy::Routine(RoutineHunt::new(session, map.settings.hunting_type))
            }
        };
        if !strategy.set_data(&map.points) {
            bail!("points do not fit a {} hunt", kind);
        }
        Ok(strategy)
    }

    pub fn kind(&self) -> StrategyKind {
        match self {
            Strategy::Stationary(_) => StrategyKind::Stationary,
            Strategy::Portal(_) => StrategyKind::Portal,
            Strategy::Routine(_) => StrategyKind::Routine,
        }
    }

    fn core(&self) -> &Core {
        match self {
            Strategy::Stationary(s) => s.core(),
            Strategy::Portal(s) => s.core(),
            Strategy::Routine(s) => s.core(),
        }
    }

    pub fn set_data(&mut self, points: &[Point]) -> bool {
        match self {
            Strategy::Stationary(s) => s.set_data(points),
            Strategy::Portal(s) => s.set_data(points),
            Strategy::Routine(s) => s.set_data(points),
        }
    }

    pub fn start(&mut self) {
        match self {
            Strategy::Stationary(s) => s.start(),
            Strategy::Portal(s) => s.start(),
            Strategy::Routine(s) => s.start(),
        }
    }

    pub fn stop(&mut self) {
        match self {
            Strategy::Stationary(s) => s.stop(),
            Strategy::Portal(s) => s.stop(),
            Strategy::Routine(s) => s.stop(),
        }
    }

    pub fn pause(&mut self) {
        match self {
            Strategy::Stationary(s) => s.pause(),
            Strategy::Portal(s) => s.pause(),
            Strategy::Routine(s) => s.pause(),
        }
    }

    pub fn resume(&mut self) {
        match self {
            Strategy::Stationary(s) => s.resume(),
            Strategy::Portal(s) => s.resume(),
            Strategy::Routine(s) => s.resume(),
        }
    }

    pub fn step(&mut self, snap: &Snapshot) {
        match self {
            Strategy::Stationary(s) => s.step(snap),
            Strategy::Portal(s) => s.step(snap),
            Strategy::Routine(s) => s.step(snap),
        }
    }

    pub fn state(&self) -> StrategyState {
        self.core().state
    }

    pub fn is_running(&self) -> bool {
        self.core().running
    }

    pub fn is_paused(&self) -> bool {
        self.core().paused
    }

    pub fn cycle_start(&self) -> f64 {
        self.core().cycle_start
    }

    pub fn cycle_duration(&self) -> f64 {
        self.core().cycle_duration
    }

    /// (done, total) for the current install pass or routine.
    pub fn progress(&self) -> (usize, usize) {
        match self {
            Strategy::Stationary(s) => s.install_progress(),
            Strategy::Portal(s) => s.install_progress(),
            Strategy::Routine(s) => s.progress(),
        }
    }
}

/// Read-only view of the active strategy for display.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StatusReport {
    pub kind: Option<StrategyKind>,
    pub map: Option<String>,
    pub state: StrategyState,
    pub running: bool,
    pub paused: bool,
    pub cycle_start: f64,
    pub cycle_duration: f64,
    /// Seconds left in the cycle when the report was taken.
    pub remaining: f64,
    pub progress: (usize, usize),
}

impl StatusReport {
    pub fn describe(&self) -> String {
        let Some(kind) = self.kind else { return "no map loaded".to_string() };
        let map = self.map.as_deref().unwrap_or("?");
        if !self.running {
            return format!("{} ready ({})", map, kind);
        }
        if self.paused {
            return format!("paused on {}", map);
        }
        let (done, total) = self.progress;
        match self.state {
            StrategyState::Setup | StrategyState::Install => {
                format!("installing {}/{}", (done + 1).min(total.max(1)), total)
            }
            StrategyState::MovingToSafe => "moving to safe spot".to_string(),
            StrategyState::Hunting if kind == StrategyKind::Routine => {
                format!("routine step {}/{}, next plan in {:.0}s", (done + 1).min(total.max(1)), total, self.remaining)
            }
            StrategyState::Hunting => format!("hunting, reinstall in {:.0}s", self.remaining),
            StrategyState::Attacking => format!("attacking, reinstall in {:.0}s", self.remaining),
            StrategyState::RuneSolving => "moving to rune".to_string(),
            StrategyState::RuneWaiting => "solving rune".to_string(),
            other => other.as_str().to_lowercase(),
        }
    }
}

/// Owns the strategy for the loaded map.
pub struct Hunt {
    session: Session,
    active: Option<Strategy>,
    map: Option<String>,
}

impl Hunt {
    pub fn new(session: Session) -> Self {
        Self { session, active: None, map: None }
    }

    /// Replace the active strategy. The previous one is stopped first.
    pub fn load_map(&mut self, name: &str, map: &MapData) -> Result<StrategyKind> {
        let strategy = Strategy::build(self.session.clone(), map)?;
        if let Some(old) = self.active.as_mut() {
            old.stop();
        }
        let kind = strategy.kind();
        logger::info_p("hunt", &format!("loaded '{}' as a {} hunt", name, kind));
        self.active = Some(strategy);
        self.map = Some(name.to_string());
        Ok(kind)
    }

    pub fn map_name(&self) -> Option<&str> {
        self.map.as_deref()
    }

    pub fn strategy(&self) -> Option<&Strategy> {
        self.active.as_ref()
    }

    pub fn is_running(&self) -> bool {
        self.active.as_ref().is_some_and(Strategy::is_running)
    }

    pub fn start(&mut self) {
        match self.active.as_mut() {
            Some(s) => s.start(),
            None => logger::warn_p("hunt", "no map loaded"),
        }
    }

    pub fn stop(&mut self) {
        match self.active.as_mut() {
            Some(s) => s.stop(),
            None => self.session.hw.release_all(),
        }
    }

    pub fn pause(&mut self) {
        if let Some(s) = self.active.as_mut() {
            s.pause();
        }
    }

    pub fn resume(&mut self) {
        if let Some(s) = self.active.as_mut() {
            s.resume();
        }
    }

    pub fn step(&mut self, snap: &Snapshot) {
        if let Some(s) = self.active.as_mut() {
            s.step(snap);
        }
    }

    pub fn status(&self) -> StatusReport {
        let Some(s) = self.active.as_ref() else { return StatusReport::default() };
        let remaining = (s.cycle_start() + s.cycle_duration() - self.session.now()).max(0.0);
        StatusReport {
            kind: Some(s.kind()),
            map: self.map.clone(),
            state: s.state(),
            running: s.is_running(),
            paused: s.is_paused(),
            cycle_start: s.cycle_start(),
            cycle_duration: s.cycle_duration(),
            remaining,
            progress: s.progress(),
        }
    }
}
