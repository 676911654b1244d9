use std::collections::{BTreeSet, VecDeque};
use std::sync::{Arc, Mutex, MutexGuard};

use crate::job::Jobs;
use crate::session::Session;
use crate::settings::Tuning;
use crate::timing::{self, Clock, ManualClock};
use crate::types::*;
use crate::logger;
use super::{Cue, Hardware, Platform, Vision};

const CALL_HISTORY: usize = 512;
const WALK_SPEED: f64 = 60.0; // px per second
const JUMP_RISE: f64 = 20.0;
const RUNE_REACH: f64 = 8.0;

/// One recorded hardware call.
#[derive(Debug, Clone, PartialEq)]
pub enum Call {
    Press(String, f64),
    Hold(String),
    Release(String),
    ReleaseAll,
    Alert(Cue),
}

struct World {
    x: f64,
    y: f64,
    held: BTreeSet<String>,
    updated: f64,
    rune: Option<Position>,
    interact_key: String,
    calls: VecDeque<Call>,
}

/// Tiny simulated minimap: held direction keys walk the player, a jump while
/// holding up/down changes height, interact next to the rune clears it.
#[derive(Clone)]
pub struct SimWorld {
    inner: Arc<Mutex<World>>,
    clock: Arc<dyn Clock>,
}

impl SimWorld {
    pub fn new(clock: Arc<dyn Clock>, start: Position) -> Self {
        let updated = clock.now();
        Self {
            inner: Arc::new(Mutex::new(World {
                x: start.x as f64,
                y: start.y as f64,
                held: BTreeSet::new(),
                updated,
                rune: None,
                interact_key: "space".to_string(),
                calls: VecDeque::new(),
            })),
            clock,
        }
    }

    fn lock(&self) -> MutexGuard<'_, World> {
        let mut w = self.inner.lock().unwrap_or_else(|e| e.into_inner());
        let now = self.clock.now();
        let dt = (now - w.updated).max(0.0);
        if w.held.contains("left") {
            w.x -= WALK_SPEED * dt;
        }
        if w.held.contains("right") {
            w.x += WALK_SPEED * dt;
        }
        w.updated = now;
        w
    }

    pub fn position(&self) -> Position {
        let w = self.lock();
        Position::new(w.x.round() as i32, w.y.round() as i32)
    }

    pub fn set_position(&self, pos: Position) {
        let mut w = self.lock();
        w.x = pos.x as f64;
        w.y = pos.y as f64;
    }

    pub fn spawn_rune(&self, at: Position) {
        self.lock().rune = Some(at);
    }

    pub fn clear_rune(&self) {
        self.lock().rune = None;
    }

    pub fn rune(&self) -> Option<Position> {
        self.lock().rune
    }

    pub fn set_interact_key(&self, key: &str) {
        self.lock().interact_key = key.to_string();
    }

    pub fn held(&self) -> Vec<String> {
        self.lock().held.iter().cloned().collect()
    }

    pub fn calls(&self) -> Vec<Call> {
        self.lock().calls.iter().cloned().collect()
    }

    pub fn clear_calls(&self) {
        self.lock().calls.clear();
    }

    fn record(w: &mut World, call: Call) {
        if w.calls.len() == CALL_HISTORY {
            w.calls.pop_front();
        }
        w.calls.push_back(call);
    }

    pub fn detections(&self) -> Vec<Detection> {
        let w = self.lock();
        let (x, y) = (w.x.round() as i32, w.y.round() as i32);
        let mut out = vec![Detection::centered("player", x, y, 6, 10, 0.93)];
        if let Some(r) = w.rune {
            out.push(Detection::centered("rune", r.x, r.y - 3, 6, 6, 0.81));
        }
        out
    }
}

pub struct StubHardware {
    world: SimWorld,
}

impl StubHardware {
    pub fn new(world: SimWorld) -> Self {
        Self { world }
    }
}

impl Hardware for StubHardware {
    fn press(&self, key: &str, duration: f64) {
        logger::info_p("stub", &format!("press(\"{}\", {:.3})", key, duration));
        let mut w = self.world.lock();
        SimWorld::record(&mut w, Call::Press(key.to_string(), duration));
        match key {
            "left" => w.x -= WALK_SPEED * duration,
            "right" => w.x += WALK_SPEED * duration,
            _ if w.held.contains("up") => w.y -= JUMP_RISE,
            _ if w.held.contains("down") => w.y += JUMP_RISE,
            _ => {}
        }
        if key == w.interact_key {
            if let Some(r) = w.rune {
                let near = (w.x - r.x as f64).abs() <= RUNE_REACH
                    && (w.y - r.y as f64).abs() <= RUNE_REACH * 4.0;
                if near {
                    w.rune = None;
                }
            }
        }
    }

    fn hold(&self, key: &str) {
        let mut w = self.world.lock();
        SimWorld::record(&mut w, Call::Hold(key.to_string()));
        w.held.insert(key.to_string());
    }

    fn release(&self, key: &str) {
        let mut w = self.world.lock();
        SimWorld::record(&mut w, Call::Release(key.to_string()));
        w.held.remove(key);
    }

    fn release_all(&self) {
        let mut w = self.world.lock();
        SimWorld::record(&mut w, Call::ReleaseAll);
        w.held.clear();
    }

    fn alert(&self, cue: Cue) {
        logger::info_p("stub", &format!("alert({:?})", cue));
        let mut w = self.world.lock();
        SimWorld::record(&mut w, Call::Alert(cue));
    }
}

pub struct StubVision {
    world: SimWorld,
    clock: Arc<dyn Clock>,
    rune_every: Option<(f64, f64)>,
    next_rune: f64,
}

impl StubVision {
    pub fn new(world: SimWorld, clock: Arc<dyn Clock>) -> Self {
        Self { world, clock, rune_every: None, next_rune: f64::INFINITY }
    }

    /// Spawn a rune at a random spot every `range` seconds.
    pub fn with_runes(mut self, range: (f64, f64)) -> Self {
        self.next_rune = self.clock.now() + timing::between(range);
        self.rune_every = Some(range);
        self
    }
}

impl Vision for StubVision {
    fn player_position(&mut self) -> Option<Position> {
        Some(self.world.position())
    }

    fn detect_objects(&mut self) -> Vec<Detection> {
        if let Some(range) = self.rune_every {
            let now = self.clock.now();
            if now >= self.next_rune && self.world.rune().is_none() {
                // Rune sits on the player's floor so its lower edge matches the feet.
                let floor = self.world.position().y + 5;
                let at = Position::new(60 + timing::jitter(30), floor);
                logger::info_p("stub", &format!("rune spawned at ({}, {})", at.x, at.y));
                self.world.spawn_rune(at);
                self.next_rune = now + timing::between(range);
            }
        }
        self.world.detections()
    }

    fn cropped_minimap(&mut self) -> Option<Capture> {
        let (width, height) = (160u32, 90u32);
        Some(Capture {
            data: vec![0; (width * height * 4) as usize],
            width,
            height,
            bytes_per_row: width * 4,
        })
    }
}

pub struct StubPlatform {
    world: SimWorld,
    clock: Arc<dyn Clock>,
}

impl StubPlatform {
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self { world: SimWorld::new(clock.clone(), Position::new(80, 60)), clock }
    }

    pub fn world(&self) -> &SimWorld {
        &self.world
    }
}

impl Platform for StubPlatform {
    fn hardware(&self) -> Arc<dyn Hardware> {
        Arc::new(StubHardware::new(self.world.clone()))
    }

    fn vision(&self) -> Box<dyn Vision> {
        Box::new(StubVision::new(self.world.clone(), self.clock.clone()).with_runes((240.0, 480.0)))
    }
}

/// A session wired to a simulated world on virtual time.
pub struct Sim {
    pub session: Session,
    pub world: SimWorld,
    pub clock: Arc<ManualClock>,
}

impl Sim {
    pub fn new(jobs: Jobs, tuning: Tuning, start: Position) -> Self {
        let clock = Arc::new(ManualClock::new(1000.0));
        let world = SimWorld::new(clock.clone(), start);
        if let Some(k) = jobs.key("interact") {
            world.set_interact_key(&k);
        }
        let hw: Arc<dyn Hardware> = Arc::new(StubHardware::new(world.clone()));
        let session = Session::new(hw, jobs, clock.clone(), tuning);
        Self { session, world, clock }
    }

    /// Snapshot of the simulated world at the current virtual time.
    pub fn snapshot(&self) -> Snapshot {
        let detections = self.world.detections();
        let position = detections.iter().find(|d| d.is_player()).map(|d| Position::new(d.x, d.y));
        Snapshot::at(position, detections, self.clock.now())
    }

    /// Snapshot with perception missing.
    pub fn blind(&self) -> Snapshot {
        Snapshot::at(None, Vec::new(), self.clock.now())
    }

    pub fn presses(&self) -> Vec<String> {
        self.world
            .calls()
            .into_iter()
            .filter_map(|c| match c {
                Call::Press(k, _) => Some(k),
                _ => None,
            })
            .collect()
    }

    pub fn holds(&self) -> Vec<String> {
        self.world
            .calls()
            .into_iter()
            .filter_map(|c| match c {
                Call::Hold(k) => Some(k),
                _ => None,
            })
            .collect()
    }

    pub fn release_all_count(&self) -> usize {
        self.world.calls().iter().filter(|c| **c == Call::ReleaseAll).count()
    }

    pub fn alerts(&self) -> Vec<Cue> {
        self.world
            .calls()
            .into_iter()
            .filter_map(|c| match c {
                Call::Alert(cue) => Some(cue),
                _ => None,
            })
            .collect()
    }
}
