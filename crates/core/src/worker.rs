use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{mpsc, Arc, Mutex};

use crate::logger;
use crate::map::MapBook;
use crate::platform::Vision;
use crate::session::Session;
use crate::strategy::{Hunt, StatusReport};
use crate::types::{Control, Snapshot};

/// Flags flipped from outside the worker (UI, hotkeys). The worker is the
/// only thing that turns them into strategy calls.
#[derive(Debug, Default)]
pub struct Switches {
    enabled: AtomicBool,
    record: AtomicBool,
}

impl Switches {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled.load(Ordering::SeqCst)
    }

    pub fn set_enabled(&self, on: bool) {
        self.enabled.store(on, Ordering::SeqCst);
    }

    /// Flip the enable flag, returning the new value.
    pub fn toggle_enabled(&self) -> bool {
        !self.enabled.fetch_xor(true, Ordering::SeqCst)
    }

    pub fn request_record(&self) {
        self.record.store(true, Ordering::SeqCst);
    }

    pub fn take_record(&self) -> bool {
        self.record.swap(false, Ordering::SeqCst)
    }
}

/// Publish cell: writers swap in a whole new value, readers get a shared
/// immutable copy.
pub struct Latest<T> {
    inner: Mutex<Arc<T>>,
}

impl<T> Latest<T> {
    pub fn new(value: T) -> Self {
        Self { inner: Mutex::new(Arc::new(value)) }
    }

    pub fn publish(&self, value: T) {
        let value = Arc::new(value);
        *self.inner.lock().unwrap_or_else(|e| e.into_inner()) = value;
    }

    pub fn read(&self) -> Arc<T> {
        self.inner.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }
}

impl<T: Default> Default for Latest<T> {
    fn default() -> Self {
        Self::new(T::default())
    }
}

/// What the worker publishes each tick for the renderer.
#[derive(Debug, Clone, Default)]
pub struct Frame {
    pub tick: u64,
    pub enabled: bool,
    pub snapshot: Snapshot,
    pub status: StatusReport,
    /// Width and height of the last minimap crop.
    pub minimap: Option<(u32, u32)>,
}

/// State shared between the worker, the UI and the hotkey listener.
#[derive(Default)]
pub struct Shared {
    pub switches: Arc<Switches>,
    pub frame: Latest<Frame>,
}

impl Shared {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }
}

/// Fixed-cadence perception and logic loop. Owns the strategy.
pub struct Worker {
    session: Session,
    vision: Box<dyn Vision>,
    hunt: Hunt,
    maps: MapBook,
    shared: Arc<Shared>,
    control: mpsc::Receiver<Control>,
    was_enabled: bool,
    tick: u64,
}

impl Worker {
    pub fn new(
        session: Session,
        vision: Box<dyn Vision>,
        maps: MapBook,
        shared: Arc<Shared>,
        control: mpsc::Receiver<Control>,
    ) -> Self {
        let hunt = Hunt::new(session.clone());
        Self { session, vision, hunt, maps, shared, control, was_enabled: false, tick: 0 }
    }

    pub fn hunt(&self) -> &Hunt {
        &self.hunt
    }

    /// Drain pending control messages. False on Quit.
    fn process_controls(&mut self) -> bool {
        while let Ok(msg) = self.control.try_recv() {
            match msg {
                Control::Quit => {
                    logger::info_p("worker", "shutting down");
                    return false;
                }
                Control::LoadMap(name) => {
                    let loaded = self.maps.get(&name).and_then(|map| self.hunt.load_map(&name, map));
                    match loaded {
                        Ok(_) => {
                            // A fresh map starts disabled.
                            self.shared.switches.set_enabled(false);
                            self.was_enabled = false;
                        }
                        Err(e) => logger::error_p("worker", &format!("cannot load '{}': {:#}", name, e)),
                    }
                }
                Control::Pause => self.hunt.pause(),
                Control::Resume => self.hunt.resume(),
            }
        }
        true
    }

    /// Turn enable-flag edges into start/stop.
    fn sync_enabled(&mut self) -> bool {
        let enabled = self.shared.switches.is_enabled();
        if enabled == self.was_enabled {
            return enabled;
        }
        if enabled {
            self.hunt.start();
            if !self.hunt.is_running() {
                logger::warn_p("worker", "nothing to start, load a map first");
                self.shared.switches.set_enabled(false);
                return false;
            }
            logger::info_p("worker", "started");
        } else {
            self.hunt.stop();
            logger::info_p("worker", "stopped");
        }
        self.was_enabled = enabled;
        enabled
    }

    fn capture(&mut self) -> Snapshot {
        let position = self.vision.player_position();
        let detections = self.vision.detect_objects();
        Snapshot::at(position, detections, self.session.now())
    }

    /// One tick: controls, enable edge, snapshot, strategy step, publish.
    /// False once a Quit has been received.
    pub fn tick(&mut self) -> bool {
        if !self.process_controls() {
            return false;
        }
        let enabled = self.sync_enabled();

        let snapshot = self.capture();
        if self.shared.switches.take_record() {
            match snapshot.position {
                Some(p) => logger::info_p("worker", &format!("position: x={} y={}", p.x, p.y)),
                None => logger::warn_p("worker", "position: not visible"),
            }
        }
        if enabled {
            self.hunt.step(&snapshot);
        }

        let minimap = self.vision.cropped_minimap().map(|c| (c.width, c.height));
        self.tick += 1;
        self.shared.frame.publish(Frame {
            tick: self.tick,
            enabled,
            snapshot,
            status: self.hunt.status(),
            minimap,
        });
        true
    }

    /// Run until Quit, then stop the strategy and release every key.
    pub fn run(mut self) {
        let period = self.session.tuning.worker.tick_ms as f64 / 1000.0;
        logger::info_p("worker", &format!("running at {:.0} Hz", 1.0 / period.max(0.001)));
        loop {
            let started = self.session.now();
            if !self.tick() {
                break;
            }
            let spent = self.session.now() - started;
            self.session.wait(period - spent);
        }
        self.hunt.stop();
        self.session.hw.release_all();
        self.shared.switches.set_enabled(false);
        logger::info_p("worker", "stopped, keys released");
    }
}
