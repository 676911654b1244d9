use crate::job::{MovementType, UpJumpMethod};
use crate::logger;
use crate::session::Session;
use crate::timing;
use crate::types::Position;

/// Turns "get to x/y" into direction holds and movement techniques.
///
/// Bindings are re-read on every call: the job can be edited between ticks.
#[derive(Clone)]
pub struct Navigator {
    session: Session,
}

impl Navigator {
    pub fn new(session: Session) -> Self {
        Self { session }
    }

    /// Release everything held.
    pub fn stop(&self) {
        self.session.hw.release_all();
    }

    pub fn release_horizontal(&self) {
        self.session.hw.release("left");
        self.session.hw.release("right");
    }

    /// One horizontal step. Returns true once within the arrival threshold.
    pub fn move_horizontal(&self, current_x: i32, target_x: i32) -> bool {
        let nav = &self.session.tuning.nav;
        let job = self.session.jobs.current();
        let hw = &self.session.hw;

        let diff = target_x - current_x;
        let distance = diff.abs();
        if distance <= nav.arrive_x {
            self.release_horizontal();
            return true;
        }

        let (direction, opposite) = if diff > 0 { ("right", "left") } else { ("left", "right") };
        hw.release(opposite);
        hw.hold(direction);

        if distance > nav.far_x {
            match job.movement.kind {
                MovementType::Teleport => {
                    if let Some(key) = job.teleport_key() {
                        self.session.press(&key, 0.1);
                        self.session.wait(0.12);
                    }
                }
                MovementType::FlashJump => {
                    if let Some(key) = job.key("jump") {
                        self.session.press(&key, 0.1);
                        self.session.wait(0.05);
                        self.session.press(&key, 0.1);
                        self.session.wait(0.4);
                    }
                }
            }
        }
        false
    }

    /// One vertical step. Returns true once within the arrival threshold.
    /// Screen y grows downwards: a negative gap means the target is above.
    pub fn move_vertical(&self, current_y: i32, target_y: i32) -> bool {
        let nav = &self.session.tuning.nav;
        let job = self.session.jobs.current();
        let hw = &self.session.hw;

        let diff = target_y - current_y;
        if diff.abs() <= nav.arrive_y {
            hw.release("up");
            hw.release("down");
            return true;
        }

        if job.movement.kind == MovementType::Teleport {
            let Some(key) = job.teleport_key() else { return false };
            let direction = if diff < 0 { "up" } else { "down" };
            hw.hold(direction);
            self.session.wait(0.05);
            self.session.press(&key, 0.1);
            self.session.wait(0.1);
            hw.release(direction);
            self.session.wait(0.35);
            return false;
        }

        let jump = job.key("jump");
        if diff < 0 {
            if diff < -nav.rope_gap {
                if let Some(rope) = job.key("rope") {
                    logger::info_p("nav", &format!("rope lift, gap {}px", -diff));
                    hw.release_all();
                    self.session.wait(0.1);
                    self.session.press(&rope, 0.1);
                    self.session.wait(1.2);
                    return false;
                }
            }

            hw.release_all();
            self.session.wait(0.05);
            let dedicated = match job.movement.up_jump_method {
                UpJumpMethod::Key => job.key("up_jump"),
                UpJumpMethod::Command => None,
            };
            match (dedicated, jump) {
                (Some(key), _) => {
                    self.session.press(&key, 0.1);
                    self.session.wait(0.6);
                }
                (None, Some(jump)) => {
                    self.session.press(&jump, 0.1);
                    self.session.wait(0.05);
                    hw.hold("up");
                    self.session.wait(0.05);
                    self.session.press(&jump, 0.1);
                    self.session.wait(0.1);
                    hw.release("up");
                    self.session.wait(0.6);
                }
                (None, None) => {}
            }
        } else if diff > nav.drop_gap {
            if let Some(jump) = jump {
                hw.hold("down");
                self.session.wait(0.05);
                self.session.press(&jump, 0.1);
                self.session.wait(0.1);
                hw.release("down");
                self.session.wait(0.5);
            }
        }
        false
    }
}

/// One bounded walk towards a point.
///
/// Done when both axes arrive, or once `timeout` seconds pass so a missed
/// detection can never wedge a state machine.
#[derive(Debug, Clone, PartialEq)]
pub struct Approach {
    target: Position,
    started: f64,
    timeout: f64,
}

impl Approach {
    /// `jitter` shifts the horizontal target by up to that many pixels either way.
    pub fn new(target: Position, jitter: i32, now: f64, timeout: f64) -> Self {
        let target = Position::new(target.x + timing::jitter(jitter), target.y);
        Self { target, started: now, timeout }
    }

    pub fn target(&self) -> Position {
        self.target
    }

    pub fn step(&self, nav: &Navigator, pos: Position) -> bool {
        let ax = nav.move_horizontal(pos.x, self.target.x);
        if ax && nav.move_vertical(pos.y, self.target.y) {
            return true;
        }
        if nav.session.now() - self.started > self.timeout {
            logger::warn_p(
                "nav",
                &format!("gave up on ({}, {}) after {:.0}s", self.target.x, self.target.y, self.timeout),
            );
            return true;
        }
        false
    }
}
