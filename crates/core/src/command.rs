use serde::{Deserialize, Serialize};

use crate::logger;
use crate::navigator::Navigator;
use crate::session::Session;
use crate::types::Position;

/// What a command sees on the tick it is attempted.
pub struct CommandContext<'a> {
    pub session: &'a Session,
    pub nav: &'a Navigator,
    pub position: Option<Position>,
}

/// One routine step. Each variant exposes a single "attempt to finish".
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Command {
    /// Done once `duration` seconds have passed since the first attempt.
    Wait {
        duration: f64,
        #[serde(skip)]
        started: Option<f64>,
    },
    /// One press of the key bound to `action`; done when the press returns.
    /// Without a duration the routine tuning's press applies.
    KeyPress {
        action: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        duration: Option<f64>,
    },
    /// Walk until within `tolerance` horizontally (and vertically when `y` is set).
    /// Without a tolerance the routine tuning's tolerance applies.
    MoveTo {
        x: i32,
        #[serde(default)]
        y: Option<i32>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        tolerance: Option<i32>,
        #[serde(skip)]
        started: Option<f64>,
    },
}

impl Command {
    pub fn wait(duration: f64) -> Self {
        Command::Wait { duration, started: None }
    }

    pub fn key(action: &str, duration: f64) -> Self {
        Command::KeyPress { action: action.to_string(), duration: Some(duration) }
    }

    pub fn move_to(x: i32, y: Option<i32>, tolerance: i32) -> Self {
        Command::MoveTo { x, y, tolerance: Some(tolerance), started: None }
    }

    /// Forget when a wait or move began, so it runs from scratch next attempt.
    pub fn rearm(&mut self) {
        match self {
            Command::Wait { started, .. } | Command::MoveTo { started, .. } => *started = None,
            Command::KeyPress { .. } => {}
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Command::Wait { .. } => "wait",
            Command::KeyPress { .. } => "key",
            Command::MoveTo { .. } => "move",
        }
    }

    /// Make progress; true when the command is complete.
    pub fn attempt(&mut self, ctx: &CommandContext<'_>) -> bool {
        match self {
            Command::Wait { duration, started } => {
                let now = ctx.session.now();
                let since = *started.get_or_insert(now);
                now - since >= *duration
            }
            Command::KeyPress { action, duration } => {
                let hold = duration.unwrap_or(ctx.session.tuning.routine.press);
                match ctx.session.jobs.key(action) {
                    Some(key) => ctx.session.press(&key, hold),
                    None => logger::warn_p("sched", &format!("no key bound for '{}', skipped", action)),
                }
                true
            }
            Command::MoveTo { x, y, tolerance, started } => {
                let Some(pos) = ctx.position else { return false };
                let nav = &ctx.session.tuning.nav;
                let tolerance = tolerance.unwrap_or(ctx.session.tuning.routine.tolerance);
                let now = ctx.session.now();
                let since = *started.get_or_insert(now);

                if now - since > nav.move_stall {
                    logger::warn_p("sched", &format!("move to ({}, {:?}) stalled, skipping", x, y));
                    ctx.nav.stop();
                    return true;
                }

                if (*x - pos.x).abs() > tolerance + nav.coast {
                    ctx.nav.move_horizontal(pos.x, *x);
                    return false;
                }
                ctx.nav.release_horizontal();
                match y {
                    Some(ty) => ctx.nav.move_vertical(pos.y, *ty),
                    None => true,
                }
            }
        }
    }
}

/// Ordered commands produced by one scheduling epoch.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Routine {
    pub commands: Vec<Command>,
    /// Seconds of filler planned after the point sweep.
    pub hunt_duration: f64,
}

impl Routine {
    pub fn len(&self) -> usize {
        self.commands.len()
    }

    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }

    /// Parse a routine written as a JSON command list.
    pub fn from_json(text: &str) -> anyhow::Result<Self> {
        let commands: Vec<Command> = serde_json::from_str(text)?;
        Ok(Self { commands, hunt_duration: 0.0 })
    }
}
