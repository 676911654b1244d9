use std::fmt;

use serde::{Deserialize, Serialize};

/// Minimap pixel coordinates of the player (or any target).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Position {
    pub x: i32,
    pub y: i32,
}

impl Position {
    pub fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }
}

/// What a map point is used for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PointKind {
    #[default]
    Move,
    Summon,
    Portal,
    SafeSpot,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Facing {
    Left,
    Right,
}

impl Facing {
    pub fn key(self) -> &'static str {
        match self {
            Facing::Left => "left",
            Facing::Right => "right",
        }
    }
}

/// A configured map location. Immutable for the lifetime of a session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Point {
    pub x: i32,
    pub y: i32,
    #[serde(rename = "type", default)]
    pub kind: PointKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub key: Option<String>,
    /// Seconds before this point's action may be scheduled again.
    #[serde(default)]
    pub cooldown: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub direction: Option<Facing>,
}

impl Point {
    pub fn new(x: i32, y: i32, kind: PointKind) -> Self {
        Self { x, y, kind, key: None, cooldown: 0.0, direction: None }
    }

    pub fn with_key(mut self, key: &str) -> Self {
        self.key = Some(key.to_string());
        self
    }

    pub fn with_cooldown(mut self, secs: f64) -> Self {
        self.cooldown = secs;
        self
    }

    pub fn facing(mut self, direction: Facing) -> Self {
        self.direction = Some(direction);
        self
    }

    pub fn position(&self) -> Position {
        Position::new(self.x, self.y)
    }
}

/// Filler style appended by the routine scheduler.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HuntingStyle {
    #[default]
    Stationary,
    Portal,
}

/// One labelled object from the vision collaborator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Detection {
    pub label: String,
    pub x: i32,
    pub y: i32,
    pub x1: i32,
    pub y1: i32,
    pub x2: i32,
    pub y2: i32,
    #[serde(rename = "conf")]
    pub confidence: f32,
}

impl Detection {
    /// Detection centred on `(x, y)` with a `w` x `h` box.
    pub fn centered(label: &str, x: i32, y: i32, w: i32, h: i32, confidence: f32) -> Self {
        Self {
            label: label.to_string(),
            x,
            y,
            x1: x - w / 2,
            y1: y - h / 2,
            x2: x + w / 2,
            y2: y + h / 2,
            confidence,
        }
    }

    pub fn is_player(&self) -> bool {
        matches!(
            self.label.to_lowercase().as_str(),
            "char" | "player" | "character" | "me"
        )
    }

    pub fn is_rune(&self) -> bool {
        self.label.eq_ignore_ascii_case("rune")
    }
}

/// Perception output for one tick. Consumers treat it as immutable.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Snapshot {
    pub position: Option<Position>,
    pub detections: Vec<Detection>,
    pub timestamp: f64,
}

impl Snapshot {
    pub fn at(position: Option<Position>, detections: Vec<Detection>, timestamp: f64) -> Self {
        Self { position, detections, timestamp }
    }

    pub fn rune(&self) -> Option<&Detection> {
        self.detections.iter().find(|d| d.is_rune())
    }

    pub fn player(&self) -> Option<&Detection> {
        self.detections.iter().find(|d| d.is_player())
    }
}

/// Raw minimap crop (BGRA).
#[derive(Debug, Clone)]
pub struct Capture {
    pub data: Vec<u8>,
    pub width: u32,
    pub height: u32,
    pub bytes_per_row: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum StrategyState {
    #[default]
    Idle,
    Setup,
    Install,
    MovingToSafe,
    Hunting,
    Attacking,
    RuneSolving,
    RuneWaiting,
    Paused,
}

impl StrategyState {
    pub fn as_str(self) -> &'static str {
        match self {
            StrategyState::Idle => "IDLE",
            StrategyState::Setup => "SETUP",
            StrategyState::Install => "INSTALL",
            StrategyState::MovingToSafe => "MOVING_TO_SAFE",
            StrategyState::Hunting => "HUNTING",
            StrategyState::Attacking => "ATTACKING",
            StrategyState::RuneSolving => "RUNE_SOLVING",
            StrategyState::RuneWaiting => "RUNE_WAITING",
            StrategyState::Paused => "PAUSED",
        }
    }

    /// States during which the idle-break scheduler may fire.
    pub fn is_fighting(self) -> bool {
        matches!(self, StrategyState::Hunting | StrategyState::Attacking)
    }

    pub fn is_rune(self) -> bool {
        matches!(self, StrategyState::RuneSolving | StrategyState::RuneWaiting)
    }
}

impl fmt::Display for StrategyState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Control message from the UI to the worker.
#[derive(Debug, Clone, PartialEq)]
pub enum Control {
    LoadMap(String),
    Pause,
    Resume,
    Quit,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn point_parses_map_file_shape() {
        let p: Point = serde_json::from_str(
            r#"{"x": 120, "y": 40, "type": "safe_spot", "cooldown": 60, "direction": "left"}"#,
        )
        .unwrap();
        assert_eq!(p.kind, PointKind::SafeSpot);
        assert_eq!(p.cooldown, 60.0);
        assert_eq!(p.direction, Some(Facing::Left));
        assert!(p.key.is_none());

        let bad = serde_json::from_str::<Point>(r#"{"x": 1, "y": 2, "type": "teleporter"}"#);
        assert!(bad.is_err());
    }

    #[test]
    fn snapshot_finds_labels() {
        let snap = Snapshot::at(
            Some(Position::new(10, 10)),
            vec![
                Detection::centered("Player", 10, 10, 8, 12, 0.9),
                Detection::centered("rune", 50, 20, 6, 6, 0.7),
            ],
            1.0,
        );
        assert_eq!(snap.player().map(|d| d.y2), Some(16));
        assert_eq!(snap.rune().map(|d| d.x), Some(50));
    }
}
