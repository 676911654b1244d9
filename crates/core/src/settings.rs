use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::logger;

#[derive(Debug, Default, Clone, Serialize, Deserialize)]
pub struct Settings {
    #[serde(default)]
    pub last_map: Option<String>,
    #[serde(default)]
    pub tuning: Tuning,
}

impl Settings {
    pub fn load(path: &Path) -> Self {
        std::fs::read_to_string(path)
            .ok()
            .and_then(|s| serde_json::from_str(&s).ok())
            .unwrap_or_default()
    }

    /// Write the settings back; failures are logged and otherwise ignored.
    pub fn save(&self, path: &Path) -> bool {
        let json = match serde_json::to_string_pretty(self) {
            Ok(json) => json,
            Err(e) => {
                logger::error(&format!("failed to encode settings: {}", e));
                return false;
            }
        };
        if let Err(e) = std::fs::write(path, json) {
            logger::error(&format!("failed to save {}: {}", path.display(), e));
            return false;
        }
        true
    }
}

/// Product constants: pixel tolerances, cooldowns and time bounds.
#[derive(Debug, Default, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Tuning {
    pub nav: NavTuning,
    pub rune: RuneTuning,
    pub hunt: HuntTuning,
    pub routine: RoutineTuning,
    pub worker: WorkerTuning,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NavTuning {
    pub arrive_x: i32,
    pub arrive_y: i32,
    /// Beyond this horizontal gap a teleport / flash jump is added.
    pub far_x: i32,
    /// Upward gap that switches to the rope skill when one is configured.
    pub rope_gap: i32,
    /// Downward gap that triggers a down-jump.
    pub drop_gap: i32,
    /// Slide the character keeps after the direction key is released.
    pub coast: i32,
    /// Give up on a routine `MoveTo` after this many seconds.
    pub move_stall: f64,
}

impl Default for NavTuning {
    fn default() -> Self {
        Self {
            arrive_x: 3,
            arrive_y: 5,
            far_x: 15,
            rope_gap: 100,
            drop_gap: 30,
            coast: 1,
            move_stall: 8.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RuneTuning {
    pub tolerance_x: i32,
    pub tolerance_y: i32,
    pub timeout: f64,
    pub rescan: (f64, f64),
    pub cooldown: f64,
    pub vanish_grace: f64,
    pub settle: f64,
    pub solve_grace: f64,
    /// Seconds the rune must stay gone before the puzzle counts as solved.
    pub solved_after: f64,
    /// Feet offset below the player position when no player box is detected.
    pub feet_offset: i32,
}

impl Default for RuneTuning {
    fn default() -> Self {
        Self {
            tolerance_x: 5,
            tolerance_y: 3,
            timeout: 15.0,
            rescan: (0.5, 1.0),
            cooldown: 10.0,
            vanish_grace: 2.0,
            settle: 0.5,
            solve_grace: 3.0,
            solved_after: 1.5,
            feet_offset: 30,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HuntTuning {
    pub stationary_cycle: f64,
    pub portal_cycle: f64,
    pub portal_slack: (f64, f64),
    pub attack_hold: f64,
    pub attack_gap: f64,
    /// Mean attack hold before the first portal hop of a cycle.
    pub portal_opening: f64,
    /// Attack hold between later portal hops.
    pub portal_hold: (f64, f64),
    pub stationary_move_timeout: f64,
    pub portal_move_timeout: f64,
    pub break_every: (f64, f64),
    pub break_length: (f64, f64),
    pub summon_cooldown: f64,
    pub summon_reach: (i32, i32),
    pub summon_move_timeout: f64,
    pub install_jitter: i32,
    pub safe_jitter: i32,
    pub resume_jitter: i32,
}

impl Default for HuntTuning {
    fn default() -> Self {
        Self {
            stationary_cycle: 60.0,
            portal_cycle: 120.0,
            portal_slack: (0.0, 3.0),
            attack_hold: 10.0,
            attack_gap: 0.8,
            portal_opening: 3.0,
            portal_hold: (1.85, 2.0),
            stationary_move_timeout: 8.0,
            portal_move_timeout: 5.0,
            break_every: (180.0, 420.0),
            break_length: (3.0, 5.0),
            summon_cooldown: 60.0,
            summon_reach: (15, 10),
            summon_move_timeout: 5.0,
            install_jitter: 5,
            safe_jitter: 15,
            resume_jitter: 6,
        }
    }
}

/// Shapes of scheduler routines and the defaults of hand-written ones.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RoutineTuning {
    /// Arrival tolerance of scheduled point moves.
    pub move_tolerance: i32,
    /// Hold for a command-list `key_press` that gives no duration.
    pub press: f64,
    /// Tolerance for a command-list `move_to` that gives none.
    pub tolerance: i32,
    pub min_hunt: f64,
    pub max_hunt: f64,
    /// Skill press at a summon or portal point, and the pause after it.
    pub point_press: f64,
    pub point_wait: f64,
    pub attack_chunk: (f64, f64),
    pub attack_gap: (f64, f64),
    pub sub_chance: f64,
    pub sub_press: f64,
    pub sub_wait: f64,
    pub portal_attack: (f64, f64),
    pub portal_up: f64,
    pub portal_settle: f64,
}

impl Default for RoutineTuning {
    fn default() -> Self {
        Self {
            move_tolerance: 5,
            press: 0.1,
            tolerance: 10,
            min_hunt: 10.0,
            max_hunt: 180.0,
            point_press: 0.2,
            point_wait: 0.6,
            attack_chunk: (15.0, 25.0),
            attack_gap: (0.1, 0.3),
            sub_chance: 0.2,
            sub_press: 0.15,
            sub_wait: 0.3,
            portal_attack: (2.1, 2.6),
            portal_up: 0.15,
            portal_settle: 0.1,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WorkerTuning {
    pub tick_ms: u64,
    pub detection_cache: f64,
}

impl Default for WorkerTuning {
    fn default() -> Self {
        Self { tick_ms: 33, detection_cache: 0.05 }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_tuning_keeps_defaults() {
        let s: Settings =
            serde_json::from_str(r#"{"tuning": {"rune": {"timeout": 20.0}}}"#).unwrap();
        assert_eq!(s.tuning.rune.timeout, 20.0);
        assert_eq!(s.tuning.rune.tolerance_x, 5);
        assert_eq!(s.tuning.nav, NavTuning::default());
        assert!(s.last_map.is_none());
    }

    #[test]
    fn missing_file_gives_defaults() {
        let s = Settings::load(Path::new("/nonexistent/hunter/settings.json"));
        assert_eq!(s.tuning.worker.tick_ms, 33);
    }

    #[test]
    fn failed_save_is_reported_not_raised() {
        let dir = std::env::temp_dir().join(format!("hunter-settings-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        let mut s = Settings::default();
        s.last_map = Some("Ridge".into());

        assert!(!s.save(&dir));
        assert!(dir.is_dir());

        let file = dir.join("settings.json");
        assert!(s.save(&file));
        assert_eq!(Settings::load(&file).last_map.as_deref(), Some("Ridge"));
        std::fs::remove_dir_all(&dir).ok();
    }
}
