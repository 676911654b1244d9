use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::logger;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MovementType {
    #[default]
    FlashJump,
    Teleport,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UpJumpMethod {
    /// Jump, hold up, jump again.
    #[default]
    Command,
    /// Dedicated `up_jump` key.
    Key,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Movement {
    #[serde(rename = "type")]
    pub kind: MovementType,
    pub up_jump_method: UpJumpMethod,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Skills {
    pub summons: Vec<String>,
    pub portal: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuxMode {
    /// Held and released together with the main attack.
    Sync,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AuxSkill {
    pub key: Option<String>,
    pub mode: Option<AuxMode>,
}

impl AuxSkill {
    /// The aux key when it must follow the attack key.
    pub fn sync_key(&self) -> Option<&str> {
        match (self.key.as_deref(), self.mode) {
            (Some(k), Some(AuxMode::Sync)) if !k.is_empty() => Some(k),
            _ => None,
        }
    }
}

/// Key bindings and movement kit of one character.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct JobConfig {
    pub keys: BTreeMap<String, String>,
    pub movement: Movement,
    pub skills: Skills,
    pub aux_skill: AuxSkill,
}

impl JobConfig {
    /// Resolve an action name to a physical key.
    ///
    /// Mapped actions win; an unmapped name that is itself a physical key
    /// (`"up"`, `"e"`, `"f5"`) passes through unchanged.
    pub fn key(&self, action: &str) -> Option<String> {
        match self.keys.get(action) {
            Some(k) if !k.is_empty() => Some(k.clone()),
            _ if is_physical_key(action) => Some(action.to_string()),
            _ => None,
        }
    }

    /// Teleport key, falling back to jump when teleport is not bound.
    pub fn teleport_key(&self) -> Option<String> {
        self.key("teleport").or_else(|| self.key("jump"))
    }
}

/// Names the input device understands directly.
pub fn is_physical_key(name: &str) -> bool {
    const NAMED: &[&str] = &[
        "left", "right", "up", "down", "space", "shift", "ctrl", "alt", "enter", "tab", "esc",
        "insert", "delete", "home", "end", "pageup", "pagedown",
    ];
    let lower = name.to_ascii_lowercase();
    if lower.chars().count() == 1 {
        return lower.chars().all(|c| c.is_ascii_alphanumeric() || c.is_ascii_punctuation());
    }
    if let Some(n) = lower.strip_prefix('f') {
        if let Ok(n) = n.parse::<u8>() {
            return (1..=12).contains(&n);
        }
    }
    NAMED.contains(&lower.as_str())
}

/// Contents of `jobs.json`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobBook {
    #[serde(default = "default_job_name")]
    pub active_job: String,
    #[serde(default)]
    pub jobs: BTreeMap<String, JobConfig>,
}

fn default_job_name() -> String {
    "Default".to_string()
}

impl Default for JobBook {
    fn default() -> Self {
        Self { active_job: default_job_name(), jobs: BTreeMap::new() }
    }
}

impl JobBook {
    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("reading job file {}", path.display()))?;
        serde_json::from_str(&text).with_context(|| format!("parsing job file {}", path.display()))
    }

    pub fn active(&self) -> JobConfig {
        self.jobs.get(&self.active_job).cloned().unwrap_or_default()
    }
}

/// Shared handle to the job book. Every read sees the latest edit.
#[derive(Clone, Default)]
pub struct Jobs {
    inner: Arc<Mutex<JobBook>>,
    path: Option<PathBuf>,
}

impl Jobs {
    pub fn new(book: JobBook) -> Self {
        Self { inner: Arc::new(Mutex::new(book)), path: None }
    }

    /// Single-job book, mostly for tests and the simulator.
    pub fn single(config: JobConfig) -> Self {
        let mut book = JobBook::default();
        book.jobs.insert(book.active_job.clone(), config);
        Self::new(book)
    }

    /// Load from disk. A missing file yields an empty book; a corrupt one is an error.
    pub fn open(path: &Path) -> Result<Self> {
        let book = if path.exists() {
            JobBook::load(path)?
        } else {
            logger::warn(&format!("no job file at {}, using empty bindings", path.display()));
            JobBook::default()
        };
        Ok(Self { inner: Arc::new(Mutex::new(book)), path: Some(path.to_path_buf()) })
    }

    fn lock(&self) -> MutexGuard<'_, JobBook> {
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Copy of the active job's configuration.
    pub fn current(&self) -> JobConfig {
        self.lock().active()
    }

    pub fn key(&self, action: &str) -> Option<String> {
        self.current().key(action)
    }

    pub fn movement_type(&self) -> MovementType {
        self.current().movement.kind
    }

    pub fn up_jump_method(&self) -> UpJumpMethod {
        self.current().movement.up_jump_method
    }

    pub fn skills(&self) -> Skills {
        self.current().skills
    }

    pub fn aux_skill(&self) -> AuxSkill {
        self.current().aux_skill
    }

    pub fn active_name(&self) -> String {
        self.lock().active_job.clone()
    }

    pub fn names(&self) -> Vec<String> {
        self.lock().jobs.keys().cloned().collect()
    }

    /// Switch the active job. Unknown names are ignored.
    pub fn set_active(&self, name: &str) -> bool {
        let changed = {
            let mut book = self.lock();
            if book.jobs.contains_key(name) {
                book.active_job = name.to_string();
                true
            } else {
                false
            }
        };
        if changed {
            self.persist();
        }
        changed
    }

    pub fn update(&self, name: &str, config: JobConfig) {
        self.lock().jobs.insert(name.to_string(), config);
        self.persist();
    }

    fn persist(&self) {
        let Some(path) = &self.path else { return };
        let json = match serde_json::to_string_pretty(&*self.lock()) {
            Ok(j) => j,
            Err(e) => {
                logger::error(&format!("failed to encode jobs: {}", e));
                return;
            }
        };
        if let Some(dir) = path.parent() {
            std::fs::create_dir_all(dir).ok();
        }
        if let Err(e) = std::fs::write(path, json) {
            logger::error(&format!("failed to save jobs to {}: {}", path.display(), e));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> JobBook {
        serde_json::from_str(
            r#"{
                "active_job": "Bishop",
                "jobs": {
                    "Bishop": {
                        "keys": {"jump": "alt", "attack": "a", "teleport": "", "interact": "space"},
                        "movement": {"type": "teleport", "up_jump_method": "key"},
                        "skills": {"summons": ["e", "4"], "portal": "r"},
                        "aux_skill": {"key": "s", "mode": "sync"}
                    },
                    "Hero": {"keys": {"attack": "ctrl"}}
                }
            }"#,
        )
        .unwrap()
    }

    #[test]
    fn reads_active_job_fields() {
        let jobs = Jobs::new(sample());
        assert_eq!(jobs.movement_type(), MovementType::Teleport);
        assert_eq!(jobs.up_jump_method(), UpJumpMethod::Key);
        assert_eq!(jobs.skills().summons, vec!["e", "4"]);
        assert_eq!(jobs.aux_skill().sync_key(), Some("s"));
        assert_eq!(jobs.current().teleport_key().as_deref(), Some("alt"));
    }

    #[test]
    fn key_resolution_falls_back_to_physical_names() {
        let jobs = Jobs::new(sample());
        assert_eq!(jobs.key("attack").as_deref(), Some("a"));
        assert_eq!(jobs.key("up").as_deref(), Some("up"));
        assert_eq!(jobs.key("e").as_deref(), Some("e"));
        assert_eq!(jobs.key("f5").as_deref(), Some("f5"));
        assert_eq!(jobs.key("rope"), None);
        assert_eq!(jobs.key("sub_attack"), None);
    }

    #[test]
    fn switching_job_is_visible_to_clones() {
        let jobs = Jobs::new(sample());
        let reader = jobs.clone();
        assert!(jobs.set_active("Hero"));
        assert_eq!(reader.key("attack").as_deref(), Some("ctrl"));
        assert_eq!(reader.movement_type(), MovementType::FlashJump);
        assert!(!jobs.set_active("Nobody"));
        assert_eq!(reader.active_name(), "Hero");
    }
}
