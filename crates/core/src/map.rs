use std::collections::BTreeMap;
use std::path::Path;

use anyhow::{anyhow, Context, Result};
use serde::{Deserialize, Serialize};

use crate::types::{HuntingStyle, Point, PointKind};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MapSettings {
    #[serde(default)]
    pub hunting_type: HuntingStyle,
}

/// One named hunting ground.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MapData {
    #[serde(default)]
    pub points: Vec<Point>,
    #[serde(default)]
    pub settings: MapSettings,
}

impl MapData {
    pub fn count(&self, kind: PointKind) -> usize {
        self.points.iter().filter(|p| p.kind == kind).count()
    }
}

/// Contents of `maps.json`: map name to map data.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MapBook {
    pub maps: BTreeMap<String, MapData>,
}

impl MapBook {
    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("reading map file {}", path.display()))?;
        Self::parse(&text).with_context(|| format!("parsing map file {}", path.display()))
    }

    pub fn parse(text: &str) -> Result<Self> {
        Ok(serde_json::from_str(text)?)
    }

    pub fn names(&self) -> Vec<String> {
        self.maps.keys().cloned().collect()
    }

    /// Look up a map that has at least one point.
    pub fn get(&self, name: &str) -> Result<&MapData> {
        let map = self.maps.get(name).ok_or_else(|| anyhow!("no map named '{}'", name))?;
        if map.points.is_empty() {
            return Err(anyhow!("map '{}' has no points", name));
        }
        Ok(map)
    }
}
