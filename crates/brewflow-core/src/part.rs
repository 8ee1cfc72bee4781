//! Placed parts: the input snapshot of a piping layout.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::fixed::{Fixed64, f64_to_fixed64};
use crate::geometry::{GridPosition, Orientation, Rotation};
use crate::id::PartId;

/// A single free-form setting value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum SettingValue {
    Bool(bool),
    Number(f64),
    Text(String),
    List(Vec<String>),
}

/// Well-known setting keys read by the flow engine.
pub mod keys {
    /// Whether a source is running. Sources default to enabled.
    pub const ENABLED: &str = "enabled";
    /// Source pressure, clamped to the descriptor's bounds.
    pub const PRESSURE: &str = "pressure";
    /// Liquids supplied by an inlet or held by a reservoir.
    pub const LIQUIDS: &str = "liquids";
}

/// A part placed on the grid.
///
/// The flow engine treats a slice of parts as an immutable snapshot; it
/// never mutates them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Part {
    pub id: PartId,
    /// Descriptor name (e.g. `"StraightTube"`). Resolved against the registry,
    /// including aliases.
    #[serde(rename = "type")]
    pub part_type: String,
    #[serde(flatten)]
    pub position: GridPosition,
    #[serde(default, rename = "rotate")]
    pub rotation: Rotation,
    #[serde(default)]
    pub flipped: bool,
    /// Valves only: blocks all flow through the part.
    #[serde(default)]
    pub closed: bool,
    #[serde(default)]
    pub settings: BTreeMap<String, SettingValue>,
}

impl Part {
    pub fn new(id: impl Into<String>, part_type: impl Into<String>, x: i32, y: i32) -> Self {
        Self {
            id: PartId::new(id),
            part_type: part_type.into(),
            position: GridPosition::new(x, y),
            rotation: Rotation::None,
            flipped: false,
            closed: false,
            settings: BTreeMap::new(),
        }
    }

    pub fn rotated(mut self, rotation: Rotation) -> Self {
        self.rotation = rotation;
        self
    }

    pub fn flipped(mut self) -> Self {
        self.flipped = true;
        self
    }

    pub fn closed(mut self) -> Self {
        self.closed = true;
        self
    }

    pub fn with_setting(mut self, key: &str, value: SettingValue) -> Self {
        self.settings.insert(key.to_string(), value);
        self
    }

    pub fn orientation(&self) -> Orientation {
        Orientation::new(self.rotation, self.flipped)
    }

    /// Boolean setting. Numbers are truthy when non-zero.
    pub fn setting_bool(&self, key: &str) -> Option<bool> {
        match self.settings.get(key)? {
            SettingValue::Bool(b) => Some(*b),
            SettingValue::Number(n) => Some(*n != 0.0),
            _ => None,
        }
    }

    /// Numeric setting converted to fixed-point.
    pub fn setting_fixed(&self, key: &str) -> Option<Fixed64> {
        match self.settings.get(key)? {
            SettingValue::Number(n) => Some(f64_to_fixed64(*n)),
            _ => None,
        }
    }

    /// List setting. A single text value is treated as a one-element list.
    pub fn setting_list(&self, key: &str) -> Vec<String> {
        match self.settings.get(key) {
            Some(SettingValue::List(items)) => items.clone(),
            Some(SettingValue::Text(item)) if !item.is_empty() => vec![item.clone()],
            _ => Vec::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn part_parses_from_layout_json() {
        let json = r##"{
            "id": "p1",
            "type": "Pump",
            "x": 2,
            "y": 5,
            "rotate": 90,
            "settings": { "enabled": true, "pressure": 40, "liquids": ["#4AA0EF"] }
        }"##;
        let part: Part = serde_json::from_str(json).unwrap();
        assert_eq!(part.id, PartId::new("p1"));
        assert_eq!(part.part_type, "Pump");
        assert_eq!(part.position, GridPosition::new(2, 5));
        assert_eq!(part.rotation, Rotation::Cw90);
        assert!(!part.flipped);
        assert!(!part.closed);
        assert_eq!(part.setting_bool(keys::ENABLED), Some(true));
        assert_eq!(part.setting_fixed(keys::PRESSURE), Some(Fixed64::from_num(40)));
        assert_eq!(part.setting_list(keys::LIQUIDS), vec!["#4AA0EF".to_string()]);
    }

    #[test]
    fn part_rejects_non_right_rotation() {
        let json = r#"{ "id": "p1", "type": "ElbowTube", "x": 0, "y": 0, "rotate": 45 }"#;
        assert!(serde_json::from_str::<Part>(json).is_err());
    }

    #[test]
    fn missing_settings_read_as_none() {
        let part = Part::new("v", "Valve", 0, 0);
        assert_eq!(part.setting_bool(keys::ENABLED), None);
        assert_eq!(part.setting_fixed(keys::PRESSURE), None);
        assert!(part.setting_list(keys::LIQUIDS).is_empty());
    }

    #[test]
    fn numeric_enabled_is_truthy() {
        let part = Part::new("p", "Pump", 0, 0).with_setting(keys::ENABLED, SettingValue::Number(0.0));
        assert_eq!(part.setting_bool(keys::ENABLED), Some(false));
    }

    #[test]
    fn builder_methods_set_orientation() {
        let part = Part::new("e", "ElbowTube", 1, 1).rotated(Rotation::Cw180).flipped();
        assert_eq!(part.orientation(), Orientation::new(Rotation::Cw180, true));
    }
}
