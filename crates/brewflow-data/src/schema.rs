//! Serde data file structs for part tables, engine settings and layouts.
//!
//! These structs define the on-disk format. They are deserialized from RON,
//! JSON, or TOML and then resolved into registry types by the loader.

use brewflow_core::fixed::f64_to_fixed64;
use brewflow_core::part::Part;
use brewflow_core::registry::{
    DEFAULT_FRICTION, PartBehavior, PartTypeDef, PortDef, PortKind, PressureSpec,
};
use serde::{Deserialize, Serialize};

// ===========================================================================
// Part types
// ===========================================================================

/// Port role as written in data files.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PortKindData {
    #[default]
    Passthrough,
    Outlet,
    Intake,
    Sink,
    Reservoir,
}

impl From<PortKindData> for PortKind {
    fn from(kind: PortKindData) -> Self {
        match kind {
            PortKindData::Passthrough => PortKind::Passthrough,
            PortKindData::Outlet => PortKind::Outlet,
            PortKindData::Intake => PortKind::Intake,
            PortKindData::Sink => PortKind::Sink,
            PortKindData::Reservoir => PortKind::Reservoir,
        }
    }
}

/// A connection point: angle in degrees clockwise from up, in the part's
/// unrotated frame.
#[derive(Debug, Clone, Deserialize)]
pub struct PortData {
    pub angle: i32,
    #[serde(default)]
    pub kind: PortKindData,
}

/// Behavior of a part type as written in data files.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
pub enum BehaviorData {
    Passthrough,
    Valve,
    Pump { default: f64, min: f64, max: f64 },
    Inlet { default: f64, min: f64, max: f64 },
    Sink,
    Reservoir,
    Blank,
}

impl From<BehaviorData> for PartBehavior {
    fn from(data: BehaviorData) -> Self {
        let spec = |default: f64, min: f64, max: f64| {
            PressureSpec::new(
                f64_to_fixed64(default),
                f64_to_fixed64(min),
                f64_to_fixed64(max),
            )
        };
        match data {
            BehaviorData::Passthrough => PartBehavior::Passthrough,
            BehaviorData::Valve => PartBehavior::Valve,
            BehaviorData::Pump { default, min, max } => PartBehavior::Pump(spec(default, min, max)),
            BehaviorData::Inlet { default, min, max } => PartBehavior::Inlet(spec(default, min, max)),
            BehaviorData::Sink => PartBehavior::Sink,
            BehaviorData::Reservoir => PartBehavior::Reservoir,
            BehaviorData::Blank => PartBehavior::Blank,
        }
    }
}

/// A part type definition in a data file.
///
/// With `base`, every field left out is copied from the named type, which
/// must appear earlier in the same file.
#[derive(Debug, Clone, Deserialize)]
pub struct PartTypeData {
    pub name: String,
    #[serde(default)]
    pub base: Option<String>,
    /// Older names that still resolve to this type.
    #[serde(default)]
    pub aliases: Vec<String>,
    #[serde(default)]
    pub behavior: Option<BehaviorData>,
    #[serde(default)]
    pub ports: Option<Vec<PortData>>,
    /// Port index groups. Omitted means one channel holding every port.
    #[serde(default)]
    pub channels: Option<Vec<Vec<usize>>>,
    #[serde(default)]
    pub friction: Option<f64>,
    #[serde(default)]
    pub liquids: Option<Vec<String>>,
}

impl PartTypeData {
    /// Resolve into a descriptor, filling gaps from `base`.
    pub fn to_def(&self, base: Option<&PartTypeDef>) -> PartTypeDef {
        let behavior = self
            .behavior
            .map(PartBehavior::from)
            .or(base.map(|b| b.behavior))
            .unwrap_or(PartBehavior::Passthrough);
        let mut def = PartTypeDef::new(&self.name, behavior);

        match (&self.ports, base) {
            (Some(ports), _) => {
                def.ports = ports
                    .iter()
                    .map(|p| PortDef::at_angle(p.angle, p.kind.into()))
                    .collect();
                def.channels = self.channels.clone().unwrap_or_default();
            }
            (None, Some(base)) => {
                def.ports = base.ports.clone();
                def.channels = self.channels.clone().unwrap_or_else(|| base.channels.clone());
            }
            (None, None) => {
                def.channels = self.channels.clone().unwrap_or_default();
            }
        }

        def.friction = match (self.friction, base) {
            (Some(friction), _) => f64_to_fixed64(friction),
            (None, Some(base)) => base.friction,
            (None, None) => DEFAULT_FRICTION,
        };
        def.liquids = match (&self.liquids, base) {
            (Some(liquids), _) => liquids.clone(),
            (None, Some(base)) => base.liquids.clone(),
            (None, None) => Vec::new(),
        };
        def
    }
}

/// Wrapper for a list of part types in TOML format.
#[derive(Debug, Clone, Deserialize)]
pub struct TomlPartTypes {
    pub parts: Vec<PartTypeData>,
}

// ===========================================================================
// Layouts
// ===========================================================================

/// A layout document as persisted by the process view editor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LayoutData {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub width: Option<u32>,
    #[serde(default)]
    pub height: Option<u32>,
    #[serde(default)]
    pub parts: Vec<Part>,
}

// ===========================================================================
// Tests
// ===========================================================================
