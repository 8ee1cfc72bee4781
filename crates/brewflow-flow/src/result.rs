//! Flow annotations handed back to the renderer.

use std::collections::{BTreeMap, BTreeSet};

use brewflow_core::fixed::Fixed64;
use brewflow_core::geometry::{Direction, Orientation};
use brewflow_core::id::PartId;
use serde::{Deserialize, Serialize};

/// Flow through one connection point.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PortFlow {
    /// Signed rate; positive leaves the part.
    Flow(Fixed64),
    /// Independent sources disagree here. Rendered as a marker, not a number.
    Conflict,
}

impl PortFlow {
    pub const ZERO: PortFlow = PortFlow::Flow(Fixed64::ZERO);

    /// The numeric value, or `None` for a conflict.
    pub fn value(self) -> Option<Fixed64> {
        match self {
            PortFlow::Flow(v) => Some(v),
            PortFlow::Conflict => None,
        }
    }

    pub fn is_conflict(self) -> bool {
        self == PortFlow::Conflict
    }

    pub fn is_zero(self) -> bool {
        self == PortFlow::ZERO
    }
}

/// Flow state of one part.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PartFlow {
    /// One entry per connection point, keyed by absolute direction.
    pub ports: BTreeMap<Direction, PortFlow>,
    /// Liquids present in the part, for coloring.
    pub liquids: BTreeSet<String>,
    /// Any port carries a nonzero flow.
    pub flowing: bool,
    /// Any port is in conflict.
    pub conflict: bool,
}

impl PartFlow {
    pub fn port(&self, direction: Direction) -> Option<PortFlow> {
        self.ports.get(&direction).copied()
    }

    /// Numeric flow toward `direction`. `None` for a missing port or a conflict.
    pub fn flow(&self, direction: Direction) -> Option<Fixed64> {
        self.port(direction).and_then(PortFlow::value)
    }

    pub fn is_liquid(&self) -> bool {
        !self.liquids.is_empty()
    }

    /// Sum of all numeric port flows. Zero for a passthrough part.
    pub fn net_flow(&self) -> Fixed64 {
        self.ports
            .values()
            .filter_map(|f| f.value())
            .fold(Fixed64::ZERO, |acc, v| acc.saturating_add(v))
    }

    /// Sum of the outward flows.
    pub fn throughput(&self) -> Fixed64 {
        self.ports
            .values()
            .filter_map(|f| f.value())
            .filter(|v| *v > Fixed64::ZERO)
            .fold(Fixed64::ZERO, |acc, v| acc.saturating_add(v))
    }

    /// Port flows keyed by the part's unrotated local directions.
    pub fn local_flows(&self, orientation: Orientation) -> BTreeMap<Direction, PortFlow> {
        self.ports
            .iter()
            .map(|(&dir, &flow)| (orientation.invert(dir), flow))
            .collect()
    }
}

/// Flow annotations for a whole snapshot, keyed by part id.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FlowResult {
    parts: BTreeMap<PartId, PartFlow>,
}

impl FlowResult {
    pub(crate) fn from_parts(parts: BTreeMap<PartId, PartFlow>) -> Self {
        Self { parts }
    }

    pub fn get(&self, id: &PartId) -> Option<&PartFlow> {
        self.parts.get(id)
    }

    /// Lookup by id string.
    pub fn part(&self, id: &str) -> Option<&PartFlow> {
        self.parts.get(&PartId::new(id))
    }

    pub fn iter(&self) -> impl Iterator<Item = (&PartId, &PartFlow)> {
        self.parts.iter()
    }

    pub fn len(&self) -> usize {
        self.parts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.parts.is_empty()
    }

    /// Ids of parts with at least one conflicting port.
    pub fn conflicts(&self) -> impl Iterator<Item = &PartId> {
        self.parts
            .iter()
            .filter(|(_, flow)| flow.conflict)
            .map(|(id, _)| id)
    }

    pub fn has_conflicts(&self) -> bool {
        self.parts.values().any(|flow| flow.conflict)
    }

    /// Ids of parts carrying any flow.
    pub fn flowing(&self) -> impl Iterator<Item = &PartId> {
        self.parts
            .iter()
            .filter(|(_, flow)| flow.flowing)
            .map(|(id, _)| id)
    }

    /// Sum of outward flow over every port of every part.
    pub fn total_flow(&self) -> Fixed64 {
        self.parts
            .values()
            .fold(Fixed64::ZERO, |acc, flow| acc.saturating_add(flow.throughput()))
    }
}
