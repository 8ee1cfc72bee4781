//! Per-computation view of the layout: which parts are live sources, and what
//! happens when a wave crosses into a port.

use std::collections::BTreeSet;

use brewflow_core::fixed::Fixed64;
use brewflow_core::part::keys;
use brewflow_core::registry::{PartBehavior, PortKind};
use brewflow_spatial::{PipeGrid, PlacedPart};

/// Which side of a source a wave explores.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum WaveDirection {
    /// Downstream from the source's outlets.
    Push,
    /// Upstream from the source's intakes.
    Draw,
}

impl WaveDirection {
    /// The port kind a wave of this direction starts from.
    pub(crate) fn start_kind(self) -> PortKind {
        match self {
            WaveDirection::Push => PortKind::Outlet,
            WaveDirection::Draw => PortKind::Intake,
        }
    }
}

/// Outcome of a wave crossing a link into a port.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Entry {
    /// Keep routing through the entered part's channel.
    Continue,
    /// A boundary: sinks and reservoirs on push, supplies on draw.
    Absorb,
    /// The wave came back around into its own source's intake.
    Circulate,
    /// Nothing passes (closed valve, own outlet, sink on draw).
    Blocked,
    /// Head-on with another running source.
    Collision,
}

/// Resolved state of one source part.
#[derive(Debug, Clone)]
pub(crate) struct SourceState {
    /// Flow injected when running: pressure over friction.
    pub flow: Fixed64,
    pub liquids: BTreeSet<String>,
    pub has_intake: bool,
}

/// Read a source's enabled flag, pressure and liquids from its settings.
/// Returns `None` for non-sources and for sources that are stopped.
pub(crate) fn resolve_source(placed: &PlacedPart<'_>) -> Option<SourceState> {
    let spec = placed.def.behavior.pressure()?;
    if !placed.part.setting_bool(keys::ENABLED).unwrap_or(true) {
        return None;
    }
    let pressure = spec.resolve(placed.part.setting_fixed(keys::PRESSURE));
    let flow = pressure.checked_div(placed.def.friction)?;
    if flow <= Fixed64::ZERO {
        return None;
    }
    Some(SourceState {
        flow,
        liquids: configured_liquids(placed),
        has_intake: placed.ports().iter().any(|p| p.kind == PortKind::Intake),
    })
}

/// Liquids set on the part, falling back to the descriptor's defaults.
pub(crate) fn configured_liquids(placed: &PlacedPart<'_>) -> BTreeSet<String> {
    let from_settings = placed.part.setting_list(keys::LIQUIDS);
    if from_settings.is_empty() {
        placed.def.liquids.iter().cloned().collect()
    } else {
        from_settings.into_iter().collect()
    }
}

/// The grid plus the set of running sources.
pub(crate) struct Network<'g, 'a> {
    pub grid: &'g PipeGrid<'a>,
    pub sources: Vec<Option<SourceState>>,
}

impl<'g, 'a> Network<'g, 'a> {
    pub(crate) fn new(grid: &'g PipeGrid<'a>) -> Self {
        let sources = grid.parts().iter().map(resolve_source).collect();
        Self { grid, sources }
    }

    fn is_running(&self, part: usize) -> bool {
        self.sources[part].is_some()
    }

    /// Decide what a wave started at `source` does when it enters `port` of
    /// `part`.
    pub(crate) fn enter(
        &self,
        part: usize,
        port: usize,
        direction: WaveDirection,
        source: usize,
    ) -> Entry {
        let placed = self.grid.part(part);
        let kind = placed.ports()[port].kind;
        let boundary = matches!(placed.def.behavior, PartBehavior::Inlet(_));

        match (direction, kind) {
            (_, PortKind::Passthrough) => {
                if placed.def.behavior == PartBehavior::Valve && placed.part.closed {
                    Entry::Blocked
                } else {
                    Entry::Continue
                }
            }
            (_, PortKind::Reservoir) | (WaveDirection::Push, PortKind::Sink) => Entry::Absorb,
            (WaveDirection::Draw, PortKind::Sink) => Entry::Blocked,

            (WaveDirection::Push, PortKind::Intake) if part == source => Entry::Circulate,
            (WaveDirection::Push, PortKind::Intake) => Entry::Continue,
            (WaveDirection::Push, PortKind::Outlet) if part == source => Entry::Blocked,
            (WaveDirection::Push, PortKind::Outlet) if self.is_running(part) => Entry::Collision,
            (WaveDirection::Push, PortKind::Outlet) if boundary => Entry::Absorb,
            (WaveDirection::Push, PortKind::Outlet) => Entry::Continue,

            (WaveDirection::Draw, PortKind::Outlet) if part == source => Entry::Blocked,
            (WaveDirection::Draw, PortKind::Outlet) if boundary => Entry::Absorb,
            (WaveDirection::Draw, PortKind::Outlet) => Entry::Continue,
            (WaveDirection::Draw, PortKind::Intake) if part == source => Entry::Blocked,
            (WaveDirection::Draw, PortKind::Intake) if self.is_running(part) => Entry::Collision,
            (WaveDirection::Draw, PortKind::Intake) => Entry::Continue,
        }
    }
}
