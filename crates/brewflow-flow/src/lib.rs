//! Flow Engine for the process view.
//!
//! Computes, for a snapshot of placed parts, the signed flow through every
//! connection point. The computation is a pure function of the snapshot and
//! the descriptor registry: nothing is mutated, nothing is cached unless the
//! caller goes through [`FlowCache`].
//!
//! # Design
//!
//! - Adjacency is rebuilt per call by [`brewflow_spatial::PipeGrid`].
//! - Every running source (enabled, nonzero pressure) runs two waves in input
//!   order: a push wave from its outlets and a draw wave from its intakes.
//! - A wave is a depth-first DAG over channel segments. Links back into the
//!   search path are dropped, so cycles terminate; branches that rejoin a
//!   draining segment downstream keep their flow.
//! - Only branches that reach a terminal (open end, sink, reservoir, or the
//!   source's own intake) receive flow. Dead ends and closed valves stay zero.
//! - A source's two waves are netted per port, then sources superpose. A port
//!   seeing flow in both directions from different sources, or a link where
//!   a blocked source meets an opposing one, is reported as a conflict.
//!
//! # Example
//!
//! ```rust,ignore
//! let engine = FlowEngine::new(registry);
//! let result = engine.compute(&parts)?;
//! let tee = result.part("tee").unwrap();
//! assert_eq!(tee.flow(Direction::East), Some(Fixed64::from_num(5)));
//! ```

mod cache;
mod ledger;
mod network;
mod result;
mod wave;

pub use cache::FlowCache;
pub use result::{FlowResult, PartFlow, PortFlow};

use std::collections::BTreeSet;

use brewflow_core::fixed::{Fixed64, f64_to_fixed64};
use brewflow_core::part::Part;
use brewflow_core::registry::Registry;
use brewflow_spatial::{PipeGrid, SpatialError};
use serde::{Deserialize, Serialize};

use crate::ledger::{Ledger, SourceTally};
use crate::network::{Network, SourceState, WaveDirection, configured_liquids};
use crate::wave::{SplitWeights, TerminalFilter, Wave};

// ---------------------------------------------------------------------------
// Configuration
// ---------------------------------------------------------------------------

/// How flow entering a segment is divided among its draining branches.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SplitPolicy {
    /// Same share for every branch.
    #[default]
    Equal,
    /// Weighted by the inverse friction of the next part downstream.
    Conductance,
}

/// Engine tuning. Loaded from `engine.{ron,toml,json}` by `brewflow-data`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FlowConfig {
    pub split_policy: SplitPolicy,
    /// Friction assumed past an open end under [`SplitPolicy::Conductance`].
    pub spill_friction: f64,
    /// Snapshots remembered by [`FlowCache`]. Zero disables caching.
    pub cache_capacity: usize,
}

impl Default for FlowConfig {
    fn default() -> Self {
        Self {
            split_policy: SplitPolicy::Equal,
            spill_friction: 1.0,
            cache_capacity: 16,
        }
    }
}

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum FlowError {
    #[error(transparent)]
    Spatial(#[from] SpatialError),
    #[error("spill friction must be positive, got {0}")]
    InvalidSpillFriction(f64),
}

// ---------------------------------------------------------------------------
// Engine
// ---------------------------------------------------------------------------

/// Stateless flow solver over a frozen descriptor registry.
#[derive(Debug, Clone)]
pub struct FlowEngine {
    registry: Registry,
    config: FlowConfig,
    weights: SplitWeights,
}

impl FlowEngine {
    /// Engine with the default configuration.
    pub fn new(registry: Registry) -> Self {
        Self {
            registry,
            config: FlowConfig::default(),
            weights: SplitWeights {
                policy: SplitPolicy::Equal,
                spill_friction: Fixed64::ONE,
            },
        }
    }

    pub fn with_config(registry: Registry, config: FlowConfig) -> Result<Self, FlowError> {
        if !config.spill_friction.is_finite() || config.spill_friction <= 0.0 {
            return Err(FlowError::InvalidSpillFriction(config.spill_friction));
        }
        let spill_friction = f64_to_fixed64(config.spill_friction);
        if spill_friction <= Fixed64::ZERO {
            return Err(FlowError::InvalidSpillFriction(config.spill_friction));
        }
        Ok(Self {
            registry,
            weights: SplitWeights {
                policy: config.split_policy,
                spill_friction,
            },
            config,
        })
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    pub fn config(&self) -> &FlowConfig {
        &self.config
    }

    /// Compute flow for a part snapshot.
    ///
    /// Fails if a part has an unknown type, two parts share a cell, or an id
    /// repeats. Conflicts are not errors; they are reported in the result.
    pub fn compute(&self, parts: &[Part]) -> Result<FlowResult, FlowError> {
        let grid = PipeGrid::build(&self.registry, parts)?;
        let net = Network::new(&grid);
        let mut ledger = Ledger::new(&grid);

        tracing::debug!(
            parts = parts.len(),
            sources = net.sources.iter().flatten().count(),
            "computing flow"
        );

        for (index, state) in net.sources.iter().enumerate() {
            if let Some(state) = state {
                self.run_source(&net, index, state, &mut ledger);
            }
        }

        let result = ledger.into_result(&grid);
        if result.has_conflicts() {
            tracing::warn!(
                conflicts = result.conflicts().count(),
                "flow computed with conflicts"
            );
        }
        Ok(result)
    }

    fn run_source(
        &self,
        net: &Network<'_, '_>,
        source: usize,
        state: &SourceState,
        ledger: &mut Ledger,
    ) {
        let id = &net.grid.part(source).part.id;
        let draw = state
            .has_intake
            .then(|| Wave::explore(net, source, WaveDirection::Draw, TerminalFilter::All));

        // Without supply at the intake, the only way out is back around.
        let supplied = draw.as_ref().is_none_or(Wave::drains);
        let push = Wave::explore(
            net,
            source,
            WaveDirection::Push,
            if supplied {
                TerminalFilter::All
            } else {
                TerminalFilter::CirculationOnly
            },
        );

        if !push.drains() {
            let mut contested = push.collisions().to_vec();
            if let (false, Some(draw)) = (supplied, draw.as_ref()) {
                contested.extend_from_slice(draw.collisions());
            }
            if contested.is_empty() {
                tracing::debug!(source = %id, supplied, "source idle: no way out");
            } else {
                tracing::warn!(source = %id, links = contested.len(), "source blocked by opposing source");
                ledger.flag_conflicts(&contested);
            }
            return;
        }

        let drawn: BTreeSet<String> = match (supplied, draw.as_ref()) {
            (true, Some(draw)) => draw
                .draining_boundaries()
                .into_iter()
                .flat_map(|b| configured_liquids(net.grid.part(b)))
                .collect(),
            _ => BTreeSet::new(),
        };
        let mut carried = state.liquids.clone();
        carried.extend(drawn.iter().cloned());

        let mut tally = SourceTally::new(net.grid);
        let circulated = push.distribute(net, state.flow, &self.weights, &carried, &mut tally);
        let remaining = state.flow - circulated;
        if let (true, Some(draw)) = (supplied, draw.as_ref()) {
            if remaining > Fixed64::ZERO {
                draw.distribute(net, remaining, &self.weights, &drawn, &mut tally);
            }
        }
        ledger.merge(tally);

        tracing::trace!(
            source = %id,
            flow = %state.flow,
            circulated = %circulated,
            push_segments = push.segment_count(),
            draw_segments = draw.as_ref().map_or(0, |d| d.segment_count()),
            "source wave done"
        );
    }
}
