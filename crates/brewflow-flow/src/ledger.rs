//! Per-port accumulators: a tally per source, and the ledger that
//! superposes them for one computation.

use std::collections::{BTreeMap, BTreeSet};

use brewflow_core::fixed::Fixed64;
use brewflow_spatial::PipeGrid;

use crate::result::{FlowResult, PartFlow, PortFlow};
use crate::wave::PortRef;

#[derive(Debug, Clone, Copy, Default)]
struct PortTally {
    outward: Fixed64,
    inward: Fixed64,
    conflict: bool,
}

/// Signed per-port flow of one source's push and draw waves.
#[derive(Debug, Clone)]
pub(crate) struct SourceTally {
    ports: Vec<Vec<Fixed64>>,
    liquids: Vec<BTreeSet<String>>,
}

impl SourceTally {
    pub(crate) fn new(grid: &PipeGrid<'_>) -> Self {
        Self {
            ports: grid
                .parts()
                .iter()
                .map(|p| vec![Fixed64::ZERO; p.ports().len()])
                .collect(),
            liquids: vec![BTreeSet::new(); grid.len()],
        }
    }

    pub(crate) fn record(&mut self, part: usize, port: usize, amount: Fixed64, outward: bool) {
        let value = &mut self.ports[part][port];
        *value = if outward {
            value.saturating_add(amount)
        } else {
            value.saturating_sub(amount)
        };
    }

    pub(crate) fn add_liquids(&mut self, part: usize, liquids: &BTreeSet<String>) {
        self.liquids[part].extend(liquids.iter().cloned());
    }
}

/// Superposition of all sources. Each source arrives already netted, so a
/// port that sees both directions means two sources disagree.
#[derive(Debug, Clone)]
pub(crate) struct Ledger {
    ports: Vec<Vec<PortTally>>,
    liquids: Vec<BTreeSet<String>>,
}

impl Ledger {
    pub(crate) fn new(grid: &PipeGrid<'_>) -> Self {
        Self {
            ports: grid
                .parts()
                .iter()
                .map(|p| vec![PortTally::default(); p.ports().len()])
                .collect(),
            liquids: vec![BTreeSet::new(); grid.len()],
        }
    }

    pub(crate) fn merge(&mut self, source: SourceTally) {
        for (tallies, values) in self.ports.iter_mut().zip(source.ports) {
            for (tally, value) in tallies.iter_mut().zip(values) {
                if value > Fixed64::ZERO {
                    tally.outward = tally.outward.saturating_add(value);
                } else if value < Fixed64::ZERO {
                    tally.inward = tally.inward.saturating_add(value.saturating_neg());
                }
            }
        }
        for (liquids, added) in self.liquids.iter_mut().zip(source.liquids) {
            liquids.extend(added);
        }
    }

    /// Flag both ends of every contested link.
    pub(crate) fn flag_conflicts(&mut self, links: &[(PortRef, PortRef)]) {
        for &((a, pa), (b, pb)) in links {
            self.ports[a][pa].conflict = true;
            self.ports[b][pb].conflict = true;
        }
    }

    pub(crate) fn into_result(self, grid: &PipeGrid<'_>) -> FlowResult {
        let mut parts = BTreeMap::new();
        for ((placed, tallies), liquids) in grid.parts().iter().zip(self.ports).zip(self.liquids) {
            let mut flow = PartFlow::default();
            for (port, tally) in placed.ports().iter().zip(tallies) {
                let reversed = tally.outward > Fixed64::ZERO && tally.inward > Fixed64::ZERO;
                let value = if tally.conflict || reversed {
                    PortFlow::Conflict
                } else {
                    PortFlow::Flow(tally.outward - tally.inward)
                };
                flow.conflict |= value.is_conflict();
                flow.flowing |= matches!(value, PortFlow::Flow(v) if v != Fixed64::ZERO);
                flow.ports.insert(port.direction, value);
            }
            // Liquid only shows where something moves.
            if flow.flowing {
                flow.liquids = liquids;
            }
            parts.insert(placed.part.id.clone(), flow);
        }
        FlowResult::from_parts(parts)
    }
}
