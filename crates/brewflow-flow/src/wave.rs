//! Wave propagation from one source.
//!
//! A wave is a depth-first search over channel segments `(part, channel)`
//! starting at a source's outlets (push) or intakes (draw). A segment is
//! entered through one port and may leave through any other port of its
//! channel. Only branches that reach a terminal are kept:
//!
//! - a link back into a segment still on the search path is rejected, so
//!   cycles terminate;
//! - a link into a segment already known to drain is kept, so parallel
//!   branches that rejoin downstream both carry flow;
//! - a segment that fails only because it ran into the search path is
//!   forgotten and may be explored again from another side. A segment that
//!   fails on its own is dead for the rest of the wave.
//!
//! Kept edges always point at segments that finished earlier, so the result
//! is a DAG and flow is pushed through it in reverse finishing order.

use std::collections::{BTreeSet, HashMap};

use brewflow_core::fixed::Fixed64;
use brewflow_spatial::PortLink;

use crate::SplitPolicy;
use crate::ledger::SourceTally;
use crate::network::{Entry, Network, WaveDirection};

/// `(part index, port index)`.
pub(crate) type PortRef = (usize, usize);

/// Where an edge ends when it does not continue into another segment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Terminal {
    /// Unconnected port: flow spills out (push) or is drawn in (draw).
    Open,
    /// Port of a sink, reservoir or boundary inlet.
    Boundary { part: usize, port: usize },
    /// The source's own intake, reached by its push wave.
    Circulation { port: usize },
}

#[derive(Debug, Clone, Copy)]
enum Target {
    Segment { node: usize, port: usize },
    Terminal(Terminal),
}

#[derive(Debug, Clone)]
struct Edge {
    /// Port of the segment's part the edge leaves through.
    port: usize,
    target: Target,
}

/// A draining segment.
#[derive(Debug, Clone)]
struct Node {
    part: usize,
    edges: Vec<Edge>,
}

/// Which terminals count as a way out.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum TerminalFilter {
    All,
    /// Only the source's own intake. Used when the intake has no supply.
    CirculationOnly,
}

impl TerminalFilter {
    fn accepts(self, terminal: Terminal) -> bool {
        match self {
            TerminalFilter::All => true,
            TerminalFilter::CirculationOnly => matches!(terminal, Terminal::Circulation { .. }),
        }
    }
}

/// Split weights for the branches leaving a segment.
#[derive(Debug, Clone)]
pub(crate) struct SplitWeights {
    pub policy: SplitPolicy,
    pub spill_friction: Fixed64,
}

#[derive(Debug, Clone, Copy)]
enum Visit {
    /// On the search path at this depth.
    Active(usize),
    Drains(usize),
    Dead,
}

/// One segment on the search path.
struct Frame {
    part: usize,
    channel: usize,
    /// Own entry port and the parent's port it was reached from. `None` for
    /// the source.
    entry: Option<(usize, usize)>,
    ports: Vec<usize>,
    next: usize,
    edges: Vec<Edge>,
    /// Shallowest depth of a rejected link into the search path.
    low: Option<usize>,
}

impl Frame {
    fn touch(&mut self, depth: usize) {
        self.low = Some(self.low.map_or(depth, |low| low.min(depth)));
    }
}

/// Outcome of following one port of the current segment.
enum Step {
    Skip,
    Touch(usize),
    Edge(Target),
    Descend { part: usize, channel: usize, port: usize },
}

/// The explored DAG of one wave.
#[derive(Debug, Clone)]
pub(crate) struct Wave {
    direction: WaveDirection,
    source: usize,
    /// Draining segments in finishing order; the source, if it drains, is
    /// last.
    nodes: Vec<Node>,
    /// Links where the wave ran head-on into another running source.
    collisions: Vec<(PortRef, PortRef)>,
    drains: bool,
}

impl Wave {
    pub(crate) fn explore(
        net: &Network<'_, '_>,
        source: usize,
        direction: WaveDirection,
        filter: TerminalFilter,
    ) -> Self {
        let grid = net.grid;
        let start = direction.start_kind();
        let mut visits: HashMap<(usize, usize), Visit> = HashMap::new();
        let mut nodes = Vec::new();
        let mut collisions = Vec::new();
        let mut drains = false;
        let mut stack = vec![Frame {
            part: source,
            channel: 0,
            entry: None,
            ports: grid
                .part(source)
                .ports()
                .iter()
                .enumerate()
                .filter(|(_, p)| p.kind == start)
                .map(|(i, _)| i)
                .collect(),
            next: 0,
            edges: Vec::new(),
            low: None,
        }];

        loop {
            let depth = stack.len();
            let Some(frame) = stack.last_mut() else {
                break;
            };

            let Some(&port) = frame.ports.get(frame.next) else {
                let Some(done) = stack.pop() else {
                    break;
                };
                let depth = depth - 1;
                let node = (!done.edges.is_empty()).then(|| {
                    nodes.push(Node {
                        part: done.part,
                        edges: done.edges,
                    });
                    nodes.len() - 1
                });
                let Some((entry, from)) = done.entry else {
                    drains = node.is_some();
                    continue;
                };
                let key = (done.part, done.channel);
                let outside = done.low.filter(|&d| d < depth);
                match node {
                    Some(n) => {
                        visits.insert(key, Visit::Drains(n));
                    }
                    None if outside.is_none() => {
                        visits.insert(key, Visit::Dead);
                    }
                    None => {
                        visits.remove(&key);
                    }
                }
                if let Some(parent) = stack.last_mut() {
                    if let Some(node) = node {
                        parent.edges.push(Edge {
                            port: from,
                            target: Target::Segment { node, port: entry },
                        });
                    }
                    if let Some(d) = outside {
                        parent.touch(d);
                    }
                }
                continue;
            };
            frame.next += 1;

            let step = match grid.link(frame.part, port) {
                PortLink::Open => Step::Edge(Target::Terminal(Terminal::Open)),
                PortLink::Linked { part: j, port: b } => match net.enter(j, b, direction, source) {
                    Entry::Blocked => Step::Skip,
                    Entry::Collision => {
                        let link = ((frame.part, port), (j, b));
                        if !collisions.contains(&link) {
                            collisions.push(link);
                        }
                        Step::Skip
                    }
                    Entry::Absorb => Step::Edge(Target::Terminal(Terminal::Boundary { part: j, port: b })),
                    Entry::Circulate => Step::Edge(Target::Terminal(Terminal::Circulation { port: b })),
                    Entry::Continue => {
                        let channel = grid.part(j).ports()[b].channel;
                        match visits.get(&(j, channel)).copied() {
                            Some(Visit::Active(d)) => Step::Touch(d),
                            Some(Visit::Drains(node)) => Step::Edge(Target::Segment { node, port: b }),
                            Some(Visit::Dead) => Step::Skip,
                            None => Step::Descend { part: j, channel, port: b },
                        }
                    }
                },
            };

            match step {
                Step::Skip => {}
                Step::Touch(d) => frame.touch(d),
                Step::Edge(Target::Terminal(terminal)) if !filter.accepts(terminal) => {}
                Step::Edge(target) => frame.edges.push(Edge { port, target }),
                Step::Descend { part, channel, port: entry } => {
                    visits.insert((part, channel), Visit::Active(depth));
                    let ports = grid
                        .part(part)
                        .geometry
                        .channel_ports(channel)
                        .filter(|p| *p != entry)
                        .collect();
                    stack.push(Frame {
                        part,
                        channel,
                        entry: Some((entry, port)),
                        ports,
                        next: 0,
                        edges: Vec::new(),
                        low: None,
                    });
                }
            }
        }

        Self {
            direction,
            source,
            nodes,
            collisions,
            drains,
        }
    }

    pub(crate) fn collisions(&self) -> &[(PortRef, PortRef)] {
        &self.collisions
    }

    /// Segments that carry flow, the source included.
    pub(crate) fn segment_count(&self) -> usize {
        self.nodes.len()
    }

    /// Whether the source itself can move anything.
    pub(crate) fn drains(&self) -> bool {
        self.drains
    }

    /// Boundaries this wave ends at.
    pub(crate) fn draining_boundaries(&self) -> Vec<usize> {
        let mut parts = Vec::new();
        for node in &self.nodes {
            for edge in &node.edges {
                if let Target::Terminal(Terminal::Boundary { part, .. }) = edge.target {
                    if !parts.contains(&part) {
                        parts.push(part);
                    }
                }
            }
        }
        parts
    }

    /// Route `amount` through the draining branches, recording every port
    /// crossed in the source's tally. Returns the amount that came back
    /// around into the source's own intake.
    pub(crate) fn distribute(
        &self,
        net: &Network<'_, '_>,
        amount: Fixed64,
        weights: &SplitWeights,
        liquids: &BTreeSet<String>,
        tally: &mut SourceTally,
    ) -> Fixed64 {
        let mut circulated = Fixed64::ZERO;
        let Some(root) = self.nodes.len().checked_sub(1).filter(|_| self.drains) else {
            return circulated;
        };
        let push = self.direction == WaveDirection::Push;
        let mut inflow = vec![Fixed64::ZERO; self.nodes.len()];
        inflow[root] = amount;

        // Reverse finishing order visits every parent before its children.
        for (n, node) in self.nodes.iter().enumerate().rev() {
            let total = inflow[n];
            if total <= Fixed64::ZERO {
                continue;
            }
            tally.add_liquids(node.part, liquids);

            let shares = split(
                total,
                &node
                    .edges
                    .iter()
                    .map(|e| self.branch_weight(net, node.part, e, weights))
                    .collect::<Vec<_>>(),
            );

            for (edge, share) in node.edges.iter().zip(shares) {
                if share == Fixed64::ZERO {
                    continue;
                }
                // Push: leaving the segment is outward. Draw reverses it.
                tally.record(node.part, edge.port, share, push);
                match edge.target {
                    Target::Segment { node: child, port } => {
                        tally.record(self.nodes[child].part, port, share, !push);
                        inflow[child] = inflow[child].saturating_add(share);
                    }
                    Target::Terminal(Terminal::Open) => {}
                    Target::Terminal(Terminal::Boundary { part, port }) => {
                        tally.record(part, port, share, !push);
                        tally.add_liquids(part, liquids);
                    }
                    Target::Terminal(Terminal::Circulation { port }) => {
                        tally.record(self.source, port, share, !push);
                        circulated = circulated.saturating_add(share);
                    }
                }
            }
        }
        circulated
    }

    fn branch_weight(
        &self,
        net: &Network<'_, '_>,
        from: usize,
        edge: &Edge,
        weights: &SplitWeights,
    ) -> Fixed64 {
        if weights.policy == SplitPolicy::Equal {
            return Fixed64::ONE;
        }
        let friction = match edge.target {
            Target::Segment { node, .. } => net.grid.part(self.nodes[node].part).def.friction,
            Target::Terminal(Terminal::Open) => weights.spill_friction,
            Target::Terminal(Terminal::Boundary { part, .. }) => net.grid.part(part).def.friction,
            Target::Terminal(Terminal::Circulation { .. }) => net.grid.part(from).def.friction,
        };
        Fixed64::ONE.checked_div(friction).unwrap_or(Fixed64::ONE)
    }
}

/// Split `total` by `weights`. The last share takes the rounding remainder,
/// so the shares always sum to `total`.
pub(crate) fn split(total: Fixed64, weights: &[Fixed64]) -> Vec<Fixed64> {
    let Some(last) = weights.len().checked_sub(1) else {
        return Vec::new();
    };
    let sum = weights
        .iter()
        .fold(Fixed64::ZERO, |acc, w| acc.saturating_add(*w));
    let mut shares = Vec::with_capacity(weights.len());
    let mut given = Fixed64::ZERO;
    for (i, weight) in weights.iter().enumerate() {
        let share = if i == last {
            total - given
        } else {
            total
                .checked_mul(*weight)
                .and_then(|x| x.checked_div(sum))
                .or_else(|| total.checked_div(Fixed64::from_num(weights.len())))
                .unwrap_or(Fixed64::ZERO)
        };
        given += share;
        shares.push(share);
    }
    shares
}
