//! Spatial grid module: occupancy and port adjacency for a part snapshot.
//!
//! The layout editor stores parts as a flat list with positions; nothing in
//! the application keeps an adjacency structure. [`PipeGrid`] rebuilds one
//! for each computation: it indexes parts by cell and links every port to the
//! facing port of the neighboring cell, if there is one.

use std::collections::{BTreeMap, BTreeSet};

use brewflow_core::geometry::{Direction, GridPosition};
use brewflow_core::id::{PartId, PartTypeId};
use brewflow_core::part::Part;
use brewflow_core::registry::{OrientedGeometry, OrientedPort, PartTypeDef, Registry};

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

/// What lies across one port of a placed part.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PortLink {
    /// No facing port on the neighboring cell (or no neighbor at all).
    Open,
    /// Connected to `port` of the part at snapshot index `part`.
    Linked { part: usize, port: usize },
}

/// A part resolved against the registry and placed on the grid.
#[derive(Debug)]
pub struct PlacedPart<'a> {
    /// Index of the part in the input snapshot.
    pub index: usize,
    pub part: &'a Part,
    pub type_id: PartTypeId,
    pub def: &'a PartTypeDef,
    pub geometry: &'a OrientedGeometry,
    /// One entry per port, in descriptor order.
    pub links: Vec<PortLink>,
}

impl PlacedPart<'_> {
    pub fn ports(&self) -> &[OrientedPort] {
        self.geometry.ports()
    }
}

/// Errors from building the grid out of a snapshot.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SpatialError {
    #[error("part '{part}' has unknown type '{part_type}'")]
    UnknownPartType { part: PartId, part_type: String },
    #[error("parts '{first}' and '{second}' both occupy {position}")]
    Occupied {
        position: GridPosition,
        first: PartId,
        second: PartId,
    },
    #[error("part id '{0}' is used more than once")]
    DuplicateId(PartId),
}

// ---------------------------------------------------------------------------
// PipeGrid
// ---------------------------------------------------------------------------

/// Occupancy index plus port links for one part snapshot.
///
/// Maintains:
/// - `cells`: position -> snapshot index
/// - per part, per port: the [`PortLink`] across that port
#[derive(Debug)]
pub struct PipeGrid<'a> {
    parts: Vec<PlacedPart<'a>>,
    cells: BTreeMap<GridPosition, usize>,
}

impl<'a> PipeGrid<'a> {
    /// Resolve every part and link facing ports.
    ///
    /// Fails on the first part whose type is not in the registry, on two parts
    /// sharing a cell, and on duplicate part ids.
    pub fn build(registry: &'a Registry, parts: &'a [Part]) -> Result<Self, SpatialError> {
        let mut placed = Vec::with_capacity(parts.len());
        let mut cells: BTreeMap<GridPosition, usize> = BTreeMap::new();
        let mut ids = BTreeSet::new();

        for (index, part) in parts.iter().enumerate() {
            let type_id =
                registry
                    .resolve(&part.part_type)
                    .ok_or_else(|| SpatialError::UnknownPartType {
                        part: part.id.clone(),
                        part_type: part.part_type.clone(),
                    })?;
            // Resolved ids always have a definition and all eight orientations.
            let (Some(def), Some(geometry)) = (
                registry.get_type(type_id),
                registry.geometry(type_id, part.orientation()),
            ) else {
                return Err(SpatialError::UnknownPartType {
                    part: part.id.clone(),
                    part_type: part.part_type.clone(),
                });
            };

            if !ids.insert(&part.id) {
                return Err(SpatialError::DuplicateId(part.id.clone()));
            }
            if let Some(&other) = cells.get(&part.position) {
                return Err(SpatialError::Occupied {
                    position: part.position,
                    first: parts[other].id.clone(),
                    second: part.id.clone(),
                });
            }
            cells.insert(part.position, index);

            placed.push(PlacedPart {
                index,
                part,
                type_id,
                def,
                geometry,
                links: vec![PortLink::Open; geometry.ports().len()],
            });
        }

        let mut grid = Self {
            parts: placed,
            cells,
        };
        grid.link_ports();

        tracing::trace!(
            parts = grid.parts.len(),
            connections = grid.connection_count(),
            "pipe grid built"
        );
        Ok(grid)
    }

    fn link_ports(&mut self) {
        for i in 0..self.parts.len() {
            let position = self.parts[i].part.position;
            for port in 0..self.parts[i].links.len() {
                let direction = self.parts[i].geometry.ports()[port].direction;
                let Some(&j) = self.cells.get(&position.step(direction)) else {
                    continue;
                };
                if let Some(facing) = self.parts[j].geometry.port_toward(direction.opposite()) {
                    self.parts[i].links[port] = PortLink::Linked {
                        part: j,
                        port: facing,
                    };
                }
            }
        }
    }

    // -- Point queries --

    pub fn len(&self) -> usize {
        self.parts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.parts.is_empty()
    }

    pub fn part(&self, index: usize) -> &PlacedPart<'a> {
        &self.parts[index]
    }

    pub fn parts(&self) -> &[PlacedPart<'a>] {
        &self.parts
    }

    /// Snapshot index of the part at a grid position.
    pub fn index_at(&self, pos: GridPosition) -> Option<usize> {
        self.cells.get(&pos).copied()
    }

    /// The link across a port.
    pub fn link(&self, part: usize, port: usize) -> PortLink {
        self.parts[part].links[port]
    }

    // -- Adjacency --

    /// Connected neighbors of a part, one entry per linked port.
    pub fn neighbors_4(&self, part: usize) -> Vec<(Direction, usize)> {
        let placed = &self.parts[part];
        placed
            .links
            .iter()
            .zip(placed.ports())
            .filter_map(|(link, port)| match link {
                PortLink::Linked { part, .. } => Some((port.direction, *part)),
                PortLink::Open => None,
            })
            .collect()
    }

    /// Number of bidirectional connections.
    pub fn connection_count(&self) -> usize {
        let linked: usize = self
            .parts
            .iter()
            .map(|p| p.links.iter().filter(|l| matches!(l, PortLink::Linked { .. })).count())
            .sum();
        linked / 2
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use brewflow_core::test_utils::*;

    #[test]
    fn straight_run_links_both_ways() {
        let reg = standard_registry();
        let parts = vec![
            straight("a", 0, 0, 0),
            straight("b", 1, 0, 0),
            straight("c", 2, 0, 0),
        ];
        let grid = PipeGrid::build(&reg, &parts).unwrap();

        assert_eq!(grid.connection_count(), 2);
        // a.east (port 1) <-> b.west (port 0)
        assert_eq!(grid.link(0, 1), PortLink::Linked { part: 1, port: 0 });
        assert_eq!(grid.link(1, 0), PortLink::Linked { part: 0, port: 1 });
        assert_eq!(grid.link(0, 0), PortLink::Open);
        assert_eq!(grid.link(2, 1), PortLink::Open);
    }

    #[test]
    fn adjacent_cells_without_facing_ports_stay_open() {
        let reg = standard_registry();
        // Vertical straight next to a horizontal one: b faces north/south.
        let parts = vec![straight("a", 0, 0, 0), straight("b", 1, 0, 90)];
        let grid = PipeGrid::build(&reg, &parts).unwrap();
        assert_eq!(grid.connection_count(), 0);
        assert_eq!(grid.link(0, 1), PortLink::Open);
    }

    #[test]
    fn rotation_decides_which_sides_link() {
        let reg = standard_registry();
        // Elbow at 270 degrees: local west -> south, local south -> east.
        let parts = vec![elbow("e", 0, 0, 270), straight("s", 1, 0, 0)];
        let grid = PipeGrid::build(&reg, &parts).unwrap();
        assert_eq!(grid.connection_count(), 1);
        assert_eq!(grid.neighbors_4(0), vec![(Direction::East, 1)]);
    }

    #[test]
    fn flipped_parts_mirror_their_ports() {
        let reg = standard_registry();
        // Flipped elbow exposes east and south instead of west and south.
        let parts = vec![elbow("e", 0, 0, 0).flipped(), straight("s", 1, 0, 0)];
        let grid = PipeGrid::build(&reg, &parts).unwrap();
        assert_eq!(grid.neighbors_4(0), vec![(Direction::East, 1)]);
    }

    #[test]
    fn unknown_type_names_the_part() {
        let reg = standard_registry();
        let parts = vec![straight("a", 0, 0, 0), Part::new("mystery", "Teapot", 1, 0)];
        let err = PipeGrid::build(&reg, &parts).unwrap_err();
        assert_eq!(
            err,
            SpatialError::UnknownPartType {
                part: PartId::new("mystery"),
                part_type: "Teapot".to_string(),
            }
        );
        assert!(err.to_string().contains("mystery"));
    }

    #[test]
    fn aliases_resolve_to_their_target() {
        let reg = standard_registry();
        let parts = vec![Part::new("k", "SmallKettle", 0, 0)];
        let grid = PipeGrid::build(&reg, &parts).unwrap();
        assert_eq!(Some(grid.part(0).type_id), reg.resolve(KETTLE));
    }

    #[test]
    fn overlapping_parts_are_rejected() {
        let reg = standard_registry();
        let parts = vec![straight("a", 0, 0, 0), elbow("b", 0, 0, 0)];
        assert!(matches!(
            PipeGrid::build(&reg, &parts),
            Err(SpatialError::Occupied { .. })
        ));
    }

    #[test]
    fn duplicate_ids_are_rejected() {
        let reg = standard_registry();
        let parts = vec![straight("a", 0, 0, 0), straight("a", 1, 0, 0)];
        assert_eq!(
            PipeGrid::build(&reg, &parts).unwrap_err(),
            SpatialError::DuplicateId(PartId::new("a"))
        );
    }

    #[test]
    fn portless_parts_occupy_cells_without_links() {
        let reg = standard_registry();
        let parts = vec![Part::new("sensor", SENSOR, 0, 0), straight("a", 1, 0, 0)];
        let grid = PipeGrid::build(&reg, &parts).unwrap();
        assert_eq!(grid.index_at(GridPosition::new(0, 0)), Some(0));
        assert!(grid.part(0).links.is_empty());
        assert_eq!(grid.link(1, 0), PortLink::Open);
    }

    #[test]
    fn empty_snapshot_builds_empty_grid() {
        let reg = standard_registry();
        let grid = PipeGrid::build(&reg, &[]).unwrap();
        assert!(grid.is_empty());
        assert_eq!(grid.connection_count(), 0);
    }
}
