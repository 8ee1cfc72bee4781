//! Part type descriptors and the frozen registry that indexes them.
//!
//! Descriptors are registered on a [`RegistryBuilder`], validated as a whole by
//! [`RegistryBuilder::build`], and frozen into a [`Registry`]. Building also
//! precomputes the absolute port geometry of every type under all eight
//! orientations, so the flow engine never does angle arithmetic while
//! traversing a layout.

use std::collections::HashMap;

use crate::fixed::Fixed64;
use crate::geometry::{Direction, Orientation};
use crate::id::PartTypeId;

/// Friction assigned to descriptors that do not declare one.
pub const DEFAULT_FRICTION: Fixed64 = Fixed64::ONE;

// ---------------------------------------------------------------------------
// Descriptor types
// ---------------------------------------------------------------------------

/// Role of a single connection point.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PortKind {
    /// Flow enters and leaves through the part's channel.
    Passthrough,
    /// A source pushes flow out here.
    Outlet,
    /// A source draws flow in here.
    Intake,
    /// Absorbs flow; never supplies it.
    Sink,
    /// Absorbs pushed flow and supplies drawn flow (kettles, kegs).
    Reservoir,
}

/// A connection point in the part's unrotated local frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PortDef {
    /// Degrees clockwise from up. Must be a multiple of 90.
    pub angle: i32,
    pub kind: PortKind,
}

impl PortDef {
    pub fn new(direction: Direction, kind: PortKind) -> Self {
        Self {
            angle: direction.degrees(),
            kind,
        }
    }

    pub fn at_angle(angle: i32, kind: PortKind) -> Self {
        Self { angle, kind }
    }
}

/// Pressure range of a source. Part settings are clamped into `[min, max]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PressureSpec {
    pub default: Fixed64,
    pub min: Fixed64,
    pub max: Fixed64,
}

impl PressureSpec {
    pub fn new(default: Fixed64, min: Fixed64, max: Fixed64) -> Self {
        Self { default, min, max }
    }

    /// Resolve a configured pressure (or the default) into the allowed range.
    pub fn resolve(&self, configured: Option<Fixed64>) -> Fixed64 {
        configured.unwrap_or(self.default).clamp(self.min, self.max)
    }
}

/// How a part type behaves in the flow network.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PartBehavior {
    /// Plain tubing: straight, elbow, tee, cross.
    Passthrough,
    /// Passthrough unless the placed part is closed.
    Valve,
    /// Source with an outlet and (usually) an intake.
    Pump(PressureSpec),
    /// System input boundary: outlet only, supplies liquid from outside.
    Inlet(PressureSpec),
    /// System output boundary.
    Sink,
    /// Vessel that both absorbs and supplies.
    Reservoir,
    /// Displays and sensors with no connection points.
    Blank,
}

impl PartBehavior {
    pub fn is_source(&self) -> bool {
        matches!(self, PartBehavior::Pump(_) | PartBehavior::Inlet(_))
    }

    pub fn pressure(&self) -> Option<&PressureSpec> {
        match self {
            PartBehavior::Pump(spec) | PartBehavior::Inlet(spec) => Some(spec),
            _ => None,
        }
    }

    fn allows(&self, kind: PortKind) -> bool {
        match self {
            PartBehavior::Passthrough | PartBehavior::Valve => kind == PortKind::Passthrough,
            PartBehavior::Pump(_) => matches!(kind, PortKind::Outlet | PortKind::Intake),
            PartBehavior::Inlet(_) => kind == PortKind::Outlet,
            PartBehavior::Sink => kind == PortKind::Sink,
            PartBehavior::Reservoir => kind == PortKind::Reservoir,
            PartBehavior::Blank => false,
        }
    }
}

/// Static description of one part type.
#[derive(Debug, Clone, PartialEq)]
pub struct PartTypeDef {
    pub name: String,
    pub behavior: PartBehavior,
    pub ports: Vec<PortDef>,
    /// Groups of port indices that exchange flow. Empty means a single
    /// channel holding every port.
    pub channels: Vec<Vec<usize>>,
    pub friction: Fixed64,
    /// Liquids a source or reservoir carries when its part has none configured.
    pub liquids: Vec<String>,
}

impl PartTypeDef {
    pub fn new(name: &str, behavior: PartBehavior) -> Self {
        Self {
            name: name.to_string(),
            behavior,
            ports: Vec::new(),
            channels: Vec::new(),
            friction: DEFAULT_FRICTION,
            liquids: Vec::new(),
        }
    }

    pub fn with_port(mut self, direction: Direction, kind: PortKind) -> Self {
        self.ports.push(PortDef::new(direction, kind));
        self
    }

    pub fn with_channel(mut self, ports: &[usize]) -> Self {
        self.channels.push(ports.to_vec());
        self
    }

    pub fn with_friction(mut self, friction: Fixed64) -> Self {
        self.friction = friction;
        self
    }

    pub fn with_liquids(mut self, liquids: &[&str]) -> Self {
        self.liquids = liquids.iter().map(|l| l.to_string()).collect();
        self
    }
}

// ---------------------------------------------------------------------------
// Precomputed geometry
// ---------------------------------------------------------------------------

/// A port resolved onto the grid for one orientation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OrientedPort {
    /// Side in the part's local frame.
    pub local: Direction,
    /// Absolute side on the grid.
    pub direction: Direction,
    pub kind: PortKind,
    pub channel: usize,
}

/// Absolute port layout of a part type under one orientation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrientedGeometry {
    ports: Vec<OrientedPort>,
    by_direction: [Option<usize>; 4],
    channel_count: usize,
}

impl OrientedGeometry {
    /// Ports in descriptor order.
    pub fn ports(&self) -> &[OrientedPort] {
        &self.ports
    }

    pub fn port(&self, index: usize) -> Option<&OrientedPort> {
        self.ports.get(index)
    }

    /// Index of the port facing the given absolute direction.
    pub fn port_toward(&self, direction: Direction) -> Option<usize> {
        self.by_direction[direction.index()]
    }

    pub fn channel_count(&self) -> usize {
        self.channel_count
    }

    /// Port indices belonging to a channel, in descriptor order.
    pub fn channel_ports(&self, channel: usize) -> impl Iterator<Item = usize> + '_ {
        self.ports
            .iter()
            .enumerate()
            .filter(move |(_, p)| p.channel == channel)
            .map(|(i, _)| i)
    }
}

// ---------------------------------------------------------------------------
// Builder
// ---------------------------------------------------------------------------

/// Builder for constructing an immutable Registry.
/// Three-phase lifecycle: registration -> mutation -> finalization.
#[derive(Debug, Default)]
pub struct RegistryBuilder {
    types: Vec<PartTypeDef>,
    aliases: Vec<(String, String)>,
}

impl RegistryBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Phase 1: Register a part type. Returns its ID.
    pub fn register(&mut self, def: PartTypeDef) -> PartTypeId {
        let id = PartTypeId(self.types.len() as u32);
        self.types.push(def);
        id
    }

    /// Phase 1: Register an alternate name for a type (e.g. a deprecated
    /// type name that older layouts still use).
    pub fn register_alias(&mut self, alias: &str, target: &str) {
        self.aliases.push((alias.to_string(), target.to_string()));
    }

    /// Lookup a registered type by name. Aliases are not consulted.
    pub fn get(&self, name: &str) -> Option<&PartTypeDef> {
        self.types.iter().find(|t| t.name == name)
    }

    /// Phase 2: Mutate an existing type by name.
    pub fn mutate_type<F>(&mut self, name: &str, f: F) -> Result<(), RegistryError>
    where
        F: FnOnce(&mut PartTypeDef),
    {
        let def = self
            .types
            .iter_mut()
            .find(|t| t.name == name)
            .ok_or_else(|| RegistryError::NotFound(name.to_string()))?;
        f(def);
        Ok(())
    }

    /// Phase 3: Validate every descriptor and build the immutable registry.
    pub fn build(self) -> Result<Registry, RegistryError> {
        let mut name_to_id = HashMap::with_capacity(self.types.len());
        for (i, def) in self.types.iter().enumerate() {
            if def.name.is_empty() {
                return Err(RegistryError::EmptyName);
            }
            if name_to_id
                .insert(def.name.clone(), PartTypeId(i as u32))
                .is_some()
            {
                return Err(RegistryError::DuplicateName(def.name.clone()));
            }
        }

        let mut aliases = HashMap::with_capacity(self.aliases.len());
        for (alias, target) in &self.aliases {
            if name_to_id.contains_key(alias) || aliases.contains_key(alias) {
                return Err(RegistryError::DuplicateName(alias.clone()));
            }
            let id = name_to_id
                .get(target)
                .copied()
                .ok_or_else(|| RegistryError::UnknownAliasTarget {
                    alias: alias.clone(),
                    target: target.clone(),
                })?;
            aliases.insert(alias.clone(), id);
        }

        let geometry = self
            .types
            .iter()
            .map(validate_and_orient)
            .collect::<Result<Vec<_>, _>>()?;

        tracing::debug!(
            types = self.types.len(),
            aliases = aliases.len(),
            "part registry frozen"
        );

        Ok(Registry {
            types: self.types,
            name_to_id,
            aliases,
            geometry,
        })
    }
}

/// Assign each port to its channel, rejecting malformed channel lists.
fn channel_assignment(def: &PartTypeDef) -> Result<Vec<usize>, RegistryError> {
    if def.channels.is_empty() {
        return Ok(vec![0; def.ports.len()]);
    }
    let mut assigned: Vec<Option<usize>> = vec![None; def.ports.len()];
    for (channel, members) in def.channels.iter().enumerate() {
        if members.is_empty() {
            return Err(RegistryError::EmptyChannel {
                part_type: def.name.clone(),
            });
        }
        for &port in members {
            let slot = assigned
                .get_mut(port)
                .ok_or_else(|| RegistryError::UnknownChannelPort {
                    part_type: def.name.clone(),
                    port,
                })?;
            if slot.replace(channel).is_some() {
                return Err(RegistryError::PortChannelMismatch {
                    part_type: def.name.clone(),
                    port,
                });
            }
        }
    }
    assigned
        .into_iter()
        .enumerate()
        .map(|(port, channel)| {
            channel.ok_or_else(|| RegistryError::PortChannelMismatch {
                part_type: def.name.clone(),
                port,
            })
        })
        .collect()
}

fn validate_and_orient(def: &PartTypeDef) -> Result<Vec<OrientedGeometry>, RegistryError> {
    if def.friction <= Fixed64::ZERO {
        return Err(RegistryError::NonPositiveFriction(def.name.clone()));
    }
    if let Some(spec) = def.behavior.pressure() {
        if spec.min < Fixed64::ZERO || spec.min > spec.max || !(spec.min..=spec.max).contains(&spec.default) {
            return Err(RegistryError::InvalidPressureBounds(def.name.clone()));
        }
        if !def.ports.iter().any(|p| p.kind == PortKind::Outlet) {
            return Err(RegistryError::MissingOutlet(def.name.clone()));
        }
    }
    for (port, p) in def.ports.iter().enumerate() {
        if !def.behavior.allows(p.kind) {
            return Err(RegistryError::IncompatiblePort {
                part_type: def.name.clone(),
                port,
                kind: p.kind,
            });
        }
    }

    let channels = channel_assignment(def)?;
    let channel_count = channels.iter().map(|c| c + 1).max().unwrap_or(0);

    Orientation::all()
        .into_iter()
        .map(|orientation| {
            let mut by_direction = [None; 4];
            let mut ports = Vec::with_capacity(def.ports.len());
            for (i, p) in def.ports.iter().enumerate() {
                let local = Direction::from_degrees(p.angle).ok_or_else(|| {
                    RegistryError::NonCardinalPort {
                        part_type: def.name.clone(),
                        angle: p.angle,
                    }
                })?;
                let direction = orientation.apply(local);
                if by_direction[direction.index()].replace(i).is_some() {
                    return Err(RegistryError::DuplicatePortSide {
                        part_type: def.name.clone(),
                        direction: local,
                    });
                }
                ports.push(OrientedPort {
                    local,
                    direction,
                    kind: p.kind,
                    channel: channels[i],
                });
            }
            Ok(OrientedGeometry {
                ports,
                by_direction,
                channel_count,
            })
        })
        .collect()
}

// ---------------------------------------------------------------------------
// Registry
// ---------------------------------------------------------------------------

/// Immutable registry. Frozen after build(). Thread-safe to share.
#[derive(Debug, Clone)]
pub struct Registry {
    types: Vec<PartTypeDef>,
    name_to_id: HashMap<String, PartTypeId>,
    aliases: HashMap<String, PartTypeId>,
    /// Indexed by type, then by [`Orientation::index`].
    geometry: Vec<Vec<OrientedGeometry>>,
}

impl Registry {
    /// Resolve a type name or alias.
    pub fn resolve(&self, name: &str) -> Option<PartTypeId> {
        self.name_to_id
            .get(name)
            .or_else(|| self.aliases.get(name))
            .copied()
    }

    pub fn get_type(&self, id: PartTypeId) -> Option<&PartTypeDef> {
        self.types.get(id.0 as usize)
    }

    /// Precomputed geometry of a type under an orientation.
    pub fn geometry(&self, id: PartTypeId, orientation: Orientation) -> Option<&OrientedGeometry> {
        self.geometry
            .get(id.0 as usize)
            .and_then(|g| g.get(orientation.index()))
    }

    pub fn type_count(&self) -> usize {
        self.types.len()
    }

    /// Registered type names in registration order (aliases excluded).
    pub fn type_names(&self) -> impl Iterator<Item = &str> {
        self.types.iter().map(|t| t.name.as_str())
    }
}

#[derive(Debug, thiserror::Error)]
pub enum RegistryError {
    #[error("not found: {0}")]
    NotFound(String),
    #[error("part type with an empty name")]
    EmptyName,
    #[error("duplicate part type name: {0}")]
    DuplicateName(String),
    #[error("alias '{alias}' refers to unknown part type '{target}'")]
    UnknownAliasTarget { alias: String, target: String },
    #[error("part type '{part_type}' has a port at {angle} degrees, which is not a cardinal direction")]
    NonCardinalPort { part_type: String, angle: i32 },
    #[error("part type '{part_type}' declares two ports on side {direction:?}")]
    DuplicatePortSide {
        part_type: String,
        direction: Direction,
    },
    #[error("part type '{part_type}' has an empty channel")]
    EmptyChannel { part_type: String },
    #[error("part type '{part_type}' references unknown port {port} in a channel")]
    UnknownChannelPort { part_type: String, port: usize },
    #[error("part type '{part_type}' port {port} must belong to exactly one channel")]
    PortChannelMismatch { part_type: String, port: usize },
    #[error("part type '{part_type}' port {port} has kind {kind:?}, not allowed for its behavior")]
    IncompatiblePort {
        part_type: String,
        port: usize,
        kind: PortKind,
    },
    #[error("source part type '{0}' has no outlet")]
    MissingOutlet(String),
    #[error("part type '{0}' must have positive friction")]
    NonPositiveFriction(String),
    #[error("part type '{0}' has inconsistent pressure bounds")]
    InvalidPressureBounds(String),
}
