//! Grid geometry: positions, cardinal directions, and part orientation.
//!
//! The grid uses screen coordinates: `x` grows to the right, `y` grows
//! downward. Angles are measured in degrees clockwise from up (north).

use serde::{Deserialize, Serialize};
use std::fmt;

// ---------------------------------------------------------------------------
// GridPosition
// ---------------------------------------------------------------------------

/// A cell on the 2D part grid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct GridPosition {
    pub x: i32,
    pub y: i32,
}

impl GridPosition {
    pub fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    /// The neighboring cell across the given edge.
    pub fn step(&self, dir: Direction) -> GridPosition {
        let (dx, dy) = dir.offset();
        GridPosition::new(self.x + dx, self.y + dy)
    }

    /// Manhattan distance to another position.
    pub fn manhattan_distance(&self, other: &GridPosition) -> u32 {
        (self.x - other.x).unsigned_abs() + (self.y - other.y).unsigned_abs()
    }
}

impl fmt::Display for GridPosition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.x, self.y)
    }
}

// ---------------------------------------------------------------------------
// Direction
// ---------------------------------------------------------------------------

/// Cardinal directions. These are the only sides a part can connect on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Direction {
    North,
    East,
    South,
    West,
}

impl Direction {
    /// All four cardinal directions, clockwise from north.
    pub fn all() -> [Direction; 4] {
        [
            Direction::North,
            Direction::East,
            Direction::South,
            Direction::West,
        ]
    }

    /// Dense index in `0..4`, clockwise from north.
    pub fn index(self) -> usize {
        match self {
            Direction::North => 0,
            Direction::East => 1,
            Direction::South => 2,
            Direction::West => 3,
        }
    }

    /// Angle in degrees, clockwise from north.
    pub fn degrees(self) -> i32 {
        self.index() as i32 * 90
    }

    /// Resolve an angle to a direction. Returns `None` unless the angle is a
    /// multiple of 90 degrees. Any multiple is accepted (e.g. -90 is west).
    pub fn from_degrees(angle: i32) -> Option<Direction> {
        if angle.rem_euclid(90) != 0 {
            return None;
        }
        Some(Direction::all()[(angle.rem_euclid(360) / 90) as usize])
    }

    /// Grid offset for this direction.
    pub fn offset(self) -> (i32, i32) {
        match self {
            Direction::North => (0, -1),
            Direction::East => (1, 0),
            Direction::South => (0, 1),
            Direction::West => (-1, 0),
        }
    }

    /// The direction pointing the other way.
    pub fn opposite(self) -> Direction {
        Direction::all()[(self.index() + 2) % 4]
    }

    /// Rotate by the given rotation (clockwise).
    pub fn rotated(self, rotation: Rotation) -> Direction {
        Direction::all()[(self.index() + rotation.quarter_turns()) % 4]
    }

    /// Mirror across the vertical axis (east and west swap).
    pub fn mirrored(self) -> Direction {
        match self {
            Direction::East => Direction::West,
            Direction::West => Direction::East,
            other => other,
        }
    }
}

// ---------------------------------------------------------------------------
// Rotation
// ---------------------------------------------------------------------------

/// Rotation applied to a placed part.
///
/// Serialized as integer degrees; values that are not a multiple of 90 are
/// rejected when parsing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "i32", into = "i32")]
pub enum Rotation {
    /// No rotation.
    #[default]
    None,
    /// 90 degrees clockwise.
    Cw90,
    /// 180 degrees.
    Cw180,
    /// 270 degrees clockwise (90 degrees counter-clockwise).
    Cw270,
}

impl Rotation {
    /// All four rotation values.
    pub fn all() -> [Rotation; 4] {
        [
            Rotation::None,
            Rotation::Cw90,
            Rotation::Cw180,
            Rotation::Cw270,
        ]
    }

    /// Number of clockwise quarter turns.
    pub fn quarter_turns(self) -> usize {
        match self {
            Rotation::None => 0,
            Rotation::Cw90 => 1,
            Rotation::Cw180 => 2,
            Rotation::Cw270 => 3,
        }
    }

    pub fn degrees(self) -> i32 {
        self.quarter_turns() as i32 * 90
    }

    /// The rotation that undoes this one.
    pub fn inverse(self) -> Rotation {
        Rotation::all()[(4 - self.quarter_turns()) % 4]
    }

    /// Rotate 90 degrees clockwise.
    pub fn rotate_cw(self) -> Self {
        Rotation::all()[(self.quarter_turns() + 1) % 4]
    }
}

/// Error returned when converting a non-right angle into a [`Rotation`].
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("rotation must be a multiple of 90 degrees, got {0}")]
pub struct InvalidRotation(pub i32);

impl TryFrom<i32> for Rotation {
    type Error = InvalidRotation;

    fn try_from(degrees: i32) -> Result<Self, Self::Error> {
        if degrees.rem_euclid(90) != 0 {
            return Err(InvalidRotation(degrees));
        }
        Ok(Rotation::all()[(degrees.rem_euclid(360) / 90) as usize])
    }
}

impl From<Rotation> for i32 {
    fn from(rotation: Rotation) -> i32 {
        rotation.degrees()
    }
}

// ---------------------------------------------------------------------------
// Orientation
// ---------------------------------------------------------------------------

/// Rotation plus mirroring. A part's local geometry is first mirrored (if
/// `flipped`) and then rotated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, PartialOrd, Ord)]
pub struct Orientation {
    pub rotation: Rotation,
    pub flipped: bool,
}

impl Orientation {
    pub const COUNT: usize = 8;

    pub fn new(rotation: Rotation, flipped: bool) -> Self {
        Self { rotation, flipped }
    }

    /// All eight orientations, in [`Orientation::index`] order.
    pub fn all() -> [Orientation; 8] {
        let mut out = [Orientation::default(); 8];
        for (i, slot) in out.iter_mut().enumerate() {
            *slot = Orientation::new(Rotation::all()[i % 4], i >= 4);
        }
        out
    }

    /// Dense index in `0..8`.
    pub fn index(self) -> usize {
        self.rotation.quarter_turns() + if self.flipped { 4 } else { 0 }
    }

    /// Map a local direction to its absolute direction on the grid.
    pub fn apply(self, local: Direction) -> Direction {
        let mirrored = if self.flipped { local.mirrored() } else { local };
        mirrored.rotated(self.rotation)
    }

    /// Map a local angle to an absolute direction. `None` for non-right angles.
    pub fn apply_degrees(self, angle: i32) -> Option<Direction> {
        Direction::from_degrees(angle).map(|d| self.apply(d))
    }

    /// Map an absolute direction back into the part's local frame.
    pub fn invert(self, absolute: Direction) -> Direction {
        let unrotated = absolute.rotated(self.rotation.inverse());
        if self.flipped {
            unrotated.mirrored()
        } else {
            unrotated
        }
    }
}
