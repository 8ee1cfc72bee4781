//! Brewflow Core -- shared types for the process-view flow engine.
//!
//! This crate holds everything the flow engine and its data loaders agree on:
//! grid geometry, the placed-part snapshot records, the part type descriptor
//! registry, deterministic fixed-point arithmetic, and snapshot hashing.
//!
//! # Descriptor Lifecycle
//!
//! Part types are registered on a builder, validated as a whole, and frozen.
//! Freezing precomputes the absolute port layout of every type under each of
//! the eight orientations (four rotations, optionally mirrored):
//!
//! ```rust,ignore
//! let mut builder = RegistryBuilder::new();
//! builder.register(PartTypeDef::new("StraightTube", PartBehavior::Passthrough)
//!     .with_port(Direction::West, PortKind::Passthrough)
//!     .with_port(Direction::East, PortKind::Passthrough));
//! let registry = builder.build()?;
//! ```
//!
//! # Key Types
//!
//! - [`part::Part`] -- A placed part: type, position, rotation, flags, settings.
//! - [`registry::Registry`] -- Immutable, validated descriptor table.
//! - [`geometry::Orientation`] -- Rotation plus mirroring.
//! - [`fixed::Fixed64`] -- Q32.32 fixed-point type for deterministic math.
//! - [`hash::SnapshotHash`] -- Stable FNV-1a hasher for memoization keys.

pub mod fixed;
pub mod geometry;
pub mod hash;
pub mod id;
pub mod part;
pub mod registry;

#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;
