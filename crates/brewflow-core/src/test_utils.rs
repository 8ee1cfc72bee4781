//! Shared test helpers for integration tests and benchmarks.
//!
//! Gated behind `#[cfg(any(test, feature = "test-utils"))]` so these helpers
//! are available in unit tests, integration tests, and benchmarks (via the
//! `test-utils` feature).

use crate::fixed::Fixed64;
use crate::geometry::{Direction, Rotation};
use crate::part::{Part, SettingValue, keys};
use crate::registry::{PartBehavior, PartTypeDef, PortKind, PressureSpec, Registry, RegistryBuilder};

// ===========================================================================
// Fixed-point helper
// ===========================================================================

pub fn fixed(v: f64) -> Fixed64 {
    Fixed64::from_num(v)
}

// ===========================================================================
// Standard part table
// ===========================================================================

pub const STRAIGHT: &str = "StraightTube";
pub const ELBOW: &str = "ElbowTube";
pub const TEE: &str = "TeeTube";
pub const CROSS: &str = "CrossTube";
pub const VALVE: &str = "Valve";
pub const PUMP: &str = "Pump";
pub const INLET: &str = "SystemIO";
pub const OUTLET: &str = "SystemOutlet";
pub const KETTLE: &str = "Kettle";
pub const SENSOR: &str = "SensorDisplay";

/// A small registry mirroring the built-in table: straight (W-E), elbow
/// (W-S), tee (W-E-S), cross (two channels), valve (W-E), pump (intake W,
/// outlet E, 0..100 pressure), inlet (outlet E), outlet sink (W), kettle
/// (reservoir E and S) and a port-less sensor.
pub fn standard_registry() -> Registry {
    standard_builder()
        .build()
        .expect("standard test registry is valid")
}

pub fn standard_builder() -> RegistryBuilder {
    use Direction::*;
    use PortKind::*;

    let pressure = PressureSpec::new(fixed(30.0), fixed(0.0), fixed(100.0));
    let mut b = RegistryBuilder::new();
    b.register(
        PartTypeDef::new(STRAIGHT, PartBehavior::Passthrough)
            .with_port(West, Passthrough)
            .with_port(East, Passthrough),
    );
    b.register(
        PartTypeDef::new(ELBOW, PartBehavior::Passthrough)
            .with_port(West, Passthrough)
            .with_port(South, Passthrough),
    );
    b.register(
        PartTypeDef::new(TEE, PartBehavior::Passthrough)
            .with_port(West, Passthrough)
            .with_port(East, Passthrough)
            .with_port(South, Passthrough),
    );
    b.register(
        PartTypeDef::new(CROSS, PartBehavior::Passthrough)
            .with_port(North, Passthrough)
            .with_port(East, Passthrough)
            .with_port(South, Passthrough)
            .with_port(West, Passthrough)
            .with_channel(&[0, 2])
            .with_channel(&[1, 3]),
    );
    b.register(
        PartTypeDef::new(VALVE, PartBehavior::Valve)
            .with_port(West, Passthrough)
            .with_port(East, Passthrough),
    );
    b.register(
        PartTypeDef::new(PUMP, PartBehavior::Pump(pressure))
            .with_port(West, Intake)
            .with_port(East, Outlet),
    );
    b.register(PartTypeDef::new(INLET, PartBehavior::Inlet(pressure)).with_port(East, Outlet));
    b.register(PartTypeDef::new(OUTLET, PartBehavior::Sink).with_port(West, Sink));
    b.register(
        PartTypeDef::new(KETTLE, PartBehavior::Reservoir)
            .with_port(East, Reservoir)
            .with_port(South, Reservoir),
    );
    b.register(PartTypeDef::new(SENSOR, PartBehavior::Blank));
    b.register_alias("SmallKettle", KETTLE);
    b
}

// ===========================================================================
// Part constructors
// ===========================================================================

pub fn rotation(degrees: i32) -> Rotation {
    Rotation::try_from(degrees).expect("test rotation is a right angle")
}

pub fn straight(id: &str, x: i32, y: i32, degrees: i32) -> Part {
    Part::new(id, STRAIGHT, x, y).rotated(rotation(degrees))
}

pub fn elbow(id: &str, x: i32, y: i32, degrees: i32) -> Part {
    Part::new(id, ELBOW, x, y).rotated(rotation(degrees))
}

pub fn tee(id: &str, x: i32, y: i32, degrees: i32) -> Part {
    Part::new(id, TEE, x, y).rotated(rotation(degrees))
}

pub fn cross(id: &str, x: i32, y: i32) -> Part {
    Part::new(id, CROSS, x, y)
}

pub fn valve(id: &str, x: i32, y: i32, degrees: i32, closed: bool) -> Part {
    let part = Part::new(id, VALVE, x, y).rotated(rotation(degrees));
    if closed { part.closed() } else { part }
}

/// An enabled pump with an explicit pressure. Outlet faces east at 0 degrees.
pub fn pump(id: &str, x: i32, y: i32, degrees: i32, pressure: f64) -> Part {
    Part::new(id, PUMP, x, y)
        .rotated(rotation(degrees))
        .with_setting(keys::ENABLED, SettingValue::Bool(true))
        .with_setting(keys::PRESSURE, SettingValue::Number(pressure))
}

pub fn stopped_pump(id: &str, x: i32, y: i32, degrees: i32) -> Part {
    Part::new(id, PUMP, x, y)
        .rotated(rotation(degrees))
        .with_setting(keys::ENABLED, SettingValue::Bool(false))
}

/// A system inlet supplying the given liquids. Outlet faces east at 0 degrees.
pub fn inlet(id: &str, x: i32, y: i32, degrees: i32, pressure: f64, liquids: &[&str]) -> Part {
    Part::new(id, INLET, x, y)
        .rotated(rotation(degrees))
        .with_setting(keys::PRESSURE, SettingValue::Number(pressure))
        .with_setting(
            keys::LIQUIDS,
            SettingValue::List(liquids.iter().map(|l| l.to_string()).collect()),
        )
}

/// A sink whose port faces west at 0 degrees.
pub fn outlet(id: &str, x: i32, y: i32, degrees: i32) -> Part {
    Part::new(id, OUTLET, x, y).rotated(rotation(degrees))
}

pub fn kettle(id: &str, x: i32, y: i32, liquids: &[&str]) -> Part {
    Part::new(id, KETTLE, x, y).with_setting(
        keys::LIQUIDS,
        SettingValue::List(liquids.iter().map(|l| l.to_string()).collect()),
    )
}
