//! Process view example: a small brewhouse layout, a valve toggle, and two
//! pumps fighting each other.
//!
//! Loads the built-in part table, parses a layout document, computes flows
//! and prints the per-port annotations the renderer would draw.
//!
//! Run with: `RUST_LOG=brewflow_flow=debug cargo run -p brewflow-examples --example process_view`

use brewflow_core::fixed::fixed64_to_f64;
use brewflow_core::geometry::Rotation;
use brewflow_core::part::{Part, SettingValue, keys};
use brewflow_data::{FlowSetup, parse_layout_json};
use brewflow_flow::{FlowCache, FlowResult, PortFlow};
use tracing_subscriber::EnvFilter;

const LAYOUT: &str = r##"{
    "title": "HERMS",
    "parts": [
        {"id": "hlt", "type": "Kettle", "x": 0, "y": 0, "settings": {"liquids": ["#4AA0EF"]}},
        {"id": "pump", "type": "Pump", "x": 1, "y": 0, "settings": {"pressure": 60}},
        {"id": "pipe", "type": "StraightTube", "x": 2, "y": 0},
        {"id": "valve", "type": "Valve", "x": 3, "y": 0},
        {"id": "tee", "type": "TeeTube", "x": 4, "y": 0},
        {"id": "mash", "type": "Kettle", "x": 5, "y": 0, "rotate": 180},
        {"id": "coil", "type": "ElbowTube", "x": 4, "y": 1, "rotate": 90},
        {"id": "sensor", "type": "SensorDisplay", "x": 0, "y": 2}
    ]
}"##;

fn print_result(title: &str, parts: &[Part], result: &FlowResult) {
    println!("=== {title} ===\n");
    for part in parts {
        let Some(flow) = result.get(&part.id) else {
            continue;
        };
        let ports: Vec<String> = flow
            .ports
            .iter()
            .map(|(dir, value)| match value {
                PortFlow::Flow(v) => format!("{dir:?}={:+.1}", fixed64_to_f64(*v)),
                PortFlow::Conflict => format!("{dir:?}=CONFLICT"),
            })
            .collect();
        let liquids: Vec<&str> = flow.liquids.iter().map(String::as_str).collect();
        println!(
            "  {:<7} {:<13} {:<40} {}",
            part.id,
            part.part_type,
            ports.join(" "),
            liquids.join(",")
        );
    }
    println!();
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let mut cache = FlowCache::new(FlowSetup::builtin()?.into_engine()?);
    let mut layout = parse_layout_json(LAYOUT)?;

    // --- Scenario 1: HLT recirculating through the tee ---
    let result = cache.compute(&layout.parts)?;
    print_result(&format!("{}: valve open", layout.title), &layout.parts, &result);

    // --- Scenario 2: close the valve ---
    if let Some(valve) = layout.parts.iter_mut().find(|p| p.id.as_str() == "valve") {
        valve.closed = true;
    }
    let result = cache.compute(&layout.parts)?;
    print_result("valve closed", &layout.parts, &result);

    // --- Scenario 3: a second pump pushing back into the first ---
    if let Some(valve) = layout.parts.iter_mut().find(|p| p.id.as_str() == "valve") {
        valve.closed = false;
    }
    layout.parts.retain(|p| p.id.as_str() != "tee" && p.id.as_str() != "coil" && p.id.as_str() != "mash");
    layout.parts.push(
        Part::new("rival", "Pump", 4, 0)
            .rotated(Rotation::try_from(180)?)
            .with_setting(keys::PRESSURE, SettingValue::Number(60.0)),
    );
    let result = cache.compute(&layout.parts)?;
    print_result("opposing pumps", &layout.parts, &result);

    println!(
        "cache: {} hits, {} misses, {} conflicting parts",
        cache.hits(),
        cache.misses(),
        result.conflicts().count()
    );
    Ok(())
}
