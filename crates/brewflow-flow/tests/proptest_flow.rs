//! Property-based tests for the flow engine.
//!
//! Generates random layouts on a small grid (every part type, every
//! rotation, open and closed valves, running and stopped sources) and checks
//! invariants that must hold for any layout.

use brewflow_core::fixed::Fixed64;
use brewflow_core::part::Part;
use brewflow_core::registry::PartBehavior;
use brewflow_core::test_utils::*;
use brewflow_flow::{FlowCache, FlowEngine, PortFlow};
use proptest::prelude::*;

// ===========================================================================
// Generators
// ===========================================================================

const SIDE: i32 = 4;

fn make_part(kind: u8, id: String, x: i32, y: i32, degrees: i32, pressure: f64) -> Part {
    match kind {
        0 => straight(&id, x, y, degrees),
        1 => elbow(&id, x, y, degrees),
        2 => tee(&id, x, y, degrees),
        3 => cross(&id, x, y),
        4 => valve(&id, x, y, degrees, false),
        5 => valve(&id, x, y, degrees, true),
        6 => pump(&id, x, y, degrees, pressure),
        7 => stopped_pump(&id, x, y, degrees),
        8 => inlet(&id, x, y, degrees, pressure, &["water"]),
        9 => outlet(&id, x, y, degrees),
        _ => kettle(&id, x, y, &["wort"]),
    }
}

/// A random layout: each cell of a `SIDE x SIDE` grid is empty or holds one
/// part with a random rotation.
fn arb_layout() -> impl Strategy<Value = Vec<Part>> {
    proptest::collection::vec(
        proptest::option::weighted(0.8, (0..11u8, 0..4i32, 0..=100u32)),
        (SIDE * SIDE) as usize,
    )
    .prop_map(|cells| {
        cells
            .into_iter()
            .enumerate()
            .filter_map(|(i, cell)| {
                let (kind, quarter, pressure) = cell?;
                let (x, y) = (i as i32 % SIDE, i as i32 / SIDE);
                Some(make_part(
                    kind,
                    format!("p{i}"),
                    x,
                    y,
                    quarter * 90,
                    f64::from(pressure),
                ))
            })
            .collect()
    })
}

// ===========================================================================
// Properties
// ===========================================================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(200))]

    /// Same snapshot, same result, bit for bit.
    #[test]
    fn computation_is_deterministic(parts in arb_layout()) {
        let engine = FlowEngine::new(standard_registry());
        let first = engine.compute(&parts).unwrap();
        let second = engine.compute(&parts).unwrap();
        prop_assert_eq!(first, second);
    }

    /// Every part gets an entry, and every one of its ports a value.
    #[test]
    fn every_port_is_resolved(parts in arb_layout()) {
        let registry = standard_registry();
        let engine = FlowEngine::new(standard_registry());
        let result = engine.compute(&parts).unwrap();
        prop_assert_eq!(result.len(), parts.len());

        for part in &parts {
            let type_id = registry.resolve(&part.part_type).unwrap();
            let ports = registry.geometry(type_id, part.orientation()).unwrap().ports().len();
            let flow = result.get(&part.id).unwrap();
            prop_assert_eq!(flow.ports.len(), ports);
        }
    }

    /// Passthrough parts neither create nor destroy flow.
    #[test]
    fn passthrough_parts_conserve_flow(parts in arb_layout()) {
        let registry = standard_registry();
        let engine = FlowEngine::new(standard_registry());
        let result = engine.compute(&parts).unwrap();

        for part in &parts {
            let type_id = registry.resolve(&part.part_type).unwrap();
            let behavior = registry.get_type(type_id).unwrap().behavior;
            if !matches!(behavior, PartBehavior::Passthrough | PartBehavior::Valve) {
                continue;
            }
            let flow = result.get(&part.id).unwrap();
            if !flow.conflict {
                prop_assert_eq!(flow.net_flow(), Fixed64::ZERO, "part {}", part.id);
            }
        }
    }

    /// Closed valves are a cut: both ports carry exactly zero.
    #[test]
    fn closed_valves_carry_nothing(parts in arb_layout()) {
        let engine = FlowEngine::new(standard_registry());
        let result = engine.compute(&parts).unwrap();

        for part in parts.iter().filter(|p| p.part_type == VALVE && p.closed) {
            let flow = result.get(&part.id).unwrap();
            prop_assert!(flow.ports.values().all(|f| *f == PortFlow::ZERO));
        }
    }

    /// Without a running source nothing moves.
    #[test]
    fn no_sources_no_flow(parts in arb_layout()) {
        let parts: Vec<Part> = parts
            .into_iter()
            .filter(|p| p.part_type != PUMP && p.part_type != INLET)
            .collect();
        let engine = FlowEngine::new(standard_registry());
        let result = engine.compute(&parts).unwrap();
        prop_assert_eq!(result.flowing().count(), 0);
        prop_assert!(!result.has_conflicts());
    }

    /// A lone source never disagrees with itself.
    #[test]
    fn single_source_never_conflicts(parts in arb_layout()) {
        let mut seen = false;
        let parts: Vec<Part> = parts
            .into_iter()
            .filter(|p| {
                let source = p.part_type == PUMP || p.part_type == INLET;
                let keep = !(source && seen);
                seen |= source;
                keep
            })
            .collect();
        let engine = FlowEngine::new(standard_registry());
        let result = engine.compute(&parts).unwrap();
        prop_assert!(!result.has_conflicts());
    }

    /// Cached results are identical to a fresh computation.
    #[test]
    fn cache_matches_engine(parts in arb_layout()) {
        let engine = FlowEngine::new(standard_registry());
        let expected = engine.compute(&parts).unwrap();
        let mut cache = FlowCache::new(engine);
        prop_assert_eq!(cache.compute(&parts).unwrap(), expected.clone());
        prop_assert_eq!(cache.compute(&parts).unwrap(), expected);
        prop_assert_eq!(cache.hits(), 1);
    }
}
