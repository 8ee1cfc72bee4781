//! Criterion benchmarks for the flow engine.
//!
//! Two layout shapes, sized like large process views:
//! - `manifold`: one pump feeding a long run with a tee every other cell
//! - `parallel_loops`: many independent pump loops side by side

use brewflow_core::part::Part;
use brewflow_core::test_utils::*;
use brewflow_flow::{FlowCache, FlowEngine};
use criterion::{Criterion, criterion_group, criterion_main};

// ===========================================================================
// Layout builders
// ===========================================================================

/// Pump at the west end of a straight/tee run, every tee spilling south.
fn build_manifold(length: i32) -> Vec<Part> {
    let mut parts = vec![pump("pump", 0, 0, 0, 80.0)];
    for x in 1..=length {
        if x % 2 == 0 {
            parts.push(tee(&format!("t{x}"), x, 0, 0));
        } else {
            parts.push(straight(&format!("s{x}"), x, 0, 0));
        }
    }
    parts
}

/// `count` closed loops of a pump, four elbows and a straight.
fn build_parallel_loops(count: i32) -> Vec<Part> {
    let mut parts = Vec::with_capacity(count as usize * 6);
    for i in 0..count {
        let x = i * 4 + 1;
        parts.push(pump(&format!("p{i}"), x, 0, 0, 20.0));
        parts.push(elbow(&format!("a{i}"), x + 1, 0, 0));
        parts.push(elbow(&format!("b{i}"), x + 1, 1, 90));
        parts.push(straight(&format!("s{i}"), x, 1, 0));
        parts.push(elbow(&format!("c{i}"), x - 1, 1, 180));
        parts.push(elbow(&format!("d{i}"), x - 1, 0, 270));
    }
    parts
}

// ===========================================================================
// Benchmarks
// ===========================================================================

fn bench_flow(c: &mut Criterion) {
    let engine = FlowEngine::new(standard_registry());
    let mut group = c.benchmark_group("flow");
    group.sample_size(50);

    let manifold = build_manifold(200);
    group.bench_function("manifold_200", |b| {
        b.iter(|| engine.compute(&manifold).unwrap());
    });

    let loops = build_parallel_loops(50);
    group.bench_function("parallel_loops_50", |b| {
        b.iter(|| engine.compute(&loops).unwrap());
    });

    // Animation ticks recompute an unchanged layout.
    let mut cache = FlowCache::new(engine.clone());
    group.bench_function("cached_manifold_200", |b| {
        b.iter(|| cache.compute(&manifold).unwrap());
    });

    group.finish();
}

criterion_group!(benches, bench_flow);
criterion_main!(benches);
