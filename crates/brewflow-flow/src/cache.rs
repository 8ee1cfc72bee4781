//! Memoizing wrapper around [`FlowEngine`].
//!
//! The UI recomputes on every edit and animation tick, mostly with an
//! unchanged layout. Entries are keyed by [`hash_parts`] and confirmed by
//! comparing the full snapshot, so a hash collision can never return a stale
//! result.

use std::collections::VecDeque;

use brewflow_core::hash::hash_parts;
use brewflow_core::part::Part;

use crate::{FlowEngine, FlowError, FlowResult};

#[derive(Debug, Clone)]
struct CacheEntry {
    hash: u64,
    parts: Vec<Part>,
    result: FlowResult,
}

/// Bounded cache of recent computations, oldest evicted first.
#[derive(Debug, Clone)]
pub struct FlowCache {
    engine: FlowEngine,
    capacity: usize,
    entries: VecDeque<CacheEntry>,
    hits: u64,
    misses: u64,
}

impl FlowCache {
    /// Capacity comes from the engine's `cache_capacity`.
    pub fn new(engine: FlowEngine) -> Self {
        let capacity = engine.config().cache_capacity;
        Self {
            engine,
            capacity,
            entries: VecDeque::with_capacity(capacity),
            hits: 0,
            misses: 0,
        }
    }

    pub fn engine(&self) -> &FlowEngine {
        &self.engine
    }

    /// Same result as [`FlowEngine::compute`], served from memory when the
    /// snapshot was seen recently.
    pub fn compute(&mut self, parts: &[Part]) -> Result<FlowResult, FlowError> {
        let hash = hash_parts(parts);
        if let Some(entry) = self
            .entries
            .iter()
            .find(|e| e.hash == hash && e.parts.as_slice() == parts)
        {
            self.hits += 1;
            tracing::trace!(hash, "flow cache hit");
            return Ok(entry.result.clone());
        }

        self.misses += 1;
        tracing::trace!(hash, "flow cache miss");
        let result = self.engine.compute(parts)?;
        if self.capacity > 0 {
            if self.entries.len() == self.capacity {
                self.entries.pop_front();
            }
            self.entries.push_back(CacheEntry {
                hash,
                parts: parts.to_vec(),
                result: result.clone(),
            });
        }
        Ok(result)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn hits(&self) -> u64 {
        self.hits
    }

    pub fn misses(&self) -> u64 {
        self.misses
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }
}
