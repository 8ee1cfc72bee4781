//! Deterministic snapshot hashing (FNV-1a), used to memoize flow results.

use crate::fixed::Fixed64;
use crate::part::{Part, SettingValue};

/// Incremental FNV-1a hasher. Stable across runs and platforms, unlike
/// `std::collections::hash_map::DefaultHasher`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SnapshotHash(pub u64);

impl SnapshotHash {
    const FNV_OFFSET: u64 = 0xcbf29ce484222325;
    const FNV_PRIME: u64 = 0x100000001b3;

    /// Start a new hash.
    pub fn new() -> Self {
        Self(Self::FNV_OFFSET)
    }

    /// Feed bytes into the hash.
    pub fn write(&mut self, bytes: &[u8]) {
        for &b in bytes {
            self.0 ^= b as u64;
            self.0 = self.0.wrapping_mul(Self::FNV_PRIME);
        }
    }

    pub fn write_u64(&mut self, v: u64) {
        self.write(&v.to_le_bytes());
    }

    pub fn write_u32(&mut self, v: u32) {
        self.write(&v.to_le_bytes());
    }

    pub fn write_i32(&mut self, v: i32) {
        self.write(&v.to_le_bytes());
    }

    pub fn write_fixed64(&mut self, v: Fixed64) {
        self.write(&v.to_bits().to_le_bytes());
    }

    /// Length-prefixed so adjacent strings cannot alias.
    pub fn write_str(&mut self, s: &str) {
        self.write_u64(s.len() as u64);
        self.write(s.as_bytes());
    }

    /// Finalize and return the hash value.
    pub fn finish(self) -> u64 {
        self.0
    }
}

impl Default for SnapshotHash {
    fn default() -> Self {
        Self::new()
    }
}

/// Hash an ordered part snapshot. Order matters: it fixes traversal order.
pub fn hash_parts(parts: &[Part]) -> u64 {
    let mut hasher = SnapshotHash::new();
    hasher.write_u64(parts.len() as u64);
    for part in parts {
        hasher.write_str(part.id.as_str());
        hasher.write_str(&part.part_type);
        hasher.write_i32(part.position.x);
        hasher.write_i32(part.position.y);
        hasher.write_u32(part.orientation().index() as u32);
        hasher.write(&[part.closed as u8]);
        hasher.write_u64(part.settings.len() as u64);
        for (key, value) in &part.settings {
            hasher.write_str(key);
            match value {
                SettingValue::Bool(b) => hasher.write(&[0, *b as u8]),
                SettingValue::Number(n) => {
                    hasher.write(&[1]);
                    hasher.write_u64(n.to_bits());
                }
                SettingValue::Text(t) => {
                    hasher.write(&[2]);
                    hasher.write_str(t);
                }
                SettingValue::List(items) => {
                    hasher.write(&[3]);
                    hasher.write_u64(items.len() as u64);
                    for item in items {
                        hasher.write_str(item);
                    }
                }
            }
        }
    }
    hasher.finish()
}
