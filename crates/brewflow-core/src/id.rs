use serde::{Deserialize, Serialize};
use std::fmt;

/// Stable identity of a placed part, as assigned by the layout editor.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PartId(pub String);

impl PartId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for PartId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for PartId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

/// Identifies a part type descriptor in the registry. Cheap to copy and compare.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct PartTypeId(pub u32);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn part_ids_order_lexically() {
        let mut ids = vec![PartId::new("pump"), PartId::new("kettle"), PartId::new("elbow")];
        ids.sort();
        assert_eq!(ids, vec![PartId::new("elbow"), PartId::new("kettle"), PartId::new("pump")]);
    }

    #[test]
    fn part_id_serializes_as_plain_string() {
        let json = serde_json::to_string(&PartId::new("tee-1")).unwrap();
        assert_eq!(json, "\"tee-1\"");
    }

    #[test]
    fn part_type_ids_are_hashable() {
        use std::collections::HashMap;
        let mut map = HashMap::new();
        map.insert(PartTypeId(0), "StraightTube");
        map.insert(PartTypeId(1), "ElbowTube");
        assert_eq!(map[&PartTypeId(1)], "ElbowTube");
    }
}
