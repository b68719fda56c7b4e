//! Phase-scoped entity registry
//!
//! Holds at most one record per (kind, natural key). Observations of the same
//! key merge: a non-empty incoming attribute is written, an empty one never
//! clears what is already there.

use crate::model::{Entity, EntityKind, Properties};
use indexmap::IndexMap;

/// Reference to a registered entity, usable as a relationship endpoint
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EntityHandle {
    pub kind: EntityKind,
    pub key: String,
}

impl EntityHandle {
    pub fn new(kind: EntityKind, key: impl Into<String>) -> Self {
        Self {
            kind,
            key: key.into(),
        }
    }
}

/// Accumulated state of one entity
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntityRecord {
    pub kind: EntityKind,
    pub key: String,
    /// Labels besides the kind's primary label
    pub labels: Vec<String>,
    /// All properties including the key property
    pub properties: Properties,
}

impl EntityRecord {
    fn new(kind: EntityKind, key: &str) -> Self {
        let mut properties = Properties::new();
        properties.insert(kind.key_property().to_string(), key.to_string());
        Self {
            kind,
            key: key.to_string(),
            labels: Vec::new(),
            properties,
        }
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.properties.get(name).map(String::as_str)
    }

    fn merge<I, K, V>(&mut self, attrs: I)
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: AsRef<str>,
    {
        for (name, value) in attrs {
            let (name, value) = (name.as_ref(), value.as_ref().trim());
            if value.is_empty() || name == self.kind.key_property() {
                continue;
            }
            self.properties.insert(name.to_string(), value.to_string());
        }
    }

    fn add_label(&mut self, label: &str) {
        if !self.labels.iter().any(|l| l == label) {
            self.labels.push(label.to_string());
        }
    }
}

/// Run-scoped map from (kind, natural key) to the merged record
#[derive(Debug, Default)]
pub struct EntityRegistry {
    records: IndexMap<EntityHandle, EntityRecord>,
}

impl EntityRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Merge `attrs` into the record for (kind, key), creating it if needed
    pub fn upsert<I, K, V>(&mut self, kind: EntityKind, key: &str, attrs: I) -> EntityHandle
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: AsRef<str>,
    {
        let handle = EntityHandle::new(kind, key.trim());
        self.records
            .entry(handle.clone())
            .or_insert_with(|| EntityRecord::new(kind, &handle.key))
            .merge(attrs);
        handle
    }

    /// Register a typed entity, merging its attributes and extra labels
    pub fn insert(&mut self, entity: &dyn Entity) -> EntityHandle {
        let handle = self.upsert(entity.kind(), entity.key(), entity.attributes());
        for label in entity.extra_labels() {
            self.add_label(&handle, label);
        }
        handle
    }

    /// Add a label to a registered entity. Unknown handles are ignored.
    pub fn add_label(&mut self, handle: &EntityHandle, label: &str) {
        if let Some(record) = self.records.get_mut(handle) {
            record.add_label(label);
        }
    }

    pub fn get(&self, handle: &EntityHandle) -> Option<&EntityRecord> {
        self.records.get(handle)
    }

    /// Records of `kind` in insertion order
    pub fn all(&self, kind: EntityKind) -> Vec<&EntityRecord> {
        self.records.values().filter(|r| r.kind == kind).collect()
    }

    /// Kinds present, in the order their first record was inserted
    pub fn kinds(&self) -> Vec<EntityKind> {
        let mut kinds: Vec<EntityKind> = Vec::new();
        for record in self.records.values() {
            if !kinds.contains(&record.kind) {
                kinds.push(record.kind);
            }
        }
        kinds
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Ksat, KsatKind, Workrole};

    const NO_ATTRS: [(&str, &str); 0] = [];

    #[test]
    fn test_partial_observations_merge() {
        let mut registry = EntityRegistry::new();
        let first = registry.upsert(EntityKind::Workrole, "SP-ARC-001", [("title", "Architect")]);
        let second = registry.upsert(
            EntityKind::Workrole,
            "SP-ARC-001",
            [
                ("title", "Enterprise Architect"),
                ("description", "Develops and maintains business systems"),
                ("opm_code", "651"),
            ],
        );
        assert_eq!(first, second);
        assert_eq!(registry.len(), 1);

        let record = registry.get(&first).unwrap();
        assert_eq!(record.get("id"), Some("SP-ARC-001"));
        assert_eq!(record.get("title"), Some("Enterprise Architect"));
        assert_eq!(record.get("description"), Some("Develops and maintains business systems"));
        assert_eq!(record.get("opm_code"), Some("651"));
    }

    #[test]
    fn test_empty_values_never_clear() {
        let mut registry = EntityRegistry::new();
        let workrole = Workrole {
            id: "SP-ARC-001".to_string(),
            category: "SP".to_string(),
            title: "Enterprise Architect".to_string(),
            description: "Designs things".to_string(),
            opm_code: String::new(),
        };
        let handle = registry.insert(&workrole);
        registry.upsert(EntityKind::Workrole, "SP-ARC-001", [("description", "  ")]);

        let record = registry.get(&handle).unwrap();
        assert_eq!(record.get("description"), Some("Designs things"));
        assert_eq!(record.get("opm_code"), None);
    }

    #[test]
    fn test_key_property_is_not_overwritten() {
        let mut registry = EntityRegistry::new();
        let handle = registry.upsert(
            EntityKind::Function,
            "ID",
            [("id", "PR"), ("title", "IDENTIFY")],
        );
        assert_eq!(registry.get(&handle).unwrap().get("id"), Some("ID"));
    }

    #[test]
    fn test_extra_labels_merge_as_set() {
        let mut registry = EntityRegistry::new();
        let ksat = Ksat {
            id: "K0001".to_string(),
            kind: KsatKind::Knowledge,
            description: "Knowledge of networks".to_string(),
        };
        let handle = registry.insert(&ksat);
        registry.insert(&ksat);
        assert_eq!(registry.get(&handle).unwrap().labels, vec!["Knowledge"]);
    }

    #[test]
    fn test_all_preserves_insertion_order() {
        let mut registry = EntityRegistry::new();
        registry.upsert(EntityKind::Function, "PR", NO_ATTRS);
        registry.upsert(EntityKind::Category, "PR.AC", NO_ATTRS);
        registry.upsert(EntityKind::Function, "ID", NO_ATTRS);
        registry.upsert(EntityKind::Function, "PR", [("title", "PROTECT")]);

        let keys: Vec<_> = registry
            .all(EntityKind::Function)
            .iter()
            .map(|r| r.key.as_str())
            .collect();
        assert_eq!(keys, vec!["PR", "ID"]);
        assert_eq!(registry.kinds(), vec![EntityKind::Function, EntityKind::Category]);
    }
}
