//! Relationship collector
//!
//! Edges are recorded by endpoint (kind, natural key) only. Neither endpoint
//! has to be registered in the current phase; the store resolves them when
//! the edges are merged.

use crate::model::{EntityKind, RelType};
use crate::registry::EntityHandle;
use indexmap::{IndexMap, IndexSet};

/// A directed, typed edge between two natural keys
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Relationship {
    pub source: EntityHandle,
    pub rel_type: RelType,
    pub target: EntityHandle,
}

impl Relationship {
    /// Endpoint kinds and type; every edge in one loader call shares it
    pub fn shape(&self) -> (EntityKind, RelType, EntityKind) {
        (self.source.kind, self.rel_type, self.target.kind)
    }
}

/// Phase-scoped set of relationships, deduplicated by (source, type, target)
#[derive(Debug, Default)]
pub struct RelationshipCollector {
    edges: IndexSet<Relationship>,
}

impl RelationshipCollector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record an edge. Returns false when the same triple was already recorded.
    pub fn add(
        &mut self,
        source_kind: EntityKind,
        source_key: &str,
        rel_type: RelType,
        target_kind: EntityKind,
        target_key: &str,
    ) -> bool {
        self.edges.insert(Relationship {
            source: EntityHandle::new(source_kind, source_key.trim()),
            rel_type,
            target: EntityHandle::new(target_kind, target_key.trim()),
        })
    }

    pub fn link(
        &mut self,
        source: &EntityHandle,
        rel_type: RelType,
        target: &EntityHandle,
    ) -> bool {
        self.add(source.kind, &source.key, rel_type, target.kind, &target.key)
    }

    /// Edges grouped by shape, groups and members in first-seen order
    pub fn grouped(&self) -> Vec<Vec<Relationship>> {
        let mut groups: IndexMap<(EntityKind, RelType, EntityKind), Vec<Relationship>> =
            IndexMap::new();
        for edge in &self.edges {
            groups.entry(edge.shape()).or_default().push(edge.clone());
        }
        groups.into_values().collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Relationship> {
        self.edges.iter()
    }

    pub fn len(&self) -> usize {
        self.edges.len()
    }

    pub fn is_empty(&self) -> bool {
        self.edges.is_empty()
    }
}
