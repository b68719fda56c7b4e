//! Bulk graph loader
//!
//! Streams registry records and collected relationships to a [`GraphStore`]
//! in fixed-size batches. Nodes are merged on (label, key property, key
//! value); relationships are merged on (start key, type, end key), so loading
//! the same data twice leaves the graph unchanged.
//!
//! A failed batch aborts the call. Batches committed before it stay committed
//! and are not retried; a re-run converges because every write is a merge.

use crate::collector::{Relationship, RelationshipCollector};
use crate::model::{EntityKind, Properties, RelType};
use crate::registry::{EntityRecord, EntityRegistry};
use crate::store::{
    Command, EdgeRow, GraphStore, MergeKey, NodeBatch, NodeRow, RelationshipBatch, StoreError,
};
use serde::Serialize;
use std::fmt;
use std::ops::AddAssign;
use thiserror::Error;
use tracing::{debug, info, warn};

pub const DEFAULT_BATCH_SIZE: usize = 1000;

/// Loader errors
#[derive(Error, Debug)]
pub enum LoadError {
    /// A record or edge does not match the shape the call was made for
    #[error("heterogeneous batch: expected {expected}, found {found}")]
    HeterogeneousBatch { expected: String, found: String },

    #[error("batch {batch} of {label} failed: {source}")]
    Batch {
        label: String,
        batch: usize,
        #[source]
        source: StoreError,
    },

    #[error("store error: {0}")]
    Store(#[from] StoreError),
}

pub type LoadResult<T> = Result<T, LoadError>;

/// What one or more loader calls did to the store
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct LoadReport {
    pub nodes_created: usize,
    pub nodes_updated: usize,
    pub edges_created: usize,
    pub edges_existing: usize,
    /// Edges skipped because an endpoint is not in the store
    pub edges_unresolved: usize,
    pub batches: usize,
}

impl LoadReport {
    pub fn nodes(&self) -> usize {
        self.nodes_created + self.nodes_updated
    }

    pub fn edges(&self) -> usize {
        self.edges_created + self.edges_existing
    }
}

impl AddAssign for LoadReport {
    fn add_assign(&mut self, other: Self) {
        self.nodes_created += other.nodes_created;
        self.nodes_updated += other.nodes_updated;
        self.edges_created += other.edges_created;
        self.edges_existing += other.edges_existing;
        self.edges_unresolved += other.edges_unresolved;
        self.batches += other.batches;
    }
}

impl fmt::Display for LoadReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} nodes created, {} updated; {} edges created, {} existing, {} unresolved",
            self.nodes_created,
            self.nodes_updated,
            self.edges_created,
            self.edges_existing,
            self.edges_unresolved
        )
    }
}

fn merge_key(kind: EntityKind) -> MergeKey {
    MergeKey::new(kind.label(), kind.key_property())
}

fn shape_name(source: EntityKind, rel_type: RelType, target: EntityKind) -> String {
    format!("({})-[:{}]->({})", source.label(), rel_type, target.label())
}

/// Batched, idempotent writer in front of a [`GraphStore`]
pub struct BulkLoader<S: GraphStore> {
    store: S,
    batch_size: usize,
}

impl<S: GraphStore> BulkLoader<S> {
    pub fn new(store: S) -> Self {
        Self {
            store,
            batch_size: DEFAULT_BATCH_SIZE,
        }
    }

    /// Records per store round-trip; values below 1 are raised to 1
    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size.max(1);
        self
    }

    pub fn batch_size(&self) -> usize {
        self.batch_size
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn store_mut(&mut self) -> &mut S {
        &mut self.store
    }

    pub fn into_inner(self) -> S {
        self.store
    }

    /// Merge every record of `kind`. Supplied properties overwrite, supplied
    /// extra labels are added, nothing is removed.
    pub fn load_nodes(
        &mut self,
        kind: EntityKind,
        records: &[&EntityRecord],
    ) -> LoadResult<LoadReport> {
        if let Some(stray) = records.iter().find(|r| r.kind != kind) {
            return Err(LoadError::HeterogeneousBatch {
                expected: kind.label().to_string(),
                found: format!("{} '{}'", stray.kind.label(), stray.key),
            });
        }

        let mut report = LoadReport::default();
        for (index, chunk) in records.chunks(self.batch_size).enumerate() {
            let batch = NodeBatch {
                merge_key: merge_key(kind),
                rows: chunk
                    .iter()
                    .map(|record| NodeRow {
                        key: record.key.clone(),
                        labels: record.labels.clone(),
                        properties: record.properties.clone(),
                    })
                    .collect(),
            };
            let stats = self.store.merge_nodes(&batch).map_err(|source| LoadError::Batch {
                label: kind.label().to_string(),
                batch: index,
                source,
            })?;
            report.nodes_created += stats.created;
            report.nodes_updated += stats.matched;
            report.batches += 1;
        }

        debug!("Loaded {} {} nodes in {} batches", records.len(), kind.label(), report.batches);
        Ok(report)
    }

    /// Merge edges of one shape. Edges whose endpoint does not exist in the
    /// store are skipped and counted as unresolved.
    pub fn load_relationships(
        &mut self,
        source: EntityKind,
        rel_type: RelType,
        target: EntityKind,
        edges: &[Relationship],
    ) -> LoadResult<LoadReport> {
        if let Some(stray) = edges.iter().find(|e| e.shape() != (source, rel_type, target)) {
            return Err(LoadError::HeterogeneousBatch {
                expected: shape_name(source, rel_type, target),
                found: shape_name(stray.source.kind, stray.rel_type, stray.target.kind),
            });
        }

        let mut report = LoadReport::default();
        for (index, chunk) in edges.chunks(self.batch_size).enumerate() {
            let batch = RelationshipBatch {
                start: merge_key(source),
                rel_type: rel_type.as_str().to_string(),
                end: merge_key(target),
                rows: chunk
                    .iter()
                    .map(|edge| EdgeRow {
                        start: edge.source.key.clone(),
                        end: edge.target.key.clone(),
                    })
                    .collect(),
            };
            let stats = self
                .store
                .merge_relationships(&batch)
                .map_err(|source| LoadError::Batch {
                    label: rel_type.as_str().to_string(),
                    batch: index,
                    source,
                })?;
            report.edges_created += stats.created;
            report.edges_existing += stats.existing;
            report.edges_unresolved += stats.unresolved;
            report.batches += 1;
        }

        if report.edges_unresolved > 0 {
            warn!(
                "{} of {} {} edges skipped: endpoint not found",
                report.edges_unresolved,
                edges.len(),
                shape_name(source, rel_type, target)
            );
        }
        Ok(report)
    }

    /// Write a phase: every kind's nodes, then every relationship group
    pub fn flush(
        &mut self,
        registry: &EntityRegistry,
        collector: &RelationshipCollector,
    ) -> LoadResult<LoadReport> {
        let mut report = LoadReport::default();
        for kind in registry.kinds() {
            report += self.load_nodes(kind, &registry.all(kind))?;
        }
        for group in collector.grouped() {
            let Some(first) = group.first() else {
                continue;
            };
            let (source, rel_type, target) = first.shape();
            report += self.load_relationships(source, rel_type, target, &group)?;
        }
        Ok(report)
    }

    /// Set properties on existing nodes of `kind`, matched by key. Never
    /// creates nodes; returns how many were matched.
    pub fn set_properties(
        &mut self,
        kind: EntityKind,
        rows: &[(String, Properties)],
    ) -> LoadResult<usize> {
        let mut touched = 0;
        for (index, chunk) in rows.chunks(self.batch_size).enumerate() {
            let command = Command::SetProperties {
                key: merge_key(kind),
                rows: chunk.to_vec(),
            };
            touched += self
                .store
                .execute(&command)
                .map_err(|source| LoadError::Batch {
                    label: kind.label().to_string(),
                    batch: index,
                    source,
                })?;
        }
        if touched < rows.len() {
            debug!(
                "{} of {} {} rows matched no node",
                rows.len() - touched,
                rows.len(),
                kind.label()
            );
        }
        Ok(touched)
    }

    /// Create a full-text node index. Returns false when the store reports
    /// that it already exists.
    pub fn ensure_fulltext_index(
        &mut self,
        name: &str,
        labels: &[&str],
        properties: &[&str],
    ) -> LoadResult<bool> {
        let command = Command::CreateFulltextIndex {
            name: name.to_string(),
            labels: labels.iter().map(|s| s.to_string()).collect(),
            properties: properties.iter().map(|s| s.to_string()).collect(),
        };
        match self.store.execute(&command) {
            Ok(_) => {
                info!("Created full-text index {}", name);
                Ok(true)
            }
            Err(err) if err.is_already_exists() => {
                info!("Index {} not created: {}", name, err);
                Ok(false)
            }
            Err(err) => Err(err.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::MemoryGraph;
    use crate::registry::EntityHandle;
    use crate::store::{EdgeMergeStats, NodeMergeStats, StoreResult};

    /// Store that fails every merge after the first `ok_batches`
    struct FlakyStore {
        ok_batches: usize,
        calls: usize,
    }

    impl GraphStore for FlakyStore {
        fn merge_nodes(&mut self, batch: &NodeBatch) -> StoreResult<NodeMergeStats> {
            self.calls += 1;
            if self.calls > self.ok_batches {
                return Err(StoreError::UnexpectedResponse("connection reset".to_string()));
            }
            Ok(NodeMergeStats {
                created: batch.rows.len(),
                matched: 0,
            })
        }

        fn merge_relationships(
            &mut self,
            _batch: &RelationshipBatch,
        ) -> StoreResult<EdgeMergeStats> {
            Ok(EdgeMergeStats::default())
        }

        fn execute(&mut self, _command: &Command) -> StoreResult<usize> {
            Err(StoreError::Database {
                code: "Neo.ClientError.Security.Forbidden".to_string(),
                message: "denied".to_string(),
            })
        }
    }

    fn workroles(registry: &mut EntityRegistry, count: usize) {
        for i in 0..count {
            registry.upsert(
                EntityKind::Workrole,
                &format!("SP-ARC-{:03}", i),
                [("title", format!("Role {}", i))],
            );
        }
    }

    #[test]
    fn test_batch_size_floor() {
        let loader = BulkLoader::new(MemoryGraph::new()).with_batch_size(0);
        assert_eq!(loader.batch_size(), 1);
        assert_eq!(BulkLoader::new(MemoryGraph::new()).batch_size(), DEFAULT_BATCH_SIZE);
    }

    #[test]
    fn test_load_nodes_in_batches() {
        let mut registry = EntityRegistry::new();
        workroles(&mut registry, 7);
        let mut loader = BulkLoader::new(MemoryGraph::new()).with_batch_size(3);

        let report = loader
            .load_nodes(EntityKind::Workrole, &registry.all(EntityKind::Workrole))
            .unwrap();
        assert_eq!(report.batches, 3);
        assert_eq!(report.nodes_created, 7);

        let report = loader
            .load_nodes(EntityKind::Workrole, &registry.all(EntityKind::Workrole))
            .unwrap();
        assert_eq!(report.nodes_created, 0);
        assert_eq!(report.nodes_updated, 7);
        assert_eq!(loader.store().node_count(), 7);
    }

    #[test]
    fn test_heterogeneous_nodes_rejected_before_sending() {
        let mut registry = EntityRegistry::new();
        workroles(&mut registry, 2);
        registry.upsert(EntityKind::SpecialtyArea, "ARC", [("title", "Architecture")]);

        let mut records = registry.all(EntityKind::Workrole);
        records.extend(registry.all(EntityKind::SpecialtyArea));

        let mut loader = BulkLoader::new(MemoryGraph::new());
        let err = loader.load_nodes(EntityKind::Workrole, &records).unwrap_err();
        assert!(matches!(err, LoadError::HeterogeneousBatch { .. }));
        assert_eq!(loader.store().node_count(), 0);
    }

    #[test]
    fn test_failed_batch_keeps_earlier_batches() {
        let mut registry = EntityRegistry::new();
        workroles(&mut registry, 5);
        let mut loader = BulkLoader::new(FlakyStore {
            ok_batches: 1,
            calls: 0,
        })
        .with_batch_size(2);

        let err = loader
            .load_nodes(EntityKind::Workrole, &registry.all(EntityKind::Workrole))
            .unwrap_err();
        match err {
            LoadError::Batch { label, batch, .. } => {
                assert_eq!(label, "NICEWorkrole");
                assert_eq!(batch, 1);
            }
            other => panic!("unexpected error {other:?}"),
        }
        assert_eq!(loader.store().calls, 2);
    }

    #[test]
    fn test_flush_links_across_phases() {
        let mut loader = BulkLoader::new(MemoryGraph::new());

        let mut first = EntityRegistry::new();
        first.upsert(EntityKind::SpecialtyArea, "ARC", [("title", "Architecture")]);
        loader.flush(&first, &RelationshipCollector::new()).unwrap();

        // Second phase only knows the specialty area by key
        let mut second = EntityRegistry::new();
        let role = second.upsert(EntityKind::Workrole, "SP-ARC-001", [("title", "Architect")]);
        let mut edges = RelationshipCollector::new();
        let architecture = EntityHandle::new(EntityKind::SpecialtyArea, "ARC");
        edges.link(&role, RelType::NiceSpecialtyArea, &architecture);
        edges.add(
            EntityKind::Workrole,
            "SP-ARC-001",
            RelType::NiceSpecialtyArea,
            EntityKind::SpecialtyArea,
            "XYZ",
        );

        let report = loader.flush(&second, &edges).unwrap();
        assert_eq!(report.nodes_created, 1);
        assert_eq!(report.edges_created, 1);
        assert_eq!(report.edges_unresolved, 1);
        assert_eq!(loader.store().node_count(), 2);
        assert_eq!(loader.store().edge_count(), 1);
    }

    #[test]
    fn test_heterogeneous_edges_rejected() {
        let mut edges = RelationshipCollector::new();
        edges.add(
            EntityKind::Ksat,
            "K0001",
            RelType::NiceWorkrole,
            EntityKind::Workrole,
            "SP-ARC-001",
        );
        edges.add(
            EntityKind::Ksat,
            "K0001",
            RelType::NiceCompetency,
            EntityKind::Competency,
            "C001",
        );
        let all: Vec<Relationship> = edges.iter().cloned().collect();

        let mut loader = BulkLoader::new(MemoryGraph::new());
        let err = loader
            .load_relationships(EntityKind::Ksat, RelType::NiceWorkrole, EntityKind::Workrole, &all)
            .unwrap_err();
        assert!(matches!(err, LoadError::HeterogeneousBatch { .. }));
    }

    #[test]
    fn test_fulltext_index_idempotent() {
        let mut loader = BulkLoader::new(MemoryGraph::new());
        assert!(loader.ensure_fulltext_index("ksat_index", &["Task"], &["id"]).unwrap());
        assert!(!loader.ensure_fulltext_index("ksat_index", &["Task"], &["id"]).unwrap());
    }

    #[test]
    fn test_fulltext_index_other_errors_propagate() {
        let mut loader = BulkLoader::new(FlakyStore {
            ok_batches: 0,
            calls: 0,
        });
        let err = loader.ensure_fulltext_index("ksat_index", &["Task"], &["id"]).unwrap_err();
        assert!(matches!(err, LoadError::Store(StoreError::Database { .. })));
    }
}
