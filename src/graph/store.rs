//! In-memory property graph
//!
//! Arena storage with adjacency lists, a label index, a (label, property,
//! value) lookup index and an edge set keyed by (source, type, target). The
//! graph only grows: the importer never deletes.

use super::edge::Edge;
use super::node::Node;
use super::types::{EdgeId, EdgeType, Label, NodeId};
use crate::model::Properties;
use crate::store::{
    Command, EdgeMergeStats, GraphStore, MergeKey, NodeBatch, NodeMergeStats, RelationshipBatch,
    StoreError, StoreResult, PROCEDURE_CALL_FAILED,
};
use indexmap::IndexMap;
use rustc_hash::{FxHashMap, FxHashSet};
use std::collections::{BTreeMap, HashMap};
use thiserror::Error;
use tracing::debug;

/// Errors from direct graph manipulation
#[derive(Error, Debug, PartialEq, Eq)]
pub enum GraphError {
    #[error("Node {0} not found")]
    NodeNotFound(NodeId),

    #[error("Invalid edge: source node {0} does not exist")]
    InvalidEdgeSource(NodeId),

    #[error("Invalid edge: target node {0} does not exist")]
    InvalidEdgeTarget(NodeId),
}

pub type GraphResult<T> = Result<T, GraphError>;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct PropertyKey {
    label: Label,
    property: String,
    value: String,
}

/// Full-text index definition
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FulltextIndex {
    pub labels: Vec<Label>,
    pub properties: Vec<String>,
}

/// Node and edge counts
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GraphStatistics {
    pub node_count: usize,
    pub edge_count: usize,
    pub label_counts: BTreeMap<String, usize>,
    pub edge_type_counts: BTreeMap<String, usize>,
}

/// In-memory graph store
#[derive(Debug, Default)]
pub struct MemoryGraph {
    nodes: Vec<Node>,
    edges: Vec<Edge>,
    outgoing: Vec<Vec<EdgeId>>,
    incoming: Vec<Vec<EdgeId>>,
    label_index: HashMap<Label, Vec<NodeId>>,
    property_index: FxHashMap<PropertyKey, Vec<NodeId>>,
    edge_set: FxHashSet<(NodeId, EdgeType, NodeId)>,
    fulltext: IndexMap<String, FulltextIndex>,
}

impl MemoryGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a node with the given labels and properties
    pub fn create_node(
        &mut self,
        labels: impl IntoIterator<Item = Label>,
        properties: Properties,
    ) -> NodeId {
        let id = NodeId(self.nodes.len() as u64);
        let node = Node::new(id, labels, properties);

        for label in &node.labels {
            self.label_index.entry(label.clone()).or_default().push(id);
        }
        self.index_properties(&node, node.labels.iter());

        self.nodes.push(node);
        self.outgoing.push(Vec::new());
        self.incoming.push(Vec::new());
        id
    }

    pub fn get_node(&self, id: NodeId) -> Option<&Node> {
        self.nodes.get(id.index())
    }

    /// Set a property and keep the lookup index in step
    pub fn set_node_property(&mut self, id: NodeId, key: &str, value: &str) -> GraphResult<()> {
        let node = self.nodes.get_mut(id.index()).ok_or(GraphError::NodeNotFound(id))?;
        let old = node.set_property(key, value);
        if old.as_deref() == Some(value) {
            return Ok(());
        }

        let labels: Vec<Label> = node.labels.iter().cloned().collect();
        for label in labels {
            if let Some(old) = &old {
                let stale = PropertyKey {
                    label: label.clone(),
                    property: key.to_string(),
                    value: old.clone(),
                };
                if let Some(ids) = self.property_index.get_mut(&stale) {
                    ids.retain(|&n| n != id);
                }
            }
            self.property_index
                .entry(PropertyKey {
                    label,
                    property: key.to_string(),
                    value: value.to_string(),
                })
                .or_default()
                .push(id);
        }
        Ok(())
    }

    /// Add a label to an existing node and to the label and lookup indices
    pub fn add_label_to_node(&mut self, id: NodeId, label: impl Into<Label>) -> GraphResult<()> {
        let label = label.into();
        let node = self.nodes.get_mut(id.index()).ok_or(GraphError::NodeNotFound(id))?;
        if !node.add_label(label.clone()) {
            return Ok(());
        }
        self.label_index.entry(label.clone()).or_default().push(id);

        let node = &self.nodes[id.index()];
        for (property, value) in &node.properties {
            self.property_index
                .entry(PropertyKey {
                    label: label.clone(),
                    property: property.clone(),
                    value: value.clone(),
                })
                .or_default()
                .push(id);
        }
        Ok(())
    }

    fn index_properties<'a>(&mut self, node: &Node, labels: impl Iterator<Item = &'a Label>) {
        for label in labels {
            for (property, value) in &node.properties {
                self.property_index
                    .entry(PropertyKey {
                        label: label.clone(),
                        property: property.clone(),
                        value: value.clone(),
                    })
                    .or_default()
                    .push(node.id);
            }
        }
    }

    /// First node with `label` whose `property` equals `value`
    pub fn find_node(&self, label: &str, property: &str, value: &str) -> Option<NodeId> {
        let key = PropertyKey {
            label: Label::new(label),
            property: property.to_string(),
            value: value.to_string(),
        };
        self.property_index.get(&key).and_then(|ids| ids.first().copied())
    }

    fn find_by_key(&self, key: &MergeKey, value: &str) -> Option<NodeId> {
        self.find_node(&key.label, &key.property, value)
    }

    /// Create a directed edge between two existing nodes
    pub fn create_edge(
        &mut self,
        source: NodeId,
        target: NodeId,
        edge_type: impl Into<EdgeType>,
    ) -> GraphResult<EdgeId> {
        if self.get_node(source).is_none() {
            return Err(GraphError::InvalidEdgeSource(source));
        }
        if self.get_node(target).is_none() {
            return Err(GraphError::InvalidEdgeTarget(target));
        }

        let id = EdgeId(self.edges.len() as u64);
        let edge = Edge::new(id, source, target, edge_type);
        self.edge_set.insert((source, edge.edge_type.clone(), target));
        self.outgoing[source.index()].push(id);
        self.incoming[target.index()].push(id);
        self.edges.push(edge);
        Ok(id)
    }

    pub fn get_edge(&self, id: EdgeId) -> Option<&Edge> {
        self.edges.get(id.index())
    }

    pub fn has_edge(&self, source: NodeId, edge_type: &str, target: NodeId) -> bool {
        self.edge_set
            .contains(&(source, EdgeType::new(edge_type), target))
    }

    pub fn get_outgoing_edges(&self, node_id: NodeId) -> Vec<&Edge> {
        self.outgoing
            .get(node_id.index())
            .map(|ids| ids.iter().filter_map(|&id| self.get_edge(id)).collect())
            .unwrap_or_default()
    }

    pub fn get_incoming_edges(&self, node_id: NodeId) -> Vec<&Edge> {
        self.incoming
            .get(node_id.index())
            .map(|ids| ids.iter().filter_map(|&id| self.get_edge(id)).collect())
            .unwrap_or_default()
    }

    pub fn get_nodes_by_label(&self, label: &str) -> Vec<&Node> {
        self.label_index
            .get(&Label::new(label))
            .map(|ids| ids.iter().filter_map(|&id| self.get_node(id)).collect())
            .unwrap_or_default()
    }

    pub fn nodes(&self) -> impl Iterator<Item = &Node> {
        self.nodes.iter()
    }

    pub fn edges(&self) -> impl Iterator<Item = &Edge> {
        self.edges.iter()
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }

    pub fn statistics(&self) -> GraphStatistics {
        let mut stats = GraphStatistics {
            node_count: self.node_count(),
            edge_count: self.edge_count(),
            ..GraphStatistics::default()
        };
        for (label, ids) in &self.label_index {
            stats.label_counts.insert(label.to_string(), ids.len());
        }
        for edge in &self.edges {
            *stats
                .edge_type_counts
                .entry(edge.edge_type.to_string())
                .or_default() += 1;
        }
        stats
    }

    pub fn fulltext_index(&self, name: &str) -> Option<&FulltextIndex> {
        self.fulltext.get(name)
    }

    /// Case-insensitive substring search over a full-text index.
    /// `None` when no index of that name exists.
    pub fn fulltext_search(&self, index: &str, term: &str) -> Option<Vec<&Node>> {
        let definition = self.fulltext.get(index)?;
        let term = term.to_lowercase();
        let mut hits: Vec<&Node> = self
            .nodes
            .iter()
            .filter(|node| definition.labels.iter().any(|l| node.has_label(l.as_str())))
            .filter(|node| {
                definition.properties.iter().any(|p| {
                    node.get_property(p)
                        .is_some_and(|v| v.to_lowercase().contains(&term))
                })
            })
            .collect();
        hits.sort_by_key(|n| n.id);
        Some(hits)
    }
}

impl GraphStore for MemoryGraph {
    fn merge_nodes(&mut self, batch: &NodeBatch) -> StoreResult<NodeMergeStats> {
        let mut stats = NodeMergeStats::default();
        for row in &batch.rows {
            match self.find_by_key(&batch.merge_key, &row.key) {
                Some(id) => {
                    for (key, value) in &row.properties {
                        self.set_node_property(id, key, value).map_err(internal)?;
                    }
                    for label in &row.labels {
                        self.add_label_to_node(id, label.as_str()).map_err(internal)?;
                    }
                    stats.matched += 1;
                }
                None => {
                    let mut properties = row.properties.clone();
                    properties.insert(batch.merge_key.property.clone(), row.key.clone());
                    let labels = std::iter::once(Label::new(batch.merge_key.label.as_str()))
                        .chain(row.labels.iter().map(|l| Label::new(l.as_str())));
                    self.create_node(labels, properties);
                    stats.created += 1;
                }
            }
        }
        debug!(
            "Merged {} {} nodes ({} created)",
            batch.rows.len(),
            batch.merge_key.label,
            stats.created
        );
        Ok(stats)
    }

    fn merge_relationships(&mut self, batch: &RelationshipBatch) -> StoreResult<EdgeMergeStats> {
        let mut stats = EdgeMergeStats::default();
        for row in &batch.rows {
            let (Some(source), Some(target)) = (
                self.find_by_key(&batch.start, &row.start),
                self.find_by_key(&batch.end, &row.end),
            ) else {
                stats.unresolved += 1;
                continue;
            };
            if self.has_edge(source, &batch.rel_type, target) {
                stats.existing += 1;
            } else {
                self.create_edge(source, target, batch.rel_type.as_str())
                    .map_err(internal)?;
                stats.created += 1;
            }
        }
        Ok(stats)
    }

    fn execute(&mut self, command: &Command) -> StoreResult<usize> {
        match command {
            Command::CreateFulltextIndex {
                name,
                labels,
                properties,
            } => {
                if self.fulltext.contains_key(name) {
                    return Err(StoreError::Database {
                        code: PROCEDURE_CALL_FAILED.to_string(),
                        message: format!("There already exists an index called '{}'", name),
                    });
                }
                self.fulltext.insert(
                    name.clone(),
                    FulltextIndex {
                        labels: labels.iter().map(|l| Label::new(l.as_str())).collect(),
                        properties: properties.clone(),
                    },
                );
                Ok(0)
            }
            Command::SetProperties { key, rows } => {
                let mut touched = 0;
                for (value, properties) in rows {
                    let Some(id) = self.find_by_key(key, value) else {
                        continue;
                    };
                    for (name, v) in properties {
                        self.set_node_property(id, name, v).map_err(internal)?;
                    }
                    touched += 1;
                }
                Ok(touched)
            }
        }
    }
}

fn internal(err: GraphError) -> StoreError {
    StoreError::UnexpectedResponse(err.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::{EdgeRow, NodeRow};

    fn props(pairs: &[(&str, &str)]) -> Properties {
        pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect()
    }

    fn workrole_batch(rows: &[(&str, &str)]) -> NodeBatch {
        NodeBatch {
            merge_key: MergeKey::new("NICEWorkrole", "id"),
            rows: rows
                .iter()
                .map(|(key, title)| NodeRow {
                    key: key.to_string(),
                    labels: Vec::new(),
                    properties: props(&[("title", title)]),
                })
                .collect(),
        }
    }

    #[test]
    fn test_create_and_find_node() {
        let mut graph = MemoryGraph::new();
        let id = graph.create_node([Label::new("NISTFunction")], props(&[("id", "ID")]));
        assert_eq!(graph.find_node("NISTFunction", "id", "ID"), Some(id));
        assert_eq!(graph.find_node("NISTCategory", "id", "ID"), None);
    }

    #[test]
    fn test_lookup_index_follows_property_updates() {
        let mut graph = MemoryGraph::new();
        let id = graph.create_node([Label::new("NICECompetencyGroup")], props(&[("name", "Old")]));
        graph.set_node_property(id, "name", "New").unwrap();
        assert_eq!(graph.find_node("NICECompetencyGroup", "name", "Old"), None);
        assert_eq!(graph.find_node("NICECompetencyGroup", "name", "New"), Some(id));

        graph.add_label_to_node(id, "Grouping").unwrap();
        assert_eq!(graph.find_node("Grouping", "name", "New"), Some(id));
        assert_eq!(graph.get_nodes_by_label("Grouping").len(), 1);
    }

    #[test]
    fn test_edge_validation() {
        let mut graph = MemoryGraph::new();
        let a = graph.create_node([Label::new("KSAT")], Properties::new());
        assert_eq!(
            graph.create_edge(a, NodeId(7), "NICE_WORKROLE"),
            Err(GraphError::InvalidEdgeTarget(NodeId(7)))
        );
        assert_eq!(
            graph.create_edge(NodeId(9), a, "NICE_WORKROLE"),
            Err(GraphError::InvalidEdgeSource(NodeId(9)))
        );
    }

    #[test]
    fn test_merge_nodes_updates_existing() {
        let mut graph = MemoryGraph::new();
        let stats = graph
            .merge_nodes(&workrole_batch(&[
                ("SP-ARC-001", "Architect"),
                ("SP-ARC-002", "Security Architect"),
            ]))
            .unwrap();
        assert_eq!(stats, NodeMergeStats { created: 2, matched: 0 });

        let stats = graph
            .merge_nodes(&workrole_batch(&[("SP-ARC-001", "Enterprise Architect")]))
            .unwrap();
        assert_eq!(stats, NodeMergeStats { created: 0, matched: 1 });
        assert_eq!(graph.node_count(), 2);

        let id = graph.find_node("NICEWorkrole", "id", "SP-ARC-001").unwrap();
        assert_eq!(
            graph.get_node(id).unwrap().get_property("title"),
            Some("Enterprise Architect")
        );
    }

    #[test]
    fn test_merge_relationships_no_parallel_edges() {
        let mut graph = MemoryGraph::new();
        graph.create_node([Label::new("KSAT")], props(&[("id", "K0001")]));
        graph.create_node([Label::new("NICEWorkrole")], props(&[("id", "SP-ARC-001")]));

        let batch = RelationshipBatch {
            start: MergeKey::new("KSAT", "id"),
            rel_type: "NICE_WORKROLE".to_string(),
            end: MergeKey::new("NICEWorkrole", "id"),
            rows: vec![
                EdgeRow { start: "K0001".into(), end: "SP-ARC-001".into() },
                EdgeRow { start: "K0001".into(), end: "SP-ARC-001".into() },
                EdgeRow { start: "K9999".into(), end: "SP-ARC-001".into() },
            ],
        };
        let stats = graph.merge_relationships(&batch).unwrap();
        assert_eq!(stats, EdgeMergeStats { created: 1, existing: 1, unresolved: 1 });

        let stats = graph.merge_relationships(&batch).unwrap();
        assert_eq!(stats, EdgeMergeStats { created: 0, existing: 2, unresolved: 1 });
        assert_eq!(graph.edge_count(), 1);
    }

    #[test]
    fn test_fulltext_index_created_once() {
        let mut graph = MemoryGraph::new();
        let command = Command::CreateFulltextIndex {
            name: "ksat_index".to_string(),
            labels: vec!["Knowledge".to_string(), "Task".to_string()],
            properties: vec!["id".to_string(), "description".to_string()],
        };
        graph.execute(&command).unwrap();
        let err = graph.execute(&command).unwrap_err();
        assert!(err.is_already_exists());

        graph.create_node(
            [Label::new("KSAT"), Label::new("Task")],
            props(&[("id", "T0001"), ("description", "Conduct vulnerability scans")]),
        );
        graph.create_node(
            [Label::new("KSAT"), Label::new("Skill")],
            props(&[("id", "S0001"), ("description", "Skill in conducting vulnerability scans")]),
        );
        let hits = graph.fulltext_search("ksat_index", "VULNERABILITY").unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].get_property("id"), Some("T0001"));
        assert!(graph.fulltext_search("missing", "x").is_none());
    }

    #[test]
    fn test_set_properties_never_creates() {
        let mut graph = MemoryGraph::new();
        graph.create_node([Label::new("NICECompetency")], props(&[("id", "C001")]));
        let touched = graph
            .execute(&Command::SetProperties {
                key: MergeKey::new("NICECompetency", "id"),
                rows: vec![
                    ("C001".to_string(), props(&[("description", "Assessing risk")])),
                    ("C999".to_string(), props(&[("description", "Unknown")])),
                ],
            })
            .unwrap();
        assert_eq!(touched, 1);
        assert_eq!(graph.node_count(), 1);
    }

    #[test]
    fn test_statistics() {
        let mut graph = MemoryGraph::new();
        let a = graph.create_node([Label::new("KSAT"), Label::new("Task")], Properties::new());
        let b = graph.create_node([Label::new("NICEWorkrole")], Properties::new());
        graph.create_edge(a, b, "NICE_WORKROLE").unwrap();

        let stats = graph.statistics();
        assert_eq!(stats.node_count, 2);
        assert_eq!(stats.edge_count, 1);
        assert_eq!(stats.label_counts.get("KSAT"), Some(&1));
        assert_eq!(stats.edge_type_counts.get("NICE_WORKROLE"), Some(&1));
        assert_eq!(graph.get_outgoing_edges(a).len(), 1);
        assert_eq!(graph.get_incoming_edges(b).len(), 1);
    }
}
