//! Graph store interface
//!
//! The loader talks to the store only through [`GraphStore`]: a bulk node
//! merge, a bulk relationship merge, and a small set of administrative
//! commands. Implemented by [`crate::graph::MemoryGraph`] and
//! [`crate::remote::RemoteStore`].

use crate::model::Properties;
use serde::Serialize;
use thiserror::Error;

/// Error code a store returns when a procedure fails, e.g. because the index
/// it should create already exists
pub const PROCEDURE_CALL_FAILED: &str = "Neo.ClientError.Procedure.ProcedureCallFailed";

/// Error code for schema objects that already exist
pub const EQUIVALENT_SCHEMA_RULE_EXISTS: &str =
    "Neo.ClientError.Schema.EquivalentSchemaRuleAlreadyExists";

/// Errors reported by a graph store
#[derive(Error, Debug)]
pub enum StoreError {
    /// The store rejected a statement
    #[error("{code}: {message}")]
    Database { code: String, message: String },

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Store returned HTTP {status}: {body}")]
    Status { status: u16, body: String },

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Unexpected response: {0}")]
    UnexpectedResponse(String),
}

impl StoreError {
    /// True when the failure only means the object to create is already there
    pub fn is_already_exists(&self) -> bool {
        match self {
            StoreError::Database { code, .. } => {
                code == PROCEDURE_CALL_FAILED || code == EQUIVALENT_SCHEMA_RULE_EXISTS
            }
            _ => false,
        }
    }
}

pub type StoreResult<T> = Result<T, StoreError>;

/// Label plus the property holding the natural key
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct MergeKey {
    pub label: String,
    pub property: String,
}

impl MergeKey {
    pub fn new(label: impl Into<String>, property: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            property: property.into(),
        }
    }
}

/// One node to merge
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NodeRow {
    pub key: String,
    /// Labels added besides the merge key's label
    pub labels: Vec<String>,
    pub properties: Properties,
}

/// Homogeneous node batch: every row shares the merge key
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NodeBatch {
    pub merge_key: MergeKey,
    pub rows: Vec<NodeRow>,
}

/// One edge to merge, endpoints given by natural key value
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EdgeRow {
    pub start: String,
    pub end: String,
}

/// Homogeneous relationship batch: one type, one start shape, one end shape
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RelationshipBatch {
    pub start: MergeKey,
    pub rel_type: String,
    pub end: MergeKey,
    pub rows: Vec<EdgeRow>,
}

/// Administrative statement
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Full-text node index over `labels` and `properties`
    CreateFulltextIndex {
        name: String,
        labels: Vec<String>,
        properties: Vec<String>,
    },
    /// Set properties on existing nodes matched by key; never creates nodes
    SetProperties {
        key: MergeKey,
        rows: Vec<(String, Properties)>,
    },
}

/// Outcome of a node merge
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct NodeMergeStats {
    pub created: usize,
    pub matched: usize,
}

/// Outcome of a relationship merge
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EdgeMergeStats {
    pub created: usize,
    pub existing: usize,
    /// Rows whose start or end node was not found
    pub unresolved: usize,
}

/// A property graph store that supports keyed merges.
///
/// Each call is one round-trip; implementations apply a batch atomically when
/// the store allows it.
pub trait GraphStore {
    /// Create-or-update every row by (label, key property, key value)
    fn merge_nodes(&mut self, batch: &NodeBatch) -> StoreResult<NodeMergeStats>;

    /// Create each edge unless one of the same type already connects the two nodes
    fn merge_relationships(&mut self, batch: &RelationshipBatch) -> StoreResult<EdgeMergeStats>;

    /// Run an administrative command, returning the number of nodes it touched
    fn execute(&mut self, command: &Command) -> StoreResult<usize>;
}

impl<S: GraphStore + ?Sized> GraphStore for &mut S {
    fn merge_nodes(&mut self, batch: &NodeBatch) -> StoreResult<NodeMergeStats> {
        (**self).merge_nodes(batch)
    }

    fn merge_relationships(&mut self, batch: &RelationshipBatch) -> StoreResult<EdgeMergeStats> {
        (**self).merge_relationships(batch)
    }

    fn execute(&mut self, command: &Command) -> StoreResult<usize> {
        (**self).execute(command)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_already_exists_signature() {
        let err = StoreError::Database {
            code: PROCEDURE_CALL_FAILED.to_string(),
            message: "There already exists an index called 'ksat_index'".to_string(),
        };
        assert!(err.is_already_exists());

        let other = StoreError::Database {
            code: "Neo.ClientError.Security.Unauthorized".to_string(),
            message: "auth failure".to_string(),
        };
        assert!(!other.is_already_exists());
        assert!(!StoreError::UnexpectedResponse("x".to_string()).is_already_exists());
    }
}
