//! In-memory property graph
//!
//! Labeled nodes with string properties and typed directed edges. Implements
//! [`crate::store::GraphStore`] so a full import can run without an external
//! database, for tests and dry runs.

pub mod edge;
pub mod node;
pub mod store;
pub mod types;

pub use edge::Edge;
pub use node::Node;
pub use store::{FulltextIndex, GraphError, GraphResult, GraphStatistics, MemoryGraph};
pub use types::{EdgeId, EdgeType, Label, NodeId};
