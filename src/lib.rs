//! cwfgraph
//!
//! Loads the NIST Cybersecurity Framework and the NICE Cybersecurity Workforce
//! Framework workbooks into a property graph. Nodes are identified by their
//! natural keys (`ID.AM`, `SP-ARC-001`, `K0001`, ...) and every write is a
//! merge, so importing the same workbooks again leaves the graph unchanged.
//!
//! # Architecture
//!
//! - [`extract`]: fixed patterns that turn spreadsheet cells into typed fragments
//! - [`registry`] and [`collector`]: per-phase entity records and relationships
//! - [`loader`]: batched, idempotent writes through a [`GraphStore`]
//! - [`pipeline`]: the ordered import phases
//! - [`graph`]: in-memory store, used for tests and dry runs
//! - [`remote`]: Neo4j HTTP transactional endpoint
//!
//! ## Example Usage
//!
//! ```rust
//! use cwfgraph::graph::MemoryGraph;
//! use cwfgraph::pipeline::Pipeline;
//!
//! let mut pipeline = Pipeline::new(MemoryGraph::new());
//! pipeline.import_categories().unwrap();
//! pipeline.create_index().unwrap();
//!
//! let graph = pipeline.into_store();
//! assert_eq!(graph.get_nodes_by_label("NICECategory").len(), 7);
//! ```

#![allow(missing_docs)]
#![warn(clippy::all)]

pub mod collector;
pub mod config;
pub mod error;
pub mod extract;
pub mod graph;
pub mod loader;
pub mod model;
pub mod pipeline;
pub mod registry;
pub mod remote;
pub mod source;
pub mod store;
pub mod workbook;

// Re-export main types for convenience
pub use collector::{Relationship, RelationshipCollector};
pub use config::{ConfigError, ConfigResult, DataSource, DataSources, ImportConfig, StoreConfig};
pub use error::{ImportError, ImportResult, RowLocation};
pub use extract::{extract, ExtractError, ExtractResult, Fragment};
pub use graph::{GraphError, GraphResult, GraphStatistics, MemoryGraph};
pub use loader::{BulkLoader, LoadError, LoadReport, LoadResult};
pub use model::{Entity, EntityKind, KsatKind, Properties, RelType};
pub use pipeline::{Phase, PhaseSummary, Pipeline, RunSummary};
pub use registry::{EntityHandle, EntityRecord, EntityRegistry};
pub use remote::RemoteStore;
pub use source::{SourceCache, SourceError, SourceResult};
pub use store::{GraphStore, StoreError, StoreResult};
pub use workbook::{Record, Sheet, Workbook, WorkbookError, WorkbookResult, Workbooks};

/// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Get version string
pub fn version() -> &'static str {
    VERSION
}
