//! Samyama Gremlin
//!
//! An embedded property graph database with a lazily evaluated, Gremlin-style
//! traversal API over a pluggable document store.
//!
//! # Architecture
//!
//! - [`graph`]: the data model (vertices, edges, result elements) and the
//!   [`Graph`] registry that creates, removes and looks up nodes while keeping
//!   adjacency lists consistent
//! - [`traversal`]: immutable, parent-linked pipeline stages. Filtering,
//!   expansion, set algebra, bookmarks and materialization
//! - [`persistence`]: the [`GraphStore`] trait with an in-memory store and a
//!   RocksDB store (one column family per collection, bincode documents)
//! - [`config`]: backend selection
//!
//! ## Example Usage
//!
//! ```rust
//! use samyama_gremlin::{property_map, Graph, PropertyMap};
//!
//! # #[tokio::main]
//! # async fn main() -> Result<(), samyama_gremlin::GraphError> {
//! let graph = Graph::in_memory();
//!
//! let tom = graph.add_vertex(property_map([("name", "Tom Hanks")])).await?;
//! let movie = graph.add_vertex(property_map([("title", "Big")])).await?;
//! graph.add_edge(&tom, &movie, "acted_in", PropertyMap::new()).await?;
//!
//! let titles = graph
//!     .v()
//!     .has([("name", "Tom Hanks")])
//!     .out("acted_in")
//!     .to_array()
//!     .await?;
//! assert_eq!(titles.len(), 1);
//! # Ok(())
//! # }
//! ```

#![allow(missing_docs)]
#![warn(clippy::all)]

pub mod config;
pub mod graph;
pub mod persistence;
pub mod traversal;

// Re-export main types for convenience
pub use graph::{
    property_map, Direction, Edge, Element, Endpoint, Graph, GraphError, GraphResult, IdList,
    Label, Node, NodeId, NodeKind, Pattern, Projection, PropertyMap, PropertyValue, Selection,
    Vertex,
};

pub use config::{GraphConfig, StorageBackend};

pub use persistence::{Collection, GraphStore, MemoryStore, RocksStore, StorageError, StorageResult};

pub use traversal::{merge, Branch, ElementStream, Traversal};

/// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Get version string
pub fn version() -> &'static str {
    VERSION
}
