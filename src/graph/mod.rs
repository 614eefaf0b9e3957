//! Property graph data model and node registry
//!
//! This module implements:
//! - Vertices with properties and per-label adjacency lists
//! - Directed, labelled edges with properties
//! - Result elements flowing through traversals (nodes, projections, selections)
//! - The [`Graph`] registry that keeps both ends of every edge in sync

pub mod edge;
pub mod element;
pub mod error;
pub mod id;
pub mod node;
pub mod property;
pub mod registry;
pub mod types;

// Re-export main types
pub use edge::Edge;
pub use element::{Element, Projection, Selection};
pub use error::{GraphError, GraphResult};
pub use id::{IdGenerator, SequentialIds, UuidGenerator};
pub use node::{Adjacency, Node, Vertex};
pub use property::{property_map, Pattern, PropertyMap, PropertyValue};
pub use registry::{Endpoint, Graph, IdList};
pub use types::{adjacency_key, Direction, Label, NodeId, NodeKind};
