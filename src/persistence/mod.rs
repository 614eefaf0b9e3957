//! Document storage for vertices and edges
//!
//! The registry talks to storage only through [`GraphStore`]: point get, upsert,
//! delete and full scan over two collections. No multi-key atomicity is
//! assumed, so every adjacency update is a separate read-modify-write.

pub mod memory;
pub mod storage;

pub use memory::MemoryStore;
pub use storage::RocksStore;

use crate::graph::{Node, NodeId, NodeKind};
use async_trait::async_trait;
use futures::stream::BoxStream;
use std::fmt;
use thiserror::Error;

/// Storage errors
#[derive(Error, Debug)]
pub enum StorageError {
    #[error("RocksDB error: {0}")]
    RocksDb(#[from] rocksdb::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] bincode::Error),

    #[error("Column family error: {0}")]
    ColumnFamily(String),

    /// A vertex written to `edges` or the other way round
    #[error("{kind} {id} cannot be stored in collection {collection}")]
    WrongCollection {
        collection: Collection,
        kind: NodeKind,
        id: NodeId,
    },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

pub type StorageResult<T> = Result<T, StorageError>;

/// The two document collections
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Collection {
    Vertices,
    Edges,
}

impl Collection {
    pub fn name(&self) -> &'static str {
        match self {
            Collection::Vertices => "vertices",
            Collection::Edges => "edges",
        }
    }

    /// Collection that holds nodes of `kind`
    pub fn of(kind: NodeKind) -> Self {
        match kind {
            NodeKind::Vertex => Collection::Vertices,
            NodeKind::Edge => Collection::Edges,
        }
    }

    /// Reject a node whose kind does not belong here
    pub(crate) fn check(&self, node: &Node) -> StorageResult<()> {
        if Collection::of(node.kind()) == *self {
            Ok(())
        } else {
            Err(StorageError::WrongCollection {
                collection: *self,
                kind: node.kind(),
                id: node.id().clone(),
            })
        }
    }
}

impl fmt::Display for Collection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Lazy sequence of stored documents
pub type NodeStream = BoxStream<'static, StorageResult<Node>>;

/// Key-value collaborator behind the registry
#[async_trait]
pub trait GraphStore: Send + Sync {
    /// Point lookup; `None` when absent
    async fn get(&self, collection: Collection, id: &NodeId) -> StorageResult<Option<Node>>;

    /// Upsert keyed by the node's id
    async fn put(&self, collection: Collection, node: &Node) -> StorageResult<()>;

    /// Delete by id; deleting an absent id is not an error
    async fn delete(&self, collection: Collection, id: &NodeId) -> StorageResult<()>;

    /// Full scan, order defined by the implementation
    async fn scan(&self, collection: Collection) -> StorageResult<NodeStream>;
}
