//! In-memory document store
//!
//! Scans yield documents in insertion order, which keeps traversals over a
//! fresh graph deterministic.

use super::{Collection, GraphStore, NodeStream, StorageResult};
use crate::graph::{Node, NodeId};
use async_trait::async_trait;
use futures::stream::{self, StreamExt};
use indexmap::IndexMap;
use tokio::sync::RwLock;
use tracing::debug;

type Documents = IndexMap<NodeId, Node>;

#[derive(Debug, Default)]
pub struct MemoryStore {
    vertices: RwLock<Documents>,
    edges: RwLock<Documents>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn collection(&self, collection: Collection) -> &RwLock<Documents> {
        match collection {
            Collection::Vertices => &self.vertices,
            Collection::Edges => &self.edges,
        }
    }

    /// Number of stored documents in a collection
    pub async fn len(&self, collection: Collection) -> usize {
        self.collection(collection).read().await.len()
    }
}

#[async_trait]
impl GraphStore for MemoryStore {
    async fn get(&self, collection: Collection, id: &NodeId) -> StorageResult<Option<Node>> {
        Ok(self.collection(collection).read().await.get(id).cloned())
    }

    async fn put(&self, collection: Collection, node: &Node) -> StorageResult<()> {
        collection.check(node)?;
        self.collection(collection)
            .write()
            .await
            .insert(node.id().clone(), node.clone());
        debug!("Stored {} in {}", node.id(), collection);
        Ok(())
    }

    async fn delete(&self, collection: Collection, id: &NodeId) -> StorageResult<()> {
        self.collection(collection).write().await.shift_remove(id);
        debug!("Deleted {} from {}", id, collection);
        Ok(())
    }

    async fn scan(&self, collection: Collection) -> StorageResult<NodeStream> {
        let snapshot: Vec<Node> = self.collection(collection).read().await.values().cloned().collect();
        Ok(stream::iter(snapshot.into_iter().map(Ok)).boxed())
    }
}
