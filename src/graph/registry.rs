//! Node registry: creation, removal and lookup of vertices and edges
//!
//! Every edge `e` labelled `L` is listed exactly once in `out_L` of `e.out` and
//! once in `in_L` of `e.in`. `add_edge` and `remove` keep that true through a
//! sequence of single-document writes.
//!
//! None of those writes is atomic with the others, and nothing is locked.
//! Two mutators updating the same vertex race at document granularity: the
//! last write wins and the other adjacency change is lost. A failure partway
//! through a mutation is reported as [`GraphError::PartialMutation`] and left
//! for the caller to repair; nothing is rolled back.

use super::edge::Edge;
use super::element::Element;
use super::error::{GraphError, GraphResult};
use super::id::{IdGenerator, UuidGenerator};
use super::node::{Node, Vertex};
use super::property::PropertyMap;
use super::types::{Direction, Label, NodeId, NodeKind};
use crate::config::GraphConfig;
use crate::persistence::{Collection, GraphStore, MemoryStore, StorageResult};
use crate::traversal::Traversal;
use futures::future;
use futures::stream::{self, StreamExt, TryStreamExt};
use indexmap::IndexSet;
use rustc_hash::FxHashSet;
use std::fmt;
use std::sync::Arc;
use tracing::{debug, warn};

const VERTEX_RESERVED: [&str; 2] = ["id", "kind"];
const EDGE_RESERVED: [&str; 5] = ["id", "kind", "out", "in", "label"];

/// Shared handle to a graph; cheap to clone
#[derive(Clone)]
pub struct Graph {
    store: Arc<dyn GraphStore>,
    ids: Arc<dyn IdGenerator>,
}

impl fmt::Debug for Graph {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Graph").finish_non_exhaustive()
    }
}

impl Graph {
    pub fn with_store(store: Arc<dyn GraphStore>, ids: Arc<dyn IdGenerator>) -> Self {
        Self { store, ids }
    }

    /// Empty in-memory graph with UUID ids
    pub fn in_memory() -> Self {
        Self::with_store(Arc::new(MemoryStore::new()), Arc::new(UuidGenerator))
    }

    /// Open the graph described by `config`
    pub fn open(config: &GraphConfig) -> GraphResult<Self> {
        let store = config.open_store()?;
        Ok(Self::with_store(store, Arc::new(UuidGenerator)))
    }

    pub fn store(&self) -> &Arc<dyn GraphStore> {
        &self.store
    }

    /// Create a vertex and wrap it in a materialized one-element traversal
    pub async fn add_vertex(&self, properties: PropertyMap) -> GraphResult<Traversal> {
        let id = self.ids.next_id();
        let vertex = Vertex::new(id, sanitize(NodeKind::Vertex, properties));
        self.store
            .put(Collection::Vertices, &Node::Vertex(vertex.clone()))
            .await?;
        debug!("Added vertex {}", vertex.id);
        Ok(Traversal::materialized(self.clone(), vec![Element::from(vertex)]))
    }

    /// Create an edge `out_v -[label]-> in_v`.
    ///
    /// Each endpoint must resolve to exactly one stored vertex. All validation
    /// happens before the first write. The edge document is written first, then
    /// the tail and head adjacency lists.
    pub async fn add_edge(
        &self,
        out_v: impl Into<Endpoint>,
        in_v: impl Into<Endpoint>,
        label: &str,
        properties: PropertyMap,
    ) -> GraphResult<Traversal> {
        let out_id = self.resolve_vertex(out_v.into()).await?;
        let in_id = self.resolve_vertex(in_v.into()).await?;
        let label = Label::new(label)?;

        let no_vertex = || GraphError::Ambiguity {
            expected: NodeKind::Vertex,
            found: 0,
        };
        let mut tail = self.load_vertex(&out_id).await?.ok_or_else(no_vertex)?;
        let mut head = if out_id == in_id {
            None
        } else {
            Some(self.load_vertex(&in_id).await?.ok_or_else(no_vertex)?)
        };

        let edge = Edge::new(
            self.ids.next_id(),
            out_id,
            in_id,
            label.clone(),
            sanitize(NodeKind::Edge, properties),
        );
        self.store
            .put(Collection::Edges, &Node::Edge(edge.clone()))
            .await?;
        let mut completed = 1;

        tail.push_edge(Direction::Out, &label, edge.id.clone());
        if head.is_none() {
            tail.push_edge(Direction::In, &label, edge.id.clone());
        }
        self.store_vertex(tail)
            .await
            .map_err(|e| GraphError::mutation("add_edge", completed, e))?;
        completed += 1;

        if let Some(mut head) = head {
            head.push_edge(Direction::In, &label, edge.id.clone());
            self.store_vertex(head)
                .await
                .map_err(|e| GraphError::mutation("add_edge", completed, e))?;
        }

        debug!("Added edge {} {} -[{}]-> {}", edge.id, edge.out, edge.label, edge.in_);
        Ok(Traversal::materialized(self.clone(), vec![Element::from(edge)]))
    }

    /// Remove a vertex or an edge and every adjacency entry pointing at it.
    ///
    /// The node is re-read first so stale copies still detach everything that
    /// is currently stored. References to edges or vertices that are already
    /// gone are skipped.
    pub async fn remove(&self, node: &Node) -> GraphResult<()> {
        match node {
            Node::Vertex(v) => self.remove_vertex(&v.id).await,
            Node::Edge(e) => self.remove_edge(&e.id).await,
        }
    }

    async fn remove_vertex(&self, id: &NodeId) -> GraphResult<()> {
        let vertex = self.load_vertex(id).await?.ok_or_else(|| GraphError::NotFound {
            kind: NodeKind::Vertex,
            id: id.clone(),
        })?;
        let fail = |completed, e| GraphError::mutation("remove", completed, e);
        let mut completed = 0;
        // A self-loop is listed in both directions but detached once
        let mut detached: FxHashSet<&NodeId> = FxHashSet::default();

        for direction in [Direction::Out, Direction::In] {
            for edge_ids in vertex.edges(direction).values() {
                for edge_id in edge_ids {
                    if !detached.insert(edge_id) {
                        continue;
                    }
                    let Some(edge) = self
                        .load_edge(edge_id)
                        .await
                        .map_err(|e| fail(completed, e))?
                    else {
                        warn!("Vertex {} lists missing edge {}", id, edge_id);
                        continue;
                    };

                    // The far end lists this edge under the mirror direction
                    let opposite = edge.endpoint(direction.mirror());
                    if opposite != id {
                        let reciprocal = direction.mirror();
                        let stripped = self
                            .update_vertex(opposite, |v| {
                                v.strip_edge(reciprocal, edge.label.as_str(), &edge.id);
                            })
                            .await
                            .map_err(|e| fail(completed, e))?;
                        if stripped {
                            completed += 1;
                        } else {
                            warn!("Edge {} points at missing vertex {}", edge.id, opposite);
                        }
                    }

                    self.store
                        .delete(Collection::Edges, &edge.id)
                        .await
                        .map_err(|e| fail(completed, e))?;
                    completed += 1;
                }
            }
        }

        self.store
            .delete(Collection::Vertices, id)
            .await
            .map_err(|e| fail(completed, e))?;
        debug!("Removed vertex {} ({} dependent writes)", id, completed);
        Ok(())
    }

    async fn remove_edge(&self, id: &NodeId) -> GraphResult<()> {
        let edge = self.load_edge(id).await?.ok_or_else(|| GraphError::NotFound {
            kind: NodeKind::Edge,
            id: id.clone(),
        })?;
        let fail = |completed, e| GraphError::mutation("remove", completed, e);
        let mut completed = 0;
        let label = edge.label.as_str();

        if edge.is_self_loop() {
            let stripped = self
                .update_vertex(&edge.out, |v| {
                    v.strip_edge(Direction::Out, label, &edge.id);
                    v.strip_edge(Direction::In, label, &edge.id);
                })
                .await?;
            if stripped {
                completed += 1;
            }
        } else {
            for direction in [Direction::Out, Direction::In] {
                let endpoint = edge.endpoint(direction);
                let stripped = self
                    .update_vertex(endpoint, |v| {
                        v.strip_edge(direction, label, &edge.id);
                    })
                    .await
                    .map_err(|e| fail(completed, e))?;
                if stripped {
                    completed += 1;
                } else {
                    warn!("Edge {} points at missing vertex {}", edge.id, endpoint);
                }
            }
        }

        self.store
            .delete(Collection::Edges, id)
            .await
            .map_err(|e| fail(completed, e))?;
        debug!("Removed edge {}", id);
        Ok(())
    }

    /// Traversal over every stored vertex
    pub fn v(&self) -> Traversal {
        self.scan(Collection::Vertices)
    }

    /// Traversal over the vertices with the given ids, in input order,
    /// duplicates and unknown ids dropped
    pub fn v_ids(&self, ids: impl Into<IdList>) -> Traversal {
        self.lookup(Collection::Vertices, ids.into())
    }

    /// Traversal over every stored edge
    pub fn e(&self) -> Traversal {
        self.scan(Collection::Edges)
    }

    pub fn e_ids(&self, ids: impl Into<IdList>) -> Traversal {
        self.lookup(Collection::Edges, ids.into())
    }

    fn scan(&self, collection: Collection) -> Traversal {
        let store = Arc::clone(&self.store);
        Traversal::lazy(self.clone(), move || {
            let store = Arc::clone(&store);
            stream::once(async move { store.scan(collection).await })
                .try_flatten()
                .map_ok(Element::Node)
                .map_err(GraphError::Pipeline)
                .boxed()
        })
    }

    fn lookup(&self, collection: Collection, ids: IdList) -> Traversal {
        let ids: Arc<[NodeId]> = ids.normalize().into();
        let store = Arc::clone(&self.store);
        Traversal::lazy(self.clone(), move || {
            let store = Arc::clone(&store);
            stream::iter(ids.to_vec())
                .then(move |id| {
                    let store = Arc::clone(&store);
                    async move { store.get(collection, &id).await }
                })
                .map_err(GraphError::Pipeline)
                .try_filter_map(|node| future::ready(Ok(node.map(Element::Node))))
                .boxed()
        })
    }

    /// Collapse an endpoint argument to the id of exactly one vertex
    async fn resolve_vertex(&self, endpoint: Endpoint) -> GraphResult<NodeId> {
        let candidates = match endpoint {
            Endpoint::Element(element) => vec![element],
            Endpoint::Traversal(traversal) => traversal.to_array().await?,
            Endpoint::Elements(elements) => elements,
        };
        let [candidate] = <[Element; 1]>::try_from(candidates).map_err(|c| GraphError::Ambiguity {
            expected: NodeKind::Vertex,
            found: c.len(),
        })?;
        match candidate {
            Element::Node(Node::Vertex(vertex)) => Ok(vertex.id),
            other => Err(GraphError::InvalidInput {
                expected: "vertex",
                found: other.describe(),
            }),
        }
    }

    async fn load_vertex(&self, id: &NodeId) -> StorageResult<Option<Vertex>> {
        Ok(self
            .store
            .get(Collection::Vertices, id)
            .await?
            .and_then(Node::into_vertex))
    }

    async fn load_edge(&self, id: &NodeId) -> StorageResult<Option<Edge>> {
        Ok(self
            .store
            .get(Collection::Edges, id)
            .await?
            .and_then(Node::into_edge))
    }

    async fn store_vertex(&self, vertex: Vertex) -> StorageResult<()> {
        self.store.put(Collection::Vertices, &Node::Vertex(vertex)).await
    }

    /// Read-modify-write of one vertex document. Returns false when the vertex
    /// is not stored. Not atomic: a write to the same vertex between the read
    /// and the write is overwritten.
    async fn update_vertex<F>(&self, id: &NodeId, transform: F) -> StorageResult<bool>
    where
        F: FnOnce(&mut Vertex),
    {
        let Some(mut vertex) = self.load_vertex(id).await? else {
            return Ok(false);
        };
        transform(&mut vertex);
        self.store_vertex(vertex).await?;
        Ok(true)
    }
}

/// Drop property keys that would shadow document fields
fn sanitize(kind: NodeKind, mut properties: PropertyMap) -> PropertyMap {
    properties.retain(|key, _| {
        let reserved = match kind {
            NodeKind::Vertex => {
                VERTEX_RESERVED.contains(&key.as_str()) || key.starts_with("out_") || key.starts_with("in_")
            }
            NodeKind::Edge => EDGE_RESERVED.contains(&key.as_str()),
        };
        if reserved {
            warn!("Dropping reserved property {:?} on new {}", key, kind);
        }
        !reserved
    });
    properties
}

/// An `add_edge` endpoint: a single element, a traversal, or a collection.
/// Whatever it is must resolve to exactly one vertex.
#[derive(Debug, Clone)]
pub enum Endpoint {
    Element(Element),
    Traversal(Traversal),
    Elements(Vec<Element>),
}

impl From<Element> for Endpoint {
    fn from(element: Element) -> Self {
        Endpoint::Element(element)
    }
}

impl From<&Element> for Endpoint {
    fn from(element: &Element) -> Self {
        Endpoint::Element(element.clone())
    }
}

impl From<Node> for Endpoint {
    fn from(node: Node) -> Self {
        Endpoint::Element(Element::Node(node))
    }
}

impl From<Vertex> for Endpoint {
    fn from(vertex: Vertex) -> Self {
        Endpoint::Element(Element::from(vertex))
    }
}

impl From<Traversal> for Endpoint {
    fn from(traversal: Traversal) -> Self {
        Endpoint::Traversal(traversal)
    }
}

impl From<&Traversal> for Endpoint {
    fn from(traversal: &Traversal) -> Self {
        Endpoint::Traversal(traversal.clone())
    }
}

impl From<Vec<Element>> for Endpoint {
    fn from(elements: Vec<Element>) -> Self {
        Endpoint::Elements(elements)
    }
}

/// Ids accepted by `v_ids` / `e_ids`: one id, an id-bearing node, or a
/// collection of either
#[derive(Debug, Clone, Default, PartialEq)]
pub struct IdList(Vec<NodeId>);

impl IdList {
    /// Drop empty ids and duplicates, keeping first-seen order
    pub fn normalize(self) -> Vec<NodeId> {
        self.0
            .into_iter()
            .filter(|id| !id.is_empty())
            .collect::<IndexSet<_>>()
            .into_iter()
            .collect()
    }
}

impl From<NodeId> for IdList {
    fn from(id: NodeId) -> Self {
        IdList(vec![id])
    }
}

impl From<&NodeId> for IdList {
    fn from(id: &NodeId) -> Self {
        IdList(vec![id.clone()])
    }
}

impl From<&str> for IdList {
    fn from(id: &str) -> Self {
        IdList(vec![NodeId::from(id)])
    }
}

impl From<Vec<NodeId>> for IdList {
    fn from(ids: Vec<NodeId>) -> Self {
        IdList(ids)
    }
}

impl From<&[NodeId]> for IdList {
    fn from(ids: &[NodeId]) -> Self {
        IdList(ids.to_vec())
    }
}

impl From<Vec<&str>> for IdList {
    fn from(ids: Vec<&str>) -> Self {
        IdList(ids.into_iter().map(NodeId::from).collect())
    }
}

impl From<&Node> for IdList {
    fn from(node: &Node) -> Self {
        IdList(vec![node.id().clone()])
    }
}

impl From<&Vertex> for IdList {
    fn from(vertex: &Vertex) -> Self {
        IdList(vec![vertex.id.clone()])
    }
}

impl From<&Edge> for IdList {
    fn from(edge: &Edge) -> Self {
        IdList(vec![edge.id.clone()])
    }
}

impl From<&Element> for IdList {
    fn from(element: &Element) -> Self {
        IdList(element.id().cloned().into_iter().collect())
    }
}

impl From<&[Element]> for IdList {
    fn from(elements: &[Element]) -> Self {
        IdList(elements.iter().filter_map(|e| e.id().cloned()).collect())
    }
}

impl From<Vec<Element>> for IdList {
    fn from(elements: Vec<Element>) -> Self {
        IdList::from(elements.as_slice())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::property::property_map;

    #[test]
    fn test_id_list_normalizes() {
        let ids = IdList::from(vec!["b", "a", "", "b"]).normalize();
        assert_eq!(ids, vec![NodeId::new("b"), NodeId::new("a")]);
    }

    #[test]
    fn test_sanitize_drops_reserved_keys() {
        let vertex_props = sanitize(
            NodeKind::Vertex,
            property_map([("id", "x"), ("out_knows", "y"), ("name", "Tom")]),
        );
        assert_eq!(vertex_props.len(), 1);
        assert!(vertex_props.contains_key("name"));

        let edge_props = sanitize(NodeKind::Edge, property_map([("label", "x"), ("since", "2001")]));
        assert_eq!(edge_props.len(), 1);
        assert!(edge_props.contains_key("since"));
    }
}
