//! Vertex documents and the `Node` tagged union
//!
//! A vertex keeps its adjacency as per-label ordered lists of edge ids, split
//! by direction. In document form these are the `out_<label>` / `in_<label>`
//! keys; a missing key is the same as an empty list.

use super::edge::Edge;
use super::property::{PropertyMap, PropertyValue};
use super::types::{adjacency_key, Direction, Label, NodeId, NodeKind};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Per-label adjacency lists for one direction
pub type Adjacency = BTreeMap<Label, Vec<NodeId>>;

/// A vertex in the property graph
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Vertex {
    pub id: NodeId,

    pub properties: PropertyMap,

    /// Outgoing edge ids per label, in insertion order
    pub out: Adjacency,

    /// Incoming edge ids per label, in insertion order
    #[serde(rename = "in")]
    pub in_: Adjacency,
}

impl Vertex {
    pub fn new(id: NodeId, properties: PropertyMap) -> Self {
        Vertex {
            id,
            properties,
            out: Adjacency::new(),
            in_: Adjacency::new(),
        }
    }

    /// Edge ids listed under `label` for one direction; empty when absent
    pub fn adjacency(&self, direction: Direction, label: &str) -> &[NodeId] {
        self.edges(direction)
            .get(label)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    pub fn edges(&self, direction: Direction) -> &Adjacency {
        match direction {
            Direction::Out => &self.out,
            Direction::In => &self.in_,
        }
    }

    fn edges_mut(&mut self, direction: Direction) -> &mut Adjacency {
        match direction {
            Direction::Out => &mut self.out,
            Direction::In => &mut self.in_,
        }
    }

    /// Append an edge id, creating the list if absent
    pub fn push_edge(&mut self, direction: Direction, label: &Label, edge: NodeId) {
        self.edges_mut(direction)
            .entry(label.clone())
            .or_default()
            .push(edge);
    }

    /// Remove every occurrence of `edge` from one list, dropping the list once
    /// empty. Returns how many entries were removed.
    pub fn strip_edge(&mut self, direction: Direction, label: &str, edge: &NodeId) -> usize {
        let lists = self.edges_mut(direction);
        let Some(list) = lists.get_mut(label) else {
            return 0;
        };
        let before = list.len();
        list.retain(|id| id != edge);
        let removed = before - list.len();
        if list.is_empty() {
            lists.remove(label);
        }
        removed
    }

    /// Total number of adjacency entries in both directions
    pub fn degree(&self) -> usize {
        self.out.values().chain(self.in_.values()).map(Vec::len).sum()
    }

    pub fn set_property(&mut self, key: impl Into<String>, value: impl Into<PropertyValue>) -> Option<PropertyValue> {
        self.properties.insert(key.into(), value.into())
    }

    /// Resolve an adjacency document key (`out_<label>` / `in_<label>`)
    pub(crate) fn adjacency_field(&self, key: &str) -> Option<PropertyValue> {
        let (direction, label) = if let Some(label) = key.strip_prefix("out_") {
            (Direction::Out, label)
        } else if let Some(label) = key.strip_prefix("in_") {
            (Direction::In, label)
        } else {
            return None;
        };
        let ids = self.edges(direction).get(label)?;
        Some(PropertyValue::Array(
            ids.iter()
                .map(|id| PropertyValue::String(id.to_string()))
                .collect(),
        ))
    }

    pub fn to_json(&self) -> serde_json::Value {
        let mut doc = serde_json::Map::new();
        for (key, value) in &self.properties {
            doc.insert(key.clone(), value.to_json());
        }
        for direction in [Direction::Out, Direction::In] {
            for (label, ids) in self.edges(direction) {
                doc.insert(
                    adjacency_key(direction, label.as_str()),
                    ids.iter().map(|id| id.as_str()).collect(),
                );
            }
        }
        doc.insert("id".to_string(), self.id.as_str().into());
        doc.insert("kind".to_string(), NodeKind::Vertex.as_str().into());
        serde_json::Value::Object(doc)
    }
}

/// A stored graph node: the explicit tagged union of vertex and edge
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Node {
    Vertex(Vertex),
    Edge(Edge),
}

impl Node {
    pub fn id(&self) -> &NodeId {
        match self {
            Node::Vertex(v) => &v.id,
            Node::Edge(e) => &e.id,
        }
    }

    pub fn kind(&self) -> NodeKind {
        match self {
            Node::Vertex(_) => NodeKind::Vertex,
            Node::Edge(_) => NodeKind::Edge,
        }
    }

    pub fn properties(&self) -> &PropertyMap {
        match self {
            Node::Vertex(v) => &v.properties,
            Node::Edge(e) => &e.properties,
        }
    }

    pub fn as_vertex(&self) -> Option<&Vertex> {
        match self {
            Node::Vertex(v) => Some(v),
            Node::Edge(_) => None,
        }
    }

    pub fn as_edge(&self) -> Option<&Edge> {
        match self {
            Node::Edge(e) => Some(e),
            Node::Vertex(_) => None,
        }
    }

    pub fn into_vertex(self) -> Option<Vertex> {
        match self {
            Node::Vertex(v) => Some(v),
            Node::Edge(_) => None,
        }
    }

    pub fn into_edge(self) -> Option<Edge> {
        match self {
            Node::Edge(e) => Some(e),
            Node::Vertex(_) => None,
        }
    }

    pub fn to_json(&self) -> serde_json::Value {
        match self {
            Node::Vertex(v) => v.to_json(),
            Node::Edge(e) => e.to_json(),
        }
    }
}

impl From<Vertex> for Node {
    fn from(vertex: Vertex) -> Self {
        Node::Vertex(vertex)
    }
}

impl From<Edge> for Node {
    fn from(edge: Edge) -> Self {
        Node::Edge(edge)
    }
}
