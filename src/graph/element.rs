//! Values flowing through a traversal
//!
//! Most steps carry stored nodes. `map` turns nodes into projections and
//! `select` emits a single selection of bookmarked results.

use super::edge::Edge;
use super::node::{Node, Vertex};
use super::property::{PropertyMap, PropertyValue};
use super::types::{NodeId, NodeKind};
use indexmap::IndexMap;

/// Bookmark name -> nodes collected at that bookmark, root first
pub type Selection = IndexMap<String, Vec<Element>>;

/// A node reduced to the requested fields plus id and kind
#[derive(Debug, Clone, PartialEq)]
pub struct Projection {
    pub id: NodeId,
    pub kind: NodeKind,
    pub fields: PropertyMap,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Element {
    Node(Node),
    Projection(Projection),
    Selection(Selection),
}

impl Element {
    /// Id of the underlying node; selections have none
    pub fn id(&self) -> Option<&NodeId> {
        match self {
            Element::Node(node) => Some(node.id()),
            Element::Projection(p) => Some(&p.id),
            Element::Selection(_) => None,
        }
    }

    pub fn kind(&self) -> Option<NodeKind> {
        match self {
            Element::Node(node) => Some(node.kind()),
            Element::Projection(p) => Some(p.kind),
            Element::Selection(_) => None,
        }
    }

    pub fn is_vertex(&self) -> bool {
        self.as_vertex().is_some()
    }

    pub fn is_edge(&self) -> bool {
        self.as_edge().is_some()
    }

    pub fn is_node(&self) -> bool {
        matches!(self, Element::Node(_))
    }

    pub fn as_node(&self) -> Option<&Node> {
        match self {
            Element::Node(node) => Some(node),
            _ => None,
        }
    }

    pub fn as_vertex(&self) -> Option<&Vertex> {
        self.as_node().and_then(Node::as_vertex)
    }

    pub fn as_edge(&self) -> Option<&Edge> {
        self.as_node().and_then(Node::as_edge)
    }

    pub fn as_selection(&self) -> Option<&Selection> {
        match self {
            Element::Selection(s) => Some(s),
            _ => None,
        }
    }

    /// Field lookup in document terms: `id`, `kind`, edge `out`/`in`/`label`,
    /// vertex `out_<label>`/`in_<label>`, then user properties.
    pub fn field(&self, key: &str) -> Option<PropertyValue> {
        match key {
            "id" => return self.id().map(|id| PropertyValue::String(id.to_string())),
            "kind" => return self.kind().map(|k| PropertyValue::String(k.to_string())),
            _ => {}
        }
        match self {
            Element::Node(Node::Vertex(v)) => v
                .adjacency_field(key)
                .or_else(|| v.properties.get(key).cloned()),
            Element::Node(Node::Edge(e)) => match key {
                "out" => Some(PropertyValue::String(e.out.to_string())),
                "in" => Some(PropertyValue::String(e.in_.to_string())),
                "label" => Some(PropertyValue::String(e.label.to_string())),
                _ => e.properties.get(key).cloned(),
            },
            Element::Projection(p) => p.fields.get(key).cloned(),
            Element::Selection(_) => None,
        }
    }

    /// Keep only `fields`; nodes and projections always retain id and kind,
    /// selections keep only the named bookmarks.
    pub fn project(&self, fields: &[String]) -> Element {
        match self {
            Element::Selection(selection) => Element::Selection(
                selection
                    .iter()
                    .filter(|(name, _)| fields.contains(*name))
                    .map(|(name, nodes)| (name.clone(), nodes.clone()))
                    .collect(),
            ),
            Element::Node(_) | Element::Projection(_) => {
                let (Some(id), Some(kind)) = (self.id(), self.kind()) else {
                    return self.clone();
                };
                let fields = fields
                    .iter()
                    .filter(|f| f.as_str() != "id" && f.as_str() != "kind")
                    .filter_map(|f| self.field(f).map(|value| (f.clone(), value)))
                    .collect();
                Element::Projection(Projection {
                    id: id.clone(),
                    kind,
                    fields,
                })
            }
        }
    }

    /// Short description used in error messages
    pub fn describe(&self) -> String {
        match self {
            Element::Node(node) => format!("{} {}", node.kind(), node.id()),
            Element::Projection(p) => format!("projection of {} {}", p.kind, p.id),
            Element::Selection(_) => "selection".to_string(),
        }
    }

    pub fn to_json(&self) -> serde_json::Value {
        match self {
            Element::Node(node) => node.to_json(),
            Element::Projection(p) => {
                let mut doc: serde_json::Map<String, serde_json::Value> = p
                    .fields
                    .iter()
                    .map(|(k, v)| (k.clone(), v.to_json()))
                    .collect();
                doc.insert("id".to_string(), p.id.as_str().into());
                doc.insert("kind".to_string(), p.kind.as_str().into());
                serde_json::Value::Object(doc)
            }
            Element::Selection(selection) => serde_json::Value::Object(
                selection
                    .iter()
                    .map(|(name, nodes)| {
                        (name.clone(), nodes.iter().map(Element::to_json).collect())
                    })
                    .collect(),
            ),
        }
    }
}

impl From<Node> for Element {
    fn from(node: Node) -> Self {
        Element::Node(node)
    }
}

impl From<Vertex> for Element {
    fn from(vertex: Vertex) -> Self {
        Element::Node(Node::Vertex(vertex))
    }
}

impl From<Edge> for Element {
    fn from(edge: Edge) -> Self {
        Element::Node(Node::Edge(edge))
    }
}
