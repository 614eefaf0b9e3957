//! Edge implementation for property graph

use super::property::PropertyMap;
use super::types::{Direction, Label, NodeId, NodeKind};
use serde::{Deserialize, Serialize};

/// A directed, labelled edge between two vertices
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Edge {
    pub id: NodeId,

    /// Vertex the edge leaves
    pub out: NodeId,

    /// Vertex the edge enters
    #[serde(rename = "in")]
    pub in_: NodeId,

    pub label: Label,

    pub properties: PropertyMap,
}

impl Edge {
    pub fn new(id: NodeId, out: NodeId, in_: NodeId, label: Label, properties: PropertyMap) -> Self {
        Edge {
            id,
            out,
            in_,
            label,
            properties,
        }
    }

    /// Endpoint on the given side: `Out` is the tail, `In` the head
    pub fn endpoint(&self, direction: Direction) -> &NodeId {
        match direction {
            Direction::Out => &self.out,
            Direction::In => &self.in_,
        }
    }

    pub fn is_self_loop(&self) -> bool {
        self.out == self.in_
    }

    pub fn to_json(&self) -> serde_json::Value {
        let mut doc = serde_json::Map::new();
        for (key, value) in &self.properties {
            doc.insert(key.clone(), value.to_json());
        }
        doc.insert("id".to_string(), self.id.as_str().into());
        doc.insert("kind".to_string(), NodeKind::Edge.as_str().into());
        doc.insert("out".to_string(), self.out.as_str().into());
        doc.insert("in".to_string(), self.in_.as_str().into());
        doc.insert("label".to_string(), self.label.as_str().into());
        serde_json::Value::Object(doc)
    }
}
