//! Lazily evaluated, Gremlin-style traversal pipeline
//!
//! A [`Traversal`] is one immutable stage in a parent-linked chain. Each step
//! returns a new stage whose sequence is a transformation of its parent's.
//! Nothing runs until the pipeline is materialized.
//!
//! A lazy stage holds a cold *plan*. Every run opens a fresh,
//! single-consumption [`ElementStream`], so a stage can be run again later.
//! Bookmarked ancestors depend on this when `select` collects them. Each store
//! call inside a run is an await point and nothing runs in parallel. Callers
//! that need a deadline wrap the materializing future themselves, e.g. with
//! `tokio::time::timeout`.

mod algebra;
mod steps;

pub use algebra::{merge, Branch};

use crate::graph::{Element, Graph, GraphError, GraphResult, Node};
use futures::stream::{self, BoxStream, StreamExt, TryStreamExt};
use std::fmt;
use std::sync::Arc;
use tracing::debug;

/// One run of a stage's sequence
pub type ElementStream = BoxStream<'static, GraphResult<Element>>;

type Plan = Arc<dyn Fn() -> ElementStream + Send + Sync>;

/// The sequence behind a stage, either a plan or an already-collected list
#[derive(Clone)]
enum Nodes {
    Lazy(Plan),
    Materialized(Arc<[Element]>),
}

impl Nodes {
    fn open(&self) -> ElementStream {
        match self {
            Nodes::Lazy(plan) => plan(),
            Nodes::Materialized(elements) => stream::iter(elements.to_vec().into_iter().map(Ok)).boxed(),
        }
    }
}

struct Stage {
    graph: Graph,
    /// Only read by bookmark resolution
    parent: Option<Arc<Stage>>,
    nodes: Nodes,
    name: Option<String>,
}

/// Handle to one stage of a traversal; cloning shares the stage
#[derive(Clone)]
pub struct Traversal {
    stage: Arc<Stage>,
}

impl fmt::Debug for Traversal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Traversal")
            .field("name", &self.stage.name)
            .field("materialized", &self.is_materialized())
            .field("depth", &self.depth())
            .finish()
    }
}

impl Traversal {
    /// Root stage over a lazy plan
    pub(crate) fn lazy<F>(graph: Graph, plan: F) -> Traversal
    where
        F: Fn() -> ElementStream + Send + Sync + 'static,
    {
        Self::root(graph, Nodes::Lazy(Arc::new(plan)))
    }

    /// Root stage over an already-known list
    pub(crate) fn materialized(graph: Graph, elements: Vec<Element>) -> Traversal {
        Self::root(graph, Nodes::Materialized(elements.into()))
    }

    fn root(graph: Graph, nodes: Nodes) -> Traversal {
        Traversal {
            stage: Arc::new(Stage {
                graph,
                parent: None,
                nodes,
                name: None,
            }),
        }
    }

    fn child(&self, nodes: Nodes, name: Option<String>) -> Traversal {
        Traversal {
            stage: Arc::new(Stage {
                graph: self.stage.graph.clone(),
                parent: Some(Arc::clone(&self.stage)),
                nodes,
                name,
            }),
        }
    }

    /// Child stage whose sequence is this stage's sequence passed through `op`
    fn next<F>(&self, op: F) -> Traversal
    where
        F: Fn(ElementStream) -> ElementStream + Send + Sync + 'static,
    {
        let upstream = self.stage.nodes.clone();
        self.child(Nodes::Lazy(Arc::new(move || op(upstream.open()))), None)
    }

    /// Child stage with its own plan, ignoring this stage's sequence
    fn next_plan<F>(&self, plan: F) -> Traversal
    where
        F: Fn() -> ElementStream + Send + Sync + 'static,
    {
        self.child(Nodes::Lazy(Arc::new(plan)), None)
    }

    fn with_elements(&self, elements: Vec<Element>) -> Traversal {
        self.child(Nodes::Materialized(elements.into()), None)
    }

    pub fn graph(&self) -> &Graph {
        &self.stage.graph
    }

    pub fn parent(&self) -> Option<Traversal> {
        self.stage
            .parent
            .as_ref()
            .map(|stage| Traversal { stage: Arc::clone(stage) })
    }

    /// Bookmark name, if this stage was created by `as_`
    pub fn name(&self) -> Option<&str> {
        self.stage.name.as_deref()
    }

    /// Number of ancestors above this stage
    pub fn depth(&self) -> usize {
        std::iter::successors(self.stage.parent.as_ref(), |s| s.parent.as_ref()).count()
    }

    pub fn is_materialized(&self) -> bool {
        matches!(self.stage.nodes, Nodes::Materialized(_))
    }

    /// Collected elements of a materialized stage
    pub fn elements(&self) -> Option<&[Element]> {
        match &self.stage.nodes {
            Nodes::Materialized(elements) => Some(elements),
            Nodes::Lazy(_) => None,
        }
    }

    /// Open a fresh run of this stage's sequence
    pub fn stream(&self) -> ElementStream {
        self.stage.nodes.open()
    }

    /// Run the pipeline and collect its sequence in order
    pub async fn to_array(&self) -> GraphResult<Vec<Element>> {
        self.stream().try_collect().await
    }

    /// Run the pipeline and return a stage in the materialized state
    pub async fn materialize(&self) -> GraphResult<Traversal> {
        if self.is_materialized() {
            return Ok(self.clone());
        }
        let elements = self.to_array().await?;
        Ok(self.with_elements(elements))
    }

    /// First element of a materialized stage.
    ///
    /// Fails with [`GraphError::NotMaterialized`] on a lazy stage; call
    /// [`Traversal::materialize`] first.
    pub fn first(&self) -> GraphResult<Option<&Element>> {
        self.elements()
            .map(|elements| elements.first())
            .ok_or(GraphError::NotMaterialized)
    }

    /// Remove every node in the sequence and return an empty stage.
    ///
    /// Every element must be a vertex or an edge; that is checked before the
    /// first removal. Nodes are then removed one at a time in sequence order
    /// with no atomicity across the batch. A node already removed by an earlier
    /// removal in the same batch (an edge of a removed vertex) is skipped. A
    /// failure after some removals is a [`GraphError::PartialMutation`]
    /// counting them.
    pub async fn remove(&self) -> GraphResult<Traversal> {
        let elements = self.to_array().await?;
        let nodes = elements
            .iter()
            .map(|element| {
                element.as_node().ok_or_else(|| GraphError::InvalidInput {
                    expected: "vertex or edge",
                    found: element.describe(),
                })
            })
            .collect::<GraphResult<Vec<&Node>>>()?;

        let mut removed = 0;
        for node in nodes {
            match self.graph().remove(node).await {
                Ok(()) => removed += 1,
                Err(GraphError::NotFound { kind, id }) => {
                    debug!("{} {} already removed", kind, id);
                }
                Err(e) => return Err(GraphError::partial("remove", removed, e)),
            }
        }
        debug!("Removed {} of {} nodes", removed, elements.len());
        Ok(self.with_elements(Vec::new()))
    }
}
