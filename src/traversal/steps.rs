//! Filtering, expansion and projection steps

use super::{merge, Branch, ElementStream, Traversal};
use crate::graph::{Direction, Element, GraphError, GraphResult, Label, NodeId, Pattern, PropertyMap, PropertyValue};
use futures::future;
use futures::stream::{self, StreamExt, TryStreamExt};
use rand::Rng;
use rustc_hash::FxHashSet;
use std::cmp::Ordering;
use std::sync::Arc;

impl Traversal {
    /// Keep elements satisfying `predicate`
    pub fn filter<P>(&self, predicate: P) -> Traversal
    where
        P: Fn(&Element) -> bool + Send + Sync + 'static,
    {
        let predicate = Arc::new(predicate);
        self.next(move |upstream| {
            let predicate = Arc::clone(&predicate);
            upstream
                .try_filter(move |element| future::ready(predicate(element)))
                .boxed()
        })
    }

    /// Keep elements that are a superset match of `pattern`
    pub fn has(&self, pattern: impl Into<Pattern>) -> Traversal {
        let pattern = pattern.into();
        self.filter(move |element| pattern.matches(element))
    }

    /// Keep elements that do not match `pattern`
    pub fn has_not(&self, pattern: impl Into<Pattern>) -> Traversal {
        let pattern = pattern.into();
        self.filter(move |element| !pattern.matches(element))
    }

    /// Keep elements with `lower <= property < upper`; missing or
    /// incomparable values are dropped
    pub fn interval(
        &self,
        property: impl Into<String>,
        lower: impl Into<PropertyValue>,
        upper: impl Into<PropertyValue>,
    ) -> Traversal {
        let property = property.into();
        let (lower, upper) = (lower.into(), upper.into());
        self.filter(move |element| {
            element.field(&property).is_some_and(|value| {
                matches!(value.compare(&lower), Some(Ordering::Greater | Ordering::Equal))
                    && value.compare(&upper) == Some(Ordering::Less)
            })
        })
    }

    /// Keep each element independently with probability `bias`
    pub fn random(&self, bias: f64) -> Traversal {
        self.filter(move |_| rand::thread_rng().gen::<f64>() < bias)
    }

    /// Keep the first occurrence of every id, in encounter order.
    /// Elements without an id always pass.
    pub fn dedup(&self) -> Traversal {
        self.next(|upstream| {
            let mut seen: FxHashSet<NodeId> = FxHashSet::default();
            upstream
                .try_filter(move |element| {
                    let first = match element.id() {
                        Some(id) => seen.insert(id.clone()),
                        None => true,
                    };
                    future::ready(first)
                })
                .boxed()
        })
    }

    /// Project each element onto `fields` plus id and kind
    pub fn map<I, S>(&self, fields: I) -> Traversal
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let fields: Arc<[String]> = fields.into_iter().map(Into::into).collect();
        self.next(move |upstream| {
            let fields = Arc::clone(&fields);
            upstream.map_ok(move |element| element.project(&fields)).boxed()
        })
    }

    /// Edges listed under `out_<label>` of the upstream vertices
    pub fn out_e(&self, label: &str) -> Traversal {
        self.adjacent_edges(Direction::Out, label)
    }

    /// Edges listed under `in_<label>` of the upstream vertices
    pub fn in_e(&self, label: &str) -> Traversal {
        self.adjacent_edges(Direction::In, label)
    }

    /// Tail vertices of the upstream edges
    pub fn out_v(&self) -> Traversal {
        self.endpoints(Direction::Out)
    }

    /// Head vertices of the upstream edges
    pub fn in_v(&self) -> Traversal {
        self.endpoints(Direction::In)
    }

    pub fn out(&self, label: &str) -> Traversal {
        self.out_e(label).in_v()
    }

    pub fn in_(&self, label: &str) -> Traversal {
        self.in_e(label).out_v()
    }

    /// `out(label)` followed by `in_(label)`, not deduplicated
    pub fn both(&self, label: &str) -> Traversal {
        merge(self, [Branch::from(self.out(label)), Branch::from(self.in_(label))])
    }

    pub fn both_e(&self, label: &str) -> Traversal {
        merge(self, [Branch::from(self.out_e(label)), Branch::from(self.in_e(label))])
    }

    pub fn both_v(&self) -> Traversal {
        merge(self, [Branch::from(self.out_v()), Branch::from(self.in_v())])
    }

    fn adjacent_edges(&self, direction: Direction, label: &str) -> Traversal {
        let graph = self.graph().clone();
        let label = label.to_string();
        self.next(move |upstream| {
            let graph = graph.clone();
            let label = label.clone();
            resolve_batch(
                upstream,
                move |batch| {
                    batch
                        .iter()
                        .filter_map(Element::as_vertex)
                        .flat_map(|v| v.adjacency(direction, &label).iter().cloned())
                        .collect()
                },
                move |ids| graph.e_ids(ids),
            )
        })
    }

    fn endpoints(&self, direction: Direction) -> Traversal {
        let graph = self.graph().clone();
        self.next(move |upstream| {
            let graph = graph.clone();
            resolve_batch(
                upstream,
                move |batch| {
                    batch
                        .iter()
                        .filter_map(Element::as_edge)
                        .map(|e| e.endpoint(direction).clone())
                        .collect()
                },
                move |ids| graph.v_ids(ids),
            )
        })
    }

    /// One edge per pair of the cartesian product of this sequence and
    /// `other`'s, all with the same label and properties. Returns the merge of
    /// the created edges.
    ///
    /// Every source and target must be a vertex; that is checked before the
    /// first edge is written. A failure after some edges were created is a
    /// [`GraphError::PartialMutation`] counting the created edges.
    pub async fn add_edge(
        &self,
        label: &str,
        other: &Traversal,
        properties: PropertyMap,
    ) -> GraphResult<Traversal> {
        Label::new(label)?;
        let sources = self.to_array().await?;
        let targets = other.to_array().await?;
        if let Some(invalid) = sources.iter().chain(&targets).find(|e| !e.is_vertex()) {
            return Err(GraphError::InvalidInput {
                expected: "vertex",
                found: invalid.describe(),
            });
        }

        let mut created = Vec::with_capacity(sources.len() * targets.len());
        for out_v in &sources {
            for in_v in &targets {
                let edge = self
                    .graph()
                    .add_edge(out_v, in_v, label, properties.clone())
                    .await
                    .map_err(|e| GraphError::partial("add_edge", created.len(), e))?;
                created.push(Branch::from(edge));
            }
        }
        Ok(merge(self, created))
    }
}

/// Drain the whole upstream batch, gather the ids to follow, then resolve them
/// with a single lookup. Trades memory for fewer store round trips.
fn resolve_batch<G, R>(upstream: ElementStream, gather: G, resolve: R) -> ElementStream
where
    G: FnOnce(&[Element]) -> Vec<NodeId> + Send + 'static,
    R: FnOnce(Vec<NodeId>) -> Traversal + Send + 'static,
{
    stream::once(async move {
        let batch: Vec<Element> = upstream.try_collect().await?;
        resolve(gather(&batch)).to_array().await
    })
    .map_ok(|elements| stream::iter(elements.into_iter().map(Ok::<Element, GraphError>)))
    .try_flatten()
    .boxed()
}
