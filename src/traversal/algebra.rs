//! Set combinators, multi-branch merge and bookmarks

use super::Traversal;
use crate::graph::{Element, GraphError, NodeId, Selection};
use futures::future;
use futures::stream::{self, StreamExt, TryStreamExt};
use rustc_hash::FxHashSet;
use std::fmt;
use std::sync::Arc;

type BranchFn = Arc<dyn Fn(&Traversal) -> Traversal + Send + Sync>;

/// Argument of `merge` and the set combinators: a ready traversal, or a
/// function that builds one from the stage it is applied to
#[derive(Clone)]
pub enum Branch {
    Ready(Traversal),
    Deferred(BranchFn),
}

impl Branch {
    /// Branch built from the current stage, e.g. `Branch::from_fn(|t| t.out("knows"))`
    pub fn from_fn<F>(f: F) -> Self
    where
        F: Fn(&Traversal) -> Traversal + Send + Sync + 'static,
    {
        Branch::Deferred(Arc::new(f))
    }

    fn resolve(&self, current: &Traversal) -> Traversal {
        match self {
            Branch::Ready(traversal) => traversal.clone(),
            Branch::Deferred(f) => f(current),
        }
    }
}

impl fmt::Debug for Branch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Branch::Ready(traversal) => f.debug_tuple("Ready").field(traversal).finish(),
            Branch::Deferred(_) => f.write_str("Deferred(..)"),
        }
    }
}

impl From<Traversal> for Branch {
    fn from(traversal: Traversal) -> Self {
        Branch::Ready(traversal)
    }
}

impl From<&Traversal> for Branch {
    fn from(traversal: &Traversal) -> Self {
        Branch::Ready(traversal.clone())
    }
}

/// One stage under `parent` whose sequence is every branch's sequence in
/// order, without deduplication. Deferred branches receive `parent`.
pub fn merge<I>(parent: &Traversal, branches: I) -> Traversal
where
    I: IntoIterator<Item = Branch>,
{
    let branches: Vec<Traversal> = branches.into_iter().map(|b| b.resolve(parent)).collect();

    if branches.iter().all(Traversal::is_materialized) {
        let elements = branches
            .iter()
            .filter_map(Traversal::elements)
            .flat_map(|elements| elements.iter().cloned())
            .collect();
        return parent.with_elements(elements);
    }

    let branches: Arc<[Traversal]> = branches.into();
    parent.next_plan(move || {
        stream::iter(branches.to_vec())
            .flat_map(|branch| branch.stream())
            .boxed()
    })
}

#[derive(Debug, Clone, Copy)]
enum Combinator {
    And,
    Or,
    Except,
}

impl Combinator {
    fn seed(self) -> bool {
        match self {
            Combinator::And | Combinator::Except => true,
            Combinator::Or => false,
        }
    }

    fn fold(self, acc: bool, member: bool) -> bool {
        match self {
            Combinator::And => acc && member,
            Combinator::Or => acc || member,
            Combinator::Except => acc && !member,
        }
    }
}

impl Traversal {
    /// Keep elements present in every condition
    pub fn and<I>(&self, conditions: I) -> Traversal
    where
        I: IntoIterator<Item = Branch>,
    {
        self.combine(Combinator::And, conditions)
    }

    /// Keep elements present in at least one condition
    pub fn or<I>(&self, conditions: I) -> Traversal
    where
        I: IntoIterator<Item = Branch>,
    {
        self.combine(Combinator::Or, conditions)
    }

    /// Drop elements present in any condition
    pub fn except<I>(&self, conditions: I) -> Traversal
    where
        I: IntoIterator<Item = Branch>,
    {
        self.combine(Combinator::Except, conditions)
    }

    /// Keep elements present in the merge of all conditions
    pub fn retain<I>(&self, conditions: I) -> Traversal
    where
        I: IntoIterator<Item = Branch>,
    {
        self.and([Branch::from(merge(self, conditions))])
    }

    /// Each run materializes every condition into an id set, then folds the
    /// combinator over the memberships of each upstream element.
    fn combine<I>(&self, combinator: Combinator, conditions: I) -> Traversal
    where
        I: IntoIterator<Item = Branch>,
    {
        let conditions: Arc<[Traversal]> = conditions.into_iter().map(|c| c.resolve(self)).collect();
        self.next(move |upstream| {
            let conditions = Arc::clone(&conditions);
            stream::once(async move {
                let mut sets = Vec::with_capacity(conditions.len());
                for condition in conditions.iter() {
                    sets.push(membership(condition).await?);
                }
                Ok::<_, GraphError>(upstream.try_filter(move |element| {
                    let keep = sets.iter().fold(combinator.seed(), |acc, set| {
                        combinator.fold(acc, element.id().is_some_and(|id| set.contains(id)))
                    });
                    future::ready(keep)
                }))
            })
            .try_flatten()
            .boxed()
        })
    }

    /// Tag the current sequence with `name`. The tagged stage carries exactly
    /// the same sequence.
    pub fn as_(&self, name: impl Into<String>) -> Traversal {
        self.child(self.stage.nodes.clone(), Some(name.into()))
    }

    /// Nearest stage named `name`, starting from this one and walking up
    pub fn back(&self, name: &str) -> Option<Traversal> {
        let mut stage = Some(Arc::clone(&self.stage));
        while let Some(current) = stage {
            if current.name.as_deref() == Some(name) {
                return Some(Traversal { stage: current });
            }
            stage = current.parent.clone();
        }
        None
    }

    /// One-element traversal holding `{name -> nodes}` for every bookmarked
    /// stage from the root down to this one. A later bookmark with the same
    /// name overwrites an earlier one. A non-empty `names` restricts the keys.
    ///
    /// Each bookmarked stage is run again on its own, so the recorded nodes
    /// match what flowed downstream only when the steps up to it are
    /// deterministic. After `random`, or a store changed in between, they can
    /// differ; `materialize` the stage before bookmarking it to pin them.
    pub fn select<I, S>(&self, names: I) -> Traversal
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let wanted: Vec<String> = names.into_iter().map(Into::into).collect();

        let mut named = Vec::new();
        let mut stage = Some(Arc::clone(&self.stage));
        while let Some(current) = stage {
            if let Some(name) = &current.name {
                if wanted.is_empty() || wanted.contains(name) {
                    named.push((name.clone(), Traversal { stage: Arc::clone(&current) }));
                }
            }
            stage = current.parent.clone();
        }
        named.reverse();

        let named: Arc<[(String, Traversal)]> = named.into();
        self.next_plan(move || {
            let named = Arc::clone(&named);
            stream::once(async move {
                let mut selection = Selection::new();
                for (name, stage) in named.iter() {
                    selection.insert(name.clone(), stage.to_array().await?);
                }
                Ok::<_, GraphError>(Element::Selection(selection))
            })
            .boxed()
        })
    }
}

async fn membership(condition: &Traversal) -> Result<FxHashSet<NodeId>, GraphError> {
    condition
        .stream()
        .try_filter_map(|element| future::ready(Ok(element.id().cloned())))
        .try_collect()
        .await
}
