//! Errors raised by the registry and the traversal pipeline

use super::types::{NodeId, NodeKind};
use crate::persistence::StorageError;
use thiserror::Error;

/// Errors that can occur during graph operations
#[derive(Error, Debug)]
pub enum GraphError {
    /// Argument is not the kind of node the operation requires
    #[error("Invalid input: expected {expected}, got {found}")]
    InvalidInput {
        expected: &'static str,
        found: String,
    },

    #[error("Invalid label: expected a non-empty string")]
    InvalidLabel,

    /// Resolution expected exactly one node
    #[error("Expected 1 {expected}, got {found}")]
    Ambiguity { expected: NodeKind, found: usize },

    #[error("{kind} {id} not found")]
    NotFound { kind: NodeKind, id: NodeId },

    /// A store read failed while a lazy sequence was being run
    #[error("Pipeline failure: {0}")]
    Pipeline(#[source] StorageError),

    /// A multi-write mutation stopped partway; adjacency lists may be inconsistent
    #[error("Partial {operation}: {completed} step(s) applied before failure: {source}")]
    PartialMutation {
        operation: &'static str,
        completed: usize,
        #[source]
        source: Box<GraphError>,
    },

    #[error("first() requires a materialized traversal")]
    NotMaterialized,

    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),
}

impl GraphError {
    /// Classify a store failure inside a mutation by how far the mutation got
    pub(crate) fn mutation(operation: &'static str, completed: usize, source: StorageError) -> Self {
        Self::partial(operation, completed, GraphError::Storage(source))
    }

    /// `source` unchanged when nothing was applied yet, otherwise wrapped as
    /// a [`GraphError::PartialMutation`] of `operation`
    pub(crate) fn partial(operation: &'static str, completed: usize, source: GraphError) -> Self {
        if completed == 0 {
            source
        } else {
            GraphError::PartialMutation {
                operation,
                completed,
                source: Box::new(source),
            }
        }
    }
}

pub type GraphResult<T> = Result<T, GraphError>;
