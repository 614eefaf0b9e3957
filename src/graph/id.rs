//! Id generation for new vertices and edges

use super::types::NodeId;
use std::sync::atomic::{AtomicU64, Ordering};
use uuid::Uuid;

/// Source of globally unique, opaque node ids
pub trait IdGenerator: Send + Sync {
    fn next_id(&self) -> NodeId;
}

/// Random v4 UUIDs; the default generator
#[derive(Debug, Default, Clone, Copy)]
pub struct UuidGenerator;

impl IdGenerator for UuidGenerator {
    fn next_id(&self) -> NodeId {
        NodeId::new(Uuid::new_v4().to_string())
    }
}

/// Monotonic `<prefix><n>` ids, for reproducible graphs in tests and fixtures
#[derive(Debug)]
pub struct SequentialIds {
    prefix: String,
    next: AtomicU64,
}

impl SequentialIds {
    pub fn new(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
            next: AtomicU64::new(1),
        }
    }
}

impl IdGenerator for SequentialIds {
    fn next_id(&self) -> NodeId {
        let n = self.next.fetch_add(1, Ordering::Relaxed);
        NodeId::new(format!("{}{}", self.prefix, n))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_uuid_ids_are_unique() {
        let ids: HashSet<NodeId> = (0..100).map(|_| UuidGenerator.next_id()).collect();
        assert_eq!(ids.len(), 100);
    }

    #[test]
    fn test_sequential_ids() {
        let ids = SequentialIds::new("n");
        assert_eq!(ids.next_id(), NodeId::new("n1"));
        assert_eq!(ids.next_id(), NodeId::new("n2"));
    }
}
