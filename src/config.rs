//! Graph configuration

use crate::persistence::{GraphStore, MemoryStore, RocksStore, StorageResult};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::sync::Arc;

/// Where documents live
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum StorageBackend {
    /// Process-local, lost on drop
    Memory,
    /// RocksDB database directory
    RocksDb { path: PathBuf },
}

/// Graph configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GraphConfig {
    /// Storage backend
    pub backend: StorageBackend,
    /// Create the on-disk database when it does not exist yet
    pub create_if_missing: bool,
}

impl Default for GraphConfig {
    fn default() -> Self {
        Self {
            backend: StorageBackend::Memory,
            create_if_missing: true,
        }
    }
}

impl GraphConfig {
    /// Persistent graph at `path`
    pub fn rocksdb(path: impl Into<PathBuf>) -> Self {
        Self {
            backend: StorageBackend::RocksDb { path: path.into() },
            ..Self::default()
        }
    }

    /// Build the configured store
    pub fn open_store(&self) -> StorageResult<Arc<dyn GraphStore>> {
        match &self.backend {
            StorageBackend::Memory => Ok(Arc::new(MemoryStore::new())),
            StorageBackend::RocksDb { path } => {
                Ok(Arc::new(RocksStore::open_with(path, self.create_if_missing)?))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_in_memory() {
        let config = GraphConfig::default();
        assert_eq!(config.backend, StorageBackend::Memory);
        assert!(config.create_if_missing);
    }

    #[test]
    fn test_deserialize_partial_config() {
        let config: GraphConfig =
            serde_json::from_str(r#"{"backend": {"type": "rocks_db", "path": "/tmp/graph"}}"#).unwrap();
        assert_eq!(config, GraphConfig::rocksdb("/tmp/graph"));
    }
}
