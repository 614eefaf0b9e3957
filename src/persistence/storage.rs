//! RocksDB storage layer implementation
//!
//! Each collection is a column family; documents are bincode-encoded and keyed
//! by the raw id bytes.

use super::{Collection, GraphStore, NodeStream, StorageError, StorageResult};
use crate::graph::{Node, NodeId};
use async_trait::async_trait;
use futures::stream::{self, StreamExt};
use rocksdb::{ColumnFamily, ColumnFamilyDescriptor, IteratorMode, Options, DB};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info};

/// RocksDB-based persistent storage
pub struct RocksStore {
    db: Arc<DB>,
    path: PathBuf,
}

impl RocksStore {
    /// Open or create a store at `path`
    pub fn open(path: impl AsRef<Path>) -> StorageResult<Self> {
        Self::open_with(path, true)
    }

    /// Open a store, failing when it does not exist and `create_if_missing` is off
    pub fn open_with(path: impl AsRef<Path>, create_if_missing: bool) -> StorageResult<Self> {
        let path = path.as_ref().to_path_buf();

        info!("Opening graph storage at: {}", path.display());

        let mut opts = Options::default();
        opts.create_if_missing(create_if_missing);
        opts.create_missing_column_families(true);

        opts.set_write_buffer_size(64 * 1024 * 1024); // 64 MB
        opts.set_max_write_buffer_number(3);
        opts.set_min_write_buffer_number_to_merge(1);
        opts.set_compression_type(rocksdb::DBCompressionType::Lz4);
        opts.set_wal_recovery_mode(rocksdb::DBRecoveryMode::PointInTime);

        let cf_descriptors = vec![
            ColumnFamilyDescriptor::new("default", Options::default()),
            ColumnFamilyDescriptor::new(Collection::Vertices.name(), Self::collection_cf_options()),
            ColumnFamilyDescriptor::new(Collection::Edges.name(), Self::collection_cf_options()),
        ];

        let db = DB::open_cf_descriptors(&opts, &path, cf_descriptors)?;

        info!("Graph storage opened successfully");

        Ok(Self {
            db: Arc::new(db),
            path,
        })
    }

    fn collection_cf_options() -> Options {
        let mut opts = Options::default();
        opts.set_compression_type(rocksdb::DBCompressionType::Lz4);
        opts
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn cf(&self, collection: Collection) -> StorageResult<&ColumnFamily> {
        self.db
            .cf_handle(collection.name())
            .ok_or_else(|| StorageError::ColumnFamily(collection.name().to_string()))
    }

    fn read(&self, collection: Collection, id: &NodeId) -> StorageResult<Option<Node>> {
        let cf = self.cf(collection)?;
        match self.db.get_cf(&cf, id.as_str().as_bytes())? {
            Some(value) => Ok(Some(bincode::deserialize(&value)?)),
            None => Ok(None),
        }
    }

    fn write(&self, collection: Collection, node: &Node) -> StorageResult<()> {
        collection.check(node)?;
        let cf = self.cf(collection)?;
        let value = bincode::serialize(node)?;
        self.db.put_cf(&cf, node.id().as_str().as_bytes(), value)?;
        debug!("Stored {} in {}", node.id(), collection);
        Ok(())
    }

    fn remove(&self, collection: Collection, id: &NodeId) -> StorageResult<()> {
        let cf = self.cf(collection)?;
        self.db.delete_cf(&cf, id.as_str().as_bytes())?;
        debug!("Deleted {} from {}", id, collection);
        Ok(())
    }

    fn read_all(&self, collection: Collection) -> StorageResult<Vec<Node>> {
        let cf = self.cf(collection)?;
        let mut nodes = Vec::new();
        for item in self.db.iterator_cf(&cf, IteratorMode::Start) {
            let (_key, value) = item?;
            nodes.push(bincode::deserialize(&value)?);
        }
        Ok(nodes)
    }

    /// Flush both collections to disk
    pub fn flush(&self) -> StorageResult<()> {
        for collection in [Collection::Vertices, Collection::Edges] {
            let cf = self.cf(collection)?;
            self.db.flush_cf(&cf)?;
        }
        debug!("Flushed graph storage to disk");
        Ok(())
    }
}

#[async_trait]
impl GraphStore for RocksStore {
    async fn get(&self, collection: Collection, id: &NodeId) -> StorageResult<Option<Node>> {
        self.read(collection, id)
    }

    async fn put(&self, collection: Collection, node: &Node) -> StorageResult<()> {
        self.write(collection, node)
    }

    async fn delete(&self, collection: Collection, id: &NodeId) -> StorageResult<()> {
        self.remove(collection, id)
    }

    async fn scan(&self, collection: Collection) -> StorageResult<NodeStream> {
        let nodes = self.read_all(collection)?;
        Ok(stream::iter(nodes.into_iter().map(Ok)).boxed())
    }
}
