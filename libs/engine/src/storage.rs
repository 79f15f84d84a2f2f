use std::{
    collections::HashMap,
    sync::{Arc, Mutex as SyncMutex},
};
use thiserror::Error;
use tokio::sync::Mutex;

pub type JsonValue = serde_json::Value;

/// Whole-collection persistence. Every read returns the full collection and
/// every write replaces it, there are no partial updates.
pub trait RecordStore: Send + Sync {
    /// Missing collections load as empty. Never modifies what is stored,
    /// callers may not hold the write lock.
    fn load(&self, name: &str) -> Result<Vec<JsonValue>, StoreError>;

    /// Called with the write lock for `name` held, ahead of a `save`. This is
    /// the only place a store may repair or set aside damaged data.
    fn load_for_write(&self, name: &str) -> Result<Vec<JsonValue>, StoreError> {
        self.load(name)
    }

    /// Must atomically replace whatever was previously saved under `name`.
    fn save(&self, name: &str, records: &[JsonValue]) -> Result<(), StoreError>;

    /// The write lock for `name`, shared by every collection opened on this
    /// store.
    fn write_lock(&self, name: &str) -> Arc<Mutex<()>>;
}

/// One async lock per collection name.
#[derive(Default)]
pub struct WriteLocks {
    locks: SyncMutex<HashMap<String, Arc<Mutex<()>>>>,
}

impl WriteLocks {
    pub fn get(&self, name: &str) -> Arc<Mutex<()>> {
        let mut locks = self.locks.lock().unwrap_or_else(|e| e.into_inner());

        locks.entry(name.to_owned()).or_default().clone()
    }
}

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("I/O error on collection '{0}'")]
    Io(String, #[source] std::io::Error),
    #[error("Serialize failed on collection '{0}'")]
    Serialize(String, #[source] serde_json::Error),
    #[error("Store unavailable: {0}")]
    Unavailable(String),
}

pub mod memory {
    use tracing::*;

    use super::*;

    /// Keeps collections in process, nothing survives a restart.
    #[derive(Default)]
    pub struct Memory {
        collections: SyncMutex<HashMap<String, Vec<JsonValue>>>,
        writing: WriteLocks,
    }

    impl Memory {
        pub fn new() -> Arc<Self> {
            Arc::new(Self::default())
        }
    }

    impl RecordStore for Memory {
        fn load(&self, name: &str) -> Result<Vec<JsonValue>, StoreError> {
            let collections = self
                .collections
                .lock()
                .map_err(|_| StoreError::Unavailable("poisoned".to_owned()))?;

            trace!(%name, "loading");

            Ok(collections.get(name).cloned().unwrap_or_default())
        }

        fn save(&self, name: &str, records: &[JsonValue]) -> Result<(), StoreError> {
            let mut collections = self
                .collections
                .lock()
                .map_err(|_| StoreError::Unavailable("poisoned".to_owned()))?;

            trace!(%name, records = records.len(), "saving");

            collections.insert(name.to_owned(), records.to_vec());

            Ok(())
        }

        fn write_lock(&self, name: &str) -> Arc<Mutex<()>> {
            self.writing.get(name)
        }
    }

}
