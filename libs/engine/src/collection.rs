use serde::{de::DeserializeOwned, Serialize};
use std::{marker::PhantomData, sync::Arc};
use tracing::*;

use crate::{
    errors::DomainError,
    storage::{JsonValue, RecordStore, StoreError},
};

/// A typed view of one named collection in a `RecordStore`.
///
/// Nothing is cached between calls. Mutations hold the store's write lock
/// for the collection across the whole load, mutate, save cycle so
/// concurrent writers queue up instead of overwriting each other, even
/// writers holding different `Collection`s over the same store. Reads skip
/// the lock and see whatever was last committed.
pub struct Collection<T> {
    name: &'static str,
    store: Arc<dyn RecordStore>,
    _records: PhantomData<fn() -> T>,
}

impl<T> Collection<T>
where
    T: Serialize + DeserializeOwned + Send + 'static,
{
    pub fn new(name: &'static str, store: Arc<dyn RecordStore>) -> Self {
        Self {
            name,
            store,
            _records: PhantomData,
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub async fn load(&self) -> Result<Vec<T>, DomainError> {
        self.read(false).await
    }

    async fn read(&self, writing: bool) -> Result<Vec<T>, DomainError> {
        let values = tokio::task::spawn_blocking({
            let store = self.store.clone();
            let name = self.name;
            move || {
                if writing {
                    store.load_for_write(name)
                } else {
                    store.load(name)
                }
            }
        })
        .await??;

        values
            .into_iter()
            .map(|value| {
                serde_json::from_value(value)
                    .map_err(|e| DomainError::Malformed(self.name.to_owned(), e))
            })
            .collect()
    }

    async fn save(&self, records: &[T]) -> Result<(), DomainError> {
        let values = records
            .iter()
            .map(serde_json::to_value)
            .collect::<Result<Vec<JsonValue>, _>>()
            .map_err(|e| StoreError::Serialize(self.name.to_owned(), e))?;

        tokio::task::spawn_blocking({
            let store = self.store.clone();
            let name = self.name;
            move || store.save(name, &values)
        })
        .await??;

        Ok(())
    }

    pub async fn modify<R, F>(&self, mutate: F) -> Result<R, DomainError>
    where
        F: FnOnce(&mut Vec<T>) -> Result<R, DomainError>,
    {
        self.modify_and_then(mutate, |_| {}).await
    }

    /// Like `modify`, `committed` runs after the save succeeds and before the
    /// write lock is released, so its calls are ordered the same as commits.
    pub async fn modify_and_then<R, F, C>(&self, mutate: F, committed: C) -> Result<R, DomainError>
    where
        F: FnOnce(&mut Vec<T>) -> Result<R, DomainError>,
        C: FnOnce(&R),
    {
        let writing = self.store.write_lock(self.name);
        let _writing = writing.lock().await;

        let mut records = self.read(true).await?;
        let before = records.len();
        let returning = mutate(&mut records)?;

        trace!(collection = %self.name, before, after = records.len(), "saving");

        self.save(&records).await?;

        committed(&returning);

        Ok(returning)
    }
}
