//! In-memory storage, the default engine for tests and local runs.

use super::{Lookup, ResourceStore, StoreError};
use crate::core::resource::Resource;
use async_trait::async_trait;
use std::collections::HashMap;
use std::marker::PhantomData;
use std::sync::Arc;
use tokio::sync::RwLock;
use uuid::Uuid;

/// HashMap-backed store for one resource kind. Cloning shares the
/// underlying map.
pub struct InMemoryStore<T: Resource> {
    records: Arc<RwLock<HashMap<Uuid, T>>>,
    _marker: PhantomData<T>,
}

impl<T: Resource> InMemoryStore<T> {
    pub fn new() -> Self {
        Self {
            records: Arc::new(RwLock::new(HashMap::new())),
            _marker: PhantomData,
        }
    }

    /// Unique-key enforcement matching the indexes the engine-backed
    /// stores declare. `exclude` skips the record being replaced.
    async fn check_unique(&self, candidate: &T, exclude: Option<&Uuid>) -> Result<(), StoreError> {
        let records = self.records.read().await;
        for (kind, value) in candidate.unique_keys() {
            let taken = records.iter().any(|(id, existing)| {
                if exclude == Some(id) {
                    return false;
                }
                existing
                    .unique_keys()
                    .iter()
                    .any(|(k, v)| *k == kind && *v == value)
            });
            if taken {
                return Err(StoreError::Duplicate(kind));
            }
        }
        Ok(())
    }
}

impl<T: Resource> Clone for InMemoryStore<T> {
    fn clone(&self) -> Self {
        Self {
            records: Arc::clone(&self.records),
            _marker: PhantomData,
        }
    }
}

impl<T: Resource> Default for InMemoryStore<T> {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl<T: Resource> ResourceStore<T> for InMemoryStore<T> {
    async fn find_one(&self, lookup: &Lookup) -> Result<Option<T>, StoreError> {
        let records = self.records.read().await;
        let found = match lookup {
            Lookup::Id(id) => records.get(id).cloned(),
            Lookup::Slug(slug) => records.values().find(|r| r.slug() == slug).cloned(),
            Lookup::Username(username) => records
                .values()
                .find(|r| {
                    r.unique_keys().iter().any(|(kind, value)| {
                        *kind == crate::core::error::DuplicateKind::Username && value == username
                    })
                })
                .cloned(),
        };
        Ok(found)
    }

    async fn find_many(&self) -> Result<Vec<T>, StoreError> {
        let records = self.records.read().await;
        let mut all: Vec<T> = records.values().cloned().collect();
        all.sort_by(|a, b| b.date_added().cmp(&a.date_added()));
        Ok(all)
    }

    async fn insert(&self, record: T) -> Result<T, StoreError> {
        self.check_unique(&record, None).await?;
        let mut records = self.records.write().await;
        records.insert(record.id(), record.clone());
        Ok(record)
    }

    async fn update(&self, id: &Uuid, record: T) -> Result<u64, StoreError> {
        self.check_unique(&record, Some(id)).await?;
        let mut records = self.records.write().await;
        match records.get_mut(id) {
            Some(slot) => {
                *slot = record;
                Ok(1)
            }
            None => Ok(0),
        }
    }

    async fn delete(&self, id: &Uuid) -> Result<u64, StoreError> {
        let mut records = self.records.write().await;
        Ok(match records.remove(id) {
            Some(_) => 1,
            None => 0,
        })
    }
}
