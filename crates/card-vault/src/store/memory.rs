//! [`MemoryCardStore`]: thread-safe in-process implementation of [`CardStore`].

use std::{
    collections::{hash_map::Entry, HashMap},
    sync::{Arc, RwLock},
};

use super::{CardRecord, CardStore, InsertOutcome, StoreError};

/// In-memory card store backed by an `Arc<RwLock<HashMap<..>>>`.
///
/// The existence check and the insert happen under one write lock, which gives
/// the uniqueness guarantee on `lookup_hash`. Reads share the lock.
#[derive(Clone, Debug, Default)]
pub struct MemoryCardStore {
    inner: Arc<RwLock<HashMap<String, CardRecord>>>,
}

impl MemoryCardStore {
    /// Create a new, empty store.
    pub fn new() -> Self {
        Self::default()
    }
}

fn poisoned<T>(_: T) -> StoreError {
    StoreError::Unavailable("card store lock poisoned".into())
}

impl CardStore for MemoryCardStore {
    fn insert_if_absent(&self, record: CardRecord) -> Result<InsertOutcome, StoreError> {
        let mut map = self.inner.write().map_err(poisoned)?;
        match map.entry(record.lookup_hash.clone()) {
            Entry::Occupied(existing) => Ok(InsertOutcome::AlreadyExists(existing.get().clone())),
            Entry::Vacant(slot) => {
                slot.insert(record);
                Ok(InsertOutcome::Inserted)
            }
        }
    }

    fn find_by_hash(&self, lookup_hash: &str) -> Result<Option<CardRecord>, StoreError> {
        let map = self.inner.read().map_err(poisoned)?;
        Ok(map.get(lookup_hash).cloned())
    }

    fn count(&self) -> Result<usize, StoreError> {
        Ok(self.inner.read().map_err(poisoned)?.len())
    }
}
