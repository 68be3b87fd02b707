use std::collections::BTreeMap;
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use stockroom_core::{Entity, Page, Query};

use super::r#trait::{RecordStore, StoreError};

/// In-memory record store.
///
/// Intended for tests/dev. Not optimized for performance: unique-key checks
/// and queries scan every document.
#[derive(Debug)]
pub struct InMemoryRecordStore<E: Entity> {
    records: RwLock<BTreeMap<E::Id, E>>,
}

impl<E: Entity> InMemoryRecordStore<E> {
    pub fn new() -> Self {
        Self {
            records: RwLock::new(BTreeMap::new()),
        }
    }

    pub fn len(&self) -> usize {
        self.read().map(|m| m.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn read(&self) -> Result<RwLockReadGuard<'_, BTreeMap<E::Id, E>>, StoreError> {
        self.records
            .read()
            .map_err(|_| StoreError::Backend("lock poisoned".to_string()))
    }

    fn write(&self) -> Result<RwLockWriteGuard<'_, BTreeMap<E::Id, E>>, StoreError> {
        self.records
            .write()
            .map_err(|_| StoreError::Backend("lock poisoned".to_string()))
    }
}

impl<E: Entity> Default for InMemoryRecordStore<E> {
    fn default() -> Self {
        Self::new()
    }
}

impl<E> RecordStore<E> for InMemoryRecordStore<E>
where
    E: Entity + Clone + Send + Sync,
    E::Id: Send + Sync,
{
    fn create(&self, entity: E) -> Result<E::Id, StoreError> {
        let mut records = self.write()?;
        let id = entity.id().clone();

        if records.contains_key(&id) {
            return Err(StoreError::DuplicateKey(id.to_string()));
        }
        if let Some(key) = entity.unique_key() {
            if records.values().any(|e| e.unique_key().as_deref() == Some(key.as_str())) {
                return Err(StoreError::DuplicateKey(key));
            }
        }

        records.insert(id.clone(), entity);
        Ok(id)
    }

    fn get(&self, id: &E::Id) -> Result<E, StoreError> {
        self.read()?
            .get(id)
            .cloned()
            .ok_or_else(|| StoreError::NotFound(id.to_string()))
    }

    fn find(&self, query: &dyn Query<E>) -> Result<Vec<E>, StoreError> {
        Ok(self
            .read()?
            .values()
            .filter(|e| query.matches(e))
            .cloned()
            .collect())
    }

    fn update(&self, entity: E) -> Result<(), StoreError> {
        let mut records = self.write()?;
        match records.get_mut(entity.id()) {
            Some(slot) => {
                *slot = entity;
                Ok(())
            }
            None => Err(StoreError::NotFound(entity.id().to_string())),
        }
    }

    fn update_if(&self, entity: E, predicate: &dyn Fn(&E) -> bool) -> Result<u64, StoreError> {
        let mut records = self.write()?;
        match records.get_mut(entity.id()) {
            Some(slot) if predicate(slot) => {
                *slot = entity;
                Ok(1)
            }
            _ => Ok(0),
        }
    }

    fn list(&self, query: &dyn Query<E>, page: Page) -> Result<Vec<E>, StoreError> {
        let records = self.read()?;
        Ok(page.apply(records.values().filter(|e| query.matches(e)).cloned()))
    }

    fn delete(&self, id: &E::Id) -> Result<(), StoreError> {
        match self.write()?.remove(id) {
            Some(_) => Ok(()),
            None => Err(StoreError::NotFound(id.to_string())),
        }
    }

    fn delete_if(&self, id: &E::Id, predicate: &dyn Fn(&E) -> bool) -> Result<u64, StoreError> {
        let mut records = self.write()?;
        match records.get(id) {
            Some(existing) if predicate(existing) => {
                records.remove(id);
                Ok(1)
            }
            _ => Ok(0),
        }
    }
}
