use std::sync::Arc;

use thiserror::Error;

use stockroom_core::{Entity, Page, Query};

/// Record store operation error.
///
/// These are **infrastructure errors** as opposed to domain errors
/// (validation, quantity preconditions, version conflicts).
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum StoreError {
    #[error("record not found: {0}")]
    NotFound(String),

    #[error("duplicate key: {0}")]
    DuplicateKey(String),

    #[error("store backend failure: {0}")]
    Backend(String),
}

/// Key-indexed document store for one entity type.
///
/// ## Write semantics
///
/// - Every write replaces a whole document atomically; there is no
///   multi-document transaction.
/// - `update_if` evaluates the predicate against the stored document and
///   replaces it in the same atomic step. It returns the number of matched
///   documents (0 or 1) and never distinguishes "missing" from "predicate
///   false"; callers that care must re-read.
///
/// ## Read semantics
///
/// - `find` and `list` return entities in ascending id order.
/// - `list` applies the page window after filtering.
pub trait RecordStore<E: Entity>: Send + Sync {
    /// Insert a new entity. Fails with `DuplicateKey` if the id or the
    /// entity's unique key is already taken.
    fn create(&self, entity: E) -> Result<E::Id, StoreError>;

    fn get(&self, id: &E::Id) -> Result<E, StoreError>;

    /// All entities matching a secondary-key query.
    fn find(&self, query: &dyn Query<E>) -> Result<Vec<E>, StoreError>;

    /// Unconditional replace.
    fn update(&self, entity: E) -> Result<(), StoreError>;

    /// Conditional replace keyed on the entity's id.
    fn update_if(&self, entity: E, predicate: &dyn Fn(&E) -> bool) -> Result<u64, StoreError>;

    fn list(&self, query: &dyn Query<E>, page: Page) -> Result<Vec<E>, StoreError>;

    fn delete(&self, id: &E::Id) -> Result<(), StoreError>;

    /// Conditional delete. Returns the number of removed documents (0 or 1).
    fn delete_if(&self, id: &E::Id, predicate: &dyn Fn(&E) -> bool) -> Result<u64, StoreError>;
}

impl<E, S> RecordStore<E> for Arc<S>
where
    E: Entity,
    S: RecordStore<E> + ?Sized,
{
    fn create(&self, entity: E) -> Result<E::Id, StoreError> {
        (**self).create(entity)
    }

    fn get(&self, id: &E::Id) -> Result<E, StoreError> {
        (**self).get(id)
    }

    fn find(&self, query: &dyn Query<E>) -> Result<Vec<E>, StoreError> {
        (**self).find(query)
    }

    fn update(&self, entity: E) -> Result<(), StoreError> {
        (**self).update(entity)
    }

    fn update_if(&self, entity: E, predicate: &dyn Fn(&E) -> bool) -> Result<u64, StoreError> {
        (**self).update_if(entity, predicate)
    }

    fn list(&self, query: &dyn Query<E>, page: Page) -> Result<Vec<E>, StoreError> {
        (**self).list(query, page)
    }

    fn delete(&self, id: &E::Id) -> Result<(), StoreError> {
        (**self).delete(id)
    }

    fn delete_if(&self, id: &E::Id, predicate: &dyn Fn(&E) -> bool) -> Result<u64, StoreError> {
        (**self).delete_if(id, predicate)
    }
}
