//! Typed list/query predicates.
//!
//! Each entity type gets an explicit filter struct enumerating the predicates
//! it supports; stores only ever see them through this trait.

/// Predicate over a stored entity.
pub trait Query<E>: Send + Sync {
    fn matches(&self, entity: &E) -> bool;
}

/// Matches every entity.
#[derive(Debug, Default, Copy, Clone, PartialEq, Eq)]
pub struct All;

impl<E> Query<E> for All {
    fn matches(&self, _entity: &E) -> bool {
        true
    }
}
