//! Optimistic concurrency guard.
//!
//! Lost-update protection for any [`Versioned`] entity, enforced purely by a
//! conditional write at the store (no in-process lock):
//!
//! ```text
//! read (version v) -> mutate -> set version v+1 -> update_if(stored.version == v)
//!                                                        |
//!                                   matched 0 -> re-read by id
//!                                                   missing  -> NotFound
//!                                                   present  -> OptimisticLockFailed { v, actual }
//! ```

use stockroom_core::{next_version, DomainError, DomainResult, Versioned};
use tracing::{debug, warn};

use crate::error::{ServiceError, ServiceResult};
use crate::store::{RecordStore, StoreError};

/// Conditionally replace `entity` if the stored version still equals `expected_version`.
///
/// The caller sets the entity's new version (normally `expected_version + 1`)
/// before calling; a new version that does not move forward is rejected as an
/// invalid argument before the store is touched. On success the stored
/// version is exactly the caller's new value.
pub fn update_with_version<E, S>(store: &S, entity: E, expected_version: u64) -> ServiceResult<E>
where
    E: Versioned + Clone,
    S: RecordStore<E> + ?Sized,
{
    if entity.version() <= expected_version {
        return Err(DomainError::invalid(format!(
            "new version {} must be greater than expected version {}",
            entity.version(),
            expected_version
        ))
        .into());
    }

    let id = entity.id().clone();
    let matched = store
        .update_if(entity.clone(), &|stored: &E| stored.version() == expected_version)
        .map_err(|e| ServiceError::from_store("update_with_version", &id, e))?;

    if matched > 0 {
        return Ok(entity);
    }

    // Zero matches is ambiguous between "missing" and "stale"; re-read to tell.
    match store.get(&id) {
        Ok(current) => {
            debug!(
                entity_id = %id,
                expected = expected_version,
                actual = current.version(),
                "version guard rejected stale write"
            );
            Err(DomainError::OptimisticLockFailed {
                expected: expected_version,
                actual: current.version(),
            }
            .into())
        }
        Err(StoreError::NotFound(_)) => Err(DomainError::NotFound.into()),
        Err(e) => Err(ServiceError::from_store("update_with_version", &id, e)),
    }
}

/// Read-modify-write loop over [`update_with_version`].
///
/// `mutate` runs against a fresh read on every attempt, so a precondition that
/// stops holding after a concurrent write is re-checked rather than blindly
/// re-applied. Domain failures from `mutate` are returned immediately; only
/// version conflicts are retried, up to `max_attempts`.
#[derive(Debug, Clone, Copy)]
pub struct VersionGuard {
    max_attempts: u32,
}

impl VersionGuard {
    pub fn new(max_attempts: u32) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
        }
    }

    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    pub fn mutate<E, S, R, F>(
        &self,
        store: &S,
        operation: &'static str,
        id: &E::Id,
        mut mutate: F,
    ) -> ServiceResult<(E, R)>
    where
        E: Versioned + Clone,
        S: RecordStore<E> + ?Sized,
        F: FnMut(&mut E) -> DomainResult<R>,
    {
        let mut attempt = 1;
        loop {
            let mut entity = store
                .get(id)
                .map_err(|e| ServiceError::from_store(operation, id, e))?;
            let read_version = entity.version();
            let new_version = next_version(read_version)?;

            let outcome = mutate(&mut entity)?;
            entity.set_version(new_version);

            match update_with_version(store, entity, read_version) {
                Ok(written) => return Ok((written, outcome)),
                Err(err) if err.is_optimistic_lock_failure() && attempt < self.max_attempts => {
                    debug!(entity_id = %id, operation, attempt, "retrying after version conflict");
                    attempt += 1;
                }
                Err(err) if err.is_optimistic_lock_failure() => {
                    warn!(
                        entity_id = %id,
                        operation,
                        attempts = self.max_attempts,
                        "giving up after repeated version conflicts"
                    );
                    return Err(err);
                }
                Err(err) => return Err(err),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use stockroom_core::{CustomerId, Entity, ProductId, Sku};
    use stockroom_sales::{NewOrder, Order, OrderLine};

    use crate::store::InMemoryRecordStore;

    fn stored_order(store: &InMemoryRecordStore<Order>) -> Order {
        let order = Order::place(
            NewOrder {
                customer_id: CustomerId::new(),
                lines: vec![OrderLine {
                    product_id: ProductId::new(),
                    sku: Sku::parse("SKU-1").unwrap(),
                    quantity: 1,
                    unit_price: 100,
                }],
                notes: None,
            },
            Utc::now(),
        )
        .unwrap();
        store.create(order.clone()).unwrap();
        order
    }

    #[test]
    fn matching_version_is_written() {
        let store = InMemoryRecordStore::<Order>::new();
        let mut order = stored_order(&store);
        order.set_version(2);

        let written = update_with_version(&store, order.clone(), 1).unwrap();
        assert_eq!(written.version(), 2);
        assert_eq!(store.get(order.id()).unwrap().version(), 2);
    }

    #[test]
    fn stale_version_fails_and_leaves_store_untouched() {
        let store = InMemoryRecordStore::<Order>::new();
        let original = stored_order(&store);

        let mut first = original.clone();
        first.set_version(2);
        update_with_version(&store, first, 1).unwrap();
        let snapshot = store.get(original.id()).unwrap();

        let mut stale = original.clone();
        stale
            .revise(stale.lines().to_vec(), Some("late edit".into()), Utc::now())
            .unwrap();
        stale.set_version(2);
        let err = update_with_version(&store, stale, 1).unwrap_err();

        assert_eq!(
            err,
            ServiceError::Domain(DomainError::OptimisticLockFailed {
                expected: 1,
                actual: 2
            })
        );
        assert_eq!(store.get(original.id()).unwrap(), snapshot);
    }

    #[test]
    fn missing_entity_is_not_found() {
        let store = InMemoryRecordStore::<Order>::new();
        let other = InMemoryRecordStore::<Order>::new();
        let mut order = stored_order(&other);
        order.set_version(2);

        let err = update_with_version(&store, order, 1).unwrap_err();
        assert_eq!(err, ServiceError::Domain(DomainError::NotFound));
    }

    #[test]
    fn non_advancing_version_is_rejected_before_store() {
        let store = InMemoryRecordStore::<Order>::new();
        let order = stored_order(&store);
        let err = update_with_version(&store, order, 1).unwrap_err();
        assert!(matches!(err, ServiceError::Domain(DomainError::InvalidArgument(_))));
    }

    #[test]
    fn mutate_retries_against_fresh_reads() {
        use std::cell::Cell;

        let store = InMemoryRecordStore::<Order>::new();
        let order = stored_order(&store);
        let id = *order.id();
        let calls = Cell::new(0);

        let guard = VersionGuard::new(3);
        let (written, ()) = guard
            .mutate(&store, "annotate", &id, |o: &mut Order| {
                calls.set(calls.get() + 1);
                if calls.get() == 1 {
                    // Simulate a competing writer landing between our read and write.
                    let mut competitor = store.get(&id).unwrap();
                    competitor.set_version(competitor.version() + 1);
                    store.update(competitor).unwrap();
                }
                o.revise(o.lines().to_vec(), Some("annotated".into()), Utc::now())
            })
            .unwrap();

        assert_eq!(calls.get(), 2);
        assert_eq!(written.version(), 3);
        assert_eq!(store.get(&id).unwrap().notes(), Some("annotated"));
    }

    #[test]
    fn mutate_surfaces_domain_errors_without_retry() {
        let store = InMemoryRecordStore::<Order>::new();
        let order = stored_order(&store);
        let guard = VersionGuard::new(5);
        let mut calls = 0;

        let err = guard
            .mutate(&store, "noop", order.id(), |_o: &mut Order| -> DomainResult<()> {
                calls += 1;
                Err(DomainError::invalid("nope"))
            })
            .unwrap_err();
        assert_eq!(calls, 1);
        assert!(matches!(err, ServiceError::Domain(DomainError::InvalidArgument(_))));
    }

    #[test]
    fn mutate_gives_up_after_max_attempts() {
        let store = InMemoryRecordStore::<Order>::new();
        let order = stored_order(&store);
        let id = *order.id();
        let guard = VersionGuard::new(2);

        let err = guard
            .mutate(&store, "contended", &id, |_o: &mut Order| -> DomainResult<()> {
                let mut competitor = store.get(&id).unwrap();
                competitor.set_version(competitor.version() + 1);
                store.update(competitor).unwrap();
                Ok(())
            })
            .unwrap_err();
        assert_eq!(
            err,
            ServiceError::Domain(DomainError::OptimisticLockFailed {
                expected: 2,
                actual: 3
            })
        );
    }
}
