//! Service-layer error: domain failures plus persistence failures with context.

use thiserror::Error;

use stockroom_core::{DomainError, ErrorCode};

use crate::store::StoreError;

pub type ServiceResult<T> = Result<T, ServiceError>;

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ServiceError {
    /// Deterministic domain failure, returned to the caller unchanged.
    #[error(transparent)]
    Domain(#[from] DomainError),

    /// The record store failed; `operation` and `entity_id` say where.
    #[error("persistence failure during {operation} on {entity_id}: {source}")]
    Persistence {
        operation: &'static str,
        entity_id: String,
        #[source]
        source: StoreError,
    },
}

impl ServiceError {
    /// Map a store error into the service error space.
    ///
    /// `NotFound` and `DuplicateKey` are caller-visible domain outcomes; only
    /// backend failures become `Persistence`.
    pub fn from_store(
        operation: &'static str,
        entity_id: impl ToString,
        source: StoreError,
    ) -> Self {
        match source {
            StoreError::NotFound(_) => ServiceError::Domain(DomainError::NotFound),
            StoreError::DuplicateKey(key) => {
                ServiceError::Domain(DomainError::conflict(format!("duplicate key: {key}")))
            }
            StoreError::Backend(_) => ServiceError::Persistence {
                operation,
                entity_id: entity_id.to_string(),
                source,
            },
        }
    }

    pub fn code(&self) -> ErrorCode {
        match self {
            ServiceError::Domain(e) => e.code(),
            ServiceError::Persistence { .. } => ErrorCode::PersistenceFailure,
        }
    }

    pub fn domain(&self) -> Option<&DomainError> {
        match self {
            ServiceError::Domain(e) => Some(e),
            ServiceError::Persistence { .. } => None,
        }
    }

    pub fn is_optimistic_lock_failure(&self) -> bool {
        matches!(
            self,
            ServiceError::Domain(DomainError::OptimisticLockFailed { .. })
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn store_errors_map_to_stable_codes() {
        assert_eq!(
            ServiceError::from_store("get", "x", StoreError::NotFound("x".into())).code(),
            ErrorCode::NotFound
        );
        assert_eq!(
            ServiceError::from_store("create", "x", StoreError::DuplicateKey("k".into())).code(),
            ErrorCode::Conflict
        );

        let err = ServiceError::from_store("update", "rec-1", StoreError::Backend("disk".into()));
        assert_eq!(err.code(), ErrorCode::PersistenceFailure);
        let msg = err.to_string();
        assert!(msg.contains("update") && msg.contains("rec-1") && msg.contains("disk"));
    }
}
