//! Domain error model.

use thiserror::Error;

/// Result type used across the domain layer.
pub type DomainResult<T> = Result<T, DomainError>;

/// Domain-level error.
///
/// Keep this focused on deterministic, business/domain failures (validation,
/// quantity preconditions, lifecycle transitions, version conflicts).
/// Storage failures belong to the infrastructure layer.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DomainError {
    /// Malformed input (non-positive quantity, missing required field).
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// A referenced record does not exist.
    #[error("not found")]
    NotFound,

    /// Requested quantity exceeds what is on hand / available.
    #[error("insufficient stock (requested: {requested}, available: {available})")]
    InsufficientStock { requested: i32, available: i32 },

    /// Requested quantity exceeds what is currently reserved.
    #[error("insufficient reservation (requested: {requested}, reserved: {reserved})")]
    InsufficientReservation { requested: i32, reserved: i32 },

    /// A transfer referenced a disabled or unknown location.
    #[error("location inactive: {0}")]
    LocationInactive(String),

    /// The requested transfer transition is not legal from the current status.
    #[error("cannot {action} a transfer in status {status}")]
    InvalidTransferState { status: String, action: String },

    /// The record reached a terminal status and can no longer change.
    #[error("already terminal: {status}")]
    AlreadyTerminal { status: String },

    /// Stale version on a guarded update.
    #[error("optimistic lock failed (expected version: {expected}, actual: {actual})")]
    OptimisticLockFailed { expected: u64, actual: u64 },

    /// A uniqueness constraint would be violated (e.g. duplicate natural key).
    #[error("conflict: {0}")]
    Conflict(String),
}

impl DomainError {
    pub fn invalid(msg: impl Into<String>) -> Self {
        Self::InvalidArgument(msg.into())
    }

    pub fn not_found() -> Self {
        Self::NotFound
    }

    pub fn conflict(msg: impl Into<String>) -> Self {
        Self::Conflict(msg.into())
    }

    pub fn invalid_transfer_state(status: impl ToString, action: impl Into<String>) -> Self {
        Self::InvalidTransferState {
            status: status.to_string(),
            action: action.into(),
        }
    }

    pub fn already_terminal(status: impl ToString) -> Self {
        Self::AlreadyTerminal {
            status: status.to_string(),
        }
    }

    /// Stable, caller-facing code for this error.
    pub fn code(&self) -> ErrorCode {
        match self {
            DomainError::InvalidArgument(_) => ErrorCode::InvalidArgument,
            DomainError::NotFound => ErrorCode::NotFound,
            DomainError::InsufficientStock { .. } => ErrorCode::InsufficientStock,
            DomainError::InsufficientReservation { .. } => ErrorCode::InsufficientReservation,
            DomainError::LocationInactive(_) => ErrorCode::LocationInactive,
            DomainError::InvalidTransferState { .. } => ErrorCode::InvalidTransferState,
            DomainError::AlreadyTerminal { .. } => ErrorCode::AlreadyTerminal,
            DomainError::OptimisticLockFailed { .. } => ErrorCode::OptimisticLockFailed,
            DomainError::Conflict(_) => ErrorCode::Conflict,
        }
    }
}

/// Stable error codes exposed at the service boundary.
///
/// These strings are part of the public contract; never rename them.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum ErrorCode {
    InvalidArgument,
    NotFound,
    InsufficientStock,
    InsufficientReservation,
    LocationInactive,
    InvalidTransferState,
    AlreadyTerminal,
    OptimisticLockFailed,
    Conflict,
    PersistenceFailure,
}

impl ErrorCode {
    pub fn as_str(self) -> &'static str {
        match self {
            ErrorCode::InvalidArgument => "invalid_argument",
            ErrorCode::NotFound => "not_found",
            ErrorCode::InsufficientStock => "insufficient_stock",
            ErrorCode::InsufficientReservation => "insufficient_reservation",
            ErrorCode::LocationInactive => "location_inactive",
            ErrorCode::InvalidTransferState => "invalid_transfer_state",
            ErrorCode::AlreadyTerminal => "already_terminal",
            ErrorCode::OptimisticLockFailed => "optimistic_lock_failed",
            ErrorCode::Conflict => "conflict",
            ErrorCode::PersistenceFailure => "persistence_failure",
        }
    }

    /// Whether a caller may succeed by re-reading and retrying.
    pub fn is_retryable(self) -> bool {
        matches!(
            self,
            ErrorCode::OptimisticLockFailed | ErrorCode::PersistenceFailure
        )
    }
}

impl core::fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}
