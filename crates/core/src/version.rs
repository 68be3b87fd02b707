//! Version tracking for entities that need lost-update protection.

use crate::entity::Entity;
use crate::error::{DomainError, DomainResult};

/// Entity with a monotonically increasing version.
///
/// The writer sets the next version before an update attempt; a store accepts
/// the write only while the stored version still equals the one the writer read.
pub trait Versioned: Entity {
    /// Current version of the entity's state.
    fn version(&self) -> u64;

    /// Overwrite the version (writers call this with `read_version + 1`).
    fn set_version(&mut self, version: u64);
}

/// Version a writer assigns after reading `read_version`.
///
/// Caller-supplied versions can sit at `u64::MAX`; that is an invalid argument,
/// not an overflow.
pub fn next_version(read_version: u64) -> DomainResult<u64> {
    read_version
        .checked_add(1)
        .ok_or_else(|| DomainError::invalid(format!("version {read_version} cannot be advanced")))
}

/// Optimistic concurrency expectation for a versioned entity.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum ExpectedVersion {
    /// Skip version checking (administrative overrides, migrations).
    Any,
    /// Require the entity to be at an exact version.
    Exact(u64),
}

impl ExpectedVersion {
    pub fn matches(self, actual: u64) -> bool {
        match self {
            ExpectedVersion::Any => true,
            ExpectedVersion::Exact(v) => v == actual,
        }
    }

    pub fn check(self, actual: u64) -> DomainResult<()> {
        match self {
            ExpectedVersion::Exact(expected) if expected != actual => {
                Err(DomainError::OptimisticLockFailed { expected, actual })
            }
            _ => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exact_mismatch_reports_both_versions() {
        let err = ExpectedVersion::Exact(3).check(5).unwrap_err();
        assert_eq!(
            err,
            DomainError::OptimisticLockFailed {
                expected: 3,
                actual: 5
            }
        );
    }

    #[test]
    fn next_version_refuses_to_wrap() {
        assert_eq!(next_version(4), Ok(5));
        assert!(matches!(next_version(u64::MAX), Err(DomainError::InvalidArgument(_))));
    }

    #[test]
    fn any_always_matches() {
        assert!(ExpectedVersion::Any.matches(0));
        assert!(ExpectedVersion::Any.matches(42));
        assert!(ExpectedVersion::Any.check(7).is_ok());
    }
}
