//! Process-wide tracing setup for the stockroom binaries.

pub mod subscriber;

pub use subscriber::{DEFAULT_DIRECTIVE, init_with};

/// Initialize process-wide observability (structured JSON logs).
///
/// This is safe to call multiple times; subsequent calls become no-ops.
pub fn init() {
    subscriber::init_with(DEFAULT_DIRECTIVE);
}
