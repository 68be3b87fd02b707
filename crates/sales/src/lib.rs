//! Orders domain module.
//!
//! This crate contains business rules for orders, implemented purely as
//! deterministic domain logic (no IO, no HTTP, no storage). Orders are the
//! reference versioned entity: every persisted change goes through a
//! version-guarded write.

pub mod order;

pub use order::{NewOrder, Order, OrderLine, OrderQuery, OrderStatus};
