//! `stockroom-core`: domain foundation building blocks.
//!
//! This crate contains **pure domain** primitives (no infrastructure concerns).

pub mod clock;
pub mod entity;
pub mod error;
pub mod id;
pub mod query;
pub mod value_object;
pub mod version;

pub use clock::{Clock, FixedClock, SystemClock};
pub use entity::Entity;
pub use error::{DomainError, DomainResult, ErrorCode};
pub use id::{CustomerId, LocationId, OrderId, ProductId, StockRecordId, TransferId};
pub use query::{All, Query};
pub use value_object::{Page, Sku, ValueObject};
pub use version::{next_version, ExpectedVersion, Versioned};
