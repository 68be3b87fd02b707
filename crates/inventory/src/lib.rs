//! Inventory domain module.
//!
//! This crate contains business rules for stock records, locations and
//! transfers, implemented purely as deterministic domain logic (no IO, no
//! HTTP, no storage).

pub mod location;
pub mod query;
pub mod stock;
pub mod transfer;

pub use location::{Location, LocationKind, LocationQuery};
pub use query::{LocationRole, StockQuery, TransferQuery};
pub use stock::{NewStockRecord, StockRecord, StockSettings, TransferLeg, TRANSFER_JOURNAL_LIMIT};
pub use transfer::{
    ItemStatus, NewTransfer, Settlement, Transfer, TransferItem, TransferStatus,
};
