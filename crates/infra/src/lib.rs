//! Infrastructure layer: record stores, the version guard and the services
//! built on them (inventory ledger, transfer coordinator, orders), plus
//! configuration.

pub mod config;
pub mod error;
pub mod ledger;
pub mod orders;
pub mod store;
pub mod transfer_coordinator;
pub mod version_guard;


pub use config::{ConfigError, StockroomConfig};
pub use error::{ServiceError, ServiceResult};
pub use ledger::InventoryLedger;
pub use orders::OrderService;
pub use store::{InMemoryRecordStore, RecordStore, StoreError};
pub use transfer_coordinator::TransferCoordinator;
pub use version_guard::{update_with_version, VersionGuard};
