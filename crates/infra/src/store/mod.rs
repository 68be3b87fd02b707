//! Record store boundary (the persistence collaborator).
//!
//! Services only talk to storage through [`RecordStore`]. The in-memory
//! implementation backs tests and dev wiring; a database adapter implements
//! the same trait.

pub mod in_memory;
pub mod r#trait;

pub use in_memory::InMemoryRecordStore;
pub use r#trait::{RecordStore, StoreError};
