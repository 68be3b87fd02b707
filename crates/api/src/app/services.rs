//! Service wiring: in-memory record stores behind the infra services.

use std::sync::Arc;

use stockroom_core::{Clock, SystemClock};
use stockroom_infra::{
    InMemoryRecordStore, InventoryLedger, OrderService, StockroomConfig, TransferCoordinator,
};
use stockroom_inventory::{Location, StockRecord, Transfer};
use stockroom_sales::Order;

pub type StockStore = Arc<InMemoryRecordStore<StockRecord>>;
pub type TransferStore = Arc<InMemoryRecordStore<Transfer>>;
pub type LocationStore = Arc<InMemoryRecordStore<Location>>;
pub type OrderStore = Arc<InMemoryRecordStore<Order>>;

pub type Ledger = InventoryLedger<StockStore>;
pub type Transfers = TransferCoordinator<StockStore, TransferStore, LocationStore>;
pub type Orders = OrderService<OrderStore>;

/// Everything the handlers need, shared through an `Extension`.
pub struct AppServices {
    ledger: Arc<Ledger>,
    transfers: Transfers,
    orders: Orders,
    clock: Arc<dyn Clock>,
}

impl AppServices {
    pub fn clock(&self) -> &dyn Clock {
        self.clock.as_ref()
    }

    pub fn ledger(&self) -> &Ledger {
        &self.ledger
    }

    pub fn transfers(&self) -> &Transfers {
        &self.transfers
    }

    pub fn orders(&self) -> &Orders {
        &self.orders
    }
}

pub fn build_services(config: &StockroomConfig) -> AppServices {
    build_services_with_clock(config, Arc::new(SystemClock))
}

pub fn build_services_with_clock(config: &StockroomConfig, clock: Arc<dyn Clock>) -> AppServices {
    let ledger = Arc::new(InventoryLedger::new(
        Arc::new(InMemoryRecordStore::new()),
        clock.clone(),
        config.clone(),
    ));
    let transfers = TransferCoordinator::new(
        ledger.clone(),
        Arc::new(InMemoryRecordStore::new()),
        Arc::new(InMemoryRecordStore::new()),
        clock.clone(),
        config.clone(),
    );
    let orders = OrderService::new(
        Arc::new(InMemoryRecordStore::new()),
        clock.clone(),
        config.clone(),
    );

    tracing::info!(
        max_cas_attempts = config.max_cas_attempts,
        "in-memory services wired"
    );

    AppServices {
        ledger,
        transfers,
        orders,
        clock,
    }
}
