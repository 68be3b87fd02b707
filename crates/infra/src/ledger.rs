//! Inventory ledger service.
//!
//! Owns every persisted change to a [`StockRecord`]. Each mutation is a
//! versioned read-modify-write through [`VersionGuard`], so two concurrent
//! reservations can never both pass the availability check against the same
//! stored state.

use std::sync::Arc;

use tracing::{info, instrument, warn};

use stockroom_core::{
    next_version, Clock, DomainError, LocationId, Page, ProductId, Sku, StockRecordId, TransferId, Versioned,
};
use stockroom_inventory::{NewStockRecord, StockQuery, StockRecord, StockSettings};

use crate::config::StockroomConfig;
use crate::error::{ServiceError, ServiceResult};
use crate::store::RecordStore;
use crate::version_guard::{update_with_version, VersionGuard};

pub struct InventoryLedger<S> {
    store: S,
    clock: Arc<dyn Clock>,
    guard: VersionGuard,
    config: StockroomConfig,
}

impl<S> InventoryLedger<S>
where
    S: RecordStore<StockRecord>,
{
    pub fn new(store: S, clock: Arc<dyn Clock>, config: StockroomConfig) -> Self {
        Self {
            store,
            clock,
            guard: VersionGuard::new(config.max_cas_attempts),
            config,
        }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    #[instrument(skip(self, input), fields(product_id = %input.product_id, location_id = %input.location_id))]
    pub fn create_stock(&self, input: NewStockRecord) -> ServiceResult<StockRecord> {
        let record = StockRecord::create(input, self.clock.now())?;
        let id = record.id_typed();
        self.store
            .create(record.clone())
            .map_err(|e| ServiceError::from_store("create_stock", id, e))?;
        info!(stock_id = %id, quantity = record.quantity(), "stock record created");
        Ok(record)
    }

    pub fn get_stock(&self, id: StockRecordId) -> ServiceResult<StockRecord> {
        self.store
            .get(&id)
            .map_err(|e| ServiceError::from_store("get_stock", id, e))
    }

    /// The record for a product at one location.
    pub fn get_stock_at(
        &self,
        product_id: ProductId,
        location_id: LocationId,
    ) -> ServiceResult<StockRecord> {
        self.find_one(StockQuery::by_product(product_id).at_location(location_id))
    }

    /// The record for a SKU at one location.
    pub fn get_stock_by_sku_at(&self, sku: Sku, location_id: LocationId) -> ServiceResult<StockRecord> {
        self.find_one(StockQuery::by_sku(sku).at_location(location_id))
    }

    /// Every record for a product, across locations.
    pub fn get_stock_by_product(&self, product_id: ProductId) -> ServiceResult<Vec<StockRecord>> {
        self.find(StockQuery::by_product(product_id))
    }

    /// Every record for a SKU, across locations.
    pub fn get_stock_by_sku(&self, sku: Sku) -> ServiceResult<Vec<StockRecord>> {
        self.find(StockQuery::by_sku(sku))
    }

    /// Replace tuning values and shelf location under a version check.
    #[instrument(skip(self, settings))]
    pub fn update_stock(
        &self,
        id: StockRecordId,
        settings: StockSettings,
        expected_version: u64,
    ) -> ServiceResult<StockRecord> {
        let new_version = next_version(expected_version)?;
        let mut record = self.get_stock(id)?;
        record.apply_settings(settings)?;
        record.touch(self.clock.now());
        record.set_version(new_version);
        update_with_version(&self.store, record, expected_version)
    }

    /// Hard delete, allowed only once the record holds no stock.
    #[instrument(skip(self))]
    pub fn delete_stock(&self, id: StockRecordId) -> ServiceResult<()> {
        let record = self.get_stock(id)?;
        if record.quantity() > 0 {
            return Err(DomainError::invalid("cannot delete a stock record that still holds stock").into());
        }

        let removed = self
            .store
            .delete_if(&id, &|r: &StockRecord| r.quantity() == 0)
            .map_err(|e| ServiceError::from_store("delete_stock", id, e))?;
        if removed == 0 {
            // Gone or restocked since we looked.
            return match self.store.get(&id) {
                Ok(_) => Err(DomainError::invalid("cannot delete a stock record that still holds stock").into()),
                Err(e) => Err(ServiceError::from_store("delete_stock", id, e)),
            };
        }
        info!(stock_id = %id, "stock record deleted");
        Ok(())
    }

    pub fn list_stock(&self, query: &StockQuery, page: Page) -> ServiceResult<Vec<StockRecord>> {
        self.store
            .list(query, self.config.page(page))
            .map_err(|e| ServiceError::from_store("list_stock", "stock", e))
    }

    /// Records at or below their reorder point.
    pub fn list_low_stock(
        &self,
        location_id: Option<LocationId>,
        page: Page,
    ) -> ServiceResult<Vec<StockRecord>> {
        let query = StockQuery {
            location_id,
            ..StockQuery::default()
        }
        .low_stock();
        self.list_stock(&query, page)
    }

    #[instrument(skip(self))]
    pub fn add_stock(&self, id: StockRecordId, amount: i32) -> ServiceResult<StockRecord> {
        self.apply("add_stock", id, amount, |r| r.add_stock(amount))
    }

    #[instrument(skip(self))]
    pub fn remove_stock(&self, id: StockRecordId, amount: i32) -> ServiceResult<StockRecord> {
        self.apply("remove_stock", id, amount, |r| r.remove_stock(amount))
    }

    #[instrument(skip(self))]
    pub fn reserve_stock(&self, id: StockRecordId, amount: i32) -> ServiceResult<StockRecord> {
        self.apply("reserve_stock", id, amount, |r| r.reserve(amount))
    }

    #[instrument(skip(self))]
    pub fn release_reservation(&self, id: StockRecordId, amount: i32) -> ServiceResult<StockRecord> {
        self.apply("release_reservation", id, amount, |r| {
            if amount > r.reserved() {
                warn!(stock_id = %id, amount, reserved = r.reserved(), "release exceeds reservation; clamping to zero");
            }
            r.release_reservation(amount)
        })
    }

    #[instrument(skip(self))]
    pub fn fulfill_reservation(&self, id: StockRecordId, amount: i32) -> ServiceResult<StockRecord> {
        self.apply("fulfill_reservation", id, amount, |r| r.fulfill_reservation(amount))
    }

    /// Get the destination record for a transfer, creating an empty one if the
    /// product has never been stocked there.
    pub fn ensure_stock(
        &self,
        product_id: ProductId,
        sku: Sku,
        location_id: LocationId,
    ) -> ServiceResult<StockRecord> {
        match self.get_stock_at(product_id, location_id) {
            Ok(record) => return Ok(record),
            Err(ServiceError::Domain(DomainError::NotFound)) => {}
            Err(e) => return Err(e),
        }

        let created = self.create_stock(NewStockRecord {
            product_id,
            sku,
            location_id,
            initial_quantity: 0,
            settings: StockSettings::default(),
        });
        match created {
            Ok(record) => Ok(record),
            // Lost a creation race; the other writer's record is the one to use.
            Err(ServiceError::Domain(DomainError::Conflict(_))) => {
                self.get_stock_at(product_id, location_id)
            }
            Err(e) => Err(e),
        }
    }

    /// Debit `source_id` for a transfer towards `destination_id`.
    ///
    /// Validated exactly like `transfer_out` against the current destination
    /// record. Re-running for the same transfer is a no-op; the flag reports
    /// whether this call took the stock.
    #[instrument(skip(self))]
    pub fn debit_for_transfer(
        &self,
        transfer_id: TransferId,
        source_id: StockRecordId,
        destination_id: StockRecordId,
        amount: i32,
    ) -> ServiceResult<(StockRecord, bool)> {
        ensure_positive(amount)?;
        // Only the destination's identity is checked, and that never changes.
        let destination = self.get_stock(destination_id)?;
        let now = self.clock.now();
        let (record, applied) = self.guard.mutate(&self.store, "debit_for_transfer", &source_id, |source: &mut StockRecord| {
            let applied = source.debit_for_transfer(transfer_id, amount, &destination)?;
            source.touch(now);
            Ok(applied)
        })?;
        if applied {
            info!(stock_id = %source_id, %transfer_id, amount, "source debited for transfer");
        }
        Ok((record, applied))
    }

    /// Credit the destination side of a transfer. Re-running is a no-op.
    #[instrument(skip(self))]
    pub fn credit_for_transfer(
        &self,
        transfer_id: TransferId,
        destination_id: StockRecordId,
        amount: i32,
    ) -> ServiceResult<StockRecord> {
        ensure_positive(amount)?;
        let now = self.clock.now();
        let (record, applied) = self.guard.mutate(&self.store, "credit_for_transfer", &destination_id, |dest: &mut StockRecord| {
            let applied = dest.credit_for_transfer(transfer_id, amount)?;
            dest.touch(now);
            Ok(applied)
        })?;
        if applied {
            info!(stock_id = %destination_id, %transfer_id, amount, "destination credited for transfer");
        }
        Ok(record)
    }

    /// Compensating action: give back a transfer debit. Re-running is a no-op.
    #[instrument(skip(self))]
    pub fn revert_transfer_debit(
        &self,
        transfer_id: TransferId,
        source_id: StockRecordId,
        amount: i32,
    ) -> ServiceResult<StockRecord> {
        ensure_positive(amount)?;
        let now = self.clock.now();
        let (record, applied) = self.guard.mutate(&self.store, "revert_transfer_debit", &source_id, |source: &mut StockRecord| {
            let applied = source.revert_transfer_debit(transfer_id, amount)?;
            source.touch(now);
            Ok(applied)
        })?;
        if applied {
            info!(stock_id = %source_id, %transfer_id, amount, "transfer debit reverted");
        }
        Ok(record)
    }

    fn apply(
        &self,
        operation: &'static str,
        id: StockRecordId,
        amount: i32,
        op: impl Fn(&mut StockRecord) -> Result<(), DomainError>,
    ) -> ServiceResult<StockRecord> {
        // Reject bad input before it ever reaches the store.
        ensure_positive(amount)?;
        let now = self.clock.now();
        let (record, ()) = self.guard.mutate(&self.store, operation, &id, |r: &mut StockRecord| {
            op(r)?;
            r.touch(now);
            Ok(())
        })?;
        info!(
            stock_id = %id,
            operation,
            amount,
            quantity = record.quantity(),
            reserved = record.reserved(),
            "stock record updated"
        );
        Ok(record)
    }

    fn find(&self, query: StockQuery) -> ServiceResult<Vec<StockRecord>> {
        self.store
            .find(&query)
            .map_err(|e| ServiceError::from_store("find_stock", "stock", e))
    }

    fn find_one(&self, query: StockQuery) -> ServiceResult<StockRecord> {
        self.find(query)?
            .into_iter()
            .next()
            .ok_or_else(|| DomainError::NotFound.into())
    }
}

fn ensure_positive(amount: i32) -> Result<(), DomainError> {
    if amount <= 0 {
        return Err(DomainError::invalid("amount must be positive"));
    }
    Ok(())
}
