//! Transfer coordinator.
//!
//! Moves stock between two locations as a saga over two stock records and the
//! transfer itself:
//!
//! 1. re-check source availability (cancel on shortfall)
//! 2. ensure the destination record exists
//! 3. debit the source through the ledger
//! 4. mark the transfer `SourceDebited`
//! 5. credit the destination through the ledger
//! 6. mark the transfer `Completed`
//!
//! A failure at step 5 compensates the debit and clears the marker. A failure
//! at step 4 compensates only a debit no other completion has claimed. A
//! transfer left in `SourceDebited` (crash, failed compensation) shows up in
//! [`TransferCoordinator::list_pending_settlements`] and is finished by
//! [`TransferCoordinator::resume_settlement`]. Ledger legs are idempotent per
//! transfer, so neither path can move the same stock twice.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::{error, info, instrument, warn};

use stockroom_core::{
    Clock, DomainError, DomainResult, LocationId, Page, ProductId, StockRecordId, TransferId,
};
use stockroom_inventory::{
    Location, LocationKind, LocationQuery, NewTransfer, Settlement, StockRecord, Transfer,
    TransferLeg, TransferQuery,
};

use crate::config::StockroomConfig;
use crate::error::{ServiceError, ServiceResult};
use crate::ledger::InventoryLedger;
use crate::store::{RecordStore, StoreError};
use crate::version_guard::VersionGuard;

const SHORTFALL_REASON: &str = "insufficient stock at completion";

pub struct TransferCoordinator<S, T, L> {
    ledger: Arc<InventoryLedger<S>>,
    transfers: T,
    locations: L,
    clock: Arc<dyn Clock>,
    guard: VersionGuard,
    config: StockroomConfig,
}

impl<S, T, L> TransferCoordinator<S, T, L>
where
    S: RecordStore<StockRecord>,
    T: RecordStore<Transfer>,
    L: RecordStore<Location>,
{
    pub fn new(
        ledger: Arc<InventoryLedger<S>>,
        transfers: T,
        locations: L,
        clock: Arc<dyn Clock>,
        config: StockroomConfig,
    ) -> Self {
        Self {
            ledger,
            transfers,
            locations,
            clock,
            guard: VersionGuard::new(config.max_cas_attempts),
            config,
        }
    }

    pub fn ledger(&self) -> &Arc<InventoryLedger<S>> {
        &self.ledger
    }

    // ---- locations ----

    #[instrument(skip(self))]
    pub fn register_location(
        &self,
        code: &str,
        name: &str,
        kind: LocationKind,
    ) -> ServiceResult<Location> {
        let location = Location::register(code, name, kind, self.clock.now())?;
        let id = location.id_typed();
        self.locations
            .create(location.clone())
            .map_err(|e| ServiceError::from_store("register_location", id, e))?;
        info!(location_id = %id, code = location.code(), "location registered");
        Ok(location)
    }

    pub fn get_location(&self, id: LocationId) -> ServiceResult<Location> {
        self.locations
            .get(&id)
            .map_err(|e| ServiceError::from_store("get_location", id, e))
    }

    pub fn list_locations(&self, query: &LocationQuery, page: Page) -> ServiceResult<Vec<Location>> {
        self.locations
            .list(query, self.config.page(page))
            .map_err(|e| ServiceError::from_store("list_locations", "locations", e))
    }

    #[instrument(skip(self))]
    pub fn deactivate_location(&self, id: LocationId) -> ServiceResult<Location> {
        let now = self.clock.now();
        let (location, ()) = self.guard.mutate(&self.locations, "deactivate_location", &id, |l: &mut Location| {
            l.deactivate(now);
            Ok(())
        })?;
        info!(location_id = %id, "location deactivated");
        Ok(location)
    }

    #[instrument(skip(self))]
    pub fn activate_location(&self, id: LocationId) -> ServiceResult<Location> {
        let now = self.clock.now();
        let (location, ()) = self.guard.mutate(&self.locations, "activate_location", &id, |l: &mut Location| {
            l.activate(now);
            Ok(())
        })?;
        info!(location_id = %id, "location activated");
        Ok(location)
    }

    // ---- transfers ----

    /// Validate and record a transfer request.
    ///
    /// Availability is only checked here, not reserved; completion checks again.
    #[instrument(skip(self, input), fields(product_id = %input.product_id, quantity = input.quantity))]
    pub fn request_transfer(&self, input: NewTransfer) -> ServiceResult<Transfer> {
        let transfer = Transfer::request(input, self.clock.now())?;
        self.ensure_location_active(transfer.source_location_id())?;
        self.ensure_location_active(transfer.destination_location_id())?;

        let item = transfer.primary_item()?;
        let available = self
            .find_stock(item.product_id, transfer.source_location_id())?
            .map_or(0, |r| r.available());
        if available < item.quantity {
            return Err(DomainError::InsufficientStock {
                requested: item.quantity,
                available,
            }
            .into());
        }

        let id = transfer.id_typed();
        self.transfers
            .create(transfer.clone())
            .map_err(|e| ServiceError::from_store("request_transfer", id, e))?;
        info!(transfer_id = %id, "transfer requested");
        Ok(transfer)
    }

    #[instrument(skip(self))]
    pub fn approve_transfer(
        &self,
        id: TransferId,
        approved_by: &str,
        estimated_arrival: Option<DateTime<Utc>>,
    ) -> ServiceResult<Transfer> {
        let now = self.clock.now();
        let transfer = self.update_transfer("approve_transfer", id, |t| {
            t.approve(approved_by, estimated_arrival, now)
        })?;
        info!(transfer_id = %id, "transfer approved");
        Ok(transfer)
    }

    #[instrument(skip(self))]
    pub fn ship_transfer(&self, id: TransferId) -> ServiceResult<Transfer> {
        let now = self.clock.now();
        let transfer = self.update_transfer("ship_transfer", id, |t| t.ship(now))?;
        info!(transfer_id = %id, "transfer shipped");
        Ok(transfer)
    }

    #[instrument(skip(self))]
    pub fn cancel_transfer(&self, id: TransferId, reason: Option<String>) -> ServiceResult<Transfer> {
        self.ensure_not_in_flight(id, "cancel")?;
        let now = self.clock.now();
        let transfer = self.update_transfer("cancel_transfer", id, |t| t.cancel(reason.clone(), now))?;
        info!(transfer_id = %id, "transfer cancelled");
        Ok(transfer)
    }

    #[instrument(skip(self))]
    pub fn reject_transfer(
        &self,
        id: TransferId,
        rejected_by: &str,
        reason: Option<String>,
    ) -> ServiceResult<Transfer> {
        if rejected_by.trim().is_empty() {
            return Err(DomainError::invalid("rejected_by cannot be empty").into());
        }
        self.ensure_not_in_flight(id, "reject")?;
        let now = self.clock.now();
        let transfer = self.update_transfer("reject_transfer", id, |t| {
            t.reject(rejected_by, reason.clone(), now)
        })?;
        info!(transfer_id = %id, "transfer rejected");
        Ok(transfer)
    }

    pub fn get_transfer(&self, id: TransferId) -> ServiceResult<Transfer> {
        self.transfers
            .get(&id)
            .map_err(|e| ServiceError::from_store("get_transfer", id, e))
    }

    pub fn list_transfers(&self, query: &TransferQuery, page: Page) -> ServiceResult<Vec<Transfer>> {
        self.transfers
            .list(query, self.config.page(page))
            .map_err(|e| ServiceError::from_store("list_transfers", "transfers", e))
    }

    /// Transfers whose source was debited but whose completion was never recorded.
    pub fn list_pending_settlements(&self, page: Page) -> ServiceResult<Vec<Transfer>> {
        self.list_transfers(&TransferQuery::pending_settlement(), page)
    }

    /// Move the stock and finish the transfer.
    #[instrument(skip(self))]
    pub fn complete_transfer(&self, id: TransferId, received_by: &str) -> ServiceResult<Transfer> {
        if received_by.trim().is_empty() {
            return Err(DomainError::invalid("received_by cannot be empty").into());
        }

        let transfer = self.get_transfer(id)?;
        transfer.ensure_completable()?;
        let item = transfer.primary_item()?.clone();

        // 1. The source may already carry our debit if an earlier attempt
        //    stopped before the marker was written; skip straight past it.
        let source = self.find_stock(item.product_id, transfer.source_location_id())?;
        let resumed = source
            .as_ref()
            .is_some_and(|s| s.has_transfer_leg(TransferLeg::Debited(id)));
        let source = match source {
            Some(s) if resumed || s.available() >= item.quantity => s,
            other => {
                let available = other.map_or(0, |s| s.available());
                return Err(self.cancel_for_shortfall(id, item.quantity, available));
            }
        };
        let source_id = source.id_typed();

        // 2.
        let destination = self.ledger.ensure_stock(
            item.product_id,
            item.sku.clone(),
            transfer.destination_location_id(),
        )?;
        let destination_id = destination.id_typed();

        // 3.
        let debit_applied = match self
            .ledger
            .debit_for_transfer(id, source_id, destination_id, item.quantity)
        {
            Ok((_, applied)) => applied,
            Err(ServiceError::Domain(DomainError::InsufficientStock { available, .. })) => {
                return Err(self.cancel_for_shortfall(id, item.quantity, available));
            }
            Err(err) => return Err(err),
        };

        // 4.
        let now = self.clock.now();
        if let Err(err) = self.update_transfer("mark_source_debited", id, |t| t.mark_source_debited(now)) {
            self.release_unmarked_debit(id, source_id, item.quantity, debit_applied);
            return Err(err);
        }

        // 5.
        if let Err(err) = self
            .ledger
            .credit_for_transfer(id, destination_id, item.quantity)
        {
            self.compensate(id, source_id, item.quantity, true);
            return Err(err);
        }

        // 6. Stock has fully moved; a failure here is finished by resume_settlement.
        let now = self.clock.now();
        match self.update_transfer("complete_transfer", id, |t| t.complete(received_by, now)) {
            Ok(completed) => {
                info!(
                    transfer_id = %id,
                    source_stock_id = %source_id,
                    destination_stock_id = %destination_id,
                    amount = item.quantity,
                    "transfer completed"
                );
                Ok(completed)
            }
            Err(err) => {
                error!(transfer_id = %id, error = %err, "stock moved but completion not recorded; pending settlement");
                Err(err)
            }
        }
    }

    /// Finish a transfer stuck in `SourceDebited`.
    ///
    /// Reconciles from the ledger legs: a credited destination only needs the
    /// completion recorded; a debited source needs the credit first; a source
    /// whose debit was already compensated gets its marker cleared and goes
    /// through completion again.
    #[instrument(skip(self))]
    pub fn resume_settlement(&self, id: TransferId, received_by: &str) -> ServiceResult<Transfer> {
        if received_by.trim().is_empty() {
            return Err(DomainError::invalid("received_by cannot be empty").into());
        }

        let transfer = self.get_transfer(id)?;
        if transfer.settlement() != Settlement::SourceDebited {
            return Err(DomainError::invalid_transfer_state(transfer.status(), "resume").into());
        }
        let item = transfer.primary_item()?.clone();

        let debited = self
            .find_stock(item.product_id, transfer.source_location_id())?
            .is_some_and(|s| s.has_transfer_leg(TransferLeg::Debited(id)));
        let destination = self.find_stock(item.product_id, transfer.destination_location_id())?;
        let credited = destination
            .as_ref()
            .is_some_and(|d| d.has_transfer_leg(TransferLeg::Credited(id)));

        if !credited {
            if !debited {
                let now = self.clock.now();
                self.update_transfer("reset_settlement", id, |t| t.reset_settlement(now))?;
                info!(transfer_id = %id, "debit was already compensated; retrying completion");
                return self.complete_transfer(id, received_by);
            }

            let destination = match destination {
                Some(d) => d,
                None => self.ledger.ensure_stock(
                    item.product_id,
                    item.sku.clone(),
                    transfer.destination_location_id(),
                )?,
            };
            self.ledger
                .credit_for_transfer(id, destination.id_typed(), item.quantity)?;
        }

        let now = self.clock.now();
        let completed = self.update_transfer("complete_transfer", id, |t| t.complete(received_by, now))?;
        info!(transfer_id = %id, "pending settlement resumed and completed");
        Ok(completed)
    }

    fn update_transfer(
        &self,
        operation: &'static str,
        id: TransferId,
        mut change: impl FnMut(&mut Transfer) -> DomainResult<()>,
    ) -> ServiceResult<Transfer> {
        let (transfer, ()) = self
            .guard
            .mutate(&self.transfers, operation, &id, |t: &mut Transfer| change(t))?;
        Ok(transfer)
    }

    /// Settle the debit after this call failed to write the marker.
    ///
    /// A completion that holds the marker owns the debit, even one this call
    /// took. Without a marker the debit goes back if this call took it or the
    /// transfer has ended; an earlier attempt's debit on a live transfer is
    /// left for the next completion to pick up.
    fn release_unmarked_debit(&self, id: TransferId, source_id: StockRecordId, amount: i32, applied: bool) {
        match self.get_transfer(id) {
            Ok(current)
                if current.settlement() == Settlement::Pending
                    && (applied || current.status().is_terminal()) =>
            {
                self.compensate(id, source_id, amount, false);
            }
            Ok(current) => {
                info!(
                    transfer_id = %id,
                    settlement = ?current.settlement(),
                    applied,
                    "marker not written; debit left in place"
                );
            }
            Err(err) => {
                error!(
                    transfer_id = %id,
                    stock_id = %source_id,
                    error = %err,
                    "marker not written and transfer unreadable; debit left for the next completion"
                );
            }
        }
    }

    /// Give the source its stock back after a failed step 4 or 5.
    fn compensate(&self, id: TransferId, source_id: StockRecordId, amount: i32, marker_set: bool) {
        match self.ledger.revert_transfer_debit(id, source_id, amount) {
            Ok(_) => {
                warn!(transfer_id = %id, stock_id = %source_id, amount, "transfer debit compensated");
                if marker_set {
                    let now = self.clock.now();
                    if let Err(err) = self.update_transfer("reset_settlement", id, |t| t.reset_settlement(now)) {
                        error!(transfer_id = %id, error = %err, "failed to clear settlement marker after compensation");
                    }
                }
            }
            Err(err) => {
                error!(
                    transfer_id = %id,
                    stock_id = %source_id,
                    amount,
                    error = %err,
                    "compensation failed; source remains debited"
                );
            }
        }
    }

    fn cancel_for_shortfall(&self, id: TransferId, requested: i32, available: i32) -> ServiceError {
        let now = self.clock.now();
        if let Err(err) = self.update_transfer("cancel_transfer", id, |t| {
            t.cancel(Some(SHORTFALL_REASON.to_string()), now)
        }) {
            return err;
        }
        warn!(transfer_id = %id, requested, available, "transfer cancelled for insufficient stock");
        DomainError::InsufficientStock { requested, available }.into()
    }

    /// Reject aborting a transfer whose debit reached the source ledger even
    /// though the marker never did.
    fn ensure_not_in_flight(&self, id: TransferId, action: &str) -> ServiceResult<()> {
        let transfer = self.get_transfer(id)?;
        if transfer.status().is_terminal() {
            return Ok(());
        }
        let item = transfer.primary_item()?;
        let debited = self
            .find_stock(item.product_id, transfer.source_location_id())?
            .is_some_and(|s| s.has_transfer_leg(TransferLeg::Debited(id)));
        if debited {
            return Err(DomainError::invalid_transfer_state("settlement in progress", action).into());
        }
        Ok(())
    }

    fn ensure_location_active(&self, id: LocationId) -> ServiceResult<()> {
        match self.locations.get(&id) {
            Ok(location) => Ok(location.ensure_active()?),
            Err(StoreError::NotFound(_)) => Err(DomainError::LocationInactive(id.to_string()).into()),
            Err(e) => Err(ServiceError::from_store("get_location", id, e)),
        }
    }

    fn find_stock(&self, product_id: ProductId, location_id: LocationId) -> ServiceResult<Option<StockRecord>> {
        match self.ledger.get_stock_at(product_id, location_id) {
            Ok(record) => Ok(Some(record)),
            Err(ServiceError::Domain(DomainError::NotFound)) => Ok(None),
            Err(e) => Err(e),
        }
    }
}
