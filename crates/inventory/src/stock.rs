//! Stock records and the inventory ledger operations on them.
//!
//! Every operation here is a pure precondition/postcondition pair on a single
//! in-memory record. A failing operation never touches state, so
//! `0 <= reserved <= quantity` holds after every call. Atomicity against
//! concurrent writers is the persistence layer's job (versioned writes).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use stockroom_core::{
    DomainError, DomainResult, Entity, LocationId, ProductId, Sku, StockRecordId, TransferId,
    Versioned,
};

/// Number of recent transfer legs remembered per record.
pub const TRANSFER_JOURNAL_LIMIT: usize = 64;

/// One side of a transfer's stock movement applied to a record.
///
/// Records remember recently applied legs so that resuming or compensating an
/// interrupted transfer never applies the same leg twice.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "leg", content = "transfer_id", rename_all = "snake_case")]
pub enum TransferLeg {
    Debited(TransferId),
    Credited(TransferId),
}

/// Optional tuning values and placement hints for a stock record.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StockSettings {
    pub reorder_point: Option<i32>,
    pub reorder_quantity: Option<i32>,
    pub minimum_stock: Option<i32>,
    pub maximum_stock: Option<i32>,
    pub shelf_location: Option<String>,
}

impl StockSettings {
    pub fn validate(&self) -> DomainResult<()> {
        let fields = [
            ("reorder_point", self.reorder_point),
            ("reorder_quantity", self.reorder_quantity),
            ("minimum_stock", self.minimum_stock),
            ("maximum_stock", self.maximum_stock),
        ];
        for (name, value) in fields {
            if matches!(value, Some(v) if v < 0) {
                return Err(DomainError::invalid(format!("{name} cannot be negative")));
            }
        }
        if let (Some(min), Some(max)) = (self.minimum_stock, self.maximum_stock) {
            if min > max {
                return Err(DomainError::invalid(
                    "minimum_stock cannot exceed maximum_stock",
                ));
            }
        }
        Ok(())
    }
}

/// Input for registering stock of a product at a location.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewStockRecord {
    pub product_id: ProductId,
    pub sku: Sku,
    pub location_id: LocationId,
    pub initial_quantity: i32,
    #[serde(default)]
    pub settings: StockSettings,
}

/// One product's stock at one location.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StockRecord {
    id: StockRecordId,
    product_id: ProductId,
    sku: Sku,
    location_id: LocationId,
    quantity: i32,
    reserved: i32,
    settings: StockSettings,
    #[serde(default)]
    transfer_journal: Vec<TransferLeg>,
    version: u64,
    created_at: DateTime<Utc>,
    last_updated: DateTime<Utc>,
}

impl StockRecord {
    pub fn create(input: NewStockRecord, now: DateTime<Utc>) -> DomainResult<Self> {
        Self::create_with_id(StockRecordId::new(), input, now)
    }

    pub fn create_with_id(
        id: StockRecordId,
        input: NewStockRecord,
        now: DateTime<Utc>,
    ) -> DomainResult<Self> {
        if input.initial_quantity < 0 {
            return Err(DomainError::invalid("initial quantity cannot be negative"));
        }
        input.settings.validate()?;

        Ok(Self {
            id,
            product_id: input.product_id,
            sku: input.sku,
            location_id: input.location_id,
            quantity: input.initial_quantity,
            reserved: 0,
            settings: input.settings,
            transfer_journal: Vec::new(),
            version: 1,
            created_at: now,
            last_updated: now,
        })
    }

    pub fn id_typed(&self) -> StockRecordId {
        self.id
    }

    pub fn product_id(&self) -> ProductId {
        self.product_id
    }

    pub fn sku(&self) -> &Sku {
        &self.sku
    }

    pub fn location_id(&self) -> LocationId {
        self.location_id
    }

    pub fn quantity(&self) -> i32 {
        self.quantity
    }

    pub fn reserved(&self) -> i32 {
        self.reserved
    }

    /// Sellable remainder: `quantity - reserved`.
    pub fn available(&self) -> i32 {
        self.quantity - self.reserved
    }

    pub fn settings(&self) -> &StockSettings {
        &self.settings
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn last_updated(&self) -> DateTime<Utc> {
        self.last_updated
    }

    /// `reorder_point > 0 && quantity <= reorder_point`.
    pub fn needs_reorder(&self) -> bool {
        matches!(self.settings.reorder_point, Some(point) if point > 0 && self.quantity <= point)
    }

    pub fn touch(&mut self, now: DateTime<Utc>) {
        self.last_updated = now;
    }

    /// Replace tuning values. Quantities are untouched.
    pub fn apply_settings(&mut self, settings: StockSettings) -> DomainResult<()> {
        settings.validate()?;
        self.settings = settings;
        Ok(())
    }

    pub fn add_stock(&mut self, amount: i32) -> DomainResult<()> {
        ensure_positive(amount)?;
        self.quantity = self
            .quantity
            .checked_add(amount)
            .ok_or_else(|| DomainError::invalid("quantity overflow"))?;
        Ok(())
    }

    /// Remove on-hand stock. No partial removal.
    pub fn remove_stock(&mut self, amount: i32) -> DomainResult<()> {
        ensure_positive(amount)?;
        if amount > self.quantity {
            return Err(DomainError::InsufficientStock {
                requested: amount,
                available: self.quantity,
            });
        }
        self.quantity -= amount;
        // Removing on-hand stock can cut into held units; keep the hold within bounds.
        self.reserved = self.reserved.min(self.quantity);
        Ok(())
    }

    pub fn reserve(&mut self, amount: i32) -> DomainResult<()> {
        ensure_positive(amount)?;
        let available = self.available();
        if amount > available {
            return Err(DomainError::InsufficientStock {
                requested: amount,
                available,
            });
        }
        self.reserved += amount;
        Ok(())
    }

    /// Release a hold. Over-release clamps `reserved` to zero instead of failing.
    pub fn release_reservation(&mut self, amount: i32) -> DomainResult<()> {
        ensure_positive(amount)?;
        self.reserved = (self.reserved - amount).max(0);
        Ok(())
    }

    /// Turn a hold into a permanent deduction.
    pub fn fulfill_reservation(&mut self, amount: i32) -> DomainResult<()> {
        ensure_positive(amount)?;
        if amount > self.reserved {
            return Err(DomainError::InsufficientReservation {
                requested: amount,
                reserved: self.reserved,
            });
        }
        self.reserved -= amount;
        self.quantity -= amount;
        Ok(())
    }

    /// Move `amount` of available stock from this record onto `destination`.
    ///
    /// Both records must hold the same product at different locations. On any
    /// failure neither record is modified.
    pub fn transfer_out(&mut self, amount: i32, destination: &mut StockRecord) -> DomainResult<()> {
        ensure_positive(amount)?;
        if destination.product_id != self.product_id {
            return Err(DomainError::invalid(
                "destination record holds a different product",
            ));
        }
        if destination.id == self.id || destination.location_id == self.location_id {
            return Err(DomainError::invalid(
                "source and destination must be different locations",
            ));
        }
        let available = self.available();
        if amount > available {
            return Err(DomainError::InsufficientStock {
                requested: amount,
                available,
            });
        }
        let credited = destination
            .quantity
            .checked_add(amount)
            .ok_or_else(|| DomainError::invalid("destination quantity overflow"))?;

        self.quantity -= amount;
        destination.quantity = credited;
        Ok(())
    }
}

impl StockRecord {
    pub fn has_transfer_leg(&self, leg: TransferLeg) -> bool {
        self.transfer_journal.contains(&leg)
    }

    /// Debit this record for `transfer_id`, validated against `destination`
    /// exactly like [`StockRecord::transfer_out`].
    ///
    /// Returns `false` without changing anything when this leg was already applied.
    pub fn debit_for_transfer(
        &mut self,
        transfer_id: TransferId,
        amount: i32,
        destination: &StockRecord,
    ) -> DomainResult<bool> {
        let leg = TransferLeg::Debited(transfer_id);
        if self.has_transfer_leg(leg) {
            return Ok(false);
        }
        let mut scratch = destination.clone();
        self.transfer_out(amount, &mut scratch)?;
        self.record_leg(leg);
        Ok(true)
    }

    /// Credit this record for `transfer_id`. Returns `false` if already credited.
    pub fn credit_for_transfer(&mut self, transfer_id: TransferId, amount: i32) -> DomainResult<bool> {
        let leg = TransferLeg::Credited(transfer_id);
        if self.has_transfer_leg(leg) {
            return Ok(false);
        }
        self.add_stock(amount)?;
        self.record_leg(leg);
        Ok(true)
    }

    /// Give back a debit taken for `transfer_id`. Returns `false` if there is
    /// no such debit to revert.
    pub fn revert_transfer_debit(&mut self, transfer_id: TransferId, amount: i32) -> DomainResult<bool> {
        let leg = TransferLeg::Debited(transfer_id);
        if !self.has_transfer_leg(leg) {
            return Ok(false);
        }
        self.add_stock(amount)?;
        self.transfer_journal.retain(|l| *l != leg);
        Ok(true)
    }

    fn record_leg(&mut self, leg: TransferLeg) {
        if self.transfer_journal.len() >= TRANSFER_JOURNAL_LIMIT {
            self.transfer_journal.remove(0);
        }
        self.transfer_journal.push(leg);
    }
}

fn ensure_positive(amount: i32) -> DomainResult<()> {
    if amount <= 0 {
        return Err(DomainError::invalid("amount must be positive"));
    }
    Ok(())
}

impl Entity for StockRecord {
    type Id = StockRecordId;

    fn id(&self) -> &Self::Id {
        &self.id
    }

    /// One record per product per location.
    fn unique_key(&self) -> Option<String> {
        Some(format!("{}@{}", self.product_id, self.location_id))
    }
}

impl Versioned for StockRecord {
    fn version(&self) -> u64 {
        self.version
    }

    fn set_version(&mut self, version: u64) {
        self.version = version;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(quantity: i32, reserved: i32) -> StockRecord {
        let mut r = StockRecord::create(
            NewStockRecord {
                product_id: ProductId::new(),
                sku: Sku::parse("SKU-1").unwrap(),
                location_id: LocationId::new(),
                initial_quantity: quantity,
                settings: StockSettings::default(),
            },
            Utc::now(),
        )
        .unwrap();
        if reserved > 0 {
            r.reserve(reserved).unwrap();
        }
        r
    }

    fn sibling(of: &StockRecord, quantity: i32) -> StockRecord {
        StockRecord::create(
            NewStockRecord {
                product_id: of.product_id(),
                sku: of.sku().clone(),
                location_id: LocationId::new(),
                initial_quantity: quantity,
                settings: StockSettings::default(),
            },
            Utc::now(),
        )
        .unwrap()
    }

    #[test]
    fn reserve_then_over_reserve_then_release() {
        let mut r = record(10, 0);

        r.reserve(7).unwrap();
        assert_eq!(r.reserved(), 7);
        assert_eq!(r.available(), 3);

        let before = r.clone();
        let err = r.reserve(5).unwrap_err();
        assert_eq!(
            err,
            DomainError::InsufficientStock {
                requested: 5,
                available: 3
            }
        );
        assert_eq!(r, before);

        r.release_reservation(7).unwrap();
        assert_eq!(r.reserved(), 0);
    }

    #[test]
    fn fulfill_deducts_quantity_and_reservation() {
        let mut r = record(10, 4);
        r.fulfill_reservation(4).unwrap();
        assert_eq!(r.quantity(), 6);
        assert_eq!(r.reserved(), 0);
    }

    #[test]
    fn fulfill_more_than_reserved_is_rejected() {
        let mut r = record(10, 2);
        let before = r.clone();
        let err = r.fulfill_reservation(3).unwrap_err();
        assert_eq!(
            err,
            DomainError::InsufficientReservation {
                requested: 3,
                reserved: 2
            }
        );
        assert_eq!(r, before);
    }

    #[test]
    fn remove_more_than_quantity_leaves_record_unchanged() {
        let mut r = record(5, 1);
        let before = r.clone();
        let err = r.remove_stock(6).unwrap_err();
        assert!(matches!(err, DomainError::InsufficientStock { requested: 6, available: 5 }));
        assert_eq!(r, before);
    }

    #[test]
    fn remove_into_reserved_units_keeps_invariant() {
        let mut r = record(10, 8);
        r.remove_stock(5).unwrap();
        assert_eq!(r.quantity(), 5);
        assert_eq!(r.reserved(), 5);
        assert_eq!(r.available(), 0);
    }

    // Documented current behavior, not an endorsement: a caller-side double
    // release is silently absorbed instead of being reported.
    #[test]
    fn over_release_clamps_reserved_to_zero() {
        let mut r = record(10, 3);
        r.release_reservation(5).unwrap();
        assert_eq!(r.reserved(), 0);
        assert_eq!(r.quantity(), 10);
    }

    #[test]
    fn non_positive_amounts_are_rejected_before_any_change() {
        let mut r = record(10, 2);
        let before = r.clone();
        for amount in [0, -1, i32::MIN] {
            assert!(matches!(r.add_stock(amount), Err(DomainError::InvalidArgument(_))));
            assert!(matches!(r.remove_stock(amount), Err(DomainError::InvalidArgument(_))));
            assert!(matches!(r.reserve(amount), Err(DomainError::InvalidArgument(_))));
            assert!(matches!(
                r.release_reservation(amount),
                Err(DomainError::InvalidArgument(_))
            ));
            assert!(matches!(
                r.fulfill_reservation(amount),
                Err(DomainError::InvalidArgument(_))
            ));
        }
        assert_eq!(r, before);
    }

    #[test]
    fn add_stock_overflow_is_rejected() {
        let mut r = record(i32::MAX - 1, 0);
        assert!(matches!(r.add_stock(5), Err(DomainError::InvalidArgument(_))));
        assert_eq!(r.quantity(), i32::MAX - 1);
    }

    #[test]
    fn transfer_out_moves_available_stock_only() {
        let mut source = record(20, 12);
        let mut dest = sibling(&source, 0);

        let err = source.transfer_out(9, &mut dest).unwrap_err();
        assert!(matches!(err, DomainError::InsufficientStock { requested: 9, available: 8 }));
        assert_eq!(dest.quantity(), 0);

        source.transfer_out(5, &mut dest).unwrap();
        assert_eq!(source.quantity(), 15);
        assert_eq!(source.reserved(), 12);
        assert_eq!(dest.quantity(), 5);
    }

    #[test]
    fn transfer_out_rejects_mismatched_product_and_same_location() {
        let mut source = record(20, 0);
        let mut other_product = record(0, 0);
        assert!(matches!(
            source.transfer_out(1, &mut other_product),
            Err(DomainError::InvalidArgument(_))
        ));

        let mut same = source.clone();
        assert!(matches!(
            source.transfer_out(1, &mut same),
            Err(DomainError::InvalidArgument(_))
        ));
        assert_eq!(source.quantity(), 20);
    }

    #[test]
    fn transfer_legs_apply_once() {
        let transfer_id = TransferId::new();
        let mut source = record(10, 0);
        let mut dest = sibling(&source, 0);

        assert!(source.debit_for_transfer(transfer_id, 4, &dest).unwrap());
        assert!(!source.debit_for_transfer(transfer_id, 4, &dest).unwrap());
        assert_eq!(source.quantity(), 6);
        assert_eq!(dest.quantity(), 0);

        assert!(dest.credit_for_transfer(transfer_id, 4).unwrap());
        assert!(!dest.credit_for_transfer(transfer_id, 4).unwrap());
        assert_eq!(dest.quantity(), 4);
        assert!(dest.has_transfer_leg(TransferLeg::Credited(transfer_id)));
    }

    #[test]
    fn revert_debit_is_idempotent() {
        let transfer_id = TransferId::new();
        let mut source = record(10, 0);
        let dest = sibling(&source, 0);

        assert!(!source.revert_transfer_debit(transfer_id, 4).unwrap());
        source.debit_for_transfer(transfer_id, 4, &dest).unwrap();
        assert!(source.revert_transfer_debit(transfer_id, 4).unwrap());
        assert!(!source.revert_transfer_debit(transfer_id, 4).unwrap());
        assert_eq!(source.quantity(), 10);
        assert!(!source.has_transfer_leg(TransferLeg::Debited(transfer_id)));
    }

    #[test]
    fn debit_for_transfer_respects_availability() {
        let mut source = record(10, 8);
        let dest = sibling(&source, 0);
        let before = source.clone();
        let err = source.debit_for_transfer(TransferId::new(), 3, &dest).unwrap_err();
        assert!(matches!(err, DomainError::InsufficientStock { requested: 3, available: 2 }));
        assert_eq!(source, before);
    }

    #[test]
    fn journal_is_bounded() {
        let mut dest = record(0, 0);
        for _ in 0..(TRANSFER_JOURNAL_LIMIT + 10) {
            dest.credit_for_transfer(TransferId::new(), 1).unwrap();
        }
        assert_eq!(dest.transfer_journal.len(), TRANSFER_JOURNAL_LIMIT);
        assert_eq!(dest.quantity(), (TRANSFER_JOURNAL_LIMIT + 10) as i32);
    }

    #[test]
    fn needs_reorder_requires_positive_point() {
        let mut r = record(5, 0);
        assert!(!r.needs_reorder());

        r.apply_settings(StockSettings {
            reorder_point: Some(5),
            ..StockSettings::default()
        })
        .unwrap();
        assert!(r.needs_reorder());

        r.add_stock(1).unwrap();
        assert!(!r.needs_reorder());

        r.apply_settings(StockSettings {
            reorder_point: Some(0),
            ..StockSettings::default()
        })
        .unwrap();
        assert!(!r.needs_reorder());
    }

    #[test]
    fn settings_validation() {
        let bad = StockSettings {
            minimum_stock: Some(10),
            maximum_stock: Some(5),
            ..StockSettings::default()
        };
        assert!(bad.validate().is_err());

        let negative = StockSettings {
            reorder_quantity: Some(-1),
            ..StockSettings::default()
        };
        assert!(negative.validate().is_err());
    }

    #[test]
    fn negative_initial_quantity_is_rejected() {
        let err = StockRecord::create(
            NewStockRecord {
                product_id: ProductId::new(),
                sku: Sku::parse("X").unwrap(),
                location_id: LocationId::new(),
                initial_quantity: -1,
                settings: StockSettings::default(),
            },
            Utc::now(),
        )
        .unwrap_err();
        assert!(matches!(err, DomainError::InvalidArgument(_)));
    }

    mod proptest_tests {
        use super::*;
        use proptest::prelude::*;

        #[derive(Debug, Clone)]
        enum Op {
            Add(i32),
            Remove(i32),
            Reserve(i32),
            Release(i32),
            Fulfill(i32),
        }

        fn op() -> impl Strategy<Value = Op> {
            prop_oneof![
                (-5i32..50).prop_map(Op::Add),
                (-5i32..50).prop_map(Op::Remove),
                (-5i32..50).prop_map(Op::Reserve),
                (-5i32..50).prop_map(Op::Release),
                (-5i32..50).prop_map(Op::Fulfill),
            ]
        }

        /// (quantity, held, x) with room left to reserve x.
        fn reservable() -> impl Strategy<Value = (i32, i32, i32)> {
            (1i32..1000)
                .prop_flat_map(|q| (Just(q), 0..q))
                .prop_flat_map(|(q, h)| (Just(q), Just(h), 1..=q - h))
        }

        proptest! {
            #![proptest_config(ProptestConfig {
                cases: 512,
                ..ProptestConfig::default()
            })]

            /// Property: no sequence of ledger operations breaks 0 <= reserved <= quantity,
            /// and failed operations leave the record untouched.
            #[test]
            fn reserved_stays_within_quantity(
                initial in 0i32..100,
                ops in prop::collection::vec(op(), 0..40)
            ) {
                let mut r = record(initial, 0);
                for op in ops {
                    let before = r.clone();
                    let result = match op {
                        Op::Add(n) => r.add_stock(n),
                        Op::Remove(n) => r.remove_stock(n),
                        Op::Reserve(n) => r.reserve(n),
                        Op::Release(n) => r.release_reservation(n),
                        Op::Fulfill(n) => r.fulfill_reservation(n),
                    };
                    if result.is_err() {
                        prop_assert_eq!(&r, &before);
                    }
                    prop_assert!(r.reserved() >= 0);
                    prop_assert!(r.reserved() <= r.quantity());
                    prop_assert!(r.available() >= 0);
                }
            }

            /// Property: reserve(x) then release(x) restores the reservation.
            #[test]
            fn reserve_release_round_trip((quantity, held, x) in reservable()) {
                let mut r = record(quantity, held);
                prop_assert!(x <= r.available());
                let reserved_before = r.reserved();
                r.reserve(x).unwrap();
                r.release_reservation(x).unwrap();
                prop_assert_eq!(r.reserved(), reserved_before);
                prop_assert_eq!(r.quantity(), quantity);
            }

            /// Property: reserve(x) then fulfill(x) keeps the hold and deducts x.
            #[test]
            fn reserve_fulfill_deducts_exactly((quantity, held, x) in reservable()) {
                let mut r = record(quantity, held);
                prop_assert!(x <= r.available());
                let reserved_before = r.reserved();
                r.reserve(x).unwrap();
                r.fulfill_reservation(x).unwrap();
                prop_assert_eq!(r.reserved(), reserved_before);
                prop_assert_eq!(r.quantity(), quantity - x);
            }

            /// Property: transfer_out conserves total quantity across both records.
            #[test]
            fn transfer_out_conserves_quantity(source_qty in 0i32..1000, dest_qty in 0i32..1000, q in 1i32..1000) {
                let mut source = record(source_qty, 0);
                let mut dest = sibling(&source, dest_qty);
                let total_before = source.quantity() + dest.quantity();
                match source.transfer_out(q, &mut dest) {
                    Ok(()) => {
                        prop_assert_eq!(source.quantity(), source_qty - q);
                        prop_assert_eq!(dest.quantity(), dest_qty + q);
                    }
                    Err(_) => {
                        prop_assert_eq!(source.quantity(), source_qty);
                        prop_assert_eq!(dest.quantity(), dest_qty);
                    }
                }
                prop_assert_eq!(source.quantity() + dest.quantity(), total_before);
            }
        }
    }
}
