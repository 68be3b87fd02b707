//! Transfer workflow: moving stock of one product between two locations.
//!
//! This module holds the pure state machine. Stock movement itself is done by
//! the ledger service; the transfer only records where in the workflow it is.
//!
//! ```text
//! Requested -> Approved -> (Shipped) -> Completed
//!     \            \           \
//!      +------------+-----------+--> Cancelled | Rejected
//! ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use stockroom_core::{
    DomainError, DomainResult, Entity, LocationId, ProductId, Sku, TransferId, Versioned,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransferStatus {
    Requested,
    Approved,
    Shipped,
    Completed,
    Cancelled,
    Rejected,
}

impl TransferStatus {
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            TransferStatus::Completed | TransferStatus::Cancelled | TransferStatus::Rejected
        )
    }

    pub fn as_str(self) -> &'static str {
        match self {
            TransferStatus::Requested => "requested",
            TransferStatus::Approved => "approved",
            TransferStatus::Shipped => "shipped",
            TransferStatus::Completed => "completed",
            TransferStatus::Cancelled => "cancelled",
            TransferStatus::Rejected => "rejected",
        }
    }
}

impl core::fmt::Display for TransferStatus {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl core::str::FromStr for TransferStatus {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "requested" => Ok(TransferStatus::Requested),
            "approved" => Ok(TransferStatus::Approved),
            "shipped" => Ok(TransferStatus::Shipped),
            "completed" => Ok(TransferStatus::Completed),
            "cancelled" => Ok(TransferStatus::Cancelled),
            "rejected" => Ok(TransferStatus::Rejected),
            other => Err(DomainError::invalid(format!("unknown transfer status: {other}"))),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ItemStatus {
    Pending,
    InTransit,
    Received,
    Cancelled,
}

/// Progress of the two-record stock movement behind a completion.
///
/// `SourceDebited` is persisted after the source record is debited and before
/// the destination is credited, so an interrupted completion can be found and
/// resumed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Settlement {
    #[default]
    Pending,
    SourceDebited,
    Settled,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransferItem {
    pub product_id: ProductId,
    pub sku: Sku,
    pub quantity: i32,
    pub status: ItemStatus,
}

/// Input for a new transfer request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewTransfer {
    pub product_id: ProductId,
    pub sku: Sku,
    pub source_location_id: LocationId,
    pub destination_location_id: LocationId,
    pub quantity: i32,
    pub requested_by: String,
    pub reason: Option<String>,
    pub notes: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transfer {
    id: TransferId,
    source_location_id: LocationId,
    destination_location_id: LocationId,
    items: Vec<TransferItem>,
    status: TransferStatus,
    settlement: Settlement,
    requested_by: String,
    approved_by: Option<String>,
    received_by: Option<String>,
    requested_at: DateTime<Utc>,
    approved_at: Option<DateTime<Utc>>,
    shipped_at: Option<DateTime<Utc>>,
    received_at: Option<DateTime<Utc>>,
    estimated_arrival: Option<DateTime<Utc>>,
    reason: Option<String>,
    notes: Option<String>,
    version: u64,
    updated_at: DateTime<Utc>,
}

impl Transfer {
    pub fn request(input: NewTransfer, now: DateTime<Utc>) -> DomainResult<Self> {
        if input.quantity <= 0 {
            return Err(DomainError::invalid("transfer quantity must be positive"));
        }
        if input.source_location_id == input.destination_location_id {
            return Err(DomainError::invalid(
                "source and destination locations must differ",
            ));
        }
        if input.requested_by.trim().is_empty() {
            return Err(DomainError::invalid("requested_by cannot be empty"));
        }

        Ok(Self {
            id: TransferId::new(),
            source_location_id: input.source_location_id,
            destination_location_id: input.destination_location_id,
            items: vec![TransferItem {
                product_id: input.product_id,
                sku: input.sku,
                quantity: input.quantity,
                status: ItemStatus::Pending,
            }],
            status: TransferStatus::Requested,
            settlement: Settlement::Pending,
            requested_by: input.requested_by,
            approved_by: None,
            received_by: None,
            requested_at: now,
            approved_at: None,
            shipped_at: None,
            received_at: None,
            estimated_arrival: None,
            reason: input.reason,
            notes: input.notes,
            version: 1,
            updated_at: now,
        })
    }

    pub fn id_typed(&self) -> TransferId {
        self.id
    }

    pub fn source_location_id(&self) -> LocationId {
        self.source_location_id
    }

    pub fn destination_location_id(&self) -> LocationId {
        self.destination_location_id
    }

    pub fn items(&self) -> &[TransferItem] {
        &self.items
    }

    /// The item being moved. Requests always carry exactly one; a record
    /// loaded without items is rejected rather than indexed.
    pub fn primary_item(&self) -> DomainResult<&TransferItem> {
        self.items
            .first()
            .ok_or_else(|| DomainError::invalid("transfer has no items"))
    }

    pub fn status(&self) -> TransferStatus {
        self.status
    }

    pub fn settlement(&self) -> Settlement {
        self.settlement
    }

    pub fn requested_by(&self) -> &str {
        &self.requested_by
    }

    pub fn approved_by(&self) -> Option<&str> {
        self.approved_by.as_deref()
    }

    pub fn received_by(&self) -> Option<&str> {
        self.received_by.as_deref()
    }

    pub fn requested_at(&self) -> DateTime<Utc> {
        self.requested_at
    }

    pub fn approved_at(&self) -> Option<DateTime<Utc>> {
        self.approved_at
    }

    pub fn shipped_at(&self) -> Option<DateTime<Utc>> {
        self.shipped_at
    }

    pub fn received_at(&self) -> Option<DateTime<Utc>> {
        self.received_at
    }

    pub fn estimated_arrival(&self) -> Option<DateTime<Utc>> {
        self.estimated_arrival
    }

    pub fn reason(&self) -> Option<&str> {
        self.reason.as_deref()
    }

    pub fn notes(&self) -> Option<&str> {
        self.notes.as_deref()
    }

    pub fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }

    pub fn involves_location(&self, location_id: LocationId) -> bool {
        self.source_location_id == location_id || self.destination_location_id == location_id
    }

    pub fn involves_product(&self, product_id: ProductId) -> bool {
        self.items.iter().any(|i| i.product_id == product_id)
    }

    pub fn approve(
        &mut self,
        approved_by: impl Into<String>,
        estimated_arrival: Option<DateTime<Utc>>,
        now: DateTime<Utc>,
    ) -> DomainResult<()> {
        if self.status != TransferStatus::Requested {
            return Err(DomainError::invalid_transfer_state(self.status, "approve"));
        }
        let approved_by = approved_by.into();
        if approved_by.trim().is_empty() {
            return Err(DomainError::invalid("approved_by cannot be empty"));
        }

        self.status = TransferStatus::Approved;
        self.approved_by = Some(approved_by);
        self.approved_at = Some(now);
        self.estimated_arrival = estimated_arrival;
        self.updated_at = now;
        Ok(())
    }

    pub fn ship(&mut self, now: DateTime<Utc>) -> DomainResult<()> {
        if self.status != TransferStatus::Approved {
            return Err(DomainError::invalid_transfer_state(self.status, "ship"));
        }

        self.status = TransferStatus::Shipped;
        self.shipped_at = Some(now);
        self.set_item_status(ItemStatus::InTransit);
        self.updated_at = now;
        Ok(())
    }

    /// Completion may start only from `Approved`/`Shipped` with nothing in flight.
    pub fn ensure_completable(&self) -> DomainResult<()> {
        if !matches!(
            self.status,
            TransferStatus::Approved | TransferStatus::Shipped
        ) {
            return Err(DomainError::invalid_transfer_state(self.status, "complete"));
        }
        if self.settlement != Settlement::Pending {
            return Err(DomainError::invalid_transfer_state(
                "settlement in progress",
                "complete",
            ));
        }
        Ok(())
    }

    pub fn mark_source_debited(&mut self, now: DateTime<Utc>) -> DomainResult<()> {
        self.ensure_completable()?;
        self.settlement = Settlement::SourceDebited;
        self.updated_at = now;
        Ok(())
    }

    /// Undo the in-flight marker after the source debit was compensated.
    pub fn reset_settlement(&mut self, now: DateTime<Utc>) -> DomainResult<()> {
        if self.settlement != Settlement::SourceDebited {
            return Err(DomainError::invalid_transfer_state(self.status, "reset settlement of"));
        }
        self.settlement = Settlement::Pending;
        self.updated_at = now;
        Ok(())
    }

    /// Finish a transfer whose stock has fully moved.
    pub fn complete(&mut self, received_by: impl Into<String>, now: DateTime<Utc>) -> DomainResult<()> {
        if !matches!(
            self.status,
            TransferStatus::Approved | TransferStatus::Shipped
        ) || self.settlement != Settlement::SourceDebited
        {
            return Err(DomainError::invalid_transfer_state(self.status, "complete"));
        }

        self.status = TransferStatus::Completed;
        self.settlement = Settlement::Settled;
        self.received_by = Some(received_by.into());
        self.received_at = Some(now);
        self.set_item_status(ItemStatus::Received);
        self.updated_at = now;
        Ok(())
    }

    pub fn cancel(&mut self, reason: Option<String>, now: DateTime<Utc>) -> DomainResult<()> {
        self.ensure_abortable("cancel")?;
        self.status = TransferStatus::Cancelled;
        if reason.is_some() {
            self.reason = reason;
        }
        self.set_item_status(ItemStatus::Cancelled);
        self.updated_at = now;
        Ok(())
    }

    pub fn reject(
        &mut self,
        rejected_by: impl Into<String>,
        reason: Option<String>,
        now: DateTime<Utc>,
    ) -> DomainResult<()> {
        self.ensure_abortable("reject")?;
        let rejected_by = rejected_by.into();
        self.status = TransferStatus::Rejected;
        self.reason = Some(match reason {
            Some(r) => format!("rejected by {rejected_by}: {r}"),
            None => format!("rejected by {rejected_by}"),
        });
        self.set_item_status(ItemStatus::Cancelled);
        self.updated_at = now;
        Ok(())
    }

    fn ensure_abortable(&self, action: &str) -> DomainResult<()> {
        if self.status.is_terminal() {
            return Err(DomainError::already_terminal(self.status));
        }
        if self.settlement == Settlement::SourceDebited {
            return Err(DomainError::invalid_transfer_state(
                "settlement in progress",
                action,
            ));
        }
        Ok(())
    }

    fn set_item_status(&mut self, status: ItemStatus) {
        for item in &mut self.items {
            item.status = status;
        }
    }
}

impl Entity for Transfer {
    type Id = TransferId;

    fn id(&self) -> &Self::Id {
        &self.id
    }
}

impl Versioned for Transfer {
    fn version(&self) -> u64 {
        self.version
    }

    fn set_version(&mut self, version: u64) {
        self.version = version;
    }
}
