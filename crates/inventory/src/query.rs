//! Typed filters for stock and transfer listings.

use serde::{Deserialize, Serialize};

use stockroom_core::{LocationId, ProductId, Query, Sku};

use crate::stock::StockRecord;
use crate::transfer::{Settlement, Transfer, TransferStatus};

/// Stock listing / secondary-key lookup filter. All set predicates must hold.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StockQuery {
    pub location_id: Option<LocationId>,
    pub product_id: Option<ProductId>,
    pub sku: Option<Sku>,
    /// Only records at or below their reorder point.
    #[serde(default)]
    pub low_stock_only: bool,
}

impl StockQuery {
    pub fn by_product(product_id: ProductId) -> Self {
        Self {
            product_id: Some(product_id),
            ..Self::default()
        }
    }

    pub fn by_sku(sku: Sku) -> Self {
        Self {
            sku: Some(sku),
            ..Self::default()
        }
    }

    pub fn at_location(mut self, location_id: LocationId) -> Self {
        self.location_id = Some(location_id);
        self
    }

    pub fn low_stock(mut self) -> Self {
        self.low_stock_only = true;
        self
    }
}

impl Query<StockRecord> for StockQuery {
    fn matches(&self, record: &StockRecord) -> bool {
        self.location_id.is_none_or(|l| l == record.location_id())
            && self.product_id.is_none_or(|p| p == record.product_id())
            && self.sku.as_ref().is_none_or(|s| s == record.sku())
            && (!self.low_stock_only || record.needs_reorder())
    }
}

/// Which side of a transfer a location filter applies to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LocationRole {
    Source,
    Destination,
    #[default]
    Either,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransferQuery {
    pub status: Option<TransferStatus>,
    pub location_id: Option<LocationId>,
    #[serde(default)]
    pub location_role: LocationRole,
    pub product_id: Option<ProductId>,
    pub settlement: Option<Settlement>,
}

impl TransferQuery {
    pub fn with_status(status: TransferStatus) -> Self {
        Self {
            status: Some(status),
            ..Self::default()
        }
    }

    pub fn from_location(location_id: LocationId) -> Self {
        Self {
            location_id: Some(location_id),
            location_role: LocationRole::Source,
            ..Self::default()
        }
    }

    pub fn to_location(location_id: LocationId) -> Self {
        Self {
            location_id: Some(location_id),
            location_role: LocationRole::Destination,
            ..Self::default()
        }
    }

    pub fn for_product(product_id: ProductId) -> Self {
        Self {
            product_id: Some(product_id),
            ..Self::default()
        }
    }

    /// Transfers whose source was debited but whose destination was never credited.
    pub fn pending_settlement() -> Self {
        Self {
            settlement: Some(Settlement::SourceDebited),
            ..Self::default()
        }
    }
}

impl Query<Transfer> for TransferQuery {
    fn matches(&self, transfer: &Transfer) -> bool {
        let location_ok = match self.location_id {
            None => true,
            Some(loc) => match self.location_role {
                LocationRole::Source => transfer.source_location_id() == loc,
                LocationRole::Destination => transfer.destination_location_id() == loc,
                LocationRole::Either => transfer.involves_location(loc),
            },
        };

        location_ok
            && self.status.is_none_or(|s| s == transfer.status())
            && self.product_id.is_none_or(|p| transfer.involves_product(p))
            && self.settlement.is_none_or(|s| s == transfer.settlement())
    }
}
