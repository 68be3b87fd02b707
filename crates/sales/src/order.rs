use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use stockroom_core::{
    CustomerId, DomainError, DomainResult, Entity, OrderId, ProductId, Query, Sku, Versioned,
};

/// Order status lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OrderStatus {
    Pending,
    Confirmed,
    Shipped,
    Delivered,
    Cancelled,
}

impl OrderStatus {
    pub fn is_terminal(self) -> bool {
        matches!(self, OrderStatus::Delivered | OrderStatus::Cancelled)
    }

    pub fn can_transition_to(self, next: OrderStatus) -> bool {
        use OrderStatus::*;
        matches!(
            (self, next),
            (Pending, Confirmed)
                | (Pending, Cancelled)
                | (Confirmed, Shipped)
                | (Confirmed, Cancelled)
                | (Shipped, Delivered)
        )
    }

    pub fn as_str(self) -> &'static str {
        match self {
            OrderStatus::Pending => "pending",
            OrderStatus::Confirmed => "confirmed",
            OrderStatus::Shipped => "shipped",
            OrderStatus::Delivered => "delivered",
            OrderStatus::Cancelled => "cancelled",
        }
    }
}

impl core::fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl core::str::FromStr for OrderStatus {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "pending" => Ok(OrderStatus::Pending),
            "confirmed" => Ok(OrderStatus::Confirmed),
            "shipped" => Ok(OrderStatus::Shipped),
            "delivered" => Ok(OrderStatus::Delivered),
            "cancelled" => Ok(OrderStatus::Cancelled),
            other => Err(DomainError::invalid(format!("unknown order status: {other}"))),
        }
    }
}

/// Order line: product, quantity, unit price.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderLine {
    pub product_id: ProductId,
    pub sku: Sku,
    pub quantity: i32,
    /// Price in smallest currency unit (e.g., cents).
    pub unit_price: u64,
}

impl OrderLine {
    pub fn subtotal(&self) -> u64 {
        self.unit_price.saturating_mul(self.quantity.max(0) as u64)
    }
}

/// Input for placing an order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewOrder {
    pub customer_id: CustomerId,
    pub lines: Vec<OrderLine>,
    pub notes: Option<String>,
}

/// An order placed against stock; the reference versioned entity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Order {
    id: OrderId,
    customer_id: CustomerId,
    status: OrderStatus,
    lines: Vec<OrderLine>,
    notes: Option<String>,
    version: u64,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl Order {
    pub fn place(input: NewOrder, now: DateTime<Utc>) -> DomainResult<Self> {
        validate_lines(&input.lines)?;

        Ok(Self {
            id: OrderId::new(),
            customer_id: input.customer_id,
            status: OrderStatus::Pending,
            lines: input.lines,
            notes: input.notes,
            version: 1,
            created_at: now,
            updated_at: now,
        })
    }

    pub fn id_typed(&self) -> OrderId {
        self.id
    }

    pub fn customer_id(&self) -> CustomerId {
        self.customer_id
    }

    pub fn status(&self) -> OrderStatus {
        self.status
    }

    pub fn lines(&self) -> &[OrderLine] {
        &self.lines
    }

    pub fn notes(&self) -> Option<&str> {
        self.notes.as_deref()
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }

    /// Sum of line subtotals, in minor currency units.
    pub fn total(&self) -> u64 {
        self.lines
            .iter()
            .fold(0u64, |acc, l| acc.saturating_add(l.subtotal()))
    }

    pub fn is_modifiable(&self) -> bool {
        matches!(self.status, OrderStatus::Pending)
    }

    /// Replace lines and notes. Only pending orders can be edited.
    pub fn revise(
        &mut self,
        lines: Vec<OrderLine>,
        notes: Option<String>,
        now: DateTime<Utc>,
    ) -> DomainResult<()> {
        if !self.is_modifiable() {
            return Err(DomainError::invalid(format!(
                "cannot modify an order in status {}",
                self.status
            )));
        }
        validate_lines(&lines)?;
        self.lines = lines;
        self.notes = notes;
        self.updated_at = now;
        Ok(())
    }

    pub fn transition_to(&mut self, next: OrderStatus, now: DateTime<Utc>) -> DomainResult<()> {
        if self.status.is_terminal() {
            return Err(DomainError::already_terminal(self.status));
        }
        if !self.status.can_transition_to(next) {
            return Err(DomainError::invalid(format!(
                "cannot move order from {} to {}",
                self.status, next
            )));
        }
        self.status = next;
        self.updated_at = now;
        Ok(())
    }
}

fn validate_lines(lines: &[OrderLine]) -> DomainResult<()> {
    if lines.is_empty() {
        return Err(DomainError::invalid("order must have at least one line"));
    }
    for (idx, line) in lines.iter().enumerate() {
        if line.quantity <= 0 {
            return Err(DomainError::invalid(format!(
                "line {idx}: quantity must be positive"
            )));
        }
        if line.unit_price == 0 {
            return Err(DomainError::invalid(format!(
                "line {idx}: unit_price must be positive"
            )));
        }
    }
    Ok(())
}

impl Entity for Order {
    type Id = OrderId;

    fn id(&self) -> &Self::Id {
        &self.id
    }
}

impl Versioned for Order {
    fn version(&self) -> u64 {
        self.version
    }

    fn set_version(&mut self, version: u64) {
        self.version = version;
    }
}

/// Order listing filter.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderQuery {
    pub customer_id: Option<CustomerId>,
    pub status: Option<OrderStatus>,
}

impl Query<Order> for OrderQuery {
    fn matches(&self, order: &Order) -> bool {
        self.customer_id.is_none_or(|c| c == order.customer_id)
            && self.status.is_none_or(|s| s == order.status)
    }
}
