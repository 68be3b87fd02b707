use chrono::{DateTime, Utc};
use serde::Deserialize;
use serde_json::{json, Value};

use stockroom_core::{Sku, Versioned};
use stockroom_inventory::{Location, LocationKind, StockRecord, StockSettings, Transfer};
use stockroom_sales::{Order, OrderLine};

use crate::app::errors;

// -------------------------
// Request DTOs
// -------------------------

#[derive(Debug, Deserialize)]
pub struct CreateLocationRequest {
    pub code: String,
    pub name: String,
    pub kind: LocationKind,
}

#[derive(Debug, Default, Deserialize)]
pub struct ListLocationsQuery {
    pub active_only: Option<bool>,
    pub kind: Option<LocationKind>,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

#[derive(Debug, Deserialize)]
pub struct CreateStockRequest {
    pub product_id: String,
    pub sku: String,
    pub location_id: String,
    #[serde(default)]
    pub initial_quantity: i32,
    #[serde(flatten)]
    pub settings: StockSettings,
}

#[derive(Debug, Deserialize)]
pub struct UpdateStockRequest {
    pub expected_version: u64,
    #[serde(flatten)]
    pub settings: StockSettings,
}

#[derive(Debug, Default, Deserialize)]
pub struct ListStockQuery {
    pub location_id: Option<String>,
    pub product_id: Option<String>,
    pub sku: Option<String>,
    pub low_stock_only: Option<bool>,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

#[derive(Debug, Deserialize)]
pub struct QuantityRequest {
    pub quantity: i32,
}

#[derive(Debug, Deserialize)]
pub struct CreateTransferRequest {
    pub product_id: String,
    pub sku: String,
    pub source_location_id: String,
    pub destination_location_id: String,
    pub quantity: i32,
    pub requested_by: String,
    pub reason: Option<String>,
    pub notes: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ApproveTransferRequest {
    pub approved_by: String,
    pub estimated_arrival: Option<DateTime<Utc>>,
}

#[derive(Debug, Deserialize)]
pub struct ReceiveTransferRequest {
    pub received_by: String,
}

#[derive(Debug, Default, Deserialize)]
pub struct CancelTransferRequest {
    pub reason: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct RejectTransferRequest {
    pub rejected_by: String,
    pub reason: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct ListTransfersQuery {
    pub status: Option<String>,
    pub location_id: Option<String>,
    pub product_id: Option<String>,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

#[derive(Debug, Default, Deserialize)]
pub struct PageQuery {
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

#[derive(Debug, Deserialize)]
pub struct OrderLineRequest {
    pub product_id: String,
    pub sku: String,
    pub quantity: i32,
    pub unit_price: u64,
}

#[derive(Debug, Deserialize)]
pub struct CreateOrderRequest {
    pub customer_id: String,
    pub lines: Vec<OrderLineRequest>,
    pub notes: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct UpdateOrderRequest {
    pub lines: Vec<OrderLineRequest>,
    pub notes: Option<String>,
    pub expected_version: u64,
}

#[derive(Debug, Deserialize)]
pub struct ChangeOrderStatusRequest {
    pub status: String,
    pub expected_version: Option<u64>,
}

#[derive(Debug, Default, Deserialize)]
pub struct ListOrdersQuery {
    pub customer_id: Option<String>,
    pub status: Option<String>,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

pub fn parse_sku(raw: &str) -> Result<Sku, axum::response::Response> {
    Sku::parse(raw).map_err(|e| errors::service_error_to_response(e.into()))
}

pub fn parse_lines(lines: Vec<OrderLineRequest>) -> Result<Vec<OrderLine>, axum::response::Response> {
    lines
        .into_iter()
        .map(|l| -> Result<OrderLine, axum::response::Response> {
            Ok(OrderLine {
                product_id: errors::parse_id(&l.product_id, "product_id")?,
                sku: parse_sku(&l.sku)?,
                quantity: l.quantity,
                unit_price: l.unit_price,
            })
        })
        .collect()
}

// -------------------------
// Response mapping
// -------------------------

pub fn location_to_json(l: &Location) -> Value {
    json!({
        "id": l.id_typed().to_string(),
        "code": l.code(),
        "name": l.name(),
        "kind": l.kind(),
        "active": l.is_active(),
        "version": l.version(),
        "updated_at": l.updated_at(),
    })
}

pub fn stock_to_json(r: &StockRecord) -> Value {
    json!({
        "id": r.id_typed().to_string(),
        "product_id": r.product_id().to_string(),
        "sku": r.sku().as_str(),
        "location_id": r.location_id().to_string(),
        "quantity": r.quantity(),
        "reserved": r.reserved(),
        "available": r.available(),
        "needs_reorder": r.needs_reorder(),
        "settings": r.settings(),
        "version": r.version(),
        "created_at": r.created_at(),
        "last_updated": r.last_updated(),
    })
}

pub fn transfer_to_json(t: &Transfer) -> Value {
    json!({
        "id": t.id_typed().to_string(),
        "source_location_id": t.source_location_id().to_string(),
        "destination_location_id": t.destination_location_id().to_string(),
        "items": t.items(),
        "status": t.status().as_str(),
        "settlement": t.settlement(),
        "requested_by": t.requested_by(),
        "approved_by": t.approved_by(),
        "received_by": t.received_by(),
        "requested_at": t.requested_at(),
        "approved_at": t.approved_at(),
        "shipped_at": t.shipped_at(),
        "received_at": t.received_at(),
        "estimated_arrival": t.estimated_arrival(),
        "reason": t.reason(),
        "notes": t.notes(),
        "version": t.version(),
    })
}

pub fn order_to_json(o: &Order) -> Value {
    json!({
        "id": o.id_typed().to_string(),
        "customer_id": o.customer_id().to_string(),
        "status": o.status().as_str(),
        "lines": o.lines(),
        "notes": o.notes(),
        "total": o.total(),
        "version": o.version(),
        "created_at": o.created_at(),
        "updated_at": o.updated_at(),
    })
}

pub fn list_to_json<T>(items: &[T], to_json: impl Fn(&T) -> Value) -> Value {
    json!({
        "count": items.len(),
        "items": items.iter().map(to_json).collect::<Vec<_>>(),
    })
}
