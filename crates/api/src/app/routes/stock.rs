use std::sync::Arc;

use axum::{
    extract::{Extension, Path, Query},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};

use stockroom_core::StockRecordId;
use stockroom_infra::ServiceResult;
use stockroom_inventory::{NewStockRecord, StockQuery, StockRecord};

use crate::app::services::{AppServices, Ledger};
use crate::app::{dto, errors};

pub fn router() -> Router {
    Router::new()
        .route("/", post(create_stock).get(list_stock))
        .route("/:id", get(get_stock).put(update_stock).delete(delete_stock))
        .route("/:id/add", post(add_stock))
        .route("/:id/remove", post(remove_stock))
        .route("/:id/reserve", post(reserve_stock))
        .route("/:id/release", post(release_reservation))
        .route("/:id/fulfill", post(fulfill_reservation))
}

pub async fn create_stock(
    Extension(services): Extension<Arc<AppServices>>,
    Json(body): Json<dto::CreateStockRequest>,
) -> axum::response::Response {
    let input = match new_stock_record(body) {
        Ok(v) => v,
        Err(r) => return r,
    };

    match services.ledger().create_stock(input) {
        Ok(r) => (StatusCode::CREATED, Json(dto::stock_to_json(&r))).into_response(),
        Err(e) => errors::service_error_to_response(e),
    }
}

pub async fn list_stock(
    Extension(services): Extension<Arc<AppServices>>,
    Query(q): Query<dto::ListStockQuery>,
) -> axum::response::Response {
    let page = match errors::parse_page(q.limit, q.offset) {
        Ok(p) => p,
        Err(r) => return r,
    };
    let query = match stock_query(&q) {
        Ok(v) => v,
        Err(r) => return r,
    };

    match services.ledger().list_stock(&query, page) {
        Ok(list) => (StatusCode::OK, Json(dto::list_to_json(&list, dto::stock_to_json))).into_response(),
        Err(e) => errors::service_error_to_response(e),
    }
}

pub async fn get_stock(
    Extension(services): Extension<Arc<AppServices>>,
    Path(id): Path<String>,
) -> axum::response::Response {
    let id: StockRecordId = match errors::parse_id(&id, "stock id") {
        Ok(v) => v,
        Err(r) => return r,
    };

    stock_response(services.ledger().get_stock(id), StatusCode::OK)
}

pub async fn update_stock(
    Extension(services): Extension<Arc<AppServices>>,
    Path(id): Path<String>,
    Json(body): Json<dto::UpdateStockRequest>,
) -> axum::response::Response {
    let id: StockRecordId = match errors::parse_id(&id, "stock id") {
        Ok(v) => v,
        Err(r) => return r,
    };

    stock_response(
        services
            .ledger()
            .update_stock(id, body.settings, body.expected_version),
        StatusCode::OK,
    )
}

pub async fn delete_stock(
    Extension(services): Extension<Arc<AppServices>>,
    Path(id): Path<String>,
) -> axum::response::Response {
    let id: StockRecordId = match errors::parse_id(&id, "stock id") {
        Ok(v) => v,
        Err(r) => return r,
    };

    match services.ledger().delete_stock(id) {
        Ok(()) => StatusCode::NO_CONTENT.into_response(),
        Err(e) => errors::service_error_to_response(e),
    }
}

pub async fn add_stock(
    services: Extension<Arc<AppServices>>,
    id: Path<String>,
    body: Json<dto::QuantityRequest>,
) -> axum::response::Response {
    quantity_operation(services, id, body, Ledger::add_stock)
}

pub async fn remove_stock(
    services: Extension<Arc<AppServices>>,
    id: Path<String>,
    body: Json<dto::QuantityRequest>,
) -> axum::response::Response {
    quantity_operation(services, id, body, Ledger::remove_stock)
}

pub async fn reserve_stock(
    services: Extension<Arc<AppServices>>,
    id: Path<String>,
    body: Json<dto::QuantityRequest>,
) -> axum::response::Response {
    quantity_operation(services, id, body, Ledger::reserve_stock)
}

pub async fn release_reservation(
    services: Extension<Arc<AppServices>>,
    id: Path<String>,
    body: Json<dto::QuantityRequest>,
) -> axum::response::Response {
    quantity_operation(services, id, body, Ledger::release_reservation)
}

pub async fn fulfill_reservation(
    services: Extension<Arc<AppServices>>,
    id: Path<String>,
    body: Json<dto::QuantityRequest>,
) -> axum::response::Response {
    quantity_operation(services, id, body, Ledger::fulfill_reservation)
}

fn quantity_operation(
    Extension(services): Extension<Arc<AppServices>>,
    Path(id): Path<String>,
    Json(body): Json<dto::QuantityRequest>,
    op: fn(&Ledger, StockRecordId, i32) -> ServiceResult<StockRecord>,
) -> axum::response::Response {
    let id: StockRecordId = match errors::parse_id(&id, "stock id") {
        Ok(v) => v,
        Err(r) => return r,
    };

    stock_response(op(services.ledger(), id, body.quantity), StatusCode::OK)
}

fn stock_response(result: ServiceResult<StockRecord>, status: StatusCode) -> axum::response::Response {
    match result {
        Ok(r) => (status, Json(dto::stock_to_json(&r))).into_response(),
        Err(e) => errors::service_error_to_response(e),
    }
}

fn new_stock_record(body: dto::CreateStockRequest) -> Result<NewStockRecord, axum::response::Response> {
    Ok(NewStockRecord {
        product_id: errors::parse_id(&body.product_id, "product_id")?,
        sku: dto::parse_sku(&body.sku)?,
        location_id: errors::parse_id(&body.location_id, "location_id")?,
        initial_quantity: body.initial_quantity,
        settings: body.settings,
    })
}

fn stock_query(q: &dto::ListStockQuery) -> Result<StockQuery, axum::response::Response> {
    Ok(StockQuery {
        location_id: errors::parse_opt_id(q.location_id.as_deref(), "location_id")?,
        product_id: errors::parse_opt_id(q.product_id.as_deref(), "product_id")?,
        sku: q.sku.as_deref().map(dto::parse_sku).transpose()?,
        low_stock_only: q.low_stock_only.unwrap_or(false),
    })
}
