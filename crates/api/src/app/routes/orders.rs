use std::sync::Arc;

use axum::{
    extract::{Extension, Path, Query},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};

use stockroom_core::{next_version, Clock, ExpectedVersion, OrderId, Versioned};
use stockroom_infra::{ServiceError, ServiceResult};
use stockroom_sales::{NewOrder, Order, OrderQuery, OrderStatus};

use crate::app::services::AppServices;
use crate::app::{dto, errors};

pub fn router() -> Router {
    Router::new()
        .route("/", post(create_order).get(list_orders))
        .route("/:id", get(get_order).put(update_order))
        .route("/:id/status", post(change_order_status))
}

pub async fn create_order(
    Extension(services): Extension<Arc<AppServices>>,
    Json(body): Json<dto::CreateOrderRequest>,
) -> axum::response::Response {
    let input = match new_order(body) {
        Ok(v) => v,
        Err(r) => return r,
    };

    match services.orders().create_order(input) {
        Ok(o) => (StatusCode::CREATED, Json(dto::order_to_json(&o))).into_response(),
        Err(e) => errors::service_error_to_response(e),
    }
}

pub async fn list_orders(
    Extension(services): Extension<Arc<AppServices>>,
    Query(q): Query<dto::ListOrdersQuery>,
) -> axum::response::Response {
    let page = match errors::parse_page(q.limit, q.offset) {
        Ok(p) => p,
        Err(r) => return r,
    };
    let query = match order_query(&q) {
        Ok(v) => v,
        Err(r) => return r,
    };

    match services.orders().list_orders(&query, page) {
        Ok(list) => (StatusCode::OK, Json(dto::list_to_json(&list, dto::order_to_json))).into_response(),
        Err(e) => errors::service_error_to_response(e),
    }
}

pub async fn get_order(
    Extension(services): Extension<Arc<AppServices>>,
    Path(id): Path<String>,
) -> axum::response::Response {
    let id: OrderId = match errors::parse_id(&id, "order id") {
        Ok(v) => v,
        Err(r) => return r,
    };

    order_response(services.orders().get_order(id))
}

/// Revise lines/notes, written only if the order is still at `expected_version`.
pub async fn update_order(
    Extension(services): Extension<Arc<AppServices>>,
    Path(id): Path<String>,
    Json(body): Json<dto::UpdateOrderRequest>,
) -> axum::response::Response {
    let id: OrderId = match errors::parse_id(&id, "order id") {
        Ok(v) => v,
        Err(r) => return r,
    };
    let lines = match dto::parse_lines(body.lines) {
        Ok(v) => v,
        Err(r) => return r,
    };

    let result = services.orders().get_order(id).and_then(|mut order| {
        let new_version = next_version(body.expected_version)?;
        order
            .revise(lines, body.notes, services.clock().now())
            .map_err(ServiceError::from)?;
        order.set_version(new_version);
        services
            .orders()
            .update_order_with_version(order, body.expected_version)
    });
    order_response(result)
}

pub async fn change_order_status(
    Extension(services): Extension<Arc<AppServices>>,
    Path(id): Path<String>,
    Json(body): Json<dto::ChangeOrderStatusRequest>,
) -> axum::response::Response {
    let id: OrderId = match errors::parse_id(&id, "order id") {
        Ok(v) => v,
        Err(r) => return r,
    };
    let status: OrderStatus = match body.status.parse() {
        Ok(s) => s,
        Err(e) => return errors::service_error_to_response(ServiceError::from(e)),
    };
    let expected = body
        .expected_version
        .map_or(ExpectedVersion::Any, ExpectedVersion::Exact);

    order_response(services.orders().change_order_status(id, status, expected))
}

fn order_response(result: ServiceResult<Order>) -> axum::response::Response {
    match result {
        Ok(o) => (StatusCode::OK, Json(dto::order_to_json(&o))).into_response(),
        Err(e) => errors::service_error_to_response(e),
    }
}

fn new_order(body: dto::CreateOrderRequest) -> Result<NewOrder, axum::response::Response> {
    Ok(NewOrder {
        customer_id: errors::parse_id(&body.customer_id, "customer_id")?,
        lines: dto::parse_lines(body.lines)?,
        notes: body.notes,
    })
}

fn order_query(q: &dto::ListOrdersQuery) -> Result<OrderQuery, axum::response::Response> {
    let status = match q.status.as_deref() {
        Some(raw) => Some(
            raw.parse::<OrderStatus>()
                .map_err(|e| errors::service_error_to_response(e.into()))?,
        ),
        None => None,
    };

    Ok(OrderQuery {
        customer_id: errors::parse_opt_id(q.customer_id.as_deref(), "customer_id")?,
        status,
    })
}
