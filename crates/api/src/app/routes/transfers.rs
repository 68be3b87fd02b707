use std::sync::Arc;

use axum::{
    extract::{Extension, Path, Query},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};

use stockroom_core::TransferId;
use stockroom_infra::ServiceResult;
use stockroom_inventory::{NewTransfer, Transfer, TransferQuery, TransferStatus};

use crate::app::services::AppServices;
use crate::app::{dto, errors};

pub fn router() -> Router {
    Router::new()
        .route("/", post(request_transfer).get(list_transfers))
        .route("/pending-settlements", get(list_pending_settlements))
        .route("/:id", get(get_transfer))
        .route("/:id/approve", post(approve_transfer))
        .route("/:id/ship", post(ship_transfer))
        .route("/:id/complete", post(complete_transfer))
        .route("/:id/cancel", post(cancel_transfer))
        .route("/:id/reject", post(reject_transfer))
        .route("/:id/resume", post(resume_settlement))
}

pub async fn request_transfer(
    Extension(services): Extension<Arc<AppServices>>,
    Json(body): Json<dto::CreateTransferRequest>,
) -> axum::response::Response {
    let input = match new_transfer(body) {
        Ok(v) => v,
        Err(r) => return r,
    };

    match services.transfers().request_transfer(input) {
        Ok(t) => (StatusCode::CREATED, Json(dto::transfer_to_json(&t))).into_response(),
        Err(e) => errors::service_error_to_response(e),
    }
}

pub async fn list_transfers(
    Extension(services): Extension<Arc<AppServices>>,
    Query(q): Query<dto::ListTransfersQuery>,
) -> axum::response::Response {
    let page = match errors::parse_page(q.limit, q.offset) {
        Ok(p) => p,
        Err(r) => return r,
    };
    let query = match transfer_query(&q) {
        Ok(v) => v,
        Err(r) => return r,
    };

    match services.transfers().list_transfers(&query, page) {
        Ok(list) => (StatusCode::OK, Json(dto::list_to_json(&list, dto::transfer_to_json))).into_response(),
        Err(e) => errors::service_error_to_response(e),
    }
}

pub async fn list_pending_settlements(
    Extension(services): Extension<Arc<AppServices>>,
    Query(q): Query<dto::PageQuery>,
) -> axum::response::Response {
    let page = match errors::parse_page(q.limit, q.offset) {
        Ok(p) => p,
        Err(r) => return r,
    };

    match services.transfers().list_pending_settlements(page) {
        Ok(list) => (StatusCode::OK, Json(dto::list_to_json(&list, dto::transfer_to_json))).into_response(),
        Err(e) => errors::service_error_to_response(e),
    }
}

pub async fn get_transfer(
    Extension(services): Extension<Arc<AppServices>>,
    Path(id): Path<String>,
) -> axum::response::Response {
    let id: TransferId = match errors::parse_id(&id, "transfer id") {
        Ok(v) => v,
        Err(r) => return r,
    };

    transfer_response(services.transfers().get_transfer(id))
}

pub async fn approve_transfer(
    Extension(services): Extension<Arc<AppServices>>,
    Path(id): Path<String>,
    Json(body): Json<dto::ApproveTransferRequest>,
) -> axum::response::Response {
    let id: TransferId = match errors::parse_id(&id, "transfer id") {
        Ok(v) => v,
        Err(r) => return r,
    };

    transfer_response(services.transfers().approve_transfer(
        id,
        &body.approved_by,
        body.estimated_arrival,
    ))
}

pub async fn ship_transfer(
    Extension(services): Extension<Arc<AppServices>>,
    Path(id): Path<String>,
) -> axum::response::Response {
    let id: TransferId = match errors::parse_id(&id, "transfer id") {
        Ok(v) => v,
        Err(r) => return r,
    };

    transfer_response(services.transfers().ship_transfer(id))
}

pub async fn complete_transfer(
    Extension(services): Extension<Arc<AppServices>>,
    Path(id): Path<String>,
    Json(body): Json<dto::ReceiveTransferRequest>,
) -> axum::response::Response {
    let id: TransferId = match errors::parse_id(&id, "transfer id") {
        Ok(v) => v,
        Err(r) => return r,
    };

    transfer_response(services.transfers().complete_transfer(id, &body.received_by))
}

pub async fn cancel_transfer(
    Extension(services): Extension<Arc<AppServices>>,
    Path(id): Path<String>,
    Json(body): Json<dto::CancelTransferRequest>,
) -> axum::response::Response {
    let id: TransferId = match errors::parse_id(&id, "transfer id") {
        Ok(v) => v,
        Err(r) => return r,
    };

    transfer_response(services.transfers().cancel_transfer(id, body.reason))
}

pub async fn reject_transfer(
    Extension(services): Extension<Arc<AppServices>>,
    Path(id): Path<String>,
    Json(body): Json<dto::RejectTransferRequest>,
) -> axum::response::Response {
    let id: TransferId = match errors::parse_id(&id, "transfer id") {
        Ok(v) => v,
        Err(r) => return r,
    };

    transfer_response(
        services
            .transfers()
            .reject_transfer(id, &body.rejected_by, body.reason),
    )
}

pub async fn resume_settlement(
    Extension(services): Extension<Arc<AppServices>>,
    Path(id): Path<String>,
    Json(body): Json<dto::ReceiveTransferRequest>,
) -> axum::response::Response {
    let id: TransferId = match errors::parse_id(&id, "transfer id") {
        Ok(v) => v,
        Err(r) => return r,
    };

    transfer_response(services.transfers().resume_settlement(id, &body.received_by))
}

fn transfer_response(result: ServiceResult<Transfer>) -> axum::response::Response {
    match result {
        Ok(t) => (StatusCode::OK, Json(dto::transfer_to_json(&t))).into_response(),
        Err(e) => errors::service_error_to_response(e),
    }
}

fn new_transfer(body: dto::CreateTransferRequest) -> Result<NewTransfer, axum::response::Response> {
    Ok(NewTransfer {
        product_id: errors::parse_id(&body.product_id, "product_id")?,
        sku: dto::parse_sku(&body.sku)?,
        source_location_id: errors::parse_id(&body.source_location_id, "source_location_id")?,
        destination_location_id: errors::parse_id(
            &body.destination_location_id,
            "destination_location_id",
        )?,
        quantity: body.quantity,
        requested_by: body.requested_by,
        reason: body.reason,
        notes: body.notes,
    })
}

fn transfer_query(q: &dto::ListTransfersQuery) -> Result<TransferQuery, axum::response::Response> {
    let status = match q.status.as_deref() {
        Some(raw) => Some(
            raw.parse::<TransferStatus>()
                .map_err(|e| errors::service_error_to_response(e.into()))?,
        ),
        None => None,
    };

    Ok(TransferQuery {
        status,
        location_id: errors::parse_opt_id(q.location_id.as_deref(), "location_id")?,
        product_id: errors::parse_opt_id(q.product_id.as_deref(), "product_id")?,
        ..TransferQuery::default()
    })
}
