use std::sync::Arc;

use axum::{
    extract::{Extension, Path, Query},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};

use stockroom_core::LocationId;
use stockroom_inventory::LocationQuery;

use crate::app::services::AppServices;
use crate::app::{dto, errors};

pub fn router() -> Router {
    Router::new()
        .route("/", post(register_location).get(list_locations))
        .route("/:id", get(get_location))
        .route("/:id/deactivate", post(deactivate_location))
        .route("/:id/activate", post(activate_location))
}

pub async fn register_location(
    Extension(services): Extension<Arc<AppServices>>,
    Json(body): Json<dto::CreateLocationRequest>,
) -> axum::response::Response {
    match services
        .transfers()
        .register_location(&body.code, &body.name, body.kind)
    {
        Ok(l) => (StatusCode::CREATED, Json(dto::location_to_json(&l))).into_response(),
        Err(e) => errors::service_error_to_response(e),
    }
}

pub async fn list_locations(
    Extension(services): Extension<Arc<AppServices>>,
    Query(q): Query<dto::ListLocationsQuery>,
) -> axum::response::Response {
    let page = match errors::parse_page(q.limit, q.offset) {
        Ok(p) => p,
        Err(r) => return r,
    };
    let query = LocationQuery {
        active_only: q.active_only.unwrap_or(false),
        kind: q.kind,
    };

    match services.transfers().list_locations(&query, page) {
        Ok(list) => (StatusCode::OK, Json(dto::list_to_json(&list, dto::location_to_json))).into_response(),
        Err(e) => errors::service_error_to_response(e),
    }
}

pub async fn get_location(
    Extension(services): Extension<Arc<AppServices>>,
    Path(id): Path<String>,
) -> axum::response::Response {
    let id: LocationId = match errors::parse_id(&id, "location id") {
        Ok(v) => v,
        Err(r) => return r,
    };

    match services.transfers().get_location(id) {
        Ok(l) => (StatusCode::OK, Json(dto::location_to_json(&l))).into_response(),
        Err(e) => errors::service_error_to_response(e),
    }
}

pub async fn deactivate_location(
    Extension(services): Extension<Arc<AppServices>>,
    Path(id): Path<String>,
) -> axum::response::Response {
    let id: LocationId = match errors::parse_id(&id, "location id") {
        Ok(v) => v,
        Err(r) => return r,
    };

    match services.transfers().deactivate_location(id) {
        Ok(l) => (StatusCode::OK, Json(dto::location_to_json(&l))).into_response(),
        Err(e) => errors::service_error_to_response(e),
    }
}

pub async fn activate_location(
    Extension(services): Extension<Arc<AppServices>>,
    Path(id): Path<String>,
) -> axum::response::Response {
    let id: LocationId = match errors::parse_id(&id, "location id") {
        Ok(v) => v,
        Err(r) => return r,
    };

    match services.transfers().activate_location(id) {
        Ok(l) => (StatusCode::OK, Json(dto::location_to_json(&l))).into_response(),
        Err(e) => errors::service_error_to_response(e),
    }
}
