use axum::{routing::get, Router};

pub mod locations;
pub mod orders;
pub mod stock;
pub mod system;
pub mod transfers;

/// Router for every endpoint.
pub fn router() -> Router {
    Router::new()
        .route("/health", get(system::health))
        .nest("/locations", locations::router())
        .nest("/stock", stock::router())
        .nest("/transfers", transfers::router())
        .nest("/orders", orders::router())
}
