//! JSON API exposing address resolution to the browser publication form.

mod handlers;
mod state;

use axum::routing::{get, post};
use axum::Router;
use state::AppState;
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::info;

use crate::address::AddressResolver;

pub fn build_router(resolver: AddressResolver) -> Router {
    let state = Arc::new(AppState { resolver });

    Router::new()
        .route("/api/states", get(handlers::states))
        .route("/api/municipalities", get(handlers::municipalities))
        .route("/api/neighborhoods", get(handlers::neighborhoods))
        .route("/api/postal-codes", get(handlers::search_postal_codes))
        .route("/api/postal-codes/{code}", get(handlers::postal_code))
        .route("/api/postal-codes/{code}/autocomplete", get(handlers::autocomplete))
        .route("/api/addresses/validate", post(handlers::validate))
        .route("/api/amenities", get(handlers::amenities))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

pub async fn start(host: &str, port: u16, resolver: AddressResolver) -> std::io::Result<()> {
    let app = build_router(resolver);
    let addr = format!("{}:{}", host, port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;

    info!("roomhub API listening on http://{}", addr);
    axum::serve(listener, app).await
}
