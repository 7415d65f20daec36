//! Fleet Ops - motor de operación de flota
//!
//! Asignación exclusiva de vehículos, ciclo de vida de viajes, ledger de
//! actividades, telemetría GPS, índice geoespacial de ubicaciones y
//! estadísticas, expuestos como API HTTP sobre axum.

pub mod config;
pub mod controllers;
pub mod database;
pub mod dto;
pub mod middleware;
pub mod models;
pub mod repositories;
pub mod routes;
pub mod services;
pub mod state;
pub mod utils;

use axum::{
    error_handling::HandleErrorLayer,
    http::StatusCode,
    middleware::from_fn_with_state,
    response::{IntoResponse, Json},
    routing::get,
    BoxError, Router,
};
use serde_json::json;
use std::time::Duration;
use tower::{limit::ConcurrencyLimitLayer, timeout::TimeoutLayer, ServiceBuilder};
use tower_http::{compression::CompressionLayer, trace::TraceLayer};

use crate::middleware::{auth_middleware, cors_middleware, rate_limit_middleware};
use crate::state::AppState;

/// Router completo de la aplicación con todas sus capas
pub fn create_app(state: AppState) -> Router {
    let api = Router::new()
        .nest("/trip", routes::trip_routes::create_trip_router())
        .nest("/location", routes::location_routes::create_location_router())
        .nest("/vehicle", routes::vehicle_routes::create_vehicle_router())
        .nest("/stats", routes::stats_routes::create_stats_router())
        .route_layer(from_fn_with_state(state.clone(), auth_middleware));

    Router::new()
        .route("/health", get(health_check))
        .nest("/api", api)
        .layer(from_fn_with_state(state.rate_limit.clone(), rate_limit_middleware))
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(CompressionLayer::new())
                .layer(HandleErrorLayer::new(handle_middleware_error))
                .layer(TimeoutLayer::new(Duration::from_secs(
                    state.config.request_timeout_secs,
                )))
                .layer(ConcurrencyLimitLayer::new(state.config.max_concurrent_requests)),
        )
        .layer(cors_middleware(&state.config))
        .with_state(state)
}

async fn health_check() -> Json<serde_json::Value> {
    Json(json!({
        "status": "ok",
        "service": "fleet_ops",
        "timestamp": chrono::Utc::now().to_rfc3339(),
    }))
}

async fn handle_middleware_error(err: BoxError) -> impl IntoResponse {
    if err.is::<tower::timeout::error::Elapsed>() {
        tracing::warn!("⏱️ Request cancelada por timeout");
        return (
            StatusCode::REQUEST_TIMEOUT,
            Json(json!({
                "error": "Request Timeout",
                "message": "The request took too long to complete",
                "code": "TIMEOUT",
            })),
        );
    }

    tracing::error!("❌ Error en middleware: {}", err);
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(json!({
            "error": "Internal Server Error",
            "message": "An unexpected error occurred",
            "code": "INTERNAL_ERROR",
        })),
    )
}
