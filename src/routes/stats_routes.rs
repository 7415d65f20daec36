use axum::{
    extract::{Path, State},
    routing::get,
    Extension, Json, Router,
};
use uuid::Uuid;

use crate::controllers::stats_controller::StatsController;
use crate::dto::ApiResponse;
use crate::models::caller::CallerIdentity;
use crate::models::stats::{DriverStats, FleetUtilization, LocationStats};
use crate::state::AppState;
use crate::utils::errors::AppError;

pub fn create_stats_router() -> Router<AppState> {
    Router::new()
        .route("/fleet", get(fleet_stats))
        .route("/location/:id", get(location_stats))
        .route("/driver/:id", get(driver_stats))
}

async fn fleet_stats(
    State(state): State<AppState>,
    Extension(caller): Extension<CallerIdentity>,
) -> Result<Json<ApiResponse<FleetUtilization>>, AppError> {
    let controller = StatsController::new(&state);
    let response = controller.fleet(&caller).await?;
    Ok(Json(response))
}

async fn location_stats(
    State(state): State<AppState>,
    Extension(caller): Extension<CallerIdentity>,
    Path(id): Path<Uuid>,
) -> Result<Json<ApiResponse<LocationStats>>, AppError> {
    let controller = StatsController::new(&state);
    let response = controller.location(&caller, id).await?;
    Ok(Json(response))
}

async fn driver_stats(
    State(state): State<AppState>,
    Extension(caller): Extension<CallerIdentity>,
    Path(id): Path<Uuid>,
) -> Result<Json<ApiResponse<DriverStats>>, AppError> {
    let controller = StatsController::new(&state);
    let response = controller.driver(&caller, id).await?;
    Ok(Json(response))
}
