use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::{get, post, put},
    Extension, Json, Router,
};
use uuid::Uuid;

use crate::controllers::stats_controller::StatsController;
use crate::controllers::vehicle_controller::VehicleController;
use crate::dto::vehicle_dto::{
    BulkStatusRequest, CreateVehicleRequest, UpdateVehicleStatusRequest, VehicleResponse,
};
use crate::dto::ApiResponse;
use crate::models::caller::CallerIdentity;
use crate::models::stats::VehicleStats;
use crate::models::vehicle::BulkStatusResult;
use crate::state::AppState;
use crate::utils::errors::AppError;

pub fn create_vehicle_router() -> Router<AppState> {
    Router::new()
        .route("/", post(create_vehicle))
        .route("/bulk-status", post(bulk_status))
        .route("/:id", get(get_vehicle).delete(retire_vehicle))
        .route("/:id/status", put(update_vehicle_status))
        .route("/:id/stats", get(vehicle_stats))
}

async fn create_vehicle(
    State(state): State<AppState>,
    Extension(caller): Extension<CallerIdentity>,
    Json(request): Json<CreateVehicleRequest>,
) -> Result<(StatusCode, Json<ApiResponse<VehicleResponse>>), AppError> {
    let controller = VehicleController::new(&state);
    let response = controller.create(&caller, request).await?;
    Ok((StatusCode::CREATED, Json(response)))
}

async fn get_vehicle(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<ApiResponse<VehicleResponse>>, AppError> {
    let controller = VehicleController::new(&state);
    let response = controller.get_by_id(id).await?;
    Ok(Json(response))
}

async fn update_vehicle_status(
    State(state): State<AppState>,
    Extension(caller): Extension<CallerIdentity>,
    Path(id): Path<Uuid>,
    Json(request): Json<UpdateVehicleStatusRequest>,
) -> Result<Json<ApiResponse<VehicleResponse>>, AppError> {
    let controller = VehicleController::new(&state);
    let response = controller.update_status(&caller, id, request).await?;
    Ok(Json(response))
}

async fn bulk_status(
    State(state): State<AppState>,
    Extension(caller): Extension<CallerIdentity>,
    Json(request): Json<BulkStatusRequest>,
) -> Result<Json<ApiResponse<Vec<BulkStatusResult>>>, AppError> {
    let controller = VehicleController::new(&state);
    let response = controller.bulk_status(&caller, request).await?;
    Ok(Json(response))
}

async fn retire_vehicle(
    State(state): State<AppState>,
    Extension(caller): Extension<CallerIdentity>,
    Path(id): Path<Uuid>,
) -> Result<Json<ApiResponse<VehicleResponse>>, AppError> {
    let controller = VehicleController::new(&state);
    let response = controller.retire(&caller, id).await?;
    Ok(Json(response))
}

async fn vehicle_stats(
    State(state): State<AppState>,
    Extension(caller): Extension<CallerIdentity>,
    Path(id): Path<Uuid>,
) -> Result<Json<ApiResponse<VehicleStats>>, AppError> {
    let controller = StatsController::new(&state);
    let response = controller.vehicle(&caller, id).await?;
    Ok(Json(response))
}
