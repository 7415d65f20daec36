use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::{get, post},
    Extension, Json, Router,
};
use uuid::Uuid;

use crate::controllers::trip_controller::TripController;
use crate::dto::trip_dto::{
    CancelTripRequest, CurrentTripQuery, EndTripRequest, GpsBatchRequest, GpsFixRequest,
    ListTripsQuery, LocateFixRequest, RecordActivityRequest, RecordFuelRequest, StartTripRequest,
};
use crate::dto::ApiResponse;
use crate::models::activity::Activity;
use crate::models::caller::CallerIdentity;
use crate::models::fuel::FuelRecord;
use crate::models::gps::{GpsFix, LocatedFix};
use crate::models::trip::{Trip, TripDetail};
use crate::state::AppState;
use crate::utils::errors::AppError;

pub fn create_trip_router() -> Router<AppState> {
    Router::new()
        .route("/", post(start_trip).get(list_trips))
        .route("/current", get(current_trip))
        .route("/:id", get(get_trip))
        .route("/:id/activity", post(record_activity).get(list_activities))
        .route("/:id/gps", post(ingest_gps).get(gps_track))
        .route("/:id/gps/batch", post(ingest_gps_batch))
        .route("/:id/gps/locate", post(locate_fix))
        .route("/:id/fuel", post(record_fuel))
        .route("/:id/end", post(end_trip))
        .route("/:id/cancel", post(cancel_trip))
}

async fn start_trip(
    State(state): State<AppState>,
    Extension(caller): Extension<CallerIdentity>,
    Json(request): Json<StartTripRequest>,
) -> Result<(StatusCode, Json<ApiResponse<Trip>>), AppError> {
    let controller = TripController::new(&state);
    let response = controller.start(&caller, request).await?;
    Ok((StatusCode::CREATED, Json(response)))
}

async fn list_trips(
    State(state): State<AppState>,
    Extension(caller): Extension<CallerIdentity>,
    Query(query): Query<ListTripsQuery>,
) -> Result<Json<ApiResponse<Vec<Trip>>>, AppError> {
    let controller = TripController::new(&state);
    let response = controller.list(&caller, query).await?;
    Ok(Json(response))
}

async fn current_trip(
    State(state): State<AppState>,
    Extension(caller): Extension<CallerIdentity>,
    Query(query): Query<CurrentTripQuery>,
) -> Result<Json<ApiResponse<Option<Trip>>>, AppError> {
    let controller = TripController::new(&state);
    let response = controller.current(&caller, query).await?;
    Ok(Json(response))
}

async fn get_trip(
    State(state): State<AppState>,
    Extension(caller): Extension<CallerIdentity>,
    Path(id): Path<Uuid>,
) -> Result<Json<ApiResponse<TripDetail>>, AppError> {
    let controller = TripController::new(&state);
    let response = controller.get(&caller, id).await?;
    Ok(Json(response))
}

async fn record_activity(
    State(state): State<AppState>,
    Extension(caller): Extension<CallerIdentity>,
    Path(id): Path<Uuid>,
    Json(request): Json<RecordActivityRequest>,
) -> Result<(StatusCode, Json<ApiResponse<Activity>>), AppError> {
    let controller = TripController::new(&state);
    let response = controller.record_activity(&caller, id, request).await?;
    Ok((StatusCode::CREATED, Json(response)))
}

async fn list_activities(
    State(state): State<AppState>,
    Extension(caller): Extension<CallerIdentity>,
    Path(id): Path<Uuid>,
) -> Result<Json<ApiResponse<Vec<Activity>>>, AppError> {
    let controller = TripController::new(&state);
    let response = controller.list_activities(&caller, id).await?;
    Ok(Json(response))
}

async fn ingest_gps(
    State(state): State<AppState>,
    Extension(caller): Extension<CallerIdentity>,
    Path(id): Path<Uuid>,
    Json(request): Json<GpsFixRequest>,
) -> Result<Json<ApiResponse<GpsFix>>, AppError> {
    let controller = TripController::new(&state);
    let response = controller.ingest_gps(&caller, id, request).await?;
    Ok(Json(response))
}

async fn ingest_gps_batch(
    State(state): State<AppState>,
    Extension(caller): Extension<CallerIdentity>,
    Path(id): Path<Uuid>,
    Json(request): Json<GpsBatchRequest>,
) -> Result<Json<ApiResponse<Vec<GpsFix>>>, AppError> {
    let controller = TripController::new(&state);
    let response = controller.ingest_gps_batch(&caller, id, request).await?;
    Ok(Json(response))
}

async fn locate_fix(
    State(state): State<AppState>,
    Extension(caller): Extension<CallerIdentity>,
    Path(id): Path<Uuid>,
    Json(request): Json<LocateFixRequest>,
) -> Result<Json<ApiResponse<LocatedFix>>, AppError> {
    let controller = TripController::new(&state);
    let response = controller.locate_fix(&caller, id, request).await?;
    Ok(Json(response))
}

async fn gps_track(
    State(state): State<AppState>,
    Extension(caller): Extension<CallerIdentity>,
    Path(id): Path<Uuid>,
) -> Result<Json<ApiResponse<Vec<GpsFix>>>, AppError> {
    let controller = TripController::new(&state);
    let response = controller.gps_track(&caller, id).await?;
    Ok(Json(response))
}

async fn record_fuel(
    State(state): State<AppState>,
    Extension(caller): Extension<CallerIdentity>,
    Path(id): Path<Uuid>,
    Json(request): Json<RecordFuelRequest>,
) -> Result<(StatusCode, Json<ApiResponse<FuelRecord>>), AppError> {
    let controller = TripController::new(&state);
    let response = controller.record_fuel(&caller, id, request).await?;
    Ok((StatusCode::CREATED, Json(response)))
}

async fn end_trip(
    State(state): State<AppState>,
    Extension(caller): Extension<CallerIdentity>,
    Path(id): Path<Uuid>,
    request: Option<Json<EndTripRequest>>,
) -> Result<Json<ApiResponse<Trip>>, AppError> {
    let request = request.map(|Json(r)| r).unwrap_or_default();
    let controller = TripController::new(&state);
    let response = controller.end(&caller, id, request).await?;
    Ok(Json(response))
}

async fn cancel_trip(
    State(state): State<AppState>,
    Extension(caller): Extension<CallerIdentity>,
    Path(id): Path<Uuid>,
    request: Option<Json<CancelTripRequest>>,
) -> Result<Json<ApiResponse<Trip>>, AppError> {
    let request = request.map(|Json(r)| r).unwrap_or_default();
    let controller = TripController::new(&state);
    let response = controller.cancel(&caller, id, request).await?;
    Ok(Json(response))
}
