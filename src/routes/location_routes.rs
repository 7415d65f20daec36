use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::{get, post},
    Extension, Json, Router,
};
use uuid::Uuid;

use crate::controllers::location_controller::LocationController;
use crate::dto::location_dto::{CreateLocationRequest, NearbyQuery, SearchQuery};
use crate::dto::ApiResponse;
use crate::models::caller::CallerIdentity;
use crate::models::location::{Location, NearbyLocation};
use crate::state::AppState;
use crate::utils::errors::AppError;

pub fn create_location_router() -> Router<AppState> {
    Router::new()
        .route("/", post(create_location))
        .route("/nearby", get(nearby_locations))
        .route("/search", get(search_locations))
        .route("/:id", get(get_location).delete(deactivate_location))
}

async fn create_location(
    State(state): State<AppState>,
    Extension(caller): Extension<CallerIdentity>,
    Json(request): Json<CreateLocationRequest>,
) -> Result<(StatusCode, Json<ApiResponse<Location>>), AppError> {
    let controller = LocationController::new(&state);
    let response = controller.create(&caller, request).await?;
    Ok((StatusCode::CREATED, Json(response)))
}

async fn nearby_locations(
    State(state): State<AppState>,
    Query(query): Query<NearbyQuery>,
) -> Result<Json<ApiResponse<Vec<NearbyLocation>>>, AppError> {
    let controller = LocationController::new(&state);
    let response = controller.nearby(query).await?;
    Ok(Json(response))
}

async fn search_locations(
    State(state): State<AppState>,
    Query(query): Query<SearchQuery>,
) -> Result<Json<ApiResponse<Vec<Location>>>, AppError> {
    let controller = LocationController::new(&state);
    let response = controller.search(query).await?;
    Ok(Json(response))
}

async fn get_location(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<ApiResponse<Location>>, AppError> {
    let controller = LocationController::new(&state);
    let response = controller.get(id).await?;
    Ok(Json(response))
}

async fn deactivate_location(
    State(state): State<AppState>,
    Extension(caller): Extension<CallerIdentity>,
    Path(id): Path<Uuid>,
) -> Result<Json<ApiResponse<Location>>, AppError> {
    let controller = LocationController::new(&state);
    let response = controller.deactivate(&caller, id).await?;
    Ok(Json(response))
}
