use std::sync::Arc;
use uuid::Uuid;
use validator::Validate;

use crate::config::FleetConfig;
use crate::dto::location_dto::{CreateLocationRequest, NearbyQuery, SearchQuery};
use crate::dto::ApiResponse;
use crate::models::caller::CallerIdentity;
use crate::models::location::{Location, NearbyLocation};
use crate::services::authorization::ensure_can_manage_locations;
use crate::services::LocationIndex;
use crate::state::AppState;
use crate::utils::errors::AppError;

/// Radio por defecto de `nearby` cuando no se indica
const DEFAULT_NEARBY_RADIUS_KM: f64 = 5.0;

pub struct LocationController {
    locations: Arc<LocationIndex>,
    fleet: Arc<FleetConfig>,
}

impl LocationController {
    pub fn new(state: &AppState) -> Self {
        Self {
            locations: state.locations.clone(),
            fleet: state.fleet.clone(),
        }
    }

    pub async fn create(
        &self,
        caller: &CallerIdentity,
        request: CreateLocationRequest,
    ) -> Result<ApiResponse<Location>, AppError> {
        ensure_can_manage_locations(caller)?;
        request.validate()?;

        let location = self.locations.create(request.into()).await?;
        Ok(ApiResponse::success_with_message(location, "Ubicación creada exitosamente"))
    }

    pub async fn get(&self, id: Uuid) -> Result<ApiResponse<Location>, AppError> {
        Ok(ApiResponse::success(self.locations.get(id).await?))
    }

    pub async fn nearby(&self, query: NearbyQuery) -> Result<ApiResponse<Vec<NearbyLocation>>, AppError> {
        let radius_km = query.radius_km.unwrap_or(DEFAULT_NEARBY_RADIUS_KM);
        let limit = self.fleet.clamp_limit(query.limit);

        let found = self.locations.near_by(query.lat, query.lon, radius_km, limit).await?;
        Ok(ApiResponse::success(found))
    }

    pub async fn search(&self, query: SearchQuery) -> Result<ApiResponse<Vec<Location>>, AppError> {
        let found = self
            .locations
            .autocomplete(&query.q, query.location_type, query.limit)
            .await?;
        Ok(ApiResponse::success(found))
    }

    pub async fn deactivate(&self, caller: &CallerIdentity, id: Uuid) -> Result<ApiResponse<Location>, AppError> {
        ensure_can_manage_locations(caller)?;

        let location = self.locations.deactivate(id).await?;
        Ok(ApiResponse::success_with_message(location, "Ubicación desactivada exitosamente"))
    }
}
