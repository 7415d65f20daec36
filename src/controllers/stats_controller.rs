use std::sync::Arc;
use uuid::Uuid;

use crate::dto::ApiResponse;
use crate::models::caller::CallerIdentity;
use crate::models::stats::{DriverStats, FleetUtilization, LocationStats, VehicleStats};
use crate::services::authorization::{ensure_can_view_driver, ensure_can_view_fleet_stats};
use crate::services::StatsAggregator;
use crate::state::AppState;
use crate::utils::errors::AppError;

pub struct StatsController {
    stats: Arc<StatsAggregator>,
}

impl StatsController {
    pub fn new(state: &AppState) -> Self {
        Self {
            stats: state.stats.clone(),
        }
    }

    pub async fn fleet(&self, caller: &CallerIdentity) -> Result<ApiResponse<FleetUtilization>, AppError> {
        ensure_can_view_fleet_stats(caller)?;
        Ok(ApiResponse::success(self.stats.fleet_utilization().await?))
    }

    pub async fn vehicle(&self, caller: &CallerIdentity, vehicle_id: Uuid) -> Result<ApiResponse<VehicleStats>, AppError> {
        ensure_can_view_fleet_stats(caller)?;
        Ok(ApiResponse::success(self.stats.vehicle_stats(vehicle_id).await?))
    }

    pub async fn location(
        &self,
        caller: &CallerIdentity,
        location_id: Uuid,
    ) -> Result<ApiResponse<LocationStats>, AppError> {
        ensure_can_view_fleet_stats(caller)?;
        Ok(ApiResponse::success(self.stats.location_stats(location_id).await?))
    }

    pub async fn driver(&self, caller: &CallerIdentity, driver_id: Uuid) -> Result<ApiResponse<DriverStats>, AppError> {
        ensure_can_view_driver(caller, driver_id)?;
        Ok(ApiResponse::success(self.stats.driver_stats(driver_id).await?))
    }
}
