use std::sync::Arc;
use uuid::Uuid;
use validator::Validate;

use crate::dto::vehicle_dto::{
    BulkStatusRequest, CreateVehicleRequest, UpdateVehicleStatusRequest, VehicleResponse,
};
use crate::dto::ApiResponse;
use crate::models::caller::CallerIdentity;
use crate::models::vehicle::BulkStatusResult;
use crate::services::VehicleAllocator;
use crate::state::AppState;
use crate::utils::errors::AppError;

pub struct VehicleController {
    allocator: Arc<VehicleAllocator>,
}

impl VehicleController {
    pub fn new(state: &AppState) -> Self {
        Self {
            allocator: state.allocator.clone(),
        }
    }

    pub async fn create(
        &self,
        caller: &CallerIdentity,
        request: CreateVehicleRequest,
    ) -> Result<ApiResponse<VehicleResponse>, AppError> {
        request.validate()?;

        let vehicle = self.allocator.register(caller, request.into()).await?;
        Ok(ApiResponse::success_with_message(
            VehicleResponse::from(vehicle),
            "Vehículo creado exitosamente",
        ))
    }

    pub async fn get_by_id(&self, id: Uuid) -> Result<ApiResponse<VehicleResponse>, AppError> {
        let vehicle = self.allocator.get(id).await?;
        Ok(ApiResponse::success(VehicleResponse::from(vehicle)))
    }

    pub async fn update_status(
        &self,
        caller: &CallerIdentity,
        id: Uuid,
        request: UpdateVehicleStatusRequest,
    ) -> Result<ApiResponse<VehicleResponse>, AppError> {
        let vehicle = self.allocator.set_status(caller, id, request.status).await?;
        Ok(ApiResponse::success_with_message(
            VehicleResponse::from(vehicle),
            "Estado del vehículo actualizado exitosamente",
        ))
    }

    pub async fn bulk_status(
        &self,
        caller: &CallerIdentity,
        request: BulkStatusRequest,
    ) -> Result<ApiResponse<Vec<BulkStatusResult>>, AppError> {
        request.validate()?;

        let results = self
            .allocator
            .bulk_set_status(caller, &request.vehicle_ids, request.status)
            .await?;
        let failed = results.iter().filter(|r| !r.success).count();
        let message = format!("{} vehículos procesados, {} con error", results.len(), failed);
        Ok(ApiResponse::success_with_message(results, message))
    }

    pub async fn retire(&self, caller: &CallerIdentity, id: Uuid) -> Result<ApiResponse<VehicleResponse>, AppError> {
        let vehicle = self.allocator.retire(caller, id).await?;
        Ok(ApiResponse::success_with_message(
            VehicleResponse::from(vehicle),
            "Vehículo retirado exitosamente",
        ))
    }
}
