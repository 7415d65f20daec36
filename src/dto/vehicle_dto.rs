use chrono::{DateTime, Utc};
use num_traits::ToPrimitive;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use crate::models::vehicle::{FuelType, NewVehicle, Vehicle, VehicleState, VehicleStatusChange};
use crate::utils::validation::{
    validate_non_negative_decimal, validate_plate_number, validate_positive_decimal,
};

// Request para dar de alta un vehículo
#[derive(Debug, Deserialize, Validate)]
pub struct CreateVehicleRequest {
    #[validate(custom = "validate_plate_number")]
    pub plate_number: String,
    #[validate(custom = "validate_positive_decimal")]
    pub capacity_tonnes: Decimal,
    pub fuel_type: FuelType,
    #[validate(custom = "validate_non_negative_decimal")]
    pub odometer_km: Option<Decimal>,
    #[validate(custom = "validate_non_negative_decimal")]
    pub fuel_level_l: Option<Decimal>,
}

impl From<CreateVehicleRequest> for NewVehicle {
    fn from(request: CreateVehicleRequest) -> Self {
        Self {
            plate_number: request.plate_number,
            capacity_tonnes: request.capacity_tonnes,
            fuel_type: request.fuel_type,
            odometer_km: request.odometer_km.unwrap_or(Decimal::ZERO),
            fuel_level_l: request.fuel_level_l,
        }
    }
}

// Request para cambiar el estado de un vehículo
#[derive(Debug, Deserialize)]
pub struct UpdateVehicleStatusRequest {
    pub status: VehicleStatusChange,
}

// Request para cambio de estado masivo
#[derive(Debug, Deserialize, Validate)]
pub struct BulkStatusRequest {
    #[validate(length(min = 1, max = 500))]
    pub vehicle_ids: Vec<Uuid>,
    pub status: VehicleStatusChange,
}

// Response de vehículo
#[derive(Debug, Serialize)]
pub struct VehicleResponse {
    pub id: Uuid,
    pub plate_number: String,
    pub capacity_tonnes: f64,
    pub fuel_type: FuelType,
    pub state: VehicleState,
    pub current_trip_id: Option<Uuid>,
    pub odometer_km: f64,
    pub fuel_level_l: Option<f64>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<Vehicle> for VehicleResponse {
    fn from(vehicle: Vehicle) -> Self {
        Self {
            id: vehicle.id,
            plate_number: vehicle.plate_number,
            capacity_tonnes: vehicle.capacity_tonnes.to_f64().unwrap_or(0.0),
            fuel_type: vehicle.fuel_type,
            state: vehicle.state,
            current_trip_id: vehicle.current_trip_id,
            odometer_km: vehicle.odometer_km.to_f64().unwrap_or(0.0),
            fuel_level_l: vehicle.fuel_level_l.and_then(|f| f.to_f64()),
            created_at: vehicle.created_at,
            updated_at: vehicle.updated_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_create_vehicle_request_validation() {
        let ok: CreateVehicleRequest = serde_json::from_value(serde_json::json!({
            "plate_number": "TRK-2041",
            "capacity_tonnes": 25,
            "fuel_type": "diesel"
        }))
        .unwrap();
        assert!(ok.validate().is_ok());

        let bad: CreateVehicleRequest = serde_json::from_value(serde_json::json!({
            "plate_number": "!",
            "capacity_tonnes": 0,
            "fuel_type": "diesel",
            "odometer_km": -5
        }))
        .unwrap();
        let errors = bad.validate().unwrap_err();
        let fields = errors.field_errors();
        assert!(fields.contains_key("plate_number"));
        assert!(fields.contains_key("capacity_tonnes"));
        assert!(fields.contains_key("odometer_km"));
    }
}
