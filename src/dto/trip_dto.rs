use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use crate::models::activity::{ActivityType, NewActivity};
use crate::models::fuel::NewFuelRecord;
use crate::models::gps::NewGpsFix;
use crate::models::location::RegistrationCandidate;
use crate::models::trip::{EndTrip, StartTrip, TripFilter, TripState};
use crate::utils::validation::{validate_non_negative_decimal, validate_positive_decimal};

// Request para iniciar un viaje
#[derive(Debug, Deserialize, Validate)]
pub struct StartTripRequest {
    pub vehicle_id: Uuid,
    /// Si falta y quien llama es chofer, el viaje es suyo
    pub driver_id: Option<Uuid>,
    pub planned_start: Option<DateTime<Utc>>,
    pub planned_end: Option<DateTime<Utc>>,
    #[validate(length(max = 2000))]
    pub notes: Option<String>,
}

impl StartTripRequest {
    pub fn into_command(self, default_driver: Option<Uuid>) -> StartTrip {
        StartTrip {
            vehicle_id: self.vehicle_id,
            driver_id: self.driver_id.or(default_driver),
            planned_start: self.planned_start,
            planned_end: self.planned_end,
            notes: self.notes,
        }
    }
}

/// Query de `GET /api/trip`
#[derive(Debug, Deserialize, Validate)]
pub struct ListTripsQuery {
    pub vehicle_id: Option<Uuid>,
    pub driver_id: Option<Uuid>,
    pub state: Option<TripState>,
    pub started_after: Option<DateTime<Utc>>,
    pub started_before: Option<DateTime<Utc>>,
    #[validate(range(min = 1, max = 500))]
    pub limit: Option<i64>,
    #[validate(range(min = 0))]
    pub offset: Option<i64>,
}

impl From<ListTripsQuery> for TripFilter {
    fn from(query: ListTripsQuery) -> Self {
        Self {
            vehicle_id: query.vehicle_id,
            driver_id: query.driver_id,
            state: query.state,
            started_after: query.started_after,
            started_before: query.started_before,
            limit: Some(query.limit.unwrap_or(50)),
            offset: query.offset,
        }
    }
}

/// Query de `GET /api/trip/current`
#[derive(Debug, Deserialize)]
pub struct CurrentTripQuery {
    pub driver_id: Option<Uuid>,
}

// Request para registrar una actividad
#[derive(Debug, Deserialize, Validate)]
pub struct RecordActivityRequest {
    pub activity_type: ActivityType,
    pub location_id: Uuid,
    pub item_id: Option<Uuid>,
    #[validate(length(max = 200))]
    pub item_name: Option<String>,
    #[validate(custom = "validate_non_negative_decimal")]
    pub quantity_tonnes: Option<Decimal>,
    pub start_time: Option<DateTime<Utc>>,
    pub end_time: Option<DateTime<Utc>>,
    #[validate(length(max = 2000))]
    pub notes: Option<String>,
}

impl From<RecordActivityRequest> for NewActivity {
    fn from(request: RecordActivityRequest) -> Self {
        Self {
            activity_type: request.activity_type,
            location_id: request.location_id,
            item_id: request.item_id,
            item_name: request.item_name,
            quantity_tonnes: request.quantity_tonnes,
            start_time: request.start_time,
            end_time: request.end_time,
            notes: request.notes,
        }
    }
}

// Request de un fix GPS
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct GpsFixRequest {
    #[validate(range(min = -90.0, max = 90.0))]
    pub latitude: f64,
    #[validate(range(min = -180.0, max = 180.0))]
    pub longitude: f64,
    #[validate(range(min = 0.0))]
    pub speed_kmh: Option<f64>,
    #[validate(range(min = 0.0, max = 360.0))]
    pub heading_deg: Option<f64>,
    #[validate(range(min = 0.0))]
    pub accuracy_m: Option<f64>,
    pub recorded_at: DateTime<Utc>,
}

impl From<GpsFixRequest> for NewGpsFix {
    fn from(request: GpsFixRequest) -> Self {
        Self {
            latitude: request.latitude,
            longitude: request.longitude,
            speed_kmh: request.speed_kmh,
            heading_deg: request.heading_deg,
            accuracy_m: request.accuracy_m,
            recorded_at: request.recorded_at,
        }
    }
}

// Request para un lote de fixes acumulados offline
#[derive(Debug, Deserialize, Validate)]
pub struct GpsBatchRequest {
    #[validate(length(min = 1, max = 1000))]
    pub fixes: Vec<GpsFixRequest>,
}

impl GpsBatchRequest {
    /// Valida el lote y cada fix; el primer fix inválido rechaza todo el lote
    pub fn validate_all(&self) -> Result<(), validator::ValidationErrors> {
        self.validate()?;
        for fix in &self.fixes {
            fix.validate()?;
        }
        Ok(())
    }
}

// Request para guardar un fix y resolver su ubicación
#[derive(Debug, Deserialize)]
pub struct LocateFixRequest {
    #[serde(flatten)]
    pub fix: GpsFixRequest,
    pub registration: Option<RegistrationCandidate>,
}

// Request para registrar una carga de combustible
#[derive(Debug, Deserialize, Validate)]
pub struct RecordFuelRequest {
    #[validate(custom = "validate_positive_decimal")]
    pub amount_liters: Decimal,
    #[validate(custom = "validate_non_negative_decimal")]
    pub cost: Option<Decimal>,
    #[validate(length(max = 200))]
    pub location_label: Option<String>,
    pub recorded_at: Option<DateTime<Utc>>,
}

impl From<RecordFuelRequest> for NewFuelRecord {
    fn from(request: RecordFuelRequest) -> Self {
        Self {
            amount_liters: request.amount_liters,
            cost: request.cost,
            location_label: request.location_label,
            recorded_at: request.recorded_at,
        }
    }
}

// Request para cerrar un viaje
#[derive(Debug, Default, Deserialize, Validate)]
pub struct EndTripRequest {
    pub actual_end: Option<DateTime<Utc>>,
    #[validate(custom = "validate_non_negative_decimal")]
    pub end_odometer_km: Option<Decimal>,
    #[validate(custom = "validate_non_negative_decimal")]
    pub end_fuel_level_l: Option<Decimal>,
    #[validate(length(max = 2000))]
    pub notes: Option<String>,
}

impl From<EndTripRequest> for EndTrip {
    fn from(request: EndTripRequest) -> Self {
        Self {
            actual_end: request.actual_end,
            end_odometer_km: request.end_odometer_km,
            end_fuel_level_l: request.end_fuel_level_l,
            notes: request.notes,
        }
    }
}

// Request para cancelar un viaje
#[derive(Debug, Default, Deserialize, Validate)]
pub struct CancelTripRequest {
    #[validate(length(max = 500))]
    pub reason: Option<String>,
}
