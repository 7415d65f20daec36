//! Modelos de estadísticas
//!
//! Agregados de solo lectura calculados bajo demanda a partir del
//! historial de viajes cerrados.

use serde::Serialize;
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct VehicleStats {
    pub vehicle_id: Uuid,
    pub total_trips: u64,
    pub total_distance_km: f64,
    pub fuel_consumed_liters: f64,
    /// `None` cuando no hay combustible registrado (nunca infinito)
    pub fuel_efficiency_km_per_l: Option<f64>,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct LocationStats {
    pub location_id: Uuid,
    pub loading_count: u64,
    pub unloading_count: u64,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct DriverStats {
    pub driver_id: Uuid,
    pub total_trips: u64,
    pub total_distance_km: f64,
    pub activity_count: u64,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct FleetUtilization {
    pub total_vehicles: u64,
    pub available: u64,
    pub allocated: u64,
    pub maintenance: u64,
    pub retired: u64,
    pub trips_in_progress: u64,
    pub completed_trips: u64,
    /// asignados / (total - retirados); `None` si no hay flota activa
    pub utilization_rate: Option<f64>,
}
