//! Modelo de Vehicle
//!
//! Camión de la flota. Es dato de referencia compartido: nunca se borra,
//! se retira. Solo el `VehicleAllocator` y los flujos de mantenimiento
//! mutan su estado.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, Type};
use uuid::Uuid;

/// Estado del vehículo - mapea al ENUM vehicle_state
#[derive(Debug, Clone, Copy, Serialize, Deserialize, Type, PartialEq, Eq, Hash)]
#[sqlx(type_name = "vehicle_state", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum VehicleState {
    Available,
    Allocated,
    Maintenance,
    Retired,
}

impl VehicleState {
    pub fn as_str(&self) -> &'static str {
        match self {
            VehicleState::Available => "available",
            VehicleState::Allocated => "allocated",
            VehicleState::Maintenance => "maintenance",
            VehicleState::Retired => "retired",
        }
    }
}

/// Tipo de combustible - mapea al ENUM fuel_type
#[derive(Debug, Clone, Copy, Serialize, Deserialize, Type, PartialEq, Eq)]
#[sqlx(type_name = "fuel_type", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum FuelType {
    Diesel,
    Gasoline,
    Cng,
    Electric,
    Hybrid,
}

/// Vehicle principal - mapea a la tabla vehicles
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Vehicle {
    pub id: Uuid,
    pub plate_number: String,
    pub capacity_tonnes: Decimal,
    pub fuel_type: FuelType,
    pub state: VehicleState,
    pub current_trip_id: Option<Uuid>,
    // Últimas lecturas conocidas, usadas como snapshot al iniciar un viaje
    pub odometer_km: Decimal,
    pub fuel_level_l: Option<Decimal>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Datos de alta de un vehículo (onboarding)
#[derive(Debug, Clone)]
pub struct NewVehicle {
    pub plate_number: String,
    pub capacity_tonnes: Decimal,
    pub fuel_type: FuelType,
    pub odometer_km: Decimal,
    pub fuel_level_l: Option<Decimal>,
}

impl Vehicle {
    pub fn from_new(id: Uuid, new: NewVehicle, now: DateTime<Utc>) -> Self {
        Self {
            id,
            plate_number: new.plate_number.trim().to_string(),
            capacity_tonnes: new.capacity_tonnes,
            fuel_type: new.fuel_type,
            state: VehicleState::Available,
            current_trip_id: None,
            odometer_km: new.odometer_km,
            fuel_level_l: new.fuel_level_l,
            created_at: now,
            updated_at: now,
        }
    }
}

/// Resultado del intento atómico de asignación contra el store
#[derive(Debug, Clone)]
pub enum AllocateOutcome {
    Allocated(Vehicle),
    Missing,
    NotAvailable(VehicleState),
    /// El update condicional falló pero el vehículo vuelve a estar libre
    LostRace,
}

/// Resultado de una transición de estado condicional
#[derive(Debug, Clone)]
pub enum TransitionOutcome {
    Applied(Vehicle),
    Missing,
    Rejected(VehicleState),
}

/// Estado destino pedido por la API de flota. ALLOCATED no se puede
/// pedir: solo lo pone el allocator al iniciar un viaje.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum VehicleStatusChange {
    Available,
    Maintenance,
    Retired,
}

/// Resultado por vehículo de un cambio de estado masivo
#[derive(Debug, Clone, Serialize)]
pub struct BulkStatusResult {
    pub vehicle_id: Uuid,
    pub success: bool,
    pub state: Option<VehicleState>,
    pub code: Option<&'static str>,
    pub error: Option<String>,
}
