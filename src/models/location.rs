//! Modelo de Location
//!
//! Punto de negocio (cantera, obra, depósito...). Dato de referencia
//! histórico: las actividades lo referencian, así que solo se desactiva.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, Type};
use uuid::Uuid;

/// Tipo de ubicación - mapea al ENUM location_type
#[derive(Debug, Clone, Copy, Serialize, Deserialize, Type, PartialEq, Eq, Hash)]
#[sqlx(type_name = "location_type", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum LocationType {
    Loading,
    Unloading,
    Both,
    Depot,
    Other,
}

impl LocationType {
    /// Un filtro LOADING/UNLOADING también acepta ubicaciones BOTH
    pub fn satisfies(&self, wanted: LocationType) -> bool {
        *self == wanted
            || (*self == LocationType::Both
                && matches!(wanted, LocationType::Loading | LocationType::Unloading))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Location {
    pub id: Uuid,
    pub name: String,
    pub client_name: String,
    pub address: String,
    pub latitude: f64,
    pub longitude: f64,
    pub location_type: LocationType,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Location {
    /// Terna que debe ser única entre ubicaciones activas
    pub fn identity(&self) -> (&str, &str, &str) {
        (&self.name, &self.client_name, &self.address)
    }
}

#[derive(Debug, Clone)]
pub struct NewLocation {
    pub name: String,
    pub client_name: String,
    pub address: String,
    pub latitude: f64,
    pub longitude: f64,
    pub location_type: LocationType,
}

impl NewLocation {
    pub fn into_location(self, id: Uuid, now: DateTime<Utc>) -> Location {
        Location {
            id,
            name: self.name.trim().to_string(),
            client_name: self.client_name.trim().to_string(),
            address: self.address.trim().to_string(),
            latitude: self.latitude,
            longitude: self.longitude,
            location_type: self.location_type,
            is_active: true,
            created_at: now,
            updated_at: now,
        }
    }
}

/// Ubicación encontrada por búsqueda de proximidad
#[derive(Debug, Clone, Serialize)]
pub struct NearbyLocation {
    pub location: Location,
    pub distance_km: f64,
}

/// Resultado del auto-registro desde un fix GPS
#[derive(Debug, Clone, Serialize)]
pub struct AutoRegistration {
    pub location: Location,
    /// `true` si se creó una ubicación nueva
    pub created: bool,
    /// Distancia al fix cuando se reutilizó una ubicación existente
    pub distance_km: Option<f64>,
}

/// Datos para registrar una ubicación nueva desde un fix si no hay ninguna cerca
#[derive(Debug, Clone, Deserialize)]
pub struct RegistrationCandidate {
    pub name: String,
    #[serde(default)]
    pub client_name: Option<String>,
    #[serde(default)]
    pub location_type: Option<LocationType>,
}
