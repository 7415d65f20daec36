//! Modelo de GpsFix
//!
//! Telemetría cruda del dispositivo. Append-only; los dispositivos
//! acumulan y vacían tarde, así que el orden de llegada no es el orden
//! real: la lectura ordena por `recorded_at`.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

use super::location::Location;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct GpsFix {
    pub id: Uuid,
    pub trip_id: Uuid,
    pub vehicle_id: Uuid,
    pub latitude: f64,
    pub longitude: f64,
    pub speed_kmh: Option<f64>,
    pub heading_deg: Option<f64>,
    pub accuracy_m: Option<f64>,
    pub recorded_at: DateTime<Utc>,
    pub received_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewGpsFix {
    pub latitude: f64,
    pub longitude: f64,
    pub speed_kmh: Option<f64>,
    pub heading_deg: Option<f64>,
    pub accuracy_m: Option<f64>,
    pub recorded_at: DateTime<Utc>,
}

impl NewGpsFix {
    pub fn at(latitude: f64, longitude: f64, recorded_at: DateTime<Utc>) -> Self {
        Self {
            latitude,
            longitude,
            speed_kmh: None,
            heading_deg: None,
            accuracy_m: None,
            recorded_at,
        }
    }

    pub fn into_fix(self, id: Uuid, trip_id: Uuid, vehicle_id: Uuid, received_at: DateTime<Utc>) -> GpsFix {
        GpsFix {
            id,
            trip_id,
            vehicle_id,
            latitude: self.latitude,
            longitude: self.longitude,
            speed_kmh: self.speed_kmh,
            heading_deg: self.heading_deg,
            accuracy_m: self.accuracy_m,
            recorded_at: self.recorded_at,
            received_at,
        }
    }
}

/// Ordena una traza por momento de registro (empates por llegada)
pub fn sort_track(fixes: &mut [GpsFix]) {
    fixes.sort_by(|a, b| {
        a.recorded_at
            .cmp(&b.recorded_at)
            .then_with(|| a.received_at.cmp(&b.received_at))
    });
}

/// Fix almacenado y la ubicación de negocio a la que corresponde, si alguna
#[derive(Debug, Clone, Serialize)]
pub struct LocatedFix {
    pub fix: GpsFix,
    pub location: Option<Location>,
    pub distance_km: Option<f64>,
    /// `true` si la ubicación se creó a partir de este fix
    pub registered: bool,
}
