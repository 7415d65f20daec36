//! Modelo de Trip
//!
//! Un viaje es la asignación de un vehículo y un chofer desde el despacho
//! hasta el cierre. Es dueño de sus actividades, fixes GPS y cargas de
//! combustible. Una vez COMPLETED o CANCELLED es inmutable.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, Type};
use uuid::Uuid;

use num_traits::ToPrimitive;

use super::activity::Activity;
use super::fuel::FuelRecord;
use super::gps::GpsFix;
use crate::utils::geo_math::path_length_km;

/// Estado del viaje - mapea al ENUM trip_state
#[derive(Debug, Clone, Copy, Serialize, Deserialize, Type, PartialEq, Eq, Hash)]
#[sqlx(type_name = "trip_state", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum TripState {
    Planned,
    InProgress,
    Completed,
    Cancelled,
}

impl TripState {
    pub fn as_str(&self) -> &'static str {
        match self {
            TripState::Planned => "planned",
            TripState::InProgress => "in_progress",
            TripState::Completed => "completed",
            TripState::Cancelled => "cancelled",
        }
    }

    pub fn is_closed(&self) -> bool {
        matches!(self, TripState::Completed | TripState::Cancelled)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Trip {
    pub id: Uuid,
    pub vehicle_id: Uuid,
    pub driver_id: Uuid,
    pub state: TripState,
    pub planned_start: DateTime<Utc>,
    pub planned_end: Option<DateTime<Utc>>,
    pub actual_start: Option<DateTime<Utc>>,
    pub actual_end: Option<DateTime<Utc>>,
    pub start_odometer_km: Decimal,
    pub end_odometer_km: Option<Decimal>,
    pub start_fuel_level_l: Option<Decimal>,
    pub end_fuel_level_l: Option<Decimal>,
    /// Precalculado al cerrar (best-effort); puede faltar y recalcularse
    pub distance_km: Option<f64>,
    pub notes: Option<String>,
    pub cancel_reason: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Trip {
    /// Diferencia de odómetro, si hay lectura final y no retrocede
    pub fn odometer_distance_km(&self) -> Option<f64> {
        let end = self.end_odometer_km?;
        if end < self.start_odometer_km {
            return None;
        }
        (end - self.start_odometer_km).to_f64()
    }

    /// Distancia del viaje: precalculada, si no odómetro, si no longitud
    /// de la traza GPS (`track` ya ordenada por `recorded_at`)
    pub fn resolved_distance_km(&self, track: &[GpsFix]) -> f64 {
        if let Some(distance) = self.distance_km {
            return distance;
        }
        if let Some(distance) = self.odometer_distance_km() {
            return distance;
        }
        let points: Vec<(f64, f64)> = track.iter().map(|f| (f.latitude, f.longitude)).collect();
        path_length_km(&points)
    }
}

/// Comando de inicio de viaje
#[derive(Debug, Clone)]
pub struct StartTrip {
    pub vehicle_id: Uuid,
    pub driver_id: Option<Uuid>,
    pub planned_start: Option<DateTime<Utc>>,
    pub planned_end: Option<DateTime<Utc>>,
    pub notes: Option<String>,
}

/// Comando de fin de viaje
#[derive(Debug, Clone, Default)]
pub struct EndTrip {
    pub actual_end: Option<DateTime<Utc>>,
    pub end_odometer_km: Option<Decimal>,
    pub end_fuel_level_l: Option<Decimal>,
    pub notes: Option<String>,
}

/// Datos escritos en la transición de cierre
#[derive(Debug, Clone)]
pub struct TripClosure {
    pub closed_at: DateTime<Utc>,
    pub end_odometer_km: Option<Decimal>,
    pub end_fuel_level_l: Option<Decimal>,
    pub notes: Option<String>,
    pub cancel_reason: Option<String>,
}

/// Resultado de una escritura condicionada al estado del viaje.
///
/// El store comprueba el estado dentro de la misma transacción (o del
/// mismo lock por viaje) que escribe, y reporta el hecho; el servicio
/// decide el error.
#[derive(Debug, Clone)]
pub enum GuardedWrite<T> {
    Written(T),
    TripMissing,
    TripState(TripState),
}

/// Filtros para listar viajes
#[derive(Debug, Clone, Default)]
pub struct TripFilter {
    pub vehicle_id: Option<Uuid>,
    pub driver_id: Option<Uuid>,
    pub state: Option<TripState>,
    pub started_after: Option<DateTime<Utc>>,
    pub started_before: Option<DateTime<Utc>>,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

impl TripFilter {
    pub fn completed() -> Self {
        Self {
            state: Some(TripState::Completed),
            ..Default::default()
        }
    }

    pub fn matches(&self, trip: &Trip) -> bool {
        self.vehicle_id.map_or(true, |v| trip.vehicle_id == v)
            && self.driver_id.map_or(true, |d| trip.driver_id == d)
            && self.state.map_or(true, |s| trip.state == s)
            && self.started_after.map_or(true, |t| trip.planned_start >= t)
            && self.started_before.map_or(true, |t| trip.planned_start < t)
    }
}

/// Vista completa de un viaje con su ledger
#[derive(Debug, Clone, Serialize)]
pub struct TripDetail {
    pub trip: Trip,
    pub activities: Vec<Activity>,
    pub fuel_records: Vec<FuelRecord>,
    pub gps_fix_count: usize,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::gps::NewGpsFix;
    use chrono::{Duration, TimeZone};

    fn closed_trip(start_km: i64, end_km: Option<i64>) -> Trip {
        let at = Utc.with_ymd_and_hms(2025, 2, 1, 7, 0, 0).unwrap();
        Trip {
            id: Uuid::new_v4(),
            vehicle_id: Uuid::new_v4(),
            driver_id: Uuid::new_v4(),
            state: TripState::Completed,
            planned_start: at,
            planned_end: None,
            actual_start: Some(at),
            actual_end: Some(at + Duration::hours(3)),
            start_odometer_km: Decimal::from(start_km),
            end_odometer_km: end_km.map(Decimal::from),
            start_fuel_level_l: None,
            end_fuel_level_l: None,
            distance_km: None,
            notes: None,
            cancel_reason: None,
            created_at: at,
            updated_at: at,
        }
    }

    #[test]
    fn test_distance_prefers_precomputed_then_odometer() {
        let mut trip = closed_trip(1000, Some(1120));
        assert_eq!(trip.resolved_distance_km(&[]), 120.0);

        trip.distance_km = Some(118.5);
        assert_eq!(trip.resolved_distance_km(&[]), 118.5);
    }

    #[test]
    fn test_odometer_rollback_falls_back_to_track() {
        let trip = closed_trip(1000, Some(900));
        assert_eq!(trip.odometer_distance_km(), None);

        let at = trip.planned_start;
        let track: Vec<GpsFix> = [(35.0, 139.0), (35.01, 139.0)]
            .iter()
            .enumerate()
            .map(|(i, &(lat, lon))| {
                NewGpsFix::at(lat, lon, at + Duration::minutes(i as i64)).into_fix(
                    Uuid::new_v4(),
                    trip.id,
                    trip.vehicle_id,
                    at,
                )
            })
            .collect();

        let distance = trip.resolved_distance_km(&track);
        assert!((distance - 1.112).abs() < 0.01, "distance = {}", distance);
    }

    #[test]
    fn test_filter_matches_state_and_driver() {
        let trip = closed_trip(0, None);
        assert!(TripFilter::completed().matches(&trip));

        let other_driver = TripFilter {
            driver_id: Some(Uuid::new_v4()),
            ..Default::default()
        };
        assert!(!other_driver.matches(&trip));
    }
}
