//! StatsAggregator
//!
//! Estadísticas de solo lectura calculadas bajo demanda sobre viajes
//! completados. La distancia de cada viaje usa el valor precalculado al
//! cerrarlo y, si falta, el odómetro o la traza GPS.

use futures::stream::{self, StreamExt, TryStreamExt};
use futures::FutureExt;
use num_traits::ToPrimitive;
use rust_decimal::Decimal;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::debug;
use uuid::Uuid;

use crate::models::activity::ActivityType;
use crate::models::stats::{DriverStats, FleetUtilization, LocationStats, VehicleStats};
use crate::models::trip::{Trip, TripFilter, TripState};
use crate::models::vehicle::VehicleState;
use crate::repositories::{ActivityRepo, LocationRepo, TripRepo, VehicleRepo};
use crate::utils::errors::{not_found_error, AppResult};

/// Trazas GPS leídas a la vez al resolver distancias
const TRACK_READ_CONCURRENCY: usize = 8;

pub struct StatsAggregator {
    vehicles: Arc<dyn VehicleRepo>,
    trips: Arc<dyn TripRepo>,
    activities: Arc<dyn ActivityRepo>,
    locations: Arc<dyn LocationRepo>,
}

/// Distancia y combustible de un viaje cerrado
struct TripTotals {
    distance_km: f64,
    fuel_liters: Decimal,
    activity_count: u64,
}

impl StatsAggregator {
    pub fn new(
        vehicles: Arc<dyn VehicleRepo>,
        trips: Arc<dyn TripRepo>,
        activities: Arc<dyn ActivityRepo>,
        locations: Arc<dyn LocationRepo>,
    ) -> Self {
        Self {
            vehicles,
            trips,
            activities,
            locations,
        }
    }

    async fn trip_distance_km(&self, trip: &Trip) -> AppResult<f64> {
        if trip.distance_km.is_some() || trip.odometer_distance_km().is_some() {
            return Ok(trip.resolved_distance_km(&[]));
        }
        let track = self.trips.list_gps(trip.id).await?;
        Ok(trip.resolved_distance_km(&track))
    }

    /// Totales de los viajes que cumplen el filtro. Combustible y
    /// actividades salen de consultas agrupadas; las trazas GPS solo se
    /// leen para viajes sin distancia resuelta, con concurrencia acotada.
    async fn completed_totals(&self, filter: TripFilter, with_activities: bool) -> AppResult<Vec<TripTotals>> {
        let trips = self.trips.list(&filter).await?;
        if trips.is_empty() {
            return Ok(Vec::new());
        }
        let ids: Vec<Uuid> = trips.iter().map(|t| t.id).collect();

        let fuel: HashMap<Uuid, Decimal> = self.trips.fuel_totals(&ids).await?.into_iter().collect();
        let activities: HashMap<Uuid, i64> = if with_activities {
            self.activities.count_by_trips(&ids).await?.into_iter().collect()
        } else {
            HashMap::new()
        };

        let distance_futures: Vec<_> = trips.iter().map(|trip| self.trip_distance_km(trip).boxed()).collect();
        let distances: Vec<f64> = stream::iter(distance_futures)
            .buffered(TRACK_READ_CONCURRENCY)
            .try_collect()
            .await?;

        Ok(trips
            .iter()
            .zip(distances)
            .map(|(trip, distance_km)| TripTotals {
                distance_km,
                fuel_liters: fuel.get(&trip.id).copied().unwrap_or(Decimal::ZERO),
                activity_count: activities.get(&trip.id).copied().unwrap_or(0) as u64,
            })
            .collect())
    }

    pub async fn vehicle_stats(&self, vehicle_id: Uuid) -> AppResult<VehicleStats> {
        if self.vehicles.find_by_id(vehicle_id).await?.is_none() {
            return Err(not_found_error("Vehicle", &vehicle_id.to_string()));
        }

        let totals = self
            .completed_totals(
                TripFilter {
                    vehicle_id: Some(vehicle_id),
                    ..TripFilter::completed()
                },
                false,
            )
            .await?;

        let total_distance_km: f64 = totals.iter().map(|t| t.distance_km).sum();
        let fuel: Decimal = totals.iter().map(|t| t.fuel_liters).sum();
        let fuel_consumed_liters = fuel.to_f64().unwrap_or(0.0);

        // Sin combustible registrado no hay eficiencia que reportar
        let fuel_efficiency_km_per_l = if fuel > Decimal::ZERO {
            Some(total_distance_km / fuel_consumed_liters)
        } else {
            None
        };

        debug!("📊 Stats vehículo {}: {} viajes", vehicle_id, totals.len());
        Ok(VehicleStats {
            vehicle_id,
            total_trips: totals.len() as u64,
            total_distance_km,
            fuel_consumed_liters,
            fuel_efficiency_km_per_l,
        })
    }

    pub async fn location_stats(&self, location_id: Uuid) -> AppResult<LocationStats> {
        if self.locations.find_by_id(location_id).await?.is_none() {
            return Err(not_found_error("Location", &location_id.to_string()));
        }

        let counts = self.activities.count_by_location(location_id).await?;
        let count_of = |wanted: ActivityType| {
            counts
                .iter()
                .filter(|(kind, _)| *kind == wanted)
                .map(|(_, n)| *n as u64)
                .sum()
        };

        Ok(LocationStats {
            location_id,
            loading_count: count_of(ActivityType::Loading),
            unloading_count: count_of(ActivityType::Unloading),
        })
    }

    pub async fn driver_stats(&self, driver_id: Uuid) -> AppResult<DriverStats> {
        let totals = self
            .completed_totals(
                TripFilter {
                    driver_id: Some(driver_id),
                    ..TripFilter::completed()
                },
                true,
            )
            .await?;

        Ok(DriverStats {
            driver_id,
            total_trips: totals.len() as u64,
            total_distance_km: totals.iter().map(|t| t.distance_km).sum(),
            activity_count: totals.iter().map(|t| t.activity_count).sum(),
        })
    }

    pub async fn fleet_utilization(&self) -> AppResult<FleetUtilization> {
        let in_progress_filter = TripFilter {
            state: Some(TripState::InProgress),
            ..Default::default()
        };
        let completed_filter = TripFilter::completed();

        let (counts, in_progress, completed) = tokio::try_join!(
            self.vehicles.count_by_state(),
            self.trips.list(&in_progress_filter),
            self.trips.list(&completed_filter),
        )?;

        let count_of = |wanted: VehicleState| -> u64 {
            counts
                .iter()
                .filter(|(state, _)| *state == wanted)
                .map(|(_, n)| *n as u64)
                .sum()
        };

        let available = count_of(VehicleState::Available);
        let allocated = count_of(VehicleState::Allocated);
        let maintenance = count_of(VehicleState::Maintenance);
        let retired = count_of(VehicleState::Retired);
        let total_vehicles = available + allocated + maintenance + retired;

        let active_fleet = total_vehicles - retired;
        let utilization_rate = if active_fleet > 0 {
            Some(allocated as f64 / active_fleet as f64)
        } else {
            None
        };

        Ok(FleetUtilization {
            total_vehicles,
            available,
            allocated,
            maintenance,
            retired,
            trips_in_progress: in_progress.len() as u64,
            completed_trips: completed.len() as u64,
            utilization_rate,
        })
    }
}
