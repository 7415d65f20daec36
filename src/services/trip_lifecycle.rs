//! TripLifecycle
//!
//! Máquina de estados del viaje: PLANNED -> IN_PROGRESS -> COMPLETED,
//! y PLANNED | IN_PROGRESS -> CANCELLED. Coordina el allocator (asignar
//! y liberar el vehículo), el ledger de actividades, la telemetría GPS y
//! las cargas de combustible.
//!
//! Cada escritura sobre un viaje la condiciona el store al estado del
//! viaje en ese mismo instante; aquí solo se traduce el resultado.

use std::sync::Arc;
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::models::activity::{Activity, NewActivity};
use crate::models::caller::CallerIdentity;
use crate::models::fuel::{FuelRecord, NewFuelRecord};
use crate::models::gps::{GpsFix, LocatedFix, NewGpsFix};
use crate::models::location::RegistrationCandidate;
use crate::models::trip::{
    EndTrip, GuardedWrite, StartTrip, Trip, TripClosure, TripDetail, TripFilter, TripState,
};
use crate::repositories::{TripRepo, VehicleRepo};
use crate::services::activity_ledger::ActivityLedger;
use crate::services::authorization::{ensure_can_operate_trip, ensure_can_start_for};
use crate::services::clock::Clock;
use crate::services::location_index::LocationIndex;
use crate::services::vehicle_allocator::VehicleAllocator;
use crate::utils::errors::{invalid_input_error, invalid_state_error, not_found_error, AppError, AppResult};
use crate::utils::validation::ensure_coordinates;

#[derive(Clone)]
pub struct TripLifecycle {
    trips: Arc<dyn TripRepo>,
    vehicles: Arc<dyn VehicleRepo>,
    allocator: Arc<VehicleAllocator>,
    ledger: Arc<ActivityLedger>,
    locations: Arc<LocationIndex>,
    clock: Arc<dyn Clock>,
}

fn guarded<T>(trip_id: Uuid, operation: &str, written: GuardedWrite<T>) -> AppResult<T> {
    match written {
        GuardedWrite::Written(value) => Ok(value),
        GuardedWrite::TripMissing => Err(not_found_error("Trip", &trip_id.to_string())),
        GuardedWrite::TripState(state) => Err(invalid_state_error(
            "Trip",
            &trip_id.to_string(),
            state.as_str(),
            operation,
        )),
    }
}

impl TripLifecycle {
    pub fn new(
        trips: Arc<dyn TripRepo>,
        vehicles: Arc<dyn VehicleRepo>,
        allocator: Arc<VehicleAllocator>,
        ledger: Arc<ActivityLedger>,
        locations: Arc<LocationIndex>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            trips,
            vehicles,
            allocator,
            ledger,
            locations,
            clock,
        }
    }

    async fn load(&self, trip_id: Uuid) -> AppResult<Trip> {
        self.trips
            .find_by_id(trip_id)
            .await?
            .ok_or_else(|| not_found_error("Trip", &trip_id.to_string()))
    }

    /// Carga el viaje comprobando que el llamante puede operar sobre él
    pub async fn authorize(&self, caller: &CallerIdentity, trip_id: Uuid) -> AppResult<Trip> {
        let trip = self.load(trip_id).await?;
        ensure_can_operate_trip(caller, trip.driver_id)?;
        Ok(trip)
    }

    /// Despacha un viaje: asigna el vehículo y deja el viaje IN_PROGRESS
    ///
    /// La asignación y el alta corren en una tarea propia: si la request se
    /// cancela (cliente desconectado, timeout) el viaje igual termina escrito
    /// o compensado, nunca con el vehículo retenido por un viaje inexistente.
    pub async fn start(&self, caller: &CallerIdentity, cmd: StartTrip) -> AppResult<Trip> {
        let lifecycle = self.clone();
        let caller = caller.clone();
        tokio::spawn(async move { lifecycle.dispatch(&caller, cmd).await })
            .await
            .map_err(|e| AppError::Internal(format!("Trip start task failed: {}", e)))?
    }

    async fn dispatch(&self, caller: &CallerIdentity, cmd: StartTrip) -> AppResult<Trip> {
        let driver_id = cmd
            .driver_id
            .ok_or_else(|| invalid_input_error("driver_id is required"))?;
        ensure_can_start_for(caller, driver_id)?;

        let now = self.clock.now();
        let planned_start = cmd.planned_start.unwrap_or(now);
        if let Some(planned_end) = cmd.planned_end {
            if planned_end < planned_start {
                return Err(invalid_input_error("planned_end must not be before planned_start"));
            }
        }

        if let Some(current) = self.current_trip_for(driver_id).await? {
            return Err(AppError::Unavailable(format!(
                "Driver '{}' already has trip '{}' in progress",
                driver_id, current.id
            )));
        }

        let trip_id = Uuid::new_v4();
        let (_token, vehicle) = self.allocator.acquire_vehicle(cmd.vehicle_id, trip_id).await?;

        let trip = Trip {
            id: trip_id,
            vehicle_id: vehicle.id,
            driver_id,
            state: TripState::InProgress,
            planned_start,
            planned_end: cmd.planned_end,
            actual_start: Some(now),
            actual_end: None,
            start_odometer_km: vehicle.odometer_km,
            end_odometer_km: None,
            start_fuel_level_l: vehicle.fuel_level_l,
            end_fuel_level_l: None,
            distance_km: None,
            notes: cmd.notes,
            cancel_reason: None,
            created_at: now,
            updated_at: now,
        };

        match self.trips.insert(&trip).await {
            Ok(stored) => {
                info!(
                    "🚀 Viaje {} iniciado: vehículo {} ({}), chofer {}",
                    stored.id, vehicle.plate_number, vehicle.id, driver_id
                );
                Ok(stored)
            }
            Err(e) => {
                warn!("↩️ No se pudo guardar el viaje {}, se libera el vehículo: {}", trip_id, e);
                if let Err(release_err) = self.allocator.release_held_by(vehicle.id, trip_id).await {
                    error!(
                        "❌ Compensación fallida: vehículo {} sigue asignado al viaje {}: {}",
                        vehicle.id, trip_id, release_err
                    );
                }
                Err(e)
            }
        }
    }

    pub async fn record_activity(&self, trip_id: Uuid, draft: NewActivity) -> AppResult<Activity> {
        self.ledger.record(trip_id, draft).await
    }

    pub async fn list_activities(&self, trip_id: Uuid) -> AppResult<Vec<Activity>> {
        self.ledger.list_by_trip(trip_id).await
    }

    /// Guarda un fix tal cual llega; no se rechaza por orden ni se suaviza
    pub async fn ingest_gps(&self, trip_id: Uuid, fix: NewGpsFix) -> AppResult<GpsFix> {
        let mut stored = self.ingest_gps_batch(trip_id, vec![fix]).await?;
        stored
            .pop()
            .ok_or_else(|| AppError::Internal("GPS batch of one returned no fix".to_string()))
    }

    /// Lote de fixes acumulados por el dispositivo; todo o nada
    pub async fn ingest_gps_batch(&self, trip_id: Uuid, fixes: Vec<NewGpsFix>) -> AppResult<Vec<GpsFix>> {
        if fixes.is_empty() {
            return Err(invalid_input_error("GPS batch must contain at least one fix"));
        }
        for fix in &fixes {
            ensure_coordinates(fix.latitude, fix.longitude)?;
        }

        let trip = self.load(trip_id).await?;
        let received_at = self.clock.now();
        let fixes: Vec<GpsFix> = fixes
            .into_iter()
            .map(|f| f.into_fix(Uuid::new_v4(), trip.id, trip.vehicle_id, received_at))
            .collect();

        let count = guarded(trip_id, "ingest GPS for", self.trips.append_gps(trip_id, &fixes).await?)?;
        tracing::debug!("🛰️ {} fixes GPS guardados en el viaje {}", count, trip_id);

        Ok(fixes)
    }

    /// Guarda el fix y lo asocia a la ubicación más cercana dentro del
    /// radio de auto-registro; con `registration`, crea la ubicación si no hay ninguna
    pub async fn locate_fix(
        &self,
        trip_id: Uuid,
        fix: NewGpsFix,
        registration: Option<RegistrationCandidate>,
    ) -> AppResult<LocatedFix> {
        let fix = self.ingest_gps(trip_id, fix).await?;

        match registration {
            Some(candidate) => {
                let registered = self
                    .locations
                    .auto_register(fix.latitude, fix.longitude, &candidate)
                    .await?;
                Ok(LocatedFix {
                    fix,
                    location: Some(registered.location),
                    distance_km: registered.distance_km,
                    registered: registered.created,
                })
            }
            None => {
                let nearest = self.locations.match_fix(fix.latitude, fix.longitude).await?;
                let (location, distance_km) = match nearest {
                    Some(n) => (Some(n.location), Some(n.distance_km)),
                    None => (None, None),
                };
                Ok(LocatedFix {
                    fix,
                    location,
                    distance_km,
                    registered: false,
                })
            }
        }
    }

    /// Traza ordenada por `recorded_at`
    pub async fn gps_track(&self, trip_id: Uuid) -> AppResult<Vec<GpsFix>> {
        self.load(trip_id).await?;
        self.trips.list_gps(trip_id).await
    }

    pub async fn record_fuel(&self, trip_id: Uuid, record: NewFuelRecord) -> AppResult<FuelRecord> {
        if record.amount_liters <= rust_decimal::Decimal::ZERO {
            return Err(invalid_input_error("amount_liters must be positive"));
        }
        if record.cost.map_or(false, |c| c.is_sign_negative() && !c.is_zero()) {
            return Err(invalid_input_error("cost must not be negative"));
        }

        let trip = self.load(trip_id).await?;
        let record = record.into_record(Uuid::new_v4(), trip.id, trip.vehicle_id, self.clock.now());

        let stored = guarded(trip_id, "record fuel for", self.trips.append_fuel(&record).await?)?;
        info!("⛽ {} L registrados en el viaje {}", stored.amount_liters, trip_id);
        Ok(stored)
    }

    /// IN_PROGRESS -> COMPLETED, libera el vehículo y precalcula agregados
    pub async fn end(&self, trip_id: Uuid, cmd: EndTrip) -> AppResult<Trip> {
        let trip = self.load(trip_id).await?;
        if trip.state != TripState::InProgress {
            return Err(invalid_state_error("Trip", &trip_id.to_string(), trip.state.as_str(), "end"));
        }

        let closed_at = cmd.actual_end.unwrap_or_else(|| self.clock.now());
        if trip.actual_start.map_or(false, |started| closed_at < started) {
            return Err(invalid_input_error("actual_end must not be before actual_start"));
        }
        if cmd.end_odometer_km.map_or(false, |end| end < trip.start_odometer_km) {
            return Err(invalid_input_error(format!(
                "end_odometer_km must not be below the start reading ({})",
                trip.start_odometer_km
            )));
        }

        let closure = TripClosure {
            closed_at,
            end_odometer_km: cmd.end_odometer_km,
            end_fuel_level_l: cmd.end_fuel_level_l,
            notes: cmd.notes,
            cancel_reason: None,
        };
        let completed = guarded(trip_id, "end", self.trips.complete(trip_id, &closure).await?)?;

        self.release_vehicle(&completed).await;
        info!("🏁 Viaje {} completado", trip_id);

        Ok(self.finalize(completed).await)
    }

    /// PLANNED | IN_PROGRESS -> CANCELLED, libera el vehículo si lo retenía
    pub async fn cancel(&self, trip_id: Uuid, reason: Option<String>) -> AppResult<Trip> {
        let closure = TripClosure {
            closed_at: self.clock.now(),
            end_odometer_km: None,
            end_fuel_level_l: None,
            notes: None,
            cancel_reason: reason.map(|r| r.trim().to_string()).filter(|r| !r.is_empty()),
        };
        let cancelled = guarded(trip_id, "cancel", self.trips.cancel(trip_id, &closure).await?)?;

        self.release_vehicle(&cancelled).await;
        info!("🚫 Viaje {} cancelado", trip_id);

        Ok(cancelled)
    }

    /// El viaje ya está cerrado: un fallo aquí se registra pero no deshace el cierre
    async fn release_vehicle(&self, trip: &Trip) {
        if let Err(e) = self.allocator.release_held_by(trip.vehicle_id, trip.id).await {
            error!(
                "❌ Viaje {} cerrado pero el vehículo {} no se pudo liberar: {}",
                trip.id, trip.vehicle_id, e
            );
        }
    }

    /// Distancia del viaje y últimas lecturas del vehículo (best-effort)
    async fn finalize(&self, mut trip: Trip) -> Trip {
        match self.precompute(&trip).await {
            Ok(distance_km) => trip.distance_km = Some(distance_km),
            Err(e) => warn!("⚠️ Finalización incompleta del viaje {}: {}", trip.id, e),
        }
        trip
    }

    async fn precompute(&self, trip: &Trip) -> AppResult<f64> {
        let track = if trip.odometer_distance_km().is_some() {
            Vec::new()
        } else {
            self.trips.list_gps(trip.id).await?
        };
        let distance_km = trip.resolved_distance_km(&track);
        self.trips.set_distance(trip.id, distance_km).await?;

        if trip.end_odometer_km.is_some() || trip.end_fuel_level_l.is_some() {
            self.vehicles
                .update_readings(
                    trip.vehicle_id,
                    trip.end_odometer_km,
                    trip.end_fuel_level_l,
                    self.clock.now(),
                )
                .await?;
        }

        Ok(distance_km)
    }

    /// Viaje en curso del chofer; más de uno es un estado corrupto
    pub async fn current_trip_for(&self, driver_id: Uuid) -> AppResult<Option<Trip>> {
        let mut in_progress = self.trips.find_in_progress_by_driver(driver_id).await?;

        if in_progress.len() > 1 {
            let ids: Vec<String> = in_progress.iter().map(|t| t.id.to_string()).collect();
            error!(
                "💥 Chofer {} con {} viajes en curso: {}",
                driver_id,
                in_progress.len(),
                ids.join(", ")
            );
            return Err(AppError::Invariant(format!(
                "driver '{}' has {} trips in progress",
                driver_id,
                in_progress.len()
            )));
        }

        Ok(in_progress.pop())
    }

    pub async fn get(&self, trip_id: Uuid) -> AppResult<TripDetail> {
        let trip = self.load(trip_id).await?;

        let (activities, fuel_records, gps_fix_count) = tokio::try_join!(
            self.ledger.list_by_trip(trip_id),
            self.trips.list_fuel(trip_id),
            self.trips.count_gps(trip_id),
        )?;

        Ok(TripDetail {
            trip,
            activities,
            fuel_records,
            gps_fix_count,
        })
    }

    pub async fn list(&self, filter: &TripFilter) -> AppResult<Vec<Trip>> {
        self.trips.list(filter).await
    }
}
