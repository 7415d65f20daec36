//! Store en memoria
//!
//! Implementa los cuatro repositorios sobre mapas protegidos con locks de
//! tokio. Se usa con `STORAGE_BACKEND=memory` y en los tests.
//!
//! Orden de locks: nunca se espera un lock de registro con un mapa tomado
//! (se clona el `Arc` y se suelta el mapa). Un cierre de viaje toma
//! registro -> holds; un alta toma holds -> mapa de viajes.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{Mutex, RwLock};
use uuid::Uuid;

use super::{ActivityRepo, LocationRepo, TripRepo, VehicleRepo};
use crate::models::{
    activity::{Activity, ActivityType, NewActivity},
    fuel::FuelRecord,
    gps::{sort_track, GpsFix},
    location::{Location, LocationType},
    trip::{GuardedWrite, Trip, TripClosure, TripFilter, TripState},
    vehicle::{AllocateOutcome, TransitionOutcome, Vehicle, VehicleState},
};
use crate::utils::errors::{duplicate_error, AppError, AppResult};
use crate::utils::geo_math::BoundingBox;

/// Viaje con su ledger; el mutex del registro serializa las escrituras del viaje
#[derive(Debug)]
struct TripRecord {
    trip: Trip,
    activities: Vec<Activity>,
    gps: Vec<GpsFix>,
    fuel: Vec<FuelRecord>,
}

/// Viajes IN_PROGRESS por chofer y por vehículo
#[derive(Debug, Default)]
struct InProgressHolds {
    by_driver: HashMap<Uuid, Uuid>,
    by_vehicle: HashMap<Uuid, Uuid>,
}

impl InProgressHolds {
    fn clear_for(&mut self, trip: &Trip) {
        if self.by_driver.get(&trip.driver_id) == Some(&trip.id) {
            self.by_driver.remove(&trip.driver_id);
        }
        if self.by_vehicle.get(&trip.vehicle_id) == Some(&trip.id) {
            self.by_vehicle.remove(&trip.vehicle_id);
        }
    }
}

#[derive(Default)]
pub struct MemoryStore {
    vehicles: RwLock<HashMap<Uuid, Arc<Mutex<Vehicle>>>>,
    trips: RwLock<HashMap<Uuid, Arc<Mutex<TripRecord>>>>,
    holds: Mutex<InProgressHolds>,
    locations: RwLock<HashMap<Uuid, Location>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Carga un viaje histórico tal cual, sin comprobar unicidad.
    /// Útil para sembrar datos (migraciones, tests).
    pub async fn import_trip(&self, trip: Trip) {
        let record = TripRecord {
            trip,
            activities: Vec::new(),
            gps: Vec::new(),
            fuel: Vec::new(),
        };
        let id = record.trip.id;
        self.trips.write().await.insert(id, Arc::new(Mutex::new(record)));
    }

    async fn vehicle(&self, id: Uuid) -> Option<Arc<Mutex<Vehicle>>> {
        self.vehicles.read().await.get(&id).cloned()
    }

    async fn trip_record(&self, id: Uuid) -> Option<Arc<Mutex<TripRecord>>> {
        self.trips.read().await.get(&id).cloned()
    }

    async fn all_trip_records(&self) -> Vec<Arc<Mutex<TripRecord>>> {
        self.trips.read().await.values().cloned().collect()
    }

    async fn close_trip(
        &self,
        id: Uuid,
        allowed: &[TripState],
        apply: impl FnOnce(&mut Trip),
    ) -> AppResult<GuardedWrite<Trip>> {
        let record = match self.trip_record(id).await {
            Some(record) => record,
            None => return Ok(GuardedWrite::TripMissing),
        };

        let mut record = record.lock().await;
        if !allowed.contains(&record.trip.state) {
            return Ok(GuardedWrite::TripState(record.trip.state));
        }

        apply(&mut record.trip);
        self.holds.lock().await.clear_for(&record.trip);

        Ok(GuardedWrite::Written(record.trip.clone()))
    }
}

#[async_trait]
impl VehicleRepo for MemoryStore {
    async fn insert(&self, vehicle: &Vehicle) -> AppResult<Vehicle> {
        let mut vehicles = self.vehicles.write().await;

        for existing in vehicles.values() {
            if existing.lock().await.plate_number == vehicle.plate_number {
                return Err(duplicate_error("Vehicle", "plate_number", &vehicle.plate_number));
            }
        }

        vehicles.insert(vehicle.id, Arc::new(Mutex::new(vehicle.clone())));
        Ok(vehicle.clone())
    }

    async fn find_by_id(&self, id: Uuid) -> AppResult<Option<Vehicle>> {
        match self.vehicle(id).await {
            Some(vehicle) => Ok(Some(vehicle.lock().await.clone())),
            None => Ok(None),
        }
    }

    async fn try_allocate(&self, id: Uuid, trip_id: Uuid, now: DateTime<Utc>) -> AppResult<AllocateOutcome> {
        let Some(vehicle) = self.vehicle(id).await else {
            return Ok(AllocateOutcome::Missing);
        };

        let mut vehicle = vehicle.lock().await;
        if vehicle.state != VehicleState::Available {
            return Ok(AllocateOutcome::NotAvailable(vehicle.state));
        }

        vehicle.state = VehicleState::Allocated;
        vehicle.current_trip_id = Some(trip_id);
        vehicle.updated_at = now;

        Ok(AllocateOutcome::Allocated(vehicle.clone()))
    }

    async fn release(&self, id: Uuid, holder: Option<Uuid>, now: DateTime<Utc>) -> AppResult<Option<Vehicle>> {
        let Some(vehicle) = self.vehicle(id).await else {
            return Ok(None);
        };

        let mut vehicle = vehicle.lock().await;
        let held_by_caller = holder.map_or(true, |trip_id| vehicle.current_trip_id == Some(trip_id));
        if vehicle.state != VehicleState::Allocated || !held_by_caller {
            return Ok(None);
        }

        vehicle.state = VehicleState::Available;
        vehicle.current_trip_id = None;
        vehicle.updated_at = now;

        Ok(Some(vehicle.clone()))
    }

    async fn transition(
        &self,
        id: Uuid,
        from: &[VehicleState],
        to: VehicleState,
        now: DateTime<Utc>,
    ) -> AppResult<TransitionOutcome> {
        let Some(vehicle) = self.vehicle(id).await else {
            return Ok(TransitionOutcome::Missing);
        };

        let mut vehicle = vehicle.lock().await;
        if !from.contains(&vehicle.state) {
            return Ok(TransitionOutcome::Rejected(vehicle.state));
        }

        vehicle.state = to;
        vehicle.updated_at = now;

        Ok(TransitionOutcome::Applied(vehicle.clone()))
    }

    async fn update_readings(
        &self,
        id: Uuid,
        odometer_km: Option<Decimal>,
        fuel_level_l: Option<Decimal>,
        now: DateTime<Utc>,
    ) -> AppResult<()> {
        if let Some(vehicle) = self.vehicle(id).await {
            let mut vehicle = vehicle.lock().await;
            if let Some(odometer) = odometer_km {
                vehicle.odometer_km = odometer;
            }
            if let Some(fuel) = fuel_level_l {
                vehicle.fuel_level_l = Some(fuel);
            }
            vehicle.updated_at = now;
        }
        Ok(())
    }

    async fn count_by_state(&self) -> AppResult<Vec<(VehicleState, i64)>> {
        let vehicles: Vec<_> = self.vehicles.read().await.values().cloned().collect();

        let mut counts: HashMap<VehicleState, i64> = HashMap::new();
        for vehicle in vehicles {
            *counts.entry(vehicle.lock().await.state).or_insert(0) += 1;
        }

        Ok(counts.into_iter().collect())
    }
}

#[async_trait]
impl TripRepo for MemoryStore {
    async fn insert(&self, trip: &Trip) -> AppResult<Trip> {
        let mut holds = self.holds.lock().await;

        if trip.state == TripState::InProgress {
            if holds.by_driver.contains_key(&trip.driver_id) || holds.by_vehicle.contains_key(&trip.vehicle_id) {
                return Err(AppError::Unavailable(format!(
                    "Driver '{}' or vehicle '{}' already has a trip in progress",
                    trip.driver_id, trip.vehicle_id
                )));
            }
            holds.by_driver.insert(trip.driver_id, trip.id);
            holds.by_vehicle.insert(trip.vehicle_id, trip.id);
        }

        let record = TripRecord {
            trip: trip.clone(),
            activities: Vec::new(),
            gps: Vec::new(),
            fuel: Vec::new(),
        };
        self.trips.write().await.insert(trip.id, Arc::new(Mutex::new(record)));

        Ok(trip.clone())
    }

    async fn find_by_id(&self, id: Uuid) -> AppResult<Option<Trip>> {
        match self.trip_record(id).await {
            Some(record) => Ok(Some(record.lock().await.trip.clone())),
            None => Ok(None),
        }
    }

    async fn list(&self, filter: &TripFilter) -> AppResult<Vec<Trip>> {
        let mut trips = Vec::new();
        for record in self.all_trip_records().await {
            let record = record.lock().await;
            if filter.matches(&record.trip) {
                trips.push(record.trip.clone());
            }
        }

        trips.sort_by(|a, b| b.planned_start.cmp(&a.planned_start).then_with(|| a.id.cmp(&b.id)));

        let offset = filter.offset.unwrap_or(0).max(0) as usize;
        let limit = filter.limit.map(|l| l.max(0) as usize).unwrap_or(usize::MAX);

        Ok(trips.into_iter().skip(offset).take(limit).collect())
    }

    async fn find_in_progress_by_driver(&self, driver_id: Uuid) -> AppResult<Vec<Trip>> {
        let mut trips = Vec::new();
        for record in self.all_trip_records().await {
            let record = record.lock().await;
            if record.trip.driver_id == driver_id && record.trip.state == TripState::InProgress {
                trips.push(record.trip.clone());
            }
        }
        trips.sort_by_key(|t| t.created_at);
        Ok(trips)
    }

    async fn complete(&self, id: Uuid, closure: &TripClosure) -> AppResult<GuardedWrite<Trip>> {
        self.close_trip(id, &[TripState::InProgress], |trip| {
            trip.state = TripState::Completed;
            trip.actual_end = Some(closure.closed_at);
            if closure.end_odometer_km.is_some() {
                trip.end_odometer_km = closure.end_odometer_km;
            }
            if closure.end_fuel_level_l.is_some() {
                trip.end_fuel_level_l = closure.end_fuel_level_l;
            }
            if closure.notes.is_some() {
                trip.notes = closure.notes.clone();
            }
            trip.updated_at = closure.closed_at;
        })
        .await
    }

    async fn cancel(&self, id: Uuid, closure: &TripClosure) -> AppResult<GuardedWrite<Trip>> {
        self.close_trip(id, &[TripState::Planned, TripState::InProgress], |trip| {
            trip.state = TripState::Cancelled;
            trip.actual_end = Some(closure.closed_at);
            trip.cancel_reason = closure.cancel_reason.clone();
            trip.updated_at = closure.closed_at;
        })
        .await
    }

    async fn set_distance(&self, id: Uuid, distance_km: f64) -> AppResult<()> {
        if let Some(record) = self.trip_record(id).await {
            record.lock().await.trip.distance_km = Some(distance_km);
        }
        Ok(())
    }

    async fn append_gps(&self, trip_id: Uuid, fixes: &[GpsFix]) -> AppResult<GuardedWrite<usize>> {
        let Some(record) = self.trip_record(trip_id).await else {
            return Ok(GuardedWrite::TripMissing);
        };

        let mut record = record.lock().await;
        if record.trip.state.is_closed() {
            return Ok(GuardedWrite::TripState(record.trip.state));
        }

        record.gps.extend_from_slice(fixes);
        Ok(GuardedWrite::Written(fixes.len()))
    }

    async fn list_gps(&self, trip_id: Uuid) -> AppResult<Vec<GpsFix>> {
        let mut fixes = match self.trip_record(trip_id).await {
            Some(record) => record.lock().await.gps.clone(),
            None => Vec::new(),
        };
        sort_track(&mut fixes);
        Ok(fixes)
    }

    async fn count_gps(&self, trip_id: Uuid) -> AppResult<usize> {
        match self.trip_record(trip_id).await {
            Some(record) => Ok(record.lock().await.gps.len()),
            None => Ok(0),
        }
    }

    async fn append_fuel(&self, record: &FuelRecord) -> AppResult<GuardedWrite<FuelRecord>> {
        let Some(trip_record) = self.trip_record(record.trip_id).await else {
            return Ok(GuardedWrite::TripMissing);
        };

        let mut trip_record = trip_record.lock().await;
        if trip_record.trip.state != TripState::InProgress {
            return Ok(GuardedWrite::TripState(trip_record.trip.state));
        }

        trip_record.fuel.push(record.clone());
        Ok(GuardedWrite::Written(record.clone()))
    }

    async fn list_fuel(&self, trip_id: Uuid) -> AppResult<Vec<FuelRecord>> {
        let mut records = match self.trip_record(trip_id).await {
            Some(record) => record.lock().await.fuel.clone(),
            None => Vec::new(),
        };
        records.sort_by(|a, b| a.recorded_at.cmp(&b.recorded_at).then_with(|| a.created_at.cmp(&b.created_at)));
        Ok(records)
    }

    async fn fuel_totals(&self, trip_ids: &[Uuid]) -> AppResult<Vec<(Uuid, Decimal)>> {
        let mut totals: Vec<(Uuid, Decimal)> = Vec::new();
        for trip_id in trip_ids {
            if let Some(record) = self.trip_record(*trip_id).await {
                let record = record.lock().await;
                if !record.fuel.is_empty() {
                    totals.push((*trip_id, record.fuel.iter().map(|f| f.amount_liters).sum()));
                }
            }
        }
        Ok(totals)
    }
}

#[async_trait]
impl ActivityRepo for MemoryStore {
    async fn append_sequenced(
        &self,
        trip_id: Uuid,
        draft: NewActivity,
        now: DateTime<Utc>,
    ) -> AppResult<GuardedWrite<Activity>> {
        let Some(record) = self.trip_record(trip_id).await else {
            return Ok(GuardedWrite::TripMissing);
        };

        let mut record = record.lock().await;
        if record.trip.state != TripState::InProgress {
            return Ok(GuardedWrite::TripState(record.trip.state));
        }

        let next = record.activities.last().map_or(1, |a| a.sequence_number + 1);
        let activity = draft.into_activity(Uuid::new_v4(), trip_id, next, now);
        record.activities.push(activity.clone());

        Ok(GuardedWrite::Written(activity))
    }

    async fn next_sequence_number(&self, trip_id: Uuid) -> AppResult<i32> {
        match self.trip_record(trip_id).await {
            Some(record) => Ok(record.lock().await.activities.last().map_or(1, |a| a.sequence_number + 1)),
            None => Ok(1),
        }
    }

    async fn list_by_trip(&self, trip_id: Uuid) -> AppResult<Vec<Activity>> {
        match self.trip_record(trip_id).await {
            Some(record) => Ok(record.lock().await.activities.clone()),
            None => Ok(Vec::new()),
        }
    }

    async fn count_by_location(&self, location_id: Uuid) -> AppResult<Vec<(ActivityType, i64)>> {
        let mut counts: HashMap<ActivityType, i64> = HashMap::new();

        for record in self.all_trip_records().await {
            let record = record.lock().await;
            if record.trip.state != TripState::Completed {
                continue;
            }
            for activity in record.activities.iter().filter(|a| a.location_id == location_id) {
                *counts.entry(activity.activity_type).or_insert(0) += 1;
            }
        }

        Ok(counts.into_iter().collect())
    }

    async fn count_by_trips(&self, trip_ids: &[Uuid]) -> AppResult<Vec<(Uuid, i64)>> {
        let mut counts: Vec<(Uuid, i64)> = Vec::new();
        for trip_id in trip_ids {
            if let Some(record) = self.trip_record(*trip_id).await {
                let record = record.lock().await;
                if !record.activities.is_empty() {
                    counts.push((*trip_id, record.activities.len() as i64));
                }
            }
        }
        Ok(counts)
    }
}

#[async_trait]
impl LocationRepo for MemoryStore {
    async fn insert(&self, location: &Location) -> AppResult<Location> {
        let mut locations = self.locations.write().await;

        let taken = locations
            .values()
            .any(|l| l.is_active && l.identity() == location.identity());
        if taken {
            return Err(duplicate_error(
                "Location",
                "name/client_name/address",
                &format!("{} / {} / {}", location.name, location.client_name, location.address),
            ));
        }

        locations.insert(location.id, location.clone());
        Ok(location.clone())
    }

    async fn find_by_id(&self, id: Uuid) -> AppResult<Option<Location>> {
        Ok(self.locations.read().await.get(&id).cloned())
    }

    async fn find_active_by_identity(
        &self,
        name: &str,
        client_name: &str,
        address: &str,
    ) -> AppResult<Option<Location>> {
        Ok(self
            .locations
            .read()
            .await
            .values()
            .find(|l| l.is_active && l.identity() == (name, client_name, address))
            .cloned())
    }

    async fn find_active_at(&self, name: &str, latitude: f64, longitude: f64) -> AppResult<Option<Location>> {
        Ok(self
            .locations
            .read()
            .await
            .values()
            .filter(|l| l.is_active && l.name == name && l.latitude == latitude && l.longitude == longitude)
            .min_by(|a, b| a.created_at.cmp(&b.created_at).then_with(|| a.id.cmp(&b.id)))
            .cloned())
    }

    async fn find_active_in_bounds(&self, bbox: &BoundingBox) -> AppResult<Vec<Location>> {
        Ok(self
            .locations
            .read()
            .await
            .values()
            .filter(|l| l.is_active && bbox.contains(l.latitude, l.longitude))
            .cloned()
            .collect())
    }

    async fn search_active(
        &self,
        query: &str,
        location_type: Option<LocationType>,
        limit: usize,
    ) -> AppResult<Vec<Location>> {
        let needle = query.to_lowercase();

        let mut found: Vec<Location> = self
            .locations
            .read()
            .await
            .values()
            .filter(|l| l.is_active)
            .filter(|l| l.name.to_lowercase().contains(&needle) || l.client_name.to_lowercase().contains(&needle))
            .filter(|l| location_type.map_or(true, |wanted| l.location_type.satisfies(wanted)))
            .cloned()
            .collect();

        // Igual que `ORDER BY lower(name) COLLATE "C", name COLLATE "C"` en Postgres
        found.sort_by(|a, b| {
            a.name
                .to_lowercase()
                .cmp(&b.name.to_lowercase())
                .then_with(|| a.name.cmp(&b.name))
                .then_with(|| a.created_at.cmp(&b.created_at))
                .then_with(|| a.id.cmp(&b.id))
        });
        found.truncate(limit);

        Ok(found)
    }

    async fn deactivate(&self, id: Uuid, now: DateTime<Utc>) -> AppResult<Option<bool>> {
        let mut locations = self.locations.write().await;

        Ok(locations.get_mut(&id).map(|location| {
            if !location.is_active {
                return false;
            }
            location.is_active = false;
            location.updated_at = now;
            true
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{
        location::NewLocation,
        vehicle::{FuelType, NewVehicle},
    };
    use chrono::TimeZone;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 3, 1, 8, 0, 0).unwrap()
    }

    fn truck(plate: &str) -> Vehicle {
        Vehicle::from_new(
            Uuid::new_v4(),
            NewVehicle {
                plate_number: plate.to_string(),
                capacity_tonnes: Decimal::from(25),
                fuel_type: FuelType::Diesel,
                odometer_km: Decimal::from(1000),
                fuel_level_l: Some(Decimal::from(300)),
            },
            now(),
        )
    }

    fn trip_for(vehicle_id: Uuid, driver_id: Uuid) -> Trip {
        Trip {
            id: Uuid::new_v4(),
            vehicle_id,
            driver_id,
            state: TripState::InProgress,
            planned_start: now(),
            planned_end: None,
            actual_start: Some(now()),
            actual_end: None,
            start_odometer_km: Decimal::from(1000),
            end_odometer_km: None,
            start_fuel_level_l: None,
            end_fuel_level_l: None,
            distance_km: None,
            notes: None,
            cancel_reason: None,
            created_at: now(),
            updated_at: now(),
        }
    }

    fn closure() -> TripClosure {
        TripClosure {
            closed_at: now(),
            end_odometer_km: None,
            end_fuel_level_l: None,
            notes: None,
            cancel_reason: None,
        }
    }

    #[tokio::test]
    async fn test_allocate_only_from_available() {
        let store = MemoryStore::new();
        let vehicle = VehicleRepo::insert(&store, &truck("TRK-001")).await.unwrap();
        let trip_id = Uuid::new_v4();

        let first = store.try_allocate(vehicle.id, trip_id, now()).await.unwrap();
        assert!(matches!(first, AllocateOutcome::Allocated(ref v) if v.current_trip_id == Some(trip_id)));

        let second = store.try_allocate(vehicle.id, Uuid::new_v4(), now()).await.unwrap();
        assert!(matches!(second, AllocateOutcome::NotAvailable(VehicleState::Allocated)));

        let missing = store.try_allocate(Uuid::new_v4(), trip_id, now()).await.unwrap();
        assert!(matches!(missing, AllocateOutcome::Missing));
    }

    #[tokio::test]
    async fn test_release_respects_holder() {
        let store = MemoryStore::new();
        let vehicle = VehicleRepo::insert(&store, &truck("TRK-002")).await.unwrap();
        let trip_id = Uuid::new_v4();
        store.try_allocate(vehicle.id, trip_id, now()).await.unwrap();

        let wrong = store.release(vehicle.id, Some(Uuid::new_v4()), now()).await.unwrap();
        assert!(wrong.is_none());

        let released = store.release(vehicle.id, Some(trip_id), now()).await.unwrap().unwrap();
        assert_eq!(released.state, VehicleState::Available);
        assert_eq!(released.current_trip_id, None);

        // Segunda liberación: nada que hacer
        assert!(store.release(vehicle.id, None, now()).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_duplicate_plate_rejected() {
        let store = MemoryStore::new();
        VehicleRepo::insert(&store, &truck("TRK-003")).await.unwrap();

        let err = VehicleRepo::insert(&store, &truck("TRK-003")).await.unwrap_err();
        assert!(matches!(err, AppError::Duplicate(_)));
    }

    #[tokio::test]
    async fn test_second_in_progress_trip_for_driver_rejected() {
        let store = MemoryStore::new();
        let driver = Uuid::new_v4();

        TripRepo::insert(&store, &trip_for(Uuid::new_v4(), driver)).await.unwrap();
        let err = TripRepo::insert(&store, &trip_for(Uuid::new_v4(), driver)).await.unwrap_err();

        assert!(matches!(err, AppError::Unavailable(_)));
    }

    #[tokio::test]
    async fn test_closing_trip_frees_driver_hold() {
        let store = MemoryStore::new();
        let driver = Uuid::new_v4();
        let trip = TripRepo::insert(&store, &trip_for(Uuid::new_v4(), driver)).await.unwrap();

        let closed = store.complete(trip.id, &closure()).await.unwrap();
        assert!(matches!(closed, GuardedWrite::Written(ref t) if t.state == TripState::Completed));

        TripRepo::insert(&store, &trip_for(Uuid::new_v4(), driver)).await.unwrap();
    }

    #[tokio::test]
    async fn test_complete_twice_reports_state() {
        let store = MemoryStore::new();
        let trip = TripRepo::insert(&store, &trip_for(Uuid::new_v4(), Uuid::new_v4())).await.unwrap();

        store.complete(trip.id, &closure()).await.unwrap();
        let again = store.complete(trip.id, &closure()).await.unwrap();

        assert!(matches!(again, GuardedWrite::TripState(TripState::Completed)));
    }

    #[tokio::test]
    async fn test_activity_sequence_and_closed_guard() {
        let store = MemoryStore::new();
        let trip = TripRepo::insert(&store, &trip_for(Uuid::new_v4(), Uuid::new_v4())).await.unwrap();
        let location_id = Uuid::new_v4();

        for expected in 1..=3 {
            let written = store
                .append_sequenced(trip.id, NewActivity::new(ActivityType::Loading, location_id), now())
                .await
                .unwrap();
            assert!(matches!(written, GuardedWrite::Written(ref a) if a.sequence_number == expected));
        }
        assert_eq!(store.next_sequence_number(trip.id).await.unwrap(), 4);

        store.cancel(trip.id, &closure()).await.unwrap();
        let rejected = store
            .append_sequenced(trip.id, NewActivity::new(ActivityType::Unloading, location_id), now())
            .await
            .unwrap();
        assert!(matches!(rejected, GuardedWrite::TripState(TripState::Cancelled)));
    }

    #[tokio::test]
    async fn test_location_identity_unique_among_active() {
        let store = MemoryStore::new();
        let draft = NewLocation {
            name: "Cantera Norte".to_string(),
            client_name: "Áridos SA".to_string(),
            address: "Ruta 5 km 12".to_string(),
            latitude: 35.0,
            longitude: 139.0,
            location_type: LocationType::Loading,
        };

        let first = LocationRepo::insert(&store, &draft.clone().into_location(Uuid::new_v4(), now()))
            .await
            .unwrap();
        let dup = LocationRepo::insert(&store, &draft.clone().into_location(Uuid::new_v4(), now())).await;
        assert!(matches!(dup, Err(AppError::Duplicate(_))));

        assert_eq!(LocationRepo::deactivate(&store, first.id, now()).await.unwrap(), Some(true));
        assert_eq!(LocationRepo::deactivate(&store, first.id, now()).await.unwrap(), Some(false));
        assert_eq!(LocationRepo::deactivate(&store, Uuid::new_v4(), now()).await.unwrap(), None);

        LocationRepo::insert(&store, &draft.into_location(Uuid::new_v4(), now()))
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_search_matches_both_for_loading_filter() {
        let store = MemoryStore::new();
        for (name, kind) in [
            ("Planta Sur", LocationType::Both),
            ("Planta Este", LocationType::Unloading),
            ("Depósito Central", LocationType::Depot),
        ] {
            let location = NewLocation {
                name: name.to_string(),
                client_name: String::new(),
                address: String::new(),
                latitude: 0.0,
                longitude: 0.0,
                location_type: kind,
            }
            .into_location(Uuid::new_v4(), now());
            LocationRepo::insert(&store, &location).await.unwrap();
        }

        let found = store.search_active("planta", Some(LocationType::Loading), 10).await.unwrap();
        let names: Vec<_> = found.iter().map(|l| l.name.as_str()).collect();
        assert_eq!(names, vec!["Planta Sur"]);
    }
}
