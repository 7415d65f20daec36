//! Repositorios
//!
//! Interfaces estrechas sobre el store transaccional. Los servicios del
//! núcleo dependen solo de estos traits; hay una implementación sobre
//! PostgreSQL (sqlx) y otra en memoria para desarrollo y tests.
//!
//! Las escrituras que dependen del estado de una fila (asignar vehículo,
//! añadir al ledger de un viaje) hacen la comprobación y la escritura en
//! una sola operación atómica y devuelven el hecho observado, no un error
//! de negocio.

pub mod activity_repository;
pub mod location_repository;
pub mod memory;
pub mod trip_repository;
pub mod vehicle_repository;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::PgPool;
use std::sync::Arc;
use uuid::Uuid;

use crate::models::{
    activity::{Activity, ActivityType, NewActivity},
    fuel::FuelRecord,
    gps::GpsFix,
    location::{Location, LocationType},
    trip::{GuardedWrite, Trip, TripClosure, TripFilter},
    vehicle::{AllocateOutcome, TransitionOutcome, Vehicle, VehicleState},
};
use crate::utils::errors::AppResult;
use crate::utils::geo_math::BoundingBox;

#[async_trait]
pub trait VehicleRepo: Send + Sync {
    /// Alta de vehículo; `Duplicate` si la matrícula ya existe
    async fn insert(&self, vehicle: &Vehicle) -> AppResult<Vehicle>;

    async fn find_by_id(&self, id: Uuid) -> AppResult<Option<Vehicle>>;

    /// AVAILABLE -> ALLOCATED como update condicional único
    async fn try_allocate(&self, id: Uuid, trip_id: Uuid, now: DateTime<Utc>) -> AppResult<AllocateOutcome>;

    /// ALLOCATED -> AVAILABLE. Con `holder`, solo si lo retiene ese viaje.
    /// Devuelve `None` si no había nada que liberar.
    async fn release(&self, id: Uuid, holder: Option<Uuid>, now: DateTime<Utc>) -> AppResult<Option<Vehicle>>;

    /// Transición condicional desde cualquiera de `from` hacia `to`
    async fn transition(
        &self,
        id: Uuid,
        from: &[VehicleState],
        to: VehicleState,
        now: DateTime<Utc>,
    ) -> AppResult<TransitionOutcome>;

    /// Últimas lecturas conocidas (odómetro, nivel de combustible)
    async fn update_readings(
        &self,
        id: Uuid,
        odometer_km: Option<Decimal>,
        fuel_level_l: Option<Decimal>,
        now: DateTime<Utc>,
    ) -> AppResult<()>;

    async fn count_by_state(&self) -> AppResult<Vec<(VehicleState, i64)>>;
}

#[async_trait]
pub trait TripRepo: Send + Sync {
    /// `Unavailable` si el chofer ya tiene un viaje en curso
    async fn insert(&self, trip: &Trip) -> AppResult<Trip>;

    async fn find_by_id(&self, id: Uuid) -> AppResult<Option<Trip>>;

    async fn list(&self, filter: &TripFilter) -> AppResult<Vec<Trip>>;

    async fn find_in_progress_by_driver(&self, driver_id: Uuid) -> AppResult<Vec<Trip>>;

    /// IN_PROGRESS -> COMPLETED
    async fn complete(&self, id: Uuid, closure: &TripClosure) -> AppResult<GuardedWrite<Trip>>;

    /// PLANNED | IN_PROGRESS -> CANCELLED
    async fn cancel(&self, id: Uuid, closure: &TripClosure) -> AppResult<GuardedWrite<Trip>>;

    async fn set_distance(&self, id: Uuid, distance_km: f64) -> AppResult<()>;

    /// Añade fixes mientras el viaje no esté cerrado
    async fn append_gps(&self, trip_id: Uuid, fixes: &[GpsFix]) -> AppResult<GuardedWrite<usize>>;

    /// Fixes ordenados por `recorded_at`
    async fn list_gps(&self, trip_id: Uuid) -> AppResult<Vec<GpsFix>>;

    async fn count_gps(&self, trip_id: Uuid) -> AppResult<usize>;

    /// Añade una carga de combustible mientras el viaje esté IN_PROGRESS
    async fn append_fuel(&self, record: &FuelRecord) -> AppResult<GuardedWrite<FuelRecord>>;

    async fn list_fuel(&self, trip_id: Uuid) -> AppResult<Vec<FuelRecord>>;

    /// Litros cargados por viaje en una sola consulta agrupada; los viajes
    /// sin cargas no aparecen
    async fn fuel_totals(&self, trip_ids: &[Uuid]) -> AppResult<Vec<(Uuid, Decimal)>>;
}

#[async_trait]
pub trait ActivityRepo: Send + Sync {
    /// Asigna `último + 1` y escribe, serializado por viaje y solo si el
    /// viaje sigue IN_PROGRESS en ese mismo instante
    async fn append_sequenced(
        &self,
        trip_id: Uuid,
        draft: NewActivity,
        now: DateTime<Utc>,
    ) -> AppResult<GuardedWrite<Activity>>;

    async fn next_sequence_number(&self, trip_id: Uuid) -> AppResult<i32>;

    /// Actividades ascendentes por `sequence_number`
    async fn list_by_trip(&self, trip_id: Uuid) -> AppResult<Vec<Activity>>;

    /// Conteo por tipo en una ubicación, solo de viajes completados
    async fn count_by_location(&self, location_id: Uuid) -> AppResult<Vec<(ActivityType, i64)>>;

    /// Actividades por viaje, agrupadas
    async fn count_by_trips(&self, trip_ids: &[Uuid]) -> AppResult<Vec<(Uuid, i64)>>;
}

#[async_trait]
pub trait LocationRepo: Send + Sync {
    /// `Duplicate` si ya hay una activa con la misma terna
    async fn insert(&self, location: &Location) -> AppResult<Location>;

    async fn find_by_id(&self, id: Uuid) -> AppResult<Option<Location>>;

    async fn find_active_by_identity(
        &self,
        name: &str,
        client_name: &str,
        address: &str,
    ) -> AppResult<Option<Location>>;

    /// Colisión exacta de nombre y coordenadas entre activas
    async fn find_active_at(&self, name: &str, latitude: f64, longitude: f64) -> AppResult<Option<Location>>;

    /// Candidatas activas dentro de la caja (sin cálculo de distancia)
    async fn find_active_in_bounds(&self, bbox: &BoundingBox) -> AppResult<Vec<Location>>;

    /// Substring sin distinguir mayúsculas en nombre o cliente
    async fn search_active(
        &self,
        query: &str,
        location_type: Option<LocationType>,
        limit: usize,
    ) -> AppResult<Vec<Location>>;

    /// `None` si no existe, `Some(false)` si ya estaba inactiva
    async fn deactivate(&self, id: Uuid, now: DateTime<Utc>) -> AppResult<Option<bool>>;
}

/// Conjunto de repositorios inyectados en los servicios
#[derive(Clone)]
pub struct Repositories {
    pub vehicles: Arc<dyn VehicleRepo>,
    pub trips: Arc<dyn TripRepo>,
    pub activities: Arc<dyn ActivityRepo>,
    pub locations: Arc<dyn LocationRepo>,
}

impl Repositories {
    pub fn postgres(pool: PgPool) -> Self {
        Self {
            vehicles: Arc::new(vehicle_repository::VehicleRepository::new(pool.clone())),
            trips: Arc::new(trip_repository::TripRepository::new(pool.clone())),
            activities: Arc::new(activity_repository::ActivityRepository::new(pool.clone())),
            locations: Arc::new(location_repository::LocationRepository::new(pool)),
        }
    }

    pub fn in_memory() -> Self {
        Self::from_memory(Arc::new(memory::MemoryStore::new()))
    }

    pub fn from_memory(store: Arc<memory::MemoryStore>) -> Self {
        Self {
            vehicles: store.clone(),
            trips: store.clone(),
            activities: store.clone(),
            locations: store,
        }
    }
}

/// Escapa `%`, `_` y `\` para usar un texto libre dentro de ILIKE
pub(crate) fn like_pattern(query: &str) -> String {
    let escaped = query
        .replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_");
    format!("%{}%", escaped)
}
