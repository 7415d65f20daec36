//! Helpers compartidos por los tests de integración: servicios reales
//! sobre el store en memoria y un reloj fijo.

#![allow(dead_code)]

use chrono::{DateTime, TimeZone, Utc};
use rust_decimal::Decimal;
use std::sync::Arc;
use uuid::Uuid;

use fleet_ops::config::{EnvironmentConfig, FleetConfig, StorageBackend};
use fleet_ops::models::caller::{CallerIdentity, CallerRole};
use fleet_ops::models::location::{Location, LocationType, NewLocation};
use fleet_ops::models::trip::{StartTrip, Trip};
use fleet_ops::models::vehicle::{FuelType, NewVehicle, Vehicle};
use fleet_ops::repositories::memory::MemoryStore;
use fleet_ops::repositories::Repositories;
use fleet_ops::services::FixedClock;
use fleet_ops::state::AppState;

pub const TOKYO_STATION: (f64, f64) = (35.681236, 139.767125);

pub fn start_of_shift() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 3, 3, 6, 0, 0).unwrap()
}

pub fn test_config() -> EnvironmentConfig {
    EnvironmentConfig {
        environment: "test".to_string(),
        port: 0,
        host: "127.0.0.1".to_string(),
        jwt_secret: "test-secret-for-fleet-ops".to_string(),
        jwt_expiration: 3600,
        cors_origins: vec!["*".to_string()],
        rate_limit_requests: 10_000,
        rate_limit_window: 60,
        request_timeout_secs: 30,
        max_concurrent_requests: 64,
        storage_backend: StorageBackend::Memory,
    }
}

pub struct TestFleet {
    pub store: Arc<MemoryStore>,
    pub clock: Arc<FixedClock>,
    pub state: AppState,
}

impl TestFleet {
    pub fn new() -> Self {
        Self::with_config(test_config())
    }

    pub fn with_config(config: EnvironmentConfig) -> Self {
        let store = Arc::new(MemoryStore::new());
        let clock = Arc::new(FixedClock::new(start_of_shift()));
        let state = AppState::new(
            config,
            FleetConfig::default(),
            Repositories::from_memory(store.clone()),
            clock.clone(),
        );

        Self { store, clock, state }
    }

    pub async fn vehicle(&self, plate: &str) -> Vehicle {
        self.vehicle_with_odometer(plate, 10_000).await
    }

    pub async fn vehicle_with_odometer(&self, plate: &str, odometer_km: i64) -> Vehicle {
        self.state
            .allocator
            .register(
                &admin(),
                NewVehicle {
                    plate_number: plate.to_string(),
                    capacity_tonnes: Decimal::from(25),
                    fuel_type: FuelType::Diesel,
                    odometer_km: Decimal::from(odometer_km),
                    fuel_level_l: Some(Decimal::from(300)),
                },
            )
            .await
            .unwrap()
    }

    pub async fn location(&self, name: &str, lat: f64, lon: f64, location_type: LocationType) -> Location {
        self.state
            .locations
            .create(NewLocation {
                name: name.to_string(),
                client_name: "Tokyo Aggregates".to_string(),
                address: format!("{} yard", name),
                latitude: lat,
                longitude: lon,
                location_type,
            })
            .await
            .unwrap()
    }

    pub async fn start_trip(&self, vehicle_id: Uuid, driver_id: Uuid) -> Trip {
        self.state
            .trips
            .start(&dispatcher(), start_command(vehicle_id, driver_id))
            .await
            .unwrap()
    }
}

pub fn start_command(vehicle_id: Uuid, driver_id: Uuid) -> StartTrip {
    StartTrip {
        vehicle_id,
        driver_id: Some(driver_id),
        planned_start: None,
        planned_end: None,
        notes: None,
    }
}

pub fn admin() -> CallerIdentity {
    CallerIdentity::new(Uuid::new_v4(), CallerRole::Admin)
}

pub fn dispatcher() -> CallerIdentity {
    CallerIdentity::new(Uuid::new_v4(), CallerRole::Dispatcher)
}

pub fn driver() -> CallerIdentity {
    CallerIdentity::new(Uuid::new_v4(), CallerRole::Driver)
}
