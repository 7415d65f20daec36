//! Shared application state
//!
//! Este módulo define el estado compartido de la aplicación que se pasa
//! a través del router de Axum: configuración y servicios ya cableados
//! sobre un conjunto de repositorios y un reloj.

use std::sync::Arc;

use crate::config::{EnvironmentConfig, FleetConfig};
use crate::middleware::rate_limit::RateLimitState;
use crate::repositories::Repositories;
use crate::services::{
    ActivityLedger, Clock, LocationIndex, StatsAggregator, TripLifecycle, VehicleAllocator,
};
use crate::utils::jwt::JwtConfig;

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<EnvironmentConfig>,
    pub fleet: Arc<FleetConfig>,
    pub jwt: JwtConfig,
    pub allocator: Arc<VehicleAllocator>,
    pub trips: Arc<TripLifecycle>,
    pub locations: Arc<LocationIndex>,
    pub stats: Arc<StatsAggregator>,
    pub rate_limit: RateLimitState,
}

impl AppState {
    pub fn new(
        config: EnvironmentConfig,
        fleet: FleetConfig,
        repos: Repositories,
        clock: Arc<dyn Clock>,
    ) -> Self {
        let allocator = Arc::new(VehicleAllocator::new(repos.vehicles.clone(), clock.clone(), &fleet));
        let locations = Arc::new(LocationIndex::new(
            repos.locations.clone(),
            clock.clone(),
            fleet.clone(),
        ));
        let ledger = Arc::new(ActivityLedger::new(
            repos.activities.clone(),
            repos.trips.clone(),
            repos.locations.clone(),
            clock.clone(),
        ));
        let trips = Arc::new(TripLifecycle::new(
            repos.trips.clone(),
            repos.vehicles.clone(),
            allocator.clone(),
            ledger,
            locations.clone(),
            clock,
        ));
        let stats = Arc::new(StatsAggregator::new(
            repos.vehicles,
            repos.trips,
            repos.activities,
            repos.locations,
        ));

        Self {
            jwt: JwtConfig::from(&config),
            rate_limit: RateLimitState::new(&config),
            config: Arc::new(config),
            fleet: Arc::new(fleet),
            allocator,
            trips,
            locations,
            stats,
        }
    }
}
