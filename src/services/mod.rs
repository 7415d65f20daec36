//! Services module
//!
//! Este módulo contiene la lógica de negocio del motor de flota. Los
//! servicios dependen de los traits de `repositories` y de un `Clock`
//! inyectado; no conocen HTTP ni el backend de almacenamiento.

pub mod activity_ledger;
pub mod authorization;
pub mod clock;
pub mod location_index;
pub mod stats_aggregator;
pub mod trip_lifecycle;
pub mod vehicle_allocator;

pub use activity_ledger::ActivityLedger;
pub use clock::{Clock, FixedClock, SystemClock};
pub use location_index::LocationIndex;
pub use stats_aggregator::StatsAggregator;
pub use trip_lifecycle::TripLifecycle;
pub use vehicle_allocator::{AllocationToken, VehicleAllocator};
