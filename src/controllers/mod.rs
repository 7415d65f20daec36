pub mod location_controller;
pub mod stats_controller;
pub mod trip_controller;
pub mod vehicle_controller;
