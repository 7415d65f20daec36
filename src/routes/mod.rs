pub mod location_routes;
pub mod stats_routes;
pub mod trip_routes;
pub mod vehicle_routes;
