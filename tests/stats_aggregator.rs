mod common;

use chrono::Duration;
use rust_decimal::Decimal;
use uuid::Uuid;

use common::{admin, TestFleet};
use fleet_ops::models::activity::{ActivityType, NewActivity};
use fleet_ops::models::fuel::NewFuelRecord;
use fleet_ops::models::gps::NewGpsFix;
use fleet_ops::models::location::LocationType;
use fleet_ops::models::trip::EndTrip;
use fleet_ops::models::vehicle::VehicleStatusChange;
use fleet_ops::utils::errors::AppError;

#[tokio::test]
async fn test_vehicle_stats_distance_and_efficiency() {
    let fleet = TestFleet::new();
    let vehicle = fleet.vehicle_with_odometer("TRK-3001", 1_000).await;

    let first = fleet.start_trip(vehicle.id, Uuid::new_v4()).await;
    fleet
        .state
        .trips
        .record_fuel(first.id, NewFuelRecord::liters(Decimal::from(40)))
        .await
        .unwrap();
    fleet
        .state
        .trips
        .end(
            first.id,
            EndTrip {
                end_odometer_km: Some(Decimal::from(1_200)),
                ..Default::default()
            },
        )
        .await
        .unwrap();

    // El segundo viaje parte del odómetro actualizado
    let second = fleet.start_trip(vehicle.id, Uuid::new_v4()).await;
    assert_eq!(second.start_odometer_km, Decimal::from(1_200));
    fleet
        .state
        .trips
        .record_fuel(second.id, NewFuelRecord::liters(Decimal::from(10)))
        .await
        .unwrap();
    fleet
        .state
        .trips
        .end(
            second.id,
            EndTrip {
                end_odometer_km: Some(Decimal::from(1_300)),
                ..Default::default()
            },
        )
        .await
        .unwrap();

    // Un viaje cancelado no cuenta
    let cancelled = fleet.start_trip(vehicle.id, Uuid::new_v4()).await;
    fleet.state.trips.cancel(cancelled.id, None).await.unwrap();

    let stats = fleet.state.stats.vehicle_stats(vehicle.id).await.unwrap();
    assert_eq!(stats.total_trips, 2);
    assert_eq!(stats.total_distance_km, 300.0);
    assert_eq!(stats.fuel_consumed_liters, 50.0);
    assert_eq!(stats.fuel_efficiency_km_per_l, Some(6.0));
}

#[tokio::test]
async fn test_zero_fuel_has_no_efficiency() {
    let fleet = TestFleet::new();
    let vehicle = fleet.vehicle("TRK-3002").await;
    let trip = fleet.start_trip(vehicle.id, Uuid::new_v4()).await;
    let t0 = common::start_of_shift();

    fleet
        .state
        .trips
        .ingest_gps_batch(
            trip.id,
            vec![
                NewGpsFix::at(35.00, 139.0, t0),
                NewGpsFix::at(35.01, 139.0, t0 + Duration::minutes(5)),
            ],
        )
        .await
        .unwrap();
    fleet.state.trips.end(trip.id, EndTrip::default()).await.unwrap();

    let stats = fleet.state.stats.vehicle_stats(vehicle.id).await.unwrap();
    assert_eq!(stats.total_trips, 1);
    assert!((stats.total_distance_km - 1.112).abs() < 0.01);
    assert_eq!(stats.fuel_consumed_liters, 0.0);
    assert_eq!(stats.fuel_efficiency_km_per_l, None);
}

#[tokio::test]
async fn test_location_stats_count_completed_trips_only() {
    let fleet = TestFleet::new();
    let yard = fleet.location("Yard", 35.0, 139.0, LocationType::Both).await;
    let first = fleet.vehicle("TRK-3003").await;
    let second = fleet.vehicle("TRK-3004").await;

    let done = fleet.start_trip(first.id, Uuid::new_v4()).await;
    for kind in [ActivityType::Loading, ActivityType::Unloading, ActivityType::Loading] {
        fleet
            .state
            .trips
            .record_activity(done.id, NewActivity::new(kind, yard.id))
            .await
            .unwrap();
    }
    fleet.state.trips.end(done.id, EndTrip::default()).await.unwrap();

    let open = fleet.start_trip(second.id, Uuid::new_v4()).await;
    fleet
        .state
        .trips
        .record_activity(open.id, NewActivity::new(ActivityType::Loading, yard.id))
        .await
        .unwrap();

    let stats = fleet.state.stats.location_stats(yard.id).await.unwrap();
    assert_eq!(stats.loading_count, 2);
    assert_eq!(stats.unloading_count, 1);

    assert!(matches!(
        fleet.state.stats.location_stats(Uuid::new_v4()).await,
        Err(AppError::NotFound(_))
    ));
}

#[tokio::test]
async fn test_driver_stats() {
    let fleet = TestFleet::new();
    let depot = fleet.location("Depot", 35.0, 139.0, LocationType::Depot).await;
    let vehicle = fleet.vehicle_with_odometer("TRK-3005", 500).await;
    let driver_id = Uuid::new_v4();

    let trip = fleet.start_trip(vehicle.id, driver_id).await;
    fleet
        .state
        .trips
        .record_activity(trip.id, NewActivity::new(ActivityType::Break, depot.id))
        .await
        .unwrap();
    fleet
        .state
        .trips
        .end(
            trip.id,
            EndTrip {
                end_odometer_km: Some(Decimal::from(580)),
                ..Default::default()
            },
        )
        .await
        .unwrap();

    let stats = fleet.state.stats.driver_stats(driver_id).await.unwrap();
    assert_eq!(stats.total_trips, 1);
    assert_eq!(stats.total_distance_km, 80.0);
    assert_eq!(stats.activity_count, 1);

    let nobody = fleet.state.stats.driver_stats(Uuid::new_v4()).await.unwrap();
    assert_eq!(nobody.total_trips, 0);
}

#[tokio::test]
async fn test_fleet_utilization() {
    let fleet = TestFleet::new();

    let empty = fleet.state.stats.fleet_utilization().await.unwrap();
    assert_eq!(empty.total_vehicles, 0);
    assert_eq!(empty.utilization_rate, None);

    let busy = fleet.vehicle("TRK-3006").await;
    let idle = fleet.vehicle("TRK-3007").await;
    let shop = fleet.vehicle("TRK-3008").await;
    let old = fleet.vehicle("TRK-3009").await;

    fleet.start_trip(busy.id, Uuid::new_v4()).await;
    fleet
        .state
        .allocator
        .set_status(&admin(), shop.id, VehicleStatusChange::Maintenance)
        .await
        .unwrap();
    fleet.state.allocator.retire(&admin(), old.id).await.unwrap();

    let done = fleet.start_trip(idle.id, Uuid::new_v4()).await;
    fleet.state.trips.end(done.id, EndTrip::default()).await.unwrap();

    let utilization = fleet.state.stats.fleet_utilization().await.unwrap();
    assert_eq!(utilization.total_vehicles, 4);
    assert_eq!(utilization.available, 1);
    assert_eq!(utilization.allocated, 1);
    assert_eq!(utilization.maintenance, 1);
    assert_eq!(utilization.retired, 1);
    assert_eq!(utilization.trips_in_progress, 1);
    assert_eq!(utilization.completed_trips, 1);
    assert_eq!(utilization.utilization_rate, Some(1.0 / 3.0));
}

#[tokio::test]
async fn test_unknown_vehicle_stats_is_not_found() {
    let fleet = TestFleet::new();
    assert!(matches!(
        fleet.state.stats.vehicle_stats(Uuid::new_v4()).await,
        Err(AppError::NotFound(_))
    ));
}

#[tokio::test]
async fn test_stats_over_many_trips_sum_grouped_fuel_and_activities() {
    let fleet = TestFleet::new();
    let quarry = fleet.location("Quarry", 35.2, 139.2, LocationType::Loading).await;
    let vehicle = fleet.vehicle_with_odometer("TRK-3900", 0).await;
    let driver_id = Uuid::new_v4();

    for i in 0..60i64 {
        let trip = fleet.start_trip(vehicle.id, driver_id).await;
        if i % 2 == 0 {
            fleet
                .state
                .trips
                .record_fuel(trip.id, NewFuelRecord::liters(Decimal::from(2)))
                .await
                .unwrap();
        }
        for _ in 0..(i % 3) {
            fleet
                .state
                .trips
                .record_activity(trip.id, NewActivity::new(ActivityType::Loading, quarry.id))
                .await
                .unwrap();
        }
        fleet
            .state
            .trips
            .end(
                trip.id,
                EndTrip {
                    end_odometer_km: Some(Decimal::from((i + 1) * 10)),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
    }

    let stats = fleet.state.stats.vehicle_stats(vehicle.id).await.unwrap();
    assert_eq!(stats.total_trips, 60);
    assert_eq!(stats.total_distance_km, 600.0);
    assert_eq!(stats.fuel_consumed_liters, 60.0);
    assert_eq!(stats.fuel_efficiency_km_per_l, Some(10.0));

    // 20 viajes con 0, 20 con 1 y 20 con 2 actividades
    let driver = fleet.state.stats.driver_stats(driver_id).await.unwrap();
    assert_eq!(driver.total_trips, 60);
    assert_eq!(driver.activity_count, 60);
}
