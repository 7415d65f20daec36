mod common;

use chrono::Duration;
use uuid::Uuid;

use common::{TestFleet, TOKYO_STATION};
use fleet_ops::models::location::{LocationType, NewLocation, RegistrationCandidate};
use fleet_ops::utils::errors::AppError;
use fleet_ops::utils::geo_math::destination_point;

fn draft(name: &str, lat: f64, lon: f64) -> NewLocation {
    NewLocation {
        name: name.to_string(),
        client_name: "Marunouchi Works".to_string(),
        address: "1-9-1 Marunouchi".to_string(),
        latitude: lat,
        longitude: lon,
        location_type: LocationType::Unloading,
    }
}

#[tokio::test]
async fn test_near_by_tokyo_station_radius_is_inclusive() {
    let fleet = TestFleet::new();
    let (lat, lon) = TOKYO_STATION;

    let (lat_1k, lon_1k) = destination_point(lat, lon, 90.0, 1.0);
    let (lat_15k, lon_15k) = destination_point(lat, lon, 90.0, 1.5);
    let one_km = fleet.location("East 1km", lat_1k, lon_1k, LocationType::Loading).await;
    fleet
        .location("East 1.5km", lat_15k, lon_15k, LocationType::Loading)
        .await;

    let found = fleet.state.locations.near_by(lat, lon, 1.2, 10).await.unwrap();
    assert_eq!(found.len(), 1);
    assert_eq!(found[0].location.id, one_km.id);
    assert!((found[0].distance_km - 1.0).abs() < 1e-6);

    // Justo en el borde sigue dentro
    let edge = fleet.state.locations.near_by(lat, lon, 1.0, 10).await.unwrap();
    assert_eq!(edge.len(), 1);

    let both = fleet.state.locations.near_by(lat, lon, 2.0, 10).await.unwrap();
    let names: Vec<&str> = both.iter().map(|n| n.location.name.as_str()).collect();
    assert_eq!(names, vec!["East 1km", "East 1.5km"]);
}

#[tokio::test]
async fn test_near_by_equal_distance_breaks_ties_by_creation_time() {
    let fleet = TestFleet::new();
    let (lat, lon) = TOKYO_STATION;
    let (plat, plon) = destination_point(lat, lon, 45.0, 0.8);

    // El nombre de la más antigua ordena después, para no coincidir por azar
    let older = fleet.location("Zeta Yard", plat, plon, LocationType::Loading).await;
    fleet.clock.advance(Duration::minutes(5));
    let newer = fleet.location("Alpha Yard", plat, plon, LocationType::Loading).await;
    assert!(older.created_at < newer.created_at);

    let found = fleet.state.locations.near_by(lat, lon, 2.0, 10).await.unwrap();
    let ids: Vec<Uuid> = found.iter().map(|n| n.location.id).collect();
    assert_eq!(ids, vec![older.id, newer.id]);
    assert_eq!(found[0].distance_km, found[1].distance_km);

    let first = fleet.state.locations.near_by(lat, lon, 2.0, 1).await.unwrap();
    assert_eq!(first[0].location.id, older.id);
}

#[tokio::test]
async fn test_near_by_truncates_and_skips_inactive() {
    let fleet = TestFleet::new();
    let (lat, lon) = TOKYO_STATION;

    let mut ids = Vec::new();
    for i in 1..=4 {
        let (plat, plon) = destination_point(lat, lon, 0.0, 0.2 * i as f64);
        ids.push(fleet.location(&format!("North {}", i), plat, plon, LocationType::Depot).await.id);
    }
    fleet.state.locations.deactivate(ids[0]).await.unwrap();

    let found = fleet.state.locations.near_by(lat, lon, 5.0, 2).await.unwrap();
    let found_ids: Vec<Uuid> = found.iter().map(|n| n.location.id).collect();
    assert_eq!(found_ids, vec![ids[1], ids[2]]);
}

#[tokio::test]
async fn test_near_by_rejects_bad_arguments() {
    let fleet = TestFleet::new();
    let index = &fleet.state.locations;

    assert!(matches!(index.near_by(200.0, 300.0, 1.0, 5).await, Err(AppError::InvalidInput(_))));
    assert!(matches!(index.near_by(35.0, 139.0, -1.0, 5).await, Err(AppError::InvalidInput(_))));
    assert!(matches!(index.near_by(35.0, 139.0, f64::NAN, 5).await, Err(AppError::InvalidInput(_))));
    assert!(matches!(index.near_by(35.0, 139.0, 1.0, 0).await, Err(AppError::InvalidInput(_))));
}

#[tokio::test]
async fn test_near_by_across_antimeridian() {
    let fleet = TestFleet::new();
    let fiji_west = fleet.location("Suva East", -18.0, 179.995, LocationType::Depot).await;
    fleet.location("Far away", -18.0, 170.0, LocationType::Depot).await;

    let found = fleet.state.locations.near_by(-18.0, -179.995, 5.0, 10).await.unwrap();
    assert_eq!(found.len(), 1);
    assert_eq!(found[0].location.id, fiji_west.id);
}

#[tokio::test]
async fn test_create_validates_coordinates_and_name() {
    let fleet = TestFleet::new();
    let index = &fleet.state.locations;

    assert!(matches!(
        index.create(draft("Out of range", 200.0, 300.0)).await,
        Err(AppError::InvalidInput(_))
    ));
    assert!(matches!(
        index.create(draft("   ", 35.0, 139.0)).await,
        Err(AppError::InvalidInput(_))
    ));
}

#[tokio::test]
async fn test_duplicate_then_recreate_after_deactivate() {
    let fleet = TestFleet::new();
    let index = &fleet.state.locations;

    let original = index.create(draft("Gate 3", 35.68, 139.76)).await.unwrap();
    assert!(matches!(
        index.create(draft("Gate 3", 35.69, 139.77)).await,
        Err(AppError::Duplicate(_))
    ));

    let deactivated = index.deactivate(original.id).await.unwrap();
    assert!(!deactivated.is_active);

    // Desactivar otra vez no hace nada
    assert!(!index.deactivate(original.id).await.unwrap().is_active);

    let recreated = index.create(draft("Gate 3", 35.68, 139.76)).await.unwrap();
    assert_ne!(recreated.id, original.id);
    assert!(recreated.is_active);

    assert!(matches!(index.deactivate(Uuid::new_v4()).await, Err(AppError::NotFound(_))));
}

#[tokio::test]
async fn test_autocomplete_matches_name_and_client() {
    let fleet = TestFleet::new();
    let index = &fleet.state.locations;

    index
        .create(NewLocation {
            location_type: LocationType::Both,
            ..draft("Shinagawa Terminal", 35.62, 139.74)
        })
        .await
        .unwrap();
    index
        .create(NewLocation {
            location_type: LocationType::Loading,
            ..draft("Ariake Quarry", 35.63, 139.79)
        })
        .await
        .unwrap();
    index
        .create(NewLocation {
            client_name: "Shinagawa Concrete".to_string(),
            location_type: LocationType::Unloading,
            ..draft("Odaiba Pier", 35.62, 139.77)
        })
        .await
        .unwrap();

    let found = index.autocomplete("SHINAGAWA", None, None).await.unwrap();
    let names: Vec<&str> = found.iter().map(|l| l.name.as_str()).collect();
    assert_eq!(names, vec!["Odaiba Pier", "Shinagawa Terminal"]);

    // Un filtro de carga también acepta ubicaciones BOTH
    let loading = index
        .autocomplete("a", Some(LocationType::Loading), None)
        .await
        .unwrap();
    let names: Vec<&str> = loading.iter().map(|l| l.name.as_str()).collect();
    assert_eq!(names, vec!["Ariake Quarry", "Shinagawa Terminal"]);

    assert!(index.autocomplete("   ", None, None).await.unwrap().is_empty());
    assert_eq!(index.autocomplete("a", None, Some(1)).await.unwrap().len(), 1);
    assert!(matches!(
        index.autocomplete("a", None, Some(0)).await,
        Err(AppError::InvalidInput(_))
    ));
}

#[tokio::test]
async fn test_auto_register_creates_once() {
    let fleet = TestFleet::new();
    let index = &fleet.state.locations;
    let candidate = RegistrationCandidate {
        name: "Unnamed stop".to_string(),
        client_name: None,
        location_type: None,
    };

    let first = index.auto_register(35.70, 139.80, &candidate).await.unwrap();
    assert!(first.created);
    assert_eq!(first.location.location_type, LocationType::Other);
    assert_eq!(first.location.address, "35.700000, 139.800000");

    let second = index.auto_register(35.70, 139.80, &candidate).await.unwrap();
    assert!(!second.created);
    assert_eq!(second.location.id, first.location.id);
    assert_eq!(second.distance_km, Some(0.0));

    // 1 km más allá ya no coincide
    let (lat, lon) = destination_point(35.70, 139.80, 45.0, 1.0);
    let third = index.auto_register(lat, lon, &candidate).await.unwrap();
    assert!(third.created);
    assert_ne!(third.location.id, first.location.id);
}

#[tokio::test]
async fn test_autocomplete_orders_names_ignoring_case() {
    let fleet = TestFleet::new();
    for name in ["beta Pit", "Zulu Pit", "Alpha Pit"] {
        fleet.location(name, 35.6, 139.6, LocationType::Loading).await;
    }

    let found = fleet.state.locations.autocomplete("pit", None, None).await.unwrap();
    let names: Vec<&str> = found.iter().map(|l| l.name.as_str()).collect();
    assert_eq!(names, vec!["Alpha Pit", "beta Pit", "Zulu Pit"]);
}
