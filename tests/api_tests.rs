mod common;

use axum::body::{to_bytes, Body};
use axum::http::{header, Method, Request, StatusCode};
use axum::Router;
use serde_json::{json, Value};
use tower::ServiceExt;
use uuid::Uuid;

use common::{test_config, TestFleet, TOKYO_STATION};
use fleet_ops::create_app;
use fleet_ops::models::caller::CallerRole;
use fleet_ops::utils::jwt::generate_token;

struct TestApi {
    app: Router,
    fleet: TestFleet,
}

impl TestApi {
    fn new() -> Self {
        Self::from_fleet(TestFleet::new())
    }

    fn from_fleet(fleet: TestFleet) -> Self {
        Self {
            app: create_app(fleet.state.clone()),
            fleet,
        }
    }

    fn token(&self, user_id: Uuid, role: CallerRole) -> String {
        generate_token(user_id, role, &self.fleet.state.jwt).unwrap()
    }

    async fn send(&self, method: Method, uri: &str, token: Option<&str>, body: Option<Value>) -> (StatusCode, Value) {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
        }
        let request = match body {
            Some(body) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };

        let response = self.app.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let body = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap()
        };
        (status, body)
    }
}

#[tokio::test]
async fn test_health_check_is_public() {
    let api = TestApi::new();

    let (status, body) = api.send(Method::GET, "/health", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
}

#[tokio::test]
async fn test_api_requires_valid_token() {
    let api = TestApi::new();
    let uri = format!("/api/vehicle/{}", Uuid::new_v4());

    let (status, body) = api.send(Method::GET, &uri, None, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["code"], "UNAUTHORIZED");

    let (status, _) = api.send(Method::GET, &uri, Some("not-a-jwt"), None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_trip_flow_over_http() {
    let api = TestApi::new();
    let admin = api.token(Uuid::new_v4(), CallerRole::Admin);
    let driver_id = Uuid::new_v4();
    let driver = api.token(driver_id, CallerRole::Driver);

    let (status, body) = api
        .send(
            Method::POST,
            "/api/vehicle",
            Some(&admin),
            Some(json!({ "plate_number": "TRK-4001", "capacity_tonnes": 25, "fuel_type": "diesel" })),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);
    let vehicle_id = body["data"]["id"].as_str().unwrap().to_string();
    assert_eq!(body["data"]["state"], "available");

    let (status, body) = api
        .send(
            Method::POST,
            "/api/location",
            Some(&admin),
            Some(json!({
                "name": "Marunouchi Site",
                "client_name": "Tokyo Builders",
                "latitude": TOKYO_STATION.0,
                "longitude": TOKYO_STATION.1,
                "location_type": "unloading"
            })),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);
    let location_id = body["data"]["id"].as_str().unwrap().to_string();

    // Sin driver_id, el chofer inicia el viaje a su nombre
    let (status, body) = api
        .send(Method::POST, "/api/trip", Some(&driver), Some(json!({ "vehicle_id": vehicle_id })))
        .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["data"]["driver_id"], driver_id.to_string());
    let trip_id = body["data"]["id"].as_str().unwrap().to_string();

    let (status, body) = api
        .send(
            Method::POST,
            &format!("/api/trip/{}/activity", trip_id),
            Some(&driver),
            Some(json!({ "activity_type": "unloading", "location_id": location_id, "quantity_tonnes": 5.5 })),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["data"]["sequence_number"], 1);

    let (status, body) = api
        .send(
            Method::POST,
            &format!("/api/trip/{}/gps/batch", trip_id),
            Some(&driver),
            Some(json!({ "fixes": [
                { "latitude": 35.681, "longitude": 139.767, "recorded_at": "2025-03-03T06:10:00Z" },
                { "latitude": 35.690, "longitude": 139.770, "recorded_at": "2025-03-03T06:20:00Z" }
            ] })),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"].as_array().unwrap().len(), 2);

    let (status, body) = api
        .send(Method::GET, &format!("/api/trip/current?driver_id={}", driver_id), Some(&driver), None)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["id"], trip_id);

    let (status, body) = api
        .send(Method::POST, &format!("/api/trip/{}/end", trip_id), Some(&driver), Some(json!({})))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["state"], "completed");

    let (status, body) = api
        .send(Method::GET, &format!("/api/vehicle/{}", vehicle_id), Some(&driver), None)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["state"], "available");

    let (status, body) = api
        .send(Method::GET, &format!("/api/vehicle/{}/stats", vehicle_id), Some(&admin), None)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["total_trips"], 1);

    let (status, body) = api
        .send(Method::GET, &format!("/api/stats/location/{}", location_id), Some(&admin), None)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["unloading_count"], 1);

    let (status, body) = api
        .send(Method::POST, &format!("/api/trip/{}/end", trip_id), Some(&driver), None)
        .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["code"], "INVALID_STATE");
}

#[tokio::test]
async fn test_second_start_on_vehicle_is_conflict() {
    let api = TestApi::new();
    let dispatcher = api.token(Uuid::new_v4(), CallerRole::Dispatcher);
    let vehicle = api.fleet.vehicle("TRK-4002").await;

    let (status, _) = api
        .send(
            Method::POST,
            "/api/trip",
            Some(&dispatcher),
            Some(json!({ "vehicle_id": vehicle.id, "driver_id": Uuid::new_v4() })),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);

    let (status, body) = api
        .send(
            Method::POST,
            "/api/trip",
            Some(&dispatcher),
            Some(json!({ "vehicle_id": vehicle.id, "driver_id": Uuid::new_v4() })),
        )
        .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["code"], "UNAVAILABLE");
}

#[tokio::test]
async fn test_role_checks_over_http() {
    let api = TestApi::new();
    let driver = api.token(Uuid::new_v4(), CallerRole::Driver);
    let dispatcher = api.token(Uuid::new_v4(), CallerRole::Dispatcher);
    let vehicle = api.fleet.vehicle("TRK-4003").await;

    let (status, body) = api
        .send(
            Method::POST,
            "/api/vehicle",
            Some(&driver),
            Some(json!({ "plate_number": "TRK-4004", "capacity_tonnes": 10, "fuel_type": "cng" })),
        )
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["code"], "FORBIDDEN");

    let (status, _) = api
        .send(Method::DELETE, &format!("/api/vehicle/{}", vehicle.id), Some(&dispatcher), None)
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _) = api.send(Method::GET, "/api/stats/fleet", Some(&driver), None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, body) = api.send(Method::GET, "/api/stats/fleet", Some(&dispatcher), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["total_vehicles"], 1);
}

#[tokio::test]
async fn test_location_validation_and_search() {
    let api = TestApi::new();
    let admin = api.token(Uuid::new_v4(), CallerRole::Admin);

    let (status, body) = api
        .send(
            Method::POST,
            "/api/location",
            Some(&admin),
            Some(json!({ "name": "Nowhere", "latitude": 200.0, "longitude": 300.0 })),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "VALIDATION_ERROR");

    let (status, body) = api
        .send(Method::GET, "/api/location/nearby?lat=200&lon=300", Some(&admin), None)
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "INVALID_INPUT");

    api.fleet
        .location("Kanda Quarry", 35.69, 139.77, fleet_ops::models::location::LocationType::Both)
        .await;

    let (status, body) = api
        .send(Method::GET, "/api/location/search?q=kanda&type=loading", Some(&admin), None)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"][0]["name"], "Kanda Quarry");

    let (status, body) = api
        .send(
            Method::GET,
            &format!("/api/location/nearby?lat={}&lon={}&radius_km=3", TOKYO_STATION.0, TOKYO_STATION.1),
            Some(&admin),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"].as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn test_bulk_status_over_http() {
    let api = TestApi::new();
    let admin = api.token(Uuid::new_v4(), CallerRole::Admin);
    let first = api.fleet.vehicle("TRK-4005").await;
    let second = api.fleet.vehicle("TRK-4006").await;

    let (status, body) = api
        .send(
            Method::POST,
            "/api/vehicle/bulk-status",
            Some(&admin),
            Some(json!({ "vehicle_ids": [first.id, second.id, Uuid::new_v4()], "status": "maintenance" })),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    let results = body["data"].as_array().unwrap();
    assert_eq!(results.len(), 3);
    assert_eq!(results[0]["success"], true);
    assert_eq!(results[2]["code"], "NOT_FOUND");

    let (status, body) = api
        .send(
            Method::PUT,
            &format!("/api/vehicle/{}/status", first.id),
            Some(&admin),
            Some(json!({ "status": "available" })),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["state"], "available");
}

#[tokio::test]
async fn test_rate_limit_returns_429() {
    let mut config = test_config();
    config.rate_limit_requests = 2;
    let api = TestApi::from_fleet(TestFleet::with_config(config));

    for _ in 0..2 {
        let (status, _) = api.send(Method::GET, "/health", None, None).await;
        assert_eq!(status, StatusCode::OK);
    }

    let (status, body) = api.send(Method::GET, "/health", None, None).await;
    assert_eq!(status, StatusCode::TOO_MANY_REQUESTS);
    assert_eq!(body["code"], "RATE_LIMIT_EXCEEDED");
}
