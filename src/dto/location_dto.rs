use serde::Deserialize;
use validator::Validate;

use crate::models::location::{LocationType, NewLocation};
use crate::utils::validation::validate_not_blank;

// Request para crear una ubicación
#[derive(Debug, Deserialize, Validate)]
pub struct CreateLocationRequest {
    #[validate(custom = "validate_not_blank", length(max = 200))]
    pub name: String,
    #[validate(length(max = 200))]
    pub client_name: Option<String>,
    #[validate(length(max = 500))]
    pub address: Option<String>,
    #[validate(range(min = -90.0, max = 90.0))]
    pub latitude: f64,
    #[validate(range(min = -180.0, max = 180.0))]
    pub longitude: f64,
    pub location_type: Option<LocationType>,
}

impl From<CreateLocationRequest> for NewLocation {
    fn from(request: CreateLocationRequest) -> Self {
        Self {
            name: request.name,
            client_name: request.client_name.unwrap_or_default(),
            address: request.address.unwrap_or_default(),
            latitude: request.latitude,
            longitude: request.longitude,
            location_type: request.location_type.unwrap_or(LocationType::Other),
        }
    }
}

/// Query de `GET /api/location/nearby`
#[derive(Debug, Deserialize)]
pub struct NearbyQuery {
    pub lat: f64,
    pub lon: f64,
    pub radius_km: Option<f64>,
    pub limit: Option<usize>,
}

/// Query de `GET /api/location/search`
#[derive(Debug, Deserialize)]
pub struct SearchQuery {
    #[serde(default)]
    pub q: String,
    #[serde(rename = "type")]
    pub location_type: Option<LocationType>,
    pub limit: Option<usize>,
}
