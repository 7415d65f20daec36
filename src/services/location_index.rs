//! LocationIndex
//!
//! Catálogo de ubicaciones de negocio con búsqueda por proximidad
//! (prefiltro por caja + haversine), autocompletado por texto y
//! auto-registro desde un fix GPS.

use std::cmp::Ordering;
use std::sync::Arc;
use tracing::{debug, info};
use uuid::Uuid;

use crate::config::FleetConfig;
use crate::models::location::{
    AutoRegistration, Location, LocationType, NearbyLocation, NewLocation, RegistrationCandidate,
};
use crate::repositories::LocationRepo;
use crate::services::clock::Clock;
use crate::utils::errors::{duplicate_error, invalid_input_error, not_found_error, AppError, AppResult};
use crate::utils::geo_math::{haversine_km, BoundingBox, DISTANCE_EPSILON_KM};
use crate::utils::validation::{ensure_coordinates, ensure_not_blank};

pub struct LocationIndex {
    locations: Arc<dyn LocationRepo>,
    clock: Arc<dyn Clock>,
    config: FleetConfig,
}

impl LocationIndex {
    pub fn new(locations: Arc<dyn LocationRepo>, clock: Arc<dyn Clock>, config: FleetConfig) -> Self {
        Self {
            locations,
            clock,
            config,
        }
    }

    pub async fn create(&self, new: NewLocation) -> AppResult<Location> {
        ensure_coordinates(new.latitude, new.longitude)?;
        ensure_not_blank("name", &new.name)?;

        let location = new.into_location(Uuid::new_v4(), self.clock.now());

        let (name, client, address) = location.identity();
        if self
            .locations
            .find_active_by_identity(name, client, address)
            .await?
            .is_some()
        {
            return Err(duplicate_error(
                "Location",
                "name/client_name/address",
                &format!("{} / {} / {}", name, client, address),
            ));
        }

        let stored = self.locations.insert(&location).await?;
        info!(
            "📍 Ubicación creada: {} ({:.6}, {:.6})",
            stored.name, stored.latitude, stored.longitude
        );
        Ok(stored)
    }

    pub async fn get(&self, id: Uuid) -> AppResult<Location> {
        self.locations
            .find_by_id(id)
            .await?
            .ok_or_else(|| not_found_error("Location", &id.to_string()))
    }

    /// Ubicaciones activas a `radius_km` o menos, de la más cercana a la más lejana
    pub async fn near_by(&self, lat: f64, lon: f64, radius_km: f64, limit: usize) -> AppResult<Vec<NearbyLocation>> {
        ensure_coordinates(lat, lon)?;
        if !radius_km.is_finite() || radius_km < 0.0 {
            return Err(invalid_input_error(format!(
                "radius_km must be a non-negative number, got {}",
                radius_km
            )));
        }
        if limit == 0 {
            return Err(invalid_input_error("limit must be at least 1"));
        }

        let bbox = BoundingBox::around(lat, lon, radius_km);
        let candidates = self.locations.find_active_in_bounds(&bbox).await?;
        let scanned = candidates.len();

        let mut found: Vec<NearbyLocation> = candidates
            .into_iter()
            .filter_map(|location| {
                let distance_km = haversine_km(lat, lon, location.latitude, location.longitude);
                (distance_km <= radius_km + DISTANCE_EPSILON_KM).then_some(NearbyLocation {
                    location,
                    distance_km,
                })
            })
            .collect();

        found.sort_by(|a, b| {
            a.distance_km
                .partial_cmp(&b.distance_km)
                .unwrap_or(Ordering::Equal)
                .then_with(|| a.location.created_at.cmp(&b.location.created_at))
                .then_with(|| a.location.id.cmp(&b.location.id))
        });
        found.truncate(limit);

        debug!(
            "🔎 nearBy ({:.6}, {:.6}) r={} km: {} candidatas, {} dentro",
            lat,
            lon,
            radius_km,
            scanned,
            found.len()
        );
        Ok(found)
    }

    /// Búsqueda por subcadena en nombre o cliente, ordenada por nombre
    pub async fn autocomplete(
        &self,
        query: &str,
        location_type: Option<LocationType>,
        limit: Option<usize>,
    ) -> AppResult<Vec<Location>> {
        let query = query.trim();
        if query.is_empty() {
            return Ok(Vec::new());
        }
        if limit == Some(0) {
            return Err(invalid_input_error("limit must be at least 1"));
        }

        let limit = self.config.clamp_limit(limit);
        self.locations.search_active(query, location_type, limit).await
    }

    /// Ubicación más cercana a un fix dentro del radio de auto-registro
    pub async fn match_fix(&self, lat: f64, lon: f64) -> AppResult<Option<NearbyLocation>> {
        let mut nearest = self
            .near_by(lat, lon, self.config.auto_register_radius_km(), 1)
            .await?;
        Ok(nearest.pop())
    }

    /// Devuelve la ubicación que corresponde a un fix, creándola si no hay
    /// ninguna dentro del radio de auto-registro
    pub async fn auto_register(
        &self,
        lat: f64,
        lon: f64,
        candidate: &RegistrationCandidate,
    ) -> AppResult<AutoRegistration> {
        ensure_coordinates(lat, lon)?;
        ensure_not_blank("name", &candidate.name)?;

        if let Some(nearest) = self.match_fix(lat, lon).await? {
            debug!(
                "📌 Fix ({:.6}, {:.6}) coincide con {} a {:.3} km",
                lat, lon, nearest.location.name, nearest.distance_km
            );
            return Ok(AutoRegistration {
                location: nearest.location,
                created: false,
                distance_km: Some(nearest.distance_km),
            });
        }

        let name = candidate.name.trim();
        if let Some(existing) = self.locations.find_active_at(name, lat, lon).await? {
            return Ok(AutoRegistration {
                location: existing,
                created: false,
                distance_km: Some(0.0),
            });
        }

        let draft = NewLocation {
            name: name.to_string(),
            client_name: candidate.client_name.clone().unwrap_or_default(),
            address: format!("{:.6}, {:.6}", lat, lon),
            latitude: lat,
            longitude: lon,
            location_type: candidate.location_type.unwrap_or(LocationType::Other),
        };

        match self.create(draft.clone()).await {
            Ok(location) => {
                info!("🆕 Ubicación auto-registrada desde GPS: {} ({})", location.name, location.id);
                Ok(AutoRegistration {
                    location,
                    created: true,
                    distance_km: None,
                })
            }
            // Otro fix registró la misma terna entre la búsqueda y el alta
            Err(AppError::Duplicate(_)) => {
                let existing = self
                    .locations
                    .find_active_by_identity(draft.name.trim(), draft.client_name.trim(), draft.address.trim())
                    .await?
                    .ok_or_else(|| not_found_error("Location", &draft.name))?;
                Ok(AutoRegistration {
                    distance_km: Some(haversine_km(lat, lon, existing.latitude, existing.longitude)),
                    location: existing,
                    created: false,
                })
            }
            Err(e) => Err(e),
        }
    }

    /// Baja lógica. Desactivar una ubicación ya inactiva no hace nada.
    pub async fn deactivate(&self, id: Uuid) -> AppResult<Location> {
        match self.locations.deactivate(id, self.clock.now()).await? {
            None => Err(not_found_error("Location", &id.to_string())),
            Some(changed) => {
                if changed {
                    info!("🗑️ Ubicación {} desactivada", id);
                }
                self.get(id).await
            }
        }
    }
}
