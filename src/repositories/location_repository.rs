use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use super::{like_pattern, LocationRepo};
use crate::models::location::{Location, LocationType};
use crate::utils::errors::{duplicate_error, is_unique_violation, AppError, AppResult};
use crate::utils::geo_math::BoundingBox;

pub struct LocationRepository {
    pool: PgPool,
}

impl LocationRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl LocationRepo for LocationRepository {
    async fn insert(&self, location: &Location) -> AppResult<Location> {
        sqlx::query_as::<_, Location>(
            r#"
            INSERT INTO locations (id, name, client_name, address, latitude, longitude, location_type, is_active, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
            RETURNING *
            "#,
        )
        .bind(location.id)
        .bind(&location.name)
        .bind(&location.client_name)
        .bind(&location.address)
        .bind(location.latitude)
        .bind(location.longitude)
        .bind(location.location_type)
        .bind(location.is_active)
        .bind(location.created_at)
        .bind(location.updated_at)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| {
            if is_unique_violation(&e) {
                duplicate_error(
                    "Location",
                    "name/client_name/address",
                    &format!("{} / {} / {}", location.name, location.client_name, location.address),
                )
            } else {
                AppError::Database(e)
            }
        })
    }

    async fn find_by_id(&self, id: Uuid) -> AppResult<Option<Location>> {
        let location = sqlx::query_as::<_, Location>("SELECT * FROM locations WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(location)
    }

    async fn find_active_by_identity(
        &self,
        name: &str,
        client_name: &str,
        address: &str,
    ) -> AppResult<Option<Location>> {
        let location = sqlx::query_as::<_, Location>(
            r#"
            SELECT * FROM locations
            WHERE is_active AND name = $1 AND client_name = $2 AND address = $3
            "#,
        )
        .bind(name)
        .bind(client_name)
        .bind(address)
        .fetch_optional(&self.pool)
        .await?;

        Ok(location)
    }

    async fn find_active_at(&self, name: &str, latitude: f64, longitude: f64) -> AppResult<Option<Location>> {
        let location = sqlx::query_as::<_, Location>(
            r#"
            SELECT * FROM locations
            WHERE is_active AND name = $1 AND latitude = $2 AND longitude = $3
            ORDER BY created_at, id
            LIMIT 1
            "#,
        )
        .bind(name)
        .bind(latitude)
        .bind(longitude)
        .fetch_optional(&self.pool)
        .await?;

        Ok(location)
    }

    async fn find_active_in_bounds(&self, bbox: &BoundingBox) -> AppResult<Vec<Location>> {
        // Si la caja cruza el antimeridiano el rango de longitud se parte en dos
        let locations = sqlx::query_as::<_, Location>(
            r#"
            SELECT * FROM locations
            WHERE is_active
              AND latitude BETWEEN $1 AND $2
              AND (
                    ($5 AND (longitude >= $3 OR longitude <= $4))
                 OR (NOT $5 AND longitude BETWEEN $3 AND $4)
              )
            "#,
        )
        .bind(bbox.min_lat)
        .bind(bbox.max_lat)
        .bind(bbox.min_lon)
        .bind(bbox.max_lon)
        .bind(bbox.crosses_antimeridian())
        .fetch_all(&self.pool)
        .await?;

        Ok(locations)
    }

    async fn search_active(
        &self,
        query: &str,
        location_type: Option<LocationType>,
        limit: usize,
    ) -> AppResult<Vec<Location>> {
        let locations = sqlx::query_as::<_, Location>(
            r#"
            SELECT * FROM locations
            WHERE is_active
              AND (name ILIKE $1 OR client_name ILIKE $1)
              AND (
                    $2::location_type IS NULL
                 OR location_type = $2
                 OR (location_type = 'both' AND $2 IN ('loading'::location_type, 'unloading'::location_type))
              )
            ORDER BY lower(name) COLLATE "C", name COLLATE "C", created_at, id
            LIMIT $3
            "#,
        )
        .bind(like_pattern(query))
        .bind(location_type)
        .bind(limit as i64)
        .fetch_all(&self.pool)
        .await?;

        Ok(locations)
    }

    async fn deactivate(&self, id: Uuid, now: DateTime<Utc>) -> AppResult<Option<bool>> {
        let updated = sqlx::query_scalar::<_, Uuid>(
            "UPDATE locations SET is_active = FALSE, updated_at = $2 WHERE id = $1 AND is_active RETURNING id",
        )
        .bind(id)
        .bind(now)
        .fetch_optional(&self.pool)
        .await?;

        if updated.is_some() {
            return Ok(Some(true));
        }

        let exists: bool = sqlx::query_scalar("SELECT EXISTS (SELECT 1 FROM locations WHERE id = $1)")
            .bind(id)
            .fetch_one(&self.pool)
            .await?;

        Ok(if exists { Some(false) } else { None })
    }
}
