use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::PgPool;
use uuid::Uuid;

use super::VehicleRepo;
use crate::models::vehicle::{AllocateOutcome, TransitionOutcome, Vehicle, VehicleState};
use crate::utils::errors::{duplicate_error, is_unique_violation, AppError, AppResult};

pub struct VehicleRepository {
    pool: PgPool,
}

impl VehicleRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl VehicleRepo for VehicleRepository {
    async fn insert(&self, vehicle: &Vehicle) -> AppResult<Vehicle> {
        sqlx::query_as::<_, Vehicle>(
            r#"
            INSERT INTO vehicles (id, plate_number, capacity_tonnes, fuel_type, state, current_trip_id, odometer_km, fuel_level_l, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, NULL, $6, $7, $8, $9)
            RETURNING *
            "#,
        )
        .bind(vehicle.id)
        .bind(&vehicle.plate_number)
        .bind(vehicle.capacity_tonnes)
        .bind(vehicle.fuel_type)
        .bind(vehicle.state)
        .bind(vehicle.odometer_km)
        .bind(vehicle.fuel_level_l)
        .bind(vehicle.created_at)
        .bind(vehicle.updated_at)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| {
            if is_unique_violation(&e) {
                duplicate_error("Vehicle", "plate_number", &vehicle.plate_number)
            } else {
                AppError::Database(e)
            }
        })
    }

    async fn find_by_id(&self, id: Uuid) -> AppResult<Option<Vehicle>> {
        let vehicle = sqlx::query_as::<_, Vehicle>("SELECT * FROM vehicles WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(vehicle)
    }

    async fn try_allocate(&self, id: Uuid, trip_id: Uuid, now: DateTime<Utc>) -> AppResult<AllocateOutcome> {
        // Check-and-set en un único UPDATE condicional
        let allocated = sqlx::query_as::<_, Vehicle>(
            r#"
            UPDATE vehicles
            SET state = 'allocated', current_trip_id = $2, updated_at = $3
            WHERE id = $1 AND state = 'available'
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(trip_id)
        .bind(now)
        .fetch_optional(&self.pool)
        .await?;

        if let Some(vehicle) = allocated {
            return Ok(AllocateOutcome::Allocated(vehicle));
        }

        Ok(match self.find_by_id(id).await? {
            None => AllocateOutcome::Missing,
            Some(v) if v.state == VehicleState::Available => AllocateOutcome::LostRace,
            Some(v) => AllocateOutcome::NotAvailable(v.state),
        })
    }

    async fn release(&self, id: Uuid, holder: Option<Uuid>, now: DateTime<Utc>) -> AppResult<Option<Vehicle>> {
        let released = sqlx::query_as::<_, Vehicle>(
            r#"
            UPDATE vehicles
            SET state = 'available', current_trip_id = NULL, updated_at = $3
            WHERE id = $1
              AND state = 'allocated'
              AND ($2::uuid IS NULL OR current_trip_id = $2)
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(holder)
        .bind(now)
        .fetch_optional(&self.pool)
        .await?;

        Ok(released)
    }

    async fn transition(
        &self,
        id: Uuid,
        from: &[VehicleState],
        to: VehicleState,
        now: DateTime<Utc>,
    ) -> AppResult<TransitionOutcome> {
        let allowed: Vec<String> = from.iter().map(|s| s.as_str().to_string()).collect();

        let updated = sqlx::query_as::<_, Vehicle>(
            r#"
            UPDATE vehicles
            SET state = $2, updated_at = $3
            WHERE id = $1 AND state::text = ANY($4)
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(to)
        .bind(now)
        .bind(allowed)
        .fetch_optional(&self.pool)
        .await?;

        if let Some(vehicle) = updated {
            return Ok(TransitionOutcome::Applied(vehicle));
        }

        Ok(match self.find_by_id(id).await? {
            None => TransitionOutcome::Missing,
            Some(v) => TransitionOutcome::Rejected(v.state),
        })
    }

    async fn update_readings(
        &self,
        id: Uuid,
        odometer_km: Option<Decimal>,
        fuel_level_l: Option<Decimal>,
        now: DateTime<Utc>,
    ) -> AppResult<()> {
        sqlx::query(
            r#"
            UPDATE vehicles
            SET odometer_km = COALESCE($2, odometer_km),
                fuel_level_l = COALESCE($3, fuel_level_l),
                updated_at = $4
            WHERE id = $1
            "#,
        )
        .bind(id)
        .bind(odometer_km)
        .bind(fuel_level_l)
        .bind(now)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn count_by_state(&self) -> AppResult<Vec<(VehicleState, i64)>> {
        let counts = sqlx::query_as::<_, (VehicleState, i64)>(
            "SELECT state, COUNT(*) FROM vehicles GROUP BY state",
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(counts)
    }
}
