use async_trait::async_trait;
use rust_decimal::Decimal;
use sqlx::{PgConnection, PgPool};
use uuid::Uuid;

use super::TripRepo;
use crate::models::{
    fuel::FuelRecord,
    gps::GpsFix,
    trip::{GuardedWrite, Trip, TripClosure, TripFilter, TripState},
};
use crate::utils::errors::{is_unique_violation, AppError, AppResult};

pub struct TripRepository {
    pool: PgPool,
}

impl TripRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn current_state(&self, id: Uuid) -> AppResult<Option<TripState>> {
        let state = sqlx::query_scalar::<_, TripState>("SELECT state FROM trips WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(state)
    }

    async fn guarded(&self, id: Uuid, updated: Option<Trip>) -> AppResult<GuardedWrite<Trip>> {
        if let Some(trip) = updated {
            return Ok(GuardedWrite::Written(trip));
        }
        Ok(match self.current_state(id).await? {
            None => GuardedWrite::TripMissing,
            Some(state) => GuardedWrite::TripState(state),
        })
    }
}

/// Bloquea la fila del viaje en modo compartido: los cierres (UPDATE)
/// esperan a que la escritura del ledger confirme
async fn lock_trip_state(conn: &mut PgConnection, trip_id: Uuid) -> AppResult<Option<TripState>> {
    let state = sqlx::query_scalar::<_, TripState>("SELECT state FROM trips WHERE id = $1 FOR SHARE")
        .bind(trip_id)
        .fetch_optional(conn)
        .await?;

    Ok(state)
}

#[async_trait]
impl TripRepo for TripRepository {
    async fn insert(&self, trip: &Trip) -> AppResult<Trip> {
        sqlx::query_as::<_, Trip>(
            r#"
            INSERT INTO trips (
                id, vehicle_id, driver_id, state, planned_start, planned_end, actual_start, actual_end,
                start_odometer_km, end_odometer_km, start_fuel_level_l, end_fuel_level_l, distance_km,
                notes, cancel_reason, created_at, updated_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16, $17)
            RETURNING *
            "#,
        )
        .bind(trip.id)
        .bind(trip.vehicle_id)
        .bind(trip.driver_id)
        .bind(trip.state)
        .bind(trip.planned_start)
        .bind(trip.planned_end)
        .bind(trip.actual_start)
        .bind(trip.actual_end)
        .bind(trip.start_odometer_km)
        .bind(trip.end_odometer_km)
        .bind(trip.start_fuel_level_l)
        .bind(trip.end_fuel_level_l)
        .bind(trip.distance_km)
        .bind(&trip.notes)
        .bind(&trip.cancel_reason)
        .bind(trip.created_at)
        .bind(trip.updated_at)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| {
            if is_unique_violation(&e) {
                AppError::Unavailable(format!(
                    "Driver '{}' or vehicle '{}' already has a trip in progress",
                    trip.driver_id, trip.vehicle_id
                ))
            } else {
                AppError::Database(e)
            }
        })
    }

    async fn find_by_id(&self, id: Uuid) -> AppResult<Option<Trip>> {
        let trip = sqlx::query_as::<_, Trip>("SELECT * FROM trips WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(trip)
    }

    async fn list(&self, filter: &TripFilter) -> AppResult<Vec<Trip>> {
        let trips = sqlx::query_as::<_, Trip>(
            r#"
            SELECT * FROM trips
            WHERE ($1::uuid IS NULL OR vehicle_id = $1)
              AND ($2::uuid IS NULL OR driver_id = $2)
              AND ($3::trip_state IS NULL OR state = $3)
              AND ($4::timestamptz IS NULL OR planned_start >= $4)
              AND ($5::timestamptz IS NULL OR planned_start < $5)
            ORDER BY planned_start DESC, id
            LIMIT $6 OFFSET $7
            "#,
        )
        .bind(filter.vehicle_id)
        .bind(filter.driver_id)
        .bind(filter.state)
        .bind(filter.started_after)
        .bind(filter.started_before)
        .bind(filter.limit)
        .bind(filter.offset.unwrap_or(0))
        .fetch_all(&self.pool)
        .await?;

        Ok(trips)
    }

    async fn find_in_progress_by_driver(&self, driver_id: Uuid) -> AppResult<Vec<Trip>> {
        let trips = sqlx::query_as::<_, Trip>(
            "SELECT * FROM trips WHERE driver_id = $1 AND state = 'in_progress' ORDER BY created_at",
        )
        .bind(driver_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(trips)
    }

    async fn complete(&self, id: Uuid, closure: &TripClosure) -> AppResult<GuardedWrite<Trip>> {
        let updated = sqlx::query_as::<_, Trip>(
            r#"
            UPDATE trips
            SET state = 'completed',
                actual_end = $2,
                end_odometer_km = COALESCE($3, end_odometer_km),
                end_fuel_level_l = COALESCE($4, end_fuel_level_l),
                notes = COALESCE($5, notes),
                updated_at = $2
            WHERE id = $1 AND state = 'in_progress'
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(closure.closed_at)
        .bind(closure.end_odometer_km)
        .bind(closure.end_fuel_level_l)
        .bind(&closure.notes)
        .fetch_optional(&self.pool)
        .await?;

        self.guarded(id, updated).await
    }

    async fn cancel(&self, id: Uuid, closure: &TripClosure) -> AppResult<GuardedWrite<Trip>> {
        let updated = sqlx::query_as::<_, Trip>(
            r#"
            UPDATE trips
            SET state = 'cancelled',
                actual_end = $2,
                cancel_reason = $3,
                updated_at = $2
            WHERE id = $1 AND state IN ('planned', 'in_progress')
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(closure.closed_at)
        .bind(&closure.cancel_reason)
        .fetch_optional(&self.pool)
        .await?;

        self.guarded(id, updated).await
    }

    async fn set_distance(&self, id: Uuid, distance_km: f64) -> AppResult<()> {
        sqlx::query("UPDATE trips SET distance_km = $2 WHERE id = $1")
            .bind(id)
            .bind(distance_km)
            .execute(&self.pool)
            .await?;

        Ok(())
    }

    async fn append_gps(&self, trip_id: Uuid, fixes: &[GpsFix]) -> AppResult<GuardedWrite<usize>> {
        let mut tx = self.pool.begin().await?;

        match lock_trip_state(&mut tx, trip_id).await? {
            None => return Ok(GuardedWrite::TripMissing),
            Some(state) if state.is_closed() => return Ok(GuardedWrite::TripState(state)),
            Some(_) => {}
        }

        for fix in fixes {
            sqlx::query(
                r#"
                INSERT INTO gps_fixes (id, trip_id, vehicle_id, latitude, longitude, speed_kmh, heading_deg, accuracy_m, recorded_at, received_at)
                VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
                "#,
            )
            .bind(fix.id)
            .bind(fix.trip_id)
            .bind(fix.vehicle_id)
            .bind(fix.latitude)
            .bind(fix.longitude)
            .bind(fix.speed_kmh)
            .bind(fix.heading_deg)
            .bind(fix.accuracy_m)
            .bind(fix.recorded_at)
            .bind(fix.received_at)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        Ok(GuardedWrite::Written(fixes.len()))
    }

    async fn list_gps(&self, trip_id: Uuid) -> AppResult<Vec<GpsFix>> {
        let fixes = sqlx::query_as::<_, GpsFix>(
            "SELECT * FROM gps_fixes WHERE trip_id = $1 ORDER BY recorded_at, received_at, id",
        )
        .bind(trip_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(fixes)
    }

    async fn count_gps(&self, trip_id: Uuid) -> AppResult<usize> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM gps_fixes WHERE trip_id = $1")
            .bind(trip_id)
            .fetch_one(&self.pool)
            .await?;

        Ok(count as usize)
    }

    async fn append_fuel(&self, record: &FuelRecord) -> AppResult<GuardedWrite<FuelRecord>> {
        let mut tx = self.pool.begin().await?;

        match lock_trip_state(&mut tx, record.trip_id).await? {
            None => return Ok(GuardedWrite::TripMissing),
            Some(TripState::InProgress) => {}
            Some(state) => return Ok(GuardedWrite::TripState(state)),
        }

        let stored = sqlx::query_as::<_, FuelRecord>(
            r#"
            INSERT INTO fuel_records (id, trip_id, vehicle_id, amount_liters, cost, location_label, recorded_at, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            RETURNING *
            "#,
        )
        .bind(record.id)
        .bind(record.trip_id)
        .bind(record.vehicle_id)
        .bind(record.amount_liters)
        .bind(record.cost)
        .bind(&record.location_label)
        .bind(record.recorded_at)
        .bind(record.created_at)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(GuardedWrite::Written(stored))
    }

    async fn list_fuel(&self, trip_id: Uuid) -> AppResult<Vec<FuelRecord>> {
        let records = sqlx::query_as::<_, FuelRecord>(
            "SELECT * FROM fuel_records WHERE trip_id = $1 ORDER BY recorded_at, created_at",
        )
        .bind(trip_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(records)
    }

    async fn fuel_totals(&self, trip_ids: &[Uuid]) -> AppResult<Vec<(Uuid, Decimal)>> {
        if trip_ids.is_empty() {
            return Ok(Vec::new());
        }

        let totals = sqlx::query_as::<_, (Uuid, Decimal)>(
            r#"
            SELECT trip_id, SUM(amount_liters)
            FROM fuel_records
            WHERE trip_id = ANY($1)
            GROUP BY trip_id
            "#,
        )
        .bind(trip_ids)
        .fetch_all(&self.pool)
        .await?;

        Ok(totals)
    }
}
