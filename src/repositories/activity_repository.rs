use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use super::ActivityRepo;
use crate::models::{
    activity::{Activity, ActivityType, NewActivity},
    trip::{GuardedWrite, TripState},
};
use crate::utils::errors::AppResult;

pub struct ActivityRepository {
    pool: PgPool,
}

impl ActivityRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ActivityRepo for ActivityRepository {
    async fn append_sequenced(
        &self,
        trip_id: Uuid,
        draft: NewActivity,
        now: DateTime<Utc>,
    ) -> AppResult<GuardedWrite<Activity>> {
        let mut tx = self.pool.begin().await?;

        // FOR UPDATE serializa a los escritores del mismo viaje y bloquea el cierre
        let state = sqlx::query_scalar::<_, TripState>("SELECT state FROM trips WHERE id = $1 FOR UPDATE")
            .bind(trip_id)
            .fetch_optional(&mut *tx)
            .await?;

        match state {
            None => return Ok(GuardedWrite::TripMissing),
            Some(TripState::InProgress) => {}
            Some(other) => return Ok(GuardedWrite::TripState(other)),
        }

        let next: i32 = sqlx::query_scalar(
            "SELECT COALESCE(MAX(sequence_number), 0) + 1 FROM trip_activities WHERE trip_id = $1",
        )
        .bind(trip_id)
        .fetch_one(&mut *tx)
        .await?;

        let activity = draft.into_activity(Uuid::new_v4(), trip_id, next, now);

        let stored = sqlx::query_as::<_, Activity>(
            r#"
            INSERT INTO trip_activities (
                id, trip_id, sequence_number, activity_type, location_id, item_id, item_name,
                quantity_tonnes, start_time, end_time, notes, created_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)
            RETURNING *
            "#,
        )
        .bind(activity.id)
        .bind(activity.trip_id)
        .bind(activity.sequence_number)
        .bind(activity.activity_type)
        .bind(activity.location_id)
        .bind(activity.item_id)
        .bind(&activity.item_name)
        .bind(activity.quantity_tonnes)
        .bind(activity.start_time)
        .bind(activity.end_time)
        .bind(&activity.notes)
        .bind(activity.created_at)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(GuardedWrite::Written(stored))
    }

    async fn next_sequence_number(&self, trip_id: Uuid) -> AppResult<i32> {
        let next: i32 = sqlx::query_scalar(
            "SELECT COALESCE(MAX(sequence_number), 0) + 1 FROM trip_activities WHERE trip_id = $1",
        )
        .bind(trip_id)
        .fetch_one(&self.pool)
        .await?;

        Ok(next)
    }

    async fn list_by_trip(&self, trip_id: Uuid) -> AppResult<Vec<Activity>> {
        let activities = sqlx::query_as::<_, Activity>(
            "SELECT * FROM trip_activities WHERE trip_id = $1 ORDER BY sequence_number",
        )
        .bind(trip_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(activities)
    }

    async fn count_by_location(&self, location_id: Uuid) -> AppResult<Vec<(ActivityType, i64)>> {
        let counts = sqlx::query_as::<_, (ActivityType, i64)>(
            r#"
            SELECT a.activity_type, COUNT(*)
            FROM trip_activities a
            JOIN trips t ON t.id = a.trip_id
            WHERE a.location_id = $1 AND t.state = 'completed'
            GROUP BY a.activity_type
            "#,
        )
        .bind(location_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(counts)
    }

    async fn count_by_trips(&self, trip_ids: &[Uuid]) -> AppResult<Vec<(Uuid, i64)>> {
        if trip_ids.is_empty() {
            return Ok(Vec::new());
        }

        let counts = sqlx::query_as::<_, (Uuid, i64)>(
            r#"
            SELECT trip_id, COUNT(*)
            FROM trip_activities
            WHERE trip_id = ANY($1)
            GROUP BY trip_id
            "#,
        )
        .bind(trip_ids)
        .fetch_all(&self.pool)
        .await?;

        Ok(counts)
    }
}
