//! ActivityLedger
//!
//! Registro ordenado de actividades de un viaje. El número de secuencia
//! se asigna dentro del store, serializado por viaje, para que escritores
//! concurrentes obtengan 1..=N sin huecos ni repetidos.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use std::sync::Arc;
use tracing::info;
use uuid::Uuid;

use crate::models::activity::{Activity, NewActivity};
use crate::models::trip::GuardedWrite;
use crate::repositories::{ActivityRepo, LocationRepo, TripRepo};
use crate::services::clock::Clock;
use crate::utils::errors::{invalid_input_error, invalid_state_error, not_found_error, AppResult};

pub struct ActivityLedger {
    activities: Arc<dyn ActivityRepo>,
    trips: Arc<dyn TripRepo>,
    locations: Arc<dyn LocationRepo>,
    clock: Arc<dyn Clock>,
}

impl ActivityLedger {
    pub fn new(
        activities: Arc<dyn ActivityRepo>,
        trips: Arc<dyn TripRepo>,
        locations: Arc<dyn LocationRepo>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            activities,
            trips,
            locations,
            clock,
        }
    }

    async fn ensure_trip_exists(&self, trip_id: Uuid) -> AppResult<()> {
        if self.trips.find_by_id(trip_id).await?.is_none() {
            return Err(not_found_error("Trip", &trip_id.to_string()));
        }
        Ok(())
    }

    pub async fn next_sequence_number(&self, trip_id: Uuid) -> AppResult<i32> {
        self.ensure_trip_exists(trip_id).await?;
        self.activities.next_sequence_number(trip_id).await
    }

    pub async fn list_by_trip(&self, trip_id: Uuid) -> AppResult<Vec<Activity>> {
        self.ensure_trip_exists(trip_id).await?;
        self.activities.list_by_trip(trip_id).await
    }

    /// Añade una actividad al final del ledger del viaje
    pub async fn record(&self, trip_id: Uuid, draft: NewActivity) -> AppResult<Activity> {
        let now = self.clock.now();
        self.validate_draft(&draft, now).await?;

        let written = self.activities.append_sequenced(trip_id, draft, now).await?;

        match written {
            GuardedWrite::Written(activity) => {
                info!(
                    "📝 Actividad #{} ({:?}) registrada en el viaje {}",
                    activity.sequence_number, activity.activity_type, trip_id
                );
                Ok(activity)
            }
            GuardedWrite::TripMissing => Err(not_found_error("Trip", &trip_id.to_string())),
            GuardedWrite::TripState(state) => Err(invalid_state_error(
                "Trip",
                &trip_id.to_string(),
                state.as_str(),
                "record activity on",
            )),
        }
    }

    async fn validate_draft(&self, draft: &NewActivity, now: DateTime<Utc>) -> AppResult<()> {
        let location = self
            .locations
            .find_by_id(draft.location_id)
            .await?
            .ok_or_else(|| not_found_error("Location", &draft.location_id.to_string()))?;
        if !location.is_active {
            return Err(invalid_input_error(format!(
                "location '{}' is inactive",
                draft.location_id
            )));
        }

        if let Some(end) = draft.end_time {
            if end < draft.start_time.unwrap_or(now) {
                return Err(invalid_input_error("end_time must not be before start_time"));
            }
        }

        if let Some(quantity) = draft.quantity_tonnes {
            if quantity < Decimal::ZERO {
                return Err(invalid_input_error("quantity_tonnes must not be negative"));
            }
        }

        Ok(())
    }
}
