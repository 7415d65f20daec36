//! Modelo de FuelRecord

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct FuelRecord {
    pub id: Uuid,
    pub trip_id: Uuid,
    pub vehicle_id: Uuid,
    pub amount_liters: Decimal,
    pub cost: Option<Decimal>,
    pub location_label: Option<String>,
    pub recorded_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewFuelRecord {
    pub amount_liters: Decimal,
    pub cost: Option<Decimal>,
    pub location_label: Option<String>,
    pub recorded_at: Option<DateTime<Utc>>,
}

impl NewFuelRecord {
    pub fn liters(amount_liters: Decimal) -> Self {
        Self {
            amount_liters,
            cost: None,
            location_label: None,
            recorded_at: None,
        }
    }

    pub fn into_record(self, id: Uuid, trip_id: Uuid, vehicle_id: Uuid, now: DateTime<Utc>) -> FuelRecord {
        FuelRecord {
            id,
            trip_id,
            vehicle_id,
            amount_liters: self.amount_liters,
            cost: self.cost,
            location_label: self.location_label,
            recorded_at: self.recorded_at.unwrap_or(now),
            created_at: now,
        }
    }
}
