//! Modelo de Activity
//!
//! Evento del ledger de un viaje (carga, descarga, repostaje, pausa,
//! mantenimiento). `sequence_number` es 1-based y sin huecos por viaje.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, Type};
use uuid::Uuid;

/// Tipo de actividad - mapea al ENUM activity_type
#[derive(Debug, Clone, Copy, Serialize, Deserialize, Type, PartialEq, Eq, Hash)]
#[sqlx(type_name = "activity_type", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum ActivityType {
    Loading,
    Unloading,
    Fueling,
    Break,
    Maintenance,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Activity {
    pub id: Uuid,
    pub trip_id: Uuid,
    pub sequence_number: i32,
    pub activity_type: ActivityType,
    pub location_id: Uuid,
    pub item_id: Option<Uuid>,
    pub item_name: Option<String>,
    pub quantity_tonnes: Option<Decimal>,
    pub start_time: DateTime<Utc>,
    pub end_time: Option<DateTime<Utc>>,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Borrador de actividad; el número de secuencia lo asigna el ledger
#[derive(Debug, Clone)]
pub struct NewActivity {
    pub activity_type: ActivityType,
    pub location_id: Uuid,
    pub item_id: Option<Uuid>,
    pub item_name: Option<String>,
    pub quantity_tonnes: Option<Decimal>,
    pub start_time: Option<DateTime<Utc>>,
    pub end_time: Option<DateTime<Utc>>,
    pub notes: Option<String>,
}

impl NewActivity {
    pub fn new(activity_type: ActivityType, location_id: Uuid) -> Self {
        Self {
            activity_type,
            location_id,
            item_id: None,
            item_name: None,
            quantity_tonnes: None,
            start_time: None,
            end_time: None,
            notes: None,
        }
    }

    pub fn with_quantity(mut self, tonnes: Decimal) -> Self {
        self.quantity_tonnes = Some(tonnes);
        self
    }

    pub fn into_activity(
        self,
        id: Uuid,
        trip_id: Uuid,
        sequence_number: i32,
        now: DateTime<Utc>,
    ) -> Activity {
        Activity {
            id,
            trip_id,
            sequence_number,
            activity_type: self.activity_type,
            location_id: self.location_id,
            item_id: self.item_id,
            item_name: self.item_name,
            quantity_tonnes: self.quantity_tonnes,
            start_time: self.start_time.unwrap_or(now),
            end_time: self.end_time,
            notes: self.notes,
            created_at: now,
        }
    }
}
