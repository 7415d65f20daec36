//! VehicleAllocator
//!
//! Dueño de la exclusividad de los vehículos. Toda transición de estado
//! pasa por aquí y se resuelve con un update condicional en el store,
//! sin locks globales.

use chrono::{DateTime, Utc};
use rand::Rng;
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::config::FleetConfig;
use crate::models::caller::CallerIdentity;
use crate::models::vehicle::{
    AllocateOutcome, BulkStatusResult, NewVehicle, TransitionOutcome, Vehicle, VehicleState,
    VehicleStatusChange,
};
use crate::repositories::VehicleRepo;
use crate::services::authorization::{ensure_can_manage_fleet, ensure_can_retire};
use crate::services::clock::Clock;
use crate::utils::errors::{invalid_input_error, invalid_state_error, not_found_error, AppError, AppResult};
use crate::utils::validation::{validate_plate_number, ensure_not_blank};

/// Prueba de que un viaje retiene un vehículo
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AllocationToken {
    pub vehicle_id: Uuid,
    pub trip_id: Uuid,
    pub acquired_at: DateTime<Utc>,
}

pub struct VehicleAllocator {
    vehicles: Arc<dyn VehicleRepo>,
    clock: Arc<dyn Clock>,
    retry_attempts: u32,
    retry_base_delay_ms: u64,
}

impl VehicleAllocator {
    pub fn new(vehicles: Arc<dyn VehicleRepo>, clock: Arc<dyn Clock>, config: &FleetConfig) -> Self {
        Self {
            vehicles,
            clock,
            retry_attempts: config.acquire_retry_attempts,
            retry_base_delay_ms: config.acquire_retry_base_delay_ms,
        }
    }

    pub async fn get(&self, vehicle_id: Uuid) -> AppResult<Vehicle> {
        self.vehicles
            .find_by_id(vehicle_id)
            .await?
            .ok_or_else(|| not_found_error("Vehicle", &vehicle_id.to_string()))
    }

    /// Alta de un vehículo nuevo en estado AVAILABLE
    pub async fn register(&self, caller: &CallerIdentity, new: NewVehicle) -> AppResult<Vehicle> {
        ensure_can_manage_fleet(caller)?;
        ensure_not_blank("plate_number", &new.plate_number)?;
        validate_plate_number(&new.plate_number)
            .map_err(|_| invalid_input_error(format!("invalid plate number '{}'", new.plate_number)))?;
        if new.capacity_tonnes <= rust_decimal::Decimal::ZERO {
            return Err(invalid_input_error("capacity_tonnes must be positive"));
        }
        if new.odometer_km.is_sign_negative() && !new.odometer_km.is_zero() {
            return Err(invalid_input_error("odometer_km must not be negative"));
        }

        let vehicle = Vehicle::from_new(Uuid::new_v4(), new, self.clock.now());
        let stored = self.vehicles.insert(&vehicle).await?;

        info!("🚛 Vehículo registrado: {} ({})", stored.plate_number, stored.id);
        Ok(stored)
    }

    /// AVAILABLE -> ALLOCATED para `trip_id`
    pub async fn acquire(&self, vehicle_id: Uuid, trip_id: Uuid) -> AppResult<AllocationToken> {
        self.acquire_vehicle(vehicle_id, trip_id).await.map(|(token, _)| token)
    }

    /// Igual que `acquire`, devolviendo además el vehículo ya asignado
    /// (el viaje toma de ahí las lecturas iniciales)
    pub async fn acquire_vehicle(&self, vehicle_id: Uuid, trip_id: Uuid) -> AppResult<(AllocationToken, Vehicle)> {
        let mut attempt = 0;

        loop {
            match self.try_acquire_once(vehicle_id, trip_id).await {
                Err(e) if e.is_retryable() && attempt < self.retry_attempts => {
                    attempt += 1;
                    let delay = self.backoff(attempt);
                    warn!(
                        "🔁 Carrera perdida asignando vehículo {} (intento {}/{}), reintento en {:?}",
                        vehicle_id, attempt, self.retry_attempts, delay
                    );
                    tokio::time::sleep(delay).await;
                }
                other => return other,
            }
        }
    }

    async fn try_acquire_once(&self, vehicle_id: Uuid, trip_id: Uuid) -> AppResult<(AllocationToken, Vehicle)> {
        let now = self.clock.now();

        match self.vehicles.try_allocate(vehicle_id, trip_id, now).await? {
            AllocateOutcome::Allocated(vehicle) => {
                info!("🔒 Vehículo {} asignado al viaje {}", vehicle_id, trip_id);
                let token = AllocationToken {
                    vehicle_id,
                    trip_id,
                    acquired_at: now,
                };
                Ok((token, vehicle))
            }
            AllocateOutcome::Missing => Err(not_found_error("Vehicle", &vehicle_id.to_string())),
            AllocateOutcome::NotAvailable(state) => Err(AppError::Unavailable(format!(
                "Vehicle '{}' is {}",
                vehicle_id,
                state.as_str()
            ))),
            AllocateOutcome::LostRace => Err(AppError::Conflict(format!(
                "Vehicle '{}' changed while being allocated",
                vehicle_id
            ))),
        }
    }

    fn backoff(&self, attempt: u32) -> Duration {
        let base = self.retry_base_delay_ms.saturating_mul(attempt as u64);
        let jitter = rand::thread_rng().gen_range(0..=self.retry_base_delay_ms);
        Duration::from_millis(base + jitter)
    }

    /// ALLOCATED -> AVAILABLE; no hace nada en cualquier otro estado
    pub async fn release(&self, vehicle_id: Uuid) -> AppResult<()> {
        match self.vehicles.release(vehicle_id, None, self.clock.now()).await? {
            Some(_) => {
                info!("🔓 Vehículo {} liberado", vehicle_id);
                Ok(())
            }
            None => {
                // Idempotente, pero un id inexistente sigue siendo un error
                self.get(vehicle_id).await?;
                debug!("Vehículo {} no estaba asignado, nada que liberar", vehicle_id);
                Ok(())
            }
        }
    }

    /// Libera solo si el vehículo sigue retenido por `trip_id`.
    /// Devuelve `true` si hubo liberación.
    pub async fn release_held_by(&self, vehicle_id: Uuid, trip_id: Uuid) -> AppResult<bool> {
        let released = self
            .vehicles
            .release(vehicle_id, Some(trip_id), self.clock.now())
            .await?
            .is_some();

        if released {
            info!("🔓 Vehículo {} liberado por el viaje {}", vehicle_id, trip_id);
        } else {
            warn!(
                "⚠️ El viaje {} ya no retenía el vehículo {}, no se libera",
                trip_id, vehicle_id
            );
        }
        Ok(released)
    }

    /// AVAILABLE -> MAINTENANCE
    pub async fn set_maintenance(&self, vehicle_id: Uuid) -> AppResult<Vehicle> {
        self.transition(
            vehicle_id,
            &[VehicleState::Available, VehicleState::Maintenance],
            VehicleState::Maintenance,
            "send to maintenance",
        )
        .await
    }

    /// MAINTENANCE -> AVAILABLE
    pub async fn set_available(&self, vehicle_id: Uuid) -> AppResult<Vehicle> {
        self.transition(
            vehicle_id,
            &[VehicleState::Maintenance, VehicleState::Available],
            VehicleState::Available,
            "make available",
        )
        .await
    }

    /// Cualquier estado no asignado -> RETIRED (terminal)
    pub async fn set_retired(&self, vehicle_id: Uuid) -> AppResult<Vehicle> {
        self.transition(
            vehicle_id,
            &[VehicleState::Available, VehicleState::Maintenance, VehicleState::Retired],
            VehicleState::Retired,
            "retire",
        )
        .await
    }

    async fn transition(
        &self,
        vehicle_id: Uuid,
        from: &[VehicleState],
        to: VehicleState,
        operation: &str,
    ) -> AppResult<Vehicle> {
        match self.vehicles.transition(vehicle_id, from, to, self.clock.now()).await? {
            TransitionOutcome::Applied(vehicle) => {
                info!("🔧 Vehículo {} -> {}", vehicle_id, to.as_str());
                Ok(vehicle)
            }
            TransitionOutcome::Missing => Err(not_found_error("Vehicle", &vehicle_id.to_string())),
            TransitionOutcome::Rejected(VehicleState::Allocated) => Err(AppError::Conflict(format!(
                "Vehicle '{}' is allocated to a trip; end or cancel the trip first",
                vehicle_id
            ))),
            TransitionOutcome::Rejected(state) => Err(invalid_state_error(
                "Vehicle",
                &vehicle_id.to_string(),
                state.as_str(),
                operation,
            )),
        }
    }

    /// Cambio de estado pedido desde la API
    pub async fn set_status(
        &self,
        caller: &CallerIdentity,
        vehicle_id: Uuid,
        target: VehicleStatusChange,
    ) -> AppResult<Vehicle> {
        ensure_can_manage_fleet(caller)?;

        match target {
            VehicleStatusChange::Available => self.set_available(vehicle_id).await,
            VehicleStatusChange::Maintenance => self.set_maintenance(vehicle_id).await,
            VehicleStatusChange::Retired => {
                ensure_can_retire(caller)?;
                self.set_retired(vehicle_id).await
            }
        }
    }

    /// Equivalente a "borrar" un vehículo: nunca se elimina, se retira
    pub async fn retire(&self, caller: &CallerIdentity, vehicle_id: Uuid) -> AppResult<Vehicle> {
        ensure_can_retire(caller)?;
        self.set_retired(vehicle_id).await
    }

    /// Aplica el mismo cambio a varios vehículos y reporta cada resultado.
    /// Un fallo individual no aborta el resto.
    pub async fn bulk_set_status(
        &self,
        caller: &CallerIdentity,
        vehicle_ids: &[Uuid],
        target: VehicleStatusChange,
    ) -> AppResult<Vec<BulkStatusResult>> {
        ensure_can_manage_fleet(caller)?;
        if target == VehicleStatusChange::Retired {
            ensure_can_retire(caller)?;
        }
        if vehicle_ids.is_empty() {
            return Err(invalid_input_error("vehicle_ids must not be empty"));
        }

        let mut results = Vec::with_capacity(vehicle_ids.len());
        for &vehicle_id in vehicle_ids {
            let outcome = match target {
                VehicleStatusChange::Available => self.set_available(vehicle_id).await,
                VehicleStatusChange::Maintenance => self.set_maintenance(vehicle_id).await,
                VehicleStatusChange::Retired => self.set_retired(vehicle_id).await,
            };

            results.push(match outcome {
                Ok(vehicle) => BulkStatusResult {
                    vehicle_id,
                    success: true,
                    state: Some(vehicle.state),
                    code: None,
                    error: None,
                },
                Err(e) => BulkStatusResult {
                    vehicle_id,
                    success: false,
                    state: None,
                    code: Some(e.code()),
                    error: Some(e.to_string()),
                },
            });
        }

        let failed = results.iter().filter(|r| !r.success).count();
        info!(
            "📋 Cambio masivo a {:?}: {} vehículos, {} fallidos",
            target,
            results.len(),
            failed
        );
        Ok(results)
    }
}
