//! Política de permisos por rol
//!
//! - admin: todo
//! - dispatcher: despacho de viajes y estado de flota (no retira vehículos)
//! - driver: solo sus propios viajes

use uuid::Uuid;

use crate::models::caller::{CallerIdentity, CallerRole};
use crate::utils::errors::{forbidden_error, AppResult};

/// Cambios de estado de flota (mantenimiento, disponible, alta)
pub fn ensure_can_manage_fleet(caller: &CallerIdentity) -> AppResult<()> {
    match caller.role {
        CallerRole::Admin | CallerRole::Dispatcher => Ok(()),
        CallerRole::Driver => Err(forbidden_error("manage fleet", "drivers cannot change vehicle status")),
    }
}

/// Retirar un vehículo es definitivo
pub fn ensure_can_retire(caller: &CallerIdentity) -> AppResult<()> {
    match caller.role {
        CallerRole::Admin => Ok(()),
        _ => Err(forbidden_error("retire vehicle", "only admins can retire vehicles")),
    }
}

/// Un chofer solo puede iniciar viajes a su nombre
pub fn ensure_can_start_for(caller: &CallerIdentity, driver_id: Uuid) -> AppResult<()> {
    match caller.role {
        CallerRole::Admin | CallerRole::Dispatcher => Ok(()),
        CallerRole::Driver if caller.user_id == driver_id => Ok(()),
        CallerRole::Driver => Err(forbidden_error(
            "start trip",
            "drivers can only start trips for themselves",
        )),
    }
}

/// Operar sobre un viaje existente (ledger, GPS, cierre)
pub fn ensure_can_operate_trip(caller: &CallerIdentity, trip_driver_id: Uuid) -> AppResult<()> {
    match caller.role {
        CallerRole::Admin | CallerRole::Dispatcher => Ok(()),
        CallerRole::Driver if caller.user_id == trip_driver_id => Ok(()),
        CallerRole::Driver => Err(forbidden_error("operate trip", "trip belongs to another driver")),
    }
}

/// Dar de alta o baja ubicaciones
pub fn ensure_can_manage_locations(caller: &CallerIdentity) -> AppResult<()> {
    match caller.role {
        CallerRole::Admin | CallerRole::Dispatcher => Ok(()),
        CallerRole::Driver => Err(forbidden_error("manage locations", "drivers cannot edit locations")),
    }
}

/// Estadísticas de flota, vehículos y ubicaciones
pub fn ensure_can_view_fleet_stats(caller: &CallerIdentity) -> AppResult<()> {
    match caller.role {
        CallerRole::Admin | CallerRole::Dispatcher => Ok(()),
        CallerRole::Driver => Err(forbidden_error("view fleet stats", "drivers only see their own stats")),
    }
}

/// Un chofer solo ve sus propias estadísticas
pub fn ensure_can_view_driver(caller: &CallerIdentity, driver_id: Uuid) -> AppResult<()> {
    match caller.role {
        CallerRole::Admin | CallerRole::Dispatcher => Ok(()),
        CallerRole::Driver if caller.user_id == driver_id => Ok(()),
        CallerRole::Driver => Err(forbidden_error("view driver stats", "stats belong to another driver")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::errors::AppError;

    #[test]
    fn test_driver_starts_only_own_trip() {
        let driver = CallerIdentity::new(Uuid::new_v4(), CallerRole::Driver);

        assert!(ensure_can_start_for(&driver, driver.user_id).is_ok());
        assert!(matches!(
            ensure_can_start_for(&driver, Uuid::new_v4()),
            Err(AppError::Forbidden(_))
        ));
    }

    #[test]
    fn test_only_admin_retires() {
        let admin = CallerIdentity::new(Uuid::new_v4(), CallerRole::Admin);
        let dispatcher = CallerIdentity::new(Uuid::new_v4(), CallerRole::Dispatcher);

        assert!(ensure_can_retire(&admin).is_ok());
        assert!(ensure_can_retire(&dispatcher).is_err());
        assert!(ensure_can_manage_fleet(&dispatcher).is_ok());
    }

    #[test]
    fn test_driver_sees_only_own_stats() {
        let driver = CallerIdentity::new(Uuid::new_v4(), CallerRole::Driver);

        assert!(ensure_can_view_driver(&driver, driver.user_id).is_ok());
        assert!(ensure_can_view_driver(&driver, Uuid::new_v4()).is_err());
        assert!(ensure_can_view_fleet_stats(&driver).is_err());
    }
}
