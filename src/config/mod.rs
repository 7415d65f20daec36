//! Configuración del proyecto
//!
//! Este módulo contiene la configuración de base de datos, variables de entorno
//! y los parámetros operativos del motor de flota.

pub mod database;
pub mod environment;
pub mod fleet;

pub use database::DatabaseConfig;
pub use environment::*;
pub use fleet::FleetConfig;
