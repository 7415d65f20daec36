//! Modelos del sistema
//!
//! Este módulo contiene los modelos de dominio que mapean al schema
//! PostgreSQL (ver `migrations/`) y los comandos que reciben los servicios.

pub mod activity;
pub mod caller;
pub mod fuel;
pub mod gps;
pub mod location;
pub mod stats;
pub mod trip;
pub mod vehicle;
