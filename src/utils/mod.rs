//! Utilidades del sistema
//!
//! Este módulo contiene utilidades para manejo de errores, validación,
//! JWT y cálculos geográficos.

pub mod errors;
pub mod geo_math;
pub mod jwt;
pub mod validation;
