//! Parámetros operativos del motor de flota

use anyhow::{Context, Result};
use std::env;
use std::str::FromStr;

/// Configuración de asignación y búsqueda geoespacial
#[derive(Debug, Clone)]
pub struct FleetConfig {
    /// Radio de coincidencia del auto-registro, en metros
    pub auto_register_radius_m: f64,
    pub search_default_limit: usize,
    pub search_max_limit: usize,
    /// Reintentos de un acquire que perdió la carrera (solo `Conflict`)
    pub acquire_retry_attempts: u32,
    pub acquire_retry_base_delay_ms: u64,
}

impl Default for FleetConfig {
    fn default() -> Self {
        Self {
            auto_register_radius_m: 150.0,
            search_default_limit: 20,
            search_max_limit: 100,
            acquire_retry_attempts: 3,
            acquire_retry_base_delay_ms: 25,
        }
    }
}

impl FleetConfig {
    pub fn from_env() -> Result<Self> {
        let defaults = Self::default();

        let config = Self {
            auto_register_radius_m: parse_or("AUTO_REGISTER_RADIUS_M", defaults.auto_register_radius_m)?,
            search_default_limit: parse_or("SEARCH_DEFAULT_LIMIT", defaults.search_default_limit)?,
            search_max_limit: parse_or("SEARCH_MAX_LIMIT", defaults.search_max_limit)?,
            acquire_retry_attempts: parse_or("ACQUIRE_RETRY_ATTEMPTS", defaults.acquire_retry_attempts)?,
            acquire_retry_base_delay_ms: parse_or(
                "ACQUIRE_RETRY_BASE_DELAY_MS",
                defaults.acquire_retry_base_delay_ms,
            )?,
        };

        if !config.auto_register_radius_m.is_finite() || config.auto_register_radius_m < 0.0 {
            anyhow::bail!("AUTO_REGISTER_RADIUS_M must be a non-negative number");
        }
        if config.search_default_limit == 0 || config.search_default_limit > config.search_max_limit {
            anyhow::bail!("SEARCH_DEFAULT_LIMIT must be between 1 and SEARCH_MAX_LIMIT");
        }

        Ok(config)
    }

    /// Radio de auto-registro en kilómetros
    pub fn auto_register_radius_km(&self) -> f64 {
        self.auto_register_radius_m / 1000.0
    }

    /// Límite efectivo de una búsqueda: por defecto si falta, acotado al máximo
    pub fn clamp_limit(&self, requested: Option<usize>) -> usize {
        requested
            .unwrap_or(self.search_default_limit)
            .min(self.search_max_limit)
    }
}

fn parse_or<T>(key: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match env::var(key) {
        Ok(raw) => raw
            .trim()
            .parse()
            .with_context(|| format!("{} must be a valid number, got '{}'", key, raw)),
        Err(_) => Ok(default),
    }
}
