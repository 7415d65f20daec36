//! Utilidades de validación
//!
//! Validadores usados por los DTOs (`#[validate(custom = ...)]`) y por
//! el núcleo para rechazar datos fuera de rango antes de tocar el store.

use lazy_static::lazy_static;
use regex::Regex;
use rust_decimal::Decimal;
use validator::ValidationError;

use crate::utils::errors::{invalid_input_error, AppResult};
use crate::utils::geo_math::is_valid_coordinate;

lazy_static! {
    // Letras, dígitos, espacios y guiones; p.ej. "品川 100 あ 12-34" o "AB-123-CD"
    static ref PLATE_RE: Regex = Regex::new(r"^[\p{L}\p{N}][\p{L}\p{N} \-]{2,18}[\p{L}\p{N}]$")
        .expect("plate regex is valid");
}

/// Validar que un string no esté vacío
pub fn validate_not_blank(value: &str) -> Result<(), ValidationError> {
    if value.trim().is_empty() {
        let mut error = ValidationError::new("not_blank");
        error.add_param("value".into(), &value.to_string());
        return Err(error);
    }
    Ok(())
}

/// Validar formato de matrícula de vehículo
pub fn validate_plate_number(value: &str) -> Result<(), ValidationError> {
    if !PLATE_RE.is_match(value.trim()) {
        let mut error = ValidationError::new("plate_number");
        error.add_param("value".into(), &value.to_string());
        return Err(error);
    }
    Ok(())
}

/// Validar que un decimal sea positivo
pub fn validate_positive_decimal(value: &Decimal) -> Result<(), ValidationError> {
    if *value <= Decimal::ZERO {
        let mut error = ValidationError::new("positive");
        error.add_param("value".into(), &value.to_string());
        return Err(error);
    }
    Ok(())
}

/// Validar que un decimal sea no negativo
pub fn validate_non_negative_decimal(value: &Decimal) -> Result<(), ValidationError> {
    if value.is_sign_negative() && !value.is_zero() {
        let mut error = ValidationError::new("non_negative");
        error.add_param("value".into(), &value.to_string());
        return Err(error);
    }
    Ok(())
}

/// Validación de coordenadas en el núcleo
pub fn ensure_coordinates(lat: f64, lon: f64) -> AppResult<()> {
    if !is_valid_coordinate(lat, lon) {
        return Err(invalid_input_error(format!(
            "coordinates out of range: latitude {} must be in [-90, 90] and longitude {} in [-180, 180]",
            lat, lon
        )));
    }
    Ok(())
}

/// Validación de texto obligatorio en el núcleo
pub fn ensure_not_blank(field: &str, value: &str) -> AppResult<()> {
    if value.trim().is_empty() {
        return Err(invalid_input_error(format!("{} is required", field)));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_not_blank() {
        assert!(validate_not_blank("Depot Koto").is_ok());
        assert!(validate_not_blank("   ").is_err());
    }

    #[test]
    fn test_validate_plate_number() {
        assert!(validate_plate_number("AB-123-CD").is_ok());
        assert!(validate_plate_number("品川 100 あ 12-34").is_ok());
        assert!(validate_plate_number("A").is_err());
        assert!(validate_plate_number("-AB123").is_err());
        assert!(validate_plate_number(&"A".repeat(30)).is_err());
    }

    #[test]
    fn test_validate_decimals() {
        assert!(validate_positive_decimal(&Decimal::new(55, 1)).is_ok());
        assert!(validate_positive_decimal(&Decimal::ZERO).is_err());
        assert!(validate_non_negative_decimal(&Decimal::ZERO).is_ok());
        assert!(validate_non_negative_decimal(&Decimal::new(-1, 0)).is_err());
    }

    #[test]
    fn test_ensure_coordinates() {
        assert!(ensure_coordinates(35.68, 139.76).is_ok());
        assert!(matches!(
            ensure_coordinates(200.0, 300.0),
            Err(crate::utils::errors::AppError::InvalidInput(_))
        ));
    }
}
