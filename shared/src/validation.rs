//! Validation and normalization of field identifiers and measured values

// ============================================================================
// Identifiers
// ============================================================================

/// Canonical form of a company, farm or stand name: trimmed, upper-case,
/// runs of whitespace collapsed into a single `_`.
pub fn normalize_identifier(raw: &str) -> String {
    raw.split_whitespace()
        .map(|part| part.to_uppercase())
        .collect::<Vec<_>>()
        .join("_")
}

/// Stand code as written in boundary attribute tables.
///
/// Numeric codes exported as floats (`12.0`) lose their fractional part.
pub fn normalize_stand_code(raw: &str) -> String {
    let trimmed = raw.trim();
    if let Some(integral) = trimmed.strip_suffix(".0") {
        if !integral.is_empty() && integral.chars().all(|c| c.is_ascii_digit()) {
            return integral.to_string();
        }
    }
    normalize_identifier(trimmed)
}

/// Stand identifier used by observations: `{FARM}_{STAND_CODE}`
pub fn stand_identifier(farm: &str, stand_code: &str) -> String {
    format!(
        "{}_{}",
        normalize_identifier(farm),
        normalize_stand_code(stand_code)
    )
}

/// Validate a required identifier field
pub fn validate_identifier(raw: &str) -> Result<(), &'static str> {
    if raw.trim().is_empty() {
        return Err("Identifier cannot be empty");
    }
    Ok(())
}

// ============================================================================
// Measurements
// ============================================================================

/// Validate canopy cover is a finite percentage
pub fn validate_canopy_cover(value: f64) -> Result<(), &'static str> {
    if !value.is_finite() {
        return Err("Canopy cover must be a finite number");
    }
    if !(0.0..=100.0).contains(&value) {
        return Err("Canopy cover must be between 0 and 100");
    }
    Ok(())
}

/// Validate classification quantile
pub fn validate_quantile(q: f64) -> Result<(), &'static str> {
    if !q.is_finite() || !(0.0..=1.0).contains(&q) {
        return Err("Quantile must be between 0 and 1");
    }
    Ok(())
}

/// Validate a projected or geographic coordinate pair
pub fn validate_coordinates(x: f64, y: f64) -> Result<(), &'static str> {
    if !x.is_finite() || !y.is_finite() {
        return Err("Coordinates must be finite numbers");
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    // ========================================================================
    // Identifier Tests
    // ========================================================================

    #[test]
    fn test_normalize_identifier() {
        assert_eq!(normalize_identifier("  fazenda  boa vista "), "FAZENDA_BOA_VISTA");
        assert_eq!(normalize_identifier("SANTA\tRITA"), "SANTA_RITA");
        assert_eq!(normalize_identifier("F1"), "F1");
        assert_eq!(normalize_identifier("   "), "");
    }

    #[test]
    fn test_normalize_stand_code_drops_float_suffix() {
        assert_eq!(normalize_stand_code("12.0"), "12");
        assert_eq!(normalize_stand_code(" 7 "), "7");
        assert_eq!(normalize_stand_code("12.5"), "12.5");
        assert_eq!(normalize_stand_code("a 1"), "A_1");
    }

    #[test]
    fn test_stand_identifier() {
        assert_eq!(stand_identifier("Boa Vista", "12.0"), "BOA_VISTA_12");
        assert_eq!(stand_identifier("F1", "003"), "F1_003");
    }

    #[test]
    fn test_validate_identifier() {
        assert!(validate_identifier("F1").is_ok());
        assert!(validate_identifier("  ").is_err());
    }

    // ========================================================================
    // Measurement Tests
    // ========================================================================

    #[test]
    fn test_validate_canopy_cover() {
        assert!(validate_canopy_cover(0.0).is_ok());
        assert!(validate_canopy_cover(73.5).is_ok());
        assert!(validate_canopy_cover(100.0).is_ok());
        assert!(validate_canopy_cover(-0.1).is_err());
        assert!(validate_canopy_cover(100.1).is_err());
        assert!(validate_canopy_cover(f64::NAN).is_err());
    }

    #[test]
    fn test_validate_quantile() {
        assert!(validate_quantile(0.1).is_ok());
        assert!(validate_quantile(0.0).is_ok());
        assert!(validate_quantile(1.0).is_ok());
        assert!(validate_quantile(1.01).is_err());
        assert!(validate_quantile(f64::INFINITY).is_err());
    }

    #[test]
    fn test_validate_coordinates() {
        assert!(validate_coordinates(600_000.0, 7_200_000.0).is_ok());
        assert!(validate_coordinates(f64::NAN, 1.0).is_err());
    }
}
