//! Size unit conversion for disk retention lines.
//!
//! Blue Iris reports sizes such as `20.5G` or `10GB`. All unit letters are
//! treated as binary multiples (K = 1024).

use super::UnitError;

const KIB: f64 = 1024.0;

/// Scale factor for a unit suffix.
fn scale(unit: &str) -> Option<f64> {
    let factor = match unit {
        "B" => 1.0,
        "K" | "KB" => KIB,
        "M" | "MB" => KIB * KIB,
        "G" | "GB" => KIB * KIB * KIB,
        "T" | "TB" => KIB * KIB * KIB * KIB,
        _ => return None,
    };
    Some(factor)
}

/// Convert a decimal value with a unit suffix into bytes.
pub fn to_bytes(value: &str, unit: &str) -> Result<f64, UnitError> {
    let factor = scale(unit).ok_or_else(|| UnitError::UnknownUnit(unit.to_string()))?;
    let number: f64 = value
        .trim()
        .parse()
        .map_err(|_| UnitError::InvalidNumber(value.to_string()))?;

    Ok(number * factor)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bytes_are_identity() {
        assert_eq!(to_bytes("512", "B").unwrap(), 512.0);
        assert_eq!(to_bytes("0.5", "B").unwrap(), 0.5);
    }

    #[test]
    fn test_binary_scale() {
        assert_eq!(to_bytes("1", "K").unwrap(), 1024.0);
        assert_eq!(to_bytes("1", "KB").unwrap(), 1024.0);
        assert_eq!(to_bytes("2", "M").unwrap(), 2.0 * 1024.0 * 1024.0);
        assert_eq!(to_bytes("5", "GB").unwrap(), 5.0 * 1024.0 * 1024.0 * 1024.0);
        assert_eq!(to_bytes("1", "T").unwrap(), 1024f64.powi(4));
    }

    #[test]
    fn test_proportional_to_value() {
        for unit in ["B", "K", "MB", "G", "TB"] {
            let one = to_bytes("1", unit).unwrap();
            let many = to_bytes("37.5", unit).unwrap();
            assert!((many - one * 37.5).abs() < 1e-6);
        }
    }

    #[test]
    fn test_unknown_unit() {
        assert!(matches!(to_bytes("1", "PB"), Err(UnitError::UnknownUnit(u)) if u == "PB"));
        assert!(matches!(to_bytes("1", ""), Err(UnitError::UnknownUnit(_))));
        assert!(matches!(to_bytes("1", "gb"), Err(UnitError::UnknownUnit(_))));
    }

    #[test]
    fn test_invalid_number() {
        assert!(matches!(to_bytes("1.2.3", "G"), Err(UnitError::InvalidNumber(_))));
    }
}
