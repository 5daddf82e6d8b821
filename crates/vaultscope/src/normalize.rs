//! Normalization of heterogeneous upstream numerics into canonical decimal
//! strings. Sources disagree on representation (fixed-point base-unit
//! integers, floats, quoted strings); everything funnels through here before
//! it reaches a record.

use rust_decimal::prelude::*;

/// Canonical decimal string for an `f64`. NaN, infinities, and values
/// outside `Decimal` range collapse to `"0"`.
pub fn decimal_string(value: f64) -> String {
    if !value.is_finite() {
        return "0".to_string();
    }
    match Decimal::from_f64(value) {
        Some(d) => d.normalize().to_string(),
        None => "0".to_string(),
    }
}

/// Parse a decimal string, tolerating surrounding whitespace and scientific
/// notation. Returns None for anything non-numeric.
pub fn parse_decimal(s: &str) -> Option<Decimal> {
    let s = s.trim();
    if s.is_empty() {
        return None;
    }
    Decimal::from_str(s)
        .or_else(|_| Decimal::from_scientific(s))
        .ok()
}

/// Canonicalize an upstream decimal string; non-numeric input becomes `"0"`.
pub fn canonical(s: &str) -> String {
    parse_decimal(s)
        .map(|d| d.normalize().to_string())
        .unwrap_or_else(|| "0".to_string())
}

/// Canonical decimal string from a loosely typed JSON field (number, quoted
/// number, or anything else, which maps to `"0"`).
pub fn json_number_string(value: &serde_json::Value) -> String {
    match value {
        serde_json::Value::Number(n) => match n.as_f64() {
            Some(f) => decimal_string(f),
            None => "0".to_string(),
        },
        serde_json::Value::String(s) => canonical(s),
        _ => "0".to_string(),
    }
}

/// Scale a base-unit integer string down by `decimals`. Values beyond
/// `Decimal`'s 96-bit mantissa fall back through `f64`, which keeps enough
/// relative precision for display and ratio work.
pub fn from_base_units(raw: &str, decimals: u8) -> Option<Decimal> {
    let raw = raw.trim();
    if let Ok(v) = raw.parse::<i128>() {
        if let Ok(d) = Decimal::try_from_i128_with_scale(v, u32::from(decimals)) {
            return Some(d.normalize());
        }
    }
    let v = raw.parse::<f64>().ok()?;
    if !v.is_finite() {
        return None;
    }
    Decimal::from_f64(v / 10f64.powi(i32::from(decimals))).map(|d| d.normalize())
}

/// Base-unit string to `f64` for ratio math; non-numeric becomes 0.
pub fn base_units_to_f64(raw: &str) -> f64 {
    match raw.trim().parse::<f64>() {
        Ok(v) if v.is_finite() => v,
        _ => 0.0,
    }
}

/// Loose JSON field to `f64`; non-numeric becomes 0.
pub fn value_to_f64(value: &serde_json::Value) -> f64 {
    match value {
        serde_json::Value::Number(n) => {
            let v = n.as_f64().unwrap_or(0.0);
            if v.is_finite() {
                v
            } else {
                0.0
            }
        }
        serde_json::Value::String(s) => base_units_to_f64(s),
        _ => 0.0,
    }
}

/// Loose JSON field to `i64`; non-numeric becomes 0.
pub fn value_to_i64(value: &serde_json::Value) -> i64 {
    match value {
        serde_json::Value::Number(n) => n.as_i64().unwrap_or(0),
        serde_json::Value::String(s) => s.trim().parse::<i64>().unwrap_or(0),
        _ => 0,
    }
}

/// Clamp non-finite intermediates to zero before they can leak to callers.
pub fn finite_or_zero(value: f64) -> f64 {
    if value.is_finite() {
        value
    } else {
        0.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;
    use serde_json::json;

    #[test]
    fn decimal_string_guards_non_finite() {
        assert_eq!(decimal_string(f64::NAN), "0");
        assert_eq!(decimal_string(f64::INFINITY), "0");
        assert_eq!(decimal_string(f64::NEG_INFINITY), "0");
        assert_eq!(decimal_string(0.0415), "0.0415");
    }

    #[test]
    fn decimal_string_trims_trailing_zeros() {
        assert_eq!(decimal_string(1.50), "1.5");
        assert_eq!(decimal_string(12.0), "12");
    }

    #[test]
    fn canonical_rejects_garbage() {
        assert_eq!(canonical("not-a-number"), "0");
        assert_eq!(canonical(""), "0");
        assert_eq!(canonical(" 1234.500 "), "1234.5");
        assert_eq!(canonical("1.2e3"), "1200");
    }

    #[test]
    fn json_number_string_handles_all_shapes() {
        assert_eq!(json_number_string(&json!(12.5)), "12.5");
        assert_eq!(json_number_string(&json!("98.700")), "98.7");
        assert_eq!(json_number_string(&json!(null)), "0");
        assert_eq!(json_number_string(&json!({"nested": 1})), "0");
    }

    #[test]
    fn from_base_units_scales_exactly() {
        assert_eq!(from_base_units("123456789", 6).unwrap(), dec!(123.456789));
        assert_eq!(from_base_units("1000000000000000000", 18).unwrap(), dec!(1));
        assert_eq!(from_base_units("0", 18).unwrap(), dec!(0));
    }

    #[test]
    fn from_base_units_survives_huge_values() {
        // 1e30 exceeds Decimal's mantissa at scale 18; f64 fallback kicks in.
        let d = from_base_units("1000000000000000000000000000000", 18).unwrap();
        assert_eq!(d, dec!(1000000000000));
    }

    #[test]
    fn from_base_units_rejects_garbage() {
        assert!(from_base_units("xyz", 6).is_none());
    }

    #[test]
    fn loose_json_accessors() {
        assert_eq!(value_to_f64(&json!("1030")), 1030.0);
        assert_eq!(value_to_f64(&json!(17.5)), 17.5);
        assert_eq!(value_to_f64(&json!(null)), 0.0);
        assert_eq!(value_to_i64(&json!("2592000")), 2_592_000);
        assert_eq!(value_to_i64(&json!(7)), 7);
    }

    #[test]
    fn finite_or_zero_collapses() {
        assert_eq!(finite_or_zero(f64::NAN), 0.0);
        assert_eq!(finite_or_zero(1.0 / 0.0), 0.0);
        assert_eq!(finite_or_zero(-0.25), -0.25);
    }
}
