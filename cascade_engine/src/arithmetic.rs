/// Cascade kernel — Arithmetic Primitives
///
/// All physiology is plain f64. Every helper here saturates rather than
/// fails; the only panic is on a non-finite value, which is a programming
/// error upstream.

/// Multiply and cap at `ceiling`: `min(ceiling, value * factor)`.
pub fn scale_capped(value: f64, factor: f64, ceiling: f64) -> f64 {
    (value * factor).min(ceiling)
}

/// Add and cap at `ceiling`: `min(ceiling, value + delta)`.
pub fn add_capped(value: f64, delta: f64, ceiling: f64) -> f64 {
    (value + delta).min(ceiling)
}

/// Round to one decimal place (timeline precision).
pub fn round_to_tenth(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}

/// Return `value` unchanged if finite. Panics on NaN or infinity.
pub fn checked_finite(value: f64, what: &str) -> f64 {
    if !value.is_finite() {
        panic!("Non-finite value for {}: {}", what, value);
    }
    value
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scale_capped() {
        assert_eq!(scale_capped(100.0, 1.05, 140.0), 105.0);
        assert_eq!(scale_capped(138.0, 1.05, 140.0), 140.0);
    }

    #[test]
    fn test_add_capped() {
        assert!((add_capped(0.2, 0.1, 10.0) - 0.3).abs() < 1e-12);
        assert_eq!(add_capped(9.95, 0.1, 10.0), 10.0);
    }

    #[test]
    fn test_round_to_tenth() {
        assert_eq!(round_to_tenth(24.5), 24.5);
        assert_eq!(round_to_tenth(0.04), 0.0);
        assert_eq!(round_to_tenth(1.26), 1.3);
    }

    #[test]
    fn test_checked_finite_ok() {
        assert_eq!(checked_finite(7.4, "ph"), 7.4);
    }

    #[test]
    #[should_panic(expected = "Non-finite value")]
    fn test_checked_finite_nan() {
        checked_finite(f64::NAN, "ph");
    }
}
