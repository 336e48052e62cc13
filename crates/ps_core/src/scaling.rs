//! Integer cost axis.
//!
//! Costs and the budget are fractional in the input. Both solvers work on
//! `round(value * scale)` so that the budget constraint is an exact integer
//! comparison. Rounding is half away from zero (`f64::round`), so with
//! `scale = 20` a cost of `0.025` maps to `1` unit (`0.5` rounds up).

/// Convert a non-negative finite amount to cost units.
///
/// Negative or NaN inputs map to `0`; values beyond `u64::MAX` saturate.
/// Callers are expected to have coerced these away already.
#[inline]
pub fn to_units(value: f64, scale: u32) -> u64 {
    let scaled = (value * f64::from(scale)).round();
    if scaled.is_nan() || scaled <= 0.0 {
        0
    } else {
        // `as` saturates for out-of-range floats.
        scaled as u64
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rounds_half_away_from_zero() {
        assert_eq!(to_units(0.025, 20), 1);
        assert_eq!(to_units(0.024, 20), 0);
        assert_eq!(to_units(2.5, 1), 3);
        assert_eq!(to_units(1000.0, 20), 20_000);
    }

    #[test]
    fn degenerate_inputs_clamp_to_zero() {
        assert_eq!(to_units(-3.0, 20), 0);
        assert_eq!(to_units(f64::NAN, 20), 0);
        assert_eq!(to_units(f64::INFINITY, 1), u64::MAX);
    }
}
