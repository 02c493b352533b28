//! Points awarded per purchase.

/// Awarded when the total is unknown or implausible.
pub const DEFAULT_POINTS: u32 = 100;
/// Upper bound on points for a single purchase.
pub const MAX_POINTS: u32 = 10_000;
/// Totals above this many USD are treated as extraction errors.
pub const MAX_PLAUSIBLE_TOTAL_USD: f64 = 1_000.0;

/// One point per cent, clamped to `[DEFAULT_POINTS, MAX_POINTS]`.
///
/// Missing, negative, non-finite and implausibly large totals earn
/// [`DEFAULT_POINTS`].
#[must_use]
pub fn calculate_points(order_total: Option<f64>) -> u32 {
    let Some(total) = order_total else {
        return DEFAULT_POINTS;
    };
    if !total.is_finite() || total < 0.0 || total > MAX_PLAUSIBLE_TOTAL_USD {
        return DEFAULT_POINTS;
    }
    let cents = (total * 100.0).round();
    // In range [0, 100_000] after the checks above, so the cast is exact.
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    let cents = cents as u32;
    cents.clamp(DEFAULT_POINTS, MAX_POINTS)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn small_totals_earn_the_floor() {
        assert_eq!(calculate_points(Some(0.5)), 100);
        assert_eq!(calculate_points(Some(0.0)), 100);
    }

    #[test]
    fn one_point_per_cent() {
        assert_eq!(calculate_points(Some(50.0)), 5000);
        assert_eq!(calculate_points(Some(45.99)), 4599);
    }

    #[test]
    fn large_totals_hit_the_cap() {
        assert_eq!(calculate_points(Some(150.0)), 10_000);
        assert_eq!(calculate_points(Some(1_000.0)), 10_000);
    }

    #[test]
    fn implausible_totals_earn_the_default() {
        assert_eq!(calculate_points(None), 100);
        assert_eq!(calculate_points(Some(-5.0)), 100);
        assert_eq!(calculate_points(Some(2_000.0)), 100);
        assert_eq!(calculate_points(Some(f64::NAN)), 100);
        assert_eq!(calculate_points(Some(f64::INFINITY)), 100);
    }
}
