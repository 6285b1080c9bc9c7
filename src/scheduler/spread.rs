use super::ExecutionPlan;
use crate::models::Side;

/// Remaining-bin-time threshold below which the spread decay accelerates.
pub const LATE_BIN_ACCEL_WINDOW_SECS: f64 = 21.0;
/// Divisor applied to the remaining time inside the acceleration window.
pub const LATE_BIN_ACCEL_DIVISOR: f64 = 3.0;

/// Time-decaying price offset from mid.
///
/// Each bin opens quoting `max_spread` away from mid and decays linearly
/// to zero at the bin boundary: passive early for price improvement,
/// aggressive late for completion. Inside the final
/// [`LATE_BIN_ACCEL_WINDOW_SECS`] the remaining time is divided by
/// [`LATE_BIN_ACCEL_DIVISOR`], pulling the quote toward mid faster so the
/// bin's order fills before the bin closes.
#[derive(Debug, Clone)]
pub struct SpreadModel {
    max_spread: f64,
    time_per_bin: f64,
    side: Side,
}

impl SpreadModel {
    pub fn new(max_spread: f64, time_per_bin: f64, side: Side) -> Self {
        debug_assert!(max_spread >= 0.0 && time_per_bin > 0.0);
        Self {
            max_spread,
            time_per_bin,
            side,
        }
    }

    pub fn from_plan(plan: &ExecutionPlan) -> Self {
        Self::new(plan.max_spread, plan.time_per_bin(), plan.side)
    }

    /// Unsigned fractional offset for the given remaining bin time.
    pub fn spread(&self, remaining_bin_time: f64) -> f64 {
        let remaining = remaining_bin_time.clamp(0.0, self.time_per_bin);
        let effective = if remaining < LATE_BIN_ACCEL_WINDOW_SECS {
            remaining / LATE_BIN_ACCEL_DIVISOR
        } else {
            remaining
        };
        (self.max_spread / self.time_per_bin) * effective
    }

    /// Offset signed by side: negative for buys (quote below mid),
    /// positive for sells (quote above mid).
    pub fn signed_spread(&self, remaining_bin_time: f64) -> f64 {
        let spread = self.spread(remaining_bin_time);
        if self.side.is_buy() {
            -spread
        } else {
            spread
        }
    }

    /// Limit price for the current quote.
    pub fn order_price(&self, mid_price: f64, remaining_bin_time: f64) -> f64 {
        mid_price * (1.0 + self.signed_spread(remaining_bin_time))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_full_spread_at_bin_open() {
        let model = SpreadModel::new(0.01, 600.0, Side::Buy);
        assert!((model.spread(600.0) - 0.01).abs() < 1e-12);
    }

    #[test]
    fn test_spread_decays_monotonically_outside_accel_window() {
        let model = SpreadModel::new(0.01, 600.0, Side::Buy);
        let mut last = f64::MAX;
        for remaining in (21..=600).rev() {
            let spread = model.spread(remaining as f64);
            assert!(spread <= last);
            last = spread;
        }
    }

    #[test]
    fn test_acceleration_below_21_seconds() {
        // 15s remaining with a 600s bin: effective time is 5s.
        let model = SpreadModel::new(0.01, 600.0, Side::Buy);
        let accelerated = model.spread(15.0);
        let unaccelerated = (0.01 / 600.0) * 15.0;
        assert!((accelerated - (0.01 / 600.0) * 5.0).abs() < 1e-12);
        assert!(accelerated < unaccelerated);
    }

    #[test]
    fn test_spread_reaches_zero_at_bin_close() {
        let model = SpreadModel::new(0.01, 600.0, Side::Sell);
        assert_eq!(model.spread(0.0), 0.0);
        // Clamped below zero as well.
        assert_eq!(model.spread(-3.0), 0.0);
    }

    #[test]
    fn test_sign_convention() {
        let buy = SpreadModel::new(0.01, 600.0, Side::Buy);
        let sell = SpreadModel::new(0.01, 600.0, Side::Sell);
        assert!(buy.signed_spread(600.0) < 0.0);
        assert!(sell.signed_spread(600.0) > 0.0);

        // Buys quote below mid, sells above.
        assert!(buy.order_price(100.0, 600.0) < 100.0);
        assert!(sell.order_price(100.0, 600.0) > 100.0);
        assert!((buy.order_price(100.0, 600.0) - 99.0).abs() < 1e-9);
        assert!((sell.order_price(100.0, 600.0) - 101.0).abs() < 1e-9);
    }

    #[test]
    fn test_zero_spread_quotes_at_mid() {
        let model = SpreadModel::new(0.0, 600.0, Side::Buy);
        assert_eq!(model.order_price(123.45, 300.0), 123.45);
    }
}
