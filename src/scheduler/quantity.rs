use super::ExecutionPlan;
use crate::models::Side;

/// Derives remaining and per-bin order quantity from absolute balances.
///
/// Remaining quantity is recomputed from the live balance every time it
/// is asked for, never decremented in place. Fills observed out of band
/// (manual trades, missed events) are absorbed automatically, and
/// cancelled or failed orders roll their unfilled quantity into the next
/// attempt with no bookkeeping. This self-healing recomputation is
/// deliberate; do not replace it with incremental accounting.
#[derive(Debug, Clone)]
pub struct QuantityTracker {
    side: Side,
    target_amount: f64,
    bin_count: u32,
    start_balance: f64,
}

impl QuantityTracker {
    /// `start_balance` is the base-asset balance observed at the first
    /// active tick; the glide path runs from it to the target.
    pub fn new(plan: &ExecutionPlan, start_balance: f64) -> Self {
        Self {
            side: plan.side,
            target_amount: plan.target_amount,
            bin_count: plan.bin_count,
            start_balance,
        }
    }

    /// Balance the position should reach by the end of the run.
    pub fn target_balance(&self) -> f64 {
        match self.side {
            Side::Buy => self.start_balance + self.target_amount,
            Side::Sell => self.start_balance - self.target_amount,
        }
    }

    /// Glide path: balance the position should hold at the end of
    /// `bin` (1-based). Clamped to the final bin.
    pub fn expected_balance(&self, bin: u32) -> f64 {
        let bin = bin.min(self.bin_count) as f64;
        let step = self.target_amount / self.bin_count as f64;
        match self.side {
            Side::Buy => self.start_balance + step * bin,
            Side::Sell => self.start_balance - step * bin,
        }
    }

    /// Total quantity still to trade, from the absolute balance. Zero
    /// once the target is reached or overshot.
    pub fn total_remaining(&self, current_balance: f64) -> f64 {
        match self.side {
            Side::Buy => (self.target_balance() - current_balance).max(0.0),
            Side::Sell => (current_balance - self.target_balance()).max(0.0),
        }
    }

    /// Shortfall against the glide path for the given bin: the size to
    /// submit for the current bin's order.
    pub fn bin_remaining(&self, bin: u32, current_balance: f64) -> f64 {
        let expected = self.expected_balance(bin);
        match self.side {
            Side::Buy => (expected - current_balance).max(0.0),
            Side::Sell => (current_balance - expected).max(0.0),
        }
    }

    pub fn is_complete(&self, current_balance: f64) -> bool {
        self.total_remaining(current_balance) <= 0.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::MarketId;

    fn plan(side: Side, target: f64, bins: u32) -> ExecutionPlan {
        ExecutionPlan::new(
            MarketId::new("binance", "ETH-USDT").unwrap(),
            side,
            target,
            60.0,
            bins,
            0.003,
            None,
            None,
        )
        .unwrap()
    }

    #[test]
    fn test_buy_glide_path() {
        // 10 units over 6 bins from an empty balance.
        let tracker = QuantityTracker::new(&plan(Side::Buy, 10.0, 6), 0.0);
        assert!((tracker.expected_balance(1) - 10.0 / 6.0).abs() < 1e-9);
        assert!((tracker.expected_balance(3) - 5.0).abs() < 1e-9);
        assert!((tracker.expected_balance(6) - 10.0).abs() < 1e-9);
        // Past the last bin the path stays at the target.
        assert!((tracker.expected_balance(9) - 10.0).abs() < 1e-9);
    }

    #[test]
    fn test_bin_shortfall_is_order_size() {
        let tracker = QuantityTracker::new(&plan(Side::Buy, 10.0, 6), 0.0);
        // Nothing filled yet: order the entire first-bin allocation.
        let size = tracker.bin_remaining(1, 0.0);
        assert!((size - 1.6667).abs() < 1e-3);

        // A partial fill rolls the remainder into the same target.
        assert!((tracker.bin_remaining(1, 1.0) - 0.6667).abs() < 1e-3);

        // Ahead of schedule: nothing to order.
        assert_eq!(tracker.bin_remaining(1, 2.0), 0.0);
    }

    #[test]
    fn test_unfilled_quantity_rolls_forward() {
        let tracker = QuantityTracker::new(&plan(Side::Buy, 10.0, 6), 0.0);
        // Bin 1 never filled; bin 2 orders both allocations.
        assert!((tracker.bin_remaining(2, 0.0) - 10.0 / 3.0).abs() < 1e-9);
    }

    #[test]
    fn test_sell_direction() {
        let tracker = QuantityTracker::new(&plan(Side::Sell, 9.0, 3), 20.0);
        assert_eq!(tracker.target_balance(), 11.0);
        assert_eq!(tracker.expected_balance(1), 17.0);
        assert_eq!(tracker.bin_remaining(1, 20.0), 3.0);
        assert_eq!(tracker.total_remaining(14.0), 3.0);
        assert!(!tracker.is_complete(14.0));
        assert!(tracker.is_complete(11.0));
    }

    #[test]
    fn test_out_of_band_fills_are_absorbed() {
        let tracker = QuantityTracker::new(&plan(Side::Buy, 10.0, 6), 0.0);
        // A manual trade moved the balance; remaining shrinks without
        // any event having been delivered.
        assert_eq!(tracker.total_remaining(4.0), 6.0);
        assert_eq!(tracker.bin_remaining(2, 4.0), 0.0);
    }

    #[test]
    fn test_overshoot_clamps_to_zero() {
        let tracker = QuantityTracker::new(&plan(Side::Buy, 10.0, 6), 0.0);
        assert_eq!(tracker.total_remaining(12.0), 0.0);
        assert!(tracker.is_complete(12.0));
    }
}
