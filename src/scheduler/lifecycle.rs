use std::collections::HashSet;

use anyhow::Result;
use tracing::{debug, info, warn};

use crate::exchange::ExchangeConnector;
use crate::models::{MarketId, Side};

/// Remaining-bin-time threshold that forces an early refresh so the
/// final quotes of a bin track the accelerating spread.
pub const LOW_TIME_REFRESH_SECS: f64 = 10.0;

/// What a refresh cycle did.
#[derive(Debug, Clone, PartialEq)]
pub enum RefreshOutcome {
    Placed {
        order_id: String,
        amount: f64,
        price: f64,
    },
    /// The bin's glide-path target is already met.
    FullyExecuted,
    /// Amount quantized to zero; nothing placed this cycle.
    AmountTooSmall,
    /// Feasibility check failed; nothing placed this cycle.
    InsufficientBalance,
}

/// Cancel-then-replace protocol for one market.
///
/// Every cycle cancels whatever is resting, then re-derives a fresh
/// order from the current shortfall. Failures are never retried within
/// a cycle; the next cycle recomputes everything from scratch.
pub struct OrderLifecycleManager {
    market: MarketId,
    side: Side,
    cancel_order_wait_time: f64,
    last_refresh: Option<f64>,
}

impl OrderLifecycleManager {
    pub fn new(market: MarketId, side: Side, cancel_order_wait_time: f64) -> Self {
        Self {
            market,
            side,
            cancel_order_wait_time,
            last_refresh: None,
        }
    }

    /// Whether a cancel-then-replace cycle is due at `now` (seconds).
    /// Quotes refresh on the configured cadence, or faster near bin
    /// expiry, but never more often than the low-time threshold.
    pub fn refresh_due(&self, now: f64, remaining_bin_time: f64) -> bool {
        let since_last = match self.last_refresh {
            Some(last) => now - last,
            None => return true,
        };
        if since_last >= self.cancel_order_wait_time {
            return true;
        }
        remaining_bin_time < LOW_TIME_REFRESH_SECS && since_last >= LOW_TIME_REFRESH_SECS
    }

    /// Run one cycle: cancel all active orders, then place the bin's
    /// shortfall as a fresh limit order if it is nonzero, quantizable,
    /// and affordable.
    pub fn refresh(
        &mut self,
        now: f64,
        connector: &dyn ExchangeConnector,
        active_order_ids: &mut HashSet<String>,
        amount: f64,
        price: f64,
    ) -> Result<RefreshOutcome> {
        self.last_refresh = Some(now);
        self.cancel_all(connector, active_order_ids);

        if amount <= 0.0 {
            info!(market = %self.market, "bin target fully executed, no order this cycle");
            return Ok(RefreshOutcome::FullyExecuted);
        }

        let quantized_amount = connector.quantize_order_amount(&self.market, amount);
        let quantized_price = connector.quantize_order_price(&self.market, price);
        if quantized_amount <= 0.0 {
            warn!(
                market = %self.market,
                amount,
                "order amount quantizes to zero, skipping this cycle"
            );
            return Ok(RefreshOutcome::AmountTooSmall);
        }

        if !self.has_enough_balance(connector, quantized_amount)? {
            info!(
                market = %self.market,
                amount = quantized_amount,
                "insufficient balance for order, skipping this cycle"
            );
            return Ok(RefreshOutcome::InsufficientBalance);
        }

        let order_id =
            connector.place_limit_order(&self.market, self.side, quantized_amount, quantized_price)?;
        info!(
            market = %self.market,
            side = %self.side,
            amount = quantized_amount,
            price = quantized_price,
            order_id = %order_id,
            "limit order placed"
        );
        active_order_ids.insert(order_id.clone());

        Ok(RefreshOutcome::Placed {
            order_id,
            amount: quantized_amount,
            price: quantized_price,
        })
    }

    /// Feasibility: buys need quote balance at the book's
    /// volume-weighted price for the size, sells need base balance.
    /// Pure read; calling it twice with unchanged balances gives the
    /// same answer.
    pub fn has_enough_balance(
        &self,
        connector: &dyn ExchangeConnector,
        amount: f64,
    ) -> Result<bool> {
        Ok(match self.side {
            Side::Buy => {
                let quote_balance = connector.balance(&self.market.quote)?;
                let book_price = connector.price_for_volume(&self.market, true, amount)?;
                quote_balance >= amount * book_price
            }
            Side::Sell => connector.balance(&self.market.base)? >= amount,
        })
    }

    /// Cancel everything resting. Fire-and-forget: a cancel that errors
    /// is logged and dropped, the terminal event reconciles it later.
    pub fn cancel_all(
        &self,
        connector: &dyn ExchangeConnector,
        active_order_ids: &mut HashSet<String>,
    ) {
        for order_id in active_order_ids.drain() {
            match connector.cancel_order(&self.market, &order_id) {
                Ok(()) => debug!(order_id = %order_id, "cancel requested"),
                Err(err) => warn!(order_id = %order_id, error = %err, "cancel failed"),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::exchange::PaperExchange;
    use crate::models::MarketId;

    fn market() -> MarketId {
        MarketId::new("paper", "ETH-USDT").unwrap()
    }

    fn manager(side: Side) -> OrderLifecycleManager {
        OrderLifecycleManager::new(market(), side, 30.0)
    }

    #[test]
    fn test_first_refresh_is_always_due() {
        let mgr = manager(Side::Buy);
        assert!(mgr.refresh_due(0.0, 600.0));
    }

    #[test]
    fn test_refresh_cadence() {
        let mut mgr = manager(Side::Buy);
        let exchange = PaperExchange::with_seed(100.0, 1);
        exchange.deposit("USDT", 10_000.0);
        let mut active = HashSet::new();

        mgr.refresh(0.0, &exchange, &mut active, 1.0, 99.0).unwrap();
        assert!(!mgr.refresh_due(10.0, 500.0));
        assert!(!mgr.refresh_due(29.0, 500.0));
        assert!(mgr.refresh_due(30.0, 500.0));
    }

    #[test]
    fn test_low_bin_time_forces_refresh() {
        let mut mgr = manager(Side::Buy);
        let exchange = PaperExchange::with_seed(100.0, 1);
        exchange.deposit("USDT", 10_000.0);
        let mut active = HashSet::new();

        mgr.refresh(0.0, &exchange, &mut active, 1.0, 99.0).unwrap();
        // Bin about to close: refresh early, but not immediately again.
        assert!(mgr.refresh_due(12.0, 8.0));
        assert!(!mgr.refresh_due(5.0, 8.0));
    }

    #[test]
    fn test_cancel_then_replace() {
        let mut mgr = manager(Side::Buy);
        let exchange = PaperExchange::with_seed(100.0, 1);
        exchange.deposit("USDT", 10_000.0);
        let mut active = HashSet::new();

        let first = mgr.refresh(0.0, &exchange, &mut active, 1.0, 99.0).unwrap();
        let first_id = match first {
            RefreshOutcome::Placed { order_id, .. } => order_id,
            other => panic!("expected placement, got {other:?}"),
        };
        assert_eq!(active.len(), 1);
        assert_eq!(exchange.open_order_count(), 1);

        let second = mgr.refresh(30.0, &exchange, &mut active, 1.0, 99.5).unwrap();
        match second {
            RefreshOutcome::Placed { order_id, .. } => assert_ne!(order_id, first_id),
            other => panic!("expected placement, got {other:?}"),
        }
        // Old order cancelled, only the replacement rests.
        assert_eq!(active.len(), 1);
        assert_eq!(exchange.open_order_count(), 1);
        assert!(!active.contains(&first_id));
    }

    #[test]
    fn test_zero_shortfall_skips_placement() {
        let mut mgr = manager(Side::Buy);
        let exchange = PaperExchange::with_seed(100.0, 1);
        let mut active = HashSet::new();

        let outcome = mgr.refresh(0.0, &exchange, &mut active, 0.0, 99.0).unwrap();
        assert_eq!(outcome, RefreshOutcome::FullyExecuted);
        assert!(active.is_empty());
        assert_eq!(exchange.open_order_count(), 0);
    }

    #[test]
    fn test_amount_quantizing_to_zero_is_nonfatal() {
        let mut mgr = manager(Side::Buy);
        // Minimum order size of 1 whole unit.
        let exchange = PaperExchange::with_seed(100.0, 1).with_steps(1.0, 0.01);
        exchange.deposit("USDT", 10_000.0);
        let mut active = HashSet::new();

        let outcome = mgr.refresh(0.0, &exchange, &mut active, 0.4, 99.0).unwrap();
        assert_eq!(outcome, RefreshOutcome::AmountTooSmall);
        assert!(active.is_empty());
        assert_eq!(exchange.open_order_count(), 0);
    }

    #[test]
    fn test_buy_feasibility_uses_book_price() {
        let mgr = manager(Side::Buy);
        let exchange = PaperExchange::with_seed(100.0, 1);
        // Enough quote for 10 units at mid, but not at the book price
        // (mid plus slippage), so feasibility must reject.
        exchange.deposit("USDT", 1_000.0);
        assert!(!mgr.has_enough_balance(&exchange, 10.0).unwrap());
        assert!(mgr.has_enough_balance(&exchange, 9.0).unwrap());
    }

    #[test]
    fn test_sell_feasibility_uses_base_balance() {
        let mgr = manager(Side::Sell);
        let exchange = PaperExchange::with_seed(100.0, 1);
        exchange.deposit("ETH", 5.0);
        assert!(mgr.has_enough_balance(&exchange, 5.0).unwrap());
        assert!(!mgr.has_enough_balance(&exchange, 5.1).unwrap());
    }

    #[test]
    fn test_feasibility_is_idempotent() {
        let mgr = manager(Side::Sell);
        let exchange = PaperExchange::with_seed(100.0, 1);
        exchange.deposit("ETH", 5.0);
        let first = mgr.has_enough_balance(&exchange, 3.0).unwrap();
        let second = mgr.has_enough_balance(&exchange, 3.0).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_infeasible_order_is_skipped() {
        let mut mgr = manager(Side::Buy);
        let exchange = PaperExchange::with_seed(100.0, 1);
        // No quote balance at all.
        let mut active = HashSet::new();

        let outcome = mgr.refresh(0.0, &exchange, &mut active, 1.0, 99.0).unwrap();
        assert_eq!(outcome, RefreshOutcome::InsufficientBalance);
        assert_eq!(exchange.open_order_count(), 0);
    }
}
