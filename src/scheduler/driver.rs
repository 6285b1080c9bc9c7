use std::collections::HashSet;
use std::sync::Arc;

use anyhow::Result;
use tracing::{debug, info, warn};

use super::{
    BinSchedule, EventSink, ExecutionPlan, OrderLifecycleManager, QuantityTracker, SpreadModel,
};
use crate::exchange::ExchangeConnector;
use crate::models::{MarketId, NetworkStatus, Side};

/// Lifecycle of the scheduler itself.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    /// Connector not ready yet.
    NotReady,
    /// Connector up, waiting for the market to report ready.
    WaitingMarkets,
    /// Ticking through bins and quoting.
    Active,
    /// Horizon exhausted or target reached; ticks are no-ops.
    Terminal,
}

#[derive(Debug, Clone, Copy)]
struct FillStats {
    amount: f64,
    notional: f64,
}

/// Point-in-time view of the scheduler for reporting.
#[derive(Debug, Clone)]
pub struct StatusSnapshot {
    pub phase: Phase,
    pub market: MarketId,
    pub side: Side,
    pub current_bin: u32,
    pub bin_count: u32,
    pub quantity_remaining: f64,
    pub order_price: f64,
    pub order_size: f64,
    pub active_orders: usize,
    pub average_fill_price: f64,
    pub network: NetworkStatus,
}

/// Time-sliced execution scheduler.
///
/// Driven by a host clock calling [`tick`](Self::tick) at roughly 1 Hz
/// with non-decreasing timestamps, and by an event dispatcher invoking
/// the [`EventSink`] callbacks. Both entry points take `&mut self`, so
/// the single-writer contract of the host is enforced by the borrow
/// checker rather than a lock.
pub struct TwapScheduler {
    plan: ExecutionPlan,
    connector: Arc<dyn ExchangeConnector>,
    bins: BinSchedule,
    spread: SpreadModel,
    lifecycle: OrderLifecycleManager,

    phase: Phase,
    waiting_logged: bool,
    start_time: Option<f64>,
    current_bin: u32,
    /// Glide-path tracker, anchored to the balance at the first active tick.
    quantity: Option<QuantityTracker>,
    current_balance: f64,
    current_order_price: f64,
    current_order_size: f64,
    active_order_ids: HashSet<String>,
    fills: FillStats,
    last_status_report: f64,
}

impl TwapScheduler {
    pub fn new(plan: ExecutionPlan, connector: Arc<dyn ExchangeConnector>) -> Self {
        let bins = BinSchedule::from_plan(&plan);
        let spread = SpreadModel::from_plan(&plan);
        let lifecycle = OrderLifecycleManager::new(
            plan.market.clone(),
            plan.side,
            plan.cancel_order_wait_time,
        );
        Self {
            plan,
            connector,
            bins,
            spread,
            lifecycle,
            phase: Phase::NotReady,
            waiting_logged: false,
            start_time: None,
            current_bin: 0,
            quantity: None,
            current_balance: 0.0,
            current_order_price: 0.0,
            current_order_size: 0.0,
            active_order_ids: HashSet::new(),
            fills: FillStats {
                amount: 0.0,
                notional: 0.0,
            },
            last_status_report: 0.0,
        }
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn plan(&self) -> &ExecutionPlan {
        &self.plan
    }

    /// One scheduler step. Called serially by the host clock; never
    /// blocks, never raises past a log entry for transient conditions.
    pub fn tick(&mut self, timestamp: f64) -> Result<()> {
        match self.phase {
            Phase::Terminal => {
                debug!(market = %self.plan.market, "terminal, tick is a no-op");
                Ok(())
            }
            Phase::NotReady => {
                self.check_connector_ready();
                Ok(())
            }
            Phase::WaitingMarkets => {
                self.check_markets_ready(timestamp);
                Ok(())
            }
            Phase::Active => self.active_tick(timestamp),
        }
    }

    fn check_connector_ready(&mut self) {
        if self.connector.is_ready() {
            info!(market = %self.plan.market, "connector ready, waiting for markets");
            self.phase = Phase::WaitingMarkets;
            self.waiting_logged = false;
        } else if !self.waiting_logged {
            warn!(market = %self.plan.market, "connector not ready, please wait");
            self.waiting_logged = true;
        }
    }

    fn check_markets_ready(&mut self, timestamp: f64) {
        if !self.connector.market_ready(&self.plan.market) {
            if !self.waiting_logged {
                warn!(market = %self.plan.market, "market not ready, please wait");
                self.waiting_logged = true;
            }
            return;
        }

        let balance = match self.connector.balance(&self.plan.market.base) {
            Ok(balance) => balance,
            Err(err) => {
                warn!(error = %err, "balance query failed, waiting to start");
                return;
            }
        };
        self.current_balance = balance;
        self.quantity = Some(QuantityTracker::new(&self.plan, balance));
        self.start_time = Some(timestamp);
        self.last_status_report = timestamp;
        self.phase = Phase::Active;
        info!(
            market = %self.plan.market,
            side = %self.plan.side,
            target = self.plan.target_amount,
            bins = self.plan.bin_count,
            time_per_bin_secs = self.bins.time_per_bin(),
            "market ready, trading started"
        );
    }

    fn active_tick(&mut self, timestamp: f64) -> Result<()> {
        self.maybe_report_status(timestamp);

        let start_time = self.start_time.unwrap_or(timestamp);
        let elapsed = timestamp - start_time;
        let position = self.bins.position(elapsed);

        // Bin index is monotonic even if the host clock stutters.
        if position.bin > self.current_bin {
            self.current_bin = position.bin;
            info!(
                market = %self.plan.market,
                bin = self.current_bin,
                of = self.plan.bin_count,
                "entering bin"
            );
        }

        // Refresh the balance cache from the connector; the event-path
        // increments are only a fast path over this read.
        match self.connector.balance(&self.plan.market.base) {
            Ok(balance) => self.current_balance = balance,
            Err(err) => {
                warn!(error = %err, "balance query failed, pausing this tick");
                return Ok(());
            }
        }

        let tracker = self
            .quantity
            .as_ref()
            .cloned()
            .unwrap_or_else(|| QuantityTracker::new(&self.plan, self.current_balance));

        if tracker.is_complete(self.current_balance) {
            self.finish("target amount fully executed");
            return Ok(());
        }
        if position.terminal {
            self.finish("execution horizon exhausted");
            return Ok(());
        }

        let mid_price = match self.connector.mid_price(&self.plan.market) {
            Ok(price) => price,
            Err(err) => {
                warn!(error = %err, "mid price unavailable, pausing this tick");
                return Ok(());
            }
        };

        self.current_order_price = self
            .spread
            .order_price(mid_price, position.remaining_bin_time);
        self.current_order_size = tracker.bin_remaining(self.current_bin, self.current_balance);

        if self
            .lifecycle
            .refresh_due(timestamp, position.remaining_bin_time)
        {
            match self.lifecycle.refresh(
                timestamp,
                self.connector.as_ref(),
                &mut self.active_order_ids,
                self.current_order_size,
                self.current_order_price,
            ) {
                Ok(super::RefreshOutcome::Placed { amount, price, .. }) => {
                    // Report what actually rests on the book.
                    self.current_order_size = amount;
                    self.current_order_price = price;
                }
                Ok(_) => {}
                Err(err) => warn!(error = %err, "order refresh failed, retrying next cycle"),
            }
        }

        Ok(())
    }

    /// Cancel whatever is resting and stop issuing orders.
    fn finish(&mut self, reason: &str) {
        self.lifecycle
            .cancel_all(self.connector.as_ref(), &mut self.active_order_ids);
        self.phase = Phase::Terminal;
        info!(
            market = %self.plan.market,
            balance = self.current_balance,
            average_fill_price = self.average_fill_price(),
            "{reason}"
        );
    }

    fn maybe_report_status(&mut self, timestamp: f64) {
        if timestamp - self.last_status_report < self.plan.status_report_interval {
            return;
        }
        self.last_status_report = timestamp;
        if self.connector.network_status() == NetworkStatus::Disconnected {
            warn!(
                market = %self.plan.market,
                "connector disconnected, orders will not reach the exchange"
            );
        }
        let snapshot = self.status();
        info!(
            bin = snapshot.current_bin,
            of = snapshot.bin_count,
            remaining = snapshot.quantity_remaining,
            order_price = snapshot.order_price,
            order_size = snapshot.order_size,
            active_orders = snapshot.active_orders,
            "status report"
        );
    }

    /// Volume-weighted average price over all fills so far.
    pub fn average_fill_price(&self) -> f64 {
        if self.fills.amount > 0.0 {
            self.fills.notional / self.fills.amount
        } else {
            0.0
        }
    }

    pub fn status(&self) -> StatusSnapshot {
        let quantity_remaining = self
            .quantity
            .as_ref()
            .map(|t| t.total_remaining(self.current_balance))
            .unwrap_or(self.plan.target_amount);
        StatusSnapshot {
            phase: self.phase,
            market: self.plan.market.clone(),
            side: self.plan.side,
            current_bin: self.current_bin,
            bin_count: self.plan.bin_count,
            quantity_remaining,
            order_price: self.current_order_price,
            order_size: self.current_order_size,
            active_orders: self.active_order_ids.len(),
            average_fill_price: self.average_fill_price(),
            network: self.connector.network_status(),
        }
    }

    fn clear_order(&mut self, order_id: &str, event: &str) {
        // Quantity needs no manual re-add: it is recomputed from the
        // live balance next tick.
        if self.active_order_ids.remove(order_id) {
            info!(order_id = %order_id, "order {event}, cleared from active set");
        } else {
            debug!(order_id = %order_id, "{event} for unknown order, ignoring");
        }
    }
}

impl EventSink for TwapScheduler {
    fn on_fill(&mut self, order_id: &str, side: Side, amount: f64, price: f64) {
        info!(
            order_id = %order_id,
            side = %side,
            amount,
            price,
            "limit {side} order filled for {amount} {}",
            self.plan.market.base
        );
        // Fast-path balance cache; the next tick's query reconciles it.
        match side {
            Side::Buy => self.current_balance += amount,
            Side::Sell => self.current_balance -= amount,
        }
        self.fills.amount += amount;
        self.fills.notional += amount * price;
    }

    fn on_complete(&mut self, order_id: &str) {
        self.clear_order(order_id, "completed");
    }

    fn on_cancel(&mut self, order_id: &str) {
        self.clear_order(order_id, "cancelled");
    }

    fn on_fail(&mut self, order_id: &str) {
        self.clear_order(order_id, "failed");
    }

    fn on_expire(&mut self, order_id: &str) {
        self.clear_order(order_id, "expired");
    }
}
