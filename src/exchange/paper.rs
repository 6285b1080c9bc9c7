use std::collections::HashMap;
use std::sync::Mutex;

use anyhow::{bail, Context, Result};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use uuid::Uuid;

use super::ExchangeConnector;
use crate::models::{MarketId, NetworkStatus, OrderEvent, Side};

/// In-memory exchange used by the live runner and the integration tests.
///
/// Resting limit orders fill when the simulated mid price walks within
/// `fill_window` of the limit price. Fills and cancellations are reported
/// as [`OrderEvent`]s drained by `step()`, which mimics the asynchronous
/// event dispatcher of a real connector.
pub struct PaperExchange {
    inner: Mutex<Inner>,
    amount_step: f64,
    price_step: f64,
}

struct Inner {
    mid_price: f64,
    balances: HashMap<String, f64>,
    open_orders: HashMap<String, OpenOrder>,
    pending_events: Vec<OrderEvent>,
    ready: bool,
    markets_ready: bool,
    network: NetworkStatus,
    drift: f64,
    fill_window: f64,
    partial_fill_prob: f64,
    rng: StdRng,
}

#[derive(Debug, Clone)]
struct OpenOrder {
    market: MarketId,
    side: Side,
    amount: f64,
    price: f64,
}

impl PaperExchange {
    pub fn new(mid_price: f64) -> Self {
        Self::with_seed(mid_price, rand::random())
    }

    /// Deterministic variant for tests.
    pub fn with_seed(mid_price: f64, seed: u64) -> Self {
        Self {
            inner: Mutex::new(Inner {
                mid_price,
                balances: HashMap::new(),
                open_orders: HashMap::new(),
                pending_events: Vec::new(),
                ready: true,
                markets_ready: true,
                network: NetworkStatus::Connected,
                drift: 0.0,
                fill_window: 0.0,
                partial_fill_prob: 0.0,
                rng: StdRng::seed_from_u64(seed),
            }),
            amount_step: 0.0001,
            price_step: 0.01,
        }
    }

    pub fn with_steps(mut self, amount_step: f64, price_step: f64) -> Self {
        self.amount_step = amount_step;
        self.price_step = price_step;
        self
    }

    /// Per-step relative random walk applied to the mid price.
    pub fn with_drift(self, drift: f64) -> Self {
        self.inner.lock().unwrap().drift = drift;
        self
    }

    /// Fractional distance from mid within which resting orders trade.
    pub fn with_fill_window(self, fill_window: f64) -> Self {
        self.inner.lock().unwrap().fill_window = fill_window;
        self
    }

    /// Probability that a crossing order fills only half its size.
    pub fn with_partial_fills(self, prob: f64) -> Self {
        self.inner.lock().unwrap().partial_fill_prob = prob;
        self
    }

    pub fn deposit(&self, asset: &str, amount: f64) {
        let mut inner = self.inner.lock().unwrap();
        *inner.balances.entry(asset.to_string()).or_insert(0.0) += amount;
    }

    pub fn set_mid_price(&self, price: f64) {
        self.inner.lock().unwrap().mid_price = price;
    }

    pub fn set_ready(&self, ready: bool) {
        self.inner.lock().unwrap().ready = ready;
    }

    pub fn set_markets_ready(&self, ready: bool) {
        self.inner.lock().unwrap().markets_ready = ready;
    }

    pub fn set_network(&self, status: NetworkStatus) {
        self.inner.lock().unwrap().network = status;
    }

    pub fn open_order_count(&self) -> usize {
        self.inner.lock().unwrap().open_orders.len()
    }

    /// Advance the simulation by one step: walk the mid price, match
    /// resting orders, and drain the accumulated lifecycle events.
    pub fn step(&self) -> Vec<OrderEvent> {
        let mut inner = self.inner.lock().unwrap();

        if inner.drift > 0.0 {
            let drift = inner.drift;
            let shock: f64 = inner.rng.gen_range(-drift..=drift);
            inner.mid_price *= 1.0 + shock;
        }

        let mid = inner.mid_price;
        let window = inner.fill_window;
        let crossing: Vec<String> = inner
            .open_orders
            .iter()
            .filter(|(_, order)| match order.side {
                Side::Buy => order.price >= mid * (1.0 - window),
                Side::Sell => order.price <= mid * (1.0 + window),
            })
            .map(|(id, _)| id.clone())
            .collect();

        for order_id in crossing {
            let partial_prob = inner.partial_fill_prob;
            let partial = partial_prob > 0.0 && inner.rng.gen_bool(partial_prob);
            let mut order = inner.open_orders.remove(&order_id).unwrap();

            let fill_amount = if partial { order.amount / 2.0 } else { order.amount };
            inner.settle(&order, fill_amount);
            inner.pending_events.push(OrderEvent::Fill {
                order_id: order_id.clone(),
                side: order.side,
                amount: fill_amount,
                price: order.price,
            });

            if partial {
                order.amount -= fill_amount;
                inner.open_orders.insert(order_id, order);
            } else {
                inner
                    .pending_events
                    .push(OrderEvent::Complete { order_id });
            }
        }

        std::mem::take(&mut inner.pending_events)
    }
}

impl Inner {
    fn settle(&mut self, order: &OpenOrder, amount: f64) {
        let notional = amount * order.price;
        let base = order.market.base.clone();
        let quote = order.market.quote.clone();
        match order.side {
            Side::Buy => {
                *self.balances.entry(base).or_insert(0.0) += amount;
                *self.balances.entry(quote).or_insert(0.0) -= notional;
            }
            Side::Sell => {
                *self.balances.entry(base).or_insert(0.0) -= amount;
                *self.balances.entry(quote).or_insert(0.0) += notional;
            }
        }
    }
}

fn quantize_down(value: f64, step: f64) -> f64 {
    if step <= 0.0 {
        return value;
    }
    // Tolerance keeps exact multiples from flooring one step short.
    (value / step + 1e-9).floor() * step
}

impl ExchangeConnector for PaperExchange {
    fn is_ready(&self) -> bool {
        self.inner.lock().unwrap().ready
    }

    fn market_ready(&self, _market: &MarketId) -> bool {
        let inner = self.inner.lock().unwrap();
        inner.ready && inner.markets_ready
    }

    fn network_status(&self) -> NetworkStatus {
        self.inner.lock().unwrap().network
    }

    fn mid_price(&self, _market: &MarketId) -> Result<f64> {
        let inner = self.inner.lock().unwrap();
        if inner.network == NetworkStatus::Disconnected {
            bail!("paper exchange disconnected");
        }
        Ok(inner.mid_price)
    }

    fn balance(&self, asset: &str) -> Result<f64> {
        let inner = self.inner.lock().unwrap();
        Ok(inner.balances.get(asset).copied().unwrap_or(0.0))
    }

    fn quantize_order_amount(&self, _market: &MarketId, amount: f64) -> f64 {
        quantize_down(amount, self.amount_step)
    }

    fn quantize_order_price(&self, _market: &MarketId, price: f64) -> f64 {
        quantize_down(price, self.price_step)
    }

    fn price_for_volume(&self, _market: &MarketId, is_buy: bool, _amount: f64) -> Result<f64> {
        let inner = self.inner.lock().unwrap();
        // Flat book: one tick of slippage against the taker.
        let slip = inner.mid_price * 0.0005;
        Ok(if is_buy {
            inner.mid_price + slip
        } else {
            inner.mid_price - slip
        })
    }

    fn place_limit_order(
        &self,
        market: &MarketId,
        side: Side,
        amount: f64,
        price: f64,
    ) -> Result<String> {
        let mut inner = self.inner.lock().unwrap();
        if !inner.ready {
            bail!("paper exchange not ready");
        }
        if amount <= 0.0 || price <= 0.0 {
            bail!("invalid order: amount={amount} price={price}");
        }
        let order_id = Uuid::new_v4().to_string();
        inner.open_orders.insert(
            order_id.clone(),
            OpenOrder {
                market: market.clone(),
                side,
                amount,
                price,
            },
        );
        Ok(order_id)
    }

    fn cancel_order(&self, _market: &MarketId, order_id: &str) -> Result<()> {
        let mut inner = self.inner.lock().unwrap();
        inner
            .open_orders
            .remove(order_id)
            .with_context(|| format!("no open order {order_id}"))?;
        inner.pending_events.push(OrderEvent::Cancelled {
            order_id: order_id.to_string(),
        });
        Ok(())
    }
}
