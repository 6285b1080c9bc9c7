// Exchange connector seam
pub mod paper;

pub use paper::PaperExchange;

use crate::models::{MarketId, NetworkStatus, Side};
use anyhow::Result;

/// Market data and order entry, as seen by the scheduler.
///
/// Calls are expected to be non-blocking: placement returns an order id
/// synchronously and fills arrive later through the event dispatcher.
/// Cancellation is fire-and-forget; the terminal `Cancelled` event
/// confirms it.
pub trait ExchangeConnector: Send + Sync {
    /// Connector-level readiness (sockets up, metadata loaded).
    fn is_ready(&self) -> bool;

    /// Per-market readiness (order book initialized, trading rules known).
    fn market_ready(&self, market: &MarketId) -> bool;

    fn network_status(&self) -> NetworkStatus;

    fn mid_price(&self, market: &MarketId) -> Result<f64>;

    fn balance(&self, asset: &str) -> Result<f64>;

    /// Round an order amount down to the market's minimum increment.
    fn quantize_order_amount(&self, market: &MarketId, amount: f64) -> f64;

    /// Round an order price to the market's tick size.
    fn quantize_order_price(&self, market: &MarketId, price: f64) -> f64;

    /// Volume-weighted book price for the requested size. Used for
    /// feasibility, not for quoting.
    fn price_for_volume(&self, market: &MarketId, is_buy: bool, amount: f64) -> Result<f64>;

    fn place_limit_order(
        &self,
        market: &MarketId,
        side: Side,
        amount: f64,
        price: f64,
    ) -> Result<String>;

    fn cancel_order(&self, market: &MarketId, order_id: &str) -> Result<()>;
}
