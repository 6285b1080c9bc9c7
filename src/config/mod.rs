use serde::Deserialize;

use crate::models::{InvalidMarket, MarketId, Side};
use crate::scheduler::{ExecutionPlan, PlanError};

/// Operator-facing settings, deserialized from a TOML file layered with
/// `TWAP_`-prefixed environment variables. Spread is given in percent
/// here (matching the prompt convention traders expect) and converted
/// to a fraction exactly once, on the way into the plan.
#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    pub exchange: String,
    /// `BASE-QUOTE`, e.g. `ETH-USDT`.
    pub trading_pair: String,
    /// `buy` or `sell`.
    pub trade_side: String,
    /// Base-asset quantity to execute.
    pub target_asset_amount: f64,
    /// Total execution duration, minutes.
    pub duration_minutes: f64,
    /// Number of time slices over the duration.
    pub bin_count: u32,
    /// Maximum distance from mid at the start of each bin, in percent.
    pub max_spread_pct: f64,
    /// Seconds between quote refreshes; floored at 10.
    pub cancel_order_wait_time: Option<f64>,
    /// Seconds between status reports; default 900.
    pub status_report_interval: Option<f64>,
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to load configuration: {0}")]
    Load(#[from] config::ConfigError),
    #[error("trade side must be 'buy' or 'sell', got '{0}'")]
    InvalidSide(String),
    #[error(transparent)]
    Market(#[from] InvalidMarket),
    #[error(transparent)]
    Plan(#[from] PlanError),
}

impl Settings {
    /// Load from `path` (optional file) plus environment overrides,
    /// e.g. `TWAP_TARGET_ASSET_AMOUNT=2.5`.
    pub fn load(path: &str) -> Result<Self, ConfigError> {
        let settings = config::Config::builder()
            .add_source(config::File::with_name(path).required(false))
            .add_source(config::Environment::with_prefix("TWAP"))
            .build()?
            .try_deserialize()?;
        Ok(settings)
    }

    /// Validate into an immutable plan. Any invalid field rejects the
    /// whole configuration; nothing is silently defaulted.
    pub fn into_plan(self) -> Result<ExecutionPlan, ConfigError> {
        let side = match self.trade_side.to_lowercase().as_str() {
            "buy" => Side::Buy,
            "sell" => Side::Sell,
            other => return Err(ConfigError::InvalidSide(other.to_string())),
        };
        let market = MarketId::new(&self.exchange, &self.trading_pair)?;
        let plan = ExecutionPlan::new(
            market,
            side,
            self.target_asset_amount,
            self.duration_minutes,
            self.bin_count,
            self.max_spread_pct / 100.0,
            self.cancel_order_wait_time,
            self.status_report_interval,
        )?;
        Ok(plan)
    }
}
