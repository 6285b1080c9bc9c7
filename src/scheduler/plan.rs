use crate::models::{MarketId, Side};

/// Immutable description of one execution: what to trade, over how long,
/// and how wide to quote. Validated at construction; a rejected plan
/// never reaches the scheduler.
#[derive(Debug, Clone, PartialEq)]
pub struct ExecutionPlan {
    pub market: MarketId,
    pub side: Side,
    /// Base-asset quantity to acquire (buy) or dispose (sell).
    pub target_amount: f64,
    /// Execution horizon in seconds.
    pub total_duration: f64,
    /// Number of equal time slices the horizon is divided into.
    pub bin_count: u32,
    /// Maximum fractional offset from mid price (0.01 = 1%).
    pub max_spread: f64,
    /// Seconds between cancel-then-replace cycles, floored at 10.
    pub cancel_order_wait_time: f64,
    /// Seconds between periodic status/connectivity reports.
    pub status_report_interval: f64,
}

#[derive(Debug, Clone, thiserror::Error, PartialEq)]
pub enum PlanError {
    #[error("target amount must be positive, got {0}")]
    NonPositiveAmount(f64),
    #[error("duration must be positive, got {0} minutes")]
    NonPositiveDuration(f64),
    #[error("bin count must be at least 1")]
    ZeroBins,
    #[error("max spread must be non-negative, got {0}")]
    NegativeSpread(f64),
}

impl ExecutionPlan {
    pub const MIN_CANCEL_WAIT_SECS: f64 = 10.0;
    pub const DEFAULT_CANCEL_WAIT_SECS: f64 = 30.0;
    pub const DEFAULT_STATUS_REPORT_SECS: f64 = 900.0;

    /// Build a plan. `duration_minutes` follows the operator-facing
    /// convention; it is stored in seconds. `max_spread` is a fraction.
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        market: MarketId,
        side: Side,
        target_amount: f64,
        duration_minutes: f64,
        bin_count: u32,
        max_spread: f64,
        cancel_order_wait_time: Option<f64>,
        status_report_interval: Option<f64>,
    ) -> Result<Self, PlanError> {
        if target_amount <= 0.0 || !target_amount.is_finite() {
            return Err(PlanError::NonPositiveAmount(target_amount));
        }
        if duration_minutes <= 0.0 || !duration_minutes.is_finite() {
            return Err(PlanError::NonPositiveDuration(duration_minutes));
        }
        if bin_count == 0 {
            return Err(PlanError::ZeroBins);
        }
        if max_spread < 0.0 || !max_spread.is_finite() {
            return Err(PlanError::NegativeSpread(max_spread));
        }

        let cancel_order_wait_time = cancel_order_wait_time
            .unwrap_or(Self::DEFAULT_CANCEL_WAIT_SECS)
            .max(Self::MIN_CANCEL_WAIT_SECS);

        Ok(Self {
            market,
            side,
            target_amount,
            total_duration: duration_minutes * 60.0,
            bin_count,
            max_spread,
            cancel_order_wait_time,
            status_report_interval: status_report_interval
                .unwrap_or(Self::DEFAULT_STATUS_REPORT_SECS),
        })
    }

    pub fn time_per_bin(&self) -> f64 {
        self.total_duration / self.bin_count as f64
    }
}
