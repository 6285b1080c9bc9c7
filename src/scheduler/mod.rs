// Time-sliced execution scheduler
pub mod bins;
pub mod driver;
pub mod lifecycle;
pub mod plan;
pub mod quantity;
pub mod spread;

pub use bins::{BinPosition, BinSchedule};
pub use driver::{Phase, StatusSnapshot, TwapScheduler};
pub use lifecycle::{OrderLifecycleManager, RefreshOutcome};
pub use plan::{ExecutionPlan, PlanError};
pub use quantity::QuantityTracker;
pub use spread::SpreadModel;

use crate::models::{OrderEvent, Side};

/// Order lifecycle callbacks the scheduler exposes to the event
/// dispatcher. The dispatcher must serialize these relative to each
/// other and to `tick`; no two entry points run in parallel.
pub trait EventSink {
    fn on_fill(&mut self, order_id: &str, side: Side, amount: f64, price: f64);
    fn on_complete(&mut self, order_id: &str);
    fn on_cancel(&mut self, order_id: &str);
    fn on_fail(&mut self, order_id: &str);
    fn on_expire(&mut self, order_id: &str);

    /// Route a bundled event to the matching callback.
    fn on_event(&mut self, event: &OrderEvent) {
        match event {
            OrderEvent::Fill {
                order_id,
                side,
                amount,
                price,
            } => self.on_fill(order_id, *side, *amount, *price),
            OrderEvent::Complete { order_id } => self.on_complete(order_id),
            OrderEvent::Cancelled { order_id } => self.on_cancel(order_id),
            OrderEvent::Failed { order_id } => self.on_fail(order_id),
            OrderEvent::Expired { order_id } => self.on_expire(order_id),
        }
    }
}
