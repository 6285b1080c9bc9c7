use crate::models::NetworkStatus;
use crate::scheduler::{Phase, StatusSnapshot};

/// User-facing notifications for events the operator must see even
/// without a log pipeline (startup failures, completion).
pub trait Notifier: Send + Sync {
    fn notify(&self, message: &str);
}

/// Prints notifications to stdout.
pub struct StdoutNotifier;

impl Notifier for StdoutNotifier {
    fn notify(&self, message: &str) {
        println!("{message}");
    }
}

fn phase_label(phase: Phase) -> &'static str {
    match phase {
        Phase::NotReady => "waiting for connector",
        Phase::WaitingMarkets => "waiting for markets",
        Phase::Active => "active",
        Phase::Terminal => "completed",
    }
}

/// Render a status snapshot as human-readable lines.
pub fn format_status(snapshot: &StatusSnapshot) -> String {
    let mut lines: Vec<String> = Vec::new();

    lines.push(String::new());
    lines.push("  Configuration:".to_string());
    lines.push(format!(
        "    Market: {}    Side: {}    Bin: {}/{}",
        snapshot.market, snapshot.side, snapshot.current_bin, snapshot.bin_count
    ));
    lines.push(format!(
        "    Remaining amount: {:.6} {}    Order price: {:.4} {}    Order size: {:.6} {}",
        snapshot.quantity_remaining,
        snapshot.market.base,
        snapshot.order_price,
        snapshot.market.quote,
        snapshot.order_size,
        snapshot.market.base,
    ));
    lines.push(format!("    Execution state: {}", phase_label(snapshot.phase)));

    if snapshot.active_orders > 0 {
        lines.push(String::new());
        lines.push(format!("  Active orders: {}", snapshot.active_orders));
    } else {
        lines.push(String::new());
        lines.push("  No active maker orders.".to_string());
    }

    lines.push(String::new());
    lines.push(format!(
        "  Average filled orders price: {:.4} {}",
        snapshot.average_fill_price, snapshot.market.quote
    ));
    lines.push(format!(
        "  Pending amount: {:.6} {}",
        snapshot.quantity_remaining, snapshot.market.base
    ));

    if snapshot.network == NetworkStatus::Disconnected {
        lines.push(String::new());
        lines.push("*** WARNINGS ***".to_string());
        lines.push(format!(
            "  Connection to {} is down. Orders are not being submitted.",
            snapshot.market.exchange
        ));
    }

    lines.join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{MarketId, Side};

    fn snapshot() -> StatusSnapshot {
        StatusSnapshot {
            phase: Phase::Active,
            market: MarketId::new("binance", "ETH-USDT").unwrap(),
            side: Side::Buy,
            current_bin: 2,
            bin_count: 6,
            quantity_remaining: 7.5,
            order_price: 99.4,
            order_size: 1.25,
            active_orders: 1,
            average_fill_price: 99.8,
            network: NetworkStatus::Connected,
        }
    }

    #[test]
    fn test_status_contains_key_fields() {
        let text = format_status(&snapshot());
        assert!(text.contains("Remaining amount: 7.500000 ETH"));
        assert!(text.contains("Order price: 99.4000 USDT"));
        assert!(text.contains("Bin: 2/6"));
        assert!(text.contains("Active orders: 1"));
        assert!(!text.contains("WARNINGS"));
    }

    #[test]
    fn test_disconnected_adds_warning_section() {
        let mut s = snapshot();
        s.network = NetworkStatus::Disconnected;
        s.active_orders = 0;
        let text = format_status(&s);
        assert!(text.contains("*** WARNINGS ***"));
        assert!(text.contains("No active maker orders."));
    }
}
