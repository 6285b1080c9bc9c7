use serde::{Deserialize, Serialize};
use std::fmt;

/// Order side
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum Side {
    Buy,
    Sell,
}

impl Side {
    pub fn is_buy(&self) -> bool {
        matches!(self, Side::Buy)
    }
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Side::Buy => write!(f, "buy"),
            Side::Sell => write!(f, "sell"),
        }
    }
}

/// Value-type market identifier: exchange id plus trading pair.
///
/// Validated at construction so every downstream lookup can assume
/// well-formed base/quote assets.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub struct MarketId {
    pub exchange: String,
    pub base: String,
    pub quote: String,
}

#[derive(Debug, Clone, thiserror::Error, PartialEq)]
pub enum InvalidMarket {
    #[error("exchange id must not be empty")]
    EmptyExchange,
    #[error("trading pair must be BASE-QUOTE, got '{0}'")]
    BadPair(String),
}

impl MarketId {
    /// Build from an exchange id and a `BASE-QUOTE` pair string.
    pub fn new(exchange: &str, pair: &str) -> Result<Self, InvalidMarket> {
        if exchange.trim().is_empty() {
            return Err(InvalidMarket::EmptyExchange);
        }
        let (base, quote) = pair
            .split_once('-')
            .ok_or_else(|| InvalidMarket::BadPair(pair.to_string()))?;
        if base.is_empty() || quote.is_empty() {
            return Err(InvalidMarket::BadPair(pair.to_string()));
        }
        Ok(Self {
            exchange: exchange.to_string(),
            base: base.to_string(),
            quote: quote.to_string(),
        })
    }

    pub fn pair(&self) -> String {
        format!("{}-{}", self.base, self.quote)
    }
}

impl fmt::Display for MarketId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}-{}", self.exchange, self.base, self.quote)
    }
}

/// Connector network state
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum NetworkStatus {
    Connected,
    Disconnected,
}

/// Order lifecycle notification delivered by the event dispatcher.
///
/// The scheduler never owns order records; it only reacts to these and
/// holds order ids for cancellation requests.
#[derive(Debug, Clone, PartialEq)]
pub enum OrderEvent {
    Fill {
        order_id: String,
        side: Side,
        amount: f64,
        price: f64,
    },
    Complete {
        order_id: String,
    },
    Cancelled {
        order_id: String,
    },
    Failed {
        order_id: String,
    },
    Expired {
        order_id: String,
    },
}

impl OrderEvent {
    pub fn order_id(&self) -> &str {
        match self {
            OrderEvent::Fill { order_id, .. }
            | OrderEvent::Complete { order_id }
            | OrderEvent::Cancelled { order_id }
            | OrderEvent::Failed { order_id }
            | OrderEvent::Expired { order_id } => order_id,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_market_id_parsing() {
        let market = MarketId::new("binance", "ETH-USDT").unwrap();
        assert_eq!(market.base, "ETH");
        assert_eq!(market.quote, "USDT");
        assert_eq!(market.pair(), "ETH-USDT");
        assert_eq!(market.to_string(), "binance:ETH-USDT");
    }

    #[test]
    fn test_market_id_rejects_empty_exchange() {
        assert_eq!(
            MarketId::new("  ", "ETH-USDT"),
            Err(InvalidMarket::EmptyExchange)
        );
    }

    #[test]
    fn test_market_id_rejects_malformed_pair() {
        assert!(MarketId::new("binance", "ETHUSDT").is_err());
        assert!(MarketId::new("binance", "ETH-").is_err());
        assert!(MarketId::new("binance", "-USDT").is_err());
    }

    #[test]
    fn test_order_event_exposes_its_id() {
        let fill = OrderEvent::Fill {
            order_id: "a1".to_string(),
            side: Side::Buy,
            amount: 1.0,
            price: 100.0,
        };
        assert_eq!(fill.order_id(), "a1");
        assert_eq!(
            OrderEvent::Cancelled {
                order_id: "b2".to_string()
            }
            .order_id(),
            "b2"
        );
        assert_eq!(
            OrderEvent::Expired {
                order_id: "c3".to_string()
            }
            .order_id(),
            "c3"
        );
    }

    #[test]
    fn test_side_display() {
        assert_eq!(Side::Buy.to_string(), "buy");
        assert_eq!(Side::Sell.to_string(), "sell");
        assert!(Side::Buy.is_buy());
        assert!(!Side::Sell.is_buy());
    }
}
