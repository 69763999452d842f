//! Shared broker types: positions, clock, orders.

use serde::{Deserialize, Serialize};

/// A holding in the brokerage account. Owned by the broker; the
/// rebalancing engine only reads it.
#[derive(Debug, Clone, Serialize)]
pub struct Position {
    pub ticker: String,
    /// Whole shares held. Positive = long.
    pub quantity: f64,
    pub avg_entry_price: f64,
    pub market_price: f64,
    pub market_value_usd: f64,
}

/// Exchange clock snapshot.
#[derive(Debug, Clone, Copy, Deserialize)]
pub struct MarketClock {
    pub is_open: bool,
}

/// Buy or sell.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Side {
    Buy,
    Sell,
}

impl std::fmt::Display for Side {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Side::Buy => write!(f, "BUY"),
            Side::Sell => write!(f, "SELL"),
        }
    }
}

/// Order lifetime. Market orders are always day-valid here.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum TimeInForce {
    Day,
}

/// Acknowledgement for a submitted order. The id is opaque and
/// broker-assigned.
#[derive(Debug, Clone, Serialize)]
pub struct OrderAck {
    pub order_id: String,
}
