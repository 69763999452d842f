//! Alpaca-specific API response types.
//!
//! The trading API returns numeric fields as strings; they are parsed
//! at the `AlpacaBroker` boundary.

use serde::Deserialize;

/// Trading API position entry (GET /v2/positions).
#[derive(Debug, Deserialize)]
pub struct AlpacaPosition {
    pub symbol: String,
    pub qty: String,
    pub avg_entry_price: String,
    pub current_price: String,
    pub market_value: String,
}

/// Trading API clock (GET /v2/clock).
#[derive(Debug, Deserialize)]
pub struct AlpacaClock {
    pub is_open: bool,
    #[serde(default)]
    pub next_open: Option<String>,
    #[serde(default)]
    pub next_close: Option<String>,
}

/// Trading API order response (POST /v2/orders).
#[derive(Debug, Deserialize)]
pub struct AlpacaOrder {
    pub id: String,
    pub symbol: String,
    pub status: String,
    #[serde(default)]
    pub filled_qty: Option<String>,
}

/// Data API snapshot for one symbol.
#[derive(Debug, Default, Deserialize)]
pub struct Snapshot {
    #[serde(rename = "latestQuote")]
    pub latest_quote: Option<SnapshotQuote>,
    #[serde(rename = "latestTrade")]
    pub latest_trade: Option<SnapshotTrade>,
    #[serde(rename = "prevDailyBar")]
    pub prev_daily_bar: Option<Bar>,
}

#[derive(Debug, Deserialize)]
pub struct SnapshotQuote {
    /// Ask price.
    #[serde(rename = "ap")]
    pub ask_price: f64,
}

#[derive(Debug, Deserialize)]
pub struct SnapshotTrade {
    /// Last trade price.
    #[serde(rename = "p")]
    pub price: f64,
}

/// Daily bar from the data API.
#[derive(Debug, Deserialize)]
pub struct Bar {
    #[serde(rename = "c")]
    pub close: f64,
    #[serde(rename = "v")]
    pub volume: f64,
}

/// Data API bars response (GET /v2/stocks/{symbol}/bars).
#[derive(Debug, Deserialize)]
pub struct BarsResponse {
    #[serde(default)]
    pub bars: Option<Vec<Bar>>,
}
