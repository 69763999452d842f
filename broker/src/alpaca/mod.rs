//! Alpaca broker and market-data implementation.
//!
//! Uses the trading REST API (paper or live) for account operations and
//! the stocks data API for prices. Blocking (sync) via reqwest::blocking.

pub mod client;
pub mod types;

use crate::error::BrokerError;
use crate::marketdata::{MarketData, MarketDataError};
use crate::types::*;
use crate::Broker;
use client::AlpacaClient;

/// Default paper-trading endpoint.
pub const PAPER_TRADING_URL: &str = "https://paper-api.alpaca.markets";
/// Stocks data API endpoint.
pub const DATA_URL: &str = "https://data.alpaca.markets";

/// Alpaca brokerage connection implementing both `Broker` and
/// `MarketData`.
pub struct AlpacaBroker {
    client: AlpacaClient,
}

impl AlpacaBroker {
    /// Create a broker handle against the given trading and data URLs.
    pub fn new(
        key_id: &str,
        secret_key: &str,
        trading_url: &str,
        data_url: &str,
        timeout_secs: u64,
    ) -> Result<Self, BrokerError> {
        let client = AlpacaClient::new(key_id, secret_key, trading_url, data_url, timeout_secs)?;
        Ok(Self { client })
    }

    /// Paper-trading handle with default endpoints.
    pub fn paper(key_id: &str, secret_key: &str) -> Result<Self, BrokerError> {
        Self::new(key_id, secret_key, PAPER_TRADING_URL, DATA_URL, 30)
    }

    /// The underlying REST client (for advanced operations).
    pub fn client(&self) -> &AlpacaClient {
        &self.client
    }

    fn parse_num(field: &str, s: &str) -> Result<f64, BrokerError> {
        s.parse()
            .map_err(|_| BrokerError::Other(format!("malformed {field} field {s:?}")))
    }
}

impl Broker for AlpacaBroker {
    fn positions(&self) -> Result<Vec<Position>, BrokerError> {
        let raw = self.client.positions()?;

        raw.iter()
            .map(|p| {
                Ok(Position {
                    ticker: p.symbol.clone(),
                    quantity: Self::parse_num("qty", &p.qty)?,
                    avg_entry_price: Self::parse_num("avg_entry_price", &p.avg_entry_price)?,
                    market_price: Self::parse_num("current_price", &p.current_price)?,
                    market_value_usd: Self::parse_num("market_value", &p.market_value)?,
                })
            })
            .collect()
    }

    fn clock(&self) -> Result<MarketClock, BrokerError> {
        let clock = self.client.clock()?;
        Ok(MarketClock {
            is_open: clock.is_open,
        })
    }

    fn submit_market_order(
        &self,
        ticker: &str,
        qty: u64,
        side: Side,
    ) -> Result<OrderAck, BrokerError> {
        let resp = self.client.submit_order(ticker, qty, side)?;
        Ok(OrderAck { order_id: resp.id })
    }
}

impl MarketData for AlpacaBroker {
    fn last_price(&self, ticker: &str) -> Result<f64, MarketDataError> {
        let snapshot = self
            .client
            .snapshot(ticker)
            .map_err(|e| MarketDataError::Provider(e.to_string()))?;

        // Fallback chain: latest quote ask -> latest trade -> previous
        // daily close.
        let price = snapshot
            .latest_quote
            .as_ref()
            .map(|q| q.ask_price)
            .filter(|p| *p > 0.0)
            .or_else(|| {
                snapshot
                    .latest_trade
                    .as_ref()
                    .map(|t| t.price)
                    .filter(|p| *p > 0.0)
            })
            .or_else(|| {
                snapshot
                    .prev_daily_bar
                    .as_ref()
                    .map(|b| b.close)
                    .filter(|p| *p > 0.0)
            });

        price.ok_or_else(|| MarketDataError::NoData(ticker.to_string()))
    }

    fn avg_dollar_volume(&self, ticker: &str, days: u32) -> f64 {
        // No data at all feeds only a non-blocking liquidity warning,
        // so this returns 0.0 rather than erroring.
        let bars = match self.client.daily_bars(ticker, days) {
            Ok(bars) => bars,
            Err(_) => return 0.0,
        };
        if bars.is_empty() {
            return 0.0;
        }
        let total: f64 = bars.iter().map(|b| b.close * b.volume).sum();
        total / bars.len() as f64
    }

    fn market_cap(&self, ticker: &str) -> Result<f64, MarketDataError> {
        // The stocks data API has no fundamentals endpoint; the
        // microcap classifier fails open on this.
        Err(MarketDataError::NoMarketCap(ticker.to_string()))
    }
}
