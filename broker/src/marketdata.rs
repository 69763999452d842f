//! Market-data trait and a static in-memory implementation for tests.

use rustc_hash::FxHashMap;

/// Errors from the price source.
#[derive(Debug, thiserror::Error)]
pub enum MarketDataError {
    #[error("no price data for {0}")]
    NoData(String),

    #[error("provider error: {0}")]
    Provider(String),

    #[error("market cap not available for {0}")]
    NoMarketCap(String),
}

/// A price source: last trade price, trailing liquidity, market cap.
pub trait MarketData {
    /// Most recent close/trade price. Hard error if no data exists in
    /// the trailing window.
    fn last_price(&self, ticker: &str) -> Result<f64, MarketDataError>;

    /// Mean of (close x volume) over the trailing `days` sessions.
    /// Returns 0.0, not an error, when no data is found; callers use
    /// this only for a non-blocking liquidity warning.
    fn avg_dollar_volume(&self, ticker: &str, days: u32) -> f64;

    /// Market capitalization in USD. Fallible; the microcap classifier
    /// decides whether a failure fails open or closed.
    fn market_cap(&self, ticker: &str) -> Result<f64, MarketDataError>;
}

/// In-memory quotes for tests: seed prices, volumes, and market caps
/// through the builder.
///
/// ```
/// use railbot_broker::StaticQuotes;
/// use railbot_broker::marketdata::MarketData;
///
/// let quotes = StaticQuotes::builder()
///     .with_price("AAPL", 150.0)
///     .with_avg_dollar_volume("AAPL", 5_000_000.0)
///     .build();
/// assert_eq!(quotes.last_price("AAPL").unwrap(), 150.0);
/// assert!(quotes.last_price("MSFT").is_err());
/// ```
pub struct StaticQuotes {
    prices: FxHashMap<String, f64>,
    volumes: FxHashMap<String, f64>,
    market_caps: FxHashMap<String, f64>,
}

/// Builder for `StaticQuotes`.
#[derive(Default)]
pub struct StaticQuotesBuilder {
    prices: FxHashMap<String, f64>,
    volumes: FxHashMap<String, f64>,
    market_caps: FxHashMap<String, f64>,
}

impl StaticQuotesBuilder {
    pub fn with_price(mut self, ticker: &str, price: f64) -> Self {
        self.prices.insert(ticker.to_string(), price);
        self
    }

    pub fn with_avg_dollar_volume(mut self, ticker: &str, volume: f64) -> Self {
        self.volumes.insert(ticker.to_string(), volume);
        self
    }

    pub fn with_market_cap(mut self, ticker: &str, cap: f64) -> Self {
        self.market_caps.insert(ticker.to_string(), cap);
        self
    }

    pub fn build(self) -> StaticQuotes {
        StaticQuotes {
            prices: self.prices,
            volumes: self.volumes,
            market_caps: self.market_caps,
        }
    }
}

impl StaticQuotes {
    pub fn builder() -> StaticQuotesBuilder {
        StaticQuotesBuilder::default()
    }
}

impl MarketData for StaticQuotes {
    fn last_price(&self, ticker: &str) -> Result<f64, MarketDataError> {
        self.prices
            .get(ticker)
            .copied()
            .ok_or_else(|| MarketDataError::NoData(ticker.to_string()))
    }

    fn avg_dollar_volume(&self, ticker: &str, _days: u32) -> f64 {
        self.volumes.get(ticker).copied().unwrap_or(0.0)
    }

    fn market_cap(&self, ticker: &str) -> Result<f64, MarketDataError> {
        self.market_caps
            .get(ticker)
            .copied()
            .ok_or_else(|| MarketDataError::NoMarketCap(ticker.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_price_is_error() {
        let quotes = StaticQuotes::builder().build();
        assert!(quotes.last_price("AAPL").is_err());
    }

    #[test]
    fn missing_volume_is_zero() {
        let quotes = StaticQuotes::builder().with_price("AAPL", 150.0).build();
        assert_eq!(quotes.avg_dollar_volume("AAPL", 20), 0.0);
    }

    #[test]
    fn seeded_values_round_trip() {
        let quotes = StaticQuotes::builder()
            .with_price("SPY", 500.0)
            .with_avg_dollar_volume("SPY", 2_000_000.0)
            .with_market_cap("SPY", 400e9)
            .build();
        assert_eq!(quotes.last_price("SPY").unwrap(), 500.0);
        assert_eq!(quotes.avg_dollar_volume("SPY", 20), 2_000_000.0);
        assert_eq!(quotes.market_cap("SPY").unwrap(), 400e9);
    }
}
