//! Pluggable asset classifiers: ETF allow-list and microcap threshold.
//!
//! Both are traits so the policy can later swap in a richer data
//! source without touching validator or planner logic.

use railbot_broker::marketdata::MarketData;

/// How a symbol is treated for per-symbol weight caps.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AssetClass {
    Etf,
    Stock,
}

/// Decides whether a ticker gets the ETF or the stock cap.
pub trait EtfClassifier {
    fn asset_class(&self, ticker: &str) -> AssetClass;
}

/// Decides whether a ticker counts toward the microcap exposure cap.
pub trait MicrocapClassifier {
    fn is_microcap(&self, ticker: &str) -> bool;
}

/// Known ETFs; anything not listed is treated as an individual stock
/// for cap purposes.
pub const DEFAULT_ETFS: &[&str] = &["SPY", "VOO", "QQQ", "VGT", "AGG", "IXUS"];

/// Static allow-list ETF classifier.
pub struct StaticEtfList {
    tickers: Vec<String>,
}

impl StaticEtfList {
    pub fn new(tickers: &[&str]) -> Self {
        Self {
            tickers: tickers.iter().map(|t| t.to_string()).collect(),
        }
    }
}

impl Default for StaticEtfList {
    fn default() -> Self {
        Self::new(DEFAULT_ETFS)
    }
}

impl EtfClassifier for StaticEtfList {
    fn asset_class(&self, ticker: &str) -> AssetClass {
        if self.tickers.iter().any(|t| t == ticker) {
            AssetClass::Etf
        } else {
            AssetClass::Stock
        }
    }
}

/// Microcap classifier: market cap below a fixed threshold.
///
/// Lookup failures fail open by default (the symbol is not counted as
/// microcap), which silently under-counts exposure during data
/// outages; set `fail_closed` to count unknowns instead.
pub struct MarketCapThreshold<'a> {
    market: &'a dyn MarketData,
    threshold_usd: f64,
    fail_closed: bool,
}

impl<'a> MarketCapThreshold<'a> {
    pub fn new(market: &'a dyn MarketData, threshold_usd: f64, fail_closed: bool) -> Self {
        Self {
            market,
            threshold_usd,
            fail_closed,
        }
    }
}

impl MicrocapClassifier for MarketCapThreshold<'_> {
    fn is_microcap(&self, ticker: &str) -> bool {
        match self.market.market_cap(ticker) {
            Ok(cap) => cap < self.threshold_usd,
            Err(_) => self.fail_closed,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use railbot_broker::StaticQuotes;

    #[test]
    fn default_list_classifies_spy_as_etf() {
        let etfs = StaticEtfList::default();
        assert_eq!(etfs.asset_class("SPY"), AssetClass::Etf);
        assert_eq!(etfs.asset_class("AGG"), AssetClass::Etf);
        assert_eq!(etfs.asset_class("AAPL"), AssetClass::Stock);
    }

    #[test]
    fn unknown_ticker_is_stock() {
        let etfs = StaticEtfList::new(&["VOO"]);
        assert_eq!(etfs.asset_class("ZZZZ"), AssetClass::Stock);
    }

    #[test]
    fn microcap_threshold() {
        let quotes = StaticQuotes::builder()
            .with_market_cap("TINY", 150e6)
            .with_market_cap("AAPL", 3000e9)
            .build();
        let classifier = MarketCapThreshold::new(&quotes, 300e6, false);
        assert!(classifier.is_microcap("TINY"));
        assert!(!classifier.is_microcap("AAPL"));
    }

    #[test]
    fn lookup_failure_fails_open_by_default() {
        let quotes = StaticQuotes::builder().build();
        let classifier = MarketCapThreshold::new(&quotes, 300e6, false);
        assert!(!classifier.is_microcap("NODATA"));
    }

    #[test]
    fn lookup_failure_fails_closed_when_configured() {
        let quotes = StaticQuotes::builder().build();
        let classifier = MarketCapThreshold::new(&quotes, 300e6, true);
        assert!(classifier.is_microcap("NODATA"));
    }
}
