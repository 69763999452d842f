//! Mock broker for testing. Implements the `Broker` trait with
//! configurable behavior.
//!
//! Use this in integration tests to simulate broker responses without
//! network calls.
//!
//! ```
//! use railbot_broker::mock::MockBroker;
//! use railbot_broker::Broker;
//!
//! let broker = MockBroker::builder()
//!     .with_position("AAPL", 100.0, 150.0)
//!     .market_open(true)
//!     .build();
//! assert!(broker.clock().unwrap().is_open);
//! ```

use std::sync::Mutex;

use crate::error::BrokerError;
use crate::types::*;
use crate::Broker;

/// A recorded order submission for assertion in tests.
#[derive(Clone, Debug)]
pub struct RecordedOrder {
    pub ticker: String,
    pub side: Side,
    pub quantity: u64,
}

/// Builder for `MockBroker`.
pub struct MockBrokerBuilder {
    positions: Vec<Position>,
    market_open: bool,
    clock_fails: bool,
    reject_tickers: Vec<String>,
}

impl MockBrokerBuilder {
    /// Seed a position at the given share count and price; market
    /// value is derived.
    pub fn with_position(mut self, ticker: &str, quantity: f64, price: f64) -> Self {
        self.positions.push(Position {
            ticker: ticker.to_string(),
            quantity,
            avg_entry_price: price,
            market_price: price,
            market_value_usd: quantity * price,
        });
        self
    }

    pub fn market_open(mut self, open: bool) -> Self {
        self.market_open = open;
        self
    }

    /// Make `clock()` return a connection error.
    pub fn clock_fails(mut self) -> Self {
        self.clock_fails = true;
        self
    }

    /// Reject any order for this ticker.
    pub fn reject_ticker(mut self, ticker: &str) -> Self {
        self.reject_tickers.push(ticker.to_string());
        self
    }

    pub fn build(self) -> MockBroker {
        MockBroker {
            positions: self.positions,
            market_open: self.market_open,
            clock_fails: self.clock_fails,
            reject_tickers: self.reject_tickers,
            submitted: Mutex::new(Vec::new()),
        }
    }
}

/// A mock broker that records submitted orders and returns
/// configurable responses.
pub struct MockBroker {
    positions: Vec<Position>,
    market_open: bool,
    clock_fails: bool,
    reject_tickers: Vec<String>,
    submitted: Mutex<Vec<RecordedOrder>>,
}

impl MockBroker {
    pub fn builder() -> MockBrokerBuilder {
        MockBrokerBuilder {
            positions: Vec::new(),
            market_open: true,
            clock_fails: false,
            reject_tickers: Vec::new(),
        }
    }

    /// Get all orders that were submitted (for assertion in tests).
    pub fn submitted_orders(&self) -> Vec<RecordedOrder> {
        self.submitted.lock().unwrap().clone()
    }
}

impl Broker for MockBroker {
    fn positions(&self) -> Result<Vec<Position>, BrokerError> {
        Ok(self.positions.clone())
    }

    fn clock(&self) -> Result<MarketClock, BrokerError> {
        if self.clock_fails {
            return Err(BrokerError::Connection("mock: clock unavailable".into()));
        }
        Ok(MarketClock {
            is_open: self.market_open,
        })
    }

    fn submit_market_order(
        &self,
        ticker: &str,
        qty: u64,
        side: Side,
    ) -> Result<OrderAck, BrokerError> {
        if self.reject_tickers.iter().any(|t| t == ticker) {
            return Err(BrokerError::Order(format!("mock: {ticker} rejected")));
        }

        let mut submitted = self.submitted.lock().unwrap();
        submitted.push(RecordedOrder {
            ticker: ticker.to_string(),
            side,
            quantity: qty,
        });

        Ok(OrderAck {
            order_id: format!("mock-{}", submitted.len()),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builder_basic() {
        let broker = MockBroker::builder()
            .with_position("AAPL", 100.0, 150.0)
            .build();

        let positions = broker.positions().unwrap();
        assert_eq!(positions.len(), 1);
        assert_eq!(positions[0].ticker, "AAPL");
        assert_eq!(positions[0].market_value_usd, 15_000.0);
    }

    #[test]
    fn submit_records_orders() {
        let broker = MockBroker::builder().build();

        let ack = broker.submit_market_order("AAPL", 50, Side::Buy).unwrap();
        assert_eq!(ack.order_id, "mock-1");

        let recorded = broker.submitted_orders();
        assert_eq!(recorded.len(), 1);
        assert_eq!(recorded[0].ticker, "AAPL");
        assert_eq!(recorded[0].quantity, 50);
        assert_eq!(recorded[0].side, Side::Buy);
    }

    #[test]
    fn reject_ticker_mode() {
        let broker = MockBroker::builder().reject_ticker("TSLA").build();

        assert!(broker.submit_market_order("TSLA", 10, Side::Buy).is_err());
        assert!(broker.submit_market_order("AAPL", 10, Side::Buy).is_ok());
        // Only the accepted order was recorded
        assert_eq!(broker.submitted_orders().len(), 1);
    }

    #[test]
    fn clock_modes() {
        let open = MockBroker::builder().market_open(true).build();
        assert!(open.clock().unwrap().is_open);

        let closed = MockBroker::builder().market_open(false).build();
        assert!(!closed.clock().unwrap().is_open);

        let broken = MockBroker::builder().clock_fails().build();
        assert!(broken.clock().is_err());
    }
}
