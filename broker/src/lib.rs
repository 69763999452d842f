//! Broker and market-data traits for railbot.
//!
//! The rebalancing engine talks to two external collaborators: a
//! brokerage account (positions, market clock, order submission) and a
//! price source (last trade price, trailing liquidity, market cap).
//! Both are traits here so the engine can run against `MockBroker` /
//! `StaticQuotes` in tests and against Alpaca in production.
//!
//! Implementations:
//!
//! - **Alpaca** (feature `alpaca`): paper/live trading REST API plus
//!   the stocks data API for prices.

pub mod error;
pub mod marketdata;
pub mod mock;
pub mod types;

#[cfg(feature = "alpaca")]
pub mod alpaca;

pub use error::BrokerError;
pub use marketdata::{MarketData, MarketDataError, StaticQuotes};
pub use types::*;

/// A brokerage account connection.
pub trait Broker {
    /// Current holdings snapshot.
    fn positions(&self) -> Result<Vec<Position>, BrokerError>;

    /// Exchange clock (open/closed).
    fn clock(&self) -> Result<MarketClock, BrokerError>;

    /// Submit a day-valid market order. Returns the broker-assigned id.
    fn submit_market_order(
        &self,
        ticker: &str,
        qty: u64,
        side: Side,
    ) -> Result<OrderAck, BrokerError>;
}
