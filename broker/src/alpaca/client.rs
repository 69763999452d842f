//! Alpaca REST API client.

use std::time::Duration;

use log::debug;
use reqwest::blocking::Client;

use super::types::{AlpacaClock, AlpacaOrder, AlpacaPosition, Bar, BarsResponse, Snapshot};
use crate::error::BrokerError;
use crate::types::{Side, TimeInForce};

/// Blocking Alpaca REST client covering the trading and data APIs.
pub struct AlpacaClient {
    client: Client,
    key_id: String,
    secret_key: String,
    trading_url: String,
    data_url: String,
}

impl AlpacaClient {
    /// Create a new client with the given credentials and endpoints.
    pub fn new(
        key_id: &str,
        secret_key: &str,
        trading_url: &str,
        data_url: &str,
        timeout_secs: u64,
    ) -> Result<Self, BrokerError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()
            .map_err(|e| BrokerError::Connection(format!("http client init failed: {e}")))?;

        Ok(Self {
            client,
            key_id: key_id.to_string(),
            secret_key: secret_key.to_string(),
            trading_url: trading_url.trim_end_matches('/').to_string(),
            data_url: data_url.trim_end_matches('/').to_string(),
        })
    }

    fn get(&self, url: &str) -> Result<reqwest::blocking::Response, BrokerError> {
        let resp = self
            .client
            .get(url)
            .header("APCA-API-KEY-ID", &self.key_id)
            .header("APCA-API-SECRET-KEY", &self.secret_key)
            .send()
            .map_err(|e| BrokerError::Connection(format!("request failed: {e}")))?;

        if resp.status() == reqwest::StatusCode::UNAUTHORIZED
            || resp.status() == reqwest::StatusCode::FORBIDDEN
        {
            return Err(BrokerError::Auth(format!("{url} returned {}", resp.status())));
        }
        if !resp.status().is_success() {
            let status = resp.status();
            let body = resp.text().unwrap_or_default();
            return Err(BrokerError::Connection(format!(
                "{url} returned {status}: {body}"
            )));
        }
        Ok(resp)
    }

    /// Current positions (GET /v2/positions).
    pub fn positions(&self) -> Result<Vec<AlpacaPosition>, BrokerError> {
        let url = format!("{}/v2/positions", self.trading_url);
        self.get(&url)?
            .json::<Vec<AlpacaPosition>>()
            .map_err(|e| BrokerError::Connection(format!("failed to parse positions: {e}")))
    }

    /// Market clock (GET /v2/clock).
    pub fn clock(&self) -> Result<AlpacaClock, BrokerError> {
        let url = format!("{}/v2/clock", self.trading_url);
        self.get(&url)?
            .json::<AlpacaClock>()
            .map_err(|e| BrokerError::Connection(format!("failed to parse clock: {e}")))
    }

    /// Submit a day-valid market order (POST /v2/orders).
    pub fn submit_order(
        &self,
        symbol: &str,
        qty: u64,
        side: Side,
    ) -> Result<AlpacaOrder, BrokerError> {
        let url = format!("{}/v2/orders", self.trading_url);
        let body = serde_json::json!({
            "symbol": symbol,
            "qty": qty.to_string(),
            "side": match side { Side::Buy => "buy", Side::Sell => "sell" },
            "type": "market",
            "time_in_force": TimeInForce::Day,
        });

        debug!("Submitting Alpaca order: {body}");

        let resp = self
            .client
            .post(&url)
            .header("APCA-API-KEY-ID", &self.key_id)
            .header("APCA-API-SECRET-KEY", &self.secret_key)
            .json(&body)
            .send()
            .map_err(|e| BrokerError::Order(format!("order request failed: {e}")))?;

        if !resp.status().is_success() {
            let status = resp.status();
            let text = resp.text().unwrap_or_default();
            return Err(BrokerError::Order(format!(
                "order for {symbol} returned {status}: {text}"
            )));
        }

        resp.json::<AlpacaOrder>()
            .map_err(|e| BrokerError::Order(format!("failed to parse order response: {e}")))
    }

    /// Snapshot for one symbol (GET /v2/stocks/{symbol}/snapshot).
    pub fn snapshot(&self, symbol: &str) -> Result<Snapshot, BrokerError> {
        let url = format!("{}/v2/stocks/{symbol}/snapshot", self.data_url);
        self.get(&url)?
            .json::<Snapshot>()
            .map_err(|e| BrokerError::Connection(format!("failed to parse snapshot: {e}")))
    }

    /// Trailing daily bars (GET /v2/stocks/{symbol}/bars).
    pub fn daily_bars(&self, symbol: &str, limit: u32) -> Result<Vec<Bar>, BrokerError> {
        let url = format!(
            "{}/v2/stocks/{symbol}/bars?timeframe=1Day&limit={limit}",
            self.data_url
        );
        let resp = self
            .get(&url)?
            .json::<BarsResponse>()
            .map_err(|e| BrokerError::Connection(format!("failed to parse bars: {e}")))?;
        Ok(resp.bars.unwrap_or_default())
    }
}
