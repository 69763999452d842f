//! TOML configuration loading and validation.

use std::path::Path;

use serde::Deserialize;

use crate::error::{Error, Result};

/// Top-level configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub connection: ConnectionConfig,
    pub account: AccountConfig,
    #[serde(default)]
    pub policy: GuardrailPolicy,
    #[serde(default)]
    pub execution: ExecutionConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ConnectionConfig {
    pub key_id: String,
    pub secret_key: String,
    #[serde(default = "default_trading_url")]
    pub trading_url: String,
    #[serde(default = "default_data_url")]
    pub data_url: String,
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,
}

fn default_trading_url() -> String {
    "https://paper-api.alpaca.markets".into()
}
fn default_data_url() -> String {
    "https://data.alpaca.markets".into()
}
fn default_timeout() -> u64 {
    30
}

#[derive(Debug, Clone, Deserialize)]
pub struct AccountConfig {
    pub id: String,
}

/// Numeric guardrail limits, immutable per rebalance call.
///
/// Includes the tolerance bands (order-noise dollar band, weight-sum
/// drift tolerance) so tests and deployments can tune them without
/// touching planner code.
#[derive(Debug, Clone, Deserialize)]
pub struct GuardrailPolicy {
    /// Per-symbol weight cap for individual stocks.
    #[serde(default = "default_max_weight_stock")]
    pub max_weight_stock: f64,
    /// Per-symbol weight cap for allow-listed ETFs.
    #[serde(default = "default_max_weight_etf")]
    pub max_weight_etf: f64,
    /// Cap on the combined weight of microcap symbols.
    #[serde(default = "default_max_microcap_total")]
    pub max_microcap_total: f64,
    /// Symbols priced below this floor fail validation.
    #[serde(default = "default_min_price")]
    pub min_price: f64,
    /// Symbols below this trailing liquidity floor get a warning.
    #[serde(default = "default_min_avg_dollar_volume")]
    pub min_avg_dollar_volume: f64,
    /// Fraction of budget withheld from investment.
    #[serde(default = "default_cash_buffer")]
    pub cash_buffer: f64,
    /// Gate order submission on the exchange clock.
    #[serde(default = "default_true")]
    pub market_hours_only: bool,
    /// Reserved; the planner only emits long buy/sell-to-flat orders.
    #[serde(default)]
    pub allow_shorts: bool,
    /// Dollar cap on any single order.
    #[serde(default = "default_max_order_usd")]
    pub max_order_usd: f64,
    /// Dollar cap a single symbol's position may reach after a buy.
    #[serde(default = "default_max_position_usd")]
    pub max_position_usd: f64,
    /// Current-vs-desired band inside which no order is planned.
    #[serde(default = "default_order_tolerance_usd")]
    pub order_tolerance_usd: f64,
    /// Allowed drift of the raw weight sum from 1.0 before warning.
    #[serde(default = "default_weight_sum_tolerance")]
    pub weight_sum_tolerance: f64,
    /// Market-cap threshold below which a symbol counts as microcap.
    #[serde(default = "default_microcap_threshold_usd")]
    pub microcap_threshold_usd: f64,
    /// Count symbols with failed market-cap lookups as microcap
    /// instead of silently under-counting exposure.
    #[serde(default)]
    pub microcap_fail_closed: bool,
}

fn default_max_weight_stock() -> f64 {
    0.10
}
fn default_max_weight_etf() -> f64 {
    0.20
}
fn default_max_microcap_total() -> f64 {
    0.20
}
fn default_min_price() -> f64 {
    1.0
}
fn default_min_avg_dollar_volume() -> f64 {
    1_000_000.0
}
fn default_cash_buffer() -> f64 {
    0.05
}
fn default_true() -> bool {
    true
}
fn default_max_order_usd() -> f64 {
    5_000.0
}
fn default_max_position_usd() -> f64 {
    20_000.0
}
fn default_order_tolerance_usd() -> f64 {
    1.0
}
fn default_weight_sum_tolerance() -> f64 {
    1e-3
}
fn default_microcap_threshold_usd() -> f64 {
    300_000_000.0
}

impl Default for GuardrailPolicy {
    fn default() -> Self {
        Self {
            max_weight_stock: default_max_weight_stock(),
            max_weight_etf: default_max_weight_etf(),
            max_microcap_total: default_max_microcap_total(),
            min_price: default_min_price(),
            min_avg_dollar_volume: default_min_avg_dollar_volume(),
            cash_buffer: default_cash_buffer(),
            market_hours_only: true,
            allow_shorts: false,
            max_order_usd: default_max_order_usd(),
            max_position_usd: default_max_position_usd(),
            order_tolerance_usd: default_order_tolerance_usd(),
            weight_sum_tolerance: default_weight_sum_tolerance(),
            microcap_threshold_usd: default_microcap_threshold_usd(),
            microcap_fail_closed: false,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct ExecutionConfig {
    /// Pause between consecutive order submissions.
    #[serde(default = "default_interval")]
    pub order_interval_ms: u64,
    /// Trailing sessions used for the liquidity average.
    #[serde(default = "default_volume_days")]
    pub avg_volume_days: u32,
}

fn default_interval() -> u64 {
    200
}
fn default_volume_days() -> u32 {
    20
}

impl Default for ExecutionConfig {
    fn default() -> Self {
        Self {
            order_interval_ms: default_interval(),
            avg_volume_days: default_volume_days(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_dir")]
    pub dir: String,
    #[serde(default = "default_audit_file")]
    pub audit_file: String,
}

fn default_log_dir() -> String {
    "./logs".into()
}
fn default_audit_file() -> String {
    "audit.jsonl".into()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            dir: default_log_dir(),
            audit_file: default_audit_file(),
        }
    }
}

impl Config {
    /// Load config from a TOML file.
    pub fn load(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path).map_err(|e| Error::ConfigRead {
            path: path.to_path_buf(),
            source: e,
        })?;
        let config: Config = toml::from_str(&contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Validate config invariants.
    pub fn validate(&self) -> Result<()> {
        if self.connection.key_id.is_empty() || self.connection.secret_key.is_empty() {
            return Err(Error::Config("API credentials must not be empty".into()));
        }
        if self.account.id.is_empty() {
            return Err(Error::Config("account id must not be empty".into()));
        }
        self.policy.validate()
    }

    /// Full path to the audit log file.
    pub fn audit_path(&self) -> std::path::PathBuf {
        Path::new(&self.logging.dir).join(&self.logging.audit_file)
    }
}

impl GuardrailPolicy {
    /// Validate policy invariants.
    pub fn validate(&self) -> Result<()> {
        if self.max_weight_stock <= 0.0 || self.max_weight_stock > 1.0 {
            return Err(Error::Config(
                "max_weight_stock must be in (0.0, 1.0]".into(),
            ));
        }
        if self.max_weight_etf <= 0.0 || self.max_weight_etf > 1.0 {
            return Err(Error::Config("max_weight_etf must be in (0.0, 1.0]".into()));
        }
        if self.max_microcap_total < 0.0 || self.max_microcap_total > 1.0 {
            return Err(Error::Config(
                "max_microcap_total must be in [0.0, 1.0]".into(),
            ));
        }
        if self.min_price < 0.0 {
            return Err(Error::Config("min_price must be >= 0".into()));
        }
        if self.cash_buffer < 0.0 || self.cash_buffer >= 1.0 {
            return Err(Error::Config("cash_buffer must be in [0.0, 1.0)".into()));
        }
        if self.max_order_usd <= 0.0 {
            return Err(Error::Config("max_order_usd must be > 0".into()));
        }
        if self.max_position_usd <= 0.0 {
            return Err(Error::Config("max_position_usd must be > 0".into()));
        }
        if self.order_tolerance_usd < 0.0 {
            return Err(Error::Config("order_tolerance_usd must be >= 0".into()));
        }
        if self.weight_sum_tolerance < 0.0 {
            return Err(Error::Config("weight_sum_tolerance must be >= 0".into()));
        }
        if self.microcap_threshold_usd <= 0.0 {
            return Err(Error::Config("microcap_threshold_usd must be > 0".into()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn example_toml() -> &'static str {
        r#"
[connection]
key_id = "PKTESTKEY"
secret_key = "testsecret"
trading_url = "https://paper-api.alpaca.markets"
data_url = "https://data.alpaca.markets"
timeout_secs = 30

[account]
id = "PA3TEST01"

[policy]
max_weight_stock = 0.10
max_weight_etf = 0.20
max_microcap_total = 0.20
min_price = 1.0
min_avg_dollar_volume = 1000000.0
cash_buffer = 0.05
market_hours_only = true
allow_shorts = false
max_order_usd = 5000.0
max_position_usd = 20000.0

[execution]
order_interval_ms = 200
avg_volume_days = 20

[logging]
dir = "./logs"
audit_file = "audit.jsonl"
"#
    }

    #[test]
    fn parse_example_config() {
        let config: Config = toml::from_str(example_toml()).unwrap();
        assert_eq!(config.connection.key_id, "PKTESTKEY");
        assert_eq!(config.account.id, "PA3TEST01");
        assert_eq!(config.policy.max_weight_stock, 0.10);
        assert_eq!(config.policy.max_order_usd, 5000.0);
        assert_eq!(config.execution.order_interval_ms, 200);
        config.validate().unwrap();
    }

    #[test]
    fn defaults_fill_missing_sections() {
        let minimal = r#"
[connection]
key_id = "k"
secret_key = "s"

[account]
id = "acct"
"#;
        let config: Config = toml::from_str(minimal).unwrap();
        assert_eq!(config.policy.max_weight_etf, 0.20);
        assert_eq!(config.policy.cash_buffer, 0.05);
        assert!(config.policy.market_hours_only);
        assert!(!config.policy.allow_shorts);
        assert_eq!(config.policy.order_tolerance_usd, 1.0);
        assert_eq!(config.policy.weight_sum_tolerance, 1e-3);
        assert_eq!(config.policy.microcap_threshold_usd, 300_000_000.0);
        assert_eq!(config.execution.avg_volume_days, 20);
        assert_eq!(config.logging.audit_file, "audit.jsonl");
    }

    #[test]
    fn validate_catches_empty_account() {
        let mut config: Config = toml::from_str(example_toml()).unwrap();
        config.account.id.clear();
        assert!(config.validate().is_err());
    }

    #[test]
    fn validate_catches_bad_stock_cap() {
        let mut config: Config = toml::from_str(example_toml()).unwrap();
        config.policy.max_weight_stock = 1.5;
        assert!(config.validate().is_err());
    }

    #[test]
    fn validate_catches_bad_cash_buffer() {
        let mut config: Config = toml::from_str(example_toml()).unwrap();
        config.policy.cash_buffer = 1.0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn validate_catches_negative_tolerance() {
        let mut config: Config = toml::from_str(example_toml()).unwrap();
        config.policy.order_tolerance_usd = -1.0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn audit_path() {
        let config: Config = toml::from_str(example_toml()).unwrap();
        assert_eq!(
            config.audit_path(),
            std::path::PathBuf::from("./logs/audit.jsonl")
        );
    }
}
