//! CURRENT→TARGET rebalance planner.
//!
//! Compares current position values against desired dollar values
//! (normalized weights over the investable budget) and emits capped
//! whole-share buy/sell intents. Positions held but absent from the
//! target get sold down to zero, since their desired value defaults
//! to 0.

use std::cell::RefCell;

use railbot_broker::marketdata::MarketData;
use railbot_broker::types::Position;
use rustc_hash::FxHashMap;
use serde::Serialize;

use crate::config::GuardrailPolicy;
use crate::error::{Error, Result};

/// A planned, not-yet-submitted order. Quantities are whole shares,
/// always >= 1.
#[derive(Debug, Clone, Serialize)]
pub struct OrderIntent {
    pub ticker: String,
    pub qty: u64,
    /// qty x price at planning time.
    pub est_value: f64,
}

/// The computed sell and buy lists for one rebalance call.
#[derive(Debug, Clone, Default, Serialize)]
pub struct RebalancePlan {
    #[serde(rename = "sell")]
    pub sells: Vec<OrderIntent>,
    #[serde(rename = "buy")]
    pub buys: Vec<OrderIntent>,
}

impl RebalancePlan {
    pub fn is_empty(&self) -> bool {
        self.sells.is_empty() && self.buys.is_empty()
    }
}

/// Per-call price cache so each ticker hits the price source at most
/// once per planning pass.
struct PriceCache<'a> {
    market: &'a dyn MarketData,
    cache: RefCell<FxHashMap<String, f64>>,
}

impl<'a> PriceCache<'a> {
    fn new(market: &'a dyn MarketData) -> Self {
        Self {
            market,
            cache: RefCell::new(FxHashMap::default()),
        }
    }

    fn last_price(&self, ticker: &str) -> Result<f64> {
        if let Some(&price) = self.cache.borrow().get(ticker) {
            return Ok(price);
        }
        let price = self
            .market
            .last_price(ticker)
            .map_err(|e| Error::PriceUnavailable {
                ticker: ticker.to_string(),
                reason: e.to_string(),
            })?;
        // A zero or negative quote cannot size a whole-share order.
        if !(price.is_finite() && price > 0.0) {
            return Err(Error::PriceUnavailable {
                ticker: ticker.to_string(),
                reason: format!("non-positive price {price}"),
            });
        }
        self.cache.borrow_mut().insert(ticker.to_string(), price);
        Ok(price)
    }
}

/// Normalize raw target weights to sum to 1.0. A zero (or non-finite)
/// sum yields an empty map.
pub fn normalize_weights(targets: &[(String, f64)]) -> FxHashMap<String, f64> {
    let sum: f64 = targets.iter().map(|(_, w)| w).sum();
    if !(sum.is_finite() && sum > 0.0) {
        return FxHashMap::default();
    }
    targets
        .iter()
        .map(|(t, w)| (t.clone(), w / sum))
        .collect()
}

/// Compute the minimal capped order set moving `positions` toward the
/// target weights.
///
/// Fails with `Error::PriceUnavailable` if a ticker that needs an
/// order has no resolvable price, since an order cannot be sized without
/// one. Tickers already inside the tolerance band never hit the price
/// source.
pub fn plan(
    positions: &[Position],
    targets: &[(String, f64)],
    budget: f64,
    policy: &GuardrailPolicy,
    market: &dyn MarketData,
) -> Result<RebalancePlan> {
    let prices = PriceCache::new(market);

    let normalized = normalize_weights(targets);
    let investable = budget * (1.0 - policy.cash_buffer);

    let desired: FxHashMap<&str, f64> = normalized
        .iter()
        .map(|(t, w)| (t.as_str(), investable * w))
        .collect();

    let current: FxHashMap<&str, f64> = positions
        .iter()
        .map(|p| (p.ticker.as_str(), p.market_value_usd))
        .collect();

    // Universe = held tickers ∪ target tickers, sorted for
    // deterministic order.
    let mut universe: Vec<&str> = current.keys().copied().collect();
    universe.extend(desired.keys().copied());
    universe.sort_unstable();
    universe.dedup();

    let band = policy.order_tolerance_usd;
    let mut sells = Vec::new();
    let mut buys = Vec::new();

    for ticker in universe {
        let cur = current.get(ticker).copied().unwrap_or(0.0);
        let des = desired.get(ticker).copied().unwrap_or(0.0);

        if cur > des + band {
            let amount = (cur - des).min(policy.max_order_usd);
            let price = prices.last_price(ticker)?;
            let qty = (amount / price).floor() as u64;
            // Guard against a sub-share sell attempt.
            if qty >= 1 && amount > price {
                sells.push(OrderIntent {
                    ticker: ticker.to_string(),
                    qty,
                    est_value: qty as f64 * price,
                });
            }
        } else if des > cur + band {
            let headroom = (policy.max_position_usd - cur).max(0.0);
            let amount = (des - cur).min(policy.max_order_usd).min(headroom);
            let price = prices.last_price(ticker)?;
            let qty = (amount / price).floor() as u64;
            if qty >= 1 {
                buys.push(OrderIntent {
                    ticker: ticker.to_string(),
                    qty,
                    est_value: qty as f64 * price,
                });
            }
        }
        // Within the band: already at target, no order.
    }

    Ok(RebalancePlan { sells, buys })
}

/// Convenience: target pairs from an allocation spec.
pub fn target_pairs(spec: &crate::alloc::AllocationSpec) -> Vec<(String, f64)> {
    spec.allocations
        .iter()
        .map(|a| (a.ticker.clone(), a.target_weight))
        .collect()
}
