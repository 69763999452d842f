//! Target allocation (allocations.json) loading and validation.

use std::path::Path;

use serde::Deserialize;

use crate::error::{Error, Result};

/// An ordered target allocation from the caller.
#[derive(Debug, Clone, Deserialize)]
pub struct AllocationSpec {
    pub allocations: Vec<Allocation>,
}

/// A single target entry: ticker + fractional weight. Weights need not
/// sum to 1.0; the planner normalizes.
#[derive(Debug, Clone, Deserialize)]
pub struct Allocation {
    pub ticker: String,
    pub target_weight: f64,
}

impl AllocationSpec {
    /// Load and validate an allocations.json file.
    pub fn load(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path).map_err(|e| Error::AllocationRead {
            path: path.to_path_buf(),
            source: e,
        })?;
        let spec: AllocationSpec = serde_json::from_str(&contents)?;
        spec.validate()?;
        Ok(spec)
    }

    /// Parse from a JSON string (useful for testing).
    pub fn from_json(json: &str) -> Result<Self> {
        let spec: AllocationSpec = serde_json::from_str(json)?;
        spec.validate()?;
        Ok(spec)
    }

    /// Build directly from (ticker, weight) pairs.
    pub fn from_pairs(pairs: &[(&str, f64)]) -> Result<Self> {
        let spec = Self {
            allocations: pairs
                .iter()
                .map(|(t, w)| Allocation {
                    ticker: t.to_string(),
                    target_weight: *w,
                })
                .collect(),
        };
        spec.validate()?;
        Ok(spec)
    }

    /// Validate the allocation spec.
    fn validate(&self) -> Result<()> {
        if self.allocations.is_empty() {
            return Err(Error::Allocation("allocations list is empty".into()));
        }

        let mut seen = std::collections::HashSet::new();
        for a in &self.allocations {
            if a.ticker.is_empty() {
                return Err(Error::Allocation("empty ticker".into()));
            }
            if !seen.insert(&a.ticker) {
                return Err(Error::Allocation(format!("duplicate ticker: {}", a.ticker)));
            }
            if !a.target_weight.is_finite() {
                return Err(Error::Allocation(format!(
                    "weight for {} is not finite",
                    a.ticker
                )));
            }
            if a.target_weight <= 0.0 {
                return Err(Error::Allocation(format!(
                    "weight for {} ({}) must be > 0; omit the entry instead",
                    a.ticker, a.target_weight
                )));
            }
            if a.target_weight > 1.0 {
                return Err(Error::Allocation(format!(
                    "weight for {} ({}) exceeds 1.0",
                    a.ticker, a.target_weight
                )));
            }
        }

        Ok(())
    }

    /// Raw (un-normalized) weight sum.
    pub fn weights_sum(&self) -> f64 {
        self.allocations.iter().map(|a| a.target_weight).sum()
    }

    pub fn tickers(&self) -> Vec<&str> {
        self.allocations.iter().map(|a| a.ticker.as_str()).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn valid_json() -> &'static str {
        r#"{
            "allocations": [
                { "ticker": "SPY",  "target_weight": 0.60 },
                { "ticker": "AGG",  "target_weight": 0.40 }
            ]
        }"#
    }

    #[test]
    fn parse_valid_spec() {
        let spec = AllocationSpec::from_json(valid_json()).unwrap();
        assert_eq!(spec.allocations.len(), 2);
        assert_eq!(spec.allocations[0].ticker, "SPY");
        assert_eq!(spec.allocations[0].target_weight, 0.60);
    }

    #[test]
    fn weights_sum_is_raw() {
        let spec = AllocationSpec::from_pairs(&[("SPY", 0.3), ("AGG", 0.3)]).unwrap();
        assert!((spec.weights_sum() - 0.6).abs() < 1e-12);
    }

    #[test]
    fn reject_empty_list() {
        let json = r#"{"allocations":[]}"#;
        assert!(AllocationSpec::from_json(json).is_err());
    }

    #[test]
    fn reject_duplicate_tickers() {
        let json = r#"{
            "allocations": [
                { "ticker": "AAPL", "target_weight": 0.5 },
                { "ticker": "AAPL", "target_weight": 0.3 }
            ]
        }"#;
        assert!(AllocationSpec::from_json(json).is_err());
    }

    #[test]
    fn reject_zero_weight() {
        assert!(AllocationSpec::from_pairs(&[("AAPL", 0.0)]).is_err());
    }

    #[test]
    fn reject_negative_weight() {
        assert!(AllocationSpec::from_pairs(&[("AAPL", -0.1)]).is_err());
    }

    #[test]
    fn reject_weight_over_one() {
        assert!(AllocationSpec::from_pairs(&[("AAPL", 1.5)]).is_err());
    }

    #[test]
    fn reject_nan_weight() {
        assert!(AllocationSpec::from_pairs(&[("AAPL", f64::NAN)]).is_err());
    }

    #[test]
    fn tickers_list() {
        let spec = AllocationSpec::from_json(valid_json()).unwrap();
        assert_eq!(spec.tickers(), vec!["SPY", "AGG"]);
    }
}
