//! Pre-trade allocation validation against the guardrail policy.
//!
//! Produces an exhaustive report in one pass: errors never halt
//! iteration, so a caller sees every problem at once.

use log::debug;
use railbot_broker::marketdata::MarketData;
use serde::Serialize;

use crate::alloc::AllocationSpec;
use crate::classify::{AssetClass, EtfClassifier, MicrocapClassifier};
use crate::config::{ExecutionConfig, GuardrailPolicy};

/// Outcome of validating a target allocation. Warnings never block
/// execution; `ok` is true iff `errors` is empty.
#[derive(Debug, Clone, Serialize)]
pub struct ValidationReport {
    pub ok: bool,
    pub errors: Vec<String>,
    pub warnings: Vec<String>,
    /// Raw target weight sum, before normalization.
    pub weights_sum: f64,
    /// Combined weight of symbols classified as microcap.
    pub microcap_weight: f64,
}

impl std::fmt::Display for ValidationReport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(
            f,
            "VALIDATION: {}",
            if self.ok { "PASS" } else { "FAIL" }
        )?;
        for e in &self.errors {
            writeln!(f, "  [ERROR] {e}")?;
        }
        for w in &self.warnings {
            writeln!(f, "  [WARN]  {w}")?;
        }
        Ok(())
    }
}

/// Validate proposed target weights against the policy.
pub fn validate(
    spec: &AllocationSpec,
    policy: &GuardrailPolicy,
    execution: &ExecutionConfig,
    market: &dyn MarketData,
    etfs: &dyn EtfClassifier,
    microcaps: &dyn MicrocapClassifier,
) -> ValidationReport {
    let mut errors = Vec::new();
    let mut warnings = Vec::new();
    let mut microcap_weight = 0.0_f64;

    let weights_sum = spec.weights_sum();

    for a in &spec.allocations {
        let ticker = a.ticker.as_str();

        // A priceless ticker must not silently pass; record and skip
        // the remaining per-symbol checks.
        let price = match market.last_price(ticker) {
            Ok(p) => p,
            Err(e) => {
                errors.push(format!("{ticker}: price error ({e})"));
                continue;
            }
        };

        if price < policy.min_price {
            errors.push(format!(
                "{ticker}: price ${price:.2} below ${:.2} minimum",
                policy.min_price
            ));
        }

        let adv = market.avg_dollar_volume(ticker, execution.avg_volume_days);
        if adv < policy.min_avg_dollar_volume {
            warnings.push(format!(
                "{ticker}: avg dollar volume ${adv:.0} below ${:.0} floor",
                policy.min_avg_dollar_volume
            ));
        }

        let (cap, label) = match etfs.asset_class(ticker) {
            AssetClass::Etf => (policy.max_weight_etf, "ETF"),
            AssetClass::Stock => (policy.max_weight_stock, "stock"),
        };
        if a.target_weight > cap {
            errors.push(format!(
                "{ticker}: weight {:.1}% exceeds {:.1}% {label} cap",
                a.target_weight * 100.0,
                cap * 100.0,
            ));
        }

        if microcaps.is_microcap(ticker) {
            microcap_weight += a.target_weight;
        }
    }

    if microcap_weight > policy.max_microcap_total {
        errors.push(format!(
            "microcap exposure {:.1}% exceeds {:.1}% cap",
            microcap_weight * 100.0,
            policy.max_microcap_total * 100.0,
        ));
    }

    let drift = (weights_sum - 1.0).abs();
    if drift > policy.weight_sum_tolerance
        && drift > policy.weight_sum_tolerance * weights_sum.abs()
    {
        warnings.push(format!(
            "weights sum to {weights_sum:.4}; they will be renormalized for planning"
        ));
    }

    debug!(
        "validation: {} errors, {} warnings, weights_sum={weights_sum:.4}",
        errors.len(),
        warnings.len()
    );

    ValidationReport {
        ok: errors.is_empty(),
        errors,
        warnings,
        weights_sum,
        microcap_weight,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classify::{MarketCapThreshold, StaticEtfList};
    use railbot_broker::StaticQuotes;

    fn policy() -> GuardrailPolicy {
        GuardrailPolicy::default()
    }

    fn execution() -> ExecutionConfig {
        ExecutionConfig::default()
    }

    fn liquid(quotes: railbot_broker::marketdata::StaticQuotesBuilder, ticker: &str, price: f64)
        -> railbot_broker::marketdata::StaticQuotesBuilder
    {
        quotes
            .with_price(ticker, price)
            .with_avg_dollar_volume(ticker, 10_000_000.0)
            .with_market_cap(ticker, 50e9)
    }

    fn run(spec: &AllocationSpec, quotes: &StaticQuotes, policy: &GuardrailPolicy) -> ValidationReport {
        let etfs = StaticEtfList::default();
        let microcaps = MarketCapThreshold::new(quotes, policy.microcap_threshold_usd, false);
        validate(spec, policy, &execution(), quotes, &etfs, &microcaps)
    }

    #[test]
    fn clean_etf_allocation_passes() {
        // Five ETFs at the 20% cap exactly, summing to 1.0.
        let tickers = [("SPY", 500.0), ("VOO", 460.0), ("QQQ", 430.0), ("AGG", 100.0), ("IXUS", 70.0)];
        let spec = AllocationSpec::from_pairs(
            &tickers.map(|(t, _)| (t, 0.2)),
        )
        .unwrap();
        let mut builder = StaticQuotes::builder();
        for (t, price) in tickers {
            builder = liquid(builder, t, price);
        }
        let quotes = builder.build();

        let report = run(&spec, &quotes, &policy());
        assert!(report.ok, "errors: {:?}", report.errors);
        assert!(report.warnings.is_empty(), "warnings: {:?}", report.warnings);
        assert!((report.weights_sum - 1.0).abs() < 1e-12);
    }

    #[test]
    fn stock_over_cap_is_error() {
        // 50% AAPL against a 10% stock cap
        let spec = AllocationSpec::from_pairs(&[("AAPL", 0.5), ("SPY", 0.5)]).unwrap();
        let quotes = liquid(liquid(StaticQuotes::builder(), "AAPL", 150.0), "SPY", 500.0).build();

        let report = run(&spec, &quotes, &policy());
        assert!(!report.ok);
        // AAPL breaks the 10% stock cap, SPY breaks the 20% ETF cap
        assert_eq!(report.errors.len(), 2);
        assert!(report.errors[0].contains("AAPL"));
        assert!(report.errors[0].contains("stock cap"));
    }

    #[test]
    fn missing_price_is_error_not_warning() {
        let spec = AllocationSpec::from_pairs(&[("NOPE", 0.1)]).unwrap();
        let quotes = StaticQuotes::builder().build();

        let report = run(&spec, &quotes, &policy());
        assert!(!report.ok);
        assert_eq!(report.errors.len(), 1);
        assert!(report.errors[0].contains("price error"));
    }

    #[test]
    fn penny_stock_below_floor_is_error() {
        let spec = AllocationSpec::from_pairs(&[("PENY", 0.05)]).unwrap();
        let quotes = StaticQuotes::builder()
            .with_price("PENY", 0.40)
            .with_avg_dollar_volume("PENY", 10_000_000.0)
            .with_market_cap("PENY", 50e9)
            .build();

        let report = run(&spec, &quotes, &policy());
        assert!(!report.ok);
        assert!(report.errors[0].contains("below"));
    }

    #[test]
    fn low_liquidity_is_warning_only() {
        let spec = AllocationSpec::from_pairs(&[("THIN", 0.05)]).unwrap();
        let quotes = StaticQuotes::builder()
            .with_price("THIN", 25.0)
            .with_avg_dollar_volume("THIN", 50_000.0)
            .with_market_cap("THIN", 50e9)
            .build();

        let report = run(&spec, &quotes, &policy());
        assert!(report.ok);
        // The 0.05 weight sum also draws a drift warning; the volume
        // finding must be there exactly once on its own.
        let volume: Vec<_> = report
            .warnings
            .iter()
            .filter(|w| w.contains("volume"))
            .collect();
        assert_eq!(volume.len(), 1);
        assert!(volume[0].contains("THIN"));
    }

    #[test]
    fn microcap_aggregate_cap() {
        // Three microcaps at 8% each: each under the 10% stock cap,
        // but 24% combined breaks the 20% microcap cap.
        let spec =
            AllocationSpec::from_pairs(&[("MCA", 0.08), ("MCB", 0.08), ("MCC", 0.08)]).unwrap();
        let mut builder = StaticQuotes::builder();
        for t in ["MCA", "MCB", "MCC"] {
            builder = builder
                .with_price(t, 20.0)
                .with_avg_dollar_volume(t, 10_000_000.0)
                .with_market_cap(t, 100e6);
        }
        let quotes = builder.build();

        let report = run(&spec, &quotes, &policy());
        assert!(!report.ok);
        assert_eq!(report.errors.len(), 1);
        assert!(report.errors[0].contains("microcap exposure"));
        assert!((report.microcap_weight - 0.24).abs() < 1e-12);
    }

    #[test]
    fn weight_drift_is_warning() {
        let spec = AllocationSpec::from_pairs(&[("SPY", 0.2), ("AGG", 0.2)]).unwrap();
        let quotes = liquid(liquid(StaticQuotes::builder(), "SPY", 500.0), "AGG", 100.0).build();

        let report = run(&spec, &quotes, &policy());
        assert!(report.ok);
        assert!(report.warnings.iter().any(|w| w.contains("renormalized")));
        assert!((report.weights_sum - 0.4).abs() < 1e-12);
    }

    #[test]
    fn one_pass_reports_every_violation() {
        // Four entries, four independent problems -> four distinct errors.
        let spec = AllocationSpec::from_pairs(&[
            ("NOPE", 0.05), // no price
            ("PENY", 0.05), // below price floor
            ("AAPL", 0.15), // over stock cap
            ("SPY", 0.25),  // over ETF cap
        ])
        .unwrap();
        let quotes = liquid(
            liquid(
                StaticQuotes::builder()
                    .with_price("PENY", 0.50)
                    .with_avg_dollar_volume("PENY", 10_000_000.0)
                    .with_market_cap("PENY", 50e9),
                "AAPL",
                150.0,
            ),
            "SPY",
            500.0,
        )
        .build();

        let report = run(&spec, &quotes, &policy());
        assert!(!report.ok);
        assert_eq!(report.errors.len(), 4);
    }

    #[test]
    fn validation_is_idempotent() {
        let spec = AllocationSpec::from_pairs(&[("AAPL", 0.15), ("SPY", 0.3)]).unwrap();
        let quotes = liquid(liquid(StaticQuotes::builder(), "AAPL", 150.0), "SPY", 500.0).build();

        let first = run(&spec, &quotes, &policy());
        let second = run(&spec, &quotes, &policy());
        assert_eq!(first.ok, second.ok);
        assert_eq!(first.errors, second.errors);
        assert_eq!(first.warnings, second.warnings);
        assert_eq!(first.weights_sum, second.weights_sum);
    }

    #[test]
    fn display_report() {
        let report = ValidationReport {
            ok: false,
            errors: vec!["AAPL: bad".into()],
            warnings: vec!["THIN: thin".into()],
            weights_sum: 1.0,
            microcap_weight: 0.0,
        };
        let s = format!("{report}");
        assert!(s.contains("FAIL"));
        assert!(s.contains("[ERROR] AAPL"));
        assert!(s.contains("[WARN]  THIN"));
    }
}
