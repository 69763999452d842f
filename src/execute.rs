//! Execution orchestrator: validate → plan → market gate → submit.
//!
//! One rebalance call is strictly ordered; positions are fetched
//! fresh inside the same call that submits, and a per-account lock
//! serializes concurrent calls so two rebalances cannot double-spend
//! the same cash buffer.
//!
//! Recoverable problems (validation failures, market closed, a
//! rejected order) come back as data in the outcome. Only audit I/O
//! failures surface as `Err`.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use log::{info, warn};
use railbot_broker::marketdata::MarketData;
use railbot_broker::types::Side;
use railbot_broker::Broker;
use rustc_hash::FxHashMap;
use serde::Serialize;

use crate::alloc::AllocationSpec;
use crate::audit::{self, AuditLog};
use crate::classify::{EtfClassifier, MicrocapClassifier};
use crate::config::{ExecutionConfig, GuardrailPolicy};
use crate::error::Result;
use crate::plan::{self, RebalancePlan};
use crate::validate;

/// Caller's input for one rebalance invocation.
#[derive(Debug, Clone)]
pub struct RebalanceRequest {
    pub allocations: AllocationSpec,
    pub budget: f64,
    pub submit: bool,
}

/// One submission attempt. A failed order never aborts the batch.
#[derive(Debug, Clone, Serialize)]
pub struct SubmitResult {
    pub ticker: String,
    pub qty: u64,
    pub side: Side,
    #[serde(flatten)]
    pub status: SubmitStatus,
}

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum SubmitStatus {
    Placed { order_id: String },
    Failed { reason: String },
}

impl SubmitResult {
    pub fn is_placed(&self) -> bool {
        matches!(self.status, SubmitStatus::Placed { .. })
    }
}

/// Per-order results, present only when orders were actually sent.
#[derive(Debug, Clone, Default, Serialize)]
pub struct PlacedReport {
    pub sell: Vec<SubmitResult>,
    pub buy: Vec<SubmitResult>,
}

impl PlacedReport {
    pub fn placed_count(&self) -> usize {
        self.sell
            .iter()
            .chain(self.buy.iter())
            .filter(|r| r.is_placed())
            .count()
    }

    pub fn failed_count(&self) -> usize {
        self.sell.len() + self.buy.len() - self.placed_count()
    }
}

/// The uniform response shape for a rebalance call: rejected,
/// previewed, or submitted runs all produce this, differing only in
/// `ok`, the populated `errors`/`warnings`, and presence of `placed`.
#[derive(Debug, Clone, Serialize)]
pub struct RebalanceOutcome {
    pub ok: bool,
    pub errors: Vec<String>,
    pub warnings: Vec<String>,
    pub preview: RebalancePlan,
    pub note: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub placed: Option<PlacedReport>,
}

/// Registry of per-account mutexes serializing validate-plan-submit.
#[derive(Default)]
pub struct AccountLocks {
    inner: Mutex<FxHashMap<String, Arc<Mutex<()>>>>,
}

impl AccountLocks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Handle for one account's lock; hold its guard across the whole
    /// rebalance call.
    pub fn handle(&self, account_id: &str) -> Arc<Mutex<()>> {
        let mut map = self.inner.lock().unwrap_or_else(|e| e.into_inner());
        map.entry(account_id.to_string()).or_default().clone()
    }
}

/// The rebalancing engine: broker + market data + classifiers +
/// policy, wired for one account.
pub struct Engine<'a> {
    pub broker: &'a dyn Broker,
    pub market: &'a dyn MarketData,
    pub etfs: &'a dyn EtfClassifier,
    pub microcaps: &'a dyn MicrocapClassifier,
    pub policy: GuardrailPolicy,
    pub execution: ExecutionConfig,
    pub account_id: String,
    pub locks: Arc<AccountLocks>,
}

impl Engine<'_> {
    /// Run one rebalance: validate, always compute a preview, gate on
    /// market hours, and submit (sells first) when requested.
    pub fn rebalance(
        &self,
        req: &RebalanceRequest,
        mut audit: Option<&mut AuditLog>,
    ) -> Result<RebalanceOutcome> {
        let lock = self.locks.handle(&self.account_id);
        let _guard = lock.lock().unwrap_or_else(|e| e.into_inner());

        if let Some(a) = audit.as_deref_mut() {
            audit::log_run_started(a, &self.account_id, req.budget, req.submit)?;
        }

        if !(req.budget.is_finite() && req.budget > 0.0) {
            return Ok(RebalanceOutcome {
                ok: false,
                errors: vec![format!("budget must be > 0 (got {})", req.budget)],
                warnings: Vec::new(),
                preview: RebalancePlan::default(),
                note: "Orders not submitted.".into(),
                placed: None,
            });
        }

        let report = validate::validate(
            &req.allocations,
            &self.policy,
            &self.execution,
            self.market,
            self.etfs,
            self.microcaps,
        );
        if let Some(a) = audit.as_deref_mut() {
            audit::log_validation(a, &report)?;
        }

        // Positions must be read fresh in the same call that submits.
        let positions = match self.broker.positions() {
            Ok(p) => p,
            Err(e) => {
                warn!("position fetch failed: {e}");
                return Ok(RebalanceOutcome {
                    ok: false,
                    errors: merge(report.errors, format!("broker error: {e}")),
                    warnings: report.warnings,
                    preview: RebalancePlan::default(),
                    note: "Broker unavailable. Orders not submitted.".into(),
                    placed: None,
                });
            }
        };
        if let Some(a) = audit.as_deref_mut() {
            audit::log_positions(a, &positions)?;
        }

        // The preview is computed even when validation failed, so the
        // caller always sees the intended orders.
        let targets = plan::target_pairs(&req.allocations);
        let preview = match plan::plan(
            &positions,
            &targets,
            req.budget,
            &self.policy,
            self.market,
        ) {
            Ok(p) => p,
            Err(e) => {
                warn!("planning failed: {e}");
                return Ok(RebalanceOutcome {
                    ok: false,
                    errors: merge(report.errors, e.to_string()),
                    warnings: report.warnings,
                    preview: RebalancePlan::default(),
                    note: "Planning failed. Orders not submitted.".into(),
                    placed: None,
                });
            }
        };
        if let Some(a) = audit.as_deref_mut() {
            audit::log_plan(a, &preview)?;
        }

        if !report.ok {
            return Ok(RebalanceOutcome {
                ok: false,
                errors: report.errors,
                warnings: report.warnings,
                preview,
                note: "Validation failed. Orders not submitted.".into(),
                placed: None,
            });
        }

        if self.policy.market_hours_only {
            // A failing clock check is treated the same as a closed
            // market: soft stop, preview still returned.
            let open = match self.broker.clock() {
                Ok(clock) => clock.is_open,
                Err(e) => {
                    warn!("market clock check failed: {e}");
                    false
                }
            };
            if let Some(a) = audit.as_deref_mut() {
                audit::log_market_gate(a, open)?;
            }
            if !open {
                return Ok(RebalanceOutcome {
                    ok: true,
                    errors: Vec::new(),
                    warnings: report.warnings,
                    preview,
                    note: "Market closed. Orders not submitted.".into(),
                    placed: None,
                });
            }
        }

        if !req.submit {
            return Ok(RebalanceOutcome {
                ok: true,
                errors: Vec::new(),
                warnings: report.warnings,
                preview,
                note: "Validation passed. Set submit=true to place orders.".into(),
                placed: None,
            });
        }

        // Sells go first to free cash before buys draw on it.
        let mut placed = PlacedReport::default();
        let total = preview.sells.len() + preview.buys.len();
        let mut sent = 0;

        for (intents, side, out) in [
            (&preview.sells, Side::Sell, &mut placed.sell),
            (&preview.buys, Side::Buy, &mut placed.buy),
        ] {
            for intent in intents.iter() {
                let result = match self
                    .broker
                    .submit_market_order(&intent.ticker, intent.qty, side)
                {
                    Ok(ack) => {
                        info!("{side} {} {} -> {}", intent.qty, intent.ticker, ack.order_id);
                        SubmitResult {
                            ticker: intent.ticker.clone(),
                            qty: intent.qty,
                            side,
                            status: SubmitStatus::Placed {
                                order_id: ack.order_id,
                            },
                        }
                    }
                    // One rejected order must not prevent the rest of
                    // the batch from being attempted.
                    Err(e) => {
                        warn!("{side} {} {} failed: {e}", intent.qty, intent.ticker);
                        SubmitResult {
                            ticker: intent.ticker.clone(),
                            qty: intent.qty,
                            side,
                            status: SubmitStatus::Failed {
                                reason: e.to_string(),
                            },
                        }
                    }
                };

                if let Some(a) = audit.as_deref_mut() {
                    audit::log_submission(a, &result)?;
                }
                out.push(result);

                sent += 1;
                if sent < total && self.execution.order_interval_ms > 0 {
                    std::thread::sleep(Duration::from_millis(self.execution.order_interval_ms));
                }
            }
        }

        let failed = placed.failed_count();
        let note = if failed == 0 {
            "Orders submitted.".to_string()
        } else {
            format!(
                "Orders submitted ({} placed, {failed} failed).",
                placed.placed_count()
            )
        };

        if let Some(a) = audit.as_deref_mut() {
            audit::log_run_completed(a, placed.placed_count(), failed)?;
            // Post-trade snapshot for reporting; skipped if the broker
            // went away mid-run.
            if let Ok(after) = self.broker.positions() {
                audit::log_positions(a, &after)?;
            }
        }

        Ok(RebalanceOutcome {
            ok: true,
            errors: Vec::new(),
            warnings: report.warnings,
            preview,
            note,
            placed: Some(placed),
        })
    }
}

fn merge(mut errors: Vec<String>, extra: String) -> Vec<String> {
    errors.push(extra);
    errors
}
