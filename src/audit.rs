//! JSONL audit trail.
//!
//! Every rebalance run appends events to an audit.jsonl file, one JSON
//! object per line: run start, fetched positions, validation outcome,
//! computed plan, market gate, each order placed or failed, a
//! post-trade position snapshot, and run completion. This doubles as
//! the trade log and snapshot store.

use std::fs::{self, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::Path;

use chrono::{DateTime, Utc};
use railbot_broker::types::Position;
use serde::Serialize;

use crate::error::Result;

/// An audit event written to the JSONL trail.
#[derive(Debug, Clone, Serialize)]
pub struct AuditEvent {
    pub event: &'static str,
    pub ts: DateTime<Utc>,
    #[serde(flatten)]
    pub data: serde_json::Value,
}

/// Append-only audit logger.
pub struct AuditLog {
    writer: BufWriter<std::fs::File>,
}

impl AuditLog {
    /// Open (or create) the audit log file for appending.
    pub fn open(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        let file = OpenOptions::new().create(true).append(true).open(path)?;

        Ok(Self {
            writer: BufWriter::new(file),
        })
    }

    /// Log an event with arbitrary JSON data.
    pub fn log(&mut self, event: &'static str, data: serde_json::Value) -> Result<()> {
        let entry = AuditEvent {
            event,
            ts: Utc::now(),
            data,
        };
        let json = serde_json::to_string(&entry)
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))?;
        writeln!(self.writer, "{json}")?;
        self.writer.flush()?;
        Ok(())
    }

    /// Log a simple event with no additional data.
    pub fn log_simple(&mut self, event: &'static str) -> Result<()> {
        self.log(event, serde_json::json!({}))
    }
}

/// Convenience: log a run start event.
pub fn log_run_started(
    audit: &mut AuditLog,
    account_id: &str,
    budget: f64,
    submit: bool,
) -> Result<()> {
    audit.log(
        "run_started",
        serde_json::json!({
            "account": account_id,
            "budget": budget,
            "submit": submit,
        }),
    )
}

/// Convenience: log positions fetched from the broker.
pub fn log_positions(audit: &mut AuditLog, positions: &[Position]) -> Result<()> {
    let pos_data: Vec<_> = positions
        .iter()
        .map(|p| {
            serde_json::json!({
                "ticker": p.ticker,
                "qty": p.quantity,
                "market_value": p.market_value_usd,
            })
        })
        .collect();

    audit.log(
        "positions_fetched",
        serde_json::json!({ "positions": pos_data }),
    )
}

/// Convenience: log the validation report.
pub fn log_validation(audit: &mut AuditLog, report: &crate::validate::ValidationReport) -> Result<()> {
    audit.log(
        "validation",
        serde_json::json!({
            "ok": report.ok,
            "errors": report.errors,
            "warnings": report.warnings,
            "weights_sum": report.weights_sum,
            "microcap_weight": report.microcap_weight,
        }),
    )
}

/// Convenience: log the computed plan.
pub fn log_plan(audit: &mut AuditLog, plan: &crate::plan::RebalancePlan) -> Result<()> {
    let data = serde_json::to_value(plan)
        .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))?;
    audit.log("plan_computed", data)
}

/// Convenience: log the market-hours gate decision.
pub fn log_market_gate(audit: &mut AuditLog, open: bool) -> Result<()> {
    audit.log("market_gate", serde_json::json!({ "is_open": open }))
}

/// Convenience: log one submission attempt (placed or failed).
pub fn log_submission(audit: &mut AuditLog, result: &crate::execute::SubmitResult) -> Result<()> {
    let event = match result.status {
        crate::execute::SubmitStatus::Placed { .. } => "order_placed",
        crate::execute::SubmitStatus::Failed { .. } => "order_failed",
    };
    let data = serde_json::to_value(result)
        .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))?;
    audit.log(event, data)
}

/// Convenience: log run completion.
pub fn log_run_completed(audit: &mut AuditLog, placed: usize, failed: usize) -> Result<()> {
    audit.log(
        "run_completed",
        serde_json::json!({
            "placed": placed,
            "failed": failed,
        }),
    )
}
