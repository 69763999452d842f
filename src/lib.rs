//! railbot: guardrailed portfolio rebalancer.
//!
//! Takes a target allocation (ticker weights), current brokerage
//! positions, and a guardrail policy, validates the allocation against
//! the policy, plans capped whole-share buy/sell orders, and optionally
//! submits them through the broker, sells first, market-hours gated,
//! with a JSONL audit trail.

pub mod alloc;
pub mod audit;
pub mod classify;
pub mod config;
pub mod error;
pub mod execute;
pub mod plan;
pub mod validate;
