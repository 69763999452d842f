//! CLI entry point for railbot.

use std::path::PathBuf;
use std::process;
use std::sync::Arc;

use clap::{Parser, Subcommand};

use railbot::alloc::AllocationSpec;
use railbot::audit::AuditLog;
use railbot::classify::{MarketCapThreshold, StaticEtfList};
use railbot::config::Config;
use railbot::error::Error;
use railbot::execute::{AccountLocks, Engine, RebalanceOutcome, RebalanceRequest};
use railbot_broker::alpaca::AlpacaBroker;
use railbot_broker::Broker;

#[derive(Parser)]
#[command(name = "railbot")]
#[command(about = "Guardrailed portfolio rebalancer for Alpaca accounts")]
#[command(version)]
struct Cli {
    /// Path to config.toml
    #[arg(long, default_value = "config.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Validate, plan, and (with --submit) place rebalance orders
    Run {
        /// Path to allocations.json
        allocations: PathBuf,

        /// Total budget in USD
        #[arg(long)]
        budget: f64,

        /// Actually place orders (default is preview only)
        #[arg(long)]
        submit: bool,

        /// Skip confirmation prompt (for automation/cron)
        #[arg(long)]
        force: bool,
    },

    /// Validate allocations against the guardrail policy
    Validate {
        /// Path to allocations.json
        allocations: PathBuf,

        /// Total budget in USD
        #[arg(long, default_value_t = 10_000.0)]
        budget: f64,
    },

    /// Show current brokerage positions
    Positions,

    /// Check broker connection and market clock
    Status,
}

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .format_timestamp_secs()
        .init();

    let cli = Cli::parse();

    let config = match Config::load(&cli.config) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Error loading config: {e}");
            process::exit(1);
        }
    };

    let broker = match AlpacaBroker::new(
        &config.connection.key_id,
        &config.connection.secret_key,
        &config.connection.trading_url,
        &config.connection.data_url,
        config.connection.timeout_secs,
    ) {
        Ok(b) => b,
        Err(e) => {
            eprintln!("Error connecting to Alpaca: {e}");
            process::exit(1);
        }
    };

    let result = match cli.command {
        Command::Run {
            allocations,
            budget,
            submit,
            force,
        } => run(&config, &broker, &allocations, budget, submit, force),
        Command::Validate {
            allocations,
            budget,
        } => run(&config, &broker, &allocations, budget, false, true),
        Command::Positions => show_positions(&broker),
        Command::Status => check_status(&broker),
    };

    match result {
        Ok(code) => process::exit(code),
        Err(Error::Aborted(msg)) => {
            eprintln!("{msg}");
            process::exit(0);
        }
        Err(e) => {
            eprintln!("Error: {e}");
            process::exit(1);
        }
    }
}

fn build_engine<'a>(config: &Config, broker: &'a AlpacaBroker, etfs: &'a StaticEtfList, microcaps: &'a MarketCapThreshold<'a>) -> Engine<'a> {
    Engine {
        broker,
        market: broker,
        etfs,
        microcaps,
        policy: config.policy.clone(),
        execution: config.execution.clone(),
        account_id: config.account.id.clone(),
        locks: Arc::new(AccountLocks::new()),
    }
}

fn run(
    config: &Config,
    broker: &AlpacaBroker,
    allocations: &PathBuf,
    budget: f64,
    submit: bool,
    force: bool,
) -> Result<i32, Error> {
    let spec = AllocationSpec::load(allocations)?;
    let etfs = StaticEtfList::default();
    let microcaps = MarketCapThreshold::new(
        broker,
        config.policy.microcap_threshold_usd,
        config.policy.microcap_fail_closed,
    );
    let engine = build_engine(config, broker, &etfs, &microcaps);
    let mut audit = AuditLog::open(&config.audit_path())?;

    // Live submission gets a preview pass and a confirmation first.
    let submit = if submit && !force {
        let preview = engine.rebalance(
            &RebalanceRequest {
                allocations: spec.clone(),
                budget,
                submit: false,
            },
            Some(&mut audit),
        )?;
        display_outcome(&preview);

        if !preview.ok {
            return Ok(2);
        }

        let confirmed = dialoguer::Confirm::new()
            .with_prompt("Execute?")
            .default(false)
            .interact()
            .map_err(|e| Error::Aborted(format!("confirmation prompt failed: {e}")))?;
        if !confirmed {
            return Err(Error::Aborted("Aborted.".into()));
        }
        true
    } else {
        submit
    };

    let outcome = engine.rebalance(
        &RebalanceRequest {
            allocations: spec,
            budget,
            submit,
        },
        Some(&mut audit),
    )?;
    display_outcome(&outcome);

    Ok(if outcome.ok { 0 } else { 2 })
}

fn display_outcome(outcome: &RebalanceOutcome) {
    for e in &outcome.errors {
        println!("[ERROR] {e}");
    }
    for w in &outcome.warnings {
        println!("[WARN]  {w}");
    }

    if !outcome.preview.is_empty() {
        println!("\nPLANNED ORDERS:");
        println!("  {:6} {:8} {:>8} {:>12}", "Side", "Ticker", "Qty", "Est. value");
        for o in &outcome.preview.sells {
            println!("  {:6} {:8} {:>8} ${:>11.2}", "SELL", o.ticker, o.qty, o.est_value);
        }
        for o in &outcome.preview.buys {
            println!("  {:6} {:8} {:>8} ${:>11.2}", "BUY", o.ticker, o.qty, o.est_value);
        }
    } else {
        println!("\nNo orders needed.");
    }

    if let Some(placed) = &outcome.placed {
        println!("\nSUBMISSIONS:");
        for r in placed.sell.iter().chain(placed.buy.iter()) {
            match &r.status {
                railbot::execute::SubmitStatus::Placed { order_id } => {
                    println!("  {} {} {} -> {}", r.side, r.qty, r.ticker, order_id);
                }
                railbot::execute::SubmitStatus::Failed { reason } => {
                    println!("  {} {} {} FAILED: {}", r.side, r.qty, r.ticker, reason);
                }
            }
        }
    }

    println!("\n{}", outcome.note);
}

fn show_positions(broker: &AlpacaBroker) -> Result<i32, Error> {
    let positions = broker
        .positions()
        .map_err(|e| Error::Broker(e.to_string()))?;

    if positions.is_empty() {
        println!("No positions.");
        return Ok(0);
    }

    println!("CURRENT PORTFOLIO:");
    for p in &positions {
        println!(
            "  {:8} {:>10.2} @ ${:>8.2} = ${:>10.2}",
            p.ticker, p.quantity, p.market_price, p.market_value_usd,
        );
    }
    Ok(0)
}

fn check_status(broker: &AlpacaBroker) -> Result<i32, Error> {
    let clock = broker.clock().map_err(|e| Error::Broker(e.to_string()))?;
    println!(
        "Connection OK. Market is {}.",
        if clock.is_open { "open" } else { "closed" }
    );
    Ok(0)
}
