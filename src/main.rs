//! Rust Ledger Engine CLI
//!
//! Replays a ledger scenario from CSV files and prints the final account
//! states.
//!
//! # Usage
//!
//! ```bash
//! cargo run -- accounts.csv > final.csv
//! cargo run -- --transfers transfers.csv accounts.csv > final.csv
//! cargo run -- --strategy sync --transfers transfers.csv --accrual-passes 5 accounts.csv
//! cargo run -- --transfers transfers.csv --accrual-interval-ms 50 accounts.csv
//! ```
//!
//! Logs go to stderr and are filtered with `RUST_LOG` (default
//! `rust_ledger_engine=info`); stdout carries only the CSV output.
//!
//! # Exit Codes
//!
//! - 0: Success
//! - 1: Error (missing arguments, file not found, file not readable, etc.)

use rust_ledger_engine::cli;
use rust_ledger_engine::strategy;
use std::process;
use tracing::{error, info};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter};

fn init_tracing() {
    tracing_subscriber::registry()
        .with(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("rust_ledger_engine=info")),
        )
        .with(fmt::layer().with_writer(std::io::stderr))
        .init();
}

fn main() {
    init_tracing();

    let args = cli::parse_args();

    let strategy = {
        let batch = if matches!(args.strategy, cli::StrategyType::Async) {
            Some(args.to_batch_config())
        } else {
            None
        };
        strategy::create_strategy(args.strategy.clone(), args.to_pipeline_config(), batch)
    };

    let mut output = std::io::stdout();
    match strategy.process(
        &args.accounts_file,
        args.transfers_file.as_deref(),
        &mut output,
    ) {
        Ok(summary) => info!(?summary, "Ledger replay finished"),
        Err(e) => {
            error!(error = %e, "Ledger replay failed");
            eprintln!("Error: {}", e);
            process::exit(1);
        }
    }
}
