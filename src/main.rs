use std::time::Duration;

use chrono::{DateTime, Utc};
use clap::{Parser, Subcommand};
use eyre::Result;
use serde::Serialize;
use serde_json::{json, Value};
use tokio::task;
use tracing::info;
use tracing_subscriber::EnvFilter;

use ledger_balances::config::{self, Config};
use ledger_balances::{db, AccountBalanceService, Amount, BalanceResult, EntityId, SqliteLedgerStore};

/// Top level CLI struct
#[derive(Parser)]
#[command(name = "ledger-balances")]
#[command(about = "Historical account balances from ledger snapshots and transfers")]
struct Cli {
    /// SQLite ledger path (overrides DATABASE_URL)
    #[arg(long, global = true)]
    db: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Create the ledger schema in an empty database
    Init,
    /// Balances at the end of the block ending at TIMESTAMP
    Balance { account: EntityId, timestamp: i64 },
    /// Tokens the account is dissociated from as of TIMESTAMP
    Dissociated { account: EntityId, timestamp: i64 },
    /// Tokens moved to or from the account in the first block ending after TIMESTAMP
    TransferredAfter { account: EntityId, timestamp: i64 },
    /// Balance, dissociated and transferred tokens, queried concurrently
    Summary { account: EntityId, timestamp: i64 },
}

#[derive(Serialize)]
struct AmountView {
    #[serde(flatten)]
    amount: Amount,
    display: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut cfg = config::load()?;
    if let Some(path) = cli.db {
        cfg.db_path = path;
    }

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&cfg.log_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr) // stdout carries the JSON result
        .with_target(false)
        .init();

    info!(
        db_path = %cfg.db_path,
        busy_timeout_ms = cfg.busy_timeout.as_millis() as u64,
        "loaded config"
    );

    let output = match cli.command {
        Command::Init => {
            let conn = db::connect(&cfg.db_path, cfg.busy_timeout)?;
            db::run_migrations(&conn)?;
            info!("ledger schema ready at {}", cfg.db_path);
            return Ok(());
        }
        Command::Balance { account, timestamp } => {
            let amounts = query(&cfg, move |s| s.balance_at_block(account, timestamp)).await?;
            balance_json(account, timestamp, amounts)
        }
        Command::Dissociated { account, timestamp } => {
            let tokens = query(&cfg, move |s| s.dissociated_tokens(account, timestamp)).await?;
            json!({ "account": account, "timestamp": timestamp, "tokens": tokens })
        }
        Command::TransferredAfter { account, timestamp } => {
            let tokens = query(&cfg, move |s| s.tokens_transferred_after(account, timestamp)).await?;
            json!({ "account": account, "timestamp": timestamp, "tokens": tokens })
        }
        Command::Summary { account, timestamp } => {
            // independent read-only queries, one connection each
            let (amounts, dissociated, transferred) = tokio::try_join!(
                query(&cfg, move |s| s.balance_at_block(account, timestamp)),
                query(&cfg, move |s| s.dissociated_tokens(account, timestamp)),
                query(&cfg, move |s| s.tokens_transferred_after(account, timestamp)),
            )?;
            json!({
                "balance": balance_json(account, timestamp, amounts),
                "dissociated_tokens": dissociated,
                "transferred_in_next_block": transferred,
            })
        }
    };

    println!("{}", serde_json::to_string_pretty(&output)?);
    Ok(())
}

/// Runs one query on the blocking pool against its own read-only connection.
async fn query<T, F>(cfg: &Config, run: F) -> Result<T>
where
    T: Send + 'static,
    F: FnOnce(&AccountBalanceService<SqliteLedgerStore>) -> BalanceResult<T> + Send + 'static,
{
    let path = cfg.db_path.clone();
    let busy_timeout = cfg.busy_timeout;

    // failures were already logged where they were produced
    let result = task::spawn_blocking(move || run_query(&path, busy_timeout, run)).await??;
    Ok(result)
}

fn run_query<T, F>(path: &str, busy_timeout: Duration, run: F) -> BalanceResult<T>
where
    F: FnOnce(&AccountBalanceService<SqliteLedgerStore>) -> BalanceResult<T>,
{
    let conn = db::open_read_only(path, busy_timeout)?;
    run(&AccountBalanceService::new(SqliteLedgerStore::new(conn)))
}

fn balance_json(account: EntityId, timestamp: i64, amounts: Vec<Amount>) -> Value {
    let amounts: Vec<AmountView> = amounts
        .into_iter()
        .map(|amount| AmountView {
            amount,
            display: amount.to_decimal().map(|d| d.to_string()),
        })
        .collect();

    json!({
        "account": account,
        "timestamp": timestamp,
        "consensus_time": DateTime::<Utc>::from_timestamp_nanos(timestamp).to_rfc3339(),
        "amounts": amounts,
    })
}
