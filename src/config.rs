use std::{env, time::Duration};

use dotenvy::dotenv;
use eyre::{Result, WrapErr};

#[derive(Debug, Clone)]
pub struct Config {
    pub db_path: String,
    pub log_level: String,
    pub busy_timeout: Duration,
}

pub fn load() -> Result<Config> {
    dotenv().ok(); // load from .env when present

    // SQLite ledger path (default: ledger.db)
    let db_path = env::var("DATABASE_URL").unwrap_or_else(|_| "ledger.db".to_string());

    // tracing filter directive; RUST_LOG still wins when set
    let log_level = env::var("LOG_LEVEL").unwrap_or_else(|_| "info".to_string());

    // how long a query waits on a locked database (default: 5000 ms)
    let busy_timeout_ms: u64 = env::var("QUERY_TIMEOUT_MS")
        .unwrap_or_else(|_| "5000".to_string())
        .parse()
        .wrap_err("QUERY_TIMEOUT_MS must be a whole number of milliseconds")?;

    Ok(Config {
        db_path,
        log_level,
        busy_timeout: Duration::from_millis(busy_timeout_ms),
    })
}
