use std::time::Duration;

use rusqlite::{Connection, OpenFlags};

use crate::error::{storage, BalanceResult};

const INIT_SQL: &str = r#"
CREATE TABLE IF NOT EXISTS token (
  token_id INTEGER PRIMARY KEY,
  decimals INTEGER NOT NULL
);

-- one row per full balance snapshot of the ledger
CREATE TABLE IF NOT EXISTS account_balance_file (
  consensus_timestamp INTEGER PRIMARY KEY
);

CREATE TABLE IF NOT EXISTS account_balance (
  consensus_timestamp INTEGER NOT NULL,
  account_id          INTEGER NOT NULL,
  balance             INTEGER NOT NULL,
  PRIMARY KEY (consensus_timestamp, account_id)
);

CREATE TABLE IF NOT EXISTS token_balance (
  consensus_timestamp INTEGER NOT NULL,
  account_id          INTEGER NOT NULL,
  token_id            INTEGER NOT NULL,
  balance             INTEGER NOT NULL,
  PRIMARY KEY (consensus_timestamp, account_id, token_id)
);

CREATE TABLE IF NOT EXISTS crypto_transfer (
  id                  INTEGER PRIMARY KEY AUTOINCREMENT,
  consensus_timestamp INTEGER NOT NULL,
  entity_id           INTEGER NOT NULL,
  amount              INTEGER NOT NULL
);
CREATE INDEX IF NOT EXISTS crypto_transfer__entity_timestamp
  ON crypto_transfer (entity_id, consensus_timestamp);

CREATE TABLE IF NOT EXISTS token_transfer (
  id                  INTEGER PRIMARY KEY AUTOINCREMENT,
  consensus_timestamp INTEGER NOT NULL,
  account_id          INTEGER NOT NULL,
  token_id            INTEGER NOT NULL,
  amount              INTEGER NOT NULL
);
CREATE INDEX IF NOT EXISTS token_transfer__account_timestamp
  ON token_transfer (account_id, consensus_timestamp);

-- append-only association history; id doubles as insertion order
CREATE TABLE IF NOT EXISTS token_account (
  id                 INTEGER PRIMARY KEY AUTOINCREMENT,
  account_id         INTEGER NOT NULL,
  token_id           INTEGER NOT NULL,
  modified_timestamp INTEGER NOT NULL,
  associated         INTEGER NOT NULL CHECK (associated IN (0, 1))
);
CREATE INDEX IF NOT EXISTS token_account__account_timestamp
  ON token_account (account_id, modified_timestamp);

CREATE TABLE IF NOT EXISTS record_file (
  consensus_start INTEGER NOT NULL,
  consensus_end   INTEGER PRIMARY KEY
);
"#;

/// Connect to SQLite (with WAL mode for concurrent readers)
pub fn connect(path: &str, busy_timeout: Duration) -> BalanceResult<Connection> {
    let conn = Connection::open(path).map_err(storage("opening database"))?;
    conn.pragma_update(None, "journal_mode", "WAL")
        .map_err(storage("enabling WAL"))?;
    conn.busy_timeout(busy_timeout)
        .map_err(storage("setting busy timeout"))?;
    Ok(conn)
}

/// Open an existing database for queries only.
/// Uses `query_only` rather than a read-only handle so WAL files can still be attached.
pub fn open_read_only(path: &str, busy_timeout: Duration) -> BalanceResult<Connection> {
    let conn = Connection::open_with_flags(
        path,
        OpenFlags::SQLITE_OPEN_READ_WRITE | OpenFlags::SQLITE_OPEN_NO_MUTEX,
    )
    .map_err(storage("opening database"))?;
    conn.pragma_update(None, "query_only", true)
        .map_err(storage("enabling query_only"))?;
    conn.busy_timeout(busy_timeout)
        .map_err(storage("setting busy timeout"))?;
    Ok(conn)
}

/// Run schema migrations
pub fn run_migrations(conn: &Connection) -> BalanceResult<()> {
    conn.execute_batch(INIT_SQL)
        .map_err(storage("running migrations"))?;
    Ok(())
}

#[cfg(test)]
pub(crate) fn in_memory() -> Connection {
    let conn = Connection::open_in_memory().expect("in-memory database");
    run_migrations(&conn).expect("schema");
    conn
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn migrations_are_idempotent() {
        let conn = in_memory();
        run_migrations(&conn).unwrap();

        let tables: i64 = conn
            .query_row(
                "SELECT COUNT(*) FROM sqlite_master WHERE type = 'table' AND name IN
                 ('token', 'account_balance_file', 'account_balance', 'token_balance',
                  'crypto_transfer', 'token_transfer', 'token_account', 'record_file')",
                [],
                |row| row.get(0),
            )
            .unwrap();
        assert_eq!(tables, 8);
    }

    #[test]
    fn read_only_connection_rejects_writes() {
        let dir = std::env::temp_dir().join(format!("ledger-balances-ro-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("ledger.db");
        let path = path.to_str().unwrap();

        let writer = connect(path, Duration::from_millis(100)).unwrap();
        run_migrations(&writer).unwrap();
        drop(writer);

        let reader = open_read_only(path, Duration::from_millis(100)).unwrap();
        assert!(reader
            .execute("INSERT INTO token (token_id, decimals) VALUES (1, 0)", [])
            .is_err());
        drop(reader);

        std::fs::remove_dir_all(&dir).unwrap();
    }
}
