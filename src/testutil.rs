// src/testutil.rs
//! In-memory ledger fixtures for tests.

use rusqlite::{params, Connection};

use crate::db;
use crate::models::EntityId;
use crate::store::SqliteLedgerStore;

pub fn account(num: i64) -> EntityId {
    EntityId::from_encoded(num).unwrap()
}

pub fn token_id(num: i64) -> EntityId {
    EntityId::from_encoded(num).unwrap()
}

/// Seeds ledger tables; ids are encoded entity ids (`0.0.n` == `n`).
pub struct Fixture {
    conn: Connection,
}

impl Fixture {
    pub fn new() -> Self {
        Self {
            conn: db::in_memory(),
        }
    }

    fn exec(&self, sql: &str, params: impl rusqlite::Params) {
        self.conn.execute(sql, params).unwrap();
    }

    pub fn token(&self, token_id: i64, decimals: i64) {
        self.exec(
            "INSERT INTO token (token_id, decimals) VALUES (?1, ?2)",
            params![token_id, decimals],
        );
    }

    pub fn snapshot(&self, timestamp: i64) {
        self.exec(
            "INSERT INTO account_balance_file (consensus_timestamp) VALUES (?1)",
            params![timestamp],
        );
    }

    pub fn account_balance(&self, timestamp: i64, account_id: i64, balance: i64) {
        self.exec(
            "INSERT INTO account_balance (consensus_timestamp, account_id, balance)
             VALUES (?1, ?2, ?3)",
            params![timestamp, account_id, balance],
        );
    }

    pub fn token_balance(&self, timestamp: i64, account_id: i64, token_id: i64, balance: i64) {
        self.exec(
            "INSERT INTO token_balance (consensus_timestamp, account_id, token_id, balance)
             VALUES (?1, ?2, ?3, ?4)",
            params![timestamp, account_id, token_id, balance],
        );
    }

    pub fn crypto_transfer(&self, timestamp: i64, account_id: i64, amount: i64) {
        self.exec(
            "INSERT INTO crypto_transfer (consensus_timestamp, entity_id, amount)
             VALUES (?1, ?2, ?3)",
            params![timestamp, account_id, amount],
        );
    }

    pub fn token_transfer(&self, timestamp: i64, account_id: i64, token_id: i64, amount: i64) {
        self.exec(
            "INSERT INTO token_transfer (consensus_timestamp, account_id, token_id, amount)
             VALUES (?1, ?2, ?3, ?4)",
            params![timestamp, account_id, token_id, amount],
        );
    }

    pub fn token_account(&self, account_id: i64, token_id: i64, timestamp: i64, associated: bool) {
        self.exec(
            "INSERT INTO token_account (account_id, token_id, modified_timestamp, associated)
             VALUES (?1, ?2, ?3, ?4)",
            params![account_id, token_id, timestamp, associated],
        );
    }

    pub fn record_file(&self, start: i64, end: i64) {
        self.exec(
            "INSERT INTO record_file (consensus_start, consensus_end) VALUES (?1, ?2)",
            params![start, end],
        );
    }

    pub fn into_store(self) -> SqliteLedgerStore {
        SqliteLedgerStore::new(self.conn)
    }
}
