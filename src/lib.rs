//! Point-in-time account balances over a snapshot-plus-transfers ledger.
//!
//! A balance at timestamp `T` is the latest full balance snapshot at or before
//! `T` plus the signed transfers in `(snapshot, T]`. Token association history
//! is resolved separately.

pub mod association;
pub mod config;
pub mod db;
pub mod delta;
pub mod error;
pub mod merge;
pub mod models;
pub mod payload;
pub mod service;
pub mod snapshot;
pub mod store;

#[cfg(test)]
mod testutil;

pub use error::{BalanceError, BalanceResult};
pub use models::{Amount, EntityId, Token, TokenAmount};
pub use service::AccountBalanceService;
pub use store::{LedgerStore, SqliteLedgerStore};
