// src/service.rs
use tracing::debug;

use crate::association;
use crate::delta;
use crate::error::BalanceResult;
use crate::merge;
use crate::models::{Amount, EntityId, Token};
use crate::snapshot;
use crate::store::LedgerStore;

/// Point-in-time balance and association queries for accounts.
pub struct AccountBalanceService<S> {
    store: S,
}

impl<S: LedgerStore> AccountBalanceService<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Native and token balances of `account` at the end of the block ending at
    /// `block_end`: latest snapshot plus transfers since. Native comes first.
    pub fn balance_at_block(&self, account: EntityId, block_end: i64) -> BalanceResult<Vec<Amount>> {
        let snapshot = snapshot::locate(&self.store, account, block_end)?;
        let delta = delta::accumulate(
            &self.store,
            account,
            snapshot.consensus_timestamp,
            block_end,
        )?;

        let merged = merge::merge(snapshot.native, &snapshot.tokens, delta.native, &delta.tokens);
        debug!(
            %account,
            block_end,
            native = merged.native,
            tokens = merged.tokens.len(),
            "computed balance at block"
        );

        Ok(merged.into_amounts())
    }

    pub fn dissociated_tokens(&self, account: EntityId, block_end: i64) -> BalanceResult<Vec<Token>> {
        association::dissociated_tokens_as_of(&self.store, account, block_end)
    }

    pub fn tokens_transferred_after(
        &self,
        account: EntityId,
        timestamp: i64,
    ) -> BalanceResult<Vec<Token>> {
        association::tokens_transferred_in_block_after(&self.store, account, timestamp)
    }
}
