// src/delta.rs
use tracing::debug;

use crate::error::BalanceResult;
use crate::models::{EntityId, TokenAmount};
use crate::payload;
use crate::store::LedgerStore;

/// Net signed change per asset over a time window.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BalanceDelta {
    pub native: i64,
    /// One entry per token moved in the window, carrying that token's decimals.
    pub tokens: Vec<TokenAmount>,
}

impl BalanceDelta {
    pub fn is_zero(&self) -> bool {
        self.native == 0 && self.tokens.iter().all(|amount| amount.value == 0)
    }

    /// Delta for a single token, zero when it did not move.
    pub fn token_value(&self, token_id: EntityId) -> i64 {
        self.tokens
            .iter()
            .filter(|amount| amount.token.token_id == token_id)
            .map(|amount| amount.value)
            .sum()
    }
}

/// Sums the account's transfers in `(since_exclusive, until_inclusive]`.
/// An empty window yields a zero delta without touching the store.
pub fn accumulate<S>(
    store: &S,
    account: EntityId,
    since_exclusive: i64,
    until_inclusive: i64,
) -> BalanceResult<BalanceDelta>
where
    S: LedgerStore + ?Sized,
{
    if until_inclusive <= since_exclusive {
        debug!(%account, since_exclusive, until_inclusive, "empty delta window");
        return Ok(BalanceDelta::default());
    }

    let change = store.sum_signed_transfers(account, since_exclusive, until_inclusive)?;
    let tokens = payload::decode_token_amounts(&change.token_values)?;

    debug!(
        %account,
        since_exclusive,
        until_inclusive,
        native = change.value,
        tokens = tokens.len(),
        "accumulated balance delta"
    );

    Ok(BalanceDelta {
        native: change.value,
        tokens,
    })
}
