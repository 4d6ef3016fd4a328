// src/merge.rs
use std::collections::BTreeMap;

use crate::models::{Amount, EntityId, TokenAmount};

/// Final balance of one account: snapshot state plus the delta since.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MergedBalance {
    pub native: i64,
    pub tokens: Vec<TokenAmount>,
}

impl MergedBalance {
    /// Native amount first, then every token.
    pub fn into_amounts(self) -> Vec<Amount> {
        let mut amounts = Vec::with_capacity(1 + self.tokens.len());
        amounts.push(Amount::Native { value: self.native });
        amounts.extend(self.tokens.into_iter().map(Amount::Token));
        amounts
    }
}

/// Combines snapshot balances with a delta without touching either input.
///
/// The token list is the union of snapshot and delta tokens. Entries that end at
/// zero are kept: callers expect every asset the account ever held. Tokens first
/// seen in the delta take their decimals from it.
pub fn merge(
    snapshot_native: i64,
    snapshot_tokens: &BTreeMap<EntityId, TokenAmount>,
    delta_native: i64,
    delta_tokens: &[TokenAmount],
) -> MergedBalance {
    let mut tokens = snapshot_tokens.clone();
    for delta in delta_tokens {
        tokens
            .entry(delta.token.token_id)
            .and_modify(|amount| amount.value += delta.value)
            .or_insert(*delta);
    }

    MergedBalance {
        native: snapshot_native + delta_native,
        tokens: tokens.into_values().collect(),
    }
}
