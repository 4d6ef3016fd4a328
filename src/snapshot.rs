// src/snapshot.rs
use std::collections::BTreeMap;

use tracing::{debug, warn};

use crate::error::{BalanceError, BalanceResult};
use crate::models::{EntityId, TokenAmount};
use crate::payload;
use crate::store::LedgerStore;

/// An account's full state as captured by the applicable balance snapshot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Snapshot {
    pub consensus_timestamp: i64,
    pub native: i64,
    pub tokens: BTreeMap<EntityId, TokenAmount>,
}

/// Finds the latest ledger-wide snapshot at or before `timestamp` and reads the
/// account's row in it. Fails with `LedgerNotYetInitialized` when `timestamp`
/// precedes the first snapshot.
pub fn locate<S>(store: &S, account: EntityId, timestamp: i64) -> BalanceResult<Snapshot>
where
    S: LedgerStore + ?Sized,
{
    let Some(row) = store.latest_snapshot_at_or_before(account, timestamp)? else {
        warn!(%account, timestamp, "no balance snapshot at or before timestamp");
        return Err(BalanceError::LedgerNotYetInitialized { timestamp });
    };

    let tokens = payload::decode_token_amounts(&row.token_balances)?
        .into_iter()
        .map(|amount| (amount.token.token_id, amount))
        .collect::<BTreeMap<_, _>>();

    debug!(
        %account,
        snapshot_timestamp = row.consensus_timestamp,
        native = row.balance,
        tokens = tokens.len(),
        "located balance snapshot"
    );

    Ok(Snapshot {
        consensus_timestamp: row.consensus_timestamp,
        native: row.balance,
        tokens,
    })
}
