// src/association.rs
use std::collections::BTreeMap;

use tracing::debug;

use crate::error::BalanceResult;
use crate::models::{AssociationRecord, EntityId, Token};
use crate::store::LedgerStore;

/// Effective association state per token: the record with the greatest
/// `(modified_timestamp, sequence)`. Equal timestamps resolve to the record
/// inserted last.
pub fn latest_per_token(records: &[AssociationRecord]) -> BTreeMap<EntityId, AssociationRecord> {
    let mut latest: BTreeMap<EntityId, AssociationRecord> = BTreeMap::new();
    for record in records {
        latest
            .entry(record.token.token_id)
            .and_modify(|current| {
                if (record.modified_timestamp, record.sequence)
                    > (current.modified_timestamp, current.sequence)
                {
                    *current = *record;
                }
            })
            .or_insert(*record);
    }
    latest
}

/// Tokens whose effective association state at `timestamp` is dissociated.
pub fn dissociated_tokens_as_of<S>(
    store: &S,
    account: EntityId,
    timestamp: i64,
) -> BalanceResult<Vec<Token>>
where
    S: LedgerStore + ?Sized,
{
    let history = store.association_history(account, timestamp)?;
    let tokens: Vec<Token> = latest_per_token(&history)
        .into_values()
        .filter(|record| !record.associated)
        .map(|record| record.token)
        .collect();

    debug!(
        %account,
        timestamp,
        records = history.len(),
        dissociated = tokens.len(),
        "resolved dissociated tokens"
    );
    Ok(tokens)
}

/// Tokens moved to or from the account in the first block ending after
/// `timestamp`. Empty when no such block has been recorded yet.
pub fn tokens_transferred_in_block_after<S>(
    store: &S,
    account: EntityId,
    timestamp: i64,
) -> BalanceResult<Vec<Token>>
where
    S: LedgerStore + ?Sized,
{
    let Some(block) = store.block_after(timestamp)? else {
        debug!(%account, timestamp, "no block after timestamp");
        return Ok(Vec::new());
    };

    let tokens = store.tokens_transferred_in(account, &block)?;
    debug!(
        %account,
        block_start = block.consensus_start,
        block_end = block.consensus_end,
        tokens = tokens.len(),
        "resolved tokens transferred in next block"
    );
    Ok(tokens)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil::{account, token_id, Fixture};

    fn record(id: i64, ts: i64, sequence: i64, associated: bool) -> AssociationRecord {
        AssociationRecord {
            token: Token {
                token_id: token_id(id),
                decimals: 0,
            },
            modified_timestamp: ts,
            sequence,
            associated,
        }
    }

    #[test]
    fn latest_record_wins_regardless_of_input_order() {
        let records = [record(2001, 90, 2, false), record(2001, 10, 1, true)];
        let latest = latest_per_token(&records);
        assert!(!latest[&token_id(2001)].associated);
    }

    #[test]
    fn equal_timestamps_resolve_to_last_inserted() {
        let records = [
            record(2001, 50, 7, false),
            record(2001, 50, 3, true),
            record(2002, 50, 4, true),
            record(2002, 50, 9, false),
        ];
        let latest = latest_per_token(&records);
        assert!(!latest[&token_id(2001)].associated);
        assert!(!latest[&token_id(2002)].associated);
        assert_eq!(latest[&token_id(2001)].sequence, 7);
    }

    #[test]
    fn dissociation_depends_on_cutoff() {
        let fx = Fixture::new();
        fx.token(2001, 4);
        fx.token_account(1001, 2001, 10, true);
        fx.token_account(1001, 2001, 90, false);
        let store = fx.into_store();

        let at_95 = dissociated_tokens_as_of(&store, account(1001), 95).unwrap();
        assert_eq!(
            at_95,
            vec![Token {
                token_id: token_id(2001),
                decimals: 4
            }]
        );

        let at_50 = dissociated_tokens_as_of(&store, account(1001), 50).unwrap();
        assert!(at_50.is_empty());

        let at_5 = dissociated_tokens_as_of(&store, account(1001), 5).unwrap();
        assert!(at_5.is_empty());
    }

    #[test]
    fn reassociated_token_is_not_dissociated() {
        let fx = Fixture::new();
        fx.token(2001, 0);
        fx.token(2002, 0);
        fx.token_account(1001, 2001, 10, false);
        fx.token_account(1001, 2001, 20, true);
        fx.token_account(1001, 2002, 15, false);
        let store = fx.into_store();

        let tokens = dissociated_tokens_as_of(&store, account(1001), 100).unwrap();
        assert_eq!(tokens.len(), 1);
        assert_eq!(tokens[0].token_id, token_id(2002));
    }

    #[test]
    fn same_timestamp_records_from_store_use_insertion_order() {
        let fx = Fixture::new();
        fx.token(2001, 0);
        fx.token_account(1001, 2001, 30, true);
        fx.token_account(1001, 2001, 30, false);
        let store = fx.into_store();

        let tokens = dissociated_tokens_as_of(&store, account(1001), 30).unwrap();
        assert_eq!(tokens.len(), 1);
    }

    #[test]
    fn transferred_tokens_come_from_the_next_block_only() {
        let fx = Fixture::new();
        fx.token(2001, 1);
        fx.token(2002, 2);
        fx.record_file(1, 10);
        fx.record_file(11, 20);
        fx.token_transfer(5, 1001, 2001, 1);
        fx.token_transfer(12, 1001, 2002, 1);
        fx.token_transfer(20, 1001, 2002, -1);
        let store = fx.into_store();

        let tokens = tokens_transferred_in_block_after(&store, account(1001), 10).unwrap();
        assert_eq!(
            tokens,
            vec![Token {
                token_id: token_id(2002),
                decimals: 2
            }]
        );

        let tokens = tokens_transferred_in_block_after(&store, account(1001), 3).unwrap();
        assert_eq!(tokens.len(), 1);
        assert_eq!(tokens[0].token_id, token_id(2001));
    }

    #[test]
    fn beyond_last_block_is_empty() {
        let fx = Fixture::new();
        fx.token(2001, 1);
        fx.record_file(1, 10);
        fx.token_transfer(5, 1001, 2001, 1);
        let store = fx.into_store();

        let tokens = tokens_transferred_in_block_after(&store, account(1001), 10).unwrap();
        assert!(tokens.is_empty());
    }
}
