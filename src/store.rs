// src/store.rs
use rusqlite::{named_params, Connection, OptionalExtension};
use tracing::debug;

use crate::error::{storage, BalanceResult};
use crate::models::{AssociationRecord, BalanceChangeRow, Block, EntityId, SnapshotRow, Token};
use crate::payload;

/// Read-only access to the historical ledger.
///
/// Implementations never mutate ledger state, so independent queries may run
/// in parallel, each against its own store.
pub trait LedgerStore {
    /// Latest snapshot at or before `timestamp`, with this account's row in it.
    /// An account missing from the snapshot reads as balance 0 and no tokens.
    fn latest_snapshot_at_or_before(
        &self,
        account: EntityId,
        timestamp: i64,
    ) -> BalanceResult<Option<SnapshotRow>>;

    /// Signed transfer sums for the account in `(start_exclusive, end_inclusive]`.
    fn sum_signed_transfers(
        &self,
        account: EntityId,
        start_exclusive: i64,
        end_inclusive: i64,
    ) -> BalanceResult<BalanceChangeRow>;

    /// Every association record of the account modified at or before `upto`.
    fn association_history(
        &self,
        account: EntityId,
        upto: i64,
    ) -> BalanceResult<Vec<AssociationRecord>>;

    /// The block with the smallest end strictly greater than `timestamp`.
    fn block_after(&self, timestamp: i64) -> BalanceResult<Option<Block>>;

    /// Distinct tokens moved to or from the account inside `block`.
    fn tokens_transferred_in(&self, account: EntityId, block: &Block) -> BalanceResult<Vec<Token>>;
}

const LATEST_SNAPSHOT_SQL: &str = r#"
WITH abm AS (
  SELECT MAX(consensus_timestamp) AS snapshot_timestamp
  FROM account_balance_file
  WHERE consensus_timestamp <= :timestamp
)
SELECT
  abm.snapshot_timestamp,
  COALESCE(ab.balance, 0),
  COALESCE((
    SELECT json_group_array(json_object(
      'token_id', tb.token_id,
      'decimals', t.decimals,
      'value', tb.balance
    ))
    FROM token_balance tb
    JOIN token t ON t.token_id = tb.token_id
    WHERE tb.consensus_timestamp = abm.snapshot_timestamp
      AND tb.account_id = :account_id
  ), '[]')
FROM abm
LEFT JOIN account_balance ab
  ON ab.consensus_timestamp = abm.snapshot_timestamp AND ab.account_id = :account_id
"#;

const BALANCE_CHANGE_SQL: &str = r#"
SELECT
  COALESCE((
    SELECT SUM(amount)
    FROM crypto_transfer
    WHERE consensus_timestamp > :start
      AND consensus_timestamp <= :end
      AND entity_id = :account_id
  ), 0),
  COALESCE((
    SELECT json_group_array(json_object(
      'token_id', token_id,
      'decimals', decimals,
      'value', total
    ))
    FROM (
      SELECT tt.token_id AS token_id, t.decimals AS decimals, SUM(tt.amount) AS total
      FROM token_transfer tt
      JOIN token t ON t.token_id = tt.token_id
      WHERE tt.consensus_timestamp > :start
        AND tt.consensus_timestamp <= :end
        AND tt.account_id = :account_id
      GROUP BY tt.token_id, t.decimals
    )
  ), '[]')
"#;

const ASSOCIATION_HISTORY_SQL: &str = r#"
SELECT ta.token_id, t.decimals, ta.modified_timestamp, ta.id, ta.associated
FROM token_account ta
JOIN token t ON t.token_id = ta.token_id
WHERE ta.account_id = :account_id
  AND ta.modified_timestamp <= :timestamp
ORDER BY ta.token_id, ta.modified_timestamp, ta.id
"#;

const BLOCK_AFTER_SQL: &str = r#"
SELECT consensus_start, consensus_end
FROM record_file
WHERE consensus_end > :timestamp
ORDER BY consensus_end
LIMIT 1
"#;

const TOKENS_IN_BLOCK_SQL: &str = r#"
SELECT DISTINCT tt.token_id, t.decimals
FROM token_transfer tt
JOIN token t ON t.token_id = tt.token_id
WHERE tt.account_id = :account_id
  AND tt.consensus_timestamp >= :start
  AND tt.consensus_timestamp <= :end
ORDER BY tt.token_id
"#;

/// `LedgerStore` over a single SQLite connection.
pub struct SqliteLedgerStore {
    conn: Connection,
}

impl SqliteLedgerStore {
    pub fn new(conn: Connection) -> Self {
        Self { conn }
    }
}

impl LedgerStore for SqliteLedgerStore {
    fn latest_snapshot_at_or_before(
        &self,
        account: EntityId,
        timestamp: i64,
    ) -> BalanceResult<Option<SnapshotRow>> {
        let (snapshot_timestamp, balance, token_balances): (Option<i64>, i64, String) = self
            .conn
            .query_row(
                LATEST_SNAPSHOT_SQL,
                named_params! { ":timestamp": timestamp, ":account_id": account.encoded() },
                |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?)),
            )
            .map_err(storage("reading latest balance snapshot"))?;

        debug!(%account, timestamp, ?snapshot_timestamp, "queried latest snapshot");

        Ok(snapshot_timestamp.map(|consensus_timestamp| SnapshotRow {
            consensus_timestamp,
            balance,
            token_balances,
        }))
    }

    fn sum_signed_transfers(
        &self,
        account: EntityId,
        start_exclusive: i64,
        end_inclusive: i64,
    ) -> BalanceResult<BalanceChangeRow> {
        self.conn
            .query_row(
                BALANCE_CHANGE_SQL,
                named_params! {
                    ":start": start_exclusive,
                    ":end": end_inclusive,
                    ":account_id": account.encoded(),
                },
                |row| {
                    Ok(BalanceChangeRow {
                        value: row.get(0)?,
                        token_values: row.get(1)?,
                    })
                },
            )
            .map_err(storage("summing transfers"))
    }

    fn association_history(
        &self,
        account: EntityId,
        upto: i64,
    ) -> BalanceResult<Vec<AssociationRecord>> {
        let mut stmt = self
            .conn
            .prepare_cached(ASSOCIATION_HISTORY_SQL)
            .map_err(storage("preparing association history"))?;

        let rows = stmt
            .query_map(
                named_params! { ":account_id": account.encoded(), ":timestamp": upto },
                |row| {
                    Ok((
                        row.get::<_, i64>(0)?,
                        row.get::<_, i64>(1)?,
                        row.get::<_, i64>(2)?,
                        row.get::<_, i64>(3)?,
                        row.get::<_, bool>(4)?,
                    ))
                },
            )
            .map_err(storage("reading association history"))?;

        let mut records = Vec::new();
        for row in rows {
            let (token_id, decimals, modified_timestamp, sequence, associated) =
                row.map_err(storage("reading association history"))?;
            records.push(AssociationRecord {
                token: payload::decode_token(token_id, decimals)?,
                modified_timestamp,
                sequence,
                associated,
            });
        }

        Ok(records)
    }

    fn block_after(&self, timestamp: i64) -> BalanceResult<Option<Block>> {
        self.conn
            .query_row(BLOCK_AFTER_SQL, named_params! { ":timestamp": timestamp }, |row| {
                Ok(Block {
                    consensus_start: row.get(0)?,
                    consensus_end: row.get(1)?,
                })
            })
            .optional()
            .map_err(storage("reading next block"))
    }

    fn tokens_transferred_in(&self, account: EntityId, block: &Block) -> BalanceResult<Vec<Token>> {
        let mut stmt = self
            .conn
            .prepare_cached(TOKENS_IN_BLOCK_SQL)
            .map_err(storage("preparing block transfers"))?;

        let rows = stmt
            .query_map(
                named_params! {
                    ":account_id": account.encoded(),
                    ":start": block.consensus_start,
                    ":end": block.consensus_end,
                },
                |row| Ok((row.get::<_, i64>(0)?, row.get::<_, i64>(1)?)),
            )
            .map_err(storage("reading block transfers"))?;

        let mut tokens = Vec::new();
        for row in rows {
            let (token_id, decimals) = row.map_err(storage("reading block transfers"))?;
            tokens.push(payload::decode_token(token_id, decimals)?);
        }

        Ok(tokens)
    }
}
