// src/payload.rs
//! Decoding of the per-asset aggregates the store embeds in query rows.
//!
//! Snapshot token balances and windowed token sums both arrive as a JSON array
//! of `{"token_id", "decimals", "value"}` objects. Anything that does not decode
//! into that shape is a data-integrity failure, reported as `MalformedPayload`.

use serde::Deserialize;
use tracing::warn;

use crate::error::{BalanceError, BalanceResult};
use crate::models::{EntityId, Token, TokenAmount};

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct EncodedTokenAmount {
    token_id: i64,
    decimals: i64,
    value: i64,
}

pub fn decode_token_amounts(raw: &str) -> BalanceResult<Vec<TokenAmount>> {
    let entries: Vec<EncodedTokenAmount> = serde_json::from_str(raw).map_err(|e| {
        warn!(error = %e, "failed to decode token amounts");
        BalanceError::malformed(format!("token amounts: {e}"))
    })?;

    entries
        .into_iter()
        .map(|entry| {
            Ok(TokenAmount {
                token: decode_token(entry.token_id, entry.decimals)?,
                value: entry.value,
            })
        })
        .collect()
}

/// Builds a `Token` from its stored columns.
pub fn decode_token(token_id: i64, decimals: i64) -> BalanceResult<Token> {
    let token_id = EntityId::from_encoded(token_id).map_err(|e| {
        warn!(error = %e, "stored token id is invalid");
        BalanceError::malformed(e.to_string())
    })?;

    let decimals = u32::try_from(decimals).map_err(|_| {
        warn!(%token_id, decimals, "stored token decimals out of range");
        BalanceError::malformed(format!("token {token_id} has decimals {decimals}"))
    })?;

    Ok(Token { token_id, decimals })
}
