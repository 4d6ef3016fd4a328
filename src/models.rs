// src/models.rs
use std::fmt;
use std::str::FromStr;

use rust_decimal::Decimal;
use serde::{Serialize, Serializer};

use crate::error::EntityIdError;

const SHARD_BITS: u32 = 15;
const REALM_BITS: u32 = 16;
const NUM_BITS: u32 = 32;

const SHARD_MAX: i64 = (1 << SHARD_BITS) - 1;
const REALM_MAX: i64 = (1 << REALM_BITS) - 1;
const NUM_MAX: i64 = (1 << NUM_BITS) - 1;

/// Native currency is denominated in 10^-8 units.
pub const NATIVE_DECIMALS: u32 = 8;

/// Ledger entity identifier (`shard.realm.num`), stored packed into one i64.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EntityId {
    shard: u16,
    realm: u16,
    num: u32,
}

impl EntityId {
    pub fn new(shard: i64, realm: i64, num: i64) -> Result<Self, EntityIdError> {
        if !(0..=SHARD_MAX).contains(&shard)
            || !(0..=REALM_MAX).contains(&realm)
            || !(0..=NUM_MAX).contains(&num)
        {
            return Err(EntityIdError {
                value: format!("{shard}.{realm}.{num}"),
                reason: "component out of range",
            });
        }

        Ok(Self {
            shard: shard as u16,
            realm: realm as u16,
            num: num as u32,
        })
    }

    pub fn from_encoded(encoded: i64) -> Result<Self, EntityIdError> {
        if encoded < 0 {
            return Err(EntityIdError {
                value: encoded.to_string(),
                reason: "encoded id is negative",
            });
        }

        Self::new(
            encoded >> (REALM_BITS + NUM_BITS),
            (encoded >> NUM_BITS) & REALM_MAX,
            encoded & NUM_MAX,
        )
    }

    pub fn encoded(&self) -> i64 {
        (i64::from(self.shard) << (REALM_BITS + NUM_BITS))
            | (i64::from(self.realm) << NUM_BITS)
            | i64::from(self.num)
    }
}

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}.{}", self.shard, self.realm, self.num)
    }
}

/// Accepts `shard.realm.num` or a bare encoded id.
impl FromStr for EntityId {
    type Err = EntityIdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = |reason| EntityIdError {
            value: s.to_string(),
            reason,
        };

        let parts: Vec<&str> = s.trim().split('.').collect();
        match parts.as_slice() {
            [encoded] => {
                let encoded = encoded.parse::<i64>().map_err(|_| invalid("not a number"))?;
                Self::from_encoded(encoded)
            }
            [shard, realm, num] => {
                let parse = |part: &str| part.parse::<i64>().map_err(|_| invalid("not a number"));
                Self::new(parse(*shard)?, parse(*realm)?, parse(*num)?)
            }
            _ => Err(invalid("expected shard.realm.num")),
        }
    }
}

impl Serialize for EntityId {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct Token {
    pub token_id: EntityId,
    pub decimals: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct TokenAmount {
    #[serde(flatten)]
    pub token: Token,
    pub value: i64,
}

/// One entry of a balance response.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "asset", rename_all = "snake_case")]
pub enum Amount {
    Native { value: i64 },
    Token(TokenAmount),
}

impl Amount {
    pub fn value(&self) -> i64 {
        match self {
            Amount::Native { value } => *value,
            Amount::Token(amount) => amount.value,
        }
    }

    pub fn decimals(&self) -> u32 {
        match self {
            Amount::Native { .. } => NATIVE_DECIMALS,
            Amount::Token(amount) => amount.token.decimals,
        }
    }

    pub fn token_id(&self) -> Option<EntityId> {
        match self {
            Amount::Native { .. } => None,
            Amount::Token(amount) => Some(amount.token.token_id),
        }
    }

    /// Value scaled by decimals. `None` when the scale exceeds what `Decimal` can hold.
    pub fn to_decimal(&self) -> Option<Decimal> {
        Decimal::try_new(self.value(), self.decimals()).ok()
    }
}

/// A ledger block: contiguous consensus interval, both ends inclusive.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Block {
    pub consensus_start: i64,
    pub consensus_end: i64,
}

/// Snapshot row for one account, token balances still encoded.
#[derive(Debug, Clone)]
pub struct SnapshotRow {
    pub consensus_timestamp: i64,
    pub balance: i64,
    pub token_balances: String,
}

/// Summed transfers for one account over a window, token sums still encoded.
#[derive(Debug, Clone)]
pub struct BalanceChangeRow {
    pub value: i64,
    pub token_values: String,
}

/// One entry of an account's token association history.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AssociationRecord {
    pub token: Token,
    pub modified_timestamp: i64,
    /// Insertion order within the store; breaks ties on `modified_timestamp`.
    pub sequence: i64,
    pub associated: bool,
}
