// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2026 ® John Hauger Mitander <john@mitander.dev>

use crate::domain::error::AppError;
use num_bigint::BigInt;
use num_traits::{Signed, Zero};
use serde::{Deserialize, Serialize};
use std::fmt;

/// A single token position. Amounts are arbitrary-precision integers in the
/// token's base units and serialize as decimal strings on the wire.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Coin {
    pub denom: String,
    #[serde(with = "amount_string")]
    pub amount: BigInt,
}

impl Coin {
    pub fn new(denom: impl Into<String>, amount: impl Into<BigInt>) -> Self {
        Self {
            denom: denom.into(),
            amount: amount.into(),
        }
    }

    pub fn is_zero(&self) -> bool {
        self.amount.is_zero()
    }

    pub fn is_negative(&self) -> bool {
        self.amount.is_negative()
    }
}

impl fmt::Display for Coin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.amount, self.denom)
    }
}

/// Parse a coin string like `5000000uosmo`.
pub fn parse_coin(raw: &str) -> Result<Coin, AppError> {
    let trimmed = raw.trim();
    let split = trimmed
        .find(|c: char| !c.is_ascii_digit() && c != '-')
        .ok_or_else(|| AppError::Validation {
            field: "coin".to_string(),
            message: format!("'{trimmed}' has no denom"),
        })?;
    let (amount_str, denom) = trimmed.split_at(split);
    if amount_str.is_empty() || !denom.starts_with(|c: char| c.is_ascii_alphabetic()) {
        return Err(AppError::Validation {
            field: "coin".to_string(),
            message: format!("'{trimmed}' is not amount-then-denom"),
        });
    }
    let amount = amount_str.parse::<BigInt>().map_err(|_| AppError::Validation {
        field: "coin".to_string(),
        message: format!("'{amount_str}' is not an integer amount"),
    })?;
    Ok(Coin {
        denom: denom.to_string(),
        amount,
    })
}

/// An ordered, deduplicated-by-denom collection of coins. Zero entries are
/// dropped on insert; negative entries only ever appear in `safe_sub` results.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Coins(Vec<Coin>);

impl Coins {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Coin> {
        self.0.iter()
    }

    pub fn is_zero(&self) -> bool {
        self.0.iter().all(Coin::is_zero)
    }

    pub fn is_any_negative(&self) -> bool {
        self.0.iter().any(Coin::is_negative)
    }

    pub fn amount_of(&self, denom: &str) -> BigInt {
        self.0
            .iter()
            .find(|c| c.denom == denom)
            .map(|c| c.amount.clone())
            .unwrap_or_else(BigInt::zero)
    }

    /// True if this collection holds at least `required` of its denom.
    pub fn covers(&self, required: &Coin) -> bool {
        self.amount_of(&required.denom) >= required.amount
    }

    pub fn add(&mut self, coin: Coin) {
        if coin.is_zero() {
            return;
        }
        match self.0.iter_mut().find(|c| c.denom == coin.denom) {
            Some(existing) => {
                existing.amount += coin.amount;
                if existing.is_zero() {
                    self.0.retain(|c| !c.is_zero());
                }
            }
            None => {
                self.0.push(coin);
                self.0.sort_by(|a, b| a.denom.cmp(&b.denom));
            }
        }
    }

    pub fn add_all(&mut self, coins: &Coins) {
        for coin in coins.iter() {
            self.add(coin.clone());
        }
    }

    /// Subtract `other`, reporting whether any resulting denom went negative.
    /// The returned collection keeps negative entries so callers can inspect
    /// the shortfall.
    pub fn safe_sub(&self, other: &Coins) -> (Coins, bool) {
        let mut result = self.clone();
        for coin in other.iter() {
            result.add(Coin::new(coin.denom.clone(), -coin.amount.clone()));
        }
        let negative = result.is_any_negative();
        (result, negative)
    }
}

impl From<Vec<Coin>> for Coins {
    fn from(mut coins: Vec<Coin>) -> Self {
        coins.retain(|c| !c.is_zero());
        let mut out = Coins::new();
        for coin in coins {
            out.add(coin);
        }
        out
    }
}

impl FromIterator<Coin> for Coins {
    fn from_iter<I: IntoIterator<Item = Coin>>(iter: I) -> Self {
        let mut out = Coins::new();
        for coin in iter {
            out.add(coin);
        }
        out
    }
}

impl fmt::Display for Coins {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let joined = self
            .0
            .iter()
            .map(Coin::to_string)
            .collect::<Vec<_>>()
            .join(",");
        write!(f, "{joined}")
    }
}

/// Serde helper: big-integer amounts travel as decimal strings on the wire.
pub mod amount_string {
    use num_bigint::BigInt;
    use serde::{Deserialize, Deserializer, Serializer, de::Error};

    pub fn serialize<S: Serializer>(amount: &BigInt, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&amount.to_string())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<BigInt, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse::<BigInt>()
            .map_err(|_| D::Error::custom(format!("'{raw}' is not an integer amount")))
    }
}
