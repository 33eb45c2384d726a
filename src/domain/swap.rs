// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2026 ® John Hauger Mitander <john@mitander.dev>

use crate::domain::coin::Coin;
use num_bigint::BigInt;
use serde::{Deserialize, Serialize};

/// One pool hop: trade whatever came in through `pool_id`, leaving as
/// `token_out_denom`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Route {
    pub pool_id: u64,
    pub token_out_denom: String,
}

/// A fully-priced swap as produced by the external simulator: the exact input,
/// the minimum acceptable output, and the pool hops to route through.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SwapPlan {
    pub token_in: Coin,
    #[serde(with = "super::coin::amount_string")]
    pub token_out_min_amount: BigInt,
    #[serde(with = "super::coin::amount_string")]
    pub token_out_amount: BigInt,
    pub token_out_denom: String,
    pub routes: Vec<Route>,
}

impl SwapPlan {
    /// A circular plan ends where it began; that is the shape of every
    /// arbitrage trade.
    pub fn is_circular(&self) -> bool {
        self.routes
            .last()
            .map(|last| last.token_out_denom == self.token_in.denom)
            .unwrap_or(false)
    }

    /// Simulated revenue: estimated output minus input. Only meaningful for
    /// circular plans, where both sides share a denom.
    pub fn estimated_revenue(&self) -> BigInt {
        &self.token_out_amount - &self.token_in.amount
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ArbitrageSwap {
    pub swap: SwapPlan,
    /// Human-readable estimate from the simulator, e.g. "0.100000 OSMO".
    #[serde(default)]
    pub estimated_profit: String,
}

/// The simulator's verdict on one user trade: the user's swap, and the
/// arbitrage it opens up (if any).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Simulation {
    pub user_swap: SwapPlan,
    #[serde(default)]
    pub arbitrage_swap: Option<ArbitrageSwap>,
    #[serde(default)]
    pub has_arbitrage: bool,
    pub user_address: String,
}

impl Simulation {
    pub fn arbitrage(&self) -> Option<&SwapPlan> {
        if !self.has_arbitrage {
            return None;
        }
        self.arbitrage_swap.as_ref().map(|a| &a.swap)
    }
}
