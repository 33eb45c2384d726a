// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2026 ® John Hauger Mitander <john@mitander.dev>

use crate::auction::SubmittedBid;
use crate::domain::coin::{Coin, Coins};
use crate::domain::swap::Simulation;
use chrono::{DateTime, Utc};
use serde::Serialize;

/// Where a trade set stands in its lifecycle. Every mutation goes through the
/// tick handler, so transitions are totally ordered per set; the commit and
/// profit-share booleans the status wire format exposes are projections of
/// this and never move backwards.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TradePhase {
    /// Accepted but not yet on its way to the chain.
    Pending,
    /// Waiting for an auctioned block to bid into (Zenith only).
    AwaitingAuction,
    /// Transactions are in flight; tx-search has not confirmed all of them.
    OnChainPending,
    /// Every transaction of the set resolved on chain.
    Committed,
    /// Committed, but revenue was zero or fees ate it. Terminal.
    NoArbitrage,
    /// The user's profit-share transfer was dispatched.
    ProfitShareInitiated,
    /// The profit-share transfer resolved successfully. Terminal.
    ProfitShareSettled,
    /// The profit-share transfer failed; it is never retried. Terminal.
    ShareFailed,
    /// Expired before winning an auction (Zenith only). Terminal.
    Abandoned,
}

impl TradePhase {
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            TradePhase::NoArbitrage
                | TradePhase::ProfitShareSettled
                | TradePhase::ShareFailed
                | TradePhase::Abandoned
        )
    }

    /// Projection: did the trade transactions land on chain?
    pub fn committed(&self) -> bool {
        matches!(
            self,
            TradePhase::Committed
                | TradePhase::NoArbitrage
                | TradePhase::ProfitShareInitiated
                | TradePhase::ProfitShareSettled
                | TradePhase::ShareFailed
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TradeKind {
    Authz,
    Zenith,
}

/// One swap observed inside a committed transaction, classified for
/// settlement: whose funds moved, and whether the trade was circular.
#[derive(Debug, Clone, Serialize)]
pub struct SwapRecord {
    pub tx_hash: String,
    pub succeeded: bool,
    pub is_arbitrage: bool,
    pub is_user: bool,
    pub is_hot_wallet: bool,
    pub token_in: Coin,
    pub token_out: Coin,
}

#[derive(Debug, Clone, Serialize)]
pub struct SubmittedTx {
    pub tx_hash: String,
    pub committed: bool,
    pub succeeded: bool,
    pub swaps: Vec<SwapRecord>,
}

impl SubmittedTx {
    pub fn pending(tx_hash: String) -> Self {
        Self {
            tx_hash,
            committed: false,
            succeeded: false,
            swaps: Vec::new(),
        }
    }
}

/// The follow-up transfer that remits the user's share of realized arbitrage.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ProfitShareTx {
    pub tx_hash: String,
    pub initiated: bool,
    pub committed: bool,
    pub succeeded: bool,
    /// Share submitted to the chain, awaiting inclusion.
    pub pending: Coins,
    /// Share confirmed received by the user. Non-empty only when succeeded.
    pub received: Coins,
}

/// Zenith-only state: the user's pre-signed swap, the request's lifetime, and
/// the auction the set last bid into.
#[derive(Debug, Clone, Serialize)]
pub struct ZenithState {
    /// Base64-encoded signed user transaction, submitted verbatim in bids.
    pub signed_user_tx: String,
    pub expiration: DateTime<Utc>,
    pub submitted_bid: Option<SubmittedBid>,
    /// Transient: last bid attempt errored; cleared by the next successful one.
    pub error_placing_bid: bool,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TradeFlavor {
    Authz,
    Zenith(ZenithState),
}

/// The central entity: one user trade, the arbitrage bundled with it, and
/// everything observed about it on chain. Owned by the registry, mutated only
/// on block ticks.
#[derive(Debug, Clone, Serialize)]
pub struct TradeSet {
    pub id: String,
    pub phase: TradePhase,
    pub flavor: TradeFlavor,
    pub user_address: String,
    pub hot_wallet_address: String,
    pub simulation: Simulation,
    pub trade_txs: Vec<SubmittedTx>,
    pub user_tx_fees: Coins,
    pub hot_wallet_tx_fees: Coins,
    pub hot_wallet_auction_fees: Coins,
    pub total_arbitrage_revenue: Coins,
    pub hot_wallet_profit_actual: Coins,
    pub profit_share: ProfitShareTx,
    pub last_chain_height: i64,
}

impl TradeSet {
    pub fn new_authz(
        id: String,
        simulation: Simulation,
        hot_wallet_address: String,
        trade_txs: Vec<SubmittedTx>,
    ) -> Self {
        let user_address = simulation.user_address.clone();
        Self {
            id,
            phase: TradePhase::Pending,
            flavor: TradeFlavor::Authz,
            user_address,
            hot_wallet_address,
            simulation,
            trade_txs,
            user_tx_fees: Coins::new(),
            hot_wallet_tx_fees: Coins::new(),
            hot_wallet_auction_fees: Coins::new(),
            total_arbitrage_revenue: Coins::new(),
            hot_wallet_profit_actual: Coins::new(),
            profit_share: ProfitShareTx::default(),
            last_chain_height: 0,
        }
    }

    pub fn new_zenith(
        id: String,
        simulation: Simulation,
        hot_wallet_address: String,
        signed_user_tx: String,
        expiration: DateTime<Utc>,
    ) -> Self {
        let user_address = simulation.user_address.clone();
        Self {
            id,
            phase: TradePhase::Pending,
            flavor: TradeFlavor::Zenith(ZenithState {
                signed_user_tx,
                expiration,
                submitted_bid: None,
                error_placing_bid: false,
            }),
            user_address,
            hot_wallet_address,
            simulation,
            trade_txs: Vec::new(),
            user_tx_fees: Coins::new(),
            hot_wallet_tx_fees: Coins::new(),
            hot_wallet_auction_fees: Coins::new(),
            total_arbitrage_revenue: Coins::new(),
            hot_wallet_profit_actual: Coins::new(),
            profit_share: ProfitShareTx::default(),
            last_chain_height: 0,
        }
    }

    pub fn kind(&self) -> TradeKind {
        match self.flavor {
            TradeFlavor::Authz => TradeKind::Authz,
            TradeFlavor::Zenith(_) => TradeKind::Zenith,
        }
    }

    pub fn zenith(&self) -> Option<&ZenithState> {
        match &self.flavor {
            TradeFlavor::Zenith(z) => Some(z),
            TradeFlavor::Authz => None,
        }
    }

    pub fn zenith_mut(&mut self) -> Option<&mut ZenithState> {
        match &mut self.flavor {
            TradeFlavor::Zenith(z) => Some(z),
            TradeFlavor::Authz => None,
        }
    }

    /// A Zenith set wants (another) bid while it has never bid, or the block
    /// it bid into passed without its transactions committing.
    pub fn is_awaiting_auction(&self) -> bool {
        let Some(zenith) = self.zenith() else {
            return false;
        };
        match &zenith.submitted_bid {
            None => !self.phase.is_terminal(),
            Some(bid) => self.last_chain_height > bid.height && !self.phase.committed(),
        }
    }

    pub fn advance(&mut self, next: TradePhase) {
        if self.phase == next {
            return;
        }
        tracing::info!(
            target: "trade",
            id = %self.id,
            from = ?self.phase,
            to = ?next,
            "Trade set transition"
        );
        self.phase = next;
    }

    /// The hash of the transaction that captured arbitrage, for status
    /// reporting.
    pub fn arbitrage_tx_hash(&self) -> Option<&str> {
        let mut hash = None;
        for tx in &self.trade_txs {
            for swap in &tx.swaps {
                if swap.is_arbitrage && swap.is_hot_wallet {
                    hash = Some(tx.tx_hash.as_str());
                }
            }
        }
        hash
    }

    /// The user's own swaps across the set, for status reporting.
    pub fn user_swaps(&self) -> Vec<SwapRecord> {
        self.trade_txs
            .iter()
            .flat_map(|tx| tx.swaps.iter())
            .filter(|s| s.is_user)
            .cloned()
            .collect()
    }
}
