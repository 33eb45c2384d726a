// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2026 ® John Hauger Mitander <john@oxidity.com>

use crate::domain::coin::Coins;
use crate::domain::swap::Simulation;
use crate::trade::set::{SwapRecord, TradeKind, TradePhase, TradeSet};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Deserialize)]
pub struct TokenRequest {
    #[serde(default)]
    pub address: String,
    #[serde(rename = "authz_grant")]
    pub base64_grant_tx: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct TokenResponse {
    pub token: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct GranteeResponse {
    #[serde(rename = "authz_grantee")]
    pub grantee_address: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct AuthzTradeResponse {
    pub id: String,
}

/// `POST /zenith` payload: the simulation, the user's pre-signed swap, and
/// how long they are willing to wait for an auctioned block.
#[derive(Debug, Clone, Deserialize)]
pub struct ZenithTradeRequest {
    pub simulation: Simulation,
    /// Base64-encoded signed user transaction.
    pub swap_tx: String,
    /// RFC3339 timestamp after which no further bids are placed.
    pub expiration: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct ZenithTradeResponse {
    pub id: String,
    pub tx_hashes: Vec<String>,
}

/// What the user stands to make, and what they have actually received.
#[derive(Debug, Clone, Default, Serialize)]
pub struct UserArbitrageEarnings {
    pub has_arbitrage: bool,
    /// Hash of the transaction that captured arbitrage for the hot wallet.
    #[serde(skip_serializing_if = "String::is_empty")]
    pub arbitrage_tx_hash: String,
    /// Hash of the transfer sending the user their share.
    #[serde(skip_serializing_if = "String::is_empty")]
    pub send_user_funds_tx_hash: String,
    /// Projection from the simulation and estimated fees; not a promise.
    pub estimated_earnings: Coins,
    pub amount_in_progress: Coins,
    pub amount_received: Coins,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub error: String,
}

/// Snapshot view of one trade set. Booleans are projections of the phase; the
/// endpoint never claims success it cannot prove from on-chain data.
#[derive(Debug, Clone, Serialize)]
pub struct TradeStatus {
    pub id: String,
    pub kind: TradeKind,
    pub phase: TradePhase,
    pub chain_height: i64,
    pub txs_committed: bool,
    pub waiting_for_auction: bool,
    /// Height of the auction last bid into, 0 if none.
    pub auction_block_bid: i64,
    pub user_swaps: Vec<SwapRecord>,
    pub user_arbitrage: UserArbitrageEarnings,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub tx_error: String,
}

impl TradeStatus {
    pub fn from_set(set: &TradeSet, estimated_earnings: Coins) -> Self {
        let mut earnings = UserArbitrageEarnings {
            estimated_earnings,
            ..UserArbitrageEarnings::default()
        };
        earnings.arbitrage_tx_hash = set.arbitrage_tx_hash().unwrap_or("").to_string();

        let share = &set.profit_share;
        if !share.pending.is_zero() || !share.received.is_zero() {
            earnings.has_arbitrage = true;
            earnings.send_user_funds_tx_hash = share.tx_hash.clone();
        }
        if !share.pending.is_zero() && share.received.is_zero() {
            earnings.amount_in_progress = share.pending.clone();
        } else if !share.received.is_zero() {
            earnings.amount_received = share.received.clone();
        }
        if share.initiated && share.committed && !share.succeeded {
            earnings.amount_received = Coins::new();
            earnings.error = "Problem sending user arbitrage (will not reattempt, \
                              please report address and time of trade)"
                .to_string();
        }

        let mut tx_error = String::new();
        if let Some(zenith) = set.zenith() {
            if zenith.error_placing_bid {
                tx_error = "Error placing bid, will reattempt".to_string();
            }
        }

        TradeStatus {
            id: set.id.clone(),
            kind: set.kind(),
            phase: set.phase,
            chain_height: set.last_chain_height,
            txs_committed: set.phase.committed(),
            waiting_for_auction: set.is_awaiting_auction(),
            auction_block_bid: set
                .zenith()
                .and_then(|z| z.submitted_bid.as_ref())
                .map(|bid| bid.height)
                .unwrap_or(0),
            user_swaps: set.user_swaps(),
            user_arbitrage: earnings,
            tx_error,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::coin::Coin;
    use crate::trade::set::{SubmittedTx, TradePhase, TradeSet};
    use crate::trade::testkit::simulation_with_arb;

    fn settled_set() -> TradeSet {
        let mut set = TradeSet::new_authz(
            "reqstatus1".to_string(),
            simulation_with_arb("osmo1user", 600_000),
            "osmo1hot".to_string(),
            vec![SubmittedTx::pending("AA".to_string())],
        );
        set.advance(TradePhase::OnChainPending);
        set.advance(TradePhase::Committed);
        set.profit_share.initiated = true;
        set.profit_share.tx_hash = "SHARE".to_string();
        set.profit_share.pending = vec![Coin::new("uosmo", 80_000)].into();
        set.advance(TradePhase::ProfitShareInitiated);
        set
    }

    #[test]
    fn in_progress_share_reports_pending_amount() {
        let status = TradeStatus::from_set(&settled_set(), Coins::new());
        assert!(status.user_arbitrage.has_arbitrage);
        assert_eq!(
            status.user_arbitrage.amount_in_progress.amount_of("uosmo"),
            80_000.into()
        );
        assert!(status.user_arbitrage.amount_received.is_zero());
        assert!(status.txs_committed);
    }

    #[test]
    fn settled_share_reports_received_amount() {
        let mut set = settled_set();
        set.profit_share.committed = true;
        set.profit_share.succeeded = true;
        set.profit_share.received = vec![Coin::new("uosmo", 80_000)].into();
        set.advance(TradePhase::ProfitShareSettled);

        let status = TradeStatus::from_set(&set, Coins::new());
        assert_eq!(
            status.user_arbitrage.amount_received.amount_of("uosmo"),
            80_000.into()
        );
        assert!(status.user_arbitrage.error.is_empty());
    }

    #[test]
    fn failed_share_reports_support_escalation() {
        let mut set = settled_set();
        set.profit_share.committed = true;
        set.profit_share.succeeded = false;
        set.advance(TradePhase::ShareFailed);

        let status = TradeStatus::from_set(&set, Coins::new());
        assert!(status.user_arbitrage.amount_received.is_zero());
        assert!(status.user_arbitrage.error.contains("will not reattempt"));
    }
}
