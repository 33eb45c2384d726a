// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2026 ® John Hauger Mitander <john@oxidity.com>

use crate::auction::client::AuctionApi;
use crate::auction::tracker::AuctionTracker;
use crate::auction::{BidRequest, FutureBlock, SubmittedBid};
use crate::chain::events::{ParsedTx, SwapEventParser};
use crate::chain::follower::BlockHandler;
use crate::chain::{ChainClient, ChainMsg, Keyring, MsgSend, await_tx};
use crate::common::backoff::Backoff;
use crate::common::ids::tx_hash;
use crate::domain::coin::{Coin, Coins};
use crate::domain::error::AppError;
use crate::trade::builder::{
    BidConfig, build_auction_payments, check_bid_eligibility, verify_user_tx_matches,
};
use crate::trade::registry::TradeRegistry;
use crate::trade::set::{SubmittedTx, SwapRecord, TradeFlavor, TradePhase, TradeSet};
use async_trait::async_trait;
use base64::Engine;
use base64::prelude::BASE64_STANDARD;
use num_bigint::BigInt;
use num_traits::Zero;
use std::sync::Arc;
use tokio::time::Duration;

/// The profit-share fraction is clamped here no matter what the config says.
const MAX_USER_PROFIT_SHARE: f64 = 0.85;

const FRACTION_SCALE: i64 = 1_000_000;

/// Keyring signing gets a short second chance before a bid or share attempt
/// is written off.
const SIGN_BACKOFF: Backoff = Backoff::new(5, Duration::from_millis(400));

#[derive(Debug, Clone)]
pub struct TrackerConfig {
    pub chain_id: String,
    pub native_denom: String,
    pub bid: BidConfig,
    pub user_profit_share: f64,
    /// Per-hash lookup budget inside a tick. The block already committed by
    /// the time the tick fires, so this stays short.
    pub tick_lookup_timeout: Duration,
}

/// Owns every in-flight trade set and advances each through its lifecycle on
/// block ticks: auction pacing for Zenith sets, then settlement, profit
/// computation, and the one-shot user profit share for everything committed.
///
/// All mutation happens inside `on_block`, which the dispatcher runs
/// serially; status readers only ever see whole-set snapshots.
pub struct TradeTracker {
    registry: Arc<TradeRegistry>,
    chain: Arc<dyn ChainClient>,
    keyring: Arc<dyn Keyring>,
    auction_api: Arc<dyn AuctionApi>,
    auctions: Arc<AuctionTracker>,
    parser: Arc<dyn SwapEventParser>,
    config: TrackerConfig,
}

impl TradeTracker {
    pub fn new(
        registry: Arc<TradeRegistry>,
        chain: Arc<dyn ChainClient>,
        keyring: Arc<dyn Keyring>,
        auction_api: Arc<dyn AuctionApi>,
        auctions: Arc<AuctionTracker>,
        parser: Arc<dyn SwapEventParser>,
        config: TrackerConfig,
    ) -> Self {
        Self {
            registry,
            chain,
            keyring,
            auction_api,
            auctions,
            parser,
            config,
        }
    }

    /// Bid waiting Zenith sets into the next block's auction, if there is
    /// one. Only sets sitting in `AwaitingAuction` are considered here; a set
    /// whose bid is in flight belongs to the settlement pass, which is the
    /// sole place a lost auction demotes it back to waiting. That ordering
    /// gives a late-but-real commit a full settle pass before any re-bid can
    /// replace its transaction hashes.
    async fn pace_auctions(&self, height: i64) {
        let Some(next_auction) = self.auctions.next_auction_block() else {
            return;
        };
        let next_height = height + 1;

        for id in self.registry.ids() {
            let Some(mut set) = self.registry.snapshot(&id) else {
                continue;
            };
            if set.phase != TradePhase::AwaitingAuction {
                continue;
            }
            set.last_chain_height = height;

            if !set.is_awaiting_auction() {
                self.registry.store(set);
                continue;
            }

            // The set will not survive until the block we could win: there is
            // no point bidding now or ever again.
            let expiration = set.zenith().map(|z| z.expiration);
            if let Some(expiration) = expiration {
                if expiration < next_auction.projected_time {
                    tracing::info!(
                        target: "trade",
                        id = %set.id,
                        %expiration,
                        projected = %next_auction.projected_time,
                        "Request expires before the next auction block; abandoning"
                    );
                    set.advance(TradePhase::Abandoned);
                    self.registry.store(set);
                    continue;
                }
            }

            // Bids are only accepted for the immediately next block.
            if next_auction.height != next_height {
                self.registry.store(set);
                continue;
            }

            if let Err(e) = self.build_and_place_bid(&mut set, &next_auction).await {
                tracing::warn!(target: "trade", id = %set.id, error = %e, "Failed to place auction bid");
            }
            self.registry.store(set);
        }
    }

    /// Construct the two-transaction bundle (user swap verbatim, hot-wallet
    /// arbitrage + auction payments) and bid it into `block`'s auction.
    async fn build_and_place_bid(
        &self,
        set: &mut TradeSet,
        block: &FutureBlock,
    ) -> Result<(), AppError> {
        let signed_user_tx = match set.zenith() {
            Some(z) => z.signed_user_tx.clone(),
            None => return Ok(()),
        };
        let hot_address = self.keyring.address().to_string();

        let balances = self.chain.all_balances(&hot_address).await?;
        let arb_balance = balances.amount_of(&self.config.bid.max_bid.denom);

        let econ = check_bid_eligibility(&set.simulation, &self.config.bid, &hot_address, &arb_balance)?;

        let user_tx_bytes = BASE64_STANDARD
            .decode(&signed_user_tx)
            .map_err(|_| AppError::Ineligible("user tx must be base64 encoded".to_string()))?;
        let decoded = self
            .chain
            .decode_tx(&user_tx_bytes)
            .map_err(|_| AppError::Ineligible("user tx must be a valid chain tx".to_string()))?;
        if !verify_user_tx_matches(&decoded, &set.simulation) {
            return Err(AppError::Ineligible(
                "signed user tx does not match the simulation".to_string(),
            ));
        }

        let auction = block
            .auction
            .as_ref()
            .ok_or_else(|| AppError::Auction("auction block has no payment info".to_string()))?;
        let payment_msgs = build_auction_payments(
            &econ.bid_amount,
            &auction.payments,
            &self.config.native_denom,
            &hot_address,
        )?;

        let mut msgs = econ.arb_msgs;
        msgs.extend(payment_msgs);

        let hot_tx_bytes = SIGN_BACKOFF
            .run(|| self.keyring.sign_tx(&msgs, econ.gas_units))
            .await
            .map_err(|e| AppError::Signing(format!("auction bundle signing failed: {e}")))?;

        let bid = BidRequest {
            chain_id: self.config.chain_id.clone(),
            height: block.height,
            kind: None,
            txs: vec![signed_user_tx, BASE64_STANDARD.encode(&hot_tx_bytes)],
        };

        match self.auction_api.place_bid(&bid).await {
            Ok(resp) => {
                tracing::info!(
                    target: "trade",
                    id = %set.id,
                    height = block.height,
                    bid = %econ.bid_amount,
                    tx_hashes = ?resp.tx_hashes,
                    "Auction bid placed"
                );
                set.trade_txs = vec![
                    SubmittedTx::pending(tx_hash(&user_tx_bytes)),
                    SubmittedTx::pending(tx_hash(&hot_tx_bytes)),
                ];
                // A fresh bid means fresh settlement accounting.
                set.user_tx_fees = Coins::new();
                set.hot_wallet_tx_fees = Coins::new();
                set.hot_wallet_auction_fees = Coins::new();
                set.total_arbitrage_revenue = Coins::new();
                if let Some(zenith) = set.zenith_mut() {
                    zenith.submitted_bid = Some(SubmittedBid {
                        chain_id: self.config.chain_id.clone(),
                        height: block.height,
                    });
                    zenith.error_placing_bid = false;
                }
                set.advance(TradePhase::OnChainPending);
                Ok(())
            }
            Err(e) => {
                if let Some(zenith) = set.zenith_mut() {
                    zenith.error_placing_bid = true;
                }
                Err(e)
            }
        }
    }

    /// Advance every non-terminal set one settlement stage.
    async fn settle(&self, height: i64) {
        for id in self.registry.ids() {
            let Some(mut set) = self.registry.snapshot(&id) else {
                continue;
            };
            if set.phase.is_terminal() {
                continue;
            }
            set.last_chain_height = height;

            match set.phase {
                TradePhase::OnChainPending => self.check_commitment(&mut set).await,
                TradePhase::Committed => self.initiate_profit_share(&mut set).await,
                TradePhase::ProfitShareInitiated => self.check_profit_share(&mut set).await,
                _ => {}
            }

            self.registry.store(set);
        }
    }

    async fn check_commitment(&self, set: &mut TradeSet) {
        let mut parsed = Vec::with_capacity(set.trade_txs.len());
        for tx in &set.trade_txs {
            match await_tx(self.chain.as_ref(), &tx.tx_hash, self.config.tick_lookup_timeout).await
            {
                Ok(lookup) => parsed.push(self.parser.parse_tx(&lookup)),
                Err(e) => {
                    tracing::debug!(
                        target: "trade",
                        id = %set.id,
                        tx_hash = %tx.tx_hash,
                        error = %e,
                        "Trade tx not found yet"
                    );
                }
            }
        }

        if parsed.len() != set.trade_txs.len() {
            // A Zenith set whose auctioned block came and went without its
            // transactions landing lost the auction; it goes back to bidding.
            let lost_auction = set
                .zenith()
                .and_then(|z| z.submitted_bid.as_ref())
                .map(|bid| set.last_chain_height > bid.height)
                .unwrap_or(false);
            if lost_auction && parsed.is_empty() {
                tracing::info!(target: "trade", id = %set.id, "Auction bid lost; will re-bid");
                set.advance(TradePhase::AwaitingAuction);
                return;
            }
            tracing::info!(
                target: "trade",
                id = %set.id,
                waiting = %hash_list(&set.trade_txs),
                "Waiting for trade txs to commit"
            );
            return;
        }

        set.advance(TradePhase::Committed);
        apply_committed(set, &parsed);
    }

    /// Compute realized profit once, then either close the set out as
    /// no-arbitrage or dispatch the user's share. One attempt, ever.
    async fn initiate_profit_share(&self, set: &mut TradeSet) {
        let (after_tx_fees, _) = set
            .total_arbitrage_revenue
            .safe_sub(&set.hot_wallet_tx_fees);
        let (profit, negative) = after_tx_fees.safe_sub(&set.hot_wallet_auction_fees);
        set.hot_wallet_profit_actual = profit.clone();

        let all_hashes = hash_list(&set.trade_txs);
        if set.total_arbitrage_revenue.is_zero() || negative {
            tracing::info!(
                target: "trade",
                id = %set.id,
                tx_hashes = %all_hashes,
                revenue = %set.total_arbitrage_revenue,
                "Trade set had no arbitrage"
            );
            set.advance(TradePhase::NoArbitrage);
            return;
        }

        tracing::info!(
            target: "trade",
            id = %set.id,
            tx_hashes = %all_hashes,
            revenue = %set.total_arbitrage_revenue,
            profit = %set.hot_wallet_profit_actual,
            arb_tx = set.arbitrage_tx_hash().unwrap_or(""),
            "Arbitrage realized"
        );

        let (msgs, pending) = profit_share_messages(
            &profit,
            self.config.user_profit_share,
            &set.hot_wallet_address,
            &set.user_address,
        );
        if msgs.is_empty() {
            tracing::error!(
                target: "trade",
                id = %set.id,
                "Positive profit but no sendable user share; check profit share configuration"
            );
            set.profit_share.initiated = true;
            set.advance(TradePhase::ShareFailed);
            return;
        }

        set.profit_share.initiated = true;
        set.profit_share.pending = pending;

        let signed = SIGN_BACKOFF.run(|| self.keyring.sign_tx(&msgs, 0)).await;
        let tx_bytes = match signed {
            Ok(bytes) => bytes,
            Err(e) => {
                tracing::error!(target: "trade", id = %set.id, error = %e, "Profit share signing failed");
                set.advance(TradePhase::ShareFailed);
                return;
            }
        };

        match self.chain.broadcast_tx_sync(&tx_bytes).await {
            Ok(resp) if resp.code == 0 => {
                tracing::info!(
                    target: "trade",
                    id = %set.id,
                    tx_hash = %resp.tx_hash,
                    pending = %set.profit_share.pending,
                    "User profit share dispatched"
                );
                set.profit_share.tx_hash = resp.tx_hash;
                set.advance(TradePhase::ProfitShareInitiated);
            }
            Ok(resp) => {
                tracing::error!(
                    target: "trade",
                    id = %set.id,
                    code = resp.code,
                    raw_log = %resp.raw_log,
                    "Profit share broadcast rejected"
                );
                set.advance(TradePhase::ShareFailed);
            }
            Err(e) => {
                tracing::error!(target: "trade", id = %set.id, error = %e, "Profit share broadcast failed");
                set.advance(TradePhase::ShareFailed);
            }
        }
    }

    async fn check_profit_share(&self, set: &mut TradeSet) {
        let lookup = match await_tx(
            self.chain.as_ref(),
            &set.profit_share.tx_hash,
            self.config.tick_lookup_timeout,
        )
        .await
        {
            Ok(lookup) => lookup,
            Err(e) => {
                tracing::debug!(
                    target: "trade",
                    id = %set.id,
                    tx_hash = %set.profit_share.tx_hash,
                    error = %e,
                    "Profit share tx not found yet"
                );
                return;
            }
        };

        set.profit_share.committed = true;
        set.profit_share.succeeded = lookup.code == 0;
        if !set.profit_share.succeeded {
            tracing::error!(
                target: "trade",
                id = %set.id,
                tx_hash = %set.profit_share.tx_hash,
                code = lookup.code,
                "Profit share tx failed on chain"
            );
            set.advance(TradePhase::ShareFailed);
            return;
        }

        let parsed = self.parser.parse_tx(&lookup);
        let mut received = Coins::new();
        for send in &parsed.sends {
            if send.receiver == set.user_address {
                received.add(send.token.clone());
            }
        }
        tracing::info!(
            target: "trade",
            id = %set.id,
            user = %set.user_address,
            %received,
            tx_hash = %set.profit_share.tx_hash,
            "User received profit share"
        );
        set.profit_share.received = received;
        set.advance(TradePhase::ProfitShareSettled);
    }
}

#[async_trait]
impl BlockHandler for TradeTracker {
    async fn on_block(&self, height: i64, _avg_block_ms: i64) {
        self.pace_auctions(height).await;
        self.settle(height).await;
    }
}

fn hash_list(txs: &[SubmittedTx]) -> String {
    txs.iter()
        .map(|t| t.tx_hash.as_str())
        .collect::<Vec<_>>()
        .join(", ")
}

/// Fold the committed transactions into the set: fee attribution by payer,
/// swap classification, auction fees (Zenith), and arbitrage revenue from
/// every hot-wallet circular swap.
fn apply_committed(set: &mut TradeSet, parsed: &[ParsedTx]) {
    let user = set.user_address.clone();
    let hot = set.hot_wallet_address.clone();
    let zenith = matches!(set.flavor, TradeFlavor::Zenith(_));

    set.trade_txs = Vec::with_capacity(parsed.len());
    for ptx in parsed {
        // Fees are owed whether or not the tx succeeded.
        if ptx.fee_payer == user {
            set.user_tx_fees.add_all(&ptx.fees);
        } else if ptx.fee_payer == hot {
            set.hot_wallet_tx_fees.add_all(&ptx.fees);
        }

        let submitted = SubmittedTx {
            tx_hash: ptx.tx_hash.clone(),
            committed: true,
            succeeded: ptx.succeeded,
            swaps: ptx
                .swaps
                .iter()
                .map(|swap| SwapRecord {
                    tx_hash: ptx.tx_hash.clone(),
                    succeeded: ptx.succeeded,
                    is_arbitrage: swap.token_in.denom == swap.token_out.denom,
                    is_user: swap.address == user,
                    is_hot_wallet: swap.address == hot,
                    token_in: swap.token_in.clone(),
                    token_out: swap.token_out.clone(),
                })
                .collect(),
        };

        if ptx.succeeded {
            for send in &ptx.sends {
                if zenith && send.sender == hot && send.receiver != user {
                    set.hot_wallet_auction_fees.add(send.token.clone());
                } else {
                    tracing::warn!(
                        target: "trade",
                        id = %set.id,
                        tx_hash = %ptx.tx_hash,
                        sender = %send.sender,
                        receiver = %send.receiver,
                        token = %send.token,
                        "Unrecognized transfer in trade tx"
                    );
                }
            }

            for swap in &submitted.swaps {
                if swap.is_arbitrage && swap.is_hot_wallet {
                    let gained = &swap.token_out.amount - &swap.token_in.amount;
                    if gained > BigInt::zero() {
                        set.total_arbitrage_revenue
                            .add(Coin::new(swap.token_in.denom.clone(), gained));
                    } else if gained < BigInt::zero() {
                        // The break-even floor makes this impossible on chain.
                        tracing::warn!(
                            target: "trade",
                            id = %set.id,
                            tx_hash = %ptx.tx_hash,
                            "Arbitrage swap lost principal"
                        );
                    }
                }
            }
        }

        set.trade_txs.push(submitted);
    }
}

/// One transfer per profitable denom, flooring the user's cut. A share that
/// would equal or exceed the whole profit is a misconfiguration and skipped.
fn profit_share_messages(
    profit: &Coins,
    fraction: f64,
    hot_wallet_address: &str,
    user_address: &str,
) -> (Vec<ChainMsg>, Coins) {
    let clamped = fraction.min(MAX_USER_PROFIT_SHARE);
    let scaled = BigInt::from((clamped.max(0.0) * FRACTION_SCALE as f64).round() as i64);

    let mut msgs = Vec::new();
    let mut pending = Coins::new();
    for coin in profit.iter() {
        if coin.is_negative() || coin.is_zero() {
            continue;
        }
        let share = (&coin.amount * &scaled) / FRACTION_SCALE;
        if share >= coin.amount {
            tracing::warn!(
                target: "trade",
                denom = %coin.denom,
                "User share cannot be greater than total arbitrage revenue"
            );
            continue;
        }
        if share <= BigInt::zero() {
            continue;
        }
        let user_share = Coin::new(coin.denom.clone(), share);
        tracing::info!(
            target: "trade",
            total = %coin,
            share = %user_share,
            user = %user_address,
            "Creating user profit share transfer"
        );
        pending.add(user_share.clone());
        msgs.push(ChainMsg::Send(MsgSend {
            from_address: hot_wallet_address.to_string(),
            to_address: user_address.to_string(),
            amount: vec![user_share],
        }));
    }

    (msgs, pending)
}
