// SPDX-License-Identifier: MIT
// Shared mock collaborators: a scriptable chain, keyring, and auction service
// that let the trackers run full lifecycles without a node.

#![allow(dead_code)]

use async_trait::async_trait;
use num_bigint::BigInt;
use oxidity_arbiter::auction::client::AuctionApi;
use oxidity_arbiter::auction::tracker::AuctionTracker;
use oxidity_arbiter::auction::{AuctionInfo, AuctionStatus, BidRequest, BidResponse, Payment};
use oxidity_arbiter::auth::grant::GrantVerifier;
use oxidity_arbiter::auth::token::TokenSigner;
use oxidity_arbiter::api::handlers::ApiContext;
use oxidity_arbiter::chain::events::{Attribute, GammEventParser, LogEvent, MsgLog};
use oxidity_arbiter::chain::follower::BlockHandler;
use oxidity_arbiter::chain::{
    BroadcastResponse, ChainClient, ChainMsg, DecodedTx, Keyring, MsgSwapExactAmountIn,
    SWAP_MSG_TYPE_URL, TxLookup,
};
use oxidity_arbiter::common::ids::tx_hash;
use oxidity_arbiter::domain::coin::{Coin, Coins};
use oxidity_arbiter::domain::error::AppError;
use oxidity_arbiter::domain::swap::{ArbitrageSwap, Route, Simulation, SwapPlan};
use oxidity_arbiter::trade::builder::BidConfig;
use oxidity_arbiter::trade::registry::TradeRegistry;
use oxidity_arbiter::trade::tracker::{TradeTracker, TrackerConfig};
use std::collections::HashMap;
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, AtomicU32, AtomicU64, Ordering};
use std::sync::Arc;
use tokio::time::Duration;

pub const USER: &str = "osmo1userxyz";
pub const HOT_WALLET: &str = "osmo1hotwallet";
pub const PAYEE: &str = "osmo1auctionpayee";

#[derive(Default)]
pub struct MockChain {
    pub balances: Mutex<HashMap<String, Coins>>,
    pub lookups: Mutex<HashMap<String, TxLookup>>,
    pub decoded: Mutex<HashMap<Vec<u8>, DecodedTx>>,
    pub broadcasts: Mutex<Vec<Vec<u8>>>,
    pub broadcast_code: AtomicU32,
}

impl MockChain {
    pub fn set_balance(&self, address: &str, coins: Vec<Coin>) {
        self.balances
            .lock()
            .unwrap()
            .insert(address.to_string(), coins.into());
    }

    pub fn install_lookup(&self, lookup: TxLookup) {
        self.lookups
            .lock()
            .unwrap()
            .insert(lookup.tx_hash.clone(), lookup);
    }

    pub fn install_decoded(&self, tx_bytes: &[u8], decoded: DecodedTx) {
        self.decoded
            .lock()
            .unwrap()
            .insert(tx_bytes.to_vec(), decoded);
    }

    pub fn broadcast_count(&self) -> usize {
        self.broadcasts.lock().unwrap().len()
    }

    pub fn last_broadcast_hash(&self) -> Option<String> {
        self.broadcasts.lock().unwrap().last().map(|b| tx_hash(b))
    }
}

#[async_trait]
impl ChainClient for MockChain {
    async fn broadcast_tx_sync(&self, tx_bytes: &[u8]) -> Result<BroadcastResponse, AppError> {
        self.broadcasts.lock().unwrap().push(tx_bytes.to_vec());
        Ok(BroadcastResponse {
            tx_hash: tx_hash(tx_bytes),
            code: self.broadcast_code.load(Ordering::Relaxed),
            raw_log: String::new(),
        })
    }

    async fn get_tx(&self, tx_hash: &str) -> Result<Option<TxLookup>, AppError> {
        Ok(self.lookups.lock().unwrap().get(tx_hash).cloned())
    }

    async fn all_balances(&self, address: &str) -> Result<Coins, AppError> {
        Ok(self
            .balances
            .lock()
            .unwrap()
            .get(address)
            .cloned()
            .unwrap_or_default())
    }

    fn decode_tx(&self, tx_bytes: &[u8]) -> Result<DecodedTx, AppError> {
        self.decoded
            .lock()
            .unwrap()
            .get(tx_bytes)
            .cloned()
            .ok_or_else(|| AppError::Chain("undecodable tx bytes".to_string()))
    }
}

pub struct MockKeyring {
    address: String,
    pub signed: Mutex<Vec<(Vec<ChainMsg>, u64)>>,
    counter: AtomicU64,
}

impl Default for MockKeyring {
    fn default() -> Self {
        Self {
            address: HOT_WALLET.to_string(),
            signed: Mutex::new(Vec::new()),
            counter: AtomicU64::new(0),
        }
    }
}

impl MockKeyring {
    pub fn last_signed_msgs(&self) -> Vec<ChainMsg> {
        self.signed
            .lock()
            .unwrap()
            .last()
            .map(|(msgs, _)| msgs.clone())
            .unwrap_or_default()
    }
}

#[async_trait]
impl Keyring for MockKeyring {
    fn address(&self) -> &str {
        &self.address
    }

    async fn sign_tx(&self, msgs: &[ChainMsg], gas: u64) -> Result<Vec<u8>, AppError> {
        let n = self.counter.fetch_add(1, Ordering::Relaxed);
        self.signed.lock().unwrap().push((msgs.to_vec(), gas));
        Ok(format!("signed-tx-{n}").into_bytes())
    }
}

#[derive(Default)]
pub struct MockAuction {
    pub statuses: Mutex<HashMap<i64, AuctionStatus>>,
    pub bids: Mutex<Vec<BidRequest>>,
    pub fail_bids: AtomicBool,
}

impl MockAuction {
    pub fn set_auction(&self, height: i64, payments: Vec<Payment>) {
        self.statuses.lock().unwrap().insert(
            height,
            AuctionStatus::Auction(AuctionInfo {
                chain_id: "osmosis-1".to_string(),
                height,
                payments,
            }),
        );
    }

    pub fn bid_count(&self) -> usize {
        self.bids.lock().unwrap().len()
    }

    pub fn last_bid(&self) -> Option<BidRequest> {
        self.bids.lock().unwrap().last().cloned()
    }
}

#[async_trait]
impl AuctionApi for MockAuction {
    async fn query_auction(&self, _chain_id: &str, height: i64) -> Result<AuctionStatus, AppError> {
        Ok(self
            .statuses
            .lock()
            .unwrap()
            .get(&height)
            .cloned()
            .unwrap_or(AuctionStatus::NotAuction))
    }

    async fn place_bid(&self, bid: &BidRequest) -> Result<BidResponse, AppError> {
        if self.fail_bids.load(Ordering::Relaxed) {
            return Err(AppError::Auction("scripted bid failure".to_string()));
        }
        self.bids.lock().unwrap().push(bid.clone());
        Ok(BidResponse {
            chain_id: bid.chain_id.clone(),
            height: bid.height,
            kind: bid.kind.clone(),
            tx_hashes: bid.txs.iter().map(|_| "ACCEPTED".to_string()).collect(),
        })
    }
}

pub struct World {
    pub chain: Arc<MockChain>,
    pub keyring: Arc<MockKeyring>,
    pub auction: Arc<MockAuction>,
    pub auctions: Arc<AuctionTracker>,
    pub registry: Arc<TradeRegistry>,
    pub tracker: Arc<TradeTracker>,
    pub ctx: ApiContext,
}

pub fn world() -> World {
    let chain = Arc::new(MockChain::default());
    let keyring = Arc::new(MockKeyring::default());
    let auction = Arc::new(MockAuction::default());
    let registry = Arc::new(TradeRegistry::new());
    let auctions = Arc::new(AuctionTracker::new(
        "osmosis-1".to_string(),
        auction.clone(),
    ));

    let bid = BidConfig {
        max_bid: Coin::new("uosmo", 5_000_000),
        bid_fraction: 0.2,
    };
    let tracker = Arc::new(TradeTracker::new(
        registry.clone(),
        chain.clone(),
        keyring.clone(),
        auction.clone(),
        auctions.clone(),
        Arc::new(GammEventParser),
        TrackerConfig {
            chain_id: "osmosis-1".to_string(),
            native_denom: "uosmo".to_string(),
            bid: bid.clone(),
            user_profit_share: 0.85,
            tick_lookup_timeout: Duration::from_millis(50),
        },
    ));

    let token_signer = Arc::new(
        TokenSigner::new(
            "integration-test-signing-key-0123456789",
            "oxidity-arbiter".to_string(),
        )
        .expect("signer"),
    );
    let grant_verifier = Arc::new(GrantVerifier::new(
        chain.clone(),
        HOT_WALLET.to_string(),
        "osmo".to_string(),
        86_400,
    ));

    let ctx = ApiContext {
        registry: registry.clone(),
        chain: chain.clone(),
        keyring: keyring.clone(),
        auctions: auctions.clone(),
        token_signer,
        grant_verifier,
        chain_id: "osmosis-1".to_string(),
        address_prefix: "osmo".to_string(),
        native_denom: "uosmo".to_string(),
        bid,
        user_profit_share: 0.85,
    };

    World {
        chain,
        keyring,
        auction,
        auctions,
        registry,
        tracker,
        ctx,
    }
}

/// One full tick as the dispatcher would run it: auction discovery first,
/// then the trade tracker.
pub async fn tick(world: &World, height: i64) {
    world.auctions.on_block(height, 6_000).await;
    world.tracker.on_block(height, 6_000).await;
}

pub fn route(pool_id: u64, out: &str) -> Route {
    Route {
        pool_id,
        token_out_denom: out.to_string(),
    }
}

pub fn user_swap_plan() -> SwapPlan {
    SwapPlan {
        token_in: Coin::new("uosmo", 1_000_000),
        token_out_min_amount: BigInt::from(240),
        token_out_amount: BigInt::from(250),
        token_out_denom: "uatom".to_string(),
        routes: vec![route(1, "uatom")],
    }
}

pub fn arb_swap_plan(estimated_out: i64) -> SwapPlan {
    SwapPlan {
        token_in: Coin::new("uosmo", 500_000),
        token_out_min_amount: BigInt::from(500_000),
        token_out_amount: BigInt::from(estimated_out),
        token_out_denom: "uosmo".to_string(),
        routes: vec![route(1, "uatom"), route(2, "uosmo")],
    }
}

pub fn simulation_with_arb(estimated_out: i64) -> Simulation {
    Simulation {
        user_swap: user_swap_plan(),
        arbitrage_swap: Some(ArbitrageSwap {
            swap: arb_swap_plan(estimated_out),
            estimated_profit: "0.1 OSMO".to_string(),
        }),
        has_arbitrage: true,
        user_address: USER.to_string(),
    }
}

/// Build a tx-search result whose event logs the parser will accept: one
/// message + token_swapped log per swap, then one message per transfer.
pub fn lookup(
    tx_hash: &str,
    fee_payer: &str,
    fees: Vec<Coin>,
    swaps: Vec<(&str, Coin, Coin)>,
    sends: Vec<(&str, &str, Coin)>,
) -> TxLookup {
    let mut msgs = Vec::new();
    let mut logs = Vec::new();

    for (idx, (address, token_in, token_out)) in swaps.into_iter().enumerate() {
        logs.push(MsgLog {
            msg_index: idx,
            events: vec![
                LogEvent {
                    kind: "message".to_string(),
                    attributes: vec![Attribute {
                        key: "action".to_string(),
                        value: SWAP_MSG_TYPE_URL.to_string(),
                    }],
                },
                LogEvent {
                    kind: "token_swapped".to_string(),
                    attributes: vec![
                        Attribute {
                            key: "sender".to_string(),
                            value: address.to_string(),
                        },
                        Attribute {
                            key: "tokens_in".to_string(),
                            value: token_in.to_string(),
                        },
                        Attribute {
                            key: "tokens_out".to_string(),
                            value: token_out.to_string(),
                        },
                    ],
                },
            ],
        });
        msgs.push(ChainMsg::SwapExactAmountIn(MsgSwapExactAmountIn {
            sender: address.to_string(),
            routes: vec![route(1, &token_out.denom)],
            token_out_min_amount: token_in.amount.clone(),
            token_in,
        }));
    }

    for (sender, receiver, token) in sends {
        msgs.push(ChainMsg::Send(oxidity_arbiter::chain::MsgSend {
            from_address: sender.to_string(),
            to_address: receiver.to_string(),
            amount: vec![token],
        }));
    }

    TxLookup {
        tx_hash: tx_hash.to_string(),
        height: 0,
        code: 0,
        fee_payer: fee_payer.to_string(),
        fees: fees.into(),
        msgs,
        logs,
    }
}

pub fn full_payment() -> Vec<Payment> {
    vec![Payment {
        address: PAYEE.to_string(),
        allocation: 1.0,
        denom: "uosmo".to_string(),
    }]
}
