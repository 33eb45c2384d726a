// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2026 ® John Hauger Mitander <john@on1.no>

pub mod events;
pub mod follower;

use crate::domain::coin::{Coin, Coins};
use crate::domain::error::AppError;
use crate::domain::swap::Route;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use num_bigint::BigInt;
use tokio::time::{Duration, Instant, sleep};

/// Message type URL of the swap primitive this backend trades with. Grants
/// must target exactly this type.
pub const SWAP_MSG_TYPE_URL: &str = "/osmosis.gamm.v1beta1.MsgSwapExactAmountIn";

/// Poll interval while waiting for a transaction to land in a block.
const TX_POLL_INTERVAL: Duration = Duration::from_millis(100);

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MsgSwapExactAmountIn {
    pub sender: String,
    pub routes: Vec<Route>,
    pub token_in: Coin,
    pub token_out_min_amount: BigInt,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MsgSend {
    pub from_address: String,
    pub to_address: String,
    pub amount: Vec<Coin>,
}

/// Delegated execution: the grantee submits `msgs` on the granter's behalf.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MsgExec {
    pub grantee: String,
    pub msgs: Vec<ChainMsg>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MsgGrant {
    pub granter: String,
    pub grantee: String,
    /// Message type URL the grant authorizes, None if the authorization is
    /// missing or malformed.
    pub msg_type_url: Option<String>,
    pub expiration: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChainMsg {
    SwapExactAmountIn(MsgSwapExactAmountIn),
    Send(MsgSend),
    Exec(MsgExec),
    Grant(MsgGrant),
    Other { type_url: String },
}

impl ChainMsg {
    pub fn type_url(&self) -> &str {
        match self {
            ChainMsg::SwapExactAmountIn(_) => SWAP_MSG_TYPE_URL,
            ChainMsg::Send(_) => "/cosmos.bank.v1beta1.MsgSend",
            ChainMsg::Exec(_) => "/cosmos.authz.v1beta1.MsgExec",
            ChainMsg::Grant(_) => "/cosmos.authz.v1beta1.MsgGrant",
            ChainMsg::Other { type_url } => type_url,
        }
    }
}

/// A transaction decoded from raw bytes, before it has been observed on chain.
#[derive(Debug, Clone, Default)]
pub struct DecodedTx {
    pub msgs: Vec<ChainMsg>,
}

#[derive(Debug, Clone)]
pub struct BroadcastResponse {
    pub tx_hash: String,
    pub code: u32,
    pub raw_log: String,
}

/// A transaction found on chain via tx-search, with everything the trackers
/// need: result code, fee accounting, messages, and per-message event logs.
#[derive(Debug, Clone)]
pub struct TxLookup {
    pub tx_hash: String,
    pub height: i64,
    pub code: u32,
    pub fee_payer: String,
    pub fees: Coins,
    pub msgs: Vec<ChainMsg>,
    pub logs: Vec<events::MsgLog>,
}

/// The node RPC operations this crate consumes. The concrete client (round
/// robin endpoints, protobuf codecs, retries at the wire level) lives outside
/// the core; tests substitute their own implementation.
#[async_trait]
pub trait ChainClient: Send + Sync {
    /// Post raw transaction bytes to the mempool. Validates the signature on
    /// the node side.
    async fn broadcast_tx_sync(&self, tx_bytes: &[u8]) -> Result<BroadcastResponse, AppError>;

    /// Single-shot tx-search by hash. `Ok(None)` means the transaction is not
    /// (yet) in a block.
    async fn get_tx(&self, tx_hash: &str) -> Result<Option<TxLookup>, AppError>;

    /// Same lookup against an alternate search endpoint, for callers that
    /// retry elsewhere after the primary times out.
    async fn get_tx_fallback(&self, tx_hash: &str) -> Result<Option<TxLookup>, AppError> {
        self.get_tx(tx_hash).await
    }

    async fn all_balances(&self, address: &str) -> Result<Coins, AppError>;

    fn decode_tx(&self, tx_bytes: &[u8]) -> Result<DecodedTx, AppError>;
}

/// The signing operations this crate consumes from the external keyring.
#[async_trait]
pub trait Keyring: Send + Sync {
    /// Public bech32 address of the hot wallet key.
    fn address(&self) -> &str;

    /// Build, sign, and encode a transaction carrying `msgs` with the given
    /// gas limit, paying fees at the chain's fixed gas price.
    async fn sign_tx(&self, msgs: &[ChainMsg], gas: u64) -> Result<Vec<u8>, AppError>;
}

/// Poll tx-search by hash until the transaction lands or `timeout` elapses.
pub async fn await_tx(
    client: &dyn ChainClient,
    tx_hash: &str,
    timeout: Duration,
) -> Result<TxLookup, AppError> {
    await_tx_with(|h| client.get_tx(h), tx_hash, timeout).await
}

/// Same wait loop against the client's alternate search endpoint.
pub async fn await_tx_fallback(
    client: &dyn ChainClient,
    tx_hash: &str,
    timeout: Duration,
) -> Result<TxLookup, AppError> {
    await_tx_with(|h| client.get_tx_fallback(h), tx_hash, timeout).await
}

async fn await_tx_with<'a, F, Fut>(
    mut lookup: F,
    tx_hash: &'a str,
    timeout: Duration,
) -> Result<TxLookup, AppError>
where
    F: FnMut(&'a str) -> Fut,
    Fut: Future<Output = Result<Option<TxLookup>, AppError>>,
{
    let deadline = Instant::now() + timeout;
    let mut last_err: Option<AppError> = None;
    loop {
        match lookup(tx_hash).await {
            Ok(Some(found)) => return Ok(found),
            Ok(None) => {}
            Err(e) => last_err = Some(e),
        }
        if Instant::now() >= deadline {
            return Err(last_err.unwrap_or_else(|| {
                AppError::Chain(format!("tx {tx_hash} not found before timeout"))
            }));
        }
        sleep(TX_POLL_INTERVAL).await;
    }
}
