// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2026 ® John Hauger Mitander <john@oxidity.com>

use crate::api::types::{
    AuthzTradeResponse, GranteeResponse, TokenRequest, TokenResponse, TradeStatus,
    ZenithTradeRequest, ZenithTradeResponse,
};
use crate::auction::FutureBlock;
use crate::auction::tracker::AuctionTracker;
use crate::auth::grant::GrantVerifier;
use crate::auth::token::{Claims, TokenSigner};
use crate::chain::{ChainClient, Keyring};
use crate::common::backoff::Backoff;
use crate::common::ids::tx_hash;
use crate::domain::coin::{Coin, Coins};
use crate::domain::error::{ApiError, AppError};
use crate::domain::swap::Simulation;
use crate::trade::builder::{
    BidConfig, GAS_PRICE_DIVISOR, GAS_UNITS_PER_ROUTE, build_authz_messages,
    check_bid_eligibility, verify_user_tx_matches,
};
use crate::trade::registry::TradeRegistry;
use crate::trade::set::{SubmittedTx, TradePhase, TradeSet};
use base64::Engine;
use base64::prelude::BASE64_STANDARD;
use chrono::{DateTime, Utc};
use num_bigint::BigInt;
use num_traits::Zero;
use std::sync::Arc;
use tokio::time::Duration;

/// Everything the request boundary needs, injected once at startup. The HTTP
/// surface itself (routing, CORS, rate limiting, auth middleware) lives
/// outside this crate and calls these handlers with parsed payloads.
pub struct ApiContext {
    pub registry: Arc<TradeRegistry>,
    pub chain: Arc<dyn ChainClient>,
    pub keyring: Arc<dyn Keyring>,
    pub auctions: Arc<AuctionTracker>,
    pub token_signer: Arc<TokenSigner>,
    pub grant_verifier: Arc<GrantVerifier>,
    pub chain_id: String,
    pub address_prefix: String,
    pub native_denom: String,
    pub bid: BidConfig,
    pub user_profit_share: f64,
}

const MAX_USER_PROFIT_SHARE: f64 = 0.85;
const SIGN_BACKOFF: Backoff = Backoff::new(5, Duration::from_millis(400));

/// `POST /token`: verify the caller's on-chain grant and issue a bearer token
/// whose subject is the granter and whose lifetime matches the grant's.
pub async fn generate_token(ctx: &ApiContext, req: TokenRequest) -> Result<TokenResponse, ApiError> {
    let (granter, expiration) = ctx.grant_verifier.verify(&req.base64_grant_tx).await?;
    if !req.address.is_empty() && req.address != granter {
        tracing::warn!(
            target: "api",
            requested = %req.address,
            %granter,
            "Token requested for an address other than the granter"
        );
    }
    let token = ctx.token_signer.issue(&granter, expiration)?;
    Ok(TokenResponse { token })
}

/// `GET /grantee`: the hot wallet address users must grant execution to.
pub fn grantee_info(ctx: &ApiContext) -> GranteeResponse {
    GranteeResponse {
        grantee_address: ctx.keyring.address().to_string(),
    }
}

/// `POST /authz`: execute the user's simulated swap on their behalf, bundled
/// with the arbitrage it opens. Requires a bearer token bound to the user.
pub async fn authz_trade(
    ctx: &ApiContext,
    claims: &Claims,
    simulation: Simulation,
) -> Result<AuthzTradeResponse, ApiError> {
    if simulation.user_address != claims.sub {
        return Err(ApiError::Unauthorized(
            "token subject does not match the user address".to_string(),
        ));
    }
    if !simulation.user_address.starts_with(&ctx.address_prefix) {
        return Err(ApiError::BadInput("invalid simulation provided".to_string()));
    }

    // The user must be able to fund their own swap.
    let user_balances = ctx.chain.all_balances(&simulation.user_address).await.map_err(ApiError::from)?;
    if !user_balances.covers(&simulation.user_swap.token_in) {
        tracing::info!(
            target: "api",
            user = %simulation.user_address,
            token_in = %simulation.user_swap.token_in,
            "Insufficient balance for delegated trade"
        );
        return Err(ApiError::InsufficientFunds);
    }

    let hot_address = ctx.keyring.address().to_string();
    let arb_balance = match simulation.arbitrage() {
        Some(arb) => {
            let balances = ctx.chain.all_balances(&hot_address).await.map_err(ApiError::from)?;
            balances.amount_of(&arb.token_in.denom)
        }
        None => BigInt::zero(),
    };

    let (msgs, gas) = build_authz_messages(&simulation, &hot_address, &arb_balance)
        .map_err(ApiError::from)?;

    let tx_bytes = SIGN_BACKOFF
        .run(|| ctx.keyring.sign_tx(&msgs, gas))
        .await
        .map_err(|e| {
            tracing::error!(target: "api", error = %e, "Delegated trade signing failed");
            ApiError::Signing
        })?;

    let broadcast = ctx.chain.broadcast_tx_sync(&tx_bytes).await.map_err(ApiError::from)?;
    if broadcast.code != 0 {
        return Err(ApiError::BadInput(format!(
            "trade with hash {} submitted to node, but failed",
            broadcast.tx_hash
        )));
    }

    let hash = tx_hash(&tx_bytes);
    let id = ctx.registry.insert_with(|id| {
        let mut set = TradeSet::new_authz(
            id,
            simulation.clone(),
            hot_address.clone(),
            vec![SubmittedTx::pending(hash.clone())],
        );
        set.advance(TradePhase::OnChainPending);
        set
    });
    tracing::info!(target: "api", %id, tx_hash = %hash, "Delegated trade submitted");
    Ok(AuthzTradeResponse { id })
}

/// `POST /zenith`: queue a signed user trade for the next auctioned block.
/// The set only graduates to a bid when an auction it can win comes up.
pub async fn zenith_trade(
    ctx: &ApiContext,
    req: ZenithTradeRequest,
) -> Result<ZenithTradeResponse, ApiError> {
    let expiration = DateTime::parse_from_rfc3339(&req.expiration)
        .map_err(|_| {
            ApiError::BadInput("expiration is unrecognized format, expected RFC3339".to_string())
        })?
        .with_timezone(&Utc);
    if expiration <= Utc::now() {
        return Err(ApiError::BadInput("expiration must be in the future".to_string()));
    }

    let simulation = req.simulation;
    if !simulation.user_address.starts_with(&ctx.address_prefix) {
        return Err(ApiError::BadInput("invalid simulation provided".to_string()));
    }

    let user_balances = ctx.chain.all_balances(&simulation.user_address).await.map_err(ApiError::from)?;
    if !user_balances.covers(&simulation.user_swap.token_in) {
        tracing::info!(
            target: "api",
            user = %simulation.user_address,
            token_in = %simulation.user_swap.token_in,
            "Insufficient balance for auction trade"
        );
        return Err(ApiError::InsufficientFunds);
    }

    // Refuse sets that could never be bid: no tracking a request whose first
    // eligibility check is already known to fail.
    let hot_address = ctx.keyring.address().to_string();
    let hot_balances = ctx.chain.all_balances(&hot_address).await.map_err(ApiError::from)?;
    let arb_balance = hot_balances.amount_of(&ctx.bid.max_bid.denom);
    check_bid_eligibility(&simulation, &ctx.bid, &hot_address, &arb_balance)
        .map_err(ApiError::from)?;

    let user_tx_bytes = BASE64_STANDARD
        .decode(&req.swap_tx)
        .map_err(|_| ApiError::from(AppError::Ineligible("user tx must be base64 encoded".to_string())))?;
    let decoded = ctx
        .chain
        .decode_tx(&user_tx_bytes)
        .map_err(|_| ApiError::from(AppError::Ineligible("user tx must be a valid chain tx".to_string())))?;
    if !verify_user_tx_matches(&decoded, &simulation) {
        return Err(ApiError::from(AppError::Ineligible(
            "signed user tx does not match the simulation".to_string(),
        )));
    }

    let user_tx_hash = tx_hash(&user_tx_bytes);
    let id = ctx.registry.insert_with(|id| {
        let mut set = TradeSet::new_zenith(
            id,
            simulation.clone(),
            hot_address.clone(),
            req.swap_tx.clone(),
            expiration,
        );
        set.advance(TradePhase::AwaitingAuction);
        set
    });
    tracing::info!(target: "api", %id, user_tx_hash = %user_tx_hash, "Auction trade queued");
    Ok(ZenithTradeResponse {
        id,
        tx_hashes: vec![user_tx_hash],
    })
}

/// `GET /status?id=`: snapshot of one trade set.
pub fn trade_status(ctx: &ApiContext, id: &str) -> Result<TradeStatus, ApiError> {
    if id.is_empty() {
        return Err(ApiError::BadInput("empty id provided".to_string()));
    }
    let set = ctx
        .registry
        .snapshot(id)
        .ok_or_else(|| ApiError::BadInput("invalid ID (not found)".to_string()))?;
    let estimated = estimate_user_earnings(ctx, &set);
    Ok(TradeStatus::from_set(&set, estimated))
}

/// `GET /zenithavailable[?after=RFC3339]`: upcoming auctioned blocks.
pub fn available_auctions(ctx: &ApiContext, after: Option<DateTime<Utc>>) -> Vec<FutureBlock> {
    match after {
        Some(cutoff) => ctx.auctions.auction_blocks_after(cutoff),
        None => ctx.auctions.auction_blocks(),
    }
}

/// Rough projection of the user's share if everything lands as simulated:
/// estimated revenue, minus single-message gas and (for auction trades) the
/// bid, times the profit-share fraction.
fn estimate_user_earnings(ctx: &ApiContext, set: &TradeSet) -> Coins {
    let Some(arb) = set.simulation.arbitrage() else {
        return Coins::new();
    };
    let revenue = arb.estimated_revenue();
    if revenue <= BigInt::zero() {
        return Coins::new();
    }

    let gas_fee = BigInt::from(arb.routes.len() as u64 * GAS_UNITS_PER_ROUTE / GAS_PRICE_DIVISOR);
    let mut fees = gas_fee;
    if set.zenith().is_some() {
        let fraction = BigInt::from((ctx.bid.bid_fraction * 1e6) as i64);
        let mut bid = (&revenue * fraction) / 1_000_000;
        if bid > ctx.bid.max_bid.amount {
            bid = ctx.bid.max_bid.amount.clone();
        }
        fees += bid;
    }

    let profit = &revenue - &fees;
    if profit <= BigInt::zero() {
        return Coins::new();
    }

    let share_fraction = ctx.user_profit_share.min(MAX_USER_PROFIT_SHARE).max(0.0);
    let scaled = BigInt::from((share_fraction * 1e6).round() as i64);
    let user_share = (&profit * scaled) / 1_000_000;
    if user_share <= BigInt::zero() {
        return Coins::new();
    }
    vec![Coin::new(ctx.native_denom.clone(), user_share)].into()
}
