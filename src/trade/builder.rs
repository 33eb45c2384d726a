// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2026 ® John Hauger Mitander <john@oxidity.com>

use crate::auction::Payment;
use crate::chain::{ChainMsg, DecodedTx, MsgExec, MsgSend, MsgSwapExactAmountIn};
use crate::domain::coin::Coin;
use crate::domain::error::AppError;
use crate::domain::swap::{Simulation, SwapPlan};
use num_bigint::BigInt;
use num_traits::{Signed, ToPrimitive, Zero};

/// Per-message input is capped by the hot wallet's balance, so a large
/// arbitrage splits into sub-swaps. The chain caps how many fit in one tx.
pub const MAX_ARB_MESSAGES: usize = 25;

/// Gas units charged per route per message.
pub const GAS_UNITS_PER_ROUTE: u64 = 200_000;

/// Dividing gas units by this yields the fee in native base units at the
/// fixed gas price of 0.005.
pub const GAS_PRICE_DIVISOR: u64 = 200;

/// Fractions from config are carried with six decimal places, the same
/// precision the fee math has always used.
const FRACTION_SCALE: i64 = 1_000_000;

/// Relative drift allowed between a signed user transaction and its
/// simulation: 0.5%, i.e. 1/200.
const DRIFT_DENOMINATOR: u32 = 200;

pub fn build_swap_msg(
    token_in: Coin,
    token_out_min_amount: BigInt,
    plan: &SwapPlan,
    sender: &str,
) -> ChainMsg {
    ChainMsg::SwapExactAmountIn(MsgSwapExactAmountIn {
        sender: sender.to_string(),
        routes: plan.routes.clone(),
        token_in,
        token_out_min_amount,
    })
}

/// How many sub-swaps a simulated input of `amount` needs when each message
/// can consume at most `balance`. Saturates at the per-tx message cap.
pub fn arb_message_count(amount: &BigInt, balance: &BigInt) -> usize {
    if amount.is_zero() || balance.is_zero() || balance.is_negative() {
        return 0;
    }
    let count = (amount + balance - BigInt::from(1)) / balance;
    count.to_usize().unwrap_or(MAX_ARB_MESSAGES).min(MAX_ARB_MESSAGES)
}

/// Derive the arbitrage sub-swaps for a circular plan. Each sub-swap consumes
/// `min(remaining, balance)` of the input denom and floors its output at its
/// own input — the hot wallet never signs a swap that can lose principal.
pub fn build_arbitrage_swaps(
    plan: &SwapPlan,
    hot_wallet_balance: &BigInt,
    sender: &str,
) -> Result<Vec<ChainMsg>, AppError> {
    if plan.routes.is_empty() {
        return Err(AppError::Ineligible(
            "no arbitrage routes in request".to_string(),
        ));
    }
    if !plan.is_circular() {
        let last = &plan.routes[plan.routes.len() - 1].token_out_denom;
        tracing::error!(
            target: "trade",
            token_in = %plan.token_in,
            last_route_out = %last,
            "Invalid arbitrage trade"
        );
        return Err(AppError::Ineligible(format!(
            "arbitrage trade token in {} does not match denom out {last}",
            plan.token_in
        )));
    }
    if hot_wallet_balance <= &BigInt::zero() {
        return Err(AppError::InsufficientFunds {
            required: plan.token_in.to_string(),
            available: format!("{}{}", hot_wallet_balance, plan.token_in.denom),
        });
    }

    let mut swaps = Vec::new();
    let mut remaining = plan.token_in.amount.clone();
    while remaining > BigInt::zero() && swaps.len() < MAX_ARB_MESSAGES {
        let chunk = remaining.clone().min(hot_wallet_balance.clone());
        remaining -= &chunk;

        let token_in = Coin::new(plan.token_in.denom.clone(), chunk.clone());
        swaps.push(build_swap_msg(token_in, chunk, plan, sender));
    }

    Ok(swaps)
}

/// Gas units for the arbitrage leg. Zero routes out of range is a hard
/// refusal: the chain would reject the swap anyway.
pub fn estimate_arb_gas(plan: &SwapPlan, hot_wallet_balance: &BigInt) -> Result<u64, AppError> {
    let routes = plan.routes.len();
    if !(2..=5).contains(&routes) {
        return Err(AppError::Ineligible(
            "arbitrage swap must have 2 to 5 routes".to_string(),
        ));
    }
    let messages = arb_message_count(&plan.token_in.amount, hot_wallet_balance);
    if messages == 0 {
        return Err(AppError::InsufficientFunds {
            required: plan.token_in.to_string(),
            available: format!("{}{}", hot_wallet_balance, plan.token_in.denom),
        });
    }
    Ok(routes as u64 * messages as u64 * GAS_UNITS_PER_ROUTE)
}

/// Message list for a delegated-execution trade: the user's swap wrapped for
/// the hot wallet to execute on their behalf, then the arbitrage sub-swaps.
/// Returns the messages and the gas limit to sign with.
pub fn build_authz_messages(
    sim: &Simulation,
    hot_wallet_address: &str,
    hot_wallet_balance: &BigInt,
) -> Result<(Vec<ChainMsg>, u64), AppError> {
    let user_swap = build_swap_msg(
        sim.user_swap.token_in.clone(),
        sim.user_swap.token_out_min_amount.clone(),
        &sim.user_swap,
        &sim.user_address,
    );
    tracing::info!(
        target: "trade",
        token_in = %sim.user_swap.token_in,
        token_out_min = %sim.user_swap.token_out_min_amount,
        "Delegated trade requested with user swap"
    );

    let mut msgs = vec![ChainMsg::Exec(MsgExec {
        grantee: hot_wallet_address.to_string(),
        msgs: vec![user_swap],
    })];
    let mut gas = sim.user_swap.routes.len() as u64 * GAS_UNITS_PER_ROUTE;

    // A delegated trade without arbitrage is pointless but allowed.
    if let Some(arb) = sim.arbitrage() {
        gas += estimate_arb_gas(arb, hot_wallet_balance)?;
        msgs.extend(build_arbitrage_swaps(arb, hot_wallet_balance, hot_wallet_address)?);
    }

    Ok((msgs, gas))
}

#[derive(Debug, Clone)]
pub struct BidConfig {
    pub max_bid: Coin,
    pub bid_fraction: f64,
}

/// What an eligible bid will cost and carry.
#[derive(Debug)]
pub struct BidEconomics {
    pub arb_msgs: Vec<ChainMsg>,
    pub gas_units: u64,
    /// Gas fee in native base units.
    pub gas_fee: BigInt,
    /// The amount offered to the auction, split across its payees.
    pub bid_amount: BigInt,
}

fn scaled_fraction(fraction: f64) -> Option<BigInt> {
    if !fraction.is_finite() || !(0.0..=1.0).contains(&fraction) {
        return None;
    }
    Some(BigInt::from((fraction * FRACTION_SCALE as f64).round() as i64))
}

/// Decide whether a simulation may be bid into an auction, and at what price.
/// The hot wallet only ever bids when the simulated revenue covers both the
/// gas and the bid itself.
pub fn check_bid_eligibility(
    sim: &Simulation,
    cfg: &BidConfig,
    hot_wallet_address: &str,
    hot_wallet_balance: &BigInt,
) -> Result<BidEconomics, AppError> {
    let arb = match sim.arbitrage() {
        Some(arb) if arb.is_circular() => arb,
        _ => {
            return Err(AppError::Ineligible(
                "arbitrage params invalid, will not bid".to_string(),
            ));
        }
    };

    if arb.token_in.denom != cfg.max_bid.denom {
        return Err(AppError::Ineligible(format!(
            "request arb denom is {}, but max bid denom configured as {}",
            arb.token_in.denom, cfg.max_bid.denom
        )));
    }

    let revenue = arb.estimated_revenue();
    if revenue <= BigInt::zero() {
        return Err(AppError::Ineligible("arbitrage not profitable".to_string()));
    }

    let fraction = scaled_fraction(cfg.bid_fraction).ok_or_else(|| {
        AppError::Config(format!(
            "bid_fraction {} is not a valid fraction",
            cfg.bid_fraction
        ))
    })?;

    let mut bid_amount = (&revenue * fraction) / FRACTION_SCALE;
    if bid_amount > cfg.max_bid.amount {
        bid_amount = cfg.max_bid.amount.clone();
    }
    if bid_amount <= BigInt::zero() {
        return Err(AppError::Ineligible("bid amount rounds to zero".to_string()));
    }

    let gas_units = estimate_arb_gas(arb, hot_wallet_balance)?;
    let gas_fee = BigInt::from(gas_units / GAS_PRICE_DIVISOR);

    let arb_msgs = build_arbitrage_swaps(arb, hot_wallet_balance, hot_wallet_address)?;

    // Strictly greater: break-even trades are not worth the inclusion risk.
    if revenue <= &gas_fee + &bid_amount {
        return Err(AppError::Ineligible(format!(
            "not profitable after fees: revenue {revenue}, gas {gas_fee}, bid {bid_amount}"
        )));
    }

    Ok(BidEconomics {
        arb_msgs,
        gas_units,
        gas_fee,
        bid_amount,
    })
}

/// Sanity check that a signed user transaction is the one the simulator
/// priced: the inner swap's input may drift from the simulation by at most
/// 0.5%. This guards against client/simulator skew, not against malice.
pub fn verify_user_tx_matches(decoded: &DecodedTx, sim: &Simulation) -> bool {
    let sim_in = &sim.user_swap.token_in;
    for msg in &decoded.msgs {
        let ChainMsg::SwapExactAmountIn(swap) = msg else {
            continue;
        };
        if swap.token_in.denom != sim_in.denom {
            continue;
        }
        let diff = (&swap.token_in.amount - &sim_in.amount).abs();
        if diff * DRIFT_DENOMINATOR <= sim_in.amount {
            return true;
        }
    }
    false
}

/// One transfer per auction payee, allocating the bid by each payee's share,
/// floored to whole base units.
pub fn build_auction_payments(
    bid_amount: &BigInt,
    payments: &[Payment],
    native_denom: &str,
    hot_wallet_address: &str,
) -> Result<Vec<ChainMsg>, AppError> {
    let bid = bid_amount.to_f64().ok_or_else(|| {
        AppError::Ineligible(format!("bid amount {bid_amount} is not representable"))
    })?;

    let mut msgs = Vec::with_capacity(payments.len());
    let mut total = 0.0;
    for payment in payments {
        if payment.denom != native_denom {
            return Err(AppError::Ineligible(format!(
                "only {native_denom} payments are supported, auction requires {}",
                payment.denom
            )));
        }
        total += payment.allocation;

        let share = (bid * payment.allocation).trunc() as i128;
        msgs.push(ChainMsg::Send(MsgSend {
            from_address: hot_wallet_address.to_string(),
            to_address: payment.address.clone(),
            amount: vec![Coin::new(native_denom, share)],
        }));
    }

    if total != 1.0 {
        return Err(AppError::Ineligible(
            "auction payments don't allocate the whole bid".to_string(),
        ));
    }

    Ok(msgs)
}
