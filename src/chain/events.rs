// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2026 ® John Hauger Mitander <john@mitander.dev>

use crate::chain::{ChainMsg, MsgSwapExactAmountIn, TxLookup};
use crate::domain::coin::{Coin, Coins, parse_coin};
use serde::{Deserialize, Serialize};

// Event schema of the target chain's swap module. Everything specific to that
// schema stays behind `SwapEventParser` so the state machine never sees it.
const EVENT_TOKEN_SWAPPED: &str = "token_swapped";
const EVENT_MESSAGE: &str = "message";
const ATTR_ACTION: &str = "action";
const ATTR_SENDER: &str = "sender";
const ATTR_TOKENS_IN: &str = "tokens_in";
const ATTR_TOKENS_OUT: &str = "tokens_out";

/// Per-message event log as returned by tx-search. The node emits one entry
/// per message, keyed by message index.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MsgLog {
    #[serde(rename = "msg_index", default)]
    pub msg_index: usize,
    #[serde(default)]
    pub events: Vec<LogEvent>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogEvent {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub attributes: Vec<Attribute>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Attribute {
    pub key: String,
    pub value: String,
}

/// A swap reconstructed from on-chain events: first token in, last token out,
/// and the address that traded. Intermediate hops are not interesting.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedSwap {
    pub token_in: Coin,
    pub token_out: Coin,
    pub address: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedSend {
    pub token: Coin,
    pub sender: String,
    pub receiver: String,
}

/// Settlement-relevant view of one committed transaction.
#[derive(Debug, Clone, Default)]
pub struct ParsedTx {
    pub tx_hash: String,
    pub succeeded: bool,
    pub fee_payer: String,
    pub fees: Coins,
    pub swaps: Vec<ParsedSwap>,
    pub sends: Vec<ParsedSend>,
}

/// Reconstructs swaps and transfers from a committed transaction's messages
/// and event logs. Implementations are chain-specific; the trackers are not.
pub trait SwapEventParser: Send + Sync {
    fn parse_tx(&self, lookup: &TxLookup) -> ParsedTx;
}

/// Parser for the gamm swap module's event schema.
#[derive(Debug, Default)]
pub struct GammEventParser;

impl SwapEventParser for GammEventParser {
    fn parse_tx(&self, lookup: &TxLookup) -> ParsedTx {
        let mut parsed = ParsedTx {
            tx_hash: lookup.tx_hash.clone(),
            fee_payer: lookup.fee_payer.clone(),
            ..ParsedTx::default()
        };

        // Fees are charged whether or not the transaction succeeded; nothing
        // else from a failed transaction is trustworthy.
        if lookup.code != 0 {
            return parsed;
        }
        parsed.fees = lookup.fees.clone();

        for (msg_index, msg) in lookup.msgs.iter().enumerate() {
            let log = log_for_index(&lookup.logs, msg_index);
            match msg {
                ChainMsg::SwapExactAmountIn(swap) => {
                    match parse_swap_events(swap, log, msg.type_url()) {
                        Ok(s) => parsed.swaps.push(s),
                        Err(reason) => {
                            tracing::warn!(
                                target: "chain",
                                tx_hash = %lookup.tx_hash,
                                msg_index,
                                %reason,
                                "Failed to parse swap events"
                            );
                            return parsed;
                        }
                    }
                }
                ChainMsg::Send(send) => {
                    if send.amount.len() != 1 {
                        tracing::warn!(
                            target: "chain",
                            tx_hash = %lookup.tx_hash,
                            tokens = send.amount.len(),
                            "Unexpected multi-coin transfer"
                        );
                        return parsed;
                    }
                    parsed.sends.push(ParsedSend {
                        token: send.amount[0].clone(),
                        sender: send.from_address.clone(),
                        receiver: send.to_address.clone(),
                    });
                }
                ChainMsg::Exec(exec) => {
                    // Delegated execution: the inner swaps trade the granter's
                    // funds but land under the outer message's log entry.
                    for inner in &exec.msgs {
                        if let ChainMsg::SwapExactAmountIn(swap) = inner {
                            match parse_swap_events(swap, log, msg.type_url()) {
                                Ok(s) => parsed.swaps.push(s),
                                Err(reason) => {
                                    tracing::warn!(
                                        target: "chain",
                                        tx_hash = %lookup.tx_hash,
                                        msg_index,
                                        %reason,
                                        "Failed to parse delegated swap events"
                                    );
                                    return parsed;
                                }
                            }
                        }
                    }
                }
                other => {
                    tracing::debug!(
                        target: "chain",
                        tx_hash = %lookup.tx_hash,
                        type_url = other.type_url(),
                        "Ignoring message type"
                    );
                }
            }
        }

        parsed.succeeded = true;
        parsed
    }
}

fn parse_swap_events(
    msg: &MsgSwapExactAmountIn,
    log: Option<&MsgLog>,
    msg_type_url: &str,
) -> Result<ParsedSwap, String> {
    if !action_matches(log, msg_type_url) {
        return Err(format!("log action does not match {msg_type_url}"));
    }
    let swapped = event_of_kind(log, EVENT_TOKEN_SWAPPED)
        .ok_or_else(|| format!("no {EVENT_TOKEN_SWAPPED} event"))?;

    if first_attribute(swapped, ATTR_SENDER).is_none() {
        return Err("token_swapped event has no sender".to_string());
    }

    // First token in / last token out: with multiple pools in the route, the
    // intermediates cancel out.
    let token_in_raw = first_attribute(swapped, ATTR_TOKENS_IN)
        .ok_or_else(|| "token_swapped event has no tokens_in".to_string())?;
    let token_out_raw = last_attribute(swapped, ATTR_TOKENS_OUT)
        .ok_or_else(|| "token_swapped event has no tokens_out".to_string())?;

    let token_in = parse_coin(token_in_raw).map_err(|e| e.to_string())?;
    let token_out = parse_coin(token_out_raw).map_err(|e| e.to_string())?;

    // The address comes from the message, not the event; it is what
    // distinguishes user funds from hot-wallet funds.
    Ok(ParsedSwap {
        token_in,
        token_out,
        address: msg.sender.clone(),
    })
}

fn log_for_index(logs: &[MsgLog], index: usize) -> Option<&MsgLog> {
    logs.iter().find(|l| l.msg_index == index)
}

fn event_of_kind<'a>(log: Option<&'a MsgLog>, kind: &str) -> Option<&'a LogEvent> {
    log?.events.iter().find(|e| e.kind == kind)
}

fn action_matches(log: Option<&MsgLog>, msg_type_url: &str) -> bool {
    let Some(message_evt) = event_of_kind(log, EVENT_MESSAGE) else {
        return false;
    };
    message_evt
        .attributes
        .iter()
        .any(|a| a.key == ATTR_ACTION && a.value == msg_type_url)
}

fn first_attribute<'a>(evt: &'a LogEvent, key: &str) -> Option<&'a str> {
    evt.attributes
        .iter()
        .find(|a| a.key == key)
        .map(|a| a.value.as_str())
}

fn last_attribute<'a>(evt: &'a LogEvent, key: &str) -> Option<&'a str> {
    evt.attributes
        .iter()
        .rev()
        .find(|a| a.key == key)
        .map(|a| a.value.as_str())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chain::{MsgExec, MsgSend, SWAP_MSG_TYPE_URL};
    use crate::domain::swap::Route;

    fn attr(key: &str, value: &str) -> Attribute {
        Attribute {
            key: key.to_string(),
            value: value.to_string(),
        }
    }

    fn swap_log(msg_index: usize, action: &str, tokens: &[(&str, &str)]) -> MsgLog {
        let mut attributes = vec![attr(ATTR_SENDER, "osmo1hotwallet")];
        for (token_in, token_out) in tokens {
            attributes.push(attr(ATTR_TOKENS_IN, token_in));
            attributes.push(attr(ATTR_TOKENS_OUT, token_out));
        }
        MsgLog {
            msg_index,
            events: vec![
                LogEvent {
                    kind: EVENT_MESSAGE.to_string(),
                    attributes: vec![attr(ATTR_ACTION, action)],
                },
                LogEvent {
                    kind: EVENT_TOKEN_SWAPPED.to_string(),
                    attributes,
                },
            ],
        }
    }

    fn swap_msg(sender: &str, token_in: Coin) -> MsgSwapExactAmountIn {
        MsgSwapExactAmountIn {
            sender: sender.to_string(),
            routes: vec![
                Route {
                    pool_id: 1,
                    token_out_denom: "uatom".to_string(),
                },
                Route {
                    pool_id: 2,
                    token_out_denom: "uosmo".to_string(),
                },
            ],
            token_out_min_amount: token_in.amount.clone(),
            token_in,
        }
    }

    fn lookup_with(msgs: Vec<ChainMsg>, logs: Vec<MsgLog>, code: u32) -> TxLookup {
        TxLookup {
            tx_hash: "AA11".to_string(),
            height: 7,
            code,
            fee_payer: "osmo1hotwallet".to_string(),
            fees: vec![Coin::new("uosmo", 1_000)].into(),
            msgs,
            logs,
        }
    }

    #[test]
    fn parses_multi_hop_swap_first_in_last_out() {
        let msg = swap_msg("osmo1hotwallet", Coin::new("uosmo", 500_000));
        let lookup = lookup_with(
            vec![ChainMsg::SwapExactAmountIn(msg)],
            vec![swap_log(
                0,
                SWAP_MSG_TYPE_URL,
                &[("500000uosmo", "120uatom"), ("120uatom", "600000uosmo")],
            )],
            0,
        );

        let parsed = GammEventParser.parse_tx(&lookup);
        assert!(parsed.succeeded);
        assert_eq!(parsed.swaps.len(), 1);
        let swap = &parsed.swaps[0];
        assert_eq!(swap.token_in, Coin::new("uosmo", 500_000));
        assert_eq!(swap.token_out, Coin::new("uosmo", 600_000));
        assert_eq!(swap.address, "osmo1hotwallet");
    }

    #[test]
    fn failed_tx_keeps_fee_payer_but_no_swaps() {
        let msg = swap_msg("osmo1hotwallet", Coin::new("uosmo", 500_000));
        let lookup = lookup_with(vec![ChainMsg::SwapExactAmountIn(msg)], vec![], 5);

        let parsed = GammEventParser.parse_tx(&lookup);
        assert!(!parsed.succeeded);
        assert_eq!(parsed.fee_payer, "osmo1hotwallet");
        assert!(parsed.swaps.is_empty());
        assert!(parsed.fees.is_empty());
    }

    #[test]
    fn parses_delegated_swap_under_exec_log() {
        let inner = swap_msg("osmo1user", Coin::new("uosmo", 1_000_000));
        let exec = MsgExec {
            grantee: "osmo1hotwallet".to_string(),
            msgs: vec![ChainMsg::SwapExactAmountIn(inner)],
        };
        let lookup = lookup_with(
            vec![ChainMsg::Exec(exec)],
            vec![swap_log(
                0,
                "/cosmos.authz.v1beta1.MsgExec",
                &[("1000000uosmo", "250uatom")],
            )],
            0,
        );

        let parsed = GammEventParser.parse_tx(&lookup);
        assert!(parsed.succeeded);
        assert_eq!(parsed.swaps.len(), 1);
        assert_eq!(parsed.swaps[0].address, "osmo1user");
    }

    #[test]
    fn rejects_mismatched_action() {
        let msg = swap_msg("osmo1hotwallet", Coin::new("uosmo", 500_000));
        let lookup = lookup_with(
            vec![ChainMsg::SwapExactAmountIn(msg)],
            vec![swap_log(0, "/some.other.Msg", &[("500000uosmo", "600000uosmo")])],
            0,
        );

        let parsed = GammEventParser.parse_tx(&lookup);
        assert!(!parsed.succeeded);
        assert!(parsed.swaps.is_empty());
    }

    #[test]
    fn collects_single_coin_sends() {
        let send = MsgSend {
            from_address: "osmo1hotwallet".to_string(),
            to_address: "osmo1payee".to_string(),
            amount: vec![Coin::new("uosmo", 20_000)],
        };
        let lookup = lookup_with(vec![ChainMsg::Send(send)], vec![], 0);

        let parsed = GammEventParser.parse_tx(&lookup);
        assert!(parsed.succeeded);
        assert_eq!(parsed.sends.len(), 1);
        assert_eq!(parsed.sends[0].receiver, "osmo1payee");
        assert_eq!(parsed.sends[0].token, Coin::new("uosmo", 20_000));
    }
}
