// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2026 ® John Hauger Mitander <john@mitander.dev>

use crate::chain::{ChainClient, ChainMsg, MsgGrant, SWAP_MSG_TYPE_URL, await_tx, await_tx_fallback};
use crate::domain::error::AppError;
use base64::Engine;
use base64::prelude::BASE64_STANDARD;
use chrono::{DateTime, Utc};
use std::sync::Arc;
use tokio::time::Duration;

/// Wait roughly two block intervals for the grant tx to land.
const PRIMARY_AWAIT: Duration = Duration::from_secs(13);
/// The alternate endpoint only gets a short second look.
const FALLBACK_AWAIT: Duration = Duration::from_secs(2);

/// Verifies that a caller controls an on-chain address by broadcasting their
/// signed delegation grant and checking the committed transaction's shape.
/// The granter of a valid grant becomes the subject of an issued token.
pub struct GrantVerifier {
    chain: Arc<dyn ChainClient>,
    hot_wallet_address: String,
    address_prefix: String,
    max_grant_seconds: i64,
}

impl GrantVerifier {
    pub fn new(
        chain: Arc<dyn ChainClient>,
        hot_wallet_address: String,
        address_prefix: String,
        max_grant_seconds: i64,
    ) -> Self {
        Self {
            chain,
            hot_wallet_address,
            address_prefix,
            max_grant_seconds,
        }
    }

    /// Broadcast the base64-encoded grant transaction, locate it on chain,
    /// and return `(granter, grant expiration)` if it checks out.
    pub async fn verify(&self, base64_grant_tx: &str) -> Result<(String, DateTime<Utc>), AppError> {
        if base64_grant_tx.is_empty() {
            return Err(AppError::Unauthorized(
                "no base64-encoded grant provided".to_string(),
            ));
        }
        let tx_bytes = BASE64_STANDARD.decode(base64_grant_tx).map_err(|_| {
            AppError::Unauthorized("grant is not valid base64".to_string())
        })?;

        // Broadcasting both validates the signature and posts the grant; a
        // grant that never lands proves nothing.
        let broadcast = self.chain.broadcast_tx_sync(&tx_bytes).await?;
        if broadcast.code != 0 {
            tracing::warn!(
                target: "auth",
                code = broadcast.code,
                raw_log = %broadcast.raw_log,
                "Grant broadcast rejected"
            );
            return Err(AppError::Unauthorized(format!(
                "grant tx error code {}",
                broadcast.code
            )));
        }

        let lookup = match await_tx(self.chain.as_ref(), &broadcast.tx_hash, PRIMARY_AWAIT).await {
            Ok(found) => found,
            Err(primary_err) => {
                tracing::warn!(
                    target: "auth",
                    tx_hash = %broadcast.tx_hash,
                    error = %primary_err,
                    "Grant tx not found on primary endpoint; trying alternate"
                );
                await_tx_fallback(self.chain.as_ref(), &broadcast.tx_hash, FALLBACK_AWAIT)
                    .await
                    .map_err(|_| {
                        AppError::Unauthorized("grant tx never appeared on chain".to_string())
                    })?
            }
        };

        if lookup.msgs.len() != 1 {
            return Err(AppError::Unauthorized(
                "grant tx must contain exactly one message".to_string(),
            ));
        }
        let ChainMsg::Grant(grant) = &lookup.msgs[0] else {
            return Err(AppError::Unauthorized(
                "grant tx message is not a delegation grant".to_string(),
            ));
        };

        self.check_grant(grant)
    }

    fn check_grant(&self, grant: &MsgGrant) -> Result<(String, DateTime<Utc>), AppError> {
        if grant.grantee != self.hot_wallet_address {
            return Err(AppError::Unauthorized(format!(
                "grantee {} is not the hot wallet",
                grant.grantee
            )));
        }
        if !grant.granter.starts_with(&self.address_prefix) {
            return Err(AppError::Unauthorized(format!(
                "granter {} does not carry the chain prefix",
                grant.granter
            )));
        }
        match grant.msg_type_url.as_deref() {
            Some(SWAP_MSG_TYPE_URL) => {}
            Some(other) => {
                return Err(AppError::Unauthorized(format!(
                    "grant authorizes {other}, not the swap message"
                )));
            }
            None => {
                return Err(AppError::Unauthorized(
                    "grant carries no authorization".to_string(),
                ));
            }
        }

        let expiration = grant
            .expiration
            .ok_or_else(|| AppError::Unauthorized("grant has no expiration".to_string()))?;
        let now = Utc::now();
        if expiration <= now {
            return Err(AppError::Unauthorized("grant is already expired".to_string()));
        }
        let seconds_left = (expiration - now).num_seconds();
        if seconds_left > self.max_grant_seconds {
            return Err(AppError::Unauthorized(format!(
                "grant expiration must be no more than {} seconds out",
                self.max_grant_seconds
            )));
        }

        Ok((grant.granter.clone(), expiration))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chain::{BroadcastResponse, DecodedTx, TxLookup};
    use crate::domain::coin::Coins;
    use async_trait::async_trait;
    use chrono::Duration as ChronoDuration;
    use std::sync::Mutex;

    struct GrantChain {
        lookup_msgs: Mutex<Vec<ChainMsg>>,
        broadcast_code: u32,
    }

    #[async_trait]
    impl ChainClient for GrantChain {
        async fn broadcast_tx_sync(&self, _tx: &[u8]) -> Result<BroadcastResponse, AppError> {
            Ok(BroadcastResponse {
                tx_hash: "GRANT".to_string(),
                code: self.broadcast_code,
                raw_log: String::new(),
            })
        }

        async fn get_tx(&self, tx_hash: &str) -> Result<Option<TxLookup>, AppError> {
            Ok(Some(TxLookup {
                tx_hash: tx_hash.to_string(),
                height: 10,
                code: 0,
                fee_payer: String::new(),
                fees: Coins::new(),
                msgs: self.lookup_msgs.lock().unwrap().clone(),
                logs: vec![],
            }))
        }

        async fn all_balances(&self, _address: &str) -> Result<Coins, AppError> {
            Ok(Coins::new())
        }

        fn decode_tx(&self, _tx: &[u8]) -> Result<DecodedTx, AppError> {
            Ok(DecodedTx::default())
        }
    }

    fn grant_msg(expires_in_secs: i64) -> MsgGrant {
        MsgGrant {
            granter: "osmo1granter".to_string(),
            grantee: "osmo1hot".to_string(),
            msg_type_url: Some(SWAP_MSG_TYPE_URL.to_string()),
            expiration: Some(Utc::now() + ChronoDuration::seconds(expires_in_secs)),
        }
    }

    fn verifier(msgs: Vec<ChainMsg>, broadcast_code: u32) -> GrantVerifier {
        GrantVerifier::new(
            Arc::new(GrantChain {
                lookup_msgs: Mutex::new(msgs),
                broadcast_code,
            }),
            "osmo1hot".to_string(),
            "osmo".to_string(),
            3_600,
        )
    }

    #[tokio::test]
    async fn accepts_well_formed_grant() {
        let v = verifier(vec![ChainMsg::Grant(grant_msg(600))], 0);
        let (granter, _exp) = v.verify("Z3JhbnQ=").await.expect("verified");
        assert_eq!(granter, "osmo1granter");
    }

    #[tokio::test]
    async fn rejects_broadcast_failure_and_bad_base64() {
        let v = verifier(vec![ChainMsg::Grant(grant_msg(600))], 4);
        assert!(v.verify("Z3JhbnQ=").await.is_err());

        let v = verifier(vec![ChainMsg::Grant(grant_msg(600))], 0);
        assert!(v.verify("not-base64!!").await.is_err());
        assert!(v.verify("").await.is_err());
    }

    #[tokio::test]
    async fn rejects_wrong_grantee_and_prefix() {
        let mut grant = grant_msg(600);
        grant.grantee = "osmo1somebodyelse".to_string();
        let v = verifier(vec![ChainMsg::Grant(grant)], 0);
        assert!(v.verify("Z3JhbnQ=").await.is_err());

        let mut grant = grant_msg(600);
        grant.granter = "cosmos1granter".to_string();
        let v = verifier(vec![ChainMsg::Grant(grant)], 0);
        assert!(v.verify("Z3JhbnQ=").await.is_err());
    }

    #[tokio::test]
    async fn rejects_wrong_authorization_type() {
        let mut grant = grant_msg(600);
        grant.msg_type_url = Some("/cosmos.bank.v1beta1.MsgSend".to_string());
        let v = verifier(vec![ChainMsg::Grant(grant)], 0);
        assert!(v.verify("Z3JhbnQ=").await.is_err());

        let mut grant = grant_msg(600);
        grant.msg_type_url = None;
        let v = verifier(vec![ChainMsg::Grant(grant)], 0);
        assert!(v.verify("Z3JhbnQ=").await.is_err());
    }

    #[tokio::test]
    async fn rejects_expired_or_overlong_grants() {
        let v = verifier(vec![ChainMsg::Grant(grant_msg(-5))], 0);
        assert!(v.verify("Z3JhbnQ=").await.is_err());

        // Max is 3_600 seconds in these tests.
        let v = verifier(vec![ChainMsg::Grant(grant_msg(7_200))], 0);
        assert!(v.verify("Z3JhbnQ=").await.is_err());
    }

    #[tokio::test]
    async fn rejects_multi_message_and_non_grant_txs() {
        let v = verifier(
            vec![
                ChainMsg::Grant(grant_msg(600)),
                ChainMsg::Other {
                    type_url: "/x".to_string(),
                },
            ],
            0,
        );
        assert!(v.verify("Z3JhbnQ=").await.is_err());

        let v = verifier(
            vec![ChainMsg::Other {
                type_url: "/cosmos.bank.v1beta1.MsgSend".to_string(),
            }],
            0,
        );
        assert!(v.verify("Z3JhbnQ=").await.is_err());
    }
}
