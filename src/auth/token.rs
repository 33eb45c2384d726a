// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2026 ® John Hauger Mitander <john@mitander.dev>

use crate::domain::error::AppError;
use base64::Engine;
use base64::prelude::BASE64_URL_SAFE_NO_PAD;
use chrono::{DateTime, Utc};
use hmac::{Hmac, Mac};
use serde::{Deserialize, Serialize};
use sha2::Sha256;

type HmacSha256 = Hmac<Sha256>;

/// The sample config ships with this value; refusing it at startup keeps a
/// copy-pasted deployment from issuing forgeable tokens.
pub const JWT_KEY_PLACEHOLDER: &str = "change-this-signing-key-before-deploying";

const MIN_KEY_BYTES: usize = 32;

#[derive(Debug, Serialize, Deserialize)]
struct Header {
    alg: String,
    typ: String,
}

/// Registered claims carried by issued tokens. The subject is the on-chain
/// address that granted the hot wallet execution rights.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String,
    pub iat: i64,
    pub exp: i64,
    pub iss: String,
}

/// Issues and validates HS256 bearer tokens bound to a verified on-chain
/// identity. Token lifetime always equals the underlying grant's lifetime.
pub struct TokenSigner {
    key: Vec<u8>,
    issuer: String,
}

impl TokenSigner {
    pub fn new(secret: &str, issuer: String) -> Result<Self, AppError> {
        if secret.len() < MIN_KEY_BYTES {
            return Err(AppError::Config(format!(
                "token signing key must be at least {MIN_KEY_BYTES} bytes"
            )));
        }
        if secret == JWT_KEY_PLACEHOLDER {
            return Err(AppError::Config(
                "token signing key is still set to the placeholder value".to_string(),
            ));
        }
        Ok(Self {
            key: secret.as_bytes().to_vec(),
            issuer,
        })
    }

    pub fn issue(&self, subject: &str, expires_at: DateTime<Utc>) -> Result<String, AppError> {
        let header = Header {
            alg: "HS256".to_string(),
            typ: "JWT".to_string(),
        };
        let claims = Claims {
            sub: subject.to_string(),
            iat: Utc::now().timestamp(),
            exp: expires_at.timestamp(),
            iss: self.issuer.clone(),
        };

        let header_b64 = BASE64_URL_SAFE_NO_PAD.encode(
            serde_json::to_vec(&header)
                .map_err(|e| AppError::Signing(format!("token header encode failed: {e}")))?,
        );
        let claims_b64 = BASE64_URL_SAFE_NO_PAD.encode(
            serde_json::to_vec(&claims)
                .map_err(|e| AppError::Signing(format!("token claims encode failed: {e}")))?,
        );

        let signing_input = format!("{header_b64}.{claims_b64}");
        let sig_b64 = BASE64_URL_SAFE_NO_PAD.encode(self.sign(signing_input.as_bytes())?);
        Ok(format!("{signing_input}.{sig_b64}"))
    }

    /// Parse and verify a presented token: structure, algorithm, signature,
    /// then expiry. Every failure is the same 401 to the caller.
    pub fn validate(&self, token: &str) -> Result<Claims, AppError> {
        let mut parts = token.split('.');
        let (Some(header_b64), Some(claims_b64), Some(sig_b64), None) =
            (parts.next(), parts.next(), parts.next(), parts.next())
        else {
            return Err(AppError::Unauthorized("malformed token".to_string()));
        };

        let header: Header = decode_json(header_b64)?;
        if header.alg != "HS256" {
            return Err(AppError::Unauthorized(format!(
                "unexpected signing method {}",
                header.alg
            )));
        }

        let signing_input = format!("{header_b64}.{claims_b64}");
        let signature = BASE64_URL_SAFE_NO_PAD
            .decode(sig_b64)
            .map_err(|_| AppError::Unauthorized("malformed token signature".to_string()))?;
        let mut mac = HmacSha256::new_from_slice(&self.key)
            .map_err(|e| AppError::Signing(format!("token key rejected: {e}")))?;
        mac.update(signing_input.as_bytes());
        mac.verify_slice(&signature)
            .map_err(|_| AppError::Unauthorized("invalid token signature".to_string()))?;

        let claims: Claims = decode_json(claims_b64)?;
        if claims.exp <= Utc::now().timestamp() {
            return Err(AppError::Unauthorized("token expired".to_string()));
        }
        Ok(claims)
    }

    fn sign(&self, input: &[u8]) -> Result<Vec<u8>, AppError> {
        let mut mac = HmacSha256::new_from_slice(&self.key)
            .map_err(|e| AppError::Signing(format!("token key rejected: {e}")))?;
        mac.update(input);
        Ok(mac.finalize().into_bytes().to_vec())
    }
}

fn decode_json<T: serde::de::DeserializeOwned>(b64: &str) -> Result<T, AppError> {
    let raw = BASE64_URL_SAFE_NO_PAD
        .decode(b64)
        .map_err(|_| AppError::Unauthorized("malformed token segment".to_string()))?;
    serde_json::from_slice(&raw).map_err(|_| AppError::Unauthorized("malformed token json".to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn signer() -> TokenSigner {
        TokenSigner::new(
            "an-adequately-long-signing-key-0123456789",
            "oxidity-arbiter".to_string(),
        )
        .expect("signer")
    }

    #[test]
    fn round_trips_valid_token() {
        let s = signer();
        let token = s.issue("osmo1granter", Utc::now() + Duration::hours(1)).unwrap();
        let claims = s.validate(&token).unwrap();
        assert_eq!(claims.sub, "osmo1granter");
        assert_eq!(claims.iss, "oxidity-arbiter");
    }

    #[test]
    fn rejects_token_one_second_after_expiry() {
        let s = signer();
        let token = s.issue("osmo1granter", Utc::now() - Duration::seconds(1)).unwrap();
        assert!(s.validate(&token).is_err());
    }

    #[test]
    fn accepts_token_one_second_before_expiry() {
        let s = signer();
        let token = s.issue("osmo1granter", Utc::now() + Duration::seconds(1)).unwrap();
        assert!(s.validate(&token).is_ok());
    }

    #[test]
    fn rejects_tampered_claims() {
        let s = signer();
        let token = s.issue("osmo1granter", Utc::now() + Duration::hours(1)).unwrap();
        let mut parts: Vec<&str> = token.split('.').collect();

        let forged = BASE64_URL_SAFE_NO_PAD.encode(
            serde_json::to_vec(&Claims {
                sub: "osmo1attacker".to_string(),
                iat: Utc::now().timestamp(),
                exp: (Utc::now() + Duration::hours(1)).timestamp(),
                iss: "oxidity-arbiter".to_string(),
            })
            .unwrap(),
        );
        parts[1] = &forged;
        assert!(s.validate(&parts.join(".")).is_err());
    }

    #[test]
    fn rejects_foreign_key_and_wrong_alg() {
        let s = signer();
        let other = TokenSigner::new(
            "a-different-but-also-long-key-9876543210",
            "oxidity-arbiter".to_string(),
        )
        .unwrap();
        let token = other.issue("osmo1granter", Utc::now() + Duration::hours(1)).unwrap();
        assert!(s.validate(&token).is_err());

        // alg "none" must never validate.
        let header = BASE64_URL_SAFE_NO_PAD.encode(br#"{"alg":"none","typ":"JWT"}"#);
        let claims = token.split('.').nth(1).unwrap();
        assert!(s.validate(&format!("{header}.{claims}.")).is_err());
    }

    #[test]
    fn rejects_short_or_placeholder_keys() {
        assert!(TokenSigner::new("short", "iss".to_string()).is_err());
        assert!(TokenSigner::new(JWT_KEY_PLACEHOLDER, "iss".to_string()).is_err());
    }
}
