// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2026 ® John Hauger Mitander <john@on1.no>

use crate::auth::token::JWT_KEY_PLACEHOLDER;
use crate::domain::coin::{Coin, parse_coin};
use crate::domain::error::AppError;
use config::{Config, Environment, File};
use serde::Deserialize;

#[derive(Debug, Deserialize, Clone)]
pub struct Settings {
    // General
    #[serde(default = "default_debug")]
    pub debug: bool,
    #[serde(default = "default_log_json")]
    pub log_json: bool,

    // Chain
    pub chain_id: String,
    #[serde(default = "default_address_prefix")]
    pub address_prefix: String,
    #[serde(default = "default_native_denom")]
    pub native_denom: String,
    /// Full websocket URL for new-block-header subscriptions,
    /// e.g. wss://rpc.osmosis.zone:443/websocket
    pub websocket_url: String,
    #[serde(default = "default_ws_failure_threshold")]
    pub ws_failure_threshold: u32,

    // Hot wallet / keyring (consumed by the external keyring client)
    pub hot_wallet_key: String,
    pub keyring_home_dir: Option<String>,
    #[serde(default = "default_keyring_backend")]
    pub keyring_backend: String,

    // Profit sharing
    #[serde(default = "default_user_profit_share")]
    pub user_profit_share: f64,

    // Auction service
    pub auction_url: String,
    pub auction_bid_url: String,
    /// Upper bound for a single auction bid, e.g. "5000000uosmo"
    pub max_bid: String,
    #[serde(default = "default_bid_fraction")]
    pub bid_fraction: f64,
    #[serde(default = "default_bid_timeout_secs")]
    pub bid_timeout_secs: u64,

    // Bearer tokens
    pub jwt_secret_key: String,
    #[serde(default = "default_jwt_issuer")]
    pub jwt_issuer: String,
    #[serde(default = "default_max_grant_seconds")]
    pub max_grant_seconds: i64,

    // Settlement
    #[serde(default = "default_tick_lookup_timeout_ms")]
    pub tick_lookup_timeout_ms: u64,
}

// Defaults
fn default_debug() -> bool {
    false
}
fn default_log_json() -> bool {
    false
}
fn default_address_prefix() -> String {
    "osmo".to_string()
}
fn default_native_denom() -> String {
    "uosmo".to_string()
}
fn default_ws_failure_threshold() -> u32 {
    10
}
fn default_keyring_backend() -> String {
    "test".to_string()
}
fn default_user_profit_share() -> f64 {
    0.85
}
fn default_bid_fraction() -> f64 {
    0.2
}
fn default_bid_timeout_secs() -> u64 {
    3
}
fn default_jwt_issuer() -> String {
    "oxidity-arbiter".to_string()
}
fn default_max_grant_seconds() -> i64 {
    86_400
}
fn default_tick_lookup_timeout_ms() -> u64 {
    500
}

impl Settings {
    pub fn load_with_path(path: Option<&str>) -> Result<Self, AppError> {
        // Load .env file if it exists
        dotenvy::dotenv().ok();

        let mut builder = Config::builder();
        if let Some(path) = path {
            builder = builder.add_source(File::with_name(path).required(true));
        } else {
            builder = builder.add_source(File::with_name("config").required(false));
        }
        // Environment (and .env) override file values
        builder = builder.add_source(Environment::default());

        let settings: Settings = builder.build()?.try_deserialize()?;
        settings.validate()?;
        Ok(settings)
    }

    pub fn load() -> Result<Self, AppError> {
        Self::load_with_path(None)
    }

    /// Startup-fatal checks. Anything that would let the backend sign with a
    /// broken identity or a guessable token key must fail here, not at runtime.
    pub fn validate(&self) -> Result<(), AppError> {
        if self.chain_id.is_empty() {
            return Err(AppError::Config("chain_id is missing".to_string()));
        }
        if self.hot_wallet_key.is_empty() {
            return Err(AppError::Config("hot_wallet_key is missing".to_string()));
        }
        if self.jwt_secret_key.len() < 32 {
            return Err(AppError::Config(
                "jwt_secret_key must be at least 32 bytes".to_string(),
            ));
        }
        if self.jwt_secret_key == JWT_KEY_PLACEHOLDER {
            return Err(AppError::Config(
                "jwt_secret_key is still set to the placeholder value".to_string(),
            ));
        }
        if !(0.0..=1.0).contains(&self.user_profit_share) {
            return Err(AppError::Config(format!(
                "user_profit_share {} is not a valid fraction",
                self.user_profit_share
            )));
        }
        if !(0.0..=1.0).contains(&self.bid_fraction) {
            return Err(AppError::Config(format!(
                "bid_fraction {} is not a valid fraction",
                self.bid_fraction
            )));
        }
        self.max_bid_coin()?;
        Ok(())
    }

    pub fn max_bid_coin(&self) -> Result<Coin, AppError> {
        parse_coin(&self.max_bid)
            .map_err(|e| AppError::Config(format!("max_bid '{}' is invalid: {e}", self.max_bid)))
    }
}
