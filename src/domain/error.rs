// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2026 ® John Hauger Mitander <john@oxidity.com>

use thiserror::Error;

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Initialization failed: {0}")]
    Initialization(String),

    #[error("Connection failed to endpoint: {0}")]
    Connection(String),

    #[error("Chain query failed: {0}")]
    Chain(String),

    #[error("Transaction failed: {hash}, reason: {reason}")]
    Transaction { hash: String, reason: String },

    #[error("Signing failed: {0}")]
    Signing(String),

    #[error("Auction service error: {0}")]
    Auction(String),

    #[error("Insufficient funds. Required: {required}, Available: {available}")]
    InsufficientFunds { required: String, available: String },

    #[error("Not eligible: {0}")]
    Ineligible(String),

    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Validation failed for field {field}: {message}")]
    Validation { field: String, message: String },

    #[error("Address {0} is invalid for this chain")]
    InvalidAddress(String),

    #[error(transparent)]
    Unknown(#[from] anyhow::Error),
}

impl From<config::ConfigError> for AppError {
    fn from(err: config::ConfigError) -> Self {
        AppError::Config(err.to_string())
    }
}

/// Request-boundary error. The external HTTP surface maps these one-to-one to
/// responses; internal detail is deliberately suppressed for the ineligible
/// and bad-signed-tx paths so callers cannot probe the eligibility rules.
#[derive(Error, Debug)]
pub enum ApiError {
    #[error("bad request: {0}")]
    BadInput(String),

    #[error("unauthorized: {0}")]
    Unauthorized(String),

    #[error("insufficient balance")]
    InsufficientFunds,

    #[error("bad swap request provided")]
    Ineligible,

    #[error("upstream unavailable: {0}")]
    Upstream(String),

    #[error("signing failure")]
    Signing,

    #[error("internal error: {0}")]
    Internal(String),
}

impl ApiError {
    pub fn status_code(&self) -> u16 {
        match self {
            ApiError::BadInput(_) => 400,
            ApiError::Unauthorized(_) => 401,
            ApiError::InsufficientFunds => 400,
            ApiError::Ineligible => 400,
            ApiError::Upstream(_) => 502,
            ApiError::Signing => 500,
            ApiError::Internal(_) => 500,
        }
    }
}

impl From<AppError> for ApiError {
    fn from(err: AppError) -> Self {
        match err {
            AppError::Ineligible(detail) => {
                // Detail stays in the logs only.
                tracing::warn!(target: "api", %detail, "Rejected ineligible request");
                ApiError::Ineligible
            }
            AppError::Unauthorized(msg) => ApiError::Unauthorized(msg),
            AppError::InsufficientFunds { .. } => ApiError::InsufficientFunds,
            AppError::Validation { field, message } => {
                ApiError::BadInput(format!("{field}: {message}"))
            }
            AppError::InvalidAddress(addr) => ApiError::BadInput(format!("invalid address {addr}")),
            AppError::Signing(_) => ApiError::Signing,
            AppError::Connection(msg) | AppError::Chain(msg) | AppError::Auction(msg) => {
                ApiError::Upstream(msg)
            }
            other => ApiError::Internal(other.to_string()),
        }
    }
}
