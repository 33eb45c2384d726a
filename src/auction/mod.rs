// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2026 ® John Hauger Mitander <john@on1.no>

pub mod client;
pub mod tracker;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One payee of a won auction, with its share of the bid.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Payment {
    pub address: String,
    pub allocation: f64,
    pub denom: String,
}

/// Response from the auction service's availability endpoint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuctionInfo {
    pub chain_id: String,
    pub height: i64,
    #[serde(default)]
    pub payments: Vec<Payment>,
}

impl AuctionInfo {
    /// A usable payment list allocates exactly the whole bid and names every
    /// payee. Anything else is refused outright; no bid is built against it.
    pub fn validate(&self) -> bool {
        let mut total = 0.0;
        for payment in &self.payments {
            if payment.address.is_empty() {
                return false;
            }
            total += payment.allocation;
        }
        total == 1.0
    }
}

/// Classification of an availability query, mapped from the service's HTTP
/// status codes.
#[derive(Debug, Clone, PartialEq)]
pub enum AuctionStatus {
    /// 2xx: this height is auctioned, with the returned payment split.
    Auction(AuctionInfo),
    /// 410: the height already passed.
    Past,
    /// 425: ask again closer to the height.
    TooFarInFuture,
    /// 417: valid height, but not an auctioned block.
    NotAuction,
}

/// POST body for placing a bid: base64-encoded signed transactions, in the
/// exact order they should land in the block.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BidRequest {
    pub chain_id: String,
    pub height: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
    pub txs: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BidResponse {
    pub chain_id: String,
    pub height: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
    #[serde(default)]
    pub tx_hashes: Vec<String>,
}

/// The auction a trade set last bid into.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubmittedBid {
    pub chain_id: String,
    pub height: i64,
}

/// An upcoming block the tracker knows about.
#[derive(Debug, Clone, Serialize)]
pub struct FutureBlock {
    pub height: i64,
    pub is_auction: bool,
    pub projected_time: DateTime<Utc>,
    pub ms_until_block: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub auction: Option<AuctionInfo>,
}
