// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2026 ® John Hauger Mitander <john@mitander.dev>

use crate::auction::{AuctionInfo, AuctionStatus, BidRequest, BidResponse};
use crate::domain::error::AppError;
use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use tokio::time::Duration;

/// Outbound operations against the block-auction service. Behind a trait so
/// the trackers can be driven by a scripted auction in tests.
#[async_trait]
pub trait AuctionApi: Send + Sync {
    async fn query_auction(&self, chain_id: &str, height: i64) -> Result<AuctionStatus, AppError>;

    async fn place_bid(&self, bid: &BidRequest) -> Result<BidResponse, AppError>;
}

pub struct HttpAuctionClient {
    auction_url: String,
    bid_url: String,
    client: Client,
}

impl HttpAuctionClient {
    pub fn new(auction_url: String, bid_url: String, bid_timeout: Duration) -> Result<Self, AppError> {
        let client = Client::builder()
            .connect_timeout(Duration::from_secs(2))
            .timeout(bid_timeout)
            .build()
            .map_err(|e| AppError::Initialization(format!("auction HTTP client init failed: {e}")))?;
        Ok(Self {
            auction_url,
            bid_url,
            client,
        })
    }
}

#[async_trait]
impl AuctionApi for HttpAuctionClient {
    async fn query_auction(&self, chain_id: &str, height: i64) -> Result<AuctionStatus, AppError> {
        let resp = self
            .client
            .get(&self.auction_url)
            .query(&[("chain_id", chain_id), ("height", &height.to_string())])
            .send()
            .await
            .map_err(|e| AppError::Auction(format!("availability query failed: {e}")))?;

        let status = resp.status();
        if status.is_success() {
            let info: AuctionInfo = resp
                .json()
                .await
                .map_err(|e| AppError::Auction(format!("availability decode failed: {e}")))?;
            return Ok(AuctionStatus::Auction(info));
        }

        match status.as_u16() {
            410 => Ok(AuctionStatus::Past),
            425 => Ok(AuctionStatus::TooFarInFuture),
            417 => Ok(AuctionStatus::NotAuction),
            _ => {
                tracing::warn!(
                    target: "auction",
                    %status,
                    height,
                    "Auction service returned unrecognized status"
                );
                Err(AppError::Auction(format!(
                    "availability query for height {height} returned {status}"
                )))
            }
        }
    }

    async fn place_bid(&self, bid: &BidRequest) -> Result<BidResponse, AppError> {
        let resp = self
            .client
            .post(&self.bid_url)
            .json(bid)
            .send()
            .await
            .map_err(|e| AppError::Auction(format!("bid POST failed: {e}")))?;

        let status = resp.status();
        if status != StatusCode::OK {
            tracing::warn!(target: "auction", %status, height = bid.height, "Bid rejected");
            return Err(AppError::Auction(format!(
                "bid for height {} returned {status}",
                bid.height
            )));
        }

        resp.json()
            .await
            .map_err(|e| AppError::Auction(format!("bid response decode failed: {e}")))
    }
}
