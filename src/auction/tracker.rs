// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2026 ® John Hauger Mitander <john@mitander.dev>

use crate::auction::client::AuctionApi;
use crate::auction::{AuctionStatus, FutureBlock};
use crate::chain::follower::BlockHandler;
use async_trait::async_trait;
use chrono::{DateTime, Duration as ChronoDuration, Utc};
use dashmap::DashMap;
use std::sync::Arc;

/// How many upcoming heights to query per tick. This is the most the auction
/// service will answer for.
const LOOKAHEAD_BLOCKS: i64 = 10;

/// Tracks which of the next few blocks are auctioned off, and for how much of
/// the bid each payee is owed. Driven by block ticks; heights that already
/// passed are pruned, unknown heights are queried, and heights the service
/// calls too-far-future stay unmapped so the next tick retries them.
pub struct AuctionTracker {
    chain_id: String,
    api: Arc<dyn AuctionApi>,
    blocks: DashMap<i64, FutureBlock>,
}

impl AuctionTracker {
    pub fn new(chain_id: String, api: Arc<dyn AuctionApi>) -> Self {
        Self {
            chain_id,
            api,
            blocks: DashMap::new(),
        }
    }

    /// Upcoming auctioned blocks, nearest first.
    pub fn auction_blocks(&self) -> Vec<FutureBlock> {
        let mut out: Vec<FutureBlock> = self
            .blocks
            .iter()
            .filter(|entry| entry.value().is_auction)
            .map(|entry| entry.value().clone())
            .collect();
        out.sort_by_key(|b| b.height);
        out
    }

    /// Upcoming auctioned blocks projected after `cutoff`, nearest first.
    pub fn auction_blocks_after(&self, cutoff: DateTime<Utc>) -> Vec<FutureBlock> {
        let mut out = self.auction_blocks();
        out.retain(|b| b.projected_time > cutoff);
        out
    }

    /// The nearest upcoming auctioned block, if any is known.
    pub fn next_auction_block(&self) -> Option<FutureBlock> {
        self.auction_blocks().into_iter().next()
    }
}

#[async_trait]
impl BlockHandler for AuctionTracker {
    async fn on_block(&self, height: i64, avg_block_ms: i64) {
        self.blocks.retain(|&h, _| h > height);

        for h in height..height + LOOKAHEAD_BLOCKS {
            if self.blocks.contains_key(&h) {
                continue;
            }

            let status = match self.api.query_auction(&self.chain_id, h).await {
                Ok(status) => status,
                Err(e) => {
                    // Transient: leave unmapped so the next tick asks again.
                    tracing::warn!(target: "auction", height = h, error = %e, "Availability query failed");
                    continue;
                }
            };

            let ms_until_block = (h - height) * avg_block_ms;
            let projected_time = Utc::now() + ChronoDuration::milliseconds(ms_until_block);

            let block = match status {
                AuctionStatus::Auction(info) => {
                    if !info.validate() {
                        // A bad payment split means we could never settle the
                        // bid correctly; treat the height as unusable.
                        tracing::warn!(
                            target: "auction",
                            height = h,
                            "Rejecting auction with invalid payment split"
                        );
                        FutureBlock {
                            height: h,
                            is_auction: false,
                            projected_time,
                            ms_until_block,
                            auction: None,
                        }
                    } else {
                        tracing::debug!(target: "auction", height = h, "Found auction block");
                        FutureBlock {
                            height: h,
                            is_auction: true,
                            projected_time,
                            ms_until_block,
                            auction: Some(info),
                        }
                    }
                }
                AuctionStatus::TooFarInFuture => continue,
                AuctionStatus::Past | AuctionStatus::NotAuction => FutureBlock {
                    height: h,
                    is_auction: false,
                    projected_time,
                    ms_until_block,
                    auction: None,
                },
            };

            self.blocks.insert(h, block);
        }
    }
}
