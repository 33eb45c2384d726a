// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2026 ® John Hauger Mitander <john@mitander.dev>

use crate::domain::error::AppError;
use async_trait::async_trait;
use futures::{SinkExt, StreamExt};
use serde::Deserialize;
use std::collections::VecDeque;
use std::sync::Arc;
use tokio::sync::mpsc::{UnboundedReceiver, UnboundedSender};
use tokio::time::{Duration, Instant, sleep};
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::Message;
use tokio_util::sync::CancellationToken;

const SUBSCRIBE_NEW_BLOCK_HEADER: &str = r#"{"jsonrpc":"2.0","method":"subscribe","id":1,"params":{"query":"tm.event='NewBlockHeader'"}}"#;

/// How many inter-block gaps feed the rolling average.
const INTERVAL_WINDOW: usize = 10;

#[derive(Debug, Deserialize, Default)]
struct HeaderFrame {
    #[serde(default)]
    result: HeaderResult,
}

#[derive(Debug, Deserialize, Default)]
struct HeaderResult {
    #[serde(default)]
    data: HeaderData,
}

#[derive(Debug, Deserialize, Default)]
struct HeaderData {
    #[serde(default)]
    value: HeaderValue,
}

#[derive(Debug, Deserialize, Default)]
struct HeaderValue {
    #[serde(default)]
    header: BlockHeader,
}

#[derive(Debug, Deserialize, Default)]
struct BlockHeader {
    #[serde(default)]
    height: String,
}

/// Subscribes to new-block-header events over websocket and pushes heights
/// onto an unbounded channel. Read and decode errors count against a failure
/// threshold; once crossed, the subscription is torn down and reopened. The
/// follower gives up entirely after the same number of reconnect cycles.
pub struct BlockFollower {
    ws_url: String,
    heights: UnboundedSender<i64>,
    failure_threshold: u32,
    shutdown: CancellationToken,
}

impl BlockFollower {
    pub fn new(
        ws_url: String,
        heights: UnboundedSender<i64>,
        failure_threshold: u32,
        shutdown: CancellationToken,
    ) -> Self {
        Self {
            ws_url,
            heights,
            failure_threshold: failure_threshold.max(1),
            shutdown,
        }
    }

    pub async fn run(self) -> Result<(), AppError> {
        let mut cycles: u32 = 0;
        loop {
            if self.shutdown.is_cancelled() {
                tracing::info!(target: "blocks", "Shutdown requested; stopping block follower");
                return Ok(());
            }

            if let Err(e) = self.subscribe_once().await {
                tracing::warn!(target: "blocks", error = %e, "Block subscription ended");
            }

            cycles += 1;
            if cycles >= self.failure_threshold {
                tracing::error!(
                    target: "blocks",
                    url = %self.ws_url,
                    cycles,
                    "Websocket host keeps failing; giving up"
                );
                return Err(AppError::Connection(format!(
                    "block subscription to {} failed {} times",
                    self.ws_url, cycles
                )));
            }

            tokio::select! {
                _ = self.shutdown.cancelled() => {
                    tracing::info!(target: "blocks", "Shutdown requested during reconnect backoff");
                    return Ok(());
                }
                _ = sleep(Duration::from_secs(2)) => {}
            }
        }
    }

    async fn subscribe_once(&self) -> Result<(), AppError> {
        tracing::info!(target: "blocks", url = %self.ws_url, "Subscribing to new block headers");
        let (mut stream, _) = connect_async(self.ws_url.as_str())
            .await
            .map_err(|e| AppError::Connection(format!("websocket dial failed: {e}")))?;

        stream
            .send(Message::Text(SUBSCRIBE_NEW_BLOCK_HEADER.to_string()))
            .await
            .map_err(|e| AppError::Connection(format!("subscribe send failed: {e}")))?;

        let mut fails: u32 = 0;
        loop {
            let maybe_msg = tokio::select! {
                _ = self.shutdown.cancelled() => return Ok(()),
                msg = stream.next() => msg,
            };

            let Some(msg) = maybe_msg else {
                return Err(AppError::Connection("websocket stream closed".into()));
            };

            match msg {
                Ok(Message::Text(raw)) => {
                    if let Some(height) = decode_height(&raw) {
                        // The dispatcher owns ordering; the channel is unbounded
                        // so a slow tick never blocks the socket read.
                        if self.heights.send(height).is_err() {
                            return Ok(());
                        }
                    }
                }
                Ok(Message::Ping(_)) | Ok(Message::Pong(_)) | Ok(Message::Binary(_)) => {}
                Ok(Message::Close(_)) => {
                    return Err(AppError::Connection("websocket closed by peer".into()));
                }
                Ok(_) => {}
                Err(e) => {
                    fails += 1;
                    tracing::warn!(target: "blocks", error = %e, fails, "Websocket read error");
                    if fails >= self.failure_threshold {
                        return Err(AppError::Connection(format!(
                            "websocket read failed {fails} times"
                        )));
                    }
                }
            }
        }
    }
}

/// The first frame back is the subscription confirmation with an empty result;
/// it carries no header and is skipped here.
fn decode_height(raw: &str) -> Option<i64> {
    let frame: HeaderFrame = serde_json::from_str(raw).ok()?;
    frame.result.data.value.header.height.parse::<i64>().ok()
}

/// Receives `(height, avg_block_ms)` ticks. Handlers run inside the single
/// dispatcher task, in registration order; anything slow in here delays every
/// later handler and the next tick.
#[async_trait]
pub trait BlockHandler: Send + Sync {
    async fn on_block(&self, height: i64, avg_block_ms: i64);
}

/// Rolling mean of the last ten consecutive inter-block gaps. Heights that
/// jump by more than one do not contribute a gap.
#[derive(Debug, Default)]
pub struct BlockInterval {
    gaps_ms: VecDeque<i64>,
}

impl BlockInterval {
    pub fn record(&mut self, elapsed_ms: i64) {
        self.gaps_ms.push_back(elapsed_ms);
        if self.gaps_ms.len() > INTERVAL_WINDOW {
            self.gaps_ms.pop_front();
        }
    }

    pub fn average_ms(&self) -> i64 {
        if self.gaps_ms.is_empty() {
            return 0;
        }
        self.gaps_ms.iter().sum::<i64>() / self.gaps_ms.len() as i64
    }
}

/// Single consumer of the height channel: maintains the rolling average and
/// fans ticks out to registered handlers. This task is the serialization
/// point for all trade-set mutation.
pub struct BlockDispatcher {
    handlers: Vec<Arc<dyn BlockHandler>>,
    shutdown: CancellationToken,
}

impl BlockDispatcher {
    pub fn new(shutdown: CancellationToken) -> Self {
        Self {
            handlers: Vec::new(),
            shutdown,
        }
    }

    pub fn register(&mut self, handler: Arc<dyn BlockHandler>) {
        self.handlers.push(handler);
    }

    pub async fn run(self, mut heights: UnboundedReceiver<i64>) {
        let mut interval = BlockInterval::default();
        let mut last_height: Option<i64> = None;
        let mut last_seen = Instant::now();

        loop {
            let maybe_height = tokio::select! {
                _ = self.shutdown.cancelled() => {
                    tracing::info!(target: "blocks", "Shutdown requested; stopping tick dispatcher");
                    return;
                }
                h = heights.recv() => h,
            };

            let Some(height) = maybe_height else {
                tracing::info!(target: "blocks", "Height channel closed; stopping tick dispatcher");
                return;
            };

            // Handlers are guaranteed monotonically non-decreasing heights.
            if let Some(last) = last_height {
                if height < last {
                    tracing::warn!(target: "blocks", height, last, "Skipping out-of-order height");
                    continue;
                }
                if height == last + 1 {
                    interval.record(last_seen.elapsed().as_millis() as i64);
                }
            }
            last_height = Some(height);
            last_seen = Instant::now();

            let avg_block_ms = interval.average_ms();
            tracing::debug!(target: "blocks", height, avg_block_ms, "New block tick");

            for handler in &self.handlers {
                handler.on_block(height, avg_block_ms).await;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;
    use tokio::sync::mpsc;

    #[test]
    fn decodes_header_frames_and_skips_confirmations() {
        let frame = r#"{"jsonrpc":"2.0","id":1,"result":{"data":{"value":{"header":{"chain_id":"osmosis-1","height":"7764360"},"num_txs":"4"}}}}"#;
        assert_eq!(decode_height(frame), Some(7_764_360));

        let confirmation = r#"{"jsonrpc":"2.0","id":1,"result":{}}"#;
        assert_eq!(decode_height(confirmation), None);

        assert_eq!(decode_height("not json"), None);
    }

    #[test]
    fn interval_keeps_last_ten_gaps() {
        let mut interval = BlockInterval::default();
        for ms in [100; 5] {
            interval.record(ms);
        }
        assert_eq!(interval.average_ms(), 100);

        for ms in [200; 10] {
            interval.record(ms);
        }
        assert_eq!(interval.average_ms(), 200);
    }

    #[test]
    fn empty_interval_averages_zero() {
        assert_eq!(BlockInterval::default().average_ms(), 0);
    }

    struct Recorder {
        name: &'static str,
        seen: Arc<Mutex<Vec<(&'static str, i64)>>>,
    }

    #[async_trait]
    impl BlockHandler for Recorder {
        async fn on_block(&self, height: i64, _avg_block_ms: i64) {
            self.seen.lock().unwrap().push((self.name, height));
        }
    }

    #[tokio::test]
    async fn dispatcher_invokes_handlers_in_registration_order() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let shutdown = CancellationToken::new();
        let mut dispatcher = BlockDispatcher::new(shutdown.clone());
        dispatcher.register(Arc::new(Recorder {
            name: "first",
            seen: seen.clone(),
        }));
        dispatcher.register(Arc::new(Recorder {
            name: "second",
            seen: seen.clone(),
        }));

        let (tx, rx) = mpsc::unbounded_channel();
        tx.send(100).unwrap();
        tx.send(101).unwrap();
        drop(tx);
        dispatcher.run(rx).await;

        let order = seen.lock().unwrap().clone();
        assert_eq!(
            order,
            vec![("first", 100), ("second", 100), ("first", 101), ("second", 101)]
        );
    }

    #[tokio::test]
    async fn dispatcher_drops_out_of_order_heights() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let shutdown = CancellationToken::new();
        let mut dispatcher = BlockDispatcher::new(shutdown.clone());
        dispatcher.register(Arc::new(Recorder {
            name: "only",
            seen: seen.clone(),
        }));

        let (tx, rx) = mpsc::unbounded_channel();
        for h in [100, 99, 100, 101] {
            tx.send(h).unwrap();
        }
        drop(tx);
        dispatcher.run(rx).await;

        let heights: Vec<i64> = seen.lock().unwrap().iter().map(|(_, h)| *h).collect();
        assert_eq!(heights, vec![100, 100, 101]);
    }
}
