// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2026 ® John Hauger Mitander <john@on1.no>

use std::future::Future;
use std::time::Duration;
use tokio::time::sleep;

/// Bounded retry policy for flaky-but-quick operations, signing against the
/// keyring above all. The wait doubles after every failed attempt.
#[derive(Debug, Clone, Copy)]
pub struct Backoff {
    pub attempts: usize,
    pub base_delay: Duration,
}

impl Backoff {
    pub const fn new(attempts: usize, base_delay: Duration) -> Self {
        Self {
            attempts,
            base_delay,
        }
    }

    /// Drive `op` until it succeeds or the attempt budget is spent; the last
    /// error is returned as-is.
    pub async fn run<T, E, F, Fut>(&self, mut op: F) -> Result<T, E>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        let mut wait = self.base_delay;
        for _ in 1..self.attempts {
            if let Ok(value) = op().await {
                return Ok(value);
            }
            sleep(wait).await;
            wait = wait.saturating_mul(2);
        }
        op().await
    }
}
