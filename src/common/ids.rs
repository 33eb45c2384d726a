// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2026 ® John Hauger Mitander <john@mitander.dev>

use rand::Rng;
use rand::distributions::Alphanumeric;
use sha2::{Digest, Sha256};

pub const REQUEST_ID_LEN: usize = 10;

/// Opaque identifier for a tracked trade set.
pub fn random_request_id() -> String {
    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(REQUEST_ID_LEN)
        .map(char::from)
        .collect()
}

/// Tendermint-style transaction hash: uppercase hex of SHA-256 over the raw bytes.
pub fn tx_hash(tx_bytes: &[u8]) -> String {
    let digest = Sha256::digest(tx_bytes);
    hex::encode_upper(digest)
}
