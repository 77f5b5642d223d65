// Copyright (c) Chaingate Contributors
// SPDX-License-Identifier: Apache-2.0

use alloy_primitives::U256;
use time::OffsetDateTime;

use crate::types::{Chain, ChainBlock};

/// Builds a deterministic block for `chain` at `height`.
///
/// Hash and weight are derived from the height so that distinct heights
/// produce distinct, recognizable blocks.
#[must_use]
pub fn test_block(chain: Chain, height: u64) -> ChainBlock {
    let mut hash = [0u8; 32];
    hash[..8].copy_from_slice(&height.to_be_bytes());
    ChainBlock {
        chain,
        height,
        timestamp: OffsetDateTime::from_unix_timestamp(1_626_746_880).unwrap(),
        total_weight: U256::from(height) * U256::from(1_000u64),
        hash,
    }
}
