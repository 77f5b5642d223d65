// Copyright (c) Chaingate Contributors
// SPDX-License-Identifier: Apache-2.0

use std::sync::atomic::{AtomicU64, Ordering};

use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;

use super::BroadcastError;
use crate::types::ChainBlock;

const BINCODE_CONFIG: bincode::config::Configuration = bincode::config::standard();

/// Identifies one subscriber within the registry, for pruning.
pub type SubscriberId = u64;

static NEXT_SUBSCRIBER_ID: AtomicU64 = AtomicU64::new(0);

/// Outbound head notification, one per delivered block.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChainHeadMessage {
    /// Numeric chain id ([`crate::types::Chain::id`]).
    pub chain: u32,
    /// Block height.
    pub height: u64,
    /// Block timestamp, milliseconds since the Unix epoch.
    pub timestamp: u64,
    /// Cumulative chain weight as big-endian arbitrary-precision bytes.
    pub weight: Vec<u8>,
    /// Block hash as lowercase hex, without a `0x` prefix.
    pub block_id: String,
}

impl ChainHeadMessage {
    /// Builds the notification for one delivered block.
    #[must_use]
    pub fn from_block(block: &ChainBlock) -> Self {
        Self {
            chain: block.chain.id(),
            height: block.height,
            timestamp: block.timestamp_millis(),
            weight: block.total_weight.to_be_bytes_trimmed_vec(),
            block_id: block.hash_hex(),
        }
    }

    /// Serializes this message into owned bytes using [`bincode`].
    #[must_use]
    pub fn to_bytes(&self) -> Vec<u8> {
        bincode::serde::encode_to_vec(self, BINCODE_CONFIG)
            .expect("serialization should not panic")
    }

    /// Tries to deserialize a `ChainHeadMessage` from bytes using [`bincode`].
    ///
    /// # Errors
    ///
    /// Returns [`bincode::error::DecodeError`] if decoding fails.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, bincode::error::DecodeError> {
        let (msg, _) = bincode::serde::decode_from_slice(bytes, BINCODE_CONFIG)?;
        Ok(msg)
    }
}

/// Events pushed to one subscriber's channel.
#[derive(Debug)]
pub enum HeadEvent {
    /// A delivered head notification.
    Head(ChainHeadMessage),
    /// The chain's upstream head stream completed; no further heads follow.
    Completed,
    /// Terminal error, e.g. subscribing to an unavailable chain.
    Error(BroadcastError),
}

/// Send handle for one subscribed client.
///
/// Owned by the broadcast registry for its lifetime; once a send fails or
/// the upstream stream completes the sender is removed and never reused.
#[derive(Clone, Debug)]
pub struct StreamSender {
    id: SubscriberId,
    tx: mpsc::Sender<HeadEvent>,
}

impl StreamSender {
    /// Wraps an outbound client channel in a registry-managed sender.
    #[must_use]
    pub fn new(tx: mpsc::Sender<HeadEvent>) -> Self {
        Self {
            id: NEXT_SUBSCRIBER_ID.fetch_add(1, Ordering::Relaxed),
            tx,
        }
    }

    /// Creates a sender together with the client-side receiver.
    #[must_use]
    pub fn channel(capacity: usize) -> (Self, mpsc::Receiver<HeadEvent>) {
        let (tx, rx) = mpsc::channel(capacity);
        (Self::new(tx), rx)
    }

    #[must_use]
    pub const fn id(&self) -> SubscriberId {
        self.id
    }

    /// Delivers one head notification. Returns `false` when the client is
    /// unreachable (channel closed), which the registry treats as an
    /// implicit unsubscribe.
    pub async fn send(&self, message: ChainHeadMessage) -> bool {
        self.tx.send(HeadEvent::Head(message)).await.is_ok()
    }

    /// Signals that no further heads will be delivered.
    pub async fn complete(&self) {
        let _ = self.tx.send(HeadEvent::Completed).await;
    }

    /// Signals a terminal error on the client's channel.
    pub async fn error(&self, error: BroadcastError) {
        let _ = self.tx.send(HeadEvent::Error(error)).await;
    }
}

#[cfg(test)]
mod tests {
    use alloy_primitives::U256;

    use super::*;
    use crate::test_utils::test_block;
    use crate::types::Chain;

    #[test]
    fn message_fields_from_block() {
        let mut block = test_block(Chain::Ethereum, 12_345);
        block.total_weight = U256::from(0x01_00_ffu64);
        let msg = ChainHeadMessage::from_block(&block);

        assert_eq!(msg.chain, 100);
        assert_eq!(msg.height, 12_345);
        assert_eq!(msg.timestamp, block.timestamp_millis());
        // big-endian, leading zeros trimmed
        assert_eq!(msg.weight, vec![0x01, 0x00, 0xff]);
        assert_eq!(msg.block_id, block.hash_hex());
        assert!(!msg.block_id.starts_with("0x"));
    }

    #[test]
    fn message_bytes_roundtrip() {
        let msg = ChainHeadMessage::from_block(&test_block(Chain::EthereumClassic, 7));
        let decoded = ChainHeadMessage::from_bytes(&msg.to_bytes()).unwrap();
        assert_eq!(decoded, msg);
    }

    #[tokio::test]
    async fn send_reports_closed_channel() {
        let (sender, rx) = StreamSender::channel(1);
        drop(rx);
        let msg = ChainHeadMessage::from_block(&test_block(Chain::Ethereum, 1));
        assert!(!sender.send(msg).await);
    }

    #[test]
    fn sender_ids_are_unique() {
        let (a, _rx_a) = StreamSender::channel(1);
        let (b, _rx_b) = StreamSender::channel(1);
        assert_ne!(a.id(), b.id());
    }
}
