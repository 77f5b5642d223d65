// Copyright (c) Chaingate Contributors
// SPDX-License-Identifier: Apache-2.0

//! End-to-end flows over the public API: a dispatcher-style quorum race,
//! reader composition over mixed sources, and the full subscribe →
//! bootstrap → live update → disconnect lifecycle of the head broadcast.

use std::sync::Arc;
use std::time::Duration;

use alloy_primitives::U256;
use async_trait::async_trait;
use bytes::Bytes;
use chaingate::broadcast::{HeadEvent, StreamHead, StreamSender};
use chaingate::quorum::{CallQuorum, NotLaggingQuorum, RpcError};
use chaingate::reader::{CompoundReader, Reader};
use chaingate::types::{Chain, ChainBlock};
use chaingate::upstream::{SimulatedUpstream, StaticUpstreams};
use time::OffsetDateTime;
use tokio::time::{sleep, timeout};

const WAIT: Duration = Duration::from_secs(2);

fn block(chain: Chain, height: u64) -> ChainBlock {
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

async fn recv(rx: &mut tokio::sync::mpsc::Receiver<HeadEvent>) -> HeadEvent {
    timeout(WAIT, rx.recv())
        .await
        .expect("timed out waiting for event")
        .expect("event channel closed")
}

/// Plays the dispatcher: issues the same request against three upstreams
/// with different latencies and lags, feeding every outcome into one
/// lag-aware quorum.
#[tokio::test]
async fn quorum_race_prefers_fresh_upstreams() {
    let quorum = Arc::new(NotLaggingQuorum::new(1));

    // the fastest upstream is far behind, the slowest errors out
    let calls: Vec<(Arc<SimulatedUpstream>, u64, Result<&str, RpcError>)> = vec![
        (
            Arc::new(SimulatedUpstream::new("behind").with_lag(10)),
            5,
            Ok("stale-answer"),
        ),
        (
            Arc::new(SimulatedUpstream::new("fresh")),
            20,
            Ok("fresh-answer"),
        ),
        (
            Arc::new(SimulatedUpstream::new("broken")),
            50,
            Err(RpcError::new(-32000, "connection reset")),
        ),
    ];

    let mut tasks = Vec::new();
    for (upstream, delay_ms, outcome) in calls {
        let quorum = Arc::clone(&quorum);
        tasks.push(tokio::spawn(async move {
            sleep(Duration::from_millis(delay_ms)).await;
            match outcome {
                Ok(payload) => {
                    quorum.record_response(Bytes::from_static(payload.as_bytes()), &*upstream);
                }
                Err(err) => quorum.record_error(&err, &*upstream),
            }
        }));
    }
    for task in tasks {
        task.await.unwrap();
    }

    assert!(quorum.is_resolved());
    assert!(!quorum.is_failed());
    assert_eq!(quorum.result(), Some(Bytes::from_static(b"fresh-answer")));
}

struct FixedReader {
    delay: Duration,
    value: Option<Bytes>,
}

#[async_trait]
impl Reader<u64, Bytes> for FixedReader {
    async fn read(&self, _key: &u64) -> Option<Bytes> {
        sleep(self.delay).await;
        self.value.clone()
    }
}

/// A cache-miss/remote-hit composition: the empty fast source must not
/// win over the slower source that actually has the value.
#[tokio::test]
async fn reader_race_returns_first_value() {
    let cache = Arc::new(FixedReader {
        delay: Duration::from_millis(1),
        value: None,
    });
    let remote = Arc::new(FixedReader {
        delay: Duration::from_millis(30),
        value: Some(Bytes::from_static(b"block-data")),
    });
    let compound = CompoundReader::new(vec![cache as Arc<dyn Reader<u64, Bytes>>, remote]);

    let found = timeout(WAIT, compound.read(&17)).await.unwrap();
    assert_eq!(found, Some(Bytes::from_static(b"block-data")));
}

#[tokio::test]
async fn head_broadcast_lifecycle() {
    let upstream = Arc::new(SimulatedUpstream::new("sim-eth"));
    let head = upstream.head_handle().unwrap();
    let upstreams = StaticUpstreams::new().with(Chain::Ethereum, upstream.clone() as _);
    let stream_head = Arc::new(StreamHead::new(Arc::new(upstreams)));
    stream_head.init().await;

    // early subscriber joins before any block exists: no bootstrap event
    let (early, mut early_rx) = StreamSender::channel(8);
    stream_head.add(Chain::Ethereum, early).await;

    head.push_block(block(Chain::Ethereum, 100));
    match recv(&mut early_rx).await {
        HeadEvent::Head(msg) => assert_eq!(msg.height, 100),
        other => panic!("expected head 100, got {other:?}"),
    }

    // late subscriber is bootstrapped with the current head immediately
    let (late, mut late_rx) = StreamSender::channel(8);
    stream_head.add(Chain::Ethereum, late).await;
    match recv(&mut late_rx).await {
        HeadEvent::Head(msg) => {
            assert_eq!(msg.height, 100);
            assert_eq!(msg.chain, 100);
            assert_eq!(msg.block_id, block(Chain::Ethereum, 100).hash_hex());
            assert_eq!(
                msg.weight,
                U256::from(100_000u64).to_be_bytes_trimmed_vec()
            );
        }
        other => panic!("expected bootstrap head, got {other:?}"),
    }

    // a live update reaches both subscribers
    head.push_block(block(Chain::Ethereum, 101));
    for rx in [&mut early_rx, &mut late_rx] {
        match recv(rx).await {
            HeadEvent::Head(msg) => assert_eq!(msg.height, 101),
            other => panic!("expected head 101, got {other:?}"),
        }
    }

    // permanent disconnect flushes one completion to each subscriber
    head.disconnect();
    for rx in [&mut early_rx, &mut late_rx] {
        assert!(matches!(recv(rx).await, HeadEvent::Completed));
    }

    // the chain stays registered: a future subscriber is accepted and
    // still bootstrapped with the last known head
    let (after, mut after_rx) = StreamSender::channel(8);
    stream_head.add(Chain::Ethereum, after).await;
    match recv(&mut after_rx).await {
        HeadEvent::Head(msg) => assert_eq!(msg.height, 101),
        other => panic!("expected bootstrap after close, got {other:?}"),
    }
}
