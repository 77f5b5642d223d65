// Copyright (c) Chaingate Contributors
// SPDX-License-Identifier: Apache-2.0

//! In-process upstream implementation for tests and local runs.
//!
//! A [`SimulatedUpstream`] is driven entirely from the test (or demo) side:
//! blocks are injected with [`SimulatedHead::push_block`], lag is scripted
//! with [`SimulatedUpstream::set_lag`], and a permanent disconnect is forced
//! with [`SimulatedHead::disconnect`].

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, RwLock};

use tokio::sync::broadcast;

use super::{Head, Upstream};
use crate::types::ChainBlock;

/// Capacity of the head update channel; stale subscribers see `Lagged`.
const HEAD_CHANNEL_SIZE: usize = 64;

/// Scriptable chain head.
pub struct SimulatedHead {
    current: RwLock<Option<ChainBlock>>,
    // `None` once the upstream is permanently disconnected
    sender: Mutex<Option<broadcast::Sender<ChainBlock>>>,
}

impl SimulatedHead {
    #[must_use]
    pub fn new() -> Self {
        let (sender, _) = broadcast::channel(HEAD_CHANNEL_SIZE);
        Self {
            current: RwLock::new(None),
            sender: Mutex::new(Some(sender)),
        }
    }

    /// Injects a new best block and notifies all live subscribers.
    ///
    /// Has no effect after [`Self::disconnect`].
    pub fn push_block(&self, block: ChainBlock) {
        let sender = self.sender.lock().expect("head sender lock");
        let Some(sender) = sender.as_ref() else {
            return;
        };
        *self.current.write().expect("head block lock") = Some(block.clone());
        // no receivers is fine, the head state is still updated
        let _ = sender.send(block);
    }

    /// Permanently closes the head stream, as if the upstream connection
    /// dropped for good. All subscribers observe a closed channel.
    pub fn disconnect(&self) {
        self.sender.lock().expect("head sender lock").take();
    }
}

impl Default for SimulatedHead {
    fn default() -> Self {
        Self::new()
    }
}

impl Head for SimulatedHead {
    fn current_block(&self) -> Option<ChainBlock> {
        self.current.read().expect("head block lock").clone()
    }

    fn subscribe(&self) -> broadcast::Receiver<ChainBlock> {
        let sender = self.sender.lock().expect("head sender lock");
        match sender.as_ref() {
            Some(sender) => sender.subscribe(),
            // already disconnected: hand out a receiver that is closed
            None => broadcast::channel(1).1,
        }
    }
}

/// Scriptable [`Upstream`] backed by a [`SimulatedHead`].
pub struct SimulatedUpstream {
    id: String,
    lag: AtomicU64,
    head: Option<Arc<SimulatedHead>>,
}

impl SimulatedUpstream {
    /// Creates an upstream with a fresh head and zero lag.
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            lag: AtomicU64::new(0),
            head: Some(Arc::new(SimulatedHead::new())),
        }
    }

    /// Creates an upstream that does not track a chain head at all.
    #[must_use]
    pub fn without_head(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            lag: AtomicU64::new(0),
            head: None,
        }
    }

    /// Sets the initial lag.
    #[must_use]
    pub fn with_lag(self, lag: u64) -> Self {
        self.lag.store(lag, Ordering::Relaxed);
        self
    }

    /// Changes the reported lag at runtime.
    pub fn set_lag(&self, lag: u64) {
        self.lag.store(lag, Ordering::Relaxed);
    }

    /// Direct handle to the simulated head, for injecting blocks.
    #[must_use]
    pub fn head_handle(&self) -> Option<Arc<SimulatedHead>> {
        self.head.clone()
    }
}

impl Upstream for SimulatedUpstream {
    fn id(&self) -> &str {
        &self.id
    }

    fn lag(&self) -> u64 {
        self.lag.load(Ordering::Relaxed)
    }

    fn head(&self) -> Option<Arc<dyn Head>> {
        self.head
            .clone()
            .map(|head| head as Arc<dyn Head>)
    }
}

#[cfg(test)]
mod tests {
    use tokio::sync::broadcast::error::RecvError;

    use super::*;
    use crate::test_utils::test_block;
    use crate::types::Chain;

    #[tokio::test]
    async fn push_updates_current_and_notifies() {
        let head = SimulatedHead::new();
        assert!(head.current_block().is_none());

        let mut rx = head.subscribe();
        let block = test_block(Chain::Ethereum, 100);
        head.push_block(block.clone());

        assert_eq!(head.current_block(), Some(block.clone()));
        assert_eq!(rx.recv().await.unwrap(), block);
    }

    #[tokio::test]
    async fn disconnect_closes_stream() {
        let head = SimulatedHead::new();
        let mut rx = head.subscribe();
        head.disconnect();
        assert!(matches!(rx.recv().await, Err(RecvError::Closed)));

        // a late subscriber gets an already-closed stream
        let mut late = head.subscribe();
        assert!(matches!(late.recv().await, Err(RecvError::Closed)));

        // pushes after disconnect are dropped
        head.push_block(test_block(Chain::Ethereum, 101));
        assert!(head.current_block().is_none());
    }

    #[test]
    fn lag_is_scriptable() {
        let upstream = SimulatedUpstream::new("sim").with_lag(3);
        assert_eq!(upstream.lag(), 3);
        upstream.set_lag(0);
        assert_eq!(upstream.lag(), 0);
        assert!(upstream.head().is_some());
        assert!(SimulatedUpstream::without_head("bare").head().is_none());
    }
}
