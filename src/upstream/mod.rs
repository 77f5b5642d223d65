// Copyright (c) Chaingate Contributors
// SPDX-License-Identifier: Apache-2.0

//! Upstream node abstractions.
//!
//! An [`Upstream`] is one connected blockchain node the gateway can query.
//! Its [`Head`] exposes the best block known to that node plus a live,
//! multicast stream of new blocks. [`Upstreams`] is the per-chain registry
//! through which the rest of the gateway finds them.
//!
//! The actual connection/transport layer lives behind these traits. The
//! in-tree [`SimulatedUpstream`] implementation backs tests and the demo
//! binary.

pub mod simulated;

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::broadcast;

pub use self::simulated::{SimulatedHead, SimulatedUpstream};
use crate::types::{Chain, ChainBlock};

/// One connected blockchain node.
pub trait Upstream: Send + Sync {
    /// Identifier of this upstream, for logs and configuration.
    fn id(&self) -> &str;

    /// How many blocks this node currently is behind the best known head.
    fn lag(&self) -> u64;

    /// The node's chain head, if the node is able to track one.
    fn head(&self) -> Option<Arc<dyn Head>>;
}

/// Best-block state of one chain, with a live update stream.
pub trait Head: Send + Sync {
    /// The current best block, or `None` if no block has been seen yet.
    fn current_block(&self) -> Option<ChainBlock>;

    /// Subscribes to new blocks.
    ///
    /// The returned receiver yields every block from this point on and
    /// closes only when the upstream connection is permanently gone.
    fn subscribe(&self) -> broadcast::Receiver<ChainBlock>;
}

/// Registry of upstreams by chain.
pub trait Upstreams: Send + Sync {
    /// The upstream serving `chain`, if any is configured.
    fn upstream(&self, chain: Chain) -> Option<Arc<dyn Upstream>>;
}

/// A fixed in-memory [`Upstreams`] registry.
#[derive(Default)]
pub struct StaticUpstreams {
    map: HashMap<Chain, Arc<dyn Upstream>>,
}

impl StaticUpstreams {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `upstream` for `chain`, replacing any previous entry.
    #[must_use]
    pub fn with(mut self, chain: Chain, upstream: Arc<dyn Upstream>) -> Self {
        self.map.insert(chain, upstream);
        self
    }

    pub fn insert(&mut self, chain: Chain, upstream: Arc<dyn Upstream>) {
        self.map.insert(chain, upstream);
    }
}

impl Upstreams for StaticUpstreams {
    fn upstream(&self, chain: Chain) -> Option<Arc<dyn Upstream>> {
        self.map.get(&chain).cloned()
    }
}
