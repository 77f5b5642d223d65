// Copyright (c) Chaingate Contributors
// SPDX-License-Identifier: Apache-2.0

//! Chain head broadcast.
//!
//! Turns one upstream head stream per chain into multi-subscriber push
//! delivery. Each chain with an available upstream head gets an entry in
//! the registry; subscribers attach with [`StreamHead::add`] and receive
//! the current best block immediately (bootstrap), then every new block as
//! it arrives. Delivery is fanned out independently per subscriber, so one
//! slow or broken client never blocks or fails delivery to the others.
//! Failed sends prune the subscriber; upstream stream completion flushes a
//! completion signal to every then-current subscriber exactly once.

mod sender;

use std::collections::HashMap;
use std::mem;
use std::sync::Arc;

use log::{debug, info, warn};
use thiserror::Error;
use tokio::sync::broadcast::error::RecvError;
use tokio::sync::{Mutex, RwLock};
use tokio_util::sync::CancellationToken;

pub use self::sender::{ChainHeadMessage, HeadEvent, StreamSender, SubscriberId};
use crate::types::{Chain, ChainBlock};
use crate::upstream::Upstreams;

/// Error delivered to a client whose subscription cannot be served.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum BroadcastError {
    #[error("chain {0} is not available for streaming")]
    ChainUnavailable(Chain),
}

/// Subscriber set of one chain, shared between the watch task, broadcast
/// fan-out tasks and concurrent subscribes.
type ChainClients = Arc<Mutex<Vec<StreamSender>>>;

/// Per-chain head broadcast registry.
///
/// A chain is present in the registry iff its upstream exposes a head;
/// absence means "chain not servable", not "zero subscribers".
pub struct StreamHead {
    upstreams: Arc<dyn Upstreams>,
    clients: RwLock<HashMap<Chain, ChainClients>>,
    cancel_token: CancellationToken,
}

impl StreamHead {
    #[must_use]
    pub fn new(upstreams: Arc<dyn Upstreams>) -> Self {
        Self {
            upstreams,
            clients: RwLock::new(HashMap::new()),
            cancel_token: CancellationToken::new(),
        }
    }

    /// Token cancelling all chain watch tasks on gateway shutdown.
    #[must_use]
    pub fn cancel_token(&self) -> CancellationToken {
        self.cancel_token.clone()
    }

    /// Registers every statically known chain whose upstream exposes a head
    /// and starts observing its head update stream.
    pub async fn init(self: &Arc<Self>) {
        for chain in Chain::ALL {
            let Some(upstream) = self.upstreams.upstream(chain) else {
                continue;
            };
            let Some(head) = upstream.head() else {
                debug!("upstream {} has no head, not serving {chain}", upstream.id());
                continue;
            };
            self.clients
                .write()
                .await
                .insert(chain, Arc::new(Mutex::new(Vec::new())));
            // subscribe before returning so no update can fall between
            // registration and the watch task starting up
            let updates = head.subscribe();
            let this = Arc::clone(self);
            tokio::spawn(this.watch(chain, updates));
        }
    }

    /// Subscribes `sender` to head updates of `chain`.
    ///
    /// For an unavailable chain a terminal [`BroadcastError`] is delivered
    /// on the sender's channel and nothing is registered. Otherwise the
    /// sender joins the chain's subscriber set and the current best block,
    /// if one is known, is delivered to it alone right away.
    pub async fn add(&self, chain: Chain, sender: StreamSender) {
        let entry = self.clients.read().await.get(&chain).cloned();
        let Some(list) = entry else {
            warn!("rejecting subscription, chain {chain} is not available for streaming");
            sender.error(BroadcastError::ChainUnavailable(chain)).await;
            return;
        };
        list.lock().await.push(sender.clone());
        self.bootstrap(chain, &list, &sender).await;
    }

    /// Number of current subscribers, or `None` for an unserved chain.
    pub async fn subscriber_count(&self, chain: Chain) -> Option<usize> {
        let list = self.clients.read().await.get(&chain).cloned()?;
        let count = list.lock().await.len();
        Some(count)
    }

    /// One-time delivery of the chain's current best block to a newly
    /// joined subscriber. A chain without a known head yet is a no-op.
    async fn bootstrap(&self, chain: Chain, list: &ChainClients, sender: &StreamSender) {
        let head = self.upstreams.upstream(chain).and_then(|u| u.head());
        let Some(block) = head.and_then(|h| h.current_block()) else {
            return;
        };
        if !deliver(&block, sender).await {
            prune(list, sender.id()).await;
        }
    }

    /// Follows one chain's head stream until it completes or the gateway
    /// shuts down.
    async fn watch(
        self: Arc<Self>,
        chain: Chain,
        mut updates: tokio::sync::broadcast::Receiver<ChainBlock>,
    ) {
        loop {
            tokio::select! {
                () = self.cancel_token.cancelled() => return,
                update = updates.recv() => match update {
                    Ok(block) => self.on_block(chain, block).await,
                    Err(RecvError::Lagged(missed)) => {
                        warn!("head stream for {chain} lagged, skipped {missed} blocks");
                    }
                    Err(RecvError::Closed) => {
                        self.on_complete(chain).await;
                        return;
                    }
                },
            }
        }
    }

    /// Fans a new block out to every current subscriber, independently.
    /// Subscribers whose send fails are pruned on the spot.
    async fn on_block(&self, chain: Chain, block: ChainBlock) {
        info!("new block {} on {chain}", block.height);
        let Some(list) = self.clients.read().await.get(&chain).cloned() else {
            return;
        };
        let snapshot = list.lock().await.clone();
        for sender in snapshot {
            let list = Arc::clone(&list);
            let block = block.clone();
            tokio::spawn(async move {
                if !deliver(&block, &sender).await {
                    prune(&list, sender.id()).await;
                }
            });
        }
    }

    /// Handles upstream head stream completion: swaps the subscriber set
    /// for a fresh one and signals completion to every drained subscriber.
    /// The chain itself stays registered.
    async fn on_complete(&self, chain: Chain) {
        info!("closing streams for {chain}");
        let Some(list) = self.clients.read().await.get(&chain).cloned() else {
            return;
        };
        let drained = mem::take(&mut *list.lock().await);
        for sender in drained {
            sender.complete().await;
        }
    }
}

/// Builds the outbound notification for `block` and attempts the send.
/// Returns `false` when the client is gone.
async fn deliver(block: &ChainBlock, sender: &StreamSender) -> bool {
    let sent = sender.send(ChainHeadMessage::from_block(block)).await;
    if !sent {
        debug!(
            "send of block {} on {} failed, dropping subscriber {}",
            block.height,
            block.chain,
            sender.id()
        );
    }
    sent
}

/// Removes one subscriber from a chain's set.
async fn prune(list: &ChainClients, id: SubscriberId) {
    list.lock().await.retain(|sender| sender.id() != id);
}
