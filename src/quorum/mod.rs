// Copyright (c) Chaingate Contributors
// SPDX-License-Identifier: Apache-2.0

//! Quorum resolution over concurrent upstream calls.
//!
//! The dispatcher issues the same request to several upstreams in parallel
//! and feeds every outcome into one [`CallQuorum`] instance. The quorum
//! policy decides when the request is answered ([`CallQuorum::is_resolved`])
//! or definitively failed ([`CallQuorum::is_failed`]); everything else stays
//! pending and is bounded by the dispatcher's own timeout.
//!
//! Policies are interchangeable:
//! - [`NotLaggingQuorum`] accepts the first answer from an upstream that is
//!   not behind the canonical chain,
//! - [`AlwaysQuorum`] accepts the first answer from anyone.

mod always;
mod not_lagging;

use std::fmt;
use std::sync::Arc;

use bytes::Bytes;
use thiserror::Error;

pub use self::always::AlwaysQuorum;
pub use self::not_lagging::NotLaggingQuorum;
use crate::upstream::{Head, Upstream};

/// A failed remote RPC call, as reported by one upstream.
///
/// Never propagated out of the quorum; it is folded into quorum state and
/// the dispatcher only ever observes [`CallQuorum::is_failed`].
#[derive(Clone, Debug, Error, PartialEq, Eq)]
#[error("rpc error {code}: {message}")]
pub struct RpcError {
    pub code: i32,
    pub message: String,
}

impl RpcError {
    #[must_use]
    pub fn new(code: i32, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }
}

/// Aggregation policy turning N concurrent upstream call outcomes for one
/// logical request into a single result or failure.
///
/// One instance serves exactly one request. State transitions are monotonic:
/// once resolved an instance never becomes failed, and vice versa. All
/// methods take `&self` and must be safe under concurrent invocation from
/// multiple upstream-completion tasks.
pub trait CallQuorum: Send + Sync + fmt::Debug {
    /// Called once, before any record, with the chain's head state.
    /// Policies that do not need head context may ignore it.
    fn init(&self, _head: Arc<dyn Head>) {}

    /// Offers a successful response from `upstream`.
    ///
    /// Returns `true` iff this call transitioned the quorum to resolved,
    /// which tells the dispatcher to stop waiting for the remaining calls.
    fn record_response(&self, response: Bytes, upstream: &dyn Upstream) -> bool;

    /// Offers a failed call from `upstream`. Never resolves the quorum,
    /// but may transition it to failed.
    fn record_error(&self, error: &RpcError, upstream: &dyn Upstream);

    /// Whether an authoritative result is available.
    fn is_resolved(&self) -> bool;

    /// Whether the request definitively failed. Mutually exclusive with
    /// [`Self::is_resolved`]; both `false` means still pending.
    fn is_failed(&self) -> bool;

    /// The resolved response. `Some` iff [`Self::is_resolved`].
    fn result(&self) -> Option<Bytes>;
}

/// Terminal state shared by the quorum policies.
///
/// A single tagged value guarded by one lock, so that every transition is
/// one atomic decision: a resolved quorum can never be flipped to failed by
/// a late-arriving error, regardless of interleaving.
#[derive(Debug, Default)]
enum QuorumState {
    #[default]
    Pending,
    Resolved(Bytes),
    Failed,
}

impl QuorumState {
    const fn is_resolved(&self) -> bool {
        matches!(self, Self::Resolved(_))
    }

    const fn is_failed(&self) -> bool {
        matches!(self, Self::Failed)
    }

    fn result(&self) -> Option<Bytes> {
        match self {
            Self::Resolved(bytes) => Some(bytes.clone()),
            Self::Pending | Self::Failed => None,
        }
    }
}
