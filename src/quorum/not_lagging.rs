// Copyright (c) Chaingate Contributors
// SPDX-License-Identifier: Apache-2.0

use std::sync::Mutex;

use bytes::Bytes;

use super::{CallQuorum, QuorumState, RpcError};
use crate::upstream::Upstream;

/// Lag-aware quorum: the first response from an upstream that is at most
/// `max_lag` blocks behind the best known head wins.
///
/// Upstreams that are further behind may hold stale-but-not-wrong data, so
/// they are excluded from both resolving and failing the quorum: their
/// responses and errors are silently ignored. If every participating
/// upstream is lagging the quorum stays pending forever; bounding that is
/// the dispatcher's timeout, not this policy.
#[derive(Debug)]
pub struct NotLaggingQuorum {
    max_lag: u64,
    state: Mutex<QuorumState>,
}

impl NotLaggingQuorum {
    #[must_use]
    pub fn new(max_lag: u64) -> Self {
        Self {
            max_lag,
            state: Mutex::new(QuorumState::Pending),
        }
    }

    /// Maximum acceptable lag, in blocks.
    #[must_use]
    pub const fn max_lag(&self) -> u64 {
        self.max_lag
    }
}

impl Default for NotLaggingQuorum {
    fn default() -> Self {
        Self::new(0)
    }
}

impl CallQuorum for NotLaggingQuorum {
    fn record_response(&self, response: Bytes, upstream: &dyn Upstream) -> bool {
        if upstream.lag() > self.max_lag {
            return false;
        }
        let mut state = self.state.lock().expect("quorum state lock");
        match *state {
            QuorumState::Pending => {
                *state = QuorumState::Resolved(response);
                true
            }
            // first acceptable response won already, or the quorum failed
            QuorumState::Resolved(_) | QuorumState::Failed => false,
        }
    }

    fn record_error(&self, _error: &RpcError, upstream: &dyn Upstream) {
        if upstream.lag() > self.max_lag {
            return;
        }
        let mut state = self.state.lock().expect("quorum state lock");
        // an error only counts while no acceptable answer has arrived;
        // resolution is terminal
        if matches!(*state, QuorumState::Pending) {
            *state = QuorumState::Failed;
        }
    }

    fn is_resolved(&self) -> bool {
        self.state.lock().expect("quorum state lock").is_resolved()
    }

    fn is_failed(&self) -> bool {
        self.state.lock().expect("quorum state lock").is_failed()
    }

    fn result(&self) -> Option<Bytes> {
        self.state.lock().expect("quorum state lock").result()
    }
}
