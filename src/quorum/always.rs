// Copyright (c) Chaingate Contributors
// SPDX-License-Identifier: Apache-2.0

use std::sync::Mutex;

use bytes::Bytes;

use super::{CallQuorum, QuorumState, RpcError};
use crate::upstream::Upstream;

/// Simplest quorum: the first successful response wins, no matter how far
/// behind the answering upstream is.
///
/// Useful for calls whose answer does not depend on chain freshness, e.g.
/// static node properties.
#[derive(Debug, Default)]
pub struct AlwaysQuorum {
    state: Mutex<QuorumState>,
}

impl AlwaysQuorum {
    #[must_use]
    pub fn new() -> Self {
        Self {
            state: Mutex::new(QuorumState::Pending),
        }
    }
}

impl CallQuorum for AlwaysQuorum {
    fn record_response(&self, response: Bytes, _upstream: &dyn Upstream) -> bool {
        let mut state = self.state.lock().expect("quorum state lock");
        match *state {
            QuorumState::Pending => {
                *state = QuorumState::Resolved(response);
                true
            }
            QuorumState::Resolved(_) | QuorumState::Failed => false,
        }
    }

    fn record_error(&self, _error: &RpcError, _upstream: &dyn Upstream) {
        let mut state = self.state.lock().expect("quorum state lock");
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

#[cfg(test)]
mod tests {
    use super::*;
    use crate::upstream::SimulatedUpstream;

    #[test]
    fn accepts_lagging_upstream() {
        let quorum = AlwaysQuorum::new();
        let behind = SimulatedUpstream::new("behind").with_lag(100);
        assert!(quorum.record_response(Bytes::from_static(b"old"), &behind));
        assert!(quorum.is_resolved());
        assert_eq!(quorum.result(), Some(Bytes::from_static(b"old")));
    }

    #[test]
    fn error_only_counts_while_pending() {
        let quorum = AlwaysQuorum::new();
        let upstream = SimulatedUpstream::new("up");
        assert!(quorum.record_response(Bytes::from_static(b"ok"), &upstream));
        quorum.record_error(&RpcError::new(-32000, "late"), &upstream);
        assert!(quorum.is_resolved());
        assert!(!quorum.is_failed());
    }
}
