// Copyright (c) Chaingate Contributors
// SPDX-License-Identifier: Apache-2.0

//! Chaingate: decision core of a multi-upstream blockchain RPC gateway.
//!
//! The gateway fans each client request out to several upstream nodes and
//! needs two decisions made correctly under concurrency: which of the
//! returned answers is authoritative, and how to push the continuously
//! updating chain head to any number of long-lived subscribers without
//! letting one slow client hold up the rest.
//!
//! - [`quorum`] resolves N concurrent upstream call outcomes into one
//!   result or a definitive failure, with pluggable policies.
//! - [`reader`] races multiple lookup sources for a single key.
//! - [`broadcast`] turns one head stream per chain into per-subscriber
//!   push delivery with bootstrap-on-subscribe.
//!
//! The upstream transport itself stays behind the [`upstream`] traits.

#![deny(rustdoc::broken_intra_doc_links)]

pub mod broadcast;
pub mod config;
pub mod logging;
pub mod monitoring;
pub mod quorum;
pub mod reader;
#[cfg(test)]
pub mod test_utils;
pub mod types;
pub mod upstream;

pub use self::broadcast::{BroadcastError, ChainHeadMessage, HeadEvent, StreamHead, StreamSender};
pub use self::config::GatewayConfig;
pub use self::quorum::{AlwaysQuorum, CallQuorum, NotLaggingQuorum, RpcError};
pub use self::reader::{CompoundReader, Reader};
pub use self::types::{BlockHash, Chain, ChainBlock};
pub use self::upstream::{Head, Upstream, Upstreams};
