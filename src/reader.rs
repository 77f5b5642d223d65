// Copyright (c) Chaingate Contributors
// SPDX-License-Identifier: Apache-2.0

//! Composable key-value lookup sources.
//!
//! A [`Reader`] is a pure capability: given a key, it may asynchronously
//! produce a value. [`CompoundReader`] races several readers for the same
//! key and yields whichever produces a value first; the list order of the
//! readers carries no priority.

use std::sync::Arc;

use async_trait::async_trait;
use futures::stream::{FuturesUnordered, StreamExt};

/// Asynchronous key-to-optional-value lookup.
#[async_trait]
pub trait Reader<K, D>: Send + Sync {
    /// Looks `key` up, returning `None` when this source has no value for it.
    async fn read(&self, key: &K) -> Option<D>;
}

/// Races multiple readers for a single lookup.
///
/// All wrapped readers are queried concurrently. The first one to complete
/// *with a value* wins; empty completions do not count. The overall read is
/// empty only once every reader has completed empty. Readers still in
/// flight when a winner is found are dropped, and their later completions
/// are never observed by the caller.
pub struct CompoundReader<K, D> {
    readers: Vec<Arc<dyn Reader<K, D>>>,
}

impl<K, D> CompoundReader<K, D> {
    #[must_use]
    pub fn new(readers: Vec<Arc<dyn Reader<K, D>>>) -> Self {
        Self { readers }
    }

    /// A compound over no sources; every read completes empty immediately.
    #[must_use]
    pub fn empty() -> Self {
        Self {
            readers: Vec::new(),
        }
    }

    pub fn push(&mut self, reader: Arc<dyn Reader<K, D>>) {
        self.readers.push(reader);
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.readers.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.readers.is_empty()
    }
}

#[async_trait]
impl<K, D> Reader<K, D> for CompoundReader<K, D>
where
    K: Sync,
    D: Send,
{
    async fn read(&self, key: &K) -> Option<D> {
        if self.readers.is_empty() {
            return None;
        }
        let mut in_flight: FuturesUnordered<_> =
            self.readers.iter().map(|reader| reader.read(key)).collect();
        while let Some(result) = in_flight.next().await {
            if result.is_some() {
                // dropping `in_flight` cancels the slower readers
                return result;
            }
        }
        None
    }
}
