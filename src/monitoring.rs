// Copyright (c) Chaingate Contributors
// SPDX-License-Identifier: Apache-2.0

//! Access log written as JSON lines to a file.
//!
//! Records are submitted from request handling paths without blocking:
//! [`FileLogWriter::submit`] enqueues onto a bounded channel and a
//! background task batches writes to disk, flushing when the batch limit
//! is hit, on a timer, and on explicit [`FileLogWriter::flush`]. When the
//! queue is full records are dropped with a warning rather than slowing
//! down request handling.

use std::path::Path;
use std::time::Duration;

use log::warn;
use serde::Serialize;
use time::OffsetDateTime;
use tokio::fs::{File, OpenOptions};
use tokio::io::AsyncWriteExt;
use tokio::sync::{mpsc, oneshot};
use tokio::time::MissedTickBehavior;

use crate::types::Chain;

/// Schema version stamped on every record.
pub const ACCESS_LOG_VERSION: &str = "accesslog/v1";

/// Capacity of the submit queue.
const QUEUE_LIMIT: usize = 4096;

/// Origin of a request, as seen at the network boundary.
#[derive(Clone, Debug, Serialize)]
pub struct Remote {
    /// All addresses on the path, proxies included.
    pub ips: Vec<String>,
    /// The effective client address.
    pub ip: String,
    pub user_agent: String,
}

/// Details of one handled request.
#[derive(Clone, Debug, Serialize)]
pub struct RequestDetails {
    pub id: u64,
    #[serde(with = "time::serde::rfc3339")]
    pub start: OffsetDateTime,
    pub remote: Remote,
}

/// One access log line.
#[derive(Clone, Debug, Serialize)]
pub struct AccessRecord {
    pub version: &'static str,
    pub method: String,
    pub blockchain: String,
    pub id: u64,
    pub request: RequestDetails,
}

impl AccessRecord {
    #[must_use]
    pub fn new(method: impl Into<String>, chain: Chain, request: RequestDetails) -> Self {
        Self {
            version: ACCESS_LOG_VERSION,
            method: method.into(),
            blockchain: chain.code().to_owned(),
            id: request.id,
            request,
        }
    }
}

enum Command {
    Submit(AccessRecord),
    Flush(oneshot::Sender<()>),
}

/// Buffered JSONL writer with a background flush task.
pub struct FileLogWriter {
    tx: mpsc::Sender<Command>,
}

impl FileLogWriter {
    /// Opens (or creates) the log file in append mode and starts the
    /// writer task.
    ///
    /// `flush_interval` bounds how long a record can sit in the buffer;
    /// `batch_limit` forces a write once that many records are buffered.
    ///
    /// # Errors
    ///
    /// Returns the underlying I/O error when the file cannot be opened.
    pub async fn create(
        path: impl AsRef<Path>,
        flush_interval: Duration,
        batch_limit: usize,
    ) -> std::io::Result<Self> {
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .await?;
        let (tx, rx) = mpsc::channel(QUEUE_LIMIT);
        tokio::spawn(writer_loop(file, rx, flush_interval, batch_limit));
        Ok(Self { tx })
    }

    /// Enqueues one record. Never blocks; drops the record with a warning
    /// when the queue is full or the writer task is gone.
    pub fn submit(&self, record: AccessRecord) {
        if let Err(err) = self.tx.try_send(Command::Submit(record)) {
            warn!("access log queue full, dropping record: {err}");
        }
    }

    /// Enqueues a batch of records.
    pub fn submit_all(&self, records: impl IntoIterator<Item = AccessRecord>) {
        for record in records {
            self.submit(record);
        }
    }

    /// Forces all buffered records to disk and waits until they are
    /// written.
    pub async fn flush(&self) {
        let (ack_tx, ack_rx) = oneshot::channel();
        if self.tx.send(Command::Flush(ack_tx)).await.is_ok() {
            let _ = ack_rx.await;
        }
    }
}

async fn writer_loop(
    mut file: File,
    mut rx: mpsc::Receiver<Command>,
    flush_interval: Duration,
    batch_limit: usize,
) {
    let mut buffer: Vec<AccessRecord> = Vec::new();
    let mut ticker = tokio::time::interval(flush_interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
    loop {
        tokio::select! {
            command = rx.recv() => match command {
                Some(Command::Submit(record)) => {
                    buffer.push(record);
                    if buffer.len() >= batch_limit {
                        write_out(&mut file, &mut buffer).await;
                    }
                }
                Some(Command::Flush(ack)) => {
                    write_out(&mut file, &mut buffer).await;
                    let _ = ack.send(());
                }
                // writer dropped: final flush, then stop
                None => {
                    write_out(&mut file, &mut buffer).await;
                    return;
                }
            },
            _ = ticker.tick() => {
                if !buffer.is_empty() {
                    write_out(&mut file, &mut buffer).await;
                }
            }
        }
    }
}

async fn write_out(file: &mut File, buffer: &mut Vec<AccessRecord>) {
    for record in buffer.drain(..) {
        let mut line = match serde_json::to_vec(&record) {
            Ok(line) => line,
            Err(err) => {
                warn!("cannot serialize access record: {err}");
                continue;
            }
        };
        line.push(b'\n');
        if let Err(err) = file.write_all(&line).await {
            warn!("cannot write access log: {err}");
        }
    }
    if let Err(err) = file.flush().await {
        warn!("cannot flush access log: {err}");
    }
}
