// Copyright (c) Chaingate Contributors
// SPDX-License-Identifier: Apache-2.0

//! Demo gateway: serves configured chains from simulated upstreams and
//! logs every broadcast head until interrupted.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use alloy_primitives::U256;
use chaingate::broadcast::{HeadEvent, StreamHead, StreamSender};
use chaingate::config::GatewayConfig;
use chaingate::logging;
use chaingate::monitoring::{AccessRecord, FileLogWriter, Remote, RequestDetails};
use chaingate::types::{Chain, ChainBlock};
use chaingate::upstream::{SimulatedHead, SimulatedUpstream, StaticUpstreams};
use clap::Parser;
use color_eyre::Result;
use log::{info, warn};
use rand::Rng;
use time::OffsetDateTime;
use tokio::time::sleep;

/// Interval between demo blocks, before jitter.
const BLOCK_INTERVAL: Duration = Duration::from_secs(2);

#[derive(Debug, Parser)]
#[command(name = "chaingate", about = "Blockchain RPC gateway demo")]
struct Args {
    /// Path to a gateway TOML config; a built-in two-chain demo config is
    /// used when omitted.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Write a JSONL access log to this file.
    #[arg(long)]
    access_log: Option<PathBuf>,
}

const DEMO_CONFIG: &str = r#"
    version = "v1"

    [[upstreams]]
    id = "demo-eth"
    chain = "ETH"

    [[upstreams]]
    id = "demo-etc"
    chain = "ETC"
"#;

#[tokio::main]
async fn main() -> Result<()> {
    color_eyre::install()?;
    logging::enable_logforth();

    let args = Args::parse();
    let config = match &args.config {
        Some(path) => GatewayConfig::from_file(path)?,
        None => GatewayConfig::parse(DEMO_CONFIG)?,
    };
    let access_log = match &args.access_log {
        Some(path) => Some(FileLogWriter::create(path, Duration::from_secs(1), 100).await?),
        None => None,
    };

    // one simulated upstream per configured chain
    let mut registry = StaticUpstreams::new();
    let mut served = Vec::new();
    for chain in Chain::ALL {
        let Some(upstream_config) = config.upstreams_for(chain).next() else {
            continue;
        };
        let upstream = Arc::new(SimulatedUpstream::new(upstream_config.id.clone()));
        let head = upstream.head_handle().expect("simulated upstream has a head");
        info!("serving {chain} from upstream {}", upstream_config.id);
        registry.insert(chain, upstream);
        served.push((chain, head));
    }

    let stream_head = Arc::new(StreamHead::new(Arc::new(registry)));
    stream_head.init().await;

    for (request_id, (chain, head)) in served.into_iter().enumerate() {
        tokio::spawn(produce_blocks(chain, head));

        let (sender, receiver) = StreamSender::channel(16);
        stream_head.add(chain, sender).await;
        tokio::spawn(watch_heads(chain, receiver));

        if let Some(log) = &access_log {
            log.submit(AccessRecord::new(
                "SubscribeHead",
                chain,
                RequestDetails {
                    id: request_id as u64,
                    start: OffsetDateTime::now_utc(),
                    remote: Remote {
                        ips: vec!["127.0.0.1".into()],
                        ip: "127.0.0.1".into(),
                        user_agent: "chaingate-demo".into(),
                    },
                },
            ));
        }
    }

    tokio::signal::ctrl_c().await?;
    warn!("shutting down");
    stream_head.cancel_token().cancel();
    if let Some(log) = &access_log {
        log.flush().await;
    }
    Ok(())
}

/// Pushes a new block every couple of seconds, with some jitter.
async fn produce_blocks(chain: Chain, head: Arc<SimulatedHead>) {
    let mut height = 0u64;
    let mut weight = U256::ZERO;
    loop {
        let jitter = rand::rng().random_range(0..500);
        sleep(BLOCK_INTERVAL + Duration::from_millis(jitter)).await;

        height += 1;
        weight += U256::from(rand::rng().random_range(1_000u64..2_000));
        head.push_block(ChainBlock {
            chain,
            height,
            timestamp: OffsetDateTime::now_utc(),
            total_weight: weight,
            hash: rand::rng().random(),
        });
    }
}

/// Logs everything delivered on one subscription.
async fn watch_heads(chain: Chain, mut receiver: tokio::sync::mpsc::Receiver<HeadEvent>) {
    while let Some(event) = receiver.recv().await {
        match event {
            HeadEvent::Head(msg) => {
                info!("{chain} head {} ({} bytes on the wire)", msg.height, msg.to_bytes().len());
            }
            HeadEvent::Completed => {
                info!("{chain} head stream completed");
                return;
            }
            HeadEvent::Error(err) => {
                warn!("{chain} subscription failed: {err}");
                return;
            }
        }
    }
}
