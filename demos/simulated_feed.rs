//! # Example: simulated_feed
//!
//! Drives a relay from an in-memory feed that rotates through four tanks the way
//! a multiplexing sensor gateway does.
//!
//! Shows how to:
//! - Wire [`MemoryFeed`] / [`MemoryPublisher`] into [`Relay::builder`].
//! - Push notifications through an [`Inlet`](tankrelay::Inlet), skipping level and
//!   capacity changes that repeat the previous tank's value.
//! - Attach [`LogWriter`] plus a custom [`Subscribe`] implementation.
//! - Lose and regain the upstream, and stop the relay with a cancellation token.
//!
//! ## Flow
//! ```text
//! rotator task ──► MemoryFeed.change() ──► Inlet.notify() ──► Relay (notification path)
//!                                              Relay poll tick ──► MemoryFeed.read()
//! Relay ──► MemoryPublisher (endpoints)
//!       └─► Bus ──► LogWriter (tracing) + EdgeCounter
//! ```
//!
//! ## Run
//! ```bash
//! RUST_LOG=tankrelay=debug cargo run --example simulated_feed
//! ```

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use tankrelay::memory::{MemoryFeed, MemoryPublisher};
use tankrelay::subscribers::Subscribe;
use tankrelay::upstream::{Field, SENTINEL};
use tankrelay::{Config, Event, EventKind, LogWriter, Relay};
use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;

/// Counts connectivity edges; a real deployment might raise alarms here.
#[derive(Default)]
struct EdgeCounter {
    up: AtomicUsize,
    down: AtomicUsize,
}

#[async_trait::async_trait]
impl Subscribe for EdgeCounter {
    async fn on_event(&self, ev: &Event) {
        match ev.kind {
            EventKind::ChannelConnected => {
                self.up.fetch_add(1, Ordering::Relaxed);
            }
            EventKind::ChannelDisconnected => {
                self.down.fetch_add(1, Ordering::Relaxed);
            }
            _ => {}
        }
    }

    fn name(&self) -> &'static str {
        "edge-counter"
    }
}

/// (channel, level %, capacity) as reported by the gateway.
const TANKS: [(i64, i64, i64); 4] = [(0, 80, 500), (1, 80, 300), (2, SENTINEL, 300), (3, 15, 200)];

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("tankrelay=info")),
        )
        .init();

    let cfg = Config {
        poll_period: Duration::from_millis(700),
        watchdog_timeout: Duration::from_secs(4),
        stuck_threshold: 4,
        ..Config::default()
    };
    let feed = Arc::new(MemoryFeed::new(cfg.upstream_address.clone()));
    let publisher = Arc::new(MemoryPublisher::new());
    let edges = Arc::new(EdgeCounter::default());

    let relay = Relay::builder(cfg)
        .with_subscriber(Arc::new(LogWriter::new()))
        .with_subscriber(edges.clone())
        .build(feed.clone(), publisher.clone())?;
    let inlet = relay.inlet();
    let token = CancellationToken::new();
    let relay_task = tokio::spawn(relay.run(token.clone()));

    feed.set_present(true);
    let rotator = {
        let feed = Arc::clone(&feed);
        let token = token.clone();
        tokio::spawn(async move {
            let mut previous = (SENTINEL, SENTINEL);
            let mut step = 0usize;
            while !token.is_cancelled() {
                let (channel, level, capacity) = TANKS[step % TANKS.len()];
                step += 1;

                let mut changes = vec![(Field::ChannelId, channel)];
                if level != previous.0 {
                    changes.push((Field::Level, level));
                }
                if capacity != previous.1 {
                    changes.push((Field::Capacity, capacity));
                }
                previous = (level, capacity);

                for (field, value) in changes {
                    if let Some(note) = feed.change(field, value) {
                        let _ = inlet.notify(note);
                    }
                }
                tokio::time::sleep(Duration::from_millis(450)).await;
            }
        })
    };

    tokio::time::sleep(Duration::from_secs(6)).await;
    tracing::info!("simulating upstream loss");
    feed.set_present(false);
    tokio::time::sleep(Duration::from_secs(6)).await;
    tracing::info!("upstream back");
    feed.set_present(true);
    tokio::time::sleep(Duration::from_secs(4)).await;

    token.cancel();
    let _ = rotator.await;
    relay_task.await??;

    for channel in publisher.channels() {
        if let Some(fields) = publisher.fields(channel) {
            println!(
                "tank {channel}: level={} capacity={} remaining={} connected={}",
                fields.level, fields.capacity, fields.remaining, fields.connected
            );
        }
    }
    println!(
        "edges: connected={} disconnected={}",
        edges.up.load(Ordering::Relaxed),
        edges.down.load(Ordering::Relaxed)
    );
    Ok(())
}
