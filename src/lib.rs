//! # tankrelay
//!
//! **tankrelay** republishes the channels of one multiplexed tank-sensor feed as
//! independent per-channel endpoints.
//!
//! The upstream service exposes every tank through a single address whose
//! channel-id / level / capacity fields are overwritten each time it rotates to the
//! next tank. The relay reconciles two unreliable views of that feed into one
//! consistent reading per channel:
//! - **notifications**: fast, but level/capacity changes are skipped when the value
//!   equals the previous channel's;
//! - **polls**: slow, read with a double channel-id check so torn triples are dropped.
//!
//! Each channel then gets a supervisor that creates its endpoint lazily, keeps
//! `remaining = capacity * level / 100` up to date and runs a watchdog over the
//! connectivity flag.
//!
//! ## Architecture
//! ```text
//!        UpstreamBus (transport)                         Publish (transport)
//!          │        │                                        ▲
//!   resolve/read   notifications                             │ create / write
//!          │        │                                        │
//!          ▼        ▼                                        │
//! ┌────────────────────────────────────────────────────────────────────────┐
//! │ Relay (single task, select! loop)                                       │
//! │                                                                          │
//! │  FeedAccessor ─► SnapshotReader ─► FusionEngine ─► ChannelTable          │
//! │   (handles,       (double read,     (pending +      [ChannelSupervisor;  │
//! │    origin)         tear check)       stuck values)    N] (lazy endpoint, │
//! │                                         ▲             watchdog)          │
//! │             Inlet ─► mpsc ──────────────┘                                │
//! └──────────────────────────────────┬──────────────────────────────────────┘
//!                                    │ Event
//!                                    ▼
//!                          Bus (broadcast) ─► listener ─┬─► ConnectivityTracker
//!                                                       └─► SubscriberSet
//!                                                             ├─► LogWriter
//!                                                             └─► custom ...
//! ```
//!
//! ## Features
//! | Area            | Description                                                  | Key types                               |
//! |-----------------|--------------------------------------------------------------|-----------------------------------------|
//! | **Runtime**     | Scheduler, inbound queue, graceful shutdown                  | [`Relay`], [`RelayBuilder`], [`Inlet`]  |
//! | **Upstream**    | Handle cache, tear-resistant reads                           | [`upstream::FeedAccessor`], [`upstream::SnapshotReader`] |
//! | **Fusion**      | Notification/poll reconciliation                             | [`fusion::FusionEngine`]                |
//! | **Channels**    | Per-channel state, lazy endpoints, watchdog                  | [`channels::ChannelSupervisor`]         |
//! | **Events**      | Observability through a broadcast bus                        | [`Event`], [`EventKind`], [`subscribers::Subscribe`] |
//! | **Errors**      | Typed, mostly recoverable errors                             | [`RelayError`], [`RuntimeError`]        |
//! | **Configuration** | Central settings with validation                           | [`Config`]                              |
//!
//! ## Optional features
//! - `logging` (default): exports [`LogWriter`], a `tracing`-based subscriber.
//!
//! ## Example
//! ```rust
//! use std::sync::Arc;
//! use tankrelay::memory::{MemoryFeed, MemoryPublisher};
//! use tankrelay::{Config, Relay};
//!
//! #[tokio::main(flavor = "current_thread")]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let cfg = Config::default();
//!     let feed = Arc::new(MemoryFeed::new(cfg.upstream_address.clone()));
//!     let publisher = Arc::new(MemoryPublisher::new());
//!
//!     feed.set_present(true);
//!     feed.set_fields(1, 80, 500);
//!
//!     let mut relay = Relay::builder(cfg).build(feed, publisher.clone())?;
//!     relay.poll_once().await?;
//!
//!     assert_eq!(publisher.fields(1).map(|f| f.remaining), Some(400.0));
//!     Ok(())
//! }
//! ```

pub mod channels;
mod core;
mod error;
pub mod events;
pub mod fusion;
pub mod memory;
pub mod subscribers;
pub mod upstream;

// ---- Public re-exports ----

pub use crate::core::{Config, ConnectivityTracker, Inbound, Inlet, Relay, RelayBuilder};
pub use error::{BusFault, InletError, PublishError, RelayError, RuntimeError};
pub use events::{Event, EventKind};

// Optional: `tracing`-based logger subscriber.
// Enabled by default; disable with `--no-default-features`.
#[cfg(feature = "logging")]
pub use subscribers::LogWriter;
