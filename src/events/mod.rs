//! Relay events: types and broadcast bus.
//!
//! This module groups the event **data model** and the **bus** used to
//! publish/subscribe to events emitted by the accessor, fusion engine,
//! channel supervisors and the scheduler.
//!
//! ## Contents
//! - [`EventKind`], [`Event`] event classification and payload metadata
//! - [`Bus`] thin wrapper over `tokio::sync::broadcast`
//!
//! ## Quick reference
//! - **Publishers**: `FeedAccessor` (availability edges), `FusionEngine`
//!   (out-of-range ids, stuck promotions), `ChannelSupervisor` (creation and
//!   connectivity edges), `Relay` (shutdown), `SubscriberSet` workers.
//! - **Consumers**: the listener spawned by `RelayBuilder::build`, which updates
//!   the `ConnectivityTracker` and fans out to the `SubscriberSet` (`LogWriter`,
//!   user subscribers).

mod bus;
mod event;

pub use bus::Bus;
pub use event::{Event, EventKind};
