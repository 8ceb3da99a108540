//! Upstream side: the multiplexed feed and how it is read.
//!
//! ## Contents
//! - [`UpstreamBus`] the transport seam (resolve / read / owner)
//! - [`FeedAccessor`] cached handles with invalidate-on-fault recovery
//! - [`SnapshotReader`] double-read protocol producing consistent [`Snapshot`]s
//! - [`Field`], [`Value`], [`Notification`], [`OriginId`] data types
//!
//! ```text
//! UpstreamBus ◄── FeedAccessor ◄── SnapshotReader ──► Snapshot ──► FusionEngine
//!     │
//!     └── (transport) ──► Inlet ──► Notification ──► FusionEngine
//! ```

mod accessor;
mod bus;
mod reader;
mod value;

pub use accessor::{Availability, FeedAccessor, FeedHandles};
pub use bus::{Handle, UpstreamBus};
pub use reader::{Snapshot, SnapshotReader, TearPolicy};
pub use value::{Field, Notification, OriginId, SENTINEL, Value};
