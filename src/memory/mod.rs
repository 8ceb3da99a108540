//! In-memory collaborators.
//!
//! [`MemoryFeed`] implements [`UpstreamBus`](crate::upstream::UpstreamBus) and
//! [`MemoryPublisher`] implements [`Publish`](crate::channels::Publish). They back the
//! crate's tests and the simulated-feed demo, and are handy for exercising a relay
//! without a system bus.

mod feed;
mod publisher;

pub use feed::MemoryFeed;
pub use publisher::MemoryPublisher;
