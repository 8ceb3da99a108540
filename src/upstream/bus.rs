//! # Upstream bus collaborator
//!
//! `UpstreamBus` is the seam between the relay and whatever transport reaches the
//! multiplexed feed (a system message bus in production, [`MemoryFeed`] in tests).
//!
//! ## Contract
//! - Calls are request/response and must fail fast; the scheduler awaits them
//!   inline on its single task.
//! - Any `Err` is treated as "upstream unavailable": the accessor drops its handles
//!   and re-resolves on the next tick.
//! - Subscriptions are not part of this trait: the transport pushes
//!   [`Notification`](super::Notification)s into the relay's inbound queue through
//!   an [`Inlet`](crate::Inlet).
//!
//! [`MemoryFeed`]: crate::memory::MemoryFeed

use async_trait::async_trait;

use crate::error::BusFault;

use super::value::{Field, OriginId, Value};

/// Opaque handle to a resolved upstream field.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Handle {
    field: Field,
    key: u64,
}

impl Handle {
    /// Creates a handle; `key` is chosen by the transport.
    pub fn new(field: Field, key: u64) -> Self {
        Self { field, key }
    }

    pub fn field(&self) -> Field {
        self.field
    }

    pub fn key(&self) -> u64 {
        self.key
    }
}

/// Request/response access to the upstream feed.
#[async_trait]
pub trait UpstreamBus: Send + Sync + 'static {
    /// Resolves a handle to `field` on the service at `address`.
    async fn resolve(&self, address: &str, field: Field) -> Result<Handle, BusFault>;

    /// Reads the current value behind a handle.
    async fn read(&self, handle: &Handle) -> Result<Value, BusFault>;

    /// Returns the unique id of the connection currently owning `address`.
    async fn owner(&self, address: &str) -> Result<OriginId, BusFault>;
}
