use std::sync::Arc;

use crate::channels::{ChannelTable, Publish};
use crate::core::Config;
use crate::error::RuntimeError;
use crate::events::Bus;
use crate::fusion::FusionEngine;
use crate::subscribers::{Subscribe, SubscriberSet};
use crate::upstream::{FeedAccessor, UpstreamBus};

use super::connectivity::ConnectivityTracker;
use super::relay::{Relay, RelayParts};

/// Builder for a [`Relay`].
pub struct RelayBuilder {
    cfg: Config,
    subscribers: Vec<Arc<dyn Subscribe>>,
}

impl RelayBuilder {
    pub fn new(cfg: Config) -> Self {
        Self {
            cfg,
            subscribers: Vec::new(),
        }
    }

    /// Replaces the event subscribers.
    ///
    /// Each subscriber gets a dedicated worker and bounded queue.
    pub fn with_subscribers(mut self, subscribers: Vec<Arc<dyn Subscribe>>) -> Self {
        self.subscribers = subscribers;
        self
    }

    /// Adds one event subscriber.
    pub fn with_subscriber(mut self, subscriber: Arc<dyn Subscribe>) -> Self {
        self.subscribers.push(subscriber);
        self
    }

    /// Validates the configuration and assembles the relay:
    /// - event bus, subscriber workers and the event listener
    /// - upstream accessor and fusion engine
    /// - one supervisor per channel id, all `Unpublished`
    ///
    /// Must be called inside a tokio runtime (workers are spawned here).
    pub fn build(
        self,
        upstream: Arc<dyn UpstreamBus>,
        publisher: Arc<dyn Publish>,
    ) -> Result<Relay, RuntimeError> {
        self.cfg.validate()?;

        let bus = Bus::new(self.cfg.bus_capacity_clamped());
        let subs = Arc::new(SubscriberSet::new(self.subscribers, bus.clone()));
        let space = self.cfg.channel_space();

        let accessor = FeedAccessor::new(upstream, self.cfg.upstream_address.as_str(), bus.clone());
        let engine = FusionEngine::new(space, self.cfg.stuck_threshold_clamped(), bus.clone());
        let table = ChannelTable::new(
            space,
            self.cfg.timeout_ticks(),
            &self.cfg.service_prefix,
            &self.cfg.product_label,
            publisher,
            bus.clone(),
        );

        Ok(Relay::from_parts(RelayParts {
            cfg: self.cfg,
            bus,
            accessor,
            engine,
            table,
            subs,
            connectivity: Arc::new(ConnectivityTracker::new()),
        }))
    }
}
