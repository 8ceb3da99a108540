//! Fixed-size table of channel supervisors, allocated once at startup.

use std::sync::Arc;

use crate::error::RelayError;
use crate::events::Bus;

use super::endpoint::{EndpointIdentity, Publish};
use super::id::{ChannelId, ChannelSpace};
use super::supervisor::ChannelSupervisor;

pub struct ChannelTable {
    space: ChannelSpace,
    supervisors: Vec<ChannelSupervisor>,
}

impl ChannelTable {
    /// Pre-allocates one supervisor per id in `space`.
    pub fn new(
        space: ChannelSpace,
        timeout_ticks: u32,
        service_prefix: &str,
        product_label: &str,
        publisher: Arc<dyn Publish>,
        events: Bus,
    ) -> Self {
        let supervisors = space
            .ids()
            .map(|id| {
                ChannelSupervisor::new(
                    id,
                    EndpointIdentity::new(id, service_prefix, product_label),
                    timeout_ticks,
                    Arc::clone(&publisher),
                    events.clone(),
                )
            })
            .collect();
        Self { space, supervisors }
    }

    pub fn space(&self) -> ChannelSpace {
        self.space
    }

    pub fn get(&self, id: ChannelId) -> Option<&ChannelSupervisor> {
        self.supervisors.get(id.index())
    }

    pub fn get_mut(&mut self, id: ChannelId) -> Option<&mut ChannelSupervisor> {
        self.supervisors.get_mut(id.index())
    }

    /// Range-checked lookup by raw upstream id.
    pub fn lookup_mut(&mut self, raw: i64) -> Result<&mut ChannelSupervisor, RelayError> {
        let id = self.space.resolve(raw)?;
        self.supervisors
            .get_mut(id.index())
            .ok_or(RelayError::OutOfRangeChannel {
                raw,
                limit: self.space.len(),
            })
    }

    pub fn iter(&self) -> impl Iterator<Item = &ChannelSupervisor> {
        self.supervisors.iter()
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut ChannelSupervisor> {
        self.supervisors.iter_mut()
    }

    /// Ids of channels whose connectivity flag is set, ascending.
    pub fn connected(&self) -> Vec<ChannelId> {
        self.iter()
            .filter(|s| s.is_connected())
            .map(ChannelSupervisor::id)
            .collect()
    }
}
