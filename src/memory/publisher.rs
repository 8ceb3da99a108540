//! In-process downstream publisher.

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;

use crate::channels::{
    EndpointField, EndpointFields, EndpointHandle, EndpointIdentity, FieldValue, Publish,
};
use crate::error::PublishError;

#[derive(Debug)]
struct Endpoint {
    identity: EndpointIdentity,
    fields: EndpointFields,
}

#[derive(Debug, Default)]
struct PublisherState {
    endpoints: HashMap<u64, Endpoint>,
    by_channel: HashMap<u32, u64>,
    next_key: u64,
    creations: usize,
    fail_creates: usize,
    fail_writes: usize,
    writes: Vec<(u32, EndpointField, FieldValue)>,
}

/// [`Publish`] implementation that keeps endpoints in memory.
///
/// Writes are applied to the stored [`EndpointFields`] so tests can assert on the
/// values a downstream consumer would see.
#[derive(Debug, Default)]
pub struct MemoryPublisher {
    state: Mutex<PublisherState>,
}

impl MemoryPublisher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of successful endpoint creations.
    pub fn creations(&self) -> usize {
        self.lock().creations
    }

    /// Current fields of the endpoint for `channel`.
    pub fn fields(&self, channel: u32) -> Option<EndpointFields> {
        let st = self.lock();
        let key = st.by_channel.get(&channel)?;
        st.endpoints.get(key).map(|e| e.fields.clone())
    }

    pub fn identity(&self, channel: u32) -> Option<EndpointIdentity> {
        let st = self.lock();
        let key = st.by_channel.get(&channel)?;
        st.endpoints.get(key).map(|e| e.identity.clone())
    }

    /// Channels that have an endpoint, ascending.
    pub fn channels(&self) -> Vec<u32> {
        let mut channels: Vec<u32> = self.lock().by_channel.keys().copied().collect();
        channels.sort_unstable();
        channels
    }

    /// Every accepted write, in order.
    pub fn writes(&self) -> Vec<(u32, EndpointField, FieldValue)> {
        self.lock().writes.clone()
    }

    /// Makes the next `n` creations fail.
    pub fn fail_creates(&self, n: usize) {
        self.lock().fail_creates = n;
    }

    /// Makes the next `n` writes fail.
    pub fn fail_writes(&self, n: usize) {
        self.lock().fail_writes = n;
    }

    fn lock(&self) -> MutexGuard<'_, PublisherState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[async_trait]
impl Publish for MemoryPublisher {
    async fn create_endpoint(
        &self,
        identity: &EndpointIdentity,
        initial: &EndpointFields,
    ) -> Result<EndpointHandle, PublishError> {
        let mut st = self.lock();
        if st.fail_creates > 0 {
            st.fail_creates -= 1;
            return Err(PublishError::EndpointUnavailable {
                name: identity.service_name.clone(),
                reason: "name already taken".to_string(),
            });
        }
        st.next_key += 1;
        let key = st.next_key;
        st.creations += 1;
        st.by_channel.insert(identity.channel, key);
        st.endpoints.insert(
            key,
            Endpoint {
                identity: identity.clone(),
                fields: initial.clone(),
            },
        );
        Ok(EndpointHandle::new(key))
    }

    async fn write(
        &self,
        endpoint: EndpointHandle,
        field: EndpointField,
        value: FieldValue,
    ) -> Result<(), PublishError> {
        let mut st = self.lock();
        if st.fail_writes > 0 {
            st.fail_writes -= 1;
            return Err(PublishError::Rejected {
                field: field.path(),
                reason: "bus congested".to_string(),
            });
        }
        let Some(ep) = st.endpoints.get_mut(&endpoint.key()) else {
            return Err(PublishError::EndpointUnavailable {
                name: format!("endpoint #{}", endpoint.key()),
                reason: "unknown handle".to_string(),
            });
        };
        let numeric = value.as_f64().ok_or_else(|| PublishError::Rejected {
            field: field.path(),
            reason: "not numeric".to_string(),
        })?;
        match field {
            EndpointField::Connected => ep.fields.connected = numeric != 0.0,
            EndpointField::ChannelId => ep.fields.channel = numeric as u32,
            EndpointField::Level => ep.fields.level = numeric,
            EndpointField::Capacity => ep.fields.capacity = numeric,
            EndpointField::Remaining => ep.fields.remaining = numeric,
        }
        let channel = ep.identity.channel;
        st.writes.push((channel, field, value));
        Ok(())
    }
}
