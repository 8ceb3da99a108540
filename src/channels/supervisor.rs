//! # ChannelSupervisor: per-channel state and watchdog.
//!
//! One supervisor exists for every id in the channel space from startup. It owns
//! the committed state of its channel, creates the downstream endpoint lazily and
//! drives the connectivity flag.
//!
//! ## States
//! ```text
//!   Unpublished ──commit (level+capacity known)──► Published/Connected
//!                                                   │        ▲
//!                                 tick × (T+1)      │        │ commit / external write
//!                                                   ▼        │
//!                                            Published/Disconnected
//! ```
//! A published supervisor never returns to `Unpublished`.
//!
//! ## Rules
//! - The endpoint is created populated with real values; there is no zero-valued frame.
//!   Creation waits until both level and capacity are known.
//! - A failed creation leaves the supervisor `Unpublished`; the next commit retries.
//! - `commit` resets the watchdog counter; `tick` increments it up to `T + 1` and
//!   never resets it, so an expired channel logs its disconnect once.
//! - Connectivity events are published on edges only.
//! - Write failures publish `EndpointFailed` on the first failure of a streak.

use std::sync::Arc;

use tokio::time::Instant;

use crate::events::{Bus, Event, EventKind};

use super::endpoint::{
    EndpointField, EndpointFields, EndpointHandle, EndpointIdentity, FieldValue, Publish,
    remaining,
};
use super::id::ChannelId;

/// Committed per-channel state.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CommittedState {
    /// Last known level; `None` until first reported.
    pub level: Option<f64>,
    /// Last known capacity; `None` until first reported.
    pub capacity: Option<f64>,
    /// Monotonic time of the last commit or external write.
    pub last_update: Option<Instant>,
    /// Whether the downstream endpoint exists.
    pub published: bool,
    /// Whether a commit happened within the watchdog window.
    pub connected: bool,
}

/// Result of [`ChannelSupervisor::commit`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommitOutcome {
    /// Commit carried no known field.
    Ignored,
    /// Values stored, but the endpoint still lacks level or capacity.
    Deferred,
    /// The endpoint was created by this commit.
    Created,
    /// An existing endpoint was updated.
    Updated,
    /// The publisher refused to create the endpoint.
    CreateFailed,
}

/// Connectivity edge produced by a watchdog tick or a commit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    Connected,
    Disconnected,
}

pub struct ChannelSupervisor {
    id: ChannelId,
    identity: EndpointIdentity,
    state: CommittedState,
    endpoint: Option<EndpointHandle>,
    timeout_ticks: u32,
    timeout_count: u32,
    write_failing: bool,
    publisher: Arc<dyn Publish>,
    events: Bus,
}

impl ChannelSupervisor {
    pub fn new(
        id: ChannelId,
        identity: EndpointIdentity,
        timeout_ticks: u32,
        publisher: Arc<dyn Publish>,
        events: Bus,
    ) -> Self {
        Self {
            id,
            identity,
            state: CommittedState::default(),
            endpoint: None,
            timeout_ticks,
            timeout_count: 0,
            write_failing: false,
            publisher,
            events,
        }
    }

    pub fn id(&self) -> ChannelId {
        self.id
    }

    pub fn identity(&self) -> &EndpointIdentity {
        &self.identity
    }

    pub fn state(&self) -> &CommittedState {
        &self.state
    }

    pub fn is_published(&self) -> bool {
        self.endpoint.is_some()
    }

    pub fn is_connected(&self) -> bool {
        self.state.connected
    }

    /// Current published field values, once both level and capacity are known.
    pub fn fields(&self) -> Option<EndpointFields> {
        let (level, capacity) = (self.state.level?, self.state.capacity?);
        Some(EndpointFields::new(
            self.id,
            level,
            capacity,
            self.state.connected,
        ))
    }

    /// Applies a sentinel-filtered reading: `None` fields keep their previous value.
    pub async fn commit(&mut self, level: Option<f64>, capacity: Option<f64>) -> CommitOutcome {
        if level.is_none() && capacity.is_none() {
            return CommitOutcome::Ignored;
        }
        if level.is_some() {
            self.state.level = level;
        }
        if capacity.is_some() {
            self.state.capacity = capacity;
        }
        self.state.last_update = Some(Instant::now());

        let Some(fields) = self.fields() else {
            return CommitOutcome::Deferred;
        };

        let outcome = match self.endpoint {
            None => {
                if !self.create(&fields).await {
                    return CommitOutcome::CreateFailed;
                }
                CommitOutcome::Created
            }
            Some(endpoint) => {
                self.write_values(endpoint, &fields).await;
                CommitOutcome::Updated
            }
        };
        self.feed_watchdog().await;
        outcome
    }

    /// Watchdog tick; returns the connectivity edge it caused, if any.
    pub async fn tick(&mut self) -> Option<Transition> {
        if self.endpoint.is_none() {
            return None;
        }
        if self.timeout_count <= self.timeout_ticks {
            self.timeout_count += 1;
        }
        if self.timeout_count > self.timeout_ticks && self.state.connected {
            self.set_connected(false).await;
            return Some(Transition::Disconnected);
        }
        None
    }

    /// Applies an operator write made through the endpoint.
    ///
    /// Returns `false` when the write is rejected: endpoint not created yet,
    /// read-only field, or non-numeric value for a numeric field.
    pub async fn external_write(&mut self, field: EndpointField, value: FieldValue) -> bool {
        let Some(endpoint) = self.endpoint else {
            return false;
        };
        match field {
            EndpointField::Connected => return false,
            EndpointField::Level | EndpointField::Capacity => {
                let Some(v) = value.as_f64() else {
                    return false;
                };
                if field == EndpointField::Level {
                    self.state.level = Some(v);
                } else {
                    self.state.capacity = Some(v);
                }
            }
            EndpointField::Remaining | EndpointField::ChannelId => {}
        }

        let mut ev = Event::new(EventKind::ExternalWrite)
            .with_channel(self.id.get())
            .with_field(field.path());
        if let Some(v) = value.as_f64() {
            ev = ev.with_value(v);
        }
        self.events.publish(ev);

        self.state.last_update = Some(Instant::now());
        if let (Some(level), Some(capacity)) = (self.state.level, self.state.capacity) {
            self.write(
                endpoint,
                EndpointField::Remaining,
                FieldValue::Float(remaining(level, capacity)),
            )
            .await;
        }
        self.feed_watchdog().await;
        true
    }

    async fn create(&mut self, fields: &EndpointFields) -> bool {
        let initial = EndpointFields {
            connected: true,
            ..fields.clone()
        };
        match self
            .publisher
            .create_endpoint(&self.identity, &initial)
            .await
        {
            Ok(endpoint) => {
                self.endpoint = Some(endpoint);
                self.state.published = true;
                self.events.publish(
                    Event::new(EventKind::EndpointCreated)
                        .with_channel(self.id.get())
                        .with_reason(self.identity.service_name.as_str()),
                );
                true
            }
            Err(err) => {
                self.events.publish(
                    Event::new(EventKind::EndpointFailed)
                        .with_channel(self.id.get())
                        .with_reason(err.to_string()),
                );
                false
            }
        }
    }

    async fn write_values(&mut self, endpoint: EndpointHandle, fields: &EndpointFields) {
        self.write(endpoint, EndpointField::Level, FieldValue::Float(fields.level))
            .await;
        self.write(
            endpoint,
            EndpointField::Capacity,
            FieldValue::Float(fields.capacity),
        )
        .await;
        self.write(
            endpoint,
            EndpointField::Remaining,
            FieldValue::Float(fields.remaining),
        )
        .await;
    }

    /// Resets the timeout counter and raises the connectivity flag.
    async fn feed_watchdog(&mut self) {
        self.timeout_count = 0;
        if !self.state.connected {
            self.set_connected(true).await;
        }
    }

    async fn set_connected(&mut self, connected: bool) {
        self.state.connected = connected;
        if let Some(endpoint) = self.endpoint {
            self.write(
                endpoint,
                EndpointField::Connected,
                FieldValue::connected(connected),
            )
            .await;
        }
        let kind = if connected {
            EventKind::ChannelConnected
        } else {
            EventKind::ChannelDisconnected
        };
        self.events
            .publish(Event::new(kind).with_channel(self.id.get()));
    }

    async fn write(&mut self, endpoint: EndpointHandle, field: EndpointField, value: FieldValue) {
        match self.publisher.write(endpoint, field, value).await {
            Ok(()) => self.write_failing = false,
            Err(err) => {
                if !self.write_failing {
                    self.write_failing = true;
                    self.events.publish(
                        Event::new(EventKind::EndpointFailed)
                            .with_channel(self.id.get())
                            .with_field(field.path())
                            .with_reason(err.to_string()),
                    );
                }
            }
        }
    }
}
