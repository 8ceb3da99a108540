//! # FusionEngine: notification/poll reconciliation.
//!
//! Two unreliable paths feed the engine:
//! - **Notifications** (fast, partial): channel-id changes fire reliably; level and
//!   capacity fire only when their value differs from the previous channel's.
//! - **Polls** (slow, consistent): one tear-checked [`Snapshot`] per tick.
//!
//! ## Notification path
//! ```text
//! Level/Capacity ──► pending.level / pending.capacity      (store only)
//!
//! ChannelId(new) ──► stuck-value promotion (polled → pending, after threshold)
//!                ──► commit (pending.channel, pending.level, pending.capacity)
//!                ──► pending.channel = new
//! ```
//! A channel-id change proves the previous channel's pair is complete, so the
//! *previous* pending triple is committed, never the incoming id with stale fields.
//!
//! ## Poll path
//! ```text
//! Snapshot ──► range check ──► polled = (level, capacity) ──► commit (snapshot channel, level, capacity)
//! ```
//!
//! ## Rules
//! - Sentinel fields travel as `None` and never overwrite committed values.
//! - Ids are range-checked before any commit; drops publish `ChannelOutOfRange`
//!   once per distinct offending id.
//! - Notifications are accepted only from the resolved upstream origin.
//! - Losing (or changing) the origin forgets all pending state and stuck counters.

use tokio::time::Instant;

use crate::channels::{ChannelId, ChannelSpace};
use crate::error::RelayError;
use crate::events::{Bus, Event, EventKind};
use crate::upstream::{Field, Notification, OriginId, Snapshot};

use super::pending::{Pending, Polled, StuckCounters, advance};

/// Which path produced a commit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommitSource {
    Poll,
    Notification,
}

/// Sentinel-filtered values to apply to one channel supervisor.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Commit {
    pub channel: ChannelId,
    pub level: Option<f64>,
    pub capacity: Option<f64>,
    pub source: CommitSource,
}

pub struct FusionEngine {
    space: ChannelSpace,
    stuck_threshold: u32,
    origin: Option<OriginId>,
    pending: Pending,
    polled: Polled,
    stuck: StuckCounters,
    last_dropped: Option<i64>,
    events: Bus,
}

impl FusionEngine {
    /// Creates an engine; `stuck_threshold` is clamped to at least 1.
    pub fn new(space: ChannelSpace, stuck_threshold: u32, events: Bus) -> Self {
        Self {
            space,
            stuck_threshold: stuck_threshold.max(1),
            origin: None,
            pending: Pending::default(),
            polled: Polled::default(),
            stuck: StuckCounters::default(),
            last_dropped: None,
            events,
        }
    }

    pub fn pending(&self) -> &Pending {
        &self.pending
    }

    pub fn polled(&self) -> &Polled {
        &self.polled
    }

    pub fn stuck(&self) -> &StuckCounters {
        &self.stuck
    }

    pub fn origin(&self) -> Option<&OriginId> {
        self.origin.as_ref()
    }

    /// Tracks the resolved upstream origin; forgets pending state when it is lost or changes.
    pub fn set_origin(&mut self, origin: Option<OriginId>) {
        if self.origin.is_some() && self.origin != origin {
            self.forget();
        }
        self.origin = origin;
    }

    /// Drops every uncommitted value and counter.
    pub fn forget(&mut self) {
        self.pending = Pending::default();
        self.polled = Polled::default();
        self.stuck = StuckCounters::default();
    }

    /// Applies one notification; returns a commit when a channel-id change closes
    /// the previous channel's pair.
    pub fn on_notification(&mut self, notification: &Notification) -> Option<Commit> {
        if self.origin.as_ref() != Some(&notification.origin) {
            return None;
        }
        match notification.field {
            Field::Level => {
                self.pending.level = notification.value.sample();
                self.pending.level_at = Some(Instant::now());
                None
            }
            Field::Capacity => {
                self.pending.capacity = notification.value.sample();
                self.pending.capacity_at = Some(Instant::now());
                None
            }
            Field::ChannelId => self.on_channel_change(notification.value.channel_id()),
        }
    }

    /// Applies one consistent poll observation.
    ///
    /// Returns [`RelayError::OutOfRangeChannel`] when the snapshot's id is outside
    /// the channel space, and `Ok(None)` when both fields are unreported.
    /// A dropped snapshot leaves the stuck-promotion source untouched.
    pub fn on_poll(&mut self, snapshot: Snapshot) -> Result<Option<Commit>, RelayError> {
        let commit = self.commit(
            snapshot.channel,
            snapshot.level,
            snapshot.capacity,
            CommitSource::Poll,
        )?;
        self.polled = Polled {
            level: snapshot.level,
            capacity: snapshot.capacity,
        };
        Ok(commit)
    }

    fn on_channel_change(&mut self, raw: i64) -> Option<Commit> {
        self.promote_stuck();
        let commit = self.pending.channel.and_then(|previous| {
            self.commit(
                previous,
                self.pending.level,
                self.pending.capacity,
                CommitSource::Notification,
            )
            .ok()
            .flatten()
        });
        self.pending.channel = Some(raw);
        commit
    }

    fn promote_stuck(&mut self) {
        let threshold = self.stuck_threshold;
        if let Some(value) = advance(
            &mut self.stuck.level,
            self.pending.level,
            self.polled.level,
            threshold,
        ) {
            self.pending.level = Some(value);
            self.pending.level_at = Some(Instant::now());
            self.publish_promotion(Field::Level, value);
        }
        if let Some(value) = advance(
            &mut self.stuck.capacity,
            self.pending.capacity,
            self.polled.capacity,
            threshold,
        ) {
            self.pending.capacity = Some(value);
            self.pending.capacity_at = Some(Instant::now());
            self.publish_promotion(Field::Capacity, value);
        }
    }

    fn commit(
        &mut self,
        raw: i64,
        level: Option<f64>,
        capacity: Option<f64>,
        source: CommitSource,
    ) -> Result<Option<Commit>, RelayError> {
        let channel = match self.space.resolve(raw) {
            Ok(channel) => {
                self.last_dropped = None;
                channel
            }
            Err(err) => {
                if self.last_dropped != Some(raw) {
                    self.last_dropped = Some(raw);
                    self.events
                        .publish(Event::new(EventKind::ChannelOutOfRange).with_raw(raw));
                }
                return Err(err);
            }
        };
        if level.is_none() && capacity.is_none() {
            return Ok(None);
        }
        Ok(Some(Commit {
            channel,
            level,
            capacity,
            source,
        }))
    }

    fn publish_promotion(&self, field: Field, value: f64) {
        self.events.publish(
            Event::new(EventKind::StuckValuePromoted)
                .with_field(field.name())
                .with_value(value),
        );
    }
}
