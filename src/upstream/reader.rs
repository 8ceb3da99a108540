//! # Snapshot reader: tear-resistant triple reads.
//!
//! The feed cannot be read atomically and may switch to another channel between
//! any two field reads. The reader brackets the data fields with two channel-id
//! reads and accepts the triple only when both ids agree.
//!
//! ## Protocol
//! ```text
//! id1 ─► level ─► capacity ─► id2
//!   id1 == id2                 → Snapshot(id1, level, capacity)
//!   id1 != id2, Discard        → TornRead
//!   id1 != id2, RetryOnce:
//!        level' ─► capacity' ─► id3
//!          id3 == id2          → Snapshot(id2, level', capacity')
//!          otherwise           → TornRead
//! ```
//!
//! Any bus fault invalidates the accessor and aborts the cycle with
//! `UpstreamUnavailable`.

use crate::error::RelayError;

use super::accessor::FeedAccessor;
use super::value::{Field, Value};

/// What to do when the two channel-id reads disagree.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TearPolicy {
    /// Drop the cycle; the next tick tries again.
    #[default]
    Discard,
    /// Re-read the data fields and channel id once more before giving up.
    RetryOnce,
}

/// Consistent `(channel, level, capacity)` observation.
///
/// `channel` is the raw upstream id; range checking happens in the fusion engine.
/// `level`/`capacity` are `None` when the upstream reported the sentinel.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Snapshot {
    pub channel: i64,
    pub level: Option<f64>,
    pub capacity: Option<f64>,
}

/// Performs the double-read protocol against a [`FeedAccessor`].
#[derive(Debug, Clone, Copy, Default)]
pub struct SnapshotReader {
    policy: TearPolicy,
}

impl SnapshotReader {
    pub fn new(policy: TearPolicy) -> Self {
        Self { policy }
    }

    pub fn policy(&self) -> TearPolicy {
        self.policy
    }

    /// Reads one consistent snapshot or reports why the cycle was dropped.
    pub async fn read(&self, accessor: &mut FeedAccessor) -> Result<Snapshot, RelayError> {
        let first = accessor.read(Field::ChannelId).await?.channel_id();
        let (level, capacity) = read_pair(accessor).await?;
        let second = accessor.read(Field::ChannelId).await?.channel_id();

        if first == second {
            return Ok(snapshot(first, &level, &capacity));
        }

        match self.policy {
            TearPolicy::Discard => Err(RelayError::TornRead { first, second }),
            TearPolicy::RetryOnce => {
                let (level, capacity) = read_pair(accessor).await?;
                let third = accessor.read(Field::ChannelId).await?.channel_id();
                if third == second {
                    Ok(snapshot(second, &level, &capacity))
                } else {
                    Err(RelayError::TornRead {
                        first: second,
                        second: third,
                    })
                }
            }
        }
    }
}

async fn read_pair(accessor: &mut FeedAccessor) -> Result<(Value, Value), RelayError> {
    let level = accessor.read(Field::Level).await?;
    let capacity = accessor.read(Field::Capacity).await?;
    Ok((level, capacity))
}

fn snapshot(channel: i64, level: &Value, capacity: &Value) -> Snapshot {
    Snapshot {
        channel,
        level: level.sample(),
        capacity: capacity.sample(),
    }
}
