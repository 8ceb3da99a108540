//! In-process upstream feed.

use std::collections::{HashMap, VecDeque};
use std::sync::{Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;

use crate::error::BusFault;
use crate::upstream::{Field, Handle, Notification, OriginId, SENTINEL, UpstreamBus, Value};

#[derive(Debug)]
struct FeedState {
    present: bool,
    generation: u64,
    fields: HashMap<Field, Value>,
    scripts: HashMap<Field, VecDeque<Value>>,
    fail_next_read: bool,
    resolve_calls: usize,
}

/// [`UpstreamBus`] backed by a mutable in-memory triple.
///
/// The feed starts absent. Every absent → present transition (and every
/// [`restart`](Self::restart)) starts a new generation: handles resolved earlier
/// fault on read and the owner id changes.
#[derive(Debug)]
pub struct MemoryFeed {
    address: String,
    state: Mutex<FeedState>,
}

impl MemoryFeed {
    pub fn new(address: impl Into<String>) -> Self {
        let fields = [Field::ChannelId, Field::Level, Field::Capacity]
            .into_iter()
            .map(|f| (f, Value::Int(SENTINEL)))
            .collect();
        Self {
            address: address.into(),
            state: Mutex::new(FeedState {
                present: false,
                generation: 0,
                fields,
                scripts: HashMap::new(),
                fail_next_read: false,
                resolve_calls: 0,
            }),
        }
    }

    pub fn address(&self) -> &str {
        &self.address
    }

    /// Makes the upstream service appear or disappear.
    pub fn set_present(&self, present: bool) {
        let mut st = self.lock();
        if present && !st.present {
            st.generation += 1;
        }
        st.present = present;
    }

    /// Simulates the upstream process restarting under the same address.
    pub fn restart(&self) {
        let mut st = self.lock();
        st.generation += 1;
        st.present = true;
    }

    /// Sets the whole triple at once.
    pub fn set_fields(&self, channel: i64, level: i64, capacity: i64) {
        let mut st = self.lock();
        st.fields.insert(Field::ChannelId, Value::Int(channel));
        st.fields.insert(Field::Level, Value::Int(level));
        st.fields.insert(Field::Capacity, Value::Int(capacity));
    }

    pub fn set_field(&self, field: Field, value: impl Into<Value>) {
        self.lock().fields.insert(field, value.into());
    }

    /// Sets a field and returns the notification the upstream would emit for it.
    ///
    /// Returns `None` while the feed is absent.
    pub fn change(&self, field: Field, value: impl Into<Value>) -> Option<Notification> {
        let value = value.into();
        let mut st = self.lock();
        st.fields.insert(field, value.clone());
        st.present
            .then(|| Notification::new(field, value, origin_of(st.generation)))
    }

    /// Queues values returned by the next reads of `field`, ahead of its current value.
    pub fn script(&self, field: Field, values: impl IntoIterator<Item = Value>) {
        self.lock()
            .scripts
            .entry(field)
            .or_default()
            .extend(values);
    }

    /// Makes the next read fail with a bus fault.
    pub fn fail_next_read(&self) {
        self.lock().fail_next_read = true;
    }

    /// Number of `resolve` calls served so far.
    pub fn resolve_calls(&self) -> usize {
        self.lock().resolve_calls
    }

    /// Owner id of the current generation, `None` while absent.
    pub fn origin(&self) -> Option<OriginId> {
        let st = self.lock();
        st.present.then(|| origin_of(st.generation))
    }

    fn lock(&self) -> MutexGuard<'_, FeedState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn absent(&self) -> BusFault {
        BusFault::new(format!("name {} has no owner", self.address))
    }
}

fn origin_of(generation: u64) -> OriginId {
    OriginId::new(format!(":1.{generation}"))
}

#[async_trait]
impl UpstreamBus for MemoryFeed {
    async fn resolve(&self, address: &str, field: Field) -> Result<Handle, BusFault> {
        let mut st = self.lock();
        st.resolve_calls += 1;
        if !st.present || address != self.address {
            return Err(self.absent());
        }
        Ok(Handle::new(field, st.generation))
    }

    async fn read(&self, handle: &Handle) -> Result<Value, BusFault> {
        let mut st = self.lock();
        if !st.present {
            return Err(self.absent());
        }
        if handle.key() != st.generation {
            return Err(BusFault::new("stale handle"));
        }
        if std::mem::take(&mut st.fail_next_read) {
            return Err(BusFault::new("read timed out"));
        }
        let field = handle.field();
        if let Some(value) = st.scripts.get_mut(&field).and_then(VecDeque::pop_front) {
            return Ok(value);
        }
        Ok(st.fields.get(&field).cloned().unwrap_or(Value::Empty))
    }

    async fn owner(&self, address: &str) -> Result<OriginId, BusFault> {
        let st = self.lock();
        if !st.present || address != self.address {
            return Err(self.absent());
        }
        Ok(origin_of(st.generation))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn absent_feed_faults() {
        let feed = MemoryFeed::new("svc");
        assert!(feed.resolve("svc", Field::Level).await.is_err());
        assert!(feed.owner("svc").await.is_err());
        assert_eq!(feed.change(Field::Level, 3_i64), None);
    }

    #[tokio::test]
    async fn restart_invalidates_handles_and_changes_owner() {
        let feed = MemoryFeed::new("svc");
        feed.set_present(true);
        let handle = feed.resolve("svc", Field::Level).await.expect("present");
        let before = feed.owner("svc").await.expect("present");

        feed.restart();
        assert!(feed.read(&handle).await.is_err());
        assert_ne!(feed.owner("svc").await.expect("present"), before);
    }

    #[tokio::test]
    async fn scripted_values_come_first() {
        let feed = MemoryFeed::new("svc");
        feed.set_present(true);
        feed.set_field(Field::ChannelId, 4_i64);
        feed.script(Field::ChannelId, [Value::Int(1)]);
        let handle = feed.resolve("svc", Field::ChannelId).await.expect("present");

        assert_eq!(feed.read(&handle).await, Ok(Value::Int(1)));
        assert_eq!(feed.read(&handle).await, Ok(Value::Int(4)));
    }
}
