//! Timer-driven relay loop with paused time.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use tankrelay::memory::{MemoryFeed, MemoryPublisher};
use tankrelay::subscribers::Subscribe;
use tankrelay::channels::{EndpointField, FieldValue};
use tankrelay::upstream::{Field, SENTINEL};
use tankrelay::{Config, Event, EventKind, Relay};

const ADDR: &str = "com.example.tank.feed";

#[derive(Default)]
struct Recorder(Mutex<Vec<Event>>);

impl Recorder {
    fn kinds(&self) -> Vec<EventKind> {
        self.0
            .lock()
            .expect("not poisoned")
            .iter()
            .map(|e| e.kind)
            .collect()
    }

    fn position(&self, kind: EventKind) -> Option<usize> {
        self.0
            .lock()
            .expect("not poisoned")
            .iter()
            .position(|e| e.kind == kind)
    }

    fn count(&self, kind: EventKind, channel: u32) -> usize {
        self.0
            .lock()
            .expect("not poisoned")
            .iter()
            .filter(|e| e.kind == kind && e.channel == Some(channel))
            .count()
    }
}

#[async_trait]
impl Subscribe for Recorder {
    async fn on_event(&self, ev: &Event) {
        self.0.lock().expect("not poisoned").push(ev.clone());
    }

    fn name(&self) -> &'static str {
        "recorder"
    }
}

#[tokio::test(start_paused = true)]
async fn run_loop_publishes_loses_and_recovers_a_channel() {
    let cfg = Config {
        upstream_address: ADDR.to_string(),
        handle_signals: false,
        ..Config::default()
    };
    let feed = Arc::new(MemoryFeed::new(ADDR));
    let publisher = Arc::new(MemoryPublisher::new());
    let recorder = Arc::new(Recorder::default());

    let relay = Relay::builder(cfg)
        .with_subscriber(recorder.clone())
        .build(feed.clone(), publisher.clone())
        .expect("valid config");
    let inlet = relay.inlet();
    let connectivity = relay.connectivity();
    let token = CancellationToken::new();
    let handle = tokio::spawn(relay.run(token.clone()));

    tokio::time::sleep(Duration::from_millis(2500)).await;
    assert_eq!(publisher.creations(), 0);

    feed.set_present(true);
    feed.set_fields(1, 80, 500);
    tokio::time::sleep(Duration::from_secs(2)).await;
    assert_eq!(publisher.fields(1).map(|f| f.remaining), Some(400.0));
    assert!(connectivity.is_connected(1).await);

    for (field, value) in [
        (Field::ChannelId, 2_i64),
        (Field::Level, 40),
        (Field::Capacity, 300),
        (Field::ChannelId, 1),
    ] {
        let note = feed.change(field, value).expect("present");
        inlet.notify(note).expect("queued");
    }
    tokio::time::sleep(Duration::from_millis(10)).await;
    assert_eq!(publisher.fields(2).map(|f| f.remaining), Some(120.0));

    feed.set_present(false);
    tokio::time::sleep(Duration::from_secs(12)).await;
    assert!(connectivity.snapshot().await.is_empty());
    assert_eq!(publisher.fields(1).map(|f| f.connected), Some(false));

    feed.set_present(true);
    tokio::time::sleep(Duration::from_secs(2)).await;
    assert_eq!(connectivity.snapshot().await, vec![1]);

    token.cancel();
    handle.await.expect("joined").expect("clean stop");

    let kinds = recorder.kinds();
    assert_eq!(
        kinds.iter().filter(|k| **k == EventKind::UpstreamAvailable).count(),
        2
    );
    assert_eq!(
        kinds.iter().filter(|k| **k == EventKind::UpstreamUnavailable).count(),
        2
    );
    assert_eq!(recorder.count(EventKind::ChannelDisconnected, 1), 1);
    assert_eq!(recorder.count(EventKind::ChannelDisconnected, 2), 1);
    assert_eq!(recorder.count(EventKind::ChannelConnected, 1), 2);
    assert_eq!(publisher.creations(), 2);
    assert_eq!(
        &kinds[kinds.len() - 2..],
        &[EventKind::ShutdownRequested, EventKind::RelayStopped]
    );
}

#[tokio::test(start_paused = true)]
async fn due_poll_is_served_before_queued_inbound_items() {
    let cfg = Config {
        upstream_address: ADDR.to_string(),
        handle_signals: false,
        ..Config::default()
    };
    let feed = Arc::new(MemoryFeed::new(ADDR));
    let publisher = Arc::new(MemoryPublisher::new());
    let recorder = Arc::new(Recorder::default());
    feed.set_present(true);
    feed.set_fields(1, SENTINEL, SENTINEL);

    let relay = Relay::builder(cfg)
        .with_subscriber(recorder.clone())
        .build(feed.clone(), publisher)
        .expect("valid config");
    let inlet = relay.inlet();
    for _ in 0..3 {
        inlet
            .endpoint_written(99, EndpointField::Level, FieldValue::Int(1))
            .expect("queued");
    }

    let token = CancellationToken::new();
    let handle = tokio::spawn(relay.run(token.clone()));
    tokio::time::sleep(Duration::from_millis(10)).await;
    token.cancel();
    handle.await.expect("joined").expect("clean stop");

    let upstream = recorder
        .position(EventKind::UpstreamAvailable)
        .expect("first poll resolved the upstream");
    let dropped = recorder
        .position(EventKind::ChannelOutOfRange)
        .expect("queued writes reported");
    assert!(upstream < dropped);
}
