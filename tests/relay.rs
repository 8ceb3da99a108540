//! Step-driven relay scenarios against the in-memory collaborators.

use std::sync::Arc;
use std::time::Duration;

use tankrelay::channels::{CommitOutcome, EndpointField, FieldValue, Transition};
use tankrelay::memory::{MemoryFeed, MemoryPublisher};
use tankrelay::upstream::{Field, Notification, OriginId, SENTINEL, TearPolicy, Value};
use tankrelay::{Config, EventKind, Inbound, Relay, RelayError, RuntimeError};

const ADDR: &str = "com.example.tank.feed";

fn config() -> Config {
    Config {
        upstream_address: ADDR.to_string(),
        handle_signals: false,
        ..Config::default()
    }
}

fn setup(cfg: Config) -> (Arc<MemoryFeed>, Arc<MemoryPublisher>, Relay) {
    let feed = Arc::new(MemoryFeed::new(ADDR));
    let publisher = Arc::new(MemoryPublisher::new());
    let relay = Relay::builder(cfg)
        .build(feed.clone(), publisher.clone())
        .expect("valid config");
    (feed, publisher, relay)
}

fn notify(feed: &MemoryFeed, field: Field, value: i64) -> Inbound {
    Inbound::Notification(feed.change(field, value).expect("feed present"))
}

async fn settle() {
    for _ in 0..16 {
        tokio::task::yield_now().await;
    }
}

#[tokio::test]
async fn two_channels_get_their_own_endpoints() {
    let (feed, publisher, mut relay) = setup(config());
    feed.set_present(true);

    feed.set_fields(1, 80, 500);
    assert_eq!(relay.poll_once().await, Ok(CommitOutcome::Created));
    feed.set_fields(2, 40, 300);
    assert_eq!(relay.poll_once().await, Ok(CommitOutcome::Created));
    feed.set_fields(1, 80, 500);
    assert_eq!(relay.poll_once().await, Ok(CommitOutcome::Updated));

    assert_eq!(publisher.creations(), 2);
    assert_eq!(publisher.channels(), vec![1, 2]);
    let one = publisher.fields(1).expect("channel 1 published");
    let two = publisher.fields(2).expect("channel 2 published");
    assert_eq!(one.remaining, 400.0);
    assert_eq!(two.remaining, 120.0);
    assert!(one.connected && two.connected);

    settle().await;
    assert_eq!(relay.connectivity().snapshot().await, vec![1, 2]);
}

#[tokio::test]
async fn endpoint_identity_is_derived_from_channel() {
    let (feed, publisher, mut relay) = setup(config());
    feed.set_present(true);
    feed.set_fields(3, 10, 100);
    relay.poll_once().await.expect("consistent");

    let identity = publisher.identity(3).expect("created");
    assert_eq!(identity.service_name, "com.victronenergy.tank.Repeater03");
    assert_eq!(identity.product_name, "Tank Repeater 3");
    assert_eq!(identity.device_instance, 3);
}

#[tokio::test]
async fn torn_poll_commits_nothing() {
    let (feed, publisher, mut relay) = setup(config());
    feed.set_present(true);
    feed.set_fields(3, 10, 100);
    feed.script(Field::ChannelId, [Value::Int(3), Value::Int(5)]);

    assert_eq!(
        relay.poll_once().await,
        Err(RelayError::TornRead { first: 3, second: 5 })
    );
    assert_eq!(publisher.creations(), 0);
    assert_eq!(relay.channel(3).map(|c| c.state().level), Some(None));
    assert_eq!(relay.channel(5).map(|c| c.state().level), Some(None));
}

#[tokio::test]
async fn retry_once_recovers_a_torn_poll() {
    let cfg = Config {
        tear_policy: TearPolicy::RetryOnce,
        ..config()
    };
    let (feed, publisher, mut relay) = setup(cfg);
    feed.set_present(true);
    feed.set_fields(5, 60, 250);
    feed.script(Field::ChannelId, [Value::Int(3)]);

    assert_eq!(relay.poll_once().await, Ok(CommitOutcome::Created));
    assert_eq!(publisher.channels(), vec![5]);
}

#[tokio::test]
async fn out_of_range_channel_commits_nothing() {
    let (feed, publisher, mut relay) = setup(config());
    feed.set_present(true);
    feed.set_fields(99, 50, 100);

    assert_eq!(
        relay.poll_once().await,
        Err(RelayError::OutOfRangeChannel { raw: 99, limit: 6 })
    );
    assert!(relay.channel(99).is_none());
    assert_eq!(publisher.creations(), 0);

    let mut events = relay.bus().subscribe();
    let write = Inbound::EndpointWrite {
        channel: 99,
        field: EndpointField::Level,
        value: FieldValue::Int(1),
    };
    assert!(relay.deliver(write).await.is_err());

    let ev = events.try_recv().expect("out-of-range write reported");
    assert_eq!(ev.kind, EventKind::ChannelOutOfRange);
    assert_eq!(ev.raw, Some(99));
}

#[tokio::test]
async fn sentinel_never_overwrites_known_level() {
    let (feed, publisher, mut relay) = setup(config());
    feed.set_present(true);
    feed.set_fields(1, 50, 200);
    relay.poll_once().await.expect("consistent");

    feed.set_fields(1, SENTINEL, 400);
    assert_eq!(relay.poll_once().await, Ok(CommitOutcome::Updated));

    let fields = publisher.fields(1).expect("published");
    assert_eq!(fields.level, 50.0);
    assert_eq!(fields.capacity, 400.0);
    assert_eq!(fields.remaining, 200.0);
}

#[tokio::test]
async fn channel_id_notification_commits_the_previous_channel() {
    let (feed, publisher, mut relay) = setup(config());
    feed.set_present(true);
    feed.set_fields(0, SENTINEL, SENTINEL);
    assert_eq!(relay.poll_once().await, Ok(CommitOutcome::Ignored));

    for inbound in [
        notify(&feed, Field::ChannelId, 2),
        notify(&feed, Field::Level, 40),
        notify(&feed, Field::Capacity, 300),
    ] {
        assert_eq!(relay.deliver(inbound).await, Ok(CommitOutcome::Ignored));
    }
    assert_eq!(publisher.creations(), 0);

    let outcome = relay.deliver(notify(&feed, Field::ChannelId, 3)).await;
    assert_eq!(outcome, Ok(CommitOutcome::Created));
    assert_eq!(publisher.channels(), vec![2]);
    assert_eq!(publisher.fields(2).map(|f| f.remaining), Some(120.0));
    assert!(!relay.channel(3).expect("in range").is_published());
}

#[tokio::test]
async fn notifications_from_another_origin_are_ignored() {
    let (feed, publisher, mut relay) = setup(config());
    feed.set_present(true);
    feed.set_fields(0, SENTINEL, SENTINEL);
    relay.poll_once().await.expect("resolved");

    let stranger = OriginId::new(":9.9");
    for (field, value) in [
        (Field::ChannelId, 1_i64),
        (Field::Level, 10),
        (Field::Capacity, 10),
        (Field::ChannelId, 2),
    ] {
        let inbound = Inbound::Notification(Notification::new(field, value, stranger.clone()));
        relay.deliver(inbound).await.expect("handled");
    }
    assert_eq!(publisher.creations(), 0);
    assert_eq!(relay.engine().pending().channel, None);
}

#[tokio::test]
async fn stuck_level_is_promoted_from_polls() {
    let cfg = Config {
        stuck_threshold: 3,
        ..config()
    };
    let (feed, publisher, mut relay) = setup(cfg);
    feed.set_present(true);
    feed.set_fields(4, 50, 200);
    relay.poll_once().await.expect("consistent");

    assert_eq!(
        relay.deliver(notify(&feed, Field::ChannelId, 1)).await,
        Ok(CommitOutcome::Ignored)
    );
    assert_eq!(
        relay.deliver(notify(&feed, Field::ChannelId, 2)).await,
        Ok(CommitOutcome::Ignored)
    );
    assert_eq!(
        relay.deliver(notify(&feed, Field::ChannelId, 1)).await,
        Ok(CommitOutcome::Created)
    );

    let fields = publisher.fields(2).expect("promoted values published");
    assert_eq!(fields.level, 50.0);
    assert_eq!(fields.capacity, 200.0);
}

#[tokio::test]
async fn watchdog_flips_connectivity_once_per_edge() {
    let cfg = Config {
        watchdog_period: Duration::from_secs(1),
        watchdog_timeout: Duration::from_secs(3),
        ..config()
    };
    let (feed, publisher, mut relay) = setup(cfg);
    feed.set_present(true);
    feed.set_fields(1, 80, 500);
    relay.poll_once().await.expect("consistent");

    for _ in 0..3 {
        assert!(relay.watchdog_once().await.is_empty());
    }
    let edges = relay.watchdog_once().await;
    assert_eq!(edges.len(), 1);
    assert_eq!(edges[0].0.get(), 1);
    assert_eq!(edges[0].1, Transition::Disconnected);
    for _ in 0..5 {
        assert!(relay.watchdog_once().await.is_empty());
    }
    assert_eq!(publisher.fields(1).map(|f| f.connected), Some(false));
    settle().await;
    assert!(!relay.connectivity().is_connected(1).await);

    relay.poll_once().await.expect("consistent");
    relay.poll_once().await.expect("consistent");
    assert_eq!(publisher.fields(1).map(|f| f.connected), Some(true));
    settle().await;
    assert!(relay.connectivity().is_connected(1).await);
}

#[tokio::test]
async fn external_write_recomputes_remaining_and_feeds_watchdog() {
    let cfg = Config {
        watchdog_timeout: Duration::from_secs(1),
        ..config()
    };
    let (feed, publisher, mut relay) = setup(cfg);
    feed.set_present(true);
    feed.set_fields(1, 80, 500);
    relay.poll_once().await.expect("consistent");
    relay.watchdog_once().await;
    relay.watchdog_once().await;
    assert!(!relay.channel(1).expect("in range").is_connected());

    let write = Inbound::EndpointWrite {
        channel: 1,
        field: EndpointField::Level,
        value: FieldValue::Float(25.0),
    };
    assert_eq!(relay.deliver(write).await, Ok(CommitOutcome::Updated));
    assert_eq!(publisher.fields(1).map(|f| f.remaining), Some(125.0));
    assert!(relay.channel(1).expect("in range").is_connected());
    assert_eq!(publisher.creations(), 1);

    let read_only = Inbound::EndpointWrite {
        channel: 1,
        field: EndpointField::Connected,
        value: FieldValue::Int(0),
    };
    assert_eq!(relay.deliver(read_only).await, Ok(CommitOutcome::Ignored));
}

#[tokio::test]
async fn upstream_restart_is_recovered_by_reresolution() {
    let (feed, publisher, mut relay) = setup(config());
    feed.set_present(true);
    feed.set_fields(1, 80, 500);
    relay.poll_once().await.expect("consistent");
    let old_origin = feed.origin().expect("present");

    feed.restart();
    assert!(matches!(
        relay.poll_once().await,
        Err(RelayError::UpstreamUnavailable { .. })
    ));
    assert!(relay.engine().origin().is_none());

    feed.set_fields(2, 40, 300);
    assert_eq!(relay.poll_once().await, Ok(CommitOutcome::Created));
    assert_ne!(relay.engine().origin(), Some(&old_origin));

    let stale = Inbound::Notification(Notification::new(Field::ChannelId, 5_i64, old_origin));
    relay.deliver(stale).await.expect("handled");
    assert_eq!(relay.engine().pending().channel, None);
    assert_eq!(publisher.creations(), 2);
}

#[tokio::test]
async fn absent_upstream_is_not_an_error_surface() {
    let (_feed, publisher, mut relay) = setup(config());
    for _ in 0..3 {
        assert!(matches!(
            relay.poll_once().await,
            Err(RelayError::UpstreamUnavailable { .. })
        ));
    }
    assert!(relay.watchdog_once().await.is_empty());
    assert_eq!(publisher.creations(), 0);
}

#[tokio::test]
async fn failed_endpoint_creation_is_retried_on_next_commit() {
    let (feed, publisher, mut relay) = setup(config());
    publisher.fail_creates(1);
    feed.set_present(true);
    feed.set_fields(0, 30, 90);

    assert_eq!(relay.poll_once().await, Ok(CommitOutcome::CreateFailed));
    assert!(!relay.channel(0).expect("in range").is_published());
    assert_eq!(relay.poll_once().await, Ok(CommitOutcome::Created));
    assert_eq!(publisher.creations(), 1);
}

#[tokio::test]
async fn invalid_config_is_rejected_at_build() {
    let cfg = Config {
        channel_count: 0,
        ..config()
    };
    let err = Relay::builder(cfg)
        .build(
            Arc::new(MemoryFeed::new(ADDR)),
            Arc::new(MemoryPublisher::new()),
        )
        .err()
        .expect("rejected");
    assert!(matches!(err, RuntimeError::InvalidConfig { .. }));
}
