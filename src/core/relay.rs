//! # Relay: the single-task scheduler.
//!
//! The [`Relay`] owns every piece of mutable state (accessor, fusion engine,
//! channel table) and drives it from one `select!` loop, so no state is shared
//! across tasks and nothing needs a lock.
//!
//! ## Architecture
//! ```text
//!                    ┌────────────── Relay::run(token) ───────────────┐
//! token.cancelled() ─┤                                                 │
//! OS signal ─────────┤  break ─► ShutdownRequested ─► RelayStopped    │
//!                    │                                                 │
//! poll interval ─────┤  poll_once()                                    │
//!                    │    FeedAccessor::ensure_resolved                │
//!                    │    SnapshotReader::read ─► FusionEngine ─► commit
//!                    │                                                 │
//! watchdog interval ─┤  watchdog_once() ─► every ChannelSupervisor::tick
//!                    │                                                 │
//! Inlet ─► mpsc ─────┤  deliver(Inbound)                               │
//!                    │    Notification  ─► FusionEngine ─► commit      │
//!                    │    EndpointWrite ─► ChannelSupervisor           │
//!                    └─────────────────────────────────────────────────┘
//!
//! Events: components ─► Bus ─► listener ─► ConnectivityTracker + SubscriberSet
//! ```
//!
//! Arms are polled top to bottom: a due tick is served before queued inbound items,
//! so a notification burst never holds back polling or the watchdog.
//!
//! The step methods (`poll_once`, `watchdog_once`, `deliver`) are public so callers
//! can drive the relay deterministically without timers.

use std::sync::Arc;

use tokio::sync::{broadcast, mpsc};
use tokio::task::JoinHandle;
use tokio::time::{MissedTickBehavior, interval};
use tokio_util::sync::CancellationToken;

use crate::channels::{ChannelId, ChannelSupervisor, ChannelTable, CommitOutcome, Transition};
use crate::error::{RelayError, RuntimeError};
use crate::events::{Bus, Event, EventKind};
use crate::fusion::{Commit, FusionEngine};
use crate::subscribers::SubscriberSet;
use crate::upstream::{FeedAccessor, SnapshotReader};

use super::builder::RelayBuilder;
use super::config::Config;
use super::connectivity::ConnectivityTracker;
use super::inlet::{Inbound, Inlet};
use super::shutdown;

/// Parts assembled by [`RelayBuilder`].
pub(super) struct RelayParts {
    pub cfg: Config,
    pub bus: Bus,
    pub accessor: FeedAccessor,
    pub engine: FusionEngine,
    pub table: ChannelTable,
    pub subs: Arc<SubscriberSet>,
    pub connectivity: Arc<ConnectivityTracker>,
}

/// Tank-sensor relay: reconciles one multiplexed feed into per-channel endpoints.
pub struct Relay {
    cfg: Config,
    bus: Bus,
    accessor: FeedAccessor,
    reader: SnapshotReader,
    engine: FusionEngine,
    table: ChannelTable,
    inbound_tx: mpsc::Sender<Inbound>,
    inbound_rx: mpsc::Receiver<Inbound>,
    connectivity: Arc<ConnectivityTracker>,
    subs: Option<Arc<SubscriberSet>>,
    listener: Option<JoinHandle<()>>,
    listener_stop: CancellationToken,
}

impl Relay {
    /// Starts building a relay from `cfg`.
    pub fn builder(cfg: Config) -> RelayBuilder {
        RelayBuilder::new(cfg)
    }

    pub(super) fn from_parts(parts: RelayParts) -> Self {
        let (inbound_tx, inbound_rx) = mpsc::channel(parts.cfg.inbound_capacity_clamped());
        let listener_stop = CancellationToken::new();
        let listener = spawn_listener(
            parts.bus.subscribe(),
            Arc::clone(&parts.subs),
            Arc::clone(&parts.connectivity),
            listener_stop.clone(),
        );
        Self {
            reader: SnapshotReader::new(parts.cfg.tear_policy),
            cfg: parts.cfg,
            bus: parts.bus,
            accessor: parts.accessor,
            engine: parts.engine,
            table: parts.table,
            inbound_tx,
            inbound_rx,
            connectivity: parts.connectivity,
            subs: Some(parts.subs),
            listener: Some(listener),
            listener_stop,
        }
    }

    /// Handle for transports to push notifications and endpoint writes.
    pub fn inlet(&self) -> Inlet {
        Inlet::new(self.inbound_tx.clone())
    }

    /// Connectivity view that stays valid after the relay is moved into `run`.
    pub fn connectivity(&self) -> Arc<ConnectivityTracker> {
        Arc::clone(&self.connectivity)
    }

    pub fn config(&self) -> &Config {
        &self.cfg
    }

    pub fn bus(&self) -> &Bus {
        &self.bus
    }

    pub fn accessor(&self) -> &FeedAccessor {
        &self.accessor
    }

    pub fn engine(&self) -> &FusionEngine {
        &self.engine
    }

    pub fn channels(&self) -> &ChannelTable {
        &self.table
    }

    /// Supervisor for a raw channel id, `None` when out of range.
    pub fn channel(&self, raw: i64) -> Option<&ChannelSupervisor> {
        let id = self.table.space().resolve(raw).ok()?;
        self.table.get(id)
    }

    /// One fast tick: resolve the upstream if needed, read a consistent snapshot
    /// and commit it.
    ///
    /// Every error is recoverable and is retried on the next tick.
    pub async fn poll_once(&mut self) -> Result<CommitOutcome, RelayError> {
        let resolved = self.accessor.ensure_resolved().await;
        self.sync_origin();
        resolved?;

        let read = self.reader.read(&mut self.accessor).await;
        self.sync_origin();
        match self.engine.on_poll(read?)? {
            Some(commit) => Ok(self.apply(commit).await),
            None => Ok(CommitOutcome::Ignored),
        }
    }

    /// One slow tick: advances every channel's watchdog.
    ///
    /// Returns the connectivity edges caused by this tick.
    pub async fn watchdog_once(&mut self) -> Vec<(ChannelId, Transition)> {
        let mut edges = Vec::new();
        for sup in self.table.iter_mut() {
            if let Some(edge) = sup.tick().await {
                edges.push((sup.id(), edge));
            }
        }
        edges
    }

    /// Handles one inbound item.
    ///
    /// External writes report `Updated` when accepted and `Ignored` when rejected.
    pub async fn deliver(&mut self, inbound: Inbound) -> Result<CommitOutcome, RelayError> {
        match inbound {
            Inbound::Notification(notification) => {
                match self.engine.on_notification(&notification) {
                    Some(commit) => Ok(self.apply(commit).await),
                    None => Ok(CommitOutcome::Ignored),
                }
            }
            Inbound::EndpointWrite {
                channel,
                field,
                value,
            } => {
                let sup = match self.table.lookup_mut(channel) {
                    Ok(sup) => sup,
                    Err(err) => {
                        self.bus
                            .publish(Event::new(EventKind::ChannelOutOfRange).with_raw(channel));
                        return Err(err);
                    }
                };
                if sup.external_write(field, value).await {
                    Ok(CommitOutcome::Updated)
                } else {
                    Ok(CommitOutcome::Ignored)
                }
            }
        }
    }

    /// Runs the scheduler until `token` is cancelled or, when
    /// [`Config::handle_signals`] is set, a termination signal arrives.
    ///
    /// On exit publishes `ShutdownRequested` and `RelayStopped`, then drains the
    /// subscriber queues.
    pub async fn run(mut self, token: CancellationToken) -> Result<(), RuntimeError> {
        let mut poll = interval(self.cfg.poll_period);
        poll.set_missed_tick_behavior(MissedTickBehavior::Delay);
        let mut watchdog = interval(self.cfg.watchdog_period);
        watchdog.set_missed_tick_behavior(MissedTickBehavior::Delay);

        let handle_signals = self.cfg.handle_signals;
        let signal = async move {
            if handle_signals {
                shutdown::wait_for_shutdown_signal().await
            } else {
                std::future::pending().await
            }
        };
        tokio::pin!(signal);

        let result = loop {
            tokio::select! {
                biased;
                _ = token.cancelled() => break Ok(()),
                res = &mut signal => {
                    break res.map_err(|err| RuntimeError::Signal { reason: err.to_string() });
                }
                _ = poll.tick() => {
                    let _ = self.poll_once().await;
                }
                _ = watchdog.tick() => {
                    self.watchdog_once().await;
                }
                Some(inbound) = self.inbound_rx.recv() => {
                    let _ = self.deliver(inbound).await;
                }
            }
        };

        self.bus.publish(Event::new(EventKind::ShutdownRequested));
        let connected = self
            .table
            .connected()
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join(",");
        self.bus
            .publish(Event::new(EventKind::RelayStopped).with_reason(connected));
        self.finish().await;
        result
    }

    fn sync_origin(&mut self) {
        self.engine.set_origin(self.accessor.origin().cloned());
    }

    async fn apply(&mut self, commit: Commit) -> CommitOutcome {
        match self.table.get_mut(commit.channel) {
            Some(sup) => sup.commit(commit.level, commit.capacity).await,
            None => CommitOutcome::Ignored,
        }
    }

    /// Stops the listener after it drained the bus, then shuts the subscriber workers down.
    async fn finish(&mut self) {
        self.listener_stop.cancel();
        if let Some(listener) = self.listener.take() {
            let _ = listener.await;
        }
        if let Some(Ok(subs)) = self.subs.take().map(Arc::try_unwrap) {
            subs.shutdown().await;
        }
    }
}

impl Drop for Relay {
    fn drop(&mut self) {
        self.listener_stop.cancel();
    }
}

/// Forwards bus events to the connectivity tracker and the subscriber set until stopped.
fn spawn_listener(
    mut rx: broadcast::Receiver<Event>,
    subs: Arc<SubscriberSet>,
    connectivity: Arc<ConnectivityTracker>,
    stop: CancellationToken,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        loop {
            tokio::select! {
                biased;
                res = rx.recv() => match res {
                    Ok(ev) => forward(&ev, &subs, &connectivity).await,
                    Err(broadcast::error::RecvError::Lagged(_)) => continue,
                    Err(broadcast::error::RecvError::Closed) => break,
                },
                _ = stop.cancelled() => {
                    loop {
                        match rx.try_recv() {
                            Ok(ev) => forward(&ev, &subs, &connectivity).await,
                            Err(broadcast::error::TryRecvError::Lagged(_)) => continue,
                            Err(_) => break,
                        }
                    }
                    break;
                }
            }
        }
    })
}

async fn forward(ev: &Event, subs: &SubscriberSet, connectivity: &ConnectivityTracker) {
    if ev.is_connectivity() {
        connectivity.update(ev).await;
    }
    subs.emit(ev);
}
