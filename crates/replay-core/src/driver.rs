//! Session Driver
//!
//! Runs a `ReplaySession` inside its own task. Ticks, playback actions, rate
//! changes and reads all travel through one command channel, so they are
//! applied strictly one after another and a tick never observes a half-applied
//! transition. Every processed command publishes a fresh snapshot on a
//! `watch` channel for observers.

use std::num::NonZeroUsize;
use std::time::Duration;

use tokio::sync::{mpsc, oneshot, watch};
use tokio::task::JoinHandle;
use tokio::time::{self, MissedTickBehavior};
use tracing::{debug, info};

use crate::error::{ReplayError, Result};
use crate::playback::PlaybackAction;
use crate::session::{ReplaySession, SessionSnapshot};
use crate::types::{AssetId, AssetSeries};

const COMMAND_BUFFER: usize = 64;

enum Command {
    Tick,
    Action(PlaybackAction, oneshot::Sender<SessionSnapshot>),
    SetRate(NonZeroUsize, oneshot::Sender<SessionSnapshot>),
    Snapshot(oneshot::Sender<SessionSnapshot>),
    Trigger(String, oneshot::Sender<SessionSnapshot>),
    Series(AssetId, oneshot::Sender<Result<AssetSeries>>),
    AllSeries(oneshot::Sender<Vec<AssetSeries>>),
    Shutdown,
}

/// Cloneable handle to a running session task
#[derive(Debug, Clone)]
pub struct SessionHandle {
    id: String,
    commands: mpsc::Sender<Command>,
    updates: watch::Receiver<SessionSnapshot>,
}

impl SessionHandle {
    /// Move `session` into a new task and return a handle to it.
    pub fn spawn(mut session: ReplaySession) -> Self {
        let id = session.id().to_string();
        let (commands, rx) = mpsc::channel(COMMAND_BUFFER);
        let (publisher, updates) = watch::channel(session.snapshot());

        tokio::spawn(run_session(session, rx, publisher));
        info!(session = %id, "Session task started");

        Self {
            id,
            commands,
            updates,
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    /// Deliver one tick without waiting for it to be processed.
    pub async fn tick(&self) -> Result<()> {
        self.send(Command::Tick).await
    }

    pub async fn start(&self) -> Result<SessionSnapshot> {
        self.apply(PlaybackAction::Start).await
    }

    pub async fn pause(&self) -> Result<SessionSnapshot> {
        self.apply(PlaybackAction::Pause).await
    }

    pub async fn apply(&self, action: PlaybackAction) -> Result<SessionSnapshot> {
        let (tx, rx) = oneshot::channel();
        self.send(Command::Action(action, tx)).await?;
        rx.await.map_err(|_| ReplayError::SessionClosed)
    }

    /// Apply a textual trigger; unrecognized triggers leave playback as is.
    pub async fn trigger(&self, trigger: &str) -> Result<SessionSnapshot> {
        let (tx, rx) = oneshot::channel();
        self.send(Command::Trigger(trigger.to_string(), tx)).await?;
        rx.await.map_err(|_| ReplayError::SessionClosed)
    }

    pub async fn set_rate(&self, rate: NonZeroUsize) -> Result<SessionSnapshot> {
        let (tx, rx) = oneshot::channel();
        self.send(Command::SetRate(rate, tx)).await?;
        rx.await.map_err(|_| ReplayError::SessionClosed)
    }

    /// Snapshot taken after every previously queued command has run.
    pub async fn snapshot(&self) -> Result<SessionSnapshot> {
        let (tx, rx) = oneshot::channel();
        self.send(Command::Snapshot(tx)).await?;
        rx.await.map_err(|_| ReplayError::SessionClosed)
    }

    pub async fn series(&self, asset: AssetId) -> Result<AssetSeries> {
        let (tx, rx) = oneshot::channel();
        self.send(Command::Series(asset, tx)).await?;
        rx.await.map_err(|_| ReplayError::SessionClosed)?
    }

    /// Series of every tracked asset, all cut at the same boundary.
    pub async fn all_series(&self) -> Result<Vec<AssetSeries>> {
        let (tx, rx) = oneshot::channel();
        self.send(Command::AllSeries(tx)).await?;
        rx.await.map_err(|_| ReplayError::SessionClosed)
    }

    /// Most recently published snapshot, without queueing.
    pub fn latest(&self) -> SessionSnapshot {
        self.updates.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<SessionSnapshot> {
        self.updates.clone()
    }

    pub async fn shutdown(&self) -> Result<()> {
        self.send(Command::Shutdown).await
    }

    pub fn is_closed(&self) -> bool {
        self.commands.is_closed()
    }

    /// Fire a tick every `period` until the session stops.
    ///
    /// Missed ticks are skipped rather than replayed in a burst.
    pub fn spawn_ticker(&self, period: Duration) -> JoinHandle<()> {
        let handle = self.clone();
        tokio::spawn(async move {
            let mut interval = time::interval(period);
            interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
            loop {
                interval.tick().await;
                if handle.tick().await.is_err() {
                    debug!(session = %handle.id, "Ticker stopped");
                    break;
                }
            }
        })
    }

    async fn send(&self, command: Command) -> Result<()> {
        self.commands
            .send(command)
            .await
            .map_err(|_| ReplayError::SessionClosed)
    }
}

async fn run_session(
    mut session: ReplaySession,
    mut commands: mpsc::Receiver<Command>,
    publisher: watch::Sender<SessionSnapshot>,
) {
    while let Some(command) = commands.recv().await {
        match command {
            Command::Tick => {
                let report = session.tick();
                publisher.send_replace(report.snapshot);
            }
            Command::Action(action, reply) => {
                session.apply(action);
                let snapshot = session.snapshot();
                publisher.send_replace(snapshot.clone());
                let _ = reply.send(snapshot);
            }
            Command::Trigger(trigger, reply) => {
                session.apply_trigger(&trigger);
                let snapshot = session.snapshot();
                publisher.send_replace(snapshot.clone());
                let _ = reply.send(snapshot);
            }
            Command::SetRate(rate, reply) => {
                session.set_rate(rate);
                let snapshot = session.snapshot();
                publisher.send_replace(snapshot.clone());
                let _ = reply.send(snapshot);
            }
            Command::Snapshot(reply) => {
                let _ = reply.send(session.snapshot());
            }
            Command::Series(asset, reply) => {
                let _ = reply.send(session.series(&asset));
            }
            Command::AllSeries(reply) => {
                let _ = reply.send(session.all_series());
            }
            Command::Shutdown => break,
        }
    }

    info!(session = %session.id(), "Session task stopped");
}
