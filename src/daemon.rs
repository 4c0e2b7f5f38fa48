// SPDX-FileCopyrightText: 2025 Jason Pena <jasonpena@awkless.com>
// SPDX-License-Identifier: MIT

//! Clipboard polling daemon.
//!
//! The daemon watches the clipboard on a fixed schedule and records every new
//! clip into history. It runs one poll at a time on a single thread: read the
//! clipboard, integrate the clip if it differs from the last one seen, then
//! write history back to disk.
//!
//! # Sharing State With Foreground Commands
//!
//! Foreground commands like `pin` or `clear` edit the same documents the
//! daemon writes. The daemon therefore reloads both history and pinned right
//! before integrating a new clip, and only ever writes the history document.
//! A pin made in the foreground is never undone by the daemon, and a cleared
//! history does not come back with the next clip.

use crate::{
    clip::Identity,
    clipboard::{ClipboardBridge, ClipboardProvider},
    persist::Persistence,
    store::{ClipStore, Limits},
};

use std::{future::Future, time::Duration};
use tokio::time::{self, Interval, MissedTickBehavior};
use tracing::{debug, info, instrument, warn};

/// Layer of indirection for the polling schedule.
#[allow(async_fn_in_trait)]
pub trait Ticker {
    /// Wait until next poll is due.
    async fn tick(&mut self);
}

/// Fixed interval schedule.
///
/// Ticks missed because a poll ran long are not made up in a burst, the
/// schedule simply shifts.
#[derive(Debug)]
pub struct IntervalTicker {
    interval: Interval,
}

impl IntervalTicker {
    pub fn new(period: Duration) -> Self {
        let mut interval = time::interval(period);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
        Self { interval }
    }
}

impl Ticker for IntervalTicker {
    async fn tick(&mut self) {
        self.interval.tick().await;
    }
}

/// Lifecycle state of daemon.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub enum DaemonState {
    /// Waiting for next tick.
    #[default]
    Idle,

    /// Reading the clipboard.
    Polling,

    /// Merging a new clip into the clip store.
    Integrating,

    /// Shut down for good.
    Stopped,
}

/// Clipboard polling daemon.
#[derive(Debug)]
pub struct Daemon<P, T>
where
    P: ClipboardProvider,
    T: Ticker,
{
    bridge: ClipboardBridge<P>,
    persistence: Persistence,
    ticker: T,
    store: ClipStore,
    last_seen: Option<Identity>,
    dirty: bool,
    state: DaemonState,
}

impl<P, T> Daemon<P, T>
where
    P: ClipboardProvider,
    T: Ticker,
{
    /// Construct new daemon, loading current clip store from disk.
    pub fn new(
        bridge: ClipboardBridge<P>,
        persistence: Persistence,
        ticker: T,
        limits: Limits,
    ) -> Self {
        let store = persistence.load_store(limits);
        Self {
            bridge,
            persistence,
            ticker,
            store,
            last_seen: None,
            dirty: false,
            state: DaemonState::Idle,
        }
    }

    pub fn state(&self) -> DaemonState {
        self.state
    }

    /// Clip store as of the last integration.
    pub fn store(&self) -> &ClipStore {
        &self.store
    }

    /// Run one poll, integrate, save cycle.
    pub async fn poll_once(&mut self) {
        self.state = DaemonState::Polling;
        if let Some(clip) = self.bridge.read().await {
            let identity = clip.identity();
            if self.last_seen.as_ref() != Some(&identity) {
                self.state = DaemonState::Integrating;
                self.store = self.persistence.load_store(self.store.limits());
                self.store.add(clip);
                self.dirty = true;
                self.last_seen = Some(identity);
                debug!("integrated new {:?} clip", self.last_seen.as_ref().map(Identity::kind));
            }
        }

        self.flush();
        self.state = DaemonState::Idle;
    }

    /// Write history to disk if it has unsaved changes.
    ///
    /// A failed write keeps the changes pending, so the next flush retries.
    pub fn flush(&mut self) {
        if !self.dirty {
            return;
        }

        match self.persistence.save_history_only(&self.store) {
            Ok(()) => self.dirty = false,
            Err(error) => warn!("failed to save history, retrying next poll: {error}"),
        }
    }

    /// Poll clipboard on every tick until shutdown future resolves.
    ///
    /// A poll already in progress when shutdown arrives is allowed to finish.
    /// Pending changes are flushed once more before stopping.
    #[instrument(skip(self, shutdown), fields(provider = self.bridge.provider().name()), level = "debug")]
    pub async fn run_until(&mut self, shutdown: impl Future<Output = ()>) {
        info!(
            "watching clipboard through {}",
            self.bridge.provider().name()
        );

        tokio::pin!(shutdown);
        loop {
            tokio::select! {
                biased;
                () = &mut shutdown => break,
                () = self.ticker.tick() => {}
            }

            self.poll_once().await;
        }

        self.flush();
        self.state = DaemonState::Stopped;
        info!("clipboard daemon stopped");
    }
}

/// Install interrupt and terminate handlers.
///
/// Handlers are live once this returns. The returned future resolves on the
/// first signal received.
///
/// Must be called from within a tokio runtime.
///
/// # Errors
///
/// - Return [`std::io::Error`] if signal handlers cannot be installed.
#[cfg(unix)]
pub fn shutdown_signal() -> std::io::Result<impl Future<Output = ()>> {
    use tokio::signal::unix::{signal, SignalKind};

    let mut terminate = signal(SignalKind::terminate())?;
    let mut interrupt = signal(SignalKind::interrupt())?;
    Ok(async move {
        tokio::select! {
            _ = terminate.recv() => info!("received SIGTERM"),
            _ = interrupt.recv() => info!("received SIGINT"),
        }
    })
}

/// Install Ctrl+C handler.
///
/// Must be called from within a tokio runtime.
///
/// # Errors
///
/// - Return [`std::io::Error`] if signal handler cannot be installed.
#[cfg(windows)]
pub fn shutdown_signal() -> std::io::Result<impl Future<Output = ()>> {
    let mut interrupt = tokio::signal::windows::ctrl_c()?;
    Ok(async move {
        interrupt.recv().await;
        info!("received Ctrl+C");
    })
}
