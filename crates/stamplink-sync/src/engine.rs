//! Member-side reconciliation of optimistic updates with the ledger.
//!
//! One task owns the member view. Peer notifications apply a local delta and
//! arm a forced refresh; the refresh overwrites the view with the ledger's
//! record whatever the delta produced. A periodic poll and same-device bus
//! signals cover missed notifications.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use stamplink_canonical::MemberId;
use stamplink_core::{now_millis, Member};
use stamplink_ledger::LedgerGateway;
use stamplink_peer::HostHandler;
use tokio::sync::broadcast::error::RecvError;
use tokio::sync::{broadcast, mpsc, oneshot, watch};
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tracing::{debug, info, trace, warn};

use crate::bus::{SyncBus, SyncSignal};

/// Sync phase of the member view.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncPhase {
    /// The view equals the last authoritative snapshot.
    Synced,
    /// A local delta is shown and a forced refresh is pending.
    OptimisticPending,
}

/// Timers driving the engine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineOptions {
    /// Wait between a notification and its forced refresh.
    pub refresh_delay: Duration,
    /// Period of the background poll.
    pub poll_interval: Duration,
    /// How long a scan alert stays raised.
    pub scan_alert_duration: Duration,
}

impl Default for EngineOptions {
    fn default() -> Self {
        Self {
            refresh_delay: Duration::from_secs(1),
            poll_interval: Duration::from_secs(10),
            scan_alert_duration: Duration::from_secs(3),
        }
    }
}

enum Command {
    Notify { count: u32, ack: oneshot::Sender<bool> },
    ScanAlert,
    Refresh { done: oneshot::Sender<()> },
}

/// Cloneable handle to a running engine.
///
/// Implements [`HostHandler`] so it can back a peer host directly.
#[derive(Clone)]
pub struct EngineHandle {
    commands: mpsc::Sender<Command>,
    view: watch::Receiver<Member>,
    phase: watch::Receiver<SyncPhase>,
    alert: watch::Receiver<bool>,
}

impl EngineHandle {
    /// Current member view.
    pub fn current(&self) -> Member {
        self.view.borrow().clone()
    }

    /// Current sync phase.
    pub fn current_phase(&self) -> SyncPhase {
        *self.phase.borrow()
    }

    /// Subscribes to view changes.
    pub fn view(&self) -> watch::Receiver<Member> {
        self.view.clone()
    }

    /// Subscribes to phase changes.
    pub fn phase(&self) -> watch::Receiver<SyncPhase> {
        self.phase.clone()
    }

    /// Subscribes to the scan alert flag.
    pub fn scan_alert(&self) -> watch::Receiver<bool> {
        self.alert.clone()
    }

    /// Reports a committed increment of `count` stamps.
    ///
    /// Returns false if `count` is zero or the engine has stopped.
    pub async fn notify_stamps(&self, count: u32) -> bool {
        if count == 0 {
            return false;
        }
        let (ack, accepted) = oneshot::channel();
        if self
            .commands
            .send(Command::Notify { count, ack })
            .await
            .is_err()
        {
            return false;
        }
        accepted.await.unwrap_or(false)
    }

    /// Raises the scan alert.
    pub fn raise_scan_alert(&self) {
        if let Err(e) = self.commands.try_send(Command::ScanAlert) {
            debug!(error = %e, "scan alert dropped");
        }
    }

    /// Forces an authoritative refresh and waits for it to finish.
    pub async fn refresh(&self) {
        let (done, finished) = oneshot::channel();
        if self.commands.send(Command::Refresh { done }).await.is_ok() {
            let _ = finished.await;
        }
    }
}

#[async_trait]
impl HostHandler for EngineHandle {
    fn profile(&self) -> Option<Member> {
        Some(self.current())
    }

    async fn on_add_stamp(&self, count: u32) -> bool {
        self.notify_stamps(count).await
    }

    fn on_scan_alert(&self) {
        self.raise_scan_alert();
    }
}

/// Owns the member view for one session.
pub struct ReconciliationEngine {
    handle: EngineHandle,
    task: JoinHandle<()>,
}

impl ReconciliationEngine {
    /// Starts the engine from an initial snapshot.
    pub fn start(
        initial: Member,
        gateway: Arc<LedgerGateway>,
        bus: &SyncBus,
        options: EngineOptions,
    ) -> Self {
        let (commands, inbox) = mpsc::channel(32);
        let (view_tx, view) = watch::channel(initial.clone());
        let (phase_tx, phase) = watch::channel(SyncPhase::Synced);
        let (alert_tx, alert) = watch::channel(false);

        let worker = Worker {
            member_id: initial.id.clone(),
            gateway,
            options,
            view: view_tx,
            phase: phase_tx,
            alert: alert_tx,
            refresh_at: None,
            alert_until: None,
        };
        info!(member = %initial.id, "reconciliation engine started");
        let task = tokio::spawn(worker.run(inbox, bus.subscribe()));

        Self {
            handle: EngineHandle {
                commands,
                view,
                phase,
                alert,
            },
            task,
        }
    }

    /// Handle for notifications and subscriptions.
    pub fn handle(&self) -> EngineHandle {
        self.handle.clone()
    }

    /// Stops the engine.
    pub fn shutdown(&self) {
        self.task.abort();
    }
}

impl Drop for ReconciliationEngine {
    fn drop(&mut self) {
        self.task.abort();
    }
}

struct Worker {
    member_id: MemberId,
    gateway: Arc<LedgerGateway>,
    options: EngineOptions,
    view: watch::Sender<Member>,
    phase: watch::Sender<SyncPhase>,
    alert: watch::Sender<bool>,
    refresh_at: Option<Instant>,
    alert_until: Option<Instant>,
}

async fn sleep_until(deadline: Option<Instant>) {
    match deadline {
        Some(deadline) => tokio::time::sleep_until(deadline).await,
        None => std::future::pending().await,
    }
}

impl Worker {
    async fn run(
        mut self,
        mut inbox: mpsc::Receiver<Command>,
        mut signals: broadcast::Receiver<SyncSignal>,
    ) {
        let period = self.options.poll_interval;
        let mut poll = tokio::time::interval_at(Instant::now() + period, period);
        poll.set_missed_tick_behavior(MissedTickBehavior::Delay);
        let mut bus_open = true;

        loop {
            tokio::select! {
                command = inbox.recv() => match command {
                    Some(command) => self.handle(command).await,
                    None => break,
                },
                _ = sleep_until(self.refresh_at) => self.forced_refresh().await,
                _ = poll.tick() => self.poll().await,
                signal = signals.recv(), if bus_open => match signal {
                    Ok(SyncSignal::LedgerUpdated { member_id }) if member_id == self.member_id => {
                        debug!(member = %member_id, "same-device update, refreshing");
                        self.forced_refresh().await;
                    }
                    Ok(_) => {}
                    Err(RecvError::Lagged(missed)) => {
                        warn!(missed, "sync bus lagged, refreshing");
                        self.forced_refresh().await;
                    }
                    Err(RecvError::Closed) => bus_open = false,
                },
                _ = sleep_until(self.alert_until) => {
                    self.alert_until = None;
                    self.alert.send_replace(false);
                }
            }
        }
        debug!(member = %self.member_id, "reconciliation engine stopped");
    }

    async fn handle(&mut self, command: Command) {
        match command {
            Command::Notify { count, ack } => {
                let accepted = self.apply_notification(count);
                let _ = ack.send(accepted);
            }
            Command::ScanAlert => {
                self.alert.send_replace(true);
                self.alert_until = Some(Instant::now() + self.options.scan_alert_duration);
            }
            Command::Refresh { done } => {
                self.forced_refresh().await;
                let _ = done.send(());
            }
        }
    }

    fn apply_notification(&mut self, count: u32) -> bool {
        if count == 0 {
            return false;
        }
        self.view.send_modify(|member| member.apply_optimistic(count, now_millis()));
        self.phase.send_replace(SyncPhase::OptimisticPending);
        self.refresh_at = Some(Instant::now() + self.options.refresh_delay);
        debug!(member = %self.member_id, count, "optimistic delta applied");
        true
    }

    /// Replaces the view with the ledger's record unconditionally.
    async fn forced_refresh(&mut self) {
        self.refresh_at = None;
        match self.gateway.get_member(&self.member_id).await {
            Ok(member) => {
                self.view.send_replace(member);
                self.phase.send_replace(SyncPhase::Synced);
                trace!(member = %self.member_id, "view synced");
            }
            Err(e) => {
                warn!(member = %self.member_id, error = %e, "forced refresh failed");
                if *self.phase.borrow() == SyncPhase::OptimisticPending {
                    self.refresh_at = Some(Instant::now() + self.options.poll_interval);
                }
            }
        }
    }

    /// Replaces the view only when the ledger's record differs from it.
    async fn poll(&mut self) {
        if *self.phase.borrow() == SyncPhase::OptimisticPending {
            trace!("poll skipped while a forced refresh is pending");
            return;
        }
        match self.gateway.get_member(&self.member_id).await {
            Ok(member) => {
                self.view.send_if_modified(|current| {
                    if *current == member {
                        false
                    } else {
                        *current = member;
                        true
                    }
                });
            }
            Err(e) => debug!(member = %self.member_id, error = %e, "poll failed"),
        }
    }
}
