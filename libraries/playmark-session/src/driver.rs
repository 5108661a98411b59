//! Session driver
//!
//! Owns the state machine inside one task and feeds it, in delivery order,
//! everything that can change a session: commands from [`SessionHandle`]s,
//! player notifications, the two periodic checks and the deadline of the
//! next scheduled action.

use crate::adapter::PlaybackEventAdapter;
use crate::error::{Result, SessionError};
use crate::machine::{SessionStateMachine, SessionStatus};
use playmark_core::{PlayerNotification, PlaylistRef};
use std::time::Duration;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};
use uuid::Uuid;

const COMMAND_BUFFER: usize = 32;

/// Periods of the recurring checks
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimingConfig {
    /// Elapsed-time UI tick
    pub elapsed_tick: Duration,
    /// Completion check
    pub completion_check: Duration,
}

impl Default for TimingConfig {
    fn default() -> Self {
        Self {
            elapsed_tick: Duration::from_secs(1),
            completion_check: Duration::from_secs(1),
        }
    }
}

enum DriverCommand {
    Start(oneshot::Sender<Result<Uuid>>),
    FinishEarly(oneshot::Sender<Result<String>>),
    SavePlaylist(oneshot::Sender<Result<PlaylistRef>>),
    Status(oneshot::Sender<SessionStatus>),
    Shutdown,
}

#[derive(Debug, Clone, Copy)]
enum PeriodicCheck {
    Elapsed,
    Completion,
}

/// Task that owns a [`SessionStateMachine`]
pub struct SessionDriver {
    machine: SessionStateMachine,
    commands: mpsc::Receiver<DriverCommand>,
    notifications: mpsc::Receiver<PlayerNotification>,
    checks_tx: mpsc::UnboundedSender<PeriodicCheck>,
    checks_rx: mpsc::UnboundedReceiver<PeriodicCheck>,
    timing: TimingConfig,
}

impl SessionDriver {
    /// Wrap a machine; returns the driver and a handle to control it
    pub fn new(
        machine: SessionStateMachine,
        notifications: mpsc::Receiver<PlayerNotification>,
        timing: TimingConfig,
    ) -> (Self, SessionHandle) {
        let (tx, commands) = mpsc::channel(COMMAND_BUFFER);
        let (checks_tx, checks_rx) = mpsc::unbounded_channel();
        let driver = Self {
            machine,
            commands,
            notifications,
            checks_tx,
            checks_rx,
            timing,
        };
        (driver, SessionHandle { tx })
    }

    /// Spawn [`Self::run`] on the current runtime
    pub fn spawn(self) -> JoinHandle<()> {
        tokio::spawn(self.run())
    }

    /// Event loop; returns on shutdown or when every handle is dropped
    pub async fn run(mut self) {
        info!("Session driver started");
        let mut notifications_open = true;

        loop {
            let wait = self.machine.next_deadline_ms().map(|due| {
                let remaining = due.saturating_sub(self.machine.now_ms());
                Duration::from_millis(u64::try_from(remaining).unwrap_or(0))
            });

            tokio::select! {
                cmd = self.commands.recv() => match cmd {
                    None | Some(DriverCommand::Shutdown) => break,
                    Some(cmd) => self.handle_command(cmd).await,
                },
                notification = self.notifications.recv(), if notifications_open => {
                    match notification {
                        Some(notification) => {
                            PlaybackEventAdapter::dispatch(notification, &mut self.machine);
                        }
                        None => {
                            warn!("Player notification stream closed");
                            notifications_open = false;
                        }
                    }
                }
                Some(check) = self.checks_rx.recv() => self.handle_check(check),
                () = sleep_until_due(wait) => self.machine.run_due_actions().await,
            }
        }

        if let Some(checks) = self.machine.periodic_checks() {
            checks.cancel_all();
        }
        info!("Session driver stopped");
    }

    async fn handle_command(&mut self, cmd: DriverCommand) {
        match cmd {
            DriverCommand::Start(reply) => {
                let result = self.machine.start().await;
                if result.is_ok() {
                    self.arm_periodic_checks();
                }
                let _ = reply.send(result);
            }
            DriverCommand::FinishEarly(reply) => {
                let _ = reply.send(self.machine.finish_early());
            }
            DriverCommand::SavePlaylist(reply) => {
                let _ = reply.send(self.machine.save_playlist().await);
            }
            DriverCommand::Status(reply) => {
                let _ = reply.send(self.machine.status());
            }
            DriverCommand::Shutdown => {}
        }
    }

    fn handle_check(&mut self, check: PeriodicCheck) {
        match check {
            PeriodicCheck::Elapsed => self.machine.tick_elapsed(),
            PeriodicCheck::Completion => {
                if let Some(code) = self.machine.check_completion() {
                    debug!(code = %code, "Completion check finished the session");
                }
            }
        }
    }

    fn arm_periodic_checks(&self) {
        let Some(checks) = self.machine.periodic_checks() else {
            return;
        };
        spawn_check(
            checks.elapsed_token(),
            self.timing.elapsed_tick,
            PeriodicCheck::Elapsed,
            self.checks_tx.clone(),
        );
        spawn_check(
            checks.completion_token(),
            self.timing.completion_check,
            PeriodicCheck::Completion,
            self.checks_tx.clone(),
        );
    }
}

async fn sleep_until_due(wait: Option<Duration>) {
    match wait {
        Some(duration) => tokio::time::sleep(duration).await,
        None => std::future::pending().await,
    }
}

fn spawn_check(
    token: CancellationToken,
    period: Duration,
    kind: PeriodicCheck,
    tx: mpsc::UnboundedSender<PeriodicCheck>,
) {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(period.max(Duration::from_millis(1)));
        // First tick completes immediately
        interval.tick().await;

        loop {
            tokio::select! {
                () = token.cancelled() => break,
                _ = interval.tick() => {
                    if tx.send(kind).is_err() {
                        break;
                    }
                }
            }
        }
        debug!(?kind, "Periodic check stopped");
    });
}

/// Cloneable control handle for a running [`SessionDriver`]
#[derive(Clone)]
pub struct SessionHandle {
    tx: mpsc::Sender<DriverCommand>,
}

impl SessionHandle {
    async fn request<T>(
        &self,
        make: impl FnOnce(oneshot::Sender<T>) -> DriverCommand,
    ) -> Result<T> {
        let (reply, rx) = oneshot::channel();
        self.tx
            .send(make(reply))
            .await
            .map_err(|_| SessionError::DriverClosed)?;
        rx.await.map_err(|_| SessionError::DriverClosed)
    }

    /// Start a session; see [`SessionStateMachine::start`]
    pub async fn start(&self) -> Result<Uuid> {
        self.request(DriverCommand::Start).await?
    }

    /// Finish early; see [`SessionStateMachine::finish_early`]
    pub async fn finish_early(&self) -> Result<String> {
        self.request(DriverCommand::FinishEarly).await?
    }

    /// Save the session as a playlist; see [`SessionStateMachine::save_playlist`]
    pub async fn save_playlist(&self) -> Result<PlaylistRef> {
        self.request(DriverCommand::SavePlaylist).await?
    }

    pub async fn status(&self) -> Result<SessionStatus> {
        self.request(DriverCommand::Status).await
    }

    /// Stop the driver; a driver that is already gone is fine
    pub async fn shutdown(&self) {
        let _ = self.tx.send(DriverCommand::Shutdown).await;
    }
}
