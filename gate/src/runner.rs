//! Tokio driver for the gate controller.
//!
//! Each session runs in its own task. The task performs capability calls,
//! feeds results into the [`GateController`] and publishes the resulting
//! events on a broadcast channel. Abandoning a session (or starting a new
//! one) sends a cancel signal that the task `select!`s on alongside its
//! timer and any in-flight capability future, so both are dropped at once.
//! Callbacks that still race past the signal carry a stale token and are
//! discarded by the controller.

use std::sync::Arc;
use std::time::Duration;

use geogate_geofence::{LocationCapability, LocationError, PermissionStatus};
use geogate_network::{NetworkCapability, NetworkError};
use geogate_types::{ConnectivitySnapshot, Coordinate, SessionToken};
use geogate_utils::format_duration;
use geogate_verification::{VerificationCapability, VerificationDispatcher};
use tokio::sync::{broadcast, mpsc, Mutex};
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};

use crate::config::GateConfig;
use crate::controller::{Decision, GateController};
use crate::event::GateEvent;
use crate::state::GateState;
use crate::GateError;

/// Capacity of the observer event channel.
pub const EVENT_CHANNEL_CAPACITY: usize = 64;

/// Commands an operator can send into a running session.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum SessionCommand {
    /// Explicit network re-check after a block.
    CheckNetwork,
}

/// Timing knobs copied out of the config.
#[derive(Clone, Copy, Debug)]
struct PollTiming {
    location_period: Duration,
    poll_immediately: bool,
    capability_timeout: Duration,
}

struct ActiveSession {
    token: SessionToken,
    cancel: broadcast::Sender<()>,
    commands: mpsc::UnboundedSender<SessionCommand>,
}

impl ActiveSession {
    fn cancel(self) {
        // The task may already have finished.
        let _ = self.cancel.send(());
    }
}

/// Everything a session task needs.
struct SessionContext {
    token: SessionToken,
    controller: Arc<Mutex<GateController>>,
    network: Arc<dyn NetworkCapability>,
    location: Arc<dyn LocationCapability>,
    events: broadcast::Sender<GateEvent>,
    timing: PollTiming,
}

/// Runs gate sessions against real (or nullable) capabilities.
///
/// One session is active at a time. Observers subscribe with
/// [`subscribe`](Self::subscribe) and read state through
/// [`state`](Self::state); nothing outside the runner mutates it.
pub struct GateRunner {
    controller: Arc<Mutex<GateController>>,
    network: Arc<dyn NetworkCapability>,
    location: Arc<dyn LocationCapability>,
    events: broadcast::Sender<GateEvent>,
    timing: PollTiming,
    active: Mutex<Option<ActiveSession>>,
}

impl GateRunner {
    /// Build a runner. Rejects an invalid configuration before any session
    /// can start.
    pub fn new(
        config: &GateConfig,
        network: Arc<dyn NetworkCapability>,
        location: Arc<dyn LocationCapability>,
    ) -> Result<Self, GateError> {
        let controller = GateController::new(config)?;
        let (events, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        Ok(Self {
            controller: Arc::new(Mutex::new(controller)),
            network,
            location,
            events,
            timing: PollTiming {
                location_period: config.location_period(),
                poll_immediately: config.polling.poll_immediately,
                capability_timeout: config.capability_timeout(),
            },
            active: Mutex::new(None),
        })
    }

    /// Receive every event published from now on.
    pub fn subscribe(&self) -> broadcast::Receiver<GateEvent> {
        self.events.subscribe()
    }

    /// Snapshot of the active session's state.
    pub async fn state(&self) -> Option<GateState> {
        self.controller.lock().await.state().cloned()
    }

    /// Enter the gate sequence, superseding any running session.
    pub async fn start_session(&self) -> SessionToken {
        let mut active = self.active.lock().await;
        if let Some(previous) = active.take() {
            previous.cancel();
        }

        let (token, decision) = {
            let mut controller = self.controller.lock().await;
            let started = controller.begin_session();
            publish(&self.events, controller.drain_events());
            started
        };

        let (cancel, cancel_rx) = broadcast::channel(1);
        let (commands, commands_rx) = mpsc::unbounded_channel();
        let ctx = SessionContext {
            token,
            controller: Arc::clone(&self.controller),
            network: Arc::clone(&self.network),
            location: Arc::clone(&self.location),
            events: self.events.clone(),
            timing: self.timing,
        };
        let task = tokio::spawn(run_session(ctx, decision, cancel_rx, commands_rx));
        tokio::spawn(supervise(
            task,
            token,
            Arc::clone(&self.controller),
            self.events.clone(),
        ));
        *active = Some(ActiveSession {
            token,
            cancel,
            commands,
        });
        token
    }

    /// Operator-triggered network re-check for a blocked session.
    pub async fn recheck_network(&self, token: SessionToken) -> Result<(), GateError> {
        let active = self.active.lock().await;
        let session = match active.as_ref() {
            Some(session) if session.token == token => session,
            Some(_) => return Err(GateError::StaleSession(token)),
            None => return Err(GateError::NoActiveSession),
        };
        {
            let mut controller = self.controller.lock().await;
            let result = controller.recheck_network(token);
            publish(&self.events, controller.drain_events());
            result?;
        }
        session
            .commands
            .send(SessionCommand::CheckNetwork)
            .map_err(|_| GateError::NoActiveSession)
    }

    /// Leave the gate sequence: cancel the timer and any in-flight
    /// capability call, and destroy the session state.
    pub async fn abandon(&self, token: SessionToken) -> bool {
        let mut active = self.active.lock().await;
        let abandoned = self.controller.lock().await.abandon(token);
        if active.as_ref().is_some_and(|s| s.token == token) {
            if let Some(session) = active.take() {
                session.cancel();
            }
        }
        abandoned
    }

    /// Hand a `Ready` session to verification. The gate state is destroyed
    /// and the returned dispatcher carries the session from here on.
    pub async fn hand_off(
        &self,
        token: SessionToken,
        verifier: Arc<dyn VerificationCapability>,
    ) -> Result<VerificationDispatcher, GateError> {
        let mut active = self.active.lock().await;
        let completed = self.controller.lock().await.complete(token)?;
        if let Some(session) = active.take() {
            session.cancel();
        }
        Ok(VerificationDispatcher::new(completed, verifier))
    }
}

impl Drop for GateRunner {
    fn drop(&mut self) {
        if let Some(session) = self.active.get_mut().take() {
            session.cancel();
        }
    }
}

/// Publish events while the controller lock is held, so an abandon that
/// follows cannot be overtaken by events of the session it removed.
fn publish(events: &broadcast::Sender<GateEvent>, batch: Vec<GateEvent>) {
    for event in batch {
        // No subscribers is fine.
        let _ = events.send(event);
    }
}

async fn run_session(
    ctx: SessionContext,
    mut decision: Decision,
    mut cancel: broadcast::Receiver<()>,
    mut commands: mpsc::UnboundedReceiver<SessionCommand>,
) {
    let token = ctx.token;
    loop {
        decision = match decision {
            Decision::CheckNetwork => {
                let result = tokio::select! {
                    biased;
                    _ = cancel.recv() => break,
                    result = ctx.fetch_snapshot() => result,
                };
                ctx.apply(|c| c.on_network_snapshot(token, result)).await
            }
            Decision::NetworkBlocked { message } => {
                tracing::debug!(session = %token, block_message = message, "waiting for explicit network re-check");
                tokio::select! {
                    biased;
                    _ = cancel.recv() => break,
                    command = commands.recv() => match command {
                        Some(SessionCommand::CheckNetwork) => Decision::CheckNetwork,
                        None => break,
                    },
                }
            }
            Decision::StartLocationPoll => {
                ctx.poll_location(&mut cancel).await;
                break;
            }
            Decision::PollLocation | Decision::KeepPolling => {
                // Only produced inside the location poll loop.
                break;
            }
            Decision::Advance | Decision::Stale => break,
        };
    }
    tracing::debug!(session = %token, "session task finished");
}

/// Wait for a session task. A panic tears the session down and is reported
/// to observers instead of leaving it stuck in its last phase.
async fn supervise(
    task: JoinHandle<()>,
    token: SessionToken,
    controller: Arc<Mutex<GateController>>,
    events: broadcast::Sender<GateEvent>,
) {
    let err = match task.await {
        Ok(()) => return,
        Err(err) if err.is_cancelled() => return,
        Err(err) => err,
    };
    tracing::error!(session = %token, "session task panicked: {err}");
    let mut controller = controller.lock().await;
    if controller.abandon(token) {
        publish(
            &events,
            vec![GateEvent::SessionAborted {
                session: token,
                reason: err.to_string(),
            }],
        );
    }
}

impl SessionContext {
    /// Run one controller transition and publish what it produced.
    async fn apply<F>(&self, transition: F) -> Decision
    where
        F: FnOnce(&mut GateController) -> Decision,
    {
        let mut controller = self.controller.lock().await;
        let decision = transition(&mut controller);
        publish(&self.events, controller.drain_events());
        decision
    }

    async fn fetch_snapshot(&self) -> Result<ConnectivitySnapshot, NetworkError> {
        match tokio::time::timeout(self.timing.capability_timeout, self.network.fetch_snapshot())
            .await
        {
            Ok(result) => result,
            Err(_elapsed) => Err(NetworkError::Timeout),
        }
    }

    async fn fetch_position(&self) -> Result<Coordinate, LocationError> {
        let attempt = async {
            match self.location.request_permission().await {
                PermissionStatus::Denied => Err(LocationError::PermissionDenied),
                PermissionStatus::Granted => self.location.fetch_current_position().await,
            }
        };
        match tokio::time::timeout(self.timing.capability_timeout, attempt).await {
            Ok(result) => result,
            Err(_elapsed) => Err(LocationError::Timeout),
        }
    }

    /// The recurring location poll. Returns once the gate opens, the
    /// session goes stale, or the cancel signal fires; dropping the
    /// interval stops the timer.
    async fn poll_location(&self, cancel: &mut broadcast::Receiver<()>) {
        let token = self.token;
        let period = self.timing.location_period;
        let first_tick = if self.timing.poll_immediately {
            Instant::now()
        } else {
            Instant::now() + period
        };
        let mut interval = tokio::time::interval_at(first_tick, period);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
        tracing::info!(session = %token, period = %format_duration(period), "location polling started");

        loop {
            tokio::select! {
                biased;
                _ = cancel.recv() => return,
                _ = interval.tick() => {}
            }
            match self.apply(|c| c.on_location_tick(token)).await {
                Decision::PollLocation => {}
                _ => return,
            }

            let result = tokio::select! {
                biased;
                _ = cancel.recv() => return,
                result = self.fetch_position() => result,
            };
            match self.apply(|c| c.on_position(token, result)).await {
                Decision::KeepPolling => {
                    tracing::debug!(session = %token, "location poll complete, waiting for next tick");
                }
                Decision::Advance => {
                    tracing::info!(session = %token, "location polling stopped, gate open");
                    return;
                }
                _ => return,
            }
        }
    }
}
