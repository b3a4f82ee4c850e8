//! The single-threaded event loop that owns the shared field.
//!
//! [`Hub`] owns the [`StateStore`] and the [`ConnectionManager`]. Every
//! connect, intent, disconnect, status query, and liveness sweep is a
//! command on one queue, handled to completion before the next is taken.
//! A mutation, its recompute, and the fan-out it triggers therefore never
//! interleave with another handler, and no locks are needed.
//!
//! Transport tasks talk to the hub through a cloneable [`HubHandle`].
//!
//! # Ordering
//!
//! Within a handler the store is mutated and recomputed before any event
//! describing the new state is queued, so every `state-updated` carries
//! both the changed vector and the matching aggregate. All connections
//! observe field updates in the order the hub produced them.

use std::ops::ControlFlow;

use chrono::Utc;
use symphony_types::{ClientIntent, FieldStatus, LeaveReason, ParticipantId, ServerEvent};
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tracing::{debug, error, info, warn};

use crate::broadcast::{Audience, deliver, resync_lagged};
use crate::config::SymphonyConfig;
use crate::liveness::{ConnectionManager, ConnectionPhase, LivenessPolicy};
use crate::store::{StateStore, StoreError};

/// Name reported by the status surface.
pub const SERVICE_NAME: &str = "Symphony Field Server";

/// Smallest outbound queue that still fits the connect handshake
/// (welcome, full-state, own participant-joined) plus one update.
const MIN_OUTBOUND_CAPACITY: usize = 4;

/// Errors returned to [`HubHandle`] callers.
#[derive(Debug, thiserror::Error)]
pub enum HubError {
    /// The event loop has stopped.
    #[error("hub event loop has stopped")]
    Closed,

    /// The store refused the operation.
    #[error("store error: {0}")]
    Store(#[from] StoreError),
}

impl From<oneshot::error::RecvError> for HubError {
    fn from(_: oneshot::error::RecvError) -> Self {
        Self::Closed
    }
}

impl From<mpsc::error::SendError<HubCommand>> for HubError {
    fn from(_: mpsc::error::SendError<HubCommand>) -> Self {
        Self::Closed
    }
}

/// A registered connection as seen by its transport task.
#[derive(Debug)]
pub struct Session {
    /// The participant id assigned to this connection.
    pub id: ParticipantId,
    /// Events addressed to this connection. Yields `None` once the hub
    /// has removed the participant.
    pub events: mpsc::Receiver<ServerEvent>,
}

/// Commands accepted by the event loop.
#[derive(Debug)]
pub enum HubCommand {
    /// Register a new connection.
    Connect {
        /// Receives the new session.
        reply: oneshot::Sender<Result<Session, HubError>>,
    },
    /// A protocol message from a connection.
    Intent {
        /// Sender.
        id: ParticipantId,
        /// The decoded message.
        intent: ClientIntent,
    },
    /// Transport-level traffic (e.g. a ping frame) that only proves
    /// liveness.
    Activity {
        /// Sender.
        id: ParticipantId,
    },
    /// The transport closed.
    Disconnect {
        /// The closed connection.
        id: ParticipantId,
    },
    /// Produce a status report.
    Status {
        /// Receives the report.
        reply: oneshot::Sender<FieldStatus>,
    },
    /// Stop the event loop.
    Shutdown,
}

/// Cloneable sender side of the event loop.
#[derive(Debug, Clone)]
pub struct HubHandle {
    tx: mpsc::Sender<HubCommand>,
}

impl HubHandle {
    /// Register a new connection and receive its session.
    pub async fn connect(&self) -> Result<Session, HubError> {
        let (reply, rx) = oneshot::channel();
        self.tx.send(HubCommand::Connect { reply }).await?;
        rx.await?
    }

    /// Forward a decoded client message.
    pub async fn send_intent(&self, id: ParticipantId, intent: ClientIntent) -> Result<(), HubError> {
        self.tx.send(HubCommand::Intent { id, intent }).await?;
        Ok(())
    }

    /// Report transport-level activity for `id`.
    pub async fn activity(&self, id: ParticipantId) -> Result<(), HubError> {
        self.tx.send(HubCommand::Activity { id }).await?;
        Ok(())
    }

    /// Report that the transport for `id` closed.
    pub async fn disconnect(&self, id: ParticipantId) -> Result<(), HubError> {
        self.tx.send(HubCommand::Disconnect { id }).await?;
        Ok(())
    }

    /// Fetch a point-in-time status report.
    pub async fn status(&self) -> Result<FieldStatus, HubError> {
        let (reply, rx) = oneshot::channel();
        self.tx.send(HubCommand::Status { reply }).await?;
        Ok(rx.await?)
    }

    /// Ask the event loop to stop after the commands already queued.
    pub async fn shutdown(&self) -> Result<(), HubError> {
        self.tx.send(HubCommand::Shutdown).await?;
        Ok(())
    }
}

/// Owner of the shared field and the connection table.
#[derive(Debug)]
pub struct Hub {
    store: StateStore,
    connections: ConnectionManager,
    outbound_capacity: usize,
}

impl Hub {
    /// Create a hub around an existing store.
    pub fn new(store: StateStore, policy: LivenessPolicy, outbound_capacity: usize) -> Self {
        Self {
            store,
            connections: ConnectionManager::new(policy),
            outbound_capacity: outbound_capacity.max(MIN_OUTBOUND_CAPACITY),
        }
    }

    /// Create a hub from configuration.
    pub fn from_config(config: &SymphonyConfig) -> Self {
        Self::new(
            StateStore::from_config(&config.field),
            config.liveness.policy(),
            config.hub.outbound_capacity,
        )
    }

    /// Spawn the event loop on a Tokio task.
    pub fn spawn(self, command_capacity: usize) -> (HubHandle, JoinHandle<()>) {
        let (tx, rx) = mpsc::channel(command_capacity.max(1));
        let task = tokio::spawn(self.run(rx));
        (HubHandle { tx }, task)
    }

    /// Read-only access to the store.
    pub const fn store(&self) -> &StateStore {
        &self.store
    }

    /// Read-only access to the connection table.
    pub const fn connections(&self) -> &ConnectionManager {
        &self.connections
    }

    /// Run until [`HubCommand::Shutdown`] arrives or every handle is
    /// dropped.
    pub async fn run(mut self, mut commands: mpsc::Receiver<HubCommand>) {
        let period = self
            .connections
            .policy()
            .sweep_interval
            .max(std::time::Duration::from_millis(1));
        let mut sweep = tokio::time::interval(period);
        sweep.set_missed_tick_behavior(MissedTickBehavior::Delay);
        // First sweep one full period from now, not immediately.
        sweep.reset();

        info!(
            sweep_interval_ms = period.as_millis(),
            idle_timeout_ms = self.connections.policy().idle_timeout.as_millis(),
            "Hub event loop started"
        );

        loop {
            tokio::select! {
                command = commands.recv() => {
                    let Some(command) = command else {
                        debug!("All hub handles dropped");
                        break;
                    };
                    if self.handle(command).is_break() {
                        break;
                    }
                }
                _ = sweep.tick() => self.sweep(Instant::now()),
            }
        }

        info!(participants = self.store.len(), "Hub event loop stopped");
    }

    /// Handle one command to completion.
    pub fn handle(&mut self, command: HubCommand) -> ControlFlow<()> {
        match command {
            HubCommand::Connect { reply } => {
                let session = self.connect(Instant::now());
                if let Err(Ok(session)) = reply.send(session) {
                    // The requesting task went away before it got its id.
                    self.remove(session.id, LeaveReason::Disconnected);
                }
            }
            HubCommand::Intent { id, intent } => self.apply_intent(id, intent, Instant::now()),
            HubCommand::Activity { id } => {
                self.note_activity(id, Instant::now());
            }
            HubCommand::Disconnect { id } => self.remove(id, LeaveReason::Disconnected),
            HubCommand::Status { reply } => {
                // A dropped receiver only means the caller stopped waiting.
                let _ = reply.send(self.status());
            }
            HubCommand::Shutdown => return ControlFlow::Break(()),
        }
        ControlFlow::Continue(())
    }

    /// Register a connection: welcome and full state to the newcomer, then
    /// `participant-joined` to everyone.
    pub fn connect(&mut self, now: Instant) -> Result<Session, HubError> {
        let id = ParticipantId::new();
        let record = self.store.add_participant(id).inspect_err(|e| {
            error!(participant = %id, error = %e, "Rejected new connection");
        })?;

        let (tx, rx) = mpsc::channel(self.outbound_capacity);
        self.connections.open(id, tx, now);

        self.send(
            Audience::Only(id),
            &ServerEvent::Welcome {
                id,
                color: record.color.clone(),
            },
        );
        self.send(Audience::Only(id), &ServerEvent::FullState(self.store.snapshot()));
        self.send(
            Audience::Everyone,
            &ServerEvent::ParticipantJoined {
                participant: record,
            },
        );
        self.connections.record_activity(id, now);

        info!(participant = %id, participants = self.store.len(), "Participant connected");
        Ok(Session { id, events: rx })
    }

    /// Apply one client message.
    pub fn apply_intent(&mut self, id: ParticipantId, intent: ClientIntent, now: Instant) {
        if !self.note_activity(id, now) {
            warn!(
                participant = %id,
                intent = intent.kind(),
                "Dropping message from unknown participant"
            );
            return;
        }

        match intent {
            ClientIntent::IntentVectorUpdate { vector } => {
                match self.store.update_vector(id, vector) {
                    Ok(_) => {
                        debug!(
                            participant = %id,
                            connection_strength = self.store.connection_strength(),
                            "Vector updated"
                        );
                        self.send(
                            Audience::Everyone,
                            &ServerEvent::StateUpdated(self.store.snapshot()),
                        );
                    }
                    Err(e) => warn!(participant = %id, error = %e, "Dropping vector update"),
                }
            }
            ClientIntent::IntentPositionUpdate { position } => {
                match self.store.update_position(id, position) {
                    Ok(()) => self.send(
                        Audience::AllExcept(id),
                        &ServerEvent::PositionUpdated { id, position },
                    ),
                    Err(e) => warn!(participant = %id, error = %e, "Dropping position update"),
                }
            }
            ClientIntent::LivenessPing => self.send(
                Audience::Only(id),
                &ServerEvent::LivenessPong {
                    timestamp: Utc::now(),
                },
            ),
            ClientIntent::RequestFullState => {
                debug!(participant = %id, "Full resync requested");
                self.send(Audience::Only(id), &ServerEvent::FullState(self.store.snapshot()));
            }
        }
    }

    /// Evict every connection silent for longer than the idle timeout,
    /// then resynchronize connections still marked lagged.
    pub fn sweep(&mut self, now: Instant) {
        let expired = self.connections.sweep(now);
        for (id, idle) in expired {
            info!(participant = %id, idle_ms = idle.as_millis(), "Evicting idle participant");
            self.remove(id, LeaveReason::TimedOut);
        }

        let resynced = resync_lagged(&mut self.connections, &self.store);
        if resynced > 0 {
            debug!(resynced, "Pushed full state to lagged connections");
        }
    }

    /// The single removal path for disconnects and evictions.
    ///
    /// Closing the connection ends its session stream; the leave event is
    /// sent to the remaining connections only when a record was actually
    /// removed, so repeated calls produce one event.
    pub fn remove(&mut self, id: ParticipantId, reason: LeaveReason) {
        let phase = self.connections.close(id);
        if !self.store.remove_participant(id) {
            debug!(participant = %id, ?phase, "Removal for absent participant ignored");
            return;
        }
        let reason = match phase {
            Some(ConnectionPhase::TimedOut) => LeaveReason::TimedOut,
            _ => reason,
        };
        self.send(Audience::Everyone, &ServerEvent::ParticipantLeft { id, reason });
        info!(participant = %id, ?reason, participants = self.store.len(), "Participant left");
    }

    /// Point-in-time status report.
    pub fn status(&self) -> FieldStatus {
        FieldStatus {
            status: String::from("healthy"),
            service: String::from(SERVICE_NAME),
            timestamp: Utc::now(),
            active_participants: self.store.len(),
            aggregate_field: self.store.aggregate_field(),
            connection_strength: self.store.connection_strength(),
        }
    }

    /// Refresh liveness in both the connection table and the record.
    fn note_activity(&mut self, id: ParticipantId, now: Instant) -> bool {
        self.connections.record_activity(id, now) && self.store.touch(id).is_ok()
    }

    fn send(&mut self, audience: Audience, event: &ServerEvent) {
        let report = deliver(&mut self.connections, &self.store, audience, event);
        if report.dropped > 0 {
            debug!(event = event.kind(), ?report, "Fan-out incomplete");
        }
    }
}
