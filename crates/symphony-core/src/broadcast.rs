//! Fan-out of server events to connection queues.
//!
//! Delivery is fire-and-forget: each send is a non-blocking `try_send`
//! into a bounded per-connection queue, so one slow client never stalls
//! the event loop or its peers.
//!
//! When a queue is full, a field-mutating event is dropped for that
//! connection only and the connection is marked lagged. The next event
//! that reaches a lagged connection is replaced by a
//! [`ServerEvent::FullState`], which restores the client's replica
//! wholesale. [`resync_lagged`] does the same for connections that see
//! no further traffic; the hub runs it on every sweep.

use symphony_types::{ParticipantId, ServerEvent};
use tokio::sync::mpsc::error::TrySendError;
use tracing::{debug, warn};

use crate::liveness::ConnectionManager;
use crate::store::StateStore;

/// Which connections an event is addressed to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Audience {
    /// Every open connection, including the originator.
    Everyone,
    /// Every open connection except the given one.
    AllExcept(ParticipantId),
    /// A single connection.
    Only(ParticipantId),
}

impl Audience {
    /// Whether `id` is addressed.
    pub fn includes(self, id: ParticipantId) -> bool {
        match self {
            Self::Everyone => true,
            Self::AllExcept(excluded) => excluded != id,
            Self::Only(target) => target == id,
        }
    }
}

/// Outcome counts for one fan-out.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DeliveryReport {
    /// Events queued as addressed.
    pub delivered: usize,
    /// Lagged connections that received a full resync instead.
    pub resynced: usize,
    /// Sends that failed because a queue was full or closed.
    pub dropped: usize,
}

/// Queue `event` for every open connection in `audience`.
pub fn deliver(
    connections: &mut ConnectionManager,
    store: &StateStore,
    audience: Audience,
    event: &ServerEvent,
) -> DeliveryReport {
    let mut report = DeliveryReport::default();
    let mut resync: Option<ServerEvent> = None;

    for (id, conn) in connections.open_connections_mut() {
        if !audience.includes(*id) {
            continue;
        }

        let recovering = conn.lagged && event.mutates_field();
        let outgoing = if recovering {
            resync
                .get_or_insert_with(|| ServerEvent::FullState(store.snapshot()))
                .clone()
        } else {
            event.clone()
        };

        match conn.outbound.try_send(outgoing) {
            Ok(()) if recovering => {
                conn.lagged = false;
                report.resynced = report.resynced.saturating_add(1);
                debug!(participant = %id, "Lagged connection resynchronized");
            }
            Ok(()) => {
                if matches!(event, ServerEvent::FullState(_)) {
                    conn.lagged = false;
                }
                report.delivered = report.delivered.saturating_add(1);
            }
            Err(TrySendError::Full(_)) => {
                if event.mutates_field() {
                    conn.lagged = true;
                }
                report.dropped = report.dropped.saturating_add(1);
                warn!(participant = %id, event = event.kind(), "Outbound queue full, event dropped");
            }
            Err(TrySendError::Closed(_)) => {
                // The session task has gone; its disconnect is already queued.
                report.dropped = report.dropped.saturating_add(1);
                debug!(participant = %id, event = event.kind(), "Outbound queue closed");
            }
        }
    }

    report
}

/// Push a [`ServerEvent::FullState`] to every lagged connection that has
/// room for it, clearing the mark on success. Returns how many were
/// resynchronized.
///
/// Without this a connection that lagged on the last change would stay
/// stale until the next field-mutating event.
pub fn resync_lagged(connections: &mut ConnectionManager, store: &StateStore) -> usize {
    let mut resync: Option<ServerEvent> = None;
    let mut resynced: usize = 0;

    for (id, conn) in connections.open_connections_mut() {
        if !conn.lagged {
            continue;
        }
        let snapshot = resync
            .get_or_insert_with(|| ServerEvent::FullState(store.snapshot()))
            .clone();
        match conn.outbound.try_send(snapshot) {
            Ok(()) => {
                conn.lagged = false;
                resynced = resynced.saturating_add(1);
                debug!(participant = %id, "Lagged connection resynchronized");
            }
            Err(TrySendError::Full(_)) => {
                debug!(participant = %id, "Lagged connection still full, resync deferred");
            }
            Err(TrySendError::Closed(_)) => {
                debug!(participant = %id, "Outbound queue closed");
            }
        }
    }

    resynced
}
