//! Connection liveness tracking and the idle sweep.
//!
//! Each connection moves through
//! `Connecting -> Active -> {Disconnected, TimedOut}`. Every inbound
//! message re-enters `Active` and refreshes the liveness instant. A
//! periodic sweep marks connections idle for longer than the timeout as
//! `TimedOut`; the caller then runs the ordinary removal path for them.
//!
//! The table also holds each connection's outbound queue, which the
//! [`broadcast`](crate::broadcast) module delivers into.

use std::collections::BTreeMap;
use std::time::Duration;

use symphony_types::{ParticipantId, ServerEvent};
use tokio::sync::mpsc;
use tokio::time::Instant;

/// Lifecycle phase of one connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionPhase {
    /// Registered, initial state not yet delivered.
    Connecting,
    /// Receiving and sending normally.
    Active,
    /// The transport closed.
    Disconnected,
    /// Evicted by the liveness sweep.
    TimedOut,
}

impl ConnectionPhase {
    /// Whether the connection still takes part in fan-out.
    pub const fn is_open(self) -> bool {
        matches!(self, Self::Connecting | Self::Active)
    }
}

/// Sweep cadence and idle threshold.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LivenessPolicy {
    /// Time between sweeps.
    pub sweep_interval: Duration,
    /// Silence after which an active connection is evicted.
    pub idle_timeout: Duration,
}

impl Default for LivenessPolicy {
    fn default() -> Self {
        Self {
            sweep_interval: Duration::from_secs(15),
            idle_timeout: Duration::from_secs(30),
        }
    }
}

/// One tracked connection.
#[derive(Debug)]
pub(crate) struct Connection {
    pub(crate) phase: ConnectionPhase,
    pub(crate) last_seen: Instant,
    pub(crate) outbound: mpsc::Sender<ServerEvent>,
    pub(crate) lagged: bool,
}

/// Registry of live connections keyed by participant id.
#[derive(Debug)]
pub struct ConnectionManager {
    connections: BTreeMap<ParticipantId, Connection>,
    policy: LivenessPolicy,
}

impl ConnectionManager {
    /// Create an empty registry.
    pub const fn new(policy: LivenessPolicy) -> Self {
        Self {
            connections: BTreeMap::new(),
            policy,
        }
    }

    /// The policy in force.
    pub const fn policy(&self) -> LivenessPolicy {
        self.policy
    }

    /// Register a new connection in the `Connecting` phase.
    pub fn open(&mut self, id: ParticipantId, outbound: mpsc::Sender<ServerEvent>, now: Instant) {
        self.connections.insert(
            id,
            Connection {
                phase: ConnectionPhase::Connecting,
                last_seen: now,
                outbound,
                lagged: false,
            },
        );
    }

    /// Move a connection to `Active` and refresh its liveness instant.
    ///
    /// Returns `false` if the id is unknown or already terminal.
    pub fn record_activity(&mut self, id: ParticipantId, now: Instant) -> bool {
        match self.connections.get_mut(&id) {
            Some(conn) if conn.phase.is_open() => {
                conn.phase = ConnectionPhase::Active;
                conn.last_seen = now;
                true
            }
            _ => false,
        }
    }

    /// Mark every active connection idle for longer than the timeout as
    /// `TimedOut` and return them with their idle durations.
    ///
    /// Expired ids are collected before any entry changes, so the walk
    /// never observes its own updates.
    pub fn sweep(&mut self, now: Instant) -> Vec<(ParticipantId, Duration)> {
        let timeout = self.policy.idle_timeout;
        let expired: Vec<(ParticipantId, Duration)> = self
            .connections
            .iter()
            .filter(|(_, conn)| conn.phase == ConnectionPhase::Active)
            .map(|(id, conn)| (*id, now.saturating_duration_since(conn.last_seen)))
            .filter(|(_, idle)| *idle > timeout)
            .collect();

        for (id, _) in &expired {
            if let Some(conn) = self.connections.get_mut(id) {
                conn.phase = ConnectionPhase::TimedOut;
            }
        }
        expired
    }

    /// Drop a connection, closing its outbound queue. Returns the phase it
    /// ended in: `TimedOut` if the sweep marked it, otherwise
    /// `Disconnected`.
    pub fn close(&mut self, id: ParticipantId) -> Option<ConnectionPhase> {
        self.connections.remove(&id).map(|conn| match conn.phase {
            ConnectionPhase::TimedOut => ConnectionPhase::TimedOut,
            _ => ConnectionPhase::Disconnected,
        })
    }

    /// Current phase of a tracked connection.
    pub fn phase(&self, id: ParticipantId) -> Option<ConnectionPhase> {
        self.connections.get(&id).map(|conn| conn.phase)
    }

    /// Whether the connection is marked as having missed an event.
    pub fn is_lagged(&self, id: ParticipantId) -> bool {
        self.connections.get(&id).is_some_and(|conn| conn.lagged)
    }

    /// Number of tracked connections.
    pub fn len(&self) -> usize {
        self.connections.len()
    }

    /// Whether no connections are tracked.
    pub fn is_empty(&self) -> bool {
        self.connections.is_empty()
    }

    /// Open connections, mutably, for delivery.
    pub(crate) fn open_connections_mut(
        &mut self,
    ) -> impl Iterator<Item = (&ParticipantId, &mut Connection)> {
        self.connections
            .iter_mut()
            .filter(|(_, conn)| conn.phase.is_open())
    }
}

#[cfg(test)]
#[allow(clippy::arithmetic_side_effects)]
mod tests {
    use super::*;

    fn manager() -> ConnectionManager {
        ConnectionManager::new(LivenessPolicy::default())
    }

    fn open(
        manager: &mut ConnectionManager,
        now: Instant,
    ) -> (ParticipantId, mpsc::Receiver<ServerEvent>) {
        let id = ParticipantId::new();
        let (tx, rx) = mpsc::channel(4);
        manager.open(id, tx, now);
        (id, rx)
    }

    #[test]
    fn lifecycle_connecting_active_disconnected() {
        let mut m = manager();
        let now = Instant::now();
        let (id, _rx) = open(&mut m, now);
        assert_eq!(m.phase(id), Some(ConnectionPhase::Connecting));
        assert!(m.record_activity(id, now));
        assert_eq!(m.phase(id), Some(ConnectionPhase::Active));
        assert_eq!(m.close(id), Some(ConnectionPhase::Disconnected));
        assert_eq!(m.phase(id), None);
        assert_eq!(m.close(id), None);
    }

    #[test]
    fn sweep_evicts_only_idle_active_connections() {
        let mut m = manager();
        let start = Instant::now();
        let (idle, _rx1) = open(&mut m, start);
        let (busy, _rx2) = open(&mut m, start);
        let (pending, _rx3) = open(&mut m, start);
        m.record_activity(idle, start);
        m.record_activity(busy, start);

        let later = start + Duration::from_secs(31);
        m.record_activity(busy, later - Duration::from_secs(5));

        let expired = m.sweep(later);
        assert_eq!(expired.len(), 1);
        assert_eq!(expired.first().map(|(id, _)| *id), Some(idle));
        assert!(expired.first().is_some_and(|(_, d)| *d > Duration::from_secs(30)));
        assert_eq!(m.phase(idle), Some(ConnectionPhase::TimedOut));
        assert_eq!(m.phase(busy), Some(ConnectionPhase::Active));
        assert_eq!(m.phase(pending), Some(ConnectionPhase::Connecting));
    }

    #[test]
    fn timed_out_connection_is_swept_once() {
        let mut m = manager();
        let start = Instant::now();
        let (id, _rx) = open(&mut m, start);
        m.record_activity(id, start);
        let later = start + Duration::from_secs(45);
        assert_eq!(m.sweep(later).len(), 1);
        assert!(m.sweep(later).is_empty());
        assert!(!m.record_activity(id, later));
        assert_eq!(m.close(id), Some(ConnectionPhase::TimedOut));
    }

    #[test]
    fn silence_at_exactly_the_threshold_is_kept() {
        let mut m = manager();
        let start = Instant::now();
        let (id, _rx) = open(&mut m, start);
        m.record_activity(id, start);
        assert!(m.sweep(start + Duration::from_secs(30)).is_empty());
    }
}
