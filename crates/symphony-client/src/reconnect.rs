//! Bounded reconnect with exponential backoff.
//!
//! The wire transport is abstracted behind [`Connector`] so the retry
//! schedule can be driven by any socket implementation (or a scripted
//! fake in tests). Each attempt is bounded by
//! [`ReconnectPolicy::connect_timeout`]; after
//! [`ReconnectPolicy::max_attempts`] failures the caller gets
//! [`TransportError::Exhausted`].

use std::future::Future;
use std::time::Duration;

use symphony_types::ClientIntent;
use tokio::time::{sleep, timeout};
use tracing::{info, warn};

use crate::error::TransportError;
use crate::mirror::ClientMirror;

/// Retry schedule for establishing the server connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReconnectPolicy {
    /// Attempts before giving up.
    pub max_attempts: u32,
    /// Upper bound on a single attempt.
    pub connect_timeout: Duration,
    /// Delay after the first failure.
    pub initial_backoff: Duration,
    /// Ceiling for the doubled delay.
    pub max_backoff: Duration,
}

impl Default for ReconnectPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            connect_timeout: Duration::from_secs(10),
            initial_backoff: Duration::from_secs(1),
            max_backoff: Duration::from_secs(5),
        }
    }
}

impl ReconnectPolicy {
    /// Delay after failed attempt `attempt` (1-based): the initial
    /// backoff doubled per prior attempt, capped at `max_backoff`.
    pub fn backoff(&self, attempt: u32) -> Duration {
        let factor = 2_u32.saturating_pow(attempt.saturating_sub(1));
        self.initial_backoff
            .saturating_mul(factor)
            .min(self.max_backoff)
    }
}

/// Something that can open a connection to the field server.
pub trait Connector {
    /// An established connection.
    type Connection: Send;

    /// Make one connection attempt.
    fn connect(&mut self) -> impl Future<Output = Result<Self::Connection, TransportError>> + Send;
}

/// Try to connect up to `policy.max_attempts` times.
///
/// `on_attempt` is called with the 1-based attempt number before each
/// try.
///
/// # Errors
///
/// Returns [`TransportError::Exhausted`] once every attempt has failed
/// or timed out.
pub async fn connect_with_retry<C, F>(
    connector: &mut C,
    policy: &ReconnectPolicy,
    mut on_attempt: F,
) -> Result<C::Connection, TransportError>
where
    C: Connector + Send,
    F: FnMut(u32) + Send,
{
    for attempt in 1..=policy.max_attempts {
        on_attempt(attempt);

        let failure = match timeout(policy.connect_timeout, connector.connect()).await {
            Ok(Ok(connection)) => {
                info!(attempt, "Connected to field server");
                return Ok(connection);
            }
            Ok(Err(e)) => e,
            Err(_) => TransportError::Timeout(policy.connect_timeout),
        };

        if attempt < policy.max_attempts {
            let delay = policy.backoff(attempt);
            warn!(
                attempt,
                max_attempts = policy.max_attempts,
                retry_in_ms = delay.as_millis(),
                error = %failure,
                "Connection attempt failed"
            );
            sleep(delay).await;
        } else {
            warn!(attempt, error = %failure, "Final connection attempt failed");
        }
    }

    Err(TransportError::Exhausted {
        attempts: policy.max_attempts,
    })
}

/// Reconnect a mirror whose transport was lost.
///
/// Status moves through `Reconnecting { attempt }` and ends at
/// `Connected` or `Disconnected`. On success the returned intent is the
/// resync request that must be the first thing sent on the new
/// connection.
///
/// # Errors
///
/// Returns [`TransportError::Exhausted`] when retries run out; the
/// mirror is then `Disconnected`.
pub async fn reconnect<C>(
    mirror: &mut ClientMirror,
    connector: &mut C,
    policy: &ReconnectPolicy,
) -> Result<(C::Connection, ClientIntent), TransportError>
where
    C: Connector + Send,
{
    mirror.on_transport_lost();
    let result =
        connect_with_retry(connector, policy, |attempt| mirror.on_reconnect_attempt(attempt)).await;
    match result {
        Ok(connection) => Ok((connection, mirror.on_transport_restored())),
        Err(e) => {
            mirror.on_gave_up();
            Err(e)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn backoff_doubles_then_caps() {
        let policy = ReconnectPolicy::default();
        let delays: Vec<u64> = (1..=6).map(|a| policy.backoff(a).as_secs()).collect();
        assert_eq!(delays, vec![1, 2, 4, 5, 5, 5]);
    }

    #[test]
    fn backoff_survives_huge_attempt_counts() {
        let policy = ReconnectPolicy::default();
        assert_eq!(policy.backoff(u32::MAX), policy.max_backoff);
    }
}
