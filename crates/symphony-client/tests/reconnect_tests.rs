//! Integration tests for the reconnect schedule.
//!
//! A scripted [`Connector`] stands in for the socket. Tests run on a
//! paused Tokio clock, so backoff and timeouts resolve instantly while
//! elapsed virtual time stays exact.

#![allow(clippy::unwrap_used, clippy::arithmetic_side_effects)]

use std::collections::VecDeque;
use std::time::Duration;

use symphony_client::reconnect::reconnect;
use symphony_client::{
    ClientMirror, ConnectionStatus, Connector, ReconnectPolicy, TransportError, connect_with_retry,
};
use symphony_types::{ClientIntent, DisplayColor, ParticipantId, ServerEvent};
use tokio::time::Instant;

#[derive(Debug, Clone, Copy)]
enum Outcome {
    Refuse,
    Hang,
    Accept,
}

/// Plays back a fixed list of outcomes, then refuses forever.
struct Scripted {
    outcomes: VecDeque<Outcome>,
    calls: u32,
}

impl Scripted {
    fn new(outcomes: &[Outcome]) -> Self {
        Self {
            outcomes: outcomes.iter().copied().collect(),
            calls: 0,
        }
    }
}

impl Connector for Scripted {
    type Connection = u32;

    async fn connect(&mut self) -> Result<u32, TransportError> {
        self.calls += 1;
        match self.outcomes.pop_front().unwrap_or(Outcome::Refuse) {
            Outcome::Refuse => Err(TransportError::Connect(String::from("refused"))),
            Outcome::Hang => std::future::pending().await,
            Outcome::Accept => Ok(self.calls),
        }
    }
}

#[tokio::test(start_paused = true)]
async fn first_attempt_succeeds_without_delay() {
    let mut connector = Scripted::new(&[Outcome::Accept]);
    let start = Instant::now();

    let connection = connect_with_retry(&mut connector, &ReconnectPolicy::default(), |_| {})
        .await
        .unwrap();

    assert_eq!(connection, 1);
    assert_eq!(start.elapsed(), Duration::ZERO);
}

#[tokio::test(start_paused = true)]
async fn retries_with_backoff_until_accepted() {
    let mut connector = Scripted::new(&[Outcome::Refuse, Outcome::Refuse, Outcome::Accept]);
    let mut attempts = Vec::new();
    let start = Instant::now();

    let connection = connect_with_retry(&mut connector, &ReconnectPolicy::default(), |a| {
        attempts.push(a);
    })
    .await
    .unwrap();

    assert_eq!(connection, 3);
    assert_eq!(attempts, vec![1, 2, 3]);
    // 1s after the first failure, 2s after the second.
    let elapsed = start.elapsed();
    assert!(elapsed >= Duration::from_secs(3), "elapsed {elapsed:?}");
    assert!(elapsed < Duration::from_secs(4), "elapsed {elapsed:?}");
}

#[tokio::test(start_paused = true)]
async fn gives_up_after_five_refusals() {
    let mut connector = Scripted::new(&[]);

    let result = connect_with_retry(&mut connector, &ReconnectPolicy::default(), |_| {}).await;

    assert_eq!(result, Err(TransportError::Exhausted { attempts: 5 }));
    assert_eq!(connector.calls, 5);
}

#[tokio::test(start_paused = true)]
async fn hanging_attempts_are_bounded_by_connect_timeout() {
    let mut connector = Scripted::new(&[Outcome::Hang; 5]);
    let start = Instant::now();

    let result = connect_with_retry(&mut connector, &ReconnectPolicy::default(), |_| {}).await;

    assert_eq!(result, Err(TransportError::Exhausted { attempts: 5 }));
    // Five 10s timeouts plus 1 + 2 + 4 + 5 seconds of backoff.
    let elapsed = start.elapsed();
    assert!(elapsed >= Duration::from_secs(62), "elapsed {elapsed:?}");
    assert!(elapsed < Duration::from_secs(63), "elapsed {elapsed:?}");
}

#[tokio::test(start_paused = true)]
async fn reconnect_requests_full_state() {
    let mut mirror = ClientMirror::new();
    mirror.apply(ServerEvent::Welcome {
        id: ParticipantId::new(),
        color: DisplayColor::from_hue(200.0),
    });
    let mut connector = Scripted::new(&[Outcome::Hang, Outcome::Accept]);

    let (connection, intent) = reconnect(&mut mirror, &mut connector, &ReconnectPolicy::default())
        .await
        .unwrap();

    assert_eq!(connection, 2);
    assert_eq!(intent, ClientIntent::RequestFullState);
    assert_eq!(mirror.status(), ConnectionStatus::Connected);
    assert_eq!(mirror.self_id(), None);
}

#[tokio::test(start_paused = true)]
async fn exhausted_reconnect_leaves_mirror_disconnected() {
    let mut mirror = ClientMirror::new();
    let mut connector = Scripted::new(&[]);

    let result = reconnect(&mut mirror, &mut connector, &ReconnectPolicy::default()).await;

    assert!(matches!(result, Err(TransportError::Exhausted { attempts: 5 })));
    assert_eq!(mirror.status(), ConnectionStatus::Disconnected);
}
