//! Client side of the Symphony shared emotional field.
//!
//! - [`ClientMirror`]: the participant's replica, updated optimistically
//!   by local edits and overwritten by authoritative server events
//! - [`reconnect`](reconnect::reconnect): bounded retry with backoff
//!   that ends in a full resync, never a delta replay
//!
//! The crate does not open sockets itself. Callers provide a
//! [`Connector`] for their transport.

pub mod error;
pub mod mirror;
pub mod reconnect;

pub use error::TransportError;
pub use mirror::{ClientMirror, ConnectionStatus};
pub use reconnect::{Connector, ReconnectPolicy, connect_with_retry};
