//! Transport protocol definitions.
//!
//! A [`Transport`] is the event-driven connection a channel implementation
//! adapts: it opens asynchronously, pushes whole payloads, and reports
//! everything that happens to it (open, inbound data, errors, closure)
//! through a broadcast event stream. Channels subscribe to the stream and
//! translate events into their own buffer-based contract.
//!
//! Channels must not depend on a concrete transport type; they go through
//! [`TransportFactory`] so tests (and alternative WebSocket providers) can
//! substitute their own implementation of the capability set.

use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;
use tokio::sync::broadcast;

use crate::error::TransportError;

#[cfg(test)]
#[path = "transport_tests.rs"]
mod tests;

/// Connection lifecycle state reported by a transport.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransportState {
    Closed,
    Connecting,
    Open,
    Closing,
}

impl TransportState {
    /// Whether the connection is established and usable.
    pub fn is_open(&self) -> bool {
        matches!(self, TransportState::Open)
    }
}

/// Event emitted by a transport to its subscribers.
#[derive(Debug, Clone)]
pub enum TransportEvent {
    /// The connection finished opening.
    Opened,
    /// One inbound binary payload was delivered.
    Data(Bytes),
    /// One inbound text payload was delivered.
    Text(String),
    /// The connection reported a failure.
    Error(String),
    /// The connection finished closing.
    Closed,
}

/// Core trait for transports.
///
/// The capability set a channel needs from its underlying connection:
/// asynchronous open/send/close, the current lifecycle state, and a
/// subscription to the event stream.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Initiate the connection.
    async fn open(&self) -> Result<(), TransportError>;

    /// Send one whole payload.
    async fn send(&self, payload: &[u8]) -> Result<(), TransportError>;

    /// Initiate connection teardown. Completion is signaled via
    /// [`TransportEvent::Closed`].
    async fn close(&self) -> Result<(), TransportError>;

    /// Current lifecycle state.
    fn state(&self) -> TransportState;

    /// Subscribe to the event stream.
    ///
    /// Subscribers only see events emitted after they subscribe; callers
    /// that need the `Opened` event must subscribe before calling [`open`].
    ///
    /// [`open`]: Transport::open
    fn events(&self) -> broadcast::Receiver<TransportEvent>;
}

/// Creates transports for a channel without binding it to a concrete type.
pub trait TransportFactory: Send + Sync {
    /// Create a transport bound to `url`, announcing `subprotocol` during
    /// its handshake.
    fn create(&self, url: &str, subprotocol: &str) -> Arc<dyn Transport>;
}
