//! Network channel protocol definitions.
//!
//! A [`NetworkChannel`] is the byte-stream abstraction a message protocol
//! client (MQTT in particular) drives: connect, push bytes, pull bytes,
//! close. Implementations adapt whatever actually moves the bytes - a TCP
//! socket, a WebSocket connection - behind this one contract, so the
//! protocol layer above stays unaware of the wire.
//!
//! ## Core Concepts
//!
//! - **Channel**: the synchronous send/receive/close surface the protocol
//!   layer consumes
//! - **Delivery**: one inbound payload handed to the channel by its
//!   underlying transport; `receive` drains deliveries in arrival order
//! - **Receive timeout**: every receive is bounded; an elapsed timeout
//!   resolves to zero bytes, not an error

use std::time::Duration;

use async_trait::async_trait;

use crate::error::ChannelError;

#[cfg(test)]
#[path = "channel_tests.rs"]
mod tests;

/// Core trait for network channels.
///
/// Channels are client-side adapters owned exclusively by the protocol layer
/// driving them. The contract is deliberately narrow:
///
/// - `connect` establishes the underlying connection and only returns once
///   it is observably open (or fails with an explicit timeout/failure)
/// - `send` forwards a whole buffer and reports the bytes written; a channel
///   that was never connected reports zero without performing I/O
/// - `receive` fills the caller's buffer from at most one buffered delivery;
///   a short read leaves the remainder for the next call
/// - `close` initiates teardown and never fails
#[async_trait]
pub trait NetworkChannel: Send + Sync {
    /// Establish the underlying connection.
    async fn connect(&mut self) -> Result<(), ChannelError>;

    /// Accept an inbound connection.
    ///
    /// Client-only channels implement this as a no-op; it exists so the
    /// capability set covers both dialing and listening channel shapes.
    async fn accept(&mut self) -> Result<(), ChannelError>;

    /// Send the entire buffer, returning the number of bytes forwarded.
    ///
    /// Returns `Ok(0)` without any I/O when no connection exists.
    async fn send(&mut self, buf: &[u8]) -> Result<usize, ChannelError>;

    /// Receive into `buf` using the channel's configured receive timeout.
    async fn receive(&mut self, buf: &mut [u8]) -> Result<usize, ChannelError>;

    /// Receive into `buf`, waiting at most `timeout` for a delivery.
    ///
    /// Returns `Ok(0)` when the timeout elapses or the connection is no
    /// longer open and nothing is buffered. Fails with
    /// [`ChannelError::NotConnected`] if `connect` was never called.
    async fn receive_within(
        &mut self,
        buf: &mut [u8],
        timeout: Duration,
    ) -> Result<usize, ChannelError>;

    /// Whether buffered inbound bytes are ready to be received.
    fn data_available(&self) -> bool;

    /// Initiate connection teardown. No-op if nothing is open.
    async fn close(&mut self) -> Result<(), ChannelError>;
}
