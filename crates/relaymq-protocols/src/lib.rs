//! # relaymq Protocols
//!
//! Core protocol definitions (traits) for relaymq network channels.
//! Contains only interface definitions - no implementations.
//!
//! ## Core Traits
//!
//! - [`NetworkChannel`] - The byte-stream channel contract consumed by a
//!   message protocol client (e.g. MQTT)
//! - [`Transport`] - The event-driven connection capability a channel
//!   implementation adapts
//! - [`TransportFactory`] - Creates transports without binding a channel to a
//!   concrete transport type

pub mod channel;
pub mod error;
pub mod transport;

// Re-export core traits
pub use channel::NetworkChannel;
pub use error::{ChannelError, TransportError};
pub use transport::{Transport, TransportEvent, TransportFactory, TransportState};
